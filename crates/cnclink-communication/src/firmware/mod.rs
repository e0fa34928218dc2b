//! Firmware protocol support for CNC controllers
//!
//! Supported report grammars:
//! - GRBL / FluidNC: `<State|MPos:x,y,z|WPos:x,y,z|...>` status reports

pub mod grbl;

pub use grbl::{StatusFrame, StatusParser};
