//! GRBL protocol support
//!
//! FluidNC speaks the GRBL real-time report grammar, so the status parser
//! here serves both.

pub mod status_parser;

pub use status_parser::{StatusFrame, StatusParser};
