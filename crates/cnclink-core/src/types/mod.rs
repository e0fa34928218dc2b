//! Type system utilities and aliases.
//!
//! ## Modules
//!
//! - [`aliases`]: Type aliases for shared vectors, callback slots and UI tasks.

pub mod aliases;

pub use aliases::*;
