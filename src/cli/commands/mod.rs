//! CLI command implementations
//!
//! Each module contains the argument definitions and execution logic
//! for one group of commands.

pub mod token;
pub mod transfer;
pub mod wallet;
