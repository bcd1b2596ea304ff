//! Protocol and wallet constants shared across modules.

pub mod constants;

pub use constants::*;
