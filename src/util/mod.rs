//! Utility modules

pub mod buffer;
pub mod memory;
pub mod time;
