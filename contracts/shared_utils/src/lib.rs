#![no_std]

//! Shared utility library for the marketplace contracts
//!
//! This library provides common functions, helpers, and patterns used by
//! the collection and marketplace contracts including:
//! - Math utilities (checked math, basis-point fees)
//! - Time utilities
//! - Validation utilities
//! - Storage helpers
//! - Error logging helpers
//! - Access control patterns
//! - Event emission patterns
//! - Reentrancy guard

pub mod access_control;
pub mod errors;
pub mod events;
pub mod math;
pub mod reentrancy;
pub mod storage;
pub mod time;
pub mod validation;


// Re-export commonly used items
pub use access_control::*;
pub use errors::*;
pub use events::*;
pub use math::*;
pub use reentrancy::ReentrancyGuard;
pub use storage::Storage;
pub use time::*;
pub use validation::*;
