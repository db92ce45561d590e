//! Cache invalidation signalling
//!
//! This module provides:
//! - `CacheInvalidator`: the fire-and-forget "invalidate now" interface
//! - `CacheInvalidation`: the signal sent for a note's target
//! - `InvalidationBus`: broadcast channel distributing signals to cache owners

mod bus;
mod types;

pub use bus::InvalidationBus;
pub use types::{CacheInvalidation, CacheInvalidator};
