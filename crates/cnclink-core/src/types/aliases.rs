//! Type aliases for commonly used complex types.
//!
//! Complex types like `Arc<Mutex<Vec<T>>>` are hard to read at a glance.
//! The aliases here give them names that convey intent and keep the same
//! pattern consistent across crates.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cnclink_core::types::*;
//!
//! // Instead of: Arc<Mutex<Vec<String>>>
//! let lines: ThreadSafeVec<String> = thread_safe_vec();
//! ```

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

// =============================================================================
// THREAD-SAFE SHARED TYPES (Arc<Mutex<Vec<T>>> / Arc<RwLock<T>>)
// =============================================================================

/// A thread-safe vector for cross-thread collection management.
///
/// Uses `parking_lot::Mutex` for better performance than `std::sync::Mutex`
/// and no lock poisoning.
pub type ThreadSafeVec<T> = Arc<Mutex<Vec<T>>>;

/// A thread-safe reader-writer lock wrapper for read-heavy workloads.
///
/// Use when reads greatly outnumber writes, e.g. callback slots read on
/// every event and replaced rarely.
pub type ThreadSafeRw<T> = Arc<RwLock<T>>;

// =============================================================================
// CALLBACK TYPES
// =============================================================================

/// A unit of work posted to the UI thread.
///
/// Runs exactly once, on whichever thread drains the queue.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

// =============================================================================
// CONSTRUCTOR HELPERS
// =============================================================================

/// Create a new empty `ThreadSafeVec<T>`.
#[inline]
pub fn thread_safe_vec<T>() -> ThreadSafeVec<T> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Create a new `ThreadSafeRw<T>` from a value.
#[inline]
pub fn thread_safe_rw<T>(value: T) -> ThreadSafeRw<T> {
    Arc::new(RwLock::new(value))
}
