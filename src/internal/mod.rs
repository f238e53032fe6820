//! Internal Implementation Details
//!
//! This module contains implementation details that are not part of the public API.
//! Types in this module may change without notice between minor versions.
//!
//! # Contents
//!
//! - [`constants`]: Protocol constants and magic numbers
//! - [`ring`]: Lock-free overwrite ring backing the receive frame stores
//!
//! # Stability
//!
//! **WARNING:** This module is `pub(crate)` only. The public constants are
//! re-exported from [`crate::constants`].

pub(crate) mod constants;
pub(crate) mod ring;
