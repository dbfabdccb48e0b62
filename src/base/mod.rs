//! Base types and error handling.
//!
//! Provides foundational types mirroring Chromium's `net/base/`:
//! - [`NetError`]: Network error codes matching `net_error_list.h`, plus
//!   the mapping from raw OS errors (`MapSystemError`)

pub mod neterror;
