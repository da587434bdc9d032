//! Utility modules

pub mod error;
pub mod time;

pub use error::{ReportError, Result, StoreError};
