//! Core types and error handling shared by every patchkit module.

pub mod error;

pub use error::{ErrorContext, Result, UpdaterError, user_friendly_error};
