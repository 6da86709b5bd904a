//! # Tutora Storage
//!
//! Session-scoped key/value storage used by the admin identity domain.
//!
//! Values live for the lifetime of one browsing session (one tab): they
//! survive a reload that reuses the same storage handle, and disappear when
//! the session ends.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod memory;

pub use backend::SessionStorage;
pub use error::StorageError;
pub use memory::MemoryStorage;
