//! Storage module for uploaded file bytes
//!
//! Provides the local filesystem store used by the `disk` storage backend.

mod local_store;

pub use local_store::LocalStore;
