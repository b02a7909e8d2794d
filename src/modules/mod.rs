//! Modules layer - Infrastructure components for external integrations
//!
//! Contains adapters for local blob storage and the hosted completion API.

pub mod llm;
pub mod storage;
