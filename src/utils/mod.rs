//! Shared utilities: error types and HTTP plumbing

pub mod errors;
pub mod http;
