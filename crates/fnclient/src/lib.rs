//! HTTP transport for the function console
//!
//! Implements [`fnruntime::FunctionBackend`] against the backend's JSON API
//! and classifies every failure where it is observed.

mod classify;
mod http;

pub use classify::{classify_status, extract_detail, Operation};
pub use http::{HttpBackend, HttpConfig};
