//! HTTP request handlers
//!
//! - `api` - health, status, voices, synthesize and merge endpoints

pub mod api;
