//! HTTP middleware for request processing.
//!
//! Tracking routes carry no authentication or rate limiting: a rejected pixel fetch
//! would show up as a broken image in the recipient's mail client.

pub mod tracing;
