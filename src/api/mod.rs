//! HTTP layer for tracking fetches and health reporting.
//!
//! This layer translates HTTP requests into tracking endpoint calls and formats
//! responses. It never fails a fetch because of recording or webhook problems.
//!
//! # Modules
//!
//! - [`dto`] - Data Transfer Objects for response serialization
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Request tracing
//! - [`routes`] - Route configuration

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
