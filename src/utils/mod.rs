//! Utility functions for URL handling, HTML text and request inspection.
//!
//! This module provides helper functions used across the application:
//!
//! - [`tracking_url`] - Tracking URL construction and segment extraction
//! - [`html`] - Attribute escaping and entity decoding
//! - [`request_context`] - Client context extraction from HTTP headers

pub mod html;
pub mod request_context;
pub mod tracking_url;
