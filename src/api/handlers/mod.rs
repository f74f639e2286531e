//! HTTP request handlers for tracking endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod click;
pub mod health;
pub mod open;

pub use click::click_handler;
pub use health::health_handler;
pub use open::open_handler;
