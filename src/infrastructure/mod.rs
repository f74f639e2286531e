//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for event storage and webhook delivery.
//!
//! # Modules
//!
//! - [`persistence`] - PostgreSQL and in-memory event repositories
//! - [`webhook`] - Outbound webhook sinks (HTTP and no-op implementations)

pub mod persistence;
pub mod webhook;
