//! Repository trait definitions for the domain layer.
//!
//! Implementations live in `crate::infrastructure::persistence`; mocks are generated
//! with `mockall` for unit tests.
//!
//! See `tests/repository_events.rs` for the PostgreSQL integration tests.

pub mod event_repository;

pub use event_repository::EventRepository;

#[cfg(test)]
pub use event_repository::MockEventRepository;
