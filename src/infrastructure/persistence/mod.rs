//! Event repository implementations.
//!
//! # Repositories
//!
//! - [`PgEventRepository`] - PostgreSQL, row locks per email; schema in `migrations/`
//! - [`MemoryEventRepository`] - In-process store used when no database is configured

pub mod memory_event_repository;
pub mod pg_event_repository;

pub use memory_event_repository::MemoryEventRepository;
pub use pg_event_repository::PgEventRepository;
