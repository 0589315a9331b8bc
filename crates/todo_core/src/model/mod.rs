//! Todo domain model.
//!
//! # Responsibility
//! - Define the canonical item record consumed by repositories and services.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId`.
//! - Deletion is permanent; there is no tombstone state.

pub mod item;
