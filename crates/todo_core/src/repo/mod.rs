//! Persistence adapter contracts and storage strategies.
//!
//! # Responsibility
//! - Define the item CRUD contract (`ItemRepository`).
//! - Provide two interchangeable strategies: targeted SQLite rows and
//!   whole-collection blob rewrite.
//!
//! # Invariants
//! - Repository writes must enforce `Item::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateId`) in
//!   addition to transport errors.

pub mod blob_repo;
pub mod item_repo;
