//! Core use-case services.
//!
//! # Responsibility
//! - Reconcile repository results with the in-memory list the UI renders.
//! - Keep UI layers decoupled from storage details.

pub mod todo_service;
