//! Incremental fetch-and-cache client for the Incoming Query Management System.
//!
//! Pending, transferred and replied query lists are fetched page by page for
//! the active role, mirrored into a persisted cache and tracked per key on a
//! status board.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod presentation;
pub mod state;
