//! Core business logic for survey-audit.
//!
//! The pure modules hold the rules: [`tree`] plans category/question
//! reconciliation, [`classifier`] derives response states, [`grouping`]
//! builds the grouped question view, [`reconcile`] plans response writes and
//! [`statistics`] derives audit reports. [`services`] wires them to the
//! repositories and applies caller permissions.

pub mod classifier;
pub mod grouping;
pub mod reconcile;
pub mod services;
pub mod sheet;
pub mod statistics;
pub mod tree;

pub use services::*;
