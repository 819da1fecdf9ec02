//! Detection logic - reconciliation, inference and summary

pub mod model;
pub mod reconcile;
pub mod inference;
pub mod summary;
pub mod pipeline;
