//! HTTP handlers

pub mod health;
pub mod dashboard;
pub mod model;
pub mod predict;
