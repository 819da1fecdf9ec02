//! Data models

pub mod table;
pub mod report;

pub use table::*;
pub use report::*;
