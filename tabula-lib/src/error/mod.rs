//! Error types and exception handlers

mod handler;
mod marshal;
mod persistence;
mod table;

pub use handler::*;
pub use marshal::*;
pub use persistence::*;
pub use table::*;
