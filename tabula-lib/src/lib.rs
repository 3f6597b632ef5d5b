//! Tabula table library
//!
//! Thread-safe two-dimensional tables of generic elements with live row,
//! column and cell handles, titles, change events, select/join queries,
//! automatically maintained indexes, serialization and pluggable persistence.

pub mod content;
pub mod error;
pub mod event;
pub mod index;
pub mod marshal;
pub mod persistence;
pub mod select;

mod table;

pub use content::Element;
pub use table::*;
