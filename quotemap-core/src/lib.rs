//! QuoteMap Core — ticker normalization, reference data, quote providers and storage.
//!
//! This crate holds everything that does not involve scheduling:
//! - Converter table and the ticker normalization engine
//! - Alias and override tables, universes, and the mapping table artifact
//! - EODHD and Yahoo quote providers behind one trait
//! - Per-ticker Parquet quote store
//! - Runtime settings

pub mod config;
pub mod data;
pub mod mapping;
pub mod reference;
pub mod ticker;
pub mod universe;

pub use config::{ConfigError, Settings};
pub use mapping::{MappingRow, MappingTable};
pub use reference::{ReferenceError, ReferenceLoader};
pub use universe::Universe;
