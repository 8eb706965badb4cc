//! Scenario document reader for the Roadshow workspace.
//!
//! Turns a scenario XML file into the [`roadshow_types`] document model.
//! Loading is strict about document well-formedness and the road-network
//! reference, and forgiving about everything else: unknown elements,
//! unsupported features, and unresolvable entity references are logged
//! and dropped so an imperfect scenario still produces a runnable graph.
//!
//! # Modules
//!
//! - [`params`] -- `$name` parameter substitution
//! - [`catalog`] -- Catalog sources with lazy file loading
//! - [`reader`] -- The document parser itself
//! - [`error`] -- Fatal load errors

pub mod catalog;
pub mod error;
pub mod params;
pub mod reader;

// Re-export primary types for convenience.
pub use catalog::CatalogSet;
pub use error::ReaderError;
pub use params::{Parameter, ParameterTable};
pub use reader::{load, load_str};
