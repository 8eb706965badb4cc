//! Error types for scenario loading.

use std::path::PathBuf;

/// Fatal errors that abort a scenario load.
///
/// Everything below this severity is a resolution warning: logged, the
/// offending element dropped or defaulted, and the load continues.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// The scenario file could not be read from disk.
    #[error("failed to read scenario file {path}: {source}")]
    Io {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The top-level document is not well-formed XML.
    #[error("failed to parse scenario document: {source}")]
    Xml {
        /// The underlying XML parse error.
        #[from]
        source: roxmltree::Error,
    },

    /// The document declares no road-logic file.
    ///
    /// Without road geometry no entity can be placed, so this is the one
    /// missing element that fails the whole load.
    #[error("scenario declares no road network logic file")]
    MissingRoadLogic,
}
