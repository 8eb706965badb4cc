//! Error types for the player binary.
//!
//! [`PlayerError`] is the top-level error type that wraps all possible
//! failure modes during player startup and the run itself.

/// Top-level error for the player binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// The command line was not usable.
    #[error("usage: roadshow-player <scenario.xml> ({message})")]
    Usage {
        /// What was wrong with the invocation.
        message: String,
    },

    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crate::config::ConfigError,
    },

    /// The scenario document could not be loaded.
    #[error("reader error: {source}")]
    Reader {
        /// The underlying reader error.
        #[from]
        source: roadshow_reader::ReaderError,
    },

    /// The road network could not be built.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: roadshow_world::WorldError,
    },

    /// The recording file could not be written.
    #[error("recording error: {source}")]
    Record {
        /// The underlying recording error.
        #[from]
        source: roadshow_core::RecordError,
    },
}
