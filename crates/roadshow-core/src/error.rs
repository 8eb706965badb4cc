//! Error types for the engine and the recording gateway.

/// An action could not start or continue for semantic reasons.
///
/// Logic errors never abort a tick: the engine logs them and skips the
/// offending action, leaving the rest of the event running.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogicError {
    /// The action carries an unrecognized dynamics-shape token.
    #[error("action '{action}' uses an undefined dynamics shape")]
    UndefinedShape {
        /// Name of the offending action.
        action: String,
    },

    /// A referenced entity has no runtime state.
    #[error("action '{action}' references an entity without runtime state")]
    MissingEntity {
        /// Name of the offending action.
        action: String,
    },

    /// A position could not be resolved to a pose.
    #[error("action '{action}' references a position that cannot be resolved")]
    UnresolvedPosition {
        /// Name of the offending action.
        action: String,
    },
}

/// Errors from writing or reading a state recording.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The recording file could not be read or written.
    #[error("recording I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the recording magic.
    #[error("not a recording file (bad magic)")]
    BadMagic,

    /// The file uses a format version this build does not understand.
    #[error("unsupported recording format version {0}")]
    UnsupportedVersion(u32),

    /// The file ends in the middle of the header or a record.
    #[error("recording file is truncated")]
    Truncated,

    /// A header string is not valid UTF-8 or does not fit the format.
    #[error("recording header contains a bad string")]
    BadHeaderString,
}
