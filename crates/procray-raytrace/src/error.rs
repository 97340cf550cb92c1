//! Error types for scene options and acceleration-structure builds.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading or checking [`crate::SceneOptions`].
#[derive(Error, Debug)]
pub enum OptionsError {
    /// The options file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The TOML document is malformed or has fields of the wrong type.
    #[error("invalid options file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field parsed but holds an unusable value.
    #[error("invalid option `{name}`: {reason}")]
    Invalid {
        /// Field name as written in the TOML document.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Reasons an [`crate::AccelerationBuilder`] can refuse a primitive set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BvhBuildError {
    /// A primitive box has a NaN or infinite corner, or min > max.
    #[error("primitive {index} has non-finite or inverted bounds")]
    NonFiniteBounds {
        /// Geometry index of the offending box.
        index: usize,
    },

    /// The hierarchy would exceed the configured node budget.
    #[error("hierarchy needs {count} nodes, limit is {max}")]
    TooManyNodes {
        /// Nodes the build produced.
        count: usize,
        /// Configured maximum.
        max: usize,
    },
}
