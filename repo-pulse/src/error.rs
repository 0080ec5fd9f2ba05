#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the ingestion pipeline."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.
//!
//! Only the configuration family of variants is fatal to a run. Every other
//! variant is scoped to a single endpoint, record, or document and is logged
//! by the orchestrator before it moves on.

use std::path::{Path, PathBuf};

/// Unified error type returned by the configuration loader, the API and store
/// clients, and the CLI.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Wraps I/O errors that occur while reading the configuration file.
    #[error("failed to read configuration from {path:?}: {source}")]
    Io {
        /// Location of the configuration file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Missing sections, missing keys, or values of the wrong shape.
    #[error("invalid configuration: {message}")]
    Config {
        /// Human readable message describing the configuration problem.
        message: String
    },
    /// The stats API answered with something other than `200 OK`.
    #[error("GET {url} returned status {status}")]
    Api {
        /// HTTP status code reported by the API.
        status: u16,
        /// Request URL, without credentials.
        url:    String
    },
    /// The document store did not answer its liveness probe.
    #[error("document store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the failed probe.
        message: String
    },
    /// A response body or one of its records did not have the expected shape.
    #[error("malformed response: {message}")]
    MalformedResponse {
        /// Description of the offending payload.
        message: String
    },
    /// The store rejected a single document.
    #[error("document {id} rejected: {message}")]
    DocumentWriteConflict {
        /// Identifier of the rejected document.
        id:      String,
        /// Reason reported by the store.
        message: String
    },
    /// Transport level failures when interacting with external services.
    #[error("service error: {message}")]
    Service {
        /// Human readable message describing the service error.
        message: String
    },
    /// Wraps JSON serialization errors.
    #[error("failed to serialize document: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error
    }
}

impl Error {
    /// Constructs a configuration error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the configuration problem.
    pub fn config<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Config {
            message: message.into()
        }
    }

    /// Constructs a service error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the service error.
    pub fn service<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Service {
            message: message.into()
        }
    }

    /// Constructs a malformed-response error from the provided message.
    pub fn malformed<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::MalformedResponse {
            message: message.into()
        }
    }

    /// Returns `true` for errors that must stop the process before any fetch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Parse { .. } | Self::Config { .. })
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// The returned string matches the [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

impl From<masterror::AppError> for Error {
    fn from(error: masterror::AppError) -> Self {
        Self::Service {
            message: error.to_string()
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the configuration file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}
