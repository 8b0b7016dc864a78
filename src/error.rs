//! Unified error types for the relay daemon.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! startup path and the reactor's exit path uniform.  Steady-state device
//! failures never reach this type: they are logged and swallowed where they
//! happen (see [`crate::app::service`]).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level daemon error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is missing, unreadable or invalid.
    #[error("config: {0}")]
    Config(String),

    /// A required device file could not be opened.
    #[error("cannot open {}: {source}", path.display())]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A device read or write failed.
    #[error("device: {0}")]
    Device(#[from] io::Error),

    /// `poll(2)` itself failed; the reactor cannot continue.
    #[error("poll failed: {0}")]
    Poll(#[source] io::Error),

    /// The bus client rejected a request.
    #[error("bus: {0}")]
    Bus(String),
}

impl Error {
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::DeviceOpen {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
