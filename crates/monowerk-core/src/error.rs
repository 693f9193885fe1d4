// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Monowerk.

use thiserror::Error;

/// Top-level error type for all Monowerk operations.
///
/// String payloads carry the originating condition (the offending pixel
/// layout, the codec's own error text, the path involved). None of these
/// errors are retried automatically.
#[derive(Debug, Error)]
pub enum MonowerkError {
    // -- Pixel transforms --
    /// The requested transform does not accept the source pixel layout.
    /// A caller error, not a codec failure.
    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    // -- Codec --
    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("image encode failed: {0}")]
    Encode(String),

    // -- Multi-page assembly --
    #[error("page assembly failed: {0}")]
    Assembly(String),

    // -- Filesystem --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MonowerkError>;
