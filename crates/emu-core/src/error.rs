//! Error types shared by every component crate.

use thiserror::Error;

/// Why a snapshot could not be produced or applied.
///
/// A failed load never leaves a component half-updated: the machine decodes
/// into a scratch copy and only swaps it in on success.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("output buffer too small: needed {needed} bytes, {available} available")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("not a snapshot (bad magic)")]
    BadMagic,
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u8),
    #[error("snapshot taken with a different memory layout: {0}")]
    LayoutMismatch(&'static str),
    #[error("malformed snapshot field: {0}")]
    Malformed(&'static str),
}

/// A configuration value rejected before it reached the core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value} for option {option}")]
    InvalidValue { option: &'static str, value: i64 },
    #[error("invalid {what} size: {size}")]
    InvalidSize { what: &'static str, size: usize },
}
