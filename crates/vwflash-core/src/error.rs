//! Error types for block-set orchestration and its collaborators

use std::path::PathBuf;

use thiserror::Error;

use crate::action::Action;

/// Result type for orchestrator operations
pub type FlashResult<T> = Result<T, FlashError>;

/// Result type for collaborator (toolchain) operations
pub type ToolchainResult<T> = Result<T, ToolchainError>;

/// Errors raised by the orchestrator itself.
///
/// Every variant except [`FlashError::Collaborator`] is raised before any
/// file is written or any device session is opened.
#[derive(Debug, Error)]
pub enum FlashError {
    /// `--block` and `--infile` were supplied a different number of times
    #[error("You must specify a block for every infile ({blocks} blocks, {files} files)")]
    PairingCountMismatch { blocks: usize, files: usize },

    /// No input files at all
    #[error("No input file specified")]
    NoInputFiles,

    /// Identifier is neither a known block name nor a known block number
    #[error("Unknown block identifier: {0}")]
    UnknownBlockIdentifier(String),

    /// Input binary could not be opened or read
    #[error("Failed to read input file {}: {source}", path.display())]
    InputFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The same source path was supplied more than once
    #[error("Duplicate source path: {}", .0.display())]
    DuplicateSourcePath(PathBuf),

    /// A checksum, compression, encryption or transfer collaborator failed
    #[error("Pipeline failed: {0}")]
    Collaborator(#[from] ToolchainError),

    /// A transfer action was dispatched without a progress sink
    #[error("Action '{0}' requires a progress sink")]
    ProgressSinkRequired(Action),

    /// The static block table is not a bijection
    #[error("Block registry conflict: {0}")]
    RegistryConflict(String),
}

/// Errors reported by collaborators behind [`crate::BlockToolchain`]
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// Collaborator does not implement this pipeline
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Checksum validation or repair failed
    #[error("Checksum error on block {block}: {message}")]
    Checksum { block: u8, message: String },

    /// Key material is missing or malformed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Device transfer failed
    #[error("Transfer error: {0}")]
    Transfer(String),
}
