//! Collaborator trait for checksum, compression, encryption and transfer
//!
//! The orchestrator never computes checksums, compresses, encrypts or talks
//! to the ECU itself. It hands the block set to a [`BlockToolchain`] and
//! relays whatever comes back. Every method has a default that reports
//! [`ToolchainError::NotSupported`], so an implementation only provides the
//! pipelines it actually has.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::action::{ChecksumScheme, EcuFamily};
use crate::block::BlockSet;
use crate::error::{ToolchainError, ToolchainResult};
use crate::progress::ProgressRelay;

/// Result of a checksum inspection over a block set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumReport {
    pub family: EcuFamily,
    pub scheme: ChecksumScheme,
    pub entries: Vec<ChecksumEntry>,
}

impl ChecksumReport {
    /// True when every inspected block carries a valid checksum
    pub fn all_valid(&self) -> bool {
        self.entries.iter().all(|e| e.valid)
    }
}

/// Checksum status of one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumEntry {
    pub source_path: PathBuf,
    pub block_number: u8,
    /// Checksum stored in the block (hex)
    pub stored: String,
    /// Checksum computed over the block (hex)
    pub computed: String,
    pub valid: bool,
}

/// Result of a completed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    /// Number of blocks written to the ECU
    pub blocks_transferred: usize,
    /// Payload bytes sent
    pub bytes_transferred: u64,
}

/// The external pipelines the orchestrator dispatches to.
pub trait BlockToolchain {
    /// Validate checksums without modifying anything
    fn checksum(
        &self,
        blocks: &BlockSet,
        scheme: ChecksumScheme,
        family: EcuFamily,
    ) -> ToolchainResult<ChecksumReport> {
        let _ = (blocks, scheme, family);
        Err(ToolchainError::NotSupported("checksum".to_string()))
    }

    /// Return a new set with checksums recomputed and patched
    fn checksum_fix(
        &self,
        blocks: &BlockSet,
        scheme: ChecksumScheme,
        family: EcuFamily,
    ) -> ToolchainResult<BlockSet> {
        let _ = (blocks, scheme, family);
        Err(ToolchainError::NotSupported("checksum_fix".to_string()))
    }

    /// Return a new set with compressed payloads
    fn compress(&self, blocks: &BlockSet) -> ToolchainResult<BlockSet> {
        let _ = blocks;
        Err(ToolchainError::NotSupported("lzss".to_string()))
    }

    /// Return a new set with encrypted payloads
    fn encrypt(&self, blocks: &BlockSet) -> ToolchainResult<BlockSet> {
        let _ = blocks;
        Err(ToolchainError::NotSupported("encrypt".to_string()))
    }

    /// Return a new set ready for direct transfer
    fn prepare(&self, blocks: &BlockSet) -> ToolchainResult<BlockSet> {
        let _ = blocks;
        Err(ToolchainError::NotSupported("prepare".to_string()))
    }

    /// Prepare and transfer raw binaries, reporting through `progress`
    fn flash_raw(
        &self,
        blocks: &BlockSet,
        progress: &mut ProgressRelay<'_>,
    ) -> ToolchainResult<TransferOutcome> {
        let _ = (blocks, progress);
        Err(ToolchainError::NotSupported("flash_bin".to_string()))
    }

    /// Transfer already-prepared blocks, reporting through `progress`
    fn flash_prepared(
        &self,
        blocks: &BlockSet,
        progress: &mut ProgressRelay<'_>,
    ) -> ToolchainResult<TransferOutcome> {
        let _ = (blocks, progress);
        Err(ToolchainError::NotSupported("flash_prepared".to_string()))
    }
}
