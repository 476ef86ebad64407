//! Pipeline dispatch
//!
//! Maps an [`Action`] to exactly one collaborator call and assembles the
//! context it needs (checksum scheme, ECU family, progress relay, transfer
//! manifest). Collaborator failures are passed through untouched.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::action::{Action, ChecksumScheme, DispatchOptions};
use crate::block::BlockSet;
use crate::error::{FlashError, FlashResult};
use crate::progress::{ProgressRelay, ProgressSink};
use crate::registry::BlockRegistry;
use crate::toolchain::{BlockToolchain, ChecksumReport, TransferOutcome};

/// What a pipeline produced
#[derive(Debug)]
pub enum PipelineResult {
    /// Read-only inspection
    Report(ChecksumReport),
    /// New payloads, ready to materialize
    Transformed(BlockSet),
    /// Device transfer finished
    Transfer(TransferReport),
}

/// Transfer result together with the manifest logged before it started
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReport {
    pub manifest: TransferManifest,
    pub outcome: TransferOutcome,
    /// Last percentage the relay observed
    pub final_percent: f64,
}

/// Human-readable listing of the blocks about to be flashed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferManifest {
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub source_path: PathBuf,
    pub block_number: u8,
    pub block_name: String,
    /// Bytes at the block's registered version range, decoded lossily
    pub software_version: String,
}

impl std::fmt::Display for TransferManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, e) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{} : {} : {} : {}",
                e.source_path.display(),
                e.block_number,
                e.block_name,
                e.software_version
            )?;
        }
        Ok(())
    }
}

/// Selects and runs one pipeline per call
pub struct Orchestrator<'r, T> {
    registry: &'r BlockRegistry,
    toolchain: T,
}

impl<'r, T: BlockToolchain> Orchestrator<'r, T> {
    pub fn new(registry: &'r BlockRegistry, toolchain: T) -> Self {
        Self {
            registry,
            toolchain,
        }
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Run the pipeline for `action` over `blocks`.
    ///
    /// Transfer actions require `sink`; they fail with
    /// [`FlashError::ProgressSinkRequired`] before anything is sent otherwise.
    pub fn dispatch(
        &self,
        action: Action,
        blocks: &BlockSet,
        options: &DispatchOptions,
        sink: Option<&mut dyn ProgressSink>,
    ) -> FlashResult<PipelineResult> {
        info!(%action, blocks = blocks.len(), family = %options.family, "Dispatching");

        let tc = &self.toolchain;
        let result = match action {
            Action::Checksum => {
                PipelineResult::Report(tc.checksum(blocks, ChecksumScheme::Standard, options.family)?)
            }
            Action::ChecksumFix => PipelineResult::Transformed(tc.checksum_fix(
                blocks,
                ChecksumScheme::Standard,
                options.family,
            )?),
            Action::ChecksumEcm3 => {
                PipelineResult::Report(tc.checksum(blocks, ChecksumScheme::Ecm3, options.family)?)
            }
            Action::ChecksumFixEcm3 => PipelineResult::Transformed(tc.checksum_fix(
                blocks,
                ChecksumScheme::Ecm3,
                options.family,
            )?),
            Action::Lzss => PipelineResult::Transformed(tc.compress(blocks)?),
            Action::Encrypt => PipelineResult::Transformed(tc.encrypt(blocks)?),
            Action::Prepare => PipelineResult::Transformed(tc.prepare(blocks)?),
            Action::FlashBin | Action::FlashPrepared => {
                let sink = sink.ok_or(FlashError::ProgressSinkRequired(action))?;
                PipelineResult::Transfer(self.transfer(action, blocks, sink)?)
            }
        };

        Ok(result)
    }

    fn transfer(
        &self,
        action: Action,
        blocks: &BlockSet,
        sink: &mut dyn ProgressSink,
    ) -> FlashResult<TransferReport> {
        let manifest = self.manifest(blocks)?;
        info!(
            "Executing {} with the following blocks:\n{}",
            action, manifest
        );

        let mut relay = ProgressRelay::new(sink);
        let outcome = match action {
            Action::FlashPrepared => self.toolchain.flash_prepared(blocks, &mut relay)?,
            _ => self.toolchain.flash_raw(blocks, &mut relay)?,
        };
        let final_percent = relay.finish();

        info!(
            blocks = outcome.blocks_transferred,
            bytes = outcome.bytes_transferred,
            "Transfer complete"
        );

        Ok(TransferReport {
            manifest,
            outcome,
            final_percent,
        })
    }

    /// Build the manifest for `blocks` from registry metadata.
    ///
    /// Version ranges that run past the end of a payload are truncated.
    pub fn manifest(&self, blocks: &BlockSet) -> FlashResult<TransferManifest> {
        let entries = blocks
            .iter()
            .map(|record| {
                let n = record.block_number;
                let range = self.registry.version_offset_of(n)?;
                let len = record.binary_data.len();
                let slice = &record.binary_data[range.start.min(len)..range.end.min(len)];
                Ok(ManifestEntry {
                    source_path: record.source_path.clone(),
                    block_number: n,
                    block_name: self.registry.name_of(n)?.to_string(),
                    software_version: String::from_utf8_lossy(slice).into_owned(),
                })
            })
            .collect::<FlashResult<Vec<_>>>()?;

        Ok(TransferManifest { entries })
    }
}
