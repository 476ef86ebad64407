//! vwflash-core - Block-set orchestration for ECU reflashing
//!
//! Resolves block identifiers, pairs them with input binaries, dispatches the
//! resulting block set to one checksum, compression, encryption, preparation
//! or transfer pipeline, and writes transformed blocks back to disk.
//!
//! ```rust,no_run
//! use vwflash_core::{
//!     materialize, Action, BlockInput, BlockRegistry, BlockSet, DispatchOptions,
//!     LoopbackToolchain, Orchestrator, PipelineResult,
//! };
//!
//! let registry = BlockRegistry::simos18()?;
//! let inputs = BlockInput::pair(vec!["cal.bin".into()], vec!["CAL".into()])?;
//! let blocks = BlockSet::build(&registry, inputs)?;
//!
//! let orchestrator = Orchestrator::new(&registry, LoopbackToolchain::default());
//! let options = DispatchOptions::default();
//! if let PipelineResult::Transformed(fixed) =
//!     orchestrator.dispatch(Action::ChecksumFix, &blocks, &options, None)?
//! {
//!     materialize(&fixed, Action::ChecksumFix, true);
//! }
//! # Ok::<(), vwflash_core::FlashError>(())
//! ```

pub mod action;
pub mod block;
pub mod dispatch;
pub mod error;
pub mod loopback;
pub mod materialize;
pub mod progress;
pub mod registry;
pub mod toolchain;

pub use action::{Action, ChecksumScheme, DispatchOptions, EcuFamily};
pub use block::{BlockInput, BlockRecord, BlockSet};
pub use dispatch::{ManifestEntry, Orchestrator, PipelineResult, TransferManifest, TransferReport};
pub use error::{FlashError, FlashResult, ToolchainError, ToolchainResult};
pub use loopback::{CipherKey, LoopbackToolchain};
pub use materialize::{materialize, output_path, MaterializationOutcome, WriteFailure};
pub use progress::{ProgressEvent, ProgressRelay, ProgressSink};
pub use registry::{BlockDescriptor, BlockRegistry};
pub use toolchain::{BlockToolchain, ChecksumEntry, ChecksumReport, TransferOutcome};
