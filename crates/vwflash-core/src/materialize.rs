//! Writing transformed block sets back to disk

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::action::Action;
use crate::block::BlockSet;

/// What happened when a block set was handed to [`materialize`]
#[derive(Debug, PartialEq, Eq)]
pub enum MaterializationOutcome {
    /// Output was not requested; nothing written
    Skipped,
    /// The action produces no files
    NotApplicable,
    /// One write attempted per block
    Written {
        written: Vec<PathBuf>,
        failed: Vec<WriteFailure>,
    },
}

impl MaterializationOutcome {
    /// True when at least one write failed
    pub fn has_failures(&self) -> bool {
        matches!(self, Self::Written { failed, .. } if !failed.is_empty())
    }
}

/// A single failed write. Other writes in the same run are unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Output filename for a block produced by `action`.
///
/// Returns `None` for actions that produce no files.
pub fn output_path(source: &Path, action: Action, block_number: u8) -> Option<PathBuf> {
    let tag = match action {
        Action::ChecksumFix | Action::ChecksumFixEcm3 => "checksummed_block",
        Action::Lzss => "compressed_block",
        Action::Prepare => "prepared_block",
        Action::Encrypt => {
            let mut name = source.as_os_str().to_owned();
            name.push(format!(".flashable_block{}", block_number));
            return Some(PathBuf::from(name));
        }
        Action::Checksum
        | Action::ChecksumEcm3
        | Action::FlashBin
        | Action::FlashPrepared => return None,
    };

    let stem = if source.extension() == Some(OsStr::new("bin")) {
        source.with_extension("")
    } else {
        source.to_path_buf()
    };
    let mut name = stem.into_os_string();
    name.push(format!(".{}{}.bin", tag, block_number));
    Some(PathBuf::from(name))
}

/// Persist every block of `blocks` under its derived output name.
///
/// When `write_requested` is false nothing is written and a warning is
/// logged. Each write is independent: a failure is recorded and the
/// remaining blocks are still written. Empty payloads produce empty files.
/// A block whose output name was already produced by an earlier block is
/// recorded as failed instead of overwriting that file.
pub fn materialize(blocks: &BlockSet, action: Action, write_requested: bool) -> MaterializationOutcome {
    if !action.produces_blocks() {
        return MaterializationOutcome::NotApplicable;
    }
    if !write_requested {
        warn!("Outfile not specified, files not saved!!");
        return MaterializationOutcome::Skipped;
    }

    let mut written = Vec::with_capacity(blocks.len());
    let mut failed = Vec::new();
    let mut claimed = HashSet::with_capacity(blocks.len());

    for record in blocks {
        let Some(path) = output_path(&record.source_path, action, record.block_number) else {
            continue;
        };

        if !claimed.insert(path.clone()) {
            error!(
                path = %path.display(),
                source = %record.source_path.display(),
                "Output path already written by another block"
            );
            failed.push(WriteFailure {
                path,
                error: format!(
                    "output name collides with an earlier block; {} not written",
                    record.source_path.display()
                ),
            });
            continue;
        }

        info!(path = %path.display(), block = record.block_number, "Writing block");
        match std::fs::write(&path, &record.binary_data) {
            Ok(()) => written.push(path),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to write block");
                failed.push(WriteFailure {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }

    MaterializationOutcome::Written { written, failed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockRecord;

    fn out(source: &str, action: Action, n: u8) -> Option<String> {
        output_path(Path::new(source), action, n).map(|p| p.to_string_lossy().into_owned())
    }

    #[test]
    fn test_repair_naming() {
        assert_eq!(
            out("foo.bin", Action::ChecksumFix, 5).as_deref(),
            Some("foo.checksummed_block5.bin")
        );
        assert_eq!(
            out("/data/fw/foo.bin", Action::ChecksumFixEcm3, 5).as_deref(),
            Some("/data/fw/foo.checksummed_block5.bin")
        );
    }

    #[test]
    fn test_encrypt_naming_keeps_extension() {
        assert_eq!(
            out("bar.bin", Action::Encrypt, 2).as_deref(),
            Some("bar.bin.flashable_block2")
        );
    }

    #[test]
    fn test_only_real_suffix_stripped() {
        // "cabin.bin" must keep "cabin", not lose every trailing b/i/n/.
        assert_eq!(
            out("cabin.bin", Action::ChecksumFix, 1).as_deref(),
            Some("cabin.checksummed_block1.bin")
        );
        assert_eq!(
            out("image.hex", Action::Lzss, 3).as_deref(),
            Some("image.hex.compressed_block3.bin")
        );
        assert_eq!(
            out("cal.bin", Action::Prepare, 5).as_deref(),
            Some("cal.prepared_block5.bin")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_preserved() {
        use std::os::unix::ffi::OsStrExt;

        let source = Path::new(OsStr::from_bytes(b"/tmp/fw\xff.bin"));
        assert_eq!(
            output_path(source, Action::ChecksumFix, 5).unwrap().as_os_str(),
            OsStr::from_bytes(b"/tmp/fw\xff.checksummed_block5.bin")
        );
        assert_eq!(
            output_path(source, Action::Encrypt, 5).unwrap().as_os_str(),
            OsStr::from_bytes(b"/tmp/fw\xff.bin.flashable_block5")
        );
    }

    #[test]
    fn test_colliding_outputs_not_overwritten() {
        let dir = tempfile::TempDir::new().unwrap();
        let with_ext = dir.path().join("foo.bin");
        let bare = dir.path().join("foo");
        let blocks = BlockSet::from_records(vec![
            BlockRecord {
                source_path: with_ext,
                block_number: 5,
                binary_data: b"AAAA".to_vec(),
            },
            BlockRecord {
                source_path: bare,
                block_number: 5,
                binary_data: b"BBBB".to_vec(),
            },
        ])
        .unwrap();

        let target = dir.path().join("foo.checksummed_block5.bin");
        match materialize(&blocks, Action::ChecksumFix, true) {
            MaterializationOutcome::Written { written, failed } => {
                assert_eq!(written, vec![target.clone()]);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].path, target);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(std::fs::read(&target).unwrap(), b"AAAA");
    }

    #[test]
    fn test_report_actions_have_no_output() {
        for action in [
            Action::Checksum,
            Action::ChecksumEcm3,
            Action::FlashBin,
            Action::FlashPrepared,
        ] {
            assert_eq!(out("a.bin", action, 1), None);
        }
    }

    #[test]
    fn test_skipped_and_not_applicable() {
        let blocks = BlockSet::default();
        assert_eq!(
            materialize(&blocks, Action::ChecksumFix, false),
            MaterializationOutcome::Skipped
        );
        assert_eq!(
            materialize(&blocks, Action::Checksum, true),
            MaterializationOutcome::NotApplicable
        );
    }
}
