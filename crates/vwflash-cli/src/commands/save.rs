//! Writing transformed blocks next to their inputs

use vwflash_core::{materialize, Action, BlockSet, MaterializationOutcome};

use crate::output::{OutputContext, WriteRow};

/// Persist a transformed block set if `--outfile` was given.
///
/// Per-file write failures are reported but do not fail the run. A skipped
/// write is already logged by [`materialize`].
pub fn save(
    blocks: &BlockSet,
    action: Action,
    outfile: bool,
    ctx: &OutputContext,
) -> MaterializationOutcome {
    let outcome = materialize(blocks, action, outfile);
    match &outcome {
        MaterializationOutcome::Skipped | MaterializationOutcome::NotApplicable => {}
        MaterializationOutcome::Written { written, failed } => {
            let mut rows: Vec<WriteRow> = written
                .iter()
                .map(|p| WriteRow {
                    path: p.display().to_string(),
                    status: "written".to_string(),
                })
                .collect();
            rows.extend(failed.iter().map(|f| WriteRow {
                path: f.path.display().to_string(),
                status: format!("failed: {}", f.error),
            }));
            ctx.print(&rows);

            if failed.is_empty() {
                ctx.success(&format!("Saved {} block(s)", written.len()));
            } else {
                ctx.error(&format!(
                    "{} of {} block(s) could not be written",
                    failed.len(),
                    written.len() + failed.len()
                ));
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use vwflash_core::BlockRecord;

    fn blocks(dir: &std::path::Path) -> BlockSet {
        BlockSet::from_records(vec![BlockRecord {
            source_path: dir.join("cal.bin"),
            block_number: 5,
            binary_data: b"data".to_vec(),
        }])
        .unwrap()
    }

    #[test]
    fn test_save_without_outfile_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = OutputContext::new(OutputFormat::Json, true, true);

        let outcome = save(&blocks(dir.path()), Action::ChecksumFix, false, &ctx);
        assert_eq!(outcome, MaterializationOutcome::Skipped);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_with_outfile() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = OutputContext::new(OutputFormat::Json, true, true);

        let outcome = save(&blocks(dir.path()), Action::Lzss, true, &ctx);
        assert!(!outcome.has_failures());
        let out = dir.path().join("cal.compressed_block5.bin");
        assert_eq!(std::fs::read(out).unwrap(), b"data");
    }
}
