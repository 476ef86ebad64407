//! Flash command - transfer blocks to the ECU with a progress bar

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use vwflash_core::{
    Action, BlockSet, BlockToolchain, DispatchOptions, Orchestrator, PipelineResult,
    ProgressEvent, ProgressSink, TransferReport,
};

use crate::output::{ManifestRow, OutputContext};

/// Progress bar that can only be advanced.
///
/// Deltas arrive as fractional percentages; the remainder below one whole
/// step is carried to the next update.
pub struct BarSink {
    pb: ProgressBar,
    carry: f64,
}

impl BarSink {
    pub fn new(pb: ProgressBar) -> Self {
        Self { pb, carry: 0.0 }
    }
}

impl ProgressSink for BarSink {
    fn advance(&mut self, delta: f64, event: &ProgressEvent) {
        self.carry += delta;
        let whole = self.carry.floor();
        if whole >= 1.0 {
            self.pb.inc(whole as u64);
            self.carry -= whole;
        }
        self.pb.set_message(event.status_message.clone());
    }
}

/// Run a transfer action and render its manifest and outcome
pub fn flash<T: BlockToolchain>(
    orchestrator: &Orchestrator<'_, T>,
    action: Action,
    blocks: &BlockSet,
    options: &DispatchOptions,
    ctx: &OutputContext,
) -> Result<TransferReport> {
    ctx.info(&format!(
        "Flashing {} block(s), {} bytes",
        blocks.len(),
        blocks.total_bytes()
    ));

    let pb = if ctx.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(100)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.green}] {pos}% {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    let mut sink = BarSink::new(pb.clone());
    let result = orchestrator.dispatch(action, blocks, options, Some(&mut sink));

    let report = match result {
        Ok(PipelineResult::Transfer(report)) => report,
        Ok(_) => {
            pb.abandon_with_message("Flash failed!");
            anyhow::bail!("Action '{}' did not produce a transfer result", action);
        }
        Err(e) => {
            pb.abandon_with_message("Flash failed!");
            return Err(e).context("Flash transfer failed");
        }
    };
    pb.finish_with_message("Complete!");

    let rows: Vec<ManifestRow> = report
        .manifest
        .entries
        .iter()
        .map(|e| ManifestRow {
            file: e.source_path.display().to_string(),
            block: e.block_number,
            name: e.block_name.clone(),
            version: e.software_version.clone(),
        })
        .collect();
    ctx.print(&rows);

    ctx.success(&format!(
        "\nFlashed {} block(s), {} bytes",
        report.outcome.blocks_transferred, report.outcome.bytes_transferred
    ));

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(msg: &str) -> ProgressEvent {
        ProgressEvent {
            phase: "TRANSFERRING".to_string(),
            status_message: msg.to_string(),
            percent_complete: 0.0,
        }
    }

    #[test]
    fn test_bar_sink_carries_fractions() {
        let pb = ProgressBar::hidden();
        pb.set_length(100);
        let mut sink = BarSink::new(pb.clone());

        sink.advance(2.5, &event("a"));
        assert_eq!(pb.position(), 2);
        sink.advance(2.5, &event("b"));
        assert_eq!(pb.position(), 5);
        sink.advance(45.0, &event("c"));
        sink.advance(50.0, &event("done"));
        assert_eq!(pb.position(), 100);
        assert_eq!(pb.message(), "done");
    }

    #[test]
    fn test_bar_sink_zero_delta() {
        let pb = ProgressBar::hidden();
        let mut sink = BarSink::new(pb.clone());
        sink.advance(0.0, &event("waiting"));
        assert_eq!(pb.position(), 0);
        assert_eq!(pb.message(), "waiting");
    }
}
