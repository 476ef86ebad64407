//! Checksum report rendering

use vwflash_core::{BlockRegistry, ChecksumReport};

use crate::output::{ChecksumRow, OutputContext};

/// Show the result of a checksum inspection
pub fn checksum_report(report: &ChecksumReport, registry: &BlockRegistry, ctx: &OutputContext) {
    let rows: Vec<ChecksumRow> = report
        .entries
        .iter()
        .map(|e| ChecksumRow {
            file: e.source_path.display().to_string(),
            block: match registry.name_of(e.block_number) {
                Ok(name) => format!("{} ({})", e.block_number, name),
                Err(_) => e.block_number.to_string(),
            },
            stored: e.stored.clone(),
            computed: e.computed.clone(),
            valid: if e.valid { "yes" } else { "NO" }.to_string(),
        })
        .collect();

    ctx.print(&rows);

    let invalid = report.entries.iter().filter(|e| !e.valid).count();
    if invalid == 0 {
        ctx.success(&format!(
            "All {} block(s) passed {:?} checksum ({})",
            report.entries.len(),
            report.scheme,
            report.family
        ));
    } else {
        ctx.warn(&format!(
            "{} of {} block(s) failed checksum validation",
            invalid,
            report.entries.len()
        ));
    }
}
