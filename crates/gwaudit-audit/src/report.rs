//! CSV report writer

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use gwaudit_core::fmt_num;

use crate::records::Report;

const BUFFER_SIZE: usize = 64 * 1024;

/// Write `records` to `path` with `R`'s header row.
///
/// The header is written even when there are no records.
pub fn write_report<R: Report>(path: &Path, records: &[R]) -> Result<usize> {
    let start = Instant::now();
    log::info!(
        "Writing {} rows to {}",
        fmt_num(records.len()),
        path.display()
    );

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;
    let mut writer: Writer<BufWriter<File>> = WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::with_capacity(BUFFER_SIZE, file));

    writer
        .write_record(R::HEADERS)
        .with_context(|| format!("Failed to write header to {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    log::info!(
        "Finished writing {} in {:.1}s",
        path.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(records.len())
}
