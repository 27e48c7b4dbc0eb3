//! Report packaging: zip the reports directory and upload it

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::context::AuditContext;
use crate::source::ReportUploader;

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Regular, non-hidden files under `dir`, recursively, in sorted order.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<_>>()?;
    entries.sort();
    for path in entries {
        if is_hidden(&path) {
            log::debug!("Skipping file: {}", path.display());
        } else if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Zip `source_dir` into `destination`.
///
/// Entry names keep the directory's own name as their first component, so
/// the archive unpacks into a folder named like the reports directory.
pub fn zip_directory(source_dir: &Path, destination: &Path) -> Result<PathBuf> {
    let mut files = Vec::new();
    collect_files(source_dir, &mut files)
        .with_context(|| format!("Cannot walk {}", source_dir.display()))?;
    let root = source_dir.parent().unwrap_or(Path::new(""));

    let out = File::create(destination)
        .with_context(|| format!("Cannot create {}", destination.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(out));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let name = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        log::debug!("Zipping: {name}");
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("Cannot add {name} to archive"))?;
        let mut src =
            File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
        io::copy(&mut src, &mut zip).with_context(|| format!("Cannot compress {name}"))?;
    }
    zip.finish()
        .with_context(|| format!("Cannot finish {}", destination.display()))?;

    log::info!(
        "Archive created: {} ({} files)",
        destination.display(),
        files.len()
    );
    Ok(destination.to_path_buf())
}

/// `<reports_dir>.zip`
pub fn archive_path(reports_dir: &Path) -> PathBuf {
    let mut name = reports_dir.as_os_str().to_os_string();
    name.push(".zip");
    PathBuf::from(name)
}

/// Zip the run's reports and, when enabled, upload the archive.
pub async fn package<U: ReportUploader>(ctx: &AuditContext, uploader: &U) -> Result<PathBuf> {
    let start = Instant::now();
    let zip_path = zip_directory(&ctx.reports_dir, &archive_path(&ctx.reports_dir))?;
    if !ctx.upload {
        log::info!("Upload disabled, archive left at {}", zip_path.display());
        return Ok(zip_path);
    }

    let data =
        std::fs::read(&zip_path).with_context(|| format!("Cannot read {}", zip_path.display()))?;
    let name = zip_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reports.zip".to_string());
    let uploaded = uploader
        .upload_report(data, &name, &ctx.drive_folder)
        .await
        .context("Failed to upload reports archive")?;

    log::info!(
        "Uploaded file: file_id={} web_view_link={} file_size={}MB in {:.1}s",
        uploaded.id,
        uploaded.web_view_link,
        uploaded.size / 1024 / 1024,
        start.elapsed().as_secs_f64()
    );
    Ok(zip_path)
}
