//! Logging utilities with indicatif integration and an optional log-file copy

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use indicatif::MultiProgress;

/// ANSI color code and padded label for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Shared append handle for the log file.
type LogFile = Arc<Mutex<File>>;

fn open_log_file(path: &Path) -> io::Result<LogFile> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Arc::new(Mutex::new(file)))
}

fn append_line(file: &LogFile, line: &str) {
    // A poisoned lock only means another thread panicked mid-write.
    let mut f = match file.lock() {
        Ok(f) => f,
        Err(poisoned) => poisoned.into_inner(),
    };
    let _ = writeln!(f, "{line}");
}

/// Writer for the non-TTY path: stderr plus the log file.
struct Tee {
    file: LogFile,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        let mut f = match self.file.lock() {
            Ok(f) => f,
            Err(poisoned) => poisoned.into_inner(),
        };
        f.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        match self.file.lock() {
            Ok(mut f) => f.flush(),
            Err(poisoned) => poisoned.into_inner().flush(),
        }
    }
}

/// Logger that prints through indicatif MultiProgress to avoid mixing with progress bars.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
    file: Option<LogFile>,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self {
            inner,
            multi,
            file: None,
        }
    }

    fn with_file(mut self, file: LogFile) -> Self {
        self.file = Some(file);
        self
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            let (pre, label, post) = level_style(record.level(), true);
            let line = format!("[{pre}{label}{post}] {}", record.args());
            self.multi.suspend(|| eprintln!("{line}"));
            if let Some(file) = &self.file {
                let (_, label, _) = level_style(record.level(), false);
                append_line(file, &format!("[{label}] {}", record.args()));
            }
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Initialize logging with optional TTY mode (indicatif integration).
///
/// When `log_file` is given, every emitted line is also appended to it
/// (without colors).
pub fn init_logging(
    quiet: bool,
    debug: bool,
    multi: Option<&MultiProgress>,
    log_file: Option<&Path>,
) -> io::Result<()> {
    let default_level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let env = || env_logger::Env::default().default_filter_or(default_level);
    let file = log_file.map(open_log_file).transpose()?;

    if let Some(multi) = multi {
        let logger = env_logger::Builder::from_env(env())
            .format_timestamp_millis()
            .build();
        let max_level = logger.filter();

        let mut indicatif_logger = IndicatifLogger::new(logger, multi.clone());
        if let Some(file) = file {
            indicatif_logger = indicatif_logger.with_file(file);
        }
        log::set_boxed_logger(Box::new(indicatif_logger)).map_err(io::Error::other)?;
        log::set_max_level(max_level);
    } else {
        // Non-TTY: no ANSI colors, plain level prefix for log aggregation
        let mut builder = env_logger::Builder::from_env(env());
        builder.format(|buf, record| {
            let (_, label, _) = level_style(record.level(), false);
            writeln!(buf, "[{label}] {}", record.args())
        });
        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(Tee { file })));
        }
        builder.try_init().map_err(io::Error::other)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_labels_have_no_ansi() {
        let (pre, label, post) = level_style(log::Level::Warn, false);
        assert_eq!((pre, label, post), ("", "WARN ", ""));
    }

    #[test]
    fn tee_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gwaudit.log");
        let file = open_log_file(&path).unwrap();
        let mut tee = Tee { file: file.clone() };
        tee.write_all(b"[INFO ] hello\n").unwrap();
        tee.flush().unwrap();
        append_line(&file, "[WARN ] second");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "[INFO ] hello\n[WARN ] second\n");
    }
}
