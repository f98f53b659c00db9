// Logging setup
// env_logger to stdout, optionally mirrored into a per-user log file

use anyhow::{Context, Result};
use log::Level;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Writes everything to stdout and to a file
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}

/// Log file name for a monitored user
pub fn log_file_name(user: &str) -> String {
    format!("lastfm_monitor_{}.log", user)
}

/// Initialize logging. Level defaults to info and follows RUST_LOG.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    builder.format(|buf, record| match record.level() {
        Level::Info => writeln!(buf, "{}", record.args()),
        level => writeln!(buf, "{}: {}", level, record.args()),
    });

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {:?}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(Tee { file })));
    } else {
        builder.target(env_logger::Target::Stdout);
    }

    builder.try_init().context("Failed to initialize logger")?;
    Ok(())
}
