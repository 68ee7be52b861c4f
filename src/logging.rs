//! Logger setup: stderr always, plus an optional append-only log file

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Writer that duplicates every write to two sinks
#[derive(Debug)]
pub struct TeeWriter<A, B> {
    primary: A,
    secondary: B,
}

impl<A: Write, B: Write> TeeWriter<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }

    pub fn into_inner(self) -> (A, B) {
        (self.primary, self.secondary)
    }
}

impl<A: Write, B: Write> Write for TeeWriter<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.primary.write_all(buf)?;
        self.secondary.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()?;
        self.secondary.flush()
    }
}

/// Build the logger without installing it
///
/// The default filter is `info`, or `debug` when `verbose` is set; `RUST_LOG`
/// overrides both. With `log_file`, records are appended to that file as well
/// as written to stderr.
///
/// # Errors
///
/// Returns the I/O error if the log file cannot be opened for appending.
pub fn builder(verbose: bool, log_file: Option<&Path>) -> io::Result<env_logger::Builder> {
    let default_filter = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(TeeWriter::new(
            io::stderr(),
            file,
        ))));
    }

    Ok(builder)
}

/// Install the global logger
pub fn init(verbose: bool, log_file: Option<&Path>) -> io::Result<()> {
    builder(verbose, log_file)?.init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_tee_writer_duplicates_output() {
        let mut tee = TeeWriter::new(Vec::new(), Vec::new());
        write!(tee, "relay {}", "started").unwrap();
        tee.flush().unwrap();

        let (first, second) = tee.into_inner();
        assert_eq!(first, b"relay started");
        assert_eq!(second, b"relay started");
    }

    #[test]
    fn test_log_file_receives_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ddgo.log");

        let logger = builder(false, Some(&path)).unwrap().build();
        logger.log(
            &log::Record::builder()
                .args(format_args!("send to webhook"))
                .level(log::Level::Info)
                .target("ddgo")
                .build(),
        );
        logger.flush();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("send to webhook"));
    }

    #[test]
    fn test_log_file_is_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ddgo.log");
        fs::write(&path, "earlier line\n").unwrap();

        builder(false, Some(&path)).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "earlier line\n");
    }

    #[test]
    fn test_unopenable_log_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("ddgo.log");

        assert!(builder(false, Some(&path)).is_err());
    }
}
