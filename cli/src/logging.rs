//! Logging setup. Logs go to stderr, or to `LOG_FILE` when set, so stdout only
//! carries the answer.
//!
//! - **RUST_LOG**: filter, e.g. `info`, `bats=debug`. Default `info` (`debug` with `-v`).
//! - **LOG_FILE**: append plain text (ANSI stripped) to this file instead of stderr.

use std::io::Write;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::log_format::SessionLines;

fn filter(verbose: bool) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        tracing_subscriber::EnvFilter::new(format!("{},hyper_util=off,reqwest=warn", level))
    })
}

pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(path) = std::env::var("LOG_FILE") {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let layer = tracing_subscriber::fmt::layer()
            .event_format(SessionLines::new())
            .with_writer(std::sync::Mutex::new(StripAnsiWriter::new(file)))
            .with_ansi(false)
            .with_filter(filter(verbose));
        tracing_subscriber::registry().with(layer).try_init()?;
        tracing::debug!(path = %path, "bats logging to file");
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .event_format(SessionLines::new())
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_filter(filter(verbose));
        tracing_subscriber::registry().with(layer).try_init()?;
    }
    Ok(())
}

/// Drops ANSI CSI sequences (`ESC [ ... final`) from everything written through it.
/// Other escapes pass through unchanged.
struct StripAnsiWriter<W> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: Write> StripAnsiWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            pending: Vec::with_capacity(16),
        }
    }

    fn flush_pending(&mut self) -> std::io::Result<()> {
        self.inner.write_all(&self.pending)?;
        self.pending.clear();
        Ok(())
    }
}

impl<W: Write> Write for StripAnsiWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut plain_from = 0;
        for (i, &b) in buf.iter().enumerate() {
            match self.pending.len() {
                0 if b == 0x1b => {
                    self.inner.write_all(&buf[plain_from..i])?;
                    self.pending.push(b);
                }
                0 => continue,
                1 if b == b'[' => self.pending.push(b),
                1 => {
                    self.pending.push(b);
                    self.flush_pending()?;
                }
                _ if (0x40..=0x7e).contains(&b) => self.pending.clear(),
                _ if b.is_ascii_digit() || matches!(b, b';' | b'?' | b':') => {
                    self.pending.push(b);
                    if self.pending.len() > 64 {
                        self.flush_pending()?;
                    }
                }
                _ => {
                    self.pending.push(b);
                    self.flush_pending()?;
                }
            }
            plain_from = i + 1;
        }
        if self.pending.is_empty() && plain_from < buf.len() {
            self.inner.write_all(&buf[plain_from..])?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.pending.is_empty() {
            self.flush_pending()?;
        }
        self.inner.flush()
    }
}
