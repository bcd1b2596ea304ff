//! Event formatters for the wallet's log output.

use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

const CRATE_TARGET: &str = "hdwallet_keystore::";

/// Line-oriented formatter with local timestamps.
///
/// Output format: `YYYY-MM-DD HH:MM:SS | LEVEL | target | message`
///
/// # Example Output
/// ```text
/// 2026-01-15 10:30:45 | INFO  | wallet::wallet | wallet created address=0x2c75…
/// 2026-01-15 10:30:46 | DEBUG | wallet::keystore | keystore written path=…
/// ```
pub struct WalletFormatter;

impl<S, N> FormatEvent<S, N> for WalletFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now = chrono::Local::now();
        let metadata = event.metadata();

        write!(
            writer,
            "{} | {} | {} | ",
            now.format("%Y-%m-%d %H:%M:%S"),
            format_level(*metadata.level()),
            short_target(metadata.target())
        )?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Format log level with fixed width for alignment
fn format_level(level: Level) -> &'static str {
    match level {
        Level::TRACE => "TRACE",
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO ",
        Level::WARN => "WARN ",
        Level::ERROR => "ERROR",
    }
}

/// Drop the crate prefix from our own targets; leave dependencies untouched.
fn short_target(target: &str) -> &str {
    target.strip_prefix(CRATE_TARGET).unwrap_or(target)
}

/// Minimal formatter: `[LEVEL] message`. Used by the CLI.
pub struct CompactFormatter;

impl<S, N> FormatEvent<S, N> for CompactFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = event.metadata().level();

        write!(writer, "[{}] ", format_level(*level).trim())?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_format_level() {
        assert_eq!(format_level(Level::TRACE), "TRACE");
        assert_eq!(format_level(Level::DEBUG), "DEBUG");
        assert_eq!(format_level(Level::INFO), "INFO ");
        assert_eq!(format_level(Level::WARN), "WARN ");
        assert_eq!(format_level(Level::ERROR), "ERROR");
    }

    #[test]
    fn test_short_target() {
        assert_eq!(short_target("hdwallet_keystore::wallet::keystore"), "wallet::keystore");
        assert_eq!(short_target("reqwest::connect"), "reqwest::connect");
    }

    #[test]
    fn test_wallet_formatter_layout() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(WalletFormatter)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "hdwallet_keystore::wallet", "keystore written");
        });

        let line = capture.contents();
        let parts: Vec<&str> = line.trim_end().split(" | ").collect();
        assert_eq!(parts.len(), 4, "{line}");
        assert_eq!(parts[0].len(), "2026-01-15 10:30:45".len());
        assert_eq!(parts[1], "INFO ");
        assert_eq!(parts[2], "wallet");
        assert_eq!(parts[3], "keystore written");
    }

    #[test]
    fn test_compact_formatter_layout() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(CompactFormatter)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("unencrypted output");
        });

        assert_eq!(capture.contents(), "[WARN] unencrypted output\n");
    }
}
