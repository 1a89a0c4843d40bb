use std::sync::Once;

use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

static INIT: Once = Once::new();

/// Initialize logging.  If you set the environment variable `RUST_LOG` to a
/// non-empty value we install a compact fmt layer filtered by it; otherwise
/// nothing is installed and the `tracing` macros are no-ops.
///
/// All of our binaries print their actual results on stdout, so log output
/// goes to stderr to keep the two separable.  Safe to call more than once.
pub fn init_logging() {
    INIT.call_once(|| {
        // Our wrapper shell scripts frequently set RUST_LOG unconditionally
        // but potentially with an empty value, and we don't want that to be
        // interpreted as a desire to enable logging.
        let rustlog = match std::env::var("RUST_LOG") {
            Ok(rustlog) if !rustlog.is_empty() => rustlog,
            _ => return,
        };
        let env_filter = match EnvFilter::try_new(&rustlog) {
            Ok(filter) => filter,
            Err(err) => {
                eprintln!("Ignoring unparseable RUST_LOG {:?}: {}", rustlog, err);
                return;
            }
        };

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
            .compact()
            // These tools mostly run under cron or get pasted into tickets,
            // so ANSI isn't helpful.
            .with_ansi(false)
            .without_time()
            .with_filter(env_filter);

        // Someone else (a test harness, say) may already own the global
        // subscriber, in which case we defer to them.
        let _ = Registry::default().with(layer).try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_reentrant() {
        init_logging();
        init_logging();
        tracing::info!("still alive");
    }
}
