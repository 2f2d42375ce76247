#[cfg(feature = "trace")]
use std::path::Path;
#[cfg(feature = "trace")]
use std::sync::Once;

#[cfg(feature = "trace")]
static INIT: Once = Once::new();

/// Route decoder spans and events to `gsd-trace.jsonl` under `log_dir`.
///
/// Only the first call has an effect. `RUST_LOG` overrides the default
/// filter.
#[cfg(feature = "trace")]
pub fn init_tracing(log_dir: &Path) {
    INIT.call_once(|| {
        let file_appender = tracing_appender::rolling::never(log_dir, "gsd-trace.jsonl");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // flushes on exit of the process, not of this scope
        std::mem::forget(guard);

        tracing_subscriber::fmt()
            .json()
            .with_writer(non_blocking)
            .with_target(true)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("gsd_engine=debug,gsd_core=debug")
                }),
            )
            .init();
    });
}

#[cfg(not(feature = "trace"))]
pub fn init_tracing(_log_dir: &std::path::Path) {}
