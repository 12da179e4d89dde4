//! Shared helpers for rascal's integration tests.

pub mod builders;
pub mod fake_executor;

use std::io;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use rascal::logging::LOG_ENV_VAR;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install the global test subscriber once per test binary.
///
/// Directives come from `RASCAL_LOG` (same variable as the binary), so
/// `RASCAL_LOG=rascal::scheduler=debug cargo test` narrows the output to
/// the scheduler. Output goes through the test writer and only shows up for
/// failing tests or with `--nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("rascal=info"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Buffer the plain-text log lines `f` emits at any level.
///
/// The subscriber is scoped to the current thread, so this is meant for
/// synchronous scheduler calls.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let value = tracing::subscriber::with_default(subscriber, f);
    (value, buffer.contents())
}

#[derive(Debug, Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Fail the test if `f` has not finished after five seconds. Runtime tests
/// use it so a missed exit condition shows up as a failure, not a hang.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("runtime did not finish within 5 seconds")
}
