#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! Test setup shared by the opjson crates: a process-wide tracing
//! subscriber and helpers for checking encoder output with an independent
//! JSON decoder.

use std::sync::LazyLock;
use std::time::Instant;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

struct Uptime;

impl FormatTime for Uptime {
    fn format_time(&self, w: &mut Writer<'_>) -> core::fmt::Result {
        let elapsed = START_TIME.elapsed();
        write!(w, "{:4}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis())
    }
}

/// The subscriber is installed once per process, however many tests run.
static SUBSCRIBER_INIT: LazyLock<()> = LazyLock::new(|| {
    let _ = *START_TIME;

    // e.g. OPJSON_LOG=opjson::cache=debug
    let filter = std::env::var("OPJSON_LOG")
        .ok()
        .and_then(|s| s.parse::<Targets>().ok())
        .unwrap_or_else(|| Targets::new().with_default(tracing::Level::DEBUG));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_timer(Uptime)
                .with_target(true)
                .with_level(true)
                .with_test_writer()
                .compact(),
        )
        .with(filter)
        .try_init()
        .ok();
});

/// Set up a tracing subscriber for tests.
pub fn setup() {
    #[allow(clippy::let_unit_value)]
    let _ = *SUBSCRIBER_INIT;
}

/// Decode encoder output with `serde_json`, panicking with the raw text if
/// it is not valid JSON.
#[track_caller]
pub fn decode(bytes: &[u8]) -> serde_json::Value {
    match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(err) => panic!(
            "output is not valid JSON ({err}): {}",
            String::from_utf8_lossy(bytes)
        ),
    }
}

/// Assert that encoder output is valid JSON equal to `expected`.
///
/// Comparison is structural, so object key order in `expected` is free.
#[track_caller]
pub fn assert_json_eq(actual: &[u8], expected: serde_json::Value) {
    let decoded = decode(actual);
    assert_eq!(
        decoded,
        expected,
        "encoded: {}",
        String::from_utf8_lossy(actual)
    );
}

/// An error type that panics when it's built (such as when you use `?`
/// to coerce to it)
#[derive(Debug)]
pub struct IPanic;

impl<E> From<E> for IPanic
where
    E: core::error::Error + Send + Sync,
{
    #[track_caller]
    fn from(value: E) -> Self {
        panic!("from: {}: {value}", core::panic::Location::caller())
    }
}
