use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;

lazy_static! {
    pub static ref LONG_POLL_CYCLES: IntCounter =
        IntCounter::new("long_poll_cycles", "Completed long-poll cycles")
            .expect("metric can not be created");

    pub static ref LONG_POLL_FAILURES: IntCounter =
        IntCounter::new("long_poll_failures", "Long-poll cycles that ended in an error")
            .expect("metric can not be created");

    pub static ref CHANGED_KEYS: IntCounter =
        IntCounter::new("changed_keys", "Group keys reported as changed by the server")
            .expect("metric can not be created");

    pub static ref CONFIG_FETCH_FAILURES: IntCounter =
        IntCounter::new("config_fetch_failures", "Failed configuration fetches")
            .expect("metric can not be created");

    pub static ref LISTENER_INVOCATIONS: IntCounter =
        IntCounter::new("listener_invocations", "Listener callbacks invoked")
            .expect("metric can not be created");

    pub static ref LISTENER_FAILURES: IntCounter =
        IntCounter::new("listener_failures", "Listener callbacks that panicked")
            .expect("metric can not be created");

    pub static ref HEARTBEAT_RESULTS: IntCounterVec = IntCounterVec::new(
        Opts::new("heartbeat_results", "Heartbeat renewals by outcome"),
        &["outcome"]
    )
    .expect("Should succeed to create metric");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

/// Registers the client collectors with [`REGISTRY`]. Safe to call repeatedly.
pub fn register_custom_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(LONG_POLL_CYCLES.clone()),
            Box::new(LONG_POLL_FAILURES.clone()),
            Box::new(CHANGED_KEYS.clone()),
            Box::new(CONFIG_FETCH_FAILURES.clone()),
            Box::new(LISTENER_INVOCATIONS.clone()),
            Box::new(LISTENER_FAILURES.clone()),
            Box::new(HEARTBEAT_RESULTS.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                error!("collector can not be registered: {}", e);
            }
        }
    });
}

/// Renders every registered metric in the Prometheus text format.
pub fn gather() -> String {
    register_custom_metrics();

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
        return String::default();
    }
    String::from_utf8(buffer).unwrap_or_else(|e| {
        error!("custom metrics could not be from_utf8'd: {}", e);
        String::default()
    })
}
