use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("iron_llama.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("iron_llama.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("iron_llama.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("iron_llama.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("iron_llama.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("iron_llama.stream.bytes");
pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("iron_llama.stream.fragments");
pub(crate) static STREAM_SKIPPED: Counter = Counter::new("iron_llama.stream.skipped_events");

pub(crate) static SESSION_TURNS: Counter = Counter::new("iron_llama.session.turns");
pub(crate) static SESSION_TURN_ERRORS: Counter = Counter::new("iron_llama.session.turn_errors");
pub(crate) static SESSION_TURN_DURATION: Moments =
    Moments::new("iron_llama.session.turn_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_SKIPPED);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_TURN_ERRORS);
    collector.register_moments(&SESSION_TURN_DURATION);
}
