use std::sync::OnceLock;

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

static REGISTRY: OnceLock<Registry> = OnceLock::new();
static BOOKINGS_CREATED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static WEBHOOK_EVENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Register the crate's counters. Safe to call more than once; later calls
/// are no-ops. Recording before initialization is a no-op, so library users
/// that do not scrape metrics pay nothing.
pub fn init_metrics() {
    let registry = REGISTRY.get_or_init(Registry::new);

    let bookings_created = IntCounterVec::new(
        Opts::new("bookings_created_total", "Bookings created by supplier"),
        &["supplier_id"],
    )
    .expect("Failed to create bookings_created_total metric");
    if BOOKINGS_CREATED_TOTAL.set(bookings_created.clone()).is_ok() {
        registry
            .register(Box::new(bookings_created))
            .expect("Failed to register bookings_created_total");
    }

    let webhook_events = IntCounterVec::new(
        Opts::new(
            "payment_webhook_events_total",
            "Payment webhook events by processor and outcome",
        ),
        &["processor", "outcome"],
    )
    .expect("Failed to create payment_webhook_events_total metric");
    if WEBHOOK_EVENTS_TOTAL.set(webhook_events.clone()).is_ok() {
        registry
            .register(Box::new(webhook_events))
            .expect("Failed to register payment_webhook_events_total");
    }
}

pub fn record_booking_created(supplier_id: &str) {
    if let Some(counter) = BOOKINGS_CREATED_TOTAL.get() {
        counter.with_label_values(&[supplier_id]).inc();
    }
}

pub fn record_webhook_event(processor: &str, outcome: &str) {
    if let Some(counter) = WEBHOOK_EVENTS_TOTAL.get() {
        counter.with_label_values(&[processor, outcome]).inc();
    }
}

/// Render the registered metrics in Prometheus text format.
pub fn render() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized\n".to_string();
    };

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer).ok();
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_once_and_render() {
        init_metrics();
        init_metrics();

        record_booking_created("karoo-lodges");
        record_webhook_event("payfast", "applied");

        let rendered = render();
        assert!(rendered.contains("bookings_created_total"));
        assert!(rendered.contains("payment_webhook_events_total"));
    }
}
