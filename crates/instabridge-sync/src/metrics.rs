// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; with no recorder installed every call is a
//! no-op.

use metrics::describe_counter;

/// Register all Instabridge metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "instabridge_identity_fallback_total",
        "Identity resolutions that fell back to a heuristic"
    );
    describe_counter!(
        "instabridge_sync_messages_total",
        "Messages handled by conversation sync"
    );
    describe_counter!("instabridge_sync_runs_total", "Conversation sync runs");
    describe_counter!(
        "instabridge_webhook_events_total",
        "Webhook message events handled"
    );
}

/// Record a low-confidence identity decision (`neither_party`, `first_participant`).
pub fn record_identity_fallback(kind: &'static str) {
    metrics::counter!("instabridge_identity_fallback_total", "kind" => kind).increment(1);
}

/// Record sync message counts by outcome (`synced`, `skipped`, `failed`).
pub fn record_sync_messages(outcome: &'static str, count: usize) {
    metrics::counter!("instabridge_sync_messages_total", "outcome" => outcome)
        .increment(count as u64);
}

/// Record a finished sync run (`ok`, `degraded`, `empty`, `failed`).
pub fn record_sync_run(status: &'static str) {
    metrics::counter!("instabridge_sync_runs_total", "status" => status).increment(1);
}

/// Record webhook events by outcome (`stored`, `skipped`, `unrouted`, `failed`).
pub fn record_webhook_events(outcome: &'static str, count: usize) {
    metrics::counter!("instabridge_webhook_events_total", "outcome" => outcome)
        .increment(count as u64);
}
