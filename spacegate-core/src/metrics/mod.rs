/*
    Metrics - Access control and notification counters

    Provides counters for:
    - Access decisions on every entry path (password/email, magic link)
    - Magic-link issuance and redemption results
    - Notification emails sent, suppressed or failed
    - Credential integrity failures (tampered or foreign-key blobs)

    Recording is a no-op until the host process installs a recorder.
*/

use metrics::{counter, describe_counter};

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    describe_counter!(
        "spacegate_access_decisions_total",
        "External access decisions, labeled by path (direct, magic_link) and result (granted, or the deny reason)"
    );

    describe_counter!(
        "spacegate_magic_links_issued_total",
        "Magic links issued to stakeholder emails"
    );

    describe_counter!(
        "spacegate_magic_link_redemptions_total",
        "Magic-link redemption attempts, labeled by result (redeemed, invalid, lost_race)"
    );

    describe_counter!(
        "spacegate_notification_emails_total",
        "Notification emails, labeled by result (sent, suppressed, failed, skipped)"
    );

    describe_counter!(
        "spacegate_credential_integrity_failures_total",
        "Stored credentials that failed authentication on decrypt"
    );
}

/// Record an access decision
pub fn access_decision(path: &'static str, result: &'static str) {
    counter!("spacegate_access_decisions_total", "path" => path, "result" => result).increment(1);
}

/// Record an issued magic link
pub fn magic_link_issued() {
    counter!("spacegate_magic_links_issued_total").increment(1);
}

/// Record a magic-link redemption attempt
pub fn magic_link_redemption(result: &'static str) {
    counter!("spacegate_magic_link_redemptions_total", "result" => result).increment(1);
}

/// Record a notification email outcome
pub fn notification_email(result: &'static str) {
    counter!("spacegate_notification_emails_total", "result" => result).increment(1);
}

/// Record a credential that failed authentication
pub fn credential_integrity_failure() {
    counter!("spacegate_credential_integrity_failures_total").increment(1);
}
