//! Spacegate: external access control and session issuance for shared
//! vendor/customer workspaces.
//!
//! - [`core_space`]: space access settings, allowlists and the lifecycle gate
//! - [`core_access`]: policy evaluation, magic links and session hand-off
//! - [`core_credentials`]: authenticated encryption for stored third-party secrets
//! - [`core_integrations`]: integration settings that use those secrets
//! - [`core_notify`]: mention/chat notifications and the email rate limiter
//! - [`core_store`]: SQLite-backed persistence

pub mod config;
pub mod core_access;
pub mod core_credentials;
pub mod core_integrations;
pub mod core_notify;
pub mod core_space;
pub mod core_store;
pub mod logging;
pub mod metrics;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Config;
pub use core_access::{AccessOutcome, AccessService};
pub use logging::{init_logging, LogLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Ensure the main exports are accessible
        let _ = LogLevel::Info;
        let _ = Config::default();
    }
}
