//! Test utilities shared by unit and integration tests
//!
//! A manual clock, recording doubles for the mailer, session manager and
//! URL signer, and a harness that wires them around a real store.

pub mod clock;
pub mod doubles;
pub mod fixtures;

pub use clock::ManualClock;
pub use doubles::{FailingUrlSigner, MemoryMailer, RecordingSessionManager, SentMail, StaticUrlSigner};
pub use fixtures::{test_cipher, test_sealer, PortalHarness, TestSpaceBuilder, TEST_CREDENTIAL_KEY};
