//! External access control
//!
//! Decides whether an anonymous or semi-identified visitor may enter a
//! space and hands admitted visitors to the session layer.
//!
//! - [`evaluator`]: the admit/deny policy over a space's access settings
//! - [`token`]: single-use magic-link tokens
//! - [`session`]: session manager contract and an in-memory implementation
//! - [`service`]: [`AccessService`], the entry points used by the web layer

pub mod error;
pub mod evaluator;
pub mod password;
pub mod service;
pub mod session;
pub mod signing;
pub mod token;

pub use error::{AccessError, AccessResult};
pub use evaluator::{
    evaluate, AccessCredentials, AccessDecision, AccessPolicy, Admission, DenyCategory,
    DenyReason, VisitorIdentity,
};
pub use password::{hash_password, verify_password, PasswordError};
pub use service::{AccessGrant, AccessOutcome, AccessPrompt, AccessService, LinkRequestOutcome};
pub use session::{InMemorySessionManager, SessionCredential, SessionError, SessionManager};
pub use signing::{PublicUrlProvider, SignError, SignedUrlProvider};
pub use token::{AccessToken, IssuedToken, RawToken, TokenIssuer, TokenValidator};
