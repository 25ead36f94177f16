//! Request context shared across layers: the authenticated principal.
//!
//! Authentication itself is an external concern. `dev_auth` is a stand-in
//! used by the demo binary and tests.

pub mod principal;

pub use principal::{dev_auth, principal_of, ROLE_HEADER, USER_HEADER};
