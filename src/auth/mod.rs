//! Authentication Flows
//!
//! Thin flows over the backend platform's auth service:
//!
//! - **callback**: authorization code → session → redirect
//! - **session**: session guard for authenticated pages
//! - **signup**: account creation plus profile row
//!
//! Credentials and sessions are owned by the platform; nothing here stores
//! or verifies them.

mod callback;
mod password;
mod profile;
mod session;
mod signup;

pub use callback::{complete_sign_in, CallbackOutcome};
pub use profile::{Profile, USERS_TABLE};
pub use session::{access_token, check_session, session_cookie, GuardDecision};
pub use signup::{Registration, SignUpError, SignUpRequest, SignUpService};
