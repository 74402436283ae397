//! Application session state

pub mod state;

pub use state::{AuthenticatedSession, SessionState};
