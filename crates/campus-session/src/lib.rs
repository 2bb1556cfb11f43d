//! Campus secure session layer
//!
//! Establishes an authenticated session with the Campus API server and
//! carries every subsequent call inside a session envelope.
//!
//! - [`transport`] decides whether the connection is already confidential
//! - [`handshake`] obtains a session id and key, encrypted to a fresh RSA key
//!   when the transport is not confidential
//! - [`state`] holds the established session, shared by reference
//! - [`dispatcher`] wraps calls in the envelope, encrypting with AES-256-CBC
//!   when needed
//! - [`auth`] signs users in over an established session

pub mod auth;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod handshake;
pub mod http;
pub mod state;
pub mod transport;

pub use auth::{SessionCredential, SignInError, check_token, sign_in};
pub use dispatcher::Dispatcher;
pub use error::{ErrorKind, SessionError};
pub use handshake::{Handshake, HandshakePhase};
pub use http::HttpTransport;
pub use state::{EstablishedSession, SessionContext, SessionState};
pub use transport::{TransportSecurity, is_secure};
