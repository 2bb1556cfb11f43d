//! Campus CLI Library
//!
//! Opens a secure session with the Campus API server and issues calls over
//! it from the command line.

pub mod auth_cmd;
pub mod client;
pub mod server_cmd;
