//! Fan-out trigger service
//!
//! Every `GET /` launches a detached burst of outbound GET requests against a
//! configured target and answers "OK" immediately.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod transport;
pub mod worker;
