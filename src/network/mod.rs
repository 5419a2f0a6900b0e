//! Transport Binding
//!
//! WebSocket front for the relay. The transport is deliberately thin: it
//! parses inbound JSON into the tagged event union, hands events to the
//! gateway with a per-connection principal, and pipes topic broadcasts
//! back to subscribed sockets. Authentication and token issuance live in
//! external collaborators.

pub mod server;

pub use server::{RelayServer, RelayServerError};
