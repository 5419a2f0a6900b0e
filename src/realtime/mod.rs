//! Realtime Message Layer
//!
//! The envelope model and tagged event unions (`protocol`), the topic
//! fanout used for outbound broadcasts (`broker`), and the stateless
//! per-game message handlers that tie the stores together (`gateway`).

pub mod broker;
pub mod gateway;
pub mod protocol;
