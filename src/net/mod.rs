//! Networking: the configured HTTP transport and the auth wire types.
//!
//! SYSTEM CONTEXT
//! ==============
//! `client` owns base URL resolution and bearer attachment; `types` defines
//! the auth DTOs. Book payloads stay untyped JSON.

pub mod client;
pub mod types;
