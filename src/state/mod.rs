//! Client-side session state.
//!
//! DESIGN
//! ======
//! `session` holds the pure `Session` value and its transitions; `store`
//! wraps it with the storage and transport side effects.

pub mod session;
pub mod store;

pub use session::Session;
pub use store::SessionStore;
