//! Domain layer for Colloquy.
//!
//! Holds the models shared by every other crate (context, sessions, messages,
//! exchanges, entity metadata), the repository and responder traits the
//! application layer is written against, and the shared error type.

pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod exchange;
pub mod responder;
pub mod session;

pub use error::{ChatError, Result};
