//! Application layer for Colloquy.
//!
//! Composes the context store, session store, exchange engine and binder
//! into a [`ChatService`] the UI drives.

pub mod binder;
pub mod chat_service;
pub mod context_store;
pub mod exchange_engine;
pub mod session_store;

#[cfg(test)]
mod test_support;

pub use binder::{ContextBinder, EntityCatalogs};
pub use chat_service::ChatService;
pub use context_store::ContextStore;
pub use exchange_engine::{ExchangeEngine, ExchangeOutcome, PendingReply};
pub use session_store::SessionStore;
