//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: the durable session log (`ChatSession`) and its list
//!   projection (`SessionSummary`)
//! - `message`: log entries (`Message`, `Sender`, `SourceCitation`)
//! - `repository`: repository trait for session persistence

mod message;
mod model;
mod repository;

pub use message::{Message, Sender, SourceCitation};
pub use model::{ChatSession, SessionSummary, derive_title};
pub use repository::SessionRepository;
