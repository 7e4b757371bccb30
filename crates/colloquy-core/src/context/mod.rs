//! Context domain module.
//!
//! - `model`: the ephemeral selection (`ChatContext`) and its merge patch
//!   (`ContextPatch`)

mod model;

pub use model::{ChatContext, ContextPatch};
