//! Exchange state types.
//!
//! An exchange is one user-message -> assistant-message round trip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// States of the exchange state machine.
///
/// ```text
/// idle --submit--> sending --persisted--> awaiting_response --resolves--> settled --> idle
///                                         awaiting_response --fails-----> idle
///                                         awaiting_response --cancel----> cancelled --> idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExchangeState {
    #[default]
    Idle,
    Sending,
    AwaitingResponse,
    Settled,
    Cancelled,
}

impl ExchangeState {
    /// Whether the UI may accept a new submission.
    pub fn accepts_submit(self) -> bool {
        self == ExchangeState::Idle
    }

    pub fn is_in_flight(self) -> bool {
        matches!(self, ExchangeState::Sending | ExchangeState::AwaitingResponse)
    }
}

/// Tracks one in-flight send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub session_id: String,
    /// Id of the persisted user message awaiting a reply
    pub pending_message_id: String,
    pub started_at: DateTime<Utc>,
    pub state: ExchangeState,
    /// Bumped on every submit and cancel; a reply whose generation no longer
    /// matches is stale.
    pub generation: u64,
}
