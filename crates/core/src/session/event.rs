//! # Stream Events
//!
//! Wire-level records decoded from the research stream. Each `data:` frame
//! carries one JSON object whose `type` field selects the variant; fields
//! that a given type never uses are simply not representable on it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::state::CharacterRole;

/// Role tag the backend attaches to `agent` events.
///
/// `scientist` is the pipeline's legacy name for a specialist and maps to
/// the same roster role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentTag {
    Scientist,
    Critic,
    Pi,
    Specialist,
}

impl AgentTag {
    /// Resolve the wire tag to a roster role.
    pub fn role(self) -> CharacterRole {
        match self {
            AgentTag::Scientist | AgentTag::Specialist => CharacterRole::Specialist,
            AgentTag::Critic => CharacterRole::Critic,
            AgentTag::Pi => CharacterRole::Pi,
        }
    }
}

/// One event record from the research stream.
///
/// Timestamps are epoch seconds as sent by the server (float or integer on
/// the wire). Unknown JSON fields are ignored so the backend can grow its
/// payloads without breaking older clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Session accepted; the pipeline is about to plan.
    Start { timestamp: f64, message: String },

    /// The pipeline moved to a named phase.
    Phase {
        timestamp: f64,
        message: String,
        #[serde(default)]
        phase: Option<String>,
    },

    /// An agent spoke. Specialists carry their display name and focus.
    Agent {
        timestamp: f64,
        message: String,
        #[serde(default)]
        agent: Option<AgentTag>,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        specialist_name: Option<String>,
        #[serde(default)]
        specialist_focus: Option<String>,
    },

    /// The critic delivered a verdict, with rubric scores and optional
    /// per-specialist feedback.
    Decision {
        timestamp: f64,
        message: String,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        scores: Option<HashMap<String, f64>>,
        #[serde(default)]
        specialist_feedback: Option<HashMap<String, String>>,
    },

    /// A new critique/revision round began.
    Iteration {
        timestamp: f64,
        message: String,
        #[serde(default)]
        round: Option<u32>,
    },

    /// Terminal success. Carries the final report when the backend has one.
    Complete {
        timestamp: f64,
        message: String,
        #[serde(default)]
        report: Option<String>,
        #[serde(default)]
        saved_filename: Option<String>,
    },

    /// Terminal failure signaled by the backend itself.
    Error {
        timestamp: f64,
        message: String,
        #[serde(default)]
        error: Option<String>,
    },
}

impl StreamEvent {
    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }
}
