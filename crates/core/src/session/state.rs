//! # Session State
//!
//! The single aggregate a streaming run maintains. The state is replaced
//! wholesale on every event, never mutated in place by consumers, so a UI
//! can hold a snapshot without seeing partial updates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Display limit on critique/revision rounds. The reducer records rounds
/// beyond this verbatim; rendering layers clamp if they care.
pub const MAX_ROUNDS: u32 = 3;

/// Server-declared stage of the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Planning,
    Researching,
    Critique,
    PiSummary,
    RoundRevision,
    FinalSynthesis,
    Complete,
}

impl Phase {
    /// Map a server phase name. Unrecognized names fall back to `Idle`;
    /// `Complete` is only ever reached through a `complete` event.
    pub fn parse(name: &str) -> Phase {
        match name {
            "planning" => Phase::Planning,
            "researching" => Phase::Researching,
            "critique" => Phase::Critique,
            "pi_summary" => Phase::PiSummary,
            "round_revision" => Phase::RoundRevision,
            "final_synthesis" => Phase::FinalSynthesis,
            _ => Phase::Idle,
        }
    }

    /// Display scene for this phase.
    pub fn scene(self) -> Scene {
        match self {
            Phase::Researching | Phase::RoundRevision => Scene::Lab,
            _ => Scene::Meeting,
        }
    }
}

/// Client-side display grouping derived from the phase. Not independently
/// settable and never sent by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scene {
    Lab,
    #[default]
    Meeting,
}

/// Fixed three-way role classification for roster entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterRole {
    Pi,
    Critic,
    Specialist,
}

/// Activity marker for a roster entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterStatus {
    #[default]
    Idle,
    Active,
    Speaking,
    Done,
}

/// One participant in the virtual lab: the fixed PI and Critic, or a
/// dynamically discovered specialist. Never removed within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Stable identifier (fixed `pi`/`critic`, or derived from the name)
    pub id: String,
    /// Role classification
    pub role: CharacterRole,
    /// Display name
    pub name: String,
    /// Focus-area description, when known
    #[serde(default)]
    pub focus: Option<String>,
    /// Current activity
    pub status: CharacterStatus,
    /// Last spoken short message
    #[serde(default)]
    pub message: Option<String>,
    /// Last spoken long-form content
    #[serde(default)]
    pub content: Option<String>,
    /// Rubric scores attached by the latest critic verdict
    #[serde(default)]
    pub scores: Option<HashMap<String, f64>>,
}

impl Character {
    fn fixed(id: &str, role: CharacterRole, name: &str) -> Self {
        Self {
            id: id.to_string(),
            role,
            name: name.to_string(),
            focus: None,
            status: CharacterStatus::Idle,
            message: None,
            content: None,
            scores: None,
        }
    }
}

/// Derive the stable roster id for a specialist display name: lower-cased,
/// whitespace runs collapsed to a single underscore. Repeated mentions of
/// the same name therefore resolve to the same entity.
pub fn specialist_id(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Classification tag for chat log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    System,
    Agent,
    Decision,
    Phase,
}

/// One immutable entry in the session's chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Monotonically increasing id, scoped to one session
    pub id: u64,
    /// Server-supplied epoch seconds
    pub timestamp: f64,
    /// Role of the author (system entries are attributed to the PI)
    pub role: CharacterRole,
    /// Display name of the author
    pub name: String,
    /// Short human-readable message
    pub message: String,
    /// Optional long-form content
    #[serde(default)]
    pub content: Option<String>,
    /// Entry classification
    pub kind: MessageKind,
    /// Rubric scores, on decision entries
    #[serde(default)]
    pub scores: Option<HashMap<String, f64>>,
    /// Per-specialist feedback, on decision entries
    #[serde(default)]
    pub specialist_feedback: Option<HashMap<String, String>>,
}

/// Aggregate state of one streaming research run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    /// Current pipeline phase
    pub phase: Phase,
    /// Display scene derived from the phase
    pub scene: Scene,
    /// Current critique/revision round, starting at 1
    pub current_round: u32,
    /// Display round limit
    pub max_rounds: u32,
    /// Roster in first-appearance order, addressed by stable id
    pub characters: Vec<Character>,
    /// Append-only ordered chat log
    pub chat_log: Vec<ChatMessage>,
    /// True from session start until a terminal event or cancellation
    pub is_streaming: bool,
    /// Final report text, populated by a `complete` event
    pub final_report: Option<String>,
    /// Saved-report identifier, populated by a `complete` event
    pub saved_filename: Option<String>,
    /// Terminal error text, from an `error` event or a transport failure
    pub error: Option<String>,
    /// Message-id counter, reset with the session
    #[serde(skip)]
    next_message_id: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::seeded()
    }
}

impl SessionState {
    /// The initial seeded form: the two fixed roster entries, an empty
    /// log, round 1, not streaming.
    pub fn seeded() -> Self {
        Self {
            phase: Phase::Idle,
            scene: Scene::Meeting,
            current_round: 1,
            max_rounds: MAX_ROUNDS,
            characters: vec![
                Character::fixed("pi", CharacterRole::Pi, "PI"),
                Character::fixed("critic", CharacterRole::Critic, "Critic"),
            ],
            chat_log: Vec::new(),
            is_streaming: false,
            final_report: None,
            saved_filename: None,
            error: None,
            next_message_id: 0,
        }
    }

    /// Look up a roster entity by id.
    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub(crate) fn character_mut(&mut self, id: &str) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.id == id)
    }

    /// Claim the next chat message id. Ids start at 1 and strictly
    /// increase within one session.
    pub(crate) fn next_message_id(&mut self) -> u64 {
        self.next_message_id += 1;
        self.next_message_id
    }
}
