//! # Roster Inference
//!
//! The PI announces its team as free text before the specialists first
//! speak. This module is the isolated strategy that scans those messages
//! for bullet-list roster lines so the UI can seat specialists early.
//! Its output is advisory: a later authoritative `agent` event for the
//! same name overwrites whatever was inferred here.
//!
//! Accepted line grammar, one mention per line:
//!
//! ```text
//! - Name: focus text
//! - **Name** - focus text
//! * Name – focus text
//! ```
//!
//! A `-` or `*` bullet, an optionally bold name, then a `:`, `-`, or `–`
//! separator followed by the focus description.

use std::sync::OnceLock;

use regex::Regex;

use super::state::specialist_id;

/// Names at or above this length are rejected as prose misparsed into the
/// grammar rather than an actual roster entry.
pub const MAX_NAME_LEN: usize = 40;

/// A specialist mention extracted from PI prose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialistMention {
    /// Display name as written by the PI
    pub name: String,
    /// Focus text following the separator
    pub focus: String,
}

impl SpecialistMention {
    /// Stable roster id for this mention.
    pub fn id(&self) -> String {
        specialist_id(&self.name)
    }
}

fn bullet_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[-*]\s*\*{0,2}(.+?)\*{0,2}\s*[:\-–]\s*(.+?)(?:\n|$)")
            .unwrap_or_else(|e| panic!("roster bullet pattern failed to compile: {e}"))
    })
}

/// Whether a short PI message looks like a team-roster announcement and is
/// worth scanning at all.
pub fn mentions_roster(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("team") || lowered.contains("specialist")
}

/// Extract all roster mentions from long-form PI content. Over-long names
/// are dropped; deduplication against already-seated characters is the
/// caller's job.
pub fn infer_specialists(content: &str) -> Vec<SpecialistMention> {
    bullet_pattern()
        .captures_iter(content)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().trim();
            let focus = caps.get(2)?.as_str().trim();
            if name.is_empty() || name.chars().count() >= MAX_NAME_LEN {
                return None;
            }
            Some(SpecialistMention {
                name: name.to_string(),
                focus: focus.to_string(),
            })
        })
        .collect()
}
