//! # Session Reducer
//!
//! Deterministic transition function from (state, event) to the next
//! state. Pure by contract: no I/O, no clocks, no randomness. All data in
//! the next state comes from the previous state or the event itself, so
//! replaying the same ordered event sequence always rebuilds the same
//! state.

use super::event::{AgentTag, StreamEvent};
use super::roster;
use super::state::{
    specialist_id, Character, CharacterRole, CharacterStatus, ChatMessage, MessageKind, Phase,
    SessionState,
};

/// Apply one stream event to the session state.
pub fn reduce(state: &SessionState, event: &StreamEvent) -> SessionState {
    let mut next = state.clone();
    match event {
        StreamEvent::Start { timestamp, message } => {
            next.phase = Phase::Planning;
            next.scene = next.phase.scene();
            if let Some(pi) = next.character_mut("pi") {
                pi.status = CharacterStatus::Active;
            }
            push_system(&mut next, *timestamp, message.clone(), MessageKind::System);
        }

        StreamEvent::Phase {
            timestamp,
            message,
            phase,
        } => {
            let parsed = phase.as_deref().map(Phase::parse).unwrap_or(Phase::Idle);
            next.phase = parsed;
            next.scene = parsed.scene();
            reset_characters(&mut next);
            match parsed {
                Phase::Researching | Phase::RoundRevision => {
                    set_role_status(&mut next, CharacterRole::Specialist, CharacterStatus::Active);
                }
                Phase::Critique => {
                    set_role_status(&mut next, CharacterRole::Critic, CharacterStatus::Active);
                }
                Phase::PiSummary | Phase::FinalSynthesis => {
                    set_role_status(&mut next, CharacterRole::Pi, CharacterStatus::Active);
                }
                _ => {}
            }
            push_system(&mut next, *timestamp, message.clone(), MessageKind::Phase);
        }

        StreamEvent::Agent {
            timestamp,
            message,
            agent,
            content,
            specialist_name,
            specialist_focus,
        } => {
            let role = agent.map(AgentTag::role).unwrap_or(CharacterRole::Pi);

            if role == CharacterRole::Specialist && specialist_name.is_some() {
                let name = specialist_name.as_deref().unwrap_or_default();
                speak_specialist(
                    &mut next,
                    name,
                    message,
                    content.clone(),
                    specialist_focus.clone(),
                );
            } else {
                for c in next
                    .characters
                    .iter_mut()
                    .filter(|c| c.role == role)
                {
                    c.status = CharacterStatus::Speaking;
                    c.message = Some(message.clone());
                    c.content = content.clone();
                }
            }

            // Team-roster inference only applies to early PI prose, before
            // the specialists have been announced authoritatively.
            if *agent == Some(AgentTag::Pi)
                && matches!(state.phase, Phase::Planning | Phase::Idle)
                && roster::mentions_roster(message)
            {
                if let Some(content) = content {
                    seat_inferred_specialists(&mut next, content);
                }
            }

            let name = specialist_name.clone().unwrap_or_else(|| {
                match role {
                    CharacterRole::Pi => "PI",
                    CharacterRole::Critic => "Critic",
                    CharacterRole::Specialist => "Specialist",
                }
                .to_string()
            });
            let id = next.next_message_id();
            next.chat_log.push(ChatMessage {
                id,
                timestamp: *timestamp,
                role,
                name,
                message: message.clone(),
                content: content.clone(),
                kind: MessageKind::Agent,
                scores: None,
                specialist_feedback: None,
            });
        }

        StreamEvent::Decision {
            timestamp,
            message,
            content,
            scores,
            specialist_feedback,
        } => {
            next.phase = Phase::Critique;
            next.scene = next.phase.scene();
            for c in next.characters.iter_mut() {
                if c.role == CharacterRole::Critic {
                    c.status = CharacterStatus::Speaking;
                    c.message = Some(message.clone());
                    c.scores = scores.clone();
                } else {
                    c.status = CharacterStatus::Idle;
                }
            }
            let id = next.next_message_id();
            next.chat_log.push(ChatMessage {
                id,
                timestamp: *timestamp,
                role: CharacterRole::Critic,
                name: "Critic".to_string(),
                message: message.clone(),
                content: content.clone(),
                kind: MessageKind::Decision,
                scores: scores.clone(),
                specialist_feedback: specialist_feedback.clone(),
            });
        }

        StreamEvent::Iteration {
            timestamp,
            message,
            round,
        } => {
            next.current_round = round.unwrap_or(state.current_round + 1);
            if next.current_round > next.max_rounds {
                tracing::warn!(
                    round = next.current_round,
                    max_rounds = next.max_rounds,
                    "backend reported a round past the display limit"
                );
            }
            reset_characters(&mut next);
            push_system(&mut next, *timestamp, message.clone(), MessageKind::System);
        }

        StreamEvent::Complete {
            timestamp,
            message,
            report,
            saved_filename,
        } => {
            next.phase = Phase::Complete;
            next.scene = next.phase.scene();
            next.is_streaming = false;
            next.final_report = report.clone();
            next.saved_filename = saved_filename.clone();
            for c in next.characters.iter_mut() {
                c.status = CharacterStatus::Done;
            }
            push_system(&mut next, *timestamp, message.clone(), MessageKind::System);
        }

        StreamEvent::Error {
            timestamp,
            message,
            error,
        } => {
            next.is_streaming = false;
            let text = error.clone().unwrap_or_else(|| message.clone());
            next.error = Some(text.clone());
            push_system(&mut next, *timestamp, text, MessageKind::System);
        }
    }
    next
}

/// Set every roster entity back to idle with its bubble cleared.
fn reset_characters(state: &mut SessionState) {
    for c in state.characters.iter_mut() {
        c.status = CharacterStatus::Idle;
        c.message = None;
    }
}

fn set_role_status(state: &mut SessionState, role: CharacterRole, status: CharacterStatus) {
    for c in state.characters.iter_mut().filter(|c| c.role == role) {
        c.status = status;
    }
}

/// Find-or-create the named specialist and mark it speaking. A freshly
/// supplied focus wins over a previously recorded one.
fn speak_specialist(
    state: &mut SessionState,
    name: &str,
    message: &str,
    content: Option<String>,
    focus: Option<String>,
) {
    let id = specialist_id(name);
    match state.character_mut(&id) {
        Some(c) => {
            c.status = CharacterStatus::Speaking;
            c.message = Some(message.to_string());
            c.content = content;
            if focus.is_some() {
                c.focus = focus;
            }
        }
        None => state.characters.push(Character {
            id,
            role: CharacterRole::Specialist,
            name: name.to_string(),
            focus,
            status: CharacterStatus::Speaking,
            message: Some(message.to_string()),
            content,
            scores: None,
        }),
    }
}

/// Seat specialists the PI announced in prose, idle until they speak.
fn seat_inferred_specialists(state: &mut SessionState, content: &str) {
    for mention in roster::infer_specialists(content) {
        let id = mention.id();
        if state.character(&id).is_none() {
            state.characters.push(Character {
                id,
                role: CharacterRole::Specialist,
                name: mention.name,
                focus: Some(mention.focus),
                status: CharacterStatus::Idle,
                message: None,
                content: None,
                scores: None,
            });
        }
    }
}

fn push_system(state: &mut SessionState, timestamp: f64, message: String, kind: MessageKind) {
    let id = state.next_message_id();
    state.chat_log.push(ChatMessage {
        id,
        timestamp,
        role: CharacterRole::Pi,
        name: "System".to_string(),
        message,
        content: None,
        kind,
        scores: None,
        specialist_feedback: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::state::Scene;
    use std::collections::HashMap;

    fn apply_all(events: &[StreamEvent]) -> SessionState {
        events
            .iter()
            .fold(SessionState::seeded(), |state, event| reduce(&state, event))
    }

    fn agent_event(
        tag: AgentTag,
        message: &str,
        specialist_name: Option<&str>,
        specialist_focus: Option<&str>,
    ) -> StreamEvent {
        StreamEvent::Agent {
            timestamp: 10.0,
            message: message.to_string(),
            agent: Some(tag),
            content: None,
            specialist_name: specialist_name.map(str::to_string),
            specialist_focus: specialist_focus.map(str::to_string),
        }
    }

    #[test]
    fn test_start_event_activates_pi() {
        let state = apply_all(&[StreamEvent::Start {
            timestamp: 1000.0,
            message: "Session started".to_string(),
        }]);
        assert_eq!(state.phase, Phase::Planning);
        assert_eq!(state.scene, Scene::Meeting);
        assert_eq!(
            state.character("pi").unwrap().status,
            CharacterStatus::Active
        );
        assert_eq!(state.chat_log.len(), 1);
        assert_eq!(state.chat_log[0].kind, MessageKind::System);
        assert_eq!(state.chat_log[0].message, "Session started");
    }

    #[test]
    fn test_phase_event_activates_role_group() {
        let state = apply_all(&[
            agent_event(AgentTag::Specialist, "hello", Some("Toxicologist"), None),
            StreamEvent::Phase {
                timestamp: 2.0,
                message: "Research phase".to_string(),
                phase: Some("researching".to_string()),
            },
        ]);
        assert_eq!(state.phase, Phase::Researching);
        assert_eq!(state.scene, Scene::Lab);
        let toxicologist = state.character("toxicologist").unwrap();
        assert_eq!(toxicologist.status, CharacterStatus::Active);
        // the phase reset cleared the bubble from the earlier agent event
        assert_eq!(toxicologist.message, None);
        assert_eq!(
            state.character("pi").unwrap().status,
            CharacterStatus::Idle
        );
    }

    #[test]
    fn test_unknown_phase_name_maps_to_idle() {
        let state = apply_all(&[StreamEvent::Phase {
            timestamp: 2.0,
            message: "???".to_string(),
            phase: Some("quantum_leap".to_string()),
        }]);
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.scene, Scene::Meeting);
    }

    #[test]
    fn test_repeated_specialist_mentions_resolve_to_one_entity() {
        let state = apply_all(&[
            agent_event(AgentTag::Specialist, "first", Some("Toxicologist"), Some("tox")),
            agent_event(AgentTag::Specialist, "second", Some("Toxicologist"), None),
        ]);
        let specialists: Vec<_> = state
            .characters
            .iter()
            .filter(|c| c.role == CharacterRole::Specialist)
            .collect();
        assert_eq!(specialists.len(), 1);
        let c = state.character("toxicologist").unwrap();
        assert_eq!(c.status, CharacterStatus::Speaking);
        assert_eq!(c.message.as_deref(), Some("second"));
        // the focus from the first event survives the second, focus-less one
        assert_eq!(c.focus.as_deref(), Some("tox"));
    }

    #[test]
    fn test_scientist_alias_creates_specialist() {
        let state = apply_all(&[agent_event(
            AgentTag::Scientist,
            "measuring",
            Some("Plant Geneticist"),
            None,
        )]);
        let c = state.character("plant_geneticist").unwrap();
        assert_eq!(c.role, CharacterRole::Specialist);
        assert_eq!(c.status, CharacterStatus::Speaking);
    }

    #[test]
    fn test_agent_event_without_tag_speaks_as_pi() {
        let state = apply_all(&[StreamEvent::Agent {
            timestamp: 1.0,
            message: "thinking".to_string(),
            agent: None,
            content: None,
            specialist_name: None,
            specialist_focus: None,
        }]);
        let pi = state.character("pi").unwrap();
        assert_eq!(pi.status, CharacterStatus::Speaking);
        assert_eq!(pi.message.as_deref(), Some("thinking"));
        assert_eq!(state.chat_log[0].name, "PI");
    }

    #[test]
    fn test_pi_team_announcement_seats_specialists_early() {
        let state = apply_all(&[
            StreamEvent::Start {
                timestamp: 1.0,
                message: "go".to_string(),
            },
            StreamEvent::Agent {
                timestamp: 2.0,
                message: "Here is the team".to_string(),
                agent: Some(AgentTag::Pi),
                content: Some(
                    "- Toxicologist: off-target effects\n- **Regulatory Expert** - EU rules\n"
                        .to_string(),
                ),
                specialist_name: None,
                specialist_focus: None,
            },
        ]);
        let tox = state.character("toxicologist").unwrap();
        assert_eq!(tox.status, CharacterStatus::Idle);
        assert_eq!(tox.focus.as_deref(), Some("off-target effects"));
        assert!(state.character("regulatory_expert").is_some());
        // an authoritative event later reconciles with the inferred seat
        let state = reduce(
            &state,
            &agent_event(AgentTag::Specialist, "hello", Some("Toxicologist"), None),
        );
        let specialists: Vec<_> = state
            .characters
            .iter()
            .filter(|c| c.role == CharacterRole::Specialist)
            .collect();
        assert_eq!(specialists.len(), 2);
        assert_eq!(
            state.character("toxicologist").unwrap().status,
            CharacterStatus::Speaking
        );
    }

    #[test]
    fn test_roster_inference_skipped_outside_planning() {
        let state = apply_all(&[
            StreamEvent::Phase {
                timestamp: 1.0,
                message: "Research".to_string(),
                phase: Some("researching".to_string()),
            },
            StreamEvent::Agent {
                timestamp: 2.0,
                message: "team update".to_string(),
                agent: Some(AgentTag::Pi),
                content: Some("- Late Arrival: should not be seated".to_string()),
                specialist_name: None,
                specialist_focus: None,
            },
        ]);
        assert!(state.character("late_arrival").is_none());
    }

    #[test]
    fn test_decision_event_scores_critic_and_idles_the_rest() {
        let mut scores = HashMap::new();
        scores.insert("novelty".to_string(), 7.0);
        let mut feedback = HashMap::new();
        feedback.insert("toxicologist".to_string(), "needs citations".to_string());
        let state = apply_all(&[
            agent_event(AgentTag::Specialist, "claim", Some("Toxicologist"), None),
            StreamEvent::Decision {
                timestamp: 3.0,
                message: "Revise".to_string(),
                content: Some("Details".to_string()),
                scores: Some(scores.clone()),
                specialist_feedback: Some(feedback.clone()),
            },
        ]);
        assert_eq!(state.phase, Phase::Critique);
        let critic = state.character("critic").unwrap();
        assert_eq!(critic.status, CharacterStatus::Speaking);
        assert_eq!(critic.scores.as_ref(), Some(&scores));
        let tox = state.character("toxicologist").unwrap();
        assert_eq!(tox.status, CharacterStatus::Idle);
        // a decision idles other speakers without wiping their last words
        assert_eq!(tox.message.as_deref(), Some("claim"));
        let entry = state.chat_log.last().unwrap();
        assert_eq!(entry.kind, MessageKind::Decision);
        assert_eq!(entry.specialist_feedback.as_ref(), Some(&feedback));
    }

    #[test]
    fn test_iteration_uses_server_round_or_increments() {
        let state = apply_all(&[StreamEvent::Iteration {
            timestamp: 1.0,
            message: "Round 2".to_string(),
            round: Some(2),
        }]);
        assert_eq!(state.current_round, 2);

        let state = reduce(
            &state,
            &StreamEvent::Iteration {
                timestamp: 2.0,
                message: "Next".to_string(),
                round: None,
            },
        );
        assert_eq!(state.current_round, 3);
    }

    #[test]
    fn test_complete_event_is_terminal() {
        let state = apply_all(&[
            StreamEvent::Start {
                timestamp: 1.0,
                message: "go".to_string(),
            },
            StreamEvent::Complete {
                timestamp: 9.0,
                message: "Done".to_string(),
                report: Some("# Report".to_string()),
                saved_filename: Some("report_001.md".to_string()),
            },
        ]);
        assert_eq!(state.phase, Phase::Complete);
        assert!(!state.is_streaming);
        assert_eq!(state.final_report.as_deref(), Some("# Report"));
        assert_eq!(state.saved_filename.as_deref(), Some("report_001.md"));
        assert!(state
            .characters
            .iter()
            .all(|c| c.status == CharacterStatus::Done));
    }

    #[test]
    fn test_error_event_prefers_detail_over_message() {
        let state = apply_all(&[StreamEvent::Error {
            timestamp: 1.0,
            message: "The run failed".to_string(),
            error: Some("LLM timeout".to_string()),
        }]);
        assert!(!state.is_streaming);
        assert_eq!(state.error.as_deref(), Some("LLM timeout"));
        assert_eq!(state.chat_log[0].message, "LLM timeout");

        let state = apply_all(&[StreamEvent::Error {
            timestamp: 1.0,
            message: "The run failed".to_string(),
            error: None,
        }]);
        assert_eq!(state.error.as_deref(), Some("The run failed"));
    }

    #[test]
    fn test_terminal_state_survives_spurious_events() {
        let mut state = apply_all(&[StreamEvent::Complete {
            timestamp: 1.0,
            message: "Done".to_string(),
            report: Some("r".to_string()),
            saved_filename: None,
        }]);
        assert!(!state.is_streaming);
        for event in [
            StreamEvent::Start {
                timestamp: 2.0,
                message: "again?".to_string(),
            },
            agent_event(AgentTag::Critic, "late words", None, None),
        ] {
            state = reduce(&state, &event);
            assert!(!state.is_streaming);
        }
    }

    #[test]
    fn test_replay_is_deterministic_and_ids_increase() {
        let events = vec![
            StreamEvent::Start {
                timestamp: 1.0,
                message: "go".to_string(),
            },
            agent_event(AgentTag::Pi, "planning the team", None, None),
            StreamEvent::Phase {
                timestamp: 2.0,
                message: "Research".to_string(),
                phase: Some("researching".to_string()),
            },
            agent_event(AgentTag::Specialist, "finding", Some("Toxicologist"), None),
            StreamEvent::Decision {
                timestamp: 3.0,
                message: "Revise".to_string(),
                content: None,
                scores: None,
                specialist_feedback: None,
            },
            StreamEvent::Iteration {
                timestamp: 4.0,
                message: "Round 2".to_string(),
                round: Some(2),
            },
            StreamEvent::Complete {
                timestamp: 5.0,
                message: "Done".to_string(),
                report: Some("# R".to_string()),
                saved_filename: None,
            },
        ];
        let first = apply_all(&events);
        let second = apply_all(&events);
        assert_eq!(first, second);

        let ids: Vec<u64> = first.chat_log.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), events.len());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids[0], 1);
    }
}
