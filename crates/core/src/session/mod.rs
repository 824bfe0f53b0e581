//! # Session
//!
//! Everything that makes up one streamed research run: the wire event
//! model, the frame parser, the pure state reducer with its roster
//! inference helper, and the lifecycle manager tying them to the network.

pub mod event;
pub mod manager;
pub mod reducer;
pub mod roster;
pub mod sse;
pub mod state;

pub use event::{AgentTag, StreamEvent};
pub use manager::{SessionCallbacks, StreamSessionManager};
pub use reducer::reduce;
pub use sse::FrameParser;
pub use state::{
    specialist_id, Character, CharacterRole, CharacterStatus, ChatMessage, MessageKind, Phase,
    Scene, SessionState, MAX_ROUNDS,
};
