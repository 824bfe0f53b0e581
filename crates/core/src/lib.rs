//! # Labboard Core
//!
//! Client-side core for the Labboard virtual-lab research assistant.
//! Submits a research topic to the backend pipeline, consumes its event
//! stream, and rebuilds a consistent session state front ends can render.
//! The agent pipeline itself lives behind the HTTP boundary; this crate
//! only speaks its contract.
//!
//! ## Architecture
//!
//! - `api` - typed client for the backend's endpoints
//! - `config` - backend base URL from the environment
//! - `session/` - frame parsing, event reducer, run lifecycle
//!
//! ## Usage
//!
//! ```rust,ignore
//! use labboard_core::api::{ApiClient, ResearchRequest};
//! use labboard_core::config::LabConfig;
//! use labboard_core::session::{SessionCallbacks, StreamSessionManager};
//!
//! let api = ApiClient::new(&LabConfig::from_env());
//! let mut manager = StreamSessionManager::new(api);
//! let mut state = manager.subscribe();
//! manager.start(ResearchRequest::new("CRISPR tomatoes"), SessionCallbacks::new())?;
//! while state.changed().await.is_ok() {
//!     render(&state.borrow());
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod session;

pub use error::LabError;
