//! Per-user dialogue: states, events, session storage and the engine that
//! drives registration, listing, search and schedules.

pub mod engine;
pub mod event;
pub mod selection;
pub mod session;
pub mod state;

pub use engine::ConversationEngine;
pub use event::{Callback, Event, MenuCommand};
pub use session::{DbSessionStore, MemorySessionStore, SessionStore};
pub use state::{ConversationState, Session};
