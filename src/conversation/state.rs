//! Conversation state machine: which input the bot is waiting for.

use serde::{Deserialize, Serialize};

/// Dialogue states of one user.
///
/// Registration: Idle → AwaitingFio → AwaitingCompanyId → Idle, with a
/// failed lookup re-entering AwaitingFio. Search: Idle → AwaitingSearchFio
/// → (Idle | AwaitingSelectionIndex), the latter looping on bad input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingFio,
    AwaitingCompanyId,
    AwaitingSearchFio,
    AwaitingSelectionIndex,
}

impl ConversationState {
    /// Check if a transition from `self` to `target` is a declared edge.
    ///
    /// Every state may fall back to `Idle`; that edge covers both normal
    /// completion and cancellation.
    pub fn can_transition_to(&self, target: ConversationState) -> bool {
        use ConversationState::*;
        matches!(
            (self, target),
            (_, Idle)
                | (Idle, AwaitingFio)
                | (Idle, AwaitingSearchFio)
                | (AwaitingFio, AwaitingCompanyId)
                | (AwaitingCompanyId, AwaitingFio)
                | (AwaitingSearchFio, AwaitingSelectionIndex)
                | (AwaitingSelectionIndex, AwaitingSelectionIndex)
        )
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::AwaitingFio => "awaiting_fio",
            Self::AwaitingCompanyId => "awaiting_company_id",
            Self::AwaitingSearchFio => "awaiting_search_fio",
            Self::AwaitingSelectionIndex => "awaiting_selection_index",
        };
        write!(f, "{s}")
    }
}

/// Rejected state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot transition from {from} to {to}")]
pub struct TransitionError {
    pub from: ConversationState,
    pub to: ConversationState,
}

/// Values carried between steps of a multi-step dialogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Full name given during registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_fio: Option<String>,
    /// Query that produced the candidate list being disambiguated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_search: Option<String>,
}

impl SessionData {
    pub fn is_empty(&self) -> bool {
        self.pending_fio.is_none() && self.pending_search.is_none()
    }
}

/// Persisted per-user dialogue state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state: ConversationState,
    #[serde(default)]
    pub data: SessionData,
}

impl Session {
    /// Move to `target`. Entering `Idle` clears the data bag.
    pub fn transition_to(&mut self, target: ConversationState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(target) {
            return Err(TransitionError {
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        if target == ConversationState::Idle {
            self.data = SessionData::default();
        }
        Ok(())
    }

    /// Abandon whatever dialogue is in progress.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Idle with nothing pending; such sessions need not be stored.
    pub fn is_blank(&self) -> bool {
        self.state == ConversationState::Idle && self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ConversationState; 5] = [
        ConversationState::Idle,
        ConversationState::AwaitingFio,
        ConversationState::AwaitingCompanyId,
        ConversationState::AwaitingSearchFio,
        ConversationState::AwaitingSelectionIndex,
    ];

    #[test]
    fn valid_transitions() {
        use ConversationState::*;
        let transitions = [
            (Idle, AwaitingFio),
            (AwaitingFio, AwaitingCompanyId),
            (AwaitingCompanyId, Idle),
            (AwaitingCompanyId, AwaitingFio),
            (Idle, AwaitingSearchFio),
            (AwaitingSearchFio, Idle),
            (AwaitingSearchFio, AwaitingSelectionIndex),
            (AwaitingSelectionIndex, AwaitingSelectionIndex),
            (AwaitingSelectionIndex, Idle),
        ];
        for (from, to) in transitions {
            assert!(
                from.can_transition_to(to),
                "{from} should transition to {to}"
            );
        }
    }

    #[test]
    fn invalid_transitions() {
        use ConversationState::*;
        // Skip a step
        assert!(!Idle.can_transition_to(AwaitingCompanyId));
        assert!(!Idle.can_transition_to(AwaitingSelectionIndex));
        // Cross between flows
        assert!(!AwaitingFio.can_transition_to(AwaitingSearchFio));
        assert!(!AwaitingSearchFio.can_transition_to(AwaitingCompanyId));
        // Self-loops other than the selection re-prompt
        assert!(!AwaitingFio.can_transition_to(AwaitingFio));
        assert!(!AwaitingSearchFio.can_transition_to(AwaitingSearchFio));
    }

    #[test]
    fn every_state_can_reset() {
        for state in ALL {
            assert!(state.can_transition_to(ConversationState::Idle));
        }
    }

    #[test]
    fn display_matches_serde() {
        for state in ALL {
            let display = format!("{state}");
            let json = serde_json::to_value(state).unwrap();
            assert_eq!(json.as_str().unwrap(), display);
        }
    }

    #[test]
    fn entering_idle_clears_data() {
        let mut session = Session::default();
        session
            .transition_to(ConversationState::AwaitingFio)
            .unwrap();
        session.data.pending_fio = Some("Ivan Ivanov".into());
        session
            .transition_to(ConversationState::AwaitingCompanyId)
            .unwrap();
        assert_eq!(session.data.pending_fio.as_deref(), Some("Ivan Ivanov"));

        session.transition_to(ConversationState::Idle).unwrap();
        assert!(session.is_blank());
    }

    #[test]
    fn rejected_transition_leaves_session_untouched() {
        let mut session = Session::default();
        let err = session
            .transition_to(ConversationState::AwaitingCompanyId)
            .unwrap_err();
        assert_eq!(err.from, ConversationState::Idle);
        assert_eq!(err.to, ConversationState::AwaitingCompanyId);
        assert_eq!(session, Session::default());
    }

    #[test]
    fn session_serde_roundtrip() {
        let session = Session {
            state: ConversationState::AwaitingSelectionIndex,
            data: SessionData {
                pending_fio: None,
                pending_search: Some("Петров Пётр".into()),
            },
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["state"], "awaiting_selection_index");
        assert!(json["data"].get("pending_fio").is_none());

        let back: Session = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn session_without_data_deserializes() {
        let session: Session = serde_json::from_str(r#"{"state":"awaiting_fio"}"#).unwrap();
        assert_eq!(session.state, ConversationState::AwaitingFio);
        assert!(session.data.is_empty());
    }
}
