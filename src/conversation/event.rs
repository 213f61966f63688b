//! Typed conversation events, decoded once at the transport boundary.

use std::str::FromStr;

use crate::channels::{IncomingMessage, Payload};

/// Data behind an inline button.
///
/// Wire tokens: `register_yes`, `register_no`, `page_<n>`,
/// `work_shedule:<employee id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    RegisterYes,
    RegisterNo,
    Page(u32),
    WorkSchedule(i64),
}

/// Callback data that matches no known token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown callback data: {0:?}")]
pub struct UnknownCallback(pub String);

impl Callback {
    /// Encode as the token carried by a button.
    pub fn token(&self) -> String {
        match self {
            Self::RegisterYes => "register_yes".to_string(),
            Self::RegisterNo => "register_no".to_string(),
            Self::Page(page) => format!("page_{page}"),
            Self::WorkSchedule(employee_id) => format!("work_shedule:{employee_id}"),
        }
    }
}

impl FromStr for Callback {
    type Err = UnknownCallback;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownCallback(s.to_string());
        match s {
            "register_yes" => Ok(Self::RegisterYes),
            "register_no" => Ok(Self::RegisterNo),
            _ => {
                if let Some(page) = s.strip_prefix("page_") {
                    page.parse().map(Self::Page).map_err(|_| unknown())
                } else if let Some(id) = s.strip_prefix("work_shedule:") {
                    id.parse().map(Self::WorkSchedule).map_err(|_| unknown())
                } else {
                    Err(unknown())
                }
            }
        }
    }
}

/// Main menu entries, matched on the exact button label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    EmployeeList,
    SearchByFio,
    MySchedule,
}

impl MenuCommand {
    pub const ALL: [MenuCommand; 3] = [
        MenuCommand::EmployeeList,
        MenuCommand::SearchByFio,
        MenuCommand::MySchedule,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::EmployeeList => "Список сотрудников",
            Self::SearchByFio => "Поиск по ФИО",
            Self::MySchedule => "Получить рабочий график",
        }
    }

    pub fn from_label(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.label() == text)
    }
}

/// An inbound event for the conversation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The `/start` command.
    Start,
    /// Free text; interpreted according to the current state.
    Text(String),
    Callback(Callback),
    /// Callback data nobody understands. Logged and dropped.
    UnknownCallback(String),
}

impl Event {
    /// Decode an incoming channel message.
    pub fn from_incoming(msg: &IncomingMessage) -> Self {
        match &msg.payload {
            Payload::Text(text) => Self::from_text(text),
            Payload::Callback(data) => match data.parse() {
                Ok(cb) => Self::Callback(cb),
                Err(UnknownCallback(raw)) => Self::UnknownCallback(raw),
            },
        }
    }

    fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        // Telegram appends "@botname" in groups and may carry a deep-link payload.
        let command = trimmed.split_whitespace().next().unwrap_or_default();
        let command = command.split('@').next().unwrap_or_default();
        if command == "/start" {
            Self::Start
        } else {
            Self::Text(text.to_string())
        }
    }
}
