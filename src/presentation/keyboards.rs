//! Button layouts attached to replies.

use crate::channels::{InlineButton, ReplyMarkup};
use crate::conversation::event::{Callback, MenuCommand};
use crate::directory::pagination::PageWindow;

/// Да/Нет offer to start registration.
pub fn registration() -> ReplyMarkup {
    ReplyMarkup::Inline {
        rows: vec![vec![
            InlineButton::new("Да", Callback::RegisterYes.token()),
            InlineButton::new("Нет", Callback::RegisterNo.token()),
        ]],
    }
}

/// Persistent main menu.
pub fn main_menu() -> ReplyMarkup {
    let label = |cmd: MenuCommand| cmd.label().to_string();
    ReplyMarkup::Menu {
        rows: vec![
            vec![
                label(MenuCommand::EmployeeList),
                label(MenuCommand::SearchByFio),
            ],
            vec![label(MenuCommand::MySchedule)],
        ],
    }
}

/// Previous/next buttons for a page. `None` when neither applies.
pub fn pagination(window: &PageWindow) -> Option<ReplyMarkup> {
    let mut row = Vec::new();
    if let Some(prev) = window.prev_page() {
        row.push(InlineButton::new("« Пред.", Callback::Page(prev).token()));
    }
    if let Some(next) = window.next_page() {
        row.push(InlineButton::new("След. »", Callback::Page(next).token()));
    }
    (!row.is_empty()).then(|| ReplyMarkup::Inline { rows: vec![row] })
}

/// Offer to show an employee's schedule.
pub fn schedule_prompt(employee_id: i64) -> ReplyMarkup {
    ReplyMarkup::Inline {
        rows: vec![vec![InlineButton::new(
            "Получить рабочий график?",
            Callback::WorkSchedule(employee_id).token(),
        )]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(markup: &ReplyMarkup) -> Vec<&str> {
        markup.inline_buttons().map(|b| b.data.as_str()).collect()
    }

    #[test]
    fn registration_buttons() {
        assert_eq!(tokens(&registration()), ["register_yes", "register_no"]);
    }

    #[test]
    fn menu_labels_decode_back() {
        let ReplyMarkup::Menu { rows } = main_menu() else {
            panic!("expected a menu");
        };
        let labels: Vec<&String> = rows.iter().flatten().collect();
        assert_eq!(labels.len(), 3);
        for label in labels {
            assert!(MenuCommand::from_label(label).is_some(), "{label}");
        }
    }

    #[test]
    fn pagination_follows_bounds() {
        let first = pagination(&PageWindow::new(1, 5, 12)).unwrap();
        assert_eq!(tokens(&first), ["page_2"]);

        let middle = pagination(&PageWindow::new(2, 5, 12)).unwrap();
        assert_eq!(tokens(&middle), ["page_1", "page_3"]);

        let last = pagination(&PageWindow::new(3, 5, 12)).unwrap();
        assert_eq!(tokens(&last), ["page_2"]);

        assert!(pagination(&PageWindow::new(1, 5, 4)).is_none());
    }

    #[test]
    fn schedule_prompt_carries_employee() {
        assert_eq!(tokens(&schedule_prompt(17)), ["work_shedule:17"]);
    }
}
