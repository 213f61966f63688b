//! Message texts and formatters for directory data.

use std::fmt::Write as _;

use crate::directory::model::{Employee, EmployeeMatch, Weekday, WorkSchedule};
use crate::directory::pagination::PageWindow;
use crate::error::{FlowError, SelectionError};

pub const NOT_SPECIFIED: &str = "Не указано";
pub const UNKNOWN_NAME: &str = "Неизвестно";

pub const MENU_GREETING: &str = "Вот список доступных команд...";
pub const REGISTRATION_OFFER: &str =
    "Вы не зарегистрированы в системе. Желаете зарегистророваться?";
pub const ASK_FIO: &str = "Для начала регистрации, пожалуйста, укажите ваше полное ФИО.";
pub const ASK_COMPANY_ID: &str = "Теперь укажите ваш id внутри компании.";
pub const REGISTRATION_CANCELLED: &str = "Регистрация отменена.";
pub const ASK_SEARCH_FIO: &str = "Пожалуйста, введите ФИО сотрудника для поиска:";
pub const EMPTY_LIST: &str = "Нет сотрудников для отображения.";
pub const NO_SCHEDULE: &str = "Рабочий график не найден.";

const CANDIDATES_HEADER: &str = "Найдено несколько сотрудников. Введите номер нужного:\n\n";
const CANDIDATE_SEPARATOR_WIDTH: usize = 30;

pub fn registration_success(name: &str) -> String {
    format!("Спасибо за регистрацию, {name}! Ваши данные сохранены.")
}

/// User-facing text for a recoverable flow error.
pub fn flow_error(err: &FlowError) -> &'static str {
    match err {
        FlowError::NotRegistered => "У вас нет доступа к этой команде, пройдите регистрацию",
        FlowError::EmployeeNotFound => {
            "Такого сотрудника не существует, попробуйте зарегистрироваться еще раз"
        }
        FlowError::NoMatch => "Сотрудник с таким ФИО не найден.",
        FlowError::InvalidSelection(SelectionError::NotANumber { .. }) => {
            "Пожалуйста, введите корректный номер."
        }
        FlowError::InvalidSelection(SelectionError::OutOfRange { .. }) => {
            "Неправильный номер. Попробуйте еще раз."
        }
    }
}

fn or_not_specified(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_SPECIFIED)
}

/// One line per employee, or a placeholder for an empty page.
pub fn employee_list(employees: &[Employee]) -> String {
    if employees.is_empty() {
        return EMPTY_LIST.to_string();
    }
    employees
        .iter()
        .map(|e| {
            let status = if e.working { "работает" } else { "не работает" };
            format!("{} - {status}", e.fio)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A page of the employee list with its position.
pub fn employee_page(employees: &[Employee], window: &PageWindow) -> String {
    format!(
        "Список сотрудников:\n{}\n\nСтраница {} из {}",
        employee_list(employees),
        window.page,
        window.total_pages
    )
}

pub fn employee_detail(employee: &EmployeeMatch) -> String {
    format!(
        "Сотрудник: {}\nТелефон: {}\nПочта: {}\nРаботает: {}",
        employee.fio,
        or_not_specified(employee.phone.as_deref()),
        or_not_specified(employee.mail.as_deref()),
        if employee.working { "Да" } else { "Нет" }
    )
}

/// Numbered candidates for disambiguation, starting at 1.
pub fn candidate_list(candidates: &[EmployeeMatch]) -> String {
    let separator = "-".repeat(CANDIDATE_SEPARATOR_WIDTH);
    let mut out = String::from(CANDIDATES_HEADER);
    for (i, c) in candidates.iter().enumerate() {
        let _ = write!(
            out,
            "🔢 {}. \n👤 ФИО: {}\n🏢 Отдел: {}\n👥 Команда: {}\n{separator}\n",
            i + 1,
            c.fio,
            or_not_specified(c.department.as_deref()),
            or_not_specified(c.team.as_deref()),
        );
    }
    out
}

/// Weekly schedule, Monday first. `None` renders the missing-schedule text.
pub fn work_schedule(schedule: Option<&WorkSchedule>) -> String {
    let Some(schedule) = schedule else {
        return NO_SCHEDULE.to_string();
    };
    let mut out = format!(
        "Рабочий график для {}:\n\n",
        schedule.fio.as_deref().unwrap_or(UNKNOWN_NAME)
    );
    for day in Weekday::ALL {
        let _ = writeln!(
            out,
            "{}: {}",
            day.label(),
            or_not_specified(schedule.shifts.get(day))
        );
    }
    out
}
