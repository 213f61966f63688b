//! Directory records: employees, departments, teams and work schedules.

use serde::{Deserialize, Serialize};

/// Telegram user id of a chat participant.
pub type ExternalId = i64;

/// A department of the company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
}

/// A team inside the company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
}

/// An employee row.
///
/// `(fio, company_id)` is unique. `telegram_id` stays `None` until the
/// employee links their chat account through registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub telegram_id: Option<ExternalId>,
    pub fio: String,
    pub company_id: i64,
    pub phone: Option<String>,
    pub mail: Option<String>,
    pub working: bool,
    pub department_id: Option<i64>,
    pub team_id: Option<i64>,
}

/// Fields needed to create an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub fio: String,
    pub company_id: i64,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub working: bool,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub team_id: Option<i64>,
}

impl NewEmployee {
    pub fn new(fio: impl Into<String>, company_id: i64) -> Self {
        Self {
            fio: fio.into(),
            company_id,
            phone: None,
            mail: None,
            working: false,
            department_id: None,
            team_id: None,
        }
    }

    pub fn with_contacts(mut self, phone: &str, mail: &str) -> Self {
        self.phone = Some(phone.to_string());
        self.mail = Some(mail.to_string());
        self
    }

    pub fn working(mut self, working: bool) -> Self {
        self.working = working;
        self
    }

    pub fn in_department(mut self, department_id: i64) -> Self {
        self.department_id = Some(department_id);
        self
    }

    pub fn in_team(mut self, team_id: i64) -> Self {
        self.team_id = Some(team_id);
        self
    }
}

/// One result of a search by full name, with department and team resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeMatch {
    pub id: i64,
    pub fio: String,
    pub working: bool,
    pub phone: Option<String>,
    pub mail: Option<String>,
    pub department: Option<String>,
    pub team: Option<String>,
}

/// Days of the week, in schedule column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Russian display name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Monday => "Понедельник",
            Self::Tuesday => "Вторник",
            Self::Wednesday => "Среда",
            Self::Thursday => "Четверг",
            Self::Friday => "Пятница",
            Self::Saturday => "Суббота",
            Self::Sunday => "Воскресенье",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Weekly shift texts for one employee, one slot per weekday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekShifts {
    #[serde(default)]
    pub monday: Option<String>,
    #[serde(default)]
    pub tuesday: Option<String>,
    #[serde(default)]
    pub wednesday: Option<String>,
    #[serde(default)]
    pub thursday: Option<String>,
    #[serde(default)]
    pub friday: Option<String>,
    #[serde(default)]
    pub saturday: Option<String>,
    #[serde(default)]
    pub sunday: Option<String>,
}

impl WeekShifts {
    /// Build from slots in Monday..Sunday order.
    pub fn from_slots(slots: [Option<String>; 7]) -> Self {
        let [monday, tuesday, wednesday, thursday, friday, saturday, sunday] = slots;
        Self {
            monday,
            tuesday,
            wednesday,
            thursday,
            friday,
            saturday,
            sunday,
        }
    }

    /// Slots in Monday..Sunday order.
    pub fn slots(&self) -> [Option<&str>; 7] {
        [
            self.monday.as_deref(),
            self.tuesday.as_deref(),
            self.wednesday.as_deref(),
            self.thursday.as_deref(),
            self.friday.as_deref(),
            self.saturday.as_deref(),
            self.sunday.as_deref(),
        ]
    }

    pub fn get(&self, day: Weekday) -> Option<&str> {
        self.slots()[day.index()]
    }
}

/// A work schedule joined with its employee's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSchedule {
    pub employee_id: i64,
    /// `None` when the schedule row points at no existing employee.
    pub fio: Option<String>,
    pub shifts: WeekShifts,
}
