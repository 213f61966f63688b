//! Directory seed: load departments, teams, employees and schedules from a
//! JSON document at startup.
//!
//! ```json
//! {
//!   "departments": ["Продажи"],
//!   "teams": ["Альфа"],
//!   "employees": [
//!     {
//!       "fio": "Иванов Иван Иванович",
//!       "company_id": 42,
//!       "phone": "+7 900 000-00-00",
//!       "mail": "ivanov@example.com",
//!       "working": true,
//!       "department": "Продажи",
//!       "team": "Альфа",
//!       "schedule": { "monday": "9:00-18:00" }
//!     }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::directory::model::{NewEmployee, WeekShifts};
use crate::error::{ConfigError, DatabaseError};
use crate::store::Database;

/// Top-level seed document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub employees: Vec<SeedEmployee>,
}

/// One employee entry. Department and team are referenced by name.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEmployee {
    pub fio: String,
    pub company_id: i64,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub working: bool,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub schedule: Option<WeekShifts>,
}

/// Counts of what a seed run touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Distinct departments resolved (created or reused).
    pub departments: usize,
    /// Distinct teams resolved (created or reused).
    pub teams: usize,
    pub employees: usize,
    pub skipped: usize,
    pub schedules: usize,
}

impl DirectorySeed {
    /// Read and parse a seed file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::ParseError(format!("seed file: {e}")))
    }

    /// Insert the seed into the directory.
    ///
    /// Employees already present under the same `(fio, company_id)` are
    /// skipped, schedule included. Departments and teams are matched by name,
    /// so re-running a seed never duplicates them.
    pub async fn apply(&self, db: &dyn Database) -> Result<SeedReport, DatabaseError> {
        let mut report = SeedReport::default();
        let mut departments: HashMap<String, i64> = HashMap::new();
        let mut teams: HashMap<String, i64> = HashMap::new();

        for employee in &self.employees {
            if db
                .find_employee(&employee.fio, employee.company_id)
                .await?
                .is_some()
            {
                debug!(company_id = employee.company_id, "Seed employee already present");
                report.skipped += 1;
                continue;
            }

            let department_id = match employee.department.as_deref() {
                Some(name) => Some(
                    ensure_department(db, &mut departments, name, &mut report).await?,
                ),
                None => None,
            };
            let team_id = match employee.team.as_deref() {
                Some(name) => Some(ensure_team(db, &mut teams, name, &mut report).await?),
                None => None,
            };

            let id = db
                .insert_employee(&NewEmployee {
                    fio: employee.fio.clone(),
                    company_id: employee.company_id,
                    phone: employee.phone.clone(),
                    mail: employee.mail.clone(),
                    working: employee.working,
                    department_id,
                    team_id,
                })
                .await?;
            report.employees += 1;

            if let Some(ref shifts) = employee.schedule {
                db.set_work_schedule(id, shifts).await?;
                report.schedules += 1;
            }
        }

        for name in &self.departments {
            ensure_department(db, &mut departments, name, &mut report).await?;
        }
        for name in &self.teams {
            ensure_team(db, &mut teams, name, &mut report).await?;
        }

        info!(
            departments = report.departments,
            teams = report.teams,
            employees = report.employees,
            skipped = report.skipped,
            schedules = report.schedules,
            "Directory seed applied"
        );
        Ok(report)
    }
}

async fn ensure_department(
    db: &dyn Database,
    known: &mut HashMap<String, i64>,
    name: &str,
    report: &mut SeedReport,
) -> Result<i64, DatabaseError> {
    if let Some(id) = known.get(name) {
        return Ok(*id);
    }
    let department = db.insert_department(name).await?;
    known.insert(name.to_string(), department.id);
    report.departments += 1;
    Ok(department.id)
}

async fn ensure_team(
    db: &dyn Database,
    known: &mut HashMap<String, i64>,
    name: &str,
    report: &mut SeedReport,
) -> Result<i64, DatabaseError> {
    if let Some(id) = known.get(name) {
        return Ok(*id);
    }
    let team = db.insert_team(name).await?;
    known.insert(name.to_string(), team.id);
    report.teams += 1;
    Ok(team.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;

    const SEED: &str = r#"{
        "departments": ["Продажи", "Бухгалтерия"],
        "teams": ["Альфа"],
        "employees": [
            {
                "fio": "Ivan Ivanov",
                "company_id": 42,
                "phone": "+7 900 000-00-01",
                "working": true,
                "department": "Продажи",
                "team": "Альфа",
                "schedule": {"monday": "9-18", "friday": "9-16"}
            },
            {"fio": "Анна Смирнова", "company_id": 7, "department": "ИТ"}
        ]
    }"#;

    #[tokio::test]
    async fn apply_creates_directory() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        let seed = DirectorySeed::from_json(SEED).unwrap();

        let report = seed.apply(&db).await.unwrap();
        assert_eq!(report.employees, 2);
        assert_eq!(report.schedules, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.departments, 3);
        assert_eq!(report.teams, 1);

        let found = db.search_by_full_name("Анна Смирнова").await.unwrap();
        assert_eq!(found[0].department.as_deref(), Some("ИТ"));

        let ivan = db.find_employee("Ivan Ivanov", 42).await.unwrap().unwrap();
        let schedule = db.get_work_schedule(ivan.id).await.unwrap().unwrap();
        assert_eq!(schedule.shifts.friday.as_deref(), Some("9-16"));
    }

    #[tokio::test]
    async fn reapplying_skips_existing_employees() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        let seed = DirectorySeed::from_json(SEED).unwrap();
        seed.apply(&db).await.unwrap();

        let again = seed.apply(&db).await.unwrap();
        assert_eq!(again.employees, 0);
        assert_eq!(again.skipped, 2);
        assert_eq!(db.count_employees().await.unwrap(), 2);
    }

    #[test]
    fn malformed_seed_is_parse_error() {
        let err = DirectorySeed::from_json(r#"{"employees": [{"fio": 1}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn missing_seed_file_is_io_error() {
        let err = DirectorySeed::from_file(Path::new("/nonexistent/seed.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
