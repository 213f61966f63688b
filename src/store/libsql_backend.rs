//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::directory::model::{
    Department, Employee, EmployeeMatch, ExternalId, NewEmployee, Team, WeekShifts, WorkSchedule,
};
use crate::directory::pagination;
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to enable foreign keys: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Convert `Option<i64>` to libsql Value.
fn opt_int(v: Option<i64>) -> libsql::Value {
    match v {
        Some(v) => libsql::Value::Integer(v),
        None => libsql::Value::Null,
    }
}

/// Read a nullable text column.
fn get_opt_text(row: &libsql::Row, idx: i32) -> Result<Option<String>, libsql::Error> {
    Ok(match row.get_value(idx)? {
        libsql::Value::Text(s) => Some(s),
        libsql::Value::Integer(i) => Some(i.to_string()),
        libsql::Value::Real(r) => Some(r.to_string()),
        libsql::Value::Null | libsql::Value::Blob(_) => None,
    })
}

/// Read a nullable integer column.
fn get_opt_int(row: &libsql::Row, idx: i32) -> Result<Option<i64>, libsql::Error> {
    Ok(match row.get_value(idx)? {
        libsql::Value::Integer(i) => Some(i),
        _ => None,
    })
}

/// Map a unique/foreign-key failure to `Constraint`, anything else to `Query`.
fn write_error(op: &str, e: libsql::Error) -> DatabaseError {
    let msg = e.to_string();
    if msg.contains("UNIQUE constraint") || msg.contains("FOREIGN KEY constraint") {
        DatabaseError::Constraint(format!("{op}: {msg}"))
    } else {
        DatabaseError::Query(format!("{op}: {msg}"))
    }
}

/// Map a libsql Row to an Employee.
///
/// Column order matches EMPLOYEE_COLUMNS:
/// 0:id, 1:telegram_id, 2:fio, 3:company_id, 4:phone, 5:mail, 6:working,
/// 7:department_id, 8:team_id
fn row_to_employee(row: &libsql::Row) -> Result<Employee, libsql::Error> {
    Ok(Employee {
        id: row.get(0)?,
        telegram_id: get_opt_int(row, 1)?,
        fio: row.get(2)?,
        company_id: row.get(3)?,
        phone: get_opt_text(row, 4)?,
        mail: get_opt_text(row, 5)?,
        working: row.get::<i64>(6)? != 0,
        department_id: get_opt_int(row, 7)?,
        team_id: get_opt_int(row, 8)?,
    })
}

fn row_to_match(row: &libsql::Row) -> Result<EmployeeMatch, libsql::Error> {
    Ok(EmployeeMatch {
        id: row.get(0)?,
        fio: row.get(1)?,
        working: row.get::<i64>(2)? != 0,
        phone: get_opt_text(row, 3)?,
        mail: get_opt_text(row, 4)?,
        department: get_opt_text(row, 5)?,
        team: get_opt_text(row, 6)?,
    })
}

fn row_to_schedule(row: &libsql::Row) -> Result<WorkSchedule, libsql::Error> {
    let mut slots: [Option<String>; 7] = Default::default();
    for (i, slot) in slots.iter_mut().enumerate() {
        *slot = get_opt_text(row, 2 + i as i32)?;
    }
    Ok(WorkSchedule {
        employee_id: row.get(0)?,
        fio: get_opt_text(row, 1)?,
        shifts: WeekShifts::from_slots(slots),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const EMPLOYEE_COLUMNS: &str =
    "id, telegram_id, fio, company_id, phone, mail, working, department_id, team_id";

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Registration ────────────────────────────────────────────────

    async fn user_exists(&self, external_id: ExternalId) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT 1 FROM employees WHERE telegram_id = ?1 LIMIT 1",
                params![external_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("user_exists: {e}")))?;

        match rows.next().await {
            Ok(row) => Ok(row.is_some()),
            Err(e) => Err(DatabaseError::Query(format!("user_exists: {e}"))),
        }
    }

    async fn find_employee_by_external_id(
        &self,
        external_id: ExternalId,
    ) -> Result<Option<Employee>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE telegram_id = ?1 ORDER BY id LIMIT 1"
                ),
                params![external_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_employee_by_external_id: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let employee = row_to_employee(&row).map_err(|e| {
                    DatabaseError::Query(format!("find_employee_by_external_id row parse: {e}"))
                })?;
                Ok(Some(employee))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!(
                "find_employee_by_external_id: {e}"
            ))),
        }
    }

    async fn link_employee(
        &self,
        external_id: ExternalId,
        fio: &str,
        company_id: i64,
    ) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let updated = conn
            .execute(
                "UPDATE employees SET telegram_id = ?1 WHERE fio = ?2 AND company_id = ?3",
                params![external_id, fio, company_id],
            )
            .await
            .map_err(|e| write_error("link_employee", e))?;

        debug!(external_id, company_id, linked = updated > 0, "Employee link attempted");
        Ok(updated > 0)
    }

    // ── Listing ─────────────────────────────────────────────────────

    async fn list_employees_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Employee>, DatabaseError> {
        let conn = self.conn();
        let offset = i64::try_from(pagination::page_offset(page, page_size)).unwrap_or(i64::MAX);
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY id ASC LIMIT ?1 OFFSET ?2"
                ),
                params![i64::from(page_size), offset],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_employees_page: {e}")))?;

        let mut employees = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_employees_page: {e}")))?
        {
            employees.push(
                row_to_employee(&row)
                    .map_err(|e| DatabaseError::Query(format!("list_employees_page row parse: {e}")))?,
            );
        }
        Ok(employees)
    }

    async fn count_employees(&self) -> Result<u64, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query("SELECT COUNT(*) FROM employees", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_employees: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("count_employees: {e}")))?;
                Ok(u64::try_from(count).unwrap_or(0))
            }
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("count_employees: {e}"))),
        }
    }

    // ── Lookup ──────────────────────────────────────────────────────

    async fn search_by_full_name(&self, fio: &str) -> Result<Vec<EmployeeMatch>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT e.id, e.fio, e.working, e.phone, e.mail, d.name, t.name
                 FROM employees e
                 LEFT JOIN departments d ON d.id = e.department_id
                 LEFT JOIN teams t ON t.id = e.team_id
                 WHERE e.fio = ?1
                 ORDER BY e.id ASC",
                params![fio],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("search_by_full_name: {e}")))?;

        let mut matches = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("search_by_full_name: {e}")))?
        {
            matches.push(
                row_to_match(&row)
                    .map_err(|e| DatabaseError::Query(format!("search_by_full_name row parse: {e}")))?,
            );
        }
        debug!(count = matches.len(), "Search by full name");
        Ok(matches)
    }

    async fn find_employee(
        &self,
        fio: &str,
        company_id: i64,
    ) -> Result<Option<Employee>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE fio = ?1 AND company_id = ?2"
                ),
                params![fio, company_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_employee: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let employee = row_to_employee(&row)
                    .map_err(|e| DatabaseError::Query(format!("find_employee row parse: {e}")))?;
                Ok(Some(employee))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("find_employee: {e}"))),
        }
    }

    async fn get_work_schedule(
        &self,
        employee_id: i64,
    ) -> Result<Option<WorkSchedule>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT w.employee_id, e.fio, w.monday, w.tuesday, w.wednesday, w.thursday,
                        w.friday, w.saturday, w.sunday
                 FROM work_schedules w
                 LEFT JOIN employees e ON e.id = w.employee_id
                 WHERE w.employee_id = ?1
                 LIMIT 1",
                params![employee_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_work_schedule: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let schedule = row_to_schedule(&row)
                    .map_err(|e| DatabaseError::Query(format!("get_work_schedule row parse: {e}")))?;
                Ok(Some(schedule))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_work_schedule: {e}"))),
        }
    }

    // ── Directory maintenance ───────────────────────────────────────

    async fn insert_department(&self, name: &str) -> Result<Department, DatabaseError> {
        let id = insert_returning_id(
            self.conn(),
            "insert_department",
            "INSERT INTO departments (name) VALUES (?1)
             ON CONFLICT (name) DO UPDATE SET name = excluded.name RETURNING id",
            vec![libsql::Value::Text(name.to_string())],
        )
        .await?;
        Ok(Department {
            id,
            name: name.to_string(),
        })
    }

    async fn insert_team(&self, name: &str) -> Result<Team, DatabaseError> {
        let id = insert_returning_id(
            self.conn(),
            "insert_team",
            "INSERT INTO teams (name) VALUES (?1)
             ON CONFLICT (name) DO UPDATE SET name = excluded.name RETURNING id",
            vec![libsql::Value::Text(name.to_string())],
        )
        .await?;
        Ok(Team {
            id,
            name: name.to_string(),
        })
    }

    async fn insert_employee(&self, employee: &NewEmployee) -> Result<i64, DatabaseError> {
        let id = insert_returning_id(
            self.conn(),
            "insert_employee",
            "INSERT INTO employees (fio, company_id, phone, mail, working, department_id, team_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING id",
            vec![
                libsql::Value::Text(employee.fio.clone()),
                libsql::Value::Integer(employee.company_id),
                opt_text(employee.phone.as_deref()),
                opt_text(employee.mail.as_deref()),
                libsql::Value::Integer(i64::from(employee.working)),
                opt_int(employee.department_id),
                opt_int(employee.team_id),
            ],
        )
        .await?;

        debug!(employee_id = id, company_id = employee.company_id, "Employee inserted");
        Ok(id)
    }

    async fn set_work_schedule(
        &self,
        employee_id: i64,
        shifts: &WeekShifts,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let [mon, tue, wed, thu, fri, sat, sun] = shifts.slots();
        conn.execute(
            "INSERT INTO work_schedules
                (employee_id, monday, tuesday, wednesday, thursday, friday, saturday, sunday)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT (employee_id) DO UPDATE SET
                monday = excluded.monday,
                tuesday = excluded.tuesday,
                wednesday = excluded.wednesday,
                thursday = excluded.thursday,
                friday = excluded.friday,
                saturday = excluded.saturday,
                sunday = excluded.sunday",
            params![
                employee_id,
                opt_text(mon),
                opt_text(tue),
                opt_text(wed),
                opt_text(thu),
                opt_text(fri),
                opt_text(sat),
                opt_text(sun),
            ],
        )
        .await
        .map_err(|e| write_error("set_work_schedule", e))?;
        Ok(())
    }

    // ── Conversation sessions ───────────────────────────────────────

    async fn get_session(
        &self,
        external_id: ExternalId,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT session FROM conversation_sessions WHERE external_id = ?1",
                params![external_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_session: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value_str: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_session: {e}")))?;
                let value = serde_json::from_str(&value_str)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_session: {e}"))),
        }
    }

    async fn set_session(
        &self,
        external_id: ExternalId,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let value_str = serde_json::to_string(value)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO conversation_sessions (external_id, session, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (external_id) DO UPDATE SET session = ?2, updated_at = ?3",
            params![external_id, value_str, now],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("set_session: {e}")))?;

        Ok(())
    }

    async fn delete_session(&self, external_id: ExternalId) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute(
                "DELETE FROM conversation_sessions WHERE external_id = ?1",
                params![external_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_session: {e}")))?;
        Ok(count > 0)
    }
}

/// Run an `INSERT ... RETURNING id` and return the id.
async fn insert_returning_id(
    conn: &Connection,
    op: &str,
    sql: &str,
    values: Vec<libsql::Value>,
) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query(sql, values)
        .await
        .map_err(|e| write_error(op, e))?;

    match rows.next().await {
        Ok(Some(row)) => row
            .get::<i64>(0)
            .map_err(|e| DatabaseError::Query(format!("{op} returning id: {e}"))),
        Ok(None) => Err(DatabaseError::Query(format!("{op}: no id returned"))),
        Err(e) => Err(write_error(op, e)),
    }
}
