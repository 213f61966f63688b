//! Unified `Database` trait: single async interface for all persistence.

use async_trait::async_trait;

use crate::directory::model::{
    Department, Employee, EmployeeMatch, ExternalId, NewEmployee, Team, WeekShifts, WorkSchedule,
};
use crate::directory::pagination;
use crate::error::DatabaseError;

/// Backend-agnostic database trait covering the HR directory and
/// persisted conversation sessions.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Registration ────────────────────────────────────────────────

    /// Whether an employee is linked to this chat identity.
    async fn user_exists(&self, external_id: ExternalId) -> Result<bool, DatabaseError>;

    /// The employee linked to this chat identity, if any.
    async fn find_employee_by_external_id(
        &self,
        external_id: ExternalId,
    ) -> Result<Option<Employee>, DatabaseError>;

    /// Link the employee identified by `(fio, company_id)` to a chat identity.
    ///
    /// Returns `false` and changes nothing when no such employee exists.
    /// An identity already linked elsewhere is not checked.
    async fn link_employee(
        &self,
        external_id: ExternalId,
        fio: &str,
        company_id: i64,
    ) -> Result<bool, DatabaseError>;

    // ── Listing ─────────────────────────────────────────────────────

    /// Employees on a 1-based page, ordered by id. Empty past the end.
    async fn list_employees_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Employee>, DatabaseError>;

    /// Total number of employees.
    async fn count_employees(&self) -> Result<u64, DatabaseError>;

    /// Number of pages of `page_size` employees.
    async fn count_pages(&self, page_size: u32) -> Result<u32, DatabaseError> {
        let total = self.count_employees().await?;
        Ok(pagination::count_pages(total, page_size))
    }

    // ── Lookup ──────────────────────────────────────────────────────

    /// Exact, case-sensitive match on full name, ordered by id.
    async fn search_by_full_name(&self, fio: &str) -> Result<Vec<EmployeeMatch>, DatabaseError>;

    /// Look up an employee by `(fio, company_id)`.
    async fn find_employee(
        &self,
        fio: &str,
        company_id: i64,
    ) -> Result<Option<Employee>, DatabaseError>;

    /// Weekly schedule of an employee, or `None` if no schedule row exists.
    async fn get_work_schedule(
        &self,
        employee_id: i64,
    ) -> Result<Option<WorkSchedule>, DatabaseError>;

    // ── Directory maintenance ───────────────────────────────────────

    /// Create a department, or return the existing one with this name.
    async fn insert_department(&self, name: &str) -> Result<Department, DatabaseError>;

    /// Create a team, or return the existing one with this name.
    async fn insert_team(&self, name: &str) -> Result<Team, DatabaseError>;

    /// Insert an employee. Returns the new id.
    async fn insert_employee(&self, employee: &NewEmployee) -> Result<i64, DatabaseError>;

    /// Create or replace the schedule of an employee.
    async fn set_work_schedule(
        &self,
        employee_id: i64,
        shifts: &WeekShifts,
    ) -> Result<(), DatabaseError>;

    // ── Conversation sessions ───────────────────────────────────────

    /// Persisted session JSON for a chat identity.
    async fn get_session(
        &self,
        external_id: ExternalId,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    async fn set_session(
        &self,
        external_id: ExternalId,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Returns whether a session was removed.
    async fn delete_session(&self, external_id: ExternalId) -> Result<bool, DatabaseError>;
}
