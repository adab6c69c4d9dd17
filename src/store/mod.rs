//! Persistence seams. Handlers and the auth gate only see these traits;
//! `mysql` is the production backend and `memory` backs tests and demos.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::model::account::{Account, NewAccount};
use crate::model::employee::{Employee, EmployeePatch, NewEmployee};
use crate::query::{EmployeeFilter, EmployeeStats, PageRequest};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique field already holds this value.
    #[error("duplicate value for {field}")]
    Conflict { field: String },

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn conflict(field: &str) -> Self {
        Self::Conflict {
            field: field.to_string(),
        }
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError>;

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Exact, case-sensitive lookup.
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    async fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> Result<bool, StoreError>;

    /// Case-insensitive; `exclude` lets an account keep its own address.
    async fn account_email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, StoreError>;

    async fn update_profile(
        &self,
        id: Uuid,
        username: Option<String>,
        email: Option<String>,
    ) -> Result<Option<Account>, StoreError>;

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<bool, StoreError>;

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError>;

    async fn record_login(&self, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Persists a validated employee, assigning the next `employeeId` from
    /// the sequence in the same atomic step as the write.
    async fn insert_employee(&self, new: NewEmployee) -> Result<Employee, StoreError>;

    async fn find_employee(&self, id: Uuid) -> Result<Option<Employee>, StoreError>;

    /// Case-insensitive; `exclude` lets a record keep its own address.
    async fn employee_email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, StoreError>;

    /// Returns `None` when no record has this id.
    async fn update_employee(&self, id: Uuid, patch: EmployeePatch) -> Result<Option<Employee>, StoreError>;

    async fn delete_employee(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Newest first. Returns the page and the total matching count.
    async fn list_employees(
        &self,
        filter: &EmployeeFilter,
        page: PageRequest,
    ) -> Result<(Vec<Employee>, u64), StoreError>;

    /// Point-in-time aggregate; hires on or after `since` count as recent.
    async fn employee_stats(&self, since: NaiveDate) -> Result<EmployeeStats, StoreError>;
}
