use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::model::account::{Account, NewAccount};
use crate::model::employee::{Employee, EmployeePatch, NewEmployee, format_employee_id};
use crate::query::{EmployeeFilter, EmployeeStats, PageRequest, compute_stats};
use crate::store::{AccountStore, EmployeeStore, StoreError};

struct StoredEmployee {
    seq: u64,
    employee: Employee,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    employees: Vec<StoredEmployee>,
    /// Last issued employee sequence number. Only ever grows.
    employee_seq: u64,
}

/// In-process store. Every write happens under one lock, which gives the
/// same guarantees the MySQL backend gets from its unique indexes and the
/// sequence row lock.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

/// Strictly later than `previous`, so an update always moves the timestamp.
fn advance(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous + Duration::microseconds(1))
}

impl State {
    fn account_email_taken(&self, email: &str, exclude: Option<Uuid>) -> bool {
        self.accounts.iter().any(|a| {
            Some(a.id) != exclude
                && a.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
        })
    }

    fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> bool {
        self.accounts
            .iter()
            .any(|a| Some(a.id) != exclude && a.username == username)
    }

    fn employee_email_taken(&self, email: &str, exclude: Option<Uuid>) -> bool {
        self.employees
            .iter()
            .any(|s| Some(s.employee.id) != exclude && s.employee.email.eq_ignore_ascii_case(email))
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut state = self.write()?;
        if state.username_taken(&new.username, None) {
            return Err(StoreError::conflict("username"));
        }
        if let Some(email) = &new.email
            && state.account_email_taken(email, None)
        {
            return Err(StoreError::conflict("email"));
        }

        let account = Account {
            id: Uuid::new_v4(),
            username: new.username,
            password_hash: new.password_hash,
            email: new.email,
            role: new.role,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        };
        state.accounts.push(account.clone());
        Ok(account)
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .read()?
            .accounts
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        Ok(self.read()?.username_taken(username, exclude))
    }

    async fn account_email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        Ok(self.read()?.account_email_taken(email, exclude))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        username: Option<String>,
        email: Option<String>,
    ) -> Result<Option<Account>, StoreError> {
        let mut state = self.write()?;
        if let Some(u) = &username
            && state.username_taken(u, Some(id))
        {
            return Err(StoreError::conflict("username"));
        }
        if let Some(e) = &email
            && state.account_email_taken(e, Some(id))
        {
            return Err(StoreError::conflict("email"));
        }

        let Some(account) = state.accounts.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(u) = username {
            account.username = u;
        }
        if let Some(e) = email {
            account.email = Some(e);
        }
        Ok(Some(account.clone()))
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        match state.accounts.iter_mut().find(|a| a.id == id) {
            Some(account) => {
                account.password_hash = hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        match state.accounts.iter_mut().find(|a| a.id == id) {
            Some(account) => {
                account.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_login(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if let Some(account) = state.accounts.iter_mut().find(|a| a.id == id) {
            account.last_login_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn insert_employee(&self, new: NewEmployee) -> Result<Employee, StoreError> {
        let mut state = self.write()?;
        if state.employee_email_taken(&new.email, None) {
            return Err(StoreError::conflict("email"));
        }

        // Counter and insert share the critical section, so two creates can
        // never observe the same number.
        let seq = state.employee_seq + 1;
        let now = Utc::now();
        let employee = Employee {
            id: Uuid::new_v4(),
            employee_id: format_employee_id(seq),
            name: new.name,
            email: new.email,
            phone: new.phone,
            position: new.position,
            department: new.department,
            salary: new.salary,
            join_date: new.join_date,
            status: new.status,
            address: new.address,
            emergency_contact: new.emergency_contact,
            profile_picture: new.profile_picture,
            created_at: now,
            updated_at: now,
        };
        state.employee_seq = seq;
        state.employees.push(StoredEmployee {
            seq,
            employee: employee.clone(),
        });
        Ok(employee)
    }

    async fn find_employee(&self, id: Uuid) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .read()?
            .employees
            .iter()
            .find(|s| s.employee.id == id)
            .map(|s| s.employee.clone()))
    }

    async fn employee_email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        Ok(self.read()?.employee_email_taken(email, exclude))
    }

    async fn update_employee(&self, id: Uuid, patch: EmployeePatch) -> Result<Option<Employee>, StoreError> {
        let mut state = self.write()?;
        if let Some(email) = &patch.email
            && state.employee_email_taken(email, Some(id))
        {
            return Err(StoreError::conflict("email"));
        }

        let Some(stored) = state.employees.iter_mut().find(|s| s.employee.id == id) else {
            return Ok(None);
        };
        patch.apply_to(&mut stored.employee);
        stored.employee.updated_at = advance(stored.employee.updated_at);
        Ok(Some(stored.employee.clone()))
    }

    async fn delete_employee(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        let before = state.employees.len();
        state.employees.retain(|s| s.employee.id != id);
        Ok(state.employees.len() != before)
    }

    async fn list_employees(
        &self,
        filter: &EmployeeFilter,
        page: PageRequest,
    ) -> Result<(Vec<Employee>, u64), StoreError> {
        let state = self.read()?;
        let mut matching: Vec<&StoredEmployee> = state
            .employees
            .iter()
            .filter(|s| filter.matches(&s.employee))
            .collect();
        matching.sort_by(|a, b| {
            b.employee
                .created_at
                .cmp(&a.employee.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(page.limit as usize)
            .map(|s| s.employee.clone())
            .collect();
        Ok((items, total))
    }

    async fn employee_stats(&self, since: NaiveDate) -> Result<EmployeeStats, StoreError> {
        let state = self.read()?;
        Ok(compute_stats(state.employees.iter().map(|s| &s.employee), since))
    }
}
