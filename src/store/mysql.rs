use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use sqlx::{FromRow, MySqlPool, types::Json};
use tracing::{debug, error};
use uuid::Uuid;

use crate::model::account::{Account, NewAccount};
use crate::model::employee::{
    Address, Department, EmergencyContact, Employee, EmployeePatch, EmployeeStatus, NewEmployee,
    format_employee_id,
};
use crate::model::role::Role;
use crate::query::{
    DepartmentStat, EmployeeFilter, EmployeeStats, PageRequest, StatsOverview, like_pattern,
    sort_department_stats,
};
use crate::store::{AccountStore, EmployeeStore, StoreError};
use crate::utils::db_utils::{SqlValue, bind_values, build_update_sql, employee_assignments};

const EMPLOYEE_SEQUENCE: &str = "employee";

const EMPLOYEE_COLUMNS: &str = "id, employee_id, name, email, phone, position, department, \
     salary, join_date, status, address, emergency_contact, profile_picture, created_at, updated_at";

const ACCOUNT_COLUMNS: &str =
    "id, username, password_hash, email, role, is_active, created_at, last_login_at";

/// Keeps `updated_at` strictly increasing even within one microsecond.
const TOUCH_UPDATED_AT: &str = "updated_at = GREATEST(NOW(6), updated_at + INTERVAL 1 MICROSECOND)";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && db_err.is_unique_violation()
        {
            // MySQL only reports the key name inside the message, e.g.
            // "Duplicate entry 'x' for key 'employees.uq_employees_email'".
            let key = db_err.message().rsplit("for key").next().unwrap_or_default();
            let field = if key.contains("email") {
                "email"
            } else if key.contains("username") {
                "username"
            } else if key.contains("employee_id") || key.contains("seq") {
                "employeeId"
            } else {
                "unknown"
            };
            return StoreError::conflict(field);
        }
        error!(error = %err, "database error");
        StoreError::Database(err)
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|_| StoreError::Corrupt(format!("bad uuid {raw}")))
}

#[derive(FromRow)]
struct AccountRow {
    id: String,
    username: String,
    password_hash: String,
    email: Option<String>,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: parse_uuid(&row.id)?,
            role: Role::from_str(&row.role)
                .map_err(|_| StoreError::Corrupt(format!("unknown role {}", row.role)))?,
            username: row.username,
            password_hash: row.password_hash,
            email: row.email,
            is_active: row.is_active,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
        })
    }
}

#[derive(FromRow)]
struct EmployeeRow {
    id: String,
    employee_id: String,
    name: String,
    email: String,
    phone: String,
    position: String,
    department: String,
    salary: f64,
    join_date: NaiveDate,
    status: String,
    address: Option<Json<Address>>,
    emergency_contact: Option<Json<EmergencyContact>>,
    profile_picture: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = StoreError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        Ok(Employee {
            id: parse_uuid(&row.id)?,
            department: Department::from_str(&row.department)
                .map_err(|_| StoreError::Corrupt(format!("unknown department {}", row.department)))?,
            status: EmployeeStatus::from_str(&row.status)
                .map_err(|_| StoreError::Corrupt(format!("unknown status {}", row.status)))?,
            employee_id: row.employee_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            position: row.position,
            salary: row.salary,
            join_date: row.join_date,
            address: row.address.map(|j| j.0),
            emergency_contact: row.emergency_contact.map(|j| j.0),
            profile_picture: row.profile_picture,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// MySQL backend. Uniqueness is enforced by indexes; `employeeId` comes from
/// the `id_sequences` row, locked for the duration of the insert transaction.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_employee<'e, E>(executor: E, id: Uuid) -> Result<Option<Employee>, StoreError>
    where
        E: sqlx::Executor<'e, Database = sqlx::MySql>,
    {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(executor)
            .await?
            .map(Employee::try_from)
            .transpose()
    }
}

#[async_trait]
impl AccountStore for MySqlStore {
    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let account = Account {
            id: Uuid::new_v4(),
            username: new.username,
            password_hash: new.password_hash,
            email: new.email,
            role: new.role,
            is_active: true,
            created_at: Utc::now().trunc_subsecs(6),
            last_login_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO accounts (id, username, password_hash, email, role, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, TRUE, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(&account.email)
        .bind(account.role.to_string())
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        // `username` uses a binary collation, so this comparison is case-sensitive.
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = ? AND id <> ? LIMIT 1)",
        )
        .bind(username)
        .bind(exclude.map(|id| id.to_string()).unwrap_or_default())
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn account_email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE LOWER(email) = LOWER(?) AND id <> ? LIMIT 1)",
        )
        .bind(email)
        .bind(exclude.map(|id| id.to_string()).unwrap_or_default())
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        username: Option<String>,
        email: Option<String>,
    ) -> Result<Option<Account>, StoreError> {
        let mut assignments = Vec::new();
        if let Some(u) = username {
            assignments.push(("username", SqlValue::String(u)));
        }
        if let Some(e) = email {
            assignments.push(("email", SqlValue::String(e)));
        }

        if let Some(update) = build_update_sql("accounts", assignments, None, "id", id.to_string()) {
            debug!(sql = %update.sql, "Updating account profile");
            bind_values(&update).execute(&self.pool).await?;
        }

        self.find_account(id).await
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE accounts SET password_hash = ? WHERE id = ?")
            .bind(hash)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = ?)")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;
        if exists {
            sqlx::query("UPDATE accounts SET is_active = ? WHERE id = ?")
                .bind(active)
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;
        }
        Ok(exists)
    }

    async fn record_login(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE accounts SET last_login_at = NOW(6) WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EmployeeStore for MySqlStore {
    async fn insert_employee(&self, new: NewEmployee) -> Result<Employee, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the sequence serializes concurrent creators until commit;
        // a rolled-back insert gives its number back.
        let bumped = sqlx::query(
            "UPDATE id_sequences SET value = LAST_INSERT_ID(value + 1) WHERE name = ?",
        )
        .bind(EMPLOYEE_SEQUENCE)
        .execute(&mut *tx)
        .await?;
        if bumped.rows_affected() == 0 {
            return Err(StoreError::Corrupt("employee sequence row missing".into()));
        }
        let seq = bumped.last_insert_id();

        let now = Utc::now().trunc_subsecs(6);
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

        let sql = format!(
            "INSERT INTO employees (seq, {EMPLOYEE_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        sqlx::query(&sql)
            .bind(seq)
            .bind(employee.id.to_string())
            .bind(&employee.employee_id)
            .bind(&employee.name)
            .bind(&employee.email)
            .bind(&employee.phone)
            .bind(&employee.position)
            .bind(employee.department.to_string())
            .bind(employee.salary)
            .bind(employee.join_date)
            .bind(employee.status.to_string())
            .bind(employee.address.as_ref().map(Json))
            .bind(employee.emergency_contact.as_ref().map(Json))
            .bind(&employee.profile_picture)
            .bind(employee.created_at)
            .bind(employee.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(employee_id = %employee.employee_id, seq, "Employee inserted");
        Ok(employee)
    }

    async fn find_employee(&self, id: Uuid) -> Result<Option<Employee>, StoreError> {
        Self::fetch_employee(&self.pool, id).await
    }

    async fn employee_email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE LOWER(email) = LOWER(?) AND id <> ? LIMIT 1)",
        )
        .bind(email)
        .bind(exclude.map(|id| id.to_string()).unwrap_or_default())
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn update_employee(&self, id: Uuid, patch: EmployeePatch) -> Result<Option<Employee>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(update) = build_update_sql(
            "employees",
            employee_assignments(&patch),
            Some(TOUCH_UPDATED_AT),
            "id",
            id.to_string(),
        ) else {
            return Ok(None);
        };
        debug!(sql = %update.sql, "Updating employee");

        // updated_at always moves, so an existing row always counts as affected.
        let result = bind_values(&update).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let updated = Self::fetch_employee(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_employee(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_employees(
        &self,
        filter: &EmployeeFilter,
        page: PageRequest,
    ) -> Result<(Vec<Employee>, u64), StoreError> {
        // ---------- build WHERE clause dynamically ----------
        let mut conditions = Vec::new();
        let mut bindings: Vec<String> = Vec::new();

        // stored and bound values are both canonical variant names
        if let Some(department) = filter.department {
            conditions.push("department = ?");
            bindings.push(department.to_string());
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            bindings.push(status.to_string());
        }

        if let Some(search) = &filter.search {
            conditions.push(
                "(name LIKE ? OR email LIKE ? OR employee_id LIKE ? OR position LIKE ?)",
            );
            let like = like_pattern(search);
            bindings.extend(std::iter::repeat_n(like, 4));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // ---------- total count ----------
        let count_sql = format!("SELECT COUNT(*) FROM employees {where_clause}");
        debug!(sql = %count_sql, bindings = ?bindings, "Counting employees");

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for b in &bindings {
            count_query = count_query.bind(b);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        // ---------- data query ----------
        let data_sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees {where_clause} \
             ORDER BY created_at DESC, seq DESC LIMIT ? OFFSET ?"
        );
        debug!(sql = %data_sql, page = page.page, limit = page.limit, "Fetching employees");

        let mut data_query = sqlx::query_as::<_, EmployeeRow>(&data_sql);
        for b in &bindings {
            data_query = data_query.bind(b);
        }
        let rows = data_query
            .bind(u64::from(page.limit))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let employees = rows
            .into_iter()
            .map(Employee::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((employees, u64::try_from(total).unwrap_or(0)))
    }

    async fn employee_stats(&self, since: NaiveDate) -> Result<EmployeeStats, StoreError> {
        // One transaction so both reads see the same snapshot.
        let mut tx = self.pool.begin().await?;

        let (total, active, inactive, terminated, recent) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
                r#"
                SELECT
                    COUNT(*),
                    CAST(COALESCE(SUM(status = 'Active'), 0) AS SIGNED),
                    CAST(COALESCE(SUM(status = 'Inactive'), 0) AS SIGNED),
                    CAST(COALESCE(SUM(status = 'Terminated'), 0) AS SIGNED),
                    CAST(COALESCE(SUM(join_date >= ?), 0) AS SIGNED)
                FROM employees
                "#,
            )
            .bind(since)
            .fetch_one(&mut *tx)
            .await?;

        let groups = sqlx::query_as::<_, (String, i64, f64)>(
            r#"
            SELECT department, COUNT(*), AVG(salary)
            FROM employees
            GROUP BY department
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut department_stats = groups
            .into_iter()
            .map(|(department, count, avg_salary)| {
                Ok(DepartmentStat {
                    department: Department::from_str(&department)
                        .map_err(|_| StoreError::Corrupt(format!("unknown department {department}")))?,
                    count: u64::try_from(count).unwrap_or(0),
                    avg_salary,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        sort_department_stats(&mut department_stats);

        let count = |n: i64| u64::try_from(n).unwrap_or(0);
        Ok(EmployeeStats {
            overview: StatsOverview {
                total_employees: count(total),
                active_employees: count(active),
                inactive_employees: count(inactive),
                terminated_employees: count(terminated),
                recent_hires: count(recent),
            },
            department_stats,
        })
    }
}
