use chrono::NaiveDate;
use serde_json::Value;
use sqlx::{MySql, mysql::MySqlArguments, query::Query};

use crate::model::employee::EmployeePatch;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    F64(f64),
    Date(NaiveDate),
    Json(Value),
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// `assignments` become `col = ?` pairs; `extra_set` is appended verbatim
/// (used for server-side timestamp expressions). Returns `None` when there
/// is nothing to set.
pub fn build_update_sql(
    table: &str,
    assignments: Vec<(&'static str, SqlValue)>,
    extra_set: Option<&str>,
    id_column: &str,
    id_value: String,
) -> Option<SqlUpdate> {
    if assignments.is_empty() && extra_set.is_none() {
        return None;
    }

    let mut set_clause: Vec<String> = assignments
        .iter()
        .map(|(col, _)| format!("{col} = ?"))
        .collect();
    if let Some(extra) = extra_set {
        set_clause.push(extra.to_string());
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        set_clause.join(", "),
        id_column
    );

    let mut values: Vec<SqlValue> = assignments.into_iter().map(|(_, v)| v).collect();
    values.push(SqlValue::String(id_value));

    Some(SqlUpdate { sql, values })
}

/// Binds every value of `update` onto a query in order.
pub fn bind_values(update: &SqlUpdate) -> Query<'_, MySql, MySqlArguments> {
    let mut query = sqlx::query(&update.sql);

    for value in &update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v.clone()),
            SqlValue::F64(v) => query.bind(*v),
            SqlValue::Date(v) => query.bind(*v),
            SqlValue::Json(v) => query.bind(sqlx::types::Json(v.clone())),
        };
    }

    query
}

fn json_of<T: serde::Serialize>(value: &T) -> SqlValue {
    SqlValue::Json(serde_json::to_value(value).unwrap_or(Value::Null))
}

/// Column assignments for the fields a patch actually carries.
pub fn employee_assignments(patch: &EmployeePatch) -> Vec<(&'static str, SqlValue)> {
    let mut out = Vec::new();
    if let Some(v) = &patch.name {
        out.push(("name", SqlValue::String(v.clone())));
    }
    if let Some(v) = &patch.email {
        out.push(("email", SqlValue::String(v.clone())));
    }
    if let Some(v) = &patch.phone {
        out.push(("phone", SqlValue::String(v.clone())));
    }
    if let Some(v) = &patch.position {
        out.push(("position", SqlValue::String(v.clone())));
    }
    if let Some(v) = patch.department {
        out.push(("department", SqlValue::String(v.to_string())));
    }
    if let Some(v) = patch.salary {
        out.push(("salary", SqlValue::F64(v)));
    }
    if let Some(v) = patch.join_date {
        out.push(("join_date", SqlValue::Date(v)));
    }
    if let Some(v) = patch.status {
        out.push(("status", SqlValue::String(v.to_string())));
    }
    if let Some(v) = &patch.address {
        out.push(("address", json_of(v)));
    }
    if let Some(v) = &patch.emergency_contact {
        out.push(("emergency_contact", json_of(v)));
    }
    if let Some(v) = &patch.profile_picture {
        out.push(("profile_picture", SqlValue::String(v.clone())));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::EmployeeStatus;

    #[test]
    fn only_supplied_columns_are_set() {
        let patch = EmployeePatch {
            status: Some(EmployeeStatus::Terminated),
            salary: Some(1200.0),
            ..Default::default()
        };
        let update = build_update_sql(
            "employees",
            employee_assignments(&patch),
            Some("updated_at = NOW(6)"),
            "id",
            "abc".into(),
        )
        .unwrap();

        assert_eq!(
            update.sql,
            "UPDATE employees SET salary = ?, status = ?, updated_at = NOW(6) WHERE id = ?"
        );
        assert_eq!(
            update.values,
            vec![
                SqlValue::F64(1200.0),
                SqlValue::String("Terminated".into()),
                SqlValue::String("abc".into()),
            ]
        );
    }

    #[test]
    fn nothing_to_set_yields_none() {
        assert!(build_update_sql("accounts", Vec::new(), None, "id", "abc".into()).is_none());
    }
}
