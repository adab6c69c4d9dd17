use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Prefix of the human-readable employee identifier.
pub const EMPLOYEE_ID_PREFIX: &str = "EMP";

/// Formats a sequence number as `EMP0001`. Numbers past 9999 widen.
pub fn format_employee_id(seq: u64) -> String {
    format!("{EMPLOYEE_ID_PREFIX}{seq:04}")
}

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
pub enum Department {
    Engineering,
    Marketing,
    Sales,
    #[serde(rename = "HR")]
    #[strum(serialize = "HR")]
    Hr,
    Finance,
    Operations,
    Design,
    Product,
}

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    #[schema(example = "India")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": "6f1c9a52-4a34-4d1e-8f57-0d3cbbd1c0b2",
        "employeeId": "EMP0001",
        "name": "Jane Doe",
        "email": "jane@x.com",
        "phone": "9876543210",
        "position": "Engineer",
        "department": "Engineering",
        "salary": 50000.0,
        "joinDate": "2024-01-01",
        "status": "Active",
        "createdAt": "2024-01-01T09:00:00Z",
        "updatedAt": "2024-01-01T09:00:00Z"
    })
)]
pub struct Employee {
    pub id: Uuid,
    #[schema(example = "EMP0001")]
    pub employee_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub department: Department,
    pub salary: f64,
    #[schema(value_type = String, format = "date")]
    pub join_date: NaiveDate,
    pub status: EmployeeStatus,
    #[schema(nullable = true)]
    pub address: Option<Address>,
    #[schema(nullable = true)]
    pub emergency_contact: Option<EmergencyContact>,
    #[schema(nullable = true)]
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fully validated employee ready to be persisted. The store assigns
/// the record id, `employee_id` and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub department: Department,
    pub salary: f64,
    pub join_date: NaiveDate,
    pub status: EmployeeStatus,
    pub address: Option<Address>,
    pub emergency_contact: Option<EmergencyContact>,
    pub profile_picture: Option<String>,
}

/// Validated partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department: Option<Department>,
    pub salary: Option<f64>,
    pub join_date: Option<NaiveDate>,
    pub status: Option<EmployeeStatus>,
    pub address: Option<Address>,
    pub emergency_contact: Option<EmergencyContact>,
    pub profile_picture: Option<String>,
}

impl EmployeePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the supplied fields onto `employee`. Identity fields and
    /// timestamps are left to the caller.
    pub fn apply_to(&self, employee: &mut Employee) {
        if let Some(v) = &self.name {
            employee.name = v.clone();
        }
        if let Some(v) = &self.email {
            employee.email = v.clone();
        }
        if let Some(v) = &self.phone {
            employee.phone = v.clone();
        }
        if let Some(v) = &self.position {
            employee.position = v.clone();
        }
        if let Some(v) = self.department {
            employee.department = v;
        }
        if let Some(v) = self.salary {
            employee.salary = v;
        }
        if let Some(v) = self.join_date {
            employee.join_date = v;
        }
        if let Some(v) = self.status {
            employee.status = v;
        }
        if let Some(v) = &self.address {
            employee.address = Some(v.clone());
        }
        if let Some(v) = &self.emergency_contact {
            employee.emergency_contact = Some(v.clone());
        }
        if let Some(v) = &self.profile_picture {
            employee.profile_picture = Some(v.clone());
        }
    }
}

/// Raw create/update payload as the client sent it. Every field is kept as
/// untyped JSON so a wrongly typed value is reported alongside the other
/// field problems instead of failing at deserialization.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInput {
    #[schema(value_type = Option<String>, example = "Jane Doe")]
    pub name: Option<Value>,
    #[schema(value_type = Option<String>, example = "jane@x.com", format = "email")]
    pub email: Option<Value>,
    #[schema(value_type = Option<String>, example = "9876543210")]
    pub phone: Option<Value>,
    #[schema(value_type = Option<String>, example = "Engineer")]
    pub position: Option<Value>,
    #[schema(value_type = Option<String>, example = "Engineering")]
    pub department: Option<Value>,
    #[schema(value_type = Option<f64>, example = 50000)]
    pub salary: Option<Value>,
    #[schema(value_type = Option<String>, example = "2024-01-01", format = "date")]
    pub join_date: Option<Value>,
    #[schema(value_type = Option<String>, example = "Active")]
    pub status: Option<Value>,
    #[schema(value_type = Option<Address>)]
    pub address: Option<Value>,
    #[schema(value_type = Option<EmergencyContact>)]
    pub emergency_contact: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub profile_picture: Option<Value>,
}
