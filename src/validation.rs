//! Field rules shared by account and employee operations.
//!
//! Rules push into a [`Validator`] instead of returning early, so a client
//! receives every problem with its input in one response.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::model::employee::{
    Address, Department, EmergencyContact, EmployeeInput, EmployeePatch, EmployeeStatus,
    NewEmployee,
};

/// Single authoritative salary ceiling (inclusive).
pub const SALARY_CEILING: f64 = 10_000_000.0;
pub const DEFAULT_COUNTRY: &str = "India";

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z\s]+$").expect("valid regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("valid regex")
});
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{9,15}$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "email")]
    pub field: String,
    #[schema(example = "Please provide a valid email address")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Whether a missing field is an error (create) or means "leave as is" (update).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::ValidationFailed(self.errors))
        }
    }

    /// Trims a text value and reports a missing one when `presence` demands
    /// it. Blank strings count as missing; `null` counts as absent.
    fn text(
        &mut self,
        field: &str,
        value: Option<&Value>,
        presence: Presence,
        required_msg: &str,
    ) -> Option<String> {
        match value {
            None | Some(Value::Null) => {
                if presence == Presence::Required {
                    self.push(field, required_msg);
                }
                None
            }
            Some(Value::String(raw)) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    self.push(field, required_msg);
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Some(_) => {
                self.push(field, format!("{field} must be a string"));
                None
            }
        }
    }

    /// Text that may be left out entirely; blank means absent.
    fn optional_text(&mut self, field: &str, value: Option<&Value>) -> Option<String> {
        match value {
            Some(Value::String(raw)) => Some(raw.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            None | Some(Value::Null) => None,
            Some(_) => {
                self.push(field, format!("{field} must be a string"));
                None
            }
        }
    }

    /// Decodes a nested object, reporting a shape mismatch under `field`.
    fn object<T: DeserializeOwned>(&mut self, field: &str, value: Option<&Value>) -> Option<T> {
        match value {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value(raw.clone()) {
                Ok(decoded) => Some(decoded),
                Err(_) => {
                    self.push(field, format!("{field} must be an object of text fields"));
                    None
                }
            },
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Trims and lowercases an address so uniqueness comparisons are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Matches the `accounts.username` column width.
pub const USERNAME_MAX_LEN: usize = 64;

pub fn check_username(v: &mut Validator, username: &str) {
    let len = username.chars().count();
    if len < 3 {
        v.push("username", "Username must be at least 3 characters");
    } else if len > USERNAME_MAX_LEN {
        v.push("username", "Username cannot exceed 64 characters");
    }
}

pub fn check_email(v: &mut Validator, field: &str, email: &str) {
    if !is_valid_email(email) {
        v.push(field, "Please provide a valid email address");
    }
}

/// At least 6 characters with one uppercase letter, one lowercase letter and one digit.
pub fn check_password_policy(v: &mut Validator, field: &str, password: &str) {
    if password.chars().count() < 6 {
        v.push(field, "New password must be at least 6 characters");
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        v.push(
            field,
            "New password must contain at least one uppercase letter, one lowercase letter, and one number",
        );
    }
}

fn parse_salary(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Plain dates, RFC 3339 timestamps and offset-less ISO 8601 date-times.
fn parse_join_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

fn trim_opt(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn clean_address(address: &Address) -> Address {
    Address {
        street: trim_opt(&address.street),
        city: trim_opt(&address.city),
        state: trim_opt(&address.state),
        zip_code: trim_opt(&address.zip_code),
        country: trim_opt(&address.country).or_else(|| Some(DEFAULT_COUNTRY.to_string())),
    }
}

fn clean_contact(v: &mut Validator, contact: &EmergencyContact) -> EmergencyContact {
    let phone = trim_opt(&contact.phone);
    if let Some(p) = &phone
        && !is_valid_phone(p)
    {
        v.push(
            "emergencyContact.phone",
            "Please provide a valid phone number (9-15 digits)",
        );
    }
    EmergencyContact {
        name: trim_opt(&contact.name),
        relationship: trim_opt(&contact.relationship),
        phone,
    }
}

/// Runs every employee field rule once. `presence` toggles whether the
/// mandatory fields must be supplied; the rules for supplied values are the
/// same either way.
fn check_employee(
    v: &mut Validator,
    input: &EmployeeInput,
    presence: Presence,
    today: NaiveDate,
) -> EmployeePatch {
    let mut patch = EmployeePatch::default();

    if let Some(name) = v.text("name", input.name.as_ref(), presence, "Employee name is required") {
        let len = name.chars().count();
        if !(2..=50).contains(&len) {
            v.push("name", "Name must be between 2 and 50 characters");
        } else if !NAME_RE.is_match(&name) {
            v.push("name", "Name can only contain letters and spaces");
        } else {
            patch.name = Some(name);
        }
    }

    if let Some(email) = v.text("email", input.email.as_ref(), presence, "Email is required") {
        let email = normalize_email(&email);
        if is_valid_email(&email) {
            patch.email = Some(email);
        } else {
            v.push("email", "Please provide a valid email address");
        }
    }

    if let Some(phone) = v.text("phone", input.phone.as_ref(), presence, "Phone number is required") {
        if is_valid_phone(&phone) {
            patch.phone = Some(phone);
        } else {
            v.push("phone", "Please provide a valid phone number (9-15 digits)");
        }
    }

    if let Some(position) = v.text("position", input.position.as_ref(), presence, "Position is required") {
        let len = position.chars().count();
        if (2..=100).contains(&len) {
            patch.position = Some(position);
        } else {
            v.push("position", "Position must be between 2 and 100 characters");
        }
    }

    if let Some(dept) = v.text("department", input.department.as_ref(), presence, "Department is required") {
        match Department::from_str(&dept) {
            Ok(d) => patch.department = Some(d),
            Err(_) => v.push("department", "Please select a valid department"),
        }
    }

    match &input.salary {
        None | Some(Value::Null) => {
            if presence == Presence::Required {
                v.push("salary", "Salary is required");
            }
        }
        Some(raw) => match parse_salary(raw) {
            None => v.push("salary", "Salary must be a number"),
            Some(s) if s < 0.0 => v.push("salary", "Salary cannot be negative"),
            Some(s) if s > SALARY_CEILING => v.push("salary", "Salary cannot exceed 10,000,000"),
            Some(s) => patch.salary = Some(s),
        },
    }

    // joinDate and status are optional even on create; they default later.
    if let Some(raw) = v.optional_text("joinDate", input.join_date.as_ref()) {
        match parse_join_date(&raw) {
            None => v.push("joinDate", "Please provide a valid date"),
            Some(d) if d > today => v.push("joinDate", "Join date cannot be in the future"),
            Some(d) => patch.join_date = Some(d),
        }
    }

    if let Some(raw) = v.optional_text("status", input.status.as_ref()) {
        match EmployeeStatus::from_str(&raw) {
            Ok(s) => patch.status = Some(s),
            Err(_) => v.push("status", "Status must be Active, Inactive, or Terminated"),
        }
    }

    patch.address = v
        .object::<Address>("address", input.address.as_ref())
        .map(|a| clean_address(&a));
    patch.emergency_contact = v
        .object::<EmergencyContact>("emergencyContact", input.emergency_contact.as_ref())
        .map(|c| clean_contact(v, &c));
    patch.profile_picture = v.optional_text("profilePicture", input.profile_picture.as_ref());

    patch
}

/// Validates a create payload. All field errors are returned together.
pub fn validate_new_employee(input: &EmployeeInput, today: NaiveDate) -> Result<NewEmployee, ApiError> {
    let mut v = Validator::new();
    let patch = check_employee(&mut v, input, Presence::Required, today);

    match patch {
        EmployeePatch {
            name: Some(name),
            email: Some(email),
            phone: Some(phone),
            position: Some(position),
            department: Some(department),
            salary: Some(salary),
            join_date,
            status,
            address,
            emergency_contact,
            profile_picture,
        } if v.is_empty() => Ok(NewEmployee {
            name,
            email,
            phone,
            position,
            department,
            salary,
            join_date: join_date.unwrap_or(today),
            status: status.unwrap_or_default(),
            address,
            emergency_contact,
            profile_picture,
        }),
        _ => Err(ApiError::ValidationFailed(v.into_errors())),
    }
}

/// Validates a partial update payload. Supplied fields obey the create rules.
pub fn validate_employee_patch(input: &EmployeeInput, today: NaiveDate) -> Result<EmployeePatch, ApiError> {
    let mut v = Validator::new();
    let patch = check_employee(&mut v, input, Presence::Optional, today);
    v.finish()?;
    if patch.is_empty() {
        return Err(ApiError::BadRequest("No fields provided for update".into()));
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn jane() -> EmployeeInput {
        serde_json::from_value(json!({
            "name": "Jane Doe",
            "email": "jane@x.com",
            "phone": "9876543210",
            "position": "Engineer",
            "department": "Engineering",
            "salary": 50000
        }))
        .unwrap()
    }

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::ValidationFailed(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn accepts_minimal_valid_employee_with_defaults() {
        let new = validate_new_employee(&jane(), today()).unwrap();
        assert_eq!(new.name, "Jane Doe");
        assert_eq!(new.department, Department::Engineering);
        assert_eq!(new.salary, 50000.0);
        assert_eq!(new.join_date, today());
        assert_eq!(new.status, EmployeeStatus::Active);
        assert!(new.address.is_none());
    }

    #[test]
    fn collects_every_missing_required_field() {
        let err = validate_new_employee(&EmployeeInput::default(), today()).unwrap_err();
        assert_eq!(
            fields(err),
            vec!["name", "email", "phone", "position", "department", "salary"]
        );
    }

    #[test]
    fn reports_all_bad_fields_in_one_pass() {
        let mut input = jane();
        input.name = Some("J4ne".into());
        input.email = Some("not-an-email".into());
        input.phone = Some("12345".into());
        input.salary = Some(json!(-1));
        input.join_date = Some("2030-01-01".into());
        input.status = Some("Retired".into());

        let err = validate_new_employee(&input, today()).unwrap_err();
        assert_eq!(
            fields(err),
            vec!["name", "email", "phone", "salary", "joinDate", "status"]
        );
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        let mut input = jane();
        input.email = Some("  Jane.Doe@Example.COM ".into());
        let new = validate_new_employee(&input, today()).unwrap();
        assert_eq!(new.email, "jane.doe@example.com");
    }

    #[test]
    fn salary_bounds_are_inclusive() {
        let mut input = jane();
        input.salary = Some(json!(0));
        assert!(validate_new_employee(&input, today()).is_ok());

        input.salary = Some(json!(10_000_000));
        assert!(validate_new_employee(&input, today()).is_ok());

        input.salary = Some(json!(10_000_000.01));
        assert_eq!(fields(validate_new_employee(&input, today()).unwrap_err()), vec!["salary"]);

        input.salary = Some(json!("75000"));
        assert_eq!(validate_new_employee(&input, today()).unwrap().salary, 75000.0);

        input.salary = Some(json!("lots"));
        assert_eq!(fields(validate_new_employee(&input, today()).unwrap_err()), vec!["salary"]);
    }

    #[test]
    fn phone_accepts_leading_plus() {
        assert!(is_valid_phone("+8801712345678"));
        assert!(is_valid_phone("987654321"));
        assert!(!is_valid_phone("98765432"));
        assert!(!is_valid_phone("+1234567890123456"));
        assert!(!is_valid_phone("98765-43210"));
    }

    #[test]
    fn join_date_today_is_allowed() {
        let mut input = jane();
        input.join_date = Some("2024-06-15".into());
        assert_eq!(validate_new_employee(&input, today()).unwrap().join_date, today());

        input.join_date = Some("2024-06-16".into());
        assert_eq!(fields(validate_new_employee(&input, today()).unwrap_err()), vec!["joinDate"]);
    }

    #[test]
    fn address_without_country_gets_default() {
        let mut input = jane();
        input.address = Some(json!({"street": " 1 Main St ", "city": "Pune"}));
        let new = validate_new_employee(&input, today()).unwrap();
        let address = new.address.unwrap();
        assert_eq!(address.street.as_deref(), Some("1 Main St"));
        assert_eq!(address.country.as_deref(), Some(DEFAULT_COUNTRY));
    }

    #[test]
    fn emergency_contact_phone_is_checked() {
        let mut input = jane();
        input.emergency_contact = Some(json!({
            "name": "John",
            "relationship": "Spouse",
            "phone": "abc"
        }));
        assert_eq!(
            fields(validate_new_employee(&input, today()).unwrap_err()),
            vec!["emergencyContact.phone"]
        );
    }

    #[test]
    fn patch_only_carries_supplied_fields() {
        let input = EmployeeInput {
            status: Some("Terminated".into()),
            ..Default::default()
        };
        let patch = validate_employee_patch(&input, today()).unwrap();
        assert_eq!(patch.status, Some(EmployeeStatus::Terminated));
        assert!(patch.name.is_none());
        assert!(patch.email.is_none());
        assert!(patch.salary.is_none());
    }

    #[test]
    fn patch_applies_the_same_rules() {
        let input = EmployeeInput {
            name: Some("X".into()),
            department: Some("Legal".into()),
            ..Default::default()
        };
        let err = validate_employee_patch(&input, today()).unwrap_err();
        assert_eq!(fields(err), vec!["name", "department"]);
    }

    #[test]
    fn blank_value_in_patch_is_rejected() {
        let input = EmployeeInput {
            name: Some("   ".into()),
            ..Default::default()
        };
        let err = validate_employee_patch(&input, today()).unwrap_err();
        assert_eq!(fields(err), vec!["name"]);
    }

    #[test]
    fn empty_patch_is_a_bad_request() {
        let err = validate_employee_patch(&EmployeeInput::default(), today()).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn wrongly_typed_values_join_the_error_list() {
        let mut input = jane();
        input.name = Some("J4ne".into());
        input.phone = Some(json!(9876543210u64));
        input.status = Some(json!(true));
        input.address = Some(json!({"zipCode": 411001}));

        let err = validate_new_employee(&input, today()).unwrap_err();
        let ApiError::ValidationFailed(errors) = err else {
            panic!("expected validation failure");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "phone", "status", "address"]);
        assert_eq!(errors[1].message, "phone must be a string");
    }

    #[test]
    fn null_is_treated_as_absent() {
        let mut input = jane();
        input.join_date = Some(Value::Null);
        input.address = Some(Value::Null);
        let new = validate_new_employee(&input, today()).unwrap();
        assert_eq!(new.join_date, today());
        assert!(new.address.is_none());

        input.phone = Some(Value::Null);
        assert_eq!(fields(validate_new_employee(&input, today()).unwrap_err()), vec!["phone"]);
    }

    #[test]
    fn join_date_accepts_iso_date_times() {
        let mut input = jane();
        input.join_date = Some("2024-01-01T00:00:00".into());
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(validate_new_employee(&input, today()).unwrap().join_date, expected);

        input.join_date = Some("2024-01-01T09:30:00.250".into());
        assert_eq!(validate_new_employee(&input, today()).unwrap().join_date, expected);

        input.join_date = Some("2024-01-01T10:00:00+05:30".into());
        assert_eq!(validate_new_employee(&input, today()).unwrap().join_date, expected);

        input.join_date = Some("01/01/2024".into());
        assert_eq!(fields(validate_new_employee(&input, today()).unwrap_err()), vec!["joinDate"]);
    }

    #[test]
    fn username_length_fits_the_column() {
        let mut v = Validator::new();
        check_username(&mut v, &"a".repeat(USERNAME_MAX_LEN));
        assert!(v.is_empty());

        let mut v = Validator::new();
        check_username(&mut v, &"a".repeat(USERNAME_MAX_LEN + 1));
        assert_eq!(v.into_errors(), vec![FieldError::new("username", "Username cannot exceed 64 characters")]);

        let mut v = Validator::new();
        check_username(&mut v, "ab");
        assert_eq!(v.into_errors().len(), 1);
    }

    #[test]
    fn password_policy() {
        let mut v = Validator::new();
        check_password_policy(&mut v, "newPassword", "Secret1");
        assert!(v.is_empty());

        let mut v = Validator::new();
        check_password_policy(&mut v, "newPassword", "secret");
        assert_eq!(v.into_errors().len(), 1);

        let mut v = Validator::new();
        check_password_policy(&mut v, "newPassword", "Ab1");
        assert_eq!(v.into_errors().len(), 1);
    }
}
