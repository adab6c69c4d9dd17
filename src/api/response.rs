//! Response envelopes. Every body carries `success`; successful calls add
//! `data` and/or `message`, failures add `errors` when there are field
//! problems to report.

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::account::PublicAccount;
use crate::model::employee::Employee;
use crate::query::{EmployeeStats, Pagination};
use crate::validation::FieldError;

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = false)]
    pub success: bool,
    #[schema(example = "Validation failed")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
        }
    }

    pub fn with_errors(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: Some(errors),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Employee deleted successfully")]
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginData {
    pub token: String,
    pub user: PublicAccount,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    #[schema(example = "Login successful")]
    pub message: String,
    pub data: LoginData,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileData {
    pub user: PublicAccount,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: ProfileData,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeData {
    pub employee: Employee,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Employee created successfully")]
    pub message: Option<String>,
    pub data: EmployeeData,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListData {
    pub employees: Vec<Employee>,
    pub pagination: Pagination,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub success: bool,
    pub data: EmployeeListData,
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub success: bool,
    pub data: EmployeeStats,
}

pub fn message(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(MessageResponse {
        success: true,
        message: message.to_string(),
    })
}

pub fn employee(status: StatusCode, message: Option<&str>, employee: Employee) -> HttpResponse {
    HttpResponse::build(status).json(EmployeeResponse {
        success: true,
        message: message.map(str::to_string),
        data: EmployeeData { employee },
    })
}

pub fn profile(message: Option<&str>, user: PublicAccount) -> HttpResponse {
    HttpResponse::Ok().json(ProfileResponse {
        success: true,
        message: message.map(str::to_string),
        data: ProfileData { user },
    })
}
