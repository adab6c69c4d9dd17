use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::OpenApi as OpenApiSpec;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

use crate::api::response::{
    EmployeeData, EmployeeListData, EmployeeListResponse, EmployeeResponse, ErrorResponse,
    LoginData, LoginResponse, MessageResponse, ProfileData, ProfileResponse, StatsResponse,
};
use crate::model::account::PublicAccount;
use crate::model::employee::{
    Address, Department, EmergencyContact, Employee, EmployeeInput, EmployeeStatus,
};
use crate::model::role::Role;
use crate::models::{ChangePasswordDto, LoginReqDto, ProfileUpdateDto};
use crate::query::{DepartmentStat, EmployeeStats, Pagination, StatsOverview};
use crate::validation::FieldError;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Employee Directory API",
        version = "1.0.0",
        description = r#"
## Employee Directory

Internal administration API for the staff employee roster.

### Security
All endpoints except login require a **JWT Bearer** token obtained from
`POST /api/auth/login`. Reading employees is open to both **admin** and
**hr** accounts; creating, updating and deleting requires **admin**.

### Response Format
Every response is an envelope: `{ success, message?, data? | errors? }`.
Validation failures list every `{ field, message }` problem at once.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::get_profile,
        crate::auth::handlers::update_profile,
        crate::auth::handlers::change_password,
        crate::auth::handlers::logout,

        crate::api::employee::list_employees,
        crate::api::employee::employee_stats,
        crate::api::employee::get_employee,
        crate::api::employee::create_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee
    ),
    components(
        schemas(
            LoginReqDto,
            ProfileUpdateDto,
            ChangePasswordDto,
            PublicAccount,
            Role,
            LoginData,
            LoginResponse,
            ProfileData,
            ProfileResponse,
            Employee,
            EmployeeInput,
            Department,
            EmployeeStatus,
            Address,
            EmergencyContact,
            EmployeeData,
            EmployeeResponse,
            EmployeeListData,
            EmployeeListResponse,
            Pagination,
            StatsOverview,
            DepartmentStat,
            EmployeeStats,
            StatsResponse,
            MessageResponse,
            ErrorResponse,
            FieldError
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and account self-service"),
        (name = "Employee", description = "Employee roster management"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut OpenApiSpec) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
