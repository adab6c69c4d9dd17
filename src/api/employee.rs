use actix_web::{HttpResponse, http::StatusCode, web};
use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    api::response::{self, EmployeeListData, EmployeeListResponse, StatsResponse},
    auth::auth::AuthUser,
    config::Config,
    error::ApiError,
    model::employee::EmployeeInput,
    query::{EmployeeFilter, EmployeeQuery, PageRequest, Pagination, recent_hire_cutoff},
    store::EmployeeStore,
    validation::{validate_employee_patch, validate_new_employee},
};

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::MalformedIdentifier("Employee"))
}

fn email_conflict() -> ApiError {
    ApiError::UniquenessConflict {
        entity: "Employee",
        field: "email".into(),
    }
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list, newest first", body = EmployeeListResponse),
        (status = 401, description = "Not authenticated", body = response::ErrorResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "employee_list", skip(_auth, store, config, query))]
pub async fn list_employees(
    _auth: AuthUser,
    store: web::Data<dyn EmployeeStore>,
    config: web::Data<Config>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = PageRequest::parse(
        query.page.as_deref(),
        query.limit.as_deref(),
        config.max_page_limit,
    );
    let (employees, total) = match EmployeeFilter::from_query(&query) {
        Some(filter) => {
            debug!(?filter, page = page.page, limit = page.limit, "Listing employees");
            store.list_employees(&filter, page).await?
        }
        None => {
            debug!("Filter names no department or status; empty page");
            (Vec::new(), 0)
        }
    };

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        success: true,
        data: EmployeeListData {
            employees,
            pagination: Pagination::new(page, total),
        },
    }))
}

/// Roster statistics
#[utoipa::path(
    get,
    path = "/api/employees/stats",
    responses(
        (status = 200, description = "Status counts, recent hires and per-department figures", body = StatsResponse),
        (status = 401, description = "Not authenticated", body = response::ErrorResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "employee_stats", skip(_auth, store))]
pub async fn employee_stats(
    _auth: AuthUser,
    store: web::Data<dyn EmployeeStore>,
) -> Result<HttpResponse, ApiError> {
    let since = recent_hire_cutoff(Utc::now().date_naive());
    let stats = store.employee_stats(since).await?;

    Ok(HttpResponse::Ok().json(StatsResponse {
        success: true,
        data: stats,
    }))
}

/// Get employee by record id
#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee record id (UUID)")),
    responses(
        (status = 200, description = "Employee found", body = response::EmployeeResponse),
        (status = 400, description = "Malformed id", body = response::ErrorResponse),
        (status = 404, description = "Employee not found", body = response::ErrorResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "employee_get", skip(_auth, store))]
pub async fn get_employee(
    _auth: AuthUser,
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;

    let employee = store
        .find_employee(id)
        .await?
        .ok_or(ApiError::NotFound("Employee"))?;

    Ok(response::employee(StatusCode::OK, None, employee))
}

/// Create employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = EmployeeInput,
    responses(
        (status = 201, description = "Employee created", body = response::EmployeeResponse),
        (status = 400, description = "Validation failed", body = response::ErrorResponse),
        (status = 403, description = "Admin role required", body = response::ErrorResponse),
        (status = 409, description = "Email already in use", body = response::ErrorResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "employee_create", skip(auth, store, payload), fields(user_id = %auth.user_id))]
pub async fn create_employee(
    auth: AuthUser,
    store: web::Data<dyn EmployeeStore>,
    payload: web::Json<EmployeeInput>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let new = validate_new_employee(&payload, Utc::now().date_naive())?;

    if store.employee_email_taken(&new.email, None).await? {
        return Err(email_conflict());
    }

    let employee = store
        .insert_employee(new)
        .await
        .map_err(|e| ApiError::from(e).for_entity("Employee"))?;

    info!(employee_id = %employee.employee_id, id = %employee.id, "Employee created");
    Ok(response::employee(
        StatusCode::CREATED,
        Some("Employee created successfully"),
        employee,
    ))
}

/// Update employee
#[utoipa::path(
    put,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee record id (UUID)")),
    request_body = EmployeeInput,
    responses(
        (status = 200, description = "Employee updated", body = response::EmployeeResponse),
        (status = 400, description = "Malformed id or validation failed", body = response::ErrorResponse),
        (status = 403, description = "Admin role required", body = response::ErrorResponse),
        (status = 404, description = "Employee not found", body = response::ErrorResponse),
        (status = 409, description = "Email already in use", body = response::ErrorResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "employee_update", skip(auth, store, payload), fields(user_id = %auth.user_id))]
pub async fn update_employee(
    auth: AuthUser,
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<String>,
    payload: web::Json<EmployeeInput>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let id = parse_id(&path)?;

    let patch = validate_employee_patch(&payload, Utc::now().date_naive())?;

    if store.find_employee(id).await?.is_none() {
        return Err(ApiError::NotFound("Employee"));
    }
    if let Some(email) = &patch.email
        && store.employee_email_taken(email, Some(id)).await?
    {
        return Err(email_conflict());
    }

    let employee = store
        .update_employee(id, patch)
        .await
        .map_err(|e| ApiError::from(e).for_entity("Employee"))?
        .ok_or(ApiError::NotFound("Employee"))?;

    info!(employee_id = %employee.employee_id, "Employee updated");
    Ok(response::employee(
        StatusCode::OK,
        Some("Employee updated successfully"),
        employee,
    ))
}

/// Delete employee
#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee record id (UUID)")),
    responses(
        (status = 200, description = "Employee deleted", body = response::MessageResponse),
        (status = 400, description = "Malformed id", body = response::ErrorResponse),
        (status = 403, description = "Admin role required", body = response::ErrorResponse),
        (status = 404, description = "Employee not found", body = response::ErrorResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "employee_delete", skip(auth, store), fields(user_id = %auth.user_id))]
pub async fn delete_employee(
    auth: AuthUser,
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let id = parse_id(&path)?;

    if !store.delete_employee(id).await? {
        return Err(ApiError::NotFound("Employee"));
    }

    info!(%id, "Employee deleted");
    Ok(response::message(StatusCode::OK, "Employee deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_must_be_a_uuid() {
        assert!(matches!(
            parse_id("EMP0001"),
            Err(ApiError::MalformedIdentifier("Employee"))
        ));
        assert!(parse_id("not-an-id").is_err());

        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }
}
