//! Listing filters, pagination and roster statistics.

use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::model::employee::{Department, Employee, EmployeeStatus};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const RECENT_HIRE_DAYS: u64 = 30;

/// Query string of `GET /employees`. Everything arrives as text so that
/// junk values fall back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    /// Page number, 1-based
    pub page: Option<String>,
    /// Items per page
    pub limit: Option<String>,
    /// Exact department name
    pub department: Option<String>,
    /// Exact status (Active, Inactive, Terminated)
    pub status: Option<String>,
    /// Case-insensitive match on name, email, employeeId or position
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn parse(page: Option<&str>, limit: Option<&str>, max_limit: u32) -> Self {
        let parse = |raw: Option<&str>| {
            raw.and_then(|s| s.trim().parse::<u32>().ok())
                .filter(|n| *n >= 1)
        };
        Self {
            page: parse(page).unwrap_or(DEFAULT_PAGE),
            limit: parse(limit).unwrap_or(DEFAULT_LIMIT).min(max_limit.max(1)),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_employees: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub limit: u32,
}

impl Pagination {
    pub fn new(page: PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(page.limit));
        Self {
            current_page: page.page,
            total_pages,
            total_employees: total,
            has_next_page: u64::from(page.page) < total_pages,
            has_prev_page: page.page > 1,
            limit: page.limit,
        }
    }
}

/// Conjunctive filter; `search` is a disjunction over four text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeFilter {
    pub department: Option<Department>,
    pub status: Option<EmployeeStatus>,
    pub search: Option<String>,
}

impl EmployeeFilter {
    /// Department and status must spell a variant exactly. Returns `None`
    /// when one of them names nothing, since such a filter matches no record.
    pub fn from_query(query: &EmployeeQuery) -> Option<Self> {
        fn non_blank(v: &Option<String>) -> Option<String> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }
        fn exact<T: FromStr>(v: &Option<String>) -> Result<Option<T>, ()> {
            non_blank(v).map(|s| T::from_str(&s).map_err(|_| ())).transpose()
        }

        Some(Self {
            department: exact(&query.department).ok()?,
            status: exact(&query.status).ok()?,
            search: non_blank(&query.search),
        })
    }

    pub fn matches(&self, employee: &Employee) -> bool {
        if let Some(department) = self.department
            && employee.department != department
        {
            return false;
        }
        if let Some(status) = self.status
            && employee.status != status
        {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            return [
                &employee.name,
                &employee.email,
                &employee.employee_id,
                &employee.position,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
        }
        true
    }
}

/// Escapes `LIKE` wildcards so a search term is matched literally.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsOverview {
    pub total_employees: u64,
    pub active_employees: u64,
    pub inactive_employees: u64,
    pub terminated_employees: u64,
    pub recent_hires: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStat {
    pub department: Department,
    pub count: u64,
    pub avg_salary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeStats {
    pub overview: StatsOverview,
    pub department_stats: Vec<DepartmentStat>,
}

/// Hires on or after this date count as recent.
pub fn recent_hire_cutoff(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(RECENT_HIRE_DAYS))
        .unwrap_or(NaiveDate::MIN)
}

/// Largest group first; equal counts ordered by department name so repeated
/// calls over the same data are identical.
pub fn sort_department_stats(stats: &mut [DepartmentStat]) {
    stats.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.department.as_ref().cmp(b.department.as_ref()))
    });
}

pub fn compute_stats<'a>(
    employees: impl IntoIterator<Item = &'a Employee>,
    since: NaiveDate,
) -> EmployeeStats {
    let mut overview = StatsOverview {
        total_employees: 0,
        active_employees: 0,
        inactive_employees: 0,
        terminated_employees: 0,
        recent_hires: 0,
    };
    let mut groups: Vec<(Department, u64, f64)> = Vec::new();

    for e in employees {
        overview.total_employees += 1;
        match e.status {
            EmployeeStatus::Active => overview.active_employees += 1,
            EmployeeStatus::Inactive => overview.inactive_employees += 1,
            EmployeeStatus::Terminated => overview.terminated_employees += 1,
        }
        if e.join_date >= since {
            overview.recent_hires += 1;
        }
        match groups.iter_mut().find(|(d, _, _)| *d == e.department) {
            Some((_, count, sum)) => {
                *count += 1;
                *sum += e.salary;
            }
            None => groups.push((e.department, 1, e.salary)),
        }
    }

    let mut department_stats: Vec<DepartmentStat> = groups
        .into_iter()
        .map(|(department, count, sum)| DepartmentStat {
            department,
            count,
            avg_salary: sum / count as f64,
        })
        .collect();
    sort_department_stats(&mut department_stats);

    EmployeeStats {
        overview,
        department_stats,
    }
}
