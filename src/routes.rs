use std::sync::Arc;

use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpRequest, middleware::from_fn, web};
use anyhow::Context;

use crate::{
    api::employee,
    auth::{handlers, jwt::TokenCodec, middleware::auth_middleware},
    config::Config,
    error::ApiError,
    store::{AccountStore, EmployeeStore},
};

type Limiter = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Built once and cloned into every worker so all workers count against
/// the same buckets.
#[derive(Clone)]
pub struct RateLimits {
    login: Limiter,
    protected: Limiter,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
            let per_ms = 60_000 / u64::from(requests_per_min.max(1));
            GovernorConfigBuilder::default()
                .milliseconds_per_request(per_ms.max(1))
                .burst_size(requests_per_min)
                .key_extractor(PeerIpKeyExtractor)
                .finish()
                .with_context(|| format!("invalid rate limit: {requests_per_min} per minute"))
        }

        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

/// Everything a worker needs: the stores, the token codec, configuration
/// and the shared limiters.
#[derive(Clone)]
pub struct AppData {
    accounts: web::Data<dyn AccountStore>,
    employees: web::Data<dyn EmployeeStore>,
    codec: web::Data<TokenCodec>,
    config: web::Data<Config>,
    limits: RateLimits,
}

impl AppData {
    pub fn new(
        config: Config,
        accounts: Arc<dyn AccountStore>,
        employees: Arc<dyn EmployeeStore>,
    ) -> anyhow::Result<Self> {
        let limits = RateLimits::from_config(&config)?;
        Ok(Self {
            accounts: web::Data::from(accounts),
            employees: web::Data::from(employees),
            codec: web::Data::new(TokenCodec::from_config(&config)),
            config: web::Data::new(config),
            limits,
        })
    }
}

fn json_error(err: actix_web::error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(format!("Invalid request body: {err}")).into()
}

fn query_error(err: actix_web::error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(format!("Invalid query string: {err}")).into()
}

pub fn configure(cfg: &mut web::ServiceConfig, data: &AppData) {
    cfg.app_data(data.accounts.clone())
        .app_data(data.employees.clone())
        .app_data(data.codec.clone())
        .app_data(data.config.clone())
        .app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error));

    let limits = &data.limits;

    cfg.service(
        web::scope(&data.config.api_prefix)
            .service(
                web::scope("/auth")
                    // public
                    .service(
                        web::resource("/login")
                            .wrap(Governor::new(&limits.login))
                            .route(web::post().to(handlers::login)),
                    )
                    // /auth/profile
                    .service(
                        web::resource("/profile")
                            .wrap(from_fn(auth_middleware))
                            .wrap(Governor::new(&limits.protected))
                            .route(web::get().to(handlers::get_profile))
                            .route(web::put().to(handlers::update_profile)),
                    )
                    // /auth/change-password
                    .service(
                        web::resource("/change-password")
                            .wrap(from_fn(auth_middleware))
                            .wrap(Governor::new(&limits.protected))
                            .route(web::put().to(handlers::change_password)),
                    )
                    // /auth/logout
                    .service(
                        web::resource("/logout")
                            .wrap(from_fn(auth_middleware))
                            .wrap(Governor::new(&limits.protected))
                            .route(web::post().to(handlers::logout)),
                    ),
            )
            .service(
                web::scope("/employees")
                    .wrap(from_fn(auth_middleware)) // authentication
                    .wrap(Governor::new(&limits.protected)) // rate limiting
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // /employees/stats, registered before /{id}
                    .service(
                        web::resource("/stats").route(web::get().to(employee::employee_stats)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            ),
    );
}
