use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{App, HttpServer};
use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use employee_directory::config::{Config, StoreBackend};
use employee_directory::db::init_db;
use employee_directory::docs::ApiDoc;
use employee_directory::model::role::Role;
use employee_directory::provision;
use employee_directory::routes::{self, AppData};
use employee_directory::store::{AccountStore, EmployeeStore, MemoryStore, MySqlStore};

#[derive(Parser)]
#[command(name = "employee-directory", version, about = "Employee directory API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create a staff account
    CreateUser {
        username: String,
        password: String,
        #[arg(long, default_value = "hr")]
        role: Role,
        #[arg(long)]
        email: Option<String>,
    },
    /// Create the default admin account if it does not exist
    SeedAdmin,
    /// Activate or deactivate an account
    SetActive {
        username: String,
        #[arg(action = ArgAction::Set)]
        active: bool,
    },
}

type Stores = (Arc<dyn AccountStore>, Arc<dyn EmployeeStore>);

async fn open_stores(config: &Config) -> anyhow::Result<Stores> {
    match config.store_backend {
        StoreBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let store = Arc::new(MySqlStore::new(init_db(url).await?));
            let accounts: Arc<dyn AccountStore> = store.clone();
            let employees: Arc<dyn EmployeeStore> = store;
            Ok((accounts, employees))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on exit");
            let store = Arc::new(MemoryStore::new());
            provision::seed_admin(store.as_ref(), config.default_admin_password.as_deref())
                .await?;
            let accounts: Arc<dyn AccountStore> = store.clone();
            let employees: Arc<dyn EmployeeStore> = store;
            Ok((accounts, employees))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    let (accounts, employees) = open_stores(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, accounts, employees).await,
        Command::CreateUser {
            username,
            password,
            role,
            email,
        } => {
            let account =
                provision::create_user(accounts.as_ref(), &username, &password, role, email.as_deref())
                    .await?;
            println!("created {} ({}) with id {}", account.username, account.role, account.id);
            Ok(())
        }
        Command::SeedAdmin => {
            match provision::seed_admin(accounts.as_ref(), config.default_admin_password.as_deref())
                .await?
            {
                Some(account) => println!("seeded admin account {}", account.id),
                None => println!("admin account already exists"),
            }
            Ok(())
        }
        Command::SetActive { username, active } => {
            provision::set_active(accounts.as_ref(), &username, active).await?;
            println!("{username} is now {}", if active { "active" } else { "inactive" });
            Ok(())
        }
    }
}

async fn serve(
    config: Config,
    accounts: Arc<dyn AccountStore>,
    employees: Arc<dyn EmployeeStore>,
) -> anyhow::Result<()> {
    let server_addr = config.server_addr.clone();
    let data = AppData::new(config, accounts, employees)?;

    info!(addr = %server_addr, "Server starting...");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard {_:.*} so the UI's JS/CSS assets match
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .configure(|cfg| routes::configure(cfg, &data))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
