//! Shopdesk back-office entry point.
//!
//! ```text
//! shopdesk --db-url 127.0.0.1:8000 bootstrap \
//!   --admin-email admin@example.com --admin-password change-me
//! shopdesk menu --email clerk@example.com
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use shopdesk_authz::{
    AuditRecorder, AuthorizationGate, AuthzConfig, CacheInvalidator, MenuCache, MenuService,
};
use shopdesk_core::principal::Session;
use shopdesk_core::repository::UserRepository;
use shopdesk_db::repository::{
    SurrealAuditLogRepository, SurrealMenuRepository, SurrealPermissionRepository,
    SurrealUserRepository,
};
use shopdesk_db::seed::{seed_admin_user, seed_catalog};
use shopdesk_db::{DbConfig, DbManager};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Shopdesk back office: schema, permission catalog and menu tooling.
#[derive(Parser, Debug)]
#[command(name = "shopdesk", version, about)]
struct Cli {
    /// SurrealDB WebSocket address.
    #[arg(long, default_value = "127.0.0.1:8000", env = "SHOPDESK_DB_URL")]
    db_url: String,

    #[arg(long, default_value = "shopdesk", env = "SHOPDESK_DB_NAMESPACE")]
    db_namespace: String,

    #[arg(long, default_value = "backoffice", env = "SHOPDESK_DB_DATABASE")]
    db_database: String,

    #[arg(long, default_value = "root", env = "SHOPDESK_DB_USER")]
    db_user: String,

    #[arg(long, default_value = "root", env = "SHOPDESK_DB_PASSWORD")]
    db_password: String,

    /// Menu fetch timeout in milliseconds.
    #[arg(long, default_value = "4000", env = "SHOPDESK_MENU_TIMEOUT_MS")]
    menu_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply migrations and seed the permission catalog.
    Bootstrap {
        /// Also create an administrator with this email.
        #[arg(long, env = "SHOPDESK_ADMIN_EMAIL", requires = "admin_password")]
        admin_email: Option<String>,

        #[arg(long, env = "SHOPDESK_ADMIN_PASSWORD")]
        admin_password: Option<String>,

        #[arg(long, default_value = "Administrator", env = "SHOPDESK_ADMIN_NAME")]
        admin_name: String,
    },
    /// Print the menu a user would see, as JSON.
    Menu {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shopdesk=info")),
        )
        .json()
        .init();

    let cli = Cli::parse();

    let db_config = DbConfig {
        url: cli.db_url,
        namespace: cli.db_namespace,
        database: cli.db_database,
        username: cli.db_user,
        password: cli.db_password,
        ..DbConfig::default()
    };
    let authz_config = AuthzConfig {
        menu_fetch_timeout: Duration::from_millis(cli.menu_timeout_ms),
        ..AuthzConfig::default()
    };

    let manager = DbManager::connect(&db_config)
        .await
        .context("connecting to SurrealDB")?;
    manager.migrate().await.context("applying migrations")?;
    let db = manager.client().clone();

    match cli.command {
        Command::Bootstrap {
            admin_email,
            admin_password,
            admin_name,
        } => {
            let report = seed_catalog(&db).await.context("seeding catalog")?;
            info!(?report, "Bootstrap complete");

            if let (Some(email), Some(password)) = (admin_email, admin_password) {
                let admin = seed_admin_user(&db, &admin_name, &email, &password)
                    .await
                    .context("creating administrator")?;
                info!(user_id = %admin.id, email = %admin.email, "Administrator ready");
            }
        }
        Command::Menu { email } => {
            let users = SurrealUserRepository::new(db.clone());
            let user = users
                .get_by_email(&email)
                .await
                .with_context(|| format!("looking up {email}"))?;

            let cache = Arc::new(MenuCache::new(authz_config.menu_cache_ttl));
            let menu = MenuService::new(
                SurrealMenuRepository::new(db.clone()),
                SurrealPermissionRepository::new(db.clone()),
                AuthorizationGate::new(users, authz_config.denial_message.clone()),
                AuditRecorder::new(SurrealAuditLogRepository::new(db.clone())),
                CacheInvalidator::new(cache, authz_config.invalidation_capacity),
                authz_config.menu_fetch_timeout,
            );

            let tree = menu
                .resolve_menu_for_session(Some(&Session::new(user.id)))
                .await;
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
    }

    Ok(())
}
