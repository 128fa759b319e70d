use migration::{Migrator, MigratorTrait};
use server::AdminCredentials;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "packdesk={level},server={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no [server] settings found, nothing to run");
        return Ok(());
    };
    tracing::info!("Found server settings...");

    let db = connect_database(&server.database).await?;

    let mut builder = engine::Engine::builder().database(db);
    match settings.dashboard {
        Some(dashboard) => {
            tracing::info!("dashboard data directory: {}", dashboard.data_dir.display());
            builder = builder.data_dir(dashboard.data_dir);
            if let Some(temp_dir) = dashboard.temp_dir {
                builder = builder.temp_dir(temp_dir);
            }
        }
        None => tracing::warn!("no [dashboard] settings found, export and probing are disabled"),
    }
    let engine = builder.build().await?;

    let admin = match (server.admin_username, server.admin_password) {
        (Some(username), Some(password)) => Some(AdminCredentials { username, password }),
        _ => {
            tracing::warn!("admin credentials not configured, admin routes are locked");
            None
        }
    };

    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(engine, admin, listener).await?;

    Ok(())
}

async fn connect_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
