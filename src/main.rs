use splitbook::{
    config::{database, settings},
    core::{balance, user},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenvy::dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = settings::load_default_config()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed users from config.toml
    for seed in &app_config.users {
        user::ensure_user(&db, &seed.username, &seed.email)
            .await
            .inspect_err(|e| error!("Failed to seed user {}: {}", seed.username, e))?;
    }
    info!("Seeded {} configured users.", app_config.users.len());

    // 6. Report current balances
    for user in user::list_users(&db).await? {
        let summary = balance::compute_user_summary(&db, user.id).await?;
        info!(
            username = %user.username,
            total_owed = %summary.total_owed,
            total_owed_to_me = %summary.total_owed_to_me,
            net_balance = %summary.net_balance,
            "Balance"
        );
    }

    Ok(())
}
