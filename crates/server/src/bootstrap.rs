use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use aisle_agent::{LlmProductRecommender, OllamaChatClient};
use aisle_core::config::{AppConfig, ConfigError, LoadOptions};
use aisle_db::{connect_with_settings, migrations, DbPool};
use aisle_db::repositories::SqlSmsRepository;
use aisle_retailer::webdriver::WebDriverLauncher;
use aisle_retailer::{RetailerError, Woolworths};

use crate::prompt::StdinCodePrompt;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub supermarket: Arc<Woolworths>,
    pub recommender: LlmProductRecommender<OllamaChatClient>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("retailer client setup failed: {0}")]
    Retailer(#[source] RetailerError),
    #[error("llm client setup failed: {0}")]
    LlmClient(#[source] anyhow::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let launcher = WebDriverLauncher::new(
        config.retailer.webdriver_url.clone(),
        config.retailer.user_agent.clone(),
        config.retailer.headless,
    );
    let codes = Arc::new(SqlSmsRepository::new(db_pool.clone()));
    let supermarket = Arc::new(
        Woolworths::new(
            &config.retailer,
            config.checkout.clone(),
            Box::new(launcher),
            codes,
            Arc::new(StdinCodePrompt),
        )
        .map_err(BootstrapError::Retailer)?,
    );

    let llm = OllamaChatClient::new(&config.llm).map_err(BootstrapError::LlmClient)?;
    let recommender = LlmProductRecommender::new(llm);

    Ok(Application { config, db_pool, supermarket, recommender })
}

#[cfg(test)]
mod tests {
    use aisle_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                retailer_email: Some("shopper@example.com".to_string()),
                retailer_password: Some("account-password".to_string()),
                retailer_card_cvv: Some("123".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_retailer_credentials() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                retailer_password: Some("account-password".to_string()),
                retailer_card_cvv: Some("123".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("retailer.email"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_and_schema() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('orders', 'order_items', 'sms_messages', 'placements')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected baseline tables to be available after bootstrap");
        assert_eq!(table_count, 4, "bootstrap should expose the baseline order-path tables");

        app.db_pool.close().await;
    }
}
