//! Runs one optimization pass with adapters wired from the environment.

use std::error::Error;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing::{info, warn};

use opportunity_scout::adapters::{
    AnthropicConfig, AnthropicSuggestionGenerator, DataForSeoConfig, DataForSeoGateway,
    DnsDomainChecker, HolibobConfig, HolibobInventoryGateway, InMemoryOpportunityRepository,
    PostgresOpportunityRepository, RedisSharedStateStore, SystemClock,
};
use opportunity_scout::application::{CircuitBreakerRegistry, OpportunityOptimizer};
use opportunity_scout::config::{AppConfig, DatabaseConfig, RedisConfig};
use opportunity_scout::ports::{Clock, OpportunityRepository, SharedStateStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = AppConfig::load()?;
    init_tracing(config.log_json);
    config.validate()?;
    let run_config = config.optimization_config()?;

    info!(version = env!("CARGO_PKG_VERSION"), "opportunity-scout starting");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut registry = CircuitBreakerRegistry::new(clock.clone())
        .with_default_config(config.resilience.default_breaker());
    if let Some(redis) = &config.redis {
        registry = registry.with_shared_store(connect_redis(redis).await?);
    }
    let registry = Arc::new(registry);

    let repository: Arc<dyn OpportunityRepository> = match &config.database {
        Some(database) => Arc::new(connect_postgres(database).await?),
        None => {
            warn!("no database configured, results are kept in memory only");
            Arc::new(InMemoryOpportunityRepository::new())
        }
    };

    let optimizer = OpportunityOptimizer::new(
        Arc::new(build_generator(&config)?),
        Arc::new(build_keyword_gateway(&config)?),
        Arc::new(build_inventory_gateway(&config)?),
        repository,
        registry.clone(),
        clock,
    )
    .with_domain_checker(Arc::new(DnsDomainChecker::default()))
    .with_breaker_configs(config.resilience.service_configs());

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current iteration");
            let _ = cancel_tx.send(true);
        }
    });

    let result = optimizer.run_with_cancellation(run_config, cancel_rx).await?;

    for status in registry.get_all_status().await {
        info!(
            service = %status.service_name,
            state = ?status.state,
            failures = status.metrics.failures,
            "circuit status"
        );
    }

    println!("{}", result.summary);
    println!("{}", serde_json::to_string_pretty(&result.final_opportunities)?);
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn connect_redis(
    config: &RedisConfig,
) -> Result<Arc<dyn SharedStateStore>, Box<dyn Error + Send + Sync>> {
    let client = redis::Client::open(config.url.as_str())?;
    let conn = tokio::time::timeout(
        config.connect_timeout(),
        client.get_multiplexed_tokio_connection(),
    )
    .await??;
    info!("circuit breaker state shared through redis");
    Ok(Arc::new(RedisSharedStateStore::new(conn)))
}

async fn connect_postgres(
    config: &DatabaseConfig,
) -> Result<PostgresOpportunityRepository, Box<dyn Error + Send + Sync>> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await?;
    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
    }
    Ok(PostgresOpportunityRepository::new(pool))
}

fn build_generator(
    config: &AppConfig,
) -> Result<AnthropicSuggestionGenerator, Box<dyn Error + Send + Sync>> {
    let ai = &config.ai;
    let mut anthropic = AnthropicConfig::new(ai.anthropic_api_key.clone().unwrap_or_default())
        .with_model(ai.model.clone())
        .with_timeout(ai.timeout())
        .with_max_retries(ai.max_retries);
    if let Some(url) = &ai.base_url {
        anthropic = anthropic.with_base_url(url.clone());
    }
    Ok(AnthropicSuggestionGenerator::new(anthropic)?)
}

fn build_keyword_gateway(
    config: &AppConfig,
) -> Result<DataForSeoGateway, Box<dyn Error + Send + Sync>> {
    let research = &config.keyword_research;
    let (login, password) = research.credentials().unwrap_or_default();
    let dataforseo = DataForSeoConfig::new(login, password)
        .with_base_url(research.base_url.clone())
        .with_location(research.location_code, research.language_code.clone())
        .with_timeout(research.timeout())
        .with_batch_size(config.optimizer.batch_size)
        .with_throttle(research.max_requests, research.window());
    Ok(DataForSeoGateway::new(dataforseo)?)
}

fn build_inventory_gateway(
    config: &AppConfig,
) -> Result<HolibobInventoryGateway, Box<dyn Error + Send + Sync>> {
    let inventory = &config.inventory;
    let mut holibob = HolibobConfig::new(
        inventory.api_url.clone(),
        inventory.api_key.clone().unwrap_or_default(),
    )
    .with_timeout(inventory.timeout());
    if let Some(partner) = &inventory.partner_id {
        holibob = holibob.with_partner_id(partner.clone());
    }
    Ok(HolibobInventoryGateway::new(holibob)?)
}
