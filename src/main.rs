use anyhow::Result;
use dayahead::config::Config;
use dayahead::feed::NordpoolClient;
use dayahead::logging::init_logging;
use dayahead::scheduler::TokioScheduler;
use dayahead::service::PriceService;
use dayahead::time::{Clock, SystemClock};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;
    init_logging(&config.logging)?;

    info!(
        "dayahead {} starting for {} in {}",
        env!("APP_VERSION"),
        config.region,
        config.currency
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let client = Arc::new(NordpoolClient::from_config(&config)?);
    let service = PriceService::from_config(&config, client, Arc::clone(&clock))?;
    let (scheduler, jobs) = TokioScheduler::new(clock);

    #[cfg(feature = "web")]
    let web_task = if config.web.enabled {
        let state = dayahead::web::AppState::new(
            service.subscribe(),
            config.clone(),
            service.command_sender(),
        );
        let host = config.web.host.clone();
        let port = config.web.port;
        Some(tokio::spawn(async move {
            if let Err(e) = dayahead::web::serve(state, &host, port).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };

    tokio::select! {
        _ = service.run(scheduler, jobs) => {
            info!("Sensor loop ended");
        }
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        }
    }

    #[cfg(feature = "web")]
    {
        if let Some(task) = web_task {
            task.abort();
        }
    }

    Ok(())
}
