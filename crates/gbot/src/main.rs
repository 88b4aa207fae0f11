use std::sync::Arc;

use tracing::{error, info};

use gbot_core::config::Config;

mod liveness;

#[tokio::main]
async fn main() -> Result<(), gbot_core::Error> {
    gbot_core::logging::init("gbot")?;

    let cfg = Arc::new(Config::load()?);

    if cfg.liveness_enabled {
        let addr = cfg.liveness_addr;
        tokio::spawn(async move {
            if let Err(e) = liveness::serve(addr).await {
                error!(%addr, error = %e, "liveness responder stopped");
            }
        });
    } else {
        info!("liveness responder disabled");
    }

    gbot_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| gbot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
