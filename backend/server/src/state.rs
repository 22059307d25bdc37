use std::sync::Arc;

use chrono::Duration;

use super::{
    auth::TokenCodec,
    config::Config,
    database::{Store, init_store},
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub tokens: TokenCodec,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Arc<Self>> {
        let config = Config::load()?;
        let store = init_store(config.redis_url.as_deref()).await?;

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Arc<Self> {
        let tokens = TokenCodec::new(
            &config.token_secret,
            Duration::hours(config.token_ttl_hours),
        );

        Arc::new(Self {
            config,
            store,
            tokens,
        })
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
