use crate::config::SiteConfig;
use crate::error::Result;
use crate::imaging::{ImageBackend, RustBackend};
use crate::media::{self, MediaStorage};
use crate::notify::Dispatcher;
use crate::store::Store;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Everything a request handler needs, shared across the router.
pub struct State {
    pub config: SiteConfig,
    pub store: Store,
    pub media: Arc<dyn MediaStorage>,
    pub images: Arc<dyn ImageBackend>,
    pub dispatcher: Dispatcher,
}

pub type AppState = Arc<State>;

impl State {
    /// Open the database and build the configured storage and transport.
    pub async fn new(config: SiteConfig) -> Result<AppState> {
        info!("Opening database at {}", config.database_path);
        let store = Store::open(Path::new(&config.database_path))?;

        info!("Using {:?} media storage", config.storage.backend);
        let media = media::from_config(&config.storage).await?;

        let dispatcher = Dispatcher::from_config(&config.notifications, &config.base_url).await;
        if !dispatcher.is_configured() {
            info!("No SNS topic configured; notifications are disabled");
        }

        Ok(Self::from_parts(config, store, media, Arc::new(RustBackend::new()), dispatcher))
    }

    pub fn from_parts(
        config: SiteConfig,
        store: Store,
        media: Arc<dyn MediaStorage>,
        images: Arc<dyn ImageBackend>,
        dispatcher: Dispatcher,
    ) -> AppState {
        Arc::new(Self {
            config,
            store,
            media,
            images,
            dispatcher,
        })
    }

    /// Absolute URL for a site path.
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.config.base_url, path)
        }
    }
}
