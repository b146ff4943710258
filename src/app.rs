use color_eyre::Result;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::backend::{BackendClient, CachedBackend};
use crate::cache::{KeyValueStore, LocalCache, MemoryStore, NoopStore, SqliteStore};
use crate::chat::GatewayClient;
use crate::config::Config;
use crate::connectivity::{ConnectivityMonitor, HttpProbe, MonitorTask};

/// Storage backend chosen at startup
pub type Store = Box<dyn KeyValueStore>;

/// Flags that change how the app is wired
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
  /// Start offline and never probe the network
  pub offline: bool,
  /// Keep the cache in memory for this run only
  pub ephemeral: bool,
}

/// Shared application state for one command run
pub struct App {
  pub config: Config,
  pub cache: LocalCache<Store>,
  pub monitor: ConnectivityMonitor,
  options: RunOptions,
}

impl App {
  pub async fn new(config: Config, options: RunOptions) -> Result<Self> {
    let store: Store = if options.ephemeral {
      Box::new(MemoryStore::new())
    } else if !config.cache.enabled {
      Box::new(NoopStore)
    } else {
      match &config.cache.path {
        Some(path) => Box::new(SqliteStore::open(path)?),
        None => Box::new(SqliteStore::open_default()?),
      }
    };

    let mut cache = LocalCache::new(store);
    if let Some(namespace) = &config.cache.namespace {
      cache = cache.with_namespace(namespace.clone());
    }

    let monitor = if options.offline {
      ConnectivityMonitor::new(false)
    } else {
      ConnectivityMonitor::detect(&probe(&config)?).await
    };
    info!(status = ?monitor.status(), "initial connectivity");

    Ok(Self {
      config,
      cache,
      monitor,
      options,
    })
  }

  /// Keep probing the backend in the background, unless forced offline.
  pub fn watch_connectivity(&self) -> Result<Option<MonitorTask>> {
    if self.options.offline {
      return Ok(None);
    }
    let interval = Duration::from_secs(self.config.connectivity.probe_interval_secs.max(1));
    Ok(Some(self.monitor.watch_source(probe(&self.config)?, interval)))
  }

  pub fn backend(&self) -> Result<CachedBackend<Store>> {
    let client = BackendClient::new(&self.config)?;
    Ok(CachedBackend::new(
      client,
      self.cache.clone(),
      self.monitor.clone(),
    ))
  }

  pub fn gateway(&self) -> Result<GatewayClient> {
    GatewayClient::new(&self.config)
  }

  pub fn agent_name(&self) -> &str {
    self
      .config
      .agent_name
      .as_deref()
      .unwrap_or("Your Travel Agent")
  }
}

fn probe(config: &Config) -> Result<HttpProbe> {
  let target = Url::parse(&config.backend.url)
    .map_err(|e| color_eyre::eyre::eyre!("Invalid backend url {}: {}", config.backend.url, e))?;
  HttpProbe::new(
    target,
    Duration::from_secs(config.connectivity.probe_timeout_secs.max(1)),
  )
}
