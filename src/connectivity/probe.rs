//! Platform connectivity sources.

use futures::future::BoxFuture;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Something that can tell whether the network is currently reachable.
pub trait ConnectivitySource: Send + Sync {
  fn check(&self) -> BoxFuture<'_, bool>;
}

/// Reachability probe that issues a `HEAD` request against a URL.
///
/// Any HTTP response counts as online, including error statuses: the host
/// answered. Transport failures and timeouts count as offline.
pub struct HttpProbe {
  client: reqwest::Client,
  target: Url,
}

impl HttpProbe {
  pub fn new(target: Url, timeout: Duration) -> color_eyre::Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| color_eyre::eyre::eyre!("Failed to build probe client: {}", e))?;
    Ok(Self { client, target })
  }
}

impl ConnectivitySource for HttpProbe {
  fn check(&self) -> BoxFuture<'_, bool> {
    Box::pin(async move {
      match self.client.head(self.target.clone()).send().await {
        Ok(response) => {
          debug!(status = %response.status(), target = %self.target, "probe answered");
          true
        }
        Err(e) => {
          debug!(error = %e, target = %self.target, "probe failed");
          false
        }
      }
    })
  }
}
