//! Process-wide online/offline signal.
//!
//! A [`ConnectivityMonitor`] owns the current connectivity flag. Platform
//! sources (see [`probe`]) report what they observe through it, and every
//! actual transition is pushed to subscribers immediately, without debouncing.

mod indicator;
mod probe;

pub use indicator::OfflineIndicator;
pub use probe::{ConnectivitySource, HttpProbe};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Buffered transitions per subscriber before the slowest one starts lagging.
const TRANSITION_BUFFER: usize = 64;

/// Connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
  Online,
  Offline,
}

impl Connectivity {
  pub fn from_online(online: bool) -> Self {
    if online {
      Connectivity::Online
    } else {
      Connectivity::Offline
    }
  }

  pub fn is_offline(self) -> bool {
    self == Connectivity::Offline
  }
}

struct MonitorInner {
  online: AtomicBool,
  transitions: broadcast::Sender<Connectivity>,
}

/// Shared online/offline flag with change notifications.
///
/// Cloning is cheap; all clones observe and publish the same state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
  inner: Arc<MonitorInner>,
}

impl ConnectivityMonitor {
  /// Create a monitor with a known initial state.
  pub fn new(online: bool) -> Self {
    let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
    Self {
      inner: Arc::new(MonitorInner {
        online: AtomicBool::new(online),
        transitions,
      }),
    }
  }

  /// Create a monitor initialised from one check of `source`.
  pub async fn detect<C: ConnectivitySource + ?Sized>(source: &C) -> Self {
    Self::new(source.check().await)
  }

  pub fn status(&self) -> Connectivity {
    Connectivity::from_online(self.inner.online.load(Ordering::SeqCst))
  }

  pub fn is_offline(&self) -> bool {
    self.status().is_offline()
  }

  /// Record what the platform reports.
  ///
  /// Returns `true` and notifies subscribers when this changes the state.
  pub fn report(&self, online: bool) -> bool {
    let previous = self.inner.online.swap(online, Ordering::SeqCst);
    if previous == online {
      return false;
    }

    let status = Connectivity::from_online(online);
    info!(?status, "connectivity changed");
    // No receivers is fine; nobody is listening yet
    let _ = self.inner.transitions.send(status);
    true
  }

  /// Subscribe to future transitions. Dropping the subscription unsubscribes.
  pub fn subscribe(&self) -> Subscription {
    Subscription {
      rx: self.inner.transitions.subscribe(),
    }
  }

  /// Poll `source` every `interval` and feed the result into this monitor.
  ///
  /// Polling stops when the returned task is dropped.
  pub fn watch_source<C>(&self, source: C, interval: Duration) -> MonitorTask
  where
    C: ConnectivitySource + 'static,
  {
    let monitor = self.clone();
    let handle = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        let online = source.check().await;
        monitor.report(online);
      }
    });
    MonitorTask { handle }
  }
}

/// Receiver of connectivity transitions.
pub struct Subscription {
  rx: broadcast::Receiver<Connectivity>,
}

impl Subscription {
  /// Wait for the next transition. Returns `None` once the monitor is gone.
  pub async fn next(&mut self) -> Option<Connectivity> {
    loop {
      match self.rx.recv().await {
        Ok(status) => return Some(status),
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
          warn!(skipped, "connectivity subscriber lagged, transitions dropped");
        }
        Err(broadcast::error::RecvError::Closed) => return None,
      }
    }
  }
}

/// Background task driving a monitor from a source. Aborted on drop.
pub struct MonitorTask {
  handle: JoinHandle<()>,
}

impl Drop for MonitorTask {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::future::BoxFuture;
  use std::sync::Mutex;

  #[test]
  fn test_initial_state() {
    assert!(ConnectivityMonitor::new(false).is_offline());
    assert_eq!(ConnectivityMonitor::new(true).status(), Connectivity::Online);
  }

  #[tokio::test]
  async fn test_every_transition_is_delivered() {
    let monitor = ConnectivityMonitor::new(true);
    let mut sub = monitor.subscribe();

    assert!(monitor.report(false));
    assert!(monitor.report(true));
    assert!(monitor.report(false));

    assert_eq!(sub.next().await, Some(Connectivity::Offline));
    assert_eq!(sub.next().await, Some(Connectivity::Online));
    assert_eq!(sub.next().await, Some(Connectivity::Offline));
  }

  #[tokio::test]
  async fn test_repeated_state_is_not_a_transition() {
    let monitor = ConnectivityMonitor::new(true);
    let mut sub = monitor.subscribe();

    assert!(!monitor.report(true));
    assert!(monitor.report(false));

    assert_eq!(sub.next().await, Some(Connectivity::Offline));
  }

  #[tokio::test]
  async fn test_clones_share_state() {
    let monitor = ConnectivityMonitor::new(true);
    let other = monitor.clone();
    other.report(false);
    assert!(monitor.is_offline());
  }

  /// Source replaying a fixed script of readings, then staying on the last one.
  struct ScriptedSource(Mutex<Vec<bool>>);

  impl ConnectivitySource for ScriptedSource {
    fn check(&self) -> BoxFuture<'_, bool> {
      let mut script = self.0.lock().unwrap();
      let value = if script.len() > 1 {
        script.remove(0)
      } else {
        script[0]
      };
      Box::pin(async move { value })
    }
  }

  #[tokio::test]
  async fn test_detect_uses_source() {
    let source = ScriptedSource(Mutex::new(vec![false]));
    let monitor = ConnectivityMonitor::detect(&source).await;
    assert!(monitor.is_offline());
  }

  #[tokio::test]
  async fn test_watch_source_reports_transitions() {
    let monitor = ConnectivityMonitor::new(true);
    let mut sub = monitor.subscribe();
    let source = ScriptedSource(Mutex::new(vec![true, false, true]));

    let _task = monitor.watch_source(source, Duration::from_millis(5));

    assert_eq!(sub.next().await, Some(Connectivity::Offline));
    assert_eq!(sub.next().await, Some(Connectivity::Online));
  }
}
