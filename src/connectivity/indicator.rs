use std::time::{Duration, Instant};

use super::Connectivity;

/// How long the "back online" notice stays up.
const ONLINE_NOTICE: Duration = Duration::from_secs(3);

/// Banner text for the current connectivity state.
///
/// Shows a persistent notice while offline and a short-lived one after
/// reconnecting.
#[derive(Debug, Default)]
pub struct OfflineIndicator {
  offline: bool,
  online_notice_until: Option<Instant>,
}

impl OfflineIndicator {
  pub fn new(status: Connectivity) -> Self {
    Self {
      offline: status.is_offline(),
      online_notice_until: None,
    }
  }

  /// Feed a transition observed at `now`.
  pub fn on_transition(&mut self, status: Connectivity, now: Instant) {
    match status {
      Connectivity::Offline => {
        self.offline = true;
        self.online_notice_until = None;
      }
      Connectivity::Online => {
        self.offline = false;
        self.online_notice_until = Some(now + ONLINE_NOTICE);
      }
    }
  }

  /// Banner to display at `now`, if any.
  pub fn banner(&self, now: Instant) -> Option<&'static str> {
    if self.offline {
      return Some("You're offline - using cached data");
    }
    match self.online_notice_until {
      Some(until) if now < until => Some("Back online"),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_online_shows_nothing() {
    let indicator = OfflineIndicator::new(Connectivity::Online);
    assert_eq!(indicator.banner(Instant::now()), None);
  }

  #[test]
  fn test_offline_banner_persists() {
    let start = Instant::now();
    let indicator = OfflineIndicator::new(Connectivity::Offline);
    assert_eq!(
      indicator.banner(start + Duration::from_secs(600)),
      Some("You're offline - using cached data")
    );
  }

  #[test]
  fn test_back_online_notice_expires() {
    let start = Instant::now();
    let mut indicator = OfflineIndicator::new(Connectivity::Offline);
    indicator.on_transition(Connectivity::Online, start);

    assert_eq!(
      indicator.banner(start + Duration::from_secs(1)),
      Some("Back online")
    );
    assert_eq!(indicator.banner(start + Duration::from_secs(3)), None);
  }

  #[test]
  fn test_going_offline_cancels_notice() {
    let start = Instant::now();
    let mut indicator = OfflineIndicator::new(Connectivity::Online);
    indicator.on_transition(Connectivity::Online, start);
    indicator.on_transition(Connectivity::Offline, start + Duration::from_secs(1));
    indicator.on_transition(Connectivity::Online, start + Duration::from_secs(10));

    assert_eq!(indicator.banner(start + Duration::from_secs(14)), None);
  }
}
