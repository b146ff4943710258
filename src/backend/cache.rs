//! Cache keys for record queries.

use sha2::{Digest, Sha256};

/// Record lists that are cached for offline use.
#[derive(Clone, Debug)]
pub enum RecordQueryKey {
  /// Customers of one agent
  Customers { agent_id: String },
  /// Saved itineraries of one agent
  Itineraries { agent_id: String },
  /// Conversations of one agent
  Conversations { agent_id: String },
}

impl RecordQueryKey {
  fn resource(&self) -> &'static str {
    match self {
      Self::Customers { .. } => "customers",
      Self::Itineraries { .. } => "itineraries",
      Self::Conversations { .. } => "conversations",
    }
  }

  fn agent_id(&self) -> &str {
    match self {
      Self::Customers { agent_id }
      | Self::Itineraries { agent_id }
      | Self::Conversations { agent_id } => agent_id,
    }
  }

  /// Stable cache key, e.g. `customers:3f2a...`.
  ///
  /// The agent id is hashed so storage keys don't carry account identifiers.
  pub fn cache_key(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.agent_id().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}:{}", self.resource(), &digest[..16])
  }

  pub fn description(&self) -> String {
    format!("{} of agent {}", self.resource(), self.agent_id())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_keys_are_stable_and_distinct() {
    let customers = RecordQueryKey::Customers {
      agent_id: "agent-1".to_string(),
    };
    let itineraries = RecordQueryKey::Itineraries {
      agent_id: "agent-1".to_string(),
    };
    let other_agent = RecordQueryKey::Customers {
      agent_id: "agent-2".to_string(),
    };

    assert_eq!(customers.cache_key(), customers.clone().cache_key());
    assert!(customers.cache_key().starts_with("customers:"));
    assert_eq!(customers.cache_key().len(), "customers:".len() + 16);
    assert_ne!(customers.cache_key(), other_agent.cache_key());
    assert_eq!(
      customers.cache_key()["customers:".len()..],
      itineraries.cache_key()["itineraries:".len()..]
    );
    assert!(!customers.cache_key().contains("agent-1"));
  }
}
