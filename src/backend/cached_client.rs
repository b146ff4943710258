//! Record client with offline caching of the list views.

use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::cache::{CachedFetch, KeyValueStore, LocalCache};
use crate::connectivity::ConnectivityMonitor;
use crate::itinerary::Itinerary;

use super::cache::RecordQueryKey;
use super::client::BackendClient;
use super::types::{ChatMessage, Conversation, Customer, CustomerInput, SavedItinerary};

/// Backend client with cache-first list views.
///
/// Lists go through a [`CachedFetch`] so they stay readable offline. Writes go
/// straight to the backend. A successful create puts the new record at the
/// head of the cached list; other writes clear the list they affect so the
/// next read fetches fresh data.
pub struct CachedBackend<S> {
  inner: BackendClient,
  cache: LocalCache<S>,
  connectivity: ConnectivityMonitor,
}

impl<S: KeyValueStore + 'static> CachedBackend<S> {
  pub fn new(inner: BackendClient, cache: LocalCache<S>, connectivity: ConnectivityMonitor) -> Self {
    Self {
      inner,
      cache,
      connectivity,
    }
  }

  fn customers_key(&self) -> RecordQueryKey {
    RecordQueryKey::Customers {
      agent_id: self.inner.agent_id().to_string(),
    }
  }

  fn itineraries_key(&self) -> RecordQueryKey {
    RecordQueryKey::Itineraries {
      agent_id: self.inner.agent_id().to_string(),
    }
  }

  fn conversations_key(&self) -> RecordQueryKey {
    RecordQueryKey::Conversations {
      agent_id: self.inner.agent_id().to_string(),
    }
  }

  /// Coordinator for the customer roster.
  pub fn customers(&self) -> CachedFetch<Vec<Customer>, S> {
    let inner = self.inner.clone();
    CachedFetch::new(
      self.customers_key().cache_key(),
      self.cache.clone(),
      self.connectivity.clone(),
      move || {
        let inner = inner.clone();
        async move { inner.list_customers().await }
      },
    )
  }

  /// Coordinator for saved itineraries.
  pub fn itineraries(&self) -> CachedFetch<Vec<SavedItinerary>, S> {
    let inner = self.inner.clone();
    CachedFetch::new(
      self.itineraries_key().cache_key(),
      self.cache.clone(),
      self.connectivity.clone(),
      move || {
        let inner = inner.clone();
        async move { inner.list_itineraries().await }
      },
    )
  }

  /// Coordinator for conversations.
  pub fn conversations(&self) -> CachedFetch<Vec<Conversation>, S> {
    let inner = self.inner.clone();
    CachedFetch::new(
      self.conversations_key().cache_key(),
      self.cache.clone(),
      self.connectivity.clone(),
      move || {
        let inner = inner.clone();
        async move { inner.list_conversations().await }
      },
    )
  }

  fn invalidate(&self, key: RecordQueryKey) {
    debug!(query = %key.description(), "invalidating cached list");
    self.cache.clear(Some(&key.cache_key()));
  }

  /// Put a newly created record at the head of its cached list. With no fresh
  /// list cached, the entry is dropped so the next read fetches it.
  fn prepend<T>(&self, fetch: CachedFetch<Vec<T>, S>, record: T)
  where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
  {
    match self.cache.get::<Vec<T>>(fetch.key()) {
      Some(mut list) => {
        list.insert(0, record);
        fetch.save_to_cache(list);
      }
      None => {
        debug!(key = %fetch.key(), "no cached list to extend");
        self.cache.clear(Some(fetch.key()));
      }
    }
  }

  pub async fn create_customer(&self, input: &CustomerInput) -> Result<Customer> {
    let customer = self.inner.create_customer(input).await?;
    self.prepend(self.customers(), customer.clone());
    Ok(customer)
  }

  pub async fn update_customer(&self, id: &str, input: &CustomerInput) -> Result<()> {
    self.inner.update_customer(id, input).await?;
    self.invalidate(self.customers_key());
    Ok(())
  }

  pub async fn delete_customer(&self, id: &str) -> Result<()> {
    self.inner.delete_customer(id).await?;
    self.invalidate(self.customers_key());
    Ok(())
  }

  pub async fn save_itinerary(
    &self,
    itinerary: &Itinerary,
    conversation_id: Option<&str>,
    customer_id: Option<&str>,
  ) -> Result<SavedItinerary> {
    let saved = self
      .inner
      .save_itinerary(itinerary, conversation_id, customer_id)
      .await?;
    self.prepend(self.itineraries(), saved.clone());
    Ok(saved)
  }

  pub async fn update_itinerary_status(&self, id: &str, status: &str) -> Result<()> {
    self.inner.update_itinerary_status(id, status).await?;
    self.invalidate(self.itineraries_key());
    Ok(())
  }

  pub async fn update_itinerary_customer(&self, id: &str, customer_id: Option<&str>) -> Result<()> {
    self.inner.update_itinerary_customer(id, customer_id).await?;
    self.invalidate(self.itineraries_key());
    Ok(())
  }

  pub async fn delete_itinerary(&self, id: &str) -> Result<()> {
    self.inner.delete_itinerary(id).await?;
    self.invalidate(self.itineraries_key());
    Ok(())
  }

  pub async fn create_conversation(&self, title: &str) -> Result<Conversation> {
    let conversation = self.inner.create_conversation(title).await?;
    self.prepend(self.conversations(), conversation.clone());
    Ok(conversation)
  }

  pub async fn update_conversation(&self, id: &str, messages: &[ChatMessage]) -> Result<()> {
    self.inner.update_conversation(id, messages).await?;
    self.invalidate(self.conversations_key());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{DataSource, MemoryStore};
  use url::Url;

  fn offline_backend() -> CachedBackend<MemoryStore> {
    // Nothing listens on this port; any network call would fail
    let client = BackendClient::with_credentials(
      Url::parse("http://127.0.0.1:9").unwrap(),
      "anon".to_string(),
      "token".to_string(),
      "agent-1".to_string(),
    );
    CachedBackend::new(
      client,
      LocalCache::new(MemoryStore::new()),
      ConnectivityMonitor::new(false),
    )
  }

  #[tokio::test]
  async fn test_offline_roster_reads_cached_list() {
    let backend = offline_backend();
    let customer = Customer {
      id: "c1".to_string(),
      name: "Asha".to_string(),
      email: None,
      phone: None,
      preferences: None,
      notes: None,
      created_at: None,
    };
    backend
      .cache
      .set(&backend.customers_key().cache_key(), &vec![customer.clone()]);

    let state = backend.customers().mount().await;

    assert_eq!(state.data, Some(vec![customer]));
    assert_eq!(state.source, DataSource::Offline);
  }

  #[tokio::test]
  async fn test_offline_read_needs_no_credentials() {
    let client = BackendClient::without_credentials(
      Url::parse("http://127.0.0.1:9").unwrap(),
      "agent-1".to_string(),
    );
    let backend = CachedBackend::new(
      client,
      LocalCache::new(MemoryStore::new()),
      ConnectivityMonitor::new(false),
    );
    let key = backend.conversations_key().cache_key();
    backend.cache.set(&key, &Vec::<Conversation>::new());

    let state = backend.conversations().mount().await;

    assert_eq!(state.data, Some(Vec::new()));
    assert_eq!(state.source, DataSource::Offline);
  }

  #[tokio::test]
  async fn test_unreachable_backend_falls_back_to_cache() {
    let mut backend = offline_backend();
    backend.connectivity = ConnectivityMonitor::new(true);
    backend
      .cache
      .set(&backend.itineraries_key().cache_key(), &Vec::<SavedItinerary>::new());

    let state = backend.itineraries().mount().await;

    assert_eq!(state.data, Some(Vec::new()));
    assert_eq!(state.source, DataSource::Cache);
  }

  #[tokio::test]
  async fn test_failed_write_keeps_cached_list() {
    let backend = offline_backend();
    let key = backend.customers_key().cache_key();
    backend.cache.set(&key, &Vec::<Customer>::new());

    assert!(backend.delete_customer("c1").await.is_err());

    assert_eq!(backend.cache.get::<Vec<Customer>>(&key), Some(Vec::new()));
  }

  fn customer(id: &str) -> Customer {
    Customer {
      id: id.to_string(),
      name: format!("Customer {}", id),
      email: None,
      phone: None,
      preferences: None,
      notes: None,
      created_at: None,
    }
  }

  #[test]
  fn test_created_record_is_prepended_to_cached_list() {
    let backend = offline_backend();
    let key = backend.customers_key().cache_key();
    backend.cache.set(&key, &vec![customer("c1")]);

    let customers = backend.customers();
    backend.prepend(customers.clone(), customer("c2"));

    let ids: Vec<String> = backend
      .cache
      .get::<Vec<Customer>>(&key)
      .unwrap()
      .into_iter()
      .map(|c| c.id)
      .collect();
    assert_eq!(ids, vec!["c2", "c1"]);
    assert_eq!(customers.state().data.map(|list| list.len()), Some(2));
  }

  #[test]
  fn test_created_record_without_cached_list_is_not_cached() {
    let backend = offline_backend();
    let key = backend.customers_key().cache_key();

    backend.prepend(backend.customers(), customer("c2"));

    assert_eq!(backend.cache.get::<Vec<Customer>>(&key), None);
  }

  #[test]
  fn test_lists_use_distinct_keys() {
    let backend = offline_backend();
    let customers = backend.customers();
    let itineraries = backend.itineraries();
    let conversations = backend.conversations();
    assert_ne!(customers.key(), itineraries.key());
    assert_ne!(itineraries.key(), conversations.key());
  }
}
