use crate::backend::types::{
  ChatMessage, Conversation, Customer, CustomerInput, SavedItinerary,
};
use crate::config::Config;
use crate::itinerary::Itinerary;
use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

const CUSTOMERS: &str = "customers";
const ITINERARIES: &str = "itineraries";
const CONVERSATIONS: &str = "conversations";

/// Keys sent with every request.
#[derive(Clone)]
struct Credentials {
  api_key: String,
  access_token: String,
}

/// Client for the hosted record store.
///
/// Speaks the PostgREST dialect: one resource per table under `/rest/v1/`,
/// filters as `column=eq.value` query pairs. Every query is scoped to the
/// signed-in agent.
///
/// Credentials are only required once a request is sent, so cached reads work
/// without them.
#[derive(Clone)]
pub struct BackendClient {
  http: reqwest::Client,
  base: Url,
  credentials: Option<Credentials>,
  agent_id: String,
}

impl BackendClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base = Url::parse(&config.backend.url)
      .map_err(|e| eyre!("Invalid backend url {}: {}", config.backend.url, e))?;

    let credentials = match (Config::get_api_key(), Config::get_access_token()) {
      (Ok(api_key), Ok(access_token)) => Some(Credentials {
        api_key,
        access_token,
      }),
      (Err(e), _) | (_, Err(e)) => {
        debug!(error = %e, "backend credentials not set");
        None
      }
    };

    Ok(Self::from_parts(base, credentials, config.backend.agent_id.clone()))
  }

  #[cfg(test)]
  pub fn with_credentials(base: Url, api_key: String, access_token: String, agent_id: String) -> Self {
    Self::from_parts(
      base,
      Some(Credentials {
        api_key,
        access_token,
      }),
      agent_id,
    )
  }

  #[cfg(test)]
  pub fn without_credentials(base: Url, agent_id: String) -> Self {
    Self::from_parts(base, None, agent_id)
  }

  fn from_parts(mut base: Url, credentials: Option<Credentials>, agent_id: String) -> Self {
    // Url::join drops the last segment unless the path ends with a slash
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    Self {
      http: reqwest::Client::new(),
      base,
      credentials,
      agent_id,
    }
  }

  pub fn agent_id(&self) -> &str {
    &self.agent_id
  }

  /// Build the URL for `table` with the agent filter and extra query pairs.
  fn table_url(&self, table: &str, query: &[(&str, String)]) -> Result<Url> {
    let mut url = self
      .base
      .join(&format!("rest/v1/{}", table))
      .map_err(|e| eyre!("Failed to build url for {}: {}", table, e))?;

    {
      let mut pairs = url.query_pairs_mut();
      for (key, value) in query {
        pairs.append_pair(key, value);
      }
      pairs.append_pair("agent_id", &eq(&self.agent_id));
    }

    Ok(url)
  }

  fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
    let credentials = self.credentials.as_ref().ok_or_else(|| {
      eyre!(
        "Backend credentials not found. Set TRAVEL_COPILOT_API_KEY and TRAVEL_COPILOT_ACCESS_TOKEN environment variables."
      )
    })?;
    Ok(
      self
        .http
        .request(method, url)
        .header("apikey", &credentials.api_key)
        .bearer_auth(&credentials.access_token),
    )
  }

  async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
    let response = request
      .send()
      .await
      .map_err(|e| eyre!("Failed to {}: {}", what, e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(eyre!("Failed to {}: {} {}", what, status, body));
    }

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse response to {}: {}", what, e))
  }

  async fn send_empty(&self, request: RequestBuilder, what: &str) -> Result<()> {
    let response = request
      .send()
      .await
      .map_err(|e| eyre!("Failed to {}: {}", what, e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(eyre!("Failed to {}: {} {}", what, status, body));
    }
    Ok(())
  }

  /// Insert one row and return the stored representation.
  async fn insert<T: DeserializeOwned>(
    &self,
    table: &str,
    body: serde_json::Value,
    what: &str,
  ) -> Result<T> {
    let url = self.table_url(table, &[])?;
    let request = self
      .request(Method::POST, url)?
      .header("Prefer", "return=representation")
      .json(&body);

    let mut rows: Vec<T> = self.send_json(request, what).await?;
    if rows.is_empty() {
      return Err(eyre!("Failed to {}: no row returned", what));
    }
    Ok(rows.swap_remove(0))
  }

  async fn update(&self, table: &str, id: &str, body: serde_json::Value, what: &str) -> Result<()> {
    let url = self.table_url(table, &[("id", eq(id))])?;
    let request = self.request(Method::PATCH, url)?.json(&body);
    self.send_empty(request, what).await
  }

  async fn delete(&self, table: &str, id: &str, what: &str) -> Result<()> {
    let url = self.table_url(table, &[("id", eq(id))])?;
    let request = self.request(Method::DELETE, url)?;
    self.send_empty(request, what).await
  }

  /// All customers of the agent, newest first
  pub async fn list_customers(&self) -> Result<Vec<Customer>> {
    let url = self.table_url(
      CUSTOMERS,
      &[
        ("select", "*".to_string()),
        ("order", "created_at.desc".to_string()),
      ],
    )?;
    self
      .send_json(self.request(Method::GET, url)?, "load customers")
      .await
  }

  pub async fn create_customer(&self, input: &CustomerInput) -> Result<Customer> {
    let body = customer_body(&self.agent_id, input);
    self.insert(CUSTOMERS, body, "create customer").await
  }

  pub async fn update_customer(&self, id: &str, input: &CustomerInput) -> Result<()> {
    let body = customer_body(&self.agent_id, input);
    self.update(CUSTOMERS, id, body, "update customer").await
  }

  pub async fn delete_customer(&self, id: &str) -> Result<()> {
    self.delete(CUSTOMERS, id, "delete customer").await
  }

  /// All saved itineraries of the agent, newest first
  pub async fn list_itineraries(&self) -> Result<Vec<SavedItinerary>> {
    let url = self.table_url(
      ITINERARIES,
      &[
        ("select", "*".to_string()),
        ("order", "created_at.desc".to_string()),
      ],
    )?;
    self
      .send_json(self.request(Method::GET, url)?, "load itineraries")
      .await
  }

  /// Save a proposed itinerary, optionally linked to a conversation and customer.
  pub async fn save_itinerary(
    &self,
    itinerary: &Itinerary,
    conversation_id: Option<&str>,
    customer_id: Option<&str>,
  ) -> Result<SavedItinerary> {
    let body = json!({
      "agent_id": self.agent_id,
      "title": itinerary.title(),
      "itinerary_type": itinerary.kind.as_str(),
      "details": itinerary,
      "total_cost": itinerary.total_cost,
      "status": "saved",
      "conversation_id": conversation_id,
      "customer_id": customer_id,
    });
    self.insert(ITINERARIES, body, "save itinerary").await
  }

  pub async fn update_itinerary_status(&self, id: &str, status: &str) -> Result<()> {
    let body = json!({ "status": status, "updated_at": Utc::now().to_rfc3339() });
    self
      .update(ITINERARIES, id, body, "update itinerary status")
      .await
  }

  /// Link an itinerary to a customer, or unlink it with `None`.
  pub async fn update_itinerary_customer(&self, id: &str, customer_id: Option<&str>) -> Result<()> {
    let body = json!({ "customer_id": customer_id, "updated_at": Utc::now().to_rfc3339() });
    self
      .update(ITINERARIES, id, body, "update itinerary customer")
      .await
  }

  pub async fn delete_itinerary(&self, id: &str) -> Result<()> {
    self.delete(ITINERARIES, id, "delete itinerary").await
  }

  /// All conversations of the agent, most recently active first
  pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
    let url = self.table_url(
      CONVERSATIONS,
      &[
        ("select", "*".to_string()),
        ("order", "updated_at.desc".to_string()),
      ],
    )?;
    self
      .send_json(self.request(Method::GET, url)?, "load conversations")
      .await
  }

  pub async fn create_conversation(&self, title: &str) -> Result<Conversation> {
    let body = json!({ "agent_id": self.agent_id, "title": title, "messages": [] });
    self
      .insert(CONVERSATIONS, body, "create conversation")
      .await
  }

  pub async fn update_conversation(&self, id: &str, messages: &[ChatMessage]) -> Result<()> {
    let body = json!({ "messages": messages, "updated_at": Utc::now().to_rfc3339() });
    self
      .update(CONVERSATIONS, id, body, "update conversation")
      .await
  }
}

/// PostgREST equality filter value
fn eq(value: &str) -> String {
  format!("eq.{}", value)
}

fn customer_body(agent_id: &str, input: &CustomerInput) -> serde_json::Value {
  json!({
    "agent_id": agent_id,
    "name": input.name,
    "email": input.email,
    "phone": input.phone,
    "notes": input.notes,
    "preferences": input.preferences,
  })
}
