use serde::{Deserialize, Serialize};

use crate::itinerary::Itinerary;

/// Hotel class a customer prefers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotelType {
  Budget,
  Standard,
  Luxury,
  #[default]
  Any,
}

/// Travel preferences stored with a customer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerPreferences {
  /// 0 = very price-conscious, 100 = budget flexible
  pub budget_sensitivity: u8,
  pub preferred_airlines: Vec<String>,
  pub hotel_type: HotelType,
  /// 0 = cost over comfort, 100 = comfort over cost
  pub comfort_priority: u8,
  pub meal_preference: String,
  pub seat_preference: String,
  pub special_needs: Vec<String>,
}

impl Default for CustomerPreferences {
  fn default() -> Self {
    Self {
      budget_sensitivity: 50,
      preferred_airlines: Vec::new(),
      hotel_type: HotelType::Any,
      comfort_priority: 50,
      meal_preference: "any".to_string(),
      seat_preference: "any".to_string(),
      special_needs: Vec::new(),
    }
  }
}

/// Customer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
  pub id: String,
  pub name: String,
  pub email: Option<String>,
  pub phone: Option<String>,
  #[serde(default)]
  pub preferences: Option<CustomerPreferences>,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(default)]
  pub created_at: Option<String>,
}

impl Customer {
  /// Case-insensitive substring match on name or email.
  pub fn matches(&self, query: &str) -> bool {
    let query = query.to_lowercase();
    self.name.to_lowercase().contains(&query)
      || self
        .email
        .as_deref()
        .is_some_and(|email| email.to_lowercase().contains(&query))
  }
}

/// Fields written when creating or editing a customer
#[derive(Debug, Clone, Default, Serialize)]
pub struct CustomerInput {
  pub name: String,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub notes: Option<String>,
  pub preferences: CustomerPreferences,
}

/// Saved itinerary record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedItinerary {
  pub id: String,
  pub title: String,
  pub itinerary_type: String,
  pub details: Itinerary,
  pub total_cost: Option<f64>,
  pub status: Option<String>,
  pub customer_id: Option<String>,
  pub conversation_id: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  System,
  User,
  Assistant,
}

/// One turn of a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role: Role,
  pub content: String,
}

impl ChatMessage {
  pub fn user(content: impl Into<String>) -> Self {
    Self {
      role: Role::User,
      content: content.into(),
    }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self {
      role: Role::Assistant,
      content: content.into(),
    }
  }
}

/// Conversation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub messages: Vec<ChatMessage>,
  #[serde(default)]
  pub created_at: Option<String>,
  #[serde(default)]
  pub updated_at: Option<String>,
}

/// Maximum characters of the opening message kept in a conversation title
const TITLE_CHARS: usize = 50;

/// Conversation title derived from its opening message.
pub fn conversation_title(first_message: &str) -> String {
  let mut chars = first_message.chars();
  let head: String = chars.by_ref().take(TITLE_CHARS).collect();
  if chars.next().is_some() {
    format!("{}...", head)
  } else {
    head
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_short_title_kept() {
    assert_eq!(conversation_title("Goa in May"), "Goa in May");
  }

  #[test]
  fn test_long_title_truncated_on_chars() {
    let message = "₹".repeat(60);
    let title = conversation_title(&message);
    assert_eq!(title, format!("{}...", "₹".repeat(50)));
  }

  #[test]
  fn test_exactly_fifty_chars_not_truncated() {
    let message = "a".repeat(50);
    assert_eq!(conversation_title(&message), message);
  }

  #[test]
  fn test_customer_with_missing_optional_fields() {
    let customer: Customer =
      serde_json::from_str(r#"{"id":"c1","name":"Asha","email":null,"phone":null}"#).unwrap();
    assert_eq!(customer.name, "Asha");
    assert_eq!(customer.preferences, None);
  }

  #[test]
  fn test_customer_search_matches_name_or_email() {
    let with_email: Customer = serde_json::from_str(
      r#"{"id":"c1","name":"Asha Rao","email":"Asha@Example.com","phone":null}"#,
    )
    .unwrap();
    let without_email: Customer =
      serde_json::from_str(r#"{"id":"c2","name":"Vikram","email":null,"phone":null}"#).unwrap();

    assert!(with_email.matches("asha"));
    assert!(with_email.matches("EXAMPLE.COM"));
    assert!(with_email.matches(""));
    assert!(!with_email.matches("vikram"));
    assert!(without_email.matches("VIK"));
    assert!(!without_email.matches("example"));
  }

  #[test]
  fn test_partial_preferences_fill_defaults() {
    let prefs: CustomerPreferences =
      serde_json::from_str(r#"{"hotelType":"luxury","comfortPriority":90}"#).unwrap();
    assert_eq!(prefs.hotel_type, HotelType::Luxury);
    assert_eq!(prefs.comfort_priority, 90);
    assert_eq!(prefs.budget_sensitivity, 50);
    assert_eq!(prefs.meal_preference, "any");
  }
}
