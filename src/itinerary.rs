//! Flight + hotel itinerary proposals.
//!
//! These are stored verbatim as the `details` JSON of a saved itinerary, so
//! field names follow the stored camelCase form.

use serde::{Deserialize, Serialize};

/// One end of a flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightEndpoint {
  pub city: String,
  pub airport: String,
  pub time: String,
  pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
  pub id: String,
  pub airline: String,
  pub flight_no: String,
  pub departure: FlightEndpoint,
  pub arrival: FlightEndpoint,
  pub duration: String,
  pub price: u64,
  pub stops: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub layover_duration: Option<String>,
  pub is_red_eye: bool,
  pub comfort_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
  pub id: String,
  pub name: String,
  pub city: String,
  pub rating: f32,
  pub price_per_night: u64,
  pub amenities: Vec<String>,
  pub room_type: String,
  pub comfort_score: u8,
}

/// Which tradeoff an itinerary optimises for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItineraryKind {
  Budget,
  Balanced,
  Comfort,
}

impl ItineraryKind {
  pub fn as_str(self) -> &'static str {
    match self {
      ItineraryKind::Budget => "budget",
      ItineraryKind::Balanced => "balanced",
      ItineraryKind::Comfort => "comfort",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      ItineraryKind::Budget => "Budget",
      ItineraryKind::Balanced => "Balanced",
      ItineraryKind::Comfort => "Comfort",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
  Rising,
  Stable,
  Dropping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: ItineraryKind,
  pub flight: Flight,
  pub hotel: Hotel,
  pub total_cost: u64,
  pub total_duration: String,
  #[serde(default)]
  pub explanation: Vec<String>,
  #[serde(default)]
  pub risks: Vec<String>,
  pub price_trend: PriceTrend,
  pub confidence_score: u8,
}

impl Itinerary {
  /// Title used when saving, e.g. "Budget - Mumbai to Delhi".
  pub fn title(&self) -> String {
    format!(
      "{} - {} to {}",
      self.kind.label(),
      self.flight.departure.city,
      self.flight.arrival.city
    )
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_title() {
    assert_eq!(fixtures::sample().title(), "Budget - Mumbai to Delhi");
  }

  #[test]
  fn test_stored_field_names() {
    let value = serde_json::to_value(fixtures::sample()).unwrap();
    assert_eq!(value["type"], "budget");
    assert_eq!(value["totalCost"], 12500);
    assert_eq!(value["flight"]["flightNo"], "6E-2045");
    assert_eq!(value["hotel"]["pricePerNight"], 2800);
    assert_eq!(value["priceTrend"], "stable");
    assert!(value["flight"].get("layoverDuration").is_none());
  }
}
