//! System prompt construction for the travel assistant.

use serde::Deserialize;

/// Default tradeoff: halfway between budget and comfort
pub const DEFAULT_TRADEOFF: u8 = 50;

/// Transport the agent restricts recommendations to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
  Bus,
  Train,
  Plane,
}

impl TravelMode {
  pub fn as_str(self) -> &'static str {
    match self {
      TravelMode::Bus => "bus",
      TravelMode::Train => "train",
      TravelMode::Plane => "plane",
    }
  }

  fn description(self) -> &'static str {
    match self {
      TravelMode::Bus => "Bus travel - focus on bus tickets, bus routes, bus operators, and road travel options. Do NOT suggest flights or train tickets.",
      TravelMode::Train => "Train travel - focus on train tickets, railway routes, train classes, and rail travel options. Do NOT suggest flights or bus tickets.",
      TravelMode::Plane => "Air travel - focus on flight tickets, airlines, airports, and air travel options. Do NOT suggest trains or bus tickets.",
    }
  }

  /// Word used for the transport leg in recommendations
  pub fn transport_label(self) -> &'static str {
    match self {
      TravelMode::Bus => "Bus",
      TravelMode::Train => "Train",
      TravelMode::Plane => "Flight",
    }
  }

  /// Where the transport leg gets booked
  pub fn booking_platform(self) -> &'static str {
    match self {
      TravelMode::Bus => "RedBus",
      TravelMode::Train => "IRCTC",
      TravelMode::Plane => "MakeMyTrip",
    }
  }
}

/// Per-request preferences that shape the prompt.
#[derive(Debug, Clone, Default)]
pub struct ChatSettings {
  /// Response language, English when unset
  pub language: Option<String>,
  /// 0 = budget focused, 100 = comfort focused
  pub tradeoff: Option<u8>,
  pub travel_mode: Option<TravelMode>,
}

impl ChatSettings {
  fn language(&self) -> &str {
    self
      .language
      .as_deref()
      .filter(|l| !l.trim().is_empty())
      .unwrap_or("English")
  }

  fn tradeoff(&self) -> u8 {
    self.tradeoff.unwrap_or(DEFAULT_TRADEOFF).min(100)
  }
}

fn mode_restriction(mode: TravelMode) -> String {
  let name = mode.as_str();
  format!(
    "\n\nIMPORTANT TRAVEL MODE RESTRICTION: The user has selected {upper} as their preferred travel mode. {description}\n\n\
     ALL your travel recommendations MUST be for {name} only. If the user asks about other travel modes, \
     politely remind them their current mode is set to {name} and provide {name} options instead.",
    upper = name.to_uppercase(),
    description = mode.description(),
  )
}

/// Assemble the instructions sent ahead of the conversation history.
pub fn build_system_prompt(settings: &ChatSettings) -> String {
  // Without an explicit mode the assistant plans flights
  let mode = settings.travel_mode.unwrap_or(TravelMode::Plane);
  let transport = mode.transport_label();
  let platform = mode.booking_platform();
  let restriction = settings
    .travel_mode
    .map(mode_restriction)
    .unwrap_or_default();

  format!(
    r#"You are an AI Travel Copilot assistant for travel agents. You help agents plan travel itineraries for their customers.

Language: Respond in {language}. Adapt your responses to be culturally appropriate.

Current preference setting: {tradeoff}% (0 = Budget focused, 50 = Balanced, 100 = Comfort focused)
{restriction}

FORMATTING RULES:
1. Do not use asterisks or markdown bold/italic formatting
2. Use plain text with clear section headers
3. Use numbers (1, 2, 3) or dashes (-) for lists
4. Keep responses clean and easy to read

Your capabilities:
1. Understand travel requirements (destinations, dates, number of travelers, special needs)
2. Suggest optimized travel options based on the preference setting
3. Explain why you recommend each option (price advantage, comfort, safety)
4. Flag risks (short layovers, red-eye travel, visa requirements)
5. Remember customer preferences mentioned in the conversation

When generating recommendations you must:
1. Provide 3 options: Budget, Balanced, and Comfort
2. Include {transport} details with pricing in Indian Rupees (₹)
3. End each option with where to book it:
   - {transport} Booking: name the booking platform and explain how to search
   - Hotel Booking: Booking.com for hotels in the destination city
   - Restaurant Guide: Zomato for restaurant recommendations
4. Explain why each option is recommended
5. Flag any travel risks or concerns

RESPONSE FORMAT:

{transport} Travel Recommendations from [Origin] to [Destination]

OPTION 1: Budget Friendly
{transport} Details: [operator/airline, timing, price ₹XXX]
Hotel Suggestion: [budget hotel name, ₹XXX per night]
Why this works: [brief explanation of value]
Risks: [any concerns]

Book {transport}: Search on {platform}
Book Hotel: Search on Booking.com for [destination]
Find Restaurants: Check Zomato for [destination]

OPTION 2: Balanced Value
[Same format]

OPTION 3: Premium Comfort
[Same format]

My Recommendation: [Which option suits their needs best and why]

After providing recommendations, always end with:
"How would you rate this response? (1-5 stars) Please share any feedback or changes you'd like!"

Be conversational and helpful. Do not use asterisks anywhere in your response."#,
    language = settings.language(),
    tradeoff = settings.tradeoff(),
  )
}

/// Search links for one trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingLinks {
  pub transport: String,
  pub hotel: String,
  pub restaurant: String,
}

fn encode(segment: &str) -> String {
  url::form_urlencoded::byte_serialize(segment.as_bytes())
    .collect::<String>()
    .replace('+', "%20")
}

/// Booking links for a trip from `from` to `to` departing on `date` (YYYY-MM-DD).
pub fn booking_links(mode: TravelMode, from: &str, to: &str, date: &str) -> BookingLinks {
  let from = encode(if from.trim().is_empty() { "Delhi" } else { from });
  let to = encode(if to.trim().is_empty() { "Mumbai" } else { to });

  let transport = match mode {
    TravelMode::Bus => format!(
      "https://www.redbus.in/bus-tickets/{}-to-{}",
      from.to_lowercase(),
      to.to_lowercase()
    ),
    TravelMode::Train => "https://www.irctc.co.in/nget/train-search".to_string(),
    TravelMode::Plane => format!(
      "https://www.makemytrip.com/flight/search?itinerary={}-{}-{}&tripType=O&paxType=A-1_C-0_I-0&cabin=E",
      from, to, date
    ),
  };

  BookingLinks {
    transport,
    hotel: format!("https://www.booking.com/searchresults.html?ss={}", to),
    restaurant: format!("https://www.zomato.com/{}/restaurants", to.to_lowercase()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use url::Url;

  #[test]
  fn test_defaults() {
    let prompt = build_system_prompt(&ChatSettings::default());
    assert!(prompt.contains("Respond in English."));
    assert!(prompt.contains("Current preference setting: 50%"));
    assert!(prompt.contains("Flight Details:"));
    assert!(prompt.contains("Search on MakeMyTrip"));
    assert!(!prompt.contains("TRAVEL MODE RESTRICTION"));
  }

  #[test]
  fn test_train_mode_restriction() {
    let settings = ChatSettings {
      language: Some("Hindi".to_string()),
      tradeoff: Some(80),
      travel_mode: Some(TravelMode::Train),
    };
    let prompt = build_system_prompt(&settings);
    assert!(prompt.contains("Respond in Hindi."));
    assert!(prompt.contains("Current preference setting: 80%"));
    assert!(prompt.contains("selected TRAIN as their preferred travel mode"));
    assert!(prompt.contains("MUST be for train only"));
    assert!(prompt.contains("Train Details:"));
    assert!(prompt.contains("Search on IRCTC"));
  }

  #[test]
  fn test_tradeoff_is_clamped() {
    let settings = ChatSettings {
      tradeoff: Some(250),
      ..Default::default()
    };
    assert!(build_system_prompt(&settings).contains("Current preference setting: 100%"));
  }

  #[test]
  fn test_bus_links() {
    let links = booking_links(TravelMode::Bus, "New Delhi", "Jaipur", "2024-02-15");
    assert_eq!(
      links.transport,
      "https://www.redbus.in/bus-tickets/new%20delhi-to-jaipur"
    );
    assert_eq!(links.hotel, "https://www.booking.com/searchresults.html?ss=Jaipur");
    assert_eq!(links.restaurant, "https://www.zomato.com/jaipur/restaurants");
  }

  #[test]
  fn test_plane_links_default_cities() {
    let links = booking_links(TravelMode::Plane, "", " ", "2024-02-15");
    assert!(links
      .transport
      .contains("itinerary=Delhi-Mumbai-2024-02-15&tripType=O"));
    assert!(Url::parse(&links.transport).is_ok());
    assert!(Url::parse(&links.hotel).is_ok());
  }
}
