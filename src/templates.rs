//! Ready-to-send customer messages built from an itinerary.

use crate::itinerary::Itinerary;

/// Delivery channel; decides the tone and layout of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Channel {
  Email,
  Whatsapp,
}

/// Which message to compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TemplateKind {
  Itinerary,
  FollowUp,
  Confirmation,
}

const EMAIL_ITINERARY: &str = "Dear {customerName},

I hope this email finds you well! I'm pleased to share the travel itinerary I've put together based on your preferences.

TRIP DETAILS
--------------------------

FLIGHT INFORMATION
Airline: {airline} {flightNo}
Route: {departureCity} → {arrivalCity}
Departure: {departureTime} on {departureDate}
Arrival: {arrivalTime}
Duration: {duration}
Price: ₹{flightPrice} per person

HOTEL ACCOMMODATION
Hotel: {hotelName}
Rating: {hotelRating}⭐
Room Type: {roomType}
Price: ₹{hotelPrice} per night
Amenities: {amenities}

TOTAL COST: ₹{totalCost}

--------------------------

Please review the details and let me know if you'd like to proceed with this booking or if you have any questions.

Best regards,
{agentName}
Travel Agent";

const EMAIL_FOLLOW_UP: &str = "Dear {customerName},

I wanted to follow up on the travel itinerary I shared with you earlier. Please let me know if:

- You'd like to proceed with the booking
- You need any changes to the itinerary
- You have any questions about the trip

I'm here to help make your trip seamless!

Best regards,
{agentName}";

const EMAIL_CONFIRMATION: &str = "Dear {customerName},

Great news! Your booking has been confirmed.

Trip: {departureCity} → {arrivalCity}
Date: {departureDate}
Total Paid: ₹{totalCost}

NEXT STEPS:
1. E-tickets will be sent to your email shortly
2. Hotel confirmation number will follow
3. Please keep your ID documents ready

Safe travels!

Best regards,
{agentName}";

const WHATSAPP_ITINERARY: &str = "🌟 *Travel Itinerary for {customerName}* 🌟

✈️ *FLIGHT*
{airline} {flightNo}
📍 {departureCity} → {arrivalCity}
🕐 {departureTime} - {arrivalTime}
💰 ₹{flightPrice}/person

🏨 *HOTEL*
{hotelName} ({hotelRating}⭐)
{roomType}
💰 ₹{hotelPrice}/night

*TOTAL: ₹{totalCost}*

Reply with ✅ to book or ❓ for questions!

- {agentName}";

const WHATSAPP_FOLLOW_UP: &str = "Hi {customerName} 👋

Just checking in about the travel itinerary I sent!

Let me know if you:
✅ Want to book
✏️ Need changes
❓ Have questions

Happy to help! 😊

- {agentName}";

const WHATSAPP_CONFIRMATION: &str = "🎉 *BOOKING CONFIRMED!* 🎉

Hi {customerName}!

Your trip is booked! ✅

📍 {departureCity} → {arrivalCity}
📅 {departureDate}
💰 ₹{totalCost}

E-tickets coming soon! 📧

Safe travels! ✈️

- {agentName}";

fn template(channel: Channel, kind: TemplateKind) -> &'static str {
  match (channel, kind) {
    (Channel::Email, TemplateKind::Itinerary) => EMAIL_ITINERARY,
    (Channel::Email, TemplateKind::FollowUp) => EMAIL_FOLLOW_UP,
    (Channel::Email, TemplateKind::Confirmation) => EMAIL_CONFIRMATION,
    (Channel::Whatsapp, TemplateKind::Itinerary) => WHATSAPP_ITINERARY,
    (Channel::Whatsapp, TemplateKind::FollowUp) => WHATSAPP_FOLLOW_UP,
    (Channel::Whatsapp, TemplateKind::Confirmation) => WHATSAPP_CONFIRMATION,
  }
}

/// Values substituted into a template.
#[derive(Debug, Clone)]
pub struct TemplateContext<'a> {
  pub customer_name: &'a str,
  pub customer_email: &'a str,
  pub agent_name: &'a str,
  pub itinerary: Option<&'a Itinerary>,
}

impl Default for TemplateContext<'_> {
  fn default() -> Self {
    Self {
      customer_name: "[Customer Name]",
      customer_email: "",
      agent_name: "Your Travel Agent",
      itinerary: None,
    }
  }
}

/// Group digits in threes: 12500 -> "12,500".
pub fn format_amount(amount: u64) -> String {
  let digits = amount.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

fn placeholders(ctx: &TemplateContext<'_>) -> Vec<(&'static str, String)> {
  let it = ctx.itinerary;
  let or = |value: Option<String>, fallback: &str| value.unwrap_or_else(|| fallback.to_string());

  vec![
    ("{customerName}", ctx.customer_name.to_string()),
    ("{customerEmail}", ctx.customer_email.to_string()),
    ("{agentName}", ctx.agent_name.to_string()),
    ("{airline}", or(it.map(|i| i.flight.airline.clone()), "[Airline]")),
    ("{flightNo}", or(it.map(|i| i.flight.flight_no.clone()), "[Flight No]")),
    ("{departureCity}", or(it.map(|i| i.flight.departure.city.clone()), "[City]")),
    ("{arrivalCity}", or(it.map(|i| i.flight.arrival.city.clone()), "[City]")),
    ("{departureTime}", or(it.map(|i| i.flight.departure.time.clone()), "[Time]")),
    ("{departureDate}", or(it.map(|i| i.flight.departure.date.clone()), "[Date]")),
    ("{arrivalTime}", or(it.map(|i| i.flight.arrival.time.clone()), "[Time]")),
    ("{duration}", or(it.map(|i| i.flight.duration.clone()), "[Duration]")),
    ("{flightPrice}", or(it.map(|i| format_amount(i.flight.price)), "[Price]")),
    ("{hotelName}", or(it.map(|i| i.hotel.name.clone()), "[Hotel]")),
    ("{hotelRating}", or(it.map(|i| i.hotel.rating.to_string()), "[Rating]")),
    ("{roomType}", or(it.map(|i| i.hotel.room_type.clone()), "[Room Type]")),
    ("{hotelPrice}", or(it.map(|i| format_amount(i.hotel.price_per_night)), "[Price]")),
    ("{amenities}", or(it.map(|i| i.hotel.amenities.join(", ")), "[Amenities]")),
    ("{totalCost}", or(it.map(|i| format_amount(i.total_cost)), "[Total]")),
  ]
}

/// Render the chosen message with every placeholder filled in.
pub fn render(channel: Channel, kind: TemplateKind, ctx: &TemplateContext<'_>) -> String {
  placeholders(ctx)
    .into_iter()
    .fold(template(channel, kind).to_string(), |text, (key, value)| {
      text.replace(key, &value)
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::itinerary::fixtures;

  #[test]
  fn test_format_amount() {
    assert_eq!(format_amount(0), "0");
    assert_eq!(format_amount(999), "999");
    assert_eq!(format_amount(4500), "4,500");
    assert_eq!(format_amount(1234567), "1,234,567");
  }

  #[test]
  fn test_email_itinerary_fills_every_placeholder() {
    let itinerary = fixtures::sample();
    let ctx = TemplateContext {
      customer_name: "Asha",
      agent_name: "Ravi",
      itinerary: Some(&itinerary),
      ..Default::default()
    };

    let text = render(Channel::Email, TemplateKind::Itinerary, &ctx);

    assert!(text.starts_with("Dear Asha,"));
    assert!(text.contains("Airline: IndiGo 6E-2045"));
    assert!(text.contains("Route: Mumbai → Delhi"));
    assert!(text.contains("Rating: 3.5⭐"));
    assert!(text.contains("Amenities: WiFi, Breakfast"));
    assert!(text.contains("TOTAL COST: ₹12,500"));
    assert!(text.ends_with("Ravi\nTravel Agent"));
    assert!(!text.contains('{'));
  }

  #[test]
  fn test_missing_itinerary_uses_bracketed_placeholders() {
    let text = render(
      Channel::Whatsapp,
      TemplateKind::Confirmation,
      &TemplateContext::default(),
    );

    assert!(text.contains("Hi [Customer Name]!"));
    assert!(text.contains("📍 [City] → [City]"));
    assert!(text.contains("💰 ₹[Total]"));
    assert!(text.ends_with("- Your Travel Agent"));
  }

  #[test]
  fn test_follow_up_needs_no_itinerary() {
    let ctx = TemplateContext {
      customer_name: "Asha",
      ..Default::default()
    };
    let text = render(Channel::Email, TemplateKind::FollowUp, &ctx);
    assert!(text.starts_with("Dear Asha,"));
    assert!(!text.contains('['));
  }
}
