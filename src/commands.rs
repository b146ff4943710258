//! Subcommands and their handlers.

use chrono::{Local, Utc};
use clap::{Args, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::Interval;
use tracing::warn;

use crate::app::{App, Store};
use crate::backend::types::{
  conversation_title, ChatMessage, Customer, CustomerInput, CustomerPreferences, SavedItinerary,
};
use crate::backend::CachedBackend;
use crate::cache::{CachedFetch, DataSource, FetchState};
use crate::chat::{booking_links, ChatSettings, GatewayError, TravelMode};
use crate::connectivity::OfflineIndicator;
use crate::itinerary::Itinerary;
use crate::templates::{self, Channel, TemplateContext, TemplateKind};

/// Reply shown when the assistant can't be reached.
const FALLBACK_REPLY: &str = "I'm having trouble reaching the travel assistant right now. \
Your message has been kept; please try again in a moment.";

#[derive(Subcommand, Debug)]
pub enum Command {
  /// List customers
  Customers {
    /// Only show customers whose name or email contains this text
    #[arg(long)]
    search: Option<String>,
  },
  /// Create, edit or delete a customer
  #[command(subcommand)]
  Customer(CustomerCommand),
  /// List saved itineraries
  Itineraries,
  /// Save, update or delete an itinerary
  #[command(subcommand)]
  Itinerary(ItineraryCommand),
  /// List chat conversations
  Conversations,
  /// Ask the travel assistant
  Chat(ChatArgs),
  /// Render a customer message
  Template(TemplateArgs),
  /// Booking links for a trip
  Links(LinksArgs),
  /// Manage the local cache
  #[command(subcommand)]
  Cache(CacheCommand),
  /// Keep lists up to date and report connectivity changes
  Watch {
    /// Also refresh every N seconds
    #[arg(long)]
    refresh_every: Option<u64>,
  },
}

#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
  Add(CustomerFields),
  Update {
    id: String,
    #[command(flatten)]
    fields: CustomerFields,
  },
  Delete {
    id: String,
  },
}

#[derive(Args, Debug)]
pub struct CustomerFields {
  #[arg(long)]
  pub name: String,
  #[arg(long)]
  pub email: Option<String>,
  #[arg(long)]
  pub phone: Option<String>,
  #[arg(long)]
  pub notes: Option<String>,
  /// JSON file with travel preferences
  #[arg(long)]
  pub preferences: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ItineraryCommand {
  /// Save an itinerary read from a JSON file
  Save {
    file: PathBuf,
    #[arg(long)]
    customer: Option<String>,
    #[arg(long)]
    conversation: Option<String>,
  },
  Status {
    id: String,
    status: String,
  },
  /// Attach an itinerary to a customer, or detach it when no customer is given
  Link {
    id: String,
    customer: Option<String>,
  },
  Delete {
    id: String,
  },
}

#[derive(Args, Debug)]
pub struct ChatArgs {
  /// Message to send
  #[arg(required = true)]
  pub message: Vec<String>,
  /// Continue an existing conversation
  #[arg(long)]
  pub conversation: Option<String>,
  #[arg(long)]
  pub language: Option<String>,
  /// 0 = budget focused, 100 = comfort focused
  #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
  pub tradeoff: Option<u8>,
  #[arg(long, value_enum)]
  pub mode: Option<TravelMode>,
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
  #[arg(value_enum)]
  pub channel: Channel,
  #[arg(value_enum)]
  pub kind: TemplateKind,
  /// Itinerary JSON file
  #[arg(long, conflicts_with = "saved")]
  pub itinerary: Option<PathBuf>,
  /// Id of a saved itinerary
  #[arg(long)]
  pub saved: Option<String>,
  /// Id of the customer the message is for
  #[arg(long)]
  pub customer: Option<String>,
}

#[derive(Args, Debug)]
pub struct LinksArgs {
  pub from: String,
  pub to: String,
  #[arg(long, value_enum, default_value = "plane")]
  pub mode: TravelMode,
  /// Departure date (YYYY-MM-DD), today when omitted
  #[arg(long)]
  pub date: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
  /// Remove one entry, or every entry when no key is given
  Clear { key: Option<String> },
}

pub async fn run(app: &App, command: Command) -> Result<()> {
  match command {
    Command::Customers { search } => {
      let backend = app.backend()?;
      let state = backend.customers().mount().await;
      print_status(app, &state);
      let customers = state.data.unwrap_or_default();
      print_customers(&filter_customers(customers, search.as_deref()));
    }
    Command::Customer(cmd) => customer(app, cmd).await?,
    Command::Itineraries => {
      let backend = app.backend()?;
      let state = backend.itineraries().mount().await;
      print_status(app, &state);
      print_itineraries(state.data.as_deref().unwrap_or_default());
    }
    Command::Itinerary(cmd) => itinerary(app, cmd).await?,
    Command::Conversations => {
      let backend = app.backend()?;
      let state = backend.conversations().mount().await;
      print_status(app, &state);
      for conversation in state.data.as_deref().unwrap_or_default() {
        println!(
          "{}  {}  ({} messages)",
          conversation.id,
          conversation.title,
          conversation.messages.len()
        );
      }
    }
    Command::Chat(args) => chat(app, args).await?,
    Command::Template(args) => template(app, args).await?,
    Command::Links(args) => {
      let date = args
        .date
        .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());
      let links = booking_links(args.mode, &args.from, &args.to, &date);
      println!("{}: {}", args.mode.booking_platform(), links.transport);
      println!("Hotels: {}", links.hotel);
      println!("Restaurants: {}", links.restaurant);
    }
    Command::Cache(CacheCommand::Clear { key }) => {
      app.cache.clear(key.as_deref());
      match key {
        Some(key) => println!("Cleared cache entry {}", key),
        None => println!("Cleared all cache entries"),
      }
    }
    Command::Watch { refresh_every } => watch(app, refresh_every).await?,
  }
  Ok(())
}

async fn customer(app: &App, cmd: CustomerCommand) -> Result<()> {
  let backend = require_online(app)?;
  match cmd {
    CustomerCommand::Add(fields) => {
      let created = backend.create_customer(&customer_input(fields)?).await?;
      println!("Created customer {} ({})", created.name, created.id);
    }
    CustomerCommand::Update { id, fields } => {
      backend.update_customer(&id, &customer_input(fields)?).await?;
      println!("Updated customer {}", id);
    }
    CustomerCommand::Delete { id } => {
      backend.delete_customer(&id).await?;
      println!("Deleted customer {}", id);
    }
  }
  Ok(())
}

fn customer_input(fields: CustomerFields) -> Result<CustomerInput> {
  let preferences = match &fields.preferences {
    Some(path) => read_json::<CustomerPreferences>(path)?,
    None => CustomerPreferences::default(),
  };
  Ok(CustomerInput {
    name: fields.name,
    email: fields.email,
    phone: fields.phone,
    notes: fields.notes,
    preferences,
  })
}

async fn itinerary(app: &App, cmd: ItineraryCommand) -> Result<()> {
  let backend = require_online(app)?;
  match cmd {
    ItineraryCommand::Save {
      file,
      customer,
      conversation,
    } => {
      let itinerary: Itinerary = read_json(&file)?;
      let saved = backend
        .save_itinerary(&itinerary, conversation.as_deref(), customer.as_deref())
        .await?;
      println!("Saved {} ({})", saved.title, saved.id);
    }
    ItineraryCommand::Status { id, status } => {
      backend.update_itinerary_status(&id, &status).await?;
      println!("Itinerary {} is now {}", id, status);
    }
    ItineraryCommand::Link { id, customer } => {
      backend
        .update_itinerary_customer(&id, customer.as_deref())
        .await?;
      match customer {
        Some(customer) => println!("Linked itinerary {} to customer {}", id, customer),
        None => println!("Unlinked itinerary {}", id),
      }
    }
    ItineraryCommand::Delete { id } => {
      backend.delete_itinerary(&id).await?;
      println!("Deleted itinerary {}", id);
    }
  }
  Ok(())
}

async fn chat(app: &App, args: ChatArgs) -> Result<()> {
  let backend = require_online(app)?;
  let gateway = app.gateway()?;
  let message = args.message.join(" ");

  let defaults = app.config.chat.settings();
  let settings = ChatSettings {
    language: args.language.or(defaults.language),
    tradeoff: args.tradeoff.or(defaults.tradeoff),
    travel_mode: args.mode.or(defaults.travel_mode),
  };

  let (conversation_id, mut history) = match args.conversation {
    Some(id) => {
      let conversations = backend.conversations().mount().await;
      let existing = conversations
        .data
        .unwrap_or_default()
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| eyre!("Conversation not found: {}", id))?;
      (Some(existing.id), existing.messages)
    }
    None => match backend.create_conversation(&conversation_title(&message)).await {
      Ok(conversation) => (Some(conversation.id), Vec::new()),
      Err(e) => {
        warn!(error = %e, "failed to create conversation, continuing unsaved");
        (None, Vec::new())
      }
    },
  };

  history.push(ChatMessage::user(message));
  let reply = match gateway.complete(&history, &settings).await {
    Ok(reply) => reply,
    Err(e @ (GatewayError::RateLimited | GatewayError::CreditsExhausted)) => {
      return Err(eyre!("{}", e));
    }
    Err(e) => {
      warn!(error = %e, "completion failed");
      FALLBACK_REPLY.to_string()
    }
  };
  history.push(ChatMessage::assistant(reply.clone()));

  if let Some(id) = &conversation_id {
    if let Err(e) = backend.update_conversation(id, &history).await {
      warn!(conversation = %id, error = %e, "failed to save conversation");
    }
  }

  println!("{}", reply);
  if let Some(id) = conversation_id {
    eprintln!("(conversation {})", id);
  }
  Ok(())
}

async fn template(app: &App, args: TemplateArgs) -> Result<()> {
  let customer = match &args.customer {
    Some(id) => Some(find_record(&app.backend()?.customers(), |c: &Customer| &c.id == id).await?),
    None => None,
  };

  let itinerary = match (&args.itinerary, &args.saved) {
    (Some(path), _) => Some(read_json::<Itinerary>(path)?),
    (None, Some(id)) => Some(
      find_record(&app.backend()?.itineraries(), |i: &SavedItinerary| &i.id == id)
        .await?
        .details,
    ),
    (None, None) => None,
  };

  let mut ctx = TemplateContext {
    agent_name: app.agent_name(),
    itinerary: itinerary.as_ref(),
    ..Default::default()
  };
  if let Some(customer) = &customer {
    ctx.customer_name = &customer.name;
    ctx.customer_email = customer.email.as_deref().unwrap_or_default();
  }

  println!("{}", templates::render(args.channel, args.kind, &ctx));
  Ok(())
}

/// Look a record up in a cached list; works offline while the cache is fresh.
async fn find_record<T>(
  fetch: &CachedFetch<Vec<T>, Store>,
  matches: impl Fn(&T) -> bool,
) -> Result<T>
where
  T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
  fetch
    .mount()
    .await
    .data
    .unwrap_or_default()
    .into_iter()
    .find(|record| matches(record))
    .ok_or_else(|| eyre!("No matching record in {}", fetch.key()))
}

async fn watch(app: &App, refresh_every: Option<u64>) -> Result<()> {
  let _probe = app.watch_connectivity()?;
  let backend = app.backend()?;

  let customers = backend.customers();
  let itineraries = backend.itineraries();
  let _customers_reconnect = customers.refresh_on_reconnect();
  let _itineraries_reconnect = itineraries.refresh_on_reconnect();

  let mut transitions = app.monitor.subscribe();
  let mut indicator = OfflineIndicator::new(app.monitor.status());
  if let Some(banner) = indicator.banner(Instant::now()) {
    println!("[{}]", banner);
  }

  let mut customers_rx = customers.subscribe();
  let mut itineraries_rx = itineraries.subscribe();
  tokio::join!(customers.mount(), itineraries.mount());

  let mut ticker = refresh_every.map(|secs| tokio::time::interval(Duration::from_secs(secs.max(1))));
  // The first tick completes immediately and mount already fetched.
  if let Some(ticker) = ticker.as_mut() {
    ticker.tick().await;
  }

  let shutdown = tokio::signal::ctrl_c();
  tokio::pin!(shutdown);

  loop {
    tokio::select! {
      _ = &mut shutdown => break,
      Some(status) = transitions.next() => {
        indicator.on_transition(status, Instant::now());
        if let Some(banner) = indicator.banner(Instant::now()) {
          println!("[{}]", banner);
        }
      }
      Ok(()) = customers_rx.changed() => {
        let state = customers_rx.borrow_and_update().clone();
        print_summary("customers", &state);
      }
      Ok(()) = itineraries_rx.changed() => {
        let state = itineraries_rx.borrow_and_update().clone();
        print_summary("itineraries", &state);
      }
      _ = next_tick(&mut ticker) => {
        tokio::join!(customers.refresh(), itineraries.refresh());
      }
    }
  }

  Ok(())
}

async fn next_tick(ticker: &mut Option<Interval>) {
  match ticker {
    Some(ticker) => {
      ticker.tick().await;
    }
    None => std::future::pending().await,
  }
}

fn require_online(app: &App) -> Result<CachedBackend<Store>> {
  if app.monitor.is_offline() {
    return Err(eyre!("This needs a network connection; you're offline"));
  }
  app.backend()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
  serde_json::from_str(&contents).map_err(|e| eyre!("Failed to parse {}: {}", path.display(), e))
}

fn print_status<T>(app: &App, state: &FetchState<T>) {
  if let Some(banner) = OfflineIndicator::new(app.monitor.status()).banner(Instant::now()) {
    println!("[{}]", banner);
  }
  if let Some(line) = freshness(state) {
    println!("{}", line);
  }
}

fn freshness<T>(state: &FetchState<T>) -> Option<String> {
  let updated = state.last_updated?;
  let minutes = (Utc::now() - updated).num_minutes().max(0);
  let age = match minutes {
    0 => "just now".to_string(),
    m if m < 60 => format!("{}m ago", m),
    m => format!("{}h ago", m / 60),
  };
  let source = match state.source {
    DataSource::Network => "network",
    DataSource::Cache => "cache",
    DataSource::Offline => "offline cache",
    DataSource::None => return None,
  };
  Some(format!("Last updated {} ({})", age, source))
}

fn print_summary<T>(label: &str, state: &FetchState<Vec<T>>) {
  let count = state.data.as_ref().map(Vec::len);
  let mut line = match count {
    Some(n) => format!("{}: {}", label, n),
    None if state.loading => format!("{}: loading", label),
    None => format!("{}: no data", label),
  };
  if state.refreshing {
    line.push_str(" (refreshing)");
  }
  if let Some(fresh) = freshness(state) {
    line.push_str(&format!(" - {}", fresh));
  }
  println!("{}", line);
}

fn filter_customers(customers: Vec<Customer>, search: Option<&str>) -> Vec<Customer> {
  match search {
    Some(query) => customers.into_iter().filter(|c| c.matches(query)).collect(),
    None => customers,
  }
}

fn print_customers(customers: &[Customer]) {
  if customers.is_empty() {
    println!("No customers");
    return;
  }
  for c in customers {
    println!(
      "{}  {}  {}  {}",
      c.id,
      c.name,
      c.email.as_deref().unwrap_or("-"),
      c.phone.as_deref().unwrap_or("-")
    );
  }
}

fn print_itineraries(itineraries: &[SavedItinerary]) {
  if itineraries.is_empty() {
    println!("No saved itineraries");
    return;
  }
  for i in itineraries {
    println!(
      "{}  {}  [{}]  ₹{}",
      i.id,
      i.title,
      i.status.as_deref().unwrap_or("saved"),
      templates::format_amount(i.details.total_cost)
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration as ChronoDuration;
  use clap::Parser;

  #[derive(Parser, Debug)]
  struct Cli {
    #[command(subcommand)]
    command: Command,
  }

  fn state(source: DataSource, minutes_ago: Option<i64>) -> FetchState<Vec<u8>> {
    FetchState {
      data: Some(vec![1, 2, 3]),
      loading: false,
      refreshing: false,
      offline: source == DataSource::Offline,
      source,
      last_updated: minutes_ago.map(|m| Utc::now() - ChronoDuration::minutes(m)),
    }
  }

  #[test]
  fn test_freshness_labels() {
    assert_eq!(
      freshness(&state(DataSource::Network, Some(0))).as_deref(),
      Some("Last updated just now (network)")
    );
    assert_eq!(
      freshness(&state(DataSource::Cache, Some(5))).as_deref(),
      Some("Last updated 5m ago (cache)")
    );
    assert_eq!(
      freshness(&state(DataSource::Offline, Some(125))).as_deref(),
      Some("Last updated 2h ago (offline cache)")
    );
    assert_eq!(freshness(&state(DataSource::Cache, None)), None);
  }

  #[test]
  fn test_parse_chat_args() {
    let cli = Cli::try_parse_from([
      "travel-copilot",
      "chat",
      "weekend",
      "in",
      "Goa",
      "--tradeoff",
      "80",
      "--mode",
      "train",
    ])
    .unwrap();
    match cli.command {
      Command::Chat(args) => {
        assert_eq!(args.message.join(" "), "weekend in Goa");
        assert_eq!(args.tradeoff, Some(80));
        assert_eq!(args.mode, Some(TravelMode::Train));
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_customers_search_filters_roster() {
    let cli = Cli::try_parse_from(["travel-copilot", "customers", "--search", "RAO"]).unwrap();
    let search = match cli.command {
      Command::Customers { search } => search,
      other => panic!("unexpected command {:?}", other),
    };

    let roster = vec![
      Customer {
        id: "c1".to_string(),
        name: "Asha Rao".to_string(),
        email: Some("asha@example.com".to_string()),
        phone: None,
        preferences: None,
        notes: None,
        created_at: None,
      },
      Customer {
        id: "c2".to_string(),
        name: "Vikram".to_string(),
        email: None,
        phone: None,
        preferences: None,
        notes: None,
        created_at: None,
      },
    ];

    let found = filter_customers(roster.clone(), search.as_deref());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "c1");
    assert_eq!(filter_customers(roster, None).len(), 2);
  }

  #[test]
  fn test_tradeoff_range_is_enforced() {
    assert!(Cli::try_parse_from(["travel-copilot", "chat", "hi", "--tradeoff", "101"]).is_err());
  }

  #[test]
  fn test_parse_template_and_cache_commands() {
    let cli =
      Cli::try_parse_from(["travel-copilot", "template", "whatsapp", "follow-up", "--customer", "c1"])
        .unwrap();
    assert!(matches!(
      cli.command,
      Command::Template(TemplateArgs {
        channel: Channel::Whatsapp,
        kind: TemplateKind::FollowUp,
        ..
      })
    ));

    let cli = Cli::try_parse_from(["travel-copilot", "cache", "clear"]).unwrap();
    assert!(matches!(cli.command, Command::Cache(CacheCommand::Clear { key: None })));
  }

  #[test]
  fn test_read_json_itinerary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("itinerary.json");
    let itinerary = crate::itinerary::fixtures::sample();
    std::fs::write(&path, serde_json::to_string(&itinerary).unwrap()).unwrap();

    let loaded: Itinerary = read_json(&path).unwrap();
    assert_eq!(loaded, itinerary);
    assert!(read_json::<Itinerary>(&dir.path().join("missing.json")).is_err());
  }
}
