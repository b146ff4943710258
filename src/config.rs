use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chat::{ChatSettings, TravelMode};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  pub gateway: GatewayConfig,
  /// Name used to sign customer messages
  pub agent_name: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub connectivity: ConnectivityConfig,
  #[serde(default)]
  pub chat: ChatConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  pub url: String,
  /// Id of the signed-in agent; every record query is scoped to it
  pub agent_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
  /// Chat completions endpoint
  pub url: String,
  pub model: String,
  #[serde(default = "default_temperature")]
  pub temperature: f32,
  #[serde(default = "default_max_tokens")]
  pub max_tokens: u32,
}

fn default_temperature() -> f32 {
  0.7
}

fn default_max_tokens() -> u32 {
  2000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Disable to never read or write the local cache
  pub enabled: bool,
  /// Database file (defaults to $XDG_DATA_HOME/travel-copilot/cache.db)
  pub path: Option<PathBuf>,
  /// Key prefix for cache entries
  pub namespace: Option<String>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
      namespace: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
  /// Seconds between reachability probes while watching
  pub probe_interval_secs: u64,
  /// Seconds before a probe counts as failed
  pub probe_timeout_secs: u64,
}

impl Default for ConnectivityConfig {
  fn default() -> Self {
    Self {
      probe_interval_secs: 15,
      probe_timeout_secs: 5,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatConfig {
  pub language: Option<String>,
  /// 0 = budget focused, 100 = comfort focused
  pub tradeoff: Option<u8>,
  pub travel_mode: Option<TravelMode>,
}

impl ChatConfig {
  pub fn settings(&self) -> ChatSettings {
    ChatSettings {
      language: self.language.clone(),
      tradeoff: self.tradeoff,
      travel_mode: self.travel_mode,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Also write logs to this file
  pub file: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./travel-copilot.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/travel-copilot/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/travel-copilot/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("travel-copilot.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("travel-copilot").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if let Some(tradeoff) = config.chat.tradeoff {
      if tradeoff > 100 {
        return Err(eyre!("chat.tradeoff must be between 0 and 100, got {}", tradeoff));
      }
    }
    Ok(config)
  }

  /// Get the backend api key from environment variables.
  ///
  /// Checks TRAVEL_COPILOT_API_KEY.
  pub fn get_api_key() -> Result<String> {
    std::env::var("TRAVEL_COPILOT_API_KEY")
      .map_err(|_| eyre!("Backend api key not found. Set TRAVEL_COPILOT_API_KEY environment variable."))
  }

  /// Get the agent's session token from environment variables.
  ///
  /// Checks TRAVEL_COPILOT_ACCESS_TOKEN.
  pub fn get_access_token() -> Result<String> {
    std::env::var("TRAVEL_COPILOT_ACCESS_TOKEN").map_err(|_| {
      eyre!("Access token not found. Set TRAVEL_COPILOT_ACCESS_TOKEN environment variable.")
    })
  }

  /// Get the model gateway key from environment variables.
  ///
  /// Checks TRAVEL_COPILOT_GATEWAY_KEY first, then AI_GATEWAY_API_KEY as fallback.
  pub fn get_gateway_key() -> Result<String> {
    std::env::var("TRAVEL_COPILOT_GATEWAY_KEY")
      .or_else(|_| std::env::var("AI_GATEWAY_API_KEY"))
      .map_err(|_| {
        eyre!(
          "Gateway api key not found. Set TRAVEL_COPILOT_GATEWAY_KEY or AI_GATEWAY_API_KEY environment variable."
        )
      })
  }
}
