//! Configuration for the noteflow service.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (NOTEFLOW_CHANNEL_TOKEN, NOTEFLOW_OPENAI_KEY, ...)
//! 2. Config file (.noteflow/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .noteflow/config.yaml
//! - Paths in the config file are relative to the config file's project root

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 44360;

const DEFAULT_PLATFORM_API: &str = "https://api.line.me";
const DEFAULT_PLATFORM_CONTENT: &str = "https://api-data.line.me";
const DEFAULT_MODEL_API: &str = "https://api.openai.com";
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
const DEFAULT_STORE_API: &str = "https://api.airtable.com";
const DEFAULT_PROFILE_TABLE: &str = "profiles";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_BOT_NAME: &str = "noteflow";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub platform: PlatformSection,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub mail: MailSection,
    #[serde(default)]
    pub bot: BotSection,
    #[serde(default)]
    pub export: ExportSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformSection {
    pub channel_token: Option<String>,
    pub api_base: Option<String>,
    pub content_base: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelSection {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub chat_model: Option<String>,
    pub transcription_model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSection {
    pub token: Option<String>,
    pub base_id: Option<String>,
    pub api_base: Option<String>,
    pub profile_table: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailSection {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotSection {
    pub name: Option<String>,
    pub staging_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportSection {
    pub pdf_font: Option<String>,
}

/// Resolved configuration with every default applied.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub platform: PlatformConfig,
    pub model: ModelConfig,
    pub store: StoreConfig,
    pub mail: MailConfig,
    pub bot: BotConfig,
    pub export: ExportConfig,
    /// Path to the config file the values came from (if one was found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Messaging platform credentials and endpoints.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub channel_token: String,
    /// Messaging API host
    pub api_base: String,
    /// Content download host (a separate host on this platform)
    pub content_base: String,
}

/// Language-model service credentials and model names.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub api_base: String,
    pub chat_model: String,
    pub transcription_model: String,
}

/// Remote table store credentials.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub token: String,
    pub base_id: String,
    pub api_base: String,
    /// Table holding user mail registrations
    pub profile_table: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Name the bot introduces itself with
    pub name: String,
    /// Where downloaded audio is staged
    pub staging_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// TTF font for PDF rendering; without it exports fall back to text
    pub pdf_font: Option<PathBuf>,
}

/// Environment overrides, captured once so resolution stays testable.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub channel_token: Option<String>,
    pub model_key: Option<String>,
    pub store_token: Option<String>,
    pub store_base: Option<String>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub bot_name: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            channel_token: env_var("NOTEFLOW_CHANNEL_TOKEN"),
            model_key: env_var("NOTEFLOW_OPENAI_KEY"),
            store_token: env_var("NOTEFLOW_STORE_TOKEN"),
            store_base: env_var("NOTEFLOW_STORE_BASE"),
            smtp_user: env_var("NOTEFLOW_SMTP_USER"),
            smtp_password: env_var("NOTEFLOW_SMTP_PASSWORD"),
            bot_name: env_var("NOTEFLOW_BOT_NAME"),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

impl AppConfig {
    /// Load configuration from all sources. An explicit path skips
    /// discovery and must exist; without one a missing file just means
    /// defaults plus environment.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let config_path = match explicit_path {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(),
        };

        let (file, base_dir) = match &config_path {
            Some(path) => {
                let file = load_config_file(path)?;
                // Base directory is the parent of .noteflow/ (the project root)
                let base = path
                    .parent()
                    .and_then(|p| p.parent())
                    .unwrap_or(Path::new("."))
                    .to_path_buf();
                (file, base)
            }
            None => (ConfigFile::default(), PathBuf::from(".")),
        };

        let mut config = resolve(file, &base_dir, EnvOverrides::from_env())?;
        config.config_file = config_path;
        Ok(config)
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".noteflow").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Apply defaults and environment overrides to a parsed config file.
fn resolve(file: ConfigFile, base_dir: &Path, env: EnvOverrides) -> Result<AppConfig> {
    let channel_token = env
        .channel_token
        .or(file.platform.channel_token)
        .context("Missing channel token (set NOTEFLOW_CHANNEL_TOKEN or platform.channel_token)")?;
    let api_key = env
        .model_key
        .or(file.model.api_key)
        .context("Missing model API key (set NOTEFLOW_OPENAI_KEY or model.api_key)")?;
    let store_token = env
        .store_token
        .or(file.store.token)
        .context("Missing store token (set NOTEFLOW_STORE_TOKEN or store.token)")?;
    let base_id = env
        .store_base
        .or(file.store.base_id)
        .context("Missing store base id (set NOTEFLOW_STORE_BASE or store.base_id)")?;

    let smtp_host = file.mail.smtp_host.context("Missing mail.smtp_host")?;
    let username = env
        .smtp_user
        .or(file.mail.username)
        .context("Missing mail username (set NOTEFLOW_SMTP_USER or mail.username)")?;
    let password = env
        .smtp_password
        .or(file.mail.password)
        .context("Missing mail password (set NOTEFLOW_SMTP_PASSWORD or mail.password)")?;
    let from = file.mail.from.unwrap_or_else(|| username.clone());

    let staging_dir = match file.bot.staging_dir {
        Some(ref path) => resolve_path(base_dir, path),
        None => default_staging_dir()?,
    };

    let pdf_font = file
        .export
        .pdf_font
        .map(|path| resolve_path(base_dir, &path));

    Ok(AppConfig {
        server: ServerConfig {
            port: file.server.port.unwrap_or(DEFAULT_PORT),
        },
        platform: PlatformConfig {
            channel_token,
            api_base: file
                .platform
                .api_base
                .unwrap_or_else(|| DEFAULT_PLATFORM_API.to_string()),
            content_base: file
                .platform
                .content_base
                .unwrap_or_else(|| DEFAULT_PLATFORM_CONTENT.to_string()),
        },
        model: ModelConfig {
            api_key,
            api_base: file
                .model
                .api_base
                .unwrap_or_else(|| DEFAULT_MODEL_API.to_string()),
            chat_model: file
                .model
                .chat_model
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            transcription_model: file
                .model
                .transcription_model
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
        },
        store: StoreConfig {
            token: store_token,
            base_id,
            api_base: file
                .store
                .api_base
                .unwrap_or_else(|| DEFAULT_STORE_API.to_string()),
            profile_table: file
                .store
                .profile_table
                .unwrap_or_else(|| DEFAULT_PROFILE_TABLE.to_string()),
        },
        mail: MailConfig {
            smtp_host,
            smtp_port: file.mail.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
            username,
            password,
            from,
        },
        bot: BotConfig {
            name: env
                .bot_name
                .or(file.bot.name)
                .unwrap_or_else(|| DEFAULT_BOT_NAME.to_string()),
            staging_dir,
        },
        export: ExportConfig { pdf_font },
        config_file: None,
    })
}

/// Default staging directory under the user's home.
fn default_staging_dir() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".noteflow")
        .join("staging"))
}
