//! Command-line interface for noteflow.
//!
//! Provides commands for running the webhook server and inspecting the
//! resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::adapters::{MessagingClient, OpenAiClient, SmtpMailer};
use crate::config::AppConfig;
use crate::core::{
    Classifier, DigestAggregator, DocumentRenderer, EventRouter, Exporter, IngestPipeline,
};
use crate::server;
use crate::store::TableStoreClient;

/// noteflow - voice-memo chat bot backend
#[derive(Parser, Debug)]
#[command(name = "noteflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (discovered by walking up from the current directory
    /// when not given)
    #[arg(long, global = true, env = "NOTEFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the webhook server
    Serve {
        /// Port to listen on (overrides the config file)
        #[arg(short, long, env = "NOTEFLOW_PORT")]
        port: Option<u16>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = AppConfig::load(self.config.as_deref())?;

        match self.command {
            Commands::Serve { port } => serve(config, port).await,
            Commands::Config => show_config(&config),
        }
    }
}

/// Wire every collaborator and run the webhook server
async fn serve(config: AppConfig, port_override: Option<u16>) -> Result<()> {
    let router = Arc::new(build_router(&config)?);
    let port = port_override.unwrap_or(config.server.port);
    server::serve(router, port).await
}

/// Build the event router with its live collaborators
pub fn build_router(config: &AppConfig) -> Result<EventRouter> {
    let messaging = Arc::new(MessagingClient::new(&config.platform));
    let model = Arc::new(OpenAiClient::new(&config.model));
    let store = Arc::new(TableStoreClient::new(&config.store));
    let mailer = Arc::new(SmtpMailer::new(&config.mail)?);
    let renderer = DocumentRenderer::new(config.export.pdf_font.as_deref())?;

    let classifier = Classifier::new(model.clone());
    let ingest = Arc::new(IngestPipeline::new(
        messaging.clone(),
        model.clone(),
        classifier,
        store.clone(),
        config.bot.staging_dir.clone(),
    ));
    let digests = DigestAggregator::new(store.clone());
    let exporter = Arc::new(Exporter::new(model, mailer, messaging.clone(), renderer));

    Ok(EventRouter::new(
        messaging,
        store,
        ingest,
        digests,
        exporter,
        config.bot.name.clone(),
    ))
}

/// Show the resolved configuration (for debugging)
fn show_config(config: &AppConfig) -> Result<()> {
    println!("noteflow configuration");
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Server:");
    println!("  Port: {}", config.server.port);
    println!();
    println!("Platform:");
    println!("  API base:     {}", config.platform.api_base);
    println!("  Content base: {}", config.platform.content_base);
    println!("  Token:        {}", mask(&config.platform.channel_token));
    println!();
    println!("Model:");
    println!("  API base:            {}", config.model.api_base);
    println!("  Chat model:          {}", config.model.chat_model);
    println!("  Transcription model: {}", config.model.transcription_model);
    println!("  API key:             {}", mask(&config.model.api_key));
    println!();
    println!("Store:");
    println!("  API base:      {}", config.store.api_base);
    println!("  Base id:       {}", config.store.base_id);
    println!("  Profile table: {}", config.store.profile_table);
    println!("  Token:         {}", mask(&config.store.token));
    println!();
    println!("Mail:");
    println!("  SMTP: {}:{}", config.mail.smtp_host, config.mail.smtp_port);
    println!("  User: {}", config.mail.username);
    println!("  From: {}", config.mail.from);
    println!();
    println!("Bot:");
    println!("  Name:        {}", config.bot.name);
    println!("  Staging dir: {}", config.bot.staging_dir.display());
    println!(
        "  PDF font:    {}",
        config
            .export
            .pdf_font
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - exports fall back to plain text)".to_string())
    );

    Ok(())
}

/// Keep the first four characters of a secret, mask the rest.
fn mask(secret: &str) -> String {
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        let head: String = secret.chars().take(4).collect();
        format!("{head}****")
    }
}
