mod export;
mod import;

use crate::auth::TokenStore;
use crate::config::Config;
use crate::error::Result;
use crate::sheets::SheetsClient;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "googlesheets")]
#[command(about = "Import rows from or export rows to a Google Sheets spreadsheet", long_about = None)]
#[command(version)]
#[command(after_help = "Long flags take two dashes (--id, --mode); -i and -m are the short forms.")]
pub struct Cli {
    /// Whether to read rows from the sheet or write rows to it
    #[arg(short, long, value_enum, default_value_t = Mode::Import)]
    pub mode: Mode,

    /// Google spreadsheet ID
    #[arg(short, long, value_parser = parse_spreadsheet_id)]
    pub id: String,

    /// A1 notation range to read or write
    #[arg(long)]
    pub range: Option<String>,

    /// Path to the OAuth client secret JSON file
    #[arg(long)]
    pub client_secret: Option<PathBuf>,

    /// Name of the token cache file under ~/.google_oauth_credentials
    #[arg(long)]
    pub cache_file: Option<String>,

    /// CSV file with the rows to export (no header row)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Delete the cached token and authorize again
    #[arg(long)]
    pub reset_auth: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Import,
    Export,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        let config = self.apply_overrides(Config::load()?);

        if self.reset_auth {
            TokenStore::new(&config.google.cache_file_name)?.clear()?;
        }

        let client = SheetsClient::connect(&config.google, &self.id).await?;
        info!(spreadsheet_id = client.spreadsheet_id(), mode = ?self.mode, "Connected");

        match self.mode {
            Mode::Import => {
                if self.input.is_some() {
                    warn!("--input is ignored in import mode");
                }
                import::execute(&client, &config.sheet.range).await
            }
            Mode::Export => {
                let rows = export::load_rows(self.input.as_deref())?;
                export::execute(&client, &config.sheet.range, rows).await
            }
        }
    }

    /// Flags take precedence over the config file
    fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(range) = &self.range {
            config.sheet.range = range.clone();
        }
        if let Some(client_secret) = &self.client_secret {
            config.google.client_secret_file = client_secret.clone();
        }
        if let Some(cache_file) = &self.cache_file {
            config.google.cache_file_name = cache_file.clone();
        }
        config
    }
}

fn parse_spreadsheet_id(value: &str) -> std::result::Result<String, String> {
    match value.is_empty() {
        true => Err("please set spread sheet id".to_string()),
        false => Ok(value.to_string()),
    }
}
