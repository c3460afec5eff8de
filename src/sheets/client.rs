use super::{Rows, SheetOperations};
use crate::auth;
use crate::config::GoogleConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use google_sheets4::api::{ClearValuesRequest, Scope, Sheets, ValueRange};
use google_sheets4::common::GetToken;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use serde_json::Value;
use tracing::{info, instrument};

// Matches the scope requested during authorization
const AUTH_SCOPE: Scope = Scope::Spreadsheet;

pub struct SheetsClient {
    hub: Sheets<HttpsConnector<HttpConnector>>,
    spreadsheet_id: String,
}

impl SheetsClient {
    /// Authorize (from cache or interactively) and connect to a spreadsheet
    pub async fn connect(config: &GoogleConfig, spreadsheet_id: &str) -> Result<Self> {
        let token_source = auth::authorize(config).await?;
        Self::new(token_source, spreadsheet_id)
    }

    pub fn new<A>(auth: A, spreadsheet_id: &str) -> Result<Self>
    where
        A: GetToken + 'static,
    {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| AppError::Sheets(format!("Failed to load native root certificates: {}", e)))?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector);

        Ok(Self {
            hub: Sheets::new(client, auth),
            spreadsheet_id: spreadsheet_id.to_string(),
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }
}

#[async_trait]
impl SheetOperations for SheetsClient {
    #[instrument(name = "Reading values", skip(self))]
    async fn get_values(&self, range: &str) -> Result<Rows> {
        let (_, response) = self
            .hub
            .spreadsheets()
            .values_get(&self.spreadsheet_id, range)
            .major_dimension("ROWS")
            .add_scope(AUTH_SCOPE)
            .doit()
            .await
            .map_err(|e| {
                AppError::Sheets(format!("Unable to retrieve data from sheet: {}", e))
            })?;

        Ok(rows_from_values(response.values.unwrap_or_default()))
    }

    #[instrument(name = "Clearing values", skip(self))]
    async fn clear_values(&self, range: &str) -> Result<()> {
        let (_, response) = self
            .hub
            .spreadsheets()
            .values_clear(ClearValuesRequest::default(), &self.spreadsheet_id, range)
            .add_scope(AUTH_SCOPE)
            .doit()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to clear sheet: {}", e)))?;

        info!(cleared_range = ?response.cleared_range, "Clear response");

        Ok(())
    }

    #[instrument(name = "Updating values", skip(self, rows), fields(rows = rows.len()))]
    async fn update_values(&self, range: &str, rows: Rows) -> Result<()> {
        let value_range = ValueRange {
            major_dimension: Some("ROWS".to_string()),
            range: Some(range.to_string()),
            values: Some(rows_to_values(rows)),
        };

        let (_, response) = self
            .hub
            .spreadsheets()
            .values_update(value_range, &self.spreadsheet_id, range)
            .value_input_option("RAW")
            .add_scope(AUTH_SCOPE)
            .doit()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to update sheet: {}", e)))?;

        info!(
            updated_range = ?response.updated_range,
            updated_rows = ?response.updated_rows,
            updated_cells = ?response.updated_cells,
            "Update response"
        );

        Ok(())
    }
}

fn cell_to_string(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn rows_from_values(values: Vec<Vec<Value>>) -> Rows {
    values
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_string).collect())
        .collect()
}

fn rows_to_values(rows: Rows) -> Vec<Vec<Value>> {
    rows.into_iter()
        .map(|row| row.into_iter().map(Value::String).collect())
        .collect()
}
