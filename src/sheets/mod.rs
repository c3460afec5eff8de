mod client;

pub use client::SheetsClient;

use crate::error::Result;
use async_trait::async_trait;

/// Rows of cell values, outer vector in row order
pub type Rows = Vec<Vec<String>>;

#[async_trait]
pub trait SheetOperations {
    async fn get_values(&self, range: &str) -> Result<Rows>;

    async fn clear_values(&self, range: &str) -> Result<()>;

    async fn update_values(&self, range: &str, rows: Rows) -> Result<()>;
}
