use crate::error::Result;
use crate::sheets::SheetOperations;
use tracing::{info, instrument};

#[instrument(name = "Importing rows", skip(sheets))]
pub async fn execute<S>(sheets: &S, range: &str) -> Result<()>
where
    S: SheetOperations + Sync,
{
    let rows = sheets.get_values(range).await?;

    for (i, row) in rows.iter().enumerate() {
        println!("{}", format_row(i, row));
    }

    info!(rows = rows.len(), "Import completed");

    Ok(())
}

fn format_row(index: usize, row: &[String]) -> String {
    format!("row[{}]; [{}]", index, row.join(" "))
}
