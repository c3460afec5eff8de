use crate::error::Result;
use crate::sheets::{Rows, SheetOperations};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Rows written when no input file is given
fn sample_rows() -> Rows {
    vec![
        vec!["a1".to_string(), "b1".to_string()],
        vec!["a2".to_string(), "b2".to_string()],
    ]
}

pub fn load_rows(input: Option<&Path>) -> Result<Rows> {
    let Some(path) = input else {
        debug!("No input file, exporting sample rows");
        return Ok(sample_rows());
    };

    let file = File::open(path)?;
    read_csv(file)
}

fn read_csv<R: Read>(reader: R) -> Result<Rows> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(rows)
}

/// Replace the contents of `range` with `rows`
#[instrument(name = "Exporting rows", skip(sheets, rows), fields(rows = rows.len()))]
pub async fn execute<S>(sheets: &S, range: &str, rows: Rows) -> Result<()>
where
    S: SheetOperations + Sync,
{
    sheets.clear_values(range).await?;
    sheets.update_values(range, rows).await?;

    info!("Export completed");

    Ok(())
}
