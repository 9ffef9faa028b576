use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::entities::column::{Column, RenderTarget};
use crate::usecase::services::export_service::{totals_label, wants_totals_row};
use crate::usecase::services::grid::Grid;

/// Writes every filtered record of `grid` (paging switched off) as CSV.
pub fn export_grid_to_csv(grid: &mut Grid, csv_path: &Path) -> Result<()> {
    grid.set_paging(None, 1);

    let columns: Vec<&Column> = grid.iter_columns(RenderTarget::Csv).collect();
    let mut writer = csv::Writer::from_path(csv_path)
        .with_context(|| format!("failed to create csv: {}", csv_path.display()))?;

    writer
        .write_record(columns.iter().map(|column| column.label.as_str()))
        .context("failed to write csv headings")?;

    let records = grid.records()?;
    for record in records.iter() {
        let row = columns
            .iter()
            .map(|column| -> Result<String> {
                Ok(column.render(RenderTarget::Csv, record)?.as_text())
            })
            .collect::<Result<Vec<String>>>()?;
        writer
            .write_record(&row)
            .context("failed to write csv record")?;
    }

    if wants_totals_row(grid, records.len()) {
        if let Some(totals) = grid.grand_totals()? {
            let label = totals_label(grid.record_count()?);
            let mut labeled = false;
            let mut row = Vec::with_capacity(columns.len());
            for column in &columns {
                if column.has_subtotal.is_some() {
                    row.push(column.render(RenderTarget::Csv, totals)?.as_text());
                } else if !labeled {
                    row.push(label.clone());
                    labeled = true;
                } else {
                    row.push(String::new());
                }
            }
            writer
                .write_record(&row)
                .context("failed to write csv totals")?;
        }
    }

    writer.flush().context("failed to flush csv")?;
    Ok(())
}
