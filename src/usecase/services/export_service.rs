use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::Rng;
use tracing::debug;

use crate::domain::entities::column::RenderTarget;
use crate::domain::entities::settings::{ExportFormat, Subtotals};
use crate::infra::export::csv::export_grid_to_csv;
use crate::infra::export::xlsx::export_grid_to_xlsx;
use crate::usecase::services::grid::{Grid, GridError};

pub fn totals_label(record_count: i64) -> String {
    if record_count == 1 {
        "Totals (1 record):".to_string()
    } else {
        format!("Totals ({record_count} records):")
    }
}

pub fn wants_totals_row(grid: &Grid, record_count: usize) -> bool {
    record_count > 0 && grid.settings().subtotals != Subtotals::None && grid.has_subtotals()
}

pub struct ExportService {
    out_dir: PathBuf,
}

impl ExportService {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    /// `<ident>_<6 random digits>.<ext>` inside the output directory.
    pub fn file_path(&self, grid: &Grid, format: ExportFormat) -> PathBuf {
        let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
        self.out_dir.join(format!(
            "{}_{suffix:06}.{}",
            grid.ident(),
            format.extension()
        ))
    }

    /// Exports in the format the request selected through `export_to`.
    pub fn export(&self, grid: &mut Grid) -> Result<PathBuf> {
        let format = grid.export_to().ok_or(GridError::NoExportFormat)?;
        let path = self.file_path(grid, format);
        self.export_to_path(grid, format, &path)?;
        Ok(path)
    }

    pub fn export_to_path(&self, grid: &mut Grid, format: ExportFormat, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create export dir: {}", parent.display()))?;
        }
        debug!("exporting {} as {}", grid, format.key());
        match format {
            ExportFormat::Csv => export_grid_to_csv(grid, path),
            ExportFormat::Xls | ExportFormat::Xlsx => {
                export_grid_to_xlsx(grid, RenderTarget::from(format), path)
            }
        }
    }
}
