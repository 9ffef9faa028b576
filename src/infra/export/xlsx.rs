use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet};

use crate::domain::entities::column::{CellValue, Column, ColumnFormat, RenderTarget};
use crate::usecase::services::export_service::{totals_label, wants_totals_row};
use crate::usecase::services::grid::Grid;

pub const MAX_COL_WIDTH: f64 = 150.0;
const MAX_SHEET_NAME: usize = 30;

/// Sheet names longer than Excel allows are cut to 27 characters plus `...`.
pub fn sanitize_sheet_name(name: &str) -> String {
    if name.chars().count() <= MAX_SHEET_NAME {
        name.to_string()
    } else {
        let head: String = name.chars().take(MAX_SHEET_NAME - 3).collect();
        format!("{head}...")
    }
}

fn excel_serial(value: NaiveDateTime, time_only: bool) -> f64 {
    let seconds = f64::from(value.num_seconds_from_midnight())
        + f64::from(value.nanosecond()) / 1_000_000_000.0;
    let fraction = seconds / 86_400.0;
    if time_only {
        return fraction;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    (value.date() - epoch).num_days() as f64 + fraction
}

struct SheetWriter<'a> {
    sheet: &'a mut Worksheet,
    row: u32,
    widths: HashMap<usize, f64>,
}

impl SheetWriter<'_> {
    fn register_width(&mut self, idx: usize, column: &Column, value: &CellValue) {
        if *value == CellValue::Empty {
            return;
        }
        let width = self.widths.entry(idx).or_insert(0.0);
        *width = width.max(column.xls_width_calc(value));
    }

    fn write_cell(
        &mut self,
        idx: usize,
        column: &Column,
        value: &CellValue,
        format: &Format,
    ) -> Result<()> {
        let col = u16::try_from(idx).context("too many columns for xlsx")?;
        match value {
            CellValue::Empty => {
                self.sheet
                    .write_blank(self.row, col, format)
                    .context("failed to write xlsx cell")?;
            }
            CellValue::Text(text) => {
                self.sheet
                    .write_string_with_format(self.row, col, text, format)
                    .context("failed to write xlsx cell")?;
            }
            CellValue::Number(number) => {
                self.sheet
                    .write_number_with_format(self.row, col, *number, format)
                    .context("failed to write xlsx cell")?;
            }
            CellValue::DateTime(instant) => {
                let time_only = matches!(column.format, ColumnFormat::Time { .. });
                self.sheet
                    .write_number_with_format(self.row, col, excel_serial(*instant, time_only), format)
                    .context("failed to write xlsx cell")?;
            }
        }
        self.register_width(idx, column, value);
        Ok(())
    }

    fn adjust_col_widths(&mut self, count: usize) -> Result<()> {
        for idx in 0..count {
            let width = self.widths.get(&idx).copied().unwrap_or(0.0).min(MAX_COL_WIDTH);
            let col = u16::try_from(idx).context("too many columns for xlsx")?;
            self.sheet
                .set_column_width(col, width + 3.0)
                .context("failed to set xlsx column width")?;
        }
        Ok(())
    }
}

/// Writes every filtered record of `grid` (paging switched off) to one xlsx sheet.
pub fn export_grid_to_xlsx(grid: &mut Grid, target: RenderTarget, xlsx_path: &Path) -> Result<()> {
    grid.set_paging(None, 1);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name(sanitize_sheet_name(&grid.ident()))
        .context("failed to name xlsx sheet")?;
    write_sheet(grid, target, sheet)?;

    workbook
        .save(xlsx_path)
        .with_context(|| format!("failed to save xlsx: {}", xlsx_path.display()))?;
    Ok(())
}

fn write_sheet(grid: &Grid, target: RenderTarget, sheet: &mut Worksheet) -> Result<()> {
    let columns: Vec<&Column> = grid.iter_columns(target).collect();
    let bold = Format::new().set_bold();
    let totals_format = Format::new().set_bold().set_border_top(FormatBorder::Thin);
    let cell_formats: Vec<Format> = columns
        .iter()
        .map(|column| match column.effective_xls_num_format() {
            Some(num_format) => Format::new().set_num_format(num_format),
            None => Format::new(),
        })
        .collect();

    let mut writer = SheetWriter {
        sheet,
        row: 0,
        widths: HashMap::new(),
    };

    for (idx, column) in columns.iter().enumerate() {
        writer.write_cell(idx, column, &CellValue::Text(column.label.clone()), &bold)?;
    }
    writer.row += 1;

    let records = grid.records()?;
    for record in records.iter() {
        for (idx, column) in columns.iter().enumerate() {
            let value = column.render(target, record)?;
            writer.write_cell(idx, column, &value, &cell_formats[idx])?;
        }
        writer.row += 1;
    }

    if wants_totals_row(grid, records.len()) {
        if let Some(totals) = grid.grand_totals()? {
            let label = totals_label(grid.record_count()?);
            let lead = columns
                .iter()
                .take_while(|column| column.has_subtotal.is_none())
                .count();
            if lead > 1 {
                let last = u16::try_from(lead - 1).context("too many columns for xlsx")?;
                writer
                    .sheet
                    .merge_range(writer.row, 0, writer.row, last, &label, &totals_format)
                    .context("failed to merge xlsx totals label")?;
            } else if lead == 1 {
                writer
                    .sheet
                    .write_string_with_format(writer.row, 0, &label, &totals_format)
                    .context("failed to write xlsx totals label")?;
            }
            for (idx, column) in columns.iter().enumerate().skip(lead) {
                let value = if column.has_subtotal.is_some() {
                    column.render(target, totals)?
                } else {
                    CellValue::Empty
                };
                let format = cell_formats[idx]
                    .clone()
                    .set_bold()
                    .set_border_top(FormatBorder::Thin);
                writer.write_cell(idx, column, &value, &format)?;
            }
            writer.row += 1;
        }
    }

    writer.adjust_col_widths(columns.len())
}
