use async_trait::async_trait;

use crate::error::SheetsError;
use crate::range::A1Range;

/// One row of cell values. Trailing empty cells may be omitted by backends.
pub type Row = Vec<String>;

/// Values destined for one range of a batched write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRange {
    pub range: A1Range,
    pub values: Vec<Row>,
}

impl ValueRange {
    pub fn new(range: A1Range, values: Vec<Row>) -> Self {
        Self { range, values }
    }
}

/// Port over a spreadsheet-like row store addressed with A1 ranges.
///
/// Row numbers are 1-based. Reads return rows starting at the range's first
/// row, so index `i` of the result is row `range.first_row() + i`. Trailing
/// empty rows are not returned.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Read the values inside `range`.
    async fn read(&self, range: &A1Range) -> Result<Vec<Row>, SheetsError>;

    /// Append rows after the last non-empty row of the sheet, starting at the
    /// range's first column.
    async fn append(&self, range: &A1Range, rows: Vec<Row>) -> Result<(), SheetsError>;

    /// Overwrite cells starting at the range's top-left corner.
    async fn update(&self, range: &A1Range, rows: Vec<Row>) -> Result<(), SheetsError>;

    /// Apply several updates as one unit: either every range is written or none is.
    async fn batch_update(&self, data: Vec<ValueRange>) -> Result<(), SheetsError>;

    /// Delete `count` rows starting at 1-based `first_row`, shifting later rows up.
    async fn delete_rows(&self, sheet: &str, first_row: u32, count: u32)
        -> Result<(), SheetsError>;

    /// Short backend name for health reporting.
    fn backend_name(&self) -> &'static str;
}

/// Grid helpers shared by the backends that hold rows themselves.
pub(crate) mod grid {
    use super::Row;
    use crate::error::SheetsError;
    use crate::range::A1Range;

    /// Cut the columns of `range` out of `rows`, where `rows[0]` is the range's first row.
    pub fn extract(range: &A1Range, rows: &[Row]) -> Vec<Row> {
        let first_col = range.first_column() as usize;
        let mut out: Vec<Row> = rows
            .iter()
            .map(|row| {
                let end = match range.last_column() {
                    Some(last) => (last as usize + 1).min(row.len()),
                    None => row.len(),
                };
                let mut cells: Row = if first_col < end {
                    row[first_col..end].to_vec()
                } else {
                    Vec::new()
                };
                trim_trailing(&mut cells);
                cells
            })
            .collect();

        while out.last().is_some_and(|row| row.is_empty()) {
            out.pop();
        }
        out
    }

    /// Verify `values` fits inside a bounded `range`.
    pub fn check_fits(range: &A1Range, values: &[Row]) -> Result<(), SheetsError> {
        if let Some(height) = range.height() {
            if values.len() > height {
                return Err(SheetsError::Shape {
                    range: range.to_string(),
                    reason: format!("{} rows for a range of {height}", values.len()),
                });
            }
        }
        if let Some(width) = range.width() {
            if let Some(row) = values.iter().find(|row| row.len() > width) {
                return Err(SheetsError::Shape {
                    range: range.to_string(),
                    reason: format!("{} columns for a range of {width}", row.len()),
                });
            }
        }
        Ok(())
    }

    /// Overlay `values` onto `existing`, starting at column `first_col`.
    pub fn merge(existing: &mut Row, first_col: usize, values: &[String]) {
        let needed = first_col + values.len();
        if existing.len() < needed {
            existing.resize(needed, String::new());
        }
        for (offset, value) in values.iter().enumerate() {
            existing[first_col + offset] = value.clone();
        }
    }

    /// A row positioned at `first_col`, left-padded with empty cells.
    pub fn positioned(first_col: usize, values: Row) -> Row {
        let mut row = vec![String::new(); first_col];
        row.extend(values);
        row
    }

    pub fn is_blank(row: &Row) -> bool {
        row.iter().all(|cell| cell.is_empty())
    }

    fn trim_trailing(cells: &mut Row) {
        while cells.last().is_some_and(|cell| cell.is_empty()) {
            cells.pop();
        }
    }
}
