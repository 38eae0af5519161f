use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SheetsError;
use crate::range::A1Range;
use crate::store::{grid, Row, SheetStore, ValueRange};

/// In-process workbook. Each sheet is a dense grid of rows; row `n` lives at index `n - 1`.
///
/// Used for local development and tests. Batched writes are applied under a
/// single write lock.
#[derive(Debug, Default)]
pub struct MemoryWorkbook {
    sheets: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryWorkbook {
    /// Create a workbook containing the given empty sheets.
    pub fn with_sheets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sheets = names
            .into_iter()
            .map(|name| (name.into(), Vec::new()))
            .collect();
        Self {
            sheets: RwLock::new(sheets),
        }
    }

    /// Snapshot of a whole sheet, for assertions.
    pub async fn dump(&self, sheet: &str) -> Option<Vec<Row>> {
        self.sheets.read().await.get(sheet).cloned()
    }
}

fn sheet_mut<'a>(
    sheets: &'a mut HashMap<String, Vec<Row>>,
    name: &str,
) -> Result<&'a mut Vec<Row>, SheetsError> {
    sheets
        .get_mut(name)
        .ok_or_else(|| SheetsError::UnknownSheet(name.to_string()))
}

fn write_at(grid_rows: &mut Vec<Row>, range: &A1Range, values: &[Row]) {
    let first_row = range.first_row() as usize;
    let first_col = range.first_column() as usize;
    let needed = first_row - 1 + values.len();
    if grid_rows.len() < needed {
        grid_rows.resize(needed, Vec::new());
    }
    for (offset, row) in values.iter().enumerate() {
        grid::merge(&mut grid_rows[first_row - 1 + offset], first_col, row);
    }
}

#[async_trait]
impl SheetStore for MemoryWorkbook {
    async fn read(&self, range: &A1Range) -> Result<Vec<Row>, SheetsError> {
        let sheets = self.sheets.read().await;
        let rows = sheets
            .get(&range.sheet)
            .ok_or_else(|| SheetsError::UnknownSheet(range.sheet.clone()))?;

        let first = range.first_row() as usize - 1;
        let last = range
            .last_row()
            .map(|r| r as usize)
            .unwrap_or(rows.len())
            .min(rows.len());
        if first >= last {
            return Ok(Vec::new());
        }
        Ok(grid::extract(range, &rows[first..last]))
    }

    async fn append(&self, range: &A1Range, rows: Vec<Row>) -> Result<(), SheetsError> {
        let mut sheets = self.sheets.write().await;
        let grid_rows = sheet_mut(&mut sheets, &range.sheet)?;

        let used = grid_rows
            .iter()
            .rposition(|row| !grid::is_blank(row))
            .map(|idx| idx + 1)
            .unwrap_or(0);
        grid_rows.truncate(used);

        let first_col = range.first_column() as usize;
        grid_rows.extend(rows.into_iter().map(|row| grid::positioned(first_col, row)));
        Ok(())
    }

    async fn update(&self, range: &A1Range, rows: Vec<Row>) -> Result<(), SheetsError> {
        grid::check_fits(range, &rows)?;
        let mut sheets = self.sheets.write().await;
        let grid_rows = sheet_mut(&mut sheets, &range.sheet)?;
        write_at(grid_rows, range, &rows);
        Ok(())
    }

    async fn batch_update(&self, data: Vec<ValueRange>) -> Result<(), SheetsError> {
        let mut sheets = self.sheets.write().await;

        for entry in &data {
            grid::check_fits(&entry.range, &entry.values)?;
            if !sheets.contains_key(&entry.range.sheet) {
                return Err(SheetsError::UnknownSheet(entry.range.sheet.clone()));
            }
        }

        for entry in &data {
            let grid_rows = sheet_mut(&mut sheets, &entry.range.sheet)?;
            write_at(grid_rows, &entry.range, &entry.values);
        }
        Ok(())
    }

    async fn delete_rows(
        &self,
        sheet: &str,
        first_row: u32,
        count: u32,
    ) -> Result<(), SheetsError> {
        if first_row == 0 {
            return Err(SheetsError::Shape {
                range: format!("{sheet}!{first_row}"),
                reason: "row numbers start at 1".to_string(),
            });
        }
        let mut sheets = self.sheets.write().await;
        let grid_rows = sheet_mut(&mut sheets, sheet)?;

        let start = (first_row as usize - 1).min(grid_rows.len());
        let end = (start + count as usize).min(grid_rows.len());
        grid_rows.drain(start..end);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn range(s: &str) -> A1Range {
        A1Range::parse(s).unwrap()
    }

    #[tokio::test]
    async fn append_then_read_columns() {
        let book = MemoryWorkbook::with_sheets(["Users"]);
        book.append(&range("Users!A:F"), vec![row(&["t1", "a@x.com", "Ana", "", "FALSE", "AR"])])
            .await
            .unwrap();
        book.append(&range("Users!A:F"), vec![row(&["t2", "b@x.com", "Beto"])])
            .await
            .unwrap();

        let all = book.read(&range("Users!A:F")).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1], row(&["t2", "b@x.com", "Beto"]));

        let emails = book.read(&range("Users!B:C")).await.unwrap();
        assert_eq!(emails[0], row(&["a@x.com", "Ana"]));
    }

    #[tokio::test]
    async fn update_single_cell_and_reject_oversized_values() {
        let book = MemoryWorkbook::with_sheets(["Users"]);
        book.append(&range("Users!A:F"), vec![row(&["t1", "a@x.com", "Ana", "", "FALSE"])])
            .await
            .unwrap();

        book.update(&range("Users!E1"), vec![row(&["TRUE"])]).await.unwrap();
        let cells = book.read(&range("Users!E1")).await.unwrap();
        assert_eq!(cells, vec![row(&["TRUE"])]);

        let err = book
            .update(&range("Users!E1"), vec![row(&["TRUE", "extra"])])
            .await
            .unwrap_err();
        assert!(matches!(err, SheetsError::Shape { .. }));
    }

    #[tokio::test]
    async fn delete_rows_shifts_following_rows() {
        let book = MemoryWorkbook::with_sheets(["Activities"]);
        let rows = vec![row(&["1"]), row(&["2"]), row(&["3"])];
        book.append(&range("Activities!A:E"), rows).await.unwrap();

        book.delete_rows("Activities", 2, 1).await.unwrap();
        let left = book.read(&range("Activities!A:A")).await.unwrap();
        assert_eq!(left, vec![row(&["1"]), row(&["3"])]);
    }

    #[tokio::test]
    async fn batch_update_is_all_or_nothing() {
        let book = MemoryWorkbook::with_sheets(["Families"]);
        book.append(&range("Families!A:D"), vec![row(&["f1", "a@x.com", "Bebé", "TRUE"])])
            .await
            .unwrap();

        let err = book
            .batch_update(vec![
                ValueRange::new(range("Families!C1"), vec![row(&["Lola"])]),
                ValueRange::new(range("Missing!C1"), vec![row(&["Lola"])]),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, SheetsError::UnknownSheet(_)));
        let unchanged = book.read(&range("Families!C1")).await.unwrap();
        assert_eq!(unchanged, vec![row(&["Bebé"])]);

        book.batch_update(vec![ValueRange::new(range("Families!C1"), vec![row(&["Lola"])])])
            .await
            .unwrap();
        let renamed = book.read(&range("Families!C1")).await.unwrap();
        assert_eq!(renamed, vec![row(&["Lola"])]);
    }

    #[tokio::test]
    async fn unknown_sheet_is_an_error() {
        let book = MemoryWorkbook::default();
        let err = book.read(&range("Users!A:F")).await.unwrap_err();
        assert!(matches!(err, SheetsError::UnknownSheet(name) if name == "Users"));
    }
}
