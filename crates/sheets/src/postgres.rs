//! PostgreSQL-backed workbook.
//!
//! Each sheet row is one `sheet_rows` record holding its cells as a JSON
//! array. The `(sheet, row_number)` key is deferrable so row deletions can
//! renumber the tail of a sheet inside one transaction.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};

use crate::error::SheetsError;
use crate::range::A1Range;
use crate::store::{grid, Row, SheetStore, ValueRange};

#[derive(Debug, Clone)]
pub struct PgWorkbook {
    pool: PgPool,
}

impl PgWorkbook {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded migrations.
    pub async fn migrate(&self) -> Result<(), SheetsError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Register sheets so reads and writes against them are accepted.
    pub async fn ensure_sheets(&self, names: &[&str]) -> Result<(), SheetsError> {
        for name in names {
            sqlx::query("INSERT INTO sheets (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(*name)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Lock the sheet for the rest of the transaction, failing when it is unknown.
async fn lock_sheet(tx: &mut Transaction<'_, Postgres>, sheet: &str) -> Result<(), SheetsError> {
    let found: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sheets WHERE name = $1 FOR UPDATE")
            .bind(sheet)
            .fetch_optional(&mut **tx)
            .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(SheetsError::UnknownSheet(sheet.to_string())),
    }
}

async fn write_rows(
    tx: &mut Transaction<'_, Postgres>,
    range: &A1Range,
    values: &[Row],
) -> Result<(), SheetsError> {
    let first_row = range.first_row() as i32;
    let first_col = range.first_column() as usize;

    for (offset, values) in values.iter().enumerate() {
        let row_number = first_row + offset as i32;
        let existing: Option<(Json<Row>,)> = sqlx::query_as(
            "SELECT cells FROM sheet_rows WHERE sheet = $1 AND row_number = $2 FOR UPDATE",
        )
        .bind(&range.sheet)
        .bind(row_number)
        .fetch_optional(&mut **tx)
        .await?;

        match existing {
            Some((Json(mut cells),)) => {
                grid::merge(&mut cells, first_col, values);
                sqlx::query(
                    "UPDATE sheet_rows SET cells = $3, updated_at = now() \
                     WHERE sheet = $1 AND row_number = $2",
                )
                .bind(&range.sheet)
                .bind(row_number)
                .bind(Json(cells))
                .execute(&mut **tx)
                .await?;
            }
            None => {
                let cells = grid::positioned(first_col, values.clone());
                sqlx::query("INSERT INTO sheet_rows (sheet, row_number, cells) VALUES ($1, $2, $3)")
                    .bind(&range.sheet)
                    .bind(row_number)
                    .bind(Json(cells))
                    .execute(&mut **tx)
                    .await?;
            }
        }
    }
    Ok(())
}

#[async_trait]
impl SheetStore for PgWorkbook {
    async fn read(&self, range: &A1Range) -> Result<Vec<Row>, SheetsError> {
        let known: Option<(String,)> = sqlx::query_as("SELECT name FROM sheets WHERE name = $1")
            .bind(&range.sheet)
            .fetch_optional(&self.pool)
            .await?;
        if known.is_none() {
            return Err(SheetsError::UnknownSheet(range.sheet.clone()));
        }

        let first_row = range.first_row() as i32;
        let last_row = range.last_row().map(|r| r as i32);
        let stored: Vec<(i32, Json<Row>)> = sqlx::query_as(
            "SELECT row_number, cells FROM sheet_rows \
             WHERE sheet = $1 AND row_number >= $2 AND ($3::int IS NULL OR row_number <= $3) \
             ORDER BY row_number",
        )
        .bind(&range.sheet)
        .bind(first_row)
        .bind(last_row)
        .fetch_all(&self.pool)
        .await?;

        // Rebuild a dense grid so gaps read back as empty rows.
        let mut dense: Vec<Row> = Vec::new();
        for (row_number, Json(cells)) in stored {
            let index = (row_number - first_row) as usize;
            if dense.len() <= index {
                dense.resize(index + 1, Vec::new());
            }
            dense[index] = cells;
        }
        Ok(grid::extract(range, &dense))
    }

    async fn append(&self, range: &A1Range, rows: Vec<Row>) -> Result<(), SheetsError> {
        let mut tx = self.pool.begin().await?;
        lock_sheet(&mut tx, &range.sheet).await?;

        let used: Vec<(i32, Json<Row>)> = sqlx::query_as(
            "SELECT row_number, cells FROM sheet_rows WHERE sheet = $1 ORDER BY row_number DESC",
        )
        .bind(&range.sheet)
        .fetch_all(&mut *tx)
        .await?;
        let last_used = used
            .iter()
            .find(|(_, Json(cells))| !grid::is_blank(cells))
            .map(|(row_number, _)| *row_number)
            .unwrap_or(0);

        let first_col = range.first_column() as usize;
        for (offset, row) in rows.into_iter().enumerate() {
            let row_number = last_used + 1 + offset as i32;
            sqlx::query(
                "DELETE FROM sheet_rows WHERE sheet = $1 AND row_number = $2",
            )
            .bind(&range.sheet)
            .bind(row_number)
            .execute(&mut *tx)
            .await?;
            sqlx::query("INSERT INTO sheet_rows (sheet, row_number, cells) VALUES ($1, $2, $3)")
                .bind(&range.sheet)
                .bind(row_number)
                .bind(Json(grid::positioned(first_col, row)))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, range: &A1Range, rows: Vec<Row>) -> Result<(), SheetsError> {
        grid::check_fits(range, &rows)?;
        let mut tx = self.pool.begin().await?;
        lock_sheet(&mut tx, &range.sheet).await?;
        write_rows(&mut tx, range, &rows).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn batch_update(&self, data: Vec<ValueRange>) -> Result<(), SheetsError> {
        for entry in &data {
            grid::check_fits(&entry.range, &entry.values)?;
        }

        let mut tx = self.pool.begin().await?;
        for entry in &data {
            lock_sheet(&mut tx, &entry.range.sheet).await?;
            write_rows(&mut tx, &entry.range, &entry.values).await?;
        }
        tx.commit().await?;
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
        let first = first_row as i32;
        let count = count as i32;

        let mut tx = self.pool.begin().await?;
        lock_sheet(&mut tx, sheet).await?;

        sqlx::query("DELETE FROM sheet_rows WHERE sheet = $1 AND row_number >= $2 AND row_number < $3")
            .bind(sheet)
            .bind(first)
            .bind(first + count)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE sheet_rows SET row_number = row_number - $3 \
             WHERE sheet = $1 AND row_number >= $2",
        )
        .bind(sheet)
        .bind(first + count)
        .bind(count)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
