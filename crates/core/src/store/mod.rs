//! Record store adapter: domain operations over the Users, Activities and
//! Families sheets.
//!
//! Every lookup is a full scan of the relevant sheet; rows are addressed by
//! their 1-based position. Rows that do not parse (headers, blanks, foreign
//! data) are skipped.

mod activities;
mod families;
mod users;

use std::sync::Arc;

use esfinteres_sheets::{A1Range, Row, SheetStore, SheetsError};

use crate::error::StoreError;

pub const USERS_SHEET: &str = "Users";
pub const ACTIVITIES_SHEET: &str = "Activities";
pub const FAMILIES_SHEET: &str = "Families";

/// Every sheet the store expects to exist.
pub const SHEETS: [&str; 3] = [USERS_SHEET, ACTIVITIES_SHEET, FAMILIES_SHEET];

/// Column layout of one logical table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Table {
    pub sheet: &'static str,
    pub width: u32,
}

impl Table {
    /// Every column of the table, e.g. `Users!A:F`.
    pub fn all(&self) -> A1Range {
        A1Range::columns(self.sheet, 0, self.width - 1)
    }

    /// One cell of a row.
    pub fn cell(&self, column: u32, row: u32) -> A1Range {
        A1Range::cell(self.sheet, column, row)
    }

    /// A full row, e.g. `Activities!A7:E7`.
    pub fn row(&self, row: u32) -> A1Range {
        A1Range::row_span(self.sheet, 0, self.width - 1, row)
    }
}

/// `Users`: [timestamp, email, name, image, isPremium, country]
pub(crate) mod user_cols {
    pub const TIMESTAMP: u32 = 0;
    pub const EMAIL: u32 = 1;
    pub const NAME: u32 = 2;
    pub const IMAGE: u32 = 3;
    pub const PREMIUM: u32 = 4;
    pub const COUNTRY: u32 = 5;
}

/// `Activities`: [timestamp, ownerEmail, babyName, activityType, detailsEncoded]
pub(crate) mod activity_cols {
    pub const TIMESTAMP: u32 = 0;
    pub const OWNER: u32 = 1;
    pub const BABY_NAME: u32 = 2;
    pub const TYPE: u32 = 3;
    pub const DETAILS: u32 = 4;
}

/// `Families`: [familyId, memberEmail, babyName, isOwner]
pub(crate) mod family_cols {
    pub const FAMILY_ID: u32 = 0;
    pub const MEMBER: u32 = 1;
    pub const BABY_NAME: u32 = 2;
    pub const OWNER: u32 = 3;
}

pub(crate) const USERS: Table = Table {
    sheet: USERS_SHEET,
    width: 6,
};

pub(crate) const ACTIVITIES: Table = Table {
    sheet: ACTIVITIES_SHEET,
    width: 5,
};

pub(crate) const FAMILIES: Table = Table {
    sheet: FAMILIES_SHEET,
    width: 4,
};

/// Cell text at `column`, empty when the row is shorter.
pub(crate) fn cell(row: &Row, column: u32) -> &str {
    row.get(column as usize).map(String::as_str).unwrap_or("")
}

pub(crate) fn format_bool(value: bool) -> String {
    let text = if value { "TRUE" } else { "FALSE" };
    text.to_string()
}

/// `TRUE`, `true` and `1` are truthy; anything else, including empty, is false.
pub(crate) fn parse_bool(raw: &str) -> bool {
    let raw = raw.trim();
    raw.eq_ignore_ascii_case("true") || raw == "1"
}

/// Log a backend failure at the adapter boundary and wrap it.
pub(crate) fn backend(operation: &'static str) -> impl FnOnce(SheetsError) -> StoreError {
    move |err| {
        tracing::error!(operation, error = %err, "backing store call failed");
        StoreError::Backend(err)
    }
}

/// Domain-level access to the backing sheets.
#[derive(Clone)]
pub struct RecordStore {
    sheets: Arc<dyn SheetStore>,
}

impl RecordStore {
    pub fn new(sheets: Arc<dyn SheetStore>) -> Self {
        Self { sheets }
    }

    pub fn backend_name(&self) -> &'static str {
        self.sheets.backend_name()
    }

    /// Reachability check: reads the first users row.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.sheets
            .read(&USERS.row(1))
            .await
            .map(|_| ())
            .map_err(backend("ping"))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_cells_round_trip() {
        assert_eq!(format_bool(true), "TRUE");
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("FALSE"));
        assert!(!parse_bool(""));
        assert!(!parse_bool("no"));
    }

    #[test]
    fn table_ranges() {
        assert_eq!(USERS.all().to_string(), "Users!A:F");
        assert_eq!(USERS.cell(user_cols::PREMIUM, 5).to_string(), "Users!E5");
        assert_eq!(ACTIVITIES.row(7).to_string(), "Activities!A7:E7");
        assert_eq!(FAMILIES.all().to_string(), "Families!A:D");
    }
}
