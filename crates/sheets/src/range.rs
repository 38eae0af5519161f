use std::fmt;

/// A cell coordinate inside a sheet.
///
/// Columns are 0-based (`A` = 0), rows are 1-based as in the spreadsheet UI.
/// Either half may be absent: `A` addresses a whole column, `5` a whole row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellRef {
    pub column: Option<u32>,
    pub row: Option<u32>,
}

/// A parsed A1-notation range such as `Users!A:F`, `Users!E5` or `Activities!A7:E7`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    pub start: CellRef,
    pub end: CellRef,
}

/// Range parse error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("empty range")]
    Empty,
    #[error("missing sheet name in '{0}'")]
    MissingSheet(String),
    #[error("unterminated quoted sheet name in '{0}'")]
    UnterminatedQuote(String),
    #[error("invalid cell reference '{0}'")]
    InvalidCell(String),
    #[error("range end precedes start in '{0}'")]
    Inverted(String),
}

impl A1Range {
    /// Parse an A1-notation range. A bare sheet name addresses the whole sheet.
    pub fn parse(input: &str) -> Result<Self, RangeError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RangeError::Empty);
        }

        let (sheet, cells) = split_sheet(input)?;
        if sheet.is_empty() {
            return Err(RangeError::MissingSheet(input.to_string()));
        }

        let (start, end) = match cells {
            None => (CellRef::default(), CellRef::default()),
            Some(cells) => match cells.split_once(':') {
                Some((first, last)) => (parse_cell(first)?, parse_cell(last)?),
                None => {
                    let cell = parse_cell(cells)?;
                    (cell, cell)
                }
            },
        };

        let range = Self { sheet, start, end };
        if range.is_inverted() {
            return Err(RangeError::Inverted(input.to_string()));
        }
        Ok(range)
    }

    /// Whole columns, e.g. `Users!A:F`.
    pub fn columns(sheet: &str, first: u32, last: u32) -> Self {
        Self {
            sheet: sheet.to_string(),
            start: CellRef { column: Some(first), row: None },
            end: CellRef { column: Some(last), row: None },
        }
    }

    /// A single cell, e.g. `Users!E5`.
    pub fn cell(sheet: &str, column: u32, row: u32) -> Self {
        let cell = CellRef { column: Some(column), row: Some(row) };
        Self {
            sheet: sheet.to_string(),
            start: cell,
            end: cell,
        }
    }

    /// A horizontal span on one row, e.g. `Activities!A7:E7`.
    pub fn row_span(sheet: &str, first: u32, last: u32, row: u32) -> Self {
        Self {
            sheet: sheet.to_string(),
            start: CellRef { column: Some(first), row: Some(row) },
            end: CellRef { column: Some(last), row: Some(row) },
        }
    }

    pub fn first_column(&self) -> u32 {
        self.start.column.unwrap_or(0)
    }

    pub fn last_column(&self) -> Option<u32> {
        self.end.column
    }

    pub fn first_row(&self) -> u32 {
        self.start.row.unwrap_or(1)
    }

    pub fn last_row(&self) -> Option<u32> {
        self.end.row
    }

    /// Number of columns covered, when bounded.
    pub fn width(&self) -> Option<usize> {
        self.last_column()
            .map(|last| (last - self.first_column() + 1) as usize)
    }

    /// Number of rows covered, when bounded.
    pub fn height(&self) -> Option<usize> {
        self.last_row().map(|last| (last - self.first_row() + 1) as usize)
    }

    fn is_inverted(&self) -> bool {
        let columns = matches!(
            (self.start.column, self.end.column),
            (Some(a), Some(b)) if a > b
        );
        let rows = matches!((self.start.row, self.end.row), (Some(a), Some(b)) if a > b);
        columns || rows
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if needs_quotes(&self.sheet) {
            write!(f, "'{}'", self.sheet.replace('\'', "''"))?;
        } else {
            write!(f, "{}", self.sheet)?;
        }

        if self.start == CellRef::default() && self.end == CellRef::default() {
            return Ok(());
        }

        write!(f, "!{}", format_cell(&self.start))?;
        if self.end != self.start {
            write!(f, ":{}", format_cell(&self.end))?;
        }
        Ok(())
    }
}

impl std::str::FromStr for A1Range {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Convert a 0-based column index into its letters (`0` → `A`, `26` → `AA`).
pub fn column_letters(index: u32) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Convert column letters into a 0-based index (`A` → `0`). Case-insensitive.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut n: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}

fn split_sheet(input: &str) -> Result<(String, Option<&str>), RangeError> {
    if let Some(rest) = input.strip_prefix('\'') {
        // Quoted sheet name; '' escapes a literal quote.
        let chars: Vec<char> = rest.chars().collect();
        let mut name = String::new();
        let mut pos = 0;
        loop {
            match chars.get(pos) {
                None => return Err(RangeError::UnterminatedQuote(input.to_string())),
                Some('\'') if chars.get(pos + 1) == Some(&'\'') => {
                    name.push('\'');
                    pos += 2;
                }
                Some('\'') => {
                    pos += 1;
                    break;
                }
                Some(&ch) => {
                    name.push(ch);
                    pos += 1;
                }
            }
        }
        let tail: String = chars[pos..].iter().collect();
        let consumed = rest.len() - tail.len();
        let after = &rest[consumed..];
        return match after.strip_prefix('!') {
            Some(cells) => Ok((name, Some(cells))),
            None if after.is_empty() => Ok((name, None)),
            None => Err(RangeError::InvalidCell(after.to_string())),
        };
    }

    match input.rsplit_once('!') {
        Some((sheet, cells)) => Ok((sheet.to_string(), Some(cells))),
        None => Ok((input.to_string(), None)),
    }
}

fn parse_cell(input: &str) -> Result<CellRef, RangeError> {
    let letters: String = input.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let digits = &input[letters.len()..];

    if letters.is_empty() && digits.is_empty() {
        return Err(RangeError::InvalidCell(input.to_string()));
    }

    let column = if letters.is_empty() {
        None
    } else {
        Some(column_index(&letters).ok_or_else(|| RangeError::InvalidCell(input.to_string()))?)
    };

    let row = if digits.is_empty() {
        None
    } else {
        match digits.parse::<u32>() {
            Ok(0) | Err(_) => return Err(RangeError::InvalidCell(input.to_string())),
            Ok(n) => Some(n),
        }
    };

    Ok(CellRef { column, row })
}

fn format_cell(cell: &CellRef) -> String {
    let mut out = String::new();
    if let Some(column) = cell.column {
        out.push_str(&column_letters(column));
    }
    if let Some(row) = cell.row {
        out.push_str(&row.to_string());
    }
    out
}

fn needs_quotes(sheet: &str) -> bool {
    !sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_round_trip_known_values() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(4), "E");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("f"), Some(5));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_index(""), None);
    }

    #[test]
    fn parse_column_span() {
        let range = A1Range::parse("Users!A:F").unwrap();
        assert_eq!(range.sheet, "Users");
        assert_eq!(range.first_column(), 0);
        assert_eq!(range.last_column(), Some(5));
        assert_eq!(range.first_row(), 1);
        assert_eq!(range.last_row(), None);
        assert_eq!(range.width(), Some(6));
        assert_eq!(range.to_string(), "Users!A:F");
    }

    #[test]
    fn parse_single_cell() {
        let range = A1Range::parse("Users!E5").unwrap();
        assert_eq!(range, A1Range::cell("Users", 4, 5));
        assert_eq!(range.height(), Some(1));
        assert_eq!(range.to_string(), "Users!E5");
    }

    #[test]
    fn parse_row_span() {
        let range = A1Range::parse("Activities!A7:E7").unwrap();
        assert_eq!(range, A1Range::row_span("Activities", 0, 4, 7));
        assert_eq!(range.to_string(), "Activities!A7:E7");
    }

    #[test]
    fn parse_bare_sheet_and_quoted_names() {
        let whole = A1Range::parse("Families").unwrap();
        assert_eq!(whole.sheet, "Families");
        assert_eq!(whole.last_column(), None);
        assert_eq!(whole.to_string(), "Families");

        let quoted = A1Range::parse("'Kid''s log'!B2:C3").unwrap();
        assert_eq!(quoted.sheet, "Kid's log");
        assert_eq!(quoted.first_column(), 1);
        assert_eq!(quoted.last_row(), Some(3));
        assert_eq!(quoted.to_string(), "'Kid''s log'!B2:C3");
    }

    #[test]
    fn reject_malformed_ranges() {
        assert_eq!(A1Range::parse(""), Err(RangeError::Empty));
        assert!(matches!(A1Range::parse("!A1"), Err(RangeError::MissingSheet(_))));
        assert!(matches!(A1Range::parse("Users!A0"), Err(RangeError::InvalidCell(_))));
        assert!(matches!(A1Range::parse("Users!:B"), Err(RangeError::InvalidCell(_))));
        assert!(matches!(A1Range::parse("Users!F:A"), Err(RangeError::Inverted(_))));
        assert!(matches!(
            A1Range::parse("'Users!A1"),
            Err(RangeError::UnterminatedQuote(_))
        ));
    }
}
