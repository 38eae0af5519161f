//! Google Sheets v4 REST backend.
//!
//! Values are written with `valueInputOption=RAW`, so cells round-trip as the
//! exact strings the adapter produced.

pub mod auth;

use async_trait::async_trait;
use reqwest::{Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::SheetsError;
use crate::range::A1Range;
use crate::store::{Row, SheetStore, ValueRange};

pub use auth::ServiceAccount;
use auth::TokenSource;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    /// Range the API actually read, in A1 notation.
    range: Option<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl ValuesResponse {
    /// Rows of the response. Callers number rows from the requested range's
    /// first row, so the returned range must start at the same cell.
    fn into_rows(self, requested: &A1Range) -> Result<Vec<Row>, SheetsError> {
        if let Some(raw) = self.range.as_deref() {
            let returned = A1Range::parse(raw)?;
            if returned.sheet != requested.sheet
                || returned.first_row() != requested.first_row()
                || returned.first_column() != requested.first_column()
            {
                return Err(SheetsError::Shape {
                    range: requested.to_string(),
                    reason: format!("api returned values for {returned}"),
                });
            }
        }
        Ok(self
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

/// A spreadsheet reached through the Sheets REST API.
pub struct GoogleSheets {
    http: reqwest::Client,
    tokens: TokenSource,
    spreadsheet_id: String,
}

impl GoogleSheets {
    pub fn new(account: &ServiceAccount, spreadsheet_id: impl Into<String>) -> Result<Self, SheetsError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("esfinteres/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let tokens = TokenSource::new(http.clone(), account)?;
        Ok(Self {
            http,
            tokens,
            spreadsheet_id: spreadsheet_id.into(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = Url::parse(API_BASE).map_err(|e| SheetsError::Api {
            status: 0,
            message: format!("bad api base: {e}"),
        })?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Api {
                status: 0,
                message: "api base cannot hold a path".to_string(),
            })?
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn sheet_id(&self, title: &str) -> Result<i64, SheetsError> {
        let mut url = self.url(&[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");

        let token = self.tokens.access_token().await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let meta: SpreadsheetMeta = check(response).await?.json().await?;

        meta.sheets
            .into_iter()
            .find(|sheet| sheet.properties.title == title)
            .map(|sheet| sheet.properties.sheet_id)
            .ok_or_else(|| SheetsError::UnknownSheet(title.to_string()))
    }
}

async fn check(response: Response) -> Result<Response, SheetsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "sheets api request failed");
    Err(SheetsError::Api {
        status: status.as_u16(),
        message,
    })
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetStore for GoogleSheets {
    async fn read(&self, range: &A1Range) -> Result<Vec<Row>, SheetsError> {
        let target = range.to_string();
        let url = self.url(&["values", target.as_str()])?;
        let token = self.tokens.access_token().await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let body: ValuesResponse = check(response).await?.json().await?;
        body.into_rows(range)
    }

    async fn append(&self, range: &A1Range, rows: Vec<Row>) -> Result<(), SheetsError> {
        let target = format!("{range}:append");
        let mut url = self.url(&["values", target.as_str()])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "values": rows }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn update(&self, range: &A1Range, rows: Vec<Row>) -> Result<(), SheetsError> {
        let target = range.to_string();
        let mut url = self.url(&["values", target.as_str()])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(&json!({
                "range": range.to_string(),
                "majorDimension": "ROWS",
                "values": rows,
            }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn batch_update(&self, data: Vec<ValueRange>) -> Result<(), SheetsError> {
        if data.is_empty() {
            return Ok(());
        }
        let url = self.url(&["values:batchUpdate"])?;
        let data: Vec<Value> = data
            .into_iter()
            .map(|entry| {
                json!({
                    "range": entry.range.to_string(),
                    "majorDimension": "ROWS",
                    "values": entry.values,
                })
            })
            .collect();

        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "valueInputOption": "RAW", "data": data }))
            .send()
            .await?;
        check(response).await?;
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
        let sheet_id = self.sheet_id(sheet).await?;

        // Dimension ranges are 0-based and end-exclusive.
        let start = first_row - 1;
        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": start + count,
                    }
                }
            }]
        });

        let mut url = self.url(&[])?;
        // `{id}:batchUpdate` is a single path segment.
        url.path_segments_mut()
            .map_err(|_| SheetsError::Api {
                status: 0,
                message: "api base cannot hold a path".to_string(),
            })?
            .pop()
            .push(&format!("{}:batchUpdate", self.spreadsheet_id));

        let token = self.tokens.access_token().await?;
        let response = self.http.post(url).bearer_auth(token).json(&body).send().await?;
        check(response).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "google-sheets"
    }
}
