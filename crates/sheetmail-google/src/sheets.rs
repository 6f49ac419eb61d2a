use std::sync::Arc;

use async_trait::async_trait;
use sheetmail_types::Result;

use crate::http::{endpoint, GoogleHttp};
use crate::{CredentialProvider, SheetTab, SpreadsheetGateway};

// ---------------------------------------------------------------------------
// SheetsClient
// ---------------------------------------------------------------------------

/// Google Sheets v4 adapter.
#[derive(Clone)]
pub struct SheetsClient {
    http: GoogleHttp,
    base_url: String,
}

impl SheetsClient {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http: GoogleHttp::new("sheets", credentials),
            base_url: "https://sheets.googleapis.com/v4".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }
}

/// Turn a `values` payload into string rows. Non-string cells (numbers,
/// booleans returned by unformatted renders) keep their JSON text.
fn parse_values(json: &serde_json::Value) -> Vec<Vec<String>> {
    json["values"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(cell_to_string).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn cell_to_string(cell: &serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_tabs(json: &serde_json::Value) -> Vec<SheetTab> {
    json["sheets"]
        .as_array()
        .map(|sheets| {
            sheets
                .iter()
                .filter_map(|s| serde_json::from_value(s["properties"].clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl SpreadsheetGateway for SheetsClient {
    async fn get_rows(&self, sheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let url = endpoint(&self.base_url, &["spreadsheets", sheet_id, "values", range])?;
        let json = self.http.json(self.http.client().get(url)).await?;
        let rows = parse_values(&json);
        tracing::info!(sheet = %sheet_id, range = %range, rows = rows.len(), "Fetched sheet values");
        Ok(rows)
    }

    async fn list_sheets(&self, sheet_id: &str) -> Result<Vec<SheetTab>> {
        let url = endpoint(&self.base_url, &["spreadsheets", sheet_id])?;
        let request = self
            .http
            .client()
            .get(url)
            .query(&[("fields", "sheets(properties(sheetId,title))")]);
        let json = self.http.json(request).await?;
        Ok(parse_tabs(&json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_values_keeps_ragged_rows() {
        let json = json!({
            "range": "Folha1!A1:K3",
            "values": [
                ["COD", "NOME", "PAD"],
                ["7", "Ana"],
                [8, null, true]
            ]
        });
        let rows = parse_values(&json);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["7", "Ana"]);
        assert_eq!(rows[2], vec!["8", "", "true"]);
    }

    #[test]
    fn parse_values_without_values_is_empty() {
        assert!(parse_values(&json!({ "range": "A1:B2" })).is_empty());
    }

    #[test]
    fn parse_tabs_reads_properties() {
        let json = json!({
            "sheets": [
                { "properties": { "sheetId": 0, "title": "Junho" } },
                { "properties": { "sheetId": 42, "title": "Julho" } }
            ]
        });
        let tabs = parse_tabs(&json);
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[1].sheet_id, 42);
        assert_eq!(tabs[1].title, "Julho");
    }
}
