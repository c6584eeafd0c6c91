//! Google Sheets order sink.
//!
//! Appends one row per order through the Sheets values API:
//! `POST {api_base}/spreadsheets/{id}/values/{range}:append?valueInputOption=RAW`.
//! Authentication is a bearer OAuth access token supplied by the environment.
//!
//! Row layout (columns A..G): name, phone, items, total, status,
//! submitted-at (local time), address. Absent fields are written as `N/A`.

use chrono::{Local, NaiveDateTime};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use orderbot_core::ports::OrderSink;
use orderbot_types::config::SheetsSettings;
use orderbot_types::error::{ConfigError, SinkError};
use orderbot_types::order::{NEW_ORDER_STATUS, OrderRecord};

const MISSING: &str = "N/A";

/// Column holding the order status.
const STATUS_COLUMN: &str = "E";

/// Build the sheet row for an order.
pub fn order_row(order: &OrderRecord, submitted_at: NaiveDateTime) -> Vec<String> {
    let field = |value: &Option<String>| {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(MISSING)
            .to_string()
    };
    let status = if order.status.is_empty() {
        NEW_ORDER_STATUS.to_string()
    } else {
        order.status.clone()
    };

    vec![
        field(&order.name),
        field(&order.phone),
        field(&order.items),
        field(&order.total),
        status,
        submitted_at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        field(&order.address),
    ]
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: Option<String>,
}

/// First row number of an A1 range such as `Sheet1!A5:G5`.
fn first_row(range: &str) -> Option<u32> {
    let (_, cells) = range.rsplit_once('!')?;
    let start = cells.split(':').next()?;
    start
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .ok()
}

pub struct SheetsOrderSink {
    client: reqwest::Client,
    api_base: String,
    range: String,
    sheet_name: String,
    sheet_id: Option<String>,
    access_token: Option<SecretString>,
}

impl SheetsOrderSink {
    pub fn new(
        settings: &SheetsSettings,
        sheet_id: Option<String>,
        access_token: Option<SecretString>,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            api_base: settings.api_base.clone(),
            range: settings.range.clone(),
            sheet_name: settings.sheet_name.clone(),
            sheet_id,
            access_token,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.sheet_id.is_some() && self.access_token.is_some()
    }

    fn credentials(&self) -> Result<(&str, &SecretString), SinkError> {
        match (self.sheet_id.as_deref(), self.access_token.as_ref()) {
            (Some(id), Some(token)) => Ok((id, token)),
            (None, _) => Err(SinkError::NotConfigured("GOOGLE_SHEET_ID is not set".into())),
            (_, None) => Err(SinkError::NotConfigured(
                "GOOGLE_SHEETS_ACCESS_TOKEN is not set".into(),
            )),
        }
    }

    /// `{api_base}/spreadsheets/{id}/values/{last_segment}` with each part
    /// percent-encoded as a path segment.
    fn values_url(&self, sheet_id: &str, last_segment: &str) -> Result<Url, SinkError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| SinkError::Request(format!("invalid Sheets API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SinkError::Request("Sheets API base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["spreadsheets", sheet_id, "values", last_segment]);
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        Ok(url)
    }

    /// Append the order and return the sheet row it landed on, when the API reports it.
    pub async fn append_row(&self, order: &OrderRecord) -> Result<Option<u32>, SinkError> {
        let (sheet_id, token) = self.credentials()?;
        let url = self.values_url(sheet_id, &format!("{}:append", self.range))?;
        let row = order_row(order, Local::now().naive_local());

        let response = self
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(&json!({ "values": [row] }))
            .send()
            .await
            .map_err(|e| SinkError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let row_number = response
            .json::<AppendResponse>()
            .await
            .ok()
            .and_then(|r| r.updates)
            .and_then(|u| u.updated_range)
            .and_then(|range| first_row(&range));

        tracing::info!(row = ?row_number, "Order saved to Google Sheets");
        Ok(row_number)
    }

    /// Overwrite the status cell of an existing order row.
    pub async fn update_order_status(&self, row: u32, status: &str) -> Result<(), SinkError> {
        let (sheet_id, token) = self.credentials()?;
        let cell = format!("{}!{STATUS_COLUMN}{row}", self.sheet_name);
        let url = self.values_url(sheet_id, &cell)?;

        let response = self
            .client
            .put(url)
            .bearer_auth(token.expose_secret())
            .json(&json!({ "values": [[status]] }))
            .send()
            .await
            .map_err(|e| SinkError::Request(e.to_string()))?;

        let http_status = response.status();
        if !http_status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: http_status.as_u16(),
                body,
            });
        }

        tracing::info!(row, status, "Order status updated");
        Ok(())
    }
}

impl OrderSink for SheetsOrderSink {
    async fn append_order(&self, order: &OrderRecord) -> Result<(), SinkError> {
        self.append_row(order).await.map(|_| ())
    }
}
