//! Google Sheets v4 REST client.
//!
//! Authenticates with a service account key and talks to the
//! `spreadsheets.values` endpoints:
//!
//! - `GET  /v4/spreadsheets/{id}/values/{range}` to read
//! - `POST /v4/spreadsheets/{id}/values/{range}:clear` to clear

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use serde::Deserialize;
use snafu::prelude::*;
use tracing::{debug, info};
use url::Url;

use crate::config::SourceConfig;
use crate::error::{
    CannotBeABaseSnafu, CredentialsSnafu, DecodeSnafu, HttpClientSnafu, InvalidUrlSnafu,
    RequestSnafu, SourceError, StatusSnafu, TimeoutSnafu, TokenSnafu,
};
use crate::grid::Grid;

use super::SheetSource;

/// OAuth scope granting read and write access to spreadsheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// A `ValueRange` as returned by `spreadsheets.values.get`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default)]
    range: Option<String>,
    /// Omitted entirely when the range holds no values.
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl ValueRange {
    fn into_grid(self) -> Grid {
        Grid::new(
            self.values
                .into_iter()
                .map(|row| row.into_iter().map(cell_text).collect())
                .collect(),
        )
    }
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClearResponse {
    #[serde(default)]
    cleared_range: Option<String>,
}

/// Build `{base}/v4/spreadsheets/{id}/values/{range}[:{action}]`.
fn values_url(
    base: &str,
    spreadsheet_id: &str,
    range: &str,
    action: Option<&str>,
) -> Result<Url, SourceError> {
    let mut url = Url::parse(base).context(InvalidUrlSnafu { url: base })?;
    let last = match action {
        Some(action) => format!("{range}:{action}"),
        None => range.to_string(),
    };

    url.path_segments_mut()
        .map_err(|_| CannotBeABaseSnafu { url: base }.build())?
        .pop_if_empty()
        .extend(["v4", "spreadsheets", spreadsheet_id, "values", &last]);

    Ok(url)
}

/// Sheets client bound to one spreadsheet range.
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    auth: CustomServiceAccount,
    read_url: Url,
    clear_url: Url,
    timeout: Duration,
}

impl GoogleSheetsClient {
    /// Load the service account key and prepare the client.
    ///
    /// Fails if the credential file is missing or malformed.
    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        let auth = CustomServiceAccount::from_file(&config.credentials_path).context(
            CredentialsSnafu {
                path: &config.credentials_path,
            },
        )?;

        let timeout = config.request_timeout();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context(HttpClientSnafu)?;

        let read_url = values_url(
            &config.api_base_url,
            &config.spreadsheet_id,
            &config.range,
            None,
        )?;
        let clear_url = values_url(
            &config.api_base_url,
            &config.spreadsheet_id,
            &config.range,
            Some("clear"),
        )?;

        debug!(%read_url, %clear_url, "Sheets client configured");

        Ok(Self {
            http,
            auth,
            read_url,
            clear_url,
            timeout,
        })
    }

    async fn bearer_token(&self) -> Result<String, SourceError> {
        let token = self
            .auth
            .token(&[SPREADSHEETS_SCOPE])
            .await
            .context(TokenSnafu)?;
        Ok(token.as_str().to_string())
    }

    /// Bound a whole operation, token exchange included, by the request timeout.
    async fn with_timeout<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, SourceError>>,
    ) -> Result<T, SourceError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .context(TimeoutSnafu {
                operation,
                timeout_secs: self.timeout.as_secs(),
            })?
    }

    async fn check_status(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, SourceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        StatusSnafu {
            operation,
            status: status.as_u16(),
            body,
        }
        .fail()
    }

    async fn fetch_values(&self) -> Result<Grid, SourceError> {
        const OPERATION: &str = "read";

        let token = self.bearer_token().await?;
        let response = self
            .http
            .get(self.read_url.clone())
            .bearer_auth(token)
            .query(&[
                ("majorDimension", "ROWS"),
                ("valueRenderOption", "FORMATTED_VALUE"),
            ])
            .send()
            .await
            .context(RequestSnafu {
                operation: OPERATION,
            })?;

        let values: ValueRange = Self::check_status(OPERATION, response)
            .await?
            .json()
            .await
            .context(DecodeSnafu {
                operation: OPERATION,
            })?;

        debug!(range = ?values.range, rows = values.values.len(), "Values fetched");
        Ok(values.into_grid())
    }

    async fn clear_values(&self) -> Result<(), SourceError> {
        const OPERATION: &str = "clear";

        let token = self.bearer_token().await?;
        let response = self
            .http
            .post(self.clear_url.clone())
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .context(RequestSnafu {
                operation: OPERATION,
            })?;

        let cleared: ClearResponse = Self::check_status(OPERATION, response)
            .await?
            .json()
            .await
            .context(DecodeSnafu {
                operation: OPERATION,
            })?;

        info!(cleared_range = ?cleared.cleared_range, "Google Sheet cleared");
        Ok(())
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsClient {
    async fn read(&self) -> Result<Grid, SourceError> {
        self.with_timeout("read", self.fetch_values()).await
    }

    async fn clear(&self) -> Result<(), SourceError> {
        self.with_timeout("clear", self.clear_values()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use axum::{Json, Router};
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use serde_json::json;
    use tempfile::TempDir;

    /// Throwaway RSA key used only to sign token requests to the local server.
    const TEST_PRIVATE_KEY: &str = include_str!("../../tests/fixtures/service-account-key.pem");
    const TEST_TOKEN: &str = "test-access-token";
    const VALUES_ROUTE: &str = "/v4/spreadsheets/{id}/values/{range}";

    async fn issue_token() -> Json<serde_json::Value> {
        Json(json!({
            "access_token": TEST_TOKEN,
            "expires_in": 3600,
            "token_type": "Bearer"
        }))
    }

    fn is_authorized(headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {TEST_TOKEN}"))
    }

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        base
    }

    fn client(base: &str, temp_dir: &TempDir, request_timeout_secs: u64) -> GoogleSheetsClient {
        let key = json!({
            "type": "service_account",
            "project_id": "sheetsweep-test",
            "private_key_id": "test",
            "private_key": TEST_PRIVATE_KEY,
            "client_email": "sweep@sheetsweep-test.iam.gserviceaccount.com",
            "client_id": "1",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": format!("{base}/token"),
        });
        let credentials_path = temp_dir.path().join("service-account.json");
        std::fs::write(&credentials_path, key.to_string()).unwrap();

        GoogleSheetsClient::from_config(&SourceConfig {
            spreadsheet_id: "doc".to_string(),
            range: "Sheet1!A:Z".to_string(),
            credentials_path,
            api_base_url: base.to_string(),
            request_timeout_secs,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_read_and_clear_against_server() {
        let router = Router::new().route("/token", post(issue_token)).route(
            VALUES_ROUTE,
            get(|headers: HeaderMap| async move {
                if !is_authorized(&headers) {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
                Json(json!({
                    "range": "Sheet1!A1:Z3",
                    "majorDimension": "ROWS",
                    "values": [["A", "B"], ["Error", 7]]
                }))
                .into_response()
            })
            .post(|headers: HeaderMap| async move {
                if !is_authorized(&headers) {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
                Json(json!({
                    "spreadsheetId": "doc",
                    "clearedRange": "Sheet1!A1:Z1000"
                }))
                .into_response()
            }),
        );
        let base = serve(router).await;
        let temp_dir = TempDir::new().unwrap();
        let client = client(&base, &temp_dir, 5);

        let grid = client.read().await.unwrap();
        let expected: Grid = vec![vec!["A", "B"], vec!["Error", "7"]].into_iter().collect();
        assert_eq!(grid, expected);

        client.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_keeps_body() {
        let router = Router::new().route("/token", post(issue_token)).route(
            VALUES_ROUTE,
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "backend unavailable") }),
        );
        let base = serve(router).await;
        let temp_dir = TempDir::new().unwrap();
        let client = client(&base, &temp_dir, 5);

        let err = client.read().await.unwrap_err();

        match &err {
            SourceError::Status {
                operation,
                status,
                body,
            } => {
                assert_eq!(*operation, "read");
                assert_eq!(*status, 503);
                assert_eq!(body, "backend unavailable");
            }
            other => panic!("expected a status error, got {other:?}"),
        }
        assert!(err.to_string().contains("backend unavailable"));
    }

    #[tokio::test]
    async fn test_stalled_token_exchange_times_out() {
        let router = Router::new().route(
            "/token",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                issue_token().await
            }),
        );
        let base = serve(router).await;
        let temp_dir = TempDir::new().unwrap();
        let client = client(&base, &temp_dir, 1);

        let err = client.clear().await.unwrap_err();

        assert!(
            matches!(
                err,
                SourceError::Timeout {
                    operation: "clear",
                    timeout_secs: 1,
                    ..
                }
            ),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_read_url() {
        let url = values_url("https://sheets.googleapis.com", "1AbC", "Sheet1!A:Z", None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/1AbC/values/Sheet1!A:Z"
        );
    }

    #[test]
    fn test_clear_url() {
        let url = values_url(
            "https://sheets.googleapis.com/",
            "1AbC",
            "Sheet1!A:Z",
            Some("clear"),
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/1AbC/values/Sheet1!A:Z:clear"
        );
    }

    #[test]
    fn test_range_is_percent_encoded() {
        let url = values_url("http://localhost:8080", "doc", "'Daily Log'!A:Z", None).unwrap();
        assert!(url.as_str().ends_with("/values/'Daily%20Log'!A:Z"));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = values_url("not a url", "doc", "Sheet1!A:Z", None).unwrap_err();
        assert!(matches!(err, SourceError::InvalidUrl { .. }));

        let err = values_url("mailto:ops@example.com", "doc", "Sheet1!A:Z", None).unwrap_err();
        assert!(matches!(err, SourceError::CannotBeABase { .. }));
    }

    #[test]
    fn test_value_range_to_grid() {
        let body = r#"{
            "range": "Sheet1!A1:Z1000",
            "majorDimension": "ROWS",
            "values": [["A", "B"], ["Error", 3, true], [null, "x"], []]
        }"#;
        let values: ValueRange = serde_json::from_str(body).unwrap();
        let grid = values.into_grid();

        let expected: Grid = vec![
            vec!["A", "B"],
            vec!["Error", "3", "true"],
            vec!["", "x"],
            vec![],
        ]
        .into_iter()
        .collect();
        assert_eq!(grid, expected);
    }

    #[test]
    fn test_value_range_without_values_is_empty() {
        let body = r#"{"range": "Sheet1!A1:Z1000", "majorDimension": "ROWS"}"#;
        let values: ValueRange = serde_json::from_str(body).unwrap();
        assert!(values.into_grid().is_empty());
    }

    #[test]
    fn test_missing_credentials_file() {
        let config = SourceConfig {
            spreadsheet_id: "doc".to_string(),
            range: "Sheet1!A:Z".to_string(),
            credentials_path: PathBuf::from("/nonexistent/service-account.json"),
            api_base_url: "https://sheets.googleapis.com".to_string(),
            request_timeout_secs: 5,
        };

        let err = match GoogleSheetsClient::from_config(&config) {
            Ok(_) => panic!("client built without credentials"),
            Err(e) => e,
        };
        assert!(matches!(err, SourceError::Credentials { .. }));
        assert!(err.to_string().contains("/nonexistent/service-account.json"));
    }
}
