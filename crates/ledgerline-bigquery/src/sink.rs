//! BigQuery streaming-insert sink

use std::fmt;
use std::time::Duration;

use ledgerline_core::http::truncate_body;
use ledgerline_core::{SHARED_RUNTIME, Sink, SinkError, TransferRecord, http_client, http_config};

use crate::insert::{ErrorEnvelope, InsertAllRequest, InsertAllResponse, rejection_summary};

pub const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

const MAX_ERROR_BODY: usize = 512;

/// Destination table and credentials
#[derive(Clone)]
pub struct BigQueryConfig {
    pub project_id: String,
    pub dataset: String,
    pub table: String,
    /// OAuth2 bearer token
    pub access_token: String,
    /// API root, overridable for testing
    pub endpoint: String,
}

impl fmt::Debug for BigQueryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigQueryConfig")
            .field("project_id", &self.project_id)
            .field("dataset", &self.dataset)
            .field("table", &self.table)
            .field("access_token", &"***")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl BigQueryConfig {
    pub fn new(
        project_id: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
            table: table.into(),
            access_token: access_token.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn insert_all_url(&self) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables/{}/insertAll",
            self.endpoint.trim_end_matches('/'),
            self.project_id,
            self.dataset,
            self.table
        )
    }

    /// `project.dataset.table`
    pub fn table_ref(&self) -> String {
        format!("{}.{}.{}", self.project_id, self.dataset, self.table)
    }
}

/// [`Sink`] writing each batch with one `insertAll` call.
///
/// The whole batch is accepted or the flush fails; nothing is partially
/// committed from the caller's point of view.
#[derive(Debug)]
pub struct BigQuerySink {
    config: BigQueryConfig,
    url: String,
    timeout: Duration,
}

impl BigQuerySink {
    pub fn new(config: BigQueryConfig) -> Self {
        let url = config.insert_all_url();
        Self {
            config,
            url,
            timeout: http_config().timeout,
        }
    }

    pub fn config(&self) -> &BigQueryConfig {
        &self.config
    }

    fn insert_all(&self, batch: &[TransferRecord]) -> Result<(), SinkError> {
        let request = InsertAllRequest::new(batch);
        let (status, body) = SHARED_RUNTIME.handle().block_on(async {
            let resp = http_client()
                .post(&self.url)
                .bearer_auth(&self.config.access_token)
                .timeout(self.timeout)
                .json(&request)
                .send()
                .await?;
            let status = resp.status();
            let body = resp.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        })
        .map_err(|e| SinkError::Transport {
            status: None,
            message: e.without_url().to_string(),
        })?;

        if !status.is_success() {
            let code = status.as_u16();
            let message = error_message(&body);
            return Err(if matches!(code, 429 | 500..=599) {
                SinkError::Transport {
                    status: Some(code),
                    message,
                }
            } else {
                SinkError::Rejected(format!("HTTP {code}: {message}"))
            });
        }

        let response: InsertAllResponse = serde_json::from_slice(&body).map_err(|e| {
            SinkError::Rejected(format!("unreadable insertAll response: {e}"))
        })?;
        if !response.insert_errors.is_empty() {
            return Err(SinkError::Rejected(rejection_summary(
                &response.insert_errors,
                batch.len(),
            )));
        }
        Ok(())
    }
}

/// Prefer the API's own message over the raw body
fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(env) if !env.error.status.is_empty() => {
            format!("{} ({})", env.error.message, env.error.status)
        }
        Ok(env) => env.error.message,
        Err(_) => truncate_body(&String::from_utf8_lossy(body), MAX_ERROR_BODY),
    }
}

impl Sink for BigQuerySink {
    fn flush(&mut self, batch: &[TransferRecord]) -> Result<(), SinkError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.insert_all(batch)?;
        log::debug!("inserted {} rows into {}", batch.len(), self.config.table_ref());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_and_table_ref() {
        let mut config = BigQueryConfig::new("proj", "chain", "transfers", "tok");
        assert_eq!(
            config.insert_all_url(),
            "https://bigquery.googleapis.com/bigquery/v2/projects/proj/datasets/chain/tables/transfers/insertAll"
        );
        config.endpoint = "http://127.0.0.1:9050/".into();
        assert_eq!(
            config.insert_all_url(),
            "http://127.0.0.1:9050/projects/proj/datasets/chain/tables/transfers/insertAll"
        );
        assert_eq!(config.table_ref(), "proj.chain.transfers");
    }

    #[test]
    fn debug_hides_token() {
        let config = BigQueryConfig::new("p", "d", "t", "ya29.secret");
        assert!(!format!("{config:?}").contains("ya29"));
    }

    #[test]
    fn error_message_prefers_api_error() {
        let body = br#"{"error":{"code":404,"message":"Not found: Table p:d.t","status":"NOT_FOUND"}}"#;
        assert_eq!(error_message(body), "Not found: Table p:d.t (NOT_FOUND)");
        assert_eq!(error_message(b"  gateway timeout \n"), "gateway timeout");
    }

    #[test]
    fn empty_batch_makes_no_request() {
        let mut config = BigQueryConfig::new("p", "d", "t", "tok");
        config.endpoint = "http://127.0.0.1:1".into();
        let mut sink = BigQuerySink::new(config);
        assert!(sink.flush(&[]).is_ok());
    }
}
