//! Subscan transfers client

use std::fmt;
use std::time::Duration;

use ledgerline_core::http::truncate_body;
use ledgerline_core::{
    FetchError, PageRequest, RecordSource, SHARED_RUNTIME, TransferRecord, http_client,
    http_config,
};

use crate::decode::decode_page;

/// Network used when none is configured
pub const DEFAULT_NETWORK: &str = "nodle";

/// Longest error body kept in a [`FetchError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// Transfers endpoint for a Subscan network, e.g. `polkadot`
pub fn transfers_endpoint(network: &str) -> String {
    format!("https://{network}.api.subscan.io/api/scan/transfers")
}

/// Blocking [`RecordSource`] over Subscan's `POST /api/scan/transfers`.
///
/// Each call sends exactly one request; retries belong to
/// [`Retrying`](ledgerline_core::Retrying).
pub struct SubscanSource {
    endpoint: String,
    api_key: String,
    timeout: Duration,
    total_logged: bool,
}

impl fmt::Debug for SubscanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscanSource")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SubscanSource {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout: http_config().timeout,
            total_logged: false,
        }
    }

    pub fn for_network(network: &str, api_key: impl Into<String>) -> Self {
        Self::new(transfers_endpoint(network), api_key)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post(&self, request: &PageRequest) -> Result<Vec<u8>, FetchError> {
        SHARED_RUNTIME.handle().block_on(async {
            let resp = http_client()
                .post(&self.endpoint)
                .header("x-api-key", &self.api_key)
                .timeout(self.timeout)
                .json(request)
                .send()
                .await
                .map_err(transport)?;

            let status = resp.status();
            let body = resp.bytes().await.map_err(transport)?;
            if !status.is_success() {
                return Err(FetchError::Status {
                    code: status.as_u16(),
                    body: truncate_body(&String::from_utf8_lossy(&body), MAX_ERROR_BODY),
                });
            }
            Ok(body.to_vec())
        })
    }
}

// Strip URL from error so endpoints stay out of logs
fn transport(e: reqwest::Error) -> FetchError {
    FetchError::Transport(e.without_url().to_string())
}

impl RecordSource for SubscanSource {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<Vec<TransferRecord>, FetchError> {
        let body = self.post(request)?;
        let page = decode_page(&body)?;

        if let (Some(count), false) = (page.count, self.total_logged) {
            log::info!("{count} transfers match the query");
            self.total_logged = true;
        }
        log::debug!(
            "subscan page {} (row={}): {} transfers",
            request.page,
            request.row,
            page.transfers.len()
        );
        Ok(page.transfers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_for_network() {
        assert_eq!(
            transfers_endpoint("polkadot"),
            "https://polkadot.api.subscan.io/api/scan/transfers"
        );
        let source = SubscanSource::for_network(DEFAULT_NETWORK, "k");
        assert_eq!(
            source.endpoint(),
            "https://nodle.api.subscan.io/api/scan/transfers"
        );
    }

    #[test]
    fn debug_hides_api_key() {
        let source = SubscanSource::new("http://localhost/x", "secret-key");
        let shown = format!("{source:?}");
        assert!(!shown.contains("secret-key"));
        assert!(shown.contains("http://localhost/x"));
    }
}
