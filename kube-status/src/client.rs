//! HTTP client for probing other status services
//!
//! Used for nested readiness checks (forwarding the identifier chain) and
//! for a service's own start-up self check. Probing short-circuits on the
//! first failing address unless `all` is set; either way only the first
//! error is reported.

use reqwest::Url;
use std::time::Duration;

use crate::error::ProbeError;
use crate::status::Status;

/// Path of the liveness endpoint
pub const HEALTH_PATH: &str = "/healthz";

/// Path of the readiness endpoint
pub const READINESS_PATH: &str = "/readiness";

/// Query parameter carrying the comma-joined identifier chain
pub const UUIDS_PARAM: &str = "uuids";

/// Outcome of probing a list of addresses
#[derive(Debug)]
pub struct ProbeReport {
    /// One slot per address, in order; `None` where no status was decoded
    /// or the address was never reached
    pub statuses: Vec<Option<Status>>,

    /// First failure encountered, if any
    pub error: Option<ProbeError>,
}

impl ProbeReport {
    /// Whether every probed address succeeded
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into the statuses, or the first error
    pub fn into_result(self) -> Result<Vec<Option<Status>>, ProbeError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.statuses),
        }
    }
}

/// Client for the `/healthz` and `/readiness` endpoints of a set of services
#[derive(Debug, Clone)]
pub struct DependencyClient {
    http: reqwest::Client,
    addresses: Vec<String>,
    chain: Vec<String>,
    all: bool,
    timeout: Option<Duration>,
}

impl DependencyClient {
    /// Create a client for the given base addresses (including scheme)
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            http: reqwest::Client::new(),
            addresses: addresses.into_iter().map(Into::into).collect(),
            chain: Vec::new(),
            all: false,
            timeout: None,
        }
    }

    /// Reuse an existing HTTP client (connection pool)
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Probe every address regardless of earlier failures
    pub fn all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }

    /// Identifier chain to send as the `uuids` query parameter
    pub fn chain(mut self, chain: Vec<String>) -> Self {
        self.chain = chain;
        self
    }

    /// Per-request timeout
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Addresses this client probes
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// GET `/healthz` on every address
    pub async fn health(&self) -> ProbeReport {
        self.get(HEALTH_PATH).await
    }

    /// GET `/readiness` on every address
    pub async fn readiness(&self) -> ProbeReport {
        self.get(READINESS_PATH).await
    }

    /// GET `endpoint` on every address
    ///
    /// A status body is decoded whatever the HTTP code, since failing
    /// services still describe themselves. An address fails on a malformed
    /// URL, a transport error, or a non-2xx response.
    pub async fn get(&self, endpoint: &str) -> ProbeReport {
        let mut statuses: Vec<Option<Status>> = vec![None; self.addresses.len()];
        let mut first_error = None;

        for (slot, address) in statuses.iter_mut().zip(&self.addresses) {
            let (status, error) = self.probe(address, endpoint).await;
            *slot = status;

            if let Some(err) = error {
                tracing::debug!(address = %address, endpoint, error = %err, "Dependency probe failed");
                if first_error.is_none() {
                    first_error = Some(err);
                }
                if !self.all {
                    break;
                }
            }
        }

        ProbeReport {
            statuses,
            error: first_error,
        }
    }

    async fn probe(&self, address: &str, endpoint: &str) -> (Option<Status>, Option<ProbeError>) {
        let url = match self.endpoint_url(address, endpoint) {
            Ok(url) => url,
            Err(err) => return (None, Some(err)),
        };

        let mut request = self.http.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return (None, Some(ProbeError::Transport(err))),
        };

        // Only the HTTP code decides success; an unreadable body is just
        // an undecodable one
        let code = response.status();
        let status = response
            .bytes()
            .await
            .ok()
            .and_then(|body| serde_json::from_slice::<Status>(&body).ok());

        let error = (!code.is_success()).then(|| ProbeError::Status {
            status: code,
            message: status.as_ref().map(|s| s.message.clone()),
        });

        (status, error)
    }

    fn endpoint_url(&self, address: &str, endpoint: &str) -> Result<Url, ProbeError> {
        let mut url = Url::parse(address).map_err(|source| ProbeError::InvalidUrl {
            address: address.to_string(),
            source,
        })?;

        let path = format!("{}{}", url.path().trim_end_matches('/'), endpoint);
        url.set_path(&path);

        if !self.chain.is_empty() {
            let retained: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| key != UUIDS_PARAM)
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();

            url.query_pairs_mut()
                .clear()
                .extend_pairs(retained)
                .append_pair(UUIDS_PARAM, &self.chain.join(","));
        }

        Ok(url)
    }
}
