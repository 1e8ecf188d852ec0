// NSClient++ REST client
//
// Wraps `reqwest::Client` with agent-specific URL construction and a
// single timed GET. Every call settles into exactly one outcome: the raw
// body on HTTP 200, or an `Error` for timeouts, transport failures and
// any other status.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Path of the agent identity endpoint.
pub const INFO_PATH: &str = "/api/v1/info";

/// Path that executes the named query on the agent.
pub fn command_path(query: &str) -> String {
    format!("/api/v1/queries/{query}/commands/execute")
}

/// HTTP client bound to one monitoring agent.
///
/// Credentials are sent as HTTP basic auth on every request; the base
/// URL never carries them, so it is safe to log.
#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
}

impl AgentClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the agent root, e.g. `https://10.0.0.5:8443`.
    pub fn new(
        base_url: Url,
        username: String,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, username, password))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// Lets many agents share one connection pool.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: String,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            username,
            password,
        }
    }

    /// The agent base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the full URL for an API path.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// GET `path` and return the body of a 200 response.
    ///
    /// The whole exchange (connect, headers, body) runs under `timeout`.
    /// When the budget runs out the request is dropped and the call
    /// settles with [`Error::Timeout`].
    pub async fn query(&self, path: &str, timeout: Duration) -> Result<String, Error> {
        let url = self.url(path)?;
        debug!("GET {}", url);

        let mut request = self.http.get(url);
        if !self.username.is_empty() || !self.password.expose_secret().is_empty() {
            request = request.basic_auth(&self.username, Some(self.password.expose_secret()));
        }

        let exchange = async {
            let resp = request.send().await.map_err(Error::Transport)?;
            let status = resp.status().as_u16();
            if status != 200 {
                return Err(Error::http(status));
            }
            resp.text().await.map_err(Error::Transport)
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Err(Error::Transport(e))) if e.is_timeout() => Err(timeout_error(timeout)),
            Ok(result) => result,
            Err(_) => Err(timeout_error(timeout)),
        }
    }
}

fn timeout_error(timeout: Duration) -> Error {
    Error::Timeout {
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn command_path_embeds_query_name() {
        assert_eq!(
            command_path("check_cpu"),
            "/api/v1/queries/check_cpu/commands/execute"
        );
    }

    #[test]
    fn url_joins_absolute_paths() {
        let client = AgentClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://10.0.0.5:8443").unwrap(),
            "admin".into(),
            SecretString::from("secret".to_owned()),
        );
        let url = client.url(INFO_PATH).unwrap();
        assert_eq!(url.as_str(), "https://10.0.0.5:8443/api/v1/info");
    }
}
