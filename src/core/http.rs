use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::core::config::EngineConfig;
use crate::core::error::{CoreError, CoreResult};

/// Product identifier sent to hosts that block anonymous clients.
pub const PRODUCT_USER_AGENT: &str = concat!("mcfetch/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client(config: &EngineConfig) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .default_headers(default_headers)
        .connect_timeout(config.connect_timeout())
        .build()
}

/// Per-host request policy applied transparently by every outgoing request.
#[derive(Debug, Clone, Default)]
pub struct HostPolicy {
    product_ua_hosts: Vec<String>,
}

impl HostPolicy {
    pub fn new(product_ua_hosts: Vec<String>) -> Self {
        Self { product_ua_hosts }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.product_user_agent_hosts.clone())
    }

    /// True when `url` targets a host (or a subdomain of one) that requires
    /// the product user agent.
    pub fn requires_product_user_agent(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.product_ua_hosts.iter().any(|known| {
            let known = known.to_ascii_lowercase();
            host == known || host.ends_with(&format!(".{known}"))
        })
    }

    pub fn apply(&self, request: RequestBuilder, url: &str) -> RequestBuilder {
        if self.requires_product_user_agent(url) {
            request.header(USER_AGENT, PRODUCT_USER_AGENT)
        } else {
            request
        }
    }
}

/// Shared HTTP client with the host policy baked in.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    policy: HostPolicy,
}

impl ApiClient {
    pub fn new(client: Client, policy: HostPolicy) -> Self {
        Self { client, policy }
    }

    pub fn from_config(config: &EngineConfig) -> CoreResult<Self> {
        Ok(Self::new(
            build_http_client(config)?,
            HostPolicy::from_config(config),
        ))
    }

    pub fn policy(&self) -> &HostPolicy {
        &self.policy
    }

    /// GET request for `url` with the host policy applied.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.policy.apply(self.client.get(url), url)
    }

    /// Fetch a body as text, failing on non-2xx responses.
    pub async fn fetch_text(&self, url: &str, cancel: &CancellationToken) -> CoreResult<String> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CoreError::Cancelled),
            response = self.get(url).send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CoreError::Cancelled),
            text = response.text() => Ok(text?),
        }
    }

    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<T> {
        let raw = self.fetch_text(url, cancel).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(Client::new(), HostPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> HostPolicy {
        HostPolicy::new(vec!["bmclapi2.bangbang93.com".to_string()])
    }

    #[test]
    fn mirror_host_requires_user_agent() {
        assert!(policy()
            .requires_product_user_agent("https://bmclapi2.bangbang93.com/assets/ab/abcd"));
        assert!(policy().requires_product_user_agent("https://BMCLAPI2.bangbang93.com/x"));
    }

    #[test]
    fn other_hosts_are_left_alone() {
        assert!(!policy().requires_product_user_agent("https://resources.download.minecraft.net/a"));
        assert!(!policy().requires_product_user_agent("https://evilbmclapi2.bangbang93.com.test/a"));
        assert!(!policy().requires_product_user_agent("not a url"));
    }

    #[test]
    fn product_user_agent_names_the_crate() {
        assert!(PRODUCT_USER_AGENT.starts_with("mcfetch/"));
    }
}
