//! NetBox IPAM REST client.
//!
//! Talks to the `/ipam/prefixes/` endpoint. List responses are paginated
//! through the `next` link and decoded with `serde_path_to_error` so a bad
//! payload reports the offending JSON path.

use super::Inventory;
use crate::config::{InventoryConfig, RetryPolicy};
use crate::error::{Error, Result};
use crate::models::{owner_description, AllocationRecord, Network, RecordStatus};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const PREFIXES_PATH: &str = "ipam/prefixes/";

/// One page of a NetBox list response.
#[derive(Deserialize, Debug)]
struct Page {
    #[serde(default)]
    count: Option<u64>,
    next: Option<String>,
    results: Vec<NetboxPrefix>,
}

/// NetBox returns choice fields as `{"value": ..., "label": ...}`.
#[derive(Deserialize, Debug)]
struct StatusChoice {
    value: RecordStatus,
}

#[derive(Deserialize, Debug)]
struct NetboxPrefix {
    id: u64,
    prefix: String,
    #[serde(default)]
    description: String,
    status: Option<StatusChoice>,
}

impl From<NetboxPrefix> for AllocationRecord {
    fn from(p: NetboxPrefix) -> Self {
        AllocationRecord {
            id: p.id,
            prefix: p.prefix,
            description: p.description,
            status: p.status.map(|s| s.value).unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Debug)]
struct NewPrefix<'a> {
    prefix: String,
    description: String,
    status: &'a RecordStatus,
}

/// Inventory backed by a NetBox instance.
#[derive(Debug, Clone)]
pub struct NetboxInventory {
    client: Client,
    prefixes: Url,
    retry: RetryPolicy,
}

impl NetboxInventory {
    pub fn new(config: &InventoryConfig) -> Result<Self> {
        config.validate()?;

        let mut base = Url::parse(&config.url)
            .map_err(|e| Error::Config(format!("invalid inventory URL '{}': {e}", config.url)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let prefixes = base
            .join(PREFIXES_PATH)
            .map_err(|e| Error::Config(format!("invalid inventory URL '{}': {e}", config.url)))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Token {}", config.token.trim()))
            .map_err(|_| Error::Config("inventory token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {e}")))?;

        log::debug!("NetBox prefixes endpoint: {prefixes}");
        Ok(NetboxInventory {
            client,
            prefixes,
            retry: config.retry,
        })
    }

    fn prefixes_with(&self, key: &str, value: &str) -> Url {
        let mut url = self.prefixes.clone();
        url.query_pairs_mut().append_pair(key, value);
        url
    }

    /// Send a request, retrying according to the configured policy.
    ///
    /// `build` is called once per attempt. Only transport failures and 5xx
    /// answers are retried, and only for idempotent requests; the final
    /// response is returned whatever its status.
    async fn send<F>(&self, operation: &'static str, idempotent: bool, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let max_attempts = if idempotent {
            self.retry.max_attempts.max(1)
        } else {
            1
        };
        let mut attempt = 1;
        loop {
            let result = build().send().await;
            let retry = attempt < max_attempts
                && match &result {
                    Ok(resp) => resp.status().is_server_error(),
                    Err(e) => !e.is_builder(),
                };
            if !retry {
                return result.map_err(|e| Error::transport(operation, e));
            }
            match &result {
                Ok(resp) => log::warn!(
                    "NetBox {operation} attempt {attempt}/{max_attempts} got HTTP {}, retrying",
                    resp.status()
                ),
                Err(e) => log::warn!(
                    "NetBox {operation} attempt {attempt}/{max_attempts} failed: {e}, retrying"
                ),
            }
            drop(result);
            tokio::time::sleep(Duration::from_millis(self.retry.delay_ms)).await;
            attempt += 1;
        }
    }

    /// Turn a non-success response into a persistence error carrying its body.
    async fn expect_status(
        operation: &'static str,
        resp: Response,
        expected: StatusCode,
    ) -> Result<Response> {
        let status = resp.status();
        if status == expected {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        log::warn!("NetBox {operation} returned HTTP {status}: {body}");
        Err(Error::Persistence {
            operation,
            status: Some(status.as_u16()),
            message: if body.is_empty() {
                status.to_string()
            } else {
                body
            },
        })
    }

    async fn decode<T>(operation: &'static str, resp: Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let body = resp
            .text()
            .await
            .map_err(|e| Error::transport(operation, e))?;
        let mut deserializer = serde_json::Deserializer::from_str(&body);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
            log::error!("RESPONSE START:\n\n{body}\n\nRESPONSE END");
            Error::Persistence {
                operation,
                status: None,
                message: format!("unexpected response: path={} error={}", e.path(), e),
            }
        })
    }

    async fn get_page(&self, operation: &'static str, url: Url) -> Result<Page> {
        log::debug!("GET {url}");
        let resp = self.send(operation, true, || self.client.get(url.clone())).await?;
        let resp = Self::expect_status(operation, resp, StatusCode::OK).await?;
        Self::decode(operation, resp).await
    }

    /// Fetch one page and resolve its `next` link.
    async fn fetch_block(
        &self,
        operation: &'static str,
        url: Url,
        block: usize,
    ) -> Result<(Vec<NetboxPrefix>, Option<Url>)> {
        let page = self.get_page(operation, url).await?;
        log::debug!(
            "got block#{block:2} records=+{:3} total={:?}",
            page.results.len(),
            page.count
        );
        let next = match page.next {
            Some(link) => Some(Url::parse(&link).map_err(|e| Error::Persistence {
                operation,
                status: None,
                message: format!("invalid next page link '{link}': {e}"),
            })?),
            None => None,
        };
        Ok((page.results, next))
    }

    /// Stream every record of a list query, fetching pages only as needed.
    fn paginate(&self, operation: &'static str, first: Url) -> BoxStream<'_, Result<NetboxPrefix>> {
        stream::try_unfold((Some(first), 0usize), move |(next, block)| async move {
            match next {
                None => Ok(None),
                Some(url) => self
                    .fetch_block(operation, url, block)
                    .await
                    .map(|(results, next)| {
                        let records = stream::iter(results.into_iter().map(Ok::<_, Error>));
                        Some((records, (next, block + 1)))
                    }),
            }
        })
        .try_flatten()
        .boxed()
    }
}

#[async_trait]
impl Inventory for NetboxInventory {
    async fn list_child_networks(&self, parent: &Network) -> Result<Vec<Network>> {
        let url = self.prefixes_with("within", &parent.to_string());
        let prefixes: Vec<NetboxPrefix> = self.paginate("list", url).try_collect().await?;
        let networks = prefixes
            .iter()
            .map(|p| Network::parse(&p.prefix))
            .collect::<Result<Vec<_>>>()?;
        log::info!("Imported {} existing prefixes within {parent}", networks.len());
        Ok(networks)
    }

    async fn create_record(
        &self,
        network: &Network,
        owner: &str,
        status: RecordStatus,
    ) -> Result<AllocationRecord> {
        let payload = NewPrefix {
            prefix: network.to_string(),
            description: owner_description(owner),
            status: &status,
        };
        log::debug!("POST {} prefix={}", self.prefixes, payload.prefix);
        let resp = self
            .send("create", false, || {
                self.client.post(self.prefixes.clone()).json(&payload)
            })
            .await?;
        let resp = Self::expect_status("create", resp, StatusCode::CREATED).await?;
        let created: NetboxPrefix = Self::decode("create", resp).await?;
        Ok(created.into())
    }

    async fn find_record(&self, cidr: &str) -> Result<Option<AllocationRecord>> {
        let url = self.prefixes_with("prefix", cidr);
        let page = self.get_page("find", url).await?;
        Ok(page.results.into_iter().next().map(AllocationRecord::from))
    }

    async fn delete_record(&self, id: u64) -> Result<()> {
        let url = self
            .prefixes
            .join(&format!("{id}/"))
            .map_err(|e| Error::Config(format!("invalid record URL for id {id}: {e}")))?;
        log::debug!("DELETE {url}");
        let resp = self.send("delete", true, || self.client.delete(url.clone())).await?;
        Self::expect_status("delete", resp, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    fn search_records<'a>(&'a self, keyword: &'a str) -> BoxStream<'a, Result<AllocationRecord>> {
        let url = self.prefixes_with("q", keyword);
        self.paginate("search", url)
            .map_ok(AllocationRecord::from)
            .boxed()
    }
}
