//! Paginated access to the products published on a DHuS OData endpoint.
use crate::error::FetchError;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A source of product identifiers that can be read page by page.
pub trait ProductSource {
    /// Returns up to `top` identifiers of products created at or after `since`,
    /// skipping the first `skip` rows.
    async fn fetch_page(
        &self,
        since: &str,
        skip: usize,
        top: usize,
    ) -> Result<Vec<String>, FetchError>;
}

pub struct Dhus {
    client: reqwest::Client,
    products_url: Url,
}

impl Dhus {
    pub fn new(host: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let products_url = products_url(host)?;
        Ok(Self {
            client,
            products_url,
        })
    }

    fn page_url(&self, since: &str, skip: usize, top: usize) -> Url {
        let mut url = self.products_url.clone();
        url.query_pairs_mut()
            .append_pair("$format", "text/csv")
            .append_pair("$select", "Id")
            .append_pair("$skip", &skip.to_string())
            .append_pair("$top", &top.to_string())
            .append_pair("$filter", &format!("CreationDate ge datetime'{since}'"));
        url
    }
}

impl ProductSource for Dhus {
    async fn fetch_page(
        &self,
        since: &str,
        skip: usize,
        top: usize,
    ) -> Result<Vec<String>, FetchError> {
        let url = self.page_url(since, skip, top);
        debug!("GET {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify(e, &url))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| classify(e, &url))?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(parse_csv_ids(&body))
    }
}

fn classify(err: reqwest::Error, url: &Url) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Request(err)
    }
}

fn products_url(host: &str) -> Result<Url, FetchError> {
    let base = format!("{}/odata/v1/Products", host.trim_end_matches('/'));
    Url::parse(&base).map_err(|_| FetchError::InvalidHost(host.to_owned()))
}

/// The CSV response starts with a header row.
fn parse_csv_ids(body: &str) -> Vec<String> {
    body.lines()
        .skip(1)
        .map(str::to_owned)
        .collect()
}
