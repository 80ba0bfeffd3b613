use std::time::Duration;

use crate::parser::{ScrapeError, parse_results_page};
use crate::types::Inspection;

use futures::stream::{self, Stream, TryStreamExt};
use reqwest::Client;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Failed to scrape page {page} for zip code {zipcode}: {source}")]
    ScrapeError {
        zipcode: String,
        page: u32,
        #[source]
        source: ScrapeError,
    },
}

/// Source of raw result pages for one search.
///
/// The first page is produced by submitting the search form; later pages are
/// addressed by number only and rely on whatever session state the first
/// request established.
pub trait PageFetcher {
    fn search(&self, zipcode: &str) -> impl Future<Output = Result<String, ScraperError>>;
    fn page(&self, page: u32) -> impl Future<Output = Result<String, ScraperError>>;
}

/// A cookie-carrying HTTP session for a single search. Dropping it releases
/// the underlying connections.
#[derive(Debug)]
pub struct SearchSession {
    client: Client,
    base_url: String,
}

impl SearchSession {
    async fn read_body(&self, response: reqwest::Response) -> Result<String, ScraperError> {
        Ok(response
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}

impl PageFetcher for SearchSession {
    async fn search(&self, zipcode: &str) -> Result<String, ScraperError> {
        let form = [
            ("NAME", ""),
            ("STNO", ""),
            ("STNAME", ""),
            ("ZIP", zipcode),
            ("Submit", "Search+Scores"),
        ];

        let response = self
            .client
            .post(&self.base_url)
            .form(&form)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;
        self.read_body(response).await
    }

    async fn page(&self, page: u32) -> Result<String, ScraperError> {
        let url = format!("{}?{}={}", self.base_url, crate::PAGE_PARAM, page);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;
        self.read_body(response).await
    }
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    base_url: String,
    timeout: Duration,
}

impl Default for WebScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl WebScraper {
    pub fn new() -> Self {
        Self::with_base_url(crate::BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Open a fresh session with its own cookie jar.
    pub fn session(&self) -> Result<SearchSession, ScraperError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .cookie_store(true)
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(SearchSession {
            client,
            base_url: self.base_url.clone(),
        })
    }

    /// All inspections listed for `zipcode`, fetched page by page as the
    /// stream is polled.
    pub fn inspections_by_zipcode(
        &self,
        zipcode: &str,
    ) -> Result<impl Stream<Item = Result<Inspection, ScraperError>>, ScraperError> {
        log::info!("Fetching inspections for zip code {}...", zipcode);
        Ok(paginate(self.session()?, zipcode))
    }
}

/// Walk the result pages of one search until a page has no "Next" link.
///
/// The returned stream is lazy and cannot be restarted; the first error ends it.
pub fn paginate<F: PageFetcher>(
    fetcher: F,
    zipcode: &str,
) -> impl Stream<Item = Result<Inspection, ScraperError>> + use<F> {
    let zipcode = zipcode.to_string();

    stream::try_unfold(
        (fetcher, zipcode, Some(1u32)),
        |(fetcher, zipcode, next)| async move {
            let Some(page) = next else {
                return Ok::<_, ScraperError>(None);
            };

            log::debug!("fetching page {} for zip {}", page, zipcode);
            let html = if page == 1 {
                fetcher.search(&zipcode).await?
            } else {
                fetcher.page(page).await?
            };

            let results = parse_results_page(&html).map_err(|source| {
                ScraperError::ScrapeError {
                    zipcode: zipcode.clone(),
                    page,
                    source,
                }
            })?;
            log::debug!(
                "page {} for zip {} had {} inspections",
                page,
                zipcode,
                results.inspections.len()
            );

            let next = results.has_next.then_some(page + 1);
            let batch = stream::iter(
                results
                    .inspections
                    .into_iter()
                    .map(Ok::<Inspection, ScraperError>),
            );
            Ok(Some((batch, (fetcher, zipcode, next))))
        },
    )
    .try_flatten()
}
