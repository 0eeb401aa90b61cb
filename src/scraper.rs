use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use url::Url;

use crate::config::{ScraperConfig, SelectorConfig};
use crate::models::{Listing, SearchParameters};
use crate::utils::error::{AppError, Result};

/// Retrieves the raw page for a search URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String>;
}

/// Plain GET with no retry. Non-2xx responses are returned like any other.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        let start_time = std::time::Instant::now();
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Search page {} answered {}, parsing body anyway", url, status);
        }

        let body = response.text().await?;
        tracing::debug!(
            "Fetched {} ({} bytes) in {}ms",
            url,
            body.len(),
            start_time.elapsed().as_millis()
        );
        Ok(body)
    }
}

/// Appends every parameter to `base_url` as an encoded query pair, in order.
pub fn build_search_url(base_url: &str, params: &SearchParameters) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

/// Pulls `{title, price}` records out of a results page.
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    item: Selector,
    title: Selector,
    price: Selector,
    title_css: String,
    price_css: String,
}

impl ListingExtractor {
    pub fn new(selectors: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            item: parse_selector(&selectors.item)?,
            title: parse_selector(&selectors.title)?,
            price: parse_selector(&selectors.price)?,
            title_css: selectors.title.clone(),
            price_css: selectors.price.clone(),
        })
    }

    /// Listings in document order. Any item lacking a title or price fails
    /// the whole page.
    pub fn extract(&self, html: &str) -> Result<Vec<Listing>> {
        let document = Html::parse_document(html);

        let mut listings = Vec::new();
        for item in document.select(&self.item) {
            let title = select_text(item, &self.title, &self.title_css)?;
            let price = select_text(item, &self.price, &self.price_css)?;
            listings.push(Listing { title, price });
        }

        tracing::debug!("Extracted {} listings", listings.len());
        Ok(listings)
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::Parse {
        message: format!("Invalid CSS selector '{}': {:?}", css, e),
    })
}

fn select_text(item: ElementRef<'_>, selector: &Selector, css: &str) -> Result<String> {
    let element = item
        .select(selector)
        .next()
        .ok_or_else(|| AppError::ElementNotFound {
            selector: css.to_string(),
        })?;
    Ok(element.text().collect())
}
