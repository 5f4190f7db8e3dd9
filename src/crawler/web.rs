use crate::config::MigrationConfig;
use crate::crawler::extract::extract_page;
use crate::error::MigrateError;
use crate::filter::OriginFilter;
use crate::records::{CrawlOutcome, CrawlVisitState, ItemError, PageRecord};
use fantoccini::{Client, ClientBuilder};
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

/// WebDriver endpoints tried when the configured one is unreachable
const FALLBACK_WEBDRIVER_URLS: &[&str] = &[
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4444", // Selenium/GeckoDriver default
    "http://127.0.0.1:4444", // IP form, for hosts without localhost
];

/// Crawls the configured site with a breadth-expanding traversal.
///
/// The loop repeatedly computes the frontier (discovered same-origin links
/// not yet visited), processes it in bounded-concurrency batches with a
/// pause between batches, and stops once a frontier computation yields
/// nothing new. This converges because the visited set only grows and the
/// discovered set is a superset accumulator.
///
/// A single page failure is appended to the error list and never aborts the
/// run; an unreachable WebDriver is a stage-level failure.
pub async fn crawl(config: &MigrationConfig) -> Result<CrawlOutcome, MigrateError> {
    ::log::info!("Starting crawl of {}", config.site_url);

    let start_url = Url::parse(&config.site_url).map_err(|e| MigrateError::InvalidUrl {
        url: config.site_url.clone(),
        message: e.to_string(),
    })?;
    let filter = OriginFilter::new(&start_url, &config.exclude_patterns).map_err(|e| {
        MigrateError::Config {
            path: "exclude_patterns".into(),
            message: e.to_string(),
        }
    })?;

    let mut state = CrawlVisitState::default();
    let mut pages: Vec<PageRecord> = Vec::new();

    let mut normalized_start = start_url.clone();
    normalized_start.set_fragment(None);
    state.discovered_links.insert(normalized_start.to_string());

    // One WebDriver session per batch slot, grown lazily so a small site
    // never opens five browsers
    let mut clients: Vec<Client> = Vec::new();

    loop {
        let frontier = state.frontier();
        if frontier.is_empty() {
            break;
        }
        ::log::info!("Frontier has {} URLs", frontier.len());

        for chunk in frontier.chunks(config.batch_size.max(1)) {
            // Claim before fetch so a URL can never be enqueued twice, even
            // while its batch is still in flight
            let mut batch: Vec<String> = chunk
                .iter()
                .filter(|url| state.claim(url))
                .cloned()
                .collect();
            if batch.is_empty() {
                continue;
            }

            grow_client_pool(&mut clients, batch.len(), &config.webdriver_url).await?;

            // The pool can come up short of the batch. Unpaired URLs must
            // go back to the frontier, not stay claimed and unfetched.
            while batch.len() > clients.len() {
                if let Some(url) = batch.pop() {
                    ::log::debug!("No session for {} this batch; requeueing", url);
                    state.release(&url);
                }
            }

            let fetches = clients
                .iter_mut()
                .zip(batch.iter())
                .map(|(client, url)| fetch_page(client, url, config, &filter));
            let results = futures::future::join_all(fetches).await;

            for (url, result) in batch.iter().zip(results) {
                match result {
                    Ok(page) => absorb_page(&mut state, &mut pages, page, &filter),
                    Err(message) => {
                        ::log::error!("Failed to crawl {}: {}", url, message);
                        state.errors.push(ItemError {
                            identifier: url.clone(),
                            message,
                        });
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(config.batch_pause_ms)).await;
        }
    }

    for client in clients {
        if let Err(e) = client.close().await {
            ::log::warn!("Failed to close WebDriver session: {}", e);
        }
    }

    ::log::info!(
        "Crawl complete: {} pages, {} image URLs, {} errors",
        pages.len(),
        state.discovered_images.len(),
        state.errors.len()
    );

    Ok(CrawlOutcome {
        pages,
        image_urls: state.discovered_images,
        errors: state.errors,
    })
}

/// Merge one fetched page into the accumulators: record it, feed its
/// same-origin links back into the frontier, and collect its image URLs.
/// Both sets grow through idempotent inserts only.
fn absorb_page(
    state: &mut CrawlVisitState,
    pages: &mut Vec<PageRecord>,
    page: PageRecord,
    filter: &OriginFilter,
) {
    for link in &page.links {
        if let Ok(url) = Url::parse(&link.url) {
            if filter.should_crawl(&url) {
                state.discovered_links.insert(link.url.clone());
            }
        }
    }
    for image in &page.images {
        state.discovered_images.insert(image.url.clone());
    }
    // og:image lives in the head, not the body, so it never shows up in the
    // extracted <img> list
    if let Some(og) = page.meta.og_image.as_deref() {
        if let Ok(base) = Url::parse(&page.url) {
            if let Ok(absolute) = base.join(og) {
                state.discovered_images.insert(absolute.to_string());
            }
        }
    }
    pages.push(page);
}

/// Ensure at least `needed` live sessions exist, up to the batch size.
/// Failing to open the first session is fatal; the run cannot fetch at all.
async fn grow_client_pool(
    clients: &mut Vec<Client>,
    needed: usize,
    webdriver_url: &str,
) -> Result<(), MigrateError> {
    while clients.len() < needed {
        match connect_to_webdriver(webdriver_url).await {
            Some(client) => clients.push(client),
            None if clients.is_empty() => {
                return Err(MigrateError::WebDriverUnavailable {
                    attempted: format!("{webdriver_url}, {}", FALLBACK_WEBDRIVER_URLS.join(", ")),
                });
            }
            None => {
                // Some sessions exist; run the batch with fewer slots
                ::log::warn!(
                    "Could only open {} WebDriver sessions for a batch of {}",
                    clients.len(),
                    needed
                );
                break;
            }
        }
    }
    Ok(())
}

/// Connects to the WebDriver instance, trying common fallback URLs when the
/// configured one refuses
async fn connect_to_webdriver(webdriver_url: &str) -> Option<Client> {
    match ClientBuilder::native().connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Some(client);
        }
        Err(e) => {
            ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
        }
    }

    for url in FALLBACK_WEBDRIVER_URLS {
        if *url == webdriver_url {
            continue;
        }
        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = ClientBuilder::native().connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Some(client);
        }
    }

    ::log::error!(
        "No WebDriver server reachable; set WEBDRIVER_URL or start one at {}",
        webdriver_url
    );
    None
}

/// Fetch and extract one page. Retries once through a fresh session when the
/// WebDriver session was lost mid-run.
async fn fetch_page(
    client: &mut Client,
    url: &str,
    config: &MigrationConfig,
    filter: &OriginFilter,
) -> Result<PageRecord, String> {
    for attempt in 0..2 {
        if attempt > 0 {
            ::log::warn!("Reconnecting WebDriver session for {}", url);
            match ClientBuilder::native().connect(&config.webdriver_url).await {
                Ok(new_client) => {
                    // the server may still hold state for the dead session
                    let old = std::mem::replace(client, new_client);
                    if let Err(e) = old.close().await {
                        ::log::debug!("Closing lost session failed: {}", e);
                    }
                }
                Err(e) => return Err(format!("session lost and reconnect failed: {e}")),
            }
        }

        match render_page(client, url, config).await {
            Ok(html) => {
                let parsed = Url::parse(url).map_err(|e| e.to_string())?;
                return Ok(extract_page(&parsed, &html, &config.content_selectors, filter));
            }
            Err(e) if session_lost(&e) && attempt == 0 => continue,
            Err(e) => return Err(e),
        }
    }
    unreachable!("retry loop returns on the second attempt")
}

/// Navigate, wait out the settle delay for dynamic content, and return the
/// rendered page source. The whole operation runs under the fetch timeout.
async fn render_page(
    client: &mut Client,
    url: &str,
    config: &MigrationConfig,
) -> Result<String, String> {
    let fetch = async {
        client.goto(url).await.map_err(|e| e.to_string())?;
        tokio::time::sleep(Duration::from_millis(config.settle_delay_ms)).await;
        client.source().await.map_err(|e| e.to_string())
    };

    match timeout(Duration::from_secs(config.fetch_timeout_secs), fetch).await {
        Ok(result) => result,
        Err(_) => Err(format!(
            "timed out after {}s",
            config.fetch_timeout_secs
        )),
    }
}

fn session_lost(message: &str) -> bool {
    message.contains("Unable to find session") || message.contains("invalid session id")
}
