use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::range::TimeWindow;
use super::traits::PriceDataSource;

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const PROVIDER: &str = "CoinGecko";
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// CoinGecko API source for coin and global market history.
///
/// - **Free**: No API key required for the public endpoints used here.
/// - **Endpoints**: `/coins/{id}/market_chart/range`, `/global/market_cap_chart`, `/search`
///
/// CoinGecko addresses coins by id ("bitcoin"), not by symbol. Common symbols
/// are seeded; anything else is resolved through `/search` and remembered.
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
    /// Map from uppercase symbol (BTC) to CoinGecko id (bitcoin).
    symbol_map: Mutex<HashMap<String, String>>,
}

impl CoinGeckoProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the source at a different API root (mirrors, local test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut symbol_map = HashMap::new();
        let common = [
            ("BTC", "bitcoin"),
            ("ETH", "ethereum"),
            ("USDT", "tether"),
            ("USDC", "usd-coin"),
            ("BNB", "binancecoin"),
            ("XRP", "ripple"),
            ("ADA", "cardano"),
            ("SOL", "solana"),
            ("DOGE", "dogecoin"),
            ("DOT", "polkadot"),
            ("LTC", "litecoin"),
            ("AVAX", "avalanche-2"),
            ("LINK", "chainlink"),
            ("UNI", "uniswap"),
            ("ATOM", "cosmos"),
            ("XLM", "stellar"),
            ("TRX", "tron"),
            ("XMR", "monero"),
            ("ETC", "ethereum-classic"),
            ("ZEC", "zcash"),
        ];
        for (sym, id) in common {
            symbol_map.insert(sym.to_string(), id.to_string());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            symbol_map: Mutex::new(symbol_map),
        }
    }

    /// Resolve a symbol like "BTC" to a CoinGecko id, searching the API on a miss.
    async fn resolve_id(&self, symbol: &str, name: &str) -> Result<String, CoreError> {
        let upper = symbol.to_uppercase();

        {
            let map = self.symbol_map.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(id) = map.get(&upper) {
                return Ok(id.clone());
            }
        }

        let query = if name.is_empty() { symbol } else { name };
        let url = format!("{}/search", self.base_url);
        let resp: SearchResponse = self
            .client
            .get(&url)
            .query(&[("query", query)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| api_error(format!("Failed to search for {upper}: {e}")))?;

        let id = pick_search_match(&resp.coins, &upper, name)
            .ok_or_else(|| api_error(format!("No CoinGecko coin found for symbol {upper}")))?;
        debug!(symbol = %upper, id = %id, "resolved coin id");

        let mut map = self.symbol_map.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(upper, id.clone());
        Ok(id)
    }
}

impl Default for CoinGeckoProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── CoinGecko API response types ────────────────────────────────────

#[derive(Deserialize)]
struct MarketChartResponse {
    prices: Vec<[f64; 2]>,
}

#[derive(Deserialize)]
struct GlobalChartResponse {
    market_cap_chart: GlobalChartData,
}

#[derive(Deserialize)]
struct GlobalChartData {
    market_cap: Vec<[f64; 2]>,
}

#[derive(Deserialize)]
struct SearchResponse {
    coins: Vec<SearchEntry>,
}

#[derive(Deserialize)]
struct SearchEntry {
    id: String,
    symbol: String,
    name: String,
}

fn api_error(message: String) -> CoreError {
    CoreError::Api {
        provider: PROVIDER.into(),
        message,
    }
}

/// Prefer an exact symbol + name match, then the first symbol match.
fn pick_search_match(coins: &[SearchEntry], upper_symbol: &str, name: &str) -> Option<String> {
    let by_symbol = || coins.iter().filter(move |c| c.symbol.eq_ignore_ascii_case(upper_symbol));
    by_symbol()
        .find(|c| !name.is_empty() && c.name.eq_ignore_ascii_case(name))
        .or_else(|| by_symbol().next())
        .map(|c| c.id.clone())
}

/// `[timestamp_ms, value]` pairs as returned by every chart endpoint.
fn to_points(raw: &[[f64; 2]]) -> Vec<PricePoint> {
    raw.iter()
        .filter(|[_, value]| value.is_finite())
        .map(|[ts, value]| PricePoint::new(*ts as i64, *value))
        .collect()
}

/// The global chart endpoint takes a whole number of days, at least one.
fn days_for(window: TimeWindow) -> i64 {
    let secs = window.duration().num_seconds().max(0);
    ((secs + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY).max(1)
}

#[async_trait]
impl PriceDataSource for CoinGeckoProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn global_series(
        &self,
        currency: &str,
        window: TimeWindow,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let url = format!("{}/global/market_cap_chart", self.base_url);
        let days = days_for(window).to_string();

        let resp: GlobalChartResponse = self
            .client
            .get(&url)
            .query(&[("vs_currency", currency.to_lowercase().as_str()), ("days", days.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| api_error(format!("Failed to parse global market chart: {e}")))?;

        Ok(to_points(&resp.market_cap_chart.market_cap))
    }

    async fn asset_series(
        &self,
        currency: &str,
        symbol: &str,
        name: &str,
        window: TimeWindow,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let id = self.resolve_id(symbol, name).await?;
        let url = format!("{}/coins/{id}/market_chart/range", self.base_url);
        let from = window.start.to_string();
        let to = window.end.to_string();

        let resp: MarketChartResponse = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", currency.to_lowercase().as_str()),
                ("from", from.as_str()),
                ("to", to.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| api_error(format!("Failed to parse market chart for {symbol}: {e}")))?;

        Ok(to_points(&resp.prices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, symbol: &str, name: &str) -> SearchEntry {
        SearchEntry {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
        }
    }

    #[test]
    fn days_round_up_and_floor_at_one() {
        assert_eq!(days_for(TimeWindow { start: 0, end: 60 }), 1);
        assert_eq!(days_for(TimeWindow { start: 0, end: SECONDS_PER_DAY }), 1);
        assert_eq!(days_for(TimeWindow { start: 0, end: SECONDS_PER_DAY + 1 }), 2);
    }

    #[test]
    fn non_finite_samples_are_dropped() {
        let points = to_points(&[[1000.0, 1.5], [2000.0, f64::NAN], [3000.0, 2.5]]);
        assert_eq!(points, vec![PricePoint::new(1000, 1.5), PricePoint::new(3000, 2.5)]);
    }

    #[test]
    fn search_prefers_name_match() {
        let coins = vec![
            entry("fake-btc", "BTC", "Bitcoin Fake"),
            entry("bitcoin", "btc", "Bitcoin"),
        ];
        assert_eq!(pick_search_match(&coins, "BTC", "Bitcoin"), Some("bitcoin".into()));
        assert_eq!(pick_search_match(&coins, "BTC", ""), Some("fake-btc".into()));
        assert_eq!(pick_search_match(&coins, "ETH", ""), None);
    }

    #[test]
    fn seeded_symbols_resolve_offline() {
        let provider = CoinGeckoProvider::with_base_url("http://localhost:1/");
        assert_eq!(provider.base_url, "http://localhost:1");
        let map = provider.symbol_map.lock().unwrap();
        assert_eq!(map.get("BTC").map(String::as_str), Some("bitcoin"));
    }
}
