//! REST fetcher for Binance spot and futures market context

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::snapshot::{compute_momentum, FuturesSnapshot, Kline, MarketSnapshot, SpotTicker};
use crate::common::errors::{Result, TraderError};
use crate::common::numeric::{from_json, from_json_opt};
use crate::common::traits::{MarketDataSource, PriceSource};
use crate::config::types::ExternalMarketConfig;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerResponse {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    last_price: Option<Value>,
    #[serde(default)]
    price_change_percent: Option<Value>,
    #[serde(default)]
    high_price: Option<Value>,
    #[serde(default)]
    low_price: Option<Value>,
    #[serde(default)]
    volume: Option<Value>,
    #[serde(default)]
    quote_volume: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PremiumIndexResponse {
    #[serde(default)]
    mark_price: Option<Value>,
    #[serde(default)]
    index_price: Option<Value>,
    #[serde(default)]
    last_funding_rate: Option<Value>,
    #[serde(default)]
    next_funding_time: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenInterestResponse {
    #[serde(default)]
    open_interest: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: Value,
}

/// Binance REST client producing [`MarketSnapshot`]s
#[derive(Debug, Clone)]
pub struct BinanceMarketSource {
    client: Client,
    spot_url: String,
    futures_url: String,
    symbol: String,
    futures_symbol: String,
    kline_interval: String,
    kline_limit: u32,
}

impl BinanceMarketSource {
    pub fn new(config: &ExternalMarketConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent("edgex-trader/0.1")
            .build()
            .map_err(|e| TraderError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            spot_url: config.spot_url.trim_end_matches('/').to_string(),
            futures_url: config.futures_url.trim_end_matches('/').to_string(),
            symbol: config.symbol.to_uppercase(),
            futures_symbol: config.futures_symbol(),
            kline_interval: config.kline_interval.clone(),
            kline_limit: config.kline_limit,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TraderError::InvalidResponse(format!(
                "Binance returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    async fn ticker(&self) -> Result<TickerResponse> {
        let url = format!("{}/api/v3/ticker/24hr?symbol={}", self.spot_url, self.symbol);
        self.get_json(&url).await
    }

    async fn klines(&self) -> Result<Vec<Kline>> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.spot_url, self.symbol, self.kline_interval, self.kline_limit
        );
        let rows: Vec<Vec<Value>> = self.get_json(&url).await?;
        Ok(rows.iter().map(|row| parse_kline(row)).collect())
    }

    async fn premium_index(&self) -> Result<PremiumIndexResponse> {
        let url = format!(
            "{}/fapi/v1/premiumIndex?symbol={}",
            self.futures_url, self.futures_symbol
        );
        self.get_json(&url).await
    }

    async fn open_interest(&self) -> Result<OpenInterestResponse> {
        let url = format!(
            "{}/fapi/v1/openInterest?symbol={}",
            self.futures_url, self.futures_symbol
        );
        self.get_json(&url).await
    }
}

/// Kline rows are positional: [openTime, open, high, low, close, volume, ...]
fn parse_kline(row: &[Value]) -> Kline {
    let field = |i: usize| row.get(i).and_then(from_json);
    Kline {
        open_time: row.first().and_then(|v| v.as_i64()),
        open: field(1),
        high: field(2),
        low: field(3),
        close: field(4),
        volume: field(5),
    }
}

fn build_snapshot(
    fallback_symbol: &str,
    ticker: TickerResponse,
    klines: &[Kline],
    premium: PremiumIndexResponse,
    open_interest: OpenInterestResponse,
) -> MarketSnapshot {
    let spot = SpotTicker {
        last_price: from_json_opt(ticker.last_price.as_ref()),
        price_change_percent: from_json_opt(ticker.price_change_percent.as_ref()),
        high_price: from_json_opt(ticker.high_price.as_ref()),
        low_price: from_json_opt(ticker.low_price.as_ref()),
        volume_24h: from_json_opt(ticker.volume.as_ref()),
        quote_volume_24h: from_json_opt(ticker.quote_volume.as_ref()),
    };

    let index_price = from_json_opt(premium.index_price.as_ref());
    let funding_rate = from_json_opt(premium.last_funding_rate.as_ref());
    let futures = FuturesSnapshot {
        mark_price: from_json_opt(premium.mark_price.as_ref()),
        index_price,
        funding_rate,
        funding_rate_percent: funding_rate.map(|r| r * 100.0),
        next_funding_time: from_json_opt(premium.next_funding_time.as_ref()).map(|t| t as i64),
        basis_spot: match (spot.last_price, index_price) {
            (Some(s), Some(i)) => Some(s - i),
            _ => None,
        },
        open_interest: from_json_opt(open_interest.open_interest.as_ref()),
    };

    MarketSnapshot {
        source: "binance".to_string(),
        symbol: ticker.symbol.unwrap_or_else(|| fallback_symbol.to_string()),
        fetched_at: chrono::Utc::now(),
        spot,
        momentum: compute_momentum(klines),
        futures,
    }
}

#[async_trait]
impl MarketDataSource for BinanceMarketSource {
    #[instrument(skip(self))]
    async fn fetch_snapshot(&self) -> Result<MarketSnapshot> {
        let (ticker, klines, premium, open_interest) = tokio::try_join!(
            self.ticker(),
            self.klines(),
            self.premium_index(),
            self.open_interest()
        )?;

        Ok(build_snapshot(
            &self.symbol,
            ticker,
            &klines,
            premium,
            open_interest,
        ))
    }
}

#[async_trait]
impl PriceSource for BinanceMarketSource {
    #[instrument(skip(self))]
    async fn spot_price(&self) -> Result<Option<f64>> {
        let url = format!("{}/api/v3/ticker/price?symbol={}", self.spot_url, self.symbol);
        let response: PriceResponse = self.get_json(&url).await?;
        Ok(from_json(&response.price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_creation_normalizes_urls() {
        let config = ExternalMarketConfig {
            spot_url: "https://api.binance.com/".to_string(),
            ..Default::default()
        };
        let source = BinanceMarketSource::new(&config).unwrap();
        assert!(!source.spot_url.ends_with('/'));
        assert_eq!(source.futures_symbol, "ETHUSDT");
    }

    #[test]
    fn test_parse_kline_row() {
        let row = vec![
            json!(1700000000000i64),
            json!("100.0"),
            json!("101.5"),
            json!("99.5"),
            json!("100.8"),
            json!("12.3"),
            json!(1700000059999i64),
        ];
        let kline = parse_kline(&row);
        assert_eq!(kline.open_time, Some(1700000000000));
        assert_eq!(kline.high, Some(101.5));
        assert_eq!(kline.close, Some(100.8));
        assert_eq!(kline.volume, Some(12.3));

        let short = parse_kline(&[json!(1)]);
        assert_eq!(short.close, None);
    }

    #[test]
    fn test_build_snapshot_derives_funding_and_basis() {
        let ticker: TickerResponse = serde_json::from_value(json!({
            "symbol": "ETHUSDT",
            "lastPrice": "2500.00",
            "priceChangePercent": "1.25",
            "volume": "1000"
        }))
        .unwrap();
        let premium: PremiumIndexResponse = serde_json::from_value(json!({
            "markPrice": "2501.00",
            "indexPrice": "2499.00",
            "lastFundingRate": "0.0001",
            "nextFundingTime": 1700003600000i64
        }))
        .unwrap();
        let oi: OpenInterestResponse =
            serde_json::from_value(json!({"openInterest": "12345.6"})).unwrap();

        let snapshot = build_snapshot("ETHUSDT", ticker, &[], premium, oi);
        assert_eq!(snapshot.spot.last_price, Some(2500.0));
        assert_eq!(snapshot.futures.basis_spot, Some(1.0));
        assert!((snapshot.futures.funding_rate_percent.unwrap() - 0.01).abs() < 1e-12);
        assert_eq!(snapshot.futures.next_funding_time, Some(1700003600000));
        assert_eq!(snapshot.futures.open_interest, Some(12345.6));
        assert_eq!(snapshot.momentum, Default::default());
    }
}
