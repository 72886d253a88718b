//! Binance market source against a mock REST server

use edgex_trader::config::types::ExternalMarketConfig;
use edgex_trader::{BinanceMarketSource, MarketDataSource, PriceSource};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_for(server: &MockServer) -> BinanceMarketSource {
    let config = ExternalMarketConfig {
        spot_url: server.uri(),
        futures_url: server.uri(),
        kline_limit: 3,
        ..Default::default()
    };
    BinanceMarketSource::new(&config).unwrap()
}

fn kline(open_time: i64, close: f64, volume: f64) -> Value {
    json!([
        open_time,
        format!("{}", close - 1.0),
        format!("{}", close + 2.0),
        format!("{}", close - 2.0),
        format!("{}", close),
        format!("{}", volume),
        open_time + 59_999,
        "0",
        10,
        "0",
        "0",
        "0"
    ])
}

async fn mount(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

const TICKER: &str = "/api/v3/ticker/24hr";
const KLINES: &str = "/api/v3/klines";
const PREMIUM: &str = "/fapi/v1/premiumIndex";
const OPEN_INTEREST: &str = "/fapi/v1/openInterest";

/// Mount every snapshot endpoint except `skip`
async fn mount_except(server: &MockServer, skip: &str) {
    let all = [
        (TICKER, ticker_body()),
        (
            KLINES,
            json!([kline(0, 100.0, 5.0), kline(60_000, 101.0, 6.0), kline(120_000, 102.0, 7.0)]),
        ),
        (PREMIUM, premium_body()),
        (OPEN_INTEREST, json!({"symbol": "ETHUSDT", "openInterest": "98765.4"})),
    ];
    for (route, body) in all {
        if route != skip {
            mount(server, route, body).await;
        }
    }
}

fn ticker_body() -> Value {
    json!({
        "symbol": "ETHUSDT",
        "lastPrice": "2000.50",
        "priceChangePercent": "1.25",
        "highPrice": "2050.00",
        "lowPrice": "1950.00",
        "volume": "12345.6",
        "quoteVolume": "24691200.0"
    })
}

fn premium_body() -> Value {
    json!({
        "symbol": "ETHUSDT",
        "markPrice": "2001.00",
        "indexPrice": "1999.50",
        "lastFundingRate": "0.0001",
        "nextFundingTime": 1700000000000i64
    })
}

#[tokio::test]
async fn snapshot_combines_spot_and_futures() {
    let server = MockServer::start().await;
    mount_except(&server, "").await;

    let snapshot = source_for(&server).fetch_snapshot().await.unwrap();

    assert_eq!(snapshot.source, "binance");
    assert_eq!(snapshot.symbol, "ETHUSDT");
    assert_eq!(snapshot.spot.last_price, Some(2000.5));
    assert_eq!(snapshot.spot.price_change_percent, Some(1.25));
    assert_eq!(snapshot.futures.mark_price, Some(2001.0));
    assert_eq!(snapshot.futures.index_price, Some(1999.5));
    assert_eq!(snapshot.futures.basis_spot, Some(1.0));
    assert_eq!(snapshot.futures.next_funding_time, Some(1_700_000_000_000));
    assert_eq!(snapshot.futures.open_interest, Some(98765.4));
    let funding_pct = snapshot.futures.funding_rate_percent.unwrap();
    assert!((funding_pct - 0.01).abs() < 1e-12);

    let change = snapshot.momentum.change_1m.unwrap();
    assert!((change - (102.0 - 101.0) / 101.0 * 100.0).abs() < 1e-9);
    assert!(snapshot.momentum.change_5m.is_none());
}

#[tokio::test]
async fn klines_request_carries_interval_and_limit() {
    let server = MockServer::start().await;
    mount_except(&server, KLINES).await;
    Mock::given(method("GET"))
        .and(path(KLINES))
        .and(query_param("symbol", "ETHUSDT"))
        .and(query_param("interval", "1m"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = source_for(&server).fetch_snapshot().await.unwrap();
    assert!(snapshot.momentum.change_1m.is_none());
}

#[tokio::test]
async fn any_failed_endpoint_fails_the_snapshot() {
    let server = MockServer::start().await;
    mount_except(&server, OPEN_INTEREST).await;
    Mock::given(method("GET"))
        .and(path(OPEN_INTEREST))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(source_for(&server).fetch_snapshot().await.is_err());
}

#[tokio::test]
async fn spot_price_parses_string_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/price"))
        .and(query_param("symbol", "ETHUSDT"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"symbol": "ETHUSDT", "price": "2012.34"})),
        )
        .mount(&server)
        .await;

    assert_eq!(source_for(&server).spot_price().await.unwrap(), Some(2012.34));
}
