//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::errors::{Result, TraderError};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Instrument, sizing and cycle timing
    #[serde(default)]
    pub trading: TradingConfig,
    /// Risk limits
    #[serde(default)]
    pub risk: RiskConfig,
    /// Volatility-scaled order offset
    #[serde(default)]
    pub dynamic_offset: DynamicOffsetConfig,
    /// External market context (Binance)
    #[serde(default)]
    pub external_market: ExternalMarketConfig,
    /// Decision provider endpoint
    #[serde(default)]
    pub decision: DecisionConfig,
    /// Ledger checkpointing
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Paper venue simulation
    #[serde(default)]
    pub venue: PaperVenueConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl AppConfig {
    /// Reject configurations the control loop cannot run with
    pub fn validate(&self) -> Result<()> {
        let t = &self.trading;
        if !(t.quantity.is_finite() && t.quantity > 0.0) {
            return Err(TraderError::Configuration(format!(
                "trading.quantity must be positive, got {}",
                t.quantity
            )));
        }
        if !(t.price_offset.is_finite() && t.price_offset >= 0.0) {
            return Err(TraderError::Configuration(format!(
                "trading.price_offset must be non-negative, got {}",
                t.price_offset
            )));
        }
        if t.price_history_length < 2 {
            return Err(TraderError::Configuration(format!(
                "trading.price_history_length must be at least 2, got {}",
                t.price_history_length
            )));
        }
        if self.risk.daily_loss_limit >= 0.0 {
            return Err(TraderError::Configuration(format!(
                "risk.daily_loss_limit must be negative, got {}",
                self.risk.daily_loss_limit
            )));
        }
        let wait = self.risk.max_order_wait_seconds;
        if !(wait.is_finite() && wait >= 0.0) {
            return Err(TraderError::Configuration(format!(
                "risk.max_order_wait_seconds must be non-negative, got {}",
                wait
            )));
        }
        let o = &self.dynamic_offset;
        if o.min_offset < 0.0 || o.max_offset < o.min_offset {
            return Err(TraderError::Configuration(format!(
                "dynamic_offset bounds are invalid: min {} max {}",
                o.min_offset, o.max_offset
            )));
        }

        for (name, value) in [
            ("decision.endpoint", &self.decision.endpoint),
            ("external_market.spot_url", &self.external_market.spot_url),
            ("external_market.futures_url", &self.external_market.futures_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                TraderError::Configuration(format!("{} is not a valid URL ({}): {}", name, value, e))
            })?;
        }

        Ok(())
    }
}

/// Instrument, sizing and cycle timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Instrument identifier sent to the decision provider
    #[serde(default = "default_ticker")]
    pub ticker: String,
    /// Order size for opening orders
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    /// Static limit-price offset as a fraction of price
    #[serde(default = "default_price_offset")]
    pub price_offset: f64,
    /// Delay between cycles while the history is filling, in seconds
    #[serde(default = "default_collect_interval")]
    pub collect_interval_sec: u64,
    /// Lower bound of the randomised trading interval, in minutes
    #[serde(default = "default_min_interval")]
    pub min_interval_min: u64,
    /// Upper bound of the randomised trading interval, in minutes
    #[serde(default = "default_max_interval")]
    pub max_interval_min: u64,
    /// Number of prices kept for indicators
    #[serde(default = "default_history_length")]
    pub price_history_length: usize,
    /// Backoff after a failed price observation, in seconds
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_sec: u64,
    /// Upper bound on every external call, in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_sec: u64,
}

impl TradingConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_sec.max(1))
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            ticker: default_ticker(),
            quantity: default_quantity(),
            price_offset: default_price_offset(),
            collect_interval_sec: default_collect_interval(),
            min_interval_min: default_min_interval(),
            max_interval_min: default_max_interval(),
            price_history_length: default_history_length(),
            retry_backoff_sec: default_retry_backoff(),
            call_timeout_sec: default_call_timeout(),
        }
    }
}

fn default_ticker() -> String {
    "ETHUSD".to_string()
}

fn default_quantity() -> f64 {
    0.02
}

fn default_price_offset() -> f64 {
    0.001
}

fn default_collect_interval() -> u64 {
    5
}

fn default_min_interval() -> u64 {
    1
}

fn default_max_interval() -> u64 {
    4
}

fn default_history_length() -> usize {
    20
}

fn default_retry_backoff() -> u64 {
    10
}

fn default_call_timeout() -> u64 {
    15
}

/// Risk limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Master switch; disabled means no exits, pauses or stale cleanup
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Unrealized loss (percent) that triggers a stop-loss exit
    #[serde(default = "default_stop_loss")]
    pub stop_loss_pct: f64,
    /// Unrealized gain (percent) that triggers a take-profit exit
    #[serde(default = "default_take_profit")]
    pub take_profit_pct: f64,
    /// Maximum time a position is held, in minutes
    #[serde(default = "default_max_hold")]
    pub max_hold_minutes: f64,
    /// Age after which a resting order is considered stale, in seconds
    #[serde(default = "default_max_order_wait")]
    pub max_order_wait_seconds: f64,
    /// Consecutive identical signals required before opening
    #[serde(default = "default_signal_confirmation")]
    pub signal_confirmation_count: u32,
    /// Daily realized PnL at or below which trading pauses (negative)
    #[serde(default = "default_daily_loss_limit")]
    pub daily_loss_limit: f64,
    /// Losing closes in a row that trigger a pause (0 disables)
    #[serde(default = "default_max_consecutive_losses")]
    pub max_consecutive_losses: u32,
    /// Length of a risk pause, in minutes
    #[serde(default = "default_pause_minutes")]
    pub pause_minutes_on_breach: f64,
    /// Keep cancelling stale orders while a risk pause is active
    #[serde(default)]
    pub cancel_stale_while_paused: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stop_loss_pct: default_stop_loss(),
            take_profit_pct: default_take_profit(),
            max_hold_minutes: default_max_hold(),
            max_order_wait_seconds: default_max_order_wait(),
            signal_confirmation_count: default_signal_confirmation(),
            daily_loss_limit: default_daily_loss_limit(),
            max_consecutive_losses: default_max_consecutive_losses(),
            pause_minutes_on_breach: default_pause_minutes(),
            cancel_stale_while_paused: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_stop_loss() -> f64 {
    0.6
}

fn default_take_profit() -> f64 {
    1.0
}

fn default_max_hold() -> f64 {
    30.0
}

fn default_max_order_wait() -> f64 {
    60.0
}

fn default_signal_confirmation() -> u32 {
    1
}

fn default_daily_loss_limit() -> f64 {
    -30.0
}

fn default_max_consecutive_losses() -> u32 {
    3
}

fn default_pause_minutes() -> f64 {
    60.0
}

/// Volatility-scaled order offset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicOffsetConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Multiplier applied to volatility (as a fraction)
    #[serde(default = "default_volatility_factor")]
    pub volatility_factor: f64,
    #[serde(default = "default_min_offset")]
    pub min_offset: f64,
    #[serde(default = "default_max_offset")]
    pub max_offset: f64,
    /// Used when volatility is unknown or zero
    #[serde(default = "default_fallback_offset")]
    pub fallback_offset: f64,
}

impl Default for DynamicOffsetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volatility_factor: default_volatility_factor(),
            min_offset: default_min_offset(),
            max_offset: default_max_offset(),
            fallback_offset: default_fallback_offset(),
        }
    }
}

fn default_volatility_factor() -> f64 {
    0.8
}

fn default_min_offset() -> f64 {
    0.0002
}

fn default_max_offset() -> f64 {
    0.0015
}

fn default_fallback_offset() -> f64 {
    0.001
}

/// External market context configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalMarketConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Spot symbol, e.g. ETHUSDT
    #[serde(default = "default_external_symbol")]
    pub symbol: String,
    /// Perpetual symbol; defaults to the spot symbol
    #[serde(default)]
    pub futures_symbol: Option<String>,
    /// Cache time-to-live, in seconds
    #[serde(default = "default_external_ttl")]
    pub ttl_sec: u64,
    #[serde(default = "default_kline_interval")]
    pub kline_interval: String,
    #[serde(default = "default_kline_limit")]
    pub kline_limit: u32,
    /// Per-request timeout, in milliseconds
    #[serde(default = "default_external_timeout")]
    pub timeout_ms: u64,
    /// Base URL for the spot REST API
    #[serde(default = "default_spot_url")]
    pub spot_url: String,
    /// Base URL for the futures REST API
    #[serde(default = "default_futures_url")]
    pub futures_url: String,
}

impl ExternalMarketConfig {
    pub fn futures_symbol(&self) -> String {
        self.futures_symbol
            .clone()
            .unwrap_or_else(|| self.symbol.clone())
            .to_uppercase()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_sec)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

impl Default for ExternalMarketConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            symbol: default_external_symbol(),
            futures_symbol: None,
            ttl_sec: default_external_ttl(),
            kline_interval: default_kline_interval(),
            kline_limit: default_kline_limit(),
            timeout_ms: default_external_timeout(),
            spot_url: default_spot_url(),
            futures_url: default_futures_url(),
        }
    }
}

fn default_external_symbol() -> String {
    "ETHUSDT".to_string()
}

fn default_external_ttl() -> u64 {
    10
}

fn default_kline_interval() -> String {
    "1m".to_string()
}

fn default_kline_limit() -> u32 {
    300
}

fn default_external_timeout() -> u64 {
    10_000
}

fn default_spot_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_futures_url() -> String {
    "https://fapi.binance.com".to_string()
}

/// Decision provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// URL the feature payload is POSTed to
    #[serde(default = "default_decision_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds
    #[serde(default = "default_decision_timeout")]
    pub timeout_seconds: u64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_decision_endpoint(),
            timeout_seconds: default_decision_timeout(),
        }
    }
}

fn default_decision_endpoint() -> String {
    "http://127.0.0.1:12345/ai-decision".to_string()
}

fn default_decision_timeout() -> u64 {
    10
}

/// Ledger checkpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// File the checkpoint is written to
    #[serde(default = "default_checkpoint_path")]
    pub path: String,
    /// Checkpoints older than this are ignored at startup, in minutes
    #[serde(default = "default_checkpoint_max_age")]
    pub max_age_minutes: i64,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_checkpoint_path(),
            max_age_minutes: default_checkpoint_max_age(),
        }
    }
}

fn default_checkpoint_path() -> String {
    "state/ledger.json".to_string()
}

fn default_checkpoint_max_age() -> i64 {
    10
}

/// Paper venue simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperVenueConfig {
    /// Decimals the venue displays prices with
    #[serde(default = "default_price_precision")]
    pub price_precision: u32,
    /// Decimals the venue displays quantities with
    #[serde(default = "default_quantity_precision")]
    pub quantity_precision: u32,
}

impl Default for PaperVenueConfig {
    fn default() -> Self {
        Self {
            price_precision: default_price_precision(),
            quantity_precision: default_quantity_precision(),
        }
    }
}

fn default_price_precision() -> u32 {
    2
}

fn default_quantity_precision() -> u32 {
    4
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON log lines
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
