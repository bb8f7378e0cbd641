use crate::error::AppError;
use crate::market::INTEREST_FRAME_TYPE;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ANNOUNCE_INTERVAL_MS: u64 = 1_000;
pub const MIN_ANNOUNCE_INTERVAL_MS: u64 = 250;
pub const MAX_ANNOUNCE_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_PERIOD_TYPE: PeriodType = PeriodType::OneDay;

/// Chart granularity. The two intraday periods carry a time component in
/// their bucket keys; the coarser ones bucket by date alone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PeriodType {
    #[serde(rename = "1day")]
    OneDay,
    #[serde(rename = "1week")]
    OneWeek,
    #[serde(rename = "3month")]
    ThreeMonths,
    #[serde(rename = "1year")]
    OneYear,
    #[serde(rename = "5year")]
    FiveYears,
}

impl PeriodType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "1day",
            Self::OneWeek => "1week",
            Self::ThreeMonths => "3month",
            Self::OneYear => "1year",
            Self::FiveYears => "5year",
        }
    }

    pub fn parse_str(value: &str) -> Result<Self, AppError> {
        match value {
            "1day" => Ok(Self::OneDay),
            "1week" => Ok(Self::OneWeek),
            "3month" => Ok(Self::ThreeMonths),
            "1year" => Ok(Self::OneYear),
            "5year" => Ok(Self::FiveYears),
            other => Err(AppError::InvalidArgument(format!(
                "unknown period type '{other}'"
            ))),
        }
    }

    pub fn is_intraday(self) -> bool {
        matches!(self, Self::OneDay | Self::OneWeek)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MarketType {
    #[serde(rename = "KOSPI")]
    Kospi,
    #[serde(rename = "KOSDAQ")]
    Kosdaq,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeSign {
    Fall,
    Rise,
    UpperLimit,
    LowerLimit,
    Even,
}

impl ChangeSign {
    pub fn parse_str(value: &str) -> Option<Self> {
        match value {
            "FALL" => Some(Self::Fall),
            "RISE" => Some(Self::Rise),
            "UPPER_LIMIT" => Some(Self::UpperLimit),
            "LOWER_LIMIT" => Some(Self::LowerLimit),
            "EVEN" => Some(Self::Even),
            _ => None,
        }
    }
}

/// One OHLCV bucket. `time` is present only for intraday granularities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: f64,
    pub amount: f64,
}

impl Candle {
    pub fn from_tick(date: String, time: Option<String>, price: f64, volume: f64, amount: f64) -> Self {
        Self {
            date,
            time,
            open_price: price,
            high_price: price,
            low_price: price,
            close_price: price,
            volume,
            amount,
        }
    }

    /// Folds one more tick into an open bucket. Volume and amount are
    /// running cumulative totals reported by the feed, so they replace the
    /// stored values instead of accumulating.
    pub fn apply_tick(&mut self, price: f64, volume: f64, amount: f64) {
        self.high_price = self.high_price.max(price);
        self.low_price = self.low_price.min(price);
        self.close_price = price;
        self.volume = volume;
        self.amount = amount;
    }

    /// `"date"` or `"date time"` marker identifying this candle's bucket.
    pub fn start_marker(&self) -> String {
        match &self.time {
            Some(time) => format!("{} {}", self.date, time),
            None => self.date.clone(),
        }
    }
}

/// Full per-instrument detail snapshot from the REST API. List endpoints
/// return the base fields only; the detail endpoint fills in the rest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockSnapshot {
    pub stock_code: String,
    pub stock_name: String,
    pub market_type: MarketType,
    pub current_price: f64,
    pub change_rate: f64,
    pub change_sign: ChangeSign,
    #[serde(default)]
    pub change_amount: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub per: Option<f64>,
    #[serde(default)]
    pub eps: Option<f64>,
    #[serde(default)]
    pub pbr: Option<f64>,
    #[serde(default)]
    pub face_value: Option<f64>,
    #[serde(default)]
    pub high_price: Option<f64>,
    #[serde(default)]
    pub low_price: Option<f64>,
    #[serde(default)]
    pub open_price: Option<f64>,
    #[serde(default)]
    pub previous_close_price: Option<f64>,
}

/// Raw push-feed tick frame. The feed omits unchanged fields as empty
/// strings rather than proper optionals, so every text field defaults.
#[derive(Debug, Deserialize)]
pub struct TickerDeltaWire {
    #[serde(default)]
    pub stock_code: String,
    #[serde(default)]
    pub stock_name: String,
    #[serde(default)]
    pub market_type: String,
    #[serde(default)]
    pub current_price: String,
    #[serde(default)]
    pub change_rate: String,
    #[serde(default)]
    pub change_amount: String,
    #[serde(default)]
    pub change_sign: String,
    #[serde(default)]
    pub volume: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Decoded tick frame: empty wire fields become `None`, so downstream merge
/// logic never has to re-check the "empty string means absent" convention.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerDelta {
    pub stock_code: Option<String>,
    pub stock_name: Option<String>,
    pub market_type: Option<String>,
    pub current_price: Option<String>,
    pub change_rate: Option<String>,
    pub change_amount: Option<String>,
    pub change_sign: Option<String>,
    pub volume: Option<String>,
    pub amount: Option<String>,
    pub timestamp_ms: Option<i64>,
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_finite(field: &Option<String>) -> Option<f64> {
    field
        .as_deref()
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

impl From<TickerDeltaWire> for TickerDelta {
    fn from(wire: TickerDeltaWire) -> Self {
        Self {
            stock_code: non_empty(wire.stock_code),
            stock_name: non_empty(wire.stock_name),
            market_type: non_empty(wire.market_type),
            current_price: non_empty(wire.current_price),
            change_rate: non_empty(wire.change_rate),
            change_amount: non_empty(wire.change_amount),
            change_sign: non_empty(wire.change_sign),
            volume: non_empty(wire.volume),
            amount: non_empty(wire.amount),
            timestamp_ms: wire.timestamp,
        }
    }
}

impl TickerDelta {
    pub fn price(&self) -> Option<f64> {
        parse_finite(&self.current_price)
    }

    pub fn change_rate_f64(&self) -> Option<f64> {
        parse_finite(&self.change_rate)
    }

    pub fn change_amount_f64(&self) -> Option<f64> {
        parse_finite(&self.change_amount)
    }

    pub fn volume_f64(&self) -> Option<f64> {
        parse_finite(&self.volume)
    }

    pub fn amount_f64(&self) -> Option<f64> {
        parse_finite(&self.amount)
    }
}

pub fn decode_tick_frame(payload: &mut [u8]) -> Result<TickerDelta, AppError> {
    let wire: TickerDeltaWire = simd_json::serde::from_slice(payload)?;
    Ok(wire.into())
}

/// Outbound interest-list announcement: `{"type":"TICKERS","tickers":[...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterestFrame {
    #[serde(rename = "type")]
    pub kind: String,
    pub tickers: Vec<String>,
}

impl InterestFrame {
    pub fn new(tickers: Vec<String>) -> Self {
        Self {
            kind: INTEREST_FRAME_TYPE.to_string(),
            tickers,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeedArgs {
    pub socket_url: Option<String>,
    pub announce_interval_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub socket_url: String,
    pub announce_interval_ms: u64,
}

impl FeedArgs {
    pub fn normalize(self) -> Result<FeedConfig, AppError> {
        let socket_url = self
            .socket_url
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        if !socket_url.starts_with("ws://") && !socket_url.starts_with("wss://") {
            return Err(AppError::InvalidArgument(
                "socketUrl must be a ws:// or wss:// endpoint".to_string(),
            ));
        }

        let announce_interval_ms = self
            .announce_interval_ms
            .unwrap_or(DEFAULT_ANNOUNCE_INTERVAL_MS);
        if !(MIN_ANNOUNCE_INTERVAL_MS..=MAX_ANNOUNCE_INTERVAL_MS).contains(&announce_interval_ms) {
            return Err(AppError::InvalidArgument(format!(
                "announceIntervalMs must be between {MIN_ANNOUNCE_INTERVAL_MS} and {MAX_ANNOUNCE_INTERVAL_MS}"
            )));
        }

        Ok(FeedConfig {
            socket_url,
            announce_interval_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_sparse_tick_frame() {
        let mut payload = br#"{"stock_code":"005930","current_price":"71200","change_rate":"","volume":"1203400","timestamp":1736899200000}"#.to_vec();
        let delta = decode_tick_frame(&mut payload).expect("tick frame should decode");

        assert_eq!(delta.stock_code.as_deref(), Some("005930"));
        assert_eq!(delta.price(), Some(71_200.0));
        assert_eq!(delta.change_rate, None);
        assert_eq!(delta.volume_f64(), Some(1_203_400.0));
        assert_eq!(delta.timestamp_ms, Some(1_736_899_200_000));
    }

    #[test]
    fn heartbeat_frame_decodes_to_empty_delta() {
        let mut payload = br#"{}"#.to_vec();
        let delta = decode_tick_frame(&mut payload).expect("empty frame should decode");

        assert_eq!(delta, TickerDelta::default());
        assert_eq!(delta.price(), None);
    }

    #[test]
    fn rejects_non_json_frame() {
        let mut payload = b"ping".to_vec();
        assert!(decode_tick_frame(&mut payload).is_err());
    }

    #[test]
    fn non_numeric_price_parses_to_none() {
        let delta = TickerDelta {
            current_price: Some("abc".to_string()),
            ..TickerDelta::default()
        };
        assert_eq!(delta.price(), None);

        let delta = TickerDelta {
            current_price: Some("NaN".to_string()),
            ..TickerDelta::default()
        };
        assert_eq!(delta.price(), None);
    }

    #[test]
    fn interest_frame_serializes_expected_shape() {
        let frame = InterestFrame::new(vec!["005930".to_string(), "000660".to_string()]);
        let encoded = serde_json::to_string(&frame).expect("frame should encode");
        assert_eq!(encoded, r#"{"type":"TICKERS","tickers":["005930","000660"]}"#);
    }

    #[test]
    fn period_type_round_trips() {
        for period in [
            PeriodType::OneDay,
            PeriodType::OneWeek,
            PeriodType::ThreeMonths,
            PeriodType::OneYear,
            PeriodType::FiveYears,
        ] {
            assert_eq!(PeriodType::parse_str(period.as_str()).unwrap(), period);
        }
        assert!(PeriodType::parse_str("2day").is_err());
        assert!(PeriodType::OneWeek.is_intraday());
        assert!(!PeriodType::OneYear.is_intraday());
    }

    #[test]
    fn normalizes_feed_args_defaults() {
        let config = FeedArgs {
            socket_url: Some("wss://feed.stockit.dev/ws".to_string()),
            announce_interval_ms: None,
        }
        .normalize()
        .expect("args should normalize");

        assert_eq!(config.announce_interval_ms, DEFAULT_ANNOUNCE_INTERVAL_MS);
    }

    #[test]
    fn rejects_invalid_feed_args() {
        assert!(FeedArgs::default().normalize().is_err());
        assert!(FeedArgs {
            socket_url: Some("wss://feed.stockit.dev/ws".to_string()),
            announce_interval_ms: Some(1),
        }
        .normalize()
        .is_err());
    }
}
