use chrono::{DateTime, FixedOffset, Offset, TimeZone, Timelike, Utc};

use crate::market::types::{Candle, PeriodType, TickerDelta, DEFAULT_PERIOD_TYPE};

/// KST (+09:00). The backend labels candles in market wall-clock time and
/// Seoul has no DST, so a fixed offset is exact.
const DEFAULT_MARKET_OFFSET_SECS: i32 = 9 * 3_600;

fn default_market_offset() -> FixedOffset {
    match FixedOffset::east_opt(DEFAULT_MARKET_OFFSET_SECS) {
        Some(offset) => offset,
        None => Utc.fix(),
    }
}

/// Folds the raw tick stream into OHLCV candles for the active granularity.
///
/// The store keeps exactly one in-progress candle per instrument view (it is
/// scoped to the instrument whose chart is on screen); the full historical
/// series stays with the chart renderer. A candle is sealed the moment a
/// tick's bucket key differs from the last candle's key.
///
/// Bucket keys are date/time strings in the market's wall-clock zone, the
/// same labels the REST seed candles carry. Tick timestamps arrive as epoch
/// millis and are shifted into that zone before formatting, otherwise a tick
/// inside the seed candle's minute would get a different label and open a
/// parallel candle instead of mutating the seed.
#[derive(Debug)]
pub struct ChartStore {
    candles: Vec<Candle>,
    period_type: PeriodType,
    start_from: Option<String>,
    market_offset: FixedOffset,
}

impl Default for ChartStore {
    fn default() -> Self {
        Self {
            candles: Vec::new(),
            period_type: DEFAULT_PERIOD_TYPE,
            start_from: None,
            market_offset: default_market_offset(),
        }
    }
}

fn bucket_parts(
    period: PeriodType,
    at: DateTime<Utc>,
    market_offset: FixedOffset,
) -> (String, Option<String>) {
    let local = at.with_timezone(&market_offset);
    let date = local.format("%Y-%m-%d").to_string();
    match period {
        // 1-minute buckets: truncate to the minute.
        PeriodType::OneDay => (
            date,
            Some(format!("{:02}:{:02}:00", local.hour(), local.minute())),
        ),
        // 5-minute buckets: floor the minute to the nearest lower multiple.
        PeriodType::OneWeek => {
            let minute = local.minute() - local.minute() % 5;
            (date, Some(format!("{:02}:{minute:02}:00", local.hour())))
        }
        // Daily buckets: time-of-day is irrelevant.
        PeriodType::ThreeMonths | PeriodType::OneYear | PeriodType::FiveYears => (date, None),
    }
}

impl ChartStore {
    /// Store labeling buckets in a non-default market zone.
    pub fn with_market_offset(market_offset: FixedOffset) -> Self {
        Self {
            market_offset,
            ..Self::default()
        }
    }

    pub fn market_offset(&self) -> FixedOffset {
        self.market_offset
    }

    /// Switching granularity invalidates everything: bucket boundaries are
    /// granularity-dependent and cannot be reinterpreted without a fresh
    /// seed.
    pub fn set_period_type(&mut self, period_type: PeriodType) {
        self.period_type = period_type;
        self.candles.clear();
        self.start_from = None;
    }

    /// Seeds the aggregator with the last historical candle; the rest of the
    /// history belongs to the chart renderer.
    pub fn initialize_chart_data(&mut self, history: &[Candle]) {
        let Some(last) = history.last() else {
            return;
        };
        self.start_from = Some(last.start_marker());
        self.candles = vec![last.clone()];
    }

    /// Folds one decoded tick into the current candle series.
    ///
    /// Ticks without a parseable price are heartbeat/malformed frames and are
    /// dropped silently; a missing timestamp defaults to now.
    pub fn update_from_socket(&mut self, stock_code: &str, delta: &TickerDelta) {
        let Some(price) = delta.price() else {
            tracing::trace!(stock_code, "tick without usable price dropped");
            return;
        };

        let at = delta
            .timestamp_ms
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);
        let (date, time) = bucket_parts(self.period_type, at, self.market_offset);

        let volume = delta.volume_f64().unwrap_or(0.0);
        let amount = delta.amount_f64().unwrap_or(0.0);

        let same_bucket = self.candles.last().is_some_and(|last| {
            if self.period_type.is_intraday() {
                last.date == date && last.time == time
            } else {
                last.date == date
            }
        });

        if same_bucket {
            if let Some(last) = self.candles.last_mut() {
                last.apply_tick(price, volume, amount);
            }
        } else {
            self.candles
                .push(Candle::from_tick(date, time, price, volume, amount));
        }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn period_type(&self) -> PeriodType {
        self.period_type
    }

    /// Bucket marker of the seed candle, if seeded.
    pub fn start_from(&self) -> Option<&str> {
        self.start_from.as_deref()
    }

    pub fn reset(&mut self) {
        self.candles.clear();
        self.start_from = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(price: &str, timestamp_ms: i64) -> TickerDelta {
        TickerDelta {
            current_price: Some(price.to_string()),
            timestamp_ms: Some(timestamp_ms),
            ..TickerDelta::default()
        }
    }

    /// Epoch millis for a KST wall-clock instant, matching the labels the
    /// backend puts on seed candles.
    fn kst_ms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> i64 {
        FixedOffset::east_opt(9 * 3_600)
            .expect("KST offset is in range")
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .expect("valid timestamp")
            .timestamp_millis()
    }

    fn seed_candle(date: &str, time: Option<&str>, close: f64) -> Candle {
        Candle {
            date: date.to_string(),
            time: time.map(str::to_string),
            open_price: close,
            high_price: close,
            low_price: close,
            close_price: close,
            volume: 10.0,
            amount: 1_000.0,
        }
    }

    #[test]
    fn seeds_with_only_the_last_historical_candle() {
        let mut store = ChartStore::default();
        let history = vec![
            seed_candle("2025-11-06", Some("09:28:00"), 70_000.0),
            seed_candle("2025-11-06", Some("09:29:00"), 70_500.0),
        ];

        store.initialize_chart_data(&history);

        assert_eq!(store.candles().len(), 1);
        assert_eq!(store.candles()[0].close_price, 70_500.0);
        assert_eq!(store.start_from(), Some("2025-11-06 09:29:00"));
    }

    #[test]
    fn initialize_with_empty_history_is_a_no_op() {
        let mut store = ChartStore::default();
        store.initialize_chart_data(&[]);
        assert!(store.candles().is_empty());
        assert_eq!(store.start_from(), None);
    }

    #[test]
    fn ticks_in_one_bucket_fold_into_a_single_candle() {
        let mut store = ChartStore::default();
        let base = kst_ms(2025, 11, 6, 9, 30, 0);

        store.update_from_socket("005930", &tick("100", base));
        store.update_from_socket("005930", &tick("104", base + 10_000));
        store.update_from_socket("005930", &tick("98", base + 20_000));
        store.update_from_socket("005930", &tick("101", base + 30_000));

        assert_eq!(store.candles().len(), 1);
        let candle = &store.candles()[0];
        assert_eq!(candle.open_price, 100.0);
        assert_eq!(candle.high_price, 104.0);
        assert_eq!(candle.low_price, 98.0);
        assert_eq!(candle.close_price, 101.0);
        assert_eq!(candle.date, "2025-11-06");
        assert_eq!(candle.time.as_deref(), Some("09:30:00"));
    }

    #[test]
    fn minute_rollover_seals_the_candle_and_opens_a_new_one() {
        let mut store = ChartStore::default();

        store.update_from_socket("005930", &tick("100", kst_ms(2025, 11, 6, 9, 30, 59)));
        store.update_from_socket("005930", &tick("103", kst_ms(2025, 11, 6, 9, 31, 0)));

        assert_eq!(store.candles().len(), 2);
        let sealed = &store.candles()[0];
        assert_eq!(sealed.close_price, 100.0);
        let open = &store.candles()[1];
        assert_eq!(open.open_price, 103.0);
        assert_eq!(open.time.as_deref(), Some("09:31:00"));
    }

    #[test]
    fn one_week_period_floors_minutes_to_five() {
        let mut store = ChartStore::default();
        store.set_period_type(PeriodType::OneWeek);

        store.update_from_socket("005930", &tick("100", kst_ms(2025, 11, 6, 9, 31, 0)));
        store.update_from_socket("005930", &tick("105", kst_ms(2025, 11, 6, 9, 34, 59)));
        store.update_from_socket("005930", &tick("110", kst_ms(2025, 11, 6, 9, 35, 0)));

        assert_eq!(store.candles().len(), 2);
        assert_eq!(store.candles()[0].time.as_deref(), Some("09:30:00"));
        assert_eq!(store.candles()[0].close_price, 105.0);
        assert_eq!(store.candles()[1].time.as_deref(), Some("09:35:00"));
    }

    #[test]
    fn coarse_periods_bucket_by_date_alone() {
        let mut store = ChartStore::default();
        store.set_period_type(PeriodType::OneYear);

        store.update_from_socket("005930", &tick("100", kst_ms(2025, 11, 6, 9, 0, 0)));
        store.update_from_socket("005930", &tick("107", kst_ms(2025, 11, 6, 15, 20, 0)));
        store.update_from_socket("005930", &tick("99", kst_ms(2025, 11, 7, 9, 0, 0)));

        assert_eq!(store.candles().len(), 2);
        let day_one = &store.candles()[0];
        assert_eq!(day_one.time, None);
        assert_eq!(day_one.high_price, 107.0);
        assert_eq!(day_one.close_price, 107.0);
        assert_eq!(store.candles()[1].date, "2025-11-07");
    }

    #[test]
    fn live_tick_in_seed_bucket_mutates_the_seed() {
        let mut store = ChartStore::default();
        store.initialize_chart_data(&[seed_candle("2025-11-06", Some("09:30:00"), 100.0)]);

        store.update_from_socket("005930", &tick("108", kst_ms(2025, 11, 6, 9, 30, 45)));

        assert_eq!(store.candles().len(), 1);
        let candle = &store.candles()[0];
        assert_eq!(candle.open_price, 100.0);
        assert_eq!(candle.high_price, 108.0);
        assert_eq!(candle.close_price, 108.0);
    }

    #[test]
    fn utc_stamped_tick_lands_in_the_seed_candle_wall_clock_bucket() {
        let mut store = ChartStore::default();
        store.initialize_chart_data(&[seed_candle("2025-11-06", Some("09:30:00"), 100.0)]);

        // 00:30:15 UTC is 09:30:15 KST, the seed candle's minute.
        let utc_stamp = Utc
            .with_ymd_and_hms(2025, 11, 6, 0, 30, 15)
            .single()
            .expect("valid timestamp")
            .timestamp_millis();
        store.update_from_socket("005930", &tick("108", utc_stamp));

        assert_eq!(store.candles().len(), 1);
        let candle = &store.candles()[0];
        assert_eq!(candle.close_price, 108.0);
        assert_eq!(candle.time.as_deref(), Some("09:30:00"));
    }

    #[test]
    fn kst_date_rolls_over_ahead_of_utc() {
        let mut store = ChartStore::default();
        store.set_period_type(PeriodType::OneYear);

        // 15:30 UTC on the 6th is already 00:30 on the 7th in market time.
        let utc_stamp = Utc
            .with_ymd_and_hms(2025, 11, 6, 15, 30, 0)
            .single()
            .expect("valid timestamp")
            .timestamp_millis();
        store.update_from_socket("005930", &tick("100", utc_stamp));

        assert_eq!(store.candles()[0].date, "2025-11-07");
    }

    #[test]
    fn custom_market_offset_controls_the_labels() {
        let mut store = ChartStore::with_market_offset(Utc.fix());

        let utc_stamp = Utc
            .with_ymd_and_hms(2025, 11, 6, 0, 30, 15)
            .single()
            .expect("valid timestamp")
            .timestamp_millis();
        store.update_from_socket("005930", &tick("100", utc_stamp));

        assert_eq!(store.candles()[0].date, "2025-11-06");
        assert_eq!(store.candles()[0].time.as_deref(), Some("00:30:00"));
    }

    #[test]
    fn cumulative_volume_and_amount_overwrite() {
        let mut store = ChartStore::default();
        let base = kst_ms(2025, 11, 6, 9, 30, 0);
        let mut first = tick("100", base);
        first.volume = Some("500".to_string());
        first.amount = Some("50000".to_string());
        let mut second = tick("101", base + 5_000);
        second.volume = Some("750".to_string());
        second.amount = Some("75750".to_string());

        store.update_from_socket("005930", &first);
        store.update_from_socket("005930", &second);

        let candle = &store.candles()[0];
        assert_eq!(candle.volume, 750.0);
        assert_eq!(candle.amount, 75_750.0);
    }

    #[test]
    fn tick_without_price_is_dropped() {
        let mut store = ChartStore::default();
        store.update_from_socket("005930", &TickerDelta::default());
        store.update_from_socket(
            "005930",
            &TickerDelta {
                current_price: Some("not-a-price".to_string()),
                ..TickerDelta::default()
            },
        );
        assert!(store.candles().is_empty());
    }

    #[test]
    fn period_switch_clears_all_state() {
        let mut store = ChartStore::default();
        store.initialize_chart_data(&[seed_candle("2025-11-06", Some("09:30:00"), 100.0)]);
        assert!(!store.candles().is_empty());

        store.set_period_type(PeriodType::ThreeMonths);

        assert!(store.candles().is_empty());
        assert_eq!(store.start_from(), None);
        assert_eq!(store.period_type(), PeriodType::ThreeMonths);
    }
}
