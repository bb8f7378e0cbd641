use std::collections::HashMap;

use crate::market::types::{ChangeSign, MarketType, StockSnapshot, TickerDelta};

/// Latest known detail for one instrument, accumulated from snapshots and
/// deltas. Everything beyond the code is optional: a record may start from a
/// sparse delta long before the first full snapshot arrives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockRecord {
    pub stock_code: String,
    pub stock_name: Option<String>,
    pub market_type: Option<MarketType>,
    pub current_price: Option<f64>,
    pub change_rate: Option<f64>,
    pub change_amount: Option<f64>,
    pub change_sign: Option<ChangeSign>,
    pub volume: Option<f64>,
    pub amount: Option<f64>,
    pub market_cap: Option<f64>,
    pub per: Option<f64>,
    pub eps: Option<f64>,
    pub pbr: Option<f64>,
    pub face_value: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub open_price: Option<f64>,
    pub previous_close_price: Option<f64>,
}

impl StockRecord {
    fn new(stock_code: &str) -> Self {
        Self {
            stock_code: stock_code.to_string(),
            ..Self::default()
        }
    }
}

fn merge_opt<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Key-value projection of "latest known full detail" per instrument.
///
/// REST snapshots are high trust and replace every field they carry; socket
/// deltas are sparse and only refine fields they actually name, because the
/// feed omits unchanged fields instead of repeating them.
#[derive(Debug, Default)]
pub struct TickerStore {
    tickers: HashMap<String, StockRecord>,
}

impl TickerStore {
    /// Applies full-record REST snapshots. Base fields are always replaced;
    /// detail fields are replaced when the payload carries them (list
    /// endpoints omit the detail block).
    pub fn upsert_snapshots(&mut self, snapshots: &[StockSnapshot]) {
        for snapshot in snapshots {
            let record = self
                .tickers
                .entry(snapshot.stock_code.clone())
                .or_insert_with(|| StockRecord::new(&snapshot.stock_code));

            record.stock_name = Some(snapshot.stock_name.clone());
            record.market_type = Some(snapshot.market_type);
            record.current_price = Some(snapshot.current_price);
            record.change_rate = Some(snapshot.change_rate);
            record.change_sign = Some(snapshot.change_sign);
            merge_opt(&mut record.change_amount, snapshot.change_amount);
            merge_opt(&mut record.volume, snapshot.volume);
            merge_opt(&mut record.amount, snapshot.amount);
            merge_opt(&mut record.market_cap, snapshot.market_cap);
            merge_opt(&mut record.per, snapshot.per);
            merge_opt(&mut record.eps, snapshot.eps);
            merge_opt(&mut record.pbr, snapshot.pbr);
            merge_opt(&mut record.face_value, snapshot.face_value);
            merge_opt(&mut record.high_price, snapshot.high_price);
            merge_opt(&mut record.low_price, snapshot.low_price);
            merge_opt(&mut record.open_price, snapshot.open_price);
            merge_opt(
                &mut record.previous_close_price,
                snapshot.previous_close_price,
            );
        }
    }

    /// Applies one sparse socket delta. A field overwrites only when present
    /// and non-empty in the delta; unparsable numeric fields are skipped
    /// field-by-field rather than failing the whole update.
    pub fn update_from_socket(&mut self, stock_code: &str, delta: &TickerDelta) {
        let record = self
            .tickers
            .entry(stock_code.to_string())
            .or_insert_with(|| StockRecord::new(stock_code));

        merge_opt(&mut record.stock_name, delta.stock_name.clone());
        merge_opt(
            &mut record.market_type,
            delta.market_type.as_deref().and_then(|raw| match raw {
                "KOSPI" => Some(MarketType::Kospi),
                "KOSDAQ" => Some(MarketType::Kosdaq),
                _ => None,
            }),
        );
        merge_opt(&mut record.current_price, delta.price());
        merge_opt(&mut record.change_rate, delta.change_rate_f64());
        merge_opt(&mut record.change_amount, delta.change_amount_f64());
        merge_opt(
            &mut record.change_sign,
            delta.change_sign.as_deref().and_then(ChangeSign::parse_str),
        );
        merge_opt(&mut record.volume, delta.volume_f64());
        merge_opt(&mut record.amount, delta.amount_f64());
    }

    pub fn get(&self, stock_code: &str) -> Option<&StockRecord> {
        self.tickers.get(stock_code)
    }

    pub fn tickers(&self) -> &HashMap<String, StockRecord> {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}
