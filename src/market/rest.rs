use reqwest::Client;

use crate::error::AppError;
use crate::market::types::{Candle, PeriodType, StockSnapshot};

fn chart_endpoint(base_url: &str, stock_code: &str, period_type: PeriodType) -> String {
    format!(
        "{base_url}/api/stocks/{stock_code}/chart?periodType={}",
        period_type.as_str()
    )
}

fn detail_endpoint(base_url: &str, stock_code: &str) -> String {
    format!("{base_url}/api/stocks/{stock_code}")
}

fn ranked_endpoint(base_url: &str) -> String {
    format!("{base_url}/api/stocks/amount")
}

fn require_stock_code(stock_code: &str) -> Result<(), AppError> {
    if stock_code.is_empty() {
        return Err(AppError::InvalidArgument(
            "stock code must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Historical candle series for one instrument at one granularity.
pub async fn fetch_chart_history(
    client: &Client,
    base_url: &str,
    stock_code: &str,
    period_type: PeriodType,
) -> Result<Vec<Candle>, AppError> {
    require_stock_code(stock_code)?;
    let endpoint = chart_endpoint(base_url, stock_code, period_type);
    let response = client.get(endpoint).send().await?.error_for_status()?;
    Ok(response.json::<Vec<Candle>>().await?)
}

/// Full detail snapshot for one instrument.
pub async fn fetch_stock_detail(
    client: &Client,
    base_url: &str,
    stock_code: &str,
) -> Result<StockSnapshot, AppError> {
    require_stock_code(stock_code)?;
    let endpoint = detail_endpoint(base_url, stock_code);
    let response = client.get(endpoint).send().await?.error_for_status()?;
    Ok(response.json::<StockSnapshot>().await?)
}

/// Instruments ranked by traded amount; base fields only.
pub async fn fetch_ranked_stocks(
    client: &Client,
    base_url: &str,
) -> Result<Vec<StockSnapshot>, AppError> {
    let endpoint = ranked_endpoint(base_url);
    let response = client.get(endpoint).send().await?.error_for_status()?;
    Ok(response.json::<Vec<StockSnapshot>>().await?)
}
