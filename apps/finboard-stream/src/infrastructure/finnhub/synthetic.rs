//! Synthetic market data.
//!
//! Used when no API key is configured or the REST API is unavailable.
//! Well-known tickers start from a realistic base price; anything else gets a
//! random one.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use super::quotes::{CandleSeries, CompanyProfile, Quote};

/// Seconds in one day.
const DAY_SECS: i64 = 24 * 60 * 60;

/// Upper bound on synthesized candle points.
pub const MAX_SYNTHETIC_CANDLES: i64 = 90;

/// Base price of well-known tickers.
#[must_use]
pub fn base_price(symbol: &str) -> Option<f64> {
    match symbol {
        "AAPL" => Some(178.50),
        "GOOGL" => Some(142.30),
        "MSFT" => Some(384.20),
        "AMZN" => Some(151.80),
        "TSLA" => Some(242.60),
        "META" => Some(468.50),
        "NVDA" => Some(495.30),
        "NFLX" => Some(485.20),
        "AMD" => Some(165.40),
        "INTC" => Some(43.20),
        _ => None,
    }
}

fn money(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(2)
}

/// Synthesize a quote around the symbol's base price.
pub fn quote(symbol: &str, rng: &mut impl Rng) -> Quote {
    let base = base_price(symbol).unwrap_or_else(|| rng.random_range(50.0..450.0));
    let change = (rng.random::<f64>() - 0.5) * 10.0;
    let percent_change = change / base * 100.0;

    Quote {
        current: money(base),
        change: money(change),
        percent_change: money(percent_change),
        high: money(base + rng.random::<f64>() * 5.0),
        low: money(base - rng.random::<f64>() * 5.0),
        open: money(base + (rng.random::<f64>() - 0.5) * 3.0),
        previous_close: money(base - change),
    }
}

/// Synthesize a company profile.
pub fn profile(symbol: &str, rng: &mut impl Rng) -> CompanyProfile {
    CompanyProfile {
        name: format!("{symbol} Inc."),
        ticker: symbol.to_string(),
        exchange: "NASDAQ".to_string(),
        country: "US".to_string(),
        currency: "USD".to_string(),
        market_capitalization: rng.random_range(0.0..1_000_000.0_f64).floor(),
        ..CompanyProfile::default()
    }
}

/// Number of daily points synthesized for the range `from..to` (unix seconds).
#[must_use]
pub fn candle_days(from: i64, to: i64) -> i64 {
    (to.saturating_sub(from).div_euclid(DAY_SECS)).clamp(0, MAX_SYNTHETIC_CANDLES)
}

/// Synthesize `days` daily candles, one day apart, ending at `now`.
pub fn candles(symbol: &str, days: i64, now: DateTime<Utc>, rng: &mut impl Rng) -> CandleSeries {
    let base = base_price(symbol).unwrap_or(150.0);
    let end = now.timestamp();
    let mut series = CandleSeries {
        status: "ok".to_string(),
        ..CandleSeries::default()
    };

    for i in 0..days {
        let price = base + (rng.random::<f64>() - 0.5) * 20.0;

        series.close.push(money(price + (rng.random::<f64>() - 0.5) * 5.0));
        series.high.push(money(price + rng.random::<f64>() * 5.0));
        series.low.push(money(price - rng.random::<f64>() * 5.0));
        series.open.push(money(price + (rng.random::<f64>() - 0.5) * 3.0));
        series.timestamps.push(end - (days - i - 1) * DAY_SECS);
        series
            .volume
            .push(Decimal::from(rng.random_range(1_000_000_u64..11_000_000)));
    }

    series
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn known_symbols_use_base_price() {
        let mut rng = StdRng::seed_from_u64(7);
        let quote = quote("AAPL", &mut rng);

        assert_eq!(quote.current, Decimal::new(17850, 2));
        let drift = quote.previous_close - (quote.current - quote.change);
        assert!(drift.abs() <= Decimal::new(1, 2));
        assert!(quote.change.abs() <= Decimal::from(5));
    }

    #[test]
    fn unknown_symbols_get_a_price_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let quote = quote("ZZZZ", &mut rng);
            assert!(quote.current >= Decimal::from(50));
            assert!(quote.current <= Decimal::from(450));
        }
    }

    #[test]
    fn profile_is_named_after_symbol() {
        let mut rng = StdRng::seed_from_u64(7);
        let profile = profile("NVDA", &mut rng);
        assert_eq!(profile.name, "NVDA Inc.");
        assert_eq!(profile.ticker, "NVDA");
        assert!(profile.is_valid());
    }

    #[test]
    fn candle_days_are_capped() {
        assert_eq!(candle_days(0, 30 * DAY_SECS), 30);
        assert_eq!(candle_days(0, 365 * DAY_SECS), 90);
        assert_eq!(candle_days(10, 0), 0);
    }

    #[test]
    fn candle_days_saturate_on_extreme_ranges() {
        assert_eq!(candle_days(i64::MIN, i64::MAX), 90);
        assert_eq!(candle_days(i64::MAX, i64::MIN), 0);
    }

    #[test]
    fn candles_end_now_one_day_apart() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc::now();
        let series = candles("MSFT", 5, now, &mut rng);

        assert!(series.is_ok());
        assert_eq!(series.len(), 5);
        assert_eq!(series.timestamps.last().copied(), Some(now.timestamp()));
        assert!(series.timestamps.windows(2).all(|w| w[1] - w[0] == DAY_SECS));
        assert!(series.volume.iter().all(|v| *v >= Decimal::from(1_000_000)));
    }
}
