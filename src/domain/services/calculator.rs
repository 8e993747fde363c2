//! Symbol & risk calculator
//!
//! Pure, stateless instrument math. Every symbol maps onto a closed set of
//! instrument families; pip size, pip multiplier, and the monetary value of
//! one pip per standard lot are carried as per-family data rather than
//! branching logic. Unknown or empty symbols fall back to the default forex
//! profile; nothing here ever errors.

/// Closed set of instrument families with distinct quoting conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentFamily {
    JpyPair,
    Metal,
    Index,
    Crypto,
    Oil,
    Forex,
}

/// Per-family pip data.
#[derive(Debug, Clone, Copy)]
struct FamilyProfile {
    pip_size: f64,
    pip_multiplier: f64,
    /// USD value of one pip for one standard lot.
    value_per_pip: f64,
    price_decimals: usize,
}

const METAL_PREFIXES: [&str; 2] = ["XAU", "XAG"];
const INDEX_SYMBOLS: [&str; 8] = [
    "US30", "NAS100", "US100", "SPX500", "US500", "GER40", "DE40", "UK100",
];
const CRYPTO_PREFIXES: [&str; 4] = ["BTC", "ETH", "LTC", "XRP"];
const OIL_SYMBOLS: [&str; 4] = ["USOIL", "UKOIL", "WTI", "BRENT"];

impl InstrumentFamily {
    /// Classify a symbol. Broker suffixes (anything after a dot) are ignored
    /// so `USDJPY.raw` classifies like `USDJPY`.
    pub fn classify(symbol: &str) -> Self {
        let base = symbol
            .split('.')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_uppercase();
        if base.is_empty() {
            return InstrumentFamily::Forex;
        }
        if METAL_PREFIXES.iter().any(|p| base.starts_with(p)) {
            return InstrumentFamily::Metal;
        }
        if INDEX_SYMBOLS.contains(&base.as_str()) {
            return InstrumentFamily::Index;
        }
        if CRYPTO_PREFIXES.iter().any(|p| base.starts_with(p)) {
            return InstrumentFamily::Crypto;
        }
        if OIL_SYMBOLS.contains(&base.as_str()) {
            return InstrumentFamily::Oil;
        }
        if base.ends_with("JPY") {
            return InstrumentFamily::JpyPair;
        }
        InstrumentFamily::Forex
    }

    fn profile(self) -> FamilyProfile {
        match self {
            InstrumentFamily::JpyPair => FamilyProfile {
                pip_size: 0.01,
                pip_multiplier: 100.0,
                value_per_pip: 10.0,
                price_decimals: 3,
            },
            InstrumentFamily::Metal => FamilyProfile {
                pip_size: 0.01,
                pip_multiplier: 100.0,
                value_per_pip: 10.0,
                price_decimals: 2,
            },
            InstrumentFamily::Index => FamilyProfile {
                pip_size: 0.01,
                pip_multiplier: 100.0,
                value_per_pip: 1.0,
                price_decimals: 2,
            },
            InstrumentFamily::Crypto => FamilyProfile {
                pip_size: 1.0,
                pip_multiplier: 1.0,
                value_per_pip: 1.0,
                price_decimals: 2,
            },
            InstrumentFamily::Oil => FamilyProfile {
                pip_size: 0.01,
                pip_multiplier: 100.0,
                value_per_pip: 10.0,
                price_decimals: 2,
            },
            InstrumentFamily::Forex => FamilyProfile {
                pip_size: 0.0001,
                pip_multiplier: 10_000.0,
                value_per_pip: 10.0,
                price_decimals: 5,
            },
        }
    }
}

/// Size of one pip for the symbol's family.
pub fn pip_value(symbol: &str) -> f64 {
    InstrumentFamily::classify(symbol).profile().pip_size
}

/// Inverse of the pip size.
pub fn pip_multiplier(symbol: &str) -> f64 {
    InstrumentFamily::classify(symbol).profile().pip_multiplier
}

/// Bid/ask distance expressed in pips.
pub fn spread_in_pips(bid: f64, ask: f64, symbol: &str) -> f64 {
    (ask - bid) * pip_multiplier(symbol)
}

/// Monetary risk of a stop at `stop` for an entry at `entry` with `lot_size`
/// lots. Zero when the stop sits on the entry; that is a no-risk trade, not
/// an error.
pub fn risk_amount(entry: f64, stop: f64, lot_size: f64, symbol: &str) -> f64 {
    let profile = InstrumentFamily::classify(symbol).profile();
    let pip_distance = (entry - stop).abs() / profile.pip_size;
    pip_distance * profile.value_per_pip * lot_size
}

/// Lot size such that the risk of the given stop equals
/// `balance * risk_pct / 100`, floored to 2 decimals and clamped to the
/// 0.01 broker minimum. A stop on the entry yields the minimum lot.
pub fn optimal_lot_size(balance: f64, risk_pct: f64, entry: f64, stop: f64, symbol: &str) -> f64 {
    let profile = InstrumentFamily::classify(symbol).profile();
    let pip_distance = (entry - stop).abs() / profile.pip_size;
    if pip_distance <= 0.0 {
        return 0.01;
    }
    let risk_money = balance * risk_pct / 100.0;
    let lot = risk_money / (pip_distance * profile.value_per_pip);
    ((lot * 100.0).floor() / 100.0).max(0.01)
}

/// Render a price with the family's conventional precision.
pub fn format_price(price: f64, symbol: &str) -> String {
    let decimals = InstrumentFamily::classify(symbol).profile().price_decimals;
    format!("{:.*}", decimals, price)
}
