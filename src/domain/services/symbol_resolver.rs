//! Symbol resolver
//!
//! Maps logical instrument symbols to the broker-specific tradable variant
//! for the active account class, and normalizes broker-reported symbols back
//! to canonical form for matching. Proprietary/funded accounts trade the
//! raw-feed variant (`EURUSD.raw`); metals, indices, cryptos, and oil are
//! exempt and pass through unchanged for every class.

use crate::domain::entities::account::AccountClass;

/// Suffix appended for proprietary/funded accounts.
const PROP_SUFFIX: &str = "raw";

/// Broker suffixes stripped during normalization.
const KNOWN_SUFFIXES: [&str; 6] = ["raw", "mini", "cent", "pro", "ecn", "stp"];

/// Instruments never suffixed regardless of account class.
const EXEMPT_SYMBOLS: [&str; 12] = [
    "XAUUSD", "XAGUSD", "US30", "NAS100", "SPX500", "GER40", "UK100", "JPN225", "BTCUSD",
    "ETHUSD", "USOIL", "UKOIL",
];

fn known_suffix(symbol: &str) -> Option<(&str, &str)> {
    let (base, suffix) = symbol.rsplit_once('.')?;
    KNOWN_SUFFIXES
        .iter()
        .any(|s| suffix.eq_ignore_ascii_case(s))
        .then_some((base, suffix))
}

/// Strip a recognized broker suffix for equality comparisons. Unsuffixed
/// symbols and unrecognized suffixes pass through unchanged.
pub fn normalize(symbol: &str) -> String {
    match known_suffix(symbol) {
        Some((base, _)) => base.to_string(),
        None => symbol.to_string(),
    }
}

/// True when the symbol belongs to the exemption set (checked on the
/// normalized form, so `XAUUSD.raw` is still exempt).
pub fn is_exempt(symbol: &str) -> bool {
    let base = normalize(symbol).to_ascii_uppercase();
    EXEMPT_SYMBOLS.contains(&base.as_str())
}

/// Resolve the broker-specific tradable symbol for the account class.
/// Idempotent: an already-suffixed symbol is never suffixed again.
pub fn to_broker_symbol(symbol: &str, class: AccountClass) -> String {
    if is_exempt(symbol) {
        return symbol.to_string();
    }
    match class {
        AccountClass::Prop if known_suffix(symbol).is_none() => {
            format!("{}.{}", symbol, PROP_SUFFIX)
        }
        _ => symbol.to_string(),
    }
}

/// Symbol equality after normalization, case-insensitive.
pub fn symbols_match(a: &str, b: &str) -> bool {
    normalize(a).eq_ignore_ascii_case(&normalize(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prop_account_gets_raw_suffix() {
        assert_eq!(to_broker_symbol("EURUSD", AccountClass::Prop), "EURUSD.raw");
        assert_eq!(to_broker_symbol("GBPUSD", AccountClass::Prop), "GBPUSD.raw");
    }

    #[test]
    fn test_demo_and_live_pass_through() {
        assert_eq!(to_broker_symbol("EURUSD", AccountClass::Demo), "EURUSD");
        assert_eq!(to_broker_symbol("EURUSD", AccountClass::Live), "EURUSD");
    }

    #[test]
    fn test_exempt_symbols_unchanged_for_all_classes() {
        for symbol in EXEMPT_SYMBOLS {
            for class in [AccountClass::Demo, AccountClass::Live, AccountClass::Prop] {
                assert_eq!(to_broker_symbol(symbol, class), symbol);
            }
        }
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let once = to_broker_symbol("EURUSD", AccountClass::Prop);
        let twice = to_broker_symbol(&once, AccountClass::Prop);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_round_trip_for_every_suffix() {
        for suffix in KNOWN_SUFFIXES {
            let suffixed = format!("EURUSD.{}", suffix);
            assert_eq!(normalize(&suffixed), "EURUSD");
            let upper = format!("EURUSD.{}", suffix.to_ascii_uppercase());
            assert_eq!(normalize(&upper), "EURUSD");
        }
    }

    #[test]
    fn test_normalize_leaves_unknown_suffixes() {
        assert_eq!(normalize("EURUSD"), "EURUSD");
        assert_eq!(normalize("EURUSD.xyz"), "EURUSD.xyz");
    }

    #[test]
    fn test_symbols_match_across_suffixes() {
        assert!(symbols_match("EURUSD.raw", "EURUSD"));
        assert!(symbols_match("eurusd.PRO", "EURUSD.mini"));
        assert!(!symbols_match("EURUSD.raw", "GBPUSD"));
    }
}
