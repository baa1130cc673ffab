//! Precision of reported numeric facts.
use super::types::{Decimals, Fact};
use rust_decimal::Decimal;
use std::str::FromStr;

const INF: &str = "INF";

impl Decimals {
    /// Derives the decimals a fact is accurate to from its reporting attributes.
    ///
    /// A `decimals` attribute takes priority over `precision`. With precision `p`
    /// and a non-zero value `v` the result is `p - floor(log10 |v|) - 1`.
    /// A zero value, an `INF` attribute, or no usable attribute gives `Infinite`.
    pub fn infer(decimals: Option<&str>, precision: Option<&str>, value: Option<&Decimal>) -> Decimals {
        if let Some(decimals) = decimals.map(str::trim) {
            if decimals == INF {
                return Decimals::Infinite;
            }
            if let Ok(d) = decimals.parse::<i32>() {
                return Decimals::Finite(d);
            }
        }
        let Some(precision) = precision.map(str::trim) else {
            return Decimals::Infinite;
        };
        if precision == INF {
            return Decimals::Infinite;
        }
        match (precision.parse::<i32>(), value) {
            (Ok(p), Some(v)) if !v.is_zero() => {
                let d = i64::from(p) - i64::from(magnitude(v)) - 1;
                Decimals::Finite(d.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
            }
            _ => Decimals::Infinite,
        }
    }

    /// `infer` over lexical attribute values, as they appear in a document.
    pub fn infer_lexical(decimals: Option<&str>, precision: Option<&str>, value: &str) -> Decimals {
        let value = Decimal::from_str(value.trim())
            .or_else(|_| Decimal::from_scientific(value.trim()))
            .ok();
        Decimals::infer(decimals, precision, value.as_ref())
    }
}

/// `floor(log10 |v|)` for a non-zero decimal, computed exactly.
fn magnitude(v: &Decimal) -> i32 {
    // v = mantissa * 10^-scale, and the mantissa is an integer.
    let digits = v.mantissa().unsigned_abs().ilog10() as i32;
    digits - v.scale() as i32
}

/// The least decimals over the non-nil facts, or `Infinite` if there are none.
pub fn least_decimals<'f>(facts: impl IntoIterator<Item = &'f Fact>) -> Decimals {
    facts
        .into_iter()
        .filter(|f| !f.is_nil())
        .map(|f| f.decimals)
        .min()
        .unwrap_or(Decimals::Infinite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::types::{ConceptId, FactValue};
    use rstest::rstest;

    fn fact(decimals: Decimals, nil: bool) -> Fact {
        let value = if nil { FactValue::Nil } else { FactValue::Text("1".into()) };
        Fact::new(ConceptId::new("us-gaap", "Revenues"), value).with_decimals(decimals)
    }

    #[test]
    fn test_least_decimals_ignores_nils() {
        let facts = [
            fact(Decimals::Finite(2), false),
            fact(Decimals::Finite(5), false),
            fact(Decimals::Finite(-6), true),
        ];
        assert_eq!(least_decimals(&facts), Decimals::Finite(2));
    }

    #[test]
    fn test_least_decimals_unbounded_without_values() {
        let nils = [fact(Decimals::Finite(2), true)];
        assert_eq!(least_decimals(&nils), Decimals::Infinite);
        assert_eq!(least_decimals(&[] as &[Fact]), Decimals::Infinite);
    }

    #[rstest]
    #[case(Some("INF"), None, "10", Decimals::Infinite)]
    #[case(Some("-3"), Some("4"), "12345", Decimals::Finite(-3))]
    #[case(None, Some("4"), "12345", Decimals::Finite(-1))]
    #[case(None, Some("3"), "123.45", Decimals::Finite(0))]
    #[case(None, Some("2"), "0.0123", Decimals::Finite(3))]
    #[case(None, Some("2"), "-0.0123", Decimals::Finite(3))]
    #[case(None, Some("5"), "1000000", Decimals::Finite(-2))]
    #[case(None, Some("3"), "0", Decimals::Infinite)]
    #[case(None, Some("INF"), "12", Decimals::Infinite)]
    #[case(None, None, "12", Decimals::Infinite)]
    #[case(None, Some("2147483647"), "0.05", Decimals::Finite(i32::MAX))]
    #[case(None, Some("-2147483648"), "12345", Decimals::Finite(i32::MIN))]
    fn test_infer(
        #[case] decimals: Option<&str>,
        #[case] precision: Option<&str>,
        #[case] value: &str,
        #[case] expected: Decimals,
    ) {
        assert_eq!(Decimals::infer_lexical(decimals, precision, value), expected);
    }
}
