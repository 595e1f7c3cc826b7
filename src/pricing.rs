//! Quotation arithmetic.
//!
//! Line subtotals and quotation totals are derived on every read from the
//! stored negotiated price, customization cost and quantity. Nothing here
//! touches the catalog: a detail's `precio_pactado` is a frozen snapshot.

use crate::errors::ServiceError;
use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept for money values.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a `decimal(10, 2)` money column holds: 99,999,999.99
pub const MAX_MONEY: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Whether `value` fits a money column: non-negative and at most [`MAX_MONEY`].
pub fn money_in_range(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= MAX_MONEY
}

/// Rounds a money value to cents, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `(precio_pactado + costo_personalizacion) * cantidad`
pub fn line_subtotal(
    precio_pactado: Decimal,
    costo_personalizacion: Decimal,
    cantidad: i32,
) -> Result<Decimal, ServiceError> {
    precio_pactado
        .checked_add(costo_personalizacion)
        .and_then(|unit| unit.checked_mul(Decimal::from(cantidad)))
        .ok_or_else(|| overflow("subtotal"))
}

/// Sum of the given subtotals; zero for an empty quotation.
pub fn quotation_total<I>(subtotals: I) -> Result<Decimal, ServiceError>
where
    I: IntoIterator<Item = Decimal>,
{
    subtotals
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(s))
        .ok_or_else(|| overflow("total"))
}

fn overflow(what: &str) -> ServiceError {
    ServiceError::InternalError(format!("El {} excede el rango representable", what))
}

/// Formats a money value as `$1234.50`.
pub fn format_currency(value: Decimal) -> String {
    format!("${:.2}", round_money(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn subtotal_includes_customization_per_unit() {
        assert_eq!(line_subtotal(dec!(45.00), dec!(5.00), 10).unwrap(), dec!(500.00));
        assert_eq!(line_subtotal(dec!(12.35), dec!(0), 3).unwrap(), dec!(37.05));
    }

    #[test]
    fn empty_quotation_totals_zero() {
        assert_eq!(quotation_total(Vec::new()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn max_money_matches_column_precision() {
        assert_eq!(MAX_MONEY, dec!(99999999.99));
        assert!(money_in_range(dec!(99999999.99)));
        assert!(money_in_range(Decimal::ZERO));
        assert!(!money_in_range(dec!(100000000.00)));
        assert!(!money_in_range(dec!(-0.01)));
    }

    #[test]
    fn largest_valid_line_does_not_overflow() {
        let subtotal = line_subtotal(MAX_MONEY, MAX_MONEY, i32::MAX).unwrap();
        assert_eq!(subtotal, dec!(199999999.98) * Decimal::from(i32::MAX));
    }

    #[test]
    fn overflowing_amounts_are_errors_not_panics() {
        let huge = dec!(100000000000000000000);
        assert_matches!(
            line_subtotal(huge, Decimal::ZERO, i32::MAX),
            Err(ServiceError::InternalError(_))
        );
        assert_matches!(
            quotation_total(vec![Decimal::MAX, Decimal::ONE]),
            Err(ServiceError::InternalError(_))
        );
    }

    #[test]
    fn currency_is_two_decimals() {
        assert_eq!(format_currency(dec!(50)), "$50.00");
        assert_eq!(format_currency(dec!(7.005)), "$7.01");
        assert_eq!(format_currency(dec!(1234.5)), "$1234.50");
    }

    fn cents() -> impl Strategy<Value = Decimal> {
        (0i64..10_000_000).prop_map(|c| Decimal::new(c, 2))
    }

    proptest! {
        #[test]
        fn subtotal_is_exact_for_cent_values(precio in cents(), costo in cents(), cantidad in 1i32..100_000) {
            let subtotal = line_subtotal(precio, costo, cantidad).unwrap();
            prop_assert_eq!(subtotal, round_money(subtotal));
            prop_assert_eq!(subtotal / Decimal::from(cantidad), precio + costo);
        }

        #[test]
        fn total_is_sum_of_subtotals(lines in proptest::collection::vec((cents(), cents(), 1i32..500), 0..20)) {
            let subtotals: Vec<Decimal> = lines
                .iter()
                .map(|(p, c, q)| line_subtotal(*p, *c, *q).unwrap())
                .collect();
            let total = quotation_total(subtotals.clone()).unwrap();
            let mut expected = Decimal::ZERO;
            for s in &subtotals {
                expected += *s;
            }
            prop_assert_eq!(total, expected);
        }
    }
}
