use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use trip_ledger::*;

const EXPENSE_FIELDS: [MonetaryField; 9] = [
    MonetaryField::LoadingAmount,
    MonetaryField::UnloadingAmount,
    MonetaryField::DriverBeta,
    MonetaryField::DieselAmount,
    MonetaryField::OilAmount,
    MonetaryField::FastTagAmount,
    MonetaryField::TaxAmount,
    MonetaryField::TollAmount,
    MonetaryField::OtherExpense,
];

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Amounts in whole paise so the exact expected sum is known
fn arb_cents() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..10_000_000, 12)
}

fn trip_from_cents(cents: &[u64]) -> TripRecord {
    let mut trip = TripRecord::new(base_date(), "t1", "Salem");
    for (field, c) in MonetaryField::ALL.iter().zip(cents) {
        trip.set_amount(*field, *c as f64 / 100.0);
    }
    trip
}

/// Non-negative decimals with up to 15 significant digits and 10 places,
/// paired with the f64 that prints as them
fn arb_decimal() -> impl Strategy<Value = (Decimal, f64)> {
    (0i64..1_000_000_000_000_000, 0u32..=10).prop_map(|(mantissa, scale)| {
        let exact = Decimal::new(mantissa, scale);
        let value: f64 = exact.to_string().parse().unwrap();
        (exact, value)
    })
}

/// Magnitudes from 1e16 up to 1e307, log-spread
fn arb_huge() -> impl Strategy<Value = f64> {
    (16i32..307, 1.0f64..10.0).prop_map(|(exp, mantissa)| mantissa * 10f64.powi(exp))
}

fn arb_trips() -> impl Strategy<Value = Vec<TripRecord>> {
    prop::collection::vec((0i64..120, 0usize..3), 0..40).prop_map(|picks| {
        picks
            .into_iter()
            .enumerate()
            .map(|(idx, (offset, truck))| {
                let date = base_date() + chrono::Duration::days(offset);
                let mut trip = TripRecord::new(date, format!("t{}", truck), "Erode");
                trip.id = Some(format!("trip-{}", idx));
                trip
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// totalExpense is the exact 2-place sum of the configured components,
    /// whatever order the configuration lists them in.
    #[test]
    fn property_total_is_exact_sum_independent_of_order(
        cents in arb_cents(),
        shuffled in Just(EXPENSE_FIELDS.to_vec()).prop_shuffle(),
    ) {
        let trip = trip_from_cents(&cents);

        let ordered = ExpenseConfig::new(1, EXPENSE_FIELDS.to_vec(), BalanceFormula::default()).unwrap();
        let reordered = ExpenseConfig::new(1, shuffled, BalanceFormula::default()).unwrap();

        let a = ExpenseCalculator::new(ordered).unwrap().derive(&trip);
        let b = ExpenseCalculator::new(reordered).unwrap().derive(&trip);

        let expected_cents: u64 = MonetaryField::ALL
            .iter()
            .zip(&cents)
            .filter(|(field, _)| field.is_expense_component())
            .map(|(_, c)| *c)
            .sum();

        prop_assert_eq!(a.total_expense, expected_cents as f64 / 100.0);
        prop_assert_eq!(a.total_expense, b.total_expense);
        prop_assert_eq!(a.balance_amount, b.balance_amount);
    }

    /// balance = total − advance, and deriving twice changes nothing
    #[test]
    fn property_balance_and_idempotence(cents in arb_cents()) {
        let calculator = ExpenseCalculator::default();
        let once = calculator.derive(&trip_from_cents(&cents));
        let twice = calculator.derive(&once);

        prop_assert_eq!(once.balance_amount, round2(once.total_expense - once.advance_amount));
        prop_assert_eq!(once.total_expense.to_bits(), twice.total_expense.to_bits());
        prop_assert_eq!(once.balance_amount.to_bits(), twice.balance_amount.to_bits());
    }

    /// No criteria → same records, same order, same length
    #[test]
    fn property_filter_without_criteria_is_identity(trips in arb_trips()) {
        let result = RecordFilter::apply(&trips, &FilterCriteria::new());
        prop_assert_eq!(result, trips);
    }

    /// Date range keeps exactly D1 ≤ date ≤ D2, boundaries included, order kept
    #[test]
    fn property_date_range_inclusive(trips in arb_trips(), a in 0i64..120, b in 0i64..120) {
        let d1 = base_date() + chrono::Duration::days(a.min(b));
        let d2 = base_date() + chrono::Duration::days(a.max(b));
        let criteria = FilterCriteria::new().since(d1).until(d2);

        let result = RecordFilter::apply(&trips, &criteria);
        let expected: Vec<TripRecord> = trips
            .iter()
            .filter(|t| d1 <= t.date && t.date <= d2)
            .cloned()
            .collect();

        prop_assert_eq!(result, expected);
    }

    /// Every row selected by a truck criterion carries that truck
    #[test]
    fn property_truck_filter_selects_only_that_truck(trips in arb_trips(), truck in 0usize..3) {
        let wanted = format!("t{}", truck);
        let result = RecordFilter::apply(&trips, &FilterCriteria::new().for_truck(wanted.clone()));

        prop_assert!(result.iter().all(|t| t.truck_ref.as_deref() == Some(wanted.as_str())));
        prop_assert_eq!(
            result.len(),
            trips.iter().filter(|t| t.truck_ref.as_deref() == Some(wanted.as_str())).count()
        );
    }

    /// round2 agrees with exact decimal half-away-from-zero rounding
    #[test]
    fn property_round2_matches_decimal_rounding(pair in arb_decimal()) {
        let (exact, value) = pair;
        let expected: f64 = exact
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .to_string()
            .parse()
            .unwrap();
        prop_assert_eq!(round2(value), expected);
    }

    /// Large amounts: finite, within half a paisa, and stable
    #[test]
    fn property_round2_large_magnitudes(value in 1e9f64..1e16) {
        let rounded = round2(value);
        prop_assert!(rounded.is_finite());
        prop_assert!((rounded - value).abs() <= 0.005 + value * 4.0 * f64::EPSILON);
        prop_assert_eq!(round2(rounded), rounded);
    }

    /// Past 2^53 every f64 is whole, so rounding is the identity
    #[test]
    fn property_round2_huge_is_identity(value in arb_huge()) {
        prop_assert_eq!(round2(value), value);
    }

    /// Any validated amounts derive to finite totals
    #[test]
    fn property_validated_amounts_derive_finite(
        amounts in prop::collection::vec(0.0f64..=MAX_AMOUNT, 12),
    ) {
        let mut input = RawTripInput::from_pairs([
            ("date", "2024-01-01"),
            ("truckRef", "t1"),
            ("destination", "Salem"),
        ]);
        for (field, amount) in MonetaryField::ALL.iter().zip(&amounts) {
            input = input.with(field.name(), amount.to_string());
        }

        let trip = InputValidator::new().validate(&input).unwrap();
        let derived = ExpenseCalculator::default().derive(&trip);

        prop_assert!(derived.total_expense.is_finite());
        prop_assert!(derived.balance_amount.is_finite());
        prop_assert_eq!(round2(derived.total_expense), derived.total_expense);
    }
}
