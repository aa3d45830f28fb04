use chrono::NaiveDate;
use trip_ledger::*;

fn fleet() -> Fleet {
    Fleet::new(vec![
        TruckRecord::new("t1", "TN45AB1234"),
        TruckRecord::new("t2", "KA01MN0001"),
    ])
}

fn raw_trip(date: &str, truck: &str, destination: &str) -> RawTripInput {
    RawTripInput::from_pairs([
        ("date", date),
        ("truckRef", truck),
        ("destination", destination),
        ("freightAmount", "25000"),
        ("loadingAmount", "300"),
        ("unloadingAmount", "250"),
        ("driverBeta", "500"),
        ("dieselAmount", "3000"),
        ("oilAmount", "500"),
        ("fastTagAmount", "200"),
        ("taxAmount", "1000"),
        ("advanceAmount", "5000"),
    ])
}

#[test]
fn test_worked_example_end_to_end() {
    let trip = InputValidator::new()
        .validate(&raw_trip("2024-04-01", "t1", "Chennai"))
        .unwrap();
    let trip = FormulaRegistry::default().derive_current(&trip);

    assert_eq!(trip.total_expense, 5750.0);
    assert_eq!(trip.balance_amount, 750.0);
    assert_eq!(trip.formula_version, Some(1));
}

#[test]
fn test_validation_stops_at_first_failure() {
    let raw = raw_trip("2024-04-01", "t1", "Chennai")
        .with("loadingAmount", "-5")
        .with("oilAmount", "not a number");

    let err = InputValidator::new().validate(&raw).unwrap_err();
    assert_eq!(err, ValidationError::new("loadingAmount", "must be a non-negative number"));
}

#[test]
fn test_filter_then_export() {
    let validator = InputValidator::new();
    let registry = FormulaRegistry::default();

    let trips: Vec<TripRecord> = [
        ("2024-04-01", "t1", "Chennai"),
        ("2024-04-05", "t2", "Bengaluru"),
        ("2024-04-10", "t1", "Madurai"),
        ("2024-04-11", "gone", "Salem"),
    ]
    .iter()
    .map(|(d, t, dest)| registry.derive_current(&validator.validate(&raw_trip(d, t, dest)).unwrap()))
    .collect();

    let criteria = FilterCriteria::new()
        .since(NaiveDate::from_ymd_opt(2024, 4, 5).unwrap())
        .until(NaiveDate::from_ymd_opt(2024, 4, 11).unwrap());
    let view = RecordFilter::read(&trips, &fleet(), &criteria);

    assert_eq!(view.len(), 3);
    assert_eq!(view.unresolved.len(), 1);
    assert_eq!(view.unresolved[0].truck_ref, "gone");

    let csv = String::from_utf8(ExportSerializer::to_csv(&view.rows).unwrap()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], EXPORT_COLUMNS.join(","));
    assert_eq!(
        lines[1],
        "2024-04-05,KA01MN0001,Bengaluru,0.00,25000.00,300.00,250.00,500.00,3000.00,500.00,200.00,1000.00,5000.00,5750.00,750.00"
    );
    assert!(lines[3].starts_with("2024-04-11,,Salem,"));

    let totals = view.totals();
    assert_eq!(totals.trip_count, 3);
    assert_eq!(totals.total_expense, 17250.0);
    assert_eq!(totals.balance_amount, 2250.0);
}

#[test]
fn test_empty_export_header_only() {
    let csv = String::from_utf8(ExportSerializer::to_csv(&[]).unwrap()).unwrap();
    assert_eq!(csv, format!("{}\n", EXPORT_COLUMNS.join(",")));
    assert_eq!(EXPORT_COLUMNS.len(), 15);
}

#[test]
fn test_store_round_trip_keeps_formula_tag() {
    let store = SqliteStore::open_in_memory().unwrap();
    let truck = store.add_truck("TN 45 AB 1234").unwrap();

    let trip = InputValidator::new()
        .validate(&raw_trip("2024-04-01", &truck.id, "Chennai"))
        .unwrap();
    let trip = FormulaRegistry::default().derive_current(&trip);
    store.insert_trip(&trip).unwrap();

    // Rules move on: v2 adds tolls. The stored trip keeps v1 semantics.
    let mut registry = FormulaRegistry::default();
    let mut components = ExpenseConfig::standard().components;
    components.push(MonetaryField::TollAmount);
    registry
        .register(ExpenseConfig::new(2, components, BalanceFormula::default()).unwrap())
        .unwrap();
    registry.activate(2).unwrap();

    let stored = store.list_trips().unwrap();
    let rederived = registry.rederive_recorded(&stored[0]).unwrap();
    assert_eq!(rederived, stored[0]);

    let view = RecordFilter::read(&stored, &store.fleet().unwrap(), &FilterCriteria::new().for_truck(truck.id.clone()));
    assert_eq!(view.rows[0].vehicle_number.as_deref(), Some("TN45AB1234"));

    // Deleting the truck leaves the trip readable but flagged
    store.delete_truck(&truck.id).unwrap();
    let view = RecordFilter::read(&stored, &store.fleet().unwrap(), &FilterCriteria::new());
    assert_eq!(view.len(), 1);
    assert_eq!(view.unresolved.len(), 1);
}

#[test]
fn test_edit_with_vehicle_number_stays_resolved() {
    let store = SqliteStore::open_in_memory().unwrap();
    let first = store.add_truck("TN 45 AB 1234").unwrap();
    let second = store.add_truck("KA 01 MN 0001").unwrap();
    let registry = FormulaRegistry::default();

    let trip = InputValidator::new()
        .validate(&raw_trip("2024-04-02", &first.id, "Erode"))
        .unwrap();
    let stored = store.insert_trip(&registry.derive_current(&trip)).unwrap();

    let changes = RawTripInput::from_pairs([("truckRef", "ka01mn0001"), ("advanceAmount", "6000")]);
    let edited = InputValidator::new()
        .validate_edit(&stored, &changes, &store.fleet().unwrap())
        .unwrap();
    store.update_trip(&registry.derive_current(&edited)).unwrap();

    let view = RecordFilter::read(
        &store.list_trips().unwrap(),
        &store.fleet().unwrap(),
        &FilterCriteria::new().for_truck(second.id.clone()),
    );
    assert_eq!(view.len(), 1);
    assert!(view.unresolved.is_empty());
    assert_eq!(view.rows[0].vehicle_number.as_deref(), Some("KA01MN0001"));
    assert_eq!(view.rows[0].trip.balance_amount, -250.0);
}

#[test]
fn test_same_run_twice_by_hand_then_reimport() {
    let store = SqliteStore::open_in_memory().unwrap();
    let trip = InputValidator::new()
        .validate(&raw_trip("2024-04-03", "t1", "Salem"))
        .unwrap();
    let trip = FormulaRegistry::default().derive_current(&trip);

    store.insert_trip(&trip).unwrap();
    store.insert_trip(&trip).unwrap();
    assert_eq!(store.count_trips().unwrap(), 2);

    assert_eq!(store.insert_trips(&[trip]).unwrap(), 0);
    assert_eq!(store.count_trips().unwrap(), 2);
}
