// Vehicle registry tests through the public API.
//
// Invariants exercised:
// - The record list and the id index always hold the same vehicles.
// - Parsing never fails as a whole: bad lines are skipped or repaired
//   and every decision is reported with its 1-based line number.
use failfast_collections::registry::{parse_records, ReleaseDate, VehicleRegistry};
use failfast_collections::{RegistryError, Vehicle, VehicleKind};

const SAMPLE: &str = "\
MOTORCYCLE,1,Ducati Monster,82.5,220,2021-03-15,12000.0
QUADRICYCLE,2,Polaris,45,90,2019-07-01,8500.5
moped,3,Vespa Primavera,3.5,45,2020-02-29,3200
SCOOTER,4,Xiaomi,0.35,25,,499.99
";

fn ids(r: &VehicleRegistry) -> Vec<i64> {
    r.iter().map(|v| v.id).collect()
}

#[test]
fn load_sample() {
    let loaded = VehicleRegistry::load(SAMPLE).unwrap();
    let r = &loaded.registry;
    assert_eq!(ids(r), vec![1, 2, 3, 4]);
    assert_eq!(r.get(3).unwrap().kind, VehicleKind::Moped);
    assert_eq!(
        r.get(3).unwrap().release_date,
        ReleaseDate::new(2020, 2, 29)
    );
    assert_eq!(r.get(4).unwrap().release_date, None);
    assert!(loaded.duplicates.is_empty());

    // Only the scooter's empty date is reported.
    let diags: Vec<String> = loaded.diagnostics.iter().map(|d| d.to_string()).collect();
    assert_eq!(diags, vec!["Line 4: empty date".to_string()]);

    let mut indexed: Vec<i64> = r.indexed().map(|v| v.id).collect();
    indexed.sort_unstable();
    assert_eq!(indexed, ids(r));
}

#[test]
fn registry_round_trips_through_text() {
    let loaded = VehicleRegistry::load(SAMPLE).unwrap();
    let text = loaded.registry.to_lines();
    let again = VehicleRegistry::load(&text).unwrap();
    assert_eq!(
        again.registry.iter().collect::<Vec<_>>(),
        loaded.registry.iter().collect::<Vec<_>>()
    );
    assert_eq!(again.registry.to_lines(), text);
}

#[test]
fn crud_keeps_order_and_index() {
    let mut r = VehicleRegistry::load(SAMPLE).unwrap().registry;
    let new = Vehicle {
        id: 10,
        kind: VehicleKind::Scooter,
        model: "Segway".to_string(),
        engine_power: 0.5,
        max_speed: 30,
        release_date: None,
        price: 650.0,
    };
    r.add(new.clone()).unwrap();
    assert_eq!(r.add(new.clone()), Err(RegistryError::DuplicateId(10)));
    assert_eq!(ids(&r), vec![1, 2, 3, 4, 10]);

    let mut cheaper = r.get(2).unwrap().clone();
    cheaper.price = 7000.0;
    let before = r.update(cheaper).unwrap();
    assert_eq!(before.price, 8500.5);
    assert_eq!(r.get(2).unwrap().price, 7000.0);
    assert_eq!(r.iter().nth(1).unwrap().price, 7000.0);

    assert_eq!(r.remove(3).unwrap().model, "Vespa Primavera");
    assert_eq!(r.remove(3), Err(RegistryError::UnknownId(3)));
    assert!(!r.contains(3));
    assert_eq!(ids(&r), vec![1, 2, 4, 10]);
    assert_eq!(r.indexed().count(), r.len());
}

#[test]
fn messy_input_is_repaired() {
    let input = "\
SCOOTER,7,Kick,1.5kW,25 km/h,2022-02-30,$99.90
BUS,8,Big,200,100,2020-01-01,1
MOPED,9,Only,Six,Fields,2020-01-01

MOPED,-3,Neg,-1.5,-10,2020-01-01,-5
";
    let report = parse_records(input);
    assert_eq!(report.vehicles.len(), 2);

    let kick = report.vehicles.get(0).unwrap();
    assert_eq!(kick.engine_power, 1.5);
    assert_eq!(kick.max_speed, 25);
    assert_eq!(kick.price, 99.90);
    assert_eq!(kick.release_date, None);

    let neg = report.vehicles.get(1).unwrap();
    assert_eq!((neg.id, neg.max_speed), (-3, -10));
    assert_eq!(neg.engine_power, -1.5);

    let lines: Vec<usize> = report.diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![1, 2, 3]);
    assert!(report.diagnostics.get(1).unwrap().message.contains("BUS"));
}

// Test: text round trip of extreme decimals.
// Verifies: prices written in exponent form reload exactly.
#[test]
fn exponent_prices_survive_reload() {
    let mut r = VehicleRegistry::new();
    for (id, price) in [(1, 1e17), (2, 1e-7)] {
        r.add(Vehicle {
            id,
            kind: VehicleKind::Moped,
            model: "a".to_string(),
            engine_power: 1.0,
            max_speed: 1,
            release_date: ReleaseDate::new(2020, 1, 1),
            price,
        })
        .unwrap();
    }
    let again = VehicleRegistry::load(&r.to_lines()).unwrap();
    assert!(again.diagnostics.is_empty());
    assert_eq!(again.registry.get(1).unwrap().price, 1e17);
    assert_eq!(again.registry.get(2).unwrap().price, 1e-7);
}

// Test: models that would split the line format.
// Verifies: add refuses them, so to_lines always reloads every record.
#[test]
fn separator_in_model_is_refused() {
    let mut r = VehicleRegistry::load(SAMPLE).unwrap().registry;
    let mut gts = r.get(3).unwrap().clone();
    gts.id = 30;
    gts.model = "Vespa, GTS".to_string();
    assert!(matches!(
        r.add(gts),
        Err(RegistryError::InvalidRecord { id: 30, .. })
    ));
    let reloaded = VehicleRegistry::load(&r.to_lines()).unwrap().registry;
    assert_eq!(reloaded.len(), r.len());
}
