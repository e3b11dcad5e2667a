mod common;

use common::{build, date, raw_feed, sample_snapshot};
use gtfs_pack::container::{Block, BlockKind, Container};
use gtfs_pack::delta::Change;
use gtfs_pack::ids::IdTable;
use gtfs_pack::model::TripTimes;
use gtfs_pack::varint::unpack_time;
use gtfs_pack::{apply_delta, build_delta, inspect, merge_deltas, Delta, Error, Query, Snapshot};

#[test]
fn sample_feed_packs_into_six_blocks() {
    let data = sample_snapshot().to_bytes(true).unwrap();
    let container = Container::parse(&data).unwrap();
    let present: Vec<BlockKind> = container.present().collect();
    let expected = [
        Block::Ids,
        Block::Strings,
        Block::Agencies,
        Block::Stops,
        Block::Routes,
        Block::Trips,
    ];
    assert_eq!(
        present,
        expected.iter().map(|b| BlockKind::Known(*b)).collect::<Vec<_>>()
    );
    for block in expected {
        assert!(!container.raw(block).unwrap().is_empty());
    }

    let snapshot = Snapshot::from_bytes(&data).unwrap();
    assert_eq!(snapshot, sample_snapshot());
    let TripTimes::Schedule(schedule) = &snapshot.feed.trips[0].times else {
        panic!("expected a schedule");
    };
    assert_eq!(schedule.departures[0], Some(5760));
    assert_eq!(unpack_time(5760), 8 * 3600);
    let stop = &snapshot.feed.stops[0];
    let position = stop.position.unwrap();
    assert!((position.lat_degrees() - 50.0).abs() < 1e-9);
    assert!((position.lon_degrees() - 14.0).abs() < 1e-9);
}

#[test]
fn deleted_stop_is_a_single_delete_record() {
    let old = sample_snapshot();
    let mut new = old.clone();
    new.version = 2;
    new.date = date(18);
    new.feed.calendar.base_date = date(18);
    new.feed.stops.clear();
    new.feed.routes.clear();
    new.feed.trips.clear();

    let delta = build_delta(&old, &new).unwrap();
    let data = delta.to_bytes(true).unwrap();
    let query = Query {
        block: Some(Block::Stops),
        id: None,
    };
    let records = inspect(&data, &query).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], 1);
    assert_eq!(records[0]["original_id"], serde_json::Value::Null);
    assert_eq!(records[0]["delete"], true);

    let decoded = Delta::from_bytes(&data).unwrap();
    assert_eq!(decoded.changes.stops.len(), 1);
    assert_eq!(decoded.changes.stops[&1], Change::Deleted);
    assert_eq!(apply_delta(&old, &decoded).unwrap(), new);
}

#[test]
fn packing_is_deterministic() {
    let raw = raw_feed(&[("A", "Museum"), ("B", "Depot")]);
    let first = build(&raw, None, 17).to_bytes(true).unwrap();
    let second = build(&raw, None, 17).to_bytes(true).unwrap();
    assert_eq!(first, second);
}

#[test]
fn ids_are_stable_across_runs() {
    let v1 = build(&raw_feed(&[("A", "Museum"), ("B", "Depot")]), None, 17);
    let v2 = build(&raw_feed(&[("B", "Depot"), ("C", "Harbour")]), Some(&v1), 18);
    assert_eq!(v2.version, 2);
    assert_eq!(v1.ids.get(IdTable::Stops, "B"), v2.ids.get(IdTable::Stops, "B"));
    assert_eq!(v2.ids.get(IdTable::Stops, "A"), Some(1));
    assert_eq!(v2.ids.get(IdTable::Stops, "C"), Some(3));
    assert!(v2.feed.stops.iter().all(|s| s.id != 1));

    let delta = build_delta(&v1, &v2).unwrap();
    assert_eq!(delta.changes.stops[&1], Change::Deleted);
    assert!(matches!(delta.changes.stops[&3], Change::Added(_)));
    assert!(!delta.changes.stops.contains_key(&2));
}

#[test]
fn applying_a_delta_reproduces_the_new_snapshot() {
    let v1 = build(&raw_feed(&[("A", "Museum"), ("B", "Depot")]), None, 17);
    let mut raw = raw_feed(&[("A", "Museum Gate"), ("B", "Depot"), ("C", "Harbour")]);
    raw.stops[1].wheelchair_boarding = 1;
    let v2 = build(&raw, Some(&v1), 20);

    let delta = build_delta(&v1, &v2).unwrap();
    let packed = Delta::from_bytes(&delta.to_bytes(true).unwrap()).unwrap();
    assert_eq!(packed, delta);
    assert_eq!(apply_delta(&v1, &packed).unwrap(), v2);

    let stored = Snapshot::from_bytes(&v2.to_bytes(false).unwrap()).unwrap();
    assert_eq!(stored, v2);
}

#[test]
fn merging_is_associative() {
    let a = build(&raw_feed(&[("A", "Museum"), ("B", "Depot")]), None, 17);
    let b = build(&raw_feed(&[("A", "Museum"), ("C", "Harbour")]), Some(&a), 18);
    let c = build(&raw_feed(&[("A", "Old Museum"), ("C", "Harbour")]), Some(&b), 19);
    let d = build(&raw_feed(&[("D", "Airport"), ("C", "Harbour")]), Some(&c), 20);
    let ab = build_delta(&a, &b).unwrap();
    let bc = build_delta(&b, &c).unwrap();
    let cd = build_delta(&c, &d).unwrap();

    let left = merge_deltas(&merge_deltas(&ab, &bc).unwrap(), &cd).unwrap();
    let right = merge_deltas(&ab, &merge_deltas(&bc, &cd).unwrap()).unwrap();
    assert_eq!(left.old_version, 1);
    assert_eq!(left.version, 4);
    assert_eq!(apply_delta(&a, &left).unwrap(), d);
    assert_eq!(apply_delta(&a, &right).unwrap(), d);
}

#[test]
fn added_then_deleted_stop_cancels_out() {
    let a = build(&raw_feed(&[("A", "Museum")]), None, 17);
    let b = build(&raw_feed(&[("A", "Museum"), ("X", "Fair")]), Some(&a), 18);
    let c = build(&raw_feed(&[("A", "Museum")]), Some(&b), 19);
    let x = b.ids.get(IdTable::Stops, "X").unwrap();

    let merged = merge_deltas(&build_delta(&a, &b).unwrap(), &build_delta(&b, &c).unwrap()).unwrap();
    assert!(!merged.changes.stops.contains_key(&x));
    assert_eq!(apply_delta(&a, &merged).unwrap(), c);
}

#[test]
fn deltas_of_other_lineages_are_rejected() {
    let a = build(&raw_feed(&[("A", "Museum")]), None, 17);
    let b = build(&raw_feed(&[("A", "Museum"), ("B", "Depot")]), Some(&a), 18);
    let c = build(&raw_feed(&[("B", "Depot")]), Some(&b), 19);
    let bc = build_delta(&b, &c).unwrap();

    assert!(matches!(apply_delta(&a, &bc), Err(Error::Lineage { .. })));
    assert!(matches!(
        merge_deltas(&bc, &build_delta(&a, &b).unwrap()),
        Err(Error::Lineage { .. })
    ));
}

#[test]
fn reappearing_stop_merges_across_runs() {
    let a = build(&raw_feed(&[("A", "Museum"), ("B", "Depot")]), None, 17);
    let b = build(&raw_feed(&[("A", "Museum")]), Some(&a), 18);
    let c = build(&raw_feed(&[("A", "Museum"), ("B", "Depot")]), Some(&b), 19);
    let stop = a.ids.get(IdTable::Stops, "B").unwrap();
    assert_eq!(c.ids.get(IdTable::Stops, "B"), Some(stop));

    let merged = merge_deltas(&build_delta(&a, &b).unwrap(), &build_delta(&b, &c).unwrap()).unwrap();
    assert!(matches!(merged.changes.stops[&stop], Change::Changed(_)));
    assert_eq!(apply_delta(&a, &merged).unwrap(), c);
}

#[test]
fn direct_delta_reproduces_a_later_build() {
    let a = build(&raw_feed(&[("A", "Museum"), ("B", "Depot")]), None, 17);
    let c = build(&raw_feed(&[("A", "Museum"), ("C", "Harbour")]), Some(&a), 19);
    let delta = build_delta(&a, &c).unwrap();
    assert_eq!(apply_delta(&a, &delta).unwrap(), c);
    let packed = Delta::from_bytes(&delta.to_bytes(false).unwrap()).unwrap();
    assert_eq!(apply_delta(&a, &packed).unwrap(), c);
}
