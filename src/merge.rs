//! Composition of two consecutive deltas into one.
use std::collections::BTreeMap;

use crate::delta::{CalendarDelta, Change, Delta, FareLinksDelta, FeedDelta, TableDelta};
use crate::error::{Error, Result};
use crate::ids::{IdDelta, IdTable};
use crate::model::TransferKey;
use crate::record::Record;

fn compose<R: Record>(id: u32, first: Change<R>, second: Change<R>) -> Result<Option<Change<R>>> {
    let table = R::TABLE.name();
    Ok(match (first, second) {
        // A record that reappears under its old id is changed with every field set.
        (Change::Deleted, Change::Changed(patch)) => Some(Change::Changed(patch)),
        (Change::Deleted, Change::Added(_)) => {
            return Err(Error::lineage(table, id, "added after it was deleted"))
        }
        (Change::Deleted, Change::Deleted) => {
            return Err(Error::lineage(table, id, "deleted twice"))
        }
        (_, Change::Added(_)) => return Err(Error::lineage(table, id, "added twice")),
        (Change::Added(_), Change::Deleted) => None,
        (Change::Added(mut record), Change::Changed(patch)) => {
            record.apply(&patch);
            Some(Change::Added(record))
        }
        (Change::Changed(_), Change::Deleted) => Some(Change::Deleted),
        (Change::Changed(a), Change::Changed(b)) => Some(Change::Changed(R::combine(a, b)?)),
    })
}

/// Merges the changes of one table. `skip` is the number of ids the merged delta's base
/// knows; changes above it become additions.
pub fn merge_table<R: Record>(
    first: &TableDelta<R>,
    second: &TableDelta<R>,
    skip: u32,
) -> Result<TableDelta<R>> {
    let mut merged = first.clone();
    for (id, change) in second {
        match merged.remove(id) {
            Some(earlier) => {
                if let Some(change) = compose(*id, earlier, change.clone())? {
                    merged.insert(*id, change);
                }
            }
            None => {
                merged.insert(*id, change.clone());
            }
        }
    }
    for (id, change) in merged.iter_mut() {
        if *id > skip {
            if let Change::Changed(patch) = &*change {
                let added = Change::Added(R::from_patch(*id, patch));
                *change = added;
            }
        }
    }
    Ok(merged)
}

/// Later values win. A removal of a key the merged base cannot have (`fresh`) is dropped.
fn merge_map<K: Ord + Copy, V: Clone>(
    first: &BTreeMap<K, Option<V>>,
    second: &BTreeMap<K, Option<V>>,
    fresh: impl Fn(&K) -> bool,
) -> BTreeMap<K, Option<V>> {
    let mut merged = first.clone();
    for (key, value) in second {
        if value.is_none() && fresh(key) {
            merged.remove(key);
        } else {
            merged.insert(*key, value.clone());
        }
    }
    merged
}

/// Same as [`merge_map`] for links, where a target of 0 is a removal.
fn merge_links(first: &BTreeMap<u32, u32>, second: &BTreeMap<u32, u32>, skip: u32) -> BTreeMap<u32, u32> {
    let mut merged = first.clone();
    for (id, target) in second {
        if *target == 0 && *id > skip {
            merged.remove(id);
        } else {
            merged.insert(*id, *target);
        }
    }
    merged
}

/// Single delta from the base of `first` to the result of `second`.
pub fn merge_deltas(first: &Delta, second: &Delta) -> Result<Delta> {
    if first.version != second.old_version {
        return Err(Error::lineage(
            "header",
            second.old_version,
            format!(
                "first delta ends at version {}, second starts at {}",
                first.version, second.old_version
            ),
        ));
    }
    let ids = IdDelta::merge(&first.ids, &second.ids)?;
    let skip = |table| ids.skip(table);
    let (a, b) = (&first.changes, &second.changes);

    let changes = FeedDelta {
        agencies: merge_table(&a.agencies, &b.agencies, skip(IdTable::Agencies))?,
        calendar: CalendarDelta {
            base_date: b.calendar.base_date.or(a.calendar.base_date),
            services: merge_table(
                &a.calendar.services,
                &b.calendar.services,
                skip(IdTable::Services),
            )?,
        },
        shapes: merge_table(&a.shapes, &b.shapes, skip(IdTable::Shapes))?,
        stops: merge_table(&a.stops, &b.stops, skip(IdTable::Stops))?,
        routes: merge_table(&a.routes, &b.routes, skip(IdTable::Routes))?,
        trips: merge_table(&a.trips, &b.trips, skip(IdTable::Trips))?,
        transfers: merge_map(&a.transfers, &b.transfers, |key: &TransferKey| {
            let (stops, routes, trips) = (skip(IdTable::Stops), skip(IdTable::Routes), skip(IdTable::Trips));
            key.from_stop > stops
                || key.to_stop > stops
                || key.from_route > routes
                || key.to_route > routes
                || key.from_trip > trips
                || key.to_trip > trips
        }),
        networks: merge_map(&a.networks, &b.networks, |id| *id > skip(IdTable::Networks)),
        areas: merge_map(&a.areas, &b.areas, |id| *id > skip(IdTable::Areas)),
        fare_links: FareLinksDelta {
            stop_areas: merge_links(&a.fare_links.stop_areas, &b.fare_links.stop_areas, skip(IdTable::Stops)),
            stop_zones: merge_links(&a.fare_links.stop_zones, &b.fare_links.stop_zones, skip(IdTable::Stops)),
            route_networks: merge_links(
                &a.fare_links.route_networks,
                &b.fare_links.route_networks,
                skip(IdTable::Routes),
            ),
        },
    };
    Ok(Delta {
        old_version: first.old_version,
        version: second.version,
        date: second.date,
        ids,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Agency;
    use crate::record::{AgencyPatch, Field};

    fn agency(id: u32, name: &str) -> Agency {
        Agency {
            id,
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn rename(name: &str) -> AgencyPatch {
        AgencyPatch {
            name: Field::Set(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn added_then_deleted_cancels_out() {
        let first = BTreeMap::from([(5, Change::Added(agency(5, "New")))]);
        let second = BTreeMap::from([(5, Change::Deleted)]);
        let merged = merge_table(&first, &second, 4).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn added_then_changed_stays_added() {
        let first = BTreeMap::from([(5, Change::Added(agency(5, "New")))]);
        let second = BTreeMap::from([(5, Change::Changed(rename("Newer")))]);
        let merged = merge_table(&first, &second, 4).unwrap();
        assert_eq!(merged[&5], Change::Added(agency(5, "Newer")));
    }

    #[test]
    fn changes_combine_field_by_field() {
        let mut url = rename("First");
        url.url = Field::Set("https://first".to_string());
        let first = BTreeMap::from([(2, Change::<Agency>::Changed(url))]);
        let second = BTreeMap::from([(2, Change::Changed(rename("Second"))), (3, Change::Deleted)]);
        let merged = merge_table(&first, &second, 4).unwrap();
        match &merged[&2] {
            Change::Changed(patch) => {
                assert_eq!(patch.name, Field::Set("Second".to_string()));
                assert_eq!(patch.url, Field::Set("https://first".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(merged[&3], Change::Deleted);
    }

    #[test]
    fn deleted_then_changed_reappears() {
        let first = BTreeMap::from([(2, Change::<Agency>::Deleted)]);
        let second = BTreeMap::from([(2, Change::Changed(rename("Back")))]);
        let merged = merge_table(&first, &second, 4).unwrap();
        assert_eq!(merged[&2], Change::Changed(rename("Back")));
    }

    #[test]
    fn deleted_then_added_is_a_lineage_error() {
        let first = BTreeMap::from([(2, Change::<Agency>::Deleted)]);
        let second = BTreeMap::from([(2, Change::Added(agency(2, "Back")))]);
        assert!(matches!(
            merge_table(&first, &second, 4),
            Err(Error::Lineage { id: 2, .. })
        ));
    }

    #[test]
    fn names_added_then_removed_cancel_out() {
        let first = BTreeMap::from([(3, Some("Zone A".to_string())), (5, Some("Airport".to_string()))]);
        let second = BTreeMap::from([(3, None), (5, None)]);
        let merged = merge_map(&first, &second, |id| *id > 4);
        assert_eq!(merged, BTreeMap::from([(3, None)]));
    }

    #[test]
    fn links_added_then_removed_cancel_out() {
        let first = BTreeMap::from([(2, 7), (6, 7)]);
        let second = BTreeMap::from([(2, 0), (6, 0)]);
        assert_eq!(merge_links(&first, &second, 4), BTreeMap::from([(2, 0)]));
    }

    #[test]
    fn changes_above_the_skip_become_additions() {
        let first = BTreeMap::new();
        let second = BTreeMap::from([(7, Change::<Agency>::Changed(rename("Late")))]);
        let merged = merge_table(&first, &second, 4).unwrap();
        assert_eq!(merged[&7], Change::Added(agency(7, "Late")));
    }
}
