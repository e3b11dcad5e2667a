//! Mapping of source string ids to stable integer ids, carried from run to run.
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::wire;

/// Tables with their own id space. The code matches the block number for tables that
/// have a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum IdTable {
    Agencies,
    Services,
    Shapes,
    Stops,
    Routes,
    Trips,
    Networks,
    Areas,
    Itineraries,
    Zones,
}

impl IdTable {
    pub const ALL: [IdTable; 10] = [
        IdTable::Agencies,
        IdTable::Services,
        IdTable::Shapes,
        IdTable::Stops,
        IdTable::Routes,
        IdTable::Trips,
        IdTable::Networks,
        IdTable::Areas,
        IdTable::Itineraries,
        IdTable::Zones,
    ];

    pub fn code(self) -> u32 {
        match self {
            IdTable::Agencies => 3,
            IdTable::Services => 4,
            IdTable::Shapes => 5,
            IdTable::Stops => 6,
            IdTable::Routes => 7,
            IdTable::Trips => 8,
            IdTable::Networks => 10,
            IdTable::Areas => 11,
            IdTable::Itineraries => 14,
            IdTable::Zones => 15,
        }
    }

    pub fn from_code(code: u32) -> Option<IdTable> {
        IdTable::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            IdTable::Agencies => "agencies",
            IdTable::Services => "services",
            IdTable::Shapes => "shapes",
            IdTable::Stops => "stops",
            IdTable::Routes => "routes",
            IdTable::Trips => "trips",
            IdTable::Networks => "networks",
            IdTable::Areas => "areas",
            IdTable::Itineraries => "itineraries",
            IdTable::Zones => "zones",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct IdList {
    ids: Vec<String>,
    index: HashMap<String, u32>,
}

impl IdList {
    fn from_ids(table: IdTable, ids: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i as u32 + 1).is_some() {
                return Err(Error::Format(format!(
                    "duplicate source id {:?} in {}",
                    id,
                    table.name()
                )));
            }
        }
        Ok(IdList { ids, index })
    }

    fn push(&mut self, id: &str) -> u32 {
        self.ids.push(id.to_string());
        let stable = self.ids.len() as u32;
        self.index.insert(id.to_string(), stable);
        stable
    }
}

/// The stable id assignments of every table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdStore {
    tables: BTreeMap<IdTable, IdList>,
}

impl IdStore {
    pub fn new() -> Self {
        IdStore::default()
    }

    /// Returns the stable id of a source id, assigning the next free one on first sight.
    pub fn resolve(&mut self, table: IdTable, source: &str) -> u32 {
        let list = self.tables.entry(table).or_default();
        match list.index.get(source) {
            Some(id) => *id,
            None => list.push(source),
        }
    }

    pub fn get(&self, table: IdTable, source: &str) -> Option<u32> {
        self.tables.get(&table)?.index.get(source).copied()
    }

    /// The source id a stable id was assigned to.
    pub fn original(&self, table: IdTable, id: u32) -> Option<&str> {
        let list = self.tables.get(&table)?;
        let i = id.checked_sub(1)? as usize;
        list.ids.get(i).map(|s| s.as_str())
    }

    /// The highest stable id assigned in the table, 0 when none.
    pub fn last_id(&self, table: IdTable) -> u32 {
        self.tables.get(&table).map_or(0, |l| l.ids.len() as u32)
    }

    pub fn ids(&self, table: IdTable) -> &[String] {
        self.tables.get(&table).map_or(&[], |l| l.ids.as_slice())
    }

    /// Describes the ids this store has on top of `older`, which must be its prefix.
    pub fn delta_from(&self, older: &IdStore) -> Result<IdDelta> {
        let mut tables = BTreeMap::new();
        for table in IdTable::ALL {
            let old = older.ids(table);
            let new = self.ids(table);
            if old.len() > new.len() {
                return Err(Error::lineage(
                    table.name(),
                    new.len() as u32 + 1,
                    "id missing from the newer store",
                ));
            }
            if let Some(i) = old.iter().zip(new).position(|(a, b)| a != b) {
                return Err(Error::lineage(
                    table.name(),
                    i as u32 + 1,
                    format!("id was {:?}, now {:?}", old[i], new[i]),
                ));
            }
            tables.insert(
                table,
                IdSuffix {
                    skip: old.len() as u32,
                    ids: new[old.len()..].to_vec(),
                },
            );
        }
        Ok(IdDelta { tables })
    }

    /// Extends the store with ids from a delta built against a store like this one.
    pub fn apply_delta(&mut self, delta: &IdDelta) -> Result<()> {
        for (table, suffix) in &delta.tables {
            let last = self.last_id(*table);
            if suffix.skip > last {
                return Err(Error::lineage(
                    table.name(),
                    suffix.skip,
                    format!("delta skips {} ids, only {} are known", suffix.skip, last),
                ));
            }
            if suffix.ids.is_empty() {
                continue;
            }
            let list = self.tables.entry(*table).or_default();
            for (i, source) in suffix.ids.iter().enumerate() {
                let id = suffix.skip + 1 + i as u32;
                if id <= last {
                    if list.ids[id as usize - 1] != *source {
                        return Err(Error::lineage(
                            table.name(),
                            id,
                            format!("delta has {:?}, store has {:?}", source, list.ids[id as usize - 1]),
                        ));
                    }
                } else {
                    list.push(source);
                }
            }
        }
        Ok(())
    }

    pub fn to_message(&self) -> wire::IdStore {
        let refs = self
            .tables
            .iter()
            .filter(|(_, list)| !list.ids.is_empty())
            .map(|(table, list)| wire::IdReference {
                block: table.code(),
                ids: list.ids.clone(),
                delta_skip: 0,
            })
            .collect();
        wire::IdStore { refs }
    }

    pub fn from_message(message: wire::IdStore) -> Result<Self> {
        let mut tables = BTreeMap::new();
        for r in message.refs {
            let table = id_table(r.block)?;
            if r.delta_skip != 0 {
                return Err(Error::Format(format!(
                    "snapshot id list for {} skips {} ids",
                    table.name(),
                    r.delta_skip
                )));
            }
            tables.insert(table, IdList::from_ids(table, r.ids)?);
        }
        Ok(IdStore { tables })
    }
}

fn id_table(code: u32) -> Result<IdTable> {
    IdTable::from_code(code).ok_or_else(|| Error::Format(format!("unknown id table {}", code)))
}

/// Ids appended to a table after its first `skip` ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdSuffix {
    pub skip: u32,
    pub ids: Vec<String>,
}

impl IdSuffix {
    pub fn last_id(&self) -> u32 {
        self.skip + self.ids.len() as u32
    }
}

/// The id part of a delta: for every table, the ids known before and the ones added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdDelta {
    pub tables: BTreeMap<IdTable, IdSuffix>,
}

impl IdDelta {
    /// Number of ids the delta expects the base to have; anything above is new.
    pub fn skip(&self, table: IdTable) -> u32 {
        self.tables.get(&table).map_or(0, |s| s.skip)
    }

    pub fn source(&self, table: IdTable, id: u32) -> Option<&str> {
        let suffix = self.tables.get(&table)?;
        let i = id.checked_sub(suffix.skip + 1)? as usize;
        suffix.ids.get(i).map(|s| s.as_str())
    }

    /// Composes two consecutive id deltas into one going from the first's base.
    pub fn merge(first: &IdDelta, second: &IdDelta) -> Result<IdDelta> {
        let mut tables = BTreeMap::new();
        for table in IdTable::ALL {
            let a = first.tables.get(&table).cloned().unwrap_or_default();
            let b = match second.tables.get(&table) {
                Some(b) => b,
                None => {
                    tables.insert(table, a);
                    continue;
                }
            };
            let end = a.last_id();
            if b.skip > end {
                return Err(Error::lineage(
                    table.name(),
                    b.skip,
                    format!("second delta skips {} ids, first one ends at {}", b.skip, end),
                ));
            }
            let mut merged = a;
            for (i, source) in b.ids.iter().enumerate() {
                let id = b.skip + 1 + i as u32;
                if id > end {
                    merged.ids.push(source.clone());
                } else if id > merged.skip {
                    let known = &merged.ids[(id - merged.skip - 1) as usize];
                    if known != source {
                        return Err(Error::lineage(
                            table.name(),
                            id,
                            format!("first delta has {:?}, second has {:?}", known, source),
                        ));
                    }
                }
            }
            tables.insert(table, merged);
        }
        Ok(IdDelta { tables })
    }

    /// Every table gets a reference, so the consumer can check its skip count.
    pub fn to_message(&self) -> wire::IdStore {
        let refs = IdTable::ALL
            .iter()
            .map(|table| {
                let suffix = self.tables.get(table).cloned().unwrap_or_default();
                wire::IdReference {
                    block: table.code(),
                    ids: suffix.ids,
                    delta_skip: suffix.skip,
                }
            })
            .collect();
        wire::IdStore { refs }
    }

    pub fn from_message(message: wire::IdStore) -> Result<Self> {
        let mut tables = BTreeMap::new();
        for r in message.refs {
            tables.insert(
                id_table(r.block)?,
                IdSuffix {
                    skip: r.delta_skip,
                    ids: r.ids,
                },
            );
        }
        Ok(IdDelta { tables })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(stops: &[&str]) -> IdStore {
        let mut store = IdStore::new();
        for s in stops {
            store.resolve(IdTable::Stops, s);
        }
        store
    }

    #[test]
    fn ids_are_assigned_in_first_seen_order() {
        let mut store = IdStore::new();
        assert_eq!(store.resolve(IdTable::Stops, "S1"), 1);
        assert_eq!(store.resolve(IdTable::Stops, "S2"), 2);
        assert_eq!(store.resolve(IdTable::Stops, "S1"), 1);
        assert_eq!(store.resolve(IdTable::Routes, "S1"), 1);
        assert_eq!(store.get(IdTable::Stops, "S2"), Some(2));
        assert_eq!(store.original(IdTable::Stops, 2), Some("S2"));
        assert_eq!(store.original(IdTable::Stops, 0), None);
        assert_eq!(store.last_id(IdTable::Stops), 2);
        assert_eq!(store.last_id(IdTable::Trips), 0);
    }

    #[test]
    fn message_keeps_ids() {
        let store = store(&["A", "B", "C"]);
        let restored = IdStore::from_message(store.to_message()).unwrap();
        assert_eq!(restored, store);
        assert_eq!(restored.get(IdTable::Stops, "C"), Some(3));
    }

    #[test]
    fn delta_carries_new_suffix() {
        let old = store(&["A", "B"]);
        let new = store(&["A", "B", "C", "D"]);
        let delta = new.delta_from(&old).unwrap();
        let stops = &delta.tables[&IdTable::Stops];
        assert_eq!(stops.skip, 2);
        assert_eq!(stops.ids, vec!["C".to_string(), "D".to_string()]);
        assert_eq!(delta.source(IdTable::Stops, 4), Some("D"));

        let mut applied = old.clone();
        applied.apply_delta(&delta).unwrap();
        assert_eq!(applied, new);
    }

    #[test]
    fn applied_store_equals_built_store() {
        let old = store(&["A"]);
        let mut new = store(&["A", "B"]);
        new.resolve(IdTable::Routes, "R1");
        let delta = new.delta_from(&old).unwrap();
        let restored = IdDelta::from_message(delta.to_message()).unwrap();
        assert_eq!(restored.tables.len(), IdTable::ALL.len());

        let mut applied = old.clone();
        applied.apply_delta(&restored).unwrap();
        assert_eq!(applied, new);
        assert!(applied.tables.get(&IdTable::Shapes).is_none());
    }

    #[test]
    fn diverged_stores_are_a_lineage_error() {
        let old = store(&["A", "B"]);
        let new = store(&["A", "X", "C"]);
        assert!(matches!(new.delta_from(&old), Err(Error::Lineage { id: 2, .. })));
    }

    #[test]
    fn applying_to_a_short_store_fails() {
        let delta = store(&["A", "B", "C"]).delta_from(&store(&["A", "B"])).unwrap();
        let mut short = store(&["A"]);
        assert!(matches!(
            short.apply_delta(&delta),
            Err(Error::Lineage { table: "stops", .. })
        ));
    }

    #[test]
    fn merged_suffixes_concatenate() {
        let a = store(&["A"]);
        let b = store(&["A", "B"]);
        let c = store(&["A", "B", "C"]);
        let ab = b.delta_from(&a).unwrap();
        let bc = c.delta_from(&b).unwrap();
        let merged = IdDelta::merge(&ab, &bc).unwrap();
        assert_eq!(merged, c.delta_from(&a).unwrap());
    }

    #[test]
    fn merge_with_a_gap_fails() {
        let ab = store(&["A", "B"]).delta_from(&store(&["A"])).unwrap();
        let cd = store(&["A", "B", "C", "D"])
            .delta_from(&store(&["A", "B", "C"]))
            .unwrap();
        assert!(matches!(IdDelta::merge(&ab, &cd), Err(Error::Lineage { .. })));
    }
}
