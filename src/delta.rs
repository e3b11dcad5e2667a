//! Differences between two snapshots of one feed lineage.
//!
//! Every table becomes a map from stable id to a [`Change`]. Whether an entry is an
//! addition is decided by its id alone: ids above the number of ids the older snapshot
//! knew are new. Anything at or below that is a change, even when the older snapshot
//! had no such record, and the change then carries every field.
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use prost::Message;
use serde::Serialize;

use crate::calendar;
use crate::codec::{self, Entry, TableCodec};
use crate::container::{self, Block, Container, FileKind, Header};
use crate::error::{Error, Result};
use crate::ids::IdDelta;
use crate::model::{Agency, Route, Service, Shape, Stop, Transfer, TransferKey, Trip};
use crate::record::Record;
use crate::snapshot::Snapshot;
use crate::strings::StringTable;
use crate::wire;

#[derive(Debug, Clone, PartialEq)]
pub enum Change<R: Record> {
    Added(R),
    Changed(R::Patch),
    Deleted,
}

pub type TableDelta<R> = BTreeMap<u32, Change<R>>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalendarDelta {
    /// Set when the block is present; unchanged services are re-read against it.
    pub base_date: Option<NaiveDate>,
    pub services: TableDelta<Service>,
}

/// Fare link changes; a target of 0 removes the link.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FareLinksDelta {
    pub stop_areas: BTreeMap<u32, u32>,
    pub stop_zones: BTreeMap<u32, u32>,
    pub route_networks: BTreeMap<u32, u32>,
}

impl FareLinksDelta {
    pub fn is_empty(&self) -> bool {
        self.stop_areas.is_empty() && self.stop_zones.is_empty() && self.route_networks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedDelta {
    pub agencies: TableDelta<Agency>,
    pub calendar: CalendarDelta,
    pub shapes: TableDelta<Shape>,
    pub stops: TableDelta<Stop>,
    pub routes: TableDelta<Route>,
    pub trips: TableDelta<Trip>,
    /// `None` removes the transfer.
    pub transfers: BTreeMap<TransferKey, Option<Transfer>>,
    /// `None` removes the name.
    pub networks: BTreeMap<u32, Option<String>>,
    pub areas: BTreeMap<u32, Option<String>>,
    pub fare_links: FareLinksDelta,
}

impl FeedDelta {
    pub fn is_empty(&self) -> bool {
        self.agencies.is_empty()
            && self.calendar.base_date.is_none()
            && self.calendar.services.is_empty()
            && self.shapes.is_empty()
            && self.stops.is_empty()
            && self.routes.is_empty()
            && self.trips.is_empty()
            && self.transfers.is_empty()
            && self.networks.is_empty()
            && self.areas.is_empty()
            && self.fare_links.is_empty()
    }
}

/// Changes turning snapshot `old_version` into `version`.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    pub old_version: u32,
    pub version: u32,
    pub date: NaiveDate,
    pub ids: IdDelta,
    pub changes: FeedDelta,
}

/// Changes per record. `known` is the number of ids the older side had assigned.
pub fn diff_table<R: Record>(old: &[R], new: &[R], known: u32) -> TableDelta<R> {
    let old_by_id: HashMap<u32, &R> = old.iter().map(|r| (r.id(), r)).collect();
    let mut changes = BTreeMap::new();
    for record in new {
        let id = record.id();
        match old_by_id.get(&id) {
            Some(previous) if *previous == record => {}
            Some(previous) => {
                changes.insert(id, Change::Changed(previous.diff(record)));
            }
            None if id > known => {
                changes.insert(id, Change::Added(record.clone()));
            }
            None => {
                changes.insert(id, Change::Changed(record.full_patch()));
            }
        }
    }
    let new_ids: HashSet<u32> = new.iter().map(|r| r.id()).collect();
    for record in old {
        if !new_ids.contains(&record.id()) {
            changes.insert(record.id(), Change::Deleted);
        }
    }
    changes
}

fn diff_map<K: Ord + Copy, V: Clone + PartialEq>(
    old: &BTreeMap<K, V>,
    new: &BTreeMap<K, V>,
) -> BTreeMap<K, Option<V>> {
    let mut changes = BTreeMap::new();
    for (key, value) in new {
        if old.get(key) != Some(value) {
            changes.insert(*key, Some(value.clone()));
        }
    }
    for key in old.keys() {
        if !new.contains_key(key) {
            changes.insert(*key, None);
        }
    }
    changes
}

fn diff_links(old: &BTreeMap<u32, u32>, new: &BTreeMap<u32, u32>) -> BTreeMap<u32, u32> {
    diff_map(old, new)
        .into_iter()
        .map(|(id, target)| (id, target.unwrap_or(0)))
        .collect()
}

/// Builds the delta from `old` to `new`. Both must come from one id lineage.
pub fn build_delta(old: &Snapshot, new: &Snapshot) -> Result<Delta> {
    let ids = new.ids.delta_from(&old.ids)?;
    let (o, n) = (&old.feed, &new.feed);
    let known = |table| old.ids.last_id(table);

    log::info!("Comparing calendars...");
    let base = n.calendar.base_date;
    let old_services: Vec<Service> = o.calendar.services.iter().map(|s| s.since(base)).collect();
    let services = diff_table(&old_services, &n.calendar.services, known(Service::TABLE));
    let base_changed = o.calendar.base_date != base;
    let calendar = CalendarDelta {
        base_date: (base_changed || !services.is_empty()).then_some(base),
        services,
    };

    log::info!("Comparing stops, routes and trips...");
    let transfers_old: BTreeMap<TransferKey, Transfer> =
        o.transfers.iter().map(|t| (t.key, t.clone())).collect();
    let transfers_new: BTreeMap<TransferKey, Transfer> =
        n.transfers.iter().map(|t| (t.key, t.clone())).collect();
    let changes = FeedDelta {
        agencies: diff_table(&o.agencies, &n.agencies, known(Agency::TABLE)),
        calendar,
        shapes: diff_table(&o.shapes, &n.shapes, known(Shape::TABLE)),
        stops: diff_table(&o.stops, &n.stops, known(Stop::TABLE)),
        routes: diff_table(&o.routes, &n.routes, known(Route::TABLE)),
        trips: diff_table(&o.trips, &n.trips, known(Trip::TABLE)),
        transfers: diff_map(&transfers_old, &transfers_new),
        networks: diff_map(&o.networks, &n.networks),
        areas: diff_map(&o.areas, &n.areas),
        fare_links: FareLinksDelta {
            stop_areas: diff_links(&o.fare_links.stop_areas, &n.fare_links.stop_areas),
            stop_zones: diff_links(&o.fare_links.stop_zones, &n.fare_links.stop_zones),
            route_networks: diff_links(&o.fare_links.route_networks, &n.fare_links.route_networks),
        },
    };
    log::debug!(
        "Delta has {} stop, {} route and {} trip changes",
        changes.stops.len(),
        changes.routes.len(),
        changes.trips.len()
    );
    Ok(Delta {
        old_version: old.version,
        version: new.version,
        date: new.date,
        ids,
        changes,
    })
}

fn apply_table<R: Record>(records: &mut Vec<R>, changes: &TableDelta<R>) -> Result<()> {
    let mut by_id: BTreeMap<u32, R> = records.drain(..).map(|r| (r.id(), r)).collect();
    for (id, change) in changes {
        match change {
            Change::Added(record) => {
                if by_id.insert(*id, record.clone()).is_some() {
                    return Err(Error::lineage(
                        R::TABLE.name(),
                        *id,
                        "added, but the base already has it",
                    ));
                }
            }
            Change::Changed(patch) => by_id
                .entry(*id)
                .or_insert_with(|| R::blank(*id))
                .apply(patch),
            Change::Deleted => {
                by_id.remove(id);
            }
        }
    }
    records.extend(by_id.into_values());
    Ok(())
}

fn apply_map<K: Ord + Copy, V: Clone>(target: &mut BTreeMap<K, V>, changes: &BTreeMap<K, Option<V>>) {
    for (key, value) in changes {
        match value {
            Some(value) => target.insert(*key, value.clone()),
            None => target.remove(key),
        };
    }
}

fn apply_links(target: &mut BTreeMap<u32, u32>, changes: &BTreeMap<u32, u32>) {
    for (id, value) in changes {
        if *value == 0 {
            target.remove(id);
        } else {
            target.insert(*id, *value);
        }
    }
}

/// Applies a delta to the snapshot it was built against.
pub fn apply_delta(base: &Snapshot, delta: &Delta) -> Result<Snapshot> {
    if base.version != delta.old_version {
        return Err(Error::lineage(
            "header",
            delta.old_version,
            format!("delta applies to version {}, base is {}", delta.old_version, base.version),
        ));
    }
    let mut ids = base.ids.clone();
    ids.apply_delta(&delta.ids)?;

    let mut feed = base.feed.clone();
    let changes = &delta.changes;
    apply_table(&mut feed.agencies, &changes.agencies)?;
    if let Some(base_date) = changes.calendar.base_date {
        feed.calendar.base_date = base_date;
    }
    apply_table(&mut feed.calendar.services, &changes.calendar.services)?;
    feed.calendar.normalize();
    apply_table(&mut feed.shapes, &changes.shapes)?;
    apply_table(&mut feed.stops, &changes.stops)?;
    apply_table(&mut feed.routes, &changes.routes)?;
    apply_table(&mut feed.trips, &changes.trips)?;

    let mut transfers: BTreeMap<TransferKey, Transfer> =
        feed.transfers.drain(..).map(|t| (t.key, t)).collect();
    apply_map(&mut transfers, &changes.transfers);
    feed.transfers = transfers.into_values().collect();
    apply_map(&mut feed.networks, &changes.networks);
    apply_map(&mut feed.areas, &changes.areas);
    apply_links(&mut feed.fare_links.stop_areas, &changes.fare_links.stop_areas);
    apply_links(&mut feed.fare_links.stop_zones, &changes.fare_links.stop_zones);
    apply_links(&mut feed.fare_links.route_networks, &changes.fare_links.route_networks);

    feed.sort();
    feed.validate()?;
    Ok(Snapshot {
        version: delta.version,
        date: delta.date,
        original_url: base.original_url.clone(),
        ids,
        feed,
    })
}

fn write_table<R: TableCodec>(
    changes: &TableDelta<R>,
    strings: &mut StringTable,
    blocks: &mut BTreeMap<Block, Vec<u8>>,
) {
    if changes.is_empty() {
        return;
    }
    let patches: Vec<Entry<R::Patch>> = changes
        .iter()
        .map(|(id, change)| match change {
            Change::Added(record) => (*id, Some(record.full_patch())),
            Change::Changed(patch) => (*id, Some(patch.clone())),
            Change::Deleted => (*id, None),
        })
        .collect();
    let entries: Vec<Entry<&R::Patch>> = patches.iter().map(|(id, p)| (*id, p.as_ref())).collect();
    blocks.insert(R::BLOCK, R::encode(&entries, strings).encode_to_vec());
}

/// Sorts decoded entries into additions, changes and deletions.
pub(crate) fn classify<R: Record>(entries: Vec<Entry<R::Patch>>, known: u32) -> TableDelta<R> {
    entries
        .into_iter()
        .map(|(id, patch)| {
            let change = match patch {
                None => Change::Deleted,
                Some(patch) if id > known => Change::Added(R::from_patch(id, &patch)),
                Some(patch) => Change::Changed(patch),
            };
            (id, change)
        })
        .collect()
}

fn read_table<R: TableCodec>(
    container: &Container,
    strings: &StringTable,
    ids: &IdDelta,
) -> Result<TableDelta<R>> {
    match container.decode::<R::Message>(R::BLOCK)? {
        Some(message) => Ok(classify(R::decode(message, strings)?, ids.skip(R::TABLE))),
        None => Ok(BTreeMap::new()),
    }
}

impl Delta {
    pub fn to_bytes(&self, compress: bool) -> Result<Vec<u8>> {
        let changes = &self.changes;
        let mut strings = StringTable::new();
        let mut blocks = BTreeMap::new();

        blocks.insert(Block::Ids, self.ids.to_message().encode_to_vec());
        write_table(&changes.agencies, &mut strings, &mut blocks);
        let calendar = &changes.calendar;
        if calendar.base_date.is_some() || !calendar.services.is_empty() {
            let services: Vec<Entry<Service>> = calendar
                .services
                .iter()
                .map(|(id, change)| match change {
                    Change::Added(service) | Change::Changed(service) => (*id, Some(service.clone())),
                    Change::Deleted => (*id, None),
                })
                .collect();
            let entries: Vec<Entry<&Service>> =
                services.iter().map(|(id, s)| (*id, s.as_ref())).collect();
            let base = calendar.base_date.unwrap_or(self.date);
            blocks.insert(
                Block::Calendar,
                calendar::encode(base, &entries).encode_to_vec(),
            );
        }
        write_table(&changes.shapes, &mut strings, &mut blocks);
        write_table(&changes.stops, &mut strings, &mut blocks);
        write_table(&changes.routes, &mut strings, &mut blocks);
        write_table(&changes.trips, &mut strings, &mut blocks);
        if !changes.transfers.is_empty() {
            let entries: Vec<_> = changes
                .transfers
                .iter()
                .map(|(key, t)| (*key, t.as_ref()))
                .collect();
            blocks.insert(
                Block::Transfers,
                codec::encode_transfers(&entries).encode_to_vec(),
            );
        }
        for (block, names) in [
            (Block::Networks, &changes.networks),
            (Block::Areas, &changes.areas),
        ] {
            if !names.is_empty() {
                blocks.insert(block, codec::encode_names(names).encode_to_vec());
            }
        }
        if !changes.fare_links.is_empty() {
            let links = wire::FareLinksDelta {
                stop_areas: changes.fare_links.stop_areas.clone(),
                stop_zones: changes.fare_links.stop_zones.clone(),
                route_networks: changes.fare_links.route_networks.clone(),
            };
            blocks.insert(Block::FareLinks, links.encode_to_vec());
        }
        codec::write_strings(strings, &mut blocks);

        let header = Header {
            kind: FileKind::Delta {
                old_version: self.old_version,
            },
            version: self.version,
            date: self.date,
            compressed: compress,
        };
        container::write(&header, &blocks)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let container = Container::parse(data)?;
        let header = container.header();
        let FileKind::Delta { old_version } = header.kind else {
            return Err(Error::Format(
                "expected a delta, found a feed snapshot".to_string(),
            ));
        };
        let ids = match container.decode::<wire::IdStore>(Block::Ids)? {
            Some(message) => IdDelta::from_message(message)?,
            None => IdDelta::default(),
        };
        let strings = codec::read_strings(&container)?;

        let calendar = match container.decode::<wire::Calendar>(Block::Calendar)? {
            Some(message) => {
                let (base, entries) = calendar::decode(&message)?;
                CalendarDelta {
                    base_date: Some(base),
                    services: classify(entries, ids.skip(Service::TABLE)),
                }
            }
            None => CalendarDelta::default(),
        };
        let transfers = match container.decode::<wire::Transfers>(Block::Transfers)? {
            Some(message) => codec::decode_transfers(message)?.into_iter().collect(),
            None => BTreeMap::new(),
        };
        let names = |block| -> Result<BTreeMap<u32, Option<String>>> {
            Ok(container
                .decode::<wire::Names>(block)?
                .map(codec::decode_names)
                .unwrap_or_default())
        };
        let fare_links = match container.decode::<wire::FareLinksDelta>(Block::FareLinks)? {
            Some(links) => FareLinksDelta {
                stop_areas: links.stop_areas,
                stop_zones: links.stop_zones,
                route_networks: links.route_networks,
            },
            None => FareLinksDelta::default(),
        };

        let changes = FeedDelta {
            agencies: read_table(&container, &strings, &ids)?,
            calendar,
            shapes: read_table(&container, &strings, &ids)?,
            stops: read_table(&container, &strings, &ids)?,
            routes: read_table(&container, &strings, &ids)?,
            trips: read_table(&container, &strings, &ids)?,
            transfers,
            networks: names(Block::Networks)?,
            areas: names(Block::Areas)?,
            fare_links,
        };
        Ok(Delta {
            old_version,
            version: header.version,
            date: header.date,
            ids,
            changes,
        })
    }
}
