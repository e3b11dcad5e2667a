//! Full feed files.
use std::collections::BTreeMap;

use chrono::NaiveDate;
use prost::Message;

use crate::calendar;
use crate::codec::{self, Entry, TableCodec};
use crate::container::{self, Block, Container, FileKind, Header};
use crate::error::{Error, Result};
use crate::ids::IdStore;
use crate::model::{Calendar, Feed, FareLinks};
use crate::record::Record;
use crate::strings::StringTable;
use crate::wire;

/// One packed version of a feed, with the id assignments that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub version: u32,
    pub date: NaiveDate,
    pub original_url: String,
    pub ids: IdStore,
    pub feed: Feed,
}

/// What the next packaging run needs from the previous snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousRun {
    pub version: u32,
    pub original_url: String,
    pub ids: IdStore,
}

impl PreviousRun {
    /// Reads only the header and the id block.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let container = Container::parse(data)?;
        let original_url = snapshot_url(container.header())?;
        Ok(PreviousRun {
            version: container.header().version,
            original_url,
            ids: read_ids(&container)?,
        })
    }
}

fn snapshot_url(header: &Header) -> Result<String> {
    match &header.kind {
        FileKind::Snapshot { original_url } => Ok(original_url.clone()),
        FileKind::Delta { .. } => Err(Error::Format(
            "expected a feed snapshot, found a delta".to_string(),
        )),
    }
}

fn read_ids(container: &Container) -> Result<IdStore> {
    match container.decode::<wire::IdStore>(Block::Ids)? {
        Some(message) => IdStore::from_message(message),
        None => Ok(IdStore::new()),
    }
}

fn write_table<R: TableCodec>(
    records: &[R],
    strings: &mut StringTable,
    blocks: &mut BTreeMap<Block, Vec<u8>>,
) {
    if records.is_empty() {
        return;
    }
    let patches: Vec<R::Patch> = records.iter().map(|r| r.full_patch()).collect();
    let entries: Vec<Entry<&R::Patch>> = records
        .iter()
        .zip(&patches)
        .map(|(r, p)| (r.id(), Some(p)))
        .collect();
    blocks.insert(R::BLOCK, R::encode(&entries, strings).encode_to_vec());
}

fn read_table<R: TableCodec>(container: &Container, strings: &StringTable) -> Result<Vec<R>> {
    let Some(message) = container.decode::<R::Message>(R::BLOCK)? else {
        return Ok(vec![]);
    };
    R::decode(message, strings)?
        .into_iter()
        .map(|(id, patch)| match patch {
            Some(patch) => Ok(R::from_patch(id, &patch)),
            None => Err(Error::Format(format!(
                "snapshot deletes {} {}",
                R::TABLE.name(),
                id
            ))),
        })
        .collect()
}

impl Snapshot {
    pub fn previous_run(&self) -> PreviousRun {
        PreviousRun {
            version: self.version,
            original_url: self.original_url.clone(),
            ids: self.ids.clone(),
        }
    }

    pub fn to_bytes(&self, compress: bool) -> Result<Vec<u8>> {
        let feed = &self.feed;
        let mut strings = StringTable::new();
        let mut blocks = BTreeMap::new();

        let ids = self.ids.to_message();
        if !ids.refs.is_empty() {
            blocks.insert(Block::Ids, ids.encode_to_vec());
        }
        write_table(&feed.agencies, &mut strings, &mut blocks);
        if !feed.calendar.services.is_empty() {
            let entries: Vec<_> = feed.calendar.services.iter().map(|s| (s.id, Some(s))).collect();
            let message = calendar::encode(feed.calendar.base_date, &entries);
            blocks.insert(Block::Calendar, message.encode_to_vec());
        }
        write_table(&feed.shapes, &mut strings, &mut blocks);
        write_table(&feed.stops, &mut strings, &mut blocks);
        write_table(&feed.routes, &mut strings, &mut blocks);
        write_table(&feed.trips, &mut strings, &mut blocks);
        if !feed.transfers.is_empty() {
            let entries: Vec<_> = feed.transfers.iter().map(|t| (t.key, Some(t))).collect();
            blocks.insert(
                Block::Transfers,
                codec::encode_transfers(&entries).encode_to_vec(),
            );
        }
        for (block, names) in [(Block::Networks, &feed.networks), (Block::Areas, &feed.areas)] {
            if !names.is_empty() {
                let names = wire::Names {
                    names: names.clone(),
                };
                blocks.insert(block, names.encode_to_vec());
            }
        }
        if !feed.fare_links.is_empty() {
            let links = wire::FareLinks {
                stop_area_ids: codec::pack_links(&feed.fare_links.stop_areas),
                stop_zone_ids: codec::pack_links(&feed.fare_links.stop_zones),
                route_network_ids: codec::pack_links(&feed.fare_links.route_networks),
            };
            blocks.insert(Block::FareLinks, links.encode_to_vec());
        }
        codec::write_strings(strings, &mut blocks);

        for (block, data) in &blocks {
            log::debug!("Block {}: {} bytes", block.name(), data.len());
        }
        let header = Header {
            kind: FileKind::Snapshot {
                original_url: self.original_url.clone(),
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
        let original_url = snapshot_url(header)?;
        let strings = codec::read_strings(&container)?;

        let calendar = match container.decode::<wire::Calendar>(Block::Calendar)? {
            Some(message) => {
                let (base_date, entries) = calendar::decode(&message)?;
                let services = entries
                    .into_iter()
                    .map(|(id, service)| {
                        service.ok_or_else(|| {
                            Error::Format(format!("snapshot deletes service {}", id))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Calendar {
                    base_date,
                    services,
                }
            }
            None => Calendar {
                base_date: header.date,
                services: vec![],
            },
        };

        let transfers = match container.decode::<wire::Transfers>(Block::Transfers)? {
            Some(message) => codec::decode_transfers(message)?
                .into_iter()
                .map(|(key, transfer)| {
                    transfer.ok_or_else(|| {
                        Error::Format(format!("snapshot deletes a transfer from stop {}", key.from_stop))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => vec![],
        };
        let names = |block| -> Result<BTreeMap<u32, String>> {
            Ok(container
                .decode::<wire::Names>(block)?
                .map(|m| m.names)
                .unwrap_or_default())
        };
        let fare_links = match container.decode::<wire::FareLinks>(Block::FareLinks)? {
            Some(links) => FareLinks {
                stop_areas: codec::unpack_links(&links.stop_area_ids),
                stop_zones: codec::unpack_links(&links.stop_zone_ids),
                route_networks: codec::unpack_links(&links.route_network_ids),
            },
            None => FareLinks::default(),
        };

        let feed = Feed {
            agencies: read_table(&container, &strings)?,
            calendar,
            shapes: read_table(&container, &strings)?,
            stops: read_table(&container, &strings)?,
            routes: read_table(&container, &strings)?,
            trips: read_table(&container, &strings)?,
            transfers,
            networks: names(Block::Networks)?,
            areas: names(Block::Areas)?,
            fare_links,
        };
        Ok(Snapshot {
            version: header.version,
            date: header.date,
            original_url,
            ids: read_ids(&container)?,
            feed,
        })
    }
}
