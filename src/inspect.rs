//! Structured views of packed files for humans.
//!
//! Every view is a list of JSON values: one per record of the requested block, or the
//! header followed by a per-block size summary when no block is given. Records carry
//! their stable `id`, the `original_id` it was assigned from, and `delete` for removals.
use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::calendar;
use crate::codec::{self, TableCodec};
use crate::container::{Block, BlockKind, Container};
use crate::error::{Error, Result};
use crate::ids::IdTable;
use crate::model::{Agency, Route, Shape, Stop, Trip};
use crate::strings::StringTable;
use crate::wire;

#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Block to list; the file summary when absent.
    pub block: Option<Block>,
    /// Keep only records with this stable or source id.
    pub id: Option<String>,
}

/// Source ids of the file's id block, by table and stable id.
struct Sources(HashMap<(IdTable, u32), String>);

impl Sources {
    fn read(container: &Container) -> Result<Self> {
        let mut sources = HashMap::new();
        if let Some(message) = container.decode::<wire::IdStore>(Block::Ids)? {
            for reference in message.refs {
                let Some(table) = IdTable::from_code(reference.block) else {
                    continue;
                };
                for (i, source) in reference.ids.into_iter().enumerate() {
                    sources.insert((table, reference.delta_skip + 1 + i as u32), source);
                }
            }
        }
        Ok(Sources(sources))
    }

    fn get(&self, table: IdTable, id: u32) -> Option<&str> {
        self.0.get(&(table, id)).map(String::as_str)
    }
}

fn render<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Format(format!("cannot render: {}", e)))
}

/// Drops nulls, empty strings, empty lists and empty objects, recursively.
fn strip(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) => {
            let items: Vec<Value> = items.into_iter().filter_map(strip).collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        Value::Object(fields) => {
            let fields: Map<String, Value> = fields
                .into_iter()
                .filter_map(|(k, v)| strip(v).map(|v| (k, v)))
                .collect();
            (!fields.is_empty()).then_some(Value::Object(fields))
        }
        other => Some(other),
    }
}

struct View<'q> {
    query: &'q Query,
    sources: Sources,
    out: Vec<Value>,
}

impl View<'_> {
    fn matches(&self, id: u32, original: Option<&str>) -> bool {
        match &self.query.id {
            None => true,
            Some(wanted) => wanted.parse::<u32>().ok() == Some(id) || original == Some(wanted.as_str()),
        }
    }

    /// Adds one record. `body` of `None` marks a deletion.
    fn push<T: Serialize>(&mut self, table: IdTable, id: u32, body: Option<T>) -> Result<()> {
        let original = self.sources.get(table, id).map(str::to_string);
        if !self.matches(id, original.as_deref()) {
            return Ok(());
        }
        let mut fields = Map::new();
        fields.insert("id".to_string(), json!(id));
        if let Some(original) = original {
            fields.insert("original_id".to_string(), json!(original));
        }
        match body {
            Some(body) => {
                if let Some(Value::Object(body)) = strip(render(body)?) {
                    for (key, value) in body {
                        fields.entry(key).or_insert(value);
                    }
                }
            }
            None => {
                fields.insert("delete".to_string(), json!(true));
            }
        }
        self.out.push(Value::Object(fields));
        Ok(())
    }

    fn table<R: TableCodec>(&mut self, container: &Container, strings: &StringTable) -> Result<()> {
        let Some(message) = container.decode::<R::Message>(R::BLOCK)? else {
            return Ok(());
        };
        for (id, patch) in R::decode(message, strings)? {
            self.push(R::TABLE, id, patch)?;
        }
        Ok(())
    }

    fn names(&mut self, container: &Container, block: Block, table: IdTable) -> Result<()> {
        let Some(message) = container.decode::<wire::Names>(block)? else {
            return Ok(());
        };
        for (id, name) in codec::decode_names(message) {
            self.push(table, id, name.map(|name| json!({ "name": name })))?;
        }
        Ok(())
    }

    fn links(&mut self, kind: &str, links: impl IntoIterator<Item = (u32, u32)>) {
        for (from, to) in links {
            if self.matches(from, None) {
                self.out.push(json!({ "link": kind, "id": from, "target": to }));
            }
        }
    }
}

fn table_len<R: TableCodec>(container: &Container, strings: &StringTable) -> Result<usize> {
    Ok(match container.decode::<R::Message>(R::BLOCK)? {
        Some(message) => R::decode(message, strings)?.len(),
        None => 0,
    })
}

/// Number of records stored in a block.
fn records(container: &Container, block: Block, strings: &StringTable) -> Result<usize> {
    Ok(match block {
        Block::Ids => container
            .decode::<wire::IdStore>(block)?
            .map_or(0, |m| m.refs.iter().map(|r| r.ids.len()).sum()),
        Block::Strings => strings.len(),
        Block::Calendar => match container.decode::<wire::Calendar>(block)? {
            Some(message) => calendar::decode(&message)?.1.len(),
            None => 0,
        },
        Block::Agencies => table_len::<Agency>(container, strings)?,
        Block::Shapes => table_len::<Shape>(container, strings)?,
        Block::Stops => table_len::<Stop>(container, strings)?,
        Block::Routes => table_len::<Route>(container, strings)?,
        Block::Trips => table_len::<Trip>(container, strings)?,
        Block::Transfers => container
            .decode::<wire::Transfers>(block)?
            .map_or(0, |m| m.transfers.len()),
        Block::Networks | Block::Areas => {
            container.decode::<wire::Names>(block)?.map_or(0, |m| m.names.len())
        }
        Block::FareLinks => {
            if container.header().is_delta() {
                container.decode::<wire::FareLinksDelta>(block)?.map_or(0, |m| {
                    m.stop_areas.len() + m.stop_zones.len() + m.route_networks.len()
                })
            } else {
                container.decode::<wire::FareLinks>(block)?.map_or(0, |m| {
                    [m.stop_area_ids, m.stop_zone_ids, m.route_network_ids]
                        .iter()
                        .flatten()
                        .filter(|target| **target != 0)
                        .count()
                })
            }
        }
    })
}

fn summary(container: &Container) -> Result<Vec<Value>> {
    let strings = codec::read_strings(container)?;
    let mut out = vec![render(container.header())?];
    for kind in container.present() {
        let block = match kind {
            BlockKind::Known(block) => block,
            BlockKind::Unknown(code) => {
                out.push(json!({ "block": code, "unknown": true }));
                continue;
            }
        };
        let stored = container.raw(block).map_or(0, <[u8]>::len);
        let size = container.block(block)?.map_or(0, |data| data.len());
        let records = records(container, block, &strings)?;
        out.push(json!({
            "block": block.name(),
            "stored": stored,
            "size": size,
            "records": records,
        }));
    }
    Ok(out)
}

/// Renders the part of a packed snapshot or delta selected by `query`.
pub fn inspect(data: &[u8], query: &Query) -> Result<Vec<Value>> {
    let container = Container::parse(data)?;
    let Some(block) = query.block else {
        return summary(&container);
    };
    let strings = codec::read_strings(&container)?;
    let mut view = View {
        query,
        sources: Sources::read(&container)?,
        out: vec![],
    };
    match block {
        Block::Ids => {
            if let Some(message) = container.decode::<wire::IdStore>(Block::Ids)? {
                for reference in message.refs {
                    let table = IdTable::from_code(reference.block).map_or("unknown", |t| t.name());
                    for (i, source) in reference.ids.iter().enumerate() {
                        let id = reference.delta_skip + 1 + i as u32;
                        if view.matches(id, Some(source)) {
                            view.out.push(json!({ "table": table, "id": id, "original_id": source }));
                        }
                    }
                }
            }
        }
        Block::Strings => {
            for (i, s) in strings.iter().enumerate() {
                if view.matches(i as u32, Some(s)) {
                    view.out.push(json!({ "index": i, "value": s }));
                }
            }
        }
        Block::Calendar => {
            if let Some(message) = container.decode::<wire::Calendar>(Block::Calendar)? {
                let (base, services) = calendar::decode(&message)?;
                view.out.push(json!({ "base_date": base.to_string() }));
                for (id, service) in services {
                    view.push(IdTable::Services, id, service)?;
                }
            }
        }
        Block::Agencies => view.table::<Agency>(&container, &strings)?,
        Block::Shapes => view.table::<Shape>(&container, &strings)?,
        Block::Stops => view.table::<Stop>(&container, &strings)?,
        Block::Routes => view.table::<Route>(&container, &strings)?,
        Block::Trips => view.table::<Trip>(&container, &strings)?,
        Block::Transfers => {
            if let Some(message) = container.decode::<wire::Transfers>(Block::Transfers)? {
                for (key, transfer) in codec::decode_transfers(message)? {
                    if !view.matches(key.from_stop, None) && !view.matches(key.to_stop, None) {
                        continue;
                    }
                    let value = match transfer {
                        Some(transfer) => strip(render(transfer)?),
                        None => Some(json!({ "key": key, "delete": true })),
                    };
                    view.out.extend(value);
                }
            }
        }
        Block::Networks => view.names(&container, Block::Networks, IdTable::Networks)?,
        Block::Areas => view.names(&container, Block::Areas, IdTable::Areas)?,
        Block::FareLinks => {
            if container.header().is_delta() {
                if let Some(links) = container.decode::<wire::FareLinksDelta>(Block::FareLinks)? {
                    view.links("stop_area", links.stop_areas);
                    view.links("stop_zone", links.stop_zones);
                    view.links("route_network", links.route_networks);
                }
            } else if let Some(links) = container.decode::<wire::FareLinks>(Block::FareLinks)? {
                view.links("stop_area", codec::unpack_links(&links.stop_area_ids));
                view.links("stop_zone", codec::unpack_links(&links.stop_zone_ids));
                view.links("route_network", codec::unpack_links(&links.route_network_ids));
            }
        }
    }
    Ok(view.out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdStore;
    use crate::model::Feed;
    use crate::snapshot::Snapshot;
    use chrono::NaiveDate;

    fn packed() -> Vec<u8> {
        let mut ids = IdStore::new();
        let mut feed = Feed::default();
        for source in ["U1", "U2"] {
            let id = ids.resolve(IdTable::Stops, source);
            feed.stops.push(Stop {
                id,
                name: format!("Stop {}", source),
                ..Default::default()
            });
        }
        Snapshot {
            version: 3,
            date: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
            original_url: String::new(),
            ids,
            feed,
        }
        .to_bytes(true)
        .unwrap()
    }

    #[test]
    fn summary_lists_header_and_blocks() {
        let values = inspect(&packed(), &Query::default()).unwrap();
        assert_eq!(values[0]["version"], 3);
        let blocks: Vec<&str> = values[1..]
            .iter()
            .filter_map(|v| v["block"].as_str())
            .collect();
        assert_eq!(blocks, vec!["ids", "strings", "stops"]);
        assert_eq!(values[3]["records"], 2);
    }

    #[test]
    fn records_are_filtered_by_source_id() {
        let query = Query {
            block: Some(Block::Stops),
            id: Some("U2".to_string()),
        };
        let values = inspect(&packed(), &query).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["id"], 2);
        assert_eq!(values[0]["original_id"], "U2");
        assert_eq!(values[0]["name"], "Stop U2");
        assert!(values[0].get("code").is_none());
    }

    #[test]
    fn strip_removes_empty_values() {
        let value = json!({ "a": "", "b": [], "c": { "d": null }, "e": 0 });
        assert_eq!(strip(value), Some(json!({ "e": 0 })));
    }
}
