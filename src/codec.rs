//! Encoding of table entries into blocks.
//!
//! Snapshots and deltas share these codecs: a snapshot record is written as the patch
//! that builds it from a blank record, and a deletion is a record with only its id.
use std::collections::BTreeMap;

use prost::Message;

use crate::container::{Block, Container};
use crate::enums::{pack_pickups, unpack_pickups, WireEnum};
use crate::error::{Error, Result};
use crate::model::{
    Accessibility, Agency, ExternalId, Itinerary, LocationType, PickupDropoff, Point, Route,
    RouteType, Schedule, Shape, Stop, Transfer, TransferKey, TransferType, Trip, TripTimes,
};
use crate::record::{AgencyPatch, Field, Record, RoutePatch, StopPatch, TripPatch};
use crate::strings::StringTable;
use crate::varint;
use crate::wire;

/// A table entry: stable id and patch, no patch for a deletion.
pub type Entry<P> = (u32, Option<P>);

pub trait TableCodec: Record {
    const BLOCK: Block;
    type Message: Message + Default;

    fn encode(entries: &[Entry<&Self::Patch>], strings: &mut StringTable) -> Self::Message;

    fn decode(message: Self::Message, strings: &StringTable) -> Result<Vec<Entry<Self::Patch>>>;
}

fn text(field: &Field<String>) -> Option<String> {
    field.as_ref().cloned()
}

fn string_ref(field: &Field<String>, strings: &mut StringTable) -> Option<u32> {
    field.as_ref().map(|s| strings.add(s))
}

fn resolve(index: Option<u32>, strings: &StringTable) -> Result<Field<String>> {
    Ok(match index {
        Some(i) => Field::Set(strings.get(i)?.to_string()),
        None => Field::Unset,
    })
}

impl TableCodec for Agency {
    const BLOCK: Block = Block::Agencies;
    type Message = wire::Agencies;

    fn encode(entries: &[Entry<&AgencyPatch>], strings: &mut StringTable) -> wire::Agencies {
        let agencies = entries
            .iter()
            .map(|(id, patch)| match patch {
                Some(p) => wire::Agency {
                    agency_id: *id,
                    name: text(&p.name),
                    url: text(&p.url),
                    timezone: string_ref(&p.timezone, strings),
                    lang: text(&p.lang),
                    phone: text(&p.phone),
                    fare_url: text(&p.fare_url),
                    email: text(&p.email),
                    delete: false,
                },
                None => wire::Agency {
                    agency_id: *id,
                    delete: true,
                    ..Default::default()
                },
            })
            .collect();
        wire::Agencies { agencies }
    }

    fn decode(message: wire::Agencies, strings: &StringTable) -> Result<Vec<Entry<AgencyPatch>>> {
        message
            .agencies
            .into_iter()
            .map(|a| {
                if a.delete {
                    return Ok((a.agency_id, None));
                }
                let patch = AgencyPatch {
                    name: a.name.into(),
                    url: a.url.into(),
                    timezone: resolve(a.timezone, strings)?,
                    lang: a.lang.into(),
                    phone: a.phone.into(),
                    fare_url: a.fare_url.into(),
                    email: a.email.into(),
                };
                Ok((a.agency_id, Some(patch)))
            })
            .collect()
    }
}

impl TableCodec for Shape {
    const BLOCK: Block = Block::Shapes;
    type Message = wire::Shapes;

    /// Each shape continues from the last point of the previous one.
    fn encode(entries: &[Entry<&Vec<Point>>], _strings: &mut StringTable) -> wire::Shapes {
        let mut last = Point::default();
        let mut shapes = Vec::with_capacity(entries.len());
        for (id, points) in entries {
            let points: &[Point] = points.map(|p| p.as_slice()).unwrap_or(&[]);
            let mut lon = varint::DeltaEncoder::new(last.lon.into());
            let mut lat = varint::DeltaEncoder::new(last.lat.into());
            for point in points {
                lon.push(point.lon.into());
                lat.push(point.lat.into());
            }
            if let Some(p) = points.last() {
                last = *p;
            }
            shapes.push(wire::Shape {
                shape_id: *id,
                longitudes: lon.finish(),
                latitudes: lat.finish(),
            });
        }
        wire::Shapes { shapes }
    }

    fn decode(message: wire::Shapes, _strings: &StringTable) -> Result<Vec<Entry<Vec<Point>>>> {
        let mut last = Point::default();
        let mut entries = Vec::with_capacity(message.shapes.len());
        for shape in message.shapes {
            let lons = varint::decode_all_from(last.lon.into(), &shape.longitudes)?;
            let lats = varint::decode_all_from(last.lat.into(), &shape.latitudes)?;
            if lons.len() != lats.len() {
                return Err(Error::Format(format!(
                    "shape {} has {} longitudes and {} latitudes",
                    shape.shape_id,
                    lons.len(),
                    lats.len()
                )));
            }
            let points = lons
                .into_iter()
                .zip(lats)
                .map(|(lon, lat)| Ok(Point { lon: coord(lon)?, lat: coord(lat)? }))
                .collect::<Result<Vec<_>>>()?;
            if let Some(p) = points.last() {
                last = *p;
            }
            entries.push((shape.shape_id, (!points.is_empty()).then_some(points)));
        }
        Ok(entries)
    }
}

fn coord(value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::Format(format!("coordinate {} out of range", value)))
}

impl TableCodec for Stop {
    const BLOCK: Block = Block::Stops;
    type Message = wire::Stops;

    /// Positions are differences to the previous stop that has one.
    fn encode(entries: &[Entry<&StopPatch>], strings: &mut StringTable) -> wire::Stops {
        let mut last = Point::default();
        let mut stops = Vec::with_capacity(entries.len());
        for (id, patch) in entries {
            let Some(p) = patch else {
                stops.push(wire::Stop {
                    stop_id: *id,
                    delete: true,
                    ..Default::default()
                });
                continue;
            };
            let (lat, lon, clear_position) = match &p.position {
                Field::Set(Some(point)) => {
                    let delta = (point.lat - last.lat, point.lon - last.lon);
                    last = *point;
                    (Some(delta.0), Some(delta.1), false)
                }
                Field::Set(None) => (None, None, true),
                Field::Unset => (None, None, false),
            };
            let (external_str_id, external_int_id) = match &p.external {
                Field::Set(ExternalId::Text(s)) => (Some(s.clone()), None),
                Field::Set(ExternalId::Number(n)) => (None, Some(*n)),
                Field::Set(ExternalId::None) => (Some(String::new()), None),
                Field::Unset => (None, None),
            };
            stops.push(wire::Stop {
                stop_id: *id,
                code: text(&p.code),
                name: string_ref(&p.name, strings),
                desc: text(&p.desc),
                lat,
                lon,
                clear_position,
                location_type: p.location.to_wire(),
                parent_id: p.parent.as_ref().copied(),
                wheelchair: p.wheelchair.to_wire(),
                platform_code: text(&p.platform_code),
                external_str_id,
                external_int_id,
                delete: false,
            });
        }
        wire::Stops { stops }
    }

    fn decode(message: wire::Stops, strings: &StringTable) -> Result<Vec<Entry<StopPatch>>> {
        let mut last = Point::default();
        let mut entries = Vec::with_capacity(message.stops.len());
        for s in message.stops {
            if s.delete {
                entries.push((s.stop_id, None));
                continue;
            }
            let position = match (s.lat, s.lon, s.clear_position) {
                (Some(lat), Some(lon), false) => {
                    last = Point {
                        lon: last.lon + lon,
                        lat: last.lat + lat,
                    };
                    Field::Set(Some(last))
                }
                (None, None, true) => Field::Set(None),
                (None, None, false) => Field::Unset,
                _ => {
                    return Err(Error::Format(format!(
                        "stop {} has an incomplete position",
                        s.stop_id
                    )))
                }
            };
            let external = match (s.external_str_id, s.external_int_id) {
                (Some(text), None) if text.is_empty() => Field::Set(ExternalId::None),
                (Some(text), None) => Field::Set(ExternalId::Text(text)),
                (None, Some(n)) => Field::Set(ExternalId::Number(n)),
                (None, None) => Field::Unset,
                (Some(_), Some(_)) => {
                    return Err(Error::Format(format!(
                        "stop {} has two external ids",
                        s.stop_id
                    )))
                }
            };
            let patch = StopPatch {
                code: s.code.into(),
                name: resolve(s.name, strings)?,
                desc: s.desc.into(),
                position,
                location: LocationType::from_wire(s.location_type)?,
                parent: s.parent_id.into(),
                wheelchair: Accessibility::from_wire(s.wheelchair)?,
                platform_code: s.platform_code.into(),
                external,
            };
            entries.push((s.stop_id, Some(patch)));
        }
        Ok(entries)
    }
}

fn encode_itinerary(itinerary: &Itinerary, strings: &mut StringTable) -> wire::Itinerary {
    let stops: Vec<i64> = itinerary.stops.iter().map(|s| i64::from(*s)).collect();
    let mut stop_headsigns: Vec<u32> = itinerary
        .stop_headsigns
        .iter()
        .map(|h| strings.add(h))
        .collect();
    while stop_headsigns.last() == Some(&0) {
        stop_headsigns.pop();
    }
    wire::Itinerary {
        itinerary_id: itinerary.id,
        stops: varint::encode(&stops),
        headsign: strings.add(&itinerary.headsign),
        stop_headsigns,
        shape_id: itinerary.shape,
        opposite_direction: itinerary.opposite_direction,
        delete: false,
    }
}

fn decode_itinerary(message: wire::Itinerary, strings: &StringTable) -> Result<Itinerary> {
    let stops = varint::decode_all_from(0, &message.stops)?
        .into_iter()
        .map(|s| {
            u32::try_from(s).map_err(|_| {
                Error::Format(format!(
                    "itinerary {} lists stop {}",
                    message.itinerary_id, s
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let stop_headsigns = message
        .stop_headsigns
        .iter()
        .map(|h| strings.get(*h).map(str::to_string))
        .collect::<Result<Vec<_>>>()?;
    Ok(Itinerary {
        id: message.itinerary_id,
        stops,
        headsign: strings.get(message.headsign)?.to_string(),
        stop_headsigns,
        shape: message.shape_id,
        opposite_direction: message.opposite_direction,
    })
}

impl TableCodec for Route {
    const BLOCK: Block = Block::Routes;
    type Message = wire::Routes;

    fn encode(entries: &[Entry<&RoutePatch>], strings: &mut StringTable) -> wire::Routes {
        let mut routes = Vec::with_capacity(entries.len());
        for (id, patch) in entries {
            let Some(p) = patch else {
                routes.push(wire::Route {
                    route_id: *id,
                    delete: true,
                    ..Default::default()
                });
                continue;
            };
            let itineraries = p
                .itineraries
                .iter()
                .map(|(id, itinerary)| match itinerary {
                    Some(itinerary) => encode_itinerary(itinerary, strings),
                    None => wire::Itinerary {
                        itinerary_id: *id,
                        delete: true,
                        ..Default::default()
                    },
                })
                .collect();
            routes.push(wire::Route {
                route_id: *id,
                agency_id: p.agency.as_ref().copied(),
                short_name: text(&p.short_name),
                long_name: p.long_name.as_ref().map(|parts| wire::StringRefs {
                    refs: parts.iter().map(|s| strings.add(s)).collect(),
                }),
                desc: text(&p.desc),
                route_type: p.route_type.to_wire(),
                color: p.color,
                text_color: p.text_color,
                continuous_pickup: p.continuous_pickup.to_wire(),
                continuous_dropoff: p.continuous_dropoff.to_wire(),
                itineraries,
                delete: false,
            });
        }
        wire::Routes { routes }
    }

    fn decode(message: wire::Routes, strings: &StringTable) -> Result<Vec<Entry<RoutePatch>>> {
        let mut entries = Vec::with_capacity(message.routes.len());
        for r in message.routes {
            if r.delete {
                entries.push((r.route_id, None));
                continue;
            }
            let mut itineraries = BTreeMap::new();
            for i in r.itineraries {
                let id = i.itinerary_id;
                let itinerary = if i.delete {
                    None
                } else {
                    Some(decode_itinerary(i, strings)?)
                };
                itineraries.insert(id, itinerary);
            }
            let long_name = match r.long_name {
                Some(refs) => Field::Set(
                    refs.refs
                        .iter()
                        .map(|i| strings.get(*i).map(str::to_string))
                        .collect::<Result<Vec<_>>>()?,
                ),
                None => Field::Unset,
            };
            let patch = RoutePatch {
                agency: r.agency_id.into(),
                short_name: r.short_name.into(),
                long_name,
                desc: r.desc.into(),
                route_type: RouteType::from_wire(r.route_type)?,
                color: r.color,
                text_color: r.text_color,
                continuous_pickup: PickupDropoff::from_wire(r.continuous_pickup)?,
                continuous_dropoff: PickupDropoff::from_wire(r.continuous_dropoff)?,
                itineraries,
            };
            entries.push((r.route_id, Some(patch)));
        }
        Ok(entries)
    }
}

fn encode_schedule(schedule: &Schedule) -> (Vec<u8>, Vec<u8>) {
    let departures: Vec<Option<i64>> = schedule
        .departures
        .iter()
        .map(|d| d.map(i64::from))
        .collect();
    let mut dwells: Vec<u32> = schedule
        .departures
        .iter()
        .enumerate()
        .map(|(i, d)| match (schedule.arrivals.get(i).copied().flatten(), d) {
            (Some(a), Some(d)) if a < *d => d - a,
            _ => 0,
        })
        .collect();
    while dwells.last() == Some(&0) {
        dwells.pop();
    }
    (
        varint::encode_sparse(0, &departures),
        varint::encode_unsigned(&dwells),
    )
}

fn decode_schedule(trip: u32, departures: &[u8], arrivals: &[u8]) -> Result<Schedule> {
    let departures = varint::decode_sparse(0, departures)?
        .into_iter()
        .map(|d| d.map(u32::try_from).transpose())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::Format(format!("trip {} has a negative time", trip)))?;
    let dwells = varint::decode_unsigned(arrivals)?;
    if dwells.len() > departures.len() {
        return Err(Error::Format(format!(
            "trip {} has more arrivals than departures",
            trip
        )));
    }
    let arrivals = departures
        .iter()
        .enumerate()
        .map(|(i, d)| match (dwells.get(i).copied().unwrap_or(0), d) {
            (0, _) => Ok(None),
            (dwell, Some(d)) if dwell <= *d => Ok(Some(d - dwell)),
            _ => Err(Error::Format(format!(
                "trip {} has an arrival without a departure",
                trip
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Schedule {
        departures,
        arrivals,
    })
}

impl TableCodec for Trip {
    const BLOCK: Block = Block::Trips;
    type Message = wire::Trips;

    fn encode(entries: &[Entry<&TripPatch>], _strings: &mut StringTable) -> wire::Trips {
        let mut trips = Vec::with_capacity(entries.len());
        for (id, patch) in entries {
            let Some(p) = patch else {
                trips.push(wire::Trip {
                    trip_id: *id,
                    delete: true,
                    ..Default::default()
                });
                continue;
            };
            let mut trip = wire::Trip {
                trip_id: *id,
                service_id: p.service.as_ref().copied(),
                itinerary_id: p.itinerary.as_ref().copied(),
                short_name: text(&p.short_name),
                wheelchair: p.wheelchair.to_wire(),
                bikes: p.bikes.to_wire(),
                approximate: p.approximate,
                pickup_types: p.pickup_types.as_ref().map(|v| pack_pickups(v)),
                dropoff_types: p.dropoff_types.as_ref().map(|v| pack_pickups(v)),
                ..Default::default()
            };
            match &p.times {
                Field::Set(TripTimes::Schedule(schedule)) => {
                    let (departures, arrivals) = encode_schedule(schedule);
                    trip.departures = Some(departures);
                    trip.arrivals = Some(arrivals);
                }
                Field::Set(TripTimes::Frequency {
                    start,
                    end,
                    interval,
                }) => {
                    trip.start_time = Some(*start);
                    trip.end_time = Some(*end);
                    trip.interval = Some(*interval);
                }
                Field::Unset => {}
            }
            trips.push(trip);
        }
        wire::Trips { trips }
    }

    fn decode(message: wire::Trips, _strings: &StringTable) -> Result<Vec<Entry<TripPatch>>> {
        let mut entries = Vec::with_capacity(message.trips.len());
        for t in message.trips {
            if t.delete {
                entries.push((t.trip_id, None));
                continue;
            }
            let times = match (&t.departures, t.start_time, t.end_time, t.interval) {
                (Some(departures), None, None, None) => Field::Set(TripTimes::Schedule(
                    decode_schedule(t.trip_id, departures, t.arrivals.as_deref().unwrap_or(&[]))?,
                )),
                (None, Some(start), Some(end), Some(interval)) => {
                    Field::Set(TripTimes::Frequency {
                        start,
                        end,
                        interval,
                    })
                }
                (None, None, None, None) => Field::Unset,
                _ => {
                    return Err(Error::Format(format!(
                        "trip {} mixes stop times and frequencies",
                        t.trip_id
                    )))
                }
            };
            let patch = TripPatch {
                service: t.service_id.into(),
                itinerary: t.itinerary_id.into(),
                short_name: t.short_name.into(),
                wheelchair: Accessibility::from_wire(t.wheelchair)?,
                bikes: Accessibility::from_wire(t.bikes)?,
                approximate: t.approximate,
                times,
                pickup_types: t.pickup_types.as_deref().map(unpack_pickups).transpose()?.into(),
                dropoff_types: t.dropoff_types.as_deref().map(unpack_pickups).transpose()?.into(),
            };
            entries.push((t.trip_id, Some(patch)));
        }
        Ok(entries)
    }
}

/// Reads the string table, empty when the file has none.
pub fn read_strings(container: &Container) -> Result<StringTable> {
    match container.decode::<wire::StringTable>(Block::Strings)? {
        Some(message) => StringTable::from_strings(message.strings),
        None => Ok(StringTable::new()),
    }
}

/// Adds the string table to the blocks. Must come after every other block is encoded.
pub fn write_strings(strings: StringTable, blocks: &mut BTreeMap<Block, Vec<u8>>) {
    if !strings.is_empty() {
        let message = wire::StringTable {
            strings: strings.into_strings(),
        };
        blocks.insert(Block::Strings, message.encode_to_vec());
    }
}

/// Transfers keyed by their six ids, `None` for deletions.
pub fn encode_transfers(entries: &[(TransferKey, Option<&Transfer>)]) -> wire::Transfers {
    let transfers = entries
        .iter()
        .map(|(key, transfer)| wire::Transfer {
            from_stop: key.from_stop,
            to_stop: key.to_stop,
            from_route: key.from_route,
            to_route: key.to_route,
            from_trip: key.from_trip,
            to_trip: key.to_trip,
            transfer_type: transfer.map_or(0, |t| t.transfer_type.to_wire()),
            min_transfer_time: transfer.and_then(|t| t.min_transfer_time),
            delete: transfer.is_none(),
        })
        .collect();
    wire::Transfers { transfers }
}

pub fn decode_transfers(message: wire::Transfers) -> Result<Vec<(TransferKey, Option<Transfer>)>> {
    message
        .transfers
        .into_iter()
        .map(|t| {
            let key = TransferKey {
                from_stop: t.from_stop,
                to_stop: t.to_stop,
                from_route: t.from_route,
                to_route: t.to_route,
                from_trip: t.from_trip,
                to_trip: t.to_trip,
            };
            if t.delete {
                return Ok((key, None));
            }
            let transfer = Transfer {
                key,
                transfer_type: TransferType::from_wire(t.transfer_type)?,
                min_transfer_time: t.min_transfer_time,
            };
            Ok((key, Some(transfer)))
        })
        .collect()
}

/// Networks or areas; a removed name is written as an empty string.
pub fn encode_names(entries: &BTreeMap<u32, Option<String>>) -> wire::Names {
    wire::Names {
        names: entries
            .iter()
            .map(|(id, name)| (*id, name.clone().unwrap_or_default()))
            .collect(),
    }
}

pub fn decode_names(message: wire::Names) -> BTreeMap<u32, Option<String>> {
    message
        .names
        .into_iter()
        .map(|(id, name)| (id, (!name.is_empty()).then_some(name)))
        .collect()
}

/// Dense array indexed by id - 1, trailing zeros trimmed.
pub fn pack_links(links: &BTreeMap<u32, u32>) -> Vec<u32> {
    let len = links.keys().next_back().copied().unwrap_or(0) as usize;
    let mut values = vec![0; len];
    for (id, target) in links {
        if *id > 0 {
            values[*id as usize - 1] = *target;
        }
    }
    while values.last() == Some(&0) {
        values.pop();
    }
    values
}

pub fn unpack_links(values: &[u32]) -> BTreeMap<u32, u32> {
    values
        .iter()
        .enumerate()
        .filter(|(_, target)| **target != 0)
        .map(|(i, target)| (i as u32 + 1, *target))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<R: TableCodec>(entries: Vec<Entry<R::Patch>>) -> Vec<Entry<R::Patch>> {
        let mut strings = StringTable::new();
        let refs: Vec<Entry<&R::Patch>> = entries.iter().map(|(id, p)| (*id, p.as_ref())).collect();
        let message = R::encode(&refs, &mut strings);
        let bytes = message.encode_to_vec();
        let strings = StringTable::from_strings(strings.into_strings()).unwrap();
        R::decode(R::Message::decode(bytes.as_slice()).unwrap(), &strings).unwrap()
    }

    #[test]
    fn shapes_chain_from_the_previous_shape() {
        let a = vec![Point { lon: 1_400_000, lat: 5_000_000 }, Point { lon: 1_400_010, lat: 5_000_020 }];
        let b = vec![Point { lon: 1_400_011, lat: 5_000_019 }, Point { lon: 1_400_000, lat: 5_000_000 }];
        let mut strings = StringTable::new();
        let message = Shape::encode(&[(1, Some(&a)), (2, None), (3, Some(&b))], &mut strings);
        assert_eq!(message.shapes[2].longitudes.len(), 2);
        assert!(message.shapes[1].longitudes.is_empty());

        let decoded = Shape::decode(message, &strings).unwrap();
        assert_eq!(decoded, vec![(1, Some(a)), (2, None), (3, Some(b))]);
    }

    #[test]
    fn stop_fields_survive() {
        let full = StopPatch {
            code: Field::Set("1234".to_string()),
            name: Field::Set("Main Square".to_string()),
            position: Field::Set(Some(Point::from_degrees(14.0, 50.0))),
            location: LocationType::Station,
            wheelchair: Accessibility::Unavailable,
            external: Field::Set(ExternalId::Number(42)),
            ..Default::default()
        };
        let partial = StopPatch {
            position: Field::Set(None),
            parent: Field::Set(1),
            external: Field::Set(ExternalId::None),
            ..Default::default()
        };
        let moved = StopPatch {
            position: Field::Set(Some(Point::from_degrees(14.001, 50.002))),
            ..Default::default()
        };
        let entries = vec![(1, Some(full)), (2, Some(partial)), (3, None), (4, Some(moved))];
        assert_eq!(roundtrip::<Stop>(entries.clone()), entries);
    }

    #[test]
    fn route_with_itineraries() {
        let itinerary = Itinerary {
            id: 7,
            stops: vec![3, 1, 2],
            headsign: "Airport".to_string(),
            stop_headsigns: vec!["".to_string(), "Center".to_string()],
            shape: 2,
            opposite_direction: true,
        };
        let patch = RoutePatch {
            agency: Field::Set(1),
            short_name: Field::Set("119".to_string()),
            long_name: Field::Set(vec!["Center".to_string(), "Airport".to_string()]),
            route_type: RouteType::Tram,
            color: Some(0xff0000),
            itineraries: BTreeMap::from([(7, Some(itinerary)), (8, None)]),
            ..Default::default()
        };
        let entries = vec![(1, Some(patch)), (2, None)];
        assert_eq!(roundtrip::<Route>(entries.clone()), entries);
    }

    #[test]
    fn trip_schedules_and_frequencies() {
        let scheduled = TripPatch {
            service: Field::Set(1),
            itinerary: Field::Set(7),
            times: Field::Set(TripTimes::Schedule(Schedule::new(&[
                (None, Some(5760)),
                (Some(5800), Some(5806)),
                (None, None),
                (Some(5900), None),
            ]))),
            pickup_types: Field::Set(vec![PickupDropoff::Regular, PickupDropoff::NotAvailable]),
            ..Default::default()
        };
        let frequency = TripPatch {
            wheelchair: Accessibility::Available,
            times: Field::Set(TripTimes::Frequency {
                start: 360,
                end: 1380,
                interval: 600,
            }),
            ..Default::default()
        };
        let entries = vec![(1, Some(scheduled)), (2, Some(frequency)), (3, None)];
        assert_eq!(roundtrip::<Trip>(entries.clone()), entries);
    }

    #[test]
    fn mixed_trip_times_are_rejected() {
        let message = wire::Trips {
            trips: vec![wire::Trip {
                trip_id: 1,
                departures: Some(vec![1]),
                start_time: Some(10),
                end_time: Some(20),
                interval: Some(60),
                ..Default::default()
            }],
        };
        assert!(Trip::decode(message, &StringTable::new()).is_err());
    }

    #[test]
    fn fare_link_arrays_trim_zeros() {
        let links = BTreeMap::from([(2, 5), (3, 0), (4, 1)]);
        assert_eq!(pack_links(&links), vec![0, 5, 0, 1]);
        assert_eq!(unpack_links(&[0, 5, 0, 1, 0]), BTreeMap::from([(2, 5), (4, 1)]));
    }

    #[test]
    fn removed_names_are_empty_strings() {
        let names = BTreeMap::from([(1, Some("Zone A".to_string())), (2, None)]);
        let message = encode_names(&names);
        assert_eq!(message.names[&2], "");
        assert_eq!(decode_names(message), names);
    }
}
