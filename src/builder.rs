//! Turns raw source rows into a resolved snapshot, reusing the id assignments of the
//! previous run so that unchanged entities keep their stable ids.
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::ids::{IdStore, IdTable};
use crate::model::{
    Accessibility, Agency, Calendar, Feed, Itinerary, LocationType, PickupDropoff, Point, Route,
    RouteType, Schedule, Service, Shape, Stop, Transfer, TransferKey, TransferType, Trip,
    TripTimes,
};
use crate::raw::{RawFeed, RawFrequency, RawNamed, RawRoute, RawStopTime};
use crate::snapshot::{PreviousRun, Snapshot};
use crate::varint::{pack_duration, pack_minutes, pack_time};

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Build date; also the calendar base date.
    pub date: NaiveDate,
    /// Source url, inherited from the previous run when absent.
    pub original_url: Option<String>,
}

fn accessibility(code: i32) -> Result<Accessibility> {
    Ok(match code {
        0 => Accessibility::Unknown,
        1 => Accessibility::Available,
        2 => Accessibility::Unavailable,
        _ => return Err(Error::InvalidInput(format!("accessibility code {}", code))),
    })
}

fn location_type(code: i32) -> Result<LocationType> {
    Ok(match code {
        0 => LocationType::Stop,
        1 => LocationType::Station,
        2 => LocationType::Entrance,
        3 => LocationType::Node,
        4 => LocationType::BoardingArea,
        _ => return Err(Error::InvalidInput(format!("location type {}", code))),
    })
}

fn pickup(code: i32) -> Result<PickupDropoff> {
    Ok(match code {
        0 => PickupDropoff::Regular,
        1 => PickupDropoff::NotAvailable,
        2 => PickupDropoff::PhoneAgency,
        3 => PickupDropoff::TellDriver,
        _ => return Err(Error::InvalidInput(format!("pickup/drop-off type {}", code))),
    })
}

fn transfer_type(code: i32) -> Result<TransferType> {
    Ok(match code {
        0 => TransferType::Possible,
        1 => TransferType::DepartureWaits,
        2 => TransferType::NeedsTime,
        3 => TransferType::NotPossible,
        4 => TransferType::InSeat,
        5 => TransferType::InSeatForbidden,
        _ => return Err(Error::InvalidInput(format!("transfer type {}", code))),
    })
}

/// Parses `RRGGBB`, treating `skip` (white for route colours, black for text) as absent.
fn color(value: Option<&str>, skip: u32) -> Result<Option<u32>> {
    let Some(value) = non_empty(value) else {
        return Ok(None);
    };
    let parsed = u32::from_str_radix(value.trim_start_matches('#'), 16)
        .map_err(|_| Error::InvalidInput(format!("colour {:?}", value)))?;
    Ok((parsed != skip).then_some(parsed))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn trim_regular(mut types: Vec<PickupDropoff>) -> Vec<PickupDropoff> {
    while types.last() == Some(&PickupDropoff::Regular) {
        types.pop();
    }
    types
}

/// Splits "A - B - C" into its parts when any part names a stop or a headsign.
fn split_long_name(name: &str, known: &HashSet<&str>) -> Vec<String> {
    if name.is_empty() {
        return vec![];
    }
    let normalized = name.replace(['\u{2014}', '\u{2013}'], "-");
    let parts: Vec<&str> = normalized
        .split(" - ")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() > 1 && parts.iter().any(|p| known.contains(p)) {
        parts.into_iter().map(str::to_string).collect()
    } else {
        vec![name.to_string()]
    }
}

struct Builder {
    ids: IdStore,
    feed: Feed,
    /// Entities of the feed being built. The id store also holds retired ids.
    present: HashSet<(IdTable, u32)>,
}

impl Builder {
    /// Resolves the id of an entity this feed defines.
    fn add(&mut self, table: IdTable, source: &str) -> u32 {
        let id = self.ids.resolve(table, source);
        self.present.insert((table, id));
        id
    }

    /// Id of an entity defined by this feed, ignoring ids of earlier runs.
    fn current(&self, table: IdTable, source: &str) -> Option<u32> {
        self.ids
            .get(table, source)
            .filter(|id| self.present.contains(&(table, *id)))
    }

    fn lookup(&self, table: IdTable, source: &str) -> Result<u32> {
        self.current(table, source).ok_or_else(|| {
            Error::InvalidInput(format!("unknown {} id {:?}", table.name(), source))
        })
    }

    fn agencies(&mut self, raw: &RawFeed) {
        log::info!("Preparing agencies...");
        for agency in &raw.agencies {
            let source = non_empty(agency.id.as_deref()).unwrap_or(&agency.name);
            let id = self.add(IdTable::Agencies, source);
            self.feed.agencies.push(Agency {
                id,
                name: agency.name.clone(),
                url: agency.url.clone(),
                timezone: agency.timezone.clone(),
                lang: text(&agency.lang),
                phone: text(&agency.phone),
                fare_url: text(&agency.fare_url),
                email: text(&agency.email),
            });
        }
    }

    fn calendar(&mut self, raw: &RawFeed, base_date: NaiveDate) {
        log::info!("Preparing calendar...");
        let mut services: Vec<Service> = vec![];
        let mut index: HashMap<&str, usize> = HashMap::new();
        for row in &raw.calendar {
            let weekdays = row
                .weekdays
                .iter()
                .enumerate()
                .filter(|(_, on)| **on)
                .fold(0u8, |bits, (day, _)| bits | 1 << day);
            let id = self.add(IdTable::Services, &row.service_id);
            index.insert(row.service_id.as_str(), services.len());
            services.push(Service {
                id,
                start: row.start_date,
                end: row.end_date,
                weekdays,
                ..Default::default()
            });
        }
        for row in &raw.calendar_dates {
            let i = match index.get(row.service_id.as_str()) {
                Some(i) => *i,
                None => {
                    let id = self.add(IdTable::Services, &row.service_id);
                    index.insert(row.service_id.as_str(), services.len());
                    services.push(Service {
                        id,
                        ..Default::default()
                    });
                    services.len() - 1
                }
            };
            let service = &mut services[i];
            if row.added {
                service.added.push(row.date);
            } else {
                service.removed.push(row.date);
            }
        }
        let mut calendar = Calendar {
            base_date,
            services,
        };
        calendar.normalize();
        self.feed.calendar = calendar;
    }

    fn shapes(&mut self, raw: &RawFeed) {
        log::info!("Preparing shapes...");
        let mut order: Vec<&str> = vec![];
        let mut points: HashMap<&str, Vec<(u32, Point)>> = HashMap::new();
        for row in &raw.shapes {
            let entry = points.entry(row.shape_id.as_str()).or_insert_with(|| {
                order.push(row.shape_id.as_str());
                vec![]
            });
            entry.push((row.sequence, Point::from_degrees(row.lon, row.lat)));
        }
        for source in order {
            let Some(mut shape) = points.remove(source) else {
                continue;
            };
            if shape.len() < 2 {
                log::warn!("Skipping shape {} with fewer than two points", source);
                continue;
            }
            shape.sort_by_key(|(sequence, _)| *sequence);
            let id = self.add(IdTable::Shapes, source);
            self.feed.shapes.push(Shape {
                id,
                points: shape.into_iter().map(|(_, p)| p).collect(),
            });
        }
    }

    fn names(&mut self, rows: &[RawNamed], table: IdTable) -> BTreeMap<u32, String> {
        rows.iter()
            .map(|row| {
                let id = self.add(table, &row.id);
                let name = non_empty(row.name.as_deref()).unwrap_or(&row.id);
                (id, name.to_string())
            })
            .collect()
    }

    fn stops(&mut self, raw: &RawFeed) -> Result<()> {
        log::info!("Preparing stops...");
        for row in &raw.stops {
            let id = self.add(IdTable::Stops, &row.id);
            let parent = match non_empty(row.parent_station.as_deref()) {
                Some(parent) => self.ids.resolve(IdTable::Stops, parent),
                None => 0,
            };
            if let Some(zone) = non_empty(row.zone_id.as_deref()) {
                let zone = self.ids.resolve(IdTable::Zones, zone);
                self.feed.fare_links.stop_zones.insert(id, zone);
            }
            let position = match (row.lon, row.lat) {
                (Some(lon), Some(lat)) => Some(Point::from_degrees(lon, lat)),
                _ => None,
            };
            self.feed.stops.push(Stop {
                id,
                code: text(&row.code),
                name: text(&row.name),
                desc: text(&row.desc),
                position,
                location: location_type(row.location_type)?,
                parent,
                wheelchair: accessibility(row.wheelchair_boarding)?,
                platform_code: text(&row.platform_code),
                ..Default::default()
            });
        }
        for row in &raw.stop_areas {
            let (Some(stop), Some(area)) = (
                self.current(IdTable::Stops, &row.stop_id),
                self.current(IdTable::Areas, &row.area_id),
            ) else {
                log::warn!("Skipping unknown stop area {} -> {}", row.stop_id, row.area_id);
                continue;
            };
            self.feed.fare_links.stop_areas.insert(stop, area);
        }
        Ok(())
    }

    /// Network id for a source id, adding an unnamed network when none is defined.
    fn network(&mut self, source: &str) -> u32 {
        let id = self.add(IdTable::Networks, source);
        self.feed
            .networks
            .entry(id)
            .or_insert_with(|| source.to_string());
        id
    }

    /// Builds the itineraries of every route and returns the itinerary of each trip.
    fn routes<'a>(
        &mut self,
        raw: &'a RawFeed,
        stop_times: &HashMap<&str, Vec<&RawStopTime>>,
    ) -> Result<HashMap<&'a str, u32>> {
        log::info!("Preparing itineraries...");
        let mut by_route: HashMap<&str, Vec<Itinerary>> = HashMap::new();
        let mut trip_itineraries = HashMap::new();
        let mut skipped = 0;
        for trip in &raw.trips {
            let Some(times) = stop_times.get(trip.id.as_str()) else {
                skipped += 1;
                continue;
            };
            let stops = times
                .iter()
                .map(|st| self.lookup(IdTable::Stops, &st.stop_id))
                .collect::<Result<Vec<_>>>()?;
            let shape = non_empty(trip.shape_id.as_deref())
                .and_then(|s| self.current(IdTable::Shapes, s))
                .unwrap_or(0);
            let headsign = text(&trip.headsign);
            let mut stop_headsigns: Vec<String> =
                times.iter().map(|st| text(&st.stop_headsign)).collect();
            while stop_headsigns.last().is_some_and(String::is_empty) {
                stop_headsigns.pop();
            }
            let opposite_direction = trip.direction_id == Some(1);

            let signature = format!(
                "{}:{}:{}:{}:{}:{}",
                trip.route_id,
                shape,
                u8::from(opposite_direction),
                headsign,
                stops.iter().map(u32::to_string).collect::<Vec<_>>().join("-"),
                stop_headsigns.join("|"),
            );
            let id = self.ids.resolve(IdTable::Itineraries, &signature);
            let itineraries = by_route.entry(trip.route_id.as_str()).or_default();
            if !itineraries.iter().any(|i| i.id == id) {
                itineraries.push(Itinerary {
                    id,
                    stops,
                    headsign,
                    stop_headsigns,
                    shape,
                    opposite_direction,
                });
            }
            trip_itineraries.insert(trip.id.as_str(), id);
        }
        if skipped > 0 {
            log::warn!("Skipped {} trips without stop times", skipped);
        }

        log::info!("Preparing routes...");
        let mut known: HashSet<&str> = raw.stops.iter().filter_map(|s| s.name.as_deref()).collect();
        known.extend(raw.trips.iter().filter_map(|t| t.headsign.as_deref()));
        let single_agency = match self.feed.agencies.as_slice() {
            [agency] => agency.id,
            _ => 0,
        };
        for row in &raw.routes {
            let Some(itineraries) = by_route.remove(row.id.as_str()) else {
                log::debug!("Skipping route {} without trips", row.id);
                continue;
            };
            let route = self.route(row, itineraries, single_agency, &known)?;
            self.feed.routes.push(route);
        }
        if let Some(route) = by_route.keys().next() {
            return Err(Error::InvalidInput(format!("trips reference unknown route {:?}", route)));
        }
        for row in &raw.route_networks {
            let Some(route) = self.current(IdTable::Routes, &row.route_id) else {
                log::warn!("Skipping network {} of unknown route {}", row.network_id, row.route_id);
                continue;
            };
            let network = self.network(&row.network_id);
            self.feed.fare_links.route_networks.insert(route, network);
        }
        Ok(trip_itineraries)
    }

    fn route(
        &mut self,
        row: &RawRoute,
        itineraries: Vec<Itinerary>,
        single_agency: u32,
        known: &HashSet<&str>,
    ) -> Result<Route> {
        let id = self.add(IdTable::Routes, &row.id);
        let agency = match non_empty(row.agency_id.as_deref()) {
            Some(agency) => self.lookup(IdTable::Agencies, agency)?,
            None => single_agency,
        };
        let route_type = RouteType::from_gtfs(row.route_type).ok_or_else(|| {
            Error::InvalidInput(format!("route {} has type {}", row.id, row.route_type))
        })?;
        if let Some(network) = non_empty(row.network_id.as_deref()) {
            let network = self.network(network);
            self.feed.fare_links.route_networks.insert(id, network);
        }
        Ok(Route {
            id,
            agency,
            short_name: text(&row.short_name),
            long_name: split_long_name(row.long_name.as_deref().unwrap_or(""), known),
            desc: text(&row.desc),
            route_type,
            color: color(row.color.as_deref(), 0xFFFFFF)?,
            text_color: color(row.text_color.as_deref(), 0x000000)?,
            continuous_pickup: pickup(row.continuous_pickup.unwrap_or(1))?,
            continuous_dropoff: pickup(row.continuous_drop_off.unwrap_or(1))?,
            itineraries,
        })
    }

    fn trips(
        &mut self,
        raw: &RawFeed,
        stop_times: &HashMap<&str, Vec<&RawStopTime>>,
        itineraries: &HashMap<&str, u32>,
    ) -> Result<()> {
        log::info!("Preparing trips...");
        let frequencies: HashMap<&str, &RawFrequency> = raw
            .frequencies
            .iter()
            .rev()
            .map(|f| (f.trip_id.as_str(), f))
            .collect();
        for row in &raw.trips {
            let (Some(itinerary), Some(times)) = (
                itineraries.get(row.id.as_str()),
                stop_times.get(row.id.as_str()),
            ) else {
                continue;
            };
            let id = self.add(IdTable::Trips, &row.id);
            let service = self.lookup(IdTable::Services, &row.service_id)?;
            let (times_of_trip, approximate) = match frequencies.get(row.id.as_str()) {
                Some(f) => (
                    TripTimes::Frequency {
                        start: pack_minutes(f.start_time),
                        end: pack_minutes(f.end_time),
                        interval: f.headway_secs,
                    },
                    !f.exact_times,
                ),
                None => {
                    let pairs: Vec<_> = times
                        .iter()
                        .map(|st| (st.arrival_time.map(pack_time), st.departure_time.map(pack_time)))
                        .collect();
                    (
                        TripTimes::Schedule(Schedule::new(&pairs)),
                        times.iter().any(|st| st.timepoint == Some(false)),
                    )
                }
            };
            let pickup_types = times
                .iter()
                .map(|st| pickup(st.pickup_type))
                .collect::<Result<Vec<_>>>()?;
            let dropoff_types = times
                .iter()
                .map(|st| pickup(st.drop_off_type))
                .collect::<Result<Vec<_>>>()?;
            self.feed.trips.push(Trip {
                id,
                service,
                itinerary: *itinerary,
                short_name: text(&row.short_name),
                wheelchair: accessibility(row.wheelchair_accessible)?,
                bikes: accessibility(row.bikes_allowed)?,
                approximate,
                times: times_of_trip,
                pickup_types: trim_regular(pickup_types),
                dropoff_types: trim_regular(dropoff_types),
            });
        }
        Ok(())
    }

    /// Resolves an optional transfer endpoint; `None` means the id is unknown.
    fn endpoint(&self, table: IdTable, source: &Option<String>) -> Option<u32> {
        match non_empty(source.as_deref()) {
            Some(source) => self.current(table, source),
            None => Some(0),
        }
    }

    fn transfers(&mut self, raw: &RawFeed) -> Result<()> {
        log::info!("Preparing transfers...");
        let mut transfers = BTreeMap::new();
        for row in &raw.transfers {
            let key = (|| {
                Some(TransferKey {
                    from_stop: self.endpoint(IdTable::Stops, &row.from_stop_id)?,
                    to_stop: self.endpoint(IdTable::Stops, &row.to_stop_id)?,
                    from_route: self.endpoint(IdTable::Routes, &row.from_route_id)?,
                    to_route: self.endpoint(IdTable::Routes, &row.to_route_id)?,
                    from_trip: self.endpoint(IdTable::Trips, &row.from_trip_id)?,
                    to_trip: self.endpoint(IdTable::Trips, &row.to_trip_id)?,
                })
            })();
            let Some(key) = key else {
                log::warn!(
                    "Skipping transfer {:?} -> {:?} with unknown endpoints",
                    row.from_stop_id,
                    row.to_stop_id
                );
                continue;
            };
            transfers.insert(
                key,
                Transfer {
                    key,
                    transfer_type: transfer_type(row.transfer_type)?,
                    min_transfer_time: row.min_transfer_time.map(pack_duration),
                },
            );
        }
        self.feed.transfers = transfers.into_values().collect();
        Ok(())
    }
}

/// Builds the next snapshot of a feed from its source rows.
///
/// Ids known to `previous` are reused; new source ids are appended to their table.
pub fn build_snapshot(
    raw: &RawFeed,
    previous: Option<&PreviousRun>,
    options: &BuildOptions,
) -> Result<Snapshot> {
    let mut builder = Builder {
        ids: previous.map(|p| p.ids.clone()).unwrap_or_default(),
        feed: Feed::default(),
        present: HashSet::new(),
    };
    builder.agencies(raw);
    builder.calendar(raw, options.date);
    builder.shapes(raw);
    builder.feed.networks = builder.names(&raw.networks, IdTable::Networks);
    builder.feed.areas = builder.names(&raw.areas, IdTable::Areas);
    builder.stops(raw)?;

    let mut stop_times: HashMap<&str, Vec<&RawStopTime>> = HashMap::new();
    for st in &raw.stop_times {
        stop_times.entry(st.trip_id.as_str()).or_default().push(st);
    }
    for times in stop_times.values_mut() {
        times.sort_by_key(|st| st.stop_sequence);
    }
    let itineraries = builder.routes(raw, &stop_times)?;
    builder.trips(raw, &stop_times, &itineraries)?;
    builder.transfers(raw)?;

    let Builder { ids, mut feed, .. } = builder;
    feed.sort();
    feed.validate()?;
    log::debug!(
        "Built {} stops, {} routes, {} trips",
        feed.stops.len(),
        feed.routes.len(),
        feed.trips.len()
    );
    Ok(Snapshot {
        version: previous.map_or(1, |p| p.version + 1),
        date: options.date,
        original_url: options
            .original_url
            .clone()
            .or_else(|| previous.map(|p| p.original_url.clone()))
            .unwrap_or_default(),
        ids,
        feed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{RawAgency, RawCalendar, RawCalendarDate, RawStop, RawTrip};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn options() -> BuildOptions {
        BuildOptions {
            date: date(17),
            original_url: None,
        }
    }

    fn stop(id: &str, name: &str) -> RawStop {
        RawStop {
            id: id.to_string(),
            name: Some(name.to_string()),
            lat: Some(50.08),
            lon: Some(14.43),
            ..Default::default()
        }
    }

    fn stop_time(trip: &str, stop: &str, sequence: u32, time: u32) -> RawStopTime {
        RawStopTime {
            trip_id: trip.to_string(),
            stop_id: stop.to_string(),
            stop_sequence: sequence,
            arrival_time: Some(time),
            departure_time: Some(time),
            ..Default::default()
        }
    }

    fn feed() -> RawFeed {
        RawFeed {
            agencies: vec![RawAgency {
                name: "City Transit".to_string(),
                timezone: "Europe/Prague".to_string(),
                ..Default::default()
            }],
            calendar: vec![RawCalendar {
                service_id: "WD".to_string(),
                weekdays: [true, true, true, true, true, false, false],
                start_date: Some(date(1)),
                end_date: Some(date(31)),
            }],
            calendar_dates: vec![RawCalendarDate {
                service_id: "HOL".to_string(),
                date: date(20),
                added: true,
            }],
            stops: vec![stop("A", "Museum"), stop("B", "Depot")],
            routes: vec![RawRoute {
                id: "R1".to_string(),
                route_type: 3,
                long_name: Some("Museum \u{2013} Depot".to_string()),
                color: Some("FFFFFF".to_string()),
                ..Default::default()
            }],
            trips: vec![
                RawTrip {
                    id: "T2".to_string(),
                    route_id: "R1".to_string(),
                    service_id: "WD".to_string(),
                    ..Default::default()
                },
                RawTrip {
                    id: "T1".to_string(),
                    route_id: "R1".to_string(),
                    service_id: "HOL".to_string(),
                    ..Default::default()
                },
                RawTrip {
                    id: "T3".to_string(),
                    route_id: "R1".to_string(),
                    service_id: "WD".to_string(),
                    ..Default::default()
                },
            ],
            stop_times: vec![
                stop_time("T1", "B", 2, 28_860),
                stop_time("T1", "A", 1, 28_800),
                stop_time("T2", "A", 1, 32_400),
                stop_time("T2", "B", 2, 32_460),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn builds_resolved_feed() {
        let snapshot = build_snapshot(&feed(), None, &options()).unwrap();
        assert_eq!(snapshot.version, 1);
        let feed = &snapshot.feed;
        assert_eq!(feed.agencies[0].id, 1);
        assert_eq!(feed.calendar.services.len(), 2);
        assert_eq!(feed.calendar.services[0].start, Some(date(17)));
        let route = &feed.routes[0];
        assert_eq!(route.agency, 1);
        assert_eq!(route.route_type, RouteType::Bus);
        assert_eq!(route.color, None);
        assert_eq!(route.long_name, vec!["Museum", "Depot"]);
        // Both trips share one itinerary; T3 has no stop times.
        assert_eq!(route.itineraries.len(), 1);
        assert_eq!(route.itineraries[0].stops, vec![1, 2]);
        assert_eq!(feed.trips.len(), 2);
        let t1 = feed.trips.iter().find(|t| snapshot.ids.original(IdTable::Trips, t.id) == Some("T1"));
        match &t1.unwrap().times {
            TripTimes::Schedule(schedule) => assert_eq!(schedule.departures, vec![Some(5760), Some(5772)]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rerun_keeps_ids_and_bumps_version() {
        let first = build_snapshot(&feed(), None, &options()).unwrap();
        let mut raw = feed();
        raw.stops.insert(0, stop("C", "Harbour"));
        let second = build_snapshot(&raw, Some(&first.previous_run()), &options()).unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.ids.get(IdTable::Stops, "A"), Some(1));
        assert_eq!(second.ids.get(IdTable::Stops, "C"), Some(3));
        assert_eq!(
            second.ids.ids(IdTable::Itineraries),
            first.ids.ids(IdTable::Itineraries)
        );
    }

    #[test]
    fn unknown_route_type_is_rejected() {
        let mut raw = feed();
        raw.routes[0].route_type = 42;
        assert!(matches!(
            build_snapshot(&raw, None, &options()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn long_names_split_only_on_known_parts() {
        let known = HashSet::from(["Museum"]);
        assert_eq!(split_long_name("Museum - Depot", &known), vec!["Museum", "Depot"]);
        assert_eq!(split_long_name("Night - Line", &known), vec!["Night - Line"]);
        assert!(split_long_name("", &known).is_empty());
    }

    #[test]
    fn transfers_round_up_and_skip_unknown_stops() {
        let mut raw = feed();
        raw.transfers = vec![
            crate::raw::RawTransfer {
                from_stop_id: Some("A".to_string()),
                to_stop_id: Some("B".to_string()),
                transfer_type: 2,
                min_transfer_time: Some(121),
                ..Default::default()
            },
            crate::raw::RawTransfer {
                from_stop_id: Some("A".to_string()),
                to_stop_id: Some("Z".to_string()),
                ..Default::default()
            },
        ];
        let snapshot = build_snapshot(&raw, None, &options()).unwrap();
        assert_eq!(snapshot.feed.transfers.len(), 1);
        assert_eq!(snapshot.feed.transfers[0].min_transfer_time, Some(25));
    }

    #[test]
    fn references_to_retired_ids_are_skipped() {
        let mut earlier = feed();
        earlier.stops.push(stop("Z", "Quarry"));
        let first = build_snapshot(&earlier, None, &options()).unwrap();
        assert_eq!(first.ids.get(IdTable::Stops, "Z"), Some(3));

        let mut raw = feed();
        raw.areas = vec![RawNamed {
            id: "ZA".to_string(),
            name: Some("Zone A".to_string()),
        }];
        raw.stop_areas = vec![crate::raw::RawStopArea {
            area_id: "ZA".to_string(),
            stop_id: "Z".to_string(),
        }];
        raw.transfers = vec![crate::raw::RawTransfer {
            from_stop_id: Some("A".to_string()),
            to_stop_id: Some("Z".to_string()),
            ..Default::default()
        }];
        let fresh = build_snapshot(&raw, None, &options()).unwrap();
        let rerun = build_snapshot(&raw, Some(&first.previous_run()), &options()).unwrap();
        for snapshot in [&fresh, &rerun] {
            assert!(snapshot.feed.transfers.is_empty());
            assert!(snapshot.feed.fare_links.stop_areas.is_empty());
        }
    }
}
