//! In-memory representation of a packed feed, with stable integer ids.
use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::varint::{from_fixed, to_fixed};

/// Fixed-point coordinate pair, degrees × 100000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Point {
    pub lon: i32,
    pub lat: i32,
}

impl Point {
    pub fn from_degrees(lon: f64, lat: f64) -> Self {
        Point {
            lon: to_fixed(lon),
            lat: to_fixed(lat),
        }
    }

    pub fn lon_degrees(&self) -> f64 {
        from_fixed(self.lon)
    }

    pub fn lat_degrees(&self) -> f64 {
        from_fixed(self.lat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Accessibility {
    #[default]
    Unknown,
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum LocationType {
    #[default]
    Stop,
    Station,
    Entrance,
    Node,
    BoardingArea,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum PickupDropoff {
    #[default]
    Regular,
    NotAvailable,
    PhoneAgency,
    TellDriver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum RouteType {
    #[default]
    Bus,
    Tram,
    Subway,
    Rail,
    Ferry,
    CableTram,
    Aerial,
    Funicular,
    CommunalTaxi,
    Coach,
    Trolleybus,
    Monorail,
    UrbanRail,
    Water,
    Air,
    Taxi,
    Misc,
}

impl RouteType {
    /// Maps basic and extended GTFS route type codes.
    pub fn from_gtfs(code: i32) -> Option<RouteType> {
        let group = code / 100;
        Some(match code {
            0 => RouteType::Tram,
            1 | 401 | 402 => RouteType::Subway,
            2 => RouteType::Rail,
            3 => RouteType::Bus,
            4 | 1200 => RouteType::Ferry,
            5 | 1302 => RouteType::CableTram,
            6 => RouteType::Aerial,
            7 | 1400 => RouteType::Funicular,
            11 | 800 => RouteType::Trolleybus,
            12 | 405 => RouteType::Monorail,
            400 | 403 | 404 => RouteType::UrbanRail,
            1000 => RouteType::Water,
            1100 => RouteType::Air,
            1501 => RouteType::CommunalTaxi,
            _ if group == 9 => RouteType::Tram,
            _ if group == 1 => RouteType::Rail,
            _ if group == 2 => RouteType::Coach,
            _ if group == 7 => RouteType::Bus,
            _ if group == 13 => RouteType::Aerial,
            _ if group == 15 => RouteType::Taxi,
            _ if group == 17 => RouteType::Misc,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TransferType {
    #[default]
    Possible,
    DepartureWaits,
    NeedsTime,
    NotPossible,
    InSeat,
    InSeatForbidden,
}

/// Identifier of a stop in some external system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ExternalId {
    #[default]
    None,
    Text(String),
    Number(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Agency {
    pub id: u32,
    pub name: String,
    pub url: String,
    pub timezone: String,
    pub lang: String,
    pub phone: String,
    pub fare_url: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Service {
    pub id: u32,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Bit 0 is Monday.
    pub weekdays: u8,
    pub added: Vec<NaiveDate>,
    pub removed: Vec<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Calendar {
    pub base_date: NaiveDate,
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Shape {
    pub id: u32,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Stop {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub desc: String,
    pub position: Option<Point>,
    pub location: LocationType,
    pub parent: u32,
    pub wheelchair: Accessibility,
    pub platform_code: String,
    pub external: ExternalId,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Itinerary {
    pub id: u32,
    pub stops: Vec<u32>,
    pub headsign: String,
    /// Per-stop headsign overrides, trailing empty entries trimmed.
    pub stop_headsigns: Vec<String>,
    pub shape: u32,
    pub opposite_direction: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Route {
    pub id: u32,
    pub agency: u32,
    pub short_name: String,
    /// Either the whole long name, or its " - " separated parts.
    pub long_name: Vec<String>,
    pub desc: String,
    pub route_type: RouteType,
    pub color: Option<u32>,
    pub text_color: Option<u32>,
    pub continuous_pickup: PickupDropoff,
    pub continuous_dropoff: PickupDropoff,
    pub itineraries: Vec<Itinerary>,
}

/// Stop times in 5-second units, one entry per itinerary stop.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Schedule {
    pub departures: Vec<Option<u32>>,
    /// Present only where the vehicle arrives before it departs.
    pub arrivals: Vec<Option<u32>>,
}

impl Schedule {
    /// Builds a schedule from (arrival, departure) pairs, filling a missing departure
    /// with the arrival and dropping arrivals that equal or follow the departure.
    pub fn new(times: &[(Option<u32>, Option<u32>)]) -> Self {
        let mut departures = Vec::with_capacity(times.len());
        let mut arrivals = Vec::with_capacity(times.len());
        for (arrival, departure) in times {
            let departure = departure.or(*arrival);
            departures.push(departure);
            arrivals.push(match (arrival, departure) {
                (Some(a), Some(d)) if *a < d => Some(*a),
                _ => None,
            });
        }
        Schedule {
            departures,
            arrivals,
        }
    }

    pub fn len(&self) -> usize {
        self.departures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.departures.is_empty()
    }

    /// Arrival at the given stop index, falling back to the departure.
    pub fn arrival(&self, i: usize) -> Option<u32> {
        self.arrivals
            .get(i)
            .copied()
            .flatten()
            .or_else(|| self.departures.get(i).copied().flatten())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TripTimes {
    Schedule(Schedule),
    /// Start and end in minutes after midnight, interval in seconds.
    Frequency { start: u32, end: u32, interval: u32 },
}

impl Default for TripTimes {
    fn default() -> Self {
        TripTimes::Schedule(Schedule::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Trip {
    pub id: u32,
    pub service: u32,
    pub itinerary: u32,
    pub short_name: String,
    pub wheelchair: Accessibility,
    pub bikes: Accessibility,
    pub approximate: bool,
    pub times: TripTimes,
    /// Trailing regular entries trimmed.
    pub pickup_types: Vec<PickupDropoff>,
    pub dropoff_types: Vec<PickupDropoff>,
}

/// The natural key of a transfer: from/to stop, route and trip, 0 when unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct TransferKey {
    pub from_stop: u32,
    pub to_stop: u32,
    pub from_route: u32,
    pub to_route: u32,
    pub from_trip: u32,
    pub to_trip: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Transfer {
    pub key: TransferKey,
    pub transfer_type: TransferType,
    /// In 5-second units, rounded up.
    pub min_transfer_time: Option<u32>,
}

/// Links from stops and routes to the fare-related tables.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FareLinks {
    pub stop_areas: BTreeMap<u32, u32>,
    pub stop_zones: BTreeMap<u32, u32>,
    pub route_networks: BTreeMap<u32, u32>,
}

impl FareLinks {
    pub fn is_empty(&self) -> bool {
        self.stop_areas.is_empty() && self.stop_zones.is_empty() && self.route_networks.is_empty()
    }
}

/// All tables of one feed snapshot, each sorted by stable id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Feed {
    pub agencies: Vec<Agency>,
    pub calendar: Calendar,
    pub shapes: Vec<Shape>,
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    pub trips: Vec<Trip>,
    pub transfers: Vec<Transfer>,
    pub networks: BTreeMap<u32, String>,
    pub areas: BTreeMap<u32, String>,
    pub fare_links: FareLinks,
}

impl Feed {
    pub fn sort(&mut self) {
        self.agencies.sort_by_key(|a| a.id);
        self.calendar.services.sort_by_key(|s| s.id);
        self.shapes.sort_by_key(|s| s.id);
        self.stops.sort_by_key(|s| s.id);
        self.routes.sort_by_key(|r| r.id);
        for route in self.routes.iter_mut() {
            route.itineraries.sort_by_key(|i| i.id);
        }
        self.trips.sort_by_key(|t| t.id);
        self.transfers.sort_by_key(|t| t.key);
    }

    pub fn itinerary(&self, id: u32) -> Option<&Itinerary> {
        self.routes
            .iter()
            .flat_map(|r| r.itineraries.iter())
            .find(|i| i.id == id)
    }

    /// Checks that every cross reference points to an existing record.
    pub fn validate(&self) -> Result<()> {
        let agencies: HashSet<u32> = self.agencies.iter().map(|a| a.id).collect();
        let services: HashSet<u32> = self.calendar.services.iter().map(|s| s.id).collect();
        let shapes: HashSet<u32> = self.shapes.iter().map(|s| s.id).collect();
        let stops: HashSet<u32> = self.stops.iter().map(|s| s.id).collect();
        let routes: HashSet<u32> = self.routes.iter().map(|r| r.id).collect();
        let trips: HashSet<u32> = self.trips.iter().map(|t| t.id).collect();
        let mut itineraries = HashSet::new();

        let check = |ids: &HashSet<u32>, table, id, target, target_id| {
            if target_id == 0 || ids.contains(&target_id) {
                Ok(())
            } else {
                Err(Error::Reference {
                    table,
                    id,
                    target,
                    target_id,
                })
            }
        };

        for stop in &self.stops {
            check(&stops, "stop", stop.id, "stop", stop.parent)?;
        }
        for route in &self.routes {
            check(&agencies, "route", route.id, "agency", route.agency)?;
            for itinerary in &route.itineraries {
                itineraries.insert(itinerary.id);
                check(&shapes, "itinerary", itinerary.id, "shape", itinerary.shape)?;
                for stop in &itinerary.stops {
                    if !stops.contains(stop) {
                        return Err(Error::Reference {
                            table: "itinerary",
                            id: itinerary.id,
                            target: "stop",
                            target_id: *stop,
                        });
                    }
                }
            }
        }
        for trip in &self.trips {
            check(&services, "trip", trip.id, "service", trip.service)?;
            if !itineraries.contains(&trip.itinerary) {
                return Err(Error::Reference {
                    table: "trip",
                    id: trip.id,
                    target: "itinerary",
                    target_id: trip.itinerary,
                });
            }
        }
        for transfer in &self.transfers {
            let key = &transfer.key;
            check(&stops, "transfer", key.from_stop, "stop", key.from_stop)?;
            check(&stops, "transfer", key.from_stop, "stop", key.to_stop)?;
            check(&routes, "transfer", key.from_stop, "route", key.from_route)?;
            check(&routes, "transfer", key.from_stop, "route", key.to_route)?;
            check(&trips, "transfer", key.from_stop, "trip", key.from_trip)?;
            check(&trips, "transfer", key.from_stop, "trip", key.to_trip)?;
        }
        for (stop, area) in &self.fare_links.stop_areas {
            check(&stops, "fare link", *stop, "stop", *stop)?;
            if !self.areas.contains_key(area) {
                return Err(Error::Reference {
                    table: "fare link",
                    id: *stop,
                    target: "area",
                    target_id: *area,
                });
            }
        }
        for stop in self.fare_links.stop_zones.keys() {
            check(&stops, "fare link", *stop, "stop", *stop)?;
        }
        for (route, network) in &self.fare_links.route_networks {
            check(&routes, "fare link", *route, "route", *route)?;
            if !self.networks.contains_key(network) {
                return Err(Error::Reference {
                    table: "fare link",
                    id: *route,
                    target: "network",
                    target_id: *network,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_route_types() {
        assert_eq!(RouteType::from_gtfs(3), Some(RouteType::Bus));
        assert_eq!(RouteType::from_gtfs(700), Some(RouteType::Bus));
        assert_eq!(RouteType::from_gtfs(900), Some(RouteType::Tram));
        assert_eq!(RouteType::from_gtfs(109), Some(RouteType::Rail));
        assert_eq!(RouteType::from_gtfs(401), Some(RouteType::Subway));
        assert_eq!(RouteType::from_gtfs(11), Some(RouteType::Trolleybus));
        assert_eq!(RouteType::from_gtfs(42), None);
    }

    #[test]
    fn schedule_normalizes_times() {
        let schedule = Schedule::new(&[
            (None, Some(100)),
            (Some(110), Some(112)),
            (Some(120), None),
            (Some(130), Some(130)),
            (None, None),
        ]);
        assert_eq!(
            schedule.departures,
            vec![Some(100), Some(112), Some(120), Some(130), None]
        );
        assert_eq!(schedule.arrivals, vec![None, Some(110), None, None, None]);
        assert_eq!(schedule.arrival(1), Some(110));
        assert_eq!(schedule.arrival(2), Some(120));
    }

    #[test]
    fn validate_checks_zone_stops() {
        let mut feed = Feed::default();
        feed.stops.push(Stop {
            id: 1,
            ..Default::default()
        });
        feed.fare_links.stop_zones.insert(1, 1);
        assert!(feed.validate().is_ok());
        feed.fare_links.stop_zones.insert(4, 1);
        assert!(matches!(
            feed.validate(),
            Err(Error::Reference { target: "stop", target_id: 4, .. })
        ));
    }

    #[test]
    fn validate_reports_missing_stop() {
        let mut feed = Feed::default();
        feed.stops.push(Stop {
            id: 1,
            parent: 7,
            ..Default::default()
        });
        match feed.validate() {
            Err(Error::Reference {
                target, target_id, ..
            }) => {
                assert_eq!(target, "stop");
                assert_eq!(target_id, 7);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
