#![allow(dead_code)]

use chrono::NaiveDate;
use gtfs_pack::ids::{IdStore, IdTable};
use gtfs_pack::model::{
    Agency, Feed, Itinerary, Point, Route, RouteType, Schedule, Stop, Trip, TripTimes,
};
use gtfs_pack::raw::{
    RawAgency, RawCalendar, RawFeed, RawRoute, RawStop, RawStopTime, RawTrip,
};
use gtfs_pack::{build_snapshot, BuildOptions, PreviousRun, Snapshot};

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

/// One agency, one stop, one route with one itinerary and one trip leaving at 08:00.
pub fn sample_snapshot() -> Snapshot {
    let mut ids = IdStore::new();
    let agency = ids.resolve(IdTable::Agencies, "CT");
    let stop = ids.resolve(IdTable::Stops, "S1");
    let route = ids.resolve(IdTable::Routes, "R1");
    let itinerary = ids.resolve(IdTable::Itineraries, "R1:S1");
    let trip = ids.resolve(IdTable::Trips, "T1");

    let mut feed = Feed::default();
    feed.calendar.base_date = date(17);
    feed.agencies.push(Agency {
        id: agency,
        name: "City Transit".to_string(),
        url: "https://transit.example.org".to_string(),
        timezone: "Europe/Prague".to_string(),
        ..Default::default()
    });
    feed.stops.push(Stop {
        id: stop,
        name: "Main Square".to_string(),
        position: Some(Point::from_degrees(14.0, 50.0)),
        ..Default::default()
    });
    feed.routes.push(Route {
        id: route,
        agency,
        short_name: "1".to_string(),
        route_type: RouteType::Bus,
        itineraries: vec![Itinerary {
            id: itinerary,
            stops: vec![stop],
            ..Default::default()
        }],
        ..Default::default()
    });
    feed.trips.push(Trip {
        id: trip,
        itinerary,
        times: TripTimes::Schedule(Schedule::new(&[(None, Some(5760))])),
        ..Default::default()
    });
    Snapshot {
        version: 1,
        date: date(17),
        original_url: "https://transit.example.org/gtfs.zip".to_string(),
        ids,
        feed,
    }
}

/// Each stop id has its own position, independent of the other stops in the feed.
fn stop(id: &str, name: &str) -> RawStop {
    let offset = id.bytes().map(u32::from).sum::<u32>() % 100;
    RawStop {
        id: id.to_string(),
        name: Some(name.to_string()),
        lat: Some(50.08),
        lon: Some(14.40 + offset as f64 / 100.0),
        ..Default::default()
    }
}

/// A one-route feed whose single trip visits `stops` in order, a minute apart.
pub fn raw_feed(stops: &[(&str, &str)]) -> RawFeed {
    let mut feed = RawFeed {
        agencies: vec![RawAgency {
            id: Some("CT".to_string()),
            name: "City Transit".to_string(),
            url: "https://transit.example.org".to_string(),
            timezone: "Europe/Prague".to_string(),
            ..Default::default()
        }],
        calendar: vec![RawCalendar {
            service_id: "WD".to_string(),
            weekdays: [true, true, true, true, true, false, false],
            start_date: Some(date(1)),
            end_date: Some(date(31)),
        }],
        routes: vec![RawRoute {
            id: "R1".to_string(),
            short_name: Some("1".to_string()),
            route_type: 3,
            ..Default::default()
        }],
        trips: vec![RawTrip {
            id: "T1".to_string(),
            route_id: "R1".to_string(),
            service_id: "WD".to_string(),
            headsign: Some("Depot".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    for (i, (id, name)) in stops.iter().enumerate() {
        feed.stops.push(stop(id, name));
        let time = 8 * 3600 + 60 * i as u32;
        feed.stop_times.push(RawStopTime {
            trip_id: "T1".to_string(),
            stop_id: id.to_string(),
            stop_sequence: i as u32 + 1,
            arrival_time: Some(time),
            departure_time: Some(time),
            ..Default::default()
        });
    }
    feed
}

pub fn build(raw: &RawFeed, previous: Option<&Snapshot>, day: u32) -> Snapshot {
    let previous: Option<PreviousRun> = previous.map(Snapshot::previous_run);
    let options = BuildOptions {
        date: date(day),
        original_url: None,
    };
    build_snapshot(raw, previous.as_ref(), &options).unwrap()
}
