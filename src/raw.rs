//! Source rows as read from a GTFS feed, keyed by the feed's own string ids.
//!
//! Enumerated columns keep their GTFS integer codes and times are seconds after
//! midnight; the builder maps and rounds them.
use chrono::NaiveDate;

#[derive(Debug, Clone, Default)]
pub struct RawAgency {
    pub id: Option<String>,
    pub name: String,
    pub url: String,
    pub timezone: String,
    pub lang: Option<String>,
    pub phone: Option<String>,
    pub fare_url: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawCalendar {
    pub service_id: String,
    /// Monday first.
    pub weekdays: [bool; 7],
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct RawCalendarDate {
    pub service_id: String,
    pub date: NaiveDate,
    pub added: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RawShapePoint {
    pub shape_id: String,
    pub lat: f64,
    pub lon: f64,
    pub sequence: u32,
}

#[derive(Debug, Clone, Default)]
pub struct RawStop {
    pub id: String,
    pub code: Option<String>,
    pub name: Option<String>,
    pub desc: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub zone_id: Option<String>,
    pub location_type: i32,
    pub parent_station: Option<String>,
    pub wheelchair_boarding: i32,
    pub platform_code: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawRoute {
    pub id: String,
    pub agency_id: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub desc: Option<String>,
    pub route_type: i32,
    /// Hex `RRGGBB`.
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub continuous_pickup: Option<i32>,
    pub continuous_drop_off: Option<i32>,
    pub network_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawTrip {
    pub id: String,
    pub route_id: String,
    pub service_id: String,
    pub headsign: Option<String>,
    pub short_name: Option<String>,
    pub direction_id: Option<u8>,
    pub shape_id: Option<String>,
    pub wheelchair_accessible: i32,
    pub bikes_allowed: i32,
}

#[derive(Debug, Clone, Default)]
pub struct RawStopTime {
    pub trip_id: String,
    pub stop_id: String,
    pub stop_sequence: u32,
    pub arrival_time: Option<u32>,
    pub departure_time: Option<u32>,
    pub stop_headsign: Option<String>,
    pub pickup_type: i32,
    pub drop_off_type: i32,
    /// `Some(false)` marks an approximate time.
    pub timepoint: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct RawFrequency {
    pub trip_id: String,
    pub start_time: u32,
    pub end_time: u32,
    pub headway_secs: u32,
    pub exact_times: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RawTransfer {
    pub from_stop_id: Option<String>,
    pub to_stop_id: Option<String>,
    pub from_route_id: Option<String>,
    pub to_route_id: Option<String>,
    pub from_trip_id: Option<String>,
    pub to_trip_id: Option<String>,
    pub transfer_type: i32,
    pub min_transfer_time: Option<u32>,
}

/// A row of `networks.txt` or `areas.txt`.
#[derive(Debug, Clone, Default)]
pub struct RawNamed {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawStopArea {
    pub area_id: String,
    pub stop_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct RawRouteNetwork {
    pub network_id: String,
    pub route_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct RawFeed {
    pub agencies: Vec<RawAgency>,
    pub calendar: Vec<RawCalendar>,
    pub calendar_dates: Vec<RawCalendarDate>,
    pub shapes: Vec<RawShapePoint>,
    pub stops: Vec<RawStop>,
    pub routes: Vec<RawRoute>,
    pub trips: Vec<RawTrip>,
    pub stop_times: Vec<RawStopTime>,
    pub frequencies: Vec<RawFrequency>,
    pub transfers: Vec<RawTransfer>,
    pub networks: Vec<RawNamed>,
    pub areas: Vec<RawNamed>,
    pub stop_areas: Vec<RawStopArea>,
    pub route_networks: Vec<RawRouteNetwork>,
}
