//! Protobuf layout of the file header and every block.
//!
//! Field numbers and enum integers are part of the format. Changing them breaks
//! readers of existing files and must come with a new header version.
use std::collections::BTreeMap;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GtfsHeader {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    /// Build date as `YYYYMMDD`.
    #[prost(uint32, tag = "2")]
    pub date: u32,
    #[prost(string, tag = "3")]
    pub original_url: String,
    #[prost(bool, tag = "4")]
    pub compressed: bool,
    /// Byte length of every block, in block enumeration order.
    #[prost(uint32, repeated, tag = "5")]
    pub blocks: Vec<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GtfsDeltaHeader {
    #[prost(uint32, tag = "1")]
    pub old_version: u32,
    #[prost(uint32, tag = "2")]
    pub version: u32,
    #[prost(uint32, tag = "3")]
    pub date: u32,
    #[prost(bool, tag = "4")]
    pub compressed: bool,
    #[prost(uint32, repeated, tag = "5")]
    pub blocks: Vec<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IdReference {
    #[prost(uint32, tag = "1")]
    pub block: u32,
    /// Source ids; element `i` has stable id `delta_skip + 1 + i`.
    #[prost(string, repeated, tag = "2")]
    pub ids: Vec<String>,
    #[prost(uint32, tag = "3")]
    pub delta_skip: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IdStore {
    #[prost(message, repeated, tag = "1")]
    pub refs: Vec<IdReference>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StringTable {
    #[prost(string, repeated, tag = "1")]
    pub strings: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Agency {
    #[prost(uint32, tag = "1")]
    pub agency_id: u32,
    #[prost(string, optional, tag = "2")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub url: Option<String>,
    /// String table index.
    #[prost(uint32, optional, tag = "4")]
    pub timezone: Option<u32>,
    #[prost(string, optional, tag = "5")]
    pub lang: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub phone: Option<String>,
    #[prost(string, optional, tag = "7")]
    pub fare_url: Option<String>,
    #[prost(string, optional, tag = "8")]
    pub email: Option<String>,
    #[prost(bool, tag = "9")]
    pub delete: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Agencies {
    #[prost(message, repeated, tag = "1")]
    pub agencies: Vec<Agency>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CalendarDates {
    /// Day offsets from the base date, differentially coded.
    #[prost(bytes = "vec", tag = "1")]
    pub dates: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CalendarService {
    #[prost(uint32, tag = "1")]
    pub service_id: u32,
    /// Days after the base date, negative for earlier dates.
    #[prost(sint32, optional, tag = "2")]
    pub start_date: Option<i32>,
    #[prost(sint32, optional, tag = "3")]
    pub end_date: Option<i32>,
    #[prost(uint32, tag = "4")]
    pub weekdays: u32,
    /// Index into `Calendar::dates`; 0 is the empty list.
    #[prost(uint32, tag = "5")]
    pub added_days: u32,
    #[prost(uint32, tag = "6")]
    pub removed_days: u32,
    #[prost(bool, tag = "7")]
    pub delete: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Calendar {
    #[prost(uint32, tag = "1")]
    pub base_date: u32,
    #[prost(message, repeated, tag = "2")]
    pub dates: Vec<CalendarDates>,
    #[prost(message, repeated, tag = "3")]
    pub services: Vec<CalendarService>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Shape {
    #[prost(uint32, tag = "1")]
    pub shape_id: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub longitudes: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub latitudes: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Shapes {
    #[prost(message, repeated, tag = "1")]
    pub shapes: Vec<Shape>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Stop {
    #[prost(uint32, tag = "1")]
    pub stop_id: u32,
    #[prost(string, optional, tag = "2")]
    pub code: Option<String>,
    /// String table index.
    #[prost(uint32, optional, tag = "3")]
    pub name: Option<u32>,
    #[prost(string, optional, tag = "4")]
    pub desc: Option<String>,
    /// Difference to the previous stop with a position in this block.
    #[prost(sint32, optional, tag = "5")]
    pub lat: Option<i32>,
    #[prost(sint32, optional, tag = "6")]
    pub lon: Option<i32>,
    #[prost(bool, tag = "7")]
    pub clear_position: bool,
    #[prost(int32, tag = "8")]
    pub location_type: i32,
    #[prost(uint32, optional, tag = "9")]
    pub parent_id: Option<u32>,
    #[prost(int32, tag = "10")]
    pub wheelchair: i32,
    #[prost(string, optional, tag = "11")]
    pub platform_code: Option<String>,
    #[prost(string, optional, tag = "12")]
    pub external_str_id: Option<String>,
    #[prost(uint64, optional, tag = "13")]
    pub external_int_id: Option<u64>,
    #[prost(bool, tag = "14")]
    pub delete: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Stops {
    #[prost(message, repeated, tag = "1")]
    pub stops: Vec<Stop>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StringRefs {
    #[prost(uint32, repeated, tag = "1")]
    pub refs: Vec<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Itinerary {
    #[prost(uint32, tag = "1")]
    pub itinerary_id: u32,
    /// Stable stop ids, differentially coded.
    #[prost(bytes = "vec", tag = "2")]
    pub stops: Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub headsign: u32,
    #[prost(uint32, repeated, tag = "4")]
    pub stop_headsigns: Vec<u32>,
    #[prost(uint32, tag = "5")]
    pub shape_id: u32,
    #[prost(bool, tag = "6")]
    pub opposite_direction: bool,
    #[prost(bool, tag = "7")]
    pub delete: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Route {
    #[prost(uint32, tag = "1")]
    pub route_id: u32,
    #[prost(uint32, optional, tag = "2")]
    pub agency_id: Option<u32>,
    #[prost(string, optional, tag = "3")]
    pub short_name: Option<String>,
    #[prost(message, optional, tag = "4")]
    pub long_name: Option<StringRefs>,
    #[prost(string, optional, tag = "5")]
    pub desc: Option<String>,
    #[prost(int32, tag = "6")]
    pub route_type: i32,
    #[prost(uint32, optional, tag = "7")]
    pub color: Option<u32>,
    #[prost(uint32, optional, tag = "8")]
    pub text_color: Option<u32>,
    #[prost(int32, tag = "9")]
    pub continuous_pickup: i32,
    #[prost(int32, tag = "10")]
    pub continuous_dropoff: i32,
    #[prost(message, repeated, tag = "11")]
    pub itineraries: Vec<Itinerary>,
    #[prost(bool, tag = "12")]
    pub delete: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Routes {
    #[prost(message, repeated, tag = "1")]
    pub routes: Vec<Route>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Trip {
    #[prost(uint32, tag = "1")]
    pub trip_id: u32,
    #[prost(uint32, optional, tag = "2")]
    pub service_id: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub itinerary_id: Option<u32>,
    #[prost(string, optional, tag = "4")]
    pub short_name: Option<String>,
    #[prost(int32, tag = "5")]
    pub wheelchair: i32,
    #[prost(int32, tag = "6")]
    pub bikes: i32,
    #[prost(bool, tag = "7")]
    pub approximate: bool,
    /// Sparse sequence of departures in 5-second units.
    #[prost(bytes = "vec", optional, tag = "8")]
    pub departures: Option<Vec<u8>>,
    /// Dwell before each departure in 5-second units, trailing zeros trimmed.
    #[prost(bytes = "vec", optional, tag = "9")]
    pub arrivals: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "10")]
    pub pickup_types: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "11")]
    pub dropoff_types: Option<Vec<u8>>,
    /// Minutes after midnight.
    #[prost(uint32, optional, tag = "12")]
    pub start_time: Option<u32>,
    #[prost(uint32, optional, tag = "13")]
    pub end_time: Option<u32>,
    /// Seconds.
    #[prost(uint32, optional, tag = "14")]
    pub interval: Option<u32>,
    #[prost(bool, tag = "15")]
    pub delete: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Trips {
    #[prost(message, repeated, tag = "1")]
    pub trips: Vec<Trip>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Transfer {
    #[prost(uint32, tag = "1")]
    pub from_stop: u32,
    #[prost(uint32, tag = "2")]
    pub to_stop: u32,
    #[prost(uint32, tag = "3")]
    pub from_route: u32,
    #[prost(uint32, tag = "4")]
    pub to_route: u32,
    #[prost(uint32, tag = "5")]
    pub from_trip: u32,
    #[prost(uint32, tag = "6")]
    pub to_trip: u32,
    #[prost(int32, tag = "7")]
    pub transfer_type: i32,
    #[prost(uint32, optional, tag = "8")]
    pub min_transfer_time: Option<u32>,
    #[prost(bool, tag = "9")]
    pub delete: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Transfers {
    #[prost(message, repeated, tag = "1")]
    pub transfers: Vec<Transfer>,
}

/// Networks and areas. In deltas an empty name removes the entry.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Names {
    #[prost(btree_map = "uint32, string", tag = "1")]
    pub names: BTreeMap<u32, String>,
}

/// Snapshot fare links: element `i` belongs to stop or route `i + 1`, 0 when unlinked.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FareLinks {
    #[prost(uint32, repeated, tag = "1")]
    pub stop_area_ids: Vec<u32>,
    #[prost(uint32, repeated, tag = "2")]
    pub stop_zone_ids: Vec<u32>,
    #[prost(uint32, repeated, tag = "3")]
    pub route_network_ids: Vec<u32>,
}

/// Delta fare links: a target of 0 removes the link.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FareLinksDelta {
    #[prost(btree_map = "uint32, uint32", tag = "1")]
    pub stop_areas: BTreeMap<u32, u32>,
    #[prost(btree_map = "uint32, uint32", tag = "2")]
    pub stop_zones: BTreeMap<u32, u32>,
    #[prost(btree_map = "uint32, uint32", tag = "3")]
    pub route_networks: BTreeMap<u32, u32>,
}
