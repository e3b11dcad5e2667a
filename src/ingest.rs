//! Reads a GTFS directory or ZIP archive into raw rows.
//!
//! The core tables are loaded with `gtfs_structures` and read back through their GTFS
//! column layout, which keeps the integer codes of enumerated columns. Fares v2 side
//! tables are not covered by `gtfs_structures` and are read with `csv` directly.
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use gtfs_pack::raw::*;
use indicatif::ProgressIterator;
use serde::Serialize;
use serde_json::Value;

/// One row, keyed by GTFS column name.
struct Row(HashMap<String, Value>);

impl Row {
    fn of<T: Serialize>(object: &T) -> Result<Row> {
        match serde_json::to_value(object)? {
            Value::Object(fields) => Ok(Row(fields.into_iter().collect())),
            other => anyhow::bail!("expected a GTFS row, got {}", other),
        }
    }

    fn text(&self, column: &str) -> Option<String> {
        match self.0.get(column)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn string(&self, column: &str) -> String {
        self.text(column).unwrap_or_default()
    }

    fn int(&self, column: &str) -> Option<i64> {
        match self.0.get(column)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    fn code(&self, column: &str) -> i32 {
        self.int(column).unwrap_or(0) as i32
    }

    fn float(&self, column: &str) -> Option<f64> {
        match self.0.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Seconds after midnight from `HH:MM:SS` or a plain number.
    fn time(&self, column: &str) -> Option<u32> {
        match self.0.get(column)? {
            Value::Number(n) => n.as_u64().map(|n| n as u32),
            Value::String(s) => {
                let mut parts = s.trim().split(':').map(|p| p.parse::<u32>().ok());
                let (h, m, s) = (parts.next()??, parts.next()??, parts.next()??);
                Some(h * 3600 + m * 60 + s)
            }
            _ => None,
        }
    }

    fn date(&self, column: &str) -> Option<NaiveDate> {
        let text = self.text(column)?;
        NaiveDate::parse_from_str(&text, "%Y%m%d")
            .or_else(|_| NaiveDate::parse_from_str(&text, "%Y-%m-%d"))
            .ok()
    }
}

fn rows<T: Serialize>(objects: &[T]) -> Result<Vec<Row>> {
    objects.iter().map(Row::of).collect()
}

fn optional<T>(table: Option<Result<Vec<T>, gtfs_structures::Error>>) -> Result<Vec<T>> {
    Ok(table.transpose()?.unwrap_or_default())
}

/// Reads an optional side table next to the core files.
fn side_table(path: &Path, name: &str) -> Result<Vec<Row>> {
    let mut data = vec![];
    if path.is_dir() {
        let file = path.join(name);
        if !file.exists() {
            return Ok(vec![]);
        }
        File::open(&file)?.read_to_end(&mut data)?;
    } else {
        let mut archive = zip::ZipArchive::new(File::open(path)?)?;
        let Ok(mut file) = archive.by_name(name) else {
            return Ok(vec![]);
        };
        file.read_to_end(&mut data)?;
    }
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data.as_slice());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let mut out = vec![];
    for record in reader.records() {
        let record = record.with_context(|| format!("Cannot read {}", name))?;
        let fields = headers
            .iter()
            .cloned()
            .zip(record.iter().map(|v| Value::String(v.trim().to_string())))
            .collect();
        out.push(Row(fields));
    }
    log::debug!("Read {} rows from {}", out.len(), name);
    Ok(out)
}

fn named(rows: Vec<Row>, id: &str, name: &str) -> Vec<RawNamed> {
    rows.into_iter()
        .filter_map(|r| {
            Some(RawNamed {
                id: r.text(id)?,
                name: r.text(name),
            })
        })
        .collect()
}

pub fn read_feed(path: &Path) -> Result<RawFeed> {
    log::info!("Loading original GTFS data from {:?}", path);
    let gtfs = gtfs_structures::RawGtfs::from_path(path)
        .with_context(|| format!("Cannot read GTFS feed {:?}", path))?;
    let mut feed = RawFeed::default();

    log::info!("Preparing agencies...");
    for r in rows(&gtfs.agencies?)? {
        feed.agencies.push(RawAgency {
            id: r.text("agency_id"),
            name: r.string("agency_name"),
            url: r.string("agency_url"),
            timezone: r.string("agency_timezone"),
            lang: r.text("agency_lang"),
            phone: r.text("agency_phone"),
            fare_url: r.text("agency_fare_url"),
            email: r.text("agency_email"),
        });
    }

    log::info!("Preparing calendars...");
    const DAYS: [&str; 7] = [
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
    ];
    for r in rows(&optional(gtfs.calendar)?)? {
        feed.calendar.push(RawCalendar {
            service_id: r.string("service_id"),
            weekdays: DAYS.map(|day| r.int(day) == Some(1)),
            start_date: r.date("start_date"),
            end_date: r.date("end_date"),
        });
    }
    for r in rows(&optional(gtfs.calendar_dates)?)? {
        let Some(date) = r.date("date") else {
            log::warn!("Skipping calendar date without a date");
            continue;
        };
        feed.calendar_dates.push(RawCalendarDate {
            service_id: r.string("service_id"),
            date,
            added: r.int("exception_type") == Some(1),
        });
    }

    log::info!("Preparing shapes...");
    for r in rows(&optional(gtfs.shapes)?)? {
        feed.shapes.push(RawShapePoint {
            shape_id: r.string("shape_id"),
            lat: r.float("shape_pt_lat").unwrap_or_default(),
            lon: r.float("shape_pt_lon").unwrap_or_default(),
            sequence: r.int("shape_pt_sequence").unwrap_or_default() as u32,
        });
    }

    log::info!("Preparing stops...");
    for r in rows(&gtfs.stops?)? {
        feed.stops.push(RawStop {
            id: r.string("stop_id"),
            code: r.text("stop_code"),
            name: r.text("stop_name"),
            desc: r.text("stop_desc"),
            lat: r.float("stop_lat"),
            lon: r.float("stop_lon"),
            zone_id: r.text("zone_id"),
            location_type: r.code("location_type"),
            parent_station: r.text("parent_station"),
            wheelchair_boarding: r.code("wheelchair_boarding"),
            platform_code: r.text("platform_code"),
        });
    }

    log::info!("Preparing routes...");
    for route in gtfs.routes? {
        let route_type = match route.route_type {
            gtfs_structures::RouteType::Tramway => 0,
            gtfs_structures::RouteType::Subway => 1,
            gtfs_structures::RouteType::Rail => 2,
            gtfs_structures::RouteType::Bus => 3,
            gtfs_structures::RouteType::Ferry => 4,
            gtfs_structures::RouteType::CableCar => 5,
            gtfs_structures::RouteType::Gondola => 6,
            gtfs_structures::RouteType::Funicular => 7,
            gtfs_structures::RouteType::Coach => 200,
            gtfs_structures::RouteType::Air => 1100,
            gtfs_structures::RouteType::Taxi => 1500,
            gtfs_structures::RouteType::Other(other) => i32::from(other),
        };
        let r = Row::of(&route)?;
        feed.routes.push(RawRoute {
            id: route.id.clone(),
            agency_id: route.agency_id.clone(),
            short_name: route.short_name.clone(),
            long_name: route.long_name.clone(),
            desc: r.text("route_desc"),
            route_type,
            color: r.text("route_color"),
            text_color: r.text("route_text_color"),
            continuous_pickup: r.int("continuous_pickup").map(|c| c as i32),
            continuous_drop_off: r.int("continuous_drop_off").map(|c| c as i32),
            network_id: r.text("network_id"),
        });
    }

    log::info!("Preparing trips...");
    for r in rows(&gtfs.trips?)? {
        feed.trips.push(RawTrip {
            id: r.string("trip_id"),
            route_id: r.string("route_id"),
            service_id: r.string("service_id"),
            headsign: r.text("trip_headsign"),
            short_name: r.text("trip_short_name"),
            direction_id: r.int("direction_id").map(|d| d as u8),
            shape_id: r.text("shape_id"),
            wheelchair_accessible: r.code("wheelchair_accessible"),
            bikes_allowed: r.code("bikes_allowed"),
        });
    }

    let stop_times = gtfs.stop_times?;
    let style = indicatif::ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {human_pos:>7}/{human_len:7} {msg}",
    )?;
    for stop_time in stop_times
        .iter()
        .progress_with_style(style)
        .with_message("Preparing stop times")
        .with_finish(indicatif::ProgressFinish::AndLeave)
    {
        let r = Row::of(stop_time)?;
        feed.stop_times.push(RawStopTime {
            trip_id: stop_time.trip_id.clone(),
            stop_id: r.string("stop_id"),
            stop_sequence: r.int("stop_sequence").unwrap_or_default() as u32,
            arrival_time: stop_time.arrival_time,
            departure_time: stop_time.departure_time,
            stop_headsign: r.text("stop_headsign"),
            pickup_type: r.code("pickup_type"),
            drop_off_type: r.code("drop_off_type"),
            timepoint: r.int("timepoint").map(|t| t != 0),
        });
    }

    for r in rows(&optional(gtfs.frequencies)?)? {
        feed.frequencies.push(RawFrequency {
            trip_id: r.string("trip_id"),
            start_time: r.time("start_time").unwrap_or_default(),
            end_time: r.time("end_time").unwrap_or_default(),
            headway_secs: r.int("headway_secs").unwrap_or_default() as u32,
            exact_times: r.int("exact_times") == Some(1),
        });
    }

    log::info!("Preparing transfers...");
    for r in rows(&optional(gtfs.transfers)?)? {
        feed.transfers.push(RawTransfer {
            from_stop_id: r.text("from_stop_id"),
            to_stop_id: r.text("to_stop_id"),
            from_route_id: r.text("from_route_id"),
            to_route_id: r.text("to_route_id"),
            from_trip_id: r.text("from_trip_id"),
            to_trip_id: r.text("to_trip_id"),
            transfer_type: r.code("transfer_type"),
            min_transfer_time: r.int("min_transfer_time").map(|t| t as u32),
        });
    }

    log::info!("Preparing fare networks and areas...");
    feed.networks = named(side_table(path, "networks.txt")?, "network_id", "network_name");
    feed.areas = named(side_table(path, "areas.txt")?, "area_id", "area_name");
    feed.stop_areas = side_table(path, "stop_areas.txt")?
        .into_iter()
        .filter_map(|r| {
            Some(RawStopArea {
                area_id: r.text("area_id")?,
                stop_id: r.text("stop_id")?,
            })
        })
        .collect();
    feed.route_networks = side_table(path, "route_networks.txt")?
        .into_iter()
        .filter_map(|r| {
            Some(RawRouteNetwork {
                network_id: r.text("network_id")?,
                route_id: r.text("route_id")?,
            })
        })
        .collect();
    Ok(feed)
}
