//! Service calendars: dates relative to a base date, and the calendar block.
use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{Error, Result};
use crate::model::{Calendar, Service};
use crate::varint;
use crate::wire;

pub fn date_to_int(date: NaiveDate) -> u32 {
    date.year() as u32 * 10000 + date.month() * 100 + date.day()
}

pub fn int_to_date(value: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt((value / 10000) as i32, value / 100 % 100, value % 100)
        .ok_or_else(|| Error::Format(format!("{} is not a YYYYMMDD date", value)))
}

fn offset(base: NaiveDate, date: NaiveDate) -> i32 {
    (date - base).num_days() as i32
}

fn from_offset(base: NaiveDate, days: i64) -> Result<NaiveDate> {
    base.checked_add_signed(Duration::days(days))
        .ok_or_else(|| Error::Format(format!("day offset {} is out of range", days)))
}

impl Service {
    pub fn operates(&self, date: NaiveDate) -> bool {
        if self.removed.contains(&date) {
            return false;
        }
        if self.added.contains(&date) {
            return true;
        }
        if self.start.is_some_and(|start| date < start) || self.end.is_some_and(|end| date > end) {
            return false;
        }
        self.weekdays & (1 << date.weekday().num_days_from_monday()) != 0
    }

    /// The same service as seen from `base`: earlier exceptions dropped, start moved
    /// up to the base.
    pub fn since(&self, base: NaiveDate) -> Service {
        Service {
            id: self.id,
            start: self.start.map(|start| start.max(base)),
            end: self.end,
            weekdays: self.weekdays,
            added: self.added.iter().copied().filter(|d| *d >= base).collect(),
            removed: self.removed.iter().copied().filter(|d| *d >= base).collect(),
        }
    }
}

impl Calendar {
    /// Brings every service to its form at the base date, with sorted exceptions.
    pub fn normalize(&mut self) {
        let base = self.base_date;
        for service in self.services.iter_mut() {
            let mut normalized = service.since(base);
            normalized.added.sort();
            normalized.added.dedup();
            normalized.removed.sort();
            normalized.removed.dedup();
            *service = normalized;
        }
    }
}

struct DateLists {
    base: NaiveDate,
    lists: Vec<wire::CalendarDates>,
    index: HashMap<Vec<u8>, u32>,
}

impl DateLists {
    fn new(base: NaiveDate) -> Self {
        DateLists {
            base,
            lists: vec![wire::CalendarDates::default()],
            index: HashMap::from([(Vec::new(), 0)]),
        }
    }

    fn add(&mut self, dates: &[NaiveDate]) -> u32 {
        let mut offsets: Vec<i64> = dates.iter().map(|d| offset(self.base, *d) as i64).collect();
        offsets.sort();
        offsets.dedup();
        let data = varint::encode(&offsets);
        if let Some(i) = self.index.get(&data) {
            return *i;
        }
        let i = self.lists.len() as u32;
        self.index.insert(data.clone(), i);
        self.lists.push(wire::CalendarDates { dates: data });
        i
    }
}

/// Encodes services relative to `base`. `None` entries are deletions.
pub fn encode(base: NaiveDate, entries: &[(u32, Option<&Service>)]) -> wire::Calendar {
    let mut lists = DateLists::new(base);
    let mut services = Vec::with_capacity(entries.len());
    for (id, service) in entries {
        let message = match service {
            Some(s) => wire::CalendarService {
                service_id: *id,
                start_date: s.start.map(|d| offset(base, d)),
                end_date: s.end.map(|d| offset(base, d)),
                weekdays: u32::from(s.weekdays),
                added_days: lists.add(&s.added),
                removed_days: lists.add(&s.removed),
                delete: false,
            },
            None => wire::CalendarService {
                service_id: *id,
                delete: true,
                ..Default::default()
            },
        };
        services.push(message);
    }
    wire::Calendar {
        base_date: date_to_int(base),
        dates: lists.lists,
        services,
    }
}

/// Decodes the calendar block into its base date and services, `None` for deletions.
pub fn decode(message: &wire::Calendar) -> Result<(NaiveDate, Vec<(u32, Option<Service>)>)> {
    let base = int_to_date(message.base_date)?;
    let mut lists = Vec::with_capacity(message.dates.len());
    for list in &message.dates {
        let dates = varint::decode_all_from(0, &list.dates)?
            .into_iter()
            .map(|days| from_offset(base, days))
            .collect::<Result<Vec<_>>>()?;
        lists.push(dates);
    }
    let list = |i: u32| -> Result<Vec<NaiveDate>> {
        if i == 0 && lists.is_empty() {
            return Ok(vec![]);
        }
        lists
            .get(i as usize)
            .cloned()
            .ok_or_else(|| Error::Format(format!("date list {} does not exist", i)))
    };

    let mut services = Vec::with_capacity(message.services.len());
    for s in &message.services {
        if s.delete {
            services.push((s.service_id, None));
            continue;
        }
        let weekdays = u8::try_from(s.weekdays)
            .ok()
            .filter(|w| *w < 0x80)
            .ok_or_else(|| Error::Format(format!("bad weekday mask {:#x}", s.weekdays)))?;
        let service = Service {
            id: s.service_id,
            start: s.start_date.map(|d| from_offset(base, d.into())).transpose()?,
            end: s.end_date.map(|d| from_offset(base, d.into())).transpose()?,
            weekdays,
            added: list(s.added_days)?,
            removed: list(s.removed_days)?,
        };
        services.push((s.service_id, Some(service)));
    }
    Ok((base, services))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekday_service() -> Service {
        Service {
            id: 1,
            start: Some(date(2024, 5, 1)),
            end: Some(date(2024, 6, 30)),
            weekdays: 0b0011111,
            added: vec![date(2024, 5, 18)],
            removed: vec![date(2024, 5, 20), date(2024, 5, 9)],
        }
    }

    #[test]
    fn dates_as_integers() {
        assert_eq!(date_to_int(date(2024, 5, 17)), 20240517);
        assert_eq!(int_to_date(20240517).unwrap(), date(2024, 5, 17));
        assert!(int_to_date(20241301).is_err());
        assert!(int_to_date(0).is_err());
    }

    #[test]
    fn service_activity() {
        let s = weekday_service();
        assert!(s.operates(date(2024, 5, 17)));
        assert!(!s.operates(date(2024, 5, 19)));
        assert!(s.operates(date(2024, 5, 18)));
        assert!(!s.operates(date(2024, 5, 20)));
        assert!(!s.operates(date(2024, 7, 1)));
    }

    #[test]
    fn block_keeps_services() {
        let base = date(2024, 5, 10);
        let mut services = vec![weekday_service(), Service {
            id: 2,
            added: vec![date(2024, 5, 18)],
            ..Default::default()
        }];
        let entries: Vec<(u32, Option<&Service>)> =
            services.iter().map(|s| (s.id, Some(s))).chain([(3, None)]).collect();
        let message = encode(base, &entries);
        // Shared list for the single added date, plus the empty one.
        assert_eq!(message.dates.len(), 3);

        let (decoded_base, decoded) = decode(&message).unwrap();
        assert_eq!(decoded_base, base);
        services[0].removed.sort();
        assert_eq!(decoded[0].1.as_ref(), Some(&services[0]));
        assert_eq!(decoded[1].1.as_ref(), Some(&services[1]));
        assert_eq!(decoded[2], (3, None));
    }

    #[test]
    fn since_drops_past_exceptions() {
        let s = weekday_service().since(date(2024, 5, 19));
        assert_eq!(s.start, Some(date(2024, 5, 19)));
        assert!(s.added.is_empty());
        assert_eq!(s.removed, vec![date(2024, 5, 20)]);
        for day in 19..31 {
            let d = date(2024, 5, day);
            assert_eq!(s.operates(d), weekday_service().operates(d));
        }
    }

    #[test]
    fn missing_date_list_is_a_format_error() {
        let mut message = encode(date(2024, 5, 10), &[(1, Some(&weekday_service()))]);
        message.services[0].added_days = 9;
        assert!(matches!(decode(&message), Err(Error::Format(_))));
    }
}
