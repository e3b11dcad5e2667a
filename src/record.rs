//! Partial records used by deltas.
//!
//! A patch sets some fields of a record and leaves the rest [`Field::Unset`], which means
//! "keep the previous value". Enum-valued fields whose default is a meaningful value
//! (accessibility, location and route types, colours, continuous pickup policy) are not
//! optional in patches and are restated on every change.
use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::ids::IdTable;
use crate::model::{
    Accessibility, Agency, ExternalId, Itinerary, LocationType, PickupDropoff, Point, Route,
    RouteType, Service, Shape, Stop, Trip, TripTimes,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    #[default]
    Unset,
    Set(T),
}

/// Unset fields serialize as null so views can drop them.
impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Field::Set(value) => value.serialize(serializer),
            Field::Unset => serializer.serialize_none(),
        }
    }
}

impl<T: Clone + PartialEq> Field<T> {
    /// `Set(new)` when the value changed, `Unset` otherwise.
    pub fn diff(old: &T, new: &T) -> Self {
        if old == new {
            Field::Unset
        } else {
            Field::Set(new.clone())
        }
    }

    pub fn apply_to(&self, target: &mut T) {
        if let Field::Set(value) = self {
            *target = value.clone();
        }
    }

    /// The later patch wins where it sets the field.
    pub fn or(self, earlier: Field<T>) -> Field<T> {
        match self {
            Field::Set(_) => self,
            Field::Unset => earlier,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Field::Set(_))
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Field::Set(value) => Some(value),
            Field::Unset => None,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Field::Set(value),
            None => Field::Unset,
        }
    }
}

/// An entity with a stable id that deltas can add, change or delete.
pub trait Record: Clone + PartialEq + Sized {
    type Patch: Clone + PartialEq + std::fmt::Debug + Serialize;

    const TABLE: IdTable;

    fn id(&self) -> u32;

    /// The record every field of which is at its default.
    fn blank(id: u32) -> Self;

    /// Patch that turns `self` into `newer`.
    fn diff(&self, newer: &Self) -> Self::Patch;

    fn apply(&mut self, patch: &Self::Patch);

    /// Single patch equivalent to applying `first`, then `second`.
    fn combine(first: Self::Patch, second: Self::Patch) -> Result<Self::Patch>;

    /// Patch that builds this record from a blank one.
    fn full_patch(&self) -> Self::Patch {
        Self::blank(self.id()).diff(self)
    }

    fn from_patch(id: u32, patch: &Self::Patch) -> Self {
        let mut record = Self::blank(id);
        record.apply(patch);
        record
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AgencyPatch {
    pub name: Field<String>,
    pub url: Field<String>,
    pub timezone: Field<String>,
    pub lang: Field<String>,
    pub phone: Field<String>,
    pub fare_url: Field<String>,
    pub email: Field<String>,
}

impl Record for Agency {
    type Patch = AgencyPatch;
    const TABLE: IdTable = IdTable::Agencies;

    fn id(&self) -> u32 {
        self.id
    }

    fn blank(id: u32) -> Self {
        Agency {
            id,
            ..Default::default()
        }
    }

    fn diff(&self, newer: &Self) -> AgencyPatch {
        AgencyPatch {
            name: Field::diff(&self.name, &newer.name),
            url: Field::diff(&self.url, &newer.url),
            timezone: Field::diff(&self.timezone, &newer.timezone),
            lang: Field::diff(&self.lang, &newer.lang),
            phone: Field::diff(&self.phone, &newer.phone),
            fare_url: Field::diff(&self.fare_url, &newer.fare_url),
            email: Field::diff(&self.email, &newer.email),
        }
    }

    fn apply(&mut self, patch: &AgencyPatch) {
        patch.name.apply_to(&mut self.name);
        patch.url.apply_to(&mut self.url);
        patch.timezone.apply_to(&mut self.timezone);
        patch.lang.apply_to(&mut self.lang);
        patch.phone.apply_to(&mut self.phone);
        patch.fare_url.apply_to(&mut self.fare_url);
        patch.email.apply_to(&mut self.email);
    }

    fn combine(first: AgencyPatch, second: AgencyPatch) -> Result<AgencyPatch> {
        Ok(AgencyPatch {
            name: second.name.or(first.name),
            url: second.url.or(first.url),
            timezone: second.timezone.or(first.timezone),
            lang: second.lang.or(first.lang),
            phone: second.phone.or(first.phone),
            fare_url: second.fare_url.or(first.fare_url),
            email: second.email.or(first.email),
        })
    }
}

/// Services are always restated in full.
impl Record for Service {
    type Patch = Service;
    const TABLE: IdTable = IdTable::Services;

    fn id(&self) -> u32 {
        self.id
    }

    fn blank(id: u32) -> Self {
        Service {
            id,
            ..Default::default()
        }
    }

    fn diff(&self, newer: &Self) -> Service {
        newer.clone()
    }

    fn apply(&mut self, patch: &Service) {
        *self = Service {
            id: self.id,
            ..patch.clone()
        };
    }

    fn combine(_first: Service, second: Service) -> Result<Service> {
        Ok(second)
    }

    fn full_patch(&self) -> Service {
        self.clone()
    }
}

/// Shapes are replaced as a whole.
impl Record for Shape {
    type Patch = Vec<Point>;
    const TABLE: IdTable = IdTable::Shapes;

    fn id(&self) -> u32 {
        self.id
    }

    fn blank(id: u32) -> Self {
        Shape { id, points: vec![] }
    }

    fn diff(&self, newer: &Self) -> Vec<Point> {
        newer.points.clone()
    }

    fn apply(&mut self, patch: &Vec<Point>) {
        self.points = patch.clone();
    }

    fn combine(_first: Vec<Point>, second: Vec<Point>) -> Result<Vec<Point>> {
        Ok(second)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StopPatch {
    pub code: Field<String>,
    pub name: Field<String>,
    pub desc: Field<String>,
    pub position: Field<Option<Point>>,
    pub location: LocationType,
    pub parent: Field<u32>,
    pub wheelchair: Accessibility,
    pub platform_code: Field<String>,
    pub external: Field<ExternalId>,
}

impl Record for Stop {
    type Patch = StopPatch;
    const TABLE: IdTable = IdTable::Stops;

    fn id(&self) -> u32 {
        self.id
    }

    fn blank(id: u32) -> Self {
        Stop {
            id,
            ..Default::default()
        }
    }

    fn diff(&self, newer: &Self) -> StopPatch {
        StopPatch {
            code: Field::diff(&self.code, &newer.code),
            name: Field::diff(&self.name, &newer.name),
            desc: Field::diff(&self.desc, &newer.desc),
            position: Field::diff(&self.position, &newer.position),
            location: newer.location,
            parent: Field::diff(&self.parent, &newer.parent),
            wheelchair: newer.wheelchair,
            platform_code: Field::diff(&self.platform_code, &newer.platform_code),
            external: Field::diff(&self.external, &newer.external),
        }
    }

    fn apply(&mut self, patch: &StopPatch) {
        patch.code.apply_to(&mut self.code);
        patch.name.apply_to(&mut self.name);
        patch.desc.apply_to(&mut self.desc);
        patch.position.apply_to(&mut self.position);
        self.location = patch.location;
        patch.parent.apply_to(&mut self.parent);
        self.wheelchair = patch.wheelchair;
        patch.platform_code.apply_to(&mut self.platform_code);
        patch.external.apply_to(&mut self.external);
    }

    fn combine(first: StopPatch, second: StopPatch) -> Result<StopPatch> {
        Ok(StopPatch {
            code: second.code.or(first.code),
            name: second.name.or(first.name),
            desc: second.desc.or(first.desc),
            position: second.position.or(first.position),
            location: second.location,
            parent: second.parent.or(first.parent),
            wheelchair: second.wheelchair,
            platform_code: second.platform_code.or(first.platform_code),
            external: second.external.or(first.external),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RoutePatch {
    pub agency: Field<u32>,
    pub short_name: Field<String>,
    pub long_name: Field<Vec<String>>,
    pub desc: Field<String>,
    pub route_type: RouteType,
    pub color: Option<u32>,
    pub text_color: Option<u32>,
    pub continuous_pickup: PickupDropoff,
    pub continuous_dropoff: PickupDropoff,
    /// Itineraries replaced in full, `None` deletes one.
    pub itineraries: BTreeMap<u32, Option<Itinerary>>,
}

impl Record for Route {
    type Patch = RoutePatch;
    const TABLE: IdTable = IdTable::Routes;

    fn id(&self) -> u32 {
        self.id
    }

    fn blank(id: u32) -> Self {
        Route {
            id,
            ..Default::default()
        }
    }

    fn diff(&self, newer: &Self) -> RoutePatch {
        let mut itineraries = BTreeMap::new();
        for itinerary in &newer.itineraries {
            if !self.itineraries.contains(itinerary) {
                itineraries.insert(itinerary.id, Some(itinerary.clone()));
            }
        }
        for itinerary in &self.itineraries {
            if !newer.itineraries.iter().any(|i| i.id == itinerary.id) {
                itineraries.insert(itinerary.id, None);
            }
        }
        RoutePatch {
            agency: Field::diff(&self.agency, &newer.agency),
            short_name: Field::diff(&self.short_name, &newer.short_name),
            long_name: Field::diff(&self.long_name, &newer.long_name),
            desc: Field::diff(&self.desc, &newer.desc),
            route_type: newer.route_type,
            color: newer.color,
            text_color: newer.text_color,
            continuous_pickup: newer.continuous_pickup,
            continuous_dropoff: newer.continuous_dropoff,
            itineraries,
        }
    }

    fn apply(&mut self, patch: &RoutePatch) {
        patch.agency.apply_to(&mut self.agency);
        patch.short_name.apply_to(&mut self.short_name);
        patch.long_name.apply_to(&mut self.long_name);
        patch.desc.apply_to(&mut self.desc);
        self.route_type = patch.route_type;
        self.color = patch.color;
        self.text_color = patch.text_color;
        self.continuous_pickup = patch.continuous_pickup;
        self.continuous_dropoff = patch.continuous_dropoff;
        for (id, itinerary) in &patch.itineraries {
            self.itineraries.retain(|i| i.id != *id);
            if let Some(itinerary) = itinerary {
                self.itineraries.push(itinerary.clone());
            }
        }
        self.itineraries.sort_by_key(|i| i.id);
    }

    fn combine(first: RoutePatch, second: RoutePatch) -> Result<RoutePatch> {
        let mut itineraries = first.itineraries;
        itineraries.extend(second.itineraries);
        Ok(RoutePatch {
            agency: second.agency.or(first.agency),
            short_name: second.short_name.or(first.short_name),
            long_name: second.long_name.or(first.long_name),
            desc: second.desc.or(first.desc),
            route_type: second.route_type,
            color: second.color,
            text_color: second.text_color,
            continuous_pickup: second.continuous_pickup,
            continuous_dropoff: second.continuous_dropoff,
            itineraries,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TripPatch {
    pub service: Field<u32>,
    pub itinerary: Field<u32>,
    pub short_name: Field<String>,
    pub wheelchair: Accessibility,
    pub bikes: Accessibility,
    pub approximate: bool,
    pub times: Field<TripTimes>,
    pub pickup_types: Field<Vec<PickupDropoff>>,
    pub dropoff_types: Field<Vec<PickupDropoff>>,
}

impl Record for Trip {
    type Patch = TripPatch;
    const TABLE: IdTable = IdTable::Trips;

    fn id(&self) -> u32 {
        self.id
    }

    fn blank(id: u32) -> Self {
        Trip {
            id,
            ..Default::default()
        }
    }

    fn diff(&self, newer: &Self) -> TripPatch {
        TripPatch {
            service: Field::diff(&self.service, &newer.service),
            itinerary: Field::diff(&self.itinerary, &newer.itinerary),
            short_name: Field::diff(&self.short_name, &newer.short_name),
            wheelchair: newer.wheelchair,
            bikes: newer.bikes,
            approximate: newer.approximate,
            times: Field::diff(&self.times, &newer.times),
            pickup_types: Field::diff(&self.pickup_types, &newer.pickup_types),
            dropoff_types: Field::diff(&self.dropoff_types, &newer.dropoff_types),
        }
    }

    fn apply(&mut self, patch: &TripPatch) {
        patch.service.apply_to(&mut self.service);
        patch.itinerary.apply_to(&mut self.itinerary);
        patch.short_name.apply_to(&mut self.short_name);
        self.wheelchair = patch.wheelchair;
        self.bikes = patch.bikes;
        self.approximate = patch.approximate;
        patch.times.apply_to(&mut self.times);
        patch.pickup_types.apply_to(&mut self.pickup_types);
        patch.dropoff_types.apply_to(&mut self.dropoff_types);
    }

    fn combine(first: TripPatch, second: TripPatch) -> Result<TripPatch> {
        Ok(TripPatch {
            service: second.service.or(first.service),
            itinerary: second.itinerary.or(first.itinerary),
            short_name: second.short_name.or(first.short_name),
            wheelchair: second.wheelchair,
            bikes: second.bikes,
            approximate: second.approximate,
            times: second.times.or(first.times),
            pickup_types: second.pickup_types.or(first.pickup_types),
            dropoff_types: second.dropoff_types.or(first.dropoff_types),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Schedule;

    fn stop() -> Stop {
        Stop {
            id: 4,
            code: "A1".to_string(),
            name: "Main Square".to_string(),
            position: Some(Point::from_degrees(14.0, 50.0)),
            wheelchair: Accessibility::Available,
            ..Default::default()
        }
    }

    #[test]
    fn unchanged_fields_stay_unset() {
        let old = stop();
        let mut new = old.clone();
        new.name = "Old Town Square".to_string();
        let patch = old.diff(&new);
        assert_eq!(patch.name, Field::Set("Old Town Square".to_string()));
        assert_eq!(patch.code, Field::Unset);
        assert_eq!(patch.position, Field::Unset);
        // Restated even though it did not change.
        assert_eq!(patch.wheelchair, Accessibility::Available);

        let mut applied = old.clone();
        applied.apply(&patch);
        assert_eq!(applied, new);
    }

    #[test]
    fn resetting_an_enum_to_its_default_survives_a_patch() {
        let old = stop();
        let mut new = old.clone();
        new.wheelchair = Accessibility::Unknown;
        let mut applied = old.clone();
        applied.apply(&old.diff(&new));
        assert_eq!(applied.wheelchair, Accessibility::Unknown);
    }

    #[test]
    fn removing_a_position_is_explicit() {
        let old = stop();
        let mut new = old.clone();
        new.position = None;
        let patch = old.diff(&new);
        assert_eq!(patch.position, Field::Set(None));
    }

    #[test]
    fn full_patch_builds_the_record() {
        let stop = stop();
        assert_eq!(Stop::from_patch(stop.id, &stop.full_patch()), stop);
    }

    #[test]
    fn later_patch_wins() {
        let a = AgencyPatch {
            name: Field::Set("A".to_string()),
            url: Field::Set("https://a".to_string()),
            ..Default::default()
        };
        let b = AgencyPatch {
            name: Field::Set("B".to_string()),
            ..Default::default()
        };
        let c = Agency::combine(a, b).unwrap();
        assert_eq!(c.name, Field::Set("B".to_string()));
        assert_eq!(c.url, Field::Set("https://a".to_string()));
    }

    #[test]
    fn route_patch_tracks_itineraries() {
        let itinerary = |id, stops: Vec<u32>| Itinerary {
            id,
            stops,
            ..Default::default()
        };
        let old = Route {
            id: 1,
            itineraries: vec![itinerary(1, vec![1, 2]), itinerary(2, vec![2, 1])],
            ..Default::default()
        };
        let new = Route {
            id: 1,
            itineraries: vec![itinerary(2, vec![2, 1]), itinerary(3, vec![1, 3])],
            ..Default::default()
        };
        let patch = old.diff(&new);
        assert_eq!(patch.itineraries.len(), 2);
        assert_eq!(patch.itineraries[&1], None);
        let mut applied = old.clone();
        applied.apply(&patch);
        assert_eq!(applied, new);
    }

    #[test]
    fn trip_times_replace_each_other() {
        let old = Trip {
            id: 9,
            times: TripTimes::Schedule(Schedule::new(&[(None, Some(5760))])),
            ..Default::default()
        };
        let new = Trip {
            id: 9,
            times: TripTimes::Frequency {
                start: 360,
                end: 1200,
                interval: 600,
            },
            ..Default::default()
        };
        let mut applied = old.clone();
        applied.apply(&old.diff(&new));
        assert_eq!(applied, new);
    }
}
