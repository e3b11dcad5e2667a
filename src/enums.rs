//! Integer codes of domain enums on the wire.
//!
//! Each table lists the variants in wire order; the position is the code. Route types are
//! ordered by frequency so the most common one, the bus, is 0 and costs nothing.
use crate::error::{Error, Result};
use crate::model::{Accessibility, LocationType, PickupDropoff, RouteType, TransferType};

pub trait WireEnum: Sized + Copy + PartialEq + 'static {
    const NAME: &'static str;
    const CODES: &'static [Self];

    fn to_wire(self) -> i32 {
        Self::CODES
            .iter()
            .position(|v| *v == self)
            .map_or(0, |i| i as i32)
    }

    fn from_wire(code: i32) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::CODES.get(i).copied())
            .ok_or_else(|| Error::Format(format!("unknown {} code {}", Self::NAME, code)))
    }
}

impl WireEnum for RouteType {
    const NAME: &'static str = "route type";
    const CODES: &'static [Self] = &[
        RouteType::Bus,
        RouteType::Tram,
        RouteType::Subway,
        RouteType::Rail,
        RouteType::Ferry,
        RouteType::CableTram,
        RouteType::Aerial,
        RouteType::Funicular,
        RouteType::CommunalTaxi,
        RouteType::Coach,
        RouteType::Trolleybus,
        RouteType::Monorail,
        RouteType::UrbanRail,
        RouteType::Water,
        RouteType::Air,
        RouteType::Taxi,
        RouteType::Misc,
    ];
}

impl WireEnum for LocationType {
    const NAME: &'static str = "location type";
    const CODES: &'static [Self] = &[
        LocationType::Stop,
        LocationType::Station,
        LocationType::Entrance,
        LocationType::Node,
        LocationType::BoardingArea,
    ];
}

impl WireEnum for Accessibility {
    const NAME: &'static str = "accessibility";
    const CODES: &'static [Self] = &[
        Accessibility::Unknown,
        Accessibility::Available,
        Accessibility::Unavailable,
    ];
}

impl WireEnum for PickupDropoff {
    const NAME: &'static str = "pickup or drop-off type";
    const CODES: &'static [Self] = &[
        PickupDropoff::Regular,
        PickupDropoff::NotAvailable,
        PickupDropoff::PhoneAgency,
        PickupDropoff::TellDriver,
    ];
}

impl WireEnum for TransferType {
    const NAME: &'static str = "transfer type";
    const CODES: &'static [Self] = &[
        TransferType::Possible,
        TransferType::DepartureWaits,
        TransferType::NeedsTime,
        TransferType::NotPossible,
        TransferType::InSeat,
        TransferType::InSeatForbidden,
    ];
}

/// Pickup and drop-off codes packed one per byte.
pub fn pack_pickups(values: &[PickupDropoff]) -> Vec<u8> {
    values.iter().map(|v| v.to_wire() as u8).collect()
}

pub fn unpack_pickups(data: &[u8]) -> Result<Vec<PickupDropoff>> {
    data.iter()
        .map(|b| PickupDropoff::from_wire(i32::from(*b)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_is_the_zero_code() {
        assert_eq!(RouteType::Bus.to_wire(), 0);
        assert_eq!(RouteType::Tram.to_wire(), 1);
        assert_eq!(RouteType::from_wire(16).unwrap(), RouteType::Misc);
    }

    #[test]
    fn every_code_maps_back() {
        for (i, v) in TransferType::CODES.iter().enumerate() {
            assert_eq!(v.to_wire(), i as i32);
            assert_eq!(TransferType::from_wire(i as i32).unwrap(), *v);
        }
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert!(matches!(LocationType::from_wire(5), Err(Error::Format(_))));
        assert!(matches!(Accessibility::from_wire(-1), Err(Error::Format(_))));
        assert!(unpack_pickups(&[0, 3, 4]).is_err());
    }
}
