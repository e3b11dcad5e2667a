//! Packing of GTFS feeds into compact block files, and the deltas between them.
//!
//! A [`Snapshot`] holds one version of a feed with every source id mapped to a small
//! stable integer. Consecutive snapshots of one lineage share those ids, so the
//! [`Delta`] between them only lists what changed. Deltas of adjacent versions can be
//! merged into one.
pub mod builder;
pub mod calendar;
pub mod codec;
pub mod container;
pub mod delta;
pub mod enums;
pub mod error;
pub mod ids;
pub mod inspect;
pub mod merge;
pub mod model;
pub mod raw;
pub mod record;
pub mod snapshot;
pub mod strings;
pub mod varint;
pub mod wire;

pub use builder::{build_snapshot, BuildOptions};
pub use container::Block;
pub use delta::{apply_delta, build_delta, Delta};
pub use error::{Error, Result};
pub use inspect::{inspect, Query};
pub use merge::merge_deltas;
pub use raw::RawFeed;
pub use snapshot::{PreviousRun, Snapshot};
