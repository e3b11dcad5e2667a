//! Error types shared by every stage of packing, diffing and merging.
use thiserror::Error;

/// An error that can occur while building, reading or composing packed feeds.
#[derive(Error, Debug)]
pub enum Error {
    /// The container or one of its blocks is malformed
    #[error("malformed feed file: {0}")]
    Format(String),
    /// A delta does not belong to the feed lineage it is applied to
    #[error("lineage mismatch in {table} (id {id}): {reason}")]
    Lineage {
        /// Table in which the mismatch was found
        table: &'static str,
        /// Stable id (or version number for header checks) involved
        id: u32,
        /// What exactly did not line up
        reason: String,
    },
    /// A record references an id that does not exist in the referenced table
    #[error("{table} {id} references unknown {target} {target_id}")]
    Reference {
        /// Table of the referencing record
        table: &'static str,
        /// Stable id of the referencing record
        id: u32,
        /// Referenced table
        target: &'static str,
        /// The id that could not be resolved
        target_id: u32,
    },
    /// Source rows that cannot be represented
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A block payload could not be decoded
    #[error("cannot decode block: {0}")]
    Decode(#[from] prost::DecodeError),
    /// Compression or other input/output failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn lineage(table: &'static str, id: u32, reason: impl Into<String>) -> Self {
        Error::Lineage {
            table,
            id,
            reason: reason.into(),
        }
    }
}
