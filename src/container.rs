//! The file layout: a little-endian `u16` header length, the header message, then every
//! block back to back in enumeration order.
//!
//! Bit 15 of the length marks a delta file, whose header carries the version it applies
//! to. Block sizes in the header are authoritative: a reader skips blocks it does not
//! know by their declared length, and only decompresses the blocks it is asked for.
use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use prost::Message;
use serde::Serialize;

use crate::calendar::{date_to_int, int_to_date};
use crate::error::{Error, Result};
use crate::wire;

const DELTA_FLAG: u16 = 0x8000;
const COMPRESSION_LEVEL: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Block {
    Ids,
    Strings,
    Agencies,
    Calendar,
    Shapes,
    Stops,
    Routes,
    Trips,
    Transfers,
    Networks,
    Areas,
    FareLinks,
}

impl Block {
    pub const ALL: [Block; 12] = [
        Block::Ids,
        Block::Strings,
        Block::Agencies,
        Block::Calendar,
        Block::Shapes,
        Block::Stops,
        Block::Routes,
        Block::Trips,
        Block::Transfers,
        Block::Networks,
        Block::Areas,
        Block::FareLinks,
    ];

    /// Position in the header's size list, starting at 1.
    pub fn code(self) -> u32 {
        Block::ALL.iter().position(|b| *b == self).map_or(0, |i| i as u32 + 1)
    }

    pub fn from_code(code: u32) -> Option<Block> {
        let i = code.checked_sub(1)? as usize;
        Block::ALL.get(i).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Block::Ids => "ids",
            Block::Strings => "strings",
            Block::Agencies => "agency",
            Block::Calendar => "calendar",
            Block::Shapes => "shapes",
            Block::Stops => "stops",
            Block::Routes => "routes",
            Block::Trips => "trips",
            Block::Transfers => "transfers",
            Block::Networks => "networks",
            Block::Areas => "areas",
            Block::FareLinks => "fare_links",
        }
    }

    pub fn from_name(name: &str) -> Option<Block> {
        Block::ALL.into_iter().find(|b| b.name() == name)
    }
}

/// A block as listed in a header, including kinds newer than this reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockKind {
    Known(Block),
    Unknown(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FileKind {
    Snapshot { original_url: String },
    Delta { old_version: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub kind: FileKind,
    pub version: u32,
    pub date: NaiveDate,
    pub compressed: bool,
}

impl Header {
    pub fn is_delta(&self) -> bool {
        matches!(self.kind, FileKind::Delta { .. })
    }
}

/// Writes a complete file. Empty blocks are declared with size 0.
pub fn write(header: &Header, blocks: &BTreeMap<Block, Vec<u8>>) -> Result<Vec<u8>> {
    let mut payloads = Vec::with_capacity(Block::ALL.len());
    for block in Block::ALL {
        let data = match blocks.get(&block) {
            Some(data) if !data.is_empty() => data,
            _ => {
                payloads.push(Vec::new());
                continue;
            }
        };
        payloads.push(if header.compressed {
            zstd::bulk::compress(data, COMPRESSION_LEVEL)?
        } else {
            data.clone()
        });
    }
    let mut sizes: Vec<u32> = payloads.iter().map(|p| p.len() as u32).collect();
    while sizes.last() == Some(&0) {
        sizes.pop();
    }

    let date = date_to_int(header.date);
    let (message, flag) = match &header.kind {
        FileKind::Snapshot { original_url } => (
            wire::GtfsHeader {
                version: header.version,
                date,
                original_url: original_url.clone(),
                compressed: header.compressed,
                blocks: sizes,
            }
            .encode_to_vec(),
            0,
        ),
        FileKind::Delta { old_version } => (
            wire::GtfsDeltaHeader {
                old_version: *old_version,
                version: header.version,
                date,
                compressed: header.compressed,
                blocks: sizes,
            }
            .encode_to_vec(),
            DELTA_FLAG,
        ),
    };
    if message.len() >= DELTA_FLAG as usize {
        return Err(Error::Format(format!(
            "header of {} bytes is too long",
            message.len()
        )));
    }

    let total = 2 + message.len() + payloads.iter().map(|p| p.len()).sum::<usize>();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&(message.len() as u16 | flag).to_le_bytes());
    out.extend_from_slice(&message);
    for payload in payloads {
        out.extend_from_slice(&payload);
    }
    Ok(out)
}

/// A parsed file: the header and the raw block slices, nothing decoded yet.
pub struct Container<'a> {
    header: Header,
    blocks: Vec<(BlockKind, &'a [u8])>,
}

impl<'a> Container<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(Error::Format("file is too short for a header".to_string()));
        }
        let raw_len = u16::from_le_bytes([data[0], data[1]]);
        let len = (raw_len & !DELTA_FLAG) as usize;
        let rest = &data[2..];
        if rest.len() < len {
            return Err(Error::Format(format!(
                "header of {} bytes exceeds the file",
                len
            )));
        }
        let (message, mut rest) = rest.split_at(len);

        let (header, sizes) = if raw_len & DELTA_FLAG != 0 {
            let h = wire::GtfsDeltaHeader::decode(message)?;
            let header = Header {
                kind: FileKind::Delta {
                    old_version: h.old_version,
                },
                version: h.version,
                date: int_to_date(h.date)?,
                compressed: h.compressed,
            };
            (header, h.blocks)
        } else {
            let h = wire::GtfsHeader::decode(message)?;
            let header = Header {
                kind: FileKind::Snapshot {
                    original_url: h.original_url,
                },
                version: h.version,
                date: int_to_date(h.date)?,
                compressed: h.compressed,
            };
            (header, h.blocks)
        };

        let mut blocks = Vec::with_capacity(sizes.len());
        for (i, size) in sizes.into_iter().enumerate() {
            let code = i as u32 + 1;
            let size = size as usize;
            if rest.len() < size {
                return Err(Error::Format(format!(
                    "block {} declares {} bytes, only {} left",
                    code,
                    size,
                    rest.len()
                )));
            }
            let (payload, tail) = rest.split_at(size);
            rest = tail;
            let kind = match Block::from_code(code) {
                Some(block) => BlockKind::Known(block),
                None => {
                    log::debug!("Skipping unknown block {} of {} bytes", code, size);
                    BlockKind::Unknown(code)
                }
            };
            blocks.push((kind, payload));
        }
        if !rest.is_empty() {
            return Err(Error::Format(format!(
                "{} bytes after the last block",
                rest.len()
            )));
        }
        Ok(Container { header, blocks })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Kinds of the blocks with data, in file order.
    pub fn present(&self) -> impl Iterator<Item = BlockKind> + '_ {
        self.blocks
            .iter()
            .filter(|(_, data)| !data.is_empty())
            .map(|(kind, _)| *kind)
    }

    /// Stored bytes of a block, possibly compressed.
    pub fn raw(&self, block: Block) -> Option<&'a [u8]> {
        self.blocks
            .iter()
            .find(|(kind, data)| *kind == BlockKind::Known(block) && !data.is_empty())
            .map(|(_, data)| *data)
    }

    /// Uncompressed bytes of a block, `None` when the file does not have it.
    pub fn block(&self, block: Block) -> Result<Option<Cow<'a, [u8]>>> {
        let Some(data) = self.raw(block) else {
            return Ok(None);
        };
        if self.header.compressed {
            Ok(Some(Cow::Owned(zstd::decode_all(data)?)))
        } else {
            Ok(Some(Cow::Borrowed(data)))
        }
    }

    pub fn decode<M: Message + Default>(&self, block: Block) -> Result<Option<M>> {
        match self.block(block)? {
            Some(data) => Ok(Some(M::decode(data.as_ref())?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(kind: FileKind, compressed: bool) -> Header {
        Header {
            kind,
            version: 3,
            date: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
            compressed,
        }
    }

    fn blocks() -> BTreeMap<Block, Vec<u8>> {
        let mut blocks = BTreeMap::new();
        blocks.insert(Block::Strings, b"strings strings strings".to_vec());
        blocks.insert(Block::Stops, vec![1, 2, 3]);
        blocks.insert(Block::Trips, vec![]);
        blocks
    }

    #[test]
    fn snapshot_layout() {
        let h = header(
            FileKind::Snapshot {
                original_url: "https://example.org/gtfs.zip".to_string(),
            },
            false,
        );
        let data = write(&h, &blocks()).unwrap();
        assert_eq!(data[1] & 0x80, 0);

        let container = Container::parse(&data).unwrap();
        assert_eq!(container.header(), &h);
        let present: Vec<BlockKind> = container.present().collect();
        assert_eq!(
            present,
            vec![BlockKind::Known(Block::Strings), BlockKind::Known(Block::Stops)]
        );
        assert_eq!(container.block(Block::Stops).unwrap().unwrap().as_ref(), &[1, 2, 3]);
        assert!(container.block(Block::Trips).unwrap().is_none());
    }

    #[test]
    fn delta_flag_and_compression() {
        let h = header(FileKind::Delta { old_version: 2 }, true);
        let data = write(&h, &blocks()).unwrap();
        assert_eq!(data[1] & 0x80, 0x80);

        let container = Container::parse(&data).unwrap();
        assert!(container.header().is_delta());
        assert_eq!(
            container.block(Block::Strings).unwrap().unwrap().as_ref(),
            b"strings strings strings"
        );
    }

    #[test]
    fn unknown_tail_blocks_are_skipped() {
        let message = wire::GtfsHeader {
            version: 1,
            date: 20240517,
            original_url: String::new(),
            compressed: false,
            blocks: vec![0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 4],
        }
        .encode_to_vec();
        let mut data = (message.len() as u16).to_le_bytes().to_vec();
        data.extend_from_slice(&message);
        data.extend_from_slice(&[9, 9, 7, 7, 7, 7]);

        let container = Container::parse(&data).unwrap();
        let present: Vec<BlockKind> = container.present().collect();
        assert_eq!(
            present,
            vec![BlockKind::Known(Block::Strings), BlockKind::Unknown(13)]
        );
        assert_eq!(container.raw(Block::Strings), Some(&[9u8, 9][..]));
    }

    #[test]
    fn truncated_files_are_format_errors() {
        let h = header(
            FileKind::Snapshot {
                original_url: String::new(),
            },
            false,
        );
        let data = write(&h, &blocks()).unwrap();
        assert!(matches!(
            Container::parse(&data[..data.len() - 1]),
            Err(Error::Format(_))
        ));
        assert!(matches!(Container::parse(&data[..1]), Err(Error::Format(_))));
    }
}
