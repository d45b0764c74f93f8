//! Portable bitmap serialization.
//!
//! Two header variants exist, chosen by whether any container is run-encoded.
//!
//! Without runs:
//!
//! ```text
//! u32 cookie = 12346
//! u32 container count (n)
//! n × (u16 key, u16 cardinality - 1)
//! n × u32 byte offset of the container payload from the start of the stream
//! payloads
//! ```
//!
//! With runs:
//!
//! ```text
//! u32 cookie = 12347 | (n - 1) << 16
//! ceil(n / 8) bytes: bit i set when container i is run-encoded
//! n × (u16 key, u16 cardinality - 1)
//! n × u32 offsets, present only when n >= NO_OFFSET_THRESHOLD
//! payloads
//! ```
//!
//! Payloads carry no per-container header except the run count of run
//! containers. Array payloads are `cardinality` little-endian `u16` values,
//! bitmap payloads are 1024 little-endian `u64` words. On read, a container
//! is a run container if flagged, otherwise a bitmap when its cardinality
//! exceeds [`ARRAY_MAX_SIZE`], otherwise an array.

use std::io::{Read, Write};

use tracing::debug;

use crate::array::ArrayContainer;
use crate::bitset::BitmapContainer;
use crate::container::{self, Container, ARRAY_MAX_SIZE, MAX_CARDINALITY};
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::roaring::RoaringBitmap;
use crate::run::RunContainer;

/// Cookie of the format without run containers.
pub const SERIAL_COOKIE_NO_RUNCONTAINER: u32 = 12346;

/// Cookie (low 16 bits) of the format with run containers.
pub const SERIAL_COOKIE: u32 = 12347;

/// Below this many containers, the run format omits the offset table.
pub const NO_OFFSET_THRESHOLD: usize = 4;

fn payload_size(c: &Container) -> usize {
    match c {
        Container::Array(a) => 2 * a.len(),
        Container::Bitmap(_) => container::BITMAP_SERIALIZED_SIZE,
        Container::Run(r) => r.serialized_size_in_bytes(),
    }
}

fn encoding_error(msg: impl Into<String>) -> Error {
    let msg = msg.into();
    debug!(reason = %msg, "rejected serialized bitmap");
    Error::InvalidEncoding(msg)
}

impl RoaringBitmap {
    fn has_run_containers(&self) -> bool {
        self.directory()
            .iter()
            .any(|(_, c)| matches!(c, Container::Run(_)))
    }

    /// Size of the header preceding the first payload.
    fn header_size(&self) -> usize {
        let size = self.directory().len();
        if self.has_run_containers() {
            let flags = size.div_ceil(8);
            if size < NO_OFFSET_THRESHOLD {
                4 + flags + 4 * size
            } else {
                4 + flags + 8 * size
            }
        } else {
            4 + 4 + 8 * size
        }
    }

    /// Exact number of bytes [`RoaringBitmap::serialize_into`] writes.
    pub fn serialized_size(&self) -> usize {
        self.header_size()
            + self
                .directory()
                .iter()
                .map(|(_, c)| payload_size(c))
                .sum::<usize>()
    }

    /// Write the portable format to `writer`.
    pub fn serialize_into<W: Write>(&self, writer: &mut W) -> Result<()> {
        let directory = self.directory();
        let size = directory.len();
        let has_runs = self.has_run_containers();
        let mut header = Vec::with_capacity(self.header_size());

        if has_runs {
            let cookie = SERIAL_COOKIE | (((size - 1) as u32) << 16);
            header.extend_from_slice(&cookie.to_le_bytes());
            let mut flags = vec![0u8; size.div_ceil(8)];
            for (i, (_, c)) in directory.iter().enumerate() {
                if matches!(c, Container::Run(_)) {
                    flags[i / 8] |= 1 << (i % 8);
                }
            }
            header.extend_from_slice(&flags);
        } else {
            header.extend_from_slice(&SERIAL_COOKIE_NO_RUNCONTAINER.to_le_bytes());
            header.extend_from_slice(&(size as u32).to_le_bytes());
        }

        for (key, c) in directory.iter() {
            header.extend_from_slice(&key.to_le_bytes());
            header.extend_from_slice(&((c.len() - 1) as u16).to_le_bytes());
        }

        if !has_runs || size >= NO_OFFSET_THRESHOLD {
            let mut offset = self.header_size();
            for (_, c) in directory.iter() {
                header.extend_from_slice(&(offset as u32).to_le_bytes());
                offset += payload_size(c);
            }
        }
        writer.write_all(&header)?;

        for (_, c) in directory.iter() {
            match c {
                Container::Array(a) => a.write_payload(writer)?,
                Container::Bitmap(b) => b.write_payload(writer)?,
                Container::Run(r) => r.write_payload(writer)?,
            }
        }
        Ok(())
    }

    /// Read the portable format from `reader`.
    pub fn deserialize_from<R: Read>(reader: &mut R) -> Result<Self> {
        let cookie = container::read_u32(reader)?;
        let (size, has_runs) = if cookie & 0xFFFF == SERIAL_COOKIE {
            ((cookie >> 16) as usize + 1, true)
        } else if cookie == SERIAL_COOKIE_NO_RUNCONTAINER {
            (container::read_u32(reader)? as usize, false)
        } else {
            return Err(encoding_error(format!("unknown cookie {cookie:#x}")));
        };
        if size > MAX_CARDINALITY {
            return Err(encoding_error(format!("{size} containers exceeds the key space")));
        }

        let mut flags = vec![0u8; if has_runs { size.div_ceil(8) } else { 0 }];
        reader.read_exact(&mut flags).map_err(Error::from_read)?;

        let descriptive = container::read_u16_vec(reader, 2 * size)?;
        let keys: Vec<u16> = descriptive.iter().step_by(2).copied().collect();
        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(encoding_error("container keys are not strictly increasing"));
        }

        if !has_runs || size >= NO_OFFSET_THRESHOLD {
            let mut offsets = vec![0u8; 4 * size];
            reader.read_exact(&mut offsets).map_err(Error::from_read)?;
        }

        let mut directory = Directory::with_capacity(size);
        for (i, &key) in keys.iter().enumerate() {
            let cardinality = descriptive[2 * i + 1] as usize + 1;
            let is_run = has_runs && flags[i / 8] & (1 << (i % 8)) != 0;
            let c = if is_run {
                Container::Run(RunContainer::deserialize(reader)?)
            } else if cardinality > ARRAY_MAX_SIZE {
                Container::Bitmap(BitmapContainer::deserialize(reader)?)
            } else {
                Container::Array(ArrayContainer::read_payload(reader, cardinality)?)
            };
            if c.len() != cardinality {
                return Err(encoding_error(format!(
                    "container {key} holds {} values, header says {cardinality}",
                    c.len()
                )));
            }
            directory.append(key, c);
        }

        debug!(containers = size, has_runs, "decoded bitmap");
        Ok(RoaringBitmap::from_directory(directory))
    }

    /// Serialize into a new byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_size());
        self.serialize_into(&mut out)
            .expect("writing to a Vec cannot fail");
        out
    }

    /// Deserialize from a byte slice, rejecting trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut input = bytes;
        let bitmap = Self::deserialize_from(&mut input)?;
        if !input.is_empty() {
            return Err(encoding_error(format!(
                "{} trailing bytes after bitmap",
                input.len()
            )));
        }
        Ok(bitmap)
    }
}
