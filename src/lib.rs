//! Extraction of structured artifacts from TA ("trim area") partition dumps
//! as found on SoMC devices: the ten rotating boot logs, the build version
//! string, the device serial number and the embedded SQLite database.
//!
//! The library works on an in-memory image and never touches the
//! filesystem; the `ta-extract` binary is the command-line tool around it.

pub mod error;
pub mod layout;

mod test_image;

use std::str;

use log::debug;

use crate::error::{Artifact, TaError, TaResult};
use crate::layout::{TaLayout, BOOTLOG_COUNT, TA_MAGIC};

/// Offset of the size field inside the embedded SQLite header.
///
/// A stock SQLite header stores the page size at byte 16; TA dumps have
/// been observed to store the total database size there instead, as a
/// little-endian power-of-two exponent.
/// See <https://www.sqlite.org/fileformat.html>.
const SQLITEDB_SIZE_FIELD_OFFSET: usize = 16;

/// A validated TA partition dump.
///
/// Construction checks the image against its layout (total size, then the
/// TA magic), so extraction operations exist only on images the offsets are
/// meaningful for. Every read is an absolute-offset slice read with no
/// cursor state: operations are idempotent, may run in any order or subset,
/// and a shared `TaImage` can serve multiple threads at once.
#[derive(Debug)]
pub struct TaImage<B> {
    data: B,
    layout: TaLayout,
}

impl<B: AsRef<[u8]>> TaImage<B> {
    /// Validates `data` against the built-in Tama-generation layout.
    pub fn new(data: B) -> TaResult<TaImage<B>> {
        TaImage::with_layout(data, TaLayout::tama())
    }

    /// Validates `data` against a caller-supplied layout.
    pub fn with_layout(data: B, layout: TaLayout) -> TaResult<TaImage<B>> {
        let len = data.as_ref().len();
        if len != layout.image_size {
            return Err(TaError::SizeMismatch {
                expected: layout.image_size,
                actual: len,
            });
        }

        let mut found = [0u8; 2];
        for (dst, src) in found.iter_mut().zip(data.as_ref()) {
            *dst = *src;
        }
        if found != TA_MAGIC {
            return Err(TaError::BadMagic { found });
        }

        Ok(TaImage { data, layout })
    }

    fn bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Reads exactly `len` bytes starting at the absolute offset `offset`.
    fn read_at(&self, artifact: Artifact, offset: usize, len: usize) -> TaResult<&[u8]> {
        let bytes = self.bytes();
        let region = offset
            .checked_add(len)
            .and_then(|end| bytes.get(offset..end));
        match region {
            Some(region) => {
                debug!("read {len} bytes at {offset:#x} for {artifact}");
                Ok(region)
            }
            None => Err(TaError::ShortRead {
                artifact,
                offset,
                requested: len,
                available: bytes.len().saturating_sub(offset),
            }),
        }
    }

    /// Reads a fixed-length field and decodes it as UTF-8.
    fn read_text(&self, artifact: Artifact, offset: usize, len: usize) -> TaResult<&str> {
        let raw = self.read_at(artifact, offset, len)?;
        str::from_utf8(raw).map_err(|source| TaError::InvalidText {
            artifact,
            offset,
            source,
        })
    }

    /// Extracts one boot log.
    ///
    /// Slots are numbered 1..=10 as on the device; every slot is read from
    /// its own table offset.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is outside 1..=10.
    pub fn bootlog(&self, slot: usize) -> TaResult<&str> {
        assert!(
            (1..=BOOTLOG_COUNT).contains(&slot),
            "bootlog slots are numbered 1..=10"
        );
        let offset = self.layout.bootlog_offsets[slot - 1];
        self.read_text(Artifact::Bootlog(slot), offset, self.layout.bootlog_len)
    }

    /// Iterates over all ten boot-log slots.
    ///
    /// Slots are extracted independently: a slot that fails to read or
    /// decode yields its error and the remaining slots are still visited.
    pub fn bootlogs(&self) -> Bootlogs<'_, B> {
        Bootlogs {
            image: self,
            next_slot: 1,
        }
    }

    /// Extracts the build version string.
    pub fn build_id(&self) -> TaResult<&str> {
        self.read_text(
            Artifact::BuildId,
            self.layout.build_id_offset,
            self.layout.build_id_len,
        )
    }

    /// Extracts the device serial number.
    pub fn serial(&self) -> TaResult<&str> {
        self.read_text(
            Artifact::Serial,
            self.layout.serial_offset,
            self.layout.serial_len,
        )
    }

    /// Resolves the size of the embedded SQLite database from its header.
    ///
    /// Reads the 2-byte little-endian exponent `e` at byte 16 of the header
    /// and returns `2^e`. Exponents outside the layout's accepted range are
    /// rejected before any size is derived from them, so a garbage header
    /// can never send a multi-gigabyte read against a 2 MiB image.
    pub fn sqlitedb_len(&self) -> TaResult<usize> {
        self.sqlitedb_size().map(|(_, len)| len)
    }

    fn sqlitedb_size(&self) -> TaResult<(u16, usize)> {
        let header = self.read_at(
            Artifact::SqliteDb,
            self.layout.sqlitedb_offset,
            SQLITEDB_SIZE_FIELD_OFFSET + 2,
        )?;
        let exponent = u16::from_le_bytes([
            header[SQLITEDB_SIZE_FIELD_OFFSET],
            header[SQLITEDB_SIZE_FIELD_OFFSET + 1],
        ]);

        let offset = self.layout.sqlitedb_offset + SQLITEDB_SIZE_FIELD_OFFSET;
        let min = self.layout.sqlitedb_exponent_min;
        let max = self.layout.sqlitedb_exponent_max;
        if !(min..=max).contains(&exponent) {
            return Err(TaError::InvalidSizeField {
                exponent,
                offset,
                min,
                max,
            });
        }

        let len = 1usize
            .checked_shl(u32::from(exponent))
            .ok_or(TaError::InvalidSizeField {
                exponent,
                offset,
                min,
                max,
            })?;
        debug!("SQLite DB size field: 2^{exponent} ({len} B)");
        Ok((exponent, len))
    }

    /// Extracts the embedded SQLite database.
    ///
    /// The header's size field decides how many bytes are read, starting at
    /// the database base offset (the header is part of the payload). The
    /// result keeps the resolved size so persisted copies can be checked
    /// against what the header promised.
    pub fn sqlitedb(&self) -> TaResult<SqliteDb<'_>> {
        let (size_exponent, expected_len) = self.sqlitedb_size()?;
        let bytes = self.read_at(
            Artifact::SqliteDb,
            self.layout.sqlitedb_offset,
            expected_len,
        )?;
        Ok(SqliteDb {
            bytes,
            expected_len,
            size_exponent,
        })
    }
}

/// One extracted boot log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bootlog<'a> {
    /// 1-based slot number.
    pub slot: usize,
    /// Start offset of the slot within the image.
    pub offset: usize,
    /// The log text.
    pub text: &'a str,
}

/// Iterator over the ten boot-log slots of a [`TaImage`].
pub struct Bootlogs<'a, B> {
    image: &'a TaImage<B>,
    next_slot: usize,
}

impl<'a, B: AsRef<[u8]>> Iterator for Bootlogs<'a, B> {
    type Item = TaResult<Bootlog<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_slot > BOOTLOG_COUNT {
            return None;
        }
        let slot = self.next_slot;
        self.next_slot += 1;

        let offset = self.image.layout.bootlog_offsets[slot - 1];
        Some(self.image.bootlog(slot).map(|text| Bootlog {
            slot,
            offset,
            text,
        }))
    }
}

/// An extracted copy of the embedded SQLite database.
#[derive(Debug, Clone, Copy)]
pub struct SqliteDb<'a> {
    bytes: &'a [u8],
    expected_len: usize,
    size_exponent: u16,
}

impl<'a> SqliteDb<'a> {
    /// The database contents, header included.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The total length the database header promised.
    ///
    /// Equal to `bytes().len()` for any extraction that succeeded; kept
    /// separate so externally persisted copies can be checked against the
    /// header's claim.
    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// The raw power-of-two exponent the size was resolved from.
    pub fn size_exponent(&self) -> u16 {
        self.size_exponent
    }

    /// Checks the size of an externally persisted copy against the header.
    pub fn verify_persisted(&self, persisted: u64) -> TaResult<()> {
        if persisted != self.expected_len as u64 {
            return Err(TaError::PayloadLengthMismatch {
                expected: self.expected_len,
                persisted,
            });
        }
        Ok(())
    }
}
