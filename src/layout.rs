//! Fixed offset tables for known TA image layouts.

/// Number of rotating boot-log slots in a TA partition.
pub const BOOTLOG_COUNT: usize = 10;

/// Total size of a TA partition dump, in bytes.
pub const TA_EXPECTED_SIZE_BYTES: usize = 2 * 1024 * 1024;

/// Leading magic bytes, common to all known TA generations.
pub const TA_MAGIC: [u8; 2] = [0xC1, 0xE9];

/// Byte offsets and field lengths of one TA image generation.
///
/// All offsets are absolute within the image. A layout is built once and
/// handed to [`TaImage::with_layout`](crate::TaImage::with_layout); nothing
/// in it changes at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaLayout {
    /// Image size a dump must have for these offsets to be meaningful.
    pub image_size: usize,

    /// Start offset of each boot-log slot, slot 1 first.
    ///
    /// Windows are not required to be disjoint: in the Tama table, slot
    /// 3's window runs 169 bytes past slot 4's start.
    pub bootlog_offsets: [usize; BOOTLOG_COUNT],

    /// Length shared by all boot-log slots.
    pub bootlog_len: usize,

    /// Offset of the build version string.
    pub build_id_offset: usize,

    /// Length of the build version string. 32 is a conservative upper
    /// bound; 29 has been observed on Tama-Akari units.
    pub build_id_len: usize,

    /// Offset of the serial number string.
    pub serial_offset: usize,

    /// Length of the serial number string.
    pub serial_len: usize,

    /// Offset of the embedded SQLite database.
    pub sqlitedb_offset: usize,

    /// Smallest size exponent accepted from the SQLite header.
    pub sqlitedb_exponent_min: u16,

    /// Largest size exponent accepted from the SQLite header.
    pub sqlitedb_exponent_max: u16,
}

impl TaLayout {
    /// The layout of Tama-generation devices, currently the one generation
    /// with a fully mapped table.
    pub const fn tama() -> TaLayout {
        TaLayout {
            image_size: TA_EXPECTED_SIZE_BYTES,
            bootlog_offsets: [
                0x2A22E, 0x2DA22, 0x31CEE, 0x3542A, 0x38C46, 0x3C7A2, 0x65412,
                0x68C2E, 0x6C78A, 0x70A2E,
            ],
            bootlog_len: 14309,
            build_id_offset: 0x7B4,
            build_id_len: 32,
            serial_offset: 0x600B4,
            serial_len: 10,
            sqlitedb_offset: 0x20044,
            // 2^9, the smallest SQLite page, up to 2^21, the whole image.
            sqlitedb_exponent_min: 9,
            sqlitedb_exponent_max: 21,
        }
    }
}

impl Default for TaLayout {
    fn default() -> TaLayout {
        TaLayout::tama()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tama_table_is_self_consistent() {
        let layout = TaLayout::tama();

        let mut regions: Vec<(usize, usize)> = layout
            .bootlog_offsets
            .iter()
            .map(|&offset| (offset, layout.bootlog_len))
            .collect();
        regions.push((layout.build_id_offset, layout.build_id_len));
        regions.push((layout.serial_offset, layout.serial_len));

        for &(offset, len) in &regions {
            assert!(offset + len <= layout.image_size);
        }

        // Slot offsets are strictly increasing. Full disjointness does not
        // hold for this table: slot 3's window runs past slot 4's start.
        for pair in layout.bootlog_offsets.windows(2) {
            assert!(pair[0] < pair[1]);
        }

        // The build id and serial fields sit clear of every slot window.
        for &(offset, len) in &regions[BOOTLOG_COUNT..] {
            for &slot_offset in &layout.bootlog_offsets {
                assert!(
                    offset + len <= slot_offset
                        || offset >= slot_offset + layout.bootlog_len
                );
            }
        }
    }

    #[test]
    fn slot_three_window_runs_into_slot_four() {
        // Offsets are kept exactly as mapped from device dumps: slot 3's
        // window overruns slot 4's start by 169 bytes. Every other
        // adjacent pair is disjoint.
        let layout = TaLayout::tama();

        let slot3_end = layout.bootlog_offsets[2] + layout.bootlog_len;
        assert_eq!(slot3_end - layout.bootlog_offsets[3], 169);

        for (i, pair) in layout.bootlog_offsets.windows(2).enumerate() {
            if i != 2 {
                assert!(pair[0] + layout.bootlog_len <= pair[1]);
            }
        }
    }

    #[test]
    fn sqlite_header_fits_before_the_first_bootlog() {
        let layout = TaLayout::tama();

        // The 18 header bytes the size resolver reads must themselves be
        // inside the image and clear of the build id field.
        assert!(layout.sqlitedb_offset + 18 <= layout.image_size);
        assert!(layout.build_id_offset + layout.build_id_len <= layout.sqlitedb_offset);
    }
}
