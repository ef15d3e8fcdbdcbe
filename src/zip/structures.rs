use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// End of Central Directory (EOCD) - 22 bytes minimum
pub const EOCD_SIGNATURE: u32 = 0x06054B50;
pub const EOCD_SIZE: u64 = 22;

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: u32 = 0x02014B50;
pub const CDFH_MIN_SIZE: u64 = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: u32 = 0x04034B50;
pub const LFH_SIZE: u64 = 30;

/// Offset of the file name length field inside a local file header.
pub const LFH_NAME_LENGTH_OFFSET: u64 = 26;

/// General purpose flag: name and comment are UTF-8.
pub const FLAG_UTF8: u16 = 0x0800;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// The fields of the EOCD record this reader uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    /// Offset of the record's signature in the archive.
    pub offset: u64,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
}

/// Modification time decoded from a packed MS-DOS timestamp.
///
/// The packed value holds the date in the high half and the time in the
/// low half, seconds stored with two-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DosDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DosDateTime {
    pub fn from_packed(t: u32) -> Self {
        Self {
            year: ((t >> 25) + 1980) as u16,
            month: ((t >> 21) & 15) as u8,
            day: ((t >> 16) & 31) as u8,
            hour: ((t >> 11) & 31) as u8,
            minute: ((t >> 5) & 63) as u8,
            second: ((t & 31) * 2) as u8,
        }
    }

    /// Calendar date-time, or `None` if the fields do not form a real
    /// date (DOS tools happily write month 0 or hour 31).
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())?.and_hms_opt(
            self.hour.into(),
            self.minute.into(),
            self.second.into(),
        )
    }
}

impl fmt::Display for DosDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// One file or directory record of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path as stored, `/`-separated; directories end with `/`.
    pub name: String,
    pub comment: String,
    /// Stored checksum. Not checked by plain extraction.
    pub crc32: u32,
    pub compressed_size: u32,
    pub original_size: u32,
    pub method: CompressionMethod,
    pub timestamp: DosDateTime,
    /// Offset of the entry's local file header.
    pub header_offset: u64,
    /// Offset of the first byte of file data, resolved from the local header.
    pub data_offset: u64,
}

impl Entry {
    /// Whether the data must be inflated. Any method other than DEFLATE is
    /// copied verbatim.
    pub fn is_deflated(&self) -> bool {
        self.method == CompressionMethod::Deflate
    }

    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory()
    }
}
