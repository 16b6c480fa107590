use crate::errors::CoreError;

/// Magic bytes identifying a chart cache entry file.
pub const MAGIC: &[u8; 4] = b"CCHE";

/// Current cache file format version.
pub const CURRENT_VERSION: u16 = 1;

/// Header size in bytes:
/// magic(4) + version(2) + expires_at(8) + payload_len(8) = 22
pub const HEADER_SIZE: usize = 22;

/// Header read from a cache entry file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub version: u16,
    /// Expiry as Unix seconds.
    pub expires_at: i64,
    pub payload_len: u64,
}

/// Write a complete cache entry to bytes.
///
/// Layout:
/// ```text
/// [CCHE: 4B] [version: 2B LE] [expires_at: 8B LE] [payload_len: 8B LE]
/// [payload: variable, bincode]
/// ```
pub fn write_entry(version: u16, expires_at: i64, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&version.to_le_bytes());
    buf.extend_from_slice(&expires_at.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buf.extend_from_slice(payload);

    buf
}

/// Parse a cache entry, returning the header and a slice of the payload.
pub fn read_entry(data: &[u8]) -> Result<(EntryHeader, &[u8]), CoreError> {
    if data.len() < HEADER_SIZE {
        return Err(CoreError::InvalidFileFormat(format!(
            "Entry too small: {} bytes (minimum {HEADER_SIZE})",
            data.len()
        )));
    }

    if &data[0..4] != MAGIC {
        return Err(CoreError::InvalidFileFormat(
            "Not a chart cache entry (bad magic bytes)".into(),
        ));
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != CURRENT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let expires_at = i64::from_le_bytes(read_array(&data[6..14])?);
    let payload_len = u64::from_le_bytes(read_array(&data[14..22])?);

    let payload = &data[HEADER_SIZE..];
    if payload.len() as u64 != payload_len {
        return Err(CoreError::InvalidFileFormat(format!(
            "Payload length mismatch: header says {payload_len}, found {}",
            payload.len()
        )));
    }

    Ok((
        EntryHeader {
            version,
            expires_at,
            payload_len,
        },
        payload,
    ))
}

fn read_array(bytes: &[u8]) -> Result<[u8; 8], CoreError> {
    bytes
        .try_into()
        .map_err(|_| CoreError::InvalidFileFormat("Truncated header field".into()))
}
