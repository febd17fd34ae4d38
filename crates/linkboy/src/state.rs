//! Primitive read/write operations for save-state streams.
//!
//! Components persist themselves as an explicit, ordered list of fixed-width
//! fields. Multi-byte integers are little-endian; signed values are stored in
//! two's complement.
use std::io::{self, Read, Write};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    /// The stream ended before a complete field could be read.
    #[error("snapshot truncated: wanted {wanted} more byte(s)")]
    Truncated { wanted: usize },
    #[error("snapshot version {found} is newer than this build supports")]
    UnsupportedVersion { found: u8 },
    #[error("not a linkboy snapshot")]
    BadMagic,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub trait StateWriter {
    fn write_u8(&mut self, value: u8) -> Result<(), StateError>;
    fn write_u64(&mut self, value: u64) -> Result<(), StateError>;

    fn write_i64(&mut self, value: i64) -> Result<(), StateError> {
        self.write_u64(value as u64)
    }
}

pub trait StateReader {
    fn read_u8(&mut self) -> Result<u8, StateError>;
    fn read_u64(&mut self) -> Result<u64, StateError>;

    fn read_i64(&mut self) -> Result<i64, StateError> {
        self.read_u64().map(|v| v as i64)
    }
}

impl<W: Write> StateWriter for W {
    fn write_u8(&mut self, value: u8) -> Result<(), StateError> {
        self.write_all(&[value])?;
        Ok(())
    }

    fn write_u64(&mut self, value: u64) -> Result<(), StateError> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }
}

impl<R: Read> StateReader for R {
    fn read_u8(&mut self) -> Result<u8, StateError> {
        let mut buf = [0u8; 1];
        read_field(self, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u64(&mut self) -> Result<u64, StateError> {
        let mut buf = [0u8; 8];
        read_field(self, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

/// Fill `buf` completely, reporting a short read as `Truncated`.
fn read_field<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<(), StateError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(StateError::Truncated {
                    wanted: buf.len() - filled,
                })
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn integers_are_little_endian() {
        let mut out = Vec::new();
        out.write_u8(0xAB).unwrap();
        out.write_u64(0x0102_0304_0506_0708).unwrap();
        out.write_i64(-2).unwrap();
        assert_eq!(
            out,
            hex!("AB 0807060504030201 FEFFFFFFFFFFFFFF").to_vec()
        );
    }

    #[test]
    fn reads_back_written_fields() {
        let bytes = hex!("7F 0807060504030201 FEFFFFFFFFFFFFFF");
        let mut reader = &bytes[..];
        assert_eq!(reader.read_u8().unwrap(), 0x7F);
        assert_eq!(reader.read_u64().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(reader.read_i64().unwrap(), -2);
    }

    #[test]
    fn short_read_reports_missing_bytes() {
        let bytes = [0u8; 5];
        let mut reader = &bytes[..];
        match reader.read_u64() {
            Err(StateError::Truncated { wanted }) => assert_eq!(wanted, 3),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn empty_stream_truncates_single_byte() {
        let mut reader: &[u8] = &[];
        assert!(matches!(
            reader.read_u8(),
            Err(StateError::Truncated { wanted: 1 })
        ));
    }
}
