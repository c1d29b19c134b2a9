//! Big-endian primitive encoding shared by the snapshot codec.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};

pub(crate) fn write_u8<W: Write>(w: &mut W, value: u8) -> io::Result<()> {
    w.write_all(&[value])
}

pub(crate) fn write_u16<W: Write>(w: &mut W, value: u16) -> io::Result<()> {
    w.write_all(&value.to_be_bytes())
}

pub(crate) fn write_u32<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_be_bytes())
}

pub(crate) fn write_i32<W: Write>(w: &mut W, value: i32) -> io::Result<()> {
    w.write_all(&value.to_be_bytes())
}

pub(crate) fn write_u64<W: Write>(w: &mut W, value: u64) -> io::Result<()> {
    w.write_all(&value.to_be_bytes())
}

pub(crate) fn write_f32<W: Write>(w: &mut W, value: f32) -> io::Result<()> {
    w.write_all(&value.to_be_bytes())
}

pub(crate) fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

pub(crate) fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

pub(crate) fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

pub(crate) fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

pub(crate) fn read_f32<R: Read>(r: &mut R) -> io::Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_be_bytes(buf))
}

/// Reads a `u64`, returning `None` on a clean end of stream before the first byte.
pub(crate) fn read_u64_or_eof<R: Read>(r: &mut R) -> io::Result<Option<u64>> {
    let mut buf = [0u8; 8];
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated entrypoint id",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(Some(u64::from_be_bytes(buf)))
}

/// Converts a length or count to its `u32` wire form.
pub(crate) fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{what} does not fit in u32: {value}"),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_layout() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 0x0102_0304).unwrap();
        write_u16(&mut buf, 0x0506).unwrap();
        assert_eq!(buf, vec![1, 2, 3, 4, 5, 6]);

        let mut r = buf.as_slice();
        assert_eq!(read_u32(&mut r).unwrap(), 0x0102_0304);
        assert_eq!(read_u16(&mut r).unwrap(), 0x0506);
    }

    #[test]
    fn test_signed_and_float_values() {
        let mut buf = Vec::new();
        write_i32(&mut buf, -3).unwrap();
        write_f32(&mut buf, 1.5).unwrap();
        write_u64(&mut buf, u64::MAX - 1).unwrap();
        write_u8(&mut buf, 7).unwrap();

        let mut r = buf.as_slice();
        assert_eq!(read_i32(&mut r).unwrap(), -3);
        assert!((read_f32(&mut r).unwrap() - 1.5).abs() < f32::EPSILON);
        assert_eq!(read_u64(&mut r).unwrap(), u64::MAX - 1);
        assert_eq!(read_u8(&mut r).unwrap(), 7);
    }

    #[test]
    fn test_read_u64_or_eof() {
        let mut empty: &[u8] = &[];
        assert!(read_u64_or_eof(&mut empty).unwrap().is_none());

        let mut short: &[u8] = &[0, 1, 2];
        let err = read_u64_or_eof(&mut short).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let bytes = 42u64.to_be_bytes();
        let mut full: &[u8] = &bytes;
        assert_eq!(read_u64_or_eof(&mut full).unwrap(), Some(42));
    }

    #[test]
    fn test_to_u32_bounds() {
        assert_eq!(to_u32(12, "count").unwrap(), 12);
        #[cfg(target_pointer_width = "64")]
        assert!(to_u32(usize::MAX, "count").is_err());
    }
}
