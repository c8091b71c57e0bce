use std::io::{Cursor, Error, ErrorKind, Read, Result};

#[derive(Clone, Default)]
enum Endianness {
    #[default]
    Big,
    Little,
}

/// Cursor-style reader for the binary box layouts this crate parses.
///
/// ISOBMFF fields are big endian; the little-endian constructor exists for
/// DRM-system payloads (e.g. PlayReady objects) that embed little-endian
/// fields inside an otherwise big-endian container.
#[derive(Clone, Default)]
pub struct Reader {
    endian: Endianness,
    inner: Cursor<Vec<u8>>,
}

impl Reader {
    pub fn new_big_endian(data: Vec<u8>) -> Self {
        Self {
            endian: Endianness::Big,
            inner: Cursor::new(data),
        }
    }

    pub fn new_little_endian(data: Vec<u8>) -> Self {
        Self {
            endian: Endianness::Little,
            inner: Cursor::new(data),
        }
    }

    pub fn remaining(&self) -> u64 {
        (self.inner.get_ref().len() as u64).saturating_sub(self.inner.position())
    }

    pub fn skip(&mut self, bytes: u64) -> Result<()> {
        let position = self.inner.position() + bytes;

        if position > self.inner.get_ref().len() as u64 {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                "reader skips out of bounds",
            ));
        }

        self.inner.set_position(position);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0; 2];
        self.inner.read_exact(&mut buf)?;

        match self.endian {
            Endianness::Big => Ok(u16::from_be_bytes(buf)),
            Endianness::Little => Ok(u16::from_le_bytes(buf)),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0; 4];
        self.inner.read_exact(&mut buf)?;

        match self.endian {
            Endianness::Big => Ok(u32::from_be_bytes(buf)),
            Endianness::Little => Ok(u32::from_le_bytes(buf)),
        }
    }

    pub fn read_bytes(&mut self, bytes: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; bytes];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }
}
