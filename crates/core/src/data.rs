use core::ops::Deref;

use snafu::prelude::*;

/// Error conditions for when reading data.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum DataError {
    /// Thrown if a read tries to go out of bounds.
    #[snafu(display("Tried to read out-of-bounds"))]
    EndOfFile,
    /// Thrown if UTF-8 validation fails when trying to convert a slice.
    #[snafu(display("Invalid UTF-8 sequence"))]
    InvalidStr { source: core::str::Utf8Error },
}

/// Represents the endianness of the data being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Endian {
    Little,
    Big,
}

impl Default for Endian {
    #[inline]
    fn default() -> Self {
        #[cfg(target_endian = "little")]
        {
            Endian::Little
        }
        #[cfg(target_endian = "big")]
        {
            Endian::Big
        }
    }
}

/// Trait for types that support endian-aware operations.
pub trait EndianExt {
    /// Returns the current endianness.
    fn endian(&self) -> Endian;

    /// Sets the endianness.
    fn set_endian(&mut self, endian: Endian);
}

/// Trait for types that support seeking operations.
pub trait SeekExt {
    /// Returns the current position.
    fn position(&self) -> usize;

    /// Sets the current position, clamped to the length of the data.
    fn set_position(&mut self, position: usize) -> usize;

    /// Returns the total length of the data.
    fn len(&self) -> usize;

    /// Returns `true` if no data remains past the current position.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len().saturating_sub(self.position()) == 0
    }
}

/// Trait for types that support reading operations.
pub trait ReadExt: EndianExt {
    /// Reads exactly N bytes from the current position.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    fn read_exact<const N: usize>(&mut self) -> Result<[u8; N], DataError>;

    /// Reads a slice of the given length from the current position.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    fn read_slice(&mut self, length: usize) -> Result<&[u8], DataError>;

    /// Reads a UTF-8 encoded string of the given length from the current position.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    /// Returns [`InvalidStr`](DataError::InvalidStr) if the bytes are not valid UTF-8.
    #[inline]
    fn read_string(&mut self, length: usize) -> Result<&str, DataError> {
        let slice = self.read_slice(length)?;
        core::str::from_utf8(slice).context(InvalidStrSnafu)
    }

    /// Reads an unsigned 8-bit integer.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_u8(&mut self) -> Result<u8, DataError> {
        Ok(self.read_exact::<1>()?[0])
    }

    /// Reads a signed 8-bit integer.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_i8(&mut self) -> Result<i8, DataError> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads an unsigned 16-bit integer.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_u16(&mut self) -> Result<u16, DataError> {
        let bytes = self.read_exact()?;
        Ok(match self.endian() {
            Endian::Little => u16::from_le_bytes(bytes),
            Endian::Big => u16::from_be_bytes(bytes),
        })
    }

    /// Reads a signed 16-bit integer.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_i16(&mut self) -> Result<i16, DataError> {
        Ok(self.read_u16()? as i16)
    }

    /// Reads an unsigned 32-bit integer.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_u32(&mut self) -> Result<u32, DataError> {
        let bytes = self.read_exact()?;
        Ok(match self.endian() {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        })
    }

    /// Reads a signed 32-bit integer.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_i32(&mut self) -> Result<i32, DataError> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads an unsigned 64-bit integer.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_u64(&mut self) -> Result<u64, DataError> {
        let bytes = self.read_exact()?;
        Ok(match self.endian() {
            Endian::Little => u64::from_le_bytes(bytes),
            Endian::Big => u64::from_be_bytes(bytes),
        })
    }

    /// Reads a signed 64-bit integer.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_i64(&mut self) -> Result<i64, DataError> {
        Ok(self.read_u64()? as i64)
    }

    /// Reads a 32-bit floating point number.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_f32(&mut self) -> Result<f32, DataError> {
        let bytes = self.read_exact()?;
        Ok(match self.endian() {
            Endian::Little => f32::from_le_bytes(bytes),
            Endian::Big => f32::from_be_bytes(bytes),
        })
    }

    /// Reads a 64-bit floating point number.
    ///
    /// # Errors
    /// Returns [`EndOfFile`](DataError::EndOfFile) if trying to read out of bounds.
    #[inline]
    fn read_f64(&mut self) -> Result<f64, DataError> {
        let bytes = self.read_exact()?;
        Ok(match self.endian() {
            Endian::Little => f64::from_le_bytes(bytes),
            Endian::Big => f64::from_be_bytes(bytes),
        })
    }
}

/// A borrowed, in-memory file that allows endian-aware reads.
///
/// This is architected to assume a fixed length. All reads are bounds-checked against the
/// underlying slice, so a position past the end of the data is never an invalid state, it just
/// means the next read returns [`EndOfFile`](DataError::EndOfFile).
#[derive(Debug)]
pub struct DataCursor<'a> {
    data: &'a [u8],
    position: usize,
    endian: Endian,
}

impl<'a> DataCursor<'a> {
    /// Creates a new `DataCursor` with the given data and endianness.
    #[inline]
    #[must_use]
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self { data, position: 0, endian }
    }

    /// Consumes the `DataCursor` and returns the underlying data.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> &'a [u8] {
        self.data
    }
}

impl EndianExt for DataCursor<'_> {
    #[inline]
    fn endian(&self) -> Endian {
        self.endian
    }

    #[inline]
    fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }
}

impl SeekExt for DataCursor<'_> {
    #[inline]
    fn position(&self) -> usize {
        self.position
    }

    #[inline]
    fn set_position(&mut self, position: usize) -> usize {
        self.position = position.min(self.data.len());
        self.position
    }

    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }
}

impl ReadExt for DataCursor<'_> {
    #[inline]
    fn read_exact<const N: usize>(&mut self) -> Result<[u8; N], DataError> {
        let end = self.position.saturating_add(N);
        ensure!(end <= self.data.len(), EndOfFileSnafu);

        let mut result = [0u8; N];
        result.copy_from_slice(&self.data[self.position..end]);
        self.position = end;
        Ok(result)
    }

    #[inline]
    fn read_slice(&mut self, length: usize) -> Result<&[u8], DataError> {
        let end = self.position.saturating_add(length);
        ensure!(end <= self.data.len(), EndOfFileSnafu);

        let result = &self.data[self.position..end];
        self.position = end;
        Ok(result)
    }
}

impl Deref for DataCursor<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endian_aware_reads() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut cursor = DataCursor::new(&data, Endian::Little);
        assert_eq!(cursor.read_u16().unwrap(), 0x0201);
        cursor.set_endian(Endian::Big);
        assert_eq!(cursor.read_u16().unwrap(), 0x0304);
    }

    #[test]
    fn out_of_bounds_read_fails() {
        let data = [0u8; 2];
        let mut cursor = DataCursor::new(&data, Endian::Little);
        assert!(matches!(cursor.read_u32(), Err(DataError::EndOfFile)));
        // The failed read must not consume anything.
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_u16().unwrap(), 0);
    }

    #[test]
    fn set_position_clamps_to_length() {
        let data = [0u8; 4];
        let mut cursor = DataCursor::new(&data, Endian::Little);
        assert_eq!(cursor.set_position(100), 4);
        assert!(cursor.is_empty());
        assert!(cursor.read_u8().is_err());
    }
}
