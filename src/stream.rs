use crate::error::{FontError, Result};

/// A cursor over a borrowed byte slice with typed big-endian reads.
///
/// Mirrors the OpenType/TrueType data types used across the table decoders:
/// 8/16/24/32-bit integers, 16.16 fixed-point, 2.14 fixed-point, 4-byte tags.
/// The reader never owns the underlying bytes, so it is cheap to fork a
/// sub-reader bounded to a table's own region via [`Reader::sub_reader`].
#[derive(Clone, Copy)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(FontError::TruncatedTable {
                offset: pos,
                needed: 0,
                available: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, bytes: usize) -> Result<()> {
        self.set_position(self.pos + bytes)
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// A sub-reader over `[offset, offset+len)` of the *original* buffer, positioned at 0.
    /// Used to scope a reader to a subtable reached via an offset without copying.
    pub fn sub_reader(&self, offset: usize, len: usize) -> Result<Reader<'a>> {
        let end = offset.checked_add(len).ok_or(FontError::TruncatedTable {
            offset,
            needed: len,
            available: self.data.len(),
        })?;
        let slice = self.data.get(offset..end).ok_or(FontError::TruncatedTable {
            offset,
            needed: len,
            available: self.data.len(),
        })?;
        Ok(Reader::new(slice))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos + len;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or(FontError::TruncatedTable {
                offset: self.pos,
                needed: len,
                available: self.data.len().saturating_sub(self.pos),
            })?;
        self.pos = end;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_u8().map(|b| b as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_u16().map(|v| v as i16)
    }

    pub fn read_u24(&mut self) -> Result<u32> {
        let b = self.take(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_u32().map(|v| v as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    /// 16.16 fixed-point.
    pub fn read_fixed(&mut self) -> Result<f32> {
        self.read_i32().map(|i| i as f32 / 65536.0)
    }

    /// 2.14 fixed-point, used by compound-glyph transforms and variation tuples.
    pub fn read_f2dot14(&mut self) -> Result<f32> {
        self.read_i16().map(|i| i as f32 / 16384.0)
    }

    pub fn read_long_datetime(&mut self) -> Result<u64> {
        self.read_u64()
    }

    pub fn read_tag(&mut self) -> Result<[u8; 4]> {
        let b = self.take(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }
}

/// Calculates the SFNT table checksum: a wrapping sum of 4-byte big-endian
/// words, zero-padding any trailing partial word.
pub fn calculate_checksum(data: &[u8]) -> u32 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        sum = sum.wrapping_add(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    let rem = chunks.remainder();
    if !rem.is_empty() {
        let mut last = [0u8; 4];
        last[..rem.len()].copy_from_slice(rem);
        sum = sum.wrapping_add(u32::from_be_bytes(last));
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_integers() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];
        let mut r = Reader::new(&data);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0x56789ABC);
        assert_eq!(r.read_u8().unwrap(), 0xDE);
    }

    #[test]
    fn fails_past_bounds() {
        let data = [0x01];
        let mut r = Reader::new(&data);
        r.read_u8().unwrap();
        assert!(r.read_u8().is_err());
    }

    #[test]
    fn fixed_and_f2dot14() {
        let data = [0x00, 0x01, 0x00, 0x00];
        let mut r = Reader::new(&data);
        assert!((r.read_fixed().unwrap() - 1.0).abs() < 1e-6);

        let data = [0x40, 0x00];
        let mut r = Reader::new(&data);
        assert!((r.read_f2dot14().unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sub_reader_is_scoped_and_zero_based() {
        let data = [0, 0, 1, 2, 3, 4];
        let r = Reader::new(&data);
        let mut sub = r.sub_reader(2, 3).unwrap();
        assert_eq!(sub.read_u8().unwrap(), 1);
        assert_eq!(sub.remaining(), 2);
    }

    #[test]
    fn checksum_matches_known_values() {
        assert_eq!(calculate_checksum(&[0x12, 0x34, 0x56, 0x78]), 0x12345678);
        assert_eq!(calculate_checksum(&[0x12, 0x34, 0x56]), 0x12345600);
        assert_eq!(calculate_checksum(&[]), 0);
    }
}
