//! Variable-length quantities: 7 bits per byte, most significant group
//! first, high bit set on every byte except the last.

use crate::cursor::ByteCursor;
use crate::FormatError;

/// Decode one VLQ from the cursor.
pub fn read_vlq(cur: &mut ByteCursor) -> Result<u32, FormatError> {
    let mut value: u32 = 0;
    loop {
        let byte = match cur.next_u8() {
            Ok(byte) => byte,
            // A VLQ cut off mid-number means a length field upstream lied.
            Err(FormatError::EndOfTrack { offset }) => {
                return Err(FormatError::TruncatedStream { offset, wanted: 1 })
            }
            Err(other) => return Err(other),
        };
        value = (value << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
}

/// Append the minimal VLQ encoding of `value` to `buf`. Zero encodes as
/// a single zero byte.
pub fn write_vlq(mut value: u32, buf: &mut Vec<u8>) {
    let mut groups = [0u8; 5];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7F) as u8;
        value >>= 7;
        n += 1;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i > 0 { 0x80 } else { 0 };
        buf.push(groups[i] | continuation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        write_vlq(value, &mut buf);
        buf
    }

    fn decode(bytes: &[u8]) -> Result<u32, FormatError> {
        read_vlq(&mut ByteCursor::new(bytes, 0))
    }

    #[test]
    fn known_encodings() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(0x40), vec![0x40]);
        assert_eq!(encode(0x7F), vec![0x7F]);
        assert_eq!(encode(0x80), vec![0x81, 0x00]);
        assert_eq!(encode(0x2000), vec![0xC0, 0x00]);
        assert_eq!(encode(0x3FFF), vec![0xFF, 0x7F]);
        assert_eq!(encode(0x0FFF_FFFF), vec![0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn round_trip_boundaries() {
        // byte-count boundaries of the format's practical range [0, 2^28)
        let samples = [
            0u32, 1, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1F_FFFF, 0x20_0000, 0x0FFF_FFFE, 0x0FFF_FFFF,
        ];
        for value in samples {
            assert_eq!(decode(&encode(value)), Ok(value), "value {:#x}", value);
        }
    }

    #[test]
    fn decode_consumes_exactly_one_quantity() {
        let mut cur = ByteCursor::new(&[0x81, 0x00, 0x05], 0);
        assert_eq!(read_vlq(&mut cur), Ok(0x80));
        assert_eq!(read_vlq(&mut cur), Ok(0x05));
        assert!(!cur.has_more());
    }

    #[test]
    fn truncated_quantity() {
        assert_eq!(
            decode(&[0x81]),
            Err(FormatError::TruncatedStream {
                offset: 1,
                wanted: 1
            })
        );
    }
}
