//! Integer PCM sample encoding
//!
//! Signed samples at 8, 16 or 32 bits in either byte order. Any other depth
//! is rejected with [`AudioError::UnsupportedBitDepth`].

use super::error::{AudioError, AudioResult};
use crate::types::Sample;

/// Bytes per sample for a supported bit depth
pub fn sample_bytes(bits: u16) -> AudioResult<usize> {
    match bits {
        8 | 16 | 32 => Ok((bits / 8) as usize),
        other => Err(AudioError::UnsupportedBitDepth(other)),
    }
}

/// Saturate a mixed sum to the range representable at `bits`
pub fn clamp_sample(value: i64, bits: u16) -> AudioResult<Sample> {
    let clamped = match bits {
        8 => value.clamp(i8::MIN as i64, i8::MAX as i64),
        16 => value.clamp(i16::MIN as i64, i16::MAX as i64),
        32 => value.clamp(i32::MIN as i64, i32::MAX as i64),
        other => return Err(AudioError::UnsupportedBitDepth(other)),
    };
    Ok(clamped as Sample)
}

/// Write one sample into `out` (exactly `bits / 8` bytes)
///
/// The value is truncated to the target width; clamp first with
/// [`clamp_sample`] when it may be out of range.
pub fn encode_sample(
    value: Sample,
    bits: u16,
    big_endian: bool,
    out: &mut [u8],
) -> AudioResult<()> {
    match (bits, big_endian) {
        (8, _) => out[0] = value as i8 as u8,
        (16, false) => out[..2].copy_from_slice(&(value as i16).to_le_bytes()),
        (16, true) => out[..2].copy_from_slice(&(value as i16).to_be_bytes()),
        (32, false) => out[..4].copy_from_slice(&value.to_le_bytes()),
        (32, true) => out[..4].copy_from_slice(&value.to_be_bytes()),
        (other, _) => return Err(AudioError::UnsupportedBitDepth(other)),
    }
    Ok(())
}

/// Read one sample from the first `bits / 8` bytes of `bytes`
pub fn decode_sample(bytes: &[u8], bits: u16, big_endian: bool) -> AudioResult<Sample> {
    let value = match (bits, big_endian) {
        (8, _) => bytes[0] as i8 as Sample,
        (16, false) => i16::from_le_bytes([bytes[0], bytes[1]]) as Sample,
        (16, true) => i16::from_be_bytes([bytes[0], bytes[1]]) as Sample,
        (32, false) => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        (32, true) => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        (other, _) => return Err(AudioError::UnsupportedBitDepth(other)),
    };
    Ok(value)
}

/// Full-scale value used to normalize samples of `bits` to [-1, 1]
pub fn full_scale(bits: u16) -> f32 {
    (1u64 << (bits.clamp(1, 32) - 1)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_depths() {
        for bits in [0, 12, 24, 64] {
            assert!(matches!(
                sample_bytes(bits),
                Err(AudioError::UnsupportedBitDepth(b)) if b == bits
            ));
            assert!(clamp_sample(0, bits).is_err());
            assert!(encode_sample(0, bits, false, &mut [0; 8]).is_err());
            assert!(decode_sample(&[0; 8], bits, false).is_err());
        }
    }

    #[test]
    fn test_clamp_saturates() {
        assert_eq!(clamp_sample(40000, 16).unwrap(), 32767);
        assert_eq!(clamp_sample(-40000, 16).unwrap(), -32768);
        assert_eq!(clamp_sample(200, 8).unwrap(), 127);
        assert_eq!(clamp_sample(-200, 8).unwrap(), -128);
        assert_eq!(clamp_sample(i64::MAX, 32).unwrap(), i32::MAX);
        assert_eq!(clamp_sample(1234, 16).unwrap(), 1234);
    }

    #[test]
    fn test_byte_order() {
        let mut out = [0u8; 2];
        encode_sample(0x1234, 16, false, &mut out).unwrap();
        assert_eq!(out, [0x34, 0x12]);
        encode_sample(0x1234, 16, true, &mut out).unwrap();
        assert_eq!(out, [0x12, 0x34]);

        let mut out = [0u8; 4];
        encode_sample(-2, 32, true, &mut out).unwrap();
        assert_eq!(out, [0xff, 0xff, 0xff, 0xfe]);
        assert_eq!(decode_sample(&out, 32, true).unwrap(), -2);
    }

    #[test]
    fn test_eight_bit_is_signed() {
        let mut out = [0u8; 1];
        encode_sample(-1, 8, false, &mut out).unwrap();
        assert_eq!(out, [0xff]);
        assert_eq!(decode_sample(&out, 8, true).unwrap(), -1);
    }
}
