//! Constant-buffer layout policy.
//!
//! Constant-buffer views must start on a 256-byte boundary, so every element
//! of a per-frame constant array is laid out at a multiple of 256 bytes.

/// Minimum constant-buffer sub-allocation granularity, in bytes.
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// Round `byte_size` up to the next multiple of [`CONSTANT_BUFFER_ALIGNMENT`].
///
/// Total over all inputs; zero stays zero.
///
/// ```
/// use strata_graphics::alignment::constant_buffer_byte_size;
///
/// assert_eq!(constant_buffer_byte_size(300), 512);
/// assert_eq!(constant_buffer_byte_size(256), 256);
/// assert_eq!(constant_buffer_byte_size(0), 0);
/// ```
#[inline]
pub fn constant_buffer_byte_size(byte_size: u32) -> u64 {
    align_up(byte_size as u64, CONSTANT_BUFFER_ALIGNMENT)
}

/// Align a value up to the given power-of-two alignment.
///
/// `value` must not exceed `u64::MAX - (alignment - 1)`; use
/// [`checked_align_up`] for sizes that come from callers.
#[inline]
pub fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Like [`align_up`], but `None` if the aligned value does not fit in a `u64`.
#[inline]
pub fn checked_align_up(value: u64, alignment: u64) -> Option<u64> {
    debug_assert!(alignment.is_power_of_two());
    value
        .checked_add(alignment - 1)
        .map(|v| v & !(alignment - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0)]
    #[case(1, 256)]
    #[case(255, 256)]
    #[case(256, 256)]
    #[case(257, 512)]
    #[case(300, 512)]
    #[case(u32::MAX, 4_294_967_296)]
    fn test_constant_buffer_byte_size(#[case] input: u32, #[case] expected: u64) {
        assert_eq!(constant_buffer_byte_size(input), expected);
    }

    #[test]
    fn test_alignment_properties() {
        for size in (0..4096u32).chain([65_535, 1 << 20, u32::MAX - 1]) {
            let aligned = constant_buffer_byte_size(size);
            assert_eq!(aligned % CONSTANT_BUFFER_ALIGNMENT, 0);
            assert!(aligned >= size as u64);
            assert!(aligned - (size as u64) < CONSTANT_BUFFER_ALIGNMENT);
        }
    }

    #[rstest]
    #[case(0, 4, 0)]
    #[case(5, 4, 8)]
    #[case(8, 4, 8)]
    #[case(100, 64, 128)]
    fn test_align_up(#[case] value: u64, #[case] alignment: u64, #[case] expected: u64) {
        assert_eq!(align_up(value, alignment), expected);
        assert_eq!(checked_align_up(value, alignment), Some(expected));
    }

    #[test]
    fn test_checked_align_up_near_max() {
        assert_eq!(checked_align_up(u64::MAX, 4), None);
        assert_eq!(checked_align_up(u64::MAX - 2, 4), None);
        assert_eq!(checked_align_up(u64::MAX - 3, 4), Some(u64::MAX - 3));
        assert_eq!(checked_align_up(u64::MAX, 1), Some(u64::MAX));
    }
}
