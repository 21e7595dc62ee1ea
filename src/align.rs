use std::mem;

/// Machine word size in bytes. Every block size and payload address is a
/// multiple of it.
pub const WORD_SIZE: usize = mem::size_of::<usize>();

/// Rounds `value` up to the next multiple of `word`.
///
/// `word` must be a power of two, and `value + word - 1` must not exceed
/// `usize::MAX`. Sizes that come from outside the crate go through
/// [`checked_align_to`] instead.
///
/// # Panics
///
/// On overflow in debug builds. Release builds wrap to a small result.
///
/// # Examples
///
/// ```rust
/// use brkheap::align::align_to;
///
/// assert_eq!(align_to(3, 4), 4);
/// assert_eq!(align_to(12, 8), 16);
/// ```
#[inline]
pub const fn align_to(
  value: usize,
  word: usize,
) -> usize {
  debug_assert!(word.is_power_of_two());
  (value + word - 1) & !(word - 1)
}

/// Rounds `value` up to the machine word.
///
/// Same precondition as [`align_to`]; [`checked_align`] handles untrusted
/// sizes.
#[inline]
pub const fn align(
  value: usize,
) -> usize {
  align_to(value, WORD_SIZE)
}

/// Like [`align_to`], but returns `None` when rounding up would overflow.
#[inline]
pub const fn checked_align_to(
  value: usize,
  word: usize,
) -> Option<usize> {
  debug_assert!(word.is_power_of_two());
  match value.checked_add(word - 1) {
    Some(padded) => Some(padded & !(word - 1)),
    None => None,
  }
}

/// Like [`align`], but returns `None` instead of wrapping around when
/// `value` is within one word of `usize::MAX`.
#[inline]
pub const fn checked_align(
  value: usize,
) -> Option<usize> {
  match value.checked_add(WORD_SIZE - 1) {
    Some(padded) => Some(padded & !(WORD_SIZE - 1)),
    None => None,
  }
}

/// Calculates the machine word alignment for the given size.
///
/// # Examples
///
/// ```rust
/// use brkheap::align;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align::align($value)
  };
}

/// Aligns a size to an explicit power-of-two word.
///
/// ```rust
/// use brkheap::align_to;
///
/// assert_eq!(align_to!(8, 4), 8);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $word:expr) => {
    $crate::align::align_to($value, $word)
  };
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (WORD_SIZE * i + 1)..=(WORD_SIZE * (i + 1));

      let expected_alignment = WORD_SIZE * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_align_to_four_byte_word() {
    assert_eq!(align_to!(3, 4), 4);
    assert_eq!(align_to!(4, 4), 4);
    assert_eq!(align_to!(8, 4), 8);
    assert_eq!(align_to!(12, 4), 12);
    assert_eq!(align_to!(13, 4), 16);
  }

  #[test]
  fn test_align_zero_stays_zero() {
    assert_eq!(align(0), 0);
  }

  #[test]
  fn test_checked_align_overflow() {
    assert_eq!(checked_align(usize::MAX), None);
    assert_eq!(checked_align(usize::MAX - WORD_SIZE + 1), Some(usize::MAX - WORD_SIZE + 1));
    assert_eq!(checked_align(1), Some(WORD_SIZE));
  }

  #[test]
  fn test_checked_align_to_overflow() {
    let page = 4096;
    assert_eq!(checked_align_to(usize::MAX, page), None);
    assert_eq!(checked_align_to(usize::MAX - page + 2, page), None);
    assert_eq!(checked_align_to(usize::MAX - page + 1, page), Some(usize::MAX - page + 1));
    assert_eq!(checked_align_to(5000, page), Some(2 * page));
    assert_eq!(checked_align_to(0, page), Some(0));
  }
}
