//! Fixed-width storage words for packed bit planes.

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
}

/// Unsigned storage word for packed template rows.
///
/// Implemented for `u8`, `u16`, `u32` and `u64`; the word width only changes
/// how many words a row occupies, never the bit layout (column 0 stays the
/// most significant bit of word 0). `Send + Sync` so databases can be shared
/// across worker threads.
pub trait Word:
    sealed::Sealed
    + Copy
    + Eq
    + Send
    + Sync
    + std::fmt::Debug
    + std::ops::BitAnd<Output = Self>
    + std::ops::BitOr<Output = Self>
    + std::ops::BitXor<Output = Self>
    + std::ops::Not<Output = Self>
    + std::ops::Shl<u32, Output = Self>
    + std::ops::Shr<u32, Output = Self>
{
    /// Number of bits in the word.
    const BITS: usize;
    /// The all-zero word.
    const ZERO: Self;
    /// The all-one word.
    const ONES: Self;
    /// A word with only the least significant bit set.
    const LSB: Self;

    /// Number of set bits.
    fn popcount(self) -> u32;
}

macro_rules! impl_word {
    ($($ty:ty),+) => {
        $(impl Word for $ty {
            const BITS: usize = <$ty>::BITS as usize;
            const ZERO: Self = 0;
            const ONES: Self = <$ty>::MAX;
            const LSB: Self = 1;

            #[inline]
            fn popcount(self) -> u32 {
                self.count_ones()
            }
        })+
    };
}

impl_word!(u8, u16, u32, u64);
