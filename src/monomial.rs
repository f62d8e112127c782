use std::hash::{Hash, Hasher};

/// Capability trait for a monomial: an exponent vector over a fixed, externally-owned
/// [`crate::symbol::SymbolSet`].
///
/// Equality is element-wise; `hash_value` must agree with equality (equal monomials hash
/// equally) and should mix bits well enough to spread across an open-addressed table. Monomials
/// carry no symbol names -- position `i` means whatever the enclosing `SymbolSet` says it means.
pub trait Monomial: Clone + PartialEq + Eq + Send + Sync + std::fmt::Debug {
    /// Element-wise exponent addition.
    fn add(&self, other: &Self) -> Self;

    /// A well-mixed hash of the exponent vector.
    fn hash_value(&self) -> u64;

    /// True iff every exponent is zero -- the multiplicative identity monomial.
    fn is_identity(&self) -> bool;

    /// Number of symbols this monomial is defined over.
    fn arity(&self) -> usize;

    /// The identity monomial (all exponents zero) of the given arity.
    fn identity(arity: usize) -> Self;

    /// Builds a monomial that reads exponent `remap[k]` (or zero, if `None`) from `self` into
    /// new position `k`. Used when aligning an operand onto a wider, merged `SymbolSet`.
    fn realign(&self, remap: &[Option<usize>]) -> Self;
}

/// Marker trait for monomial representations whose exponents are fixed-width non-negative
/// integers packed into a machine word. Selecting [`crate::multiplier::kernel::Kernel`]'s
/// specialized path on this trait must never change results relative to the general kernel --
/// only throughput.
pub trait PackedExponents: Monomial {
    /// Raw packed representation, exposed so the kernel can add and hash it directly.
    fn packed_word(&self) -> u64;

    /// Builds a packed monomial back from its raw word and arity.
    fn from_packed_word(word: u64, arity: usize) -> Self;
}

/// General-purpose monomial: one `i32` exponent per symbol, arbitrary arity.
///
/// This is the fallback representation used whenever a monomial does not fit
/// [`PackedMonomial`]'s constraints (arity beyond [`PackedMonomial::MAX_ARITY`], or an exponent
/// that would overflow its per-lane width).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExponentVec(Vec<i32>);

impl ExponentVec {
    /// Builds a monomial directly from an exponent vector.
    pub fn new(exponents: Vec<i32>) -> Self {
        ExponentVec(exponents)
    }

    /// Read access to the raw exponents, in symbol-position order.
    pub fn exponents(&self) -> &[i32] {
        &self.0
    }
}

impl Monomial for ExponentVec {
    fn add(&self, other: &Self) -> Self {
        debug_assert_eq!(self.0.len(), other.0.len(), "monomial arity mismatch in add");
        ExponentVec(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a + b)
                .collect(),
        )
    }

    fn hash_value(&self) -> u64 {
        mix_exponents(self.0.iter().map(|&e| e as i64))
    }

    fn is_identity(&self) -> bool {
        self.0.iter().all(|&e| e == 0)
    }

    fn arity(&self) -> usize {
        self.0.len()
    }

    fn identity(arity: usize) -> Self {
        ExponentVec(vec![0; arity])
    }

    fn realign(&self, remap: &[Option<usize>]) -> Self {
        ExponentVec(
            remap
                .iter()
                .map(|slot| slot.map_or(0, |i| self.0[i]))
                .collect(),
        )
    }
}

impl Hash for ExponentVec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

/// Fixed-arity, non-negative-exponent monomial packed into a single `u64`: up to
/// [`PackedMonomial::MAX_ARITY`] lanes of [`PackedMonomial::LANE_BITS`] bits each.
///
/// Exponents in sparse polynomial multiplication are always non-negative (the sign lives in the
/// coefficient), so an unsigned packed lane is sufficient. Addition is a single wrapping machine
/// word addition rather than `arity` scalar additions; hashing is a single integer mixer applied
/// to the packed word rather than per-exponent hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedMonomial {
    word: u64,
    arity: usize,
}

impl PackedMonomial {
    /// Bits dedicated to each exponent lane.
    pub const LANE_BITS: u32 = 8;
    /// Maximum arity representable in a 64-bit word at [`PackedMonomial::LANE_BITS`] per lane.
    pub const MAX_ARITY: usize = (u64::BITS / Self::LANE_BITS) as usize;
    /// Largest exponent value a single lane can hold.
    pub const MAX_EXPONENT: u32 = (1u32 << Self::LANE_BITS) - 1;

    /// Builds a packed monomial from non-negative exponents, or `None` if `exponents` does not
    /// fit (too many symbols, or an exponent too large for a lane).
    pub fn try_new(exponents: &[u32]) -> Option<Self> {
        if exponents.len() > Self::MAX_ARITY {
            return None;
        }
        let mut word = 0u64;
        for (i, &e) in exponents.iter().enumerate() {
            if e > Self::MAX_EXPONENT {
                return None;
            }
            word |= (e as u64) << (i as u32 * Self::LANE_BITS);
        }
        Some(PackedMonomial {
            word,
            arity: exponents.len(),
        })
    }

    /// Unpacks back into a plain exponent vector, in symbol-position order.
    pub fn exponents(&self) -> Vec<u32> {
        (0..self.arity)
            .map(|i| ((self.word >> (i as u32 * Self::LANE_BITS)) & Self::MAX_EXPONENT as u64) as u32)
            .collect()
    }

    /// True if a lane-wise add of `self` and `other` would overflow any lane into its neighbour.
    fn add_would_overflow(&self, other: &Self) -> bool {
        for i in 0..self.arity {
            let shift = i as u32 * Self::LANE_BITS;
            let a = (self.word >> shift) & Self::MAX_EXPONENT as u64;
            let b = (other.word >> shift) & Self::MAX_EXPONENT as u64;
            if a + b > Self::MAX_EXPONENT as u64 {
                return true;
            }
        }
        false
    }
}

impl Monomial for PackedMonomial {
    fn add(&self, other: &Self) -> Self {
        debug_assert_eq!(self.arity, other.arity, "monomial arity mismatch in add");
        debug_assert!(
            !self.add_would_overflow(other),
            "packed monomial lane overflow; caller should have fallen back to ExponentVec"
        );
        PackedMonomial {
            // Lane-wise add as a single wrapping word addition: safe because
            // `add_would_overflow` (checked above in debug builds) guarantees no lane carries
            // into its neighbour.
            word: self.word.wrapping_add(other.word),
            arity: self.arity,
        }
    }

    fn hash_value(&self) -> u64 {
        mix_u64(self.word ^ ((self.arity as u64) << 56))
    }

    fn is_identity(&self) -> bool {
        self.word == 0
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn identity(arity: usize) -> Self {
        PackedMonomial { word: 0, arity }
    }

    fn realign(&self, remap: &[Option<usize>]) -> Self {
        let exponents = self.exponents();
        let realigned: Vec<u32> = remap
            .iter()
            .map(|slot| slot.map_or(0, |i| exponents[i]))
            .collect();
        PackedMonomial::try_new(&realigned)
            .expect("realigning within MAX_ARITY/MAX_EXPONENT bounds cannot overflow a packed word")
    }
}

impl PackedExponents for PackedMonomial {
    fn packed_word(&self) -> u64 {
        self.word
    }

    fn from_packed_word(word: u64, arity: usize) -> Self {
        PackedMonomial { word, arity }
    }
}

impl Hash for PackedMonomial {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

/// Splits the bits of a 64-bit mixer (the fixed-point SplitMix64 finalizer) to turn a packed
/// word into a well-distributed hash in one step.
fn mix_u64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^= x >> 31;
    x
}

/// Combines an arbitrary number of exponents into a single well-mixed hash.
fn mix_exponents(exponents: impl Iterator<Item = i64>) -> u64 {
    let mut acc: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis, reused as a seed.
    for e in exponents {
        acc ^= e as u64;
        acc = mix_u64(acc);
    }
    acc
}
