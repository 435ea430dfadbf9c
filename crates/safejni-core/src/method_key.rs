//! Deterministic cache keys for resolved methods.
//!
//! A [`MethodKey`] is computed from the class name, method name, signature and
//! static flag using XXHash64 with domain-specific mixing constants, the same
//! way for every call site. Keys are only a lookup accelerator: the cache
//! compares the stored names on a hit, so a collision can never return the
//! wrong method.
//!
//! ```
//! use safejni_core::MethodKey;
//!
//! let a = MethodKey::new("com/example/Foo", "bar", "()V", true);
//! let b = MethodKey::new("com/example/Foo", "bar", "()V", false);
//! assert_ne!(a, b);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants.
pub mod key_constants {
    /// Separator between name components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for static methods.
    pub const STATIC: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for instance methods and constructors.
    pub const INSTANCE: u64 = 0x7d3c8b4a92e15f6d;

    /// Position markers, so that `("ab", "c")` and `("a", "bc")` differ.
    pub const PART_MARKERS: [u64; 3] = [0x9e3779b97f4a7c15, 0xbf58476d1ce4e5b9, 0x94d049bb133111eb];
}

/// A 64-bit key identifying `(class, method, signature, is_static)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct MethodKey(pub u64);

impl MethodKey {
    /// Compute the key for a method.
    #[inline]
    pub fn new(class: &str, method: &str, signature: &str, is_static: bool) -> Self {
        let domain = if is_static {
            key_constants::STATIC
        } else {
            key_constants::INSTANCE
        };
        let mut hash = domain;
        for (marker, part) in key_constants::PART_MARKERS.iter().zip([class, method, signature]) {
            hash = hash
                .wrapping_mul(key_constants::SEP)
                .wrapping_add(marker ^ xxh64(part.as_bytes(), 0));
        }
        MethodKey(hash)
    }

    /// Get the underlying value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodKey({:#018x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = MethodKey::new("a/B", "run", "()V", false);
        let b = MethodKey::new("a/B", "run", "()V", false);
        assert_eq!(a, b);
    }

    #[test]
    fn static_flag_matters() {
        assert_ne!(
            MethodKey::new("a/B", "run", "()V", false),
            MethodKey::new("a/B", "run", "()V", true)
        );
    }

    #[test]
    fn signature_matters() {
        assert_ne!(
            MethodKey::new("a/B", "run", "()V", true),
            MethodKey::new("a/B", "run", "(I)V", true)
        );
    }

    #[test]
    fn component_boundaries_matter() {
        assert_ne!(
            MethodKey::new("a/Bc", "d", "()V", true),
            MethodKey::new("a/B", "cd", "()V", true)
        );
        assert_ne!(
            MethodKey::new("x", "y", "z", true),
            MethodKey::new("y", "x", "z", true)
        );
    }

    #[test]
    fn debug_format() {
        let key = MethodKey(0xab);
        assert_eq!(format!("{key:?}"), "MethodKey(0x00000000000000ab)");
        assert_eq!(key.as_u64(), 0xab);
    }
}
