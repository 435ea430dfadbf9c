//! Compile-time JNI type descriptors.
//!
//! Every supported native type implements [`JavaType`], which pins its JNI
//! descriptor as an associated constant. Method signatures are assembled from
//! those constants inside [`Signature`], so deriving the signature of a call is
//! done entirely by the compiler: the dispatcher only reads a `'static` string.
//!
//! A type without a [`JavaType`] implementation cannot appear in a call at all:
//!
//! ```compile_fail
//! use safejni_core::{Signature, JavaType};
//!
//! struct Unsupported;
//! let _ = Signature::<i32, (Unsupported,)>::get();
//! ```
//!
//! # Grammar
//!
//! ```text
//! signature  := "(" descriptor* ")" descriptor
//! descriptor := "Z" | "B" | "C" | "S" | "I" | "J" | "F" | "D" | "V"
//!             | "L" class-name ";" | "[" descriptor
//! ```

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Maximum length of an assembled descriptor.
///
/// Exceeding it while building a [`Signature`] fails constant evaluation, so
/// the error surfaces at compile time.
pub const MAX_DESCRIPTOR_LEN: usize = 256;

/// A descriptor string built in constant context.
#[derive(Clone, Copy)]
pub struct Descriptor {
    bytes: [u8; MAX_DESCRIPTOR_LEN],
    len: usize,
}

impl Descriptor {
    /// Create an empty descriptor.
    pub const fn new() -> Self {
        Self {
            bytes: [0; MAX_DESCRIPTOR_LEN],
            len: 0,
        }
    }

    /// Append a string fragment.
    pub const fn push(mut self, part: &str) -> Self {
        let src = part.as_bytes();
        let mut i = 0;
        while i < src.len() {
            assert!(self.len < MAX_DESCRIPTOR_LEN, "JNI descriptor exceeds MAX_DESCRIPTOR_LEN");
            self.bytes[self.len] = src[i];
            self.len += 1;
            i += 1;
        }
        self
    }

    /// Append another descriptor.
    pub const fn append(mut self, other: &Descriptor) -> Self {
        let mut i = 0;
        while i < other.len {
            assert!(self.len < MAX_DESCRIPTOR_LEN, "JNI descriptor exceeds MAX_DESCRIPTOR_LEN");
            self.bytes[self.len] = other.bytes[i];
            self.len += 1;
            i += 1;
        }
        self
    }

    /// Number of bytes in the descriptor.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been pushed yet.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// View the descriptor as a string slice.
    pub fn as_str(&self) -> &str {
        // SAFETY: bytes are only ever copied whole from `&str` fragments or
        // from other descriptors built the same way, so the prefix is UTF-8.
        unsafe { std::str::from_utf8_unchecked(&self.bytes[..self.len]) }
    }
}

impl Default for Descriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Descriptor({:?})", self.as_str())
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Descriptor {}

impl PartialEq<str> for Descriptor {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Descriptor {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// How values of a type cross the boundary.
///
/// The dispatcher keys argument tracking and result handling on this, and it
/// is known per type at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    /// No value (`V`), return position only.
    Void,
    /// Passed and returned by value, never allocates a reference.
    Primitive,
    /// Backed by a managed object or array that needs a local reference.
    Reference,
    /// Native address smuggled through a `long`.
    Pointer,
}

impl TypeCategory {
    /// Whether marshaling a value of this category creates a local reference.
    pub const fn is_reference(self) -> bool {
        matches!(self, TypeCategory::Reference)
    }
}

/// A native type with a fixed JNI descriptor.
///
/// # Example
///
/// ```
/// use safejni_core::JavaType;
///
/// assert_eq!(<i32 as JavaType>::DESCRIPTOR, "I");
/// assert_eq!(<String as JavaType>::DESCRIPTOR, "Ljava/lang/String;");
/// assert_eq!(<&[u8] as JavaType>::DESCRIPTOR, "[B");
/// ```
pub trait JavaType {
    /// The JNI descriptor.
    const DESCRIPTOR: &'static str;

    /// How the value crosses the boundary.
    const CATEGORY: TypeCategory;
}

macro_rules! java_type {
    ($($ty:ty => $desc:literal, $cat:ident;)*) => {
        $(
            impl JavaType for $ty {
                const DESCRIPTOR: &'static str = $desc;
                const CATEGORY: TypeCategory = TypeCategory::$cat;
            }
        )*
    };
}

java_type! {
    () => "V", Void;
    bool => "Z", Primitive;
    i8 => "B", Primitive;
    u16 => "C", Primitive;
    i16 => "S", Primitive;
    i32 => "I", Primitive;
    i64 => "J", Primitive;
    f32 => "F", Primitive;
    f64 => "D", Primitive;
    str => "Ljava/lang/String;", Reference;
    String => "Ljava/lang/String;", Reference;
    [String] => "[Ljava/lang/String;", Reference;
    Vec<String> => "[Ljava/lang/String;", Reference;
    [u8] => "[B", Reference;
    Vec<u8> => "[B", Reference;
    [f32] => "[F", Reference;
    Vec<f32> => "[F", Reference;
}

impl JavaType for [&str] {
    const DESCRIPTOR: &'static str = "[Ljava/lang/String;";
    const CATEGORY: TypeCategory = TypeCategory::Reference;
}

impl<S> JavaType for HashMap<String, String, S> {
    const DESCRIPTOR: &'static str = "Ljava/util/HashMap;";
    const CATEGORY: TypeCategory = TypeCategory::Reference;
}

// Native addresses travel as `long`; the managed side never sees a typed object.
impl<T> JavaType for *const T {
    const DESCRIPTOR: &'static str = "J";
    const CATEGORY: TypeCategory = TypeCategory::Pointer;
}

impl<T> JavaType for *mut T {
    const DESCRIPTOR: &'static str = "J";
    const CATEGORY: TypeCategory = TypeCategory::Pointer;
}

impl<T: JavaType + ?Sized> JavaType for &T {
    const DESCRIPTOR: &'static str = T::DESCRIPTOR;
    const CATEGORY: TypeCategory = T::CATEGORY;
}

/// A tuple of argument types.
///
/// Implemented for tuples of up to eight [`JavaType`] elements; `()` is the
/// empty argument list.
pub trait ArgTypes {
    /// Number of arguments.
    const COUNT: usize;

    /// Number of arguments whose marshaling creates a local reference.
    const REFERENCES: usize;

    /// Concatenated argument descriptors, in declaration order.
    const DESCRIPTORS: Descriptor;
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_arg_types {
    ($($name:ident),*) => {
        impl<$($name: JavaType),*> ArgTypes for ($($name,)*) {
            const COUNT: usize = count!($($name)*);
            const REFERENCES: usize =
                0 $(+ <$name as JavaType>::CATEGORY.is_reference() as usize)*;
            const DESCRIPTORS: Descriptor =
                Descriptor::new() $(.push(<$name as JavaType>::DESCRIPTOR))*;
        }
    };
}

impl_arg_types!();
impl_arg_types!(A);
impl_arg_types!(A, B);
impl_arg_types!(A, B, C);
impl_arg_types!(A, B, C, D);
impl_arg_types!(A, B, C, D, E);
impl_arg_types!(A, B, C, D, E, F);
impl_arg_types!(A, B, C, D, E, F, G);
impl_arg_types!(A, B, C, D, E, F, G, H);

/// The JNI signature of a method returning `R` and taking arguments `A`.
///
/// ```
/// use safejni_core::Signature;
///
/// assert_eq!(
///     Signature::<String, (&str, &str)>::get(),
///     "(Ljava/lang/String;Ljava/lang/String;)Ljava/lang/String;"
/// );
/// assert_eq!(Signature::<(), ()>::get(), "()V");
/// ```
pub struct Signature<R: ?Sized, A>(PhantomData<fn(A) -> PhantomData<R>>);

impl<R: JavaType + ?Sized, A: ArgTypes> Signature<R, A> {
    /// The assembled signature.
    pub const DESCRIPTOR: Descriptor = Descriptor::new()
        .push("(")
        .append(&A::DESCRIPTORS)
        .push(")")
        .push(R::DESCRIPTOR);

    /// The signature as a `'static` string.
    pub fn get() -> &'static str {
        let descriptor: &'static Descriptor = &Self::DESCRIPTOR;
        descriptor.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_descriptors() {
        assert_eq!(<bool as JavaType>::DESCRIPTOR, "Z");
        assert_eq!(<i8 as JavaType>::DESCRIPTOR, "B");
        assert_eq!(<u16 as JavaType>::DESCRIPTOR, "C");
        assert_eq!(<i16 as JavaType>::DESCRIPTOR, "S");
        assert_eq!(<i32 as JavaType>::DESCRIPTOR, "I");
        assert_eq!(<i64 as JavaType>::DESCRIPTOR, "J");
        assert_eq!(<f32 as JavaType>::DESCRIPTOR, "F");
        assert_eq!(<f64 as JavaType>::DESCRIPTOR, "D");
        assert_eq!(<() as JavaType>::DESCRIPTOR, "V");
    }

    #[test]
    fn reference_descriptors() {
        assert_eq!(<&str as JavaType>::DESCRIPTOR, "Ljava/lang/String;");
        assert_eq!(<Vec<String> as JavaType>::DESCRIPTOR, "[Ljava/lang/String;");
        assert_eq!(<&[&str] as JavaType>::DESCRIPTOR, "[Ljava/lang/String;");
        assert_eq!(<Vec<u8> as JavaType>::DESCRIPTOR, "[B");
        assert_eq!(<&[f32] as JavaType>::DESCRIPTOR, "[F");
        assert_eq!(<HashMap<String, String> as JavaType>::DESCRIPTOR, "Ljava/util/HashMap;");
    }

    #[test]
    fn pointers_are_longs() {
        assert_eq!(<*const u8 as JavaType>::DESCRIPTOR, "J");
        assert_eq!(<*mut Descriptor as JavaType>::DESCRIPTOR, "J");
        assert_eq!(<*mut u8 as JavaType>::CATEGORY, TypeCategory::Pointer);
    }

    #[test]
    fn references_inherit_from_target() {
        assert_eq!(<&String as JavaType>::CATEGORY, TypeCategory::Reference);
        assert_eq!(<&i32 as JavaType>::CATEGORY, TypeCategory::Primitive);
        assert_eq!(<&&str as JavaType>::DESCRIPTOR, "Ljava/lang/String;");
    }

    #[test]
    fn descriptor_push_and_append() {
        let inner = Descriptor::new().push("I").push("J");
        let outer = Descriptor::new().push("(").append(&inner).push(")V");
        assert_eq!(outer.as_str(), "(IJ)V");
        assert_eq!(outer.len(), 5);
        assert!(!outer.is_empty());
        assert!(Descriptor::new().is_empty());
    }

    #[test]
    fn descriptor_equality_ignores_capacity_tail() {
        let a = Descriptor::new().push("[B");
        let b = Descriptor::new().push("[").push("B");
        assert_eq!(a, b);
        assert_eq!(a, "[B");
        assert_eq!(format!("{a}"), "[B");
        assert_eq!(format!("{a:?}"), "Descriptor(\"[B\")");
    }

    #[test]
    fn arg_counts() {
        assert_eq!(<() as ArgTypes>::COUNT, 0);
        assert_eq!(<(i32,) as ArgTypes>::COUNT, 1);
        assert_eq!(<(i32, &str, Vec<u8>) as ArgTypes>::COUNT, 3);
        assert_eq!(
            <(i32, i32, i32, i32, i32, i32, i32, i32) as ArgTypes>::COUNT,
            8
        );
    }

    #[test]
    fn reference_counts() {
        assert_eq!(<() as ArgTypes>::REFERENCES, 0);
        assert_eq!(<(i32, f64) as ArgTypes>::REFERENCES, 0);
        assert_eq!(<(i32, &str, Vec<u8>) as ArgTypes>::REFERENCES, 2);
        assert_eq!(<(*mut u8, String) as ArgTypes>::REFERENCES, 1);
    }

    #[test]
    fn signature_two_strings_to_string() {
        assert_eq!(
            Signature::<String, (String, String)>::get(),
            "(Ljava/lang/String;Ljava/lang/String;)Ljava/lang/String;"
        );
    }

    #[test]
    fn signature_string_array_round_trip() {
        assert_eq!(
            Signature::<Vec<String>, (Vec<String>,)>::get(),
            "([Ljava/lang/String;)[Ljava/lang/String;"
        );
    }

    #[test]
    fn signature_bytes_to_int() {
        assert_eq!(Signature::<i32, (&[u8],)>::get(), "([B)I");
        assert_eq!(Signature::<Vec<u8>, (Vec<u8>, i32)>::get(), "([BI)[B");
    }

    #[test]
    fn signature_void_and_empty() {
        assert_eq!(Signature::<(), ()>::get(), "()V");
        assert_eq!(Signature::<(), (&str,)>::get(), "(Ljava/lang/String;)V");
        assert_eq!(Signature::<String, ()>::get(), "()Ljava/lang/String;");
    }

    #[test]
    fn signature_all_primitives_in_order() {
        assert_eq!(
            Signature::<f64, (bool, i8, u16, i16, i32, i64, f32, f64)>::get(),
            "(ZBCSIJFD)D"
        );
    }

    #[test]
    fn signature_pointer_arguments() {
        assert_eq!(Signature::<*mut u8, (*const u8, i32)>::get(), "(JI)J");
    }

    #[test]
    fn signature_is_stable_across_calls() {
        let first = Signature::<i32, (&str,)>::get();
        let second = Signature::<i32, (&str,)>::get();
        assert_eq!(first, second);
        assert_eq!(first.as_ptr(), second.as_ptr());
    }
}
