//! Raw handles handed out by a JNI backend.
//!
//! Both handles are opaque non-null addresses. The backend decides what they
//! point to; the bridge only stores, compares and passes them back.

use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroUsize;

/// A non-null object reference (local or global) as issued by the backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawObject(NonZeroUsize);

impl RawObject {
    /// Wrap a raw `jobject`, returning `None` for the null reference.
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(ptr.expose_provenance()).map(Self)
    }

    /// Build a handle from an address. Backends that hand out synthetic
    /// handles (slot indices, generations) use this directly.
    pub const fn from_addr(addr: NonZeroUsize) -> Self {
        Self(addr)
    }

    /// The raw `jobject` pointer.
    pub fn as_ptr(self) -> *mut c_void {
        std::ptr::with_exposed_provenance_mut(self.0.get())
    }

    /// The handle's address.
    pub const fn addr(self) -> NonZeroUsize {
        self.0
    }

    /// Convert an optional handle to the raw pointer, mapping `None` to null.
    pub fn option_as_ptr(obj: Option<Self>) -> *mut c_void {
        obj.map_or(std::ptr::null_mut(), Self::as_ptr)
    }
}

impl fmt::Debug for RawObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawObject({:#x})", self.0)
    }
}

/// A resolved method identifier.
///
/// Method IDs stay valid for as long as their declaring class is loaded, which
/// the resolver guarantees by pinning the class with a global reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(NonZeroUsize);

impl MethodId {
    /// Wrap a raw `jmethodID`, returning `None` for null.
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(ptr.expose_provenance()).map(Self)
    }

    /// Build an ID from an address.
    pub const fn from_addr(addr: NonZeroUsize) -> Self {
        Self(addr)
    }

    /// The raw `jmethodID` pointer.
    pub fn as_ptr(self) -> *mut c_void {
        std::ptr::with_exposed_provenance_mut(self.0.get())
    }

    /// The ID's address.
    pub const fn addr(self) -> NonZeroUsize {
        self.0
    }
}

impl fmt::Debug for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodId({:#x})", self.0)
    }
}
