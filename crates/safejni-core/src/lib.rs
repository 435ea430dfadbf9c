//! Core types for the safejni bridge.
//!
//! This crate holds everything that does not depend on a live JVM:
//!
//! - [`Descriptor`], [`JavaType`] and [`Signature`] - the compile-time type
//!   signature registry
//! - [`Env`] and [`JavaVm`] - the boundary surface a JNI backend implements
//! - [`RawObject`], [`MethodId`] and [`JValue`] - raw handles and call values
//! - [`MethodKey`] - deterministic cache keys for resolved methods
//!
//! ```text
//! safejni-core  <--  safejni-sys (real JNI)
//!               <--  safejni-testvm (in-memory VM)
//!               <--  safejni (dispatcher, marshaling, lifetimes)
//! ```

pub mod descriptor;
pub mod env;
pub mod error;
pub mod method_key;
pub mod refs;
pub mod value;

pub use descriptor::{ArgTypes, Descriptor, JavaType, MAX_DESCRIPTOR_LEN, Signature, TypeCategory};
pub use env::{Attached, Env, EnvHandle, JavaVm};
pub use error::AttachError;
pub use method_key::MethodKey;
pub use refs::{MethodId, RawObject};
pub use value::JValue;

/// Class name of `java.lang.String` in JNI internal form.
pub const STRING_CLASS: &str = "java/lang/String";

/// Class name of `java.lang.Throwable` in JNI internal form.
pub const THROWABLE_CLASS: &str = "java/lang/Throwable";

/// Class name of `java.util.HashMap` in JNI internal form.
pub const HASH_MAP_CLASS: &str = "java/util/HashMap";

/// Method name reserved by the JVM for constructors.
pub const CONSTRUCTOR_NAME: &str = "<init>";
