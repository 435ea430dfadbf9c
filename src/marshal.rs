//! Conversion of values between Rust and the JVM.
//!
//! [`ToJava`] turns a native argument into either a plain [`JValue`] or a
//! freshly allocated local reference, which the dispatcher hands to the call's
//! [`HandleTracker`](crate::tracker::HandleTracker). [`FromJava`] copies a
//! managed reference result into an owned native value; the caller keeps
//! ownership of the reference itself.
//!
//! Every boundary operation is followed by an exception check. When one
//! fails, whatever that marshaling step allocated is released before the
//! error is returned.
//!
//! Only registered types marshal. Anything else is rejected at compile time:
//!
//! ```compile_fail
//! use safejni::ToJava;
//!
//! fn marshal<T: ToJava>(_: T) {}
//! marshal(vec![1u64, 2, 3]);
//! ```

use std::collections::HashMap;
use std::hash::BuildHasher;

use safejni_core::{
    CONSTRUCTOR_NAME, Env, HASH_MAP_CLASS, JValue, JavaType, RawObject, STRING_CLASS, Signature,
};

use crate::error::{Error, Result};
use crate::exception::check_exception;
use crate::refs::LocalRef;
use crate::resolver::{release_handle, resolve};

/// A marshaled argument.
#[derive(Debug)]
pub enum Marshaled<'env> {
    /// Passed by value.
    Value(JValue),
    /// A new local reference owned by the caller.
    Local(LocalRef<'env>),
}

/// Native to managed conversion.
pub trait ToJava: JavaType {
    fn to_java<'env>(&self, env: &'env dyn Env) -> Result<Marshaled<'env>>;
}

/// Managed to native conversion for reference results.
///
/// A null reference converts to the empty value of the type.
pub trait FromJava: JavaType + Sized {
    fn from_java(env: &dyn Env, obj: Option<RawObject>) -> Result<Self>;
}

// ============================================================================
// Helpers
// ============================================================================

/// Wrap an allocation result, turning null into the pending exception or a
/// [`Error::NullResult`].
fn allocated<'env>(env: &'env dyn Env, raw: Option<RawObject>, what: &'static str) -> Result<LocalRef<'env>> {
    match LocalRef::from_raw(env, raw) {
        Some(local) => Ok(local),
        None => {
            check_exception(env)?;
            Err(Error::NullResult { what })
        }
    }
}

fn array_len(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| Error::ArrayTooLarge { len })
}

fn as_signed(bytes: &[u8]) -> &[i8] {
    // SAFETY: u8 and i8 have identical size and alignment.
    unsafe { std::slice::from_raw_parts(bytes.as_ptr().cast::<i8>(), bytes.len()) }
}

fn as_signed_mut(bytes: &mut [u8]) -> &mut [i8] {
    // SAFETY: u8 and i8 have identical size and alignment.
    unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr().cast::<i8>(), bytes.len()) }
}

/// Length of a non-null array, checked.
fn array_length(env: &dyn Env, array: RawObject) -> Result<usize> {
    let len = env.get_array_length(array);
    check_exception(env)?;
    Ok(usize::try_from(len).unwrap_or(0))
}

pub(crate) fn new_string<'env>(env: &'env dyn Env, value: &str) -> Result<LocalRef<'env>> {
    let raw = env.new_string_utf(value);
    allocated(env, raw, "NewStringUTF")
}

fn new_string_array<'env, S: AsRef<str>>(env: &'env dyn Env, values: &[S]) -> Result<LocalRef<'env>> {
    let len = array_len(values.len())?;
    let Some(string_class) = LocalRef::from_raw(env, env.find_class(STRING_CLASS)) else {
        if let Err(err) = check_exception(env) {
            log::debug!("looking up {STRING_CLASS} raised: {err}");
        }
        return Err(Error::class_not_found(STRING_CLASS));
    };
    let raw = env.new_object_array(len, string_class.raw(), None);
    let array = allocated(env, raw, "NewObjectArray")?;
    for (index, value) in (0..len).zip(values) {
        let element = new_string(env, value.as_ref())?;
        env.set_object_array_element(array.raw(), index, Some(element.raw()));
        check_exception(env)?;
    }
    Ok(array)
}

fn new_byte_array<'env>(env: &'env dyn Env, bytes: &[u8]) -> Result<LocalRef<'env>> {
    let len = array_len(bytes.len())?;
    let raw = env.new_byte_array(len);
    let array = allocated(env, raw, "NewByteArray")?;
    env.set_byte_array_region(array.raw(), 0, as_signed(bytes));
    check_exception(env)?;
    Ok(array)
}

fn new_float_array<'env>(env: &'env dyn Env, floats: &[f32]) -> Result<LocalRef<'env>> {
    let len = array_len(floats.len())?;
    let raw = env.new_float_array(len);
    let array = allocated(env, raw, "NewFloatArray")?;
    env.set_float_array_region(array.raw(), 0, floats);
    check_exception(env)?;
    Ok(array)
}

fn new_hash_map<'env, S>(env: &'env dyn Env, map: &HashMap<String, String, S>) -> Result<LocalRef<'env>> {
    let ctor = resolve(env, HASH_MAP_CLASS, CONSTRUCTOR_NAME, Signature::<(), ()>::get(), false)?;
    let raw = env.new_object(ctor.class(), ctor.method_id(), &[]);
    release_handle(env, ctor);
    let object = allocated(env, raw, "NewObject")?;

    let put = resolve(
        env,
        HASH_MAP_CLASS,
        "put",
        "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
        false,
    )?;
    let filled = (|| -> Result<()> {
        for (key, value) in map {
            let key = new_string(env, key)?;
            let value = new_string(env, value)?;
            let args = [JValue::from(key.raw()), JValue::from(value.raw())];
            let previous = env.call_object_method(object.raw(), put.method_id(), &args);
            drop(LocalRef::from_raw(env, previous));
            check_exception(env)?;
        }
        Ok(())
    })();
    release_handle(env, put);
    filled.map(|()| object)
}

// ============================================================================
// ToJava
// ============================================================================

macro_rules! primitive_to_java {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ToJava for $ty {
                fn to_java<'env>(&self, _env: &'env dyn Env) -> Result<Marshaled<'env>> {
                    Ok(Marshaled::Value(JValue::$variant(*self)))
                }
            }
        )*
    };
}

primitive_to_java! {
    bool => Bool,
    i8 => Byte,
    u16 => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
}

impl<T> ToJava for *const T {
    fn to_java<'env>(&self, _env: &'env dyn Env) -> Result<Marshaled<'env>> {
        Ok(Marshaled::Value(JValue::Long(self.expose_provenance() as i64)))
    }
}

impl<T> ToJava for *mut T {
    fn to_java<'env>(&self, _env: &'env dyn Env) -> Result<Marshaled<'env>> {
        Ok(Marshaled::Value(JValue::Long(self.expose_provenance() as i64)))
    }
}

impl ToJava for str {
    fn to_java<'env>(&self, env: &'env dyn Env) -> Result<Marshaled<'env>> {
        new_string(env, self).map(Marshaled::Local)
    }
}

impl ToJava for String {
    fn to_java<'env>(&self, env: &'env dyn Env) -> Result<Marshaled<'env>> {
        new_string(env, self).map(Marshaled::Local)
    }
}

impl ToJava for [String] {
    fn to_java<'env>(&self, env: &'env dyn Env) -> Result<Marshaled<'env>> {
        new_string_array(env, self).map(Marshaled::Local)
    }
}

impl ToJava for [&str] {
    fn to_java<'env>(&self, env: &'env dyn Env) -> Result<Marshaled<'env>> {
        new_string_array(env, self).map(Marshaled::Local)
    }
}

impl ToJava for Vec<String> {
    fn to_java<'env>(&self, env: &'env dyn Env) -> Result<Marshaled<'env>> {
        new_string_array(env, self).map(Marshaled::Local)
    }
}

impl ToJava for [u8] {
    fn to_java<'env>(&self, env: &'env dyn Env) -> Result<Marshaled<'env>> {
        new_byte_array(env, self).map(Marshaled::Local)
    }
}

impl ToJava for Vec<u8> {
    fn to_java<'env>(&self, env: &'env dyn Env) -> Result<Marshaled<'env>> {
        new_byte_array(env, self).map(Marshaled::Local)
    }
}

impl ToJava for [f32] {
    fn to_java<'env>(&self, env: &'env dyn Env) -> Result<Marshaled<'env>> {
        new_float_array(env, self).map(Marshaled::Local)
    }
}

impl ToJava for Vec<f32> {
    fn to_java<'env>(&self, env: &'env dyn Env) -> Result<Marshaled<'env>> {
        new_float_array(env, self).map(Marshaled::Local)
    }
}

impl<S: BuildHasher> ToJava for HashMap<String, String, S> {
    fn to_java<'env>(&self, env: &'env dyn Env) -> Result<Marshaled<'env>> {
        new_hash_map(env, self).map(Marshaled::Local)
    }
}

impl<T: ToJava + ?Sized> ToJava for &T {
    fn to_java<'env>(&self, env: &'env dyn Env) -> Result<Marshaled<'env>> {
        (**self).to_java(env)
    }
}

// ============================================================================
// FromJava
// ============================================================================

impl FromJava for String {
    fn from_java(env: &dyn Env, obj: Option<RawObject>) -> Result<Self> {
        let Some(obj) = obj else {
            return Ok(String::new());
        };
        match env.get_string_utf_chars(obj) {
            Some(value) => Ok(value),
            None => {
                check_exception(env)?;
                Err(Error::NullResult { what: "GetStringUTFChars" })
            }
        }
    }
}

impl FromJava for Vec<String> {
    fn from_java(env: &dyn Env, obj: Option<RawObject>) -> Result<Self> {
        let Some(array) = obj else {
            return Ok(Vec::new());
        };
        let len = array_length(env, array)?;
        let mut values = Vec::with_capacity(len);
        for index in 0..len as i32 {
            let element = LocalRef::from_raw(env, env.get_object_array_element(array, index));
            check_exception(env)?;
            values.push(String::from_java(env, element.as_ref().map(LocalRef::raw))?);
        }
        Ok(values)
    }
}

impl FromJava for Vec<u8> {
    fn from_java(env: &dyn Env, obj: Option<RawObject>) -> Result<Self> {
        let Some(array) = obj else {
            return Ok(Vec::new());
        };
        let mut bytes = vec![0u8; array_length(env, array)?];
        env.get_byte_array_region(array, 0, as_signed_mut(&mut bytes));
        check_exception(env)?;
        Ok(bytes)
    }
}

impl FromJava for Vec<f32> {
    fn from_java(env: &dyn Env, obj: Option<RawObject>) -> Result<Self> {
        let Some(array) = obj else {
            return Ok(Vec::new());
        };
        let mut floats = vec![0.0f32; array_length(env, array)?];
        env.get_float_array_region(array, 0, &mut floats);
        check_exception(env)?;
        Ok(floats)
    }
}
