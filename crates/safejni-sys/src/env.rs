//! [`Env`] on top of a real `JNIEnv`.

use std::ffi::{CStr, c_char};
use std::ptr;

use safejni_core::{Env, JValue, MethodId, RawObject};

use crate::mutf8;
use crate::raw::{JNI_FALSE, JNI_TRUE, JNIEnv, jvalue};

/// Arguments up to this count are passed without allocating.
const INLINE_ARGS: usize = 8;

/// One thread's `JNIEnv`.
///
/// The pointer is only valid on the thread it was obtained on; holding a raw
/// pointer keeps `NativeEnv` `!Send`.
pub struct NativeEnv {
    raw: *mut JNIEnv,
}

impl NativeEnv {
    /// Wrap a `JNIEnv` pointer.
    ///
    /// # Safety
    ///
    /// `raw` must be a valid `JNIEnv` for the calling thread and must outlive
    /// the returned value.
    pub unsafe fn from_raw(raw: *mut JNIEnv) -> Self {
        Self { raw }
    }

    pub fn as_raw(&self) -> *mut JNIEnv {
        self.raw
    }
}

/// Look up a function table entry and call it with the environment pointer.
macro_rules! jni {
    ($env:expr, $name:ident $(, $arg:expr)*) => {{
        let raw = $env.raw;
        // SAFETY: `raw` is a valid JNIEnv for this thread (see `from_raw`)
        // and every table entry used here exists since JNI 1.6.
        unsafe { ((**raw).$name)(raw $(, $arg)*) }
    }};
}

fn to_jvalue(value: JValue) -> jvalue {
    match value {
        JValue::Bool(v) => jvalue { z: if v { JNI_TRUE } else { JNI_FALSE } },
        JValue::Byte(v) => jvalue { b: v },
        JValue::Char(v) => jvalue { c: v },
        JValue::Short(v) => jvalue { s: v },
        JValue::Int(v) => jvalue { i: v },
        JValue::Long(v) => jvalue { j: v },
        JValue::Float(v) => jvalue { f: v },
        JValue::Double(v) => jvalue { d: v },
        JValue::Object(v) => jvalue {
            l: RawObject::option_as_ptr(v),
        },
    }
}

/// Run `f` with `args` laid out as a `jvalue` array.
fn with_args<R>(args: &[JValue], f: impl FnOnce(*const jvalue) -> R) -> R {
    if args.len() <= INLINE_ARGS {
        let mut buf = [jvalue { j: 0 }; INLINE_ARGS];
        for (slot, arg) in buf.iter_mut().zip(args) {
            *slot = to_jvalue(*arg);
        }
        f(buf.as_ptr())
    } else {
        let buf: Vec<jvalue> = args.iter().copied().map(to_jvalue).collect();
        f(buf.as_ptr())
    }
}

fn obj(raw: RawObject) -> *mut std::ffi::c_void {
    raw.as_ptr()
}

macro_rules! typed_calls {
    ($($static_name:ident / $name:ident => $static_entry:ident / $entry:ident -> $ret:ty, |$v:ident| $conv:expr;)*) => {
        $(
            fn $static_name(&self, class: RawObject, method: MethodId, args: &[JValue]) -> $ret {
                let $v = with_args(args, |args| jni!(self, $static_entry, obj(class), method.as_ptr(), args));
                $conv
            }

            fn $name(&self, receiver: RawObject, method: MethodId, args: &[JValue]) -> $ret {
                let $v = with_args(args, |args| jni!(self, $entry, obj(receiver), method.as_ptr(), args));
                $conv
            }
        )*
    };
}

impl Env for NativeEnv {
    fn find_class(&self, name: &str) -> Option<RawObject> {
        let name = mutf8::encode(name);
        RawObject::from_ptr(jni!(self, find_class, name.as_ptr().cast::<c_char>()))
    }

    fn get_method_id(&self, class: RawObject, name: &str, signature: &str) -> Option<MethodId> {
        let (name, signature) = (mutf8::encode(name), mutf8::encode(signature));
        MethodId::from_ptr(jni!(
            self,
            get_method_id,
            obj(class),
            name.as_ptr().cast::<c_char>(),
            signature.as_ptr().cast::<c_char>()
        ))
    }

    fn get_static_method_id(&self, class: RawObject, name: &str, signature: &str) -> Option<MethodId> {
        let (name, signature) = (mutf8::encode(name), mutf8::encode(signature));
        MethodId::from_ptr(jni!(
            self,
            get_static_method_id,
            obj(class),
            name.as_ptr().cast::<c_char>(),
            signature.as_ptr().cast::<c_char>()
        ))
    }

    typed_calls! {
        call_static_void_method / call_void_method
            => call_static_void_method_a / call_void_method_a -> (), |v| v;
        call_static_boolean_method / call_boolean_method
            => call_static_boolean_method_a / call_boolean_method_a -> bool, |v| v != JNI_FALSE;
        call_static_byte_method / call_byte_method
            => call_static_byte_method_a / call_byte_method_a -> i8, |v| v;
        call_static_char_method / call_char_method
            => call_static_char_method_a / call_char_method_a -> u16, |v| v;
        call_static_short_method / call_short_method
            => call_static_short_method_a / call_short_method_a -> i16, |v| v;
        call_static_int_method / call_int_method
            => call_static_int_method_a / call_int_method_a -> i32, |v| v;
        call_static_long_method / call_long_method
            => call_static_long_method_a / call_long_method_a -> i64, |v| v;
        call_static_float_method / call_float_method
            => call_static_float_method_a / call_float_method_a -> f32, |v| v;
        call_static_double_method / call_double_method
            => call_static_double_method_a / call_double_method_a -> f64, |v| v;
        call_static_object_method / call_object_method
            => call_static_object_method_a / call_object_method_a -> Option<RawObject>, |v| RawObject::from_ptr(v);
    }

    fn new_object(&self, class: RawObject, ctor: MethodId, args: &[JValue]) -> Option<RawObject> {
        RawObject::from_ptr(with_args(args, |args| jni!(self, new_object_a, obj(class), ctor.as_ptr(), args)))
    }

    fn new_string_utf(&self, value: &str) -> Option<RawObject> {
        let bytes = mutf8::encode(value);
        RawObject::from_ptr(jni!(self, new_string_utf, bytes.as_ptr().cast::<c_char>()))
    }

    fn get_string_utf_chars(&self, string: RawObject) -> Option<String> {
        let chars = jni!(self, get_string_utf_chars, obj(string), ptr::null_mut());
        if chars.is_null() {
            return None;
        }
        // SAFETY: the VM returned a NUL-terminated buffer that stays valid
        // until it is released below.
        let text = mutf8::decode(unsafe { CStr::from_ptr(chars) }.to_bytes());
        jni!(self, release_string_utf_chars, obj(string), chars);
        Some(text)
    }

    fn get_array_length(&self, array: RawObject) -> i32 {
        jni!(self, get_array_length, obj(array))
    }

    fn new_object_array(&self, len: i32, element_class: RawObject, initial: Option<RawObject>) -> Option<RawObject> {
        RawObject::from_ptr(jni!(
            self,
            new_object_array,
            len,
            obj(element_class),
            RawObject::option_as_ptr(initial)
        ))
    }

    fn get_object_array_element(&self, array: RawObject, index: i32) -> Option<RawObject> {
        RawObject::from_ptr(jni!(self, get_object_array_element, obj(array), index))
    }

    fn set_object_array_element(&self, array: RawObject, index: i32, value: Option<RawObject>) {
        jni!(self, set_object_array_element, obj(array), index, RawObject::option_as_ptr(value));
    }

    fn new_byte_array(&self, len: i32) -> Option<RawObject> {
        RawObject::from_ptr(jni!(self, new_byte_array, len))
    }

    fn get_byte_array_region(&self, array: RawObject, start: i32, buf: &mut [i8]) {
        let Ok(len) = i32::try_from(buf.len()) else {
            log::error!("byte region of {} elements exceeds the JNI size range", buf.len());
            return;
        };
        jni!(self, get_byte_array_region, obj(array), start, len, buf.as_mut_ptr());
    }

    fn set_byte_array_region(&self, array: RawObject, start: i32, buf: &[i8]) {
        let Ok(len) = i32::try_from(buf.len()) else {
            log::error!("byte region of {} elements exceeds the JNI size range", buf.len());
            return;
        };
        jni!(self, set_byte_array_region, obj(array), start, len, buf.as_ptr());
    }

    fn new_float_array(&self, len: i32) -> Option<RawObject> {
        RawObject::from_ptr(jni!(self, new_float_array, len))
    }

    fn get_float_array_region(&self, array: RawObject, start: i32, buf: &mut [f32]) {
        let Ok(len) = i32::try_from(buf.len()) else {
            log::error!("float region of {} elements exceeds the JNI size range", buf.len());
            return;
        };
        jni!(self, get_float_array_region, obj(array), start, len, buf.as_mut_ptr());
    }

    fn set_float_array_region(&self, array: RawObject, start: i32, buf: &[f32]) {
        let Ok(len) = i32::try_from(buf.len()) else {
            log::error!("float region of {} elements exceeds the JNI size range", buf.len());
            return;
        };
        jni!(self, set_float_array_region, obj(array), start, len, buf.as_ptr());
    }

    fn new_global_ref(&self, object: RawObject) -> Option<RawObject> {
        RawObject::from_ptr(jni!(self, new_global_ref, obj(object)))
    }

    fn delete_global_ref(&self, object: RawObject) {
        jni!(self, delete_global_ref, obj(object));
    }

    fn delete_local_ref(&self, object: RawObject) {
        jni!(self, delete_local_ref, obj(object));
    }

    fn exception_check(&self) -> bool {
        jni!(self, exception_check) != JNI_FALSE
    }

    fn exception_occurred(&self) -> Option<RawObject> {
        RawObject::from_ptr(jni!(self, exception_occurred))
    }

    fn exception_describe(&self) {
        jni!(self, exception_describe);
    }

    fn exception_clear(&self) {
        jni!(self, exception_clear);
    }
}
