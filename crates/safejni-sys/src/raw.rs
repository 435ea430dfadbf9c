//! Raw JNI function tables.
//!
//! Only the entries the bridge calls are typed; the rest of each table is
//! padding so the typed entries land on their JNI indices. The layout is
//! checked at compile time against those indices.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_void};
use std::mem::{offset_of, size_of};

pub type jint = i32;
pub type jlong = i64;
pub type jbyte = i8;
pub type jboolean = u8;
pub type jchar = u16;
pub type jshort = i16;
pub type jfloat = f32;
pub type jdouble = f64;
pub type jsize = jint;

pub type jobject = *mut c_void;
pub type jclass = jobject;
pub type jstring = jobject;
pub type jarray = jobject;
pub type jthrowable = jobject;
pub type jmethodID = *mut c_void;

pub const JNI_OK: jint = 0;
pub const JNI_ERR: jint = -1;
pub const JNI_TRUE: jboolean = 1;
pub const JNI_FALSE: jboolean = 0;
/// `mode` for `Release*Elements`: copy back and free.
pub const JNI_ABORT: jint = 2;

#[repr(C)]
#[derive(Clone, Copy)]
pub union jvalue {
    pub z: jboolean,
    pub b: jbyte,
    pub c: jchar,
    pub s: jshort,
    pub i: jint,
    pub j: jlong,
    pub f: jfloat,
    pub d: jdouble,
    pub l: jobject,
}

/// In C, `JNIEnv` is a pointer to the function table.
pub type JNIEnv = *const JNINativeInterface;

/// In C, `JavaVM` is a pointer to the invocation table.
pub type JavaVM = *const JNIInvokeInterface;

type Reserved = *const c_void;

type CallA<R> = unsafe extern "system" fn(*mut JNIEnv, jobject, jmethodID, *const jvalue) -> R;

#[repr(C)]
pub struct JNINativeInterface {
    _reserved: [Reserved; 6],
    pub find_class: unsafe extern "system" fn(*mut JNIEnv, *const c_char) -> jclass,
    _pad7: [Reserved; 8],
    pub exception_occurred: unsafe extern "system" fn(*mut JNIEnv) -> jthrowable,
    pub exception_describe: unsafe extern "system" fn(*mut JNIEnv),
    pub exception_clear: unsafe extern "system" fn(*mut JNIEnv),
    _pad18: [Reserved; 3],
    pub new_global_ref: unsafe extern "system" fn(*mut JNIEnv, jobject) -> jobject,
    pub delete_global_ref: unsafe extern "system" fn(*mut JNIEnv, jobject),
    pub delete_local_ref: unsafe extern "system" fn(*mut JNIEnv, jobject),
    _pad24: [Reserved; 6],
    pub new_object_a: CallA<jobject>,
    _pad31: [Reserved; 2],
    pub get_method_id: unsafe extern "system" fn(*mut JNIEnv, jclass, *const c_char, *const c_char) -> jmethodID,
    _pad34: [Reserved; 2],
    pub call_object_method_a: CallA<jobject>,
    _pad37: [Reserved; 2],
    pub call_boolean_method_a: CallA<jboolean>,
    _pad40: [Reserved; 2],
    pub call_byte_method_a: CallA<jbyte>,
    _pad43: [Reserved; 2],
    pub call_char_method_a: CallA<jchar>,
    _pad46: [Reserved; 2],
    pub call_short_method_a: CallA<jshort>,
    _pad49: [Reserved; 2],
    pub call_int_method_a: CallA<jint>,
    _pad52: [Reserved; 2],
    pub call_long_method_a: CallA<jlong>,
    _pad55: [Reserved; 2],
    pub call_float_method_a: CallA<jfloat>,
    _pad58: [Reserved; 2],
    pub call_double_method_a: CallA<jdouble>,
    _pad61: [Reserved; 2],
    pub call_void_method_a: CallA<()>,
    _pad64: [Reserved; 49],
    pub get_static_method_id: unsafe extern "system" fn(*mut JNIEnv, jclass, *const c_char, *const c_char) -> jmethodID,
    _pad114: [Reserved; 2],
    pub call_static_object_method_a: CallA<jobject>,
    _pad117: [Reserved; 2],
    pub call_static_boolean_method_a: CallA<jboolean>,
    _pad120: [Reserved; 2],
    pub call_static_byte_method_a: CallA<jbyte>,
    _pad123: [Reserved; 2],
    pub call_static_char_method_a: CallA<jchar>,
    _pad126: [Reserved; 2],
    pub call_static_short_method_a: CallA<jshort>,
    _pad129: [Reserved; 2],
    pub call_static_int_method_a: CallA<jint>,
    _pad132: [Reserved; 2],
    pub call_static_long_method_a: CallA<jlong>,
    _pad135: [Reserved; 2],
    pub call_static_float_method_a: CallA<jfloat>,
    _pad138: [Reserved; 2],
    pub call_static_double_method_a: CallA<jdouble>,
    _pad141: [Reserved; 2],
    pub call_static_void_method_a: CallA<()>,
    _pad144: [Reserved; 23],
    pub new_string_utf: unsafe extern "system" fn(*mut JNIEnv, *const c_char) -> jstring,
    _pad168: [Reserved; 1],
    pub get_string_utf_chars: unsafe extern "system" fn(*mut JNIEnv, jstring, *mut jboolean) -> *const c_char,
    pub release_string_utf_chars: unsafe extern "system" fn(*mut JNIEnv, jstring, *const c_char),
    pub get_array_length: unsafe extern "system" fn(*mut JNIEnv, jarray) -> jsize,
    pub new_object_array: unsafe extern "system" fn(*mut JNIEnv, jsize, jclass, jobject) -> jarray,
    pub get_object_array_element: unsafe extern "system" fn(*mut JNIEnv, jarray, jsize) -> jobject,
    pub set_object_array_element: unsafe extern "system" fn(*mut JNIEnv, jarray, jsize, jobject),
    _pad175: [Reserved; 1],
    pub new_byte_array: unsafe extern "system" fn(*mut JNIEnv, jsize) -> jarray,
    _pad177: [Reserved; 4],
    pub new_float_array: unsafe extern "system" fn(*mut JNIEnv, jsize) -> jarray,
    _pad182: [Reserved; 18],
    pub get_byte_array_region: unsafe extern "system" fn(*mut JNIEnv, jarray, jsize, jsize, *mut jbyte),
    _pad201: [Reserved; 4],
    pub get_float_array_region: unsafe extern "system" fn(*mut JNIEnv, jarray, jsize, jsize, *mut jfloat),
    _pad206: [Reserved; 2],
    pub set_byte_array_region: unsafe extern "system" fn(*mut JNIEnv, jarray, jsize, jsize, *const jbyte),
    _pad209: [Reserved; 4],
    pub set_float_array_region: unsafe extern "system" fn(*mut JNIEnv, jarray, jsize, jsize, *const jfloat),
    _pad214: [Reserved; 14],
    pub exception_check: unsafe extern "system" fn(*mut JNIEnv) -> jboolean,
}

#[repr(C)]
pub struct JNIInvokeInterface {
    _reserved: [Reserved; 3],
    pub destroy_java_vm: unsafe extern "system" fn(*mut JavaVM) -> jint,
    pub attach_current_thread: unsafe extern "system" fn(*mut JavaVM, *mut *mut c_void, *mut c_void) -> jint,
    pub detach_current_thread: unsafe extern "system" fn(*mut JavaVM) -> jint,
    pub get_env: unsafe extern "system" fn(*mut JavaVM, *mut *mut c_void, jint) -> jint,
    pub attach_current_thread_as_daemon: unsafe extern "system" fn(*mut JavaVM, *mut *mut c_void, *mut c_void) -> jint,
}

type VmEntry = unsafe extern "system" fn(*mut JavaVM) -> jint;
type VmEnvEntry = unsafe extern "system" fn(*mut JavaVM, *mut *mut c_void, *mut c_void) -> jint;

impl JNIInvokeInterface {
    /// Assemble an invocation table, for hosts that embed their own VM.
    pub const fn new(
        destroy_java_vm: VmEntry,
        attach_current_thread: VmEnvEntry,
        detach_current_thread: VmEntry,
        get_env: unsafe extern "system" fn(*mut JavaVM, *mut *mut c_void, jint) -> jint,
        attach_current_thread_as_daemon: VmEnvEntry,
    ) -> Self {
        Self {
            _reserved: [std::ptr::null(); 3],
            destroy_java_vm,
            attach_current_thread,
            detach_current_thread,
            get_env,
            attach_current_thread_as_daemon,
        }
    }
}

// SAFETY: the table only holds function pointers and null reserved slots.
unsafe impl Sync for JNIInvokeInterface {}

macro_rules! assert_slot {
    ($table:ty, $field:ident, $index:expr) => {
        const _: () = assert!(offset_of!($table, $field) == $index * size_of::<Reserved>());
    };
}

assert_slot!(JNINativeInterface, find_class, 6);
assert_slot!(JNINativeInterface, exception_occurred, 15);
assert_slot!(JNINativeInterface, new_global_ref, 21);
assert_slot!(JNINativeInterface, new_object_a, 30);
assert_slot!(JNINativeInterface, get_method_id, 33);
assert_slot!(JNINativeInterface, call_object_method_a, 36);
assert_slot!(JNINativeInterface, call_void_method_a, 63);
assert_slot!(JNINativeInterface, get_static_method_id, 113);
assert_slot!(JNINativeInterface, call_static_object_method_a, 116);
assert_slot!(JNINativeInterface, call_static_void_method_a, 143);
assert_slot!(JNINativeInterface, new_string_utf, 167);
assert_slot!(JNINativeInterface, get_string_utf_chars, 169);
assert_slot!(JNINativeInterface, get_array_length, 171);
assert_slot!(JNINativeInterface, new_byte_array, 176);
assert_slot!(JNINativeInterface, new_float_array, 181);
assert_slot!(JNINativeInterface, get_byte_array_region, 200);
assert_slot!(JNINativeInterface, get_float_array_region, 205);
assert_slot!(JNINativeInterface, set_byte_array_region, 208);
assert_slot!(JNINativeInterface, set_float_array_region, 213);
assert_slot!(JNINativeInterface, exception_check, 228);
assert_slot!(JNIInvokeInterface, destroy_java_vm, 3);
assert_slot!(JNIInvokeInterface, get_env, 6);
