//! The boundary surface between the bridge and a JNI implementation.
//!
//! [`Env`] mirrors the subset of the `JNINativeInterface_` function table the
//! bridge drives, one method per JNI entry, with raw pointers replaced by
//! [`RawObject`]/[`MethodId`] handles. [`JavaVm`] mirrors the invocation
//! interface. Two backends implement them: `safejni-sys` on top of a real
//! JVM and `safejni-testvm` on top of an in-memory runtime.
//!
//! Like JNI itself, the methods report failures through null results and the
//! pending-exception state and never panic.

use std::fmt;
use std::rc::Rc;

use crate::error::AttachError;
use crate::refs::{MethodId, RawObject};
use crate::value::JValue;

/// The per-thread environment as shared by the bridge.
///
/// Environments are bound to the thread that obtained them; the handle is
/// `!Send`.
pub type EnvHandle = Rc<dyn Env>;

/// One thread's JNI environment.
pub trait Env {
    // ========================================================================
    // Class and method lookup
    // ========================================================================

    /// `FindClass`. Returns a local reference, or `None` with
    /// `NoClassDefFoundError` pending.
    fn find_class(&self, name: &str) -> Option<RawObject>;

    /// `GetMethodID`. Returns `None` with `NoSuchMethodError` pending.
    fn get_method_id(&self, class: RawObject, name: &str, signature: &str) -> Option<MethodId>;

    /// `GetStaticMethodID`. Returns `None` with `NoSuchMethodError` pending.
    fn get_static_method_id(&self, class: RawObject, name: &str, signature: &str) -> Option<MethodId>;

    // ========================================================================
    // Static invocation
    // ========================================================================

    fn call_static_void_method(&self, class: RawObject, method: MethodId, args: &[JValue]);
    fn call_static_boolean_method(&self, class: RawObject, method: MethodId, args: &[JValue]) -> bool;
    fn call_static_byte_method(&self, class: RawObject, method: MethodId, args: &[JValue]) -> i8;
    fn call_static_char_method(&self, class: RawObject, method: MethodId, args: &[JValue]) -> u16;
    fn call_static_short_method(&self, class: RawObject, method: MethodId, args: &[JValue]) -> i16;
    fn call_static_int_method(&self, class: RawObject, method: MethodId, args: &[JValue]) -> i32;
    fn call_static_long_method(&self, class: RawObject, method: MethodId, args: &[JValue]) -> i64;
    fn call_static_float_method(&self, class: RawObject, method: MethodId, args: &[JValue]) -> f32;
    fn call_static_double_method(&self, class: RawObject, method: MethodId, args: &[JValue]) -> f64;
    fn call_static_object_method(&self, class: RawObject, method: MethodId, args: &[JValue]) -> Option<RawObject>;

    // ========================================================================
    // Instance invocation
    // ========================================================================

    fn call_void_method(&self, obj: RawObject, method: MethodId, args: &[JValue]);
    fn call_boolean_method(&self, obj: RawObject, method: MethodId, args: &[JValue]) -> bool;
    fn call_byte_method(&self, obj: RawObject, method: MethodId, args: &[JValue]) -> i8;
    fn call_char_method(&self, obj: RawObject, method: MethodId, args: &[JValue]) -> u16;
    fn call_short_method(&self, obj: RawObject, method: MethodId, args: &[JValue]) -> i16;
    fn call_int_method(&self, obj: RawObject, method: MethodId, args: &[JValue]) -> i32;
    fn call_long_method(&self, obj: RawObject, method: MethodId, args: &[JValue]) -> i64;
    fn call_float_method(&self, obj: RawObject, method: MethodId, args: &[JValue]) -> f32;
    fn call_double_method(&self, obj: RawObject, method: MethodId, args: &[JValue]) -> f64;
    fn call_object_method(&self, obj: RawObject, method: MethodId, args: &[JValue]) -> Option<RawObject>;

    /// `NewObjectA`. Runs the constructor and returns a local reference.
    fn new_object(&self, class: RawObject, ctor: MethodId, args: &[JValue]) -> Option<RawObject>;

    // ========================================================================
    // Strings
    // ========================================================================

    /// `NewStringUTF`.
    fn new_string_utf(&self, value: &str) -> Option<RawObject>;

    /// `GetStringUTFChars` followed by `ReleaseStringUTFChars`, returning an
    /// owned copy. `None` if the reference is not a string or the copy failed.
    fn get_string_utf_chars(&self, string: RawObject) -> Option<String>;

    // ========================================================================
    // Arrays
    // ========================================================================

    /// `GetArrayLength`.
    fn get_array_length(&self, array: RawObject) -> i32;

    /// `NewObjectArray`.
    fn new_object_array(&self, len: i32, element_class: RawObject, initial: Option<RawObject>) -> Option<RawObject>;

    /// `GetObjectArrayElement`. Returns a fresh local reference.
    fn get_object_array_element(&self, array: RawObject, index: i32) -> Option<RawObject>;

    /// `SetObjectArrayElement`.
    fn set_object_array_element(&self, array: RawObject, index: i32, value: Option<RawObject>);

    fn new_byte_array(&self, len: i32) -> Option<RawObject>;
    fn get_byte_array_region(&self, array: RawObject, start: i32, buf: &mut [i8]);
    fn set_byte_array_region(&self, array: RawObject, start: i32, buf: &[i8]);

    fn new_float_array(&self, len: i32) -> Option<RawObject>;
    fn get_float_array_region(&self, array: RawObject, start: i32, buf: &mut [f32]);
    fn set_float_array_region(&self, array: RawObject, start: i32, buf: &[f32]);

    // ========================================================================
    // References
    // ========================================================================

    fn new_global_ref(&self, obj: RawObject) -> Option<RawObject>;
    fn delete_global_ref(&self, obj: RawObject);
    fn delete_local_ref(&self, obj: RawObject);

    // ========================================================================
    // Exceptions
    // ========================================================================

    fn exception_check(&self) -> bool;

    /// `ExceptionOccurred`. Returns a local reference to the pending throwable.
    fn exception_occurred(&self) -> Option<RawObject>;

    fn exception_describe(&self);
    fn exception_clear(&self);
}

/// The outcome of [`JavaVm::attach_current_thread`].
pub enum Attached {
    /// The thread already had an environment, for example a Java thread
    /// calling into native code. Whoever attached it owns the attachment.
    Existing(EnvHandle),
    /// The call attached the thread.
    New(EnvHandle),
}

impl Attached {
    pub fn env(&self) -> &EnvHandle {
        match self {
            Attached::Existing(env) | Attached::New(env) => env,
        }
    }

    pub fn into_env(self) -> EnvHandle {
        match self {
            Attached::Existing(env) | Attached::New(env) => env,
        }
    }

    /// Whether this call attached the thread.
    pub fn is_new(&self) -> bool {
        matches!(self, Attached::New(_))
    }
}

impl fmt::Debug for Attached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Attached::Existing(_) => "Attached::Existing",
            Attached::New(_) => "Attached::New",
        })
    }
}

/// The process-wide virtual machine.
pub trait JavaVm: Send + Sync {
    /// The calling thread's environment, attaching the thread if it has none.
    fn attach_current_thread(&self) -> Result<Attached, AttachError>;

    /// Detach the calling thread. Only threads reported as
    /// [`Attached::New`] may be detached.
    fn detach_current_thread(&self) -> Result<(), AttachError>;
}
