//! The calling surface.
//!
//! Every call follows the same steps: derive the signature from the Rust
//! types, resolve the method (through the cache), marshal the arguments into
//! a [`HandleTracker`], invoke the entry for the return type, check for a
//! Java exception, convert the result and release the argument references.
//!
//! The plain functions use the calling thread's environment, attaching the
//! thread if needed. The `_in` variants take an explicit environment.
//!
//! Only supported types can be returned:
//!
//! ```compile_fail
//! use std::collections::HashMap;
//!
//! let _: HashMap<String, String> = safejni::call_static("a/B", "map", ()).unwrap();
//! ```

use safejni_core::{CONSTRUCTOR_NAME, Env, JValue, RawObject, Signature};

use crate::args::JavaArgs;
use crate::environment;
use crate::error::{Error, Result};
use crate::exception::check_exception;
use crate::invoke::JavaReturn;
use crate::object::JavaObject;
use crate::refs::LocalRef;
use crate::resolver::{release_handle, resolve};
use crate::tracker::HandleTracker;

// ============================================================================
// Static calls
// ============================================================================

/// Call a static method.
///
/// ```no_run
/// let text: String = safejni::call_static("com/example/Text", "concat", ("Hello ", "World!"))?;
/// # Ok::<(), safejni::Error>(())
/// ```
pub fn call_static<R: JavaReturn, A: JavaArgs>(class: &str, method: &str, args: A) -> Result<R> {
    let env = environment::attach_current_thread()?;
    call_static_in(&*env, class, method, args)
}

/// Call a static method through `env`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn call_static_in<R: JavaReturn, A: JavaArgs>(env: &dyn Env, class: &str, method: &str, args: A) -> Result<R> {
    let signature = Signature::<R, A>::get();
    let handle = resolve(env, class, method, signature, true)?;
    let result = invoke(env, &args, |values| {
        R::call_static(env, handle.class(), handle.method_id(), values)
    });
    release_handle(env, handle);
    result
}

// ============================================================================
// Instance calls
// ============================================================================

/// Call an instance method on `receiver`, resolving it against the
/// receiver's class name.
pub fn call<R: JavaReturn, A: JavaArgs>(receiver: &JavaObject, method: &str, args: A) -> Result<R> {
    let env = environment::attach_current_thread()?;
    call_method_in(&*env, receiver.raw(), receiver.class_name(), method, args)
}

/// Call an instance method on a raw receiver declared as `class`.
pub fn call_method<R: JavaReturn, A: JavaArgs>(receiver: RawObject, class: &str, method: &str, args: A) -> Result<R> {
    let env = environment::attach_current_thread()?;
    call_method_in(&*env, receiver, class, method, args)
}

/// Call an instance method on a raw receiver through `env`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn call_method_in<R: JavaReturn, A: JavaArgs>(
    env: &dyn Env,
    receiver: RawObject,
    class: &str,
    method: &str,
    args: A,
) -> Result<R> {
    let signature = Signature::<R, A>::get();
    let handle = resolve(env, class, method, signature, false)?;
    let result = invoke(env, &args, |values| {
        R::call_instance(env, receiver, handle.method_id(), values)
    });
    release_handle(env, handle);
    result
}

// ============================================================================
// Construction
// ============================================================================

/// Construct an instance of `class` with the constructor matching `args`.
pub fn construct<A: JavaArgs>(class: &str, args: A) -> Result<JavaObject> {
    let env = environment::attach_current_thread()?;
    construct_in(&*env, class, args)
}

/// Construct an instance of `class` through `env`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn construct_in<A: JavaArgs>(env: &dyn Env, class: &str, args: A) -> Result<JavaObject> {
    let signature = Signature::<(), A>::get();
    let handle = resolve(env, class, CONSTRUCTOR_NAME, signature, false)?;
    let created = invoke(env, &args, |values| {
        let created = LocalRef::from_raw(env, env.new_object(handle.class(), handle.method_id(), values));
        check_exception(env)?;
        created.ok_or(Error::NullResult { what: "NewObject" })
    });
    release_handle(env, handle);
    JavaObject::from_local(env, created?.raw(), class)
}

/// Marshal `args`, run `call` on the marshaled values and release the
/// argument references.
///
/// An error from the call itself takes precedence over anything found while
/// releasing.
fn invoke<A: JavaArgs, T>(env: &dyn Env, args: &A, call: impl FnOnce(&[JValue]) -> Result<T>) -> Result<T> {
    let mut tracker = HandleTracker::with_capacity(env, A::REFERENCES);
    let values = args.marshal(&mut tracker)?;
    let result = call(values.as_ref())?;
    tracker.finish()?;
    Ok(result)
}
