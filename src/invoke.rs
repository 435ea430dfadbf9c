//! Per-return-type invocation.
//!
//! JNI has one call entry per return descriptor. [`JavaReturn`] picks the
//! right one for each supported result type and converts the result; a
//! pending exception always wins over whatever value the call returned.

use safejni_core::{Env, JValue, JavaType, MethodId, RawObject};

use crate::error::Result;
use crate::exception::check_exception;
use crate::marshal::FromJava;
use crate::refs::LocalRef;

/// A type that can be returned from a Java method.
pub trait JavaReturn: JavaType + Sized {
    fn call_static(env: &dyn Env, class: RawObject, method: MethodId, args: &[JValue]) -> Result<Self>;

    fn call_instance(env: &dyn Env, obj: RawObject, method: MethodId, args: &[JValue]) -> Result<Self>;
}

impl JavaReturn for () {
    fn call_static(env: &dyn Env, class: RawObject, method: MethodId, args: &[JValue]) -> Result<Self> {
        env.call_static_void_method(class, method, args);
        check_exception(env)
    }

    fn call_instance(env: &dyn Env, obj: RawObject, method: MethodId, args: &[JValue]) -> Result<Self> {
        env.call_void_method(obj, method, args);
        check_exception(env)
    }
}

macro_rules! primitive_return {
    ($($ty:ty => $static_fn:ident, $instance_fn:ident;)*) => {
        $(
            impl JavaReturn for $ty {
                fn call_static(env: &dyn Env, class: RawObject, method: MethodId, args: &[JValue]) -> Result<Self> {
                    let value = env.$static_fn(class, method, args);
                    check_exception(env)?;
                    Ok(value)
                }

                fn call_instance(env: &dyn Env, obj: RawObject, method: MethodId, args: &[JValue]) -> Result<Self> {
                    let value = env.$instance_fn(obj, method, args);
                    check_exception(env)?;
                    Ok(value)
                }
            }
        )*
    };
}

primitive_return! {
    bool => call_static_boolean_method, call_boolean_method;
    i8 => call_static_byte_method, call_byte_method;
    u16 => call_static_char_method, call_char_method;
    i16 => call_static_short_method, call_short_method;
    i32 => call_static_int_method, call_int_method;
    i64 => call_static_long_method, call_long_method;
    f32 => call_static_float_method, call_float_method;
    f64 => call_static_double_method, call_double_method;
}

impl<T> JavaReturn for *const T {
    fn call_static(env: &dyn Env, class: RawObject, method: MethodId, args: &[JValue]) -> Result<Self> {
        i64::call_static(env, class, method, args).map(|addr| std::ptr::with_exposed_provenance(addr as usize))
    }

    fn call_instance(env: &dyn Env, obj: RawObject, method: MethodId, args: &[JValue]) -> Result<Self> {
        i64::call_instance(env, obj, method, args).map(|addr| std::ptr::with_exposed_provenance(addr as usize))
    }
}

impl<T> JavaReturn for *mut T {
    fn call_static(env: &dyn Env, class: RawObject, method: MethodId, args: &[JValue]) -> Result<Self> {
        i64::call_static(env, class, method, args).map(|addr| std::ptr::with_exposed_provenance_mut(addr as usize))
    }

    fn call_instance(env: &dyn Env, obj: RawObject, method: MethodId, args: &[JValue]) -> Result<Self> {
        i64::call_instance(env, obj, method, args).map(|addr| std::ptr::with_exposed_provenance_mut(addr as usize))
    }
}

/// Convert an object result, releasing its local reference right after.
fn object_result<T: FromJava>(env: &dyn Env, raw: Option<RawObject>) -> Result<T> {
    let result = LocalRef::from_raw(env, raw);
    check_exception(env)?;
    T::from_java(env, result.as_ref().map(LocalRef::raw))
}

macro_rules! reference_return {
    ($($ty:ty),* $(,)?) => {
        $(
            impl JavaReturn for $ty {
                fn call_static(env: &dyn Env, class: RawObject, method: MethodId, args: &[JValue]) -> Result<Self> {
                    object_result(env, env.call_static_object_method(class, method, args))
                }

                fn call_instance(env: &dyn Env, obj: RawObject, method: MethodId, args: &[JValue]) -> Result<Self> {
                    object_result(env, env.call_object_method(obj, method, args))
                }
            }
        )*
    };
}

reference_return!(String, Vec<String>, Vec<u8>, Vec<f32>);

#[cfg(test)]
mod tests {
    use super::*;
    use safejni_testvm::TestVm;
    use safejni_testvm::fixtures::TEST_ACTIVITY;

    fn with_method<T>(name: &str, sig: &str, f: impl FnOnce(&dyn Env, RawObject, MethodId) -> T) -> T {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        let class = LocalRef::new(&*env, env.find_class(TEST_ACTIVITY).unwrap());
        let method = env.get_static_method_id(class.raw(), name, sig).unwrap();
        f(&*env, class.raw(), method)
    }

    #[test]
    fn primitive_results() {
        with_method("echoDouble", "(D)D", |env, class, method| {
            assert_eq!(f64::call_static(env, class, method, &[JValue::Double(2.5)]).unwrap(), 2.5);
        });
        with_method("echoChar", "(C)C", |env, class, method| {
            assert_eq!(u16::call_static(env, class, method, &[JValue::Char(0x263A)]).unwrap(), 0x263A);
        });
    }

    #[test]
    fn exception_wins_over_value() {
        with_method("failInt", "()I", |env, class, method| {
            assert!(i32::call_static(env, class, method, &[]).unwrap_err().is_foreign_exception());
            assert!(!env.exception_check());
        });
    }

    #[test]
    fn reference_result_is_released() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        let class = LocalRef::new(&*env, env.find_class(TEST_ACTIVITY).unwrap());
        let method = env
            .get_static_method_id(class.raw(), "nullString", "()Ljava/lang/String;")
            .unwrap();
        assert_eq!(String::call_static(&*env, class.raw(), method, &[]).unwrap(), "");
        let echo = env.get_static_method_id(class.raw(), "echoBytes", "([B)[B").unwrap();
        let arg = LocalRef::new(&*env, env.new_byte_array(3).unwrap());
        let bytes = Vec::<u8>::call_static(&*env, class.raw(), echo, &[JValue::from(arg.raw())]).unwrap();
        assert_eq!(bytes, vec![0, 0, 0]);
        drop(arg);
        drop(class);
        assert_eq!(env.live_locals(), 0);
    }

    #[test]
    fn pointer_results() {
        with_method("echoPointer", "(J)J", |env, class, method| {
            let value = 9u64;
            let ptr = &value as *const u64;
            let arg = JValue::Long(ptr.expose_provenance() as i64);
            let back = <*const u64>::call_static(env, class, method, &[arg]).unwrap();
            assert_eq!(back, ptr);
        });
    }
}
