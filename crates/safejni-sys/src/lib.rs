//! The JNI backend for safejni.
//!
//! Implements the bridge's [`Env`](safejni_core::Env) and
//! [`JavaVm`](safejni_core::JavaVm) traits over the raw JNI function tables
//! and provides the `JNI_OnLoad` hook that registers the VM:
//!
//! ```ignore
//! safejni_sys::export_jni_onload!();
//! ```
//!
//! or, with a custom configuration:
//!
//! ```ignore
//! safejni_sys::export_jni_onload!(safejni_sys::BridgeConfig::new().with_method_cache(false));
//! ```

pub mod env;
pub mod mutf8;
pub mod raw;
pub mod vm;

use std::rc::Rc;
use std::sync::Arc;

pub use env::NativeEnv;
pub use safejni::BridgeConfig;
pub use vm::NativeVm;

use raw::{JNI_ERR, JavaVM, jint};

/// Register `vm` with the bridge using the default configuration.
///
/// Returns the JNI version the library needs, or `JNI_ERR`.
///
/// # Safety
///
/// `vm` must be null or the `JavaVM` passed to `JNI_OnLoad`, and the calling
/// thread must be attached to it.
pub unsafe fn on_load(vm: *mut JavaVM) -> jint {
    // SAFETY: forwarded from the caller.
    unsafe { on_load_with_config(vm, BridgeConfig::default()) }
}

/// Register `vm` with the bridge using `config`.
///
/// # Safety
///
/// As for [`on_load`].
pub unsafe fn on_load_with_config(vm: *mut JavaVM, config: BridgeConfig) -> jint {
    if vm.is_null() {
        log::error!("JNI_OnLoad received a null JavaVM");
        return JNI_ERR;
    }
    let version = config.jni_version();
    // SAFETY: `vm` is the loading VM, which lives for the rest of the process.
    let vm = unsafe { NativeVm::from_raw(vm, version) };
    let env = match vm.get_env() {
        Ok(env) => env,
        Err(status) => {
            log::error!("GetEnv for JNI version {version:#x} failed with status {status}");
            return JNI_ERR;
        }
    };
    safejni::init_with_config(Arc::new(vm), Rc::new(env), config);
    version
}

/// Export a `JNI_OnLoad` that registers the loading VM with the bridge.
///
/// Takes an optional [`BridgeConfig`] expression.
#[macro_export]
macro_rules! export_jni_onload {
    () => {
        $crate::export_jni_onload!($crate::BridgeConfig::new());
    };
    ($config:expr) => {
        #[unsafe(no_mangle)]
        pub extern "system" fn JNI_OnLoad(
            vm: *mut $crate::raw::JavaVM,
            _reserved: *mut ::std::ffi::c_void,
        ) -> $crate::raw::jint {
            // SAFETY: the JVM calls JNI_OnLoad on an attached thread with its
            // own JavaVM.
            unsafe { $crate::on_load_with_config(vm, $config) }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::JNI_OK;
    use crate::vm::fake::{GET_ENV_STATUS, REQUESTED_VERSION, java_vm};

    #[test]
    fn null_vm_is_rejected() {
        assert_eq!(unsafe { on_load(std::ptr::null_mut()) }, JNI_ERR);
    }

    #[test]
    fn load_registers_the_vm() {
        GET_ENV_STATUS.set(-3);
        let mut raw = java_vm();
        assert_eq!(unsafe { on_load(&mut *raw) }, JNI_ERR);
        assert!(!safejni::is_initialized());

        GET_ENV_STATUS.set(JNI_OK);
        let config = BridgeConfig::new().with_method_cache(false);
        // The registered VM lives for the rest of the test process.
        let raw = Box::leak(raw);
        assert_eq!(unsafe { on_load_with_config(raw, config) }, config.jni_version());
        assert_eq!(REQUESTED_VERSION.get(), config.jni_version());
        assert!(safejni::is_initialized());
        assert_eq!(safejni::config(), config);
    }
}
