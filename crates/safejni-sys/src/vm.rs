//! [`JavaVm`] on top of a real `JavaVM`.

use std::ffi::c_void;
use std::ptr;
use std::rc::Rc;

use safejni_core::{AttachError, Attached, JavaVm};

use crate::env::NativeEnv;
use crate::raw::{JNI_ERR, JNI_OK, JNIEnv, JavaVM, jint};

/// `GetEnv` status for a thread that is not attached.
pub const JNI_EDETACHED: jint = -2;

/// The process-wide `JavaVM`.
pub struct NativeVm {
    raw: *mut JavaVM,
    version: jint,
}

// SAFETY: the JNI invocation interface may be used from any thread.
unsafe impl Send for NativeVm {}
// SAFETY: as above; `NativeVm` holds no thread-affine state.
unsafe impl Sync for NativeVm {}

impl NativeVm {
    /// Wrap a `JavaVM` pointer, requesting environments of `version`.
    ///
    /// # Safety
    ///
    /// `raw` must be a valid `JavaVM` that outlives the returned value.
    pub unsafe fn from_raw(raw: *mut JavaVM, version: jint) -> Self {
        Self { raw, version }
    }

    pub fn as_raw(&self) -> *mut JavaVM {
        self.raw
    }

    /// `GetEnv`: the calling thread's environment if it is attached.
    pub fn get_env(&self) -> Result<NativeEnv, jint> {
        let mut env: *mut c_void = ptr::null_mut();
        // SAFETY: `raw` is valid (see `from_raw`).
        let status = unsafe { ((**self.raw).get_env)(self.raw, &mut env, self.version) };
        self.wrap_env(status, env)
    }

    fn attach(&self) -> Result<NativeEnv, jint> {
        let mut env: *mut c_void = ptr::null_mut();
        // SAFETY: `raw` is valid; null thread arguments request the defaults.
        let status = unsafe { ((**self.raw).attach_current_thread)(self.raw, &mut env, ptr::null_mut()) };
        self.wrap_env(status, env)
    }

    fn wrap_env(&self, status: jint, env: *mut c_void) -> Result<NativeEnv, jint> {
        if status != JNI_OK || env.is_null() {
            return Err(if status == JNI_OK { JNI_ERR } else { status });
        }
        // SAFETY: the VM handed out an environment for the calling thread.
        Ok(unsafe { NativeEnv::from_raw(env.cast::<JNIEnv>()) })
    }
}

impl JavaVm for NativeVm {
    fn attach_current_thread(&self) -> Result<Attached, AttachError> {
        match self.get_env() {
            Ok(env) => Ok(Attached::Existing(Rc::new(env))),
            Err(JNI_EDETACHED) => {
                let env = self.attach().map_err(|status| AttachError::Rejected { status })?;
                Ok(Attached::New(Rc::new(env)))
            }
            Err(status) => Err(AttachError::Rejected { status }),
        }
    }

    fn detach_current_thread(&self) -> Result<(), AttachError> {
        // SAFETY: `raw` is valid (see `from_raw`).
        let status = unsafe { ((**self.raw).detach_current_thread)(self.raw) };
        if status == JNI_OK {
            Ok(())
        } else {
            Err(AttachError::Rejected { status })
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::*;
    use super::*;

    #[test]
    fn attached_thread_uses_get_env() {
        GET_ENV_STATUS.set(JNI_OK);
        let mut raw = java_vm();
        let vm = unsafe { NativeVm::from_raw(&mut *raw, 0x0001_0008) };
        let attached = vm.attach_current_thread().unwrap();
        assert!(!attached.is_new(), "a thread the VM already knows is not ours to detach");
        assert_eq!(REQUESTED_VERSION.get(), 0x0001_0008);
    }

    #[test]
    fn detached_thread_is_attached() {
        GET_ENV_STATUS.set(JNI_EDETACHED);
        ATTACH_STATUS.set(JNI_OK);
        let mut raw = java_vm();
        let vm = unsafe { NativeVm::from_raw(&mut *raw, 0x0001_0006) };
        assert!(vm.attach_current_thread().unwrap().is_new());
        assert!(vm.detach_current_thread().is_ok());
    }

    #[test]
    fn rejected_attach_reports_status() {
        GET_ENV_STATUS.set(JNI_EDETACHED);
        ATTACH_STATUS.set(JNI_ERR);
        let mut raw = java_vm();
        let vm = unsafe { NativeVm::from_raw(&mut *raw, 0x0001_0006) };
        assert_eq!(
            vm.attach_current_thread().err(),
            Some(AttachError::Rejected { status: JNI_ERR })
        );
    }

    #[test]
    fn unsupported_version_is_not_retried() {
        GET_ENV_STATUS.set(-3);
        ATTACH_STATUS.set(JNI_OK);
        let mut raw = java_vm();
        let vm = unsafe { NativeVm::from_raw(&mut *raw, 0x0001_0006) };
        assert_eq!(vm.attach_current_thread().err(), Some(AttachError::Rejected { status: -3 }));
    }
}
