//! Owning wrappers for local and global references.

use std::fmt;
use std::mem::ManuallyDrop;

use safejni_core::{Env, RawObject};

use crate::environment;
use crate::error::{Error, Result};
use crate::exception::check_exception;

/// A local reference released when dropped.
///
/// Local references belong to one environment and one thread; the borrow of
/// the environment keeps the guard from escaping either.
pub struct LocalRef<'env> {
    env: &'env dyn Env,
    raw: RawObject,
}

impl<'env> LocalRef<'env> {
    /// Take ownership of a local reference.
    pub fn new(env: &'env dyn Env, raw: RawObject) -> Self {
        Self { env, raw }
    }

    /// Take ownership of a possibly-null local reference.
    pub fn from_raw(env: &'env dyn Env, raw: Option<RawObject>) -> Option<Self> {
        raw.map(|raw| Self::new(env, raw))
    }

    pub fn raw(&self) -> RawObject {
        self.raw
    }

    pub fn env(&self) -> &'env dyn Env {
        self.env
    }

    /// Give up ownership without releasing the reference.
    pub fn into_raw(self) -> RawObject {
        ManuallyDrop::new(self).raw
    }
}

impl Drop for LocalRef<'_> {
    fn drop(&mut self) {
        self.env.delete_local_ref(self.raw);
    }
}

impl fmt::Debug for LocalRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalRef").field(&self.raw).finish()
    }
}

/// A global reference, released exactly once.
///
/// Global references are valid on every thread, so the wrapper is `Send` and
/// `Sync`. Dropping it releases the reference through the dropping thread's
/// environment, attaching the thread if needed; when no VM is reachable the
/// reference is leaked with a warning.
pub struct GlobalRef {
    raw: RawObject,
}

impl GlobalRef {
    /// Create a global reference to the object behind `local`.
    pub fn promote(env: &dyn Env, local: &LocalRef<'_>) -> Result<Self> {
        Self::from_object(env, local.raw())
    }

    /// Create a global reference to any live reference.
    pub fn from_object(env: &dyn Env, obj: RawObject) -> Result<Self> {
        match env.new_global_ref(obj) {
            Some(raw) => Ok(Self { raw }),
            None => {
                check_exception(env)?;
                Err(Error::NullResult { what: "NewGlobalRef" })
            }
        }
    }

    pub fn raw(&self) -> RawObject {
        self.raw
    }

    /// Release the reference through a known environment.
    pub fn release(self, env: &dyn Env) {
        let this = ManuallyDrop::new(self);
        env.delete_global_ref(this.raw);
    }
}

impl Drop for GlobalRef {
    fn drop(&mut self) {
        match environment::attach_current_thread() {
            Ok(env) => env.delete_global_ref(self.raw),
            Err(err) => log::warn!("leaking global reference {:?}: {err}", self.raw),
        }
    }
}

impl fmt::Debug for GlobalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobalRef").field(&self.raw).finish()
    }
}
