//! Owned Java objects.

use std::fmt;

use safejni_core::{Env, RawObject};

use crate::args::JavaArgs;
use crate::dispatch;
use crate::error::Result;
use crate::invoke::JavaReturn;
use crate::refs::GlobalRef;

/// A Java object kept alive by a global reference, tagged with its class.
///
/// The class name is what instance calls resolve methods against, so it
/// should be the object's runtime class or a superclass declaring the
/// methods you intend to call.
///
/// Dropping a `JavaObject` releases its reference through the dropping
/// thread's environment. Use [`release`](Self::release) when an environment
/// is already at hand.
pub struct JavaObject {
    class_name: String,
    object: GlobalRef,
}

impl JavaObject {
    /// Adopt `raw` as a new global reference owner.
    ///
    /// The caller keeps ownership of `raw` itself; only a new global
    /// reference is stored.
    pub fn from_local(env: &dyn Env, raw: RawObject, class: &str) -> Result<Self> {
        Ok(Self {
            class_name: class.to_string(),
            object: GlobalRef::from_object(env, raw)?,
        })
    }

    /// Construct an instance of `class` on the calling thread.
    pub fn new<A: JavaArgs>(class: &str, args: A) -> Result<Self> {
        dispatch::construct(class, args)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The underlying global reference.
    pub fn raw(&self) -> RawObject {
        self.object.raw()
    }

    /// Call an instance method on the calling thread.
    pub fn call<R: JavaReturn, A: JavaArgs>(&self, method: &str, args: A) -> Result<R> {
        dispatch::call(self, method, args)
    }

    /// Call an instance method through `env`.
    pub fn call_in<R: JavaReturn, A: JavaArgs>(&self, env: &dyn Env, method: &str, args: A) -> Result<R> {
        dispatch::call_method_in(env, self.raw(), &self.class_name, method, args)
    }

    /// Release the reference through `env` instead of on drop.
    pub fn release(self, env: &dyn Env) {
        self.object.release(env);
    }
}

impl fmt::Debug for JavaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JavaObject")
            .field("class", &self.class_name)
            .field("object", &self.object.raw())
            .finish()
    }
}
