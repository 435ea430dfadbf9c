//! Class and method resolution with a process-wide cache.
//!
//! Resolving a method costs a class lookup, a method lookup and a global
//! reference. Successful resolutions are kept for the life of the process,
//! keyed by a [`MethodKey`] over `(class, method, signature, is_static)`.
//! Failures are never cached, so a class that appears later (for example
//! after a class loader change) resolves on the next call.

use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use rustc_hash::FxHashMap;
use safejni_core::{Env, MethodId, MethodKey, RawObject};

use crate::environment;
use crate::error::{Error, Result};
use crate::exception::check_exception;
use crate::refs::{GlobalRef, LocalRef};

type MethodCache = RwLock<FxHashMap<MethodKey, Arc<MethodHandle>>>;

fn method_cache() -> &'static MethodCache {
    static CACHE: OnceLock<MethodCache> = OnceLock::new();
    CACHE.get_or_init(Default::default)
}

/// A resolved method together with the class that keeps its ID valid.
pub struct MethodHandle {
    class: GlobalRef,
    method: MethodId,
    is_static: bool,
    class_name: String,
    method_name: String,
    signature: String,
}

impl MethodHandle {
    /// The declaring class, pinned by a global reference.
    pub fn class(&self) -> RawObject {
        self.class.raw()
    }

    pub fn method_id(&self) -> MethodId {
        self.method
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Release the class reference through a known environment.
    pub fn release(self, env: &dyn Env) {
        self.class.release(env);
    }

    fn matches(&self, class: &str, method: &str, signature: &str, is_static: bool) -> bool {
        self.is_static == is_static
            && self.class_name == class
            && self.method_name == method
            && self.signature == signature
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodHandle")
            .field("class", &self.class_name)
            .field("method", &self.method_name)
            .field("signature", &self.signature)
            .field("is_static", &self.is_static)
            .finish()
    }
}

/// Release a handle the caller no longer needs, unless it is shared.
pub fn release_handle(env: &dyn Env, handle: Arc<MethodHandle>) {
    if let Ok(handle) = Arc::try_unwrap(handle) {
        handle.release(env);
    }
}

/// Resolve `class.method` with the exact `signature`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn resolve(env: &dyn Env, class: &str, method: &str, signature: &str, is_static: bool) -> Result<Arc<MethodHandle>> {
    let caching = environment::config().cache_method_handles();
    let key = MethodKey::new(class, method, signature, is_static);

    if caching {
        let cache = method_cache().read().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = cache.get(&key)
            && handle.matches(class, method, signature, is_static)
        {
            return Ok(handle.clone());
        }
    }

    let handle = Arc::new(lookup(env, class, method, signature, is_static)?);
    if !caching {
        return Ok(handle);
    }

    let mut cache = method_cache().write().unwrap_or_else(PoisonError::into_inner);
    match cache.entry(key) {
        Entry::Vacant(entry) => {
            log::debug!("caching {class}.{method}{signature} as {key:?}");
            entry.insert(handle.clone());
            Ok(handle)
        }
        Entry::Occupied(entry) if entry.get().matches(class, method, signature, is_static) => {
            // Resolved concurrently by another thread; keep the first.
            let cached = entry.get().clone();
            drop(cache);
            release_handle(env, handle);
            Ok(cached)
        }
        Entry::Occupied(_) => {
            log::warn!("method key collision for {class}.{method}{signature}; not caching");
            Ok(handle)
        }
    }
}

fn lookup(env: &dyn Env, class_name: &str, method: &str, signature: &str, is_static: bool) -> Result<MethodHandle> {
    let Some(class) = LocalRef::from_raw(env, env.find_class(class_name)) else {
        if let Err(err) = check_exception(env) {
            log::debug!("looking up {class_name} raised: {err}");
        }
        return Err(Error::class_not_found(class_name));
    };

    let method_id = if is_static {
        env.get_static_method_id(class.raw(), method, signature)
    } else {
        env.get_method_id(class.raw(), method, signature)
    };
    let Some(method_id) = method_id else {
        if let Err(err) = check_exception(env) {
            log::debug!("looking up {class_name}.{method}{signature} raised: {err}");
        }
        return Err(Error::method_not_found(class_name, method, signature, is_static));
    };

    let class = GlobalRef::promote(env, &class)?;
    log::debug!("resolved {class_name}.{method}{signature} (static: {is_static})");
    Ok(MethodHandle {
        class,
        method: method_id,
        is_static,
        class_name: class_name.to_string(),
        method_name: method.to_string(),
        signature: signature.to_string(),
    })
}

/// Drop every cached method handle.
///
/// Handles still held by in-flight calls stay valid until those calls end.
pub fn clear_method_cache() {
    let drained = std::mem::take(&mut *method_cache().write().unwrap_or_else(PoisonError::into_inner));
    log::debug!("cleared {} cached method handles", drained.len());
}

/// Number of cached method handles.
pub fn cached_method_count() -> usize {
    method_cache().read().unwrap_or_else(PoisonError::into_inner).len()
}
