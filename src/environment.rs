//! Process-wide VM registration and per-thread environments.
//!
//! The VM is registered once, usually from `JNI_OnLoad`, and every thread
//! then gets its environment lazily: the thread that initialised the bridge is
//! bound directly, any other thread is attached through the VM on first use.
//! Nothing here takes a lock after initialisation.

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

use safejni_core::{AttachError, EnvHandle, JavaVm};

use crate::config::BridgeConfig;
use crate::error::Result;

static JAVA_VM: OnceLock<Arc<dyn JavaVm>> = OnceLock::new();
static CONFIG: OnceLock<BridgeConfig> = OnceLock::new();

struct Binding {
    env: EnvHandle,
    /// Whether the bridge attached this thread and therefore may detach it.
    attached: bool,
}

thread_local! {
    static CURRENT: RefCell<Option<Binding>> = const { RefCell::new(None) };
}

/// Register the VM and bind `env` to the calling thread, with the default
/// configuration.
pub fn init(vm: Arc<dyn JavaVm>, env: EnvHandle) {
    init_with_config(vm, env, BridgeConfig::default());
}

/// Register the VM and configuration and bind `env` to the calling thread.
///
/// Only the first call registers anything; later calls just rebind the
/// calling thread's environment.
pub fn init_with_config(vm: Arc<dyn JavaVm>, env: EnvHandle, config: BridgeConfig) {
    if JAVA_VM.set(vm).is_ok() {
        log::debug!("Java VM registered");
    } else {
        log::debug!("Java VM already registered; rebinding the calling thread");
    }
    if CONFIG.set(config).is_err() && CONFIG.get() != Some(&config) {
        log::warn!("bridge configuration already set; ignoring {config:?}");
    }
    bind(env, false);
}

/// The calling thread's environment, attaching the thread if necessary.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn attach_current_thread() -> Result<EnvHandle> {
    if let Some(env) = current() {
        return Ok(env);
    }
    let vm = JAVA_VM.get().ok_or(AttachError::NotInitialized)?;
    let attached = vm.attach_current_thread().inspect_err(|err| {
        log::error!("failed to attach thread {:?}: {err}", std::thread::current().id());
    })?;
    let is_new = attached.is_new();
    if is_new {
        log::debug!("attached thread {:?} to the Java VM", std::thread::current().id());
    }
    let env = attached.into_env();
    bind(env.clone(), is_new);
    Ok(env)
}

/// The environment bound to the calling thread, if any.
pub fn current() -> Option<EnvHandle> {
    CURRENT
        .try_with(|current| current.borrow().as_ref().map(|b| b.env.clone()))
        .ok()
        .flatten()
}

/// Forget the calling thread's environment, detaching the thread from the VM
/// if the bridge attached it.
///
/// Threads that already had an environment when the bridge first saw them
/// stay attached. If detaching fails the binding is kept.
pub fn detach_current_thread() -> Result<()> {
    let attached = CURRENT
        .try_with(|current| current.borrow().as_ref().is_some_and(|b| b.attached))
        .unwrap_or(false);
    if attached && let Some(vm) = JAVA_VM.get() {
        vm.detach_current_thread()?;
        log::debug!("detached thread {:?} from the Java VM", std::thread::current().id());
    }
    let _ = CURRENT.try_with(|current| current.borrow_mut().take());
    Ok(())
}

/// Whether a VM has been registered.
pub fn is_initialized() -> bool {
    JAVA_VM.get().is_some()
}

/// The active configuration, or the default one before initialisation.
pub fn config() -> BridgeConfig {
    CONFIG.get().copied().unwrap_or_default()
}

fn bind(env: EnvHandle, attached: bool) {
    let _ = CURRENT.try_with(|current| {
        *current.borrow_mut() = Some(Binding { env, attached });
    });
}
