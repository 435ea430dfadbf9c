//! Shared setup for the integration tests.
//!
//! The bridge registers one VM per process, so every test in a binary shares
//! the same [`TestVm`]. Reference counters are per thread, and each test runs
//! on its own thread, so tests can compare counters without interfering.

#![allow(dead_code)]

use std::rc::Rc;
use std::sync::{Arc, OnceLock};

use safejni_testvm::{RefStats, TestEnv, TestVm};

static VM: OnceLock<TestVm> = OnceLock::new();

/// The shared VM, registered with the bridge on first use.
pub fn vm() -> &'static TestVm {
    vm_with(TestVm::with_fixtures)
}

/// Like [`vm`], but the first use in the binary builds the VM with `build`.
///
/// A binary with its own VM must call this before [`env`] or [`measure`].
pub fn vm_with(build: impl FnOnce() -> TestVm) -> &'static TestVm {
    VM.get_or_init(|| {
        let vm = build();
        safejni::init(Arc::new(vm.clone()), vm.env());
        vm
    })
}

/// The calling thread's environment on the shared VM.
pub fn env() -> Rc<TestEnv> {
    vm().env()
}

/// Run `f` and return the reference activity it caused on this thread.
pub fn measure<T>(f: impl FnOnce() -> T) -> (T, RefStats) {
    let env = env();
    let before = env.stats();
    let result = f();
    (result, env.stats().since(&before))
}

/// Assert that `stats` shows no leaked, invalid or misused references.
pub fn assert_balanced(stats: &RefStats) {
    assert_eq!(stats.live_locals(), 0, "leaked local references: {stats:?}");
    assert_eq!(stats.live_globals(), 0, "leaked global references: {stats:?}");
    assert_eq!(stats.invalid_references, 0, "invalid references: {stats:?}");
    assert_eq!(stats.calls_with_pending_exception, 0, "calls with a pending exception: {stats:?}");
}
