//! Call-scoped tracking of argument references.

use safejni_core::{Env, RawObject};

use crate::error::Result;
use crate::exception::check_exception;
use crate::refs::LocalRef;

/// The local references created while marshaling one call's arguments.
///
/// Sized up front from the argument types. Every tracked reference is
/// released by [`finish`](Self::finish) on success or by `Drop` on any early
/// return, so a call never leaks argument references.
pub struct HandleTracker<'env> {
    env: &'env dyn Env,
    refs: Vec<LocalRef<'env>>,
    capacity: usize,
}

impl<'env> HandleTracker<'env> {
    pub fn with_capacity(env: &'env dyn Env, capacity: usize) -> Self {
        Self {
            env,
            refs: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Track a reference until the call completes, returning its raw handle.
    pub fn adopt(&mut self, local: LocalRef<'env>) -> RawObject {
        debug_assert!(
            self.refs.len() < self.capacity,
            "more argument references than reference-typed arguments ({})",
            self.capacity
        );
        let raw = local.raw();
        self.refs.push(local);
        raw
    }

    pub fn env(&self) -> &'env dyn Env {
        self.env
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Release every tracked reference, then surface any pending exception.
    pub fn finish(mut self) -> Result<()> {
        self.refs.clear();
        check_exception(self.env)
    }
}

impl Drop for HandleTracker<'_> {
    fn drop(&mut self) {
        if self.refs.is_empty() {
            return;
        }
        let pending = self.env.exception_check();
        self.refs.clear();
        if !pending && self.env.exception_check() {
            log::warn!("exception raised while releasing call references; clearing it");
            self.env.exception_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use safejni_testvm::{TestVm, Throw};

    #[test]
    fn finish_releases_everything() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        let mut tracker = HandleTracker::with_capacity(&*env, 2);
        tracker.adopt(LocalRef::new(&*env, env.new_string_utf("a").unwrap()));
        tracker.adopt(LocalRef::new(&*env, env.new_string_utf("b").unwrap()));
        assert_eq!(tracker.len(), 2);
        assert_eq!(env.live_locals(), 2);
        tracker.finish().unwrap();
        assert_eq!(env.live_locals(), 0);
    }

    #[test]
    fn drop_releases_everything() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        {
            let mut tracker = HandleTracker::with_capacity(&*env, 1);
            tracker.adopt(LocalRef::new(&*env, env.new_string_utf("a").unwrap()));
        }
        assert_eq!(env.live_locals(), 0);
        assert_eq!(env.stats().invalid_references, 0);
    }

    #[test]
    fn finish_reports_pending_exception_after_cleanup() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        let mut tracker = HandleTracker::with_capacity(&*env, 1);
        tracker.adopt(LocalRef::new(&*env, env.new_string_utf("a").unwrap()));
        env.throw(Throw::runtime("late"));
        assert_eq!(tracker.finish().unwrap_err(), Error::foreign("late"));
        assert_eq!(env.live_locals(), 0);
        assert!(!env.exception_check());
    }

    #[test]
    fn empty_tracker() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        let tracker = HandleTracker::with_capacity(&*env, 0);
        assert!(tracker.is_empty());
        assert!(tracker.finish().is_ok());
    }
}
