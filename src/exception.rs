//! Translation of pending Java exceptions into [`Error::ForeignException`].

use safejni_core::{Env, RawObject, Signature, THROWABLE_CLASS};

use crate::environment;
use crate::error::{Error, Result};
use crate::refs::LocalRef;

/// Convert a pending exception into an error, clearing it.
///
/// The exception's message is read through `Throwable.getMessage()` with raw
/// environment calls, so a failure while reading it cannot recurse back here;
/// it is cleared and the message falls back to the empty string.
pub fn check_exception(env: &dyn Env) -> Result<()> {
    if !env.exception_check() {
        return Ok(());
    }

    let throwable = env.exception_occurred();
    if environment::config().describe_exceptions() {
        env.exception_describe();
    }
    env.exception_clear();

    let message = match LocalRef::from_raw(env, throwable) {
        Some(throwable) => exception_message(env, throwable.raw()),
        None => String::new(),
    };
    log::error!("Java exception: {message}");
    Err(Error::ForeignException { message })
}

fn exception_message(env: &dyn Env, throwable: RawObject) -> String {
    let Some(class) = LocalRef::from_raw(env, env.find_class(THROWABLE_CLASS)) else {
        env.exception_clear();
        return String::new();
    };
    let Some(get_message) = env.get_method_id(class.raw(), "getMessage", Signature::<String, ()>::get()) else {
        env.exception_clear();
        return String::new();
    };

    let message = LocalRef::from_raw(env, env.call_object_method(throwable, get_message, &[]));
    if env.exception_check() {
        env.exception_clear();
        return String::new();
    }
    message
        .and_then(|message| env.get_string_utf_chars(message.raw()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use safejni_testvm::{TestVm, Throw};

    #[test]
    fn no_pending_exception_is_ok() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        assert!(check_exception(&*env).is_ok());
    }

    #[test]
    fn pending_exception_becomes_error() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        env.throw(Throw::runtime("boom"));
        let err = check_exception(&*env).unwrap_err();
        assert_eq!(err, Error::foreign("boom"));
        assert!(!env.exception_check());
    }

    #[test]
    fn missing_message_is_empty() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        env.throw(Throw::null_pointer());
        assert_eq!(check_exception(&*env).unwrap_err(), Error::foreign(""));
    }

    #[test]
    fn releases_every_reference() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        let before = env.stats();
        env.throw(Throw::runtime("boom"));
        let _ = check_exception(&*env);
        let delta = env.stats().since(&before);
        assert_eq!(delta.live_locals(), 0);
        assert_eq!(delta.invalid_references, 0);
        assert_eq!(delta.calls_with_pending_exception, 0);
    }

    #[test]
    fn message_lookup_failure_falls_back_to_empty() {
        let bare = TestVm::builder()
            .class(safejni_testvm::ClassDef::build("java/lang/Throwable").finish())
            .build();
        let bare_env = bare.env();
        bare_env.throw(Throw::runtime("hidden"));
        assert_eq!(check_exception(&*bare_env).unwrap_err(), Error::foreign(""));
        assert!(!bare_env.exception_check());
    }
}
