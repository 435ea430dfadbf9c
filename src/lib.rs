//! Type-safe calls from Rust into a Java VM.
//!
//! The JNI signature of every call is derived from its Rust argument and
//! return types at compile time, arguments are marshaled into Java values,
//! methods are resolved once and cached, and every local reference a call
//! creates is released before it returns. A pending Java exception becomes
//! [`Error::ForeignException`].
//!
//! # Quick start
//!
//! ```no_run
//! use safejni::JavaObject;
//!
//! # fn run() -> safejni::Result<()> {
//! let upper: Vec<String> = safejni::call_static(
//!     "com/example/Names",
//!     "toUpper",
//!     (vec!["Nesta".to_string(), "Baresi".to_string()],),
//! )?;
//!
//! let ninja = JavaObject::new("com/example/Ninja", ("Snake",))?;
//! let name: String = ninja.call("getName", ())?;
//! # Ok(())
//! # }
//! ```
//!
//! The VM is registered with [`init`] (or by `safejni-sys` from `JNI_OnLoad`).
//!
//! # Supported types
//!
//! | Rust | Java |
//! |------|------|
//! | `()` | `void` (return only) |
//! | `bool`, `i8`, `u16`, `i16`, `i32`, `i64`, `f32`, `f64` | `boolean`, `byte`, `char`, `short`, `int`, `long`, `float`, `double` |
//! | `&str`, `String` | `java.lang.String` |
//! | `&[String]`, `&[&str]`, `Vec<String>` | `String[]` |
//! | `&[u8]`, `Vec<u8>` | `byte[]` |
//! | `&[f32]`, `Vec<f32>` | `float[]` |
//! | `HashMap<String, String>` | `java.util.HashMap` (argument only) |
//! | `*const T`, `*mut T` | `long` holding the address |

mod args;
mod config;
mod dispatch;
mod environment;
mod error;
mod exception;
mod invoke;
mod marshal;
mod object;
mod refs;
mod resolver;
mod tracker;

pub use args::JavaArgs;
pub use config::{BridgeConfig, JNI_VERSION_1_6};
pub use dispatch::{call, call_method, call_method_in, call_static, call_static_in, construct, construct_in};
pub use environment::{attach_current_thread, config, current, detach_current_thread, init, init_with_config, is_initialized};
pub use error::{Error, Result};
pub use exception::check_exception;
pub use invoke::JavaReturn;
pub use marshal::{FromJava, Marshaled, ToJava};
pub use object::JavaObject;
pub use refs::{GlobalRef, LocalRef};
pub use resolver::{MethodHandle, cached_method_count, clear_method_cache, resolve};
pub use tracker::HandleTracker;

pub use safejni_core::{
    ArgTypes, AttachError, Attached, Env, EnvHandle, JValue, JavaType, JavaVm, MethodId, RawObject, Signature,
};
