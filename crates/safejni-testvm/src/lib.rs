//! An in-memory Java VM for exercising the safejni bridge without a JVM.
//!
//! [`TestVm`] implements [`JavaVm`](safejni_core::JavaVm) and hands every
//! thread a [`TestEnv`] implementing [`Env`](safejni_core::Env). The VM
//! follows the JNI contract closely enough to catch the mistakes a bridge can
//! make:
//!
//! - local references live in a per-thread generational table and global
//!   references in a shared one, so leaks, double deletes and use after
//!   delete all show up in [`RefStats`]
//! - failures raise Java-style exceptions that stay pending until cleared,
//!   and calls made while one is pending are counted
//! - method lookup requires the exact name, signature and static flag, and
//!   invocation type-checks the arguments against the signature
//!
//! Classes are plain data ([`ClassDef`]) with Rust closures as method bodies.
//!
//! ```
//! use safejni_core::{Env, JValue};
//! use safejni_testvm::{TestVm, fixtures::TEST_ACTIVITY};
//!
//! let vm = TestVm::with_fixtures();
//! let env = vm.env();
//! let class = env.find_class(TEST_ACTIVITY).unwrap();
//! let echo = env.get_static_method_id(class, "echoLong", "(J)J").unwrap();
//! assert_eq!(env.call_static_long_method(class, echo, &[JValue::Long(7)]), 7);
//! env.delete_local_ref(class);
//! assert_eq!(env.stats().live_locals(), 0);
//! ```

pub mod class;
pub mod env;
pub mod fixtures;
pub mod heap;
pub mod refs;
pub mod vm;

pub use class::{ClassBuilder, ClassDef, MethodDef, NativeMethod, Throw};
pub use env::{RefStats, TestEnv};
pub use heap::{Heap, ObjId, ObjectData, Value};
pub use vm::{ATTACH_REJECTED, TestVm, TestVmBuilder};
