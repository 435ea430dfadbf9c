//! The in-memory virtual machine.

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;
use safejni_core::{AttachError, Attached, JavaVm, MethodId};

use crate::class::{ClassDef, MethodDef};
use crate::env::TestEnv;
use crate::fixtures;
use crate::heap::Heap;
use crate::refs::{RefKind, RefTable};

/// Status returned when attachment is refused, or when detaching a thread
/// that was not attached through [`JavaVm::attach_current_thread`]; `JNI_ERR`.
pub const ATTACH_REJECTED: i32 = -1;

static NEXT_VM_ID: AtomicU64 = AtomicU64::new(1);

/// Who attached a thread to a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attachment {
    /// The VM's own thread, as for Java code calling into native code.
    Vm,
    /// Attached through `attach_current_thread`.
    Native,
}

thread_local! {
    static THREAD_ENVS: RefCell<FxHashMap<u64, Rc<TestEnv>>> = RefCell::new(FxHashMap::default());
    static ATTACHMENTS: RefCell<FxHashMap<u64, Attachment>> = RefCell::new(FxHashMap::default());
}

/// A method with its declaring class.
#[derive(Debug)]
pub(crate) struct MethodEntry {
    pub class: String,
    pub def: MethodDef,
}

/// State shared by every thread attached to one VM.
pub(crate) struct Shared {
    pub id: u64,
    pub heap: Mutex<Heap>,
    pub globals: Mutex<RefTable>,
    pub classes: FxHashMap<String, ClassDef>,
    pub methods: Vec<MethodEntry>,
    method_index: FxHashMap<(String, String, String), usize>,
    accept_attach: AtomicBool,
    detaches: AtomicUsize,
}

impl Shared {
    pub fn heap(&self) -> MutexGuard<'_, Heap> {
        self.heap.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn globals(&self) -> MutexGuard<'_, RefTable> {
        self.globals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look a method up on `class` and its superclasses.
    pub fn find_method(&self, class: &str, name: &str, signature: &str, is_static: bool) -> Option<MethodId> {
        let mut current = Some(class);
        while let Some(class_name) = current {
            let def = self.classes.get(class_name)?;
            if let Some(method) = def.method(name, signature)
                && method.is_static == is_static
            {
                let key = (class_name.to_string(), name.to_string(), signature.to_string());
                let index = *self.method_index.get(&key)?;
                return Some(MethodId::from_addr(NonZeroUsize::MIN.saturating_add(index)));
            }
            current = def.super_class.as_deref();
        }
        None
    }

    pub fn method(&self, id: MethodId) -> Option<&MethodEntry> {
        self.methods.get(id.addr().get() - 1)
    }

    /// Whether `class` is `ancestor` or one of its subclasses.
    pub fn is_subclass(&self, class: &str, ancestor: &str) -> bool {
        let mut current = Some(class);
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            current = self.classes.get(name).and_then(|c| c.super_class.as_deref());
        }
        false
    }
}

/// An in-memory Java VM.
///
/// Cloning is cheap and yields a handle to the same VM. Each thread gets its
/// own [`TestEnv`] the first time it attaches, and keeps it for the lifetime
/// of the thread.
///
/// ```
/// use safejni_testvm::TestVm;
///
/// let vm = TestVm::with_fixtures();
/// let env = vm.env();
/// assert_eq!(env.stats().live_locals(), 0);
/// ```
#[derive(Clone)]
pub struct TestVm {
    shared: Arc<Shared>,
}

impl TestVm {
    /// Start a VM with the core `java.lang` / `java.util` classes.
    pub fn builder() -> TestVmBuilder {
        TestVmBuilder {
            classes: fixtures::standard_classes(),
        }
    }

    /// A VM with the standard classes plus the test fixtures
    /// (`com/safejni/test/TestActivity`, `com/safejni/test/Ninja`).
    pub fn with_fixtures() -> Self {
        Self::builder()
            .class(fixtures::test_activity())
            .class(fixtures::ninja())
            .build()
    }

    /// Like [`with_fixtures`](Self::with_fixtures) but missing one class, for
    /// exercising lookup failures.
    pub fn with_fixtures_without(class: &str) -> Self {
        Self::builder()
            .class(fixtures::test_activity())
            .class(fixtures::ninja())
            .without(class)
            .build()
    }

    /// The calling thread's environment.
    ///
    /// A thread without an attachment becomes one of the VM's own threads,
    /// so [`JavaVm::attach_current_thread`] reports it as
    /// [`Attached::Existing`] and refuses to detach it. Unlike attaching, this
    /// never fails, and it returns the concrete type so tests can inspect
    /// [`RefStats`](crate::RefStats).
    pub fn env(&self) -> Rc<TestEnv> {
        ATTACHMENTS.with(|attachments| {
            attachments.borrow_mut().entry(self.shared.id).or_insert(Attachment::Vm);
        });
        self.thread_env()
    }

    fn thread_env(&self) -> Rc<TestEnv> {
        THREAD_ENVS.with(|envs| {
            envs.borrow_mut()
                .entry(self.shared.id)
                .or_insert_with(|| Rc::new(TestEnv::new(self.shared.clone())))
                .clone()
        })
    }

    /// Make subsequent [`JavaVm::attach_current_thread`] calls fail with
    /// [`ATTACH_REJECTED`].
    pub fn set_accept_attach(&self, accept: bool) {
        self.shared.accept_attach.store(accept, Ordering::SeqCst);
    }

    /// Number of successful [`JavaVm::detach_current_thread`] calls.
    pub fn detach_count(&self) -> usize {
        self.shared.detaches.load(Ordering::SeqCst)
    }

    /// Number of live global references across all threads.
    pub fn live_globals(&self) -> usize {
        self.shared.globals().live()
    }

    /// Number of objects allocated so far.
    pub fn object_count(&self) -> usize {
        self.shared.heap().len()
    }
}

impl JavaVm for TestVm {
    fn attach_current_thread(&self) -> Result<Attached, AttachError> {
        let id = self.shared.id;
        if ATTACHMENTS.with(|attachments| attachments.borrow().contains_key(&id)) {
            return Ok(Attached::Existing(self.thread_env()));
        }
        if !self.shared.accept_attach.load(Ordering::SeqCst) {
            return Err(AttachError::Rejected {
                status: ATTACH_REJECTED,
            });
        }
        ATTACHMENTS.with(|attachments| attachments.borrow_mut().insert(id, Attachment::Native));
        Ok(Attached::New(self.thread_env()))
    }

    // The thread keeps its environment so tests can still read its counters.
    fn detach_current_thread(&self) -> Result<(), AttachError> {
        let id = self.shared.id;
        let removed = ATTACHMENTS.with(|attachments| {
            let mut attachments = attachments.borrow_mut();
            match attachments.get(&id) {
                Some(Attachment::Native) => attachments.remove(&id).is_some(),
                _ => false,
            }
        });
        if !removed {
            log::warn!("detach requested for a thread not attached through attach_current_thread");
            return Err(AttachError::Rejected {
                status: ATTACH_REJECTED,
            });
        }
        self.shared.detaches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for TestVm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestVm")
            .field("id", &self.shared.id)
            .field("class_count", &self.shared.classes.len())
            .field("method_count", &self.shared.methods.len())
            .finish()
    }
}

/// Builder for [`TestVm`].
pub struct TestVmBuilder {
    classes: Vec<ClassDef>,
}

impl TestVmBuilder {
    /// Add a class. A later definition with the same name replaces an earlier one.
    pub fn class(mut self, class: ClassDef) -> Self {
        self.classes.retain(|c| c.name != class.name);
        self.classes.push(class);
        self
    }

    /// Remove a class.
    pub fn without(mut self, name: &str) -> Self {
        self.classes.retain(|c| c.name != name);
        self
    }

    pub fn build(self) -> TestVm {
        let mut classes = FxHashMap::default();
        let mut methods = Vec::new();
        let mut method_index = FxHashMap::default();
        for class in self.classes {
            for def in &class.methods {
                let key = (class.name.clone(), def.name.clone(), def.signature.clone());
                method_index.insert(key, methods.len());
                methods.push(MethodEntry {
                    class: class.name.clone(),
                    def: def.clone(),
                });
            }
            classes.insert(class.name.clone(), class);
        }
        TestVm {
            shared: Arc::new(Shared {
                id: NEXT_VM_ID.fetch_add(1, Ordering::Relaxed),
                heap: Mutex::new(Heap::new()),
                globals: Mutex::new(RefTable::new(RefKind::Global)),
                classes,
                methods,
                method_index,
                accept_attach: AtomicBool::new(true),
                detaches: AtomicUsize::new(0),
            }),
        }
    }
}
