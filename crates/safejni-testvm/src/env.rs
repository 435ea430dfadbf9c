//! Per-thread environment of the test VM.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use safejni_core::{Env, JValue, MethodId, RawObject};

use crate::class::Throw;
use crate::heap::{ObjId, ObjectData, Value};
use crate::refs::{RefKind, RefTable};
use crate::vm::Shared;

/// Reference and exception accounting for one thread.
///
/// Global references are attributed to the thread that created or deleted
/// them, so concurrent tests sharing a VM do not see each other's counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefStats {
    pub locals_created: u64,
    pub locals_deleted: u64,
    pub globals_created: u64,
    pub globals_deleted: u64,
    /// Stale, foreign or already deleted handles passed to the VM.
    pub invalid_references: u64,
    /// Calls other than exception handling and reference deletion made while
    /// an exception was pending. JNI leaves these undefined.
    pub calls_with_pending_exception: u64,
    pub exceptions_described: u64,
}

impl RefStats {
    pub fn live_locals(&self) -> i64 {
        self.locals_created as i64 - self.locals_deleted as i64
    }

    pub fn live_globals(&self) -> i64 {
        self.globals_created as i64 - self.globals_deleted as i64
    }

    /// Counters accumulated since `earlier`.
    pub fn since(&self, earlier: &RefStats) -> RefStats {
        RefStats {
            locals_created: self.locals_created - earlier.locals_created,
            locals_deleted: self.locals_deleted - earlier.locals_deleted,
            globals_created: self.globals_created - earlier.globals_created,
            globals_deleted: self.globals_deleted - earlier.globals_deleted,
            invalid_references: self.invalid_references - earlier.invalid_references,
            calls_with_pending_exception: self.calls_with_pending_exception
                - earlier.calls_with_pending_exception,
            exceptions_described: self.exceptions_described - earlier.exceptions_described,
        }
    }
}

/// One thread's view of a [`TestVm`](crate::TestVm).
pub struct TestEnv {
    shared: Arc<Shared>,
    locals: RefCell<RefTable>,
    pending: Cell<Option<ObjId>>,
    stats: Cell<RefStats>,
}

impl TestEnv {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            locals: RefCell::new(RefTable::new(RefKind::Local)),
            pending: Cell::new(None),
            stats: Cell::new(RefStats::default()),
        }
    }

    /// Snapshot of this thread's counters.
    pub fn stats(&self) -> RefStats {
        self.stats.get()
    }

    /// Live local references in this thread's table.
    pub fn live_locals(&self) -> usize {
        self.locals.borrow().live()
    }

    /// Raise an exception as if thrown by managed code.
    pub fn throw(&self, throw: Throw) {
        let mut fields = FxHashMap::default();
        let mut heap = self.shared.heap();
        if let Some(message) = throw.message {
            fields.insert("message".to_string(), heap.new_string(message));
        }
        let id = heap.alloc(ObjectData::Instance {
            class: throw.class,
            fields,
        });
        self.pending.set(Some(id));
    }

    /// Class and message of the pending exception, if any.
    pub fn pending_exception(&self) -> Option<(String, Option<String>)> {
        let id = self.pending.get()?;
        let heap = self.shared.heap();
        let class = heap.get(id)?.class_name().to_string();
        let message = heap
            .field(Some(id), "message")
            .ok()
            .and_then(|m| heap.string(m).ok());
        Some((class, message))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn bump(&self, update: impl FnOnce(&mut RefStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    /// Record a call that JNI forbids while an exception is pending.
    fn enter(&self, op: &str) {
        if self.pending.get().is_some() {
            log::warn!("{op} called with a pending exception");
            self.bump(|s| s.calls_with_pending_exception += 1);
        }
    }

    fn invalid(&self, op: &str, obj: RawObject) {
        log::warn!("{op}: invalid reference {obj:?}");
        self.bump(|s| s.invalid_references += 1);
    }

    fn deref(&self, op: &str, obj: RawObject) -> Option<ObjId> {
        let target = match RefKind::of(obj) {
            Some(RefKind::Local) => self.locals.borrow().get(obj),
            Some(RefKind::Global) => self.shared.globals().get(obj),
            None => None,
        };
        if target.is_none() {
            self.invalid(op, obj);
        }
        target
    }

    fn new_local(&self, id: ObjId) -> RawObject {
        self.bump(|s| s.locals_created += 1);
        self.locals.borrow_mut().insert(id)
    }

    fn local_result(&self, value: Value) -> Option<RawObject> {
        value.as_object().map(|id| self.new_local(id))
    }

    fn class_name_of(&self, op: &str, class: RawObject) -> Option<String> {
        let id = self.deref(op, class)?;
        match self.shared.heap().get(id) {
            Some(ObjectData::Class(name)) => Some(name.clone()),
            _ => None,
        }
    }

    fn convert_args(&self, op: &str, params: &[String], args: &[JValue]) -> Result<Vec<Value>, Throw> {
        if params.len() != args.len() {
            return Err(Throw::new(
                "java/lang/IllegalArgumentException",
                format!("expected {} arguments, got {}", params.len(), args.len()),
            ));
        }
        params
            .iter()
            .zip(args)
            .enumerate()
            .map(|(i, (param, arg))| {
                let expected = match param.as_bytes()[0] {
                    b'L' | b'[' => 'L',
                    other => other as char,
                };
                if arg.type_char() != expected {
                    return Err(Throw::new(
                        "java/lang/IllegalArgumentException",
                        format!("argument {i}: expected {param}, got {}", arg.type_char()),
                    ));
                }
                Ok(match *arg {
                    JValue::Bool(v) => Value::Bool(v),
                    JValue::Byte(v) => Value::Byte(v),
                    JValue::Char(v) => Value::Char(v),
                    JValue::Short(v) => Value::Short(v),
                    JValue::Int(v) => Value::Int(v),
                    JValue::Long(v) => Value::Long(v),
                    JValue::Float(v) => Value::Float(v),
                    JValue::Double(v) => Value::Double(v),
                    JValue::Object(None) => Value::NULL,
                    JValue::Object(Some(obj)) => Value::Object(Some(self.deref(op, obj).ok_or_else(Throw::null_pointer)?)),
                })
            })
            .collect()
    }

    /// Run a method and translate a thrown exception into the pending state.
    fn run(&self, op: &str, method: MethodId, is_static: bool, this: Option<ObjId>, args: &[JValue]) -> Value {
        let Some(entry) = self.shared.method(method) else {
            self.throw(Throw::new("java/lang/NoSuchMethodError", format!("{op}: unknown method id")));
            return Value::Void;
        };
        if entry.def.is_static != is_static {
            self.throw(Throw::new(
                "java/lang/IncompatibleClassChangeError",
                format!("{}.{}{}", entry.class, entry.def.name, entry.def.signature),
            ));
            return Value::Void;
        }
        if let Some(this) = this {
            let receiver = self.shared.heap().get(this).map(|data| data.class_name().to_string());
            if !receiver.as_deref().is_some_and(|class| self.shared.is_subclass(class, &entry.class)) {
                self.throw(Throw::class_cast(receiver.as_deref().unwrap_or("null"), &entry.class));
                return Value::Void;
            }
        }
        let result = self
            .convert_args(op, &entry.def.params, args)
            .and_then(|values| {
                let mut heap = self.shared.heap();
                (entry.def.body)(&mut heap, this, &values)
            });
        match result {
            Ok(value) => value,
            Err(throw) => {
                self.throw(throw);
                Value::Void
            }
        }
    }

    fn call_static(&self, op: &str, class: RawObject, method: MethodId, args: &[JValue]) -> Value {
        self.enter(op);
        if self.deref(op, class).is_none() {
            self.throw(Throw::null_pointer());
            return Value::Void;
        }
        self.run(op, method, true, None, args)
    }

    fn call_instance(&self, op: &str, obj: RawObject, method: MethodId, args: &[JValue]) -> Value {
        self.enter(op);
        let Some(this) = self.deref(op, obj) else {
            self.throw(Throw::null_pointer());
            return Value::Void;
        };
        self.run(op, method, false, Some(this), args)
    }

    fn array_op<T>(&self, op: &str, array: RawObject, f: impl FnOnce(&mut ObjectData) -> Result<T, Throw>) -> Option<T> {
        self.enter(op);
        let id = self.deref(op, array)?;
        let result = match self.shared.heap().get_mut(id) {
            Some(data) => f(data),
            None => Err(Throw::null_pointer()),
        };
        result.map_err(|throw| self.throw(throw)).ok()
    }
}

fn bounds(len: usize, start: i32, count: usize) -> Result<std::ops::Range<usize>, Throw> {
    let start = usize::try_from(start).map_err(|_| out_of_bounds(start as i64))?;
    match start.checked_add(count) {
        Some(end) if end <= len => Ok(start..end),
        _ => Err(out_of_bounds(start.saturating_add(count) as i64)),
    }
}

fn out_of_bounds(index: i64) -> Throw {
    Throw::new("java/lang/ArrayIndexOutOfBoundsException", index.to_string())
}

fn wrong_array(data: &ObjectData, expected: &str) -> Throw {
    Throw::class_cast(data.class_name(), expected)
}

macro_rules! typed_calls {
    ($($static_name:ident, $instance_name:ident => $ty:ty, $variant:ident;)*) => {
        $(
            fn $static_name(&self, class: RawObject, method: MethodId, args: &[JValue]) -> $ty {
                match self.call_static(stringify!($static_name), class, method, args) {
                    Value::$variant(v) => v,
                    _ => Default::default(),
                }
            }

            fn $instance_name(&self, obj: RawObject, method: MethodId, args: &[JValue]) -> $ty {
                match self.call_instance(stringify!($instance_name), obj, method, args) {
                    Value::$variant(v) => v,
                    _ => Default::default(),
                }
            }
        )*
    };
}

impl Env for TestEnv {
    fn find_class(&self, name: &str) -> Option<RawObject> {
        self.enter("find_class");
        if !self.shared.classes.contains_key(name) {
            self.throw(Throw::new("java/lang/NoClassDefFoundError", name));
            return None;
        }
        let id = self.shared.heap().class_object(name);
        Some(self.new_local(id))
    }

    fn get_method_id(&self, class: RawObject, name: &str, signature: &str) -> Option<MethodId> {
        self.enter("get_method_id");
        let class_name = self.class_name_of("get_method_id", class)?;
        let found = self.shared.find_method(&class_name, name, signature, false);
        if found.is_none() {
            self.throw(Throw::new("java/lang/NoSuchMethodError", format!("{name}{signature}")));
        }
        found
    }

    fn get_static_method_id(&self, class: RawObject, name: &str, signature: &str) -> Option<MethodId> {
        self.enter("get_static_method_id");
        let class_name = self.class_name_of("get_static_method_id", class)?;
        let found = self.shared.find_method(&class_name, name, signature, true);
        if found.is_none() {
            self.throw(Throw::new("java/lang/NoSuchMethodError", format!("{name}{signature}")));
        }
        found
    }

    fn call_static_void_method(&self, class: RawObject, method: MethodId, args: &[JValue]) {
        self.call_static("call_static_void_method", class, method, args);
    }

    fn call_void_method(&self, obj: RawObject, method: MethodId, args: &[JValue]) {
        self.call_instance("call_void_method", obj, method, args);
    }

    typed_calls! {
        call_static_boolean_method, call_boolean_method => bool, Bool;
        call_static_byte_method, call_byte_method => i8, Byte;
        call_static_char_method, call_char_method => u16, Char;
        call_static_short_method, call_short_method => i16, Short;
        call_static_int_method, call_int_method => i32, Int;
        call_static_long_method, call_long_method => i64, Long;
        call_static_float_method, call_float_method => f32, Float;
        call_static_double_method, call_double_method => f64, Double;
    }

    fn call_static_object_method(&self, class: RawObject, method: MethodId, args: &[JValue]) -> Option<RawObject> {
        let value = self.call_static("call_static_object_method", class, method, args);
        self.local_result(value)
    }

    fn call_object_method(&self, obj: RawObject, method: MethodId, args: &[JValue]) -> Option<RawObject> {
        let value = self.call_instance("call_object_method", obj, method, args);
        self.local_result(value)
    }

    fn new_object(&self, class: RawObject, ctor: MethodId, args: &[JValue]) -> Option<RawObject> {
        self.enter("new_object");
        let class_name = self.class_name_of("new_object", class)?;
        let id = self.shared.heap().alloc(ObjectData::Instance {
            class: class_name,
            fields: FxHashMap::default(),
        });
        self.run("new_object", ctor, false, Some(id), args);
        if self.pending.get().is_some() {
            return None;
        }
        Some(self.new_local(id))
    }

    fn new_string_utf(&self, value: &str) -> Option<RawObject> {
        self.enter("new_string_utf");
        let id = self.shared.heap().alloc(ObjectData::Str(value.to_string()));
        Some(self.new_local(id))
    }

    fn get_string_utf_chars(&self, string: RawObject) -> Option<String> {
        self.enter("get_string_utf_chars");
        let id = self.deref("get_string_utf_chars", string)?;
        match self.shared.heap().get(id) {
            Some(ObjectData::Str(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn get_array_length(&self, array: RawObject) -> i32 {
        self.array_op("get_array_length", array, |data| match data {
            ObjectData::ByteArray(v) => Ok(v.len() as i32),
            ObjectData::FloatArray(v) => Ok(v.len() as i32),
            ObjectData::ObjectArray { items, .. } => Ok(items.len() as i32),
            other => Err(wrong_array(other, "[Ljava/lang/Object;")),
        })
        .unwrap_or(0)
    }

    fn new_object_array(&self, len: i32, element_class: RawObject, initial: Option<RawObject>) -> Option<RawObject> {
        self.enter("new_object_array");
        let element_class = self.class_name_of("new_object_array", element_class)?;
        let Ok(len) = usize::try_from(len) else {
            self.throw(Throw::new("java/lang/NegativeArraySizeException", len.to_string()));
            return None;
        };
        let initial = match initial {
            Some(obj) => Some(self.deref("new_object_array", obj)?),
            None => None,
        };
        let id = self.shared.heap().alloc(ObjectData::ObjectArray {
            element_class,
            items: vec![initial; len],
        });
        Some(self.new_local(id))
    }

    fn get_object_array_element(&self, array: RawObject, index: i32) -> Option<RawObject> {
        let item = self.array_op("get_object_array_element", array, |data| match data {
            ObjectData::ObjectArray { items, .. } => {
                let range = bounds(items.len(), index, 1)?;
                Ok(items[range.start])
            }
            other => Err(wrong_array(other, "[Ljava/lang/Object;")),
        })??;
        Some(self.new_local(item))
    }

    fn set_object_array_element(&self, array: RawObject, index: i32, value: Option<RawObject>) {
        let value = match value {
            Some(obj) => match self.deref("set_object_array_element", obj) {
                Some(id) => Some(id),
                None => return,
            },
            None => None,
        };
        self.array_op("set_object_array_element", array, |data| match data {
            ObjectData::ObjectArray { items, .. } => {
                let range = bounds(items.len(), index, 1)?;
                items[range.start] = value;
                Ok(())
            }
            other => Err(wrong_array(other, "[Ljava/lang/Object;")),
        });
    }

    fn new_byte_array(&self, len: i32) -> Option<RawObject> {
        self.enter("new_byte_array");
        let Ok(len) = usize::try_from(len) else {
            self.throw(Throw::new("java/lang/NegativeArraySizeException", len.to_string()));
            return None;
        };
        let id = self.shared.heap().alloc(ObjectData::ByteArray(vec![0; len]));
        Some(self.new_local(id))
    }

    fn get_byte_array_region(&self, array: RawObject, start: i32, buf: &mut [i8]) {
        self.array_op("get_byte_array_region", array, |data| match data {
            ObjectData::ByteArray(bytes) => {
                buf.copy_from_slice(&bytes[bounds(bytes.len(), start, buf.len())?]);
                Ok(())
            }
            other => Err(wrong_array(other, "[B")),
        });
    }

    fn set_byte_array_region(&self, array: RawObject, start: i32, buf: &[i8]) {
        self.array_op("set_byte_array_region", array, |data| match data {
            ObjectData::ByteArray(bytes) => {
                let range = bounds(bytes.len(), start, buf.len())?;
                bytes[range].copy_from_slice(buf);
                Ok(())
            }
            other => Err(wrong_array(other, "[B")),
        });
    }

    fn new_float_array(&self, len: i32) -> Option<RawObject> {
        self.enter("new_float_array");
        let Ok(len) = usize::try_from(len) else {
            self.throw(Throw::new("java/lang/NegativeArraySizeException", len.to_string()));
            return None;
        };
        let id = self.shared.heap().alloc(ObjectData::FloatArray(vec![0.0; len]));
        Some(self.new_local(id))
    }

    fn get_float_array_region(&self, array: RawObject, start: i32, buf: &mut [f32]) {
        self.array_op("get_float_array_region", array, |data| match data {
            ObjectData::FloatArray(floats) => {
                buf.copy_from_slice(&floats[bounds(floats.len(), start, buf.len())?]);
                Ok(())
            }
            other => Err(wrong_array(other, "[F")),
        });
    }

    fn set_float_array_region(&self, array: RawObject, start: i32, buf: &[f32]) {
        self.array_op("set_float_array_region", array, |data| match data {
            ObjectData::FloatArray(floats) => {
                let range = bounds(floats.len(), start, buf.len())?;
                floats[range].copy_from_slice(buf);
                Ok(())
            }
            other => Err(wrong_array(other, "[F")),
        });
    }

    fn new_global_ref(&self, obj: RawObject) -> Option<RawObject> {
        self.enter("new_global_ref");
        let id = self.deref("new_global_ref", obj)?;
        self.bump(|s| s.globals_created += 1);
        Some(self.shared.globals().insert(id))
    }

    fn delete_global_ref(&self, obj: RawObject) {
        let removed = RefKind::of(obj) == Some(RefKind::Global) && self.shared.globals().remove(obj);
        if removed {
            self.bump(|s| s.globals_deleted += 1);
        } else {
            self.invalid("delete_global_ref", obj);
        }
    }

    fn delete_local_ref(&self, obj: RawObject) {
        let removed = RefKind::of(obj) == Some(RefKind::Local) && self.locals.borrow_mut().remove(obj);
        if removed {
            self.bump(|s| s.locals_deleted += 1);
        } else {
            self.invalid("delete_local_ref", obj);
        }
    }

    fn exception_check(&self) -> bool {
        self.pending.get().is_some()
    }

    fn exception_occurred(&self) -> Option<RawObject> {
        self.pending.get().map(|id| self.new_local(id))
    }

    fn exception_describe(&self) {
        if let Some((class, message)) = self.pending_exception() {
            log::debug!("Exception in native call: {class}: {}", message.unwrap_or_default());
            self.bump(|s| s.exceptions_described += 1);
            self.pending.set(None);
        }
    }

    fn exception_clear(&self) {
        self.pending.set(None);
    }
}

#[cfg(test)]
mod tests {
    use crate::TestVm;
    use crate::fixtures::{NINJA, TEST_ACTIVITY};
    use safejni_core::{Env, JValue};

    #[test]
    fn find_class_creates_local() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        let class = env.find_class(TEST_ACTIVITY).unwrap();
        assert_eq!(env.live_locals(), 1);
        env.delete_local_ref(class);
        assert_eq!(env.live_locals(), 0);
        assert_eq!(env.stats().invalid_references, 0);
    }

    #[test]
    fn missing_class_raises() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        assert!(env.find_class("no/such/Class").is_none());
        let (class, message) = env.pending_exception().unwrap();
        assert_eq!(class, "java/lang/NoClassDefFoundError");
        assert_eq!(message.as_deref(), Some("no/such/Class"));
        env.exception_clear();
        assert!(!env.exception_check());
    }

    #[test]
    fn receiver_must_match_declaring_class() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        let class = env.find_class(NINJA).unwrap();
        let get_name = env.get_method_id(class, "getName", "()Ljava/lang/String;").unwrap();
        let text = env.new_string_utf("not a ninja").unwrap();
        assert!(env.call_object_method(text, get_name, &[]).is_none());
        let (thrown, _) = env.pending_exception().unwrap();
        assert_eq!(thrown, "java/lang/ClassCastException");
        env.exception_clear();
        env.delete_local_ref(text);
        env.delete_local_ref(class);
        assert_eq!(env.live_locals(), 0);
    }

    #[test]
    fn static_int_call() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        let class = env.find_class(TEST_ACTIVITY).unwrap();
        let mid = env.get_static_method_id(class, "echoInt", "(I)I").unwrap();
        assert_eq!(env.call_static_int_method(class, mid, &[JValue::Int(41)]), 41);
        env.delete_local_ref(class);
    }

    #[test]
    fn argument_type_mismatch_raises() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        let class = env.find_class(TEST_ACTIVITY).unwrap();
        let mid = env.get_static_method_id(class, "echoInt", "(I)I").unwrap();
        env.call_static_int_method(class, mid, &[JValue::Long(1)]);
        assert_eq!(
            env.pending_exception().map(|(c, _)| c).as_deref(),
            Some("java/lang/IllegalArgumentException")
        );
        env.exception_clear();
        env.delete_local_ref(class);
    }

    #[test]
    fn double_delete_is_counted() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        let s = env.new_string_utf("x").unwrap();
        env.delete_local_ref(s);
        env.delete_local_ref(s);
        assert_eq!(env.stats().invalid_references, 1);
    }

    #[test]
    fn calls_with_pending_exception_are_counted() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        env.throw(crate::Throw::runtime("boom"));
        let s = env.new_string_utf("x");
        assert_eq!(env.stats().calls_with_pending_exception, 1);
        env.exception_clear();
        env.delete_local_ref(s.unwrap());
    }

    #[test]
    fn describe_clears_pending() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        env.throw(crate::Throw::runtime("boom"));
        env.exception_describe();
        assert!(!env.exception_check());
        assert_eq!(env.stats().exceptions_described, 1);
    }

    #[test]
    fn byte_region_bounds() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        let arr = env.new_byte_array(2).unwrap();
        env.set_byte_array_region(arr, 0, &[1, 2]);
        let mut buf = [0i8; 2];
        env.get_byte_array_region(arr, 0, &mut buf);
        assert_eq!(buf, [1, 2]);
        env.set_byte_array_region(arr, 1, &[1, 2]);
        assert_eq!(
            env.pending_exception().map(|(c, _)| c).as_deref(),
            Some("java/lang/ArrayIndexOutOfBoundsException")
        );
        env.exception_clear();
        env.delete_local_ref(arr);
    }

    #[test]
    fn globals_outlive_locals() {
        let vm = TestVm::with_fixtures();
        let env = vm.env();
        let local = env.new_string_utf("kept").unwrap();
        let global = env.new_global_ref(local).unwrap();
        env.delete_local_ref(local);
        assert_eq!(env.get_string_utf_chars(global).as_deref(), Some("kept"));
        assert_eq!(vm.live_globals(), 1);
        env.delete_global_ref(global);
        assert_eq!(vm.live_globals(), 0);
        assert_eq!(env.stats().live_globals(), 0);
    }
}
