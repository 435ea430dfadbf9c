//! Managed object storage.
//!
//! The test VM never collects: objects live until the VM is dropped, and
//! lifetime bugs are detected on the reference tables instead (see
//! [`crate::refs`]). Native method bodies operate directly on the [`Heap`].

use std::fmt;

use rustc_hash::FxHashMap;

use crate::class::Throw;

/// Index of an object on the heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjId(pub u32);

/// A managed value as seen by method bodies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Void,
    Bool(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Object(Option<ObjId>),
}

impl Value {
    pub const NULL: Value = Value::Object(None);

    /// The object reference, if this is a non-null object value.
    pub fn as_object(&self) -> Option<ObjId> {
        match self {
            Value::Object(obj) => *obj,
            _ => None,
        }
    }
}

/// The payload of a heap object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectData {
    /// A `java.lang.Class` instance.
    Class(String),
    Str(String),
    ByteArray(Vec<i8>),
    FloatArray(Vec<f32>),
    ObjectArray {
        element_class: String,
        items: Vec<Option<ObjId>>,
    },
    /// An ordinary instance with named fields.
    Instance {
        class: String,
        fields: FxHashMap<String, Value>,
    },
}

impl ObjectData {
    /// Runtime class name of the object.
    pub fn class_name(&self) -> &str {
        match self {
            ObjectData::Class(_) => "java/lang/Class",
            ObjectData::Str(_) => "java/lang/String",
            ObjectData::ByteArray(_) => "[B",
            ObjectData::FloatArray(_) => "[F",
            ObjectData::ObjectArray { .. } => "[Ljava/lang/Object;",
            ObjectData::Instance { class, .. } => class,
        }
    }
}

/// Append-only object arena.
pub struct Heap {
    objects: Vec<ObjectData>,
    class_objects: FxHashMap<String, ObjId>,
}

impl Heap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            class_objects: FxHashMap::default(),
        }
    }

    /// Allocate an object.
    pub fn alloc(&mut self, data: ObjectData) -> ObjId {
        let id = ObjId(self.objects.len() as u32);
        self.objects.push(data);
        id
    }

    /// The unique `Class` object for `name`, allocated on first use.
    pub fn class_object(&mut self, name: &str) -> ObjId {
        if let Some(&id) = self.class_objects.get(name) {
            return id;
        }
        let id = self.alloc(ObjectData::Class(name.to_string()));
        self.class_objects.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, id: ObjId) -> Option<&ObjectData> {
        self.objects.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ObjId) -> Option<&mut ObjectData> {
        self.objects.get_mut(id.0 as usize)
    }

    /// Number of objects ever allocated.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // ========================================================================
    // Helpers for method bodies
    // ========================================================================

    /// Allocate a string and return it as a value.
    pub fn new_string(&mut self, value: impl Into<String>) -> Value {
        Value::Object(Some(self.alloc(ObjectData::Str(value.into()))))
    }

    /// Read a string argument. Null or a non-string throws.
    pub fn string(&self, value: Value) -> Result<String, Throw> {
        match self.deref(value)? {
            ObjectData::Str(s) => Ok(s.clone()),
            other => Err(Throw::class_cast(other.class_name(), "java/lang/String")),
        }
    }

    /// Read a `String[]` argument; null elements read as `None`.
    pub fn string_array(&self, value: Value) -> Result<Vec<Option<String>>, Throw> {
        match self.deref(value)? {
            ObjectData::ObjectArray { items, .. } => items
                .iter()
                .map(|item| match item {
                    None => Ok(None),
                    Some(id) => self.string(Value::Object(Some(*id))).map(Some),
                })
                .collect(),
            other => Err(Throw::class_cast(other.class_name(), "[Ljava/lang/String;")),
        }
    }

    /// Allocate a `String[]` from native strings.
    pub fn new_string_array<S: AsRef<str>>(&mut self, values: &[S]) -> Value {
        let items = values
            .iter()
            .map(|v| Some(self.alloc(ObjectData::Str(v.as_ref().to_string()))))
            .collect();
        Value::Object(Some(self.alloc(ObjectData::ObjectArray {
            element_class: "java/lang/String".to_string(),
            items,
        })))
    }

    /// Read a `byte[]` argument.
    pub fn byte_array(&self, value: Value) -> Result<Vec<i8>, Throw> {
        match self.deref(value)? {
            ObjectData::ByteArray(bytes) => Ok(bytes.clone()),
            other => Err(Throw::class_cast(other.class_name(), "[B")),
        }
    }

    pub fn new_byte_array(&mut self, bytes: Vec<i8>) -> Value {
        Value::Object(Some(self.alloc(ObjectData::ByteArray(bytes))))
    }

    /// Read a `float[]` argument.
    pub fn float_array(&self, value: Value) -> Result<Vec<f32>, Throw> {
        match self.deref(value)? {
            ObjectData::FloatArray(floats) => Ok(floats.clone()),
            other => Err(Throw::class_cast(other.class_name(), "[F")),
        }
    }

    pub fn new_float_array(&mut self, floats: Vec<f32>) -> Value {
        Value::Object(Some(self.alloc(ObjectData::FloatArray(floats))))
    }

    /// Read a field of `this`. Missing fields read as null.
    pub fn field(&self, this: Option<ObjId>, name: &str) -> Result<Value, Throw> {
        match self.deref(Value::Object(this))? {
            ObjectData::Instance { fields, .. } => Ok(fields.get(name).copied().unwrap_or(Value::NULL)),
            other => Err(Throw::class_cast(other.class_name(), "java/lang/Object")),
        }
    }

    /// Write a field of `this`, returning the previous value.
    pub fn set_field(&mut self, this: Option<ObjId>, name: &str, value: Value) -> Result<Value, Throw> {
        let id = this.ok_or_else(Throw::null_pointer)?;
        match self.get_mut(id) {
            Some(ObjectData::Instance { fields, .. }) => {
                Ok(fields.insert(name.to_string(), value).unwrap_or(Value::NULL))
            }
            Some(other) => Err(Throw::class_cast(other.class_name(), "java/lang/Object")),
            None => Err(Throw::null_pointer()),
        }
    }

    /// Number of fields on an instance.
    pub fn field_count(&self, this: Option<ObjId>) -> Result<usize, Throw> {
        match self.deref(Value::Object(this))? {
            ObjectData::Instance { fields, .. } => Ok(fields.len()),
            other => Err(Throw::class_cast(other.class_name(), "java/lang/Object")),
        }
    }

    fn deref(&self, value: Value) -> Result<&ObjectData, Throw> {
        value
            .as_object()
            .and_then(|id| self.get(id))
            .ok_or_else(Throw::null_pointer)
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("object_count", &self.objects.len())
            .field("class_count", &self.class_objects.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_objects_are_unique() {
        let mut heap = Heap::new();
        let a = heap.class_object("a/B");
        let b = heap.class_object("a/B");
        let c = heap.class_object("a/C");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn string_helpers() {
        let mut heap = Heap::new();
        let s = heap.new_string("hello");
        assert_eq!(heap.string(s).unwrap(), "hello");
        assert!(heap.string(Value::NULL).is_err());
    }

    #[test]
    fn string_array_helpers() {
        let mut heap = Heap::new();
        let arr = heap.new_string_array(&["a", "b"]);
        assert_eq!(
            heap.string_array(arr).unwrap(),
            vec![Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[test]
    fn wrong_type_is_class_cast() {
        let mut heap = Heap::new();
        let bytes = heap.new_byte_array(vec![1, 2]);
        let err = heap.string(bytes).unwrap_err();
        assert_eq!(err.class, "java/lang/ClassCastException");
    }

    #[test]
    fn fields() {
        let mut heap = Heap::new();
        let obj = heap.alloc(ObjectData::Instance {
            class: "a/B".to_string(),
            fields: FxHashMap::default(),
        });
        assert_eq!(heap.field(Some(obj), "x").unwrap(), Value::NULL);
        assert_eq!(heap.set_field(Some(obj), "x", Value::Int(3)).unwrap(), Value::NULL);
        assert_eq!(heap.set_field(Some(obj), "x", Value::Int(4)).unwrap(), Value::Int(3));
        assert_eq!(heap.field_count(Some(obj)).unwrap(), 1);
        assert!(heap.field(None, "x").is_err());
    }
}
