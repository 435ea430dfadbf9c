//! Class definitions with native method bodies.

use std::fmt;
use std::sync::Arc;

use crate::heap::{Heap, ObjId, Value};

/// A Java exception raised by a method body or by the VM itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throw {
    /// Class of the throwable, e.g. `java/lang/RuntimeException`.
    pub class: String,
    pub message: Option<String>,
}

impl Throw {
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: Some(message.into()),
        }
    }

    /// A `java.lang.RuntimeException`.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new("java/lang/RuntimeException", message)
    }

    pub fn null_pointer() -> Self {
        Self {
            class: "java/lang/NullPointerException".to_string(),
            message: None,
        }
    }

    pub fn class_cast(from: &str, to: &str) -> Self {
        Self::new("java/lang/ClassCastException", format!("{from} cannot be cast to {to}"))
    }
}

/// Body of a method: receives the heap, the receiver (`None` for static
/// methods) and the arguments.
pub type NativeMethod = Arc<dyn Fn(&mut Heap, Option<ObjId>, &[Value]) -> Result<Value, Throw> + Send + Sync>;

/// A method declared on a class.
#[derive(Clone)]
pub struct MethodDef {
    pub name: String,
    pub signature: String,
    pub is_static: bool,
    /// Parameter descriptors parsed from the signature.
    pub params: Vec<String>,
    pub body: NativeMethod,
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("is_static", &self.is_static)
            .finish()
    }
}

/// A class: name, optional superclass and methods.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    pub super_class: Option<String>,
    pub methods: Vec<MethodDef>,
}

impl ClassDef {
    /// Start defining a class.
    pub fn build(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            class: ClassDef {
                name: name.into(),
                super_class: None,
                methods: Vec::new(),
            },
        }
    }

    /// Find a method declared directly on this class.
    pub fn method(&self, name: &str, signature: &str) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.signature == signature)
    }
}

/// Fluent builder for [`ClassDef`].
pub struct ClassBuilder {
    class: ClassDef,
}

impl ClassBuilder {
    pub fn extends(mut self, super_class: impl Into<String>) -> Self {
        self.class.super_class = Some(super_class.into());
        self
    }

    /// Declare a static method.
    ///
    /// # Panics
    ///
    /// Panics if `signature` is not a valid method descriptor.
    pub fn static_method<F>(self, name: &str, signature: &str, body: F) -> Self
    where
        F: Fn(&mut Heap, &[Value]) -> Result<Value, Throw> + Send + Sync + 'static,
    {
        self.declare(name, signature, true, Arc::new(move |heap, _, args| body(heap, args)))
    }

    /// Declare an instance method or constructor (`<init>`).
    ///
    /// # Panics
    ///
    /// Panics if `signature` is not a valid method descriptor.
    pub fn method<F>(self, name: &str, signature: &str, body: F) -> Self
    where
        F: Fn(&mut Heap, Option<ObjId>, &[Value]) -> Result<Value, Throw> + Send + Sync + 'static,
    {
        self.declare(name, signature, false, Arc::new(body))
    }

    pub fn finish(self) -> ClassDef {
        self.class
    }

    fn declare(mut self, name: &str, signature: &str, is_static: bool, body: NativeMethod) -> Self {
        let params = match parse_params(signature) {
            Some(params) => params,
            None => panic!("invalid method descriptor {signature:?} for {}.{name}", self.class.name),
        };
        self.class.methods.push(MethodDef {
            name: name.to_string(),
            signature: signature.to_string(),
            is_static,
            params,
            body,
        });
        self
    }
}

/// Split `(IJ[BLjava/lang/String;)V` into `["I", "J", "[B", "Ljava/lang/String;"]`.
pub fn parse_params(signature: &str) -> Option<Vec<String>> {
    let inner = signature.strip_prefix('(')?;
    let close = inner.find(')')?;
    let (mut rest, ret) = (&inner[..close], &inner[close + 1..]);
    if ret.is_empty() {
        return None;
    }
    let mut params = Vec::new();
    while !rest.is_empty() {
        let len = descriptor_len(rest)?;
        params.push(rest[..len].to_string());
        rest = &rest[len..];
    }
    Some(params)
}

fn descriptor_len(desc: &str) -> Option<usize> {
    let dims = desc.bytes().take_while(|&b| b == b'[').count();
    match desc.as_bytes().get(dims)? {
        b'Z' | b'B' | b'C' | b'S' | b'I' | b'J' | b'F' | b'D' => Some(dims + 1),
        b'L' => desc[dims..].find(';').map(|end| dims + end + 1),
        _ => None,
    }
}
