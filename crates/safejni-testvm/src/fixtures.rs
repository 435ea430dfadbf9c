//! Built-in classes.
//!
//! [`standard_classes`] covers the slice of `java.lang` and `java.util` the
//! bridge touches. [`test_activity`] and [`ninja`] are the fixtures used by
//! the integration tests and benchmarks.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use rustc_hash::FxHashMap;

use crate::class::{ClassDef, Throw};
use crate::heap::{Heap, ObjId, ObjectData, Value};

pub const TEST_ACTIVITY: &str = "com/safejni/test/TestActivity";
pub const NINJA: &str = "com/safejni/test/Ninja";

const OBJECT: &str = "java/lang/Object";
const THROWABLE: &str = "java/lang/Throwable";
const RUNTIME_EXCEPTION: &str = "java/lang/RuntimeException";
const ERROR: &str = "java/lang/Error";

const STRING_SIG: &str = "Ljava/lang/String;";

/// `java.lang.Object`, `String`, `Class`, the throwable hierarchy and
/// `java.util.HashMap`.
pub fn standard_classes() -> Vec<ClassDef> {
    let mut classes = vec![
        ClassDef::build(OBJECT).method("<init>", "()V", |_, _, _| Ok(Value::Void)).finish(),
        ClassDef::build("java/lang/Class").extends(OBJECT).finish(),
        ClassDef::build("java/lang/String").extends(OBJECT).finish(),
        ClassDef::build(THROWABLE)
            .extends(OBJECT)
            .method("<init>", "()V", |_, _, _| Ok(Value::Void))
            .method("<init>", "(Ljava/lang/String;)V", |heap, this, args| {
                heap.set_field(this, "message", args[0])?;
                Ok(Value::Void)
            })
            .method("getMessage", "()Ljava/lang/String;", |heap, this, _| heap.field(this, "message"))
            .finish(),
        ClassDef::build("java/lang/Exception").extends(THROWABLE).finish(),
        ClassDef::build(RUNTIME_EXCEPTION).extends("java/lang/Exception").finish(),
        ClassDef::build(ERROR).extends(THROWABLE).finish(),
        hash_map(),
    ];
    for name in [
        "java/lang/IllegalArgumentException",
        "java/lang/IllegalStateException",
        "java/lang/NullPointerException",
        "java/lang/ClassCastException",
        "java/lang/ArrayIndexOutOfBoundsException",
        "java/lang/NegativeArraySizeException",
    ] {
        classes.push(ClassDef::build(name).extends(RUNTIME_EXCEPTION).finish());
    }
    for name in [
        "java/lang/NoClassDefFoundError",
        "java/lang/NoSuchMethodError",
        "java/lang/IncompatibleClassChangeError",
    ] {
        classes.push(ClassDef::build(name).extends(ERROR).finish());
    }
    classes
}

/// `java.util.HashMap` restricted to string keys.
fn hash_map() -> ClassDef {
    ClassDef::build("java/util/HashMap")
        .extends(OBJECT)
        .method("<init>", "()V", |_, _, _| Ok(Value::Void))
        .method(
            "put",
            "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
            |heap, this, args| {
                let key = heap.string(args[0])?;
                heap.set_field(this, &key, args[1])
            },
        )
        .method("get", "(Ljava/lang/Object;)Ljava/lang/Object;", |heap, this, args| {
            let key = heap.string(args[0])?;
            heap.field(this, &key)
        })
        .method("size", "()I", |heap, this, _| Ok(Value::Int(heap.field_count(this)? as i32)))
        .finish()
}

/// The static helper class exercised by the scenarios.
pub fn test_activity() -> ClassDef {
    let touches = Arc::new(AtomicI32::new(0));
    let read_touches = touches.clone();

    ClassDef::build(TEST_ACTIVITY)
        .extends(OBJECT)
        .static_method("concat", "(Ljava/lang/String;Ljava/lang/String;)Ljava/lang/String;", |heap, args| {
            let joined = heap.string(args[0])? + &heap.string(args[1])?;
            Ok(heap.new_string(joined))
        })
        .static_method("toUpper", "([Ljava/lang/String;)[Ljava/lang/String;", |heap, args| {
            let upper = heap
                .string_array(args[0])?
                .into_iter()
                .map(|s| s.ok_or_else(Throw::null_pointer).map(|s| s.to_uppercase()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(heap.new_string_array(&upper))
        })
        .static_method("sum", "([B)I", |heap, args| {
            Ok(Value::Int(heap.byte_array(args[0])?.iter().map(|&b| b as i32).sum()))
        })
        .static_method("add", "([BI)[B", |heap, args| {
            let Value::Int(delta) = args[1] else {
                return Err(Throw::null_pointer());
            };
            let bytes = heap
                .byte_array(args[0])?
                .into_iter()
                .map(|b| (b as i32).wrapping_add(delta) as i8)
                .collect();
            Ok(heap.new_byte_array(bytes))
        })
        .static_method("scale", "([FF)[F", |heap, args| {
            let Value::Float(factor) = args[1] else {
                return Err(Throw::null_pointer());
            };
            let floats = heap.float_array(args[0])?.into_iter().map(|f| f * factor).collect();
            Ok(heap.new_float_array(floats))
        })
        .static_method("join", "(Ljava/lang/String;[Ljava/lang/String;)Ljava/lang/String;", |heap, args| {
            let sep = heap.string(args[0])?;
            let parts: Vec<String> = heap.string_array(args[1])?.into_iter().flatten().collect();
            Ok(heap.new_string(parts.join(&sep)))
        })
        .static_method("mix", "(ZBCSIJFD)D", |_, args| {
            let total = args.iter().fold(0.0f64, |acc, v| {
                acc + match *v {
                    Value::Bool(b) => b as i32 as f64,
                    Value::Byte(b) => b as f64,
                    Value::Char(c) => c as f64,
                    Value::Short(s) => s as f64,
                    Value::Int(i) => i as f64,
                    Value::Long(l) => l as f64,
                    Value::Float(f) => f as f64,
                    Value::Double(d) => d,
                    Value::Void | Value::Object(_) => 0.0,
                }
            });
            Ok(Value::Double(total))
        })
        .static_method("mapSize", "(Ljava/util/HashMap;)I", |heap, args| {
            Ok(Value::Int(heap.field_count(args[0].as_object())? as i32))
        })
        .static_method("mapGet", "(Ljava/util/HashMap;Ljava/lang/String;)Ljava/lang/String;", |heap, args| {
            let key = heap.string(args[1])?;
            heap.field(args[0].as_object(), &key)
        })
        .static_method("touch", "()V", move |_, _| {
            touches.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Void)
        })
        .static_method("touchCount", "()I", move |_, _| Ok(Value::Int(read_touches.load(Ordering::SeqCst))))
        .static_method("fail", "(Ljava/lang/String;)V", |heap, args| Err(Throw::runtime(heap.string(args[0])?)))
        .static_method("failString", "(Ljava/lang/String;)Ljava/lang/String;", |heap, args| {
            Err(Throw::new("java/lang/IllegalStateException", heap.string(args[0])?))
        })
        .static_method("failInt", "()I", |_, _| Err(Throw::null_pointer()))
        .static_method("nullString", "()Ljava/lang/String;", |_, _| Ok(Value::NULL))
        .static_method("nullStrings", "()[Ljava/lang/String;", |_, _| Ok(Value::NULL))
        .static_method("nullBytes", "()[B", |_, _| Ok(Value::NULL))
        .static_method("nullFloats", "()[F", |_, _| Ok(Value::NULL))
        .static_method("echoBoolean", "(Z)Z", |_, args| Ok(args[0]))
        .static_method("echoByte", "(B)B", |_, args| Ok(args[0]))
        .static_method("echoChar", "(C)C", |_, args| Ok(args[0]))
        .static_method("echoShort", "(S)S", |_, args| Ok(args[0]))
        .static_method("echoInt", "(I)I", |_, args| Ok(args[0]))
        .static_method("echoLong", "(J)J", |_, args| Ok(args[0]))
        .static_method("echoFloat", "(F)F", |_, args| Ok(args[0]))
        .static_method("echoDouble", "(D)D", |_, args| Ok(args[0]))
        .static_method("echoString", "(Ljava/lang/String;)Ljava/lang/String;", |_, args| Ok(args[0]))
        .static_method("echoStrings", "([Ljava/lang/String;)[Ljava/lang/String;", |_, args| Ok(args[0]))
        .static_method("echoBytes", "([B)[B", |_, args| Ok(args[0]))
        .static_method("echoFloats", "([F)[F", |_, args| Ok(args[0]))
        .static_method("echoPointer", "(J)J", |_, args| Ok(args[0]))
        .finish()
}

/// A named object with a constructor and instance methods.
pub fn ninja() -> ClassDef {
    ClassDef::build(NINJA)
        .extends(OBJECT)
        .method("<init>", &format!("({STRING_SIG})V"), |heap, this, args| {
            heap.string(args[0])?;
            heap.set_field(this, "name", args[0])?;
            Ok(Value::Void)
        })
        .method("<init>", &format!("({STRING_SIG}I)V"), |heap, this, args| {
            if let Value::Int(level) = args[1]
                && level < 1
            {
                return Err(Throw::new("java/lang/IllegalArgumentException", format!("invalid level {level}")));
            }
            heap.string(args[0])?;
            heap.set_field(this, "name", args[0])?;
            heap.set_field(this, "level", args[1])?;
            Ok(Value::Void)
        })
        .method("<init>", "()V", |heap, this, _| {
            let name = heap.new_string("Anonymous");
            heap.set_field(this, "name", name)?;
            Ok(Value::Void)
        })
        .method("getName", &format!("(){STRING_SIG}"), |heap, this, _| heap.field(this, "name"))
        .method("setName", &format!("({STRING_SIG})V"), |heap, this, args| {
            heap.set_field(this, "name", args[0])?;
            Ok(Value::Void)
        })
        .method("attack", &format!("({STRING_SIG})I"), |heap, this, args| {
            let target = heap.string(args[0])?;
            if target == heap.string(heap.field(this, "name")?)? {
                return Err(Throw::new("java/lang/IllegalArgumentException", "a ninja cannot attack itself"));
            }
            Ok(Value::Int(target.len() as i32))
        })
        .finish()
}

/// Allocate a `com/safejni/test/Ninja` directly on the heap.
pub fn new_ninja(heap: &mut Heap, name: &str) -> ObjId {
    let name = heap.new_string(name);
    let mut fields = FxHashMap::default();
    fields.insert("name".to_string(), name);
    heap.alloc(ObjectData::Instance {
        class: NINJA.to_string(),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call_static(class: &ClassDef, name: &str, sig: &str, heap: &mut Heap, args: &[Value]) -> Result<Value, Throw> {
        let method = class.method(name, sig).unwrap();
        (method.body)(heap, None, args)
    }

    #[test]
    fn sum_uses_signed_bytes() {
        let mut heap = Heap::new();
        let bytes = [100u8, 200, 155, 100, 224, 5, 100, 20].map(|b| b as i8).to_vec();
        let arr = heap.new_byte_array(bytes);
        let result = call_static(&test_activity(), "sum", "([B)I", &mut heap, &[arr]).unwrap();
        assert_eq!(result, Value::Int(136));
    }

    #[test]
    fn add_wraps() {
        let mut heap = Heap::new();
        let arr = heap.new_byte_array(vec![127, -1]);
        let result = call_static(&test_activity(), "add", "([BI)[B", &mut heap, &[arr, Value::Int(1)]).unwrap();
        assert_eq!(heap.byte_array(result).unwrap(), vec![-128, 0]);
    }

    #[test]
    fn to_upper_rejects_null_elements() {
        let mut heap = Heap::new();
        let arr = heap.alloc(ObjectData::ObjectArray {
            element_class: "java/lang/String".to_string(),
            items: vec![None],
        });
        let err = call_static(
            &test_activity(),
            "toUpper",
            "([Ljava/lang/String;)[Ljava/lang/String;",
            &mut heap,
            &[Value::Object(Some(arr))],
        )
        .unwrap_err();
        assert_eq!(err.class, "java/lang/NullPointerException");
    }

    #[test]
    fn ninja_get_name() {
        let mut heap = Heap::new();
        let ninja_class = ninja();
        let id = new_ninja(&mut heap, "Snake");
        let method = ninja_class.method("getName", "()Ljava/lang/String;").unwrap();
        let name = (method.body)(&mut heap, Some(id), &[]).unwrap();
        assert_eq!(heap.string(name).unwrap(), "Snake");
    }

    #[test]
    fn hash_map_put_and_size() {
        let mut heap = Heap::new();
        let map_class = hash_map();
        let map = heap.alloc(ObjectData::Instance {
            class: "java/util/HashMap".to_string(),
            fields: FxHashMap::default(),
        });
        let put = map_class
            .method("put", "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;")
            .unwrap();
        let k = heap.new_string("k");
        let v = heap.new_string("v");
        assert_eq!((put.body)(&mut heap, Some(map), &[k, v]).unwrap(), Value::NULL);
        let size = map_class.method("size", "()I").unwrap();
        assert_eq!((size.body)(&mut heap, Some(map), &[]).unwrap(), Value::Int(1));
    }

    #[test]
    fn standard_classes_include_throwable_hierarchy() {
        let classes = standard_classes();
        let find = |name: &str| classes.iter().find(|c| c.name == name).unwrap();
        assert_eq!(find("java/lang/NoSuchMethodError").super_class.as_deref(), Some(ERROR));
        assert!(find(THROWABLE).method("getMessage", "()Ljava/lang/String;").is_some());
    }
}
