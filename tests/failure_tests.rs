//! Exceptions thrown by the JVM part-way through marshaling. These run on a
//! VM whose `java.util.HashMap` rejects one key, so they live in their own
//! binary.

mod common;

use std::collections::HashMap;

use common::{assert_balanced, env, measure, vm_with};
use safejni::Error;
use safejni_testvm::fixtures::{self, TEST_ACTIVITY};
use safejni_testvm::{ClassDef, TestVm, Throw, Value};

const REJECTED_KEY: &str = "forbidden";

/// `java.util.HashMap` whose `put` throws for [`REJECTED_KEY`].
fn guarded_hash_map() -> ClassDef {
    ClassDef::build("java/util/HashMap")
        .extends("java/lang/Object")
        .method("<init>", "()V", |_, _, _| Ok(Value::Void))
        .method(
            "put",
            "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
            |heap, this, args| {
                let key = heap.string(args[0])?;
                if key == REJECTED_KEY {
                    return Err(Throw::runtime(format!("put rejected {key}")));
                }
                heap.set_field(this, &key, args[1])
            },
        )
        .method("size", "()I", |heap, this, _| Ok(Value::Int(heap.field_count(this)? as i32)))
        .finish()
}

fn vm() -> &'static TestVm {
    vm_with(|| {
        TestVm::builder()
            .class(fixtures::test_activity())
            .class(fixtures::ninja())
            .class(guarded_hash_map())
            .build()
    })
}

fn map(keys: &[&str]) -> HashMap<String, String> {
    keys.iter().map(|key| (key.to_string(), format!("{key}-value"))).collect()
}

#[test]
fn test_accepted_map_marshals() {
    vm();
    let size: i32 = safejni::call_static(TEST_ACTIVITY, "mapSize", (map(&["a", "b"]),)).unwrap();
    assert_eq!(size, 2);
}

#[test]
fn test_throwing_put_releases_every_entry() {
    vm();
    // Resolve the map and method handles outside the measurement.
    let _: i32 = safejni::call_static(TEST_ACTIVITY, "mapSize", (map(&["a"]),)).unwrap();

    let entries = map(&["a", "b", REJECTED_KEY, "c", "d"]);
    let (result, stats) = measure(|| safejni::call_static::<i32, _>(TEST_ACTIVITY, "mapSize", (&entries,)));
    assert_eq!(result.unwrap_err(), Error::foreign(format!("put rejected {REJECTED_KEY}")));
    assert_balanced(&stats);
    assert_eq!(stats.globals_created, 0, "{stats:?}");
    assert!(env().pending_exception().is_none());
}

#[test]
fn test_call_after_failed_marshaling_succeeds() {
    vm();
    let _ = safejni::call_static::<i32, _>(TEST_ACTIVITY, "mapSize", (map(&[REJECTED_KEY]),));
    let text: String = safejni::call_static(TEST_ACTIVITY, "concat", ("still ", "working")).unwrap();
    assert_eq!(text, "still working");
}
