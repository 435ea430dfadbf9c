mod common;

use std::collections::{BTreeMap, HashMap};

use common::{assert_balanced, measure, vm};
use safejni::{Error, JavaReturn, JavaType, ToJava};
use safejni_testvm::fixtures::TEST_ACTIVITY;

fn echo<T>(method: &str, value: T) -> T
where
    T: ToJava + JavaReturn,
{
    safejni::call_static(TEST_ACTIVITY, method, (value,)).unwrap()
}

#[test]
fn test_primitive_round_trips() {
    vm();
    assert!(echo("echoBoolean", true));
    assert!(!echo("echoBoolean", false));
    assert_eq!(echo("echoByte", i8::MIN), i8::MIN);
    assert_eq!(echo("echoChar", 0x00E9u16), 0x00E9);
    assert_eq!(echo("echoShort", -12_345i16), -12_345);
    assert_eq!(echo("echoInt", i32::MAX), i32::MAX);
    assert_eq!(echo("echoLong", i64::MIN), i64::MIN);
    assert_eq!(echo("echoFloat", 1.5f32), 1.5);
    assert_eq!(echo("echoDouble", -0.125f64), -0.125);
}

#[test]
fn test_string_round_trips() {
    vm();
    for text in ["", "Hello", "Cannavaro è ☺", "nul\0inside", "😀"] {
        assert_eq!(echo("echoString", text.to_string()), text);
    }
}

#[test]
fn test_string_array_round_trips() {
    vm();
    assert_eq!(echo("echoStrings", Vec::<String>::new()), Vec::<String>::new());
    let names = vec!["Nesta".to_string(), String::new(), "Baresi".to_string()];
    assert_eq!(echo("echoStrings", names.clone()), names);
}

#[test]
fn test_byte_array_round_trips() {
    vm();
    assert_eq!(echo("echoBytes", Vec::<u8>::new()), Vec::<u8>::new());
    let all: Vec<u8> = (0..=255).collect();
    assert_eq!(echo("echoBytes", all.clone()), all);
}

#[test]
fn test_float_array_round_trips() {
    vm();
    assert_eq!(echo("echoFloats", Vec::<f32>::new()), Vec::<f32>::new());
    assert_eq!(echo("echoFloats", vec![0.5f32, -2.0, f32::MAX]), [0.5, -2.0, f32::MAX]);
}

#[test]
fn test_borrowed_arguments() {
    vm();
    let bytes = [1u8, 2, 3];
    let doubled: Vec<u8> = safejni::call_static(TEST_ACTIVITY, "add", (&bytes[..], 1i32)).unwrap();
    assert_eq!(doubled, [2, 3, 4]);

    let floats = [1.0f32, 2.0];
    let scaled: Vec<f32> = safejni::call_static(TEST_ACTIVITY, "scale", (&floats[..], 3.0f32)).unwrap();
    assert_eq!(scaled, [3.0, 6.0]);

    let parts: &[&str] = &["a", "b", "c"];
    let joined: String = safejni::call_static(TEST_ACTIVITY, "join", ("-", parts)).unwrap();
    assert_eq!(joined, "a-b-c");

    let owned = vec!["x".to_string(), "y".to_string()];
    let joined: String = safejni::call_static(TEST_ACTIVITY, "join", (String::from("+"), &owned[..])).unwrap();
    assert_eq!(joined, "x+y");
}

#[test]
fn test_null_results_become_empty_values() {
    vm();
    let text: String = safejni::call_static(TEST_ACTIVITY, "nullString", ()).unwrap();
    assert_eq!(text, "");
    let strings: Vec<String> = safejni::call_static(TEST_ACTIVITY, "nullStrings", ()).unwrap();
    assert!(strings.is_empty());
    let bytes: Vec<u8> = safejni::call_static(TEST_ACTIVITY, "nullBytes", ()).unwrap();
    assert!(bytes.is_empty());
    let floats: Vec<f32> = safejni::call_static(TEST_ACTIVITY, "nullFloats", ()).unwrap();
    assert!(floats.is_empty());
}

#[test]
fn test_hash_map_argument() {
    vm();
    let mut map = HashMap::new();
    map.insert("striker".to_string(), "Inzaghi".to_string());
    map.insert("keeper".to_string(), "Buffon".to_string());

    let size: i32 = safejni::call_static(TEST_ACTIVITY, "mapSize", (&map,)).unwrap();
    assert_eq!(size, 2);
    let keeper: String = safejni::call_static(TEST_ACTIVITY, "mapGet", (&map, "keeper")).unwrap();
    assert_eq!(keeper, "Buffon");

    let empty: HashMap<String, String> = HashMap::new();
    let size: i32 = safejni::call_static(TEST_ACTIVITY, "mapSize", (empty,)).unwrap();
    assert_eq!(size, 0);
}

#[test]
fn test_hash_map_marshaling_releases_entries() {
    vm();
    let map: HashMap<String, String> = (0..16).map(|i| (format!("k{i}"), format!("v{i}"))).collect();
    let _: i32 = safejni::call_static(TEST_ACTIVITY, "mapSize", (&map,)).unwrap();

    let (size, stats) = measure(|| safejni::call_static::<i32, _>(TEST_ACTIVITY, "mapSize", (&map,)));
    assert_eq!(size.unwrap(), 16);
    assert_balanced(&stats);
}

#[test]
fn test_pointer_round_trip() {
    vm();
    let mut state = BTreeMap::from([(1, "one")]);
    let ptr: *mut BTreeMap<i32, &str> = &mut state;
    let back: *mut BTreeMap<i32, &str> = safejni::call_static(TEST_ACTIVITY, "echoPointer", (ptr,)).unwrap();
    assert_eq!(back, ptr);
    // SAFETY: `back` is `ptr`, which points at `state`.
    unsafe { (*back).insert(2, "two") };
    assert_eq!(state.len(), 2);

    let null: *const u8 = std::ptr::null();
    let back: *const u8 = safejni::call_static(TEST_ACTIVITY, "echoPointer", (null,)).unwrap();
    assert!(back.is_null());
}

#[test]
fn test_descriptors_drive_resolution() {
    vm();
    assert_eq!(<HashMap<String, String> as JavaType>::DESCRIPTOR, "Ljava/util/HashMap;");
    assert_eq!(<*const u8 as JavaType>::DESCRIPTOR, "J");

    // Passing an `i64` where the method takes a pointer-sized `long` resolves
    // the same method.
    let value: i64 = safejni::call_static(TEST_ACTIVITY, "echoPointer", (42i64,)).unwrap();
    assert_eq!(value, 42);

    let err = safejni::call_static::<i32, _>(TEST_ACTIVITY, "echoInt", (42i64,)).unwrap_err();
    assert!(matches!(err, Error::MethodNotFound { .. }));
}
