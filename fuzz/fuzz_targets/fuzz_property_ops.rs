#![no_main]

use libfuzzer_sys::fuzz_target;
use vigil_core::objects::js_object::{JsObject, MAX_FAST_PROPERTIES};
use vigil_core::objects::value::Value;

// Random `set` / `get` / `delete` / `has` operations on a `JsObject` whose
// prototype holds a fixed property, checked against a plain key/value list.
//
// Each operation is encoded in two bytes:
//   byte 0  bits [1:0] – operation selector (0=set, 1=get, 2=delete, 3=has)
//           bits [7:2] – value payload
//   byte 1  bits [3:0] – property key index k0–k15
//
// Sixteen keys are enough to push the object past the inline store and back.
fuzz_target!(|data: &[u8]| {
    let proto = JsObject::new().into_ref();
    proto.borrow_mut().set_property("k0", Value::from(-1));
    let mut obj = JsObject::with_prototype(proto);
    let mut model: Vec<(String, i32)> = Vec::new();
    const MAX_OPS: usize = 256;

    for chunk in data.chunks_exact(2).take(MAX_OPS) {
        let op = chunk[0] & 0x3;
        let payload = i32::from(chunk[0] >> 2);
        let key = format!("k{}", chunk[1] & 0xf);
        let expected = model.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);

        match op {
            0 => {
                obj.set_property(&key, Value::from(payload));
                match model.iter_mut().find(|(k, _)| *k == key) {
                    Some(entry) => entry.1 = payload,
                    None => model.push((key, payload)),
                }
            }
            1 => {
                let got = obj.get_property(&key);
                match expected {
                    Some(v) => assert!(got.strict_equals(&Value::from(v))),
                    None if key == "k0" => assert!(got.strict_equals(&Value::from(-1))),
                    None => assert!(got.is_undefined()),
                }
            }
            2 => {
                assert_eq!(obj.delete_own_property(&key), expected.is_some());
                model.retain(|(k, _)| *k != key);
            }
            _ => {
                assert_eq!(obj.has_own_property(&key), expected.is_some());
                assert_eq!(obj.has_property(&key), expected.is_some() || key == "k0");
            }
        }

        assert_eq!(obj.len(), model.len());
        if obj.is_fast_mode() {
            assert!(obj.len() <= MAX_FAST_PROPERTIES);
        }
    }
});
