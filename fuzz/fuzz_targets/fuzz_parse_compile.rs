#![no_main]

use libfuzzer_sys::fuzz_target;
use vigil_core::objects::value::Value;
use vigil_core::parser::Parser;

// Parse, compile and evaluate arbitrary text against an empty model.  Every
// stage must either succeed or return a typed error.  A constant expression
// must render the same way on every evaluation.
fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let parser = Parser::new();
    let Ok(expr) = parser.parse(source) else {
        return;
    };
    assert_eq!(expr.source(), source);
    let model = Value::new_object();
    let first = expr.evaluate(&model, None);
    if expr.is_constant() {
        let second = expr.evaluate(&Value::new_object(), None);
        if let (Ok(a), Ok(b)) = (&first, &second) {
            assert_eq!(a.to_js_string(), b.to_js_string());
        }
    }
});
