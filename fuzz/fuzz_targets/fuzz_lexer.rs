#![no_main]

use libfuzzer_sys::fuzz_target;
use vigil_core::parser::lexer::Lexer;

// Feed arbitrary UTF-8 to the lexer.  It must either produce tokens whose
// spans lie inside the input and advance monotonically, or fail with a lex
// error; it must never panic or loop.
fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(tokens) = Lexer::tokenize_all(source) else {
        return;
    };
    let mut last_end = 0;
    for token in &tokens {
        assert!(token.span.start.offset >= last_end);
        assert!(token.span.end.offset <= source.len());
        assert!(token.span.start.offset <= token.span.end.offset);
        last_end = token.span.end.offset;
    }
});
