#![no_main]

use libfuzzer_sys::fuzz_target;
use vigil_core::scope::Scope;

fn live_scopes(root: &Scope) -> Vec<Scope> {
    let mut out = vec![root.clone()];
    let mut index = 0;
    while index < out.len() {
        let children = out[index].children();
        out.extend(children);
        index += 1;
    }
    out
}

// Drive a scope tree with random structural operations and digests.
//
// Each operation is one byte:
//   bits [2:0] – operation (0=child, 1=isolated child, 2=destroy, 3=watch,
//                4=write, 5=digest, 6=broadcast, 7=apply_async)
//   bits [7:3] – index into the list of live scopes
//
// Watches copy one variable into another, so digests do real work and may
// hit the iteration budget; that error is expected, panics are not.
fuzz_target!(|data: &[u8]| {
    let root = Scope::new_root();
    let mut scopes = vec![root.clone()];
    const MAX_OPS: usize = 512;

    for (step, byte) in data.iter().take(MAX_OPS).enumerate() {
        let target = scopes[usize::from(byte >> 3) % scopes.len()].clone();
        match byte & 0x7 {
            0 => scopes.push(target.new_scope(false, None)),
            1 => scopes.push(target.new_scope(true, None)),
            2 if !target.is_root() => {
                target.destroy();
                scopes = live_scopes(&root);
            }
            3 => {
                let _ = target.watch(
                    "a",
                    |new, _, scope| {
                        scope.set("b", new.clone());
                        Ok(())
                    },
                    step % 2 == 0,
                );
            }
            4 => target.set("a", step as f64),
            5 => {
                let _ = target.digest();
            }
            6 => {
                target.broadcast("tick", &[]);
            }
            _ => {
                let _ = target.apply_async("a = a + 1");
            }
        }
        assert!(root.phase().is_none());
    }
    root.tasks().run_until_idle();
    assert!(root.phase().is_none());
});
