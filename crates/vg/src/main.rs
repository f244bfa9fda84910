//! `vg`: interactive shell for the vigil runtime.
//!
//! Every input line is applied to a single root scope and the result is
//! printed.  Lines starting with `:` are shell commands:
//!
//! | command          | effect                                          |
//! |------------------|-------------------------------------------------|
//! | `:watch <expr>`  | print `<expr>` whenever a digest sees it change |
//! | `:deep <expr>`   | like `:watch`, comparing by value               |
//! | `:digest`        | run a digest on the root scope                  |
//! | `:tick`          | run deferred tasks until the queue is empty     |
//! | `:dump`          | print the root model                            |
//! | `:quit`          | exit                                            |
//!
//! Logging goes through `tracing`; set `RUST_LOG` to see digest traffic.

use std::io::{self, BufRead, Write};
use std::process;

use clap::Parser as _;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use vigil_core::config::{DEFAULT_DIGEST_TTL, RuntimeConfig};
use vigil_core::error::VigilResult;
use vigil_core::injector::{Injector, ModuleRegistry};
use vigil_core::objects::value::Value;
use vigil_core::parser::Parser;
use vigil_core::scope::Scope;

#[derive(clap::Parser, Debug)]
#[command(name = "vg")]
#[command(about = "Evaluate expressions against a live scope tree")]
struct Args {
    /// Maximum number of dirty passes a digest may run
    #[arg(long, default_value_t = DEFAULT_DIGEST_TTL)]
    ttl: usize,

    /// Suppress the banner and callback error logging
    #[arg(long, short)]
    quiet: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Modules the shell is assembled from.
fn shell_registry(args: &Args) -> VigilResult<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    registry
        .module("settings", &[])?
        .constant("ttl", Value::Number(args.ttl as f64))
        .constant("quiet", Value::Boolean(args.quiet));
    registry
        .module("shell", &["settings"])?
        .factory("logCallbackErrors", &["ttl", "quiet"], |deps| {
            let ttl = deps[0].to_number();
            Ok(Value::Boolean(ttl.is_finite() && ttl >= 1.0 && !deps[1].to_boolean()))
        })
        .factory("banner", &["ttl"], |deps| {
            Ok(Value::from(format!(
                "vg {} (digest ttl {}); :quit to exit",
                env!("CARGO_PKG_VERSION"),
                deps[0].to_js_string()
            )))
        });
    Ok(registry)
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

const MAX_DEPTH: usize = 4;

fn render(value: &Value) -> String {
    let mut out = String::new();
    render_into(value, 0, &mut out);
    out
}

fn render_into(value: &Value, depth: usize, out: &mut String) {
    match value {
        Value::String(s) => {
            out.push('"');
            out.push_str(&s.replace('"', "\\\""));
            out.push('"');
        }
        Value::Array(_) | Value::Object(_) if depth >= MAX_DEPTH => out.push_str("…"),
        Value::Array(arr) => {
            out.push('[');
            for (i, item) in arr.borrow().elements().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_into(item, depth + 1, out);
            }
            out.push(']');
        }
        Value::Object(obj) => {
            let entries = obj.borrow().entries();
            if entries.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push_str("{ ");
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(key);
                out.push_str(": ");
                render_into(item, depth + 1, out);
            }
            out.push_str(" }");
        }
        other => out.push_str(&other.to_js_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

enum Step {
    Continue,
    Quit,
}

fn add_watch(root: &Scope, expr: &str, value_eq: bool) -> VigilResult<()> {
    let label = expr.to_string();
    root.watch(
        expr,
        move |new, old, _| {
            println!("{label}: {} -> {}", render(old), render(new));
            Ok(())
        },
        value_eq,
    )?;
    Ok(())
}

fn dispatch(root: &Scope, line: &str) -> VigilResult<Step> {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    match command {
        ":quit" | ":q" => return Ok(Step::Quit),
        ":watch" if !rest.is_empty() => add_watch(root, rest, false)?,
        ":deep" if !rest.is_empty() => add_watch(root, rest, true)?,
        ":digest" => root.digest()?,
        ":tick" => {
            let ran = root.tasks().run_until_idle();
            println!("ran {ran} task(s)");
        }
        ":dump" => {
            if let Value::Object(model) = root.model() {
                for (key, value) in model.borrow().entries() {
                    println!("{key} = {}", render(&value));
                }
            }
        }
        cmd if cmd.starts_with(':') => println!("unknown command {line}"),
        _ => {
            let value = root.apply(line, None)?;
            println!("{}", render(&value));
        }
    }
    Ok(Step::Continue)
}

fn run(args: &Args) -> VigilResult<()> {
    let injector = Injector::new(&shell_registry(args)?, &["shell"])?;
    let config = RuntimeConfig::default()
        .with_digest_ttl(args.ttl)
        .with_log_callback_errors(injector.get("logCallbackErrors")?.to_boolean());
    let root = Scope::with_config(config, Parser::new());
    debug!(ttl = root.config().digest_ttl, "shell ready");

    if !args.quiet {
        println!("{}", injector.get("banner")?.to_js_string());
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        // A closed stdout only loses the prompt.
        let _ = stdout.flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                error!("failed to read input: {err}");
                break;
            }
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match dispatch(&root, line) {
            Ok(Step::Quit) => break,
            Ok(Step::Continue) => {}
            Err(err) => println!("{err}"),
        }
    }
    Ok(())
}

fn main() {
    init_logging();
    let args = Args::parse();
    if let Err(err) = run(&args) {
        error!("{err}");
        process::exit(1);
    }
}
