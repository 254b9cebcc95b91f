//! A minimal command-line front end over the `cel` library, in the spirit
//! of the teacher's own `ouros-cli`: plain `env::args()` parsing, no
//! `clap`, since the whole surface is a handful of single-letter flags
//! plus one positional expression argument. Only this file's *interface*
//! is in scope (spec §1) — the evaluation semantics all live in `cel`.

use std::io::Read;
use std::process::ExitCode;

use cel::{Activation, Environment, Value};

struct Args {
    read_stdin: bool,
    boolean_exit: bool,
    container: Option<String>,
    bindings: Vec<(String, String, String)>,
    expr: String,
}

fn parse_args(mut argv: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut read_stdin = true;
    let mut boolean_exit = false;
    let mut container = None;
    let mut bindings = Vec::new();
    let mut expr = None;

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "-n" => read_stdin = false,
            "-b" => boolean_exit = true,
            "-d" => {
                let pkg = argv.next().ok_or("-d requires an argument")?;
                container = Some(pkg);
            }
            "-a" => {
                let spec = argv.next().ok_or("-a requires an argument")?;
                bindings.push(parse_binding(&spec)?);
            }
            other if expr.is_none() => expr = Some(other.to_owned()),
            other => return Err(format!("unexpected argument: {other}")),
        }
    }

    Ok(Args {
        read_stdin,
        boolean_exit,
        container,
        bindings,
        expr: expr.ok_or("missing expression argument")?,
    })
}

/// Parses `NAME:TYPE=VALUE`, e.g. `-a age:int=30`.
fn parse_binding(spec: &str) -> Result<(String, String, String), String> {
    let (name, rest) = spec.split_once(':').ok_or_else(|| format!("malformed -a binding: {spec:?}"))?;
    let (ty, value) = rest.split_once('=').ok_or_else(|| format!("malformed -a binding: {spec:?}"))?;
    Ok((name.to_owned(), ty.to_owned(), value.to_owned()))
}

fn typed_value(ty: &str, raw: &str) -> Result<Value, String> {
    match ty {
        "int" => raw.parse::<i64>().map(Value::Int).map_err(|e| e.to_string()),
        "uint" => raw.parse::<u64>().map(Value::Uint).map_err(|e| e.to_string()),
        "double" => raw.parse::<f64>().map(Value::Double).map_err(|e| e.to_string()),
        "bool" => raw.parse::<bool>().map(Value::Bool).map_err(|e| e.to_string()),
        "string" => Ok(Value::String(raw.into())),
        "bytes" => Ok(Value::Bytes(raw.as_bytes().to_vec().into())),
        other => Err(format!("unknown binding type: {other}")),
    }
}

fn run() -> Result<ExitCode, String> {
    let args = parse_args(std::env::args().skip(1))?;

    let mut env = Environment::new();
    if let Some(container) = &args.container {
        env = env.with_container(container.clone());
    }

    let mut activation = Activation::new();
    for (name, ty, raw) in &args.bindings {
        let value = typed_value(ty, raw)?;
        activation.bind(name.clone(), value);
    }

    if args.read_stdin {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input).map_err(|e| e.to_string())?;
        if !input.trim().is_empty() {
            let json: serde_json::Value = serde_json::from_str(&input).map_err(|e| e.to_string())?;
            activation.bind("input", cel::adapter::from_json(&json));
        }
    }

    let ast = env.compile(&args.expr).map_err(|e| e.to_string())?;
    let program = ast.program(&env).map_err(|e| e.to_string())?;
    let result = program.evaluate(&activation);

    if args.boolean_exit {
        return Ok(match result {
            Ok(Value::Bool(true)) => ExitCode::from(0),
            Ok(Value::Bool(false)) => ExitCode::from(1),
            Ok(other) => {
                eprintln!("error: expression did not evaluate to a bool (got {})", other.kind());
                ExitCode::from(2)
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::from(2)
            }
        });
    }

    match result {
        Ok(value) => {
            println!("{value}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
