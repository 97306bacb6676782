//! Typing core CLI orchestrator
//!
//! This binary provides the main entry point for inspecting an IDL tree:
//! load it, list what it declares, and optionally validate a literal
//! value against one of its named types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

use std::env;
use std::path::PathBuf;

use engine::Engine;
use ir::RpcObject;

fn print_help() {
    println!("rpct-compiler");
    println!();
    println!("USAGE:");
    println!("    rpct-compiler [SUBCOMMAND] [FLAGS]");
    println!();
    println!("SUBCOMMANDS:");
    println!("    list                          List every registered type and interface");
    println!("    validate                      Validate a literal value against a named type");
    println!("    --help, -h                    Show this help message");
    println!("FLAGS:");
    println!("    --path <dir_or_file>          IDL file or directory to load [REQUIRED]");
    println!("    --type <name>                 Fully-qualified type name (validate only) [REQUIRED]");
    println!("    --value <literal>             YAML-literal value to validate (validate only) [REQUIRED]");
    println!();
    println!("EXAMPLES:");
    println!("    rpct-compiler list --path ./idl");
    println!("    rpct-compiler validate --path ./idl --type demo.Point --value '{{x: 1, y: 2}}'");
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter().position(|a| a == name).and_then(|i| args.get(i + 1)).map(String::as_str)
}

fn run_list(engine: &Engine) {
    for (name, ty) in engine.registry().all_types() {
        println!("type {name} ({:?})", ty.class());
    }
    for (name, _) in engine.registry().all_interfaces() {
        println!("interface {name}");
    }
}

fn run_validate(engine: &Engine, type_name: &str, literal: &str) -> Result<(), String> {
    let value: ir::Value = serde_yaml::from_str(literal).map_err(|e| format!("invalid value literal: {e}"))?;
    let instance = engine
        .resolve_type(type_name)
        .map_err(|e| format!("failed to resolve type '{type_name}': {e}"))?;
    let object = RpcObject::typed(value, instance);

    let ctx = engine.validate(type_name, &object).map_err(|e| format!("failed to resolve type '{type_name}': {e}"))?;
    if ctx.errors.is_empty() {
        println!("valid");
        Ok(())
    } else {
        for error in &ctx.errors {
            println!("{}: {}", error.path, error.message);
        }
        Err(format!("{} error(s)", ctx.errors.len()))
    }
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return;
    }

    let Some(path_arg) = flag(&args, "--path") else {
        eprintln!("Error: --path <dir_or_file> is required");
        eprintln!("Use 'rpct-compiler --help' for usage information");
        std::process::exit(1);
    };
    let path = PathBuf::from(path_arg);

    let engine = Engine::init();
    if let Err(e) = engine.load_types(&path) {
        eprintln!("Error: failed to load '{}': {e}", path.display());
        std::process::exit(1);
    }

    if args.iter().any(|a| a == "list") {
        run_list(&engine);
        return;
    }

    if args.iter().any(|a| a == "validate") {
        let (Some(type_name), Some(value)) = (flag(&args, "--type"), flag(&args, "--value")) else {
            eprintln!("Error: validate requires --type <name> and --value <literal>");
            std::process::exit(1);
        };
        if let Err(e) = run_validate(&engine, type_name, value) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        return;
    }

    eprintln!("Error: no subcommand given");
    eprintln!("Use 'rpct-compiler --help' for usage information");
    std::process::exit(1);
}
