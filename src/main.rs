use std::{env, fs, path::Path};

use keel::bytecode::disasm::{print_script, print_stats};
use keel::bytecode::script::ScriptView;
use keel::compiler::issue::Severity;
use keel::compiler::{CompileOptions, Compiler};
use keel::runtime::vm::Vm;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let werror = args.contains(&"--Werror".to_string());
    let stats = args.contains(&"--stats".to_string());
    let output = args
        .iter()
        .position(|a| a == "-o")
        .and_then(|i| args.get(i + 1));

    // positional arguments, skipping the value of -o
    let positional: Vec<&String> = args
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(i, a)| !a.starts_with('-') && args.get(i - 1).map(String::as_str) != Some("-o"))
        .map(|(_, a)| a)
        .collect();

    match (positional.first().map(|s| s.as_str()), positional.get(1)) {
        (Some("build"), Some(input)) => build(input, output.map(String::as_str), werror),
        (Some("run"), Some(input)) => run(input),
        (Some("disasm"), Some(input)) => disasm(input, stats),
        (None, _) | (Some("help"), _) => print_usage(),
        _ => {
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("KEEL - typed bytecode compiler and VM");
    println!();
    println!("Usage:");
    println!("  keel build <tree.kt> [-o out.kbc] [--Werror]   Compile a syntax tree");
    println!("  keel run <file.kbc>                             Run a compiled script");
    println!("  keel disasm <file.kbc> [--stats]                Show the instructions");
    println!("  keel help                                       Show this help");
}

fn read(path: &str) -> Vec<u8> {
    match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", path, e);
            std::process::exit(1);
        }
    }
}

fn build(input: &str, output: Option<&str>, werror: bool) {
    let bytes = read(input);
    let compiler = Compiler::new(CompileOptions {
        warnings_as_errors: werror,
        ..CompileOptions::default()
    });
    let compilation = compiler.compile_bytes(&bytes);

    for issue in &compilation.issues {
        eprintln!("{}: {}", input, issue);
    }

    let Some(script) = compilation.script else {
        let errors = compilation
            .issues
            .iter()
            .filter(|i| i.severity >= Severity::Warning)
            .count();
        eprintln!("Compile error: build failed with {} problem(s)", errors);
        std::process::exit(1);
    };

    let output = output
        .map(str::to_string)
        .unwrap_or_else(|| Path::new(input).with_extension("kbc").display().to_string());
    if let Err(e) = fs::write(&output, script.to_bytes()) {
        eprintln!("Failed to write '{}': {}", output, e);
        std::process::exit(1);
    }
}

fn load<'a>(path: &str, bytes: &'a [u8]) -> ScriptView<'a> {
    match ScriptView::parse(bytes) {
        Ok(view) => view,
        Err(e) => {
            eprintln!("Load error in '{}': {}", path, e);
            std::process::exit(1);
        }
    }
}

fn run(input: &str) {
    let bytes = read(input);
    let script = load(input, &bytes);

    let mut vm = Vm::new();
    match vm.run(&script) {
        Ok(exit) => {
            println!("exit {} with {} byte(s) on the stack", exit.code(), vm.stack().len());
            std::process::exit(exit.code());
        }
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            std::process::exit(1);
        }
    }
}

fn disasm(input: &str, stats: bool) {
    let bytes = read(input);
    let script = load(input, &bytes);

    print_script(&script);
    if stats {
        println!();
        print_stats(&script);
    }
}
