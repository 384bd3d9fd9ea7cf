//! Imperative shell for operating on a CCS ruleset.

use std::io::Read as _;

use crate::parser::FilesystemResolver;
use crate::{CcsError, Context, ContextOptions, Diagnostic};

/// Whether `path` names a file that exists, or is `-` (stdin).
fn file_exists(path: &str) -> bool {
    path == "-" || std::path::Path::new(path).is_file()
}

/// Reads `path` to a string, treating `-` as stdin.
fn read_file(path: &str) -> std::io::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}

/// One `key` or `key.value` step taken from argv.
fn parse_step(arg: &str) -> (String, Option<String>) {
    match arg.split_once('.') {
        Some((name, value)) => (name.to_string(), Some(value.to_string())),
        None => (arg.to_string(), None),
    }
}

/// Main entry point: `args[0]` is a `.ccs` file path (or `-` for stdin),
/// every remaining argument is a `key` or `key.value` step to assert in
/// order. Prints every resolvable property of the resulting context.
///
/// Mirrors the teacher's `shell::main(commands: Vec<String>)` command-loop
/// shape, generalized from a formula-operation loop to a ruleset-and-steps
/// loop (spec §4.9).
pub fn main(mut args: Vec<String>) {
    if args.is_empty() {
        args.push("-".to_string());
    }
    let source_arg = args.remove(0);

    if !file_exists(&source_arg) {
        crate::panic::report_error(&CcsError::Parse {
            origin: source_arg.clone(),
            message: "no such file".to_string(),
        });
        std::process::exit(1);
    }

    let text = match read_file(&source_arg) {
        Ok(text) => text,
        Err(err) => {
            crate::panic::report_error(&CcsError::Parse {
                origin: source_arg.clone(),
                message: err.to_string(),
            });
            std::process::exit(1);
        }
    };

    let origin = if source_arg == "-" {
        "<stdin>".to_string()
    } else {
        source_arg.clone()
    };
    let resolver = FilesystemResolver::new(
        std::path::Path::new(&origin)
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default(),
    );

    let (mut context, diagnostics) =
        match Context::from_source_with_diagnostics(&text, &origin, &resolver, ContextOptions::default()) {
            Ok(result) => result,
            Err(err) => {
                crate::panic::report_error(&err);
                std::process::exit(1);
            }
        };
    report_diagnostics(&diagnostics);

    for arg in &args {
        let (name, value) = parse_step(arg);
        context = context.augment(&name, value.as_deref());
    }

    for name in context.property_names() {
        match context.get_single_value(&name) {
            Ok(value) => println!("{name} = {value}"),
            Err(err) => crate::panic::report_error(&err),
        }
    }
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        crate::panic::report_diagnostic(diagnostic);
    }
}
