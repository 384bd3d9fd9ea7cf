//! ccs compiles Cascading Configuration Sheets — selector-scoped `.ccs`
//! rulesets — into a shared match DAG, then matches a sequence of asserted
//! steps against it incrementally via a persistent [Context].
//!
//! * A selector like `os.linux env.prod` compiles once into DNF and is
//!   folded into the DAG alongside every other rule in the sheet, sharing
//!   structure with rules that mention the same steps.
//! * [Context::augment] never mutates; each call returns a refined context,
//!   so the same base context can be forked along many query paths cheaply.
//! * Call ccs from a binary crate via [shell::main]; use as a library is the
//!   primary intended mode.

#![allow(rustdoc::private_intra_doc_links)]

mod core;
mod env;
mod error;
mod panic;
mod parser;
pub mod shell;

pub use core::accumulator::AccumulatorKind;
pub use core::context::{Context, ContextOptions, DEFAULT_EXPAND_LIMIT};
pub use core::property::Property;
pub use env::{EnvLookup, MapEnvLookup, StdEnvLookup};
pub use error::{CcsError, Diagnostic};
pub use parser::{FilesystemResolver, ImportResolver, NoImportResolver};
