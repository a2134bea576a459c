//! # clef
//!
//! The clef driver: command line handling and orchestration around the
//! front-end crates.
//!
//! The pipeline is preprocessed text → lexer → parser/analyzer →
//! diagnostics.  The external C preprocessor runs as a subprocess; the
//! front-end consumes its output through the lexer's byte interface.
//! This build stops after semantic analysis; `--fsyntax-only`,
//! `--print-ast` and `--lextest` are the useful endpoints.

pub mod cli;
pub mod driver;

pub use cli::Cli;
pub use driver::{run, CompileMode, Options};
