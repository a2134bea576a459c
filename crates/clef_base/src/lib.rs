//! # clef-base
//!
//! Foundation types shared across the clef C front-end:
//!
//! - [`Arena`]: bump allocation for the syntax tree of one
//!   translation unit,
//! - [`Interner`]/[`Symbol`]: the insertion-stable symbol table,
//! - [`Loc`]/[`SourceMap`]: source positions,
//! - [`Diagnostics`]: the accumulating error/warning sink.
//!
//! These deliberately know nothing about C; the language lives in
//! `clef-front`.

pub mod arena;
pub mod diag;
pub mod intern;
pub mod loc;

pub use arena::Arena;
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use intern::{Interner, Symbol};
pub use loc::{FileId, Loc, SourceMap};
