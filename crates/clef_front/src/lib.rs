//! # clef-front
//!
//! The core of the clef C front-end: everything between preprocessed
//! text and a fully type-annotated AST.
//!
//! ## Pipeline
//!
//! 1. **Lexer** ([`lexer`]): classifies tokens, types constants from
//!    their suffixes, folds adjacent string literals, follows
//!    preprocessor linemarkers.
//!
//! 2. **Parser & analyzer** ([`parser`]): one recursive-descent pass
//!    with a Pratt expression sub-parser; every production attaches
//!    the type its semantic rule computes.  Scoping, linkage
//!    composition, implicit conversions and the diagnostic rules all
//!    happen here.
//!
//! 3. **Type system** ([`types`]): all types are interned in a
//!    [`types::TypeArena`]; handle equality is structural equality
//!    except for struct/union/enum, whose identity is their tag
//!    declaration.
//!
//! Supporting pieces: the AST and declaration storage ([`ast`]),
//! scopes and name binding ([`scope`]), constant folding ([`fold`]),
//! format-string checking ([`format_check`]), the warning set
//! ([`warning`]) and an AST printer ([`printer`]).
//!
//! ## Example
//!
//! ```
//! use clef_base::{Arena, Diagnostics, Interner};
//! use clef_front::ast::AstContext;
//! use clef_front::parser::parse_translation_unit;
//! use clef_front::types::TypeArena;
//! use clef_front::warning::Warnings;
//!
//! let arena = Arena::new();
//! let ctx = AstContext::new(&arena);
//! let mut interner = Interner::new();
//! let mut types = TypeArena::new();
//! let warnings = Warnings::default();
//! let mut diags = Diagnostics::new();
//!
//! let unit = parse_translation_unit(
//!     "int main(void) { return 0; }",
//!     "hello.c",
//!     ctx,
//!     &mut interner,
//!     &mut types,
//!     &warnings,
//!     false,
//!     &mut diags,
//! );
//! assert!(!diags.has_errors());
//! assert!(!unit.decls.is_empty());
//! ```

pub mod ast;
pub mod fold;
pub mod format_check;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod scope;
pub mod token;
pub mod types;
pub mod warning;

pub use ast::{AstContext, TranslationUnit};
pub use lexer::Lexer;
pub use parser::parse_translation_unit;
pub use printer::{print_expression, print_unit};
pub use token::{Token, TokenKind};
pub use types::{AtomicKind, Qualifiers, TypeArena, TypeRef};
pub use warning::Warnings;
