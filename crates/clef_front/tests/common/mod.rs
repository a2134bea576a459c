//! Shared harness: run the whole front-end over a source snippet and
//! hand the annotated unit to the test.

use clef_base::{Arena, Diagnostics, Interner};
use clef_front::ast::{AstContext, DeclId, TranslationUnit};
use clef_front::parser::parse_translation_unit;
use clef_front::types::TypeArena;
use clef_front::warning::Warnings;

/// Parses `source` and passes the result to `inspect`.
pub fn analyze<R>(
    source: &str,
    configure: impl FnOnce(&mut Warnings),
    inspect: impl FnOnce(&TranslationUnit<'_>, &mut TypeArena, &Interner, &Diagnostics) -> R,
) -> R {
    let arena = Arena::new();
    let ctx = AstContext::new(&arena);
    let mut interner = Interner::new();
    let mut types = TypeArena::new();
    let mut warnings = Warnings::default();
    configure(&mut warnings);
    let mut diags = Diagnostics::new();

    let unit = parse_translation_unit(
        source,
        "test.c",
        ctx,
        &mut interner,
        &mut types,
        &warnings,
        false,
        &mut diags,
    );

    inspect(&unit, &mut types, &interner, &diags)
}

/// Parses with default warnings, returning the rendered diagnostics
/// plus the error and warning counters.
#[allow(dead_code)]
pub fn diagnostics(source: &str) -> (String, usize, usize) {
    analyze(source, |_| {}, |_, _, _, diags| {
        (
            diags.render_all(),
            diags.error_count(),
            diags.warning_count(),
        )
    })
}

/// Parses with one extra warning flag applied.
#[allow(dead_code)]
pub fn diagnostics_with(source: &str, flag: &str) -> (String, usize, usize) {
    analyze(
        source,
        |warnings| warnings.apply(flag).expect("known warning flag"),
        |_, _, _, diags| {
            (
                diags.render_all(),
                diags.error_count(),
                diags.warning_count(),
            )
        },
    )
}

/// Finds the global declaration with the given name.
#[allow(dead_code)]
pub fn find_global(
    unit: &TranslationUnit<'_>,
    interner: &Interner,
    name: &str,
) -> Option<DeclId> {
    unit.decls
        .scope(unit.global_scope)
        .declarations
        .iter()
        .copied()
        .find(|decl| {
            unit.decls
                .get(*decl)
                .symbol
                .map(|sym| interner.resolve(sym) == name)
                .unwrap_or(false)
        })
}
