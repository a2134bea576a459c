//! Invariant checks over whole parses: type interning, scope
//! ownership, expression typing, diagnostic determinism, and the
//! print/reparse round trip.

mod common;

use clef_base::{Arena, Diagnostics, Interner};
use clef_front::ast::{AstContext, DeclPayload, Initializer};
use clef_front::parser::parse_translation_unit;
use clef_front::printer::print_expression;
use clef_front::types::{AtomicKind, Type, TypeArena, TypeKind};
use clef_front::warning::Warnings;
use common::{analyze, find_global};

#[test]
fn structurally_equal_types_share_one_handle() {
    analyze(
        "int *p; int *q; int a[3]; int b[3]; int c[4]; int f(int); int g(int);",
        |_| {},
        |unit, _, interner, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());
            let ty = |name: &str| {
                let decl = find_global(unit, interner, name).expect(name);
                unit.decls.get(decl).ty.unwrap()
            };
            assert_eq!(ty("p"), ty("q"));
            assert_eq!(ty("a"), ty("b"));
            assert_ne!(ty("b"), ty("c"));
            assert_eq!(ty("f"), ty("g"));
            assert_ne!(ty("p"), ty("a"));
        },
    );
}

#[test]
fn tag_types_compare_by_declaration_identity() {
    analyze(
        "struct S { int x; }; struct S a; struct S b; struct T { int x; }; struct T c;",
        |_| {},
        |unit, types, interner, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());
            let ty = |name: &str| {
                let decl = find_global(unit, interner, name).expect(name);
                unit.decls.get(decl).ty.unwrap()
            };
            assert_eq!(ty("a"), ty("b"));
            // structurally identical but a different tag
            assert_ne!(ty("a"), ty("c"));
            assert!(!types.compatible(ty("a"), ty("c")));
        },
    );
}

#[test]
fn every_declaration_is_owned_by_exactly_one_scope() {
    analyze(
        "int x; int f(int p) { int y; { int y2; } for (;;) { int z; } return p; } struct S { int m; };",
        |_| {},
        |unit, _, _, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());

            let mut seen = std::collections::HashMap::new();
            for scope in unit.decls.scope_ids() {
                for decl in &unit.decls.scope(scope).declarations {
                    *seen.entry(*decl).or_insert(0usize) += 1;
                    assert_eq!(
                        unit.decls.get(*decl).parent_scope,
                        Some(scope),
                        "back link must match the owning scope"
                    );
                }
            }
            for (decl, count) in seen {
                assert_eq!(count, 1, "declaration {:?} appears in {} scopes", decl, count);
            }
        },
    );
}

#[test]
fn well_formed_expressions_carry_valid_types() {
    analyze(
        "int a; int b; int x = (a + b) * 3 - (a ? b : 7);",
        |_| {},
        |unit, types, interner, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());
            let x = find_global(unit, interner, "x").unwrap();
            let DeclPayload::Initializer(Initializer::Value(value)) = &unit.decls.get(x).payload
            else {
                panic!("x has a value initializer");
            };

            // walk the tree: every node has a valid type
            fn walk(
                expression: &clef_front::ast::Expr<'_>,
                types: &TypeArena,
            ) {
                use clef_front::ast::ExprKind;
                assert!(
                    types.is_valid(types.skip_alias(expression.ty())),
                    "expression without a valid type"
                );
                match &expression.kind {
                    ExprKind::Unary { value, .. } => walk(value, types),
                    ExprKind::Binary { left, right, .. } => {
                        walk(left, types);
                        walk(right, types);
                    }
                    ExprKind::Conditional {
                        condition,
                        true_expr,
                        false_expr,
                    } => {
                        walk(condition, types);
                        walk(true_expr, types);
                        walk(false_expr, types);
                    }
                    _ => {}
                }
            }
            walk(value, types);
        },
    );
}

#[test]
fn parsing_twice_yields_identical_diagnostics() {
    let source = "int f(){ goto L; }\nchar *p = 3.5;\nint a[10]; int g(char c){ return a[c]; }";
    let (first, _, _) = common::diagnostics(source);
    let (second, _, _) = common::diagnostics(source);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn interning_is_idempotent_over_parser_built_types() {
    analyze(
        "int *p; double (*fp)(int, char);",
        |_| {},
        |unit, types, interner, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());
            for name in ["p", "fp"] {
                let decl = find_global(unit, interner, name).expect(name);
                let ty = unit.decls.get(decl).ty.unwrap();
                let copy = types.get(ty).clone();
                assert_eq!(types.intern(copy), ty);
            }
        },
    );
}

#[test]
fn printed_expressions_reparse_to_the_same_type() {
    let cases = [
        ("int", "a + b * 2"),
        ("double", "a + 2.5"),
        ("int", "(a < b) && (b != 7)"),
        ("unsigned long", "sizeof(a) + 1u"),
    ];

    for (result_type, expression) in cases {
        let source = format!("int a; int b; {} y = {};", result_type, expression);
        let printed = analyze(
            &source,
            |_| {},
            |unit, types, interner, diags| {
                assert_eq!(diags.error_count(), 0, "{}", diags.render_all());
                let y = find_global(unit, interner, "y").unwrap();
                let DeclPayload::Initializer(Initializer::Value(value)) =
                    &unit.decls.get(y).payload
                else {
                    panic!("y has a value initializer");
                };
                print_expression(value, &unit.decls, types, interner)
            },
        );

        // feed the printed form through the front-end again
        let reparsed_source = format!("int a; int b; {} y = {};", result_type, printed);
        let reprinted = analyze(
            &reparsed_source,
            |_| {},
            |unit, types, interner, diags| {
                assert_eq!(
                    diags.error_count(),
                    0,
                    "reparse of {:?}: {}",
                    printed,
                    diags.render_all()
                );
                let y = find_global(unit, interner, "y").unwrap();
                let DeclPayload::Initializer(Initializer::Value(value)) =
                    &unit.decls.get(y).payload
                else {
                    panic!("y has a value initializer");
                };
                print_expression(value, &unit.decls, types, interner)
            },
        );

        // the printed form is a fixpoint, so the types must agree
        assert_eq!(printed, reprinted, "case {:?}", expression);
    }
}

#[test]
fn separate_arenas_produce_equal_structures_independently() {
    // two front-end instances never share state; both must accept the
    // same program and agree on structure
    let source = "struct S { int a; }; struct S s; int n = 1;";
    let run = || {
        let arena = Arena::new();
        let ctx = AstContext::new(&arena);
        let mut interner = Interner::new();
        let mut types = TypeArena::new();
        let warnings = Warnings::default();
        let mut diags = Diagnostics::new();
        let unit = parse_translation_unit(
            source,
            "t.c",
            ctx,
            &mut interner,
            &mut types,
            &warnings,
            false,
            &mut diags,
        );
        assert!(!diags.has_errors(), "{}", diags.render_all());
        unit.decls.scope(unit.global_scope).declarations.len()
    };
    assert_eq!(run(), run());
}

#[test]
fn the_error_sentinel_suppresses_cascades() {
    // 'y' is unknown: exactly one error, and every later use of the
    // resulting error-typed expression stays silent
    let source = "int f(void){ return (y - 2) * 3 + 1; }";
    let (rendered, errors, _) = common::diagnostics(source);
    assert_eq!(errors, 1, "{}", rendered);
}

#[test]
fn qualified_and_unqualified_types_are_distinct() {
    let mut types = TypeArena::new();
    let int = types.atomic(AtomicKind::Int);
    let qualified = types.with_qualifiers(int, clef_front::types::Qualifiers::CONST);
    assert_ne!(int, qualified);
    let pointer = types.intern(Type::new(TypeKind::Pointer(int)));
    let pointer_again = types.intern(Type::new(TypeKind::Pointer(int)));
    assert_eq!(pointer, pointer_again);
}
