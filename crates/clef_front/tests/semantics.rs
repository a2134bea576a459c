//! End-to-end semantic checks: whole translation units go through the
//! front-end and the tests assert on the recorded declarations, the
//! attached types and the diagnostic stream.

mod common;

use clef_front::ast::{DeclPayload, ExprKind, Initializer, UnaryOp};
use clef_front::types::{ArraySize, AtomicKind, Type, TypeKind};
use common::{analyze, diagnostics, diagnostics_with, find_global};

#[test]
fn initializer_gets_an_implicit_cast_from_double_to_int() {
    analyze(
        "int x = 1 + 2.5;",
        |_| {},
        |unit, types, interner, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());

            let x = find_global(unit, interner, "x").expect("x is declared");
            let int = types.atomic(AtomicKind::Int);
            let double = types.atomic(AtomicKind::Double);
            assert_eq!(unit.decls.get(x).ty, Some(int));

            let DeclPayload::Initializer(initializer) = &unit.decls.get(x).payload else {
                panic!("x has no initializer");
            };
            let Initializer::Value(value) = initializer else {
                panic!("scalar initializer expected");
            };
            // the conversion to int is an explicit node in the tree
            assert_eq!(value.ty(), int);
            let ExprKind::Unary {
                op: UnaryOp::ImplicitCast,
                value: inner,
            } = &value.kind
            else {
                panic!("expected an implicit cast around the initializer");
            };
            assert_eq!(inner.ty(), double);
        },
    );
}

#[test]
fn null_pointer_constant_initializes_any_pointer() {
    let (rendered, errors, warnings) = diagnostics("int *p = 0;");
    assert_eq!(errors, 0, "{}", rendered);
    assert_eq!(warnings, 0, "{}", rendered);
}

#[test]
fn redeclaring_a_function_is_redundant_not_an_error() {
    let (rendered, errors, _) = diagnostics_with("int f(void), f();", "redundant-decls");
    assert_eq!(errors, 0, "{}", rendered);
    assert!(
        rendered.contains("redundant declaration"),
        "{}",
        rendered
    );

    // without the flag the program is silent
    let (rendered, errors, warnings) = diagnostics("int f(void), f();");
    assert_eq!((errors, warnings), (0, 0), "{}", rendered);
}

#[test]
fn incomplete_array_size_is_completed_by_a_later_declaration() {
    analyze(
        "int a[]; int a[5];",
        |_| {},
        |unit, types, interner, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());

            let occurrences = unit
                .decls
                .scope(unit.global_scope)
                .declarations
                .iter()
                .filter(|decl| {
                    unit.decls
                        .get(**decl)
                        .symbol
                        .map(|sym| interner.resolve(sym) == "a")
                        .unwrap_or(false)
                })
                .count();
            assert_eq!(occurrences, 1, "both declarations share one entry");

            let a = find_global(unit, interner, "a").unwrap();
            let int = types.atomic(AtomicKind::Int);
            let sized = types.intern(Type::new(TypeKind::Array {
                element: int,
                size: ArraySize::Fixed(5),
                is_static: false,
                is_variable: false,
            }));
            assert_eq!(unit.decls.get(a).ty, Some(sized));
        },
    );
}

#[test]
fn switch_without_default_warns_only_under_the_flag() {
    let source = "int main(void){ switch(0){} }";
    let (rendered, errors, warnings) = diagnostics(source);
    assert_eq!((errors, warnings), (0, 0), "{}", rendered);

    let (rendered, errors, _) = diagnostics_with(source, "switch-default");
    assert_eq!(errors, 0, "{}", rendered);
    assert!(
        rendered.contains("switch has no default case"),
        "{}",
        rendered
    );
}

#[test]
fn assignment_to_compound_with_readonly_field_is_rejected() {
    let source = "struct S { const int x; }; void f(struct S a, struct S b){ a = b; }";
    let (rendered, errors, _) = diagnostics(source);
    assert_eq!(errors, 1, "{}", rendered);
    assert!(rendered.contains("readonly fields"), "{}", rendered);
}

#[test]
fn defined_and_used_label_is_silent() {
    let (rendered, errors, warnings) = diagnostics("int f(){ L: goto L; }");
    assert_eq!((errors, warnings), (0, 0), "{}", rendered);
}

#[test]
fn goto_to_an_undefined_label_is_an_error() {
    let (rendered, errors, _) = diagnostics("int f(){ goto L; }");
    assert_eq!(errors, 1, "{}", rendered);
    assert!(rendered.contains("used but not defined"), "{}", rendered);
}

#[test]
fn unused_label_warns() {
    let (rendered, errors, _) = diagnostics("int f(){ L: return 0; }");
    assert_eq!(errors, 0, "{}", rendered);
    assert!(rendered.contains("defined but not used"), "{}", rendered);
}

#[test]
fn kr_style_definition_fills_parameter_types() {
    analyze(
        "int f(a, b) int a; float b; { return a; }",
        |_| {},
        |unit, types, interner, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());

            let f = find_global(unit, interner, "f").unwrap();
            let ty = unit.decls.get(f).ty.unwrap();
            let ty = types.skip_alias(ty);
            let int = types.atomic(AtomicKind::Int);
            let float = types.atomic(AtomicKind::Float);
            let TypeKind::Function(function) = types.kind(ty) else {
                panic!("f should have function type");
            };
            assert!(!function.kr_style);
            assert_eq!(function.parameters.len(), 2);
            assert_eq!(function.parameters[0], int);
            assert_eq!(function.parameters[1], float);
        },
    );
}

#[test]
fn typedef_names_declare_and_can_be_shadowed() {
    let source = "typedef int T; T x; int main(void) { int T = 1; return T; }";
    let (rendered, errors, warnings) = diagnostics(source);
    assert_eq!((errors, warnings), (0, 0), "{}", rendered);
}

#[test]
fn enum_entries_count_from_explicit_values() {
    analyze(
        "enum E { A, B = 5, C };",
        |_| {},
        |unit, _, interner, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());

            for (name, expected) in [("A", 0), ("B", 5), ("C", 6)] {
                let entry = find_global(unit, interner, name).expect(name);
                let DeclPayload::EnumValue { value, .. } = unit.decls.get(entry).payload else {
                    panic!("{} is not an enum entry", name);
                };
                assert_eq!(value, expected, "value of {}", name);
            }
        },
    );
}

#[test]
fn assigning_away_qualifiers_is_diagnosed() {
    let source = "void f(const char *p) { char *q = p; }";
    let (rendered, errors, _) = diagnostics(source);
    assert_eq!(errors, 1, "{}", rendered);
    assert!(rendered.contains("lacks qualifiers"), "{}", rendered);

    let source = "void f(char *p) { const char *q = p; }";
    let (rendered, errors, _) = diagnostics(source);
    assert_eq!(errors, 0, "{}", rendered);
}

#[test]
fn call_arity_is_checked() {
    let (rendered, errors, _) = diagnostics("int g(int); int main(void) { return g(); }");
    assert_eq!(errors, 1, "{}", rendered);
    assert!(rendered.contains("too few arguments"), "{}", rendered);

    let (rendered, errors, _) = diagnostics("int g(int); int main(void) { return g(1, 2); }");
    assert_eq!(errors, 1, "{}", rendered);
    assert!(rendered.contains("too many arguments"), "{}", rendered);
}

#[test]
fn calling_an_unknown_function_declares_it_implicitly() {
    let (rendered, errors, _) = diagnostics("int main(void) { foo(); return 0; }");
    assert_eq!(errors, 0, "{}", rendered);
    assert!(
        rendered.contains("implicit declaration of function 'foo'"),
        "{}",
        rendered
    );
}

#[test]
fn char_subscripts_warn_by_default() {
    let source = "int a[10]; int f(char c){ return a[c]; }";
    let (rendered, errors, _) = diagnostics(source);
    assert_eq!(errors, 0, "{}", rendered);
    assert!(rendered.contains("array subscript"), "{}", rendered);
}

#[test]
fn sign_compare_warns_only_when_enabled() {
    let source = "int f(int a, unsigned b) { return a < b; }";
    let (rendered, _, warnings) = diagnostics(source);
    assert_eq!(warnings, 0, "{}", rendered);

    let (rendered, _, _) = diagnostics_with(source, "sign-compare");
    assert!(
        rendered.contains("comparison between signed and unsigned"),
        "{}",
        rendered
    );
}

#[test]
fn string_initializer_sizes_a_char_array() {
    analyze(
        "char s[] = \"ab\";",
        |_| {},
        |unit, types, interner, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());
            let s = find_global(unit, interner, "s").unwrap();
            let ty = unit.decls.get(s).ty.unwrap();
            let TypeKind::Array { size, .. } = types.kind(ty) else {
                panic!("s should be an array");
            };
            assert_eq!(*size, ArraySize::Fixed(3));
        },
    );
}

#[test]
fn member_access_through_incomplete_struct_is_an_error() {
    let source = "struct S; struct S *p; int f(void){ return p->x; }";
    let (rendered, errors, _) = diagnostics(source);
    assert_eq!(errors, 1, "{}", rendered);
    assert!(rendered.contains("incomplete type"), "{}", rendered);
}

#[test]
fn member_access_resolves_the_entry() {
    analyze(
        "struct point { int x; int y; }; int f(struct point p) { return p.y; }",
        |_| {},
        |_, _, _, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());
        },
    );
}

#[test]
fn break_and_continue_require_an_enclosing_construct() {
    let (rendered, errors, _) = diagnostics("int f(void){ break; }");
    assert_eq!(errors, 1, "{}", rendered);
    assert!(rendered.contains("break statement"), "{}", rendered);

    let (rendered, errors, _) = diagnostics("int f(void){ continue; }");
    assert_eq!(errors, 1, "{}", rendered);
    assert!(rendered.contains("continue statement"), "{}", rendered);

    let (rendered, errors, _) =
        diagnostics("int f(int n){ while (n) { if (n == 2) break; --n; } return n; }");
    assert_eq!(errors, 0, "{}", rendered);
}

#[test]
fn a_second_default_label_is_an_error() {
    let source = "int f(int x){ switch(x){ default: return 1; default: return 2; } }";
    let (rendered, errors, _) = diagnostics(source);
    assert_eq!(errors, 1, "{}", rendered);
    assert!(rendered.contains("multiple default labels"), "{}", rendered);
}

#[test]
fn case_labels_must_be_integer_constants() {
    let source = "int f(int x){ switch(x){ case x: return 1; } return 0; }";
    let (rendered, errors, _) = diagnostics(source);
    assert_eq!(errors, 1, "{}", rendered);
    assert!(
        rendered.contains("does not reduce to an integer constant"),
        "{}",
        rendered
    );
}

#[test]
fn taking_the_address_of_a_register_variable_is_an_error() {
    let source = "int f(void){ register int r = 0; return *&r; }";
    let (rendered, errors, _) = diagnostics(source);
    assert_eq!(errors, 1, "{}", rendered);
    assert!(rendered.contains("register variable"), "{}", rendered);
}

#[test]
fn static_after_non_static_is_an_error() {
    let (rendered, errors, _) = diagnostics("int x; static int x;");
    assert_eq!(errors, 1, "{}", rendered);
    assert!(
        rendered.contains("static declaration"),
        "{}",
        rendered
    );
}

#[test]
fn return_value_mismatches_warn() {
    let (rendered, _, warnings) = diagnostics("void f(void){ return 1; }");
    assert!(warnings >= 1, "{}", rendered);
    assert!(
        rendered.contains("'return' with a value"),
        "{}",
        rendered
    );

    let (rendered, _, _) = diagnostics("int f(void){ return; }");
    assert!(
        rendered.contains("'return' without value"),
        "{}",
        rendered
    );
}

#[test]
fn returning_the_address_of_a_local_warns() {
    let source = "int *f(void){ int x = 1; return &x; }";
    let (rendered, errors, _) = diagnostics(source);
    assert_eq!(errors, 0, "{}", rendered);
    assert!(
        rendered.contains("address of local variable"),
        "{}",
        rendered
    );
}

#[test]
fn main_shape_checks_warn() {
    let (rendered, _, _) = diagnostics("static int main(void) { return 0; }");
    assert!(rendered.contains("non-static"), "{}", rendered);

    let (rendered, _, _) = diagnostics("void main(void) { }");
    assert!(
        rendered.contains("return type of 'main'"),
        "{}",
        rendered
    );

    let (rendered, _, warnings) =
        diagnostics("int main(int argc, char **argv) { return argc && argv != 0; }");
    assert_eq!(warnings, 0, "{}", rendered);
}

#[test]
fn format_string_checks_dispatch_on_callee_identity() {
    let source = r#"int printf(const char *fmt, ...);
int main(void) { printf("%d %s", 1); return 0; }"#;
    let (rendered, errors, _) = diagnostics(source);
    assert_eq!(errors, 0, "{}", rendered);
    assert!(
        rendered.contains("too few arguments for format"),
        "{}",
        rendered
    );

    let source = r#"int printf(const char *fmt, ...);
int main(void) { printf("%d", 1.5); return 0; }"#;
    let (rendered, _, _) = diagnostics(source);
    assert!(rendered.contains("format '%d'"), "{}", rendered);
}

#[test]
fn function_returning_array_is_rejected() {
    let (rendered, errors, _) = diagnostics("int f(void)[3];");
    assert!(errors >= 1, "{}", rendered);
    assert!(
        rendered.contains("function returning array"),
        "{}",
        rendered
    );
}

#[test]
fn array_of_void_is_rejected() {
    let (rendered, errors, _) = diagnostics("void a[3];");
    assert!(errors >= 1, "{}", rendered);
    assert!(rendered.contains("array of void"), "{}", rendered);
}

#[test]
fn conditional_joins_arithmetic_branches() {
    analyze(
        "double d = 1 ? 2 : 3.5;",
        |_| {},
        |unit, types, interner, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());
            let d = find_global(unit, interner, "d").unwrap();
            let DeclPayload::Initializer(Initializer::Value(value)) =
                &unit.decls.get(d).payload
            else {
                panic!("d has a value initializer");
            };
            // the conditional itself computed double before the outer
            // (identity) conversion
            let double = types.atomic(AtomicKind::Double);
            assert_eq!(value.ty(), double);
        },
    );
}

#[test]
fn incompatible_redeclaration_is_an_error() {
    let (rendered, errors, _) = diagnostics("int x; double x;");
    assert!(errors >= 1, "{}", rendered);
    assert!(
        rendered.contains("incompatible with previous declaration"),
        "{}",
        rendered
    );
}

#[test]
fn undeclared_identifiers_are_reported_once_per_use() {
    let (rendered, errors, _) = diagnostics("int f(void){ return y; }");
    assert_eq!(errors, 1, "{}", rendered);
    assert!(rendered.contains("unknown symbol 'y'"), "{}", rendered);
}

#[test]
fn statement_expressions_take_the_last_expression_type() {
    analyze(
        "int x = ({ 1; 2.5; });",
        |warnings| warnings.unused_value = false,
        |unit, types, interner, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());
            let x = find_global(unit, interner, "x").unwrap();
            let DeclPayload::Initializer(Initializer::Value(value)) =
                &unit.decls.get(x).payload
            else {
                panic!("x has a value initializer");
            };
            let int = types.atomic(AtomicKind::Int);
            assert_eq!(value.ty(), int, "cast to int around the double");
        },
    );
}

#[test]
fn sizeof_reverts_array_decay() {
    analyze(
        "int a[8]; unsigned long n = sizeof a;",
        |_| {},
        |unit, types, interner, diags| {
            assert_eq!(diags.error_count(), 0, "{}", diags.render_all());
            let n = find_global(unit, interner, "n").unwrap();
            let DeclPayload::Initializer(Initializer::Value(value)) =
                &unit.decls.get(n).payload
            else {
                panic!("n has a value initializer");
            };
            // folding sees the un-decayed array type: 8 * sizeof(int)
            let folded = clef_front::fold::fold(value, &unit.decls, types);
            assert_eq!(folded, Some(32));
        },
    );
}
