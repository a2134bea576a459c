//! Scopes and the name-binding environment.
//!
//! A [`Scope`] is an ordered list of the declarations that appeared in
//! it, plus a parent link.  Scopes nest for function bodies, blocks,
//! struct/union bodies and `for` headers.
//!
//! Visibility is a separate concern handled by [`Environment`]: a map
//! from `(symbol, namespace)` to the currently visible declaration,
//! backed by a push-down stack of shadowed bindings.  Entering a
//! declaration's visibility saves the previous binding and installs the
//! new one; [`Environment::pop_to`] undoes the saved entries in reverse
//! order.  The parser keeps two of these: one for the ordinary/tag
//! namespaces and one for labels, which have function scope.

use crate::ast::{DeclId, Namespace};
use clef_base::Symbol;
use std::collections::HashMap;

/// Handle to a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub(crate) u32);

/// One lexical scope: parent plus declarations in source order.
#[derive(Debug, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub declarations: Vec<DeclId>,
}

/// A saved binding on the shadow stack.
#[derive(Debug, Clone, Copy)]
struct StackEntry {
    symbol: Symbol,
    namespace: Namespace,
    shadowed: Option<DeclId>,
}

/// Current visible bindings plus the shadow stack restoring them.
#[derive(Default)]
pub struct Environment {
    bindings: HashMap<(Symbol, Namespace), DeclId>,
    stack: Vec<StackEntry>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack mark to pass to [`Environment::pop_to`] later.
    pub fn top(&self) -> usize {
        self.stack.len()
    }

    /// The currently visible declaration of `symbol` in `namespace`.
    pub fn lookup(&self, symbol: Symbol, namespace: Namespace) -> Option<DeclId> {
        self.bindings.get(&(symbol, namespace)).copied()
    }

    /// Saves the previous binding of `(symbol, namespace)` and installs
    /// `decl` as the visible one.
    pub fn push(&mut self, symbol: Symbol, namespace: Namespace, decl: DeclId) {
        let shadowed = self.bindings.insert((symbol, namespace), decl);
        self.stack.push(StackEntry {
            symbol,
            namespace,
            shadowed,
        });
    }

    /// Restores saved bindings in reverse order until the stack has
    /// `mark` entries again.
    pub fn pop_to(&mut self, mark: usize) {
        debug_assert!(mark <= self.stack.len());
        while self.stack.len() > mark {
            let entry = self.stack.pop().unwrap();
            let key = (entry.symbol, entry.namespace);
            match entry.shadowed {
                Some(old) => {
                    self.bindings.insert(key, old);
                }
                None => {
                    self.bindings.remove(&key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DeclArena;
    use crate::types::{AtomicKind, TypeArena};

    fn decl(decls: &mut DeclArena<'_>, types: &mut TypeArena) -> DeclId {
        let int = types.atomic(AtomicKind::Int);
        decls.fresh_typedef_for_tests(int)
    }

    #[test]
    fn lookup_finds_pushed_binding() {
        let mut types = TypeArena::new();
        let mut decls = DeclArena::new();
        let mut interner = clef_base::Interner::new();
        let mut env = Environment::new();

        let x = interner.intern("x");
        let d = decl(&mut decls, &mut types);
        env.push(x, Namespace::Ordinary, d);
        assert_eq!(env.lookup(x, Namespace::Ordinary), Some(d));
        assert_eq!(env.lookup(x, Namespace::Struct), None);
    }

    #[test]
    fn shadowing_restores_on_pop() {
        let mut types = TypeArena::new();
        let mut decls = DeclArena::new();
        let mut interner = clef_base::Interner::new();
        let mut env = Environment::new();

        let x = interner.intern("x");
        let outer = decl(&mut decls, &mut types);
        let inner = decl(&mut decls, &mut types);

        env.push(x, Namespace::Ordinary, outer);
        let mark = env.top();
        env.push(x, Namespace::Ordinary, inner);
        assert_eq!(env.lookup(x, Namespace::Ordinary), Some(inner));

        env.pop_to(mark);
        assert_eq!(env.lookup(x, Namespace::Ordinary), Some(outer));
    }

    #[test]
    fn pop_removes_bindings_with_no_shadow() {
        let mut types = TypeArena::new();
        let mut decls = DeclArena::new();
        let mut interner = clef_base::Interner::new();
        let mut env = Environment::new();

        let x = interner.intern("x");
        let mark = env.top();
        let d = decl(&mut decls, &mut types);
        env.push(x, Namespace::Ordinary, d);
        env.pop_to(mark);
        assert_eq!(env.lookup(x, Namespace::Ordinary), None);
    }

    #[test]
    fn namespaces_are_disjoint() {
        let mut types = TypeArena::new();
        let mut decls = DeclArena::new();
        let mut interner = clef_base::Interner::new();
        let mut env = Environment::new();

        let s = interner.intern("s");
        let as_tag = decl(&mut decls, &mut types);
        let as_object = decl(&mut decls, &mut types);
        env.push(s, Namespace::Struct, as_tag);
        env.push(s, Namespace::Ordinary, as_object);

        assert_eq!(env.lookup(s, Namespace::Struct), Some(as_tag));
        assert_eq!(env.lookup(s, Namespace::Ordinary), Some(as_object));
    }

    #[test]
    fn pop_to_unwinds_many_levels_in_reverse() {
        let mut types = TypeArena::new();
        let mut decls = DeclArena::new();
        let mut interner = clef_base::Interner::new();
        let mut env = Environment::new();

        let x = interner.intern("x");
        let d0 = decl(&mut decls, &mut types);
        let d1 = decl(&mut decls, &mut types);
        let d2 = decl(&mut decls, &mut types);

        env.push(x, Namespace::Ordinary, d0);
        let mark = env.top();
        env.push(x, Namespace::Ordinary, d1);
        env.push(x, Namespace::Ordinary, d2);
        env.pop_to(mark);
        assert_eq!(env.lookup(x, Namespace::Ordinary), Some(d0));
    }
}
