//! Scope arena and symbol table
//!
//! Lexical scopes form a tree rooted at the global scope. Scopes live in
//! an arena of records linked by parent index and are traversed with an
//! explicit stack of active scope ids, so arbitrarily deep nesting never
//! leans on host call depth. Exiting a scope pops it from the active
//! stack; its record stays in the arena (symbols keep a valid declaring
//! scope id) but its names become unreachable to every later lookup.

use std::collections::HashMap;

use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

use crate::types::Type;

/// Index of a scope record in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Kind of lexical scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The compilation unit scope. Created first, never popped.
    Global,
    /// A function body; parameters are declared directly here.
    Function,
    /// An `if`/`for`/bare-block body.
    Block,
}

/// Kind of symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
}

/// The binding of a declared name within one scope.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: DefaultSymbol,
    pub ty: Type,
    pub kind: SymbolKind,
    pub scope: ScopeId,
}

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    kind: ScopeKind,
    symbols: HashMap<DefaultSymbol, Symbol>,
}

/// Scope tree with an active-scope stack and interned identifier names.
#[derive(Debug)]
pub struct ScopeStack {
    interner: StringInterner<DefaultBackend>,
    arena: Vec<Scope>,
    active: Vec<ScopeId>,
}

impl ScopeStack {
    /// Create a stack holding only the global scope.
    pub fn new() -> Self {
        let mut stack = Self {
            interner: StringInterner::default(),
            arena: Vec::new(),
            active: Vec::new(),
        };
        let global = stack.alloc(None, ScopeKind::Global);
        stack.active.push(global);
        stack
    }

    fn alloc(&mut self, parent: Option<ScopeId>, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.arena.len());
        self.arena.push(Scope {
            parent,
            kind,
            symbols: HashMap::new(),
        });
        id
    }

    /// Push a new scope whose parent is the current top.
    pub fn enter(&mut self, kind: ScopeKind) -> ScopeId {
        debug_assert!(kind != ScopeKind::Global, "only one global scope exists");
        let id = self.alloc(Some(self.current()), kind);
        self.active.push(id);
        id
    }

    /// Pop the current scope, making its symbols unreachable.
    ///
    /// # Panics
    ///
    /// Panics if only the global scope is active; that is an analyzer bug,
    /// not a user-level diagnostic.
    pub fn exit(&mut self) {
        assert!(
            self.active.len() > 1,
            "attempted to exit the global scope"
        );
        self.active.pop();
    }

    /// Id of the current innermost scope.
    pub fn current(&self) -> ScopeId {
        *self.active.last().expect("global scope is always active")
    }

    pub fn kind_of(&self, id: ScopeId) -> ScopeKind {
        self.arena[id.0].kind
    }

    /// Insert a symbol into the current scope.
    ///
    /// Fails if `name` already exists in this exact scope; shadowing a name
    /// from an enclosing scope is legal and creates a new local binding.
    pub fn declare(&mut self, name: &str, ty: Type, kind: SymbolKind) -> Result<(), String> {
        let interned = self.interner.get_or_intern(name);
        let current = self.current();
        let scope = &mut self.arena[current.0];
        if scope.symbols.contains_key(&interned) {
            return Err(format!("'{name}' already declared in this scope"));
        }
        scope.symbols.insert(
            interned,
            Symbol {
                name: interned,
                ty,
                kind,
                scope: current,
            },
        );
        Ok(())
    }

    /// Resolve `name` against the current scope and each ancestor in order,
    /// returning the innermost binding.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        let interned = self.interner.get(name)?;
        let mut next = Some(self.current());
        while let Some(id) = next {
            let scope = &self.arena[id.0];
            if let Some(sym) = scope.symbols.get(&interned) {
                return Some(sym);
            }
            next = scope.parent;
        }
        None
    }

    /// Replace the recorded type of an existing binding in the current
    /// scope. Used for global names, which are registered before their
    /// initializers are typed; unknown names are ignored.
    pub fn set_ty(&mut self, name: &str, ty: Type) {
        let current = self.current();
        if let Some(interned) = self.interner.get(name) {
            if let Some(sym) = self.arena[current.0].symbols.get_mut(&interned) {
                sym.ty = ty;
            }
        }
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_walks_to_global() {
        let mut scopes = ScopeStack::new();
        scopes.declare("g", Type::Int, SymbolKind::Variable).unwrap();
        scopes.enter(ScopeKind::Function);
        scopes.enter(ScopeKind::Block);

        let sym = scopes.lookup("g").expect("global visible from inner block");
        assert_eq!(sym.ty, Type::Int);
        assert_eq!(scopes.kind_of(sym.scope), ScopeKind::Global);
    }

    #[test]
    fn shadowing_creates_a_new_binding() {
        let mut scopes = ScopeStack::new();
        scopes.declare("x", Type::Int, SymbolKind::Variable).unwrap();

        scopes.enter(ScopeKind::Block);
        scopes
            .declare("x", Type::String, SymbolKind::Variable)
            .expect("shadowing an enclosing scope is legal");
        assert_eq!(scopes.lookup("x").unwrap().ty, Type::String);

        scopes.exit();
        assert_eq!(
            scopes.lookup("x").unwrap().ty,
            Type::Int,
            "outer binding visible again after the shadowing scope exits"
        );
    }

    #[test]
    fn duplicate_in_same_scope_is_rejected() {
        let mut scopes = ScopeStack::new();
        scopes.declare("x", Type::Int, SymbolKind::Variable).unwrap();
        assert!(scopes.declare("x", Type::Int, SymbolKind::Variable).is_err());
    }

    #[test]
    fn set_ty_retypes_an_existing_binding() {
        let mut scopes = ScopeStack::new();
        scopes
            .declare("g", Type::Unknown, SymbolKind::Variable)
            .unwrap();
        scopes.set_ty("g", Type::Int);
        assert_eq!(scopes.lookup("g").unwrap().ty, Type::Int);

        // Unknown names are a no-op, not a panic.
        scopes.set_ty("missing", Type::Bool);
        assert!(scopes.lookup("missing").is_none());
    }

    #[test]
    fn exited_scope_symbols_are_unreachable() {
        let mut scopes = ScopeStack::new();
        scopes.enter(ScopeKind::Function);
        scopes.enter(ScopeKind::Block);
        scopes
            .declare("inner", Type::Bool, SymbolKind::Variable)
            .unwrap();
        scopes.exit();

        assert!(scopes.lookup("inner").is_none());

        // A sibling scope entered afterwards never sees it either.
        scopes.enter(ScopeKind::Block);
        assert!(scopes.lookup("inner").is_none());
    }

    #[test]
    #[should_panic(expected = "exit the global scope")]
    fn popping_global_is_a_bug() {
        let mut scopes = ScopeStack::new();
        scopes.exit();
    }
}
