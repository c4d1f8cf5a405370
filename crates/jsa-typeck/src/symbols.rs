//! Symbol table -- component B (spec.md §3, §4.B).
//!
//! Chained scopes with shadowing: lookup walks parents, insertion always
//! happens in the current scope. [`SymbolTable::child_scope`] is the one
//! constructor `Block`, `For`, and specialized function bodies all use, so
//! that lowering can later re-enter the very same scope inference built
//! (spec.md §4.H, SPEC_FULL.md §4.B addendum) instead of creating a new
//! one and losing the parameter-to-IR-value mapping.

use jsa_ast::{ItemId, ScopeId};
use rustc_hash::FxHashMap;

use crate::ty::TypeId;

/// How deep `lookup` will walk before giving up, guarding against an
/// accidental scope cycle (spec.md §4.B).
pub const MAX_SCOPE_DEPTH: usize = 100;

/// An opaque handle into a scope's declaring AST node, recorded on
/// namespace entries (spec.md §3: "Namespace entries store a back-
/// reference to an ImportDecl node"). A real pointer would tie the
/// symbol table's lifetime to the AST's; an `ItemId` does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclRef(pub ItemId);

#[derive(Debug, Clone)]
pub enum SymbolKind {
    /// A plain immutable/mutable binding with no declaring node recorded.
    Plain,
    /// A `var`/`const` declaration -- records the declaring node and,
    /// for arrays, the resolved size (0 if not an array or size unknown
    /// yet).
    Variable { decl: Option<ItemId>, array_size: u64 },
    /// A top-level or nested function declaration.
    Function { decl: ItemId },
    /// A function parameter; `index` is its position in the parameter list.
    Param { index: usize },
    /// A namespace entry -- the sole case where the declaring node is an
    /// `ImportDecl` (spec.md §4.B: "Namespace detection is entry != null
    /// && entry.node != null && entry.node.kind == ImportDecl").
    Namespace { import_decl: DeclRef },
}

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: String,
    pub ty: TypeId,
    pub is_const: bool,
    pub kind: SymbolKind,
}

impl SymbolEntry {
    /// Mirrors spec.md §4.B's detection rule structurally instead of by
    /// probing an AST node kind.
    pub fn is_namespace(&self) -> bool {
        matches!(self.kind, SymbolKind::Namespace { .. })
    }
}

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    /// Head-insertion: the most recently declared binding for a name
    /// shadows earlier ones and is searched first (spec.md §4.B).
    entries: Vec<SymbolEntry>,
}

/// Owns every scope created during one module's inference, indexed by
/// [`ScopeId`]. `Block::scope`/`ForStmt::scope` store the id; the table
/// itself lives in the module's `TypeContext`-adjacent state so lowering
/// can borrow it again without recreating scopes.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the root (program-level) scope. Must be called first.
    pub fn root_scope(&mut self) -> ScopeId {
        self.scopes.push(Scope::default());
        (self.scopes.len() - 1) as ScopeId
    }

    /// Creates a new scope chained to `parent`. The one constructor every
    /// block-introducing AST node uses (spec.md §4.B addendum).
    pub fn child_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope { parent: Some(parent), entries: Vec::new() });
        (self.scopes.len() - 1) as ScopeId
    }

    pub fn insert(&mut self, scope: ScopeId, name: impl Into<String>, ty: TypeId, is_const: bool) {
        self.insert_entry(scope, SymbolEntry { name: name.into(), ty, is_const, kind: SymbolKind::Plain });
    }

    pub fn insert_variable(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        ty: TypeId,
        is_const: bool,
        decl: Option<ItemId>,
        array_size: u64,
    ) {
        self.insert_entry(
            scope,
            SymbolEntry { name: name.into(), ty, is_const, kind: SymbolKind::Variable { decl, array_size } },
        );
    }

    pub fn insert_function(&mut self, scope: ScopeId, name: impl Into<String>, ty: TypeId, decl: ItemId) {
        self.insert_entry(scope, SymbolEntry { name: name.into(), ty, is_const: true, kind: SymbolKind::Function { decl } });
    }

    pub fn insert_param(&mut self, scope: ScopeId, name: impl Into<String>, ty: TypeId, index: usize) {
        self.insert_entry(scope, SymbolEntry { name: name.into(), ty, is_const: false, kind: SymbolKind::Param { index } });
    }

    /// The only case where `node.kind == ImportDecl` (spec.md §4.B).
    /// Namespaces have no `TypeInfo` of their own, so the caller passes in
    /// the module's interned `unknown` type to fill the slot every other
    /// entry uses for its real type.
    pub fn insert_namespace(&mut self, scope: ScopeId, name: impl Into<String>, import_decl: ItemId, unknown_ty: TypeId) {
        self.insert_entry(
            scope,
            SymbolEntry {
                name: name.into(),
                ty: unknown_ty,
                is_const: true,
                kind: SymbolKind::Namespace { import_decl: DeclRef(import_decl) },
            },
        );
    }

    fn insert_entry(&mut self, scope: ScopeId, entry: SymbolEntry) {
        self.scopes[scope as usize].entries.push(entry);
    }

    /// Walks parent scopes up to [`MAX_SCOPE_DEPTH`], returning the most
    /// recently inserted matching entry (shadowing).
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&SymbolEntry> {
        let mut current = Some(scope);
        let mut depth = 0;
        while let Some(id) = current {
            if depth >= MAX_SCOPE_DEPTH {
                return None;
            }
            let s = &self.scopes[id as usize];
            if let Some(entry) = s.entries.iter().rev().find(|e| e.name == name) {
                return Some(entry);
            }
            current = s.parent;
            depth += 1;
        }
        None
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&SymbolEntry> {
        self.scopes[scope as usize].entries.iter().rev().find(|e| e.name == name)
    }

    pub fn parent_of(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope as usize].parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_returns_the_most_recent_binding() {
        let mut table = SymbolTable::new();
        let root = table.root_scope();
        table.insert(root, "x", 0, false);
        table.insert(root, "x", 1, false);
        assert_eq!(table.lookup(root, "x").unwrap().ty, 1);
    }

    #[test]
    fn child_scope_sees_parent_bindings() {
        let mut table = SymbolTable::new();
        let root = table.root_scope();
        table.insert(root, "x", 7, false);
        let child = table.child_scope(root);
        assert_eq!(table.lookup(child, "x").unwrap().ty, 7);
        assert!(table.lookup_local(child, "x").is_none());
    }

    #[test]
    fn lookup_of_undefined_name_is_none() {
        let mut table = SymbolTable::new();
        let root = table.root_scope();
        assert!(table.lookup(root, "nope").is_none());
    }

    #[test]
    fn namespace_entries_are_tagged_by_kind_not_by_probing_a_node() {
        let mut table = SymbolTable::new();
        let root = table.root_scope();
        table.insert_namespace(root, "math", 3, 0);
        let entry = table.lookup(root, "math").unwrap();
        assert!(entry.is_namespace());
    }
}
