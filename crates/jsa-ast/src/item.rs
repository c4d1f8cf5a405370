//! Top-level and struct-member declarations.
//!
//! Covers: `Program`, `ConstDecl`, `VarDecl`, `FunctionDecl`, `Param`,
//! `StructDecl`, `FieldDecl`, `EnumDecl`, `VariantDecl`, `ImportDecl`.

use jsa_common::Span;

use crate::expr::Expr;
use crate::stmt::Block;
use crate::ty_hint::TypeHint;

/// A stable id assigned to every declaration in a module (top-level items
/// and struct methods alike) by [`Program::assign_ids`]. `TypeInfo`'s
/// `decl_back_ref` fields (spec.md §3) store this instead of a raw
/// pointer into the tree, so the back-reference survives moving or
/// cloning the AST.
pub type ItemId = u32;

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub items: Vec<Item>,
}

impl Program {
    pub fn new(items: Vec<Item>) -> Self {
        let mut program = Self { items };
        program.assign_ids();
        program
    }

    /// Assigns a unique [`ItemId`] to every declaration reachable from the
    /// top level, including struct methods, in a single depth-first pass.
    /// Called once after parsing (or by test fixtures building an AST by
    /// hand); every later pass treats ids as already assigned.
    pub fn assign_ids(&mut self) {
        let mut next_id: ItemId = 0;
        for item in &mut self.items {
            match item {
                Item::Const(c) => {
                    c.id = next_id;
                    next_id += 1;
                }
                Item::Var(v) => {
                    v.id = next_id;
                    next_id += 1;
                }
                Item::Function(f) => {
                    f.id = next_id;
                    next_id += 1;
                }
                Item::Struct(s) => {
                    s.id = next_id;
                    next_id += 1;
                    for method in &mut s.methods {
                        method.id = next_id;
                        next_id += 1;
                    }
                }
                Item::Enum(e) => {
                    e.id = next_id;
                    next_id += 1;
                }
                Item::Import(i) => {
                    i.id = next_id;
                    next_id += 1;
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Item {
    Const(ConstDecl),
    Var(VarDecl),
    Function(FunctionDecl),
    Struct(StructDecl),
    Enum(EnumDecl),
    Import(ImportDecl),
}

impl Item {
    pub fn is_export(&self) -> bool {
        match self {
            Item::Const(d) => d.is_export,
            Item::Var(d) => d.is_export,
            Item::Function(d) => d.is_export,
            Item::Struct(d) => d.is_export,
            Item::Enum(d) => d.is_export,
            Item::Import(_) => false,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Item::Const(d) => &d.name,
            Item::Var(d) => &d.name,
            Item::Function(d) => &d.name,
            Item::Struct(d) => &d.name,
            Item::Enum(d) => &d.name,
            Item::Import(d) => &d.binding_name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstDecl {
    pub id: ItemId,
    pub name: String,
    /// A fixed-size annotation like `const A: i32[N]` (spec.md §4.F pass 0).
    pub array_size: Option<Expr>,
    pub type_hint: Option<TypeHint>,
    pub init: Expr,
    pub is_export: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub id: ItemId,
    pub name: String,
    pub type_hint: Option<TypeHint>,
    pub array_size: Option<Expr>,
    pub init: Option<Expr>,
    pub is_export: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_hint: Option<TypeHint>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub id: ItemId,
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeHint>,
    /// `None` for an `extern` declaration -- no body to lower, spec.md §3
    /// ("A spec with `specialized_body = null` denotes an external
    /// function").
    pub body: Option<Block>,
    pub is_variadic: bool,
    pub is_export: bool,
    pub is_extern: bool,
    pub span: Span,
}

impl FunctionDecl {
    /// "Fully typed" per spec.md glossary: every parameter and the return
    /// type were declared explicitly. Always true for externs.
    pub fn is_fully_typed(&self) -> bool {
        self.is_extern || (self.params.iter().all(|p| p.type_hint.is_some()) && self.return_type.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub type_hint: TypeHint,
    pub array_size: Option<Expr>,
    pub default: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub id: ItemId,
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FunctionDecl>,
    pub is_export: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct VariantDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub id: ItemId,
    pub name: String,
    pub variants: Vec<VariantDecl>,
    pub is_export: bool,
    pub span: Span,
}

impl EnumDecl {
    /// The variant's index is the authoritative discriminant (spec.md §3).
    pub fn variant_index(&self, name: &str) -> Option<usize> {
        self.variants.iter().position(|v| v.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub id: ItemId,
    /// The local namespace name bound by this import, e.g. `math` in
    /// `import math from "./math"`.
    pub binding_name: String,
    /// The raw path as written: `@io`, `./math`, or a project-root-relative
    /// path (spec.md §4.E).
    pub path: String,
    /// Set by the module loader once the target module is resolved.
    /// `None` means not-yet-loaded or a failed load.
    pub imported_module: Option<u32>,
    pub span: Span,
}
