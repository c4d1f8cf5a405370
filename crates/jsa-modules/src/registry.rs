//! The module loader -- component E (spec.md §4.E).
//!
//! Loads lazily, depth-first, single-threaded: a module begins loading,
//! recurses into each of its imports in source order, and only then is
//! marked loaded. `is_loading` is the sole cycle-detection mechanism
//! (spec.md §5) -- there is no separate scheduler or toposort.

use std::path::{Path, PathBuf};

use jsa_ast::{Item, ItemId, Program};
use jsa_common::{Code, Diagnostic, DiagnosticContext, Span};
use rustc_hash::FxHashMap;

use crate::builtin_io::io_module_program;
use crate::mangle::sanitize_prefix;

/// Identifies one loaded [`Module`] inside a [`ModuleRegistry`]. Stable for
/// the registry's lifetime; indexes directly into `ModuleRegistry::modules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(pub u32);

/// Parses module source text into an AST. Constructing this is the
/// lexer/parser's job (out of scope for this workspace, spec.md §1); the
/// driver supplies a real implementation and the registry only calls
/// through this seam.
pub trait SourceParser {
    fn parse(&self, source: &str, path: &Path) -> Result<Program, String>;
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not read module file `{path}`: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("module file `{path}` is not valid UTF-8")]
    NotUtf8 { path: PathBuf },
    #[error("failed to parse `{path}`: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("unknown built-in module `{0}` (only `@io` is defined)")]
    UnknownBuiltinModule(String),
}

/// One exported name and what it resolves to, as spec.md §4.E's mangling
/// scheme and §4.E's type-path resolution need them.
#[derive(Debug, Clone)]
pub enum Export {
    /// A top-level or static function, named by its mangled specialized
    /// name (bare name for externs, which are never mangled).
    Function { mangled_name: String },
    /// A struct or enum type, resolved in the exporting module's own
    /// `TypeContext` -- the caller must look it up there by name rather
    /// than copy the `TypeInfo`, per spec.md §9's "share by reference
    /// only" note (types are not shared across separate `TypeContext`
    /// arenas by `TypeId` value).
    Type,
}

/// Spec.md §3's `Module` record. `type_ctx`/`module_scope`/`traits` are
/// created empty here; `jsa-typeck::infer_program` fills them in once the
/// driver runs inference over this module (the registry's job stops at
/// producing a dependency-ordered, export-annotated AST).
pub struct Module {
    pub absolute_path: PathBuf,
    pub relative_path: PathBuf,
    pub prefix: String,
    pub source_text: String,
    pub ast: Program,
    pub exports: FxHashMap<String, Export>,
    pub dependencies: Vec<ModuleId>,
    pub is_loading: bool,
    pub is_parsed: bool,
}

/// Owns every [`Module`] loaded for one compilation (spec.md §4.E).
pub struct ModuleRegistry {
    root: PathBuf,
    parser: Box<dyn SourceParser>,
    modules: Vec<Module>,
    by_path: FxHashMap<PathBuf, ModuleId>,
    io_module: Option<ModuleId>,
}

impl ModuleRegistry {
    pub fn new(root: PathBuf, parser: Box<dyn SourceParser>) -> Self {
        Self { root, parser, modules: Vec::new(), by_path: FxHashMap::default(), io_module: None }
    }

    pub fn get(&self, id: ModuleId) -> &Module {
        &self.modules[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter().enumerate().map(|(i, m)| (ModuleId(i as u32), m))
    }

    /// The one entry point `jsac` calls (spec.md §4.E addendum). `path` is
    /// the entry file, project-root-relative or absolute.
    pub fn load_entry(&mut self, path: &str, diagnostics: &mut DiagnosticContext) -> Result<ModuleId, LoadError> {
        self.load(path, None, diagnostics)
    }

    /// `current` is the importing module, used to resolve `.`-relative
    /// paths and to record the dependency edge; `None` only for the entry
    /// module itself.
    pub fn load(&mut self, path: &str, current: Option<ModuleId>, diagnostics: &mut DiagnosticContext) -> Result<ModuleId, LoadError> {
        if let Some(builtin) = path.strip_prefix('@') {
            return self.load_builtin(builtin, current);
        }

        let absolute = self.resolve_fs_path(path, current);
        if let Some(&existing) = self.by_path.get(&absolute) {
            if self.modules[existing.0 as usize].is_loading {
                // spec.md §4.E: "a module with is_loading == true on
                // re-entry triggers a cyclic-import error"; the edge is
                // still recorded so the graph shape is preserved.
                diagnostics.push(Diagnostic::error(
                    Code::CyclicImport,
                    format!("cyclic import involving `{}`", self.modules[existing.0 as usize].relative_path.display()),
                    Span::synthetic(),
                ));
            }
            if let Some(current) = current {
                self.add_dependency(current, existing);
            }
            return Ok(existing);
        }

        tracing::debug!(path = %absolute.display(), "loading module");
        let source_text = std::fs::read(&absolute)
            .map_err(|source| LoadError::Io { path: absolute.clone(), source })
            .and_then(|bytes| String::from_utf8(bytes).map_err(|_| LoadError::NotUtf8 { path: absolute.clone() }))?;

        let relative_path = absolute.strip_prefix(&self.root).unwrap_or(&absolute).to_path_buf();
        let prefix = sanitize_prefix(&relative_path);
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(Module {
            absolute_path: absolute.clone(),
            relative_path,
            prefix,
            source_text: source_text.clone(),
            ast: Program::default(),
            exports: FxHashMap::default(),
            dependencies: Vec::new(),
            is_loading: true,
            is_parsed: false,
        });
        self.by_path.insert(absolute.clone(), id);
        if let Some(current) = current {
            self.add_dependency(current, id);
        }

        let mut program = self.parser.parse(&source_text, &absolute).map_err(|message| LoadError::Parse { path: absolute.clone(), message })?;
        program.assign_ids();
        self.finish_loading(id, program, diagnostics)?;
        Ok(id)
    }

    /// `@io` is a fixed single-entry table (spec.md §4.E addendum); it is
    /// parsed from a synthetic [`Program`] exactly once and shared by every
    /// importer, same as any other module (spec.md §8 property 5).
    fn load_builtin(&mut self, name: &str, current: Option<ModuleId>) -> Result<ModuleId, LoadError> {
        if name != "io" {
            return Err(LoadError::UnknownBuiltinModule(name.to_string()));
        }
        if let Some(id) = self.io_module {
            if let Some(current) = current {
                self.add_dependency(current, id);
            }
            return Ok(id);
        }

        let mut program = io_module_program();
        program.assign_ids();
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(Module {
            absolute_path: PathBuf::from("@io"),
            relative_path: PathBuf::from("@io"),
            prefix: "io".to_string(),
            source_text: String::new(),
            ast: Program::default(),
            exports: FxHashMap::default(),
            dependencies: Vec::new(),
            is_loading: true,
            is_parsed: false,
        });
        let mut diagnostics = DiagnosticContext::new();
        self.finish_loading(id, std::mem::take(&mut program), &mut diagnostics)?;
        debug_assert!(diagnostics.is_empty(), "the synthetic @io module must never itself raise a diagnostic");
        self.io_module = Some(id);
        if let Some(current) = current {
            self.add_dependency(current, id);
        }
        Ok(id)
    }

    /// Collects exports, recurses into every `import`, then marks the
    /// module loaded. Shared by real files and the synthetic `@io` module.
    fn finish_loading(&mut self, id: ModuleId, mut program: Program, diagnostics: &mut DiagnosticContext) -> Result<(), LoadError> {
        let prefix = self.modules[id.0 as usize].prefix.clone();
        let exports = collect_exports(&program, &prefix);

        let imports: Vec<(ItemId, String)> =
            program.items.iter().filter_map(|i| if let Item::Import(d) = i { Some((d.id, d.path.clone())) } else { None }).collect();

        for (import_id, import_path) in imports {
            let target = self.load(&import_path, Some(id), diagnostics)?;
            if let Some(Item::Import(decl)) = program.items.iter_mut().find(|i| matches!(i, Item::Import(d) if d.id == import_id)) {
                decl.imported_module = Some(target.0);
            }
        }

        let module = &mut self.modules[id.0 as usize];
        module.ast = program;
        module.exports = exports;
        module.is_loading = false;
        module.is_parsed = true;
        Ok(())
    }

    fn add_dependency(&mut self, from: ModuleId, to: ModuleId) {
        let deps = &mut self.modules[from.0 as usize].dependencies;
        if from != to && !deps.contains(&to) {
            deps.push(to);
        }
    }

    /// `.`-prefixed paths resolve against the importing module's directory;
    /// anything else resolves against the project root (spec.md §4.E).
    fn resolve_fs_path(&self, path: &str, current: Option<ModuleId>) -> PathBuf {
        let base = if path.starts_with('.') {
            match current {
                Some(id) => self.modules[id.0 as usize].absolute_path.parent().map(PathBuf::from).unwrap_or_else(|| self.root.clone()),
                None => self.root.clone(),
            }
        } else {
            self.root.clone()
        };
        let mut candidate = base.join(path);
        if candidate.extension().is_none() {
            candidate.set_extension("jsa");
        }
        candidate
    }
}

fn collect_exports(program: &Program, prefix: &str) -> FxHashMap<String, Export> {
    let mut exports = FxHashMap::default();
    for item in &program.items {
        if !item.is_export() {
            continue;
        }
        match item {
            Item::Function(f) => {
                let mangled = if f.is_extern { f.name.clone() } else { format!("{prefix}__{}", f.name) };
                exports.insert(f.name.clone(), Export::Function { mangled_name: mangled });
            }
            Item::Struct(_) | Item::Enum(_) => {
                exports.insert(item.name().to_string(), Export::Type);
            }
            Item::Const(_) | Item::Var(_) => {
                // Exported data symbols keep their bare name -- spec.md
                // §4.E's mangling rule is phrased in terms of functions;
                // globals are not call targets so there is no specialized
                // name to pick between.
                exports.insert(item.name().to_string(), Export::Function { mangled_name: item.name().to_string() });
            }
            Item::Import(_) => {}
        }
    }
    exports
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsa_ast::{FunctionDecl, Param};

    struct StubParser {
        programs: FxHashMap<PathBuf, Program>,
    }

    impl SourceParser for StubParser {
        fn parse(&self, _source: &str, path: &Path) -> Result<Program, String> {
            self.programs.get(path).cloned().ok_or_else(|| format!("no fixture for {}", path.display()))
        }
    }

    fn function(name: &str, is_export: bool) -> Item {
        Item::Function(FunctionDecl {
            id: 0,
            name: name.to_string(),
            params: vec![Param { name: "x".into(), type_hint: None, span: Span::synthetic() }],
            return_type: None,
            body: Some(jsa_ast::Block::new(vec![], Span::synthetic())),
            is_variadic: false,
            is_export,
            is_extern: false,
            span: Span::synthetic(),
        })
    }

    #[test]
    fn shared_import_is_parsed_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        std::fs::write(root.join("main.jsa"), "").unwrap();
        std::fs::write(root.join("a.jsa"), "").unwrap();
        std::fs::write(root.join("b.jsa"), "").unwrap();
        std::fs::write(root.join("shared.jsa"), "").unwrap();

        let mut programs = FxHashMap::default();
        programs.insert(
            root.join("main.jsa"),
            Program::new(vec![
                Item::Import(jsa_ast::ImportDecl { id: 0, binding_name: "a".into(), path: "./a".into(), imported_module: None, span: Span::synthetic() }),
                Item::Import(jsa_ast::ImportDecl { id: 0, binding_name: "b".into(), path: "./b".into(), imported_module: None, span: Span::synthetic() }),
            ]),
        );
        programs.insert(
            root.join("a.jsa"),
            Program::new(vec![Item::Import(jsa_ast::ImportDecl {
                id: 0,
                binding_name: "shared".into(),
                path: "./shared".into(),
                imported_module: None,
                span: Span::synthetic(),
            })]),
        );
        programs.insert(
            root.join("b.jsa"),
            Program::new(vec![Item::Import(jsa_ast::ImportDecl {
                id: 0,
                binding_name: "shared".into(),
                path: "./shared".into(),
                imported_module: None,
                span: Span::synthetic(),
            })]),
        );
        programs.insert(root.join("shared.jsa"), Program::new(vec![function("sq", true)]));

        let mut registry = ModuleRegistry::new(root, Box::new(StubParser { programs }));
        let mut diagnostics = DiagnosticContext::new();
        registry.load_entry("main.jsa", &mut diagnostics).unwrap();

        assert!(!diagnostics.has_errors());
        let shared_count = registry.iter().filter(|(_, m)| m.relative_path == Path::new("shared.jsa")).count();
        assert_eq!(shared_count, 1);
    }

    #[test]
    fn cyclic_import_is_reported_without_looping_forever() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        std::fs::write(root.join("main.jsa"), "").unwrap();
        std::fs::write(root.join("a.jsa"), "").unwrap();
        std::fs::write(root.join("b.jsa"), "").unwrap();

        let mut programs = FxHashMap::default();
        programs.insert(
            root.join("main.jsa"),
            Program::new(vec![Item::Import(jsa_ast::ImportDecl {
                id: 0,
                binding_name: "a".into(),
                path: "./a".into(),
                imported_module: None,
                span: Span::synthetic(),
            })]),
        );
        programs.insert(
            root.join("a.jsa"),
            Program::new(vec![Item::Import(jsa_ast::ImportDecl {
                id: 0,
                binding_name: "b".into(),
                path: "./b".into(),
                imported_module: None,
                span: Span::synthetic(),
            })]),
        );
        programs.insert(
            root.join("b.jsa"),
            Program::new(vec![Item::Import(jsa_ast::ImportDecl {
                id: 0,
                binding_name: "a".into(),
                path: "./a".into(),
                imported_module: None,
                span: Span::synthetic(),
            })]),
        );

        let mut registry = ModuleRegistry::new(root, Box::new(StubParser { programs }));
        let mut diagnostics = DiagnosticContext::new();
        registry.load_entry("main.jsa", &mut diagnostics).unwrap();
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.iter().filter(|d| d.code == Code::CyclicImport).count(), 1);
    }

    #[test]
    fn exported_function_is_mangled_by_module_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        std::fs::write(root.join("main.jsa"), "").unwrap();
        std::fs::write(root.join("math_lib.jsa"), "").unwrap();

        let mut programs = FxHashMap::default();
        programs.insert(
            root.join("main.jsa"),
            Program::new(vec![Item::Import(jsa_ast::ImportDecl {
                id: 0,
                binding_name: "math".into(),
                path: "./math_lib".into(),
                imported_module: None,
                span: Span::synthetic(),
            })]),
        );
        programs.insert(root.join("math_lib.jsa"), Program::new(vec![function("add", true)]));

        let mut registry = ModuleRegistry::new(root, Box::new(StubParser { programs }));
        let mut diagnostics = DiagnosticContext::new();
        let main_id = registry.load_entry("main.jsa", &mut diagnostics).unwrap();
        let math_id = registry.get(main_id).dependencies[0];
        match registry.get(math_id).exports.get("add").unwrap() {
            Export::Function { mangled_name } => assert_eq!(mangled_name, "math_lib__add"),
            Export::Type => panic!("expected a function export"),
        }
    }

    #[test]
    fn extern_function_exports_keep_their_bare_name() {
        let mut decl = match function("read_line", true) {
            Item::Function(f) => f,
            _ => unreachable!(),
        };
        decl.is_extern = true;
        let exports = collect_exports(&Program::new(vec![Item::Function(decl)]), "prefix");
        match exports.get("read_line").unwrap() {
            Export::Function { mangled_name } => pretty_assertions::assert_eq!(mangled_name, "read_line"),
            Export::Type => panic!("expected a function export"),
        }
    }

    #[test]
    fn exported_struct_is_a_type_export() {
        let point = Item::Struct(jsa_ast::StructDecl {
            id: 0,
            name: "Point".to_string(),
            fields: vec![],
            methods: vec![],
            is_export: true,
            span: Span::synthetic(),
        });
        let exports = collect_exports(&Program::new(vec![point]), "prefix");
        insta::assert_debug_snapshot!(exports.get("Point"), @r###"
        Some(
            Type,
        )
        "###);
    }
}
