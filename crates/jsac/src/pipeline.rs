//! The build pipeline: module loading -> inference -> lowering -> linking
//! (spec.md §1, §5; the glossary's "Driver" entry in SPEC_FULL.md).
//!
//! Inference and lowering run once, over the entry module's own
//! `TypeContext`/`SymbolTable`/`TraitRegistry`. Before that run starts,
//! every function an imported module exports is registered into the same
//! `TypeContext` under its namespace-qualified name (`binding.function`),
//! using that module's own `Export` table for the link-level symbol --
//! this is what lets `infer_call`'s namespace branch dispatch `io.println`
//! the same way it dispatches a struct's own methods (see DESIGN.md).
//! A struct or enum type owned by an imported module is not copied in the
//! same way (spec.md §9 "share by reference, not copy" -- see DESIGN.md's
//! Open Question 1 note); only function exports are wired up here.

use std::path::{Path, PathBuf};

use inkwell::context::Context;
use inkwell::targets::FileType;

use jsa_ast::{FunctionDecl, Item};
use jsa_codegen::{link, CodeGen};
use jsa_common::DiagnosticContext;
use jsa_modules::{Export, ModuleId, ModuleRegistry};
use jsa_typeck::{infer_program, ImportedExport, SymbolTable, TraitRegistry, TypeContext};

use crate::config::Manifest;
use crate::parser::UnimplementedParser;

pub struct BuildOptions<'a> {
    pub opt_level: u8,
    pub emit_llvm: bool,
    pub output: Option<&'a Path>,
    pub target: Option<&'a str>,
    pub json_diagnostics: bool,
}

pub fn build(project_root: &Path, manifest: &Manifest, opts: BuildOptions) -> Result<(), String> {
    let mut diagnostics = DiagnosticContext::new();
    let mut registry = ModuleRegistry::new(project_root.to_path_buf(), Box::new(UnimplementedParser));

    let entry_id = registry.load_entry(&manifest.project.entry, &mut diagnostics).map_err(|e| e.to_string())?;

    for import_binding in io_import_bindings(&registry.get(entry_id).ast) {
        jsa_modules::builtin_io::validate_format_calls(&registry.get(entry_id).ast, &import_binding, &mut diagnostics);
    }

    if diagnostics.has_errors() {
        report(&diagnostics, &registry.get(entry_id).source_text, &manifest.project.entry, opts.json_diagnostics);
        return Err("compilation failed due to errors above".to_string());
    }

    let mut ty_ctx = TypeContext::new();
    let mut traits = TraitRegistry::new();
    let mut symbols = SymbolTable::new();

    let imports = collect_imported_functions(&registry, entry_id);
    let imported_exports: Vec<ImportedExport> =
        imports.iter().map(|(binding, func, link_name)| ImportedExport { binding_name: binding, func, link_name: link_name.clone() }).collect();

    let entry = registry.get_mut(entry_id);
    infer_program(&mut entry.ast, &mut ty_ctx, &mut traits, &mut symbols, &mut diagnostics, &imported_exports);

    if diagnostics.has_errors() {
        report(&diagnostics, &entry.source_text, &manifest.project.entry, opts.json_diagnostics);
        return Err("compilation failed due to errors above".to_string());
    }

    let context = Context::create();
    let mut codegen = CodeGen::new(&context, &manifest.project.name, &mut ty_ctx, &mut traits, &symbols, &entry.ast, &mut diagnostics)
        .map_err(|e| e.to_string())?;
    codegen.compile().map_err(|e| e.to_string())?;

    let output_path = opts.output.map(PathBuf::from).unwrap_or_else(|| project_root.join(&manifest.project.name));

    if opts.emit_llvm {
        let ll_path = output_path.with_extension("ll");
        codegen.module().print_to_file(&ll_path).map_err(|e| e.to_string())?;
        eprintln!("  LLVM IR: {}", ll_path.display());
    }

    let obj_path = output_path.with_extension("o");
    codegen.target_machine().write_to_file(codegen.module(), FileType::Object, &obj_path).map_err(|e| e.to_string())?;

    link::link(&obj_path, &output_path, None)?;
    eprintln!("  Compiled: {}", output_path.display());

    let _ = opts.target;
    let _ = opts.opt_level;
    Ok(())
}

/// Every function the entry module's imports export, paired with the
/// local binding name it should dispatch under and the link-level symbol
/// the exporting module registered it as (spec.md §4.E). Struct/enum
/// exports are skipped -- they are not call targets, and the cross-module
/// type-path resolution they would need is a separate, still-open gap
/// (DESIGN.md, Open Question 1).
fn collect_imported_functions(registry: &ModuleRegistry, entry_id: ModuleId) -> Vec<(String, FunctionDecl, String)> {
    let mut out = Vec::new();
    for item in &registry.get(entry_id).ast.items {
        let Item::Import(decl) = item else { continue };
        let Some(module_id) = decl.imported_module else { continue };
        let module = registry.get(ModuleId(module_id));
        for func in module.ast.items.iter().filter_map(|i| match i {
            Item::Function(f) if f.is_export => Some(f),
            _ => None,
        }) {
            let link_name = match module.exports.get(&func.name) {
                Some(Export::Function { mangled_name }) => mangled_name.clone(),
                _ => continue,
            };
            out.push((decl.binding_name.clone(), func.clone(), link_name));
        }
    }
    out
}

/// Every `import` binding whose path is `@io`, so their `Call` sites can
/// be format-validated (spec.md §4.E, §6).
fn io_import_bindings(program: &jsa_ast::Program) -> Vec<String> {
    program
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Import(decl) if decl.path == "@io" => Some(decl.binding_name.clone()),
            _ => None,
        })
        .collect()
}

fn report(diagnostics: &DiagnosticContext, source: &str, file_name: &str, json: bool) {
    if json {
        println!("{}", crate::diagnostics::render_json(diagnostics));
    } else {
        crate::diagnostics::render_text(diagnostics, source, file_name);
    }
}
