//! Specialization store -- component G (spec.md §3, §4.G).
//!
//! Call-site monomorphization, not Hindley-Milner unification: a generic
//! function's `TypeInfo::Function` entry owns a flat list of
//! [`FunctionSpecialization`]s, each keyed by the concrete argument types
//! it was instantiated with. Logically this is a per-function linked list
//! (spec.md §3); `Vec` is the faithful Rust rendition since nothing
//! outside `infer.rs`/`codegen` ever holds a reference into the middle of
//! the list across a reallocation.

use jsa_ast::Block;

use crate::ty::TypeId;

/// One concrete instantiation of a generic function.
#[derive(Debug, Clone)]
pub struct FunctionSpecialization {
    /// The `TypeId` of the owning `TypeInfo::Function` this specialization
    /// belongs to -- back-reference in index form (spec.md §3).
    pub owning_function_type: TypeId,
    pub param_types: Vec<TypeId>,
    pub return_type: TypeId,
    /// The mangled name codegen declares this specialization under, e.g.
    /// `max$i32_i32` (spec.md §4.G, §8 S2).
    pub specialized_name: String,
    /// Present once inference has produced a type-annotated clone of the
    /// generic body for this argument combination; `None` while the
    /// specialization is still pending discovery (Pass 2-4, spec.md §4.F).
    pub specialized_body: Option<Block>,
}

impl FunctionSpecialization {
    pub fn matches(&self, param_types: &[TypeId]) -> bool {
        self.param_types == param_types
    }
}

/// Appends a new pending specialization for `owning_function_type` and
/// returns its mangled name, or returns the existing one if an equal
/// argument tuple was already recorded (spec.md §4.G: lookups are
/// by-value on the argument-type tuple, never by identity of the call site).
pub fn add(
    specializations: &mut Vec<FunctionSpecialization>,
    owning_function_type: TypeId,
    base_name: &str,
    param_types: Vec<TypeId>,
    return_type: TypeId,
) -> String {
    if let Some(existing) = specializations.iter().find(|s| s.matches(&param_types)) {
        return existing.specialized_name.clone();
    }
    let specialized_name = mangle(base_name, &param_types, |id| id.to_string());
    specializations.push(FunctionSpecialization {
        owning_function_type,
        param_types,
        return_type,
        specialized_name: specialized_name.clone(),
        specialized_body: None,
    });
    specialized_name
}

/// Finds a previously recorded specialization whose argument-type tuple
/// matches exactly (spec.md §4.G).
pub fn find_by_name_and_args<'a>(
    specializations: &'a [FunctionSpecialization],
    param_types: &[TypeId],
) -> Option<&'a FunctionSpecialization> {
    specializations.iter().find(|s| s.matches(param_types))
}

pub fn find_by_name_and_args_mut<'a>(
    specializations: &'a mut [FunctionSpecialization],
    param_types: &[TypeId],
) -> Option<&'a mut FunctionSpecialization> {
    specializations.iter_mut().find(|s| s.param_types == param_types)
}

/// Builds the mangled specialization name `base$display1_display2...`
/// (spec.md §4.G, §8 S2's `max$i32_i32`). The caller supplies a
/// `TypeId -> String` renderer since this module doesn't hold a
/// `TypeContext` reference.
pub fn mangle(base_name: &str, param_types: &[TypeId], mut display: impl FnMut(TypeId) -> String) -> String {
    if param_types.is_empty() {
        return base_name.to_string();
    }
    let rendered: Vec<String> = param_types.iter().map(|&t| display(t)).collect();
    format!("{base_name}${}", rendered.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent_for_the_same_argument_tuple() {
        let mut specs = Vec::new();
        let a = add(&mut specs, 0, "max", vec![1, 1], 1);
        let b = add(&mut specs, 0, "max", vec![1, 1], 1);
        assert_eq!(a, b);
        assert_eq!(specs.len(), 1);
    }

    #[test]
    fn add_creates_distinct_entries_per_argument_tuple() {
        let mut specs = Vec::new();
        add(&mut specs, 0, "max", vec![1, 1], 1);
        add(&mut specs, 0, "max", vec![2, 2], 2);
        assert_eq!(specs.len(), 2);
    }

    #[test]
    fn mangled_name_uses_dollar_and_underscore_joins() {
        let name = mangle("max", &[10, 10], |id| match id {
            10 => "i32".to_string(),
            other => other.to_string(),
        });
        assert_eq!(name, "max$i32_i32");
    }

    #[test]
    fn find_by_name_and_args_locates_an_exact_match() {
        let mut specs = Vec::new();
        add(&mut specs, 0, "max", vec![1, 2], 3);
        assert!(find_by_name_and_args(&specs, &[1, 2]).is_some());
        assert!(find_by_name_and_args(&specs, &[2, 1]).is_none());
    }
}
