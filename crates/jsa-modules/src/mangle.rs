//! Symbol mangling by module prefix (spec.md §4.E).

use std::path::Path;

/// Turns a module's relative path into its `module_prefix`: the `.jsa`
/// suffix is dropped, then `/`, `\`, `.`, `-` become `_`. `math/vector.jsa`
/// becomes `math_vector`, mangling an exported `add` to `math_vector__add`.
pub fn sanitize_prefix(relative_path: &Path) -> String {
    let stem = relative_path.with_extension("");
    stem.to_string_lossy().chars().map(|c| if matches!(c, '/' | '\\' | '.' | '-') { '_' } else { c }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn flat_name_mangles_unchanged() {
        assert_eq!(sanitize_prefix(&PathBuf::from("math_lib.jsa")), "math_lib");
    }

    #[test]
    fn nested_path_separators_become_underscores() {
        assert_eq!(sanitize_prefix(&PathBuf::from("math/linear-algebra.jsa")), "math_linear_algebra");
    }
}
