//! The lexer/parser seam.
//!
//! `jsa-ast`'s module doc is explicit that building a [`jsa_ast::Program`]
//! from source text is the parser's job and out of scope for this
//! workspace: no `jsa-lexer`/`jsa-parser` crate exists here for `jsac` to
//! link against. [`UnimplementedParser`] is the placeholder that stands in
//! for it, so [`jsa_modules::ModuleRegistry`] has a concrete
//! [`jsa_modules::SourceParser`] to hold -- a real deployment of this
//! driver swaps it for a crate that actually tokenizes and parses `.jsa`
//! source.

use std::path::Path;

use jsa_ast::Program;
use jsa_modules::SourceParser;

pub struct UnimplementedParser;

impl SourceParser for UnimplementedParser {
    fn parse(&self, _source: &str, path: &Path) -> Result<Program, String> {
        Err(format!(
            "no lexer/parser is linked into this build of jsac; cannot parse '{}' (out of scope for this workspace, see jsa-ast's module doc)",
            path.display()
        ))
    }
}
