//! Pipeline orchestration
//!
//! Runs the passes in order: parse, resolve, lower, emit. Each pass
//! owns its own data; nothing is shared between compilations.

use op_syntax::Diagnostic;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Failure of a file-oriented compilation
#[derive(Debug, Error)]
pub enum CompileError {
    /// The source was read but did not compile
    #[error(transparent)]
    Diagnostic(#[from] Diagnostic),
    /// The source file could not be read
    #[error("{path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Compile Opal source text to C source text
pub fn compile_source(source: &str) -> Result<String, Diagnostic> {
    let statements = op_parser::parse_source(source)?;
    let module = op_resolve::resolve(statements)?;
    let program = op_lower::lower(&module);
    Ok(op_emit::emit(&program))
}

/// Read a source file and compile it to C source text
pub fn compile_file(path: impl AsRef<Path>) -> Result<String, CompileError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(compile_source(&source)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn source_compiles_to_a_full_translation_unit() {
        let output = compile_source(
            "data Point {\n    x: integer = 0\n    y: integer = 0\n}\n\n\
             func double(of n: integer) -> integer => n * 2\n\n\
             let origin: Point = {x: 1, y: 2}\n\
             print double(of: origin.x)\n",
        )
        .expect("program should compile");

        assert!(output.starts_with("#include \"opal-runtime.h\"\n#include \"opal-stdlib.h\"\n"));
        assert!(output.contains("struct __Point_data {"));
        assert!(output.contains("integer double__of(integer n)"));
        assert!(output.contains("__opal_alloc_rc(&__Point_info, __OPAL_ISOLATED)"));
        assert!(output.contains("__opal_make_box"));
        assert!(output.contains("int main(void) {"));
        assert!(output.contains("return 0;"));
    }

    #[test]
    fn diagnostics_pass_through_unchanged() {
        let error = compile_source("let x: integer = 2.0\n").unwrap_err();
        assert!(matches!(error, Diagnostic::TypeMismatch { .. }));
    }

    #[test]
    fn files_compile_from_disk() {
        let mut file = tempfile::Builder::new()
            .suffix(".opal")
            .tempfile()
            .expect("temp file");
        writeln!(file, "print 7").expect("write source");

        let output = compile_file(file.path()).expect("file should compile");
        assert!(output.contains("__opal_integer_box_info"));
    }

    #[test]
    fn missing_files_report_the_path() {
        let error = compile_file("no-such-file.opal").unwrap_err();
        let CompileError::Io { path, .. } = error else {
            panic!("expected an i/o failure");
        };
        assert_eq!(path, "no-such-file.opal");
    }
}
