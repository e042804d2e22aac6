//! HDF: a small data-description language compiled to host-language
//! records, enums and tagged command variants.

pub mod codegen;
pub mod parser;

use std::path::Path;

use fx_lexer::Lexer;
use thiserror::Error;

pub use codegen::CodeGenerator;
pub use parser::{Parser, PrimitiveKind, TypeEntry, TypeKind};

/// Upper bound on table entries for one compile, primitives included.
pub const MAX_TYPES: usize = 1024;

#[derive(Debug, Error)]
pub enum HdfError {
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: String,
        source: std::io::Error,
    },
}

/// Compiles one HDF source file into a Rust module.
///
/// Parse errors do not abort the pipeline: the first token mismatch is
/// logged with its line and the affected declaration is dropped, matching
/// the sticky-error policy of the lexer.
pub fn compile_hdf(input: &Path, output: &Path, generate_ui: bool) -> Result<(), HdfError> {
    let text = std::fs::read_to_string(input).map_err(|source| HdfError::ReadFailed {
        path: input.display().to_string(),
        source,
    })?;

    let mut parser = Parser::new(Lexer::new(&text), MAX_TYPES);
    parser.generate_ast();

    if parser.has_error() {
        tracing::warn!(
            "{}: unexpected token at line {}, declaration dropped",
            input.display(),
            parser.error_line()
        );
    }

    let code = CodeGenerator::new(generate_ui).generate(&parser);

    std::fs::write(output, code).map_err(|source| HdfError::WriteFailed {
        path: output.display().to_string(),
        source,
    })?;

    tracing::info!("{} -> {}", input.display(), output.display());
    Ok(())
}
