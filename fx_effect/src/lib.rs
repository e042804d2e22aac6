//! HFX: the shader-effect language front-end and compiler.
//!
//! One compile owns its lexer, parser, arenas and code generator; nothing
//! is shared across invocations and everything runs synchronously. The
//! pipeline is source text → [`parser::Parser`] → [`ast::Shader`] →
//! [`codegen::CodeGenerator`] → per-stage sources, a binary effect
//! container and a host constants module. [`file::EffectFile`] is the read
//! side of the container.

pub mod ast;
pub mod codegen;
pub mod file;
pub mod parser;

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use fx_lexer::{Lexer, TokenKind};
use thiserror::Error;

pub use ast::Shader;
pub use codegen::CodeGenerator;
pub use file::EffectFile;
pub use parser::Parser;

/// Seed for the source hash stored in the binary header magic.
pub const SOURCE_HASH_SEED: u64 = 0xfeba_666d_dea2_1a46;

#[derive(Debug, Error)]
pub enum EffectError {
    #[error("unexpected {actual:?}, expected {expected:?} at line {line}")]
    UnexpectedToken {
        expected: TokenKind,
        actual: TokenKind,
        line: u32,
    },
    #[error("unknown identifier `{name}` at line {line}")]
    UnknownIdentifier { name: String, line: u32 },
    #[error("include not found: {path}")]
    IncludeNotFound { path: PathBuf },
    #[error("failed to write {path}: {source}")]
    BinaryWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed effect file: {0}")]
    MalformedEffectFile(String),
}

/// Compiles `input` into a binary effect container named `out_filename`
/// plus the host constants module, both under `out_dir`.
///
/// Parse drift does not abort: the first mismatch is logged with its line
/// and the affected declarations are dropped. Missing `#pragma include`
/// files log and continue with empty content. Failing to open an output
/// file aborts with [`EffectError::BinaryWriteFailed`].
pub fn compile_hfx(input: &Path, out_dir: &Path, out_filename: &str) -> Result<(), EffectError> {
    let (shader, numbers, magic) = parse_file(input)?;

    let generator = codegen::CodeGenerator::new(&shader, &numbers, input_dir(input), magic);
    generator.compile_effect(out_dir, out_filename)?;
    generator.generate_host_module(out_dir)?;

    Ok(())
}

/// Emits one source file per shader stage of every pass of `input`.
pub fn generate_hfx_permutations(input: &Path, out_dir: &Path) -> Result<(), EffectError> {
    let (shader, numbers, magic) = parse_file(input)?;

    let generator = codegen::CodeGenerator::new(&shader, &numbers, input_dir(input), magic);
    generator.generate_permutations(out_dir)
}

fn input_dir(input: &Path) -> &Path {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn parse_file(
    input: &Path,
) -> Result<(Shader, fx_lexer::NumberBuffer, [u8; 32]), EffectError> {
    let text = std::fs::read_to_string(input).map_err(|_| EffectError::IncludeNotFound {
        path: input.to_owned(),
    })?;

    let magic = binary_magic(input, &text);

    let mut parser = Parser::new(Lexer::new(&text), input_dir(input));
    parser.generate_ast();

    if let Some(error) = parser.error() {
        tracing::warn!("{}: {error}", input.display());
    }

    let (shader, numbers) = parser.finish();
    Ok((shader, numbers, magic))
}

/// Staleness stamp stored in the container header: the source's last-write
/// time (nanoseconds since the Unix epoch, 16 bytes) followed by a seeded
/// 64-bit hash of the source text. The remaining bytes stay zero.
pub fn binary_magic(path: &Path, text: &str) -> [u8; 32] {
    let mut magic = [0u8; 32];

    let stamp: u128 = std::fs::metadata(path)
        .ok()
        .and_then(|metadata| metadata.modified().ok())
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_nanos())
        .unwrap_or(0);

    magic[..16].copy_from_slice(&stamp.to_le_bytes());
    magic[16..24].copy_from_slice(&hash_source(text, SOURCE_HASH_SEED).to_le_bytes());
    magic
}

/// FNV-1a over the source bytes, folded into a fixed seed so stamps are
/// comparable across runs.
pub fn hash_source(text: &str, seed: u64) -> u64 {
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = seed ^ 0xcbf2_9ce4_8422_2325;
    for &byte in text.as_bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::{hash_source, SOURCE_HASH_SEED};

    #[test]
    fn source_hash_is_stable_and_seeded() {
        let a = hash_source("shader s { }", SOURCE_HASH_SEED);
        let b = hash_source("shader s { }", SOURCE_HASH_SEED);
        let c = hash_source("shader t { }", SOURCE_HASH_SEED);
        let d = hash_source("shader s { }", 1);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }
}
