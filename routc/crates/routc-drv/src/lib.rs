//! routc-drv - the compilation pipeline driver.
//!
//! Wires the stages together in their fixed order: lex → parse → analyze →
//! optimize → generate. Each stage's fatal error halts the pipeline before
//! the next stage runs; semantic warnings ride along in the result and
//! never halt anything.

use thiserror::Error;

use routc_gen::GenError;
use routc_par::{ParseError, Parser};
use routc_sem::SemanticError;
use routc_util::{Diagnostic, Handler};

/// Knobs for a single compilation.
#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// Run the AST optimizer between analysis and code generation.
    pub optimize: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { optimize: true }
    }
}

/// A finished compilation: the WAT text plus diagnostics worth reporting.
#[derive(Clone, Debug)]
pub struct CompiledModule {
    pub wat: String,
    /// Semantic warnings (unused variables), in source order.
    pub warnings: Vec<Diagnostic>,
    /// Rewrites the optimizer applied; 0 when it was skipped.
    pub rewrites: usize,
}

/// Any fatal failure from a pipeline stage.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DriverError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Gen(#[from] GenError),
}

/// Compiles Rout source text to a WAT module string.
pub fn compile_to_wat(
    source: &str,
    options: &CompileOptions,
) -> Result<CompiledModule, DriverError> {
    let tokens = routc_lex::tokenize(source);
    tracing::debug!(tokens = tokens.len(), "lexing complete");

    let program = Parser::new(tokens).parse_program()?;
    tracing::debug!(decls = program.decls.len(), "parsing complete");

    let handler = Handler::new();
    let symbols = routc_sem::analyze(&program, &handler)?;
    let warnings = handler.warnings();
    tracing::debug!(warnings = warnings.len(), "analysis complete");

    let (program, rewrites) = if options.optimize {
        routc_opt::optimize(program)
    } else {
        (program, 0)
    };
    tracing::debug!(rewrites, "optimization complete");

    let wat = routc_gen::generate(&program, &symbols)?;
    tracing::debug!(bytes = wat.len(), "code generation complete");

    Ok(CompiledModule {
        wat,
        warnings,
        rewrites,
    })
}

/// Renders the token stream, one token per line, for `--emit-tokens`.
pub fn render_tokens(source: &str) -> String {
    let mut out = String::new();
    for token in routc_lex::tokenize(source) {
        out.push_str(&format!(
            "{:>4}:{:<4} {}\n",
            token.span.line, token.span.column, token.kind
        ));
    }
    out
}

/// Parses and pretty-prints the tree for `--emit-ast`.
pub fn render_ast(source: &str) -> Result<String, ParseError> {
    let program = Parser::new(routc_lex::tokenize(source)).parse_program()?;
    Ok(format!("{program:#?}\n"))
}
