//! routc-util - shared infrastructure for the Rout compiler.
//!
//! This crate holds the pieces every pipeline stage needs: source spans,
//! the diagnostic handler, and the global string interner. It has no
//! knowledge of tokens, trees, or WAT.

pub mod diagnostic;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, Handler, Level};
pub use span::Span;
pub use symbol::Symbol;
