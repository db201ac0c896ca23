//! Yuho: a domain-specific language for encoding criminal statutes as
//! machine-readable, analyzable artifacts.
//!
//! The crate is the language's front-end and analysis pipeline:
//!
//! - `lexer` / `parser` - concrete syntax to a recoverable parse tree
//! - `ast` - typed immutable AST, builder, visitor and transformer
//! - `analysis` - scope resolution, type inference and checking, match
//!   exhaustiveness
//! - `formatter` - canonical source formatting
//! - `transpile` - lowering to English prose, Mermaid, Alloy, SMT-LIB,
//!   LaTeX, JSON/JSON-LD, GraphQL and a block-notation view
//! - `verify` - Alloy subprocess and optional in-process Z3 drivers
//! - `pipeline` - the parse-build-analyze orchestration used by callers

pub mod analysis;
pub mod ast;
pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod transpile;
pub mod verify;

pub use analysis::{Diagnostic, Severity};
pub use ast::nodes::ModuleNode;
pub use pipeline::{run, run_file, BoundaryError, PipelineResult};
pub use transpile::{transpile, TranspileTarget};
