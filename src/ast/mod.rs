//! Abstract syntax for Yuho modules: node types, the builder that folds the
//! concrete parse tree into them, and the visitor/transformer traversal
//! substrates shared by every analysis and transpiler.

pub mod builder;
pub mod literal;
pub mod nodes;
pub mod transformer;
pub mod visitor;

pub use builder::{build, AstBuilder};
pub use literal::{format_money, Currency, DurationValue};
pub use nodes::*;
pub use transformer::Transformer;
pub use visitor::Visitor;
