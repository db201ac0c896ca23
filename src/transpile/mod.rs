//! Lowering back-ends. Each transpiler is a pure function of the AST; the
//! [`transpile`] dispatcher is the single entry point used by the CLI.

pub mod alloy;
pub mod blocks;
pub mod english;
pub mod graphql;
pub mod json;
pub mod latex;
pub mod mermaid;
pub mod smtlib;

use std::fmt::Display;
use std::str::FromStr;

use crate::ast::nodes::ModuleNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranspileTarget {
    Json,
    JsonLd,
    English,
    Mermaid,
    Alloy,
    Z3,
    Latex,
    Graphql,
    Blocks,
}

impl TranspileTarget {
    pub fn all() -> &'static [TranspileTarget] {
        &[
            TranspileTarget::Json,
            TranspileTarget::JsonLd,
            TranspileTarget::English,
            TranspileTarget::Mermaid,
            TranspileTarget::Alloy,
            TranspileTarget::Z3,
            TranspileTarget::Latex,
            TranspileTarget::Graphql,
            TranspileTarget::Blocks,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TranspileTarget::Json => "json",
            TranspileTarget::JsonLd => "jsonld",
            TranspileTarget::English => "english",
            TranspileTarget::Mermaid => "mermaid",
            TranspileTarget::Alloy => "alloy",
            TranspileTarget::Z3 => "z3",
            TranspileTarget::Latex => "latex",
            TranspileTarget::Graphql => "graphql",
            TranspileTarget::Blocks => "blocks",
        }
    }
}

impl Display for TranspileTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TranspileTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(TranspileTarget::Json),
            "jsonld" | "json-ld" => Ok(TranspileTarget::JsonLd),
            "english" => Ok(TranspileTarget::English),
            "mermaid" => Ok(TranspileTarget::Mermaid),
            "alloy" => Ok(TranspileTarget::Alloy),
            "z3" | "smt" => Ok(TranspileTarget::Z3),
            "latex" | "tex" => Ok(TranspileTarget::Latex),
            "graphql" => Ok(TranspileTarget::Graphql),
            "blocks" => Ok(TranspileTarget::Blocks),
            other => Err(format!("unknown transpile target '{other}'")),
        }
    }
}

/// Common contract of all back-ends: borrow the module, emit text.
pub trait Transpiler {
    fn target(&self) -> TranspileTarget;
    fn transpile(&self, module: &ModuleNode) -> String;
}

/// Lower a module into the requested target artifact.
pub fn transpile(module: &ModuleNode, target: TranspileTarget) -> String {
    match target {
        TranspileTarget::Json => json::JsonTranspiler::default().transpile(module),
        TranspileTarget::JsonLd => json::JsonLdTranspiler::default().transpile(module),
        TranspileTarget::English => english::EnglishTranspiler::default().transpile(module),
        TranspileTarget::Mermaid => mermaid::MermaidTranspiler::default().transpile(module),
        TranspileTarget::Alloy => alloy::AlloyTranspiler::default().transpile(module),
        TranspileTarget::Z3 => smtlib::SmtLibTranspiler::default().transpile(module),
        TranspileTarget::Latex => latex::LatexTranspiler::default().transpile(module),
        TranspileTarget::Graphql => graphql::GraphqlTranspiler::default().transpile(module),
        TranspileTarget::Blocks => blocks::BlocksTranspiler::default().transpile(module),
    }
}

/// Line-oriented output buffer shared by the text back-ends.
#[derive(Debug, Default)]
pub(crate) struct Emitter {
    lines: Vec<String>,
    indent: usize,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if line.is_empty() {
            self.lines.push(String::new());
        } else {
            let indent = "  ".repeat(self.indent);
            self.lines.push(format!("{indent}{line}"));
        }
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_round_trip() {
        for target in TranspileTarget::all() {
            assert_eq!(target.name().parse::<TranspileTarget>(), Ok(*target));
        }
    }

    #[test]
    fn test_unknown_target() {
        assert!("cobol".parse::<TranspileTarget>().is_err());
    }
}
