//! Lexical scope construction and symbol resolution.
//!
//! Runs in two phases over a module: first all struct and function
//! signatures are defined in the module scope (so forward references work),
//! then a full traversal resolves every identifier, defining local symbols
//! as it descends. Errors accumulate; resolution never aborts.

use std::collections::HashMap;
use std::fmt::Display;

use crate::ast::nodes::*;

use super::diagnostics::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Function,
    Struct,
    Parameter,
    Field,
    EnumVariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    StructBody,
    FunctionBody,
    Block,
    StatuteBody,
    MatchArm,
}

/// Names that resolve without a declaration.
const RESERVED_NAMES: &[&str] = &["TRUE", "FALSE", "pass"];

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub type_name: Option<String>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<usize>,
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<usize>) -> Self {
        Self {
            kind,
            parent,
            symbols: HashMap::new(),
        }
    }

    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeError {
    pub message: String,
    pub severity: Severity,
    pub location: SourceLocation,
}

impl Display for ScopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}:{}:{})",
            self.message, self.location.file, self.location.line, self.location.col
        )
    }
}

impl std::error::Error for ScopeError {}

/// Output of scope analysis: the scope tree, resolved references keyed by
/// identifier node id, and the accumulated errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeAnalysisResult {
    pub scopes: Vec<Scope>,
    pub references: HashMap<NodeId, Symbol>,
    pub errors: Vec<ScopeError>,
}

impl ScopeAnalysisResult {
    pub fn is_valid(&self) -> bool {
        !self
            .errors
            .iter()
            .any(|e| e.severity == Severity::Error)
    }

    pub fn resolved(&self, node: NodeId) -> Option<&Symbol> {
        self.references.get(&node)
    }
}

pub struct ScopeAnalyzer {
    scopes: Vec<Scope>,
    stack: Vec<usize>,
    references: HashMap<NodeId, Symbol>,
    errors: Vec<ScopeError>,
}

impl Default for ScopeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeAnalyzer {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Module, None)],
            stack: vec![0],
            references: HashMap::new(),
            errors: vec![],
        }
    }

    pub fn analyze(mut self, module: &ModuleNode) -> ScopeAnalysisResult {
        // Phase one: module-level signatures, so forward references resolve.
        for struct_def in &module.type_defs {
            self.define(Symbol {
                name: struct_def.name.clone(),
                kind: SymbolKind::Struct,
                type_name: Some(struct_def.name.clone()),
                location: struct_def.location.clone(),
            });
        }
        for function_def in &module.function_defs {
            self.define(Symbol {
                name: function_def.name.clone(),
                kind: SymbolKind::Function,
                type_name: function_def
                    .return_type
                    .as_ref()
                    .map(|t| t.display_name()),
                location: function_def.location.clone(),
            });
        }
        for variable in &module.variables {
            self.define(Symbol {
                name: variable.name.clone(),
                kind: SymbolKind::Variable,
                type_name: Some(variable.type_annotation.display_name()),
                location: variable.location.clone(),
            });
        }

        // Phase two: full traversal.
        for struct_def in &module.type_defs {
            self.analyze_struct(struct_def);
        }
        for function_def in &module.function_defs {
            self.analyze_function(function_def);
        }
        for statute in &module.statutes {
            self.analyze_statute(statute);
        }
        for variable in &module.variables {
            // Already defined in phase one; only the initializer remains.
            if let Some(value) = &variable.value {
                self.analyze_expression(value);
            }
        }
        for assert in &module.assertions {
            self.analyze_expression(&assert.condition);
        }

        ScopeAnalysisResult {
            scopes: self.scopes,
            references: self.references,
            errors: self.errors,
        }
    }

    fn current(&self) -> usize {
        *self.stack.last().expect("scope stack is never empty")
    }

    fn push_scope(&mut self, kind: ScopeKind) {
        let parent = self.current();
        self.scopes.push(Scope::new(kind, Some(parent)));
        let index = self.scopes.len() - 1;
        self.stack.push(index);
    }

    fn pop_scope(&mut self) {
        self.stack.pop();
    }

    /// Define a symbol in the current scope; redeclaration is an error.
    fn define(&mut self, symbol: Symbol) {
        let index = self.current();
        let scope = &mut self.scopes[index];
        if let Some(previous) = scope.symbols.get(&symbol.name) {
            let message = format!(
                "Redeclaration of '{}' (previously declared at {}:{})",
                symbol.name, previous.location.line, previous.location.col
            );
            let location = symbol.location.clone();
            self.errors.push(ScopeError {
                message,
                severity: Severity::Error,
                location,
            });
            return;
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
    }

    /// Walk parent scopes for a name.
    fn lookup(&self, name: &str) -> Option<&Symbol> {
        let mut scope = Some(self.current());
        while let Some(index) = scope {
            if let Some(symbol) = self.scopes[index].lookup_local(name) {
                return Some(symbol);
            }
            scope = self.scopes[index].parent;
        }
        None
    }

    fn resolve_identifier(&mut self, identifier: &Identifier) {
        if RESERVED_NAMES.contains(&identifier.name.as_str()) {
            return;
        }
        match self.lookup(&identifier.name) {
            Some(symbol) => {
                let symbol = symbol.clone();
                self.references.insert(identifier.id, symbol);
            }
            None => self.errors.push(ScopeError {
                message: format!("Undeclared identifier '{}'", identifier.name),
                severity: Severity::Error,
                location: identifier.location.clone(),
            }),
        }
    }

    fn analyze_struct(&mut self, struct_def: &StructDef) {
        self.push_scope(ScopeKind::StructBody);
        for type_param in &struct_def.type_params {
            self.define(Symbol {
                name: type_param.clone(),
                kind: SymbolKind::Struct,
                type_name: None,
                location: struct_def.location.clone(),
            });
        }
        for field in &struct_def.fields {
            self.define(Symbol {
                name: field.name.clone(),
                kind: if field.type_annotation.is_some() {
                    SymbolKind::Field
                } else {
                    SymbolKind::EnumVariant
                },
                type_name: field.type_annotation.as_ref().map(|t| t.display_name()),
                location: field.location.clone(),
            });
        }
        self.pop_scope();
    }

    fn analyze_function(&mut self, function_def: &FunctionDef) {
        self.push_scope(ScopeKind::FunctionBody);
        for param in &function_def.params {
            self.define(Symbol {
                name: param.name.clone(),
                kind: SymbolKind::Parameter,
                type_name: Some(param.type_annotation.display_name()),
                location: param.location.clone(),
            });
        }
        self.analyze_block(&function_def.body);
        self.pop_scope();
    }

    fn analyze_statute(&mut self, statute: &StatuteNode) {
        self.push_scope(ScopeKind::StatuteBody);
        for element in &statute.elements {
            self.define(Symbol {
                name: element.name.clone(),
                kind: SymbolKind::Variable,
                type_name: None,
                location: element.location.clone(),
            });
        }
        for element in &statute.elements {
            self.analyze_expression(&element.description);
        }
        self.pop_scope();
    }

    fn analyze_block(&mut self, block: &Block) {
        self.push_scope(ScopeKind::Block);
        for statement in &block.statements {
            self.analyze_statement(statement);
        }
        self.pop_scope();
    }

    fn analyze_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VariableDecl(decl) => self.analyze_variable_decl(decl),
            Statement::Assignment(assignment) => {
                self.analyze_expression(&assignment.target);
                self.analyze_expression(&assignment.value);
            }
            Statement::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.analyze_expression(value);
                }
            }
            Statement::Pass(_) => {}
            Statement::Expression(stmt) => self.analyze_expression(&stmt.expression),
        }
    }

    fn analyze_variable_decl(&mut self, decl: &VariableDecl) {
        // The initializer is resolved before the name is in scope.
        if let Some(value) = &decl.value {
            self.analyze_expression(value);
        }
        self.define(Symbol {
            name: decl.name.clone(),
            kind: SymbolKind::Variable,
            type_name: Some(decl.type_annotation.display_name()),
            location: decl.location.clone(),
        });
    }

    fn analyze_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Identifier(identifier) => self.resolve_identifier(identifier),
            Expression::FieldAccess(access) => {
                // The field itself resolves against the base's type when
                // known; enum-variant access like `Color.red` must succeed,
                // so an unknown field is tolerated here.
                self.analyze_expression(&access.base);
            }
            Expression::IndexAccess(access) => {
                self.analyze_expression(&access.base);
                self.analyze_expression(&access.index);
            }
            Expression::Call(call) => {
                self.analyze_expression(&call.callee);
                for arg in &call.args {
                    self.analyze_expression(arg);
                }
            }
            Expression::Binary(binary) => {
                self.analyze_expression(&binary.left);
                self.analyze_expression(&binary.right);
            }
            Expression::Unary(unary) => self.analyze_expression(&unary.operand),
            Expression::Match(match_expr) => self.analyze_match(match_expr),
            Expression::StructLiteral(literal) => {
                for field in &literal.field_values {
                    self.analyze_expression(&field.value);
                }
            }
            _ => {}
        }
    }

    fn analyze_match(&mut self, match_expr: &MatchExpr) {
        if let Some(scrutinee) = &match_expr.scrutinee {
            self.analyze_expression(scrutinee);
        }

        for arm in &match_expr.arms {
            self.push_scope(ScopeKind::MatchArm);
            self.define_pattern_bindings(&arm.pattern);
            if let Some(guard) = &arm.guard {
                self.analyze_expression(guard);
            }
            self.analyze_expression(&arm.body);
            self.pop_scope();
        }
    }

    /// Binding patterns introduce variables visible in the arm's guard and
    /// body only.
    fn define_pattern_bindings(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Binding(binding) => self.define(Symbol {
                name: binding.name.clone(),
                kind: SymbolKind::Variable,
                type_name: None,
                location: binding.location.clone(),
            }),
            Pattern::Struct(struct_pattern) => {
                for field in &struct_pattern.fields {
                    if let Some(sub) = &field.pattern {
                        self.define_pattern_bindings(sub);
                    }
                }
            }
            Pattern::Wildcard(_) | Pattern::Literal(_) => {}
        }
    }
}

/// Run scope analysis over a module.
pub fn analyze(module: &ModuleNode) -> ScopeAnalysisResult {
    ScopeAnalyzer::new().analyze(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::parser::parse;

    fn analyze_source(source: &str) -> ScopeAnalysisResult {
        let result = parse(source, "<test>");
        assert!(result.is_valid(), "parse errors: {:?}", result.errors);
        analyze(&build(&result.tree, "<test>"))
    }

    #[test]
    fn test_undeclared_identifier() {
        let result = analyze_source("int y := x + 1;");

        assert_eq!(result.errors.len(), 1);
        let error = &result.errors[0];
        assert!(error.message.contains("Undeclared identifier 'x'"));
        assert_eq!(error.severity, Severity::Error);
        assert_eq!((error.location.line, error.location.col), (1, 10));
    }

    #[test]
    fn test_forward_function_reference() {
        let result = analyze_source(
            "fn f(x: int) -> int { return g(x); }\nfn g(x: int) -> int { return x; }",
        );
        assert!(result.is_valid(), "errors: {:?}", result.errors);
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        let result = analyze_source("fn f(x: int) -> int { int y := 1; int y := 2; return y; }");

        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("Redeclaration of 'y'"));
    }

    #[test]
    fn test_match_arm_binding_is_arm_local() {
        // `n` is bound in the first arm only; using it at top level fails.
        let result = analyze_source(
            "fn f(x: int) -> int { match x { case n if n > 0 => n, case _ => 0 } }",
        );
        assert!(result.is_valid(), "errors: {:?}", result.errors);

        let result =
            analyze_source("fn f(x: int) -> int { match x { case n => n, case _ => n } }");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("Undeclared identifier 'n'"));
    }

    #[test]
    fn test_enum_variant_access_is_tolerated() {
        let result = analyze_source(
            "struct Color { red, green, blue }\nfn f(c: Color) -> bool { return c == Color.red; }",
        );
        assert!(result.is_valid(), "errors: {:?}", result.errors);
    }

    #[test]
    fn test_reserved_names_resolve() {
        let result = analyze_source("bool b := TRUE;");
        assert!(result.is_valid(), "errors: {:?}", result.errors);
    }

    #[test]
    fn test_statute_elements_resolve_each_other() {
        let result = analyze_source(
            r#"
statute "378" "Theft" {
    elements {
        actus_reus taking := "takes property";
        mens_rea dishonesty := taking;
    }
}
"#,
        );
        assert!(result.is_valid(), "errors: {:?}", result.errors);
    }
}
