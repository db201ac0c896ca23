//! GraphQL schema generation.
//!
//! Emits the legal-domain scalars and enums, the core object types
//! (Statute, Element, Penalty, Definition, Illustration), one object type
//! per user struct, and the Query/Mutation roots used by statute APIs.

use crate::ast::nodes::*;

use super::{Emitter, TranspileTarget, Transpiler};

#[derive(Debug, Default)]
pub struct GraphqlTranspiler {
    pub include_descriptions: bool,
}

impl Transpiler for GraphqlTranspiler {
    fn target(&self) -> TranspileTarget {
        TranspileTarget::Graphql
    }

    fn transpile(&self, module: &ModuleNode) -> String {
        let mut out = Emitter::new();

        self.emit_scalars(&mut out);
        self.emit_enums(&mut out);
        self.emit_core_types(&mut out);

        for struct_def in &module.type_defs {
            self.emit_struct(&mut out, struct_def);
            out.blank();
        }

        self.emit_query_root(&mut out);
        self.emit_mutation_root(&mut out);
        self.emit_input_types(&mut out);

        out.finish()
    }
}

impl GraphqlTranspiler {
    fn description(&self, out: &mut Emitter, text: &str) {
        if self.include_descriptions {
            out.emit(format!("\"\"\"{text}\"\"\""));
        }
    }

    fn emit_scalars(&self, out: &mut Emitter) {
        self.description(out, "Monetary amount with currency");
        out.emit("scalar Money");
        self.description(out, "Calendar duration in mixed units");
        out.emit("scalar Duration");
        self.description(out, "Percentage between 0 and 100");
        out.emit("scalar Percent");
        self.description(out, "ISO-8601 calendar date");
        out.emit("scalar Date");
        out.blank();
    }

    fn emit_enums(&self, out: &mut Emitter) {
        out.emit("enum Currency {");
        for code in ["SGD", "USD", "EUR", "GBP", "JPY", "INR", "AUD", "CAD", "CHF"] {
            out.emit(format!("  {code}"));
        }
        out.emit("}");
        out.blank();

        out.emit("enum ElementType {");
        out.emit("  ACTUS_REUS");
        out.emit("  MENS_REA");
        out.emit("  CIRCUMSTANCE");
        out.emit("}");
        out.blank();
    }

    fn emit_core_types(&self, out: &mut Emitter) {
        self.description(out, "A term defined within a statute");
        out.emit("type Definition {");
        out.emit("  term: String!");
        out.emit("  definition: String!");
        out.emit("}");
        out.blank();

        self.description(out, "An element of an offence");
        out.emit("type Element {");
        out.emit("  elementType: ElementType!");
        out.emit("  name: String!");
        out.emit("  description: String!");
        out.emit("}");
        out.blank();

        self.description(out, "Punishment bounds for an offence");
        out.emit("type Penalty {");
        out.emit("  imprisonmentMin: Duration");
        out.emit("  imprisonmentMax: Duration");
        out.emit("  fineMin: Money");
        out.emit("  fineMax: Money");
        out.emit("  supplementary: String");
        out.emit("}");
        out.blank();

        self.description(out, "A worked example attached to a statute");
        out.emit("type Illustration {");
        out.emit("  label: String");
        out.emit("  description: String!");
        out.emit("}");
        out.blank();

        self.description(out, "A numbered legal provision");
        out.emit("type Statute {");
        out.emit("  sectionNumber: String!");
        out.emit("  title: String");
        out.emit("  definitions: [Definition!]!");
        out.emit("  elements: [Element!]!");
        out.emit("  penalty: Penalty");
        out.emit("  illustrations: [Illustration!]!");
        out.emit("}");
        out.blank();
    }

    fn emit_struct(&self, out: &mut Emitter, struct_def: &StructDef) {
        if struct_def.is_enum() {
            out.emit(format!("enum {} {{", pascal_case(&struct_def.name)));
            for variant in struct_def.variants() {
                out.emit(format!("  {}", variant.to_uppercase()));
            }
            out.emit("}");
            return;
        }

        out.emit(format!("type {} {{", pascal_case(&struct_def.name)));
        for field in &struct_def.fields {
            let field_type = field
                .type_annotation
                .as_ref()
                .map(type_to_graphql)
                .unwrap_or_else(|| "String".into());
            out.emit(format!("  {}: {field_type}", camel_case(&field.name)));
        }
        out.emit("}");
    }

    fn emit_query_root(&self, out: &mut Emitter) {
        self.description(out, "Root query type for statute API");
        out.emit("type Query {");
        out.emit("  statute(sectionNumber: String!): Statute");
        out.emit("  statutes: [Statute!]!");
        out.emit("  statutesByElementType(elementType: ElementType!): [Statute!]!");
        out.emit("  searchStatutes(query: String!): [Statute!]!");
        out.emit("  allDefinitions: [Definition!]!");
        out.emit("}");
        out.blank();
    }

    fn emit_mutation_root(&self, out: &mut Emitter) {
        self.description(out, "Root mutation type for statute API");
        out.emit("type Mutation {");
        out.emit("  validateStatute(input: StatuteInput!): ValidationResult!");
        out.emit("}");
        out.blank();
    }

    fn emit_input_types(&self, out: &mut Emitter) {
        self.description(out, "Input type for statute validation");
        out.emit("input StatuteInput {");
        out.emit("  sectionNumber: String!");
        out.emit("  title: String");
        out.emit("  definitions: [DefinitionInput!]");
        out.emit("  elements: [ElementInput!]");
        out.emit("}");
        out.blank();

        out.emit("input DefinitionInput {");
        out.emit("  term: String!");
        out.emit("  definition: String!");
        out.emit("}");
        out.blank();

        out.emit("input ElementInput {");
        out.emit("  elementType: ElementType!");
        out.emit("  name: String!");
        out.emit("  description: String!");
        out.emit("}");
        out.blank();

        out.emit("type ValidationResult {");
        out.emit("  valid: Boolean!");
        out.emit("  errors: [ValidationError!]!");
        out.emit("}");
        out.blank();

        out.emit("type ValidationError {");
        out.emit("  message: String!");
        out.emit("  field: String");
        out.emit("}");
    }
}

fn type_to_graphql(type_node: &TypeNode) -> String {
    match type_node {
        TypeNode::Builtin(builtin) => match builtin.name.as_str() {
            "int" => "Int!".into(),
            "float" => "Float!".into(),
            "bool" => "Boolean!".into(),
            "string" => "String!".into(),
            "money" => "Money!".into(),
            "percent" => "Percent!".into(),
            "date" => "Date!".into(),
            "duration" => "Duration!".into(),
            _ => "String".into(),
        },
        TypeNode::Named(named) => format!("{}!", pascal_case(&named.name)),
        TypeNode::Optional(optional) => {
            let inner = type_to_graphql(&optional.inner);
            inner.trim_end_matches('!').to_string()
        }
        TypeNode::Array(array) => format!("[{}]!", type_to_graphql(&array.element_type)),
        TypeNode::Generic(generic) => format!("{}!", pascal_case(&generic.base)),
    }
}

fn pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn camel_case(name: &str) -> String {
    let pascal = pascal_case(name);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::parser::parse;

    fn render(source: &str) -> String {
        let result = parse(source, "<test>");
        assert!(result.is_valid(), "parse errors: {:?}", result.errors);
        let module = build(&result.tree, "<test>");
        GraphqlTranspiler::default().transpile(&module)
    }

    #[test]
    fn test_scalars_and_enums() {
        let schema = render("");
        assert!(schema.contains("scalar Money"));
        assert!(schema.contains("scalar Duration"));
        assert!(schema.contains("scalar Percent"));
        assert!(schema.contains("scalar Date"));
        assert!(schema.contains("enum Currency {"));
        assert!(schema.contains("enum ElementType {"));
        assert!(schema.contains("  ACTUS_REUS"));
    }

    #[test]
    fn test_core_types_and_roots() {
        let schema = render("");
        for fragment in [
            "type Statute {",
            "type Element {",
            "type Penalty {",
            "type Definition {",
            "type Illustration {",
            "statute(sectionNumber: String!): Statute",
            "statutesByElementType(elementType: ElementType!): [Statute!]!",
            "searchStatutes(query: String!): [Statute!]!",
            "allDefinitions: [Definition!]!",
            "validateStatute(input: StatuteInput!): ValidationResult!",
        ] {
            assert!(schema.contains(fragment), "missing {fragment}");
        }
    }

    #[test]
    fn test_user_struct_to_object_type() {
        let schema = render("struct case_file { case_name: string, damages: money }");
        assert!(schema.contains("type CaseFile {"));
        assert!(schema.contains("  caseName: String!"));
        assert!(schema.contains("  damages: Money!"));
    }

    #[test]
    fn test_enum_struct_to_graphql_enum() {
        let schema = render("struct Color { red, green, blue }");
        assert!(schema.contains("enum Color {"));
        assert!(schema.contains("  RED"));
    }
}
