//! Box-drawing view of statute structure, used for quick inspection in a
//! terminal.

use crate::ast::format_money;
use crate::ast::nodes::*;

use super::{Emitter, TranspileTarget, Transpiler};

const WIDTH: usize = 64;

#[derive(Debug, Default)]
pub struct BlocksTranspiler;

impl Transpiler for BlocksTranspiler {
    fn target(&self) -> TranspileTarget {
        TranspileTarget::Blocks
    }

    fn transpile(&self, module: &ModuleNode) -> String {
        let mut out = Emitter::new();

        for statute in &module.statutes {
            self.render_statute(&mut out, statute);
            out.blank();
        }

        for struct_def in &module.type_defs {
            self.render_struct(&mut out, struct_def);
            out.blank();
        }

        out.finish()
    }
}

impl BlocksTranspiler {
    fn render_statute(&self, out: &mut Emitter, statute: &StatuteNode) {
        let title = statute
            .title
            .as_ref()
            .map(|t| t.value.clone())
            .unwrap_or_default();

        top(out, &format!("Section {} {title}", statute.section_number));

        if !statute.definitions.is_empty() {
            section(out, "Definitions");
            for definition in &statute.definitions {
                line(out, &format!("{}: {}", definition.term, definition.definition.value));
            }
        }

        if !statute.elements.is_empty() {
            section(out, "Elements");
            for element in &statute.elements {
                let tag = match element.element_type {
                    ElementType::ActusReus => "AR",
                    ElementType::MensRea => "MR",
                    ElementType::Circumstance => "CI",
                };
                line(out, &format!("[{tag}] {}", element.name));
            }
        }

        if let Some(penalty) = &statute.penalty {
            section(out, "Penalty");
            if let Some(max) = &penalty.imprisonment_max {
                line(out, &format!("Imprisonment up to {}", max.value));
            }
            if let Some(max) = &penalty.fine_max {
                line(
                    out,
                    &format!("Fine up to {}", format_money(max.currency, &max.amount)),
                );
            }
            if penalty.imprisonment_max.is_none() && penalty.fine_max.is_none() {
                line(out, "Unspecified");
            }
        }

        if !statute.illustrations.is_empty() {
            section(out, "Illustrations");
            for (i, illustration) in statute.illustrations.iter().enumerate() {
                let label = illustration
                    .label
                    .clone()
                    .unwrap_or_else(|| format!("({})", (b'a' + (i as u8 % 26)) as char));
                line(out, &format!("{label} {}", illustration.description.value));
            }
        }

        bottom(out);
    }

    fn render_struct(&self, out: &mut Emitter, struct_def: &StructDef) {
        let kind = if struct_def.is_enum() { "enum" } else { "struct" };
        top(out, &format!("{kind} {}", struct_def.name));
        for field in &struct_def.fields {
            match &field.type_annotation {
                Some(type_node) => {
                    line(out, &format!("{}: {}", field.name, type_node.display_name()))
                }
                None => line(out, &format!("| {}", field.name)),
            }
        }
        bottom(out);
    }
}

fn clip(text: &str) -> String {
    if text.chars().count() > WIDTH - 6 {
        let mut clipped: String = text.chars().take(WIDTH - 7).collect();
        clipped.push('…');
        clipped
    } else {
        text.to_string()
    }
}

fn pad(used: usize) -> String {
    " ".repeat(WIDTH.saturating_sub(used))
}

fn top(out: &mut Emitter, title: &str) {
    let title = clip(title);
    out.emit(format!("┌{}┐", "─".repeat(WIDTH - 2)));
    out.emit(format!("│ {title}{}│", pad(3 + title.chars().count())));
    out.emit(format!("├{}┤", "─".repeat(WIDTH - 2)));
}

fn section(out: &mut Emitter, name: &str) {
    out.emit(format!("│ {name}{}│", pad(3 + name.chars().count())));
    out.emit(format!(
        "│ {}{}│",
        "┄".repeat(name.chars().count()),
        pad(3 + name.chars().count())
    ));
}

fn line(out: &mut Emitter, text: &str) {
    let text = clip(text);
    out.emit(format!("│   {text}{}│", pad(5 + text.chars().count())));
}

fn bottom(out: &mut Emitter) {
    out.emit(format!("└{}┘", "─".repeat(WIDTH - 2)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::parser::parse;

    #[test]
    fn test_statute_box() {
        let source = r#"
statute "378" "Theft" {
    elements {
        actus_reus taking := "moves property";
        mens_rea dishonesty := "intends to take dishonestly";
    }
    penalty { imprisonment := 3 years; }
}
"#;
        let result = parse(source, "<test>");
        let module = build(&result.tree, "<test>");
        let text = BlocksTranspiler::default().transpile(&module);

        assert!(text.contains("Section 378 Theft"));
        assert!(text.contains("[AR] taking"));
        assert!(text.contains("[MR] dishonesty"));
        assert!(text.contains("Imprisonment up to 3 years"));
        assert!(text.contains("┌"));
        assert!(text.contains("└"));

        // Every box line is exactly the configured width.
        for line in text.lines().filter(|l| l.starts_with('│')) {
            assert_eq!(line.chars().count(), WIDTH, "bad width: {line:?}");
        }
    }
}
