//! LaTeX legal-document generation, with optional PDF compilation.
//!
//! The preamble defines a small legal-document vocabulary: a `\statute`
//! macro, a `legaldefs` description environment, a gray `illustrationbox`
//! with an italic body, and an `\element` macro. Each statute becomes a
//! numbered section with a margin note, definitions, enumerated elements,
//! a three-column penalty table and illustration boxes.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use log::warn;

use crate::ast::format_money;
use crate::ast::nodes::*;

use super::{Emitter, TranspileTarget, Transpiler};

/// Timeout for one `pdflatex` pass.
const LATEX_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct LatexTranspiler {
    pub title: String,
    pub include_toc: bool,
}

impl Default for LatexTranspiler {
    fn default() -> Self {
        Self {
            title: "Statute Compilation".into(),
            include_toc: false,
        }
    }
}

impl Transpiler for LatexTranspiler {
    fn target(&self) -> TranspileTarget {
        TranspileTarget::Latex
    }

    fn transpile(&self, module: &ModuleNode) -> String {
        let mut out = Emitter::new();

        self.emit_preamble(&mut out);
        out.emit(r"\begin{document}");
        out.blank();
        out.emit(r"\maketitle");
        out.blank();

        if self.include_toc {
            out.emit(r"\tableofcontents");
            out.emit(r"\newpage");
            out.blank();
        }

        if !module.references.is_empty() || !module.imports.is_empty() {
            out.emit(r"\section*{References}");
            out.emit(r"\begin{itemize}");
            for import in &module.imports {
                out.emit(format!(r"  \item \texttt{{{}}}", tex_escape(&import.path)));
            }
            for referencing in &module.references {
                out.emit(format!(r"  \item {}", tex_escape(&referencing.path)));
            }
            out.emit(r"\end{itemize}");
            out.blank();
        }

        if !module.statutes.is_empty() {
            out.emit(r"\section*{Statutes}");
            out.blank();
            for statute in &module.statutes {
                self.render_statute(&mut out, statute);
                out.blank();
            }
        }

        out.emit(r"\end{document}");
        out.finish()
    }
}

impl LatexTranspiler {
    fn emit_preamble(&self, out: &mut Emitter) {
        out.emit(r"\documentclass[11pt,a4paper]{article}");
        out.emit(r"\usepackage[T1]{fontenc}");
        out.emit(r"\usepackage{lmodern}");
        out.emit(r"\usepackage[margin=2.5cm,marginparwidth=2cm]{geometry}");
        out.emit(r"\usepackage{marginnote}");
        out.emit(r"\usepackage{booktabs}");
        out.emit(r"\usepackage{enumitem}");
        out.emit(r"\usepackage[most]{tcolorbox}");
        out.blank();
        out.emit(r"% Legal document vocabulary");
        out.emit(r"\newcommand{\statute}[2]{\subsection*{Section #1: #2}}");
        out.emit(r"\newcommand{\element}[2]{\textbf{#1} #2}");
        out.emit(r"\newenvironment{legaldefs}");
        out.emit(r"  {\begin{description}[leftmargin=2em,style=nextline]}");
        out.emit(r"  {\end{description}}");
        out.emit(r"\newtcolorbox{illustrationbox}[1][]{");
        out.emit(r"  colback=gray!10, colframe=gray!40,");
        out.emit(r"  fontupper=\itshape, title=#1}");
        out.blank();
        out.emit(format!(r"\title{{{}}}", tex_escape(&self.title)));
        out.emit(r"\author{}");
        out.emit(r"\date{}");
        out.blank();
    }

    fn render_statute(&self, out: &mut Emitter, statute: &StatuteNode) {
        let title = statute
            .title
            .as_ref()
            .map(|t| t.value.clone())
            .unwrap_or_default();
        let section = tex_escape(&statute.section_number);

        out.emit(format!(r"\statute{{{section}}}{{{}}}", tex_escape(&title)));
        out.emit(format!(r"\marginnote{{S. {section}}}"));
        out.blank();

        if !statute.definitions.is_empty() {
            out.emit(r"\paragraph{Definitions}");
            out.emit(r"\begin{legaldefs}");
            for definition in &statute.definitions {
                out.emit(format!(
                    r"  \item[\textbf{{{}}}] {}",
                    tex_escape(&definition.term),
                    tex_escape(&definition.definition.value)
                ));
            }
            out.emit(r"\end{legaldefs}");
            out.blank();
        }

        if !statute.elements.is_empty() {
            out.emit(r"\paragraph{Elements of the Offence}");
            out.emit(r"\begin{enumerate}");
            for element in &statute.elements {
                let label = element.element_type.label();
                let description = element_text(element);
                out.emit(format!(
                    r"  \item \element{{{label}:}}{{ {} }}",
                    tex_escape(&description)
                ));
            }
            out.emit(r"\end{enumerate}");
            out.blank();
        }

        if let Some(penalty) = &statute.penalty {
            self.render_penalty(out, penalty);
            out.blank();
        }

        if !statute.illustrations.is_empty() {
            out.emit(r"\paragraph{Illustrations}");
            out.blank();
            for (i, illustration) in statute.illustrations.iter().enumerate() {
                let label = illustration
                    .label
                    .clone()
                    .unwrap_or_else(|| format!("({})", (b'a' + (i as u8 % 26)) as char));
                out.emit(format!(r"\begin{{illustrationbox}}[{}]", tex_escape(&label)));
                out.emit(format!("  {}", tex_escape(&illustration.description.value)));
                out.emit(r"\end{illustrationbox}");
            }
        }
    }

    fn render_penalty(&self, out: &mut Emitter, penalty: &PenaltyNode) {
        out.emit(r"\paragraph{Penalty}");
        out.emit(r"\begin{center}");
        out.emit(r"\begin{tabular}{@{}lll@{}}");
        out.emit(r"\toprule");
        out.emit(r"\textbf{Type} & \textbf{Minimum} & \textbf{Maximum} \\");
        out.emit(r"\midrule");

        if penalty.imprisonment_min.is_some() || penalty.imprisonment_max.is_some() {
            let min = penalty
                .imprisonment_min
                .as_ref()
                .map(|d| d.value.to_string())
                .unwrap_or_else(|| "---".into());
            let max = penalty
                .imprisonment_max
                .as_ref()
                .map(|d| d.value.to_string())
                .unwrap_or_else(|| "---".into());
            out.emit(format!(r"Imprisonment & {min} & {max} \\"));
        }
        if penalty.fine_min.is_some() || penalty.fine_max.is_some() {
            let min = penalty
                .fine_min
                .as_ref()
                .map(|m| tex_escape(&format_money(m.currency, &m.amount)))
                .unwrap_or_else(|| "---".into());
            let max = penalty
                .fine_max
                .as_ref()
                .map(|m| tex_escape(&format_money(m.currency, &m.amount)))
                .unwrap_or_else(|| "---".into());
            out.emit(format!(r"Fine & {min} & {max} \\"));
        }

        out.emit(r"\bottomrule");
        out.emit(r"\end{tabular}");
        out.emit(r"\end{center}");

        if let Some(supplementary) = &penalty.supplementary {
            out.emit(format!(
                r"\noindent\emph{{{}}}",
                tex_escape(&supplementary.value)
            ));
        }
    }
}

fn element_text(element: &ElementNode) -> String {
    match &element.description {
        Expression::Str(text) => format!("{}: {}", element.name, text.value),
        _ => element.name.clone(),
    }
}

/// Escape LaTeX special characters in user text.
fn tex_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str(r"\textbackslash{}"),
            '&' => escaped.push_str(r"\&"),
            '%' => escaped.push_str(r"\%"),
            '$' => escaped.push_str(r"\$"),
            '#' => escaped.push_str(r"\#"),
            '_' => escaped.push_str(r"\_"),
            '{' => escaped.push_str(r"\{"),
            '}' => escaped.push_str(r"\}"),
            '~' => escaped.push_str(r"\textasciitilde{}"),
            '^' => escaped.push_str(r"\textasciicircum{}"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Compile a `.tex` file to PDF with `pdflatex`, running two passes for
/// cross-references. Returns the PDF path, or `None` when the engine is
/// missing, fails, or exceeds the per-pass timeout.
pub fn compile_to_pdf(tex_path: &Path, output_dir: &Path) -> Option<PathBuf> {
    for pass in 1..=2 {
        let started = Instant::now();
        let mut child = Command::new("pdflatex")
            .arg("-interaction=nonstopmode")
            .arg("-output-directory")
            .arg(output_dir)
            .arg(tex_path)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| warn!("pdflatex not available: {e}"))
            .ok()?;

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if !status.success() {
                        warn!("pdflatex pass {pass} failed with {status}");
                        return None;
                    }
                    break;
                }
                Ok(None) => {
                    if started.elapsed() > LATEX_TIMEOUT {
                        let _ = child.kill();
                        warn!("pdflatex pass {pass} timed out");
                        return None;
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    warn!("failed waiting for pdflatex: {e}");
                    return None;
                }
            }
        }
    }

    let stem = tex_path.file_stem()?;
    let pdf = output_dir.join(stem).with_extension("pdf");
    pdf.exists().then_some(pdf)
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
        LatexTranspiler::default().transpile(&module)
    }

    #[test]
    fn test_preamble_macros() {
        let tex = render("");
        assert!(tex.contains(r"\documentclass[11pt,a4paper]{article}"));
        assert!(tex.contains(r"\newcommand{\statute}[2]"));
        assert!(tex.contains(r"\newenvironment{legaldefs}"));
        assert!(tex.contains(r"\newtcolorbox{illustrationbox}"));
        assert!(tex.contains(r"\newcommand{\element}[2]"));
    }

    #[test]
    fn test_statute_rendering() {
        let tex = render(
            r#"
statute "300" "Murder" {
    definitions { "intention" := "a settled aim"; }
    elements { mens_rea intent := "intends to cause death"; }
    penalty { imprisonment := 10 years; fine := $5,000; }
    illustrations { "A shoots Z."; }
}
"#,
        );

        assert!(tex.contains(r"\statute{300}{Murder}"));
        assert!(tex.contains(r"\marginnote{S. 300}"));
        assert!(tex.contains(r"\item[\textbf{intention}] a settled aim"));
        assert!(tex.contains(r"\textbf{Type} & \textbf{Minimum} & \textbf{Maximum} \\"));
        assert!(tex.contains(r"Imprisonment & --- & 10 years \\"));
        assert!(tex.contains(r"Fine & --- & US\$5,000.00 \\"));
        assert!(tex.contains(r"\begin{illustrationbox}[(a)]"));
        assert!(tex.contains("A shoots Z."));
    }

    #[test]
    fn test_escaping() {
        assert_eq!(tex_escape("50% of $100"), r"50\% of \$100");
        assert_eq!(tex_escape("a_b & c"), r"a\_b \& c");
    }

    #[test]
    fn test_missing_engine_returns_none() {
        // compile_to_pdf degrades to None rather than failing when the
        // input does not exist or pdflatex is unavailable.
        let dir = tempfile::tempdir().unwrap();
        let tex = dir.path().join("missing.tex");
        assert_eq!(compile_to_pdf(&tex, dir.path()), None);
    }
}
