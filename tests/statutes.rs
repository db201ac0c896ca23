//! End-to-end tests over realistic Penal Code sections: the pipeline
//! accepts them cleanly and every back-end renders the expected artifacts.

use yuho::analysis::Severity;
use yuho::pipeline;
use yuho::transpile::{transpile, TranspileTarget};

const S415_CHEATING: &str = r#"
referencing "Penal Code 1871 s 415";

struct DeceptionKind { fraudulent, dishonest }

DeceptionKind kind := DeceptionKind.fraudulent;

statute "415" "Cheating" {
    definitions {
        "deceives" := "causes to believe what is false, or to disbelieve what is true";
        "property" := "movable or immovable property of any description";
    }
    elements {
        actus_reus deception := "deceives any person";
        actus_reus inducement := "induces the person deceived to deliver property";
        mens_rea intent := match kind {
            case fraudulent => TRUE,
            case dishonest => TRUE,
            case _ => FALSE
        };
    }
    penalty {
        imprisonment := 1 year to 3 years;
        fine := S$1,000 to S$10,000;
    }
    illustrations {
        a "A, by falsely pretending to be in the Civil Service, intentionally deceives Z. A cheats.";
        b "A, by putting a counterfeit mark on an article, deceives Z into buying it. A cheats.";
    }
}
"#;

const S463_FORGERY: &str = r#"
struct DocumentKind { public_document, private_document, electronic_record }

fn carries_enhanced_penalty(kind: DocumentKind) -> bool {
    return kind == DocumentKind.public_document;
}

statute "463" "Forgery" {
    elements {
        actus_reus making := "makes a false document or electronic record";
        mens_rea intent := "intends to cause damage or injury, or to support a claim";
        circumstance falsity := "the document or record is in fact false";
    }
    penalty {
        imprisonment := 4 years;
        fine := S$15,000;
    }
}
"#;

#[test]
fn cheating_statute_passes_the_pipeline() {
    let result = pipeline::run(S415_CHEATING, "s415_cheating.yh");
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);

    let statute = &result.module.statutes[0];
    assert_eq!(statute.section_number, "415");
    assert_eq!(statute.definitions.len(), 2);
    assert_eq!(statute.elements.len(), 3);
    assert_eq!(statute.illustrations.len(), 2);
    assert_eq!(statute.illustrations[0].label.as_deref(), Some("a"));
}

#[test]
fn forgery_statute_passes_the_pipeline() {
    let result = pipeline::run(S463_FORGERY, "s463_forgery.yh");
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);

    let module = &result.module;
    assert_eq!(module.function_defs.len(), 1);
    let penalty = module.statutes[0].penalty.as_ref().unwrap();
    assert_eq!(penalty.imprisonment_max.as_ref().unwrap().value.years, 4);
}

#[test]
fn english_rendering_reads_like_a_statute() {
    let result = pipeline::run(S415_CHEATING, "<test>");
    let text = transpile(&result.module, TranspileTarget::English);

    assert!(text.contains("SECTION 415: Cheating"));
    assert!(text.contains("\"deceives\" means causes to believe what is false"));
    assert!(text.contains("Elements of the offence:"));
    assert!(text.contains(
        "Shall be punished with imprisonment for a term of not less than 1 year and not more than 3 years, \
         or with a fine of not less than S$1,000.00 and not more than S$10,000.00, or with both."
    ));
    assert!(text.contains("a A, by falsely pretending"));
}

#[test]
fn alloy_model_pairs_runs_and_checks() {
    let result = pipeline::run(S415_CHEATING, "<test>");
    let model = transpile(&result.module, TranspileTarget::Alloy);

    assert!(model.contains("sig S415Offense {"));
    assert!(model.contains("deception: Bool,"));
    assert!(model.contains("inducement: Bool,"));
    assert!(model.contains("intent: Bool,"));
    assert!(model.contains("guilty: Bool"));
    assert!(model.contains(
        "o.guilty = True iff (o.deception = True and o.inducement = True and o.intent = True)"
    ));

    for command in [
        "run showS415Instance",
        "run showS415GuiltyScenario",
        "run showS415InnocentScenario",
        "check S415GuiltyImpliesElements for 5 but 4 Int",
        "check S415ElementsImplyGuilty for 5 but 4 Int",
        "check S415NoElementsNoGuilt for 5 but 4 Int",
    ] {
        assert!(model.contains(command), "missing command: {command}");
    }
}

#[test]
fn smtlib_model_tracks_conviction() {
    let result = pipeline::run(S463_FORGERY, "<test>");
    let text = transpile(&result.module, TranspileTarget::Z3);

    assert!(text.contains(
        "(assert (= s463_conviction (and s463_making s463_intent s463_falsity)))"
    ));
    assert!(text.contains("(assert (<= s463_imprisonment_days 1460))"));
    assert!(text.contains("(assert (<= s463_fine_cents 1500000))"));
}

#[test]
fn mermaid_chart_has_decision_flow() {
    let result = pipeline::run(S415_CHEATING, "<test>");
    let chart = transpile(&result.module, TranspileTarget::Mermaid);

    assert!(chart.starts_with("flowchart TD"));
    assert!(chart.contains("([Section 415])"));
    assert!(chart.contains("{{kind}}"));
    assert!(chart.contains("((*))"));
    assert!(chart.contains("Imprisonment up to 3 years"));
}

#[test]
fn latex_document_is_self_contained() {
    let result = pipeline::run(S415_CHEATING, "<test>");
    let tex = transpile(&result.module, TranspileTarget::Latex);

    assert!(tex.starts_with(r"\documentclass"));
    assert!(tex.contains(r"\statute{415}{Cheating}"));
    assert!(tex.contains(r"\begin{illustrationbox}[a]"));
    assert!(tex.trim_end().ends_with(r"\end{document}"));
}

#[test]
fn graphql_schema_covers_domain() {
    let result = pipeline::run(S463_FORGERY, "<test>");
    let schema = transpile(&result.module, TranspileTarget::Graphql);

    assert!(schema.contains("enum DocumentKind {"));
    assert!(schema.contains("type Statute {"));
    assert!(schema.contains("type Query {"));
    assert!(schema.contains("type Mutation {"));
}

#[test]
fn non_exhaustive_statute_match_is_reported() {
    let source = r#"
struct Mode { planned, spontaneous }
Mode m := Mode.planned;
statute "1" "Test" {
    elements {
        mens_rea planning := match m {
            case planned => TRUE
        };
    }
}
"#;
    let result = pipeline::run(source, "<test>");
    assert!(!result.success);

    let diagnostic = result
        .diagnostics
        .iter()
        .find(|d| d.node_type == "match_expression")
        .expect("exhaustiveness diagnostic");
    assert_eq!(
        diagnostic.missing_patterns,
        Some(vec!["spontaneous".to_string()])
    );
}

#[test]
fn undeclared_identifier_scenario() {
    let result = pipeline::run("int y := x + 1;", "<test>");
    assert!(!result.success);

    let errors: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("Undeclared identifier 'x'"));
    assert_eq!((errors[0].location.line, errors[0].location.col), (1, 10));
}
