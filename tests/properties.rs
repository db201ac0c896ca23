//! Cross-cutting invariants of the pipeline: span containment, parser
//! robustness against truncation, JSON round trips, identity transforms,
//! and the exhaustiveness witness contract.

use yuho::analysis::{exhaustiveness, infer};
use yuho::formatter::format_source;
use yuho::ast::transformer::{self, Transformer};
use yuho::ast::{build, nodes::ModuleNode};
use yuho::parser::{parse, SyntaxNode};
use yuho::transpile::{transpile, TranspileTarget};

const STATUTE_SOURCE: &str = r#"
referencing "Penal Code 1871";

struct Intent { direct, oblique, negligent }

Intent kind := Intent.direct;

fn is_severe(days: int) -> bool {
    return days > 365;
}

statute "300" "Murder" {
    definitions {
        "culpable homicide" := "causing death by doing an act with the intention of causing death";
    }
    elements {
        actus_reus act := "causes the death of a person";
        mens_rea intention := match kind {
            case direct => TRUE,
            case oblique => TRUE,
            case _ => FALSE
        };
    }
    penalty {
        imprisonment := 10 years to 20 years;
        fine := S$5,000 to S$50,000;
        supplementary := "subject to the Criminal Procedure Code";
    }
    illustrations {
        a "A shoots Z with the intention of killing him. A commits murder.";
    }
}

statute "378" "Theft" {
    elements {
        actus_reus taking := "moves property out of another's possession";
        mens_rea dishonesty := "intends to take the property dishonestly";
    }
    penalty {
        imprisonment := 3 years;
    }
}
"#;

fn parsed_module(source: &str) -> ModuleNode {
    let result = parse(source, "<test>");
    assert!(result.is_valid(), "parse errors: {:?}", result.errors);
    build(&result.tree, "<test>")
}

#[test]
fn parse_tree_covers_whole_input() {
    for source in ["", "int x := 1;", STATUTE_SOURCE] {
        let result = parse(source, "<test>");
        assert_eq!(result.tree.span.start_byte, 0);
        assert_eq!(result.tree.span.end_byte, source.len());
    }
}

#[test]
fn child_spans_are_contained_in_parents() {
    fn check(node: &SyntaxNode) {
        for child in node.child_nodes() {
            assert!(
                child.span.start_byte >= node.span.start_byte
                    && child.span.end_byte <= node.span.end_byte,
                "child {:?} escapes parent {:?}",
                child.kind,
                node.kind
            );
            check(child);
        }
    }
    check(&parse(STATUTE_SOURCE, "<test>").tree);
}

#[test]
fn truncated_source_never_panics() {
    for offset in 0..=STATUTE_SOURCE.len() {
        if !STATUTE_SOURCE.is_char_boundary(offset) {
            continue;
        }
        let truncated = &STATUTE_SOURCE[..offset];
        let result = parse(truncated, "<test>");
        // Either it still parses (at a declaration boundary) or it reports
        // at least one error; it must never panic.
        let _ = build(&result.tree, "<test>");
        if offset == STATUTE_SOURCE.len() {
            assert!(result.is_valid());
        }
    }

    // A cut in the middle of a statute must surface an error.
    let cut = &STATUTE_SOURCE[..STATUTE_SOURCE.find("mens_rea").unwrap() + 4];
    assert!(!parse(cut, "<test>").errors.is_empty());
}

#[test]
fn empty_and_trivial_sources_yield_empty_modules() {
    for source in ["", "   \n  \t", "// nothing here\n// at all\n"] {
        let result = parse(source, "<test>");
        assert!(result.is_valid());
        let module = build(&result.tree, "<test>");
        assert!(module.statutes.is_empty());
        assert!(module.type_defs.is_empty());
        assert!(module.function_defs.is_empty());
    }
}

#[test]
fn identity_transform_is_structural_identity() {
    struct Identity;
    impl Transformer for Identity {}

    let module = parsed_module(STATUTE_SOURCE);
    assert_eq!(transformer::apply(&mut Identity, &module), module);
}

#[test]
fn json_round_trip_preserves_structure() {
    let module = parsed_module(STATUTE_SOURCE);
    let text = transpile(&module, TranspileTarget::Json);
    let value: serde_json::Value = serde_json::from_str(&text).expect("valid JSON");

    let statutes = value["statutes"].as_array().unwrap();
    assert_eq!(statutes.len(), module.statutes.len());

    let sections: Vec<&str> = statutes
        .iter()
        .map(|s| s["section_number"].as_str().unwrap())
        .collect();
    let expected: Vec<&str> = module
        .statutes
        .iter()
        .map(|s| s.section_number.as_str())
        .collect();
    assert_eq!(sections, expected);

    for (value, statute) in statutes.iter().zip(&module.statutes) {
        let names: Vec<&str> = value["elements"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        let expected: Vec<&str> = statute.elements.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, expected);
    }
}

#[test]
fn json_emission_is_deterministic() {
    let module = parsed_module(STATUTE_SOURCE);
    let first = transpile(&module, TranspileTarget::Json);
    let second = transpile(&module, TranspileTarget::Json);
    assert_eq!(first, second);
}

#[test]
fn every_transpile_target_produces_output() {
    let module = parsed_module(STATUTE_SOURCE);
    for target in TranspileTarget::all() {
        let artifact = transpile(&module, *target);
        assert!(!artifact.trim().is_empty(), "{target} produced nothing");
    }
}

#[test]
fn witness_completes_the_match() {
    // A match missing `blue` becomes exhaustive once the witness is added
    // as a new arm with body `pass`.
    let incomplete = "struct Color { red, green, blue }\n\
                      fn f(c: Color) -> int { match c { case red => 1, case green => 2 } }";
    let module = parsed_module(incomplete);
    let info = infer::infer(&module);
    let (results, _) = exhaustiveness::check(&module, &info);
    assert_eq!(results[0].missing_patterns, vec!["blue"]);

    let witness = &results[0].missing_patterns[0];
    let completed = format!(
        "struct Color {{ red, green, blue }}\n\
         fn f(c: Color) -> int {{ match c {{ case red => 1, case green => 2, case {witness} => pass }} }}"
    );
    let module = parsed_module(&completed);
    let info = infer::infer(&module);
    let (results, errors) = exhaustiveness::check(&module, &info);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    assert!(results[0].is_exhaustive);
}

#[test]
fn formatting_is_idempotent() {
    let once = format_source(STATUTE_SOURCE, "<test>");
    let twice = format_source(&once, "<test>");
    assert_eq!(once, twice);

    // Formatted output still passes the whole pipeline.
    let result = yuho::run(&once, "<test>");
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
}

#[test]
fn penalty_ranges_are_ordered_in_valid_sources() {
    let module = parsed_module(STATUTE_SOURCE);
    for statute in &module.statutes {
        let Some(penalty) = &statute.penalty else {
            continue;
        };
        if let (Some(min), Some(max)) = (&penalty.imprisonment_min, &penalty.imprisonment_max) {
            assert!(min.value.total_days() <= max.value.total_days());
        }
        if let (Some(min), Some(max)) = (&penalty.fine_min, &penalty.fine_max) {
            assert!(min.amount <= max.amount);
        }
    }
}
