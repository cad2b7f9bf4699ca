use serde::Deserialize;
use std::fs;
use std::path::Path;

use inkmark_core::translate;

#[derive(Debug, Deserialize)]
struct SpecCase {
    markdown: String,
    html: String,
    example: u32,
    section: String,
}

#[test]
fn dialect_cases() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let cases_path = root.join("tests/cases.json");

    let cases_json = fs::read_to_string(&cases_path).expect("failed to read tests/cases.json");
    let cases: Vec<SpecCase> =
        serde_json::from_str(&cases_json).expect("failed to parse tests/cases.json");

    let mut failures = Vec::new();
    for case in &cases {
        let actual = translate(&case.markdown);
        if actual != case.html {
            failures.push(format!(
                "example {} ({}):\n  input:    {:?}\n  expected: {:?}\n  actual:   {:?}",
                case.example, case.section, case.markdown, case.html, actual
            ));
        }
    }

    if !failures.is_empty() {
        panic!(
            "{} of {} dialect cases failed:\n{}",
            failures.len(),
            cases.len(),
            failures.join("\n")
        );
    }
}
