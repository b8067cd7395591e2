use mark::render;
use regex::Regex;
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
struct SpecTest {
    example: u32,
    markdown: String,
    html: String,
}

/// Output shape is compared without newlines and without heading ids.
fn normalize(html: &str, ids: &Regex) -> String {
    ids.replace_all(html, "").replace('\n', "")
}

#[test]
fn commonmark_examples() {
    let test_data =
        fs::read_to_string("tests/data/commonmark.json").expect("Failed to read commonmark.json");
    let tests: Vec<SpecTest> =
        serde_json::from_str(&test_data).expect("Failed to parse commonmark.json");
    let ids = Regex::new(r#" id="[^"]*""#).unwrap();

    let mut failures = Vec::new();
    for test in &tests {
        let result = normalize(&render(&test.markdown), &ids);
        let expected = normalize(&test.html, &ids);
        if result != expected {
            if failures.len() < 5 {
                eprintln!("\nExample {} failed", test.example);
                eprintln!("  Input: {:?}", test.markdown);
                eprintln!("  Expected: {:?}", expected);
                eprintln!("  Got: {:?}", result);
            }
            failures.push(test.example);
        }
    }

    eprintln!(
        "CommonMark examples: {} passed, {} failed",
        tests.len() - failures.len(),
        failures.len()
    );
    assert!(failures.is_empty(), "failed examples: {failures:?}");
}
