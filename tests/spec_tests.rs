use marklet::markdown_to_html;
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
struct Case {
    markdown: String,
    html: String,
    example: u32,
    section: String,
}

#[test]
fn conformance_cases() {
    let data = fs::read_to_string("tests/data/cases.json").expect("Failed to read cases.json");
    let cases: Vec<Case> = serde_json::from_str(&data).expect("Failed to parse cases.json");

    let mut passed = 0;
    let mut failures = Vec::new();

    for case in cases.iter() {
        let result = markdown_to_html(&case.markdown);

        if result == case.html {
            passed += 1;
        } else {
            failures.push(case.example);
            eprintln!("\n❌ Example {} failed ({})", case.example, case.section);
            eprintln!("  Input: {:?}", case.markdown);
            eprintln!("  Expected: {:?}", case.html);
            eprintln!("  Got: {:?}", result);
        }
    }

    eprintln!("\n📊 Results: {} passed, {} failed", passed, failures.len());
    assert!(failures.is_empty(), "failed examples: {:?}", failures);
}

#[test]
fn cases_are_deterministic() {
    let data = fs::read_to_string("tests/data/cases.json").expect("Failed to read cases.json");
    let cases: Vec<Case> = serde_json::from_str(&data).expect("Failed to parse cases.json");

    for case in cases.iter() {
        assert_eq!(
            markdown_to_html(&case.markdown),
            markdown_to_html(&case.markdown),
            "example {}",
            case.example
        );
    }
}
