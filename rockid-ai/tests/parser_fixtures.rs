//! Adversarial provider-text fixtures for the response parser

use rockid_ai::parser::{
    extract_json_object, parse_record, ParseError, DEFAULT_CONFIDENCE, NOT_PROVIDED,
    PLACEHOLDER_LABEL,
};
use rockid_ai::types::PartialRecord;
use rockid_common::RockCategory;

#[test]
fn fenced_block_with_trailing_commentary() {
    let text = "```json\n{\"name\": \"Obsidian\", \"type\": \"Igneous\", \"confidence\": 77}\n```\n\
                Note: obsidian is volcanic glass {not a mineral}.";
    // Greedy span runs to the last brace, which is in the commentary
    assert_eq!(
        extract_json_object(text).map(|s| s.ends_with("mineral}")),
        Some(true)
    );
    assert!(matches!(
        parse_record(text, "p"),
        Err(ParseError::Malformed(_))
    ));
}

#[test]
fn nested_objects_are_kept_whole() {
    let text = r#"Result: {"name": "Limestone", "type": "Sedimentary",
        "details": {"fossils": {"common": true}}, "confidence": 70} -- end"#;
    let record = parse_record(text, "p").unwrap();
    assert_eq!(record.label, "Limestone");
    assert_eq!(record.category, RockCategory::Sedimentary);
    assert_eq!(record.confidence, 70);
}

#[test]
fn braces_inside_strings() {
    let text = r#"{"name": "Quartzite {var.}", "funFact": "Looks like } this", "type": "metamorphic"}"#;
    let record = parse_record(text, "p").unwrap();
    assert_eq!(record.label, "Quartzite {var.}");
    assert_eq!(record.note, "Looks like } this");
    assert_eq!(record.category, RockCategory::Metamorphic);
}

#[test]
fn missing_closing_brace() {
    let text = r#"{"name": "Gneiss", "type": "Metamorphic""#;
    assert_eq!(parse_record(text, "p"), Err(ParseError::NoObject));
}

#[test]
fn missing_opening_brace() {
    let text = r#""name": "Gneiss"}"#;
    assert_eq!(parse_record(text, "p"), Err(ParseError::NoObject));
}

#[test]
fn trailing_comma_is_malformed() {
    let text = r#"{"name": "Chalk", "type": "Sedimentary",}"#;
    assert!(matches!(
        parse_record(text, "p"),
        Err(ParseError::Malformed(_))
    ));
}

#[test]
fn single_quoted_pseudo_json_is_malformed() {
    let text = "{'name': 'Chalk'}";
    assert!(matches!(
        parse_record(text, "p"),
        Err(ParseError::Malformed(_))
    ));
}

#[test]
fn empty_reply() {
    assert_eq!(parse_record("", "p"), Err(ParseError::NoObject));
    assert_eq!(parse_record("   \n ", "p"), Err(ParseError::NoObject));
}

#[test]
fn null_fields_take_defaults() {
    let text = r#"{"name": null, "type": null, "composition": null, "hardness": null,
                   "formation": null, "locations": null, "funFact": null, "confidence": null}"#;
    let record = parse_record(text, "p").unwrap();
    assert_eq!(record.label, PLACEHOLDER_LABEL);
    assert_eq!(record.category, RockCategory::Unknown);
    assert!(record.attributes.is_empty());
    assert_eq!(record.explanation, NOT_PROVIDED);
    assert!(record.locations.is_empty());
    assert_eq!(record.confidence, DEFAULT_CONFIDENCE);
}

#[test]
fn unknown_category_text() {
    let record = parse_record(r#"{"name": "Pyrite", "type": "Mineral"}"#, "p").unwrap();
    assert_eq!(record.category, RockCategory::Unknown);
}

#[test]
fn extra_keys_ignored() {
    let record = parse_record(
        r#"{"name": "Marble", "type": "Metamorphic", "color": "white", "uses": ["sculpture"]}"#,
        "p",
    )
    .unwrap();
    assert_eq!(record.label, "Marble");
}

#[test]
fn unicode_text_survives() {
    let record = parse_record(
        r#"Résultat : {"name": "Granit rosé", "locations": ["Ploumanac'h", "東京"]}"#,
        "p",
    )
    .unwrap();
    assert_eq!(record.label, "Granit rosé");
    assert_eq!(record.locations, vec!["Ploumanac'h", "東京"]);
}

#[test]
fn reparsing_serialized_output_is_idempotent() {
    let replies = [
        r#"{"name": " Basalt ", "type": "igneous rock", "composition": "Pyroxene, Plagioclase",
            "hardness": 6, "formation": ["Lava", "cooling"], "locations": ["Iceland", ""],
            "funFact": "Most of the ocean floor is basalt.", "confidence": 0.815}"#,
        "{}",
        r#"{"label": "Coal", "category": "SEDIMENTARY", "minerals": ["Carbon"], "confidence": "99%"}"#,
        r#"{"name": "Schist", "type": "Metamorphic", "confidence": 0}"#,
    ];

    for reply in replies {
        let first = parse_record(reply, "provider-x").unwrap();
        let serialized = serde_json::to_string(&first).unwrap();
        let second = parse_record(&serialized, "provider-x").unwrap();
        assert_eq!(first, second, "not idempotent for {reply}");
    }

    let placeholder = PartialRecord::placeholder("provider-y", 30);
    let serialized = serde_json::to_string(&placeholder).unwrap();
    assert_eq!(parse_record(&serialized, "provider-y").unwrap(), placeholder);
}
