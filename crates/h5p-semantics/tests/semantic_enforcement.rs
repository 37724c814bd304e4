//! # Integration Tests for h5p-semantics
//!
//! Drives the walker, the enforcer and the file scanner over a small
//! library ecosystem: a question set whose items embed image and
//! multiple-choice sub-content, each with its own semantics.

use h5p_core::VersionedName;
use h5p_semantics::{
    scan_files, EnforcerOptions, SemanticField, SemanticTreeWalker, SemanticsCatalog,
    SemanticsEnforcer, Visit,
};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Helper: parse a library name.
fn name(s: &str) -> VersionedName {
    VersionedName::parse(s).unwrap()
}

/// Helper: the installed semantics of the question-set ecosystem.
fn ecosystem() -> SemanticsCatalog {
    SemanticsCatalog::new()
        .with_json(
            &name("H5P.QuestionSet-1.20"),
            &json!([
                {"name": "introduction", "type": "text", "tags": ["strong", "em", "p"], "optional": true},
                {"name": "background", "type": "image", "optional": true},
                {
                    "name": "questions", "type": "list",
                    "field": {
                        "name": "question", "type": "library",
                        "options": ["H5P.MultiChoice 1.16", {"name": "H5P.Image 1.1"}]
                    }
                },
                {
                    "name": "texts", "type": "group", "common": true,
                    "fields": [{"name": "finishButton", "type": "text", "maxLength": 10}]
                }
            ]),
        )
        .unwrap()
        .with_json(
            &name("H5P.MultiChoice-1.16"),
            &json!([
                {"name": "question", "type": "text", "tags": ["strong"]},
                {
                    "name": "answers", "type": "list",
                    "field": {
                        "name": "answer", "type": "group",
                        "fields": [
                            {"name": "text", "type": "text"},
                            {"name": "correct", "type": "boolean"}
                        ]
                    }
                },
                {"name": "media", "type": "library", "optional": true, "options": ["H5P.Image 1.1"]}
            ]),
        )
        .unwrap()
        .with_json(
            &name("H5P.Image-1.1"),
            &json!([
                {"name": "file", "type": "image"},
                {"name": "alt", "type": "text", "maxLength": 21}
            ]),
        )
        .unwrap()
}

/// Helper: a question set as an untrusted editor might submit it.
fn submitted() -> Value {
    json!({
        "introduction": "<p><strong>Welcome</strong><img src=x onerror=alert(1)></p>",
        "background": {"path": "images/bg.jpg#tmp", "mime": "image/jpeg"},
        "questions": [
            {
                "library": "H5P.MultiChoice 1.16",
                "params": {
                    "question": "<strong>2+2?</strong><script>steal()</script>",
                    "answers": [
                        {"text": "4", "correct": true},
                        {"text": 5, "correct": false}
                    ],
                    "media": {
                        "library": "H5P.Image 1.1",
                        "params": {"file": {"path": "images/sum.png"}, "alt": "A sum on a blackboard, drawn in chalk"}
                    }
                }
            },
            {"library": "H5P.Video 1.6", "params": {"sources": [{"path": "videos/x.mp4"}]}},
            {"params": {"question": "orphan"}},
            {
                "library": "H5P.Image-1.1",
                "params": {"file": {"path": "https://example.org/remote.png"}, "alt": "remote"}
            }
        ],
        "texts": "Finish the quiz"
    })
}

// -- Walker -------------------------------------------------------------------

#[test]
fn test_walker_visits_nested_libraries_in_document_order() {
    let catalog = ecosystem();
    let mut params = submitted();
    let mut paths = Vec::new();
    let mut visitor = |_: &SemanticField, _: &mut Value, path: &str| {
        paths.push(path.to_string());
        Visit::Continue
    };
    SemanticTreeWalker::new(&catalog)
        .walk(&mut params, &name("H5P.QuestionSet-1.20"), &mut visitor)
        .unwrap();

    assert_eq!(paths[0], "$.introduction");
    assert!(paths.contains(&"$.questions[0].params.answers[1].text".to_string()));
    assert!(paths.contains(&"$.questions[0].params.media.params.alt".to_string()));
    assert!(paths.contains(&"$.texts".to_string()));
    assert!(!paths.iter().any(|p| p.starts_with("$.questions[1].params")));
    assert_eq!(params, submitted());
}

/// Helper: the ecosystem plus a library exposing a single image slot.
fn with_slot() -> SemanticsCatalog {
    ecosystem()
        .with_json(
            &name("H5P.Slot-1.0"),
            &json!([{"name": "slot", "type": "library", "options": ["H5P.Image 1.1"]}]),
        )
        .unwrap()
}

#[test]
fn test_removed_library_is_not_descended() {
    let catalog = with_slot();
    let mut params = json!({
        "slot": {"library": "H5P.Image 1.1", "params": {"file": {"path": "a.png"}, "alt": "x"}}
    });
    let mut paths = Vec::new();
    let mut visitor = |field: &SemanticField, _: &mut Value, path: &str| {
        paths.push(path.to_string());
        if field.name == "slot" {
            Visit::Remove
        } else {
            Visit::Continue
        }
    };
    SemanticTreeWalker::new(&catalog)
        .walk(&mut params, &name("H5P.Slot-1.0"), &mut visitor)
        .unwrap();

    assert_eq!(paths, vec!["$.slot"]);
    assert!(!paths.iter().any(|p| p.starts_with("$.slot.params")));
    assert!(params.get("slot").is_none());
}

// -- Enforcer -----------------------------------------------------------------

#[test]
fn test_enforcer_cleans_untrusted_parameters() {
    let catalog = ecosystem();
    let mut params = submitted();
    let report = SemanticsEnforcer::new(&catalog)
        .enforce(&mut params, &name("H5P.QuestionSet-1.20"))
        .unwrap();

    assert_eq!(params["introduction"], json!("<p><strong>Welcome</strong></p>"));
    let questions = params["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["params"]["question"], json!("<strong>2+2?</strong>"));
    assert_eq!(questions[0]["params"]["answers"][1], json!({"correct": false}));
    assert_eq!(
        questions[0]["params"]["media"]["params"]["alt"],
        json!("A sum on a blackboard")
    );
    assert_eq!(questions[1]["library"], json!("H5P.Image-1.1"));
    assert_eq!(params["texts"], json!("Finish the"));

    assert!(report.removed.contains(&"$.questions[1]".to_string()));
    assert!(report.removed.contains(&"$.questions[2]".to_string()));
    assert!(report.removed.contains(&"$.questions[0].params.answers[1].text".to_string()));
    assert!(report.modified.contains(&"$.texts".to_string()));
}

#[test]
fn test_enforcer_drops_library_outside_options_without_descending() {
    let catalog = with_slot();
    let mut params = json!({
        "slot": {
            "library": "H5P.MultiChoice 1.16",
            "params": {"question": "<script>steal()</script>", "answers": []}
        }
    });
    let report = SemanticsEnforcer::new(&catalog)
        .enforce(&mut params, &name("H5P.Slot-1.0"))
        .unwrap();

    assert_eq!(params, json!({}));
    assert_eq!(report.removed, vec!["$.slot".to_string()]);
    assert!(report.modified.is_empty());
}

#[test]
fn test_enforcement_is_stable() {
    let catalog = ecosystem();
    let enforcer = SemanticsEnforcer::new(&catalog);
    let main = name("H5P.QuestionSet-1.20");

    let mut params = submitted();
    enforcer.enforce(&mut params, &main).unwrap();
    let once = params.clone();
    let report = enforcer.enforce(&mut params, &main).unwrap();

    assert!(report.is_clean());
    assert_eq!(params, once);
}

#[test]
fn test_basic_mode_only_checks_library_references() {
    let catalog = ecosystem();
    let mut params = submitted();
    SemanticsEnforcer::with_options(&catalog, EnforcerOptions { sanitize_text: false })
        .enforce(&mut params, &name("H5P.QuestionSet-1.20"))
        .unwrap();

    assert_eq!(params["questions"].as_array().unwrap().len(), 2);
    assert_eq!(params["texts"], json!("Finish the quiz"));
    assert!(params["introduction"].as_str().unwrap().contains("onerror"));
}

#[test]
fn test_unknown_main_library_is_left_alone() {
    let catalog = ecosystem();
    let mut params = submitted();
    let report = SemanticsEnforcer::new(&catalog)
        .enforce(&mut params, &name("H5P.Unknown-1.0"))
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(params, submitted());
}

// -- File scanner -------------------------------------------------------------

#[test]
fn test_scanner_lists_local_files_across_libraries() {
    let catalog = ecosystem();
    let files = scan_files(&catalog, &submitted(), &name("H5P.QuestionSet-1.20")).unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.file_path.as_str()).collect();
    assert_eq!(paths, vec!["images/bg.jpg", "images/sum.png"]);
    assert_eq!(files[0].mime.as_deref(), Some("image/jpeg"));
    assert_eq!(files[1].json_path, "$.questions[0].params.media.params.file");
}

// -- Properties ---------------------------------------------------------------

proptest! {
    #[test]
    fn test_walker_visits_every_list_item(count in 0usize..20) {
        let main = name("H5P.List-1.0");
        let catalog = SemanticsCatalog::new()
            .with_json(&main, &json!([
                {"name": "items", "type": "list", "field": {"name": "item", "type": "text"}}
            ]))
            .unwrap();
        let mut params = json!({"items": vec!["x"; count]});
        let mut visits = 0usize;
        let mut visitor = |_: &SemanticField, _: &mut Value, _: &str| {
            visits += 1;
            Visit::Continue
        };
        SemanticTreeWalker::new(&catalog).walk(&mut params, &main, &mut visitor).unwrap();
        prop_assert_eq!(visits, count + 1);
    }
}
