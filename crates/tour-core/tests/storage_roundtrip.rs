use std::path::Path;
use tempfile::TempDir;
use tour_core::model::*;
use tour_core::storage::{self, SettingsError};

const TEMPLATE: &str = "\nmodule.exports.tour_steps = ${tour_steps};\n";

fn write_bundle(dir: &Path, matrix_id: &str, json: &str) {
    std::fs::write(storage::bundle_file(dir, matrix_id), json).unwrap();
}

fn bundle_json(parent_id: &str, sub_ids: &[&str]) -> String {
    let mut objects = vec![format!(
        r#"{{"type": "attack-pattern", "id": "ap--{p}", "name": "{p}",
            "external_references": [{{"source_name": "mitre-attack", "external_id": "{p}"}}]}}"#,
        p = parent_id
    )];
    for sub in sub_ids {
        objects.push(format!(
            r#"{{"type": "attack-pattern", "id": "ap--{s}", "name": "{s}", "x_mitre_is_subtechnique": true,
                "external_references": [{{"source_name": "mitre-attack", "external_id": "{s}"}}]}}"#,
            s = sub
        ));
        objects.push(format!(
            r#"{{"type": "relationship", "id": "rel--{s}", "relationship_type": "subtechnique-of",
                "source_ref": "ap--{s}", "target_ref": "ap--{p}"}}"#,
            s = sub,
            p = parent_id
        ));
    }
    format!(r#"{{"type": "bundle", "objects": [{}]}}"#, objects.join(","))
}

#[test]
fn test_load_knowledge_base_from_bundles() {
    let tmp = TempDir::new().unwrap();
    write_bundle(
        tmp.path(),
        "enterprise-attack",
        &bundle_json("T1055", &["T1055.001", "T1055.002"]),
    );
    write_bundle(tmp.path(), "mobile-attack", &bundle_json("T1404", &[]));

    let matrices = vec![
        Matrix::new("enterprise-attack", "enterprise", MatrixKind::Internal),
        Matrix::new("mobile-attack", "mobile", MatrixKind::Internal),
    ];
    let kb = storage::load_knowledge_base(tmp.path(), &matrices).unwrap();

    assert_eq!(kb.techniques(&matrices[0]).len(), 3);
    assert_eq!(kb.techniques(&matrices[1]).len(), 1);
    let parent = &kb.techniques(&matrices[0])[0];
    assert_eq!(kb.subtechnique_index().count(parent), 2);
}

#[test]
fn test_load_skips_external_matrices() {
    let tmp = TempDir::new().unwrap();
    let matrices = vec![Matrix::new("pre-attack", "pre", MatrixKind::External)];
    let kb = storage::load_knowledge_base(tmp.path(), &matrices).unwrap();
    assert!(kb.domains.is_empty());
}

#[test]
fn test_load_missing_bundle_fails_with_path() {
    let tmp = TempDir::new().unwrap();
    let matrices = vec![Matrix::new("ics-attack", "ics", MatrixKind::Internal)];
    let err = storage::load_knowledge_base(tmp.path(), &matrices).unwrap_err();
    assert!(format!("{:#}", err).contains("ics-attack.json"));
}

#[test]
fn test_render_tour_settings() {
    let tour = Tour::new("matrices/enterprise", "techniques/T1055", "techniques/T1055/001");
    let rendered = storage::render_tour_settings(TEMPLATE, &tour).unwrap();
    assert_eq!(
        rendered,
        "\nmodule.exports.tour_steps = {\"matrix\":\"matrices/enterprise\",\"technique\":\"techniques/T1055\",\"subtechnique\":\"techniques/T1055/001\"};\n"
    );
}

#[test]
fn test_render_empty_tour() {
    let rendered = storage::render_tour_settings(TEMPLATE, &Tour::empty()).unwrap();
    assert_eq!(rendered, "\nmodule.exports.tour_steps = {};\n");
}

#[test]
fn test_render_requires_placeholder() {
    let err = storage::render_tour_settings("tour_steps = {};", &Tour::empty()).unwrap_err();
    assert!(matches!(err, SettingsError::MissingPlaceholder));
}

#[test]
fn test_append_tour_settings_appends() {
    let tmp = TempDir::new().unwrap();
    let js_dir = tmp.path().join("theme").join("scripts");
    std::fs::create_dir_all(&js_dir).unwrap();
    std::fs::write(js_dir.join("settings.js"), "let base_url = \"/\";\n").unwrap();

    let path =
        storage::append_tour_settings(&js_dir, "settings.js", TEMPLATE, &Tour::empty()).unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(
        content,
        "let base_url = \"/\";\n\nmodule.exports.tour_steps = {};\n"
    );
}

#[test]
fn test_append_tour_settings_creates_directory() {
    let tmp = TempDir::new().unwrap();
    let js_dir = tmp.path().join("fresh");
    let path =
        storage::append_tour_settings(&js_dir, "settings.js", TEMPLATE, &Tour::empty()).unwrap();
    assert!(path.exists());
}
