//! STIX 2.x bundle schema and ingestion into the [`KnowledgeBase`].
//!
//! Only `attack-pattern` objects and `subtechnique-of` relationships are read.
//! Every other object type in the bundle is ignored.

use crate::model::{EntityAccessor, KnowledgeBase, SubtechniqueRecord, Technique};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

const BUNDLE_TYPE: &str = "bundle";
const ATTACK_SOURCE: &str = "mitre-attack";
const SUBTECHNIQUE_OF: &str = "subtechnique-of";

/// A STIX bundle as exported for one domain.
#[derive(Debug, Clone, Deserialize)]
pub struct Bundle {
    #[serde(rename = "type")]
    pub bundle_type: String,
    #[serde(default)]
    pub objects: Vec<StixObject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum StixObject {
    #[serde(rename = "attack-pattern")]
    AttackPattern(AttackPattern),
    #[serde(rename = "relationship")]
    Relationship(Relationship),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttackPattern {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub x_mitre_is_subtechnique: bool,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default)]
    pub x_mitre_deprecated: bool,
    #[serde(default)]
    pub external_references: Vec<ExternalReference>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalReference {
    pub source_name: String,
    #[serde(default)]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub relationship_type: String,
    pub source_ref: String,
    pub target_ref: String,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default)]
    pub x_mitre_deprecated: bool,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

/// A STIX object that may appear in several versions under one `id`.
trait Versioned {
    fn stix_id(&self) -> &str;
    fn modified(&self) -> Option<DateTime<Utc>>;
}

impl Versioned for AttackPattern {
    fn stix_id(&self) -> &str {
        &self.id
    }

    fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }
}

impl Versioned for Relationship {
    fn stix_id(&self) -> &str {
        &self.id
    }

    fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }
}

/// One object per `id`: the version with the latest `modified` timestamp, at
/// the position of the id's first occurrence. Equal timestamps keep the earlier.
fn latest_versions<'b, T, I>(objects: I) -> Vec<&'b T>
where
    T: Versioned + 'b,
    I: IntoIterator<Item = &'b T>,
{
    let mut slots: HashMap<&'b str, usize> = HashMap::new();
    let mut latest: Vec<&'b T> = Vec::new();
    for obj in objects {
        match slots.get(obj.stix_id()) {
            Some(&slot) => {
                if obj.modified() > latest[slot].modified() {
                    latest[slot] = obj;
                }
            }
            None => {
                slots.insert(obj.stix_id(), latest.len());
                latest.push(obj);
            }
        }
    }
    latest
}

impl AttackPattern {
    fn is_active(&self) -> bool {
        !self.revoked && !self.x_mitre_deprecated
    }

    /// ATT&CK ID from the first `mitre-attack` external reference.
    pub fn attack_id(&self) -> Option<&str> {
        self.external_references
            .iter()
            .find(|r| r.source_name == ATTACK_SOURCE)
            .and_then(|r| r.external_id.as_deref())
    }

    fn to_technique(&self) -> Technique {
        Technique {
            stix_id: self.id.clone(),
            name: self.name.clone(),
            attack_id: self.attack_id().map(String::from),
            is_subtechnique: self.x_mitre_is_subtechnique,
        }
    }
}

impl Relationship {
    fn is_active_subtechnique_of(&self) -> bool {
        self.relationship_type == SUBTECHNIQUE_OF && !self.revoked && !self.x_mitre_deprecated
    }
}

/// Deserialize a bundle from a JSON string.
pub fn from_json(json: &str) -> Result<Bundle> {
    let bundle: Bundle =
        serde_json::from_str(json).context("failed to deserialize STIX bundle from JSON")?;
    if bundle.bundle_type != BUNDLE_TYPE {
        anyhow::bail!(
            "STIX object type mismatch: expected {}, found {}",
            BUNDLE_TYPE,
            bundle.bundle_type
        );
    }
    Ok(bundle)
}

/// Add one domain's techniques and sub-technique relationships to `kb`.
///
/// Objects repeated under one `id` collapse to their latest version before
/// anything else is checked. Revoked and deprecated objects are then dropped.
/// A relationship whose source is not an active technique of this bundle is
/// dropped, as is a relationship already registered by an earlier bundle.
pub fn ingest_bundle(kb: &mut KnowledgeBase, matrix_id: &str, bundle: &Bundle) {
    let patterns = latest_versions(bundle.objects.iter().filter_map(|obj| match obj {
        StixObject::AttackPattern(ap) => Some(ap),
        _ => None,
    }));
    let relationships = latest_versions(bundle.objects.iter().filter_map(|obj| match obj {
        StixObject::Relationship(rel) => Some(rel),
        _ => None,
    }));

    let techniques: Vec<Technique> = patterns
        .into_iter()
        .filter(|ap| ap.is_active())
        .map(AttackPattern::to_technique)
        .collect();

    let by_id: HashMap<&str, &Technique> = techniques
        .iter()
        .map(|t| (t.stix_id.as_str(), t))
        .collect();

    let mut records = Vec::new();
    for rel in relationships {
        if !rel.is_active_subtechnique_of() {
            continue;
        }
        let Some(sub) = by_id.get(rel.source_ref.as_str()) else {
            tracing::warn!(
                "{}: dropping {} with unknown sub-technique {}",
                matrix_id,
                rel.id,
                rel.source_ref
            );
            continue;
        };
        let already_known = kb
            .subtechnique_index()
            .get(&rel.target_ref)
            .is_some_and(|group| group.iter().any(|r| r.relationship_id == rel.id));
        if already_known {
            continue;
        }
        records.push((
            rel.target_ref.clone(),
            SubtechniqueRecord {
                technique: (*sub).clone(),
                relationship_id: rel.id.clone(),
            },
        ));
    }

    tracing::debug!(
        "{}: {} techniques, {} sub-technique relationships",
        matrix_id,
        techniques.len(),
        records.len()
    );

    for (parent, record) in records {
        kb.add_subtechnique(parent, record);
    }
    kb.insert_domain(matrix_id, techniques);
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"{
  "type": "bundle",
  "id": "bundle--1",
  "objects": [
    {
      "type": "x-mitre-matrix",
      "id": "x-mitre-matrix--1",
      "name": "Enterprise ATT&CK"
    },
    {
      "type": "attack-pattern",
      "id": "attack-pattern--parent",
      "name": "Process Injection",
      "external_references": [
        { "source_name": "capec", "external_id": "CAPEC-640" },
        { "source_name": "mitre-attack", "external_id": "T1055" }
      ]
    },
    {
      "type": "attack-pattern",
      "id": "attack-pattern--child",
      "name": "Dynamic-link Library Injection",
      "x_mitre_is_subtechnique": true,
      "external_references": [
        { "source_name": "mitre-attack", "external_id": "T1055.001" }
      ]
    },
    {
      "type": "attack-pattern",
      "id": "attack-pattern--old",
      "name": "Old Technique",
      "revoked": true
    },
    {
      "type": "relationship",
      "id": "relationship--1",
      "relationship_type": "subtechnique-of",
      "source_ref": "attack-pattern--child",
      "target_ref": "attack-pattern--parent"
    },
    {
      "type": "relationship",
      "id": "relationship--2",
      "relationship_type": "uses",
      "source_ref": "intrusion-set--1",
      "target_ref": "attack-pattern--parent"
    }
  ]
}"#;

    #[test]
    fn test_from_json_parses_known_objects() {
        let bundle = from_json(BUNDLE).unwrap();
        assert_eq!(bundle.objects.len(), 6);
        assert!(matches!(bundle.objects[0], StixObject::Other));
        match &bundle.objects[1] {
            StixObject::AttackPattern(ap) => assert_eq!(ap.attack_id(), Some("T1055")),
            other => panic!("expected attack-pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_from_json_rejects_non_bundle() {
        let err = from_json(r#"{"type": "attack-pattern", "objects": []}"#).unwrap_err();
        assert!(err.to_string().contains("expected bundle"));
    }

    #[test]
    fn test_ingest_drops_revoked_and_unrelated() {
        let bundle = from_json(BUNDLE).unwrap();
        let mut kb = KnowledgeBase::new();
        ingest_bundle(&mut kb, "enterprise-attack", &bundle);

        assert_eq!(kb.technique_count("enterprise-attack"), 2);
        let index = kb.subtechnique_index();
        assert_eq!(index.len(), 1);
        let group = index.get("attack-pattern--parent").unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group[0].technique.attack_id.as_deref(), Some("T1055.001"));
    }

    #[test]
    fn test_ingest_twice_does_not_duplicate_relationships() {
        let bundle = from_json(BUNDLE).unwrap();
        let mut kb = KnowledgeBase::new();
        ingest_bundle(&mut kb, "enterprise-attack", &bundle);
        ingest_bundle(&mut kb, "enterprise-attack", &bundle);

        assert_eq!(kb.subtechnique_index().total_subtechniques(), 1);
    }

    const VERSIONED_BUNDLE: &str = r#"{
  "type": "bundle",
  "objects": [
    {
      "type": "attack-pattern",
      "id": "attack-pattern--p",
      "name": "Process Injection",
      "modified": "2021-04-01T00:00:00.000Z",
      "external_references": [{ "source_name": "mitre-attack", "external_id": "T1055" }]
    },
    {
      "type": "attack-pattern",
      "id": "attack-pattern--c",
      "name": "DLL Injection",
      "x_mitre_is_subtechnique": true,
      "modified": "2021-04-01T00:00:00.000Z",
      "external_references": [{ "source_name": "mitre-attack", "external_id": "T1055.001" }]
    },
    {
      "type": "attack-pattern",
      "id": "attack-pattern--p",
      "name": "Process Injection (updated)",
      "modified": "2023-10-01T00:00:00.000Z",
      "external_references": [{ "source_name": "mitre-attack", "external_id": "T1055" }]
    },
    {
      "type": "relationship",
      "id": "relationship--1",
      "relationship_type": "subtechnique-of",
      "source_ref": "attack-pattern--c",
      "target_ref": "attack-pattern--p",
      "modified": "2021-04-01T00:00:00.000Z"
    },
    {
      "type": "relationship",
      "id": "relationship--1",
      "relationship_type": "subtechnique-of",
      "source_ref": "attack-pattern--c",
      "target_ref": "attack-pattern--p",
      "modified": "2022-04-01T00:00:00.000Z"
    }
  ]
}"#;

    #[test]
    fn test_ingest_collapses_repeated_ids_within_bundle() {
        let bundle = from_json(VERSIONED_BUNDLE).unwrap();
        let mut kb = KnowledgeBase::new();
        ingest_bundle(&mut kb, "enterprise-attack", &bundle);

        assert_eq!(kb.technique_count("enterprise-attack"), 2);
        let techniques = &kb.domains["enterprise-attack"];
        assert_eq!(techniques[0].stix_id, "attack-pattern--p");
        assert_eq!(techniques[0].name, "Process Injection (updated)");

        let group = kb.subtechnique_index().get("attack-pattern--p").unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group[0].relationship_id, "relationship--1");
    }

    #[test]
    fn test_latest_version_revoked_drops_technique() {
        let json = r#"{
  "type": "bundle",
  "objects": [
    { "type": "attack-pattern", "id": "attack-pattern--x", "name": "X",
      "modified": "2020-01-01T00:00:00Z" },
    { "type": "attack-pattern", "id": "attack-pattern--x", "name": "X", "revoked": true,
      "modified": "2024-01-01T00:00:00Z" }
  ]
}"#;
        let bundle = from_json(json).unwrap();
        let mut kb = KnowledgeBase::new();
        ingest_bundle(&mut kb, "enterprise-attack", &bundle);
        assert_eq!(kb.technique_count("enterprise-attack"), 0);
    }
}
