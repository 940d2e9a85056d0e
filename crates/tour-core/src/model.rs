//! Knowledge-base data model: matrices, techniques, the sub-technique index, and tours.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Whether a matrix is rendered by this site or only linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixKind {
    #[serde(alias = "local")]
    Internal,
    /// Hosted elsewhere. Never scanned for tour steps.
    External,
}

/// One entry of the matrix registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    /// Domain identifier, e.g. "enterprise-attack". Also names the STIX bundle file.
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Site-relative path segment under `matrices/`.
    pub path: String,
    pub kind: MatrixKind,
}

impl Matrix {
    pub fn new(id: impl Into<String>, path: impl Into<String>, kind: MatrixKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            path: path.into(),
            kind,
        }
    }

    pub fn is_external(&self) -> bool {
        self.kind == MatrixKind::External
    }
}

/// A technique or sub-technique entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technique {
    /// STIX identifier (`attack-pattern--...`). Key of the sub-technique index.
    pub stix_id: String,
    pub name: String,
    /// ATT&CK ID such as "T1055" or "T1055.001".
    pub attack_id: Option<String>,
    #[serde(default)]
    pub is_subtechnique: bool,
}

/// One `subtechnique-of` relationship, wrapping the sub-technique entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtechniqueRecord {
    pub technique: Technique,
    pub relationship_id: String,
}

/// Parent technique STIX ID → sub-techniques, in export order.
#[derive(Debug, Clone, Default)]
pub struct SubtechniqueIndex {
    by_parent: HashMap<String, Vec<SubtechniqueRecord>>,
}

impl SubtechniqueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, parent_id: impl Into<String>, record: SubtechniqueRecord) {
        self.by_parent
            .entry(parent_id.into())
            .or_default()
            .push(record);
    }

    /// The registered sub-technique group of a parent, if any.
    ///
    /// A group can exist and still be empty; callers that care about children
    /// should use [`Self::count`] or [`Self::has_subtechniques`].
    pub fn get(&self, parent_id: &str) -> Option<&[SubtechniqueRecord]> {
        self.by_parent.get(parent_id).map(Vec::as_slice)
    }

    pub fn count(&self, technique: &Technique) -> usize {
        self.get(&technique.stix_id).map_or(0, <[_]>::len)
    }

    pub fn has_subtechniques(&self, technique: &Technique) -> bool {
        self.count(technique) > 0
    }

    /// The canonical ("first") sub-technique of a parent.
    pub fn first(&self, technique: &Technique) -> Option<&SubtechniqueRecord> {
        self.get(&technique.stix_id).and_then(<[_]>::first)
    }

    /// Number of parents with a registered group.
    pub fn len(&self) -> usize {
        self.by_parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_parent.is_empty()
    }

    /// Total number of sub-technique records across all parents.
    pub fn total_subtechniques(&self) -> usize {
        self.by_parent.values().map(Vec::len).sum()
    }
}

/// Resolves a matrix to its technique entities.
///
/// Implementations are read-only: querying never mutates shared state.
pub trait EntityAccessor {
    /// Ordered technique set of `matrix`. Unknown matrices yield an empty slice.
    fn techniques(&self, matrix: &Matrix) -> &[Technique];

    fn subtechnique_index(&self) -> &SubtechniqueIndex;
}

/// In-memory knowledge base loaded once before tour selection.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    /// Matrix ID → techniques in export order.
    pub domains: BTreeMap<String, Vec<Technique>>,
    subtechniques: SubtechniqueIndex,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the technique set of a matrix.
    pub fn insert_domain(&mut self, matrix_id: impl Into<String>, techniques: Vec<Technique>) {
        self.domains.insert(matrix_id.into(), techniques);
    }

    pub fn add_subtechnique(&mut self, parent_id: impl Into<String>, record: SubtechniqueRecord) {
        self.subtechniques.insert(parent_id, record);
    }

    pub fn technique_count(&self, matrix_id: &str) -> usize {
        self.domains.get(matrix_id).map_or(0, Vec::len)
    }
}

impl EntityAccessor for KnowledgeBase {
    fn techniques(&self, matrix: &Matrix) -> &[Technique] {
        self.domains
            .get(&matrix.id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn subtechnique_index(&self) -> &SubtechniqueIndex {
        &self.subtechniques
    }
}

/// Top-level techniques only, in input order.
pub fn top_level(techniques: &[Technique]) -> Vec<&Technique> {
    techniques.iter().filter(|t| !t.is_subtechnique).collect()
}

/// Techniques with at least one registered sub-technique, in input order.
pub fn with_subtechniques<'a>(
    techniques: &'a [Technique],
    index: &SubtechniqueIndex,
) -> Vec<&'a Technique> {
    techniques
        .iter()
        .filter(|t| index.has_subtechniques(t))
        .collect()
}

/// Tour steps for one matrix: either fully populated or empty.
///
/// Serializes to `{"matrix": .., "technique": .., "subtechnique": ..}`, or `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tour {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    matrix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    technique: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subtechnique: Option<String>,
}

impl Tour {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(
        matrix: impl Into<String>,
        technique: impl Into<String>,
        subtechnique: impl Into<String>,
    ) -> Self {
        Self {
            matrix: Some(matrix.into()),
            technique: Some(technique.into()),
            subtechnique: Some(subtechnique.into()),
        }
    }

    pub fn matrix(&self) -> Option<&str> {
        self.matrix.as_deref()
    }

    pub fn technique(&self) -> Option<&str> {
        self.technique.as_deref()
    }

    pub fn subtechnique(&self) -> Option<&str> {
        self.subtechnique.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.step_count() == 0
    }

    /// Number of populated steps.
    pub fn step_count(&self) -> usize {
        [&self.matrix, &self.technique, &self.subtechnique]
            .iter()
            .filter(|s| s.is_some())
            .count()
    }
}
