//! Core types and storage for site tour generation.
//!
//! Provides the knowledge-base model ([`model::KnowledgeBase`]), the sub-technique
//! index, the [`model::EntityAccessor`] seam, STIX bundle loading, site path
//! formatting, configuration, and the settings output sink.

pub mod config;
pub mod model;
pub mod paths;
pub mod stix;
pub mod storage;
