//! Helpers for building and reading [`Artifact`]s.

use crate::types::{Artifact, Part};
use crate::utils::parts::get_text_parts;
use serde_json::Value;
use uuid::Uuid;

/// Build an artifact from parts with a generated `artifactId`.
pub fn new_artifact(
    parts: Vec<Part>,
    name: impl Into<String>,
    description: Option<impl Into<String>>,
) -> Artifact {
    Artifact {
        artifact_id: Uuid::new_v4().to_string(),
        name: Some(name.into()),
        description: description.map(Into::into),
        parts,
        metadata: None,
        extensions: None,
    }
}

/// Build an artifact holding a single text part.
pub fn new_text_artifact(
    name: impl Into<String>,
    text: impl Into<String>,
    description: Option<impl Into<String>>,
) -> Artifact {
    new_artifact(vec![Part::text(text)], name, description)
}

/// Build an artifact holding a single data part.
pub fn new_data_artifact(
    name: impl Into<String>,
    data: Value,
    description: Option<impl Into<String>>,
) -> Artifact {
    new_artifact(vec![Part::data(data)], name, description)
}

/// Join the text content of an artifact's text parts with `delimiter`.
pub fn get_artifact_text(artifact: &Artifact, delimiter: &str) -> String {
    get_text_parts(&artifact.parts).join(delimiter)
}
