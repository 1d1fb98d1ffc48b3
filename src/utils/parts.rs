//! Extractors over lists of [`Part`]s.

use crate::types::{FileContent, Part};
use serde_json::Value;

/// Collect the text content of every text part, in order.
pub fn get_text_parts(parts: &[Part]) -> Vec<String> {
    parts
        .iter()
        .filter_map(|part| match part {
            Part::Text { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// Collect the payload of every data part, in order.
pub fn get_data_parts(parts: &[Part]) -> Vec<Value> {
    parts
        .iter()
        .filter_map(|part| match part {
            Part::Data { data, .. } => Some(data.clone()),
            _ => None,
        })
        .collect()
}

/// Collect the payload of every file part, in order.
pub fn get_file_parts(parts: &[Part]) -> Vec<FileContent> {
    parts
        .iter()
        .filter_map(|part| match part {
            Part::File { file, .. } => Some(file.clone()),
            _ => None,
        })
        .collect()
}
