//! Protocol extension negotiation helpers.

use crate::types::{AgentCard, AgentExtension};
use std::collections::HashSet;

/// Header through which clients request and servers confirm extensions.
pub const HTTP_EXTENSION_HEADER: &str = "X-A2A-Extensions";

/// Parse requested extension URIs out of header values.
///
/// Each value may itself be a comma-separated list; whitespace is trimmed
/// and empty entries dropped.
pub fn get_requested_extensions<I, S>(values: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .flat_map(|v| {
            v.as_ref()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Look up a declared extension by URI in an agent card.
pub fn find_extension_by_uri<'a>(card: &'a AgentCard, uri: &str) -> Option<&'a AgentExtension> {
    card.capabilities
        .extensions
        .as_ref()?
        .iter()
        .find(|ext| ext.uri == uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_values_are_split_and_trimmed() {
        let got = get_requested_extensions(["foo, bar", "baz", " ", ""]);
        let want: HashSet<String> = ["foo", "bar", "baz"].iter().map(|s| s.to_string()).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn duplicate_uris_collapse() {
        let got = get_requested_extensions(["a,a", "a"]);
        assert_eq!(got.len(), 1);
    }
}
