//! Index-token scanning (`@/<n>/@`).

use super::types::NodeId;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub(crate) static INDEX_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@/(\d+)/@").expect("index token pattern"));

static SINGLE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@/(\d+)/@$").expect("single token pattern"));

/// Every distinct index referenced by `context`, in order of first appearance.
/// Tokens whose number does not fit a `NodeId` are skipped.
pub fn references(context: &str) -> Vec<NodeId> {
    let mut found = Vec::new();
    for caps in INDEX_TOKEN.captures_iter(context) {
        if let Ok(n) = caps[1].parse::<u32>() {
            let id = NodeId(n);
            if !found.contains(&id) {
                found.push(id);
            }
        }
    }
    found
}

/// The raw text of every token number, including ones that overflow `u32`.
pub fn raw_references(context: &str) -> Vec<String> {
    INDEX_TOKEN.captures_iter(context).map(|c| c[1].to_string()).collect()
}

/// `Some(id)` when the whole text is exactly one index token.
pub fn single(text: &str) -> Option<NodeId> {
    SINGLE_TOKEN
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok())
        .map(NodeId)
}

/// Rewrites every token through `map`.
pub fn remap(context: &str, mut map: impl FnMut(NodeId) -> NodeId) -> String {
    INDEX_TOKEN
        .replace_all(context, |caps: &Captures| match caps[1].parse::<u32>() {
            Ok(n) => map(NodeId(n)).token(),
            Err(_) => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_references_are_distinct_and_ordered() {
        let refs = references("@/3/@-@/12/@@/3/@\\pm@/0/@");
        assert_eq!(refs, vec![NodeId(3), NodeId(12), NodeId(0)]);
    }

    #[test]
    fn test_single_token() {
        assert_eq!(single("@/7/@"), Some(NodeId(7)));
        assert_eq!(single("@/7/@@/1/@"), None);
        assert_eq!(single("7"), None);
    }

    #[test]
    fn test_remap() {
        let out = remap("\\frac@/3/@@/4/@", |id| NodeId(id.0 * 10));
        assert_eq!(out, "\\frac@/30/@@/40/@");
    }
}
