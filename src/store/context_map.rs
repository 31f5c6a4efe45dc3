use super::tokens;
use super::types::NodeId;
use crate::analysis::topology;
use crate::error::InvalidContextMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Index → context. Serializes as a JSON object keyed by decimal index strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextMap {
    entries: BTreeMap<u32, String>,
}

impl ContextMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: NodeId, context: impl Into<String>) {
        self.entries.insert(id.0, context.into());
    }

    pub fn get(&self, id: NodeId) -> Option<&str> {
        self.entries.get(&id.0).map(String::as_str)
    }

    pub fn root(&self) -> Option<&str> {
        self.get(NodeId::ROOT)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &str)> + '_ {
        self.entries.iter().map(|(&k, v)| (NodeId(k), v.as_str()))
    }

    /// Index of the entry whose context equals `text`, if any.
    pub fn find(&self, text: &str) -> Option<NodeId> {
        self.iter().find(|(_, ctx)| *ctx == text).map(|(id, _)| id)
    }

    /// Parses and validates a JSON object of `"index": "context"` pairs.
    pub fn from_json(json: &str) -> Result<Self, InvalidContextMap> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| InvalidContextMap::Json { reason: e.to_string() })?;
        let object = match value {
            Value::Null => return Err(InvalidContextMap::NotDefined),
            Value::Object(object) => object,
            other => return Err(InvalidContextMap::NotDict { found: json_kind(&other).to_string() }),
        };

        let mut map = Self::new();
        for (key, value) in object {
            let index = key.parse::<u32>().map_err(|_| InvalidContextMap::NotIntegerIndex { key: key.clone() })?;
            let Value::String(context) = value else {
                return Err(InvalidContextMap::NotContextString { index, found: json_kind(&value).to_string() });
            };
            map.entries.insert(index, context);
        }
        map.validate()?;
        Ok(map)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Shape contract: non-empty, has a root, every token resolves, no cycles.
    pub fn validate(&self) -> Result<(), InvalidContextMap> {
        if self.entries.is_empty() {
            return Err(InvalidContextMap::NotDefined);
        }
        if !self.entries.contains_key(&NodeId::ROOT.0) {
            return Err(InvalidContextMap::MissingRoot);
        }
        for (&index, context) in &self.entries {
            for token in tokens::raw_references(context) {
                let known = token.parse::<u32>().map_or(false, |n| self.entries.contains_key(&n));
                if !known {
                    return Err(InvalidContextMap::DanglingIndex { index, token });
                }
            }
        }
        topology::acyclic_order(self).map_err(|id| InvalidContextMap::Cycle { index: id.0 })?;
        Ok(())
    }

    /// Renumbers indices to `0..len` keeping their relative order, rewriting tokens to match.
    pub fn compact(self) -> Self {
        if self.entries.keys().copied().eq(0..self.entries.len() as u32) {
            return self;
        }
        let renumber: HashMap<u32, NodeId> =
            self.entries.keys().enumerate().map(|(i, &k)| (k, NodeId::new(i))).collect();
        let entries = self
            .entries
            .values()
            .enumerate()
            .map(|(i, ctx)| (i as u32, tokens::remap(ctx, |id| renumber.get(&id.0).copied().unwrap_or(id))))
            .collect();
        Self { entries }
    }
}

impl FromIterator<(u32, String)> for ContextMap {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl From<BTreeMap<u32, String>> for ContextMap {
    fn from(entries: BTreeMap<u32, String>) -> Self {
        Self { entries }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_json_round_trip_keeps_keys() {
        let map = ContextMap::from_json(r#"{"0": "\\frac@/1/@@/2/@", "1": "a", "2": "2"}"#).unwrap();
        assert_eq!(map.get(NodeId(1)), Some("a"));
        let json = map.to_json().unwrap();
        assert!(json.contains(r#""0":"\\frac@/1/@@/2/@""#), "{json}");
    }

    #[rstest]
    #[case("null", InvalidContextMap::NotDefined)]
    #[case("{}", InvalidContextMap::NotDefined)]
    #[case("[1, 2]", InvalidContextMap::NotDict { found: "an array".into() })]
    #[case(r#"{"x": "a"}"#, InvalidContextMap::NotIntegerIndex { key: "x".into() })]
    #[case(r#"{"-1": "a"}"#, InvalidContextMap::NotIntegerIndex { key: "-1".into() })]
    #[case(r#"{"0": 3}"#, InvalidContextMap::NotContextString { index: 0, found: "a number".into() })]
    #[case(r#"{"1": "a"}"#, InvalidContextMap::MissingRoot)]
    #[case(r#"{"0": "@/4/@+1"}"#, InvalidContextMap::DanglingIndex { index: 0, token: "4".into() })]
    #[case(r#"{"0": "@/1/@", "1": "@/2/@", "2": "@/1/@"}"#, InvalidContextMap::Cycle { index: 1 })]
    fn test_shape_violations(#[case] json: &str, #[case] expected: InvalidContextMap) {
        match (ContextMap::from_json(json), expected) {
            (Err(InvalidContextMap::Cycle { .. }), InvalidContextMap::Cycle { .. }) => {}
            (got, expected) => assert_eq!(got.unwrap_err(), expected),
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(ContextMap::from_json("{"), Err(InvalidContextMap::Json { .. })));
    }

    #[test]
    fn test_compact_renumbers_tokens() {
        let map: ContextMap = [(0, "@/5/@+@/9/@".to_string()), (5, "x".into()), (9, "\\sin@/5/@".into())]
            .into_iter()
            .collect();
        let dense = map.compact();
        assert_eq!(dense.root(), Some("@/1/@+@/2/@"));
        assert_eq!(dense.get(NodeId(2)), Some("\\sin@/1/@"));
    }
}
