use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a record in the source dataset.
///
/// Unique per dataset. Stable across rebuilds, unlike the arena keys
/// handed out by [`Tree`](crate::Tree).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the flat source dataset.
///
/// A record with no `parentId` is the root of its own tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub text: String,
}

impl Record {
    pub fn root(id: u64, text: impl Into<String>) -> Self {
        Self {
            id: NodeId(id),
            parent_id: None,
            text: text.into(),
        }
    }

    pub fn child(id: u64, parent: u64, text: impl Into<String>) -> Self {
        Self {
            id: NodeId(id),
            parent_id: Some(NodeId(parent)),
            text: text.into(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_format() {
        let json = r#"[
            {"id": 1, "parentId": null, "text": "Movies"},
            {"id": 2, "parentId": 1, "text": "Drama"},
            {"id": 3, "text": "Series"}
        ]"#;
        let records: Vec<Record> = serde_json::from_str(json).unwrap();

        assert_eq!(records.len(), 3);
        assert!(records[0].is_root());
        assert_eq!(records[1].parent_id, Some(NodeId(1)));
        assert!(records[2].is_root());
        assert_eq!(records[1].text, "Drama");
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let json = serde_json::to_string(&Record::child(7, 3, "Noir")).unwrap();
        assert!(json.contains("\"parentId\":3"));
    }
}
