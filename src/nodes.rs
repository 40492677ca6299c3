use crate::paste::split_value;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Built-in Tana supertag that marks a schema node as a field definition.
pub const FIELD_DEFINITION_TAG: &str = "SYS_T02";
/// Built-in Tana supertag that marks a schema node as a supertag definition.
pub const SUPERTAG_DEFINITION_TAG: &str = "SYS_T01";

/// Column position to remote field id. Keyed by position so repeated headers stay distinct.
pub type FieldMap = BTreeMap<usize, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupertagRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameNode {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "field")]
pub struct FieldNode {
    #[serde(rename = "attributeId")]
    pub attribute_id: String,
    pub children: Vec<NameNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiNode {
    pub name: String,
    pub supertags: Vec<SupertagRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldNode>,
}

impl ApiNode {
    /// A childless node carrying one supertag, as used for schema creation.
    pub fn tagged(name: impl Into<String>, supertag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertags: vec![SupertagRef { id: supertag.into() }],
            children: Vec::new(),
        }
    }
}

fn field_children(value: &str, delimiter: Option<&str>) -> Vec<NameNode> {
    match split_value(value, delimiter) {
        Some(pieces) => pieces
            .into_iter()
            .filter(|p| !p.is_empty())
            .map(|p| NameNode { name: p.to_string() })
            .collect(),
        None => {
            let v = value.trim();
            if v.is_empty() {
                Vec::new()
            } else {
                vec![NameNode { name: v.to_string() }]
            }
        }
    }
}

/// One node per row, in row order.
pub fn build_nodes(table: &Table, supertag_id: &str, fields: &FieldMap, delimiter: Option<&str>) -> Vec<ApiNode> {
    table
        .rows()
        .iter()
        .map(|row| {
            let name = row[0].as_text().map(str::trim).unwrap_or("");
            let mut node = ApiNode::tagged(name, supertag_id);
            for (idx, _) in table.field_columns() {
                let Some(attribute_id) = fields.get(&idx) else { continue };
                let Some(value) = row[idx].as_text() else { continue };
                let children = field_children(value, delimiter);
                if !children.is_empty() {
                    node.children.push(FieldNode { attribute_id: attribute_id.clone(), children });
                }
            }
            node
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_csv;

    fn field_map(pairs: &[(usize, &str)]) -> FieldMap {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn builds_one_node_per_row() {
        let t = parse_csv("Name,Tags,Note\n Alice ,\"x, y,\",  hi \nBob,,\n").unwrap();
        let fields = field_map(&[(1, "F1"), (2, "F2")]);
        let nodes = build_nodes(&t, "ST", &fields, Some(","));
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].name, "Alice");
        assert_eq!(nodes[0].supertags, vec![SupertagRef { id: "ST".into() }]);
        assert_eq!(nodes[0].children.len(), 2);
        assert_eq!(nodes[0].children[0].attribute_id, "F1");
        let names: Vec<_> = nodes[0].children[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(nodes[0].children[1].children, vec![NameNode { name: "hi".into() }]);
        assert_eq!(nodes[1].name, "Bob");
        assert!(nodes[1].children.is_empty());
    }

    #[test]
    fn unmapped_and_blank_columns_are_skipped() {
        let t = parse_csv("Name,A,B,C\nn,1,2,\"  \"\n").unwrap();
        let fields = field_map(&[(1, "FA"), (3, "FC")]);
        let nodes = build_nodes(&t, "ST", &fields, None);
        assert_eq!(nodes[0].children.len(), 1);
        assert_eq!(nodes[0].children[0].attribute_id, "FA");
    }

    #[test]
    fn all_empty_pieces_contribute_nothing() {
        let t = parse_csv("Name,A\nn,\" , ,\"\n").unwrap();
        let nodes = build_nodes(&t, "ST", &field_map(&[(1, "FA")]), Some(","));
        assert!(nodes[0].children.is_empty());
    }

    #[test]
    fn missing_tag_gives_empty_name() {
        let t = parse_csv("Name,A\n,v\n").unwrap();
        let nodes = build_nodes(&t, "ST", &field_map(&[(1, "FA")]), None);
        assert_eq!(nodes[0].name, "");
    }

    #[test]
    fn serializes_in_api_shape() {
        let node = ApiNode {
            name: "Alice".into(),
            supertags: vec![SupertagRef { id: "ST".into() }],
            children: vec![FieldNode { attribute_id: "F1".into(), children: vec![NameNode { name: "x".into() }] }],
        };
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Alice","supertags":[{"id":"ST"}],"children":[{"type":"field","attributeId":"F1","children":[{"name":"x"}]}]}"#
        );
        let schema = serde_json::to_string(&ApiNode::tagged("Tags", FIELD_DEFINITION_TAG)).unwrap();
        assert_eq!(schema, r#"{"name":"Tags","supertags":[{"id":"SYS_T02"}]}"#);
    }
}
