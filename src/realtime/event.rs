//! Row-change events delivered by the realtime feed.

use serde::{Deserialize, Serialize};

/// The subset of an edge row the feed carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
}

/// A change-feed event for one row.
///
/// Shaped like a `postgres_changes` payload: `eventType` is "INSERT",
/// "UPDATE" or "DELETE", `new`/`old` hold the row before and after.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeChange {
    #[serde(rename = "eventType", alias = "event", default)]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default)]
    pub table: String,
    #[serde(rename = "new", default, skip_serializing_if = "Option::is_none")]
    pub new_row: Option<EdgeRow>,
    #[serde(rename = "old", default, skip_serializing_if = "Option::is_none")]
    pub old_row: Option<EdgeRow>,
}

impl EdgeChange {
    /// An UPDATE on the edges table.
    pub fn update(new_row: EdgeRow, old_row: Option<EdgeRow>) -> Self {
        Self {
            event_type: "UPDATE".to_string(),
            schema: Some("public".to_string()),
            table: "edges".to_string(),
            new_row: Some(new_row),
            old_row,
        }
    }

    /// Whether this is an update of an edge row.
    pub fn is_edge_update(&self) -> bool {
        self.table == "edges" && self.event_type.eq_ignore_ascii_case("UPDATE")
    }

    /// The updated row, if this update marks the pipe as isolated.
    pub fn isolated_edge(&self) -> Option<&EdgeRow> {
        if !self.is_edge_update() {
            return None;
        }
        self.new_row.as_ref().filter(|row| row.status == "isolated")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_postgres_change() {
        let json = r#"{
            "schema": "public",
            "table": "edges",
            "commit_timestamp": "2026-10-18T10:00:00Z",
            "eventType": "UPDATE",
            "new": {"id": "e7", "name": "P7", "status": "isolated", "material": "iron"},
            "old": {"id": "e7"},
            "errors": null
        }"#;

        let change: EdgeChange = serde_json::from_str(json).unwrap();
        assert!(change.is_edge_update());
        let row = change.isolated_edge().unwrap();
        assert_eq!(row.name, "P7");
    }

    #[test]
    fn test_non_isolating_changes() {
        let normal = EdgeChange::update(
            EdgeRow {
                id: "e1".into(),
                name: "P1".into(),
                status: "normal".into(),
            },
            None,
        );
        assert!(normal.isolated_edge().is_none());

        let mut insert = EdgeChange::update(
            EdgeRow {
                id: "e1".into(),
                name: "P1".into(),
                status: "isolated".into(),
            },
            None,
        );
        insert.event_type = "INSERT".into();
        assert!(insert.isolated_edge().is_none());

        let other_table: EdgeChange =
            serde_json::from_str(r#"{"event": "UPDATE", "table": "sensors", "new": {"status": "isolated"}}"#)
                .unwrap();
        assert!(other_table.isolated_edge().is_none());
    }
}
