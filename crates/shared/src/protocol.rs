use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{ItemId, ReviewDecision, ReviewStatus, UserId};

/// Entity-agnostic projection of a reviewable record.
///
/// Kind-specific fields (title, file url, department, ...) ride along in `fields`
/// untouched so a presentation layer can still render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewableItem {
    #[serde(alias = "_id")]
    pub id: ItemId,
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ReviewableItem {
    pub fn new(id: impl Into<ItemId>, status: ReviewStatus) -> Self {
        Self {
            id: id.into(),
            status,
            reviewed_by: None,
            reviewed_at: None,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub total_pages: u32,
}

/// List envelope: `{ data: [...], pagination: { total, totalPages } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQuery {
    pub status: ReviewStatus,
    pub page: u32,
    pub limit: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountsQuery {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub action: ReviewDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviewable_item_keeps_kind_specific_fields() {
        let raw = r#"{
            "_id": "m-1",
            "status": "PENDING",
            "title": "Linear Algebra notes",
            "semester": 3
        }"#;
        let item: ReviewableItem = serde_json::from_str(raw).expect("decode");
        assert_eq!(item.id, ItemId::new("m-1"));
        assert_eq!(item.status, ReviewStatus::Pending);
        assert_eq!(item.reviewed_by, None);
        assert_eq!(item.fields.get("title"), Some(&Value::from("Linear Algebra notes")));
        assert_eq!(item.fields.get("semester"), Some(&Value::from(3)));
    }

    #[test]
    fn list_envelope_reads_camel_case_pagination() {
        let raw = r#"{"data":[],"pagination":{"total":41,"totalPages":5}}"#;
        let page: Paginated<ReviewableItem> = serde_json::from_str(raw).expect("decode");
        assert_eq!(
            page.pagination,
            Pagination {
                total: 41,
                total_pages: 5
            }
        );
    }

    #[test]
    fn review_request_omits_missing_comment() {
        let body = ReviewRequest {
            action: ReviewDecision::Rejected,
            comment: None,
        };
        assert_eq!(
            serde_json::to_string(&body).expect("encode"),
            r#"{"action":"REJECTED"}"#
        );
    }
}
