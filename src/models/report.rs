use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_target", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportTargetKind {
    Post,
    User,
    Comment,
}

impl ReportTargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportTargetKind::Post => "POST",
            ReportTargetKind::User => "USER",
            ReportTargetKind::Comment => "COMMENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub target_kind: ReportTargetKind,
    pub target_id: Uuid,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Reported content resolved per target kind; each variant carries the
/// concrete fields of its target, no untyped payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum ReportedContent {
    Post {
        id: Uuid,
        author_id: Uuid,
        content: String,
        is_deleted: bool,
    },
    User {
        id: Uuid,
        nickname: String,
        status: AccountStatus,
    },
    Comment {
        id: Uuid,
        post_id: Uuid,
        content: String,
        is_deleted: bool,
    },
}

/// Admin-queue row: the report plus its resolved target (None when the
/// target row has since vanished).
#[derive(Debug, Clone, Serialize)]
pub struct ReportWithTarget {
    #[serde(flatten)]
    pub report: Report,
    pub target: Option<ReportedContent>,
}
