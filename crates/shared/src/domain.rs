use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(ItemId);
id_newtype!(UserId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what} '{value}'")]
pub struct ParseDomainError {
    pub what: &'static str,
    pub value: String,
}

impl ParseDomainError {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}

/// Approval lifecycle shared by every reviewable content kind.
///
/// `Pending` is the only initial value. The console offers no transition out of
/// `Approved`/`Rejected`, but the server may re-open an item at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 3] = [
        ReviewStatus::Pending,
        ReviewStatus::Approved,
        ReviewStatus::Rejected,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ReviewStatus {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            _ => Err(ParseDomainError::new("review status", s)),
        }
    }
}

/// Outcome a reviewer may submit. Deliberately excludes `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn status(self) -> ReviewStatus {
        match self {
            ReviewDecision::Approved => ReviewStatus::Approved,
            ReviewDecision::Rejected => ReviewStatus::Rejected,
        }
    }
}

impl From<ReviewDecision> for ReviewStatus {
    fn from(value: ReviewDecision) -> Self {
        value.status()
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status().slug())
    }
}

/// Caller capability. Only consulted by callers; the console itself is identity-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    Moderator,
}

impl Role {
    pub fn can_review(self) -> bool {
        matches!(self, Role::Admin | Role::Moderator)
    }

    pub fn can_remove(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "moderator" | "reviewer" => Ok(Role::Moderator),
            _ => Err(ParseDomainError::new("role", s)),
        }
    }
}

/// The six content kinds that share the review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    StudyMaterial,
    BlogPost,
    Course,
    DepartmentCourse,
    Advertisement,
    ModeratorApplication,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        ContentKind::StudyMaterial,
        ContentKind::BlogPost,
        ContentKind::Course,
        ContentKind::DepartmentCourse,
        ContentKind::Advertisement,
        ContentKind::ModeratorApplication,
    ];

    /// REST collection path segment; also the CLI slug.
    pub fn collection(self) -> &'static str {
        match self {
            ContentKind::StudyMaterial => "materials",
            ContentKind::BlogPost => "blogs",
            ContentKind::Course => "courses",
            ContentKind::DepartmentCourse => "department-courses",
            ContentKind::Advertisement => "ads",
            ContentKind::ModeratorApplication => "moderator-applications",
        }
    }

    /// Whether the backend exposes `<collection>/counts` for this kind.
    pub fn has_count_endpoint(self) -> bool {
        matches!(
            self,
            ContentKind::StudyMaterial | ContentKind::Course | ContentKind::ModeratorApplication
        )
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

impl FromStr for ContentKind {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ContentKind::ALL
            .into_iter()
            .find(|kind| kind.collection() == wanted)
            .ok_or_else(|| ParseDomainError::new("content kind", s))
    }
}

/// Per-status counters for one search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

impl StatusCounts {
    pub fn new(pending: u64, approved: u64, rejected: u64) -> Self {
        Self {
            pending,
            approved,
            rejected,
        }
    }

    pub fn get(&self, status: ReviewStatus) -> u64 {
        match status {
            ReviewStatus::Pending => self.pending,
            ReviewStatus::Approved => self.approved,
            ReviewStatus::Rejected => self.rejected,
        }
    }

    fn slot(&mut self, status: ReviewStatus) -> &mut u64 {
        match status {
            ReviewStatus::Pending => &mut self.pending,
            ReviewStatus::Approved => &mut self.approved,
            ReviewStatus::Rejected => &mut self.rejected,
        }
    }

    pub fn increment(&mut self, status: ReviewStatus) {
        *self.slot(status) += 1;
    }

    /// Returns false, leaving the counter untouched, when it is already zero.
    pub fn decrement(&mut self, status: ReviewStatus) -> bool {
        let slot = self.slot(status);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    pub fn total(&self) -> u64 {
        self.pending + self.approved + self.rejected
    }
}
