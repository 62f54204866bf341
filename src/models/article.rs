//! Article models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{null_as_default, Id, NamedRef};
use super::user::join_name;

/// Editorial status of an article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    #[serde(alias = "DRAFT")]
    Draft,
    #[serde(alias = "PENDING")]
    Pending,
    #[serde(alias = "PUBLISHED")]
    Published,
    #[serde(alias = "REJECTED")]
    Rejected,
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Pending => write!(f, "pending"),
            Self::Published => write!(f, "published"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ArticleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "published" => Ok(Self::Published),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown article status: {}", s)),
        }
    }
}

/// Author projection carried on article summaries
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
}

impl Author {
    /// First and last name joined, empty components dropped
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }
}

/// Article as returned by list queries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub id: Id,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub excerpt: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: Author,
    #[serde(default)]
    pub category: Option<NamedRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<NamedRef>,
    pub status: ArticleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArticleSummary {
    pub fn has_tag(&self, tag_id: &Id) -> bool {
        self.tags.iter().any(|t| &t.id == tag_id)
    }

    pub fn in_category(&self, category_id: &Id) -> bool {
        self.category
            .as_ref()
            .map(|c| &c.id == category_id)
            .unwrap_or(false)
    }
}

/// Input for creating a draft
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleInput {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_ids: Vec<Id>,
}
