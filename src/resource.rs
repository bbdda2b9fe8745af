//! Resource data structures and core types
//!
//! A [`Resource`] is one catalogue entry: a titled, described link to a
//! mental-health service, tagged with a [`Category`] and an [`Urgency`].
//! Incoming attributes arrive as a [`ResourceDraft`] (create) or a
//! [`ResourcePatch`] (partial update) and are validated before they touch
//! the store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DirectoryError, Result};

/// Location used when a resource does not name one
pub const DEFAULT_LOCATION: &str = "Online";

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
    /// Generate a new random resource ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from a string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subject matter of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    #[default]
    General,
    Anxiety,
    Depression,
    Stress,
    Crisis,
}

impl Category {
    /// Every category, in display order
    pub const ALL: [Category; 5] = [
        Category::General,
        Category::Anxiety,
        Category::Depression,
        Category::Stress,
        Category::Crisis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Anxiety => "Anxiety",
            Self::Depression => "Depression",
            Self::Stress => "Stress",
            Self::Crisis => "Crisis",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                DirectoryError::Validation(format!(
                    "`{}` is not a valid category (expected one of: {})",
                    s,
                    join_names(Self::ALL.iter().map(Category::as_str))
                ))
            })
    }
}

/// Priority or severity of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Urgency {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Every urgency level, lowest first
    pub const ALL: [Urgency; 4] = [
        Urgency::Low,
        Urgency::Medium,
        Urgency::High,
        Urgency::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| {
                DirectoryError::Validation(format!(
                    "`{}` is not a valid urgency (expected one of: {})",
                    s,
                    join_names(Self::ALL.iter().map(Urgency::as_str))
                ))
            })
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

/// A catalogue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Unique identifier, assigned on creation
    pub id: ResourceId,

    pub title: String,

    pub description: String,

    /// External URL (not checked for reachability)
    pub link: String,

    /// Physical address, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default)]
    pub category: Category,

    #[serde(default)]
    pub urgency: Urgency,

    /// e.g. "Toronto", "Online"
    #[serde(default = "default_location")]
    pub location: String,

    /// When this resource was created; never changes afterwards
    pub created_at: DateTime<Utc>,
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

impl Resource {
    /// Case-insensitive substring match over title and description.
    /// `needle_lower` must already be lower-cased.
    pub fn mentions(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self.description.to_lowercase().contains(needle_lower)
    }
}

/// Attributes for creating a resource.
///
/// Enum fields are kept as raw text so that unknown values are rejected
/// with a validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ResourceDraft {
    /// Create a draft with the three required fields
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: Some(title.into()),
            description: Some(description.into()),
            link: Some(link.into()),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency.to_string());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Validate the draft and turn it into a stored resource
    pub fn into_resource(self, id: ResourceId, created_at: DateTime<Utc>) -> Result<Resource> {
        let title = required("title", self.title)?;
        let description = required("description", self.description)?;
        let link = required("link", self.link)?;
        let category = self
            .category
            .as_deref()
            .map(Category::from_str)
            .transpose()?
            .unwrap_or_default();
        let urgency = self
            .urgency
            .as_deref()
            .map(Urgency::from_str)
            .transpose()?
            .unwrap_or_default();

        Ok(Resource {
            id,
            title,
            description,
            link,
            address: self.address,
            category,
            urgency,
            location: self.location.unwrap_or_else(default_location),
            created_at,
        })
    }
}

/// Partial update: omitted fields keep their stored value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ResourcePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_urgency(mut self, urgency: impl Into<String>) -> Self {
        self.urgency = Some(urgency.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Merge the patch over `resource`. Nothing is written unless every
    /// provided field is valid; `id` and `created_at` are never touched.
    pub fn apply(self, resource: &mut Resource) -> Result<()> {
        let title = self.title.map(|t| required("title", Some(t))).transpose()?;
        let description = self
            .description
            .map(|d| required("description", Some(d)))
            .transpose()?;
        let link = self.link.map(|l| required("link", Some(l))).transpose()?;
        let category = self
            .category
            .as_deref()
            .map(Category::from_str)
            .transpose()?;
        let urgency = self
            .urgency
            .as_deref()
            .map(Urgency::from_str)
            .transpose()?;

        if let Some(title) = title {
            resource.title = title;
        }
        if let Some(description) = description {
            resource.description = description;
        }
        if let Some(link) = link {
            resource.link = link;
        }
        if let Some(address) = self.address {
            resource.address = Some(address);
        }
        if let Some(category) = category {
            resource.category = category;
        }
        if let Some(urgency) = urgency {
            resource.urgency = urgency;
        }
        if let Some(location) = self.location {
            resource.location = location;
        }

        Ok(())
    }
}

fn required(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DirectoryError::Validation(format!("`{}` is required", field))),
    }
}
