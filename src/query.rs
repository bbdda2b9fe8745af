//! Query interpretation for resource listing
//!
//! Turns the raw `category` / `urgency` / `search` parameters of a list
//! request into a [`QueryFilter`] and the message shown alongside the
//! results. Dropdown filters always take precedence over a category the
//! classifier derives from free text.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::Classifier;
use crate::error::Result;
use crate::resource::{Category, Resource, Urgency};

/// Raw list parameters as they arrive on the query string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_urgency(mut self, urgency: impl Into<String>) -> Self {
        self.urgency = Some(urgency.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }
}

/// Document filter handed to the store.
///
/// Category and urgency are carried verbatim; the store rejects values
/// outside the enums when it resolves the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    /// Exact category match
    pub category: Option<String>,
    /// Exact urgency match
    pub urgency: Option<String>,
    /// Case-insensitive substring over title or description
    pub text: Option<String>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_urgency(mut self, urgency: impl Into<String>) -> Self {
        self.urgency = Some(urgency.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Whether this filter matches everything
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.urgency.is_none() && self.text.is_none()
    }

    /// Validate enum values and build a matcher
    pub fn resolve(&self) -> Result<ResourceMatcher> {
        Ok(ResourceMatcher {
            category: self.category.as_deref().map(Category::from_str).transpose()?,
            urgency: self.urgency.as_deref().map(Urgency::from_str).transpose()?,
            text: self.text.as_ref().map(|t| t.to_lowercase()),
        })
    }
}

/// A validated [`QueryFilter`]
#[derive(Debug, Clone, Default)]
pub struct ResourceMatcher {
    category: Option<Category>,
    urgency: Option<Urgency>,
    text: Option<String>,
}

impl ResourceMatcher {
    pub fn matches(&self, resource: &Resource) -> bool {
        if let Some(category) = self.category {
            if resource.category != category {
                return false;
            }
        }

        if let Some(urgency) = self.urgency {
            if resource.urgency != urgency {
                return false;
            }
        }

        if let Some(ref text) = self.text {
            if !resource.mentions(text) {
                return false;
            }
        }

        true
    }
}

/// Resolved filter plus the message for the response envelope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpretedQuery {
    pub filter: QueryFilter,
    pub message: String,
}

/// Builds store filters from list parameters
pub struct QueryInterpreter {
    classifier: Arc<dyn Classifier>,
}

impl QueryInterpreter {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Name of the classifier in use
    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    /// Interpret list parameters. Only a non-blank `search` reaches the
    /// classifier, and only once the dropdown values are known to be valid.
    pub async fn interpret(&self, params: &ListParams) -> Result<InterpretedQuery> {
        let mut filter = QueryFilter::new();
        let mut message = String::new();

        if let Some(category) = present(&params.category) {
            filter.category = Some(category.to_string());
        }
        if let Some(urgency) = present(&params.urgency) {
            filter.urgency = Some(urgency.to_string());
        }
        filter.resolve()?;

        if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let result = self.classifier.classify(search).await;
            match result.category {
                Some(category) => {
                    if filter.category.is_none() {
                        filter.category = Some(category.to_string());
                    }
                }
                None => filter.text = Some(search.to_string()),
            }
            message = result.message;
        }

        debug!("Interpreted list params {:?} as {:?}", params, filter);
        Ok(InterpretedQuery { filter, message })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
