//! Client-side filters for facade listings.
//!
//! These run against already-fetched data; nothing here is pushed into a
//! remote query.

use serde::{Deserialize, Serialize};

use crate::models::{AppliedModel, JobModelRun};

/// What a [`SearchFilter`] or [`ModelFilter`] can look at.
pub trait Filterable {
    fn name(&self) -> &str;
    fn unique_id(&self) -> &str;
    fn tags(&self) -> &[String];
    fn materialization(&self) -> Option<&str>;
    /// Seconds of the most recent execution.
    fn runtime(&self) -> Option<f64>;
}

impl Filterable for AppliedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn materialization(&self) -> Option<&str> {
        self.materialized_type.as_deref()
    }

    fn runtime(&self) -> Option<f64> {
        self.execution_time()
    }
}

impl Filterable for JobModelRun {
    fn name(&self) -> &str {
        &self.name
    }

    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn materialization(&self) -> Option<&str> {
        self.materialized_type.as_deref()
    }

    fn runtime(&self) -> Option<f64> {
        self.execution_time()
    }
}

/// AND of optional predicates over models.
///
/// - `tags`: match-any; empty means no constraint.
/// - `materialization`: exact match.
/// - `min_runtime` / `max_runtime`: inclusive bounds in seconds. A model
///   without a runtime fails any bound that is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub materialization: Option<String>,
    #[serde(default)]
    pub min_runtime: Option<f64>,
    #[serde(default)]
    pub max_runtime: Option<f64>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_materialization(mut self, materialization: impl Into<String>) -> Self {
        self.materialization = Some(materialization.into());
        self
    }

    pub fn with_min_runtime(mut self, secs: f64) -> Self {
        self.min_runtime = Some(secs);
        self
    }

    pub fn with_max_runtime(mut self, secs: f64) -> Self {
        self.max_runtime = Some(secs);
        self
    }

    /// True when no predicate is set.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.materialization.is_none()
            && self.min_runtime.is_none()
            && self.max_runtime.is_none()
    }

    pub fn matches<T: Filterable + ?Sized>(&self, item: &T) -> bool {
        if !self.tags.is_empty() && !item.tags().iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        if let Some(wanted) = &self.materialization
            && item.materialization() != Some(wanted.as_str())
        {
            return false;
        }
        if self.min_runtime.is_none() && self.max_runtime.is_none() {
            return true;
        }
        let Some(runtime) = item.runtime() else {
            return false;
        };
        self.min_runtime.is_none_or(|min| runtime >= min)
            && self.max_runtime.is_none_or(|max| runtime <= max)
    }

    /// Keep the matching items, in order.
    pub fn apply<T: Filterable>(&self, items: Vec<T>) -> Vec<T> {
        if self.is_empty() {
            return items;
        }
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}

/// Apply an optional filter.
pub(crate) fn filter_by<T: Filterable>(items: Vec<T>, filter: Option<&SearchFilter>) -> Vec<T> {
    match filter {
        Some(filter) => filter.apply(items),
        None => items,
    }
}

/// Selects models by identity.
///
/// `search` is a case-insensitive substring of the model name. `model_ids`
/// match either the unique id or the plain name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub model_ids: Vec<String>,
}

impl ModelFilter {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            model_ids: Vec::new(),
        }
    }

    pub fn with_model_id(mut self, id: impl Into<String>) -> Self {
        self.model_ids.push(id.into());
        self
    }

    pub fn matches<T: Filterable + ?Sized>(&self, item: &T) -> bool {
        if let Some(needle) = &self.search
            && !contains_ignore_case(item.name(), needle)
        {
            return false;
        }
        self.model_ids.is_empty()
            || self
                .model_ids
                .iter()
                .any(|id| id == item.unique_id() || id == item.name())
    }
}

/// Whether `environment_ids` lists the projects to keep or to drop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Include,
    Exclude,
}

/// Selects configured projects by name and environment id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFilter {
    /// Case-insensitive substring of the project name.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub environment_ids: Vec<i64>,
    #[serde(default)]
    pub mode: FilterMode,
}

impl ProjectFilter {
    pub fn include(environment_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            search: None,
            environment_ids: environment_ids.into_iter().collect(),
            mode: FilterMode::Include,
        }
    }

    pub fn exclude(environment_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            mode: FilterMode::Exclude,
            ..Self::include(environment_ids)
        }
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// An empty id list places no constraint in either mode.
    pub fn matches(&self, name: &str, environment_id: i64) -> bool {
        if let Some(needle) = &self.search
            && !contains_ignore_case(name, needle)
        {
            return false;
        }
        if self.environment_ids.is_empty() {
            return true;
        }
        let listed = self.environment_ids.contains(&environment_id);
        match self.mode {
            FilterMode::Include => listed,
            FilterMode::Exclude => !listed,
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
