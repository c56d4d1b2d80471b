//! Destination tag lookup and selection.

use crate::config::LookupStrategy;
use crate::error::{Result, UploadError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationSuggestion {
    pub label: String,
    pub value: String,
}

/// How [`select_by`] arrived at its pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The label contains the query.
    Contains,
    /// Nothing contained the query; first entry of the first non-empty group.
    FirstAvailable,
}

/// Pick from ranked groups (highest priority first).
///
/// Only the first non-empty group is searched: its first entry whose label
/// contains `query` (case-sensitive) wins, otherwise its first entry. Lower
/// priority groups are never consulted. All groups empty gives `None`.
pub fn select_by<'a, T, F>(groups: &'a [Vec<T>], query: &str, label: F) -> Option<(&'a T, MatchKind)>
where
    F: Fn(&T) -> &str,
{
    let group = groups.iter().find(|group| !group.is_empty())?;
    group
        .iter()
        .find(|item| label(*item).contains(query))
        .map(|item| (item, MatchKind::Contains))
        .or_else(|| group.first().map(|item| (item, MatchKind::FirstAvailable)))
}

pub fn select<'a>(
    groups: &'a [Vec<DestinationSuggestion>],
    query: &str,
) -> Option<&'a DestinationSuggestion> {
    select_by(groups, query, |s| s.label.as_str()).map(|(item, _)| item)
}

/// Source of ranked destination suggestions.
#[async_trait]
pub trait DestinationSearch: Send + Sync {
    /// Suggestions for `query` using one lookup strategy. Failures degrade to
    /// an empty list.
    async fn search(&self, query: &str, strategy: &LookupStrategy) -> Vec<DestinationSuggestion>;
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<DestinationSuggestion>,
}

/// Queries the platform's search endpoint: `GET endpoint?q=<query>&...`.
#[derive(Clone)]
pub struct HttpDestinationSearch {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDestinationSearch {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn fetch(
        &self,
        query: &str,
        strategy: &LookupStrategy,
    ) -> std::result::Result<Vec<DestinationSuggestion>, reqwest::Error> {
        let mut params = vec![("q", query)];
        params.extend(strategy.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;
        let body: SearchResponse = response.json().await?;
        Ok(body.results)
    }
}

#[async_trait]
impl DestinationSearch for HttpDestinationSearch {
    async fn search(&self, query: &str, strategy: &LookupStrategy) -> Vec<DestinationSuggestion> {
        match self.fetch(query, strategy).await {
            Ok(results) => {
                tracing::debug!(query, strategy = %strategy.name, results = results.len(), "Destination search");
                results
            }
            Err(e) => {
                tracing::warn!(query, strategy = %strategy.name, error = %e, "Destination search failed");
                Vec::new()
            }
        }
    }
}

#[derive(Clone)]
pub struct DestinationResolver {
    search: Arc<dyn DestinationSearch>,
    strategies: Vec<LookupStrategy>,
}

impl DestinationResolver {
    pub fn new(search: Arc<dyn DestinationSearch>, strategies: Vec<LookupStrategy>) -> Self {
        Self { search, strategies }
    }

    /// One suggestion group per lookup strategy, in strategy order.
    pub async fn search(&self, query: &str) -> Vec<Vec<DestinationSuggestion>> {
        let mut groups = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            groups.push(self.search.search(query, strategy).await);
        }
        groups
    }

    pub async fn resolve(&self, query: &str) -> Result<DestinationSuggestion> {
        let groups = self.search(query).await;
        select(&groups, query)
            .cloned()
            .ok_or_else(|| UploadError::DestinationUnresolved(query.to_string()))
    }
}
