//! Model listing and history methods for [`DiscoveryClient`].
//!
//! # What this module handles:
//! - Single pages and cursor-following listings of applied and definition models
//! - Lookup of one applied model by name
//! - Historical runs of one model
//!
//! # What this module does NOT handle:
//! - Batched history lookups (see `batch`)
//! - Client-side search filters (see `crate::api::filters`)

use dbt_discovery_config::constants::DEFAULT_MODEL_PAGE_SIZE;
use tracing::debug;

use crate::client::DiscoveryClient;
use crate::error::Result;
use crate::models::factory::{build, build_list};
use crate::models::{AppliedModel, ModelDefinition, ModelHistoricalRun};
use crate::normalize::{Page, PageInfo, flatten_connection};
use crate::query::{
    self, AppliedModelFilter, AppliedModelsRequest, DefinitionFilter, DefinitionModelsRequest,
    EnvironmentId, FieldSelection,
};

/// Upper bound on pages followed by one listing.
const MAX_PAGES: usize = 1_000;

impl DiscoveryClient {
    /// One page of applied models.
    ///
    /// The materialization part of the filter is applied to the returned page.
    pub async fn applied_models_page(
        &self,
        env: EnvironmentId,
        request: &AppliedModelsRequest,
    ) -> Result<Page<AppliedModel>> {
        let page = self.fetch_applied_page(env, request).await?;
        Ok(retain_materialized(page, &request.filter))
    }

    async fn fetch_applied_page(
        &self,
        env: EnvironmentId,
        request: &AppliedModelsRequest,
    ) -> Result<Page<AppliedModel>> {
        let query = query::applied_models(env, request)?;
        let node = self.execute(&query).await?;
        flatten_connection(node, &query.dotted_path())?.try_map(build::<AppliedModel>)
    }

    /// Applied models, following cursors until `limit` nodes were fetched or
    /// the connection is exhausted.
    pub async fn applied_models(
        &self,
        env: EnvironmentId,
        filter: &AppliedModelFilter,
        fields: &FieldSelection,
        limit: usize,
    ) -> Result<Vec<AppliedModel>> {
        let mut request = AppliedModelsRequest {
            first: page_size(limit, 0),
            after: None,
            filter: filter.clone(),
            fields: *fields,
        };
        let mut models = Vec::new();
        let mut fetched = 0;

        for _ in 0..MAX_PAGES {
            let page = self.fetch_applied_page(env, &request).await?;
            fetched += page.nodes.len();
            let next = continuation(&page.page_info, fetched, limit);
            models.extend(retain_materialized(page, filter).nodes);

            let Some(cursor) = next else { break };
            debug!(environment_id = %env, fetched, "Following applied models cursor");
            request.first = page_size(limit, fetched);
            request.after = Some(cursor);
        }
        models.truncate(limit);
        Ok(models)
    }

    /// One page of model definitions.
    pub async fn definition_models_page(
        &self,
        env: EnvironmentId,
        request: &DefinitionModelsRequest,
    ) -> Result<Page<ModelDefinition>> {
        let query = query::definition_models(env, request)?;
        let node = self.execute(&query).await?;
        flatten_connection(node, &query.dotted_path())?.try_map(build::<ModelDefinition>)
    }

    /// Model definitions, following cursors up to `limit`.
    pub async fn definition_models(
        &self,
        env: EnvironmentId,
        filter: &DefinitionFilter,
        fields: &FieldSelection,
        limit: usize,
    ) -> Result<Vec<ModelDefinition>> {
        filter.validate()?;
        let mut request = DefinitionModelsRequest {
            first: page_size(limit, 0),
            after: None,
            filter: filter.clone(),
            fields: *fields,
        };
        let mut models = Vec::new();

        for _ in 0..MAX_PAGES {
            let page = self.definition_models_page(env, &request).await?;
            models.extend(page.nodes);

            let Some(cursor) = continuation(&page.page_info, models.len(), limit) else {
                break;
            };
            request.first = page_size(limit, models.len());
            request.after = Some(cursor);
        }
        models.truncate(limit);
        Ok(models)
    }

    /// One applied model by exact name, or `None`.
    pub async fn applied_model_by_name(
        &self,
        env: EnvironmentId,
        name: &str,
    ) -> Result<Option<AppliedModel>> {
        let request = AppliedModelsRequest {
            first: 10,
            filter: AppliedModelFilter::new().with_identifier(name),
            ..AppliedModelsRequest::default()
        };
        let page = self.applied_models_page(env, &request).await?;
        Ok(page.nodes.into_iter().find(|m| m.name == name))
    }

    /// Last `count` runs of one model, most recent first.
    pub async fn model_historical_runs(
        &self,
        env: EnvironmentId,
        name: &str,
        count: usize,
        fields: &FieldSelection,
    ) -> Result<Vec<ModelHistoricalRun>> {
        let query = query::model_historical_runs(env, name, count, fields)?;
        let node = self.execute(&query).await?;
        build_list(node, &query.dotted_path())
    }
}

fn page_size(limit: usize, fetched: usize) -> usize {
    limit.saturating_sub(fetched).clamp(1, DEFAULT_MODEL_PAGE_SIZE)
}

/// Cursor of the next page, if another page is needed.
fn continuation(info: &PageInfo, fetched: usize, limit: usize) -> Option<String> {
    if !info.has_next_page || fetched >= limit {
        return None;
    }
    info.end_cursor.clone()
}

fn retain_materialized(page: Page<AppliedModel>, filter: &AppliedModelFilter) -> Page<AppliedModel> {
    if filter.materialized_type.is_none() {
        return page;
    }
    let Page {
        nodes,
        page_info,
        cursors,
    } = page;
    let (nodes, cursors) = nodes
        .into_iter()
        .zip(cursors)
        .filter(|(node, _)| filter.matches_materialization(node.materialized_type.as_deref()))
        .unzip();
    Page {
        nodes,
        page_info,
        cursors,
    }
}
