//! Option-list loading for lookup steps.
//!
//! Each lookup step fetches one page of options plus the collection's
//! `OPTIONS` metadata. A step's fetch is issued once per distinct query;
//! issuing a different query for the same step supersedes the previous one.
//! Every fetch carries the generation it was issued under, and results whose
//! generation is no longer current, or that arrive after the wizard closed,
//! are dropped.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::try_join;
use launchdeck_api::ControllerClient;
use launchdeck_types::{ListResponse, LookupData, OptionsResponse, ResourceKind};
use serde_json::Value;
use tracing::debug;

use crate::error::ContentError;
use crate::steps::StepId;

/// Read access to option collections.
#[async_trait]
pub trait OptionSource: Send + Sync {
    async fn read(&self, kind: ResourceKind, params: &[(String, String)]) -> Result<ListResponse<Value>>;

    async fn read_options(&self, kind: ResourceKind) -> Result<OptionsResponse>;
}

#[async_trait]
impl OptionSource for ControllerClient {
    async fn read(&self, kind: ResourceKind, params: &[(String, String)]) -> Result<ListResponse<Value>> {
        self.read_list(kind, params).await
    }

    async fn read_options(&self, kind: ResourceKind) -> Result<OptionsResponse> {
        ControllerClient::read_options(self, kind).await
    }
}

/// Collection and query parameters a step wants loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionQuery {
    pub kind: ResourceKind,
    pub params: Vec<(String, String)>,
}

impl OptionQuery {
    /// First page of `kind`, ordered by name.
    pub fn first_page(kind: ResourceKind, page_size: u32) -> Self {
        Self {
            kind,
            params: vec![
                ("order_by".to_string(), "name".to_string()),
                ("page".to_string(), "1".to_string()),
                ("page_size".to_string(), page_size.to_string()),
            ],
        }
    }

    /// Set `key`, replacing an existing value.
    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.params.iter_mut().find(|(existing, _)| existing == key) {
            Some(entry) => entry.1 = value,
            None => self.params.push((key.to_string(), value)),
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Loaded(LookupData),
    Failed(ContentError),
}

/// Handle for one issued fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub step: StepId,
    pub generation: u64,
    pub query: OptionQuery,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u64,
    query: OptionQuery,
    state: LoadState,
}

/// Tracks fetch generations and results per step.
#[derive(Debug, Default)]
pub struct OptionLoader {
    slots: HashMap<StepId, Slot>,
    closed: bool,
}

impl OptionLoader {
    /// Issue a fetch for `step` unless the same query was already issued.
    pub fn request(&mut self, step: StepId, query: OptionQuery) -> Option<FetchTicket> {
        if self.closed {
            return None;
        }
        let generation = match self.slots.get(&step) {
            Some(slot) if slot.query == query => {
                debug!(%step, generation = slot.generation, "fetch already issued for query");
                return None;
            }
            Some(slot) => slot.generation + 1,
            None => 1,
        };
        self.slots.insert(
            step,
            Slot {
                generation,
                query: query.clone(),
                state: LoadState::Loading,
            },
        );
        debug!(%step, generation, kind = %query.kind, "option fetch issued");
        Some(FetchTicket { step, generation, query })
    }

    /// Apply a fetch result. Returns false when the result was stale or the
    /// loader is closed, in which case nothing changes.
    pub fn complete(&mut self, ticket: &FetchTicket, result: Result<LookupData>) -> bool {
        if self.closed {
            debug!(step = %ticket.step, generation = ticket.generation, "dropping fetch result after close");
            return false;
        }
        let Some(slot) = self.slots.get_mut(&ticket.step) else {
            return false;
        };
        if slot.generation != ticket.generation {
            debug!(
                step = %ticket.step,
                stale = ticket.generation,
                current = slot.generation,
                "dropping stale fetch result"
            );
            return false;
        }
        slot.state = match result {
            Ok(data) => {
                debug!(step = %ticket.step, count = data.count, "option fetch completed");
                LoadState::Loaded(data)
            }
            Err(error) => LoadState::Failed(ContentError {
                step: ticket.step,
                message: format!("{:#}", error),
            }),
        };
        true
    }

    pub fn state(&self, step: StepId) -> Option<&LoadState> {
        self.slots.get(&step).map(|slot| &slot.state)
    }

    pub fn lookup(&self, step: StepId) -> Option<&LookupData> {
        match self.state(step) {
            Some(LoadState::Loaded(data)) => Some(data),
            _ => None,
        }
    }

    pub fn generation(&self, step: StepId) -> u64 {
        self.slots.get(&step).map(|slot| slot.generation).unwrap_or(0)
    }

    /// Stop accepting results. Used when the wizard closes.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Run the fetch described by `ticket` against `source`.
pub async fn fetch_lookup(source: &dyn OptionSource, ticket: &FetchTicket) -> Result<LookupData> {
    let (list, options) = try_join(
        source.read(ticket.query.kind, &ticket.query.params),
        source.read_options(ticket.query.kind),
    )
    .await?;
    Ok(LookupData::from_responses(list, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn data(count: u64) -> LookupData {
        LookupData {
            count,
            ..LookupData::default()
        }
    }

    #[test]
    fn same_query_is_not_reissued() {
        let mut loader = OptionLoader::default();
        let query = OptionQuery::first_page(ResourceKind::Inventories, 5);
        let ticket = loader.request(StepId::Inventory, query.clone()).expect("first fetch");
        assert_eq!(ticket.generation, 1);
        assert!(loader.request(StepId::Inventory, query).is_none());
        assert_eq!(loader.state(StepId::Inventory), Some(&LoadState::Loading));
    }

    #[test]
    fn superseded_result_is_dropped() {
        let mut loader = OptionLoader::default();
        let first = loader
            .request(StepId::Inventory, OptionQuery::first_page(ResourceKind::Inventories, 5))
            .expect("first fetch");
        let second = loader
            .request(
                StepId::Inventory,
                OptionQuery::first_page(ResourceKind::Inventories, 5).with_param("name__icontains", "prod"),
            )
            .expect("second fetch");

        assert!(loader.complete(&second, Ok(data(2))));
        assert!(!loader.complete(&first, Ok(data(40))));
        assert_eq!(loader.lookup(StepId::Inventory).map(|lookup| lookup.count), Some(2));
        assert_eq!(loader.generation(StepId::Inventory), 2);
    }

    #[test]
    fn results_after_close_are_ignored() {
        let mut loader = OptionLoader::default();
        let ticket = loader
            .request(StepId::InstanceGroups, OptionQuery::first_page(ResourceKind::InstanceGroups, 5))
            .expect("fetch");
        loader.close();
        assert!(!loader.complete(&ticket, Ok(data(1))));
        assert_eq!(loader.state(StepId::InstanceGroups), Some(&LoadState::Loading));
        assert!(
            loader
                .request(StepId::Inventory, OptionQuery::first_page(ResourceKind::Inventories, 5))
                .is_none()
        );
    }

    #[test]
    fn failures_become_content_errors() {
        let mut loader = OptionLoader::default();
        let ticket = loader
            .request(StepId::ExecutionEnvironment, OptionQuery::first_page(ResourceKind::ExecutionEnvironments, 5))
            .expect("fetch");
        assert!(loader.complete(&ticket, Err(anyhow!("503 Service Unavailable"))));
        match loader.state(StepId::ExecutionEnvironment) {
            Some(LoadState::Failed(error)) => {
                assert_eq!(error.step, StepId::ExecutionEnvironment);
                assert!(error.message.contains("503"));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn with_param_replaces_existing_values() {
        let query = OptionQuery::first_page(ResourceKind::Credentials, 5).with_param("page_size", "50");
        assert!(query.params.contains(&("page_size".to_string(), "50".to_string())));
        assert_eq!(query.params.len(), 3);
    }
}
