//! Association queries - brand x period lookups over the period store
//!
//! Every brand operation first checks the id against the registry. Absence of
//! data is never an error here: a period nobody built, a document with no row
//! for the brand and a missing index all read as "no data".

use chrono::Utc;
use futures_util::future::try_join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::core::document::PeriodIndex;
use crate::core::matcher;
use crate::core::period::PeriodKey;
use crate::core::registry::{Brand, BrandId, Registry};
use crate::metrics::MetricRecord;
use crate::store::{PeriodStore, StoreError};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("brand not found in registry: {0}")]
    EntityNotFound(BrandId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A brand with its measurements for every period that has them
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityWithHistory {
    pub entity: Brand,
    /// Only periods with a record; never padded
    pub metrics_by_period: BTreeMap<PeriodKey, MetricRecord>,
    pub available_periods: Vec<PeriodKey>,
    pub latest_period: Option<PeriodKey>,
}

impl EntityWithHistory {
    pub fn latest(&self) -> Option<&MetricRecord> {
        self.latest_period
            .as_ref()
            .and_then(|p| self.metrics_by_period.get(p))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub entity_id: BrandId,
    pub total_periods_in_system: usize,
    pub periods_with_data: usize,
    pub available_periods: Vec<PeriodKey>,
    /// 0 to 100, and 0 when no periods exist
    pub coverage_percent: f64,
    pub earliest_period: Option<PeriodKey>,
    pub latest_period: Option<PeriodKey>,
}

/// Query facade over a registry and a period store
#[derive(Clone)]
pub struct BrandQuery {
    registry: Arc<Registry>,
    store: PeriodStore,
}

impl BrandQuery {
    pub fn new(registry: Arc<Registry>, store: PeriodStore) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &PeriodStore {
        &self.store
    }

    /// Look a brand up by id, falling back to an exact name match
    pub fn find_brand(&self, id_or_name: &str) -> Option<&Brand> {
        self.registry
            .get(&BrandId::new(id_or_name.trim()))
            .or_else(|| self.find_entity_by_name(id_or_name))
    }

    /// First registry entry whose normalized name matches
    pub fn find_entity_by_name(&self, name: &str) -> Option<&Brand> {
        matcher::find(self.registry.iter(), name)
    }

    fn resolve(&self, id: &BrandId) -> Result<&Brand, QueryError> {
        self.registry
            .get(id)
            .ok_or_else(|| QueryError::EntityNotFound(id.clone()))
    }

    /// The period index, or an empty one before the first build
    async fn index(&self) -> Result<Arc<PeriodIndex>, QueryError> {
        match self.store.load_index().await {
            Ok(index) => Ok(index),
            Err(e) if e.is_not_found() => {
                tracing::debug!(source = %self.store.describe(), "no period index; treating as empty");
                Ok(Arc::new(PeriodIndex::new(BTreeMap::new(), Utc::now())))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Metrics for every period with data, optionally restricted to `periods`
    pub async fn get_history(
        &self,
        id: &BrandId,
        periods: Option<&[PeriodKey]>,
    ) -> Result<EntityWithHistory, QueryError> {
        let entity = self.resolve(id)?.clone();
        let index = self.index().await?;

        let wanted: Vec<PeriodKey> = match periods {
            None => index.periods.clone(),
            Some(requested) => {
                let mut keys: Vec<PeriodKey> = requested
                    .iter()
                    .map(|p| PeriodKey::normalize(p.as_str()))
                    .filter(|p| index.contains(p))
                    .collect();
                keys.sort();
                keys.dedup();
                keys
            }
        };

        // An indexed period whose document is gone reads as no data
        let loads = wanted.into_iter().map(|key| async move {
            match self.store.load_period(&key).await {
                Ok(doc) => Ok(Some((key, doc))),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(period = %key, "indexed period has no document");
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        });
        let metrics_by_period: BTreeMap<PeriodKey, MetricRecord> = try_join_all(loads)
            .await?
            .into_iter()
            .flatten()
            .filter_map(|(key, doc)| doc.record_for(id).map(|r| (key, r.metrics.clone())))
            .collect();

        let available_periods: Vec<PeriodKey> = metrics_by_period.keys().cloned().collect();
        let latest_period = available_periods.last().cloned();

        Ok(EntityWithHistory {
            entity,
            metrics_by_period,
            available_periods,
            latest_period,
        })
    }

    /// One brand's metrics in one period, `None` when there is no data
    pub async fn get_metrics_for_period(
        &self,
        id: &BrandId,
        period: &PeriodKey,
    ) -> Result<Option<MetricRecord>, QueryError> {
        self.resolve(id)?;
        let period = PeriodKey::normalize(period.as_str());
        if !self.index().await?.contains(&period) {
            return Ok(None);
        }

        match self.store.load_period(&period).await {
            Ok(doc) => Ok(doc.record_for(id).map(|r| r.metrics.clone())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Sorted periods in which the brand has a record
    pub async fn get_available_periods(&self, id: &BrandId) -> Result<Vec<PeriodKey>, QueryError> {
        Ok(self.get_history(id, None).await?.available_periods)
    }

    pub async fn has_any_data(&self, id: &BrandId) -> Result<bool, QueryError> {
        Ok(!self.get_available_periods(id).await?.is_empty())
    }

    /// Brand ids with a record in one period; loads only that document
    pub async fn get_entities_in_period(&self, period: &PeriodKey) -> Result<Vec<BrandId>, QueryError> {
        let period = PeriodKey::normalize(period.as_str());
        if !self.index().await?.contains(&period) {
            return Ok(Vec::new());
        }

        match self.store.load_period(&period).await {
            Ok(doc) => Ok(doc.entity_ids()),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Side-by-side metrics for the requested periods that have data
    ///
    /// Requested periods without data are simply absent from the result.
    pub async fn compare(
        &self,
        id: &BrandId,
        periods: &[PeriodKey],
    ) -> Result<BTreeMap<PeriodKey, MetricRecord>, QueryError> {
        Ok(self.get_history(id, Some(periods)).await?.metrics_by_period)
    }

    /// How many of the system's periods carry data for the brand
    pub async fn get_coverage(&self, id: &BrandId) -> Result<CoverageReport, QueryError> {
        let history = self.get_history(id, None).await?;
        let total_periods_in_system = self.index().await?.len();
        let periods_with_data = history.available_periods.len();

        let coverage_percent = if total_periods_in_system == 0 {
            0.0
        } else {
            periods_with_data as f64 / total_periods_in_system as f64 * 100.0
        };

        Ok(CoverageReport {
            entity_id: id.clone(),
            total_periods_in_system,
            periods_with_data,
            earliest_period: history.available_periods.first().cloned(),
            latest_period: history.latest_period,
            available_periods: history.available_periods,
            coverage_percent,
        })
    }
}
