//! Ticker-keyed store shared by every worker.
//!
//! One exclusive lock guards the whole map. Writers build the new record
//! outside the lock and only swap it in under the lock, so readers never see
//! a half-written record.

use crate::domain::{EventData, StockRecord};
use crate::pipeline::orchestrator::Job;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ticker {0} is not in the store")]
    UnknownTicker(String),

    #[error("failed to serialise store: {0}")]
    Serialise(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
pub struct SharedStore {
    records: Mutex<BTreeMap<String, StockRecord>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = StockRecord>,
    {
        Self {
            records: Mutex::new(
                records
                    .into_iter()
                    .map(|r| (r.ticker.clone(), r))
                    .collect(),
            ),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StockRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a record; returns the previous one.
    pub fn insert(&self, record: StockRecord) -> Option<StockRecord> {
        self.lock().insert(record.ticker.clone(), record)
    }

    pub fn get(&self, ticker: &str) -> Option<StockRecord> {
        self.lock().get(ticker).cloned()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.lock().contains_key(ticker)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn tickers(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// One job per stored ticker, in ticker order.
    pub fn jobs(&self) -> Vec<Job> {
        self.lock()
            .values()
            .map(|r| Job::new(r.ticker.clone(), r.announcement()))
            .collect()
    }

    /// Attach fetched event data to an existing ticker.
    ///
    /// Never creates a ticker. The record is rebuilt and replaced while the
    /// lock is held.
    pub fn commit_event(&self, ticker: &str, event: EventData) -> Result<(), StoreError> {
        let mut records = self.lock();
        let current = records
            .get_mut(ticker)
            .ok_or_else(|| StoreError::UnknownTicker(ticker.to_string()))?;
        *current = StockRecord {
            event: Some(event),
            ..current.clone()
        };
        Ok(())
    }

    /// Keep only the records for which `keep` returns true.
    pub fn retain<F>(&self, mut keep: F)
    where
        F: FnMut(&StockRecord) -> bool,
    {
        self.lock().retain(|_, r| keep(r));
    }

    /// Apply `f` to every record under one lock acquisition.
    pub fn update_all<F>(&self, mut f: F)
    where
        F: FnMut(&mut StockRecord),
    {
        self.lock().values_mut().for_each(|r| f(r));
    }

    /// Clone of all records in ticker order.
    pub fn snapshot(&self) -> Vec<StockRecord> {
        self.lock().values().cloned().collect()
    }

    /// Content hash of the whole store, stable across runs.
    pub fn digest(&self) -> Result<String, StoreError> {
        let bytes = serde_json::to_vec(&*self.lock())?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }

    pub fn into_inner(self) -> BTreeMap<String, StockRecord> {
        self.records
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
