//! In-memory source and destination used by the pipeline tests

use async_trait::async_trait;
use media_sync_models::{AddedCounts, Category, DestinationIds, DestinationRecord, HistoryPayload, SourceItem};
use media_sync_sources::{CompletedItemsSource, HistoryDestination, SourceError};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use tokio::time::Instant;

pub fn imdb_records(n: usize) -> Vec<DestinationRecord> {
    (0..n)
        .filter_map(|i| {
            DestinationRecord::new(
                DestinationIds { imdb: Some(format!("tt{:07}", i)), ..Default::default() },
                None,
            )
        })
        .collect()
}

/// Accepts every submission except the 1-based call numbers in `fail_on`
#[derive(Default)]
pub struct FakeDestination {
    fail_on: HashSet<usize>,
    calls: Mutex<Vec<(Instant, HistoryPayload)>>,
}

impl FakeDestination {
    pub fn failing_on(calls: &[usize]) -> Self {
        Self { fail_on: calls.iter().copied().collect(), ..Default::default() }
    }

    pub fn calls(&self) -> Vec<HistoryPayload> {
        self.calls.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

#[async_trait]
impl HistoryDestination for FakeDestination {
    fn destination_name(&self) -> &str {
        "fake-destination"
    }

    async fn add_to_history(&self, payload: &HistoryPayload) -> Result<AddedCounts, SourceError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((Instant::now(), payload.clone()));
            calls.len()
        };
        if self.fail_on.contains(&call) {
            return Err(SourceError::Http { status: 502, body: "Bad Gateway".to_string() });
        }
        Ok(AddedCounts {
            movies: payload.movies.len() as u64,
            shows: payload.shows.len() as u64,
            episodes: 0,
        })
    }
}

/// Serves canned items per category; categories without an entry fail
#[derive(Default)]
pub struct FakeSource {
    items: BTreeMap<Category, Vec<SourceItem>>,
}

impl FakeSource {
    pub fn with(mut self, category: Category, items: Vec<SourceItem>) -> Self {
        self.items.insert(category, items);
        self
    }
}

#[async_trait]
impl CompletedItemsSource for FakeSource {
    fn source_name(&self) -> &str {
        "fake-source"
    }

    async fn fetch_completed(&self, category: Category) -> Result<Vec<SourceItem>, SourceError> {
        self.items
            .get(&category)
            .cloned()
            .ok_or(SourceError::Http { status: 500, body: format!("{} unavailable", category) })
    }
}
