use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::model::*;

/// One day's document behind its own lock. `None` until the first write.
pub type SharedDay = Arc<RwLock<Option<DaySchedule>>>;

/// Date-keyed document store. Each day is locked independently, so mutations of
/// different days never wait on each other.
#[derive(Default)]
pub struct DayStore {
    days: DashMap<Date, SharedDay>,
}

impl DayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for `date`, registering an absent day if needed. Writers go
    /// through here; readers use [`DayStore::get`] so lookups of unwritten days
    /// leave no trace.
    pub fn handle(&self, date: Date) -> SharedDay {
        self.days.entry(date).or_default().value().clone()
    }

    pub fn get(&self, date: &Date) -> Option<SharedDay> {
        self.days.get(date).map(|e| e.value().clone())
    }

    /// Every registered handle, sorted by date.
    pub fn handles(&self) -> Vec<(Date, SharedDay)> {
        let mut handles: Vec<(Date, SharedDay)> = self
            .days
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        handles.sort_by_key(|(date, _)| *date);
        handles
    }

    pub async fn load(&self, date: Date) -> Option<DaySchedule> {
        let handle = self.get(&date)?;
        let guard = handle.read().await;
        guard.clone()
    }

    /// All present documents, sorted by date.
    pub async fn scan(&self) -> Vec<(Date, DaySchedule)> {
        let mut present = Vec::new();
        for (date, handle) in self.handles() {
            if let Some(day) = handle.read().await.as_ref() {
                present.push((date, day.clone()));
            }
        }
        present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Date {
        parse_date(s).unwrap()
    }

    #[tokio::test]
    async fn unwritten_day_loads_as_absent() {
        let store = DayStore::new();
        assert!(store.load(date("2026-02-01")).await.is_none());
        assert!(store.get(&date("2026-02-01")).is_none());
    }

    #[tokio::test]
    async fn handle_registers_absent_day_until_written() {
        let store = DayStore::new();
        let handle = store.handle(date("2026-02-01"));
        assert!(store.load(date("2026-02-01")).await.is_none());
        assert!(store.scan().await.is_empty());

        *handle.write().await = Some(DaySchedule::empty());
        assert_eq!(store.load(date("2026-02-01")).await, Some(DaySchedule::empty()));
        assert_eq!(store.scan().await.len(), 1);
    }

    #[tokio::test]
    async fn scan_is_sorted_by_date() {
        let store = DayStore::new();
        for d in ["2026-03-01", "2026-01-19", "2026-02-01"] {
            *store.handle(date(d)).write().await = Some(DaySchedule::empty());
        }
        let dates: Vec<String> = store
            .scan()
            .await
            .into_iter()
            .map(|(d, _)| d.to_string())
            .collect();
        assert_eq!(dates, vec!["2026-01-19", "2026-02-01", "2026-03-01"]);
    }

    #[tokio::test]
    async fn same_handle_for_same_day() {
        let store = DayStore::new();
        let a = store.handle(date("2026-02-01"));
        let b = store.handle(date("2026-02-01"));
        assert!(Arc::ptr_eq(&a, &b));
    }
}
