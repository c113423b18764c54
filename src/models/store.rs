// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! In-memory annotation set for one video.
//!
//! Records are kept sorted ascending by start time after every mutation.
//! Inserts go through a binary search so callers never re-sort.

use super::annotation::{Annotation, AnnotationId, AnnotationPatch};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from records in any order.
    pub fn from_records(records: impl IntoIterator<Item = Annotation>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.insert_sorted(record);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// All records, sorted by start time.
    pub fn all(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id() == id)
    }

    pub fn contains(&self, id: &AnnotationId) -> bool {
        self.get(id).is_some()
    }

    /// Insert a record, keeping start-time order.
    ///
    /// Records whose id collides with an existing one get a fresh local id,
    /// so ids stay unique for the lifetime of the store. Returns the id the
    /// record was stored under.
    pub fn add(&mut self, mut annotation: Annotation) -> AnnotationId {
        if self.contains(annotation.id()) {
            let fresh = AnnotationId::new_local();
            log::warn!(
                "Annotation id {} already in store, assigning {}",
                annotation.id(),
                fresh
            );
            annotation.set_id(fresh);
        }
        let id = annotation.id().clone();
        self.insert_sorted(annotation);
        log::info!("Added annotation {}, total: {}", id, self.annotations.len());
        id
    }

    /// Merge `patch` onto the record with `id`.
    ///
    /// Returns `false` if no such record exists or the patch is for the
    /// other variant.
    pub fn update(&mut self, id: &AnnotationId, patch: &AnnotationPatch) -> bool {
        let Some(index) = self.position(id) else {
            log::warn!("Update skipped, annotation {} not found", id);
            return false;
        };
        let mut record = self.annotations.remove(index);
        let applied = record.apply(patch);
        if !applied {
            log::warn!("Update skipped, patch does not match {} {}", record.kind(), id);
        }
        self.insert_sorted(record);
        applied
    }

    /// Delete the record with `id`, returning it if present.
    pub fn remove(&mut self, id: &AnnotationId) -> Option<Annotation> {
        let index = self.position(id)?;
        let removed = self.annotations.remove(index);
        log::info!("Removed annotation {}, total: {}", id, self.annotations.len());
        Some(removed)
    }

    /// Every record whose window contains `timestamp`, inclusive at both ends.
    pub fn active_at(&self, timestamp: f64) -> Vec<&Annotation> {
        // Nothing at or after this index can have started yet
        let upper = self
            .annotations
            .partition_point(|a| a.start_time() <= timestamp);
        self.annotations[..upper]
            .iter()
            .filter(|a| a.is_active_at(timestamp))
            .collect()
    }

    fn position(&self, id: &AnnotationId) -> Option<usize> {
        self.annotations.iter().position(|a| a.id() == id)
    }

    fn insert_sorted(&mut self, annotation: Annotation) {
        // Equal start times keep insertion order
        let index = self
            .annotations
            .partition_point(|a| a.start_time() <= annotation.start_time());
        self.annotations.insert(index, annotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::fixtures::{product, survey};
    use crate::models::annotation::SurveyPatch;

    fn starts(store: &AnnotationStore) -> Vec<f64> {
        store.iter().map(|a| a.start_time()).collect()
    }

    #[test]
    fn test_add_keeps_sorted_order() {
        let mut store = AnnotationStore::new();
        store.add(survey("2", 60.0));
        store.add(product("1", 30.0, 45.0));
        store.add(survey("3", 50.0));
        assert_eq!(starts(&store), vec![30.0, 50.0, 60.0]);
    }

    #[test]
    fn test_add_reassigns_duplicate_id() {
        let mut store = AnnotationStore::new();
        store.add(product("1", 0.0, 5.0));
        let id = store.add(product("1", 10.0, 15.0));
        assert!(id.is_local());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_update_resorts_and_reports_missing() {
        let mut store = AnnotationStore::from_records(vec![survey("a", 10.0), survey("b", 20.0)]);
        let patch = AnnotationPatch::Survey(SurveyPatch {
            start_time: Some(30.0),
            ..Default::default()
        });
        assert!(store.update(&AnnotationId::Server("a".into()), &patch));
        assert_eq!(starts(&store), vec![20.0, 30.0]);
        assert_eq!(store.all()[1].end_time(), 31.0);

        assert!(!store.update(&AnnotationId::Server("zz".into()), &patch));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let mut store = AnnotationStore::from_records(vec![product("1", 0.0, 5.0)]);
        assert!(store.remove(&AnnotationId::Server("9".into())).is_none());
        assert!(store.remove(&AnnotationId::Server("1".into())).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_active_at_matches_inclusive_windows() {
        let store = AnnotationStore::from_records(vec![
            product("1", 30.0, 45.0),
            product("2", 0.0, 100.0),
            survey("3", 45.0),
        ]);

        let ids = |t: f64| -> Vec<String> {
            store.active_at(t).iter().map(|a| a.id().to_string()).collect()
        };

        assert_eq!(ids(30.0), vec!["2", "1"]);
        assert_eq!(ids(45.0), vec!["2", "1", "3"]);
        assert_eq!(ids(46.0), vec!["2"]);
        assert!(ids(150.0).is_empty());
    }

    #[test]
    fn test_active_at_equals_brute_force_filter() {
        let store = AnnotationStore::from_records(vec![
            product("1", 5.0, 20.0),
            survey("2", 12.0),
            product("3", 12.0, 13.0),
            survey("4", 40.0),
        ]);
        let mut t = 0.0;
        while t < 50.0 {
            let expected: Vec<&Annotation> = store
                .iter()
                .filter(|a| a.start_time() <= t && t <= a.end_time())
                .collect();
            assert_eq!(store.active_at(t), expected, "at t={}", t);
            t += 0.25;
        }
    }
}
