// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Survey dismissal state.
//!
//! Each survey is `Pending` until the viewer answers it (`Completed`) or
//! skips it (`Dismissed`). Completed surveys stay completed for the whole
//! session. Dismissed surveys re-arm when playback moves back before their
//! start, or when playback restarts from the beginning.

use crate::models::annotation::AnnotationId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurveyStatus {
    #[default]
    Pending,
    Completed,
    Dismissed,
}

#[derive(Debug, Clone)]
pub struct SurveyGate {
    statuses: HashMap<AnnotationId, SurveyStatus>,
    /// Times below this count as a restart from the beginning.
    restart_threshold: f64,
}

impl SurveyGate {
    pub fn new(restart_threshold: f64) -> Self {
        Self {
            statuses: HashMap::new(),
            restart_threshold,
        }
    }

    pub fn status(&self, id: &AnnotationId) -> SurveyStatus {
        self.statuses.get(id).copied().unwrap_or_default()
    }

    /// Only pending surveys are shown.
    pub fn is_pending(&self, id: &AnnotationId) -> bool {
        self.status(id) == SurveyStatus::Pending
    }

    pub fn complete(&mut self, id: &AnnotationId) {
        log::info!("Survey {} completed", id);
        self.statuses.insert(id.clone(), SurveyStatus::Completed);
    }

    /// Mark a survey as skipped. Completed surveys stay completed.
    pub fn dismiss(&mut self, id: &AnnotationId) {
        if self.status(id) == SurveyStatus::Completed {
            return;
        }
        log::info!("Survey {} dismissed", id);
        self.statuses.insert(id.clone(), SurveyStatus::Dismissed);
    }

    /// Forget a survey entirely, e.g. after it was deleted.
    pub fn forget(&mut self, id: &AnnotationId) {
        self.statuses.remove(id);
    }

    /// Handle a natural playback time update.
    ///
    /// Dismissed surveys are only reconsidered when `rewind` is set or the
    /// time is below the restart threshold. `start_of` looks up a survey's
    /// current start time. Returns the ids that went back to pending.
    pub fn on_time_update<F>(&mut self, current: f64, rewind: bool, start_of: F) -> Vec<AnnotationId>
    where
        F: Fn(&AnnotationId) -> Option<f64>,
    {
        if current < self.restart_threshold {
            return self.rearm_all();
        }
        if rewind {
            return self.rearm_before(current, start_of);
        }
        Vec::new()
    }

    /// Handle an explicit seek. The reset rule applies immediately rather
    /// than waiting for the next time update.
    pub fn on_seek<F>(&mut self, current: f64, start_of: F) -> Vec<AnnotationId>
    where
        F: Fn(&AnnotationId) -> Option<f64>,
    {
        if current < self.restart_threshold {
            return self.rearm_all();
        }
        self.rearm_before(current, start_of)
    }

    /// Back to a fresh session: every survey pending.
    pub fn reset(&mut self) {
        self.statuses.clear();
    }

    fn dismissed_ids(&self) -> Vec<AnnotationId> {
        self.statuses
            .iter()
            .filter(|(_, status)| **status == SurveyStatus::Dismissed)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn rearm_all(&mut self) -> Vec<AnnotationId> {
        let ids = self.dismissed_ids();
        for id in &ids {
            self.statuses.remove(id);
        }
        if !ids.is_empty() {
            log::info!("Playback restarted, re-armed {} dismissed surveys", ids.len());
        }
        ids
    }

    fn rearm_before<F>(&mut self, current: f64, start_of: F) -> Vec<AnnotationId>
    where
        F: Fn(&AnnotationId) -> Option<f64>,
    {
        let ids: Vec<AnnotationId> = self
            .dismissed_ids()
            .into_iter()
            .filter(|id| start_of(id).is_some_and(|start| current < start))
            .collect();
        for id in &ids {
            log::debug!("Rewound before survey {}, re-armed", id);
            self.statuses.remove(id);
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AnnotationId {
        AnnotationId::Server(s.to_string())
    }

    fn starts(id: &AnnotationId) -> Option<f64> {
        match id.to_string().as_str() {
            "x" => Some(30.0),
            "7" => Some(60.0),
            "late" => Some(300.0),
            _ => None,
        }
    }

    #[test]
    fn test_rewind_past_start_rearms() {
        let mut gate = SurveyGate::new(0.5);
        gate.dismiss(&id("x"));
        let rearmed = gate.on_time_update(29.0, true, starts);
        assert_eq!(rearmed, vec![id("x")]);
        assert_eq!(gate.status(&id("x")), SurveyStatus::Pending);
    }

    #[test]
    fn test_rewind_not_past_start_keeps_dismissed() {
        let mut gate = SurveyGate::new(0.5);
        gate.dismiss(&id("x"));
        assert!(gate.on_time_update(31.0, true, starts).is_empty());
        assert_eq!(gate.status(&id("x")), SurveyStatus::Dismissed);
    }

    #[test]
    fn test_forward_ticks_never_rearm() {
        let mut gate = SurveyGate::new(0.5);
        gate.dismiss(&id("x"));
        // Not flagged as a rewind, so nothing is reconsidered
        assert!(gate.on_time_update(29.0, false, starts).is_empty());
        assert!(!gate.is_pending(&id("x")));
    }

    #[test]
    fn test_restart_clears_dismissed_but_not_completed() {
        let mut gate = SurveyGate::new(0.5);
        gate.dismiss(&id("x"));
        gate.dismiss(&id("late"));
        gate.complete(&id("7"));

        let mut rearmed = gate.on_time_update(0.0, false, |_| None);
        rearmed.sort_by_key(|i| i.to_string());
        assert_eq!(rearmed, vec![id("late"), id("x")]);
        assert_eq!(gate.status(&id("7")), SurveyStatus::Completed);
    }

    #[test]
    fn test_completed_survives_rewind_and_dismiss() {
        let mut gate = SurveyGate::new(0.5);
        gate.complete(&id("7"));
        gate.dismiss(&id("7"));
        gate.on_seek(10.0, starts);
        assert_eq!(gate.status(&id("7")), SurveyStatus::Completed);
    }

    #[test]
    fn test_seek_back_rearms_immediately() {
        let mut gate = SurveyGate::new(0.5);
        gate.dismiss(&id("7"));
        assert_eq!(gate.on_seek(10.0, starts), vec![id("7")]);
        assert!(gate.is_pending(&id("7")));
    }
}
