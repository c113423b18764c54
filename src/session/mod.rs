// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Per-video viewing session.
//!
//! A [`ViewingSession`] is created when a video is opened and dropped when
//! the user navigates away. It owns everything tied to that viewing pass:
//! the annotation store, the playback clock, survey dismissal state, the
//! open form draft and the cancellation token for in-flight backend calls.

pub mod survey;

use crate::config::PlaybackSettings;
use crate::error::{self, CueError, ValidationError};
use crate::io::sync::SessionToken;
use crate::models::annotation::{Annotation, AnnotationId, AnnotationPatch, OptionType};
use crate::models::draft::{ProductDraft, SurveyDraft};
use crate::models::overlap::validate_candidate;
use crate::models::project::VideoRecord;
use crate::models::store::AnnotationStore;
use crate::playback::{ClockEvent, MediaElement, PlaybackClock};
use std::collections::{HashMap, HashSet};
use survey::{SurveyGate, SurveyStatus};

/// Form currently open in the editor panel.
#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    Product(ProductDraft),
    Survey(SurveyDraft),
}

impl Draft {
    pub fn for_record(record: &Annotation) -> Self {
        match record {
            Annotation::Product(p) => Draft::Product(ProductDraft::from_record(p)),
            Annotation::Survey(s) => Draft::Survey(SurveyDraft::from_record(s)),
        }
    }

    pub fn editing(&self) -> Option<&AnnotationId> {
        match self {
            Draft::Product(d) => d.editing.as_ref(),
            Draft::Survey(d) => d.editing.as_ref(),
        }
    }

    /// Id of the last record sent to the backend from this form.
    pub fn submitted(&self) -> Option<&AnnotationId> {
        match self {
            Draft::Product(d) => d.submitted.as_ref(),
            Draft::Survey(d) => d.submitted.as_ref(),
        }
    }

    fn mark_submitted(&mut self, id: AnnotationId) {
        match self {
            Draft::Product(d) => d.submitted = Some(id),
            Draft::Survey(d) => d.submitted = Some(id),
        }
    }

    /// Build the record without checking it against the store.
    pub fn build(&self) -> Result<Annotation, ValidationError> {
        match self {
            Draft::Product(d) => d.build(),
            Draft::Survey(d) => d.build(),
        }
    }

    /// Build the record and check it against every other stored record.
    pub fn validate(&self, store: &AnnotationStore) -> Result<Annotation, ValidationError> {
        let candidate = self.build()?;
        validate_candidate(&candidate, store.iter())?;
        Ok(candidate)
    }
}

pub struct ViewingSession {
    video: VideoRecord,
    store: AnnotationStore,
    clock: PlaybackClock,
    surveys: SurveyGate,
    /// Pending surveys currently on screen.
    active_surveys: HashSet<AnnotationId>,
    /// Playback was running when a survey paused it.
    auto_paused: bool,
    playback_error: Option<CueError>,
    settings: PlaybackSettings,
    token: SessionToken,
    pub draft: Option<Draft>,
    pub selected: Option<AnnotationId>,
    /// Options ticked on each open survey prompt.
    pub answer_drafts: HashMap<AnnotationId, Vec<String>>,
}

impl ViewingSession {
    pub fn new(video: VideoRecord, media: Box<dyn MediaElement>, settings: PlaybackSettings) -> Self {
        log::info!(
            "Opened video {} with {} annotations",
            video.id,
            video.annotations.len()
        );
        Self {
            store: video.store(),
            video,
            clock: PlaybackClock::new(media, settings.rewind_epsilon_secs),
            surveys: SurveyGate::new(settings.restart_threshold_secs),
            active_surveys: HashSet::new(),
            auto_paused: false,
            playback_error: None,
            settings,
            token: SessionToken::new(),
            draft: None,
            selected: None,
            answer_drafts: HashMap::new(),
        }
    }

    pub fn video(&self) -> &VideoRecord {
        &self.video
    }

    /// Follow a rename the backend confirmed.
    pub fn set_video_title(&mut self, title: String) {
        self.video.title = title;
    }

    /// The video record with the current annotation set, for export.
    pub fn snapshot(&self) -> VideoRecord {
        self.video.with_annotations(&self.store)
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn playback_error(&self) -> Option<&CueError> {
        self.playback_error.as_ref()
    }

    pub fn survey_status(&self, id: &AnnotationId) -> SurveyStatus {
        self.surveys.status(id)
    }

    pub fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    pub fn duration(&self) -> f64 {
        self.clock.duration()
    }

    /// Advance playback by `elapsed` seconds and react to what happened.
    pub fn advance(&mut self, elapsed: f64) {
        for event in self.clock.advance(elapsed) {
            match event {
                ClockEvent::DurationLoaded(_) => {}
                ClockEvent::TimeUpdate {
                    current, rewind, ..
                } => {
                    let store = &self.store;
                    self.surveys
                        .on_time_update(current, rewind, |id| survey_start(store, id));
                }
                ClockEvent::Failed(message) => {
                    self.playback_error = Some(CueError::Playback(message));
                }
            }
        }
        self.refresh_active_surveys();
    }

    /// Records to draw over the video right now.
    ///
    /// Products show whenever their window contains the playhead. Surveys
    /// additionally need to be pending.
    pub fn visible_overlays(&self) -> Vec<&Annotation> {
        self.store
            .active_at(self.clock.current_time())
            .into_iter()
            .filter(|a| match a {
                Annotation::Product(_) => true,
                Annotation::Survey(s) => self.surveys.is_pending(&s.id),
            })
            .collect()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn play(&mut self) {
        self.auto_paused = false;
        self.clock.play();
    }

    /// Manual pause. Never resumed automatically.
    pub fn pause(&mut self) {
        self.auto_paused = false;
        self.clock.pause();
    }

    pub fn toggle_play(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jump to `seconds`, re-arming dismissed surveys the jump moved before.
    pub fn seek_to(&mut self, seconds: f64) {
        let seek = self.clock.seek_to(seconds);
        log::debug!("Seek {:.2}s -> {:.2}s", seek.previous, seek.current);
        let store = &self.store;
        self.surveys
            .on_seek(seek.current, |id| survey_start(store, id));
        self.refresh_active_surveys();
    }

    pub fn skip_backward(&mut self) {
        self.seek_to(self.current_time() - self.settings.skip_secs);
    }

    pub fn skip_forward(&mut self) {
        self.seek_to(self.current_time() + self.settings.skip_secs);
    }

    /// Record an answer for a survey and close it.
    pub fn submit_survey_answer(
        &mut self,
        id: &AnnotationId,
        selected: &[String],
    ) -> error::Result<()> {
        let Some(Annotation::Survey(survey)) = self.store.get(id) else {
            return Err(CueError::NotFound {
                entity: "survey",
                id: id.to_string(),
            });
        };
        if selected.is_empty() {
            return Err(ValidationError::MissingField("Answer").into());
        }
        let options = survey.display_options();
        if let Some(unknown) = selected.iter().find(|s| !options.contains(s)) {
            return Err(ValidationError::UnknownCorrectAnswer(unknown.clone()).into());
        }
        if survey.option_type != OptionType::MultipleChoice && selected.len() != 1 {
            return Err(ValidationError::SingleAnswerExpected.into());
        }
        self.complete_survey(id);
        Ok(())
    }

    pub fn complete_survey(&mut self, id: &AnnotationId) {
        self.surveys.complete(id);
        self.close_survey(id);
    }

    pub fn dismiss_survey(&mut self, id: &AnnotationId) {
        self.surveys.dismiss(id);
        self.close_survey(id);
    }

    pub fn open_new_product(&mut self) {
        self.draft = Some(Draft::Product(ProductDraft::starting_at(self.current_time())));
    }

    pub fn open_new_survey(&mut self) {
        self.draft = Some(Draft::Survey(SurveyDraft::starting_at(self.current_time())));
    }

    /// Open the editor for an existing record.
    pub fn edit(&mut self, id: &AnnotationId) -> bool {
        match self.store.get(id) {
            Some(record) => {
                self.draft = Some(Draft::for_record(record));
                self.selected = Some(id.clone());
                true
            }
            None => false,
        }
    }

    /// Validate the open draft without touching it.
    pub fn validate_draft(&self) -> Result<Annotation, ValidationError> {
        match &self.draft {
            Some(draft) => draft.validate(&self.store),
            None => Err(ValidationError::MissingField("Form")),
        }
    }

    /// Validate the open draft and remember the record as sent from it.
    ///
    /// The draft stays open; it closes when the backend confirms this
    /// record.
    pub fn submit_draft(&mut self) -> error::Result<Annotation> {
        let record = self.validate_draft()?;
        if let Some(draft) = self.draft.as_mut() {
            draft.mark_submitted(record.id().clone());
        }
        Ok(record)
    }

    /// Apply a create the backend confirmed. `local_id` is the id the
    /// record was submitted under.
    pub fn apply_created(&mut self, local_id: &AnnotationId, confirmed: Annotation) {
        let id = self.store.add(confirmed);
        if self.draft.as_ref().and_then(Draft::submitted) == Some(local_id) {
            self.draft = None;
        }
        self.selected = Some(id);
        self.refresh_active_surveys();
    }

    /// Apply an update the backend confirmed.
    pub fn apply_updated(&mut self, confirmed: Annotation) -> bool {
        let id = confirmed.id().clone();
        let applied = self
            .store
            .update(&id, &AnnotationPatch::replace_with(&confirmed));
        if applied && self.draft.as_ref().and_then(Draft::editing) == Some(&id) {
            self.draft = None;
        }
        self.refresh_active_surveys();
        applied
    }

    /// Apply a delete the backend confirmed.
    pub fn apply_removed(&mut self, id: &AnnotationId) {
        self.store.remove(id);
        self.surveys.forget(id);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        if self.draft.as_ref().and_then(Draft::editing) == Some(id) {
            self.draft = None;
        }
        self.close_survey(id);
        self.refresh_active_surveys();
    }

    /// Cancel in-flight backend calls and reset per-pass state.
    pub fn teardown(&mut self) {
        log::info!("Closing video {}", self.video.id);
        self.token.cancel();
        self.clock.pause();
        self.surveys.reset();
        self.active_surveys.clear();
        self.answer_drafts.clear();
        self.auto_paused = false;
    }

    fn close_survey(&mut self, id: &AnnotationId) {
        self.answer_drafts.remove(id);
        if self.active_surveys.remove(id) && self.active_surveys.is_empty() {
            self.resume_after_surveys();
        }
    }

    fn resume_after_surveys(&mut self) {
        if self.auto_paused {
            log::info!("All surveys closed, resuming playback");
            self.auto_paused = false;
            self.clock.play();
        }
    }

    /// Pause for newly visible surveys and forget ones that left the screen.
    fn refresh_active_surveys(&mut self) {
        let now = self.clock.current_time();
        let visible: HashSet<AnnotationId> = self
            .store
            .active_at(now)
            .into_iter()
            .filter(|a| matches!(a, Annotation::Survey(_)) && self.surveys.is_pending(a.id()))
            .map(|a| a.id().clone())
            .collect();

        let newly_active = visible.iter().any(|id| !self.active_surveys.contains(id));
        if newly_active && self.clock.is_playing() {
            log::info!("Survey reached at {:.2}s, pausing playback", now);
            self.clock.pause();
            self.auto_paused = true;
        }

        // Surveys that left the window without being answered don't resume
        // playback; the user moved the playhead themselves.
        self.active_surveys = visible;
        if self.active_surveys.is_empty() && self.auto_paused && !self.clock.is_playing() {
            self.auto_paused = false;
        }
    }
}

fn survey_start(store: &AnnotationStore, id: &AnnotationId) -> Option<f64> {
    match store.get(id) {
        Some(Annotation::Survey(s)) => Some(s.start_time),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::fixtures::{product, survey};
    use crate::playback::SimulatedMedia;
    use std::cell::Cell;
    use std::rc::Rc;

    fn id(s: &str) -> AnnotationId {
        AnnotationId::Server(s.to_string())
    }

    fn session(annotations: Vec<Annotation>) -> ViewingSession {
        let mut video = VideoRecord::new("v1".into(), "Demo".into(), "https://cdn.test/v1.mp4".into());
        video.annotations = annotations;
        let mut session = ViewingSession::new(
            video,
            Box::new(SimulatedMedia::new(120.0)),
            PlaybackSettings::default(),
        );
        // Load metadata
        session.advance(0.0);
        session
    }

    /// Play forward in small steps, like regular time updates.
    fn play_for(session: &mut ViewingSession, seconds: f64) {
        let mut remaining = seconds;
        while remaining > 0.0 {
            let step = remaining.min(0.25);
            session.advance(step);
            remaining -= step;
        }
    }

    #[test]
    fn test_products_always_visible_surveys_gated() {
        let mut s = session(vec![product("1", 30.0, 45.0), survey("2", 31.0)]);
        s.seek_to(31.0);
        assert_eq!(s.visible_overlays().len(), 2);

        s.dismiss_survey(&id("2"));
        let visible: Vec<String> = s.visible_overlays().iter().map(|a| a.id().to_string()).collect();
        assert_eq!(visible, vec!["1"]);
    }

    #[test]
    fn test_survey_auto_pauses_and_resumes_on_close() {
        let mut s = session(vec![survey("7", 5.0)]);
        s.play();
        play_for(&mut s, 5.0);
        assert!(!s.is_playing());
        assert_eq!(s.current_time(), 5.0);

        s.submit_survey_answer(&id("7"), &["A".to_string()]).unwrap();
        assert_eq!(s.survey_status(&id("7")), SurveyStatus::Completed);
        assert!(s.is_playing());
    }

    #[test]
    fn test_manual_pause_not_resumed() {
        let mut s = session(vec![survey("7", 5.0)]);
        s.seek_to(5.0);
        // Already paused when the survey appeared
        assert!(!s.is_playing());
        s.dismiss_survey(&id("7"));
        assert!(!s.is_playing());
    }

    #[test]
    fn test_concurrent_surveys_resume_after_last_closes() {
        let mut s = session(vec![survey("a", 5.0), survey("b", 5.5)]);
        s.play();
        play_for(&mut s, 5.0);
        assert!(!s.is_playing());
        // "b" becomes active too
        s.seek_to(5.6);
        s.dismiss_survey(&id("a"));
        assert!(!s.is_playing());
        s.dismiss_survey(&id("b"));
        assert!(s.is_playing());
    }

    #[test]
    fn test_skip_then_scrub_back_rearms_and_pauses_again() {
        let mut s = session(vec![survey("7", 60.0)]);
        s.seek_to(60.0);
        s.dismiss_survey(&id("7"));
        assert_eq!(s.survey_status(&id("7")), SurveyStatus::Dismissed);

        s.seek_to(10.0);
        assert_eq!(s.survey_status(&id("7")), SurveyStatus::Pending);

        s.play();
        play_for(&mut s, 50.0);
        assert_eq!(s.current_time(), 60.0);
        assert!(!s.is_playing());
        assert_eq!(s.visible_overlays().len(), 1);
    }

    #[test]
    fn test_forward_seek_does_not_rearm() {
        let mut s = session(vec![survey("x", 30.0)]);
        s.seek_to(30.0);
        s.dismiss_survey(&id("x"));
        s.seek_to(31.0);
        assert_eq!(s.survey_status(&id("x")), SurveyStatus::Dismissed);
    }

    #[test]
    fn test_restart_rearms_all_dismissed_keeps_completed() {
        let mut s = session(vec![survey("a", 20.0), survey("b", 40.0)]);
        s.seek_to(20.0);
        s.dismiss_survey(&id("a"));
        s.seek_to(40.0);
        s.complete_survey(&id("b"));

        s.seek_to(0.0);
        assert_eq!(s.survey_status(&id("a")), SurveyStatus::Pending);
        assert_eq!(s.survey_status(&id("b")), SurveyStatus::Completed);
    }

    #[test]
    fn test_skip_backward_rearms_immediately() {
        let mut s = session(vec![survey("x", 30.0)]);
        s.seek_to(30.0);
        s.dismiss_survey(&id("x"));
        s.seek_to(35.0);
        s.skip_backward();
        assert_eq!(s.current_time(), 25.0);
        assert_eq!(s.survey_status(&id("x")), SurveyStatus::Pending);
    }

    #[test]
    fn test_answer_validation() {
        let mut s = session(vec![survey("7", 5.0)]);
        assert!(matches!(
            s.submit_survey_answer(&id("7"), &[]),
            Err(CueError::Validation(ValidationError::MissingField("Answer")))
        ));
        assert!(matches!(
            s.submit_survey_answer(&id("7"), &["A".into(), "B".into()]),
            Err(CueError::Validation(ValidationError::SingleAnswerExpected))
        ));
        assert!(matches!(
            s.submit_survey_answer(&id("7"), &["Z".into()]),
            Err(CueError::Validation(ValidationError::UnknownCorrectAnswer(_)))
        ));
        assert!(matches!(
            s.submit_survey_answer(&id("missing"), &["A".into()]),
            Err(CueError::NotFound { entity: "survey", .. })
        ));
        assert_eq!(s.survey_status(&id("7")), SurveyStatus::Pending);
    }

    #[test]
    fn test_rejected_draft_is_kept() {
        let mut s = session(vec![product("1", 30.0, 45.0)]);
        s.seek_to(40.0);
        s.open_new_survey();
        if let Some(Draft::Survey(d)) = &mut s.draft {
            d.question = "Like it?".into();
            d.options = vec!["Yes".into(), "No".into()];
        }
        assert!(matches!(
            s.validate_draft(),
            Err(ValidationError::Overlap { .. })
        ));
        assert!(s.draft.is_some());
        assert_eq!(s.store().len(), 1);
    }

    #[test]
    fn test_confirmed_create_clears_draft_and_selects() {
        let mut s = session(vec![product("1", 30.0, 45.0)]);
        s.seek_to(50.0);
        s.open_new_survey();
        if let Some(Draft::Survey(d)) = &mut s.draft {
            d.question = "Like it?".into();
            d.options = vec!["Yes".into(), "No".into()];
        }
        let candidate = s.submit_draft().unwrap();
        let local = candidate.id().clone();
        assert!(s.draft.is_some());

        let mut confirmed = candidate;
        confirmed.set_id(id("99"));
        s.apply_created(&local, confirmed);

        assert!(s.draft.is_none());
        assert_eq!(s.selected, Some(id("99")));
        let starts: Vec<f64> = s.store().iter().map(|a| a.start_time()).collect();
        assert_eq!(starts, vec![30.0, 50.0]);
    }

    #[test]
    fn test_confirmation_keeps_a_different_open_form() {
        let mut s = session(vec![]);
        s.seek_to(50.0);
        s.open_new_survey();
        if let Some(Draft::Survey(d)) = &mut s.draft {
            d.question = "Like it?".into();
            d.options = vec!["Yes".into(), "No".into()];
        }
        let mut confirmed = s.submit_draft().unwrap();
        let local = confirmed.id().clone();

        // A new form opened while the save is in flight
        s.open_new_product();
        if let Some(Draft::Product(d)) = &mut s.draft {
            d.product_name = "Hat".into();
        }

        confirmed.set_id(id("99"));
        s.apply_created(&local, confirmed);

        match &s.draft {
            Some(Draft::Product(d)) => assert_eq!(d.product_name, "Hat"),
            other => panic!("form was replaced: {:?}", other),
        }
        assert_eq!(s.store().len(), 1);
    }

    #[test]
    fn test_rejected_submit_leaves_form_unmarked() {
        let mut s = session(vec![]);
        s.open_new_product();
        assert!(matches!(
            s.submit_draft(),
            Err(CueError::Validation(ValidationError::MissingField(_)))
        ));
        assert_eq!(s.draft.as_ref().and_then(Draft::submitted), None);
    }

    /// Media whose position can be moved from outside, like a viewer
    /// dragging the native player's scrubber.
    struct ScrubbedMedia {
        inner: SimulatedMedia,
        jump: Rc<Cell<Option<f64>>>,
    }

    impl MediaElement for ScrubbedMedia {
        fn tick(&mut self, elapsed: f64) {
            if let Some(target) = self.jump.take() {
                self.inner.set_current_time(target);
            }
            self.inner.tick(elapsed);
        }
        fn current_time(&self) -> f64 {
            self.inner.current_time()
        }
        fn duration(&self) -> Option<f64> {
            self.inner.duration()
        }
        fn is_playing(&self) -> bool {
            self.inner.is_playing()
        }
        fn play(&mut self) {
            self.inner.play();
        }
        fn pause(&mut self) {
            self.inner.pause();
        }
        fn set_current_time(&mut self, seconds: f64) {
            self.inner.set_current_time(seconds);
        }
        fn error(&self) -> Option<String> {
            self.inner.error()
        }
    }

    fn scrubbed_session(annotations: Vec<Annotation>) -> (ViewingSession, Rc<Cell<Option<f64>>>) {
        let jump = Rc::new(Cell::new(None));
        let mut video = VideoRecord::new("v1".into(), "Demo".into(), "https://cdn.test/v1.mp4".into());
        video.annotations = annotations;
        let media = ScrubbedMedia {
            inner: SimulatedMedia::new(120.0),
            jump: Rc::clone(&jump),
        };
        let mut session = ViewingSession::new(video, Box::new(media), PlaybackSettings::default());
        session.advance(0.0);
        (session, jump)
    }

    #[test]
    fn test_time_update_rewind_rearms_dismissed_survey() {
        let (mut s, jump) = scrubbed_session(vec![survey("x", 30.0)]);
        s.seek_to(30.0);
        s.dismiss_survey(&id("x"));
        s.play();
        play_for(&mut s, 5.0);
        assert_eq!(s.current_time(), 35.0);

        // Jitter inside the tolerance is not a rewind
        jump.set(Some(34.5));
        s.advance(0.0);
        assert_eq!(s.survey_status(&id("x")), SurveyStatus::Dismissed);

        jump.set(Some(20.0));
        s.advance(0.0);
        assert_eq!(s.survey_status(&id("x")), SurveyStatus::Pending);
    }

    #[test]
    fn test_time_update_restart_rearms_all_dismissed() {
        let (mut s, jump) = scrubbed_session(vec![survey("a", 10.0), survey("b", 90.0)]);
        s.seek_to(10.0);
        s.dismiss_survey(&id("a"));
        s.seek_to(90.0);
        s.dismiss_survey(&id("b"));

        jump.set(Some(0.2));
        s.advance(0.0);
        assert_eq!(s.survey_status(&id("a")), SurveyStatus::Pending);
        assert_eq!(s.survey_status(&id("b")), SurveyStatus::Pending);
    }

    #[test]
    fn test_removed_survey_releases_pause() {
        let mut s = session(vec![survey("7", 5.0)]);
        s.play();
        play_for(&mut s, 5.0);
        assert!(!s.is_playing());
        s.apply_removed(&id("7"));
        assert!(s.is_playing());
        assert!(s.store().is_empty());
    }

    #[test]
    fn test_failed_media_reports_playback_error() {
        let video = VideoRecord::new("v1".into(), "Demo".into(), "https://cdn.test/v1.mp4".into());
        let mut s = ViewingSession::new(
            video,
            Box::new(SimulatedMedia::failed("decoder missing")),
            PlaybackSettings::default(),
        );
        s.advance(0.1);
        assert!(matches!(s.playback_error(), Some(CueError::Playback(m)) if m == "decoder missing"));
    }

    #[test]
    fn test_teardown_cancels_token_and_resets_surveys() {
        let mut s = session(vec![survey("7", 5.0)]);
        s.seek_to(5.0);
        s.dismiss_survey(&id("7"));
        let token = s.token().clone();
        s.teardown();
        assert!(token.is_cancelled());
        assert_eq!(s.survey_status(&id("7")), SurveyStatus::Pending);
    }
}
