//! Review session: one object owning all per-model state.
//!
//! The session is driven by discrete [`UiEvent`]s, one at a time. Network
//! calls are awaited inside the handler, so a judgment only reaches the cache
//! after the server acknowledged it.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::cache::AnnotationCache;
use super::form::{self, Ack, AnnotationForm, OpenForm, SubmitError, SubmitRequest};
use super::navigator::{Direction, Navigator};
use crate::adapters::AnnotationApi;
use crate::domain::{ErrorTarget, Judgment, Utterance};
use crate::export;
use crate::overlay::{render_utterance, Overlay};
use crate::stats::{Stats, Summary};

/// One discrete reviewer action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Previous / next utterance
    Navigate(Direction),
    /// Go to a position in the traversal order
    Jump(usize),
    /// A rendered span was clicked (its `data-target` index)
    OpenTarget(usize),
    ToggleTaxonomy(String),
    SetCustom(String),
    SetSeverity(i64),
    Submit,
    CloseForm,
}

/// What handling an event changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// A different utterance is displayed
    Rendered,
    /// Nothing to do (e.g. navigating past either end)
    Unchanged,
    FormOpened(ErrorTarget),
    FormUpdated,
    Saved(Ack),
    FormClosed,
}

/// Session settings
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Shuffle the traversal order once per load
    pub randomize: bool,
    /// Seed for the shuffle; thread RNG when unset
    pub seed: Option<u64>,
    /// Fixed taxonomy categories offered by the form
    pub taxonomy: Vec<String>,
}

/// All state for reviewing one model
pub struct Session<A: AnnotationApi> {
    api: A,
    model: String,
    options: SessionOptions,
    utterances: Vec<Utterance>,
    navigator: Navigator,
    cache: AnnotationCache,
    form: AnnotationForm,
    overlay: Overlay,
}

impl<A: AnnotationApi> Session<A> {
    pub fn new(api: A, model: impl Into<String>, options: SessionOptions) -> Self {
        let form = AnnotationForm::new(options.taxonomy.clone());
        Self {
            api,
            model: model.into(),
            options,
            utterances: Vec::new(),
            navigator: Navigator::default(),
            cache: AnnotationCache::new(),
            form,
            overlay: Overlay::default(),
        }
    }

    /// Fetch utterances and annotations, then show the first utterance.
    ///
    /// Load failures are logged and leave the session empty.
    pub async fn load(&mut self) {
        self.utterances = match self.api.fetch_utterances(&self.model).await {
            Ok(utterances) => utterances,
            Err(e) => {
                warn!(model = %self.model, error = %format!("{:#}", e), "Failed to load utterances");
                Vec::new()
            }
        };

        self.reload_annotations().await;

        let n = self.utterances.len();
        match self.options.seed {
            Some(seed) => {
                self.navigator
                    .init_with_rng(n, self.options.randomize, &mut StdRng::seed_from_u64(seed))
            }
            None => self.navigator.init(n, self.options.randomize),
        }
        self.form.close();
        self.render_current();

        info!(
            model = %self.model,
            api = self.api.name(),
            utterances = n,
            annotations = self.cache.len(),
            randomize = self.options.randomize,
            "Session loaded"
        );
    }

    /// Rebuild the annotation cache from the server
    pub async fn reload_annotations(&mut self) {
        match self.api.fetch_annotations(&self.model).await {
            Ok(records) => self.cache.load(&records),
            Err(e) => {
                warn!(model = %self.model, error = %format!("{:#}", e), "Failed to load annotations");
                self.cache.load(&[]);
            }
        }
        self.render_current();
    }

    /// Handle one reviewer action
    pub async fn handle(&mut self, event: UiEvent) -> Result<EventOutcome, SubmitError> {
        debug!(?event, "Handling event");

        match event {
            UiEvent::Navigate(direction) => {
                let moved = self.navigator.advance(direction);
                Ok(self.moved(moved))
            }
            UiEvent::Jump(position) => {
                let moved = self.navigator.jump_to(position);
                Ok(self.moved(moved))
            }
            UiEvent::OpenTarget(index) => {
                let target = self
                    .overlay
                    .target(index)
                    .cloned()
                    .ok_or_else(|| SubmitError::MissingData(format!("no error #{}", index)))?;
                let existing = self.judgment_for(&target).cloned();
                self.form.open(index, target.clone(), existing.as_ref());
                Ok(EventOutcome::FormOpened(target))
            }
            UiEvent::ToggleTaxonomy(category) => {
                self.form.toggle(&category)?;
                Ok(EventOutcome::FormUpdated)
            }
            UiEvent::SetCustom(text) => {
                self.form.set_custom(&text)?;
                Ok(EventOutcome::FormUpdated)
            }
            UiEvent::SetSeverity(level) => {
                self.form.set_severity(level)?;
                Ok(EventOutcome::FormUpdated)
            }
            UiEvent::Submit => self.submit().await.map(EventOutcome::Saved),
            UiEvent::CloseForm => {
                self.form.close();
                Ok(EventOutcome::FormClosed)
            }
        }
    }

    fn moved(&mut self, moved: bool) -> EventOutcome {
        if !moved {
            return EventOutcome::Unchanged;
        }
        self.form.close();
        self.render_current();
        EventOutcome::Rendered
    }

    async fn submit(&mut self) -> Result<Ack, SubmitError> {
        let (index, utterance) = self
            .current_utterance()
            .ok_or_else(|| SubmitError::MissingData("no utterance loaded".to_string()))?;
        let open = self
            .form
            .current()
            .ok_or_else(|| SubmitError::MissingData("no error selected".to_string()))?;

        let request = SubmitRequest {
            target: &open.target,
            utterance,
            utterance_index: index,
            selected: &open.selected,
            custom_text: &open.custom_text,
            severity: open.severity,
        };

        let result = form::submit(&self.api, &self.model, &request).await;
        let target = open.target.clone();

        match result {
            Ok(ack) => {
                self.cache.upsert(&target, ack.judgment.clone());
                self.form.close();
                self.render_current();
                Ok(ack)
            }
            Err(e) => {
                warn!(error_ref = %target.error_ref(), error = %e, "Annotation not saved");
                Err(e)
            }
        }
    }

    /// Re-render the overlay for the utterance under the cursor
    pub fn render_current(&mut self) {
        self.overlay = match self.current_utterance() {
            Some((_, utterance)) => render_utterance(utterance, &self.cache),
            None => Overlay::default(),
        };
    }

    /// Existing judgment for a target, by stable id or else legacy key
    pub fn judgment_for(&self, target: &ErrorTarget) -> Option<&Judgment> {
        self.cache.judgment_for(target)
    }

    /// Backend index and data of the utterance under the cursor
    pub fn current_utterance(&self) -> Option<(usize, &Utterance)> {
        let index = self.navigator.current()?;
        self.utterances.get(index).map(|u| (index, u))
    }

    /// Progress figures.
    ///
    /// Randomized sessions count locally; sequential sessions ask the server
    /// and fall back to zeros.
    pub async fn stats(&self) -> Stats {
        if self.options.randomize {
            return Stats::local(&self.utterances, &self.cache);
        }
        match self.api.fetch_stats(&self.model).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(model = %self.model, error = %format!("{:#}", e), "Failed to load stats");
                Stats::default()
            }
        }
    }

    /// Taxonomy and severity summary of cached judgments
    pub fn summary(&self) -> Summary {
        Summary::from_judgments(self.cache.judgments())
    }

    /// Download the export document into `dir`
    pub async fn export(&self, dir: &Path) -> Result<PathBuf> {
        export::export_annotations(&self.api, &self.model, dir).await
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn cache(&self) -> &AnnotationCache {
        &self.cache
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn form(&self) -> Option<&OpenForm> {
        self.form.current()
    }

    pub fn categories(&self) -> &[String] {
        self.form.categories()
    }
}
