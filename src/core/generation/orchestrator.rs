//! Generation Orchestrator - chapter lifecycle state machine.
//!
//! Owns the `BookProject` aggregate and is the only place that translates
//! generation outcomes into state transitions. Per chapter the lifecycle is
//! `pending -> generating -> completed`, with any failure reverting
//! `generating -> pending` — a chapter is never left dangling in
//! `generating` after a call returns.
//!
//! Generation is single-flight at the project level: one chapter at a time,
//! batches included. Batches walk chapters strictly in project order
//! because each chapter's previous-chapters context is read from the
//! current in-memory state at the moment that chapter is generated.

use crate::core::generation::chapter::{self, ChapterRequest, GenerationMode};
use crate::core::generation::{outline, prompts, GenerationError};
use crate::core::llm::config::ResolveBackend;
use crate::core::models::{
    BookBrief, BookProject, Chapter, ChapterStatus, ValidationError,
};
use crate::core::settings::Settings;
use crate::core::storage::{ProjectStore, StorageError};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("A generation is already in flight for this project")]
    Busy,

    #[error("No active project")]
    NoProject,

    #[error("Chapter not found: {0}")]
    ChapterNotFound(String),

    #[error("Chapter is currently generating: {0}")]
    ChapterInFlight(String),

    #[error("Invalid chapter index: {0}")]
    InvalidIndex(usize),

    #[error("Chapter title must not be empty")]
    EmptyChapterTitle,

    #[error("Generation failed for chapter \"{title}\": {source}")]
    ChapterGeneration {
        title: String,
        #[source]
        source: GenerationError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// ============================================================================
// Operation Types
// ============================================================================

/// Per-call overrides for content generation. Unset fields fall back to the
/// settings defaults; an unset `refine` is inferred from whether the
/// chapter already has content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub extra_instruction: Option<String>,
    pub min_words: Option<u32>,
    pub refine: Option<bool>,
    pub temperature: Option<f32>,
    pub seed: Option<u64>,
}

impl GenerationOptions {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err(ValidationError::TemperatureOutOfRange);
            }
        }
        Ok(())
    }
}

/// Which chapters a whole-book batch touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Skip chapters that are already completed.
    PendingOnly,
    /// Regenerate every chapter regardless of status.
    AllOverwrite,
}

/// One chapter's failure inside a batch, keyed to the chapter title for
/// user display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterFailure {
    pub chapter_id: String,
    pub title: String,
    pub message: String,
}

/// Outcome of a `generate_all` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<ChapterFailure>,
}

/// Partial update applied by the external collaborator's direct edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterPatch {
    pub title: Option<String>,
    pub subchapters: Option<Vec<String>>,
    pub content: Option<String>,
}

// ============================================================================
// Orchestrator
// ============================================================================

struct State {
    project: Option<BookProject>,
    in_flight: bool,
}

/// Coordinates outline and chapter generation over the project aggregate.
pub struct GenerationOrchestrator {
    store: Arc<dyn ProjectStore>,
    resolver: Arc<dyn ResolveBackend>,
    state: Mutex<State>,
}

impl GenerationOrchestrator {
    pub fn new(store: Arc<dyn ProjectStore>, resolver: Arc<dyn ResolveBackend>) -> Self {
        Self {
            store,
            resolver,
            state: Mutex::new(State {
                project: None,
                in_flight: false,
            }),
        }
    }

    /// Load the persisted project into the orchestrator, if one exists.
    ///
    /// A chapter persisted as `generating` is a leftover from an
    /// interrupted run and is normalized back to `pending`.
    pub async fn load_project(&self) -> Result<Option<BookProject>, OrchestratorError> {
        let loaded = self.store.load().await?.map(|mut project| {
            for chapter in &mut project.chapters {
                if chapter.status == ChapterStatus::Generating {
                    warn!(chapter = %chapter.title, "Normalizing stale generating status");
                    chapter.status = ChapterStatus::Pending;
                }
            }
            project
        });

        let mut state = self.state.lock().await;
        state.project = loaded.clone();
        Ok(loaded)
    }

    /// Snapshot of the current project.
    pub async fn project(&self) -> Option<BookProject> {
        self.state.lock().await.project.clone()
    }

    /// Whether a generation is currently in flight.
    pub async fn is_generating(&self) -> bool {
        self.state.lock().await.in_flight
    }

    // ========================================================================
    // Project Lifecycle
    // ========================================================================

    /// Create a new project: validate the brief, generate the outline, and
    /// persist the resulting chapters as `pending` in outline order.
    pub async fn create_project(
        &self,
        settings: &Settings,
        brief: BookBrief,
    ) -> Result<BookProject, OrchestratorError> {
        brief.validate()?;
        self.claim_flight().await?;

        let result = async {
            let backend = self.resolver.resolve(&settings.provider);
            info!(model = %backend.model_id, chapters = brief.number_of_chapters, "Creating project outline");
            let entries = outline::generate(&backend, &brief).await?;
            let project = BookProject::from_outline(brief, entries);
            self.store.save(&project).await?;
            Ok::<_, OrchestratorError>(project)
        }
        .await;

        let mut state = self.state.lock().await;
        state.in_flight = false;
        match result {
            Ok(project) => {
                state.project = Some(project.clone());
                Ok(project)
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the active project and its persisted state.
    pub async fn reset_project(&self) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock().await;
        if state.in_flight {
            return Err(OrchestratorError::Busy);
        }
        state.project = None;
        self.store.clear().await?;
        Ok(())
    }

    // ========================================================================
    // Generation Operations
    // ========================================================================

    /// Generate or refine a single chapter.
    ///
    /// Rejects with `Busy` when any generation is already in flight for the
    /// project. On failure the chapter reverts to `pending` and its
    /// existing content is left untouched.
    pub async fn generate_one(
        &self,
        settings: &Settings,
        chapter_id: &str,
        options: GenerationOptions,
    ) -> Result<(), OrchestratorError> {
        options.validate()?;
        {
            let mut state = self.state.lock().await;
            let project = state.project.as_ref().ok_or(OrchestratorError::NoProject)?;
            if project.chapter(chapter_id).is_none() {
                return Err(OrchestratorError::ChapterNotFound(chapter_id.to_string()));
            }
            if state.in_flight {
                return Err(OrchestratorError::Busy);
            }
            state.in_flight = true;
        }

        let result = self
            .generate_chapter_inner(settings, chapter_id, &options, false)
            .await;
        self.state.lock().await.in_flight = false;
        result
    }

    /// Sequentially generate every eligible chapter in project order.
    ///
    /// Each chapter's previous-chapters context is read from the current
    /// in-memory state at the time of its call, so a chapter regenerated
    /// earlier in the batch feeds its new content into later chapters. One
    /// chapter's failure is recorded and the batch moves on.
    pub async fn generate_all(
        &self,
        settings: &Settings,
        mode: BatchMode,
        options: GenerationOptions,
    ) -> Result<BatchReport, OrchestratorError> {
        options.validate()?;
        let chapter_ids: Vec<String> = {
            let mut state = self.state.lock().await;
            let project = state.project.as_ref().ok_or(OrchestratorError::NoProject)?;
            if state.in_flight {
                return Err(OrchestratorError::Busy);
            }
            let ids: Vec<String> = project.chapters.iter().map(|c| c.id.clone()).collect();
            state.in_flight = true;
            ids
        };

        let result = self.run_batch(settings, mode, &options, chapter_ids).await;
        self.state.lock().await.in_flight = false;
        result
    }

    async fn run_batch(
        &self,
        settings: &Settings,
        mode: BatchMode,
        options: &GenerationOptions,
        chapter_ids: Vec<String>,
    ) -> Result<BatchReport, OrchestratorError> {
        let mut report = BatchReport::default();

        for chapter_id in chapter_ids {
            let eligible = {
                let state = self.state.lock().await;
                let project = state.project.as_ref().ok_or(OrchestratorError::NoProject)?;
                match project.chapter(&chapter_id) {
                    // Deleted while the batch was running.
                    None => continue,
                    Some(ch) => match mode {
                        BatchMode::PendingOnly => ch.status != ChapterStatus::Completed,
                        BatchMode::AllOverwrite => true,
                    },
                }
            };
            if !eligible {
                continue;
            }

            let overwrite = mode == BatchMode::AllOverwrite;
            match self
                .generate_chapter_inner(settings, &chapter_id, options, overwrite)
                .await
            {
                Ok(()) => {
                    report.attempted += 1;
                    report.succeeded += 1;
                }
                Err(OrchestratorError::ChapterGeneration { title, source }) => {
                    report.attempted += 1;
                    warn!(chapter = %title, error = %source, "Chapter failed, continuing batch");
                    report.failures.push(ChapterFailure {
                        chapter_id,
                        title,
                        message: source.to_string(),
                    });
                }
                Err(OrchestratorError::ChapterNotFound(_)) => continue,
                Err(other) => return Err(other),
            }
        }

        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failures.len(),
            "Batch generation finished"
        );
        Ok(report)
    }

    /// Run one chapter generation. Assumes the in-flight flag is already
    /// claimed by the caller; the lock is released across the backend round
    /// trip and re-acquired to commit the outcome.
    async fn generate_chapter_inner(
        &self,
        settings: &Settings,
        chapter_id: &str,
        options: &GenerationOptions,
        overwrite: bool,
    ) -> Result<(), OrchestratorError> {
        // Mark the chapter generating, snapshot the request inputs, persist.
        let (request, title) = {
            let mut state = self.state.lock().await;
            let project = state.project.as_mut().ok_or(OrchestratorError::NoProject)?;
            let previous_content = project.previous_chapters_content(chapter_id);
            let brief = project.brief.clone();

            let chapter = project
                .chapter_mut(chapter_id)
                .ok_or_else(|| OrchestratorError::ChapterNotFound(chapter_id.to_string()))?;
            let title = chapter.title.clone();
            let refine = options
                .refine
                .unwrap_or(if overwrite { false } else { chapter.has_content() });

            let request = ChapterRequest {
                brief,
                chapter_outline: prompts::chapter_outline_block(&chapter.title, &chapter.subchapters),
                previous_content,
                mode: GenerationMode::from_parts(refine, &chapter.content),
                extra_instruction: options.extra_instruction.clone(),
                min_words: options.min_words.or(settings.defaults.min_words),
                temperature: options.temperature.or(settings.defaults.temperature),
                seed: options.seed.or(settings.defaults.seed),
            };

            chapter.status = ChapterStatus::Generating;
            project.touch();
            let snapshot = project.clone();

            if let Err(e) = self.store.save(&snapshot).await {
                // Never leave the chapter dangling in generating.
                if let Some(ch) = state
                    .project
                    .as_mut()
                    .and_then(|p| p.chapter_mut(chapter_id))
                {
                    ch.status = ChapterStatus::Pending;
                }
                return Err(e.into());
            }

            (request, title)
        };

        debug!(chapter = %title, refine = request.mode.is_refine(), "Generating chapter");
        let backend = self.resolver.resolve(&settings.provider);
        let outcome = chapter::generate(&backend, &request).await;

        // Commit the outcome and persist the transition.
        let mut state = self.state.lock().await;
        let project = state.project.as_mut().ok_or(OrchestratorError::NoProject)?;
        let chapter = project
            .chapter_mut(chapter_id)
            .ok_or_else(|| OrchestratorError::ChapterNotFound(chapter_id.to_string()))?;

        match outcome {
            Ok(content) => {
                chapter.content = content;
                chapter.status = ChapterStatus::Completed;
                project.touch();
                let snapshot = project.clone();
                self.store.save(&snapshot).await?;
                info!(chapter = %title, "Chapter completed");
                Ok(())
            }
            Err(source) => {
                chapter.status = ChapterStatus::Pending;
                project.touch();
                let snapshot = project.clone();
                if let Err(e) = self.store.save(&snapshot).await {
                    warn!(error = %e, "Failed to persist status revert");
                }
                Err(OrchestratorError::ChapterGeneration { title, source })
            }
        }
    }

    // ========================================================================
    // Direct Edits
    // ========================================================================

    /// Append a new pending chapter.
    pub async fn add_chapter(&self, title: &str) -> Result<Chapter, OrchestratorError> {
        if title.trim().is_empty() {
            return Err(OrchestratorError::EmptyChapterTitle);
        }
        let mut state = self.state.lock().await;
        let project = state.project.as_mut().ok_or(OrchestratorError::NoProject)?;
        let chapter = Chapter::new(title);
        project.chapters.push(chapter.clone());
        project.touch();
        let snapshot = project.clone();
        self.store.save(&snapshot).await?;
        Ok(chapter)
    }

    /// Apply a direct edit (rename, subchapter change, manual content
    /// edit). Rejected for a chapter that is currently generating.
    pub async fn update_chapter(
        &self,
        chapter_id: &str,
        patch: ChapterPatch,
    ) -> Result<(), OrchestratorError> {
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(OrchestratorError::EmptyChapterTitle);
        }
        let mut state = self.state.lock().await;
        let project = state.project.as_mut().ok_or(OrchestratorError::NoProject)?;
        let chapter = project
            .chapter_mut(chapter_id)
            .ok_or_else(|| OrchestratorError::ChapterNotFound(chapter_id.to_string()))?;
        if chapter.status == ChapterStatus::Generating {
            return Err(OrchestratorError::ChapterInFlight(chapter.title.clone()));
        }

        if let Some(title) = patch.title {
            chapter.title = title;
        }
        if let Some(subchapters) = patch.subchapters {
            chapter.subchapters = subchapters;
        }
        if let Some(content) = patch.content {
            chapter.content = content;
        }

        project.touch();
        let snapshot = project.clone();
        self.store.save(&snapshot).await?;
        Ok(())
    }

    /// Remove a chapter. Rejected for a chapter that is currently
    /// generating.
    pub async fn delete_chapter(&self, chapter_id: &str) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock().await;
        let project = state.project.as_mut().ok_or(OrchestratorError::NoProject)?;
        let index = project
            .chapter_index(chapter_id)
            .ok_or_else(|| OrchestratorError::ChapterNotFound(chapter_id.to_string()))?;
        if project.chapters[index].status == ChapterStatus::Generating {
            return Err(OrchestratorError::ChapterInFlight(
                project.chapters[index].title.clone(),
            ));
        }
        project.chapters.remove(index);
        project.touch();
        let snapshot = project.clone();
        self.store.save(&snapshot).await?;
        Ok(())
    }

    /// Move a chapter within the project order. Changing the order changes
    /// which chapters count as "previous" for future generation calls, so
    /// reordering is rejected while a generation is in flight.
    pub async fn reorder(&self, from: usize, to: usize) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock().await;
        if state.in_flight {
            return Err(OrchestratorError::Busy);
        }
        let project = state.project.as_mut().ok_or(OrchestratorError::NoProject)?;
        if from >= project.chapters.len() {
            return Err(OrchestratorError::InvalidIndex(from));
        }
        if to >= project.chapters.len() {
            return Err(OrchestratorError::InvalidIndex(to));
        }
        let chapter = project.chapters.remove(from);
        project.chapters.insert(to, chapter);
        project.touch();
        let snapshot = project.clone();
        self.store.save(&snapshot).await?;
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn claim_flight(&self) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock().await;
        if state.in_flight {
            return Err(OrchestratorError::Busy);
        }
        state.in_flight = true;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
