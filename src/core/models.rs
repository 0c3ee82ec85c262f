//! Domain model for book drafting projects.
//!
//! A `BookProject` is the single top-level aggregate: the immutable book
//! brief plus an ordered list of chapters. Chapter order is significant —
//! it defines which chapters count as "previous" when content is generated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Validation
// ============================================================================

/// Input constraint violations, surfaced before any backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("book description must not be empty")]
    EmptyDescription,

    #[error("target audience is too short")]
    AudienceTooShort,

    #[error("language must not be empty")]
    EmptyLanguage,

    #[error("difficulty level must not be empty")]
    EmptyDifficulty,

    #[error("number of chapters must be at least 1")]
    NonPositiveChapterCount,

    #[error("temperature must be within [0, 1]")]
    TemperatureOutOfRange,
}

/// Minimum length for the target audience field.
const MIN_AUDIENCE_LEN: usize = 3;

// ============================================================================
// Book Brief
// ============================================================================

/// Immutable book-level input, captured once at project creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookBrief {
    pub description: String,
    pub target_audience: String,
    pub language: String,
    pub difficulty_level: String,
    /// Desired chapter count. A soft target: the outline generator may
    /// return more or fewer chapters than requested.
    pub number_of_chapters: u32,
}

impl BookBrief {
    /// Check the brief's field constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        if self.target_audience.trim().len() < MIN_AUDIENCE_LEN {
            return Err(ValidationError::AudienceTooShort);
        }
        if self.language.trim().is_empty() {
            return Err(ValidationError::EmptyLanguage);
        }
        if self.difficulty_level.trim().is_empty() {
            return Err(ValidationError::EmptyDifficulty);
        }
        if self.number_of_chapters == 0 {
            return Err(ValidationError::NonPositiveChapterCount);
        }
        Ok(())
    }
}

// ============================================================================
// Outline
// ============================================================================

/// One proposed chapter from the outline generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineEntry {
    pub title: String,
    pub subchapters: Vec<String>,
}

// ============================================================================
// Chapter
// ============================================================================

/// Lifecycle state of a single chapter.
///
/// Failure during generation reverts `Generating` back to `Pending`; a
/// chapter is never left in `Generating` after a generation call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterStatus {
    Pending,
    Generating,
    Completed,
}

/// The mutable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub subchapters: Vec<String>,
    pub content: String,
    pub status: ChapterStatus,
}

impl Chapter {
    /// Create a pending chapter from an outline entry.
    pub fn from_outline(entry: OutlineEntry) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: entry.title,
            subchapters: entry.subchapters,
            content: String::new(),
            status: ChapterStatus::Pending,
        }
    }

    /// Create an empty pending chapter, as when the user appends one by hand.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            subchapters: Vec::new(),
            content: String::new(),
            status: ChapterStatus::Pending,
        }
    }

    /// Whether the chapter carries usable prose.
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

// ============================================================================
// Project
// ============================================================================

/// Coarse project lifecycle tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    New,
    Outlining,
    Generating,
    Editing,
}

/// The top-level aggregate: brief fields, status, timestamps and the
/// ordered chapter list. One active project at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookProject {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: ProjectStatus,
    #[serde(flatten)]
    pub brief: BookBrief,
    pub chapters: Vec<Chapter>,
}

impl BookProject {
    /// Assemble a freshly outlined project. Chapters keep outline order and
    /// start out `Pending`.
    pub fn from_outline(brief: BookBrief, outline: Vec<OutlineEntry>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            status: ProjectStatus::Editing,
            brief,
            chapters: outline.into_iter().map(Chapter::from_outline).collect(),
        }
    }

    /// Bump the modification timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn chapter(&self, chapter_id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == chapter_id)
    }

    pub fn chapter_mut(&mut self, chapter_id: &str) -> Option<&mut Chapter> {
        self.chapters.iter_mut().find(|c| c.id == chapter_id)
    }

    pub fn chapter_index(&self, chapter_id: &str) -> Option<usize> {
        self.chapters.iter().position(|c| c.id == chapter_id)
    }

    /// Concatenation of the chapters strictly before `chapter_id` in project
    /// order that are completed or already carry content, each rendered as a
    /// titled section. This is the "previous chapters" context fed into
    /// content generation.
    pub fn previous_chapters_content(&self, chapter_id: &str) -> String {
        let end = self.chapter_index(chapter_id).unwrap_or(0);
        self.chapters[..end]
            .iter()
            .filter(|c| c.status == ChapterStatus::Completed || c.has_content())
            .map(|c| format!("## {}\n\n{}", c.title, c.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn brief() -> BookBrief {
        BookBrief {
            description: "A beginner's guide to sourdough".to_string(),
            target_audience: "home cooks".to_string(),
            language: "English".to_string(),
            difficulty_level: "beginner".to_string(),
            number_of_chapters: 5,
        }
    }

    #[test]
    fn valid_brief_passes() {
        assert!(brief().validate().is_ok());
    }

    #[rstest]
    #[case::empty_description("description", "", ValidationError::EmptyDescription)]
    #[case::blank_description("description", "   ", ValidationError::EmptyDescription)]
    #[case::short_audience("target_audience", "ab", ValidationError::AudienceTooShort)]
    #[case::empty_language("language", "", ValidationError::EmptyLanguage)]
    #[case::empty_difficulty("difficulty_level", "", ValidationError::EmptyDifficulty)]
    fn invalid_brief_fields(
        #[case] field: &str,
        #[case] value: &str,
        #[case] expected: ValidationError,
    ) {
        let mut b = brief();
        match field {
            "description" => b.description = value.to_string(),
            "target_audience" => b.target_audience = value.to_string(),
            "language" => b.language = value.to_string(),
            "difficulty_level" => b.difficulty_level = value.to_string(),
            _ => unreachable!(),
        }
        assert_eq!(b.validate(), Err(expected));
    }

    #[test]
    fn zero_chapters_rejected() {
        let mut b = brief();
        b.number_of_chapters = 0;
        assert_eq!(b.validate(), Err(ValidationError::NonPositiveChapterCount));
    }

    #[test]
    fn project_from_outline_creates_pending_chapters_in_order() {
        let outline = vec![
            OutlineEntry { title: "Starters".to_string(), subchapters: vec!["Flour".to_string()] },
            OutlineEntry { title: "Levain".to_string(), subchapters: vec![] },
        ];
        let project = BookProject::from_outline(brief(), outline);

        assert_eq!(project.status, ProjectStatus::Editing);
        assert_eq!(project.chapters.len(), 2);
        assert_eq!(project.chapters[0].title, "Starters");
        assert_eq!(project.chapters[1].title, "Levain");
        assert!(project
            .chapters
            .iter()
            .all(|c| c.status == ChapterStatus::Pending && c.content.is_empty()));
    }

    #[test]
    fn previous_content_uses_only_strictly_earlier_chapters() {
        let mut project = BookProject::from_outline(
            brief(),
            vec![
                OutlineEntry { title: "A".to_string(), subchapters: vec![] },
                OutlineEntry { title: "B".to_string(), subchapters: vec![] },
                OutlineEntry { title: "C".to_string(), subchapters: vec![] },
            ],
        );
        for ch in &mut project.chapters {
            ch.content = format!("{} body", ch.title);
            ch.status = ChapterStatus::Completed;
        }

        let b_id = project.chapters[1].id.clone();
        let context = project.previous_chapters_content(&b_id);
        assert!(context.contains("## A"));
        assert!(context.contains("A body"));
        assert!(!context.contains("C body"));
    }

    #[test]
    fn previous_content_skips_empty_pending_chapters() {
        let mut project = BookProject::from_outline(
            brief(),
            vec![
                OutlineEntry { title: "A".to_string(), subchapters: vec![] },
                OutlineEntry { title: "B".to_string(), subchapters: vec![] },
            ],
        );
        // A is pending and empty, so B sees no previous context.
        let b_id = project.chapters[1].id.clone();
        assert_eq!(project.previous_chapters_content(&b_id), "");

        // A pending chapter with manually edited content does count.
        project.chapters[0].content = "draft text".to_string();
        assert!(project.previous_chapters_content(&b_id).contains("draft text"));
    }

    #[test]
    fn chapter_status_serializes_lowercase() {
        let json = serde_json::to_string(&ChapterStatus::Generating).unwrap();
        assert_eq!(json, "\"generating\"");
    }

    #[test]
    fn project_roundtrips_through_json() {
        let project = BookProject::from_outline(
            brief(),
            vec![OutlineEntry { title: "A".to_string(), subchapters: vec![] }],
        );
        let json = serde_json::to_string(&project).unwrap();
        assert!(json.contains("\"numberOfChapters\":5"));
        let back: BookProject = serde_json::from_str(&json).unwrap();
        assert_eq!(back, project);
    }
}
