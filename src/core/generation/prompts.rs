//! Instruction assembly for the generation backends.
//!
//! Prompts ask for a JSON answer in a fixed shape; extraction in
//! [`super::response`] tolerates prose and code fences around it.

use crate::core::generation::chapter::{ChapterRequest, GenerationMode};
use crate::core::models::BookBrief;
use std::fmt::Write;

pub const OUTLINE_SYSTEM_PROMPT: &str =
    "You are an AI assistant helping a user create a book outline.";

pub const CHAPTER_SYSTEM_PROMPT: &str = "You are an AI assistant specialized in writing books. \
Your task is to write or refine the content for a specific chapter of a book, maintaining \
narrative coherence with the previous chapters. The book should be written with consideration \
of the target audience, language and difficulty level.\n\n\
Do not add chapter numbering in the content, just the text itself.\n\n\
If existing content for the chapter is provided as 'Current Content', your task is to refine \
or modify it based on the 'Additional Instructions'. If no 'Current Content' is provided, you \
should write the chapter from scratch based on the outline.";

/// User prompt for outline generation.
pub fn outline_user_prompt(brief: &BookBrief) -> String {
    format!(
        "Based on the following information, generate an outline for the book, including \
         chapter titles and subchapters. The number of chapters is a suggestion and you can \
         deviate from it if needed.\n\n\
         Book Description: {}\n\
         Target Audience: {}\n\
         Language: {}\n\
         Difficulty Level: {}\n\
         Number of Chapters: {}\n\n\
         Respond with a single JSON object of the form \
         {{\"outline\": [{{\"chapterTitle\": \"...\", \"subchapters\": [\"...\"]}}]}}.",
        brief.description,
        brief.target_audience,
        brief.language,
        brief.difficulty_level,
        brief.number_of_chapters,
    )
}

/// Serialize one chapter's outline into a single instruction block.
pub fn chapter_outline_block(title: &str, subchapters: &[String]) -> String {
    let mut block = format!("Title: {}", title);
    if !subchapters.is_empty() {
        write!(block, "\nSubtopics: {}", subchapters.join(", ")).ok();
    }
    block
}

/// User prompt for chapter content generation.
pub fn chapter_user_prompt(request: &ChapterRequest) -> String {
    let mut prompt = format!(
        "Book Description: {}\n\
         Target Audience: {}\n\
         Language: {}\n\
         Difficulty Level: {}\n\n\
         Previous Chapters Content:\n{}\n\n\
         Current Chapter Outline:\n{}\n",
        request.brief.description,
        request.brief.target_audience,
        request.brief.language,
        request.brief.difficulty_level,
        request.previous_content,
        request.chapter_outline,
    );

    if let GenerationMode::Refine { existing } = &request.mode {
        write!(
            prompt,
            "\nCurrent Content (to be refined or modified):\n{}\n",
            existing
        )
        .ok();
    }

    if let Some(extra) = &request.extra_instruction {
        write!(prompt, "\nAdditional Instructions: {}\n", extra).ok();
    }

    if let Some(min_words) = request.min_words {
        write!(
            prompt,
            "\nThe chapter content should have at least {} words.\n",
            min_words
        )
        .ok();
    }

    prompt.push_str(
        "\nGenerate the new, complete content for the current chapter. The content should be \
         well-written, engaging, and consistent with the overall book narrative. Respond with \
         a single JSON object of the form {\"chapterContent\": \"...\"}.",
    );

    prompt
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn brief() -> BookBrief {
        BookBrief {
            description: "A beginner's guide to sourdough".to_string(),
            target_audience: "home cooks".to_string(),
            language: "English".to_string(),
            difficulty_level: "beginner".to_string(),
            number_of_chapters: 5,
        }
    }

    fn request(mode: GenerationMode) -> ChapterRequest {
        ChapterRequest {
            brief: brief(),
            chapter_outline: chapter_outline_block(
                "Starters",
                &["Flour".to_string(), "Hydration".to_string()],
            ),
            previous_content: "## Intro\n\nWhy sourdough.".to_string(),
            mode,
            extra_instruction: None,
            min_words: None,
            temperature: None,
            seed: None,
        }
    }

    #[test]
    fn outline_prompt_carries_all_brief_fields() {
        let prompt = outline_user_prompt(&brief());
        assert!(prompt.contains("A beginner's guide to sourdough"));
        assert!(prompt.contains("home cooks"));
        assert!(prompt.contains("Number of Chapters: 5"));
        assert!(prompt.contains("suggestion"));
        assert!(prompt.contains("chapterTitle"));
    }

    #[test]
    fn outline_block_includes_subtopics_only_when_present() {
        let with = chapter_outline_block("Starters", &["Flour".to_string()]);
        assert_eq!(with, "Title: Starters\nSubtopics: Flour");

        let without = chapter_outline_block("Starters", &[]);
        assert_eq!(without, "Title: Starters");
    }

    #[test]
    fn scratch_prompt_never_references_existing_content() {
        let prompt = chapter_user_prompt(&request(GenerationMode::Scratch));
        assert!(!prompt.contains("Current Content (to be refined"));
        assert!(prompt.contains("Current Chapter Outline:\nTitle: Starters"));
        assert!(prompt.contains("## Intro"));
    }

    #[test]
    fn refine_prompt_presents_existing_content_for_revision() {
        let mode = GenerationMode::Refine {
            existing: "old draft of the chapter".to_string(),
        };
        let prompt = chapter_user_prompt(&request(mode));
        assert!(prompt.contains("Current Content (to be refined or modified):"));
        assert!(prompt.contains("old draft of the chapter"));
    }

    #[test]
    fn optional_sections_render_when_set() {
        let mut req = request(GenerationMode::Scratch);
        req.extra_instruction = Some("use a friendly tone".to_string());
        req.min_words = Some(800);
        let prompt = chapter_user_prompt(&req);
        assert!(prompt.contains("Additional Instructions: use a friendly tone"));
        assert!(prompt.contains("at least 800 words"));
    }

    #[test]
    fn system_prompt_forbids_chapter_numbering() {
        assert!(CHAPTER_SYSTEM_PROMPT.contains("Do not add chapter numbering"));
    }
}
