//! Post body rendering and reading time

use serde::Serialize;

use super::post::ContentSection;
use super::richtext;
use crate::helpers::{strip_html, word_count};

/// Average reading speed used for estimates
pub const WORDS_PER_MINUTE: usize = 200;

/// A content section ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSection {
    pub heading: String,
    /// Serialized HTML of the section's blocks, in input order
    pub body: String,
}

/// Serialize each section's blocks to markup
pub fn render_content(sections: &[ContentSection]) -> Vec<RenderedSection> {
    sections
        .iter()
        .map(|section| RenderedSection {
            heading: section.heading.clone(),
            body: richtext::as_html(&section.body),
        })
        .collect()
}

/// Words across headings and bodies of already rendered sections
pub fn total_words(rendered: &[RenderedSection]) -> usize {
    rendered
        .iter()
        .map(|section| word_count(&section.heading) + word_count(&strip_html(&section.body)))
        .sum()
}

/// Reading time of rendered sections, in whole minutes rounded up
pub fn reading_minutes(rendered: &[RenderedSection]) -> usize {
    minutes_for(total_words(rendered))
}

/// Reading time of raw sections, in whole minutes rounded up
pub fn estimate_reading_minutes(sections: &[ContentSection]) -> usize {
    reading_minutes(&render_content(sections))
}

fn minutes_for(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE)
}
