//! Content module - post models, normalization and rendering

mod normalize;
mod post;
mod render;
pub mod richtext;

pub use normalize::{normalize_detail, normalize_summary, parse_timestamp};
pub use post::{ContentSection, NavLink, Navigation, PostDetail, PostSummary};
pub use render::{
    estimate_reading_minutes, reading_minutes, render_content, total_words, RenderedSection,
    WORDS_PER_MINUTE,
};
pub use richtext::RichTextBlock;
