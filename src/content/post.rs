//! Post models

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::richtext::RichTextBlock;

/// A post as shown on the listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: Option<String>,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A full post as shown on its own page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    /// CMS document id, used to anchor neighbour queries
    pub id: Option<String>,
    pub uid: Option<String>,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub last_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: Option<String>,
    pub content: Vec<ContentSection>,
}

impl PostDetail {
    /// The listing view of this post
    pub fn summary(&self) -> PostSummary {
        PostSummary {
            uid: self.uid.clone(),
            first_publication_date: self.first_publication_date,
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            author: self.author.clone(),
        }
    }
}

/// A titled group of rich-text blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub heading: String,
    pub body: Vec<RichTextBlock>,
}

/// Link to a neighbouring post; both fields are `None` when there is none
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub uid: Option<String>,
    pub title: Option<String>,
}

impl NavLink {
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether there is a post to link to
    pub fn is_present(&self) -> bool {
        self.uid.as_deref().is_some_and(|uid| !uid.is_empty())
    }
}

/// Previous and next posts by publication date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub prev_post: NavLink,
    pub next_post: NavLink,
}
