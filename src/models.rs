use serde::{Deserialize, Serialize};

/// A post as read back from the store, with its body rendered to HTML.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub html: String,
}

/// Front-matter fields a stored post must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMarkdownAttributes {
    pub title: String,
}

/// Input for creating (or overwriting) a post.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub markdown: String,
}

/// Why a stored document failed attribute validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    #[error("no front matter block")]
    MissingFrontMatter,
    #[error("no title attribute")]
    MissingTitle,
    #[error("title is empty")]
    EmptyTitle,
    #[error("malformed front matter ({0})")]
    Malformed(String),
}
