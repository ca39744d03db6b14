//! Splitting stored post text into typed attributes and a markdown body, and
//! producing that text for new posts.

use gray_matter::{engine::YAML, Matter};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{AttributeError, PostMarkdownAttributes};

const DELIMITER: &str = "---";

/// Front matter as it appears on disk, before validation.
#[derive(Deserialize, Debug, Default)]
struct RawAttributes {
    #[serde(default)]
    title: Option<ScalarTitle>,
}

/// Hand-written headers may carry a bare number or boolean as the title.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum ScalarTitle {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl ScalarTitle {
    /// The title as text, or `None` when the value is falsy.
    fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) if text.is_empty() => None,
            Self::Text(text) => Some(text),
            Self::Integer(0) | Self::Bool(false) => None,
            Self::Integer(n) => Some(n.to_string()),
            Self::Float(f) if f == 0.0 || f.is_nan() => None,
            Self::Float(f) => Some(f.to_string()),
            Self::Bool(true) => Some("true".to_string()),
        }
    }
}

#[derive(Serialize)]
struct FrontMatterOut<'a> {
    title: &'a str,
}

impl TryFrom<RawAttributes> for PostMarkdownAttributes {
    type Error = AttributeError;

    fn try_from(raw: RawAttributes) -> Result<Self, Self::Error> {
        let title = raw.title.ok_or(AttributeError::MissingTitle)?;
        match title.into_text() {
            Some(title) => Ok(Self { title }),
            None => Err(AttributeError::EmptyTitle),
        }
    }
}

#[derive(Debug)]
pub struct PostDocument {
    pub attributes: PostMarkdownAttributes,
    pub body: String,
}

pub fn parse_document(text: &str) -> Result<PostDocument, AttributeError> {
    // Editors on some platforms prefix files with a byte-order mark.
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let matter = Matter::<YAML>::new();
    let parsed = matter
        .parse::<RawAttributes>(text)
        .map_err(|e| AttributeError::Malformed(e.to_string()))?;

    let raw = parsed.data.ok_or(AttributeError::MissingFrontMatter)?;
    let attributes = PostMarkdownAttributes::try_from(raw)?;

    Ok(PostDocument {
        attributes,
        body: parsed.content,
    })
}

/// Builds `---\n{front matter}---\n\n{markdown}`.
///
/// The title goes through the YAML serializer, so a plain title comes out as
/// `title: {title}` and anything YAML would misread is quoted. Titles that
/// would not read back unchanged are refused.
pub fn render_document(title: &str, markdown: &str) -> Result<String> {
    // YAML folds all of these inside quoted scalars.
    if title.contains(['\n', '\r', '\u{85}', '\u{2028}', '\u{2029}']) {
        return Err(Error::InvalidTitle {
            reason: "title contains a line break",
        });
    }

    let header = serde_yaml::to_string(&FrontMatterOut { title })?;
    let document = format!("{DELIMITER}\n{header}{DELIMITER}\n\n{markdown}");

    // An empty title fails to parse; it is still written and reported on read.
    if let Ok(parsed) = parse_document(&document) {
        if parsed.attributes.title != title {
            return Err(Error::InvalidTitle {
                reason: "title does not survive the front matter format",
            });
        }
    }

    Ok(document)
}
