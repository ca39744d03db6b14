use std::path::Path;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, error, info, warn};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::front_matter::{parse_document, render_document};
use crate::markdown::render_markdown_to_html;
use crate::models::{NewPost, Post};
use crate::store::{self, ObjectStore};

const POSTS_PATH: &str = "posts";
const EXTENSION: &str = ".md";

/// Object name of the post with the given slug.
pub fn file_name(slug: &str) -> String {
    format!("{POSTS_PATH}/{slug}{EXTENSION}")
}

/// Slug for a listed object name: the last path segment minus its last
/// three characters. Folder markers and names too short to carry an
/// extension yield nothing.
fn slug_from_object_name(name: &str) -> Option<&str> {
    if name.ends_with('/') {
        return None;
    }

    let base = match name.rfind('/') {
        Some(i) => &name[i + 1..],
        None => name,
    };

    let len = base.chars().count();
    if len <= EXTENSION.len() {
        return None;
    }

    let (end, _) = base.char_indices().nth(len - EXTENSION.len())?;
    Some(&base[..end]).filter(|slug| !slug.is_empty())
}

fn validate_slug(slug: &str) -> Result<()> {
    let reason = if slug.is_empty() {
        "slug is empty"
    } else if slug == "." || slug == ".." {
        "slug is a relative path component"
    } else if slug.contains(['/', '\\']) {
        "slug contains a path separator"
    } else if slug.chars().any(char::is_control) {
        "slug contains control characters"
    } else {
        return Ok(());
    };

    Err(Error::InvalidSlug {
        slug: slug.to_string(),
        reason,
    })
}

/// Posts kept as markdown objects under `posts/` in an object store.
#[derive(Clone, Debug)]
pub struct PostRepository {
    store: Arc<dyn ObjectStore>,
}

impl PostRepository {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(store::connect(config)?))
    }

    /// Builds the repository from a TOML configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = StoreConfig::load(path).await?;
        Self::from_config(&config)
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Every post in the store, fetched concurrently and returned in listing
    /// order. The first post that fails to load fails the whole list and the
    /// remaining fetches are dropped.
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let prefix = format!("{POSTS_PATH}/");
        let names = self.store.list(&prefix, "/").await?;

        let slugs: Vec<&str> = names
            .iter()
            .filter_map(|name| slug_from_object_name(name))
            .filter(|slug| match validate_slug(slug) {
                Ok(()) => true,
                Err(e) => {
                    warn!(slug, error = %e, "Skipping object with unusable name");
                    false
                }
            })
            .collect();

        debug!(objects = names.len(), posts = slugs.len(), "Loading posts");
        try_join_all(slugs.into_iter().map(|slug| self.get_post(slug))).await
    }

    pub async fn get_post(&self, slug: &str) -> Result<Post> {
        validate_slug(slug)?;
        let path = file_name(slug);

        let contents = self.store.download(&path).await?;
        let text = String::from_utf8_lossy(&contents);

        let document = parse_document(&text).map_err(|reason| {
            error!(path = %path, %reason, "Post is missing attributes");
            Error::InvalidPost {
                path: path.clone(),
                reason,
            }
        })?;

        let html = render_markdown_to_html(&document.body);
        Ok(Post {
            slug: slug.to_string(),
            title: document.attributes.title,
            html,
        })
    }

    /// Writes the post, replacing any existing one with the same slug, and
    /// returns it as read back from the store.
    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        validate_slug(&post.slug)?;
        let path = file_name(&post.slug);
        let document = render_document(&post.title, &post.markdown)?;

        self.store.upload(&path, document.into_bytes()).await?;
        info!(path = %path, "Post saved");

        self.get_post(&post.slug).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttributeError;
    use crate::store::MemoryStore;

    fn repository(store: MemoryStore) -> (PostRepository, Arc<MemoryStore>) {
        let store = Arc::new(store);
        (PostRepository::new(store.clone()), store)
    }

    fn new_post(title: &str, slug: &str, markdown: &str) -> NewPost {
        NewPost {
            title: title.into(),
            slug: slug.into(),
            markdown: markdown.into(),
        }
    }

    #[test]
    fn file_name_follows_posts_layout() {
        assert_eq!(file_name("hello"), "posts/hello.md");
    }

    #[test]
    fn derives_slugs_from_object_names() {
        assert_eq!(slug_from_object_name("posts/hello.md"), Some("hello"));
        assert_eq!(slug_from_object_name("hello.md"), Some("hello"));
        assert_eq!(slug_from_object_name("posts/"), None);
        assert_eq!(slug_from_object_name("posts/.md"), None);
        assert_eq!(slug_from_object_name("posts/ab"), None);
        assert_eq!(slug_from_object_name("posts/a.md"), Some("a"));
        assert_eq!(slug_from_object_name("posts/café.md"), Some("café"));
        assert_eq!(slug_from_object_name("posts/notes.txt"), Some("notes."));
    }

    #[test]
    fn validates_slugs() {
        assert!(validate_slug("hello-world").is_ok());
        for slug in ["", ".", "..", "a/b", "a\\b", "tab\there"] {
            assert!(
                matches!(validate_slug(slug), Err(Error::InvalidSlug { .. })),
                "{slug:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn gets_a_stored_post() {
        let (repo, _) = repository(MemoryStore::with_objects([(
            "posts/hello.md",
            "---\ntitle: Hello\n---\n\nHi there",
        )]));

        let post = repo.get_post("hello").await.unwrap();
        assert_eq!(
            post,
            Post {
                slug: "hello".into(),
                title: "Hello".into(),
                html: "<p>Hi there</p>\n".into(),
            }
        );
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let (repo, _) = repository(MemoryStore::new());
        let err = repo.get_post("nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { ref path } if path == "posts/nope.md"));
    }

    #[tokio::test]
    async fn post_without_title_is_invalid() {
        let (repo, _) = repository(MemoryStore::with_objects([(
            "posts/untitled.md",
            "---\nauthor: someone\n---\n\nbody",
        )]));

        let err = repo.get_post("untitled").await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidPost { ref path, reason: AttributeError::MissingTitle }
                if path == "posts/untitled.md"
        ));
    }

    #[tokio::test]
    async fn post_without_front_matter_is_invalid() {
        let (repo, _) = repository(MemoryStore::with_objects([(
            "posts/bare.md",
            "Just some text.",
        )]));

        let err = repo.get_post("bare").await.unwrap_err();
        assert!(matches!(err, Error::InvalidPost { .. }));
    }

    #[tokio::test]
    async fn get_rejects_path_like_slugs() {
        let (repo, _) = repository(MemoryStore::new());
        let err = repo.get_post("../secrets").await.unwrap_err();
        assert!(matches!(err, Error::InvalidSlug { .. }));
    }

    #[tokio::test]
    async fn creates_then_reads_back() {
        let (repo, store) = repository(MemoryStore::new());

        let post = repo
            .create_post(&new_post("New", "new-post", "# Heading"))
            .await
            .unwrap();

        assert_eq!(
            post,
            Post {
                slug: "new-post".into(),
                title: "New".into(),
                html: "<h1>Heading</h1>\n".into(),
            }
        );
        assert_eq!(
            store.get("posts/new-post.md").await.unwrap(),
            b"---\ntitle: New\n---\n\n# Heading"
        );
        assert_eq!(repo.get_post("new-post").await.unwrap(), post);
    }

    #[tokio::test]
    async fn creating_twice_converges() {
        let (repo, store) = repository(MemoryStore::new());
        let input = new_post("Same", "same", "Some *emphasis*.");

        let first = repo.create_post(&input).await.unwrap();
        let stored = store.get("posts/same.md").await.unwrap();
        let second = repo.create_post(&input).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.get("posts/same.md").await.unwrap(), stored);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn create_overwrites_existing_post() {
        let (repo, _) = repository(MemoryStore::with_objects([(
            "posts/hello.md",
            "---\ntitle: Hello\n---\n\nold",
        )]));

        let post = repo
            .create_post(&new_post("Hello again", "hello", "new"))
            .await
            .unwrap();
        assert_eq!(post.title, "Hello again");
        assert_eq!(post.html, "<p>new</p>\n");
    }

    #[tokio::test]
    async fn create_keeps_titles_with_colons() {
        let (repo, _) = repository(MemoryStore::new());
        let post = repo
            .create_post(&new_post("Rust: a retrospective", "rust", "text"))
            .await
            .unwrap();
        assert_eq!(post.title, "Rust: a retrospective");
    }

    #[tokio::test]
    async fn empty_title_is_written_then_reported_invalid() {
        let (repo, store) = repository(MemoryStore::new());

        let err = repo
            .create_post(&new_post("", "blank", "body"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::InvalidPost { reason: AttributeError::EmptyTitle, .. }
        ));
        assert!(store.get("posts/blank.md").await.is_some());
    }

    #[tokio::test]
    async fn multiline_title_is_rejected_before_writing() {
        let (repo, store) = repository(MemoryStore::new());

        let err = repo
            .create_post(&new_post("one\n---\ntwo", "sneaky", "body"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidTitle { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn unicode_line_separator_in_title_is_rejected_before_writing() {
        let (repo, store) = repository(MemoryStore::new());

        let err = repo
            .create_post(&new_post("a\u{2028}b", "separated", "b"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidTitle { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn lists_posts_saved_with_a_byte_order_mark() {
        let (repo, _) = repository(MemoryStore::with_objects([
            ("posts/bom.md", "\u{feff}---\ntitle: Bom\n---\n\nbody"),
            ("posts/plain.md", "---\ntitle: Plain\n---\n\nbody"),
        ]));

        let posts = repo.list_posts().await.unwrap();
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Bom", "Plain"]);
    }

    #[tokio::test]
    async fn lists_posts_skipping_markers_and_nested_objects() {
        let (repo, _) = repository(MemoryStore::with_objects([
            ("posts/", ""),
            ("posts/.md", "---\ntitle: Nameless\n---\n"),
            ("posts/b.md", "---\ntitle: Bee\n---\n\nsecond"),
            ("posts/a.md", "---\ntitle: Ay\n---\n\nfirst"),
            ("posts/drafts/c.md", "---\ntitle: Draft\n---\n"),
            ("pages/about.md", "---\ntitle: About\n---\n"),
        ]));

        let posts = repo.list_posts().await.unwrap();
        let summary: Vec<(&str, &str)> = posts
            .iter()
            .map(|p| (p.slug.as_str(), p.title.as_str()))
            .collect();
        assert_eq!(summary, vec![("a", "Ay"), ("b", "Bee")]);
        assert_eq!(posts[0].html, "<p>first</p>\n");
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let (repo, _) = repository(MemoryStore::new());
        assert!(repo.list_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_broken_post_fails_the_whole_list() {
        let (repo, _) = repository(MemoryStore::with_objects([
            ("posts/good.md", "---\ntitle: Good\n---\n\nfine"),
            ("posts/broken.md", "no front matter at all"),
        ]));

        let err = repo.list_posts().await.unwrap_err();
        assert!(matches!(err, Error::InvalidPost { ref path, .. } if path == "posts/broken.md"));
    }

    #[tokio::test]
    async fn non_markdown_object_fails_the_list() {
        // "notes.txt" becomes the slug "notes." whose object does not exist.
        let (repo, _) = repository(MemoryStore::with_objects([
            ("posts/good.md", "---\ntitle: Good\n---\n\nfine"),
            ("posts/notes.txt", "plain"),
        ]));

        let err = repo.list_posts().await.unwrap_err();
        assert!(matches!(err, Error::NotFound { ref path } if path == "posts/notes..md"));
    }

    #[tokio::test]
    async fn works_over_a_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::Local(crate::config::LocalConfig {
            root: dir.path().to_path_buf(),
        });
        let repo = PostRepository::from_config(&config).unwrap();

        repo.create_post(&new_post("Local", "local", "on *disk*"))
            .await
            .unwrap();

        let posts = repo.list_posts().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Local");
        assert_eq!(posts[0].html, "<p>on <em>disk</em></p>\n");
    }
}
