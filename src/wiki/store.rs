use rand::seq::SliceRandom;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

const EXTENSION: &str = "md";

#[derive(Debug, Error)]
pub enum EntryError {
    #[error("'{0}' is not a valid page title.")]
    InvalidTitle(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Title as stored on disk, which may differ in case from the lookup.
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Exact(String),
    Partial(Vec<String>),
}

/// Encyclopedia entries kept as `<title>.md` files in one directory. Every
/// call reads the directory afresh.
#[derive(Debug, Clone)]
pub struct EntryStore {
    dir: PathBuf,
}

impl EntryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<(), EntryError> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn path_for(&self, title: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", title, EXTENSION))
    }

    /// Sorted titles of every entry.
    pub fn list_entries(&self) -> Result<Vec<String>, EntryError> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut titles = Vec::new();
        for dir_entry in read_dir {
            let path = dir_entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                titles.push(stem.to_string());
            }
        }
        titles.sort();
        Ok(titles)
    }

    /// Stored title matching `title` case-insensitively. An exact match wins
    /// over other case variants.
    pub fn find_title(&self, title: &str) -> Result<Option<String>, EntryError> {
        let titles = self.list_entries()?;
        if titles.iter().any(|t| t == title) {
            return Ok(Some(title.to_string()));
        }
        let wanted = title.to_lowercase();
        Ok(titles.into_iter().find(|t| t.to_lowercase() == wanted))
    }

    pub fn get_entry(&self, title: &str) -> Result<Option<Entry>, EntryError> {
        let Some(stored) = self.find_title(title)? else {
            return Ok(None);
        };
        match std::fs::read_to_string(self.path_for(&stored)) {
            Ok(content) => Ok(Some(Entry {
                title: stored,
                content,
            })),
            // Removed between listing and reading
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write an entry, replacing any entry whose title matches
    /// case-insensitively.
    pub fn save_entry(&self, title: &str, content: &str) -> Result<(), EntryError> {
        let title = validate_title(title)?;
        self.ensure_dir()?;

        if let Some(existing) = self.find_title(title)? {
            if existing != title {
                std::fs::remove_file(self.path_for(&existing))?;
            }
        }

        let content = content.replace("\r\n", "\n");
        std::fs::write(self.path_for(title), content)?;
        tracing::info!("Saved wiki entry '{}'", title);
        Ok(())
    }

    pub fn search(&self, query: &str) -> Result<SearchOutcome, EntryError> {
        let query = query.trim().to_lowercase();
        let titles = self.list_entries()?;

        if let Some(exact) = titles.iter().find(|t| t.to_lowercase() == query) {
            return Ok(SearchOutcome::Exact(exact.clone()));
        }

        let partial = titles
            .into_iter()
            .filter(|t| t.to_lowercase().contains(&query))
            .collect();
        Ok(SearchOutcome::Partial(partial))
    }

    pub fn random_title(&self) -> Result<Option<String>, EntryError> {
        let titles = self.list_entries()?;
        Ok(titles.choose(&mut rand::thread_rng()).cloned())
    }
}

/// Titles become file names, so they may not escape the entries directory.
pub fn validate_title(title: &str) -> Result<&str, EntryError> {
    let trimmed = title.trim();
    let invalid = trimmed.is_empty()
        || trimmed.starts_with('.')
        || trimmed.contains(['/', '\\', '\0']);
    if invalid {
        return Err(EntryError::InvalidTitle(title.to_string()));
    }
    Ok(trimmed)
}
