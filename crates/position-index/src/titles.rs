//! Video title lookup.
//!
//! Titles come from an external fetcher; this side only reads what it left
//! behind. The cache lives for one run and is passed to whoever needs it.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{PipelineError, Result};

pub trait TitleSource {
    fn title(&self, video_id: &str) -> Option<String>;
}

/// No titles at all. Used when no titles file is configured.
pub struct NoTitles;

impl TitleSource for NoTitles {
    fn title(&self, _video_id: &str) -> Option<String> {
        None
    }
}

/// `{ "<video_id>": "<title>" }` as written by the title fetcher.
#[derive(Debug, Default, Clone)]
pub struct TitleFile {
    titles: HashMap<String, String>,
}

impl TitleFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let titles: HashMap<String, String> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PipelineError::json(path, e))?;
        tracing::info!(path = %path.display(), titles = titles.len(), "Loaded video titles");
        Ok(Self { titles })
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

impl FromIterator<(String, String)> for TitleFile {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            titles: iter.into_iter().collect(),
        }
    }
}

impl TitleSource for TitleFile {
    fn title(&self, video_id: &str) -> Option<String> {
        self.titles
            .get(video_id)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

/// Memoizes lookups against a source for the duration of one run.
pub struct TitleCache<'a> {
    source: &'a dyn TitleSource,
    cache: HashMap<String, Option<String>>,
    misses: usize,
}

impl<'a> TitleCache<'a> {
    pub fn new(source: &'a dyn TitleSource) -> Self {
        Self {
            source,
            cache: HashMap::new(),
            misses: 0,
        }
    }

    pub fn get(&mut self, video_id: &str) -> Option<String> {
        if let Some(hit) = self.cache.get(video_id) {
            return hit.clone();
        }
        let title = self.source.title(video_id);
        if title.is_none() {
            self.misses += 1;
        }
        self.cache.insert(video_id.to_string(), title.clone());
        title
    }

    /// Distinct videos looked up.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Distinct videos with no title.
    pub fn misses(&self) -> usize {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counting {
        calls: Cell<usize>,
    }

    impl TitleSource for Counting {
        fn title(&self, video_id: &str) -> Option<String> {
            self.calls.set(self.calls.get() + 1);
            (video_id == "known").then(|| "Speedrun Part 1".to_string())
        }
    }

    #[test]
    fn test_cache_hits_source_once_per_video() {
        let source = Counting { calls: Cell::new(0) };
        let mut cache = TitleCache::new(&source);
        assert_eq!(cache.get("known").as_deref(), Some("Speedrun Part 1"));
        assert_eq!(cache.get("known").as_deref(), Some("Speedrun Part 1"));
        assert_eq!(cache.get("missing"), None);
        assert_eq!(cache.get("missing"), None);
        assert_eq!(source.calls.get(), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_title_file_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("titles.json");
        std::fs::write(&path, r#"{"abc": "Master Class 3", "blank": "  "}"#).unwrap();
        let titles = TitleFile::load(&path).unwrap();
        assert_eq!(titles.len(), 2);
        assert_eq!(titles.title("abc").as_deref(), Some("Master Class 3"));
        assert_eq!(titles.title("blank"), None);
        assert_eq!(titles.title("zzz"), None);
    }

    #[test]
    fn test_title_file_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("titles.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(TitleFile::load(&path), Err(PipelineError::Json { .. })));
    }
}
