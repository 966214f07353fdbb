//! Ledger file locations inside the data root folder

use std::path::{Path, PathBuf};

pub const ENTITIES_DIR: &str = "entities";
pub const BLACKLIST_FILE: &str = "tag_blacklist.json";
pub const RAW_TAGS: &str = "raw_tags.jsonl";
pub const REMOVED_TAGS: &str = "removed_tags.jsonl";
pub const NORMALIZED_TAGS: &str = "normalized_tags.jsonl";
pub const COMPOUND_TAGS: &str = "compound_tags.jsonl";
pub const COMPOUND_OVERRIDES: &str = "compound_tags_override.jsonl";
pub const POSTPROCESSED_TAGS: &str = "postprocessed_tags.jsonl";
pub const BLACKLIST_CANDIDATES: &str = "blacklist_candidates.jsonl";
pub const RAW_STYLES: &str = "raw_styles.jsonl";
pub const CANONICAL_STYLES: &str = "canonical_styles.jsonl";
pub const STYLE_HIERARCHY: &str = "style_hierarchy.jsonl";
pub const STYLE_TAXONOMY: &str = "style_taxonomy.jsonl";
pub const GENRE_SUMMARY: &str = "genre_summary.jsonl";
pub const TAG_STYLE_MAP: &str = "tag_style_map.jsonl";
pub const FINAL_MAPPING: &str = "tag_mapping.json";

/// All ledger paths for one data root
#[derive(Debug, Clone)]
pub struct LedgerPaths {
    root: PathBuf,
    entities_dir: PathBuf,
}

impl LedgerPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let entities_dir = root.join(ENTITIES_DIR);
        Self { root, entities_dir }
    }

    /// Use a non-default entity directory (relative paths resolve under root)
    pub fn with_entities_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.entities_dir = self.root.join(dir.as_ref());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entities_dir(&self) -> &Path {
        &self.entities_dir
    }

    pub fn blacklist(&self) -> PathBuf {
        self.root.join(BLACKLIST_FILE)
    }

    pub fn raw_tags(&self) -> PathBuf {
        self.root.join(RAW_TAGS)
    }

    pub fn removed_tags(&self) -> PathBuf {
        self.root.join(REMOVED_TAGS)
    }

    pub fn normalized_tags(&self) -> PathBuf {
        self.root.join(NORMALIZED_TAGS)
    }

    pub fn compound_tags(&self) -> PathBuf {
        self.root.join(COMPOUND_TAGS)
    }

    pub fn compound_overrides(&self) -> PathBuf {
        self.root.join(COMPOUND_OVERRIDES)
    }

    pub fn postprocessed_tags(&self) -> PathBuf {
        self.root.join(POSTPROCESSED_TAGS)
    }

    pub fn blacklist_candidates(&self) -> PathBuf {
        self.root.join(BLACKLIST_CANDIDATES)
    }

    pub fn raw_styles(&self) -> PathBuf {
        self.root.join(RAW_STYLES)
    }

    pub fn canonical_styles(&self) -> PathBuf {
        self.root.join(CANONICAL_STYLES)
    }

    pub fn style_hierarchy(&self) -> PathBuf {
        self.root.join(STYLE_HIERARCHY)
    }

    pub fn style_taxonomy(&self) -> PathBuf {
        self.root.join(STYLE_TAXONOMY)
    }

    pub fn genre_summary(&self) -> PathBuf {
        self.root.join(GENRE_SUMMARY)
    }

    pub fn tag_style_map(&self) -> PathBuf {
        self.root.join(TAG_STYLE_MAP)
    }

    pub fn final_mapping(&self) -> PathBuf {
        self.root.join(FINAL_MAPPING)
    }
}
