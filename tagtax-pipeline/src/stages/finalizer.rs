//! Stage 8: taxonomy, genre summary and tag → style map
//!
//! Pure reduction over the hierarchy, canonical-map and postprocessed
//! ledgers; all three outputs are rewritten every run.

use super::{by_total_then_key, push_distinct, Stage, StageReport};
use crate::error::StageResult;
use std::collections::{BTreeMap, HashMap};
use tagtax_common::canonical::CanonicalResolver;
use tagtax_common::ledger::{read_keyed_ledger, read_ledger, write_ledger};
use tagtax_common::models::{
    CanonicalStyleEntry, GenreSummaryEntry, PostprocessedTagEntry, StyleHierarchyEntry,
    StyleTaxonomyEntry, SubgenreRecord, TagStyleMapEntry, TaxonomyKind,
};
use tagtax_common::paths::LedgerPaths;
use tagtax_common::Error;
use tracing::{info, warn};

pub fn finalize(paths: &LedgerPaths) -> StageResult<StageReport> {
    let mut report = StageReport::new(Stage::FinalizeTaxonomy);

    let hierarchy_path = paths.style_hierarchy();
    if !hierarchy_path.exists() {
        return Err(Error::NotFound(hierarchy_path).into());
    }
    let (hierarchy, _) = read_keyed_ledger::<StyleHierarchyEntry>(&hierarchy_path)?;
    let (canonical, _) = read_keyed_ledger::<CanonicalStyleEntry>(&paths.canonical_styles())?;
    let tags: Vec<PostprocessedTagEntry> = read_ledger(&paths.postprocessed_tags())?;

    let taxonomy = build_taxonomy(&hierarchy);
    let summary = build_genre_summary(&taxonomy);

    let resolver = CanonicalResolver::new(&canonical);
    if resolver.alias_cycles() > 0 {
        warn!(
            "{} alias cycles collapsed while mapping tags to styles",
            resolver.alias_cycles()
        );
    }
    let tag_map = build_tag_style_map(&tags, &resolver, &hierarchy);

    report.total = tags.len();
    report.succeeded = tag_map.len();
    report.skipped = tags.len() - tag_map.len();

    report.written = write_ledger(&paths.style_taxonomy(), &taxonomy)?;
    report.written += write_ledger(&paths.genre_summary(), &summary)?;
    report.written += write_ledger(&paths.tag_style_map(), &tag_map)?;

    info!(
        "Taxonomy: {} styles, {} genres; {} of {} tags mapped to styles",
        taxonomy.len(),
        summary.len(),
        tag_map.len(),
        tags.len()
    );
    Ok(report)
}

/// One taxonomy entry per hierarchy entry
pub fn build_taxonomy(hierarchy: &[StyleHierarchyEntry]) -> Vec<StyleTaxonomyEntry> {
    let mut taxonomy: Vec<StyleTaxonomyEntry> = hierarchy
        .iter()
        .map(|entry| {
            let (kind, parent_genres) = match entry.parent() {
                Some(parent) => (TaxonomyKind::Subgenre, vec![parent.to_string()]),
                None => (TaxonomyKind::Genre, Vec::new()),
            };
            StyleTaxonomyEntry {
                style: entry.style.clone(),
                total_count: entry.total_count,
                kind,
                parent_genres,
                reason: entry.reason.clone(),
            }
        })
        .collect();

    taxonomy.sort_by(|a, b| {
        by_total_then_key(
            (a.total_count, a.style.as_str()),
            (b.total_count, b.style.as_str()),
        )
    });
    taxonomy
}

/// Genres with their attached subgenres
///
/// A parent that never appears as a genre itself still gets an entry.
/// A genre's total is its own total plus its subgenres' totals.
pub fn build_genre_summary(taxonomy: &[StyleTaxonomyEntry]) -> Vec<GenreSummaryEntry> {
    let mut own: BTreeMap<&str, u64> = BTreeMap::new();
    let mut subgenres: BTreeMap<&str, Vec<SubgenreRecord>> = BTreeMap::new();

    for entry in taxonomy {
        match entry.kind {
            TaxonomyKind::Genre => {
                *own.entry(entry.style.as_str()).or_insert(0) += entry.total_count;
            }
            TaxonomyKind::Subgenre => {
                for parent in &entry.parent_genres {
                    own.entry(parent.as_str()).or_insert(0);
                    subgenres
                        .entry(parent.as_str())
                        .or_default()
                        .push(SubgenreRecord {
                            name: entry.style.clone(),
                            total_count: entry.total_count,
                        });
                }
            }
        }
    }

    let mut summary: Vec<GenreSummaryEntry> = own
        .into_iter()
        .map(|(genre, own_total)| {
            let mut subs = subgenres.remove(genre).unwrap_or_default();
            subs.sort_by(|a, b| {
                by_total_then_key(
                    (a.total_count, a.name.as_str()),
                    (b.total_count, b.name.as_str()),
                )
            });
            let total_count = own_total + subs.iter().map(|s| s.total_count).sum::<u64>();
            GenreSummaryEntry {
                genre: genre.to_string(),
                total_count,
                subgenres: subs,
            }
        })
        .collect();

    summary.sort_by(|a, b| {
        by_total_then_key(
            (a.total_count, a.genre.as_str()),
            (b.total_count, b.genre.as_str()),
        )
    });
    summary
}

/// Resolve each tag's styles to canonical names and parent genres
///
/// Rejected styles are dropped and a tag with no surviving style is left
/// out. A canonical style without a hierarchy parent is its own parent.
pub fn build_tag_style_map(
    tags: &[PostprocessedTagEntry],
    resolver: &CanonicalResolver,
    hierarchy: &[StyleHierarchyEntry],
) -> Vec<TagStyleMapEntry> {
    let parents: HashMap<&str, &StyleHierarchyEntry> =
        hierarchy.iter().map(|h| (h.style.as_str(), h)).collect();

    let mut entries = Vec::new();
    for tag in tags {
        let mut canonical_styles = Vec::new();
        for style in &tag.styles {
            if let Some(name) = resolver.resolve(style) {
                push_distinct(&mut canonical_styles, &name, None);
            }
        }
        if canonical_styles.is_empty() {
            continue;
        }

        let mut parent_genres = Vec::new();
        for style in &canonical_styles {
            let parent = parents
                .get(style.as_str())
                .and_then(|h| h.parent())
                .unwrap_or(style.as_str());
            push_distinct(&mut parent_genres, parent, None);
        }

        entries.push(TagStyleMapEntry {
            normalized: tag.normalized.clone(),
            total_count: tag.total_count,
            canonical_styles,
            parent_genres,
            descriptors: tag.descriptors.clone(),
        });
    }

    entries.sort_by(|a, b| {
        by_total_then_key(
            (a.total_count, a.normalized.as_str()),
            (b.total_count, b.normalized.as_str()),
        )
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagtax_common::models::{Bucket, StyleAction};

    fn hierarchy(style: &str, total: u64, parent: &str) -> StyleHierarchyEntry {
        StyleHierarchyEntry {
            style: style.to_string(),
            total_count: total,
            is_subgenre: !parent.is_empty(),
            parent_genre: parent.to_string(),
            reason: String::new(),
        }
    }

    fn tag(name: &str, total: u64, styles: &[&str], descriptors: &[&str]) -> PostprocessedTagEntry {
        PostprocessedTagEntry {
            normalized: name.to_string(),
            total_count: total,
            styles: styles.iter().map(|s| s.to_string()).collect(),
            descriptors: descriptors.iter().map(|s| s.to_string()).collect(),
            invalid_segments: vec![],
            bucket: Bucket::classify(!styles.is_empty(), !descriptors.is_empty()),
        }
    }

    fn decision(style: &str, action: StyleAction, canonical: &str) -> CanonicalStyleEntry {
        CanonicalStyleEntry {
            style: style.to_string(),
            canonical_style: canonical.to_string(),
            action,
            reason: String::new(),
            total_count: 1,
        }
    }

    #[test]
    fn test_taxonomy_kinds() {
        let taxonomy = build_taxonomy(&[
            hierarchy("hip hop", 20, ""),
            hierarchy("boom bap", 5, "hip hop"),
            StyleHierarchyEntry {
                is_subgenre: true,
                ..hierarchy("orphan", 1, "")
            },
        ]);
        assert_eq!(taxonomy[0].kind, TaxonomyKind::Genre);
        assert!(taxonomy[0].parent_genres.is_empty());
        assert_eq!(taxonomy[1].kind, TaxonomyKind::Subgenre);
        assert_eq!(taxonomy[1].parent_genres, vec!["hip hop"]);
        assert_eq!(taxonomy[2].kind, TaxonomyKind::Genre);
    }

    #[test]
    fn test_genre_summary_consistency() {
        let hierarchy = vec![
            hierarchy("hip hop", 20, ""),
            hierarchy("boom bap", 5, "hip hop"),
            hierarchy("trap", 9, "hip hop"),
            hierarchy("bebop", 4, "jazz"),
        ];
        let summary = build_genre_summary(&build_taxonomy(&hierarchy));

        let hip_hop = summary.iter().find(|g| g.genre == "hip hop").unwrap();
        assert_eq!(hip_hop.total_count, 34);
        let names: Vec<&str> = hip_hop.subgenres.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["trap", "boom bap"]);

        // Parent created on demand
        let jazz = summary.iter().find(|g| g.genre == "jazz").unwrap();
        assert_eq!(jazz.total_count, 4);
        assert_eq!(jazz.subgenres[0].total_count, 4);

        for entry in hierarchy.iter().filter(|h| h.is_subgenre) {
            let parent = summary.iter().find(|g| g.genre == entry.parent_genre).unwrap();
            assert!(parent
                .subgenres
                .iter()
                .any(|s| s.name == entry.style && s.total_count == entry.total_count));
        }
        assert_eq!(summary[0].genre, "hip hop");
    }

    #[test]
    fn test_tag_style_map_resolution() {
        let resolver = CanonicalResolver::new(&[
            decision("hip hop", StyleAction::Keep, "hip hop"),
            decision("hiphop", StyleAction::Alias, "hip hop"),
            decision("boom bap", StyleAction::Keep, "boom bap"),
            decision("favorites", StyleAction::Reject, ""),
        ]);
        let hierarchy = vec![hierarchy("hip hop", 10, ""), hierarchy("boom bap", 3, "hip hop")];
        let tags = vec![
            tag("lo-fi hiphop", 6, &["hiphop", "hip hop"], &["lo-fi"]),
            tag("boom bap", 3, &["boom bap"], &[]),
            tag("my favorites", 9, &["favorites"], &[]),
            tag("chill", 2, &[], &["chill"]),
            tag("vaporwave", 1, &["vaporwave"], &[]),
        ];

        let map = build_tag_style_map(&tags, &resolver, &hierarchy);
        let keys: Vec<&str> = map.iter().map(|e| e.normalized.as_str()).collect();
        assert_eq!(keys, vec!["lo-fi hiphop", "boom bap", "vaporwave"]);

        assert_eq!(map[0].canonical_styles, vec!["hip hop"]);
        assert_eq!(map[0].parent_genres, vec!["hip hop"]);
        assert_eq!(map[0].descriptors, vec!["lo-fi"]);
        assert_eq!(map[1].parent_genres, vec!["hip hop"]);
        // Unknown style falls back to itself and is its own parent
        assert_eq!(map[2].canonical_styles, vec!["vaporwave"]);
        assert_eq!(map[2].parent_genres, vec!["vaporwave"]);
    }
}
