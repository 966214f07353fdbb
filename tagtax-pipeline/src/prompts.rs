//! Classification prompt builders
//!
//! Every prompt carries the unit's key on a `Subject:` line as a JSON string
//! literal, and ends with the exact JSON shape the matching reply schema in
//! [`crate::classifier::replies`] validates.

use tagtax_common::models::RawStyleEntry;

/// Prefix of the line that names the unit a prompt is about
pub const SUBJECT_MARKER: &str = "Subject: ";

fn subject_line(key: &str) -> String {
    // serde_json escaping keeps quotes and control characters unambiguous
    let quoted = serde_json::to_string(key).unwrap_or_else(|_| format!("\"{}\"", key));
    format!("{}{}", SUBJECT_MARKER, quoted)
}

/// Recover the key from a prompt built by this module
pub fn subject_of(prompt: &str) -> Option<String> {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix(SUBJECT_MARKER))
        .and_then(|quoted| serde_json::from_str::<String>(quoted.trim()).ok())
}

fn examples_line(examples: &[String]) -> String {
    if examples.is_empty() {
        "(none)".to_string()
    } else {
        examples.join(", ")
    }
}

/// Stage 3: decompose one normalized tag into typed parts
pub fn interpret_prompt(tag: &str) -> String {
    format!(
        r#"You analyze free-text music tags collected from listener communities.
Split the tag into its semantic parts and type each part:
- "style": a musical genre or style (e.g. "hip hop", "shoegaze")
- "descriptor": a mood, tempo, era, instrument or other quality (e.g. "lo-fi", "chill", "90s")
- "invalid": anything that says nothing about the music (e.g. "seen live", "favorites")

Write each part's text in lowercase, using the most common spelling.

{subject}

Respond with JSON only, no prose, exactly this shape:
{{"parts": [{{"text": "...", "type": "style|descriptor|invalid", "reason": "..."}}]}}"#,
        subject = subject_line(tag)
    )
}

/// Stage 6: keep / alias / reject one raw style string
pub fn canonicalize_prompt(entry: &RawStyleEntry) -> String {
    format!(
        r#"You maintain a canonical list of music style names.
Decide what to do with the style below:
- "keep": it is already the canonical name of a real style
- "alias": it is another spelling or a synonym of a canonical style; give that name
- "reject": it is not a music style at all

{subject}
Used {total} times across {tags} distinct tags, for example: {examples}

Respond with JSON only, no prose, exactly this shape:
{{"canonical_style": "...", "action": "keep|alias|reject", "reason": "..."}}"#,
        subject = subject_line(&entry.style),
        total = entry.total_count,
        tags = entry.tag_count,
        examples = examples_line(&entry.example_tags)
    )
}

/// Stage 7: genre or subgenre for one canonical style
pub fn hierarchy_prompt(entry: &RawStyleEntry) -> String {
    format!(
        r#"You organize music styles into a two-level taxonomy of genres and subgenres.
Decide whether the style below is a top-level genre, or a subgenre of exactly one parent genre.

{subject}
Used {total} times across {tags} distinct tags, for example: {examples}

Respond with JSON only, no prose, exactly this shape:
{{"is_subgenre": true|false, "parent_genre": "... or empty", "reason": "..."}}"#,
        subject = subject_line(&entry.style),
        total = entry.total_count,
        tags = entry.tag_count,
        examples = examples_line(&entry.example_tags)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(name: &str) -> RawStyleEntry {
        RawStyleEntry {
            style: name.to_string(),
            total_count: 42,
            tag_count: 3,
            example_tags: vec!["lo-fi hip-hop".to_string(), "hip hop".to_string()],
        }
    }

    #[test]
    fn test_subject_roundtrip_with_quotes() {
        let prompt = interpret_prompt("say \"hi\"\ttoo");
        assert_eq!(subject_of(&prompt).as_deref(), Some("say \"hi\"\ttoo"));
    }

    #[test]
    fn test_canonicalize_prompt_embeds_stats() {
        let prompt = canonicalize_prompt(&style("hip hop"));
        assert_eq!(subject_of(&prompt).as_deref(), Some("hip hop"));
        assert!(prompt.contains("Used 42 times across 3 distinct tags"));
        assert!(prompt.contains("lo-fi hip-hop, hip hop"));
        assert!(prompt.contains("\"action\": \"keep|alias|reject\""));
    }

    #[test]
    fn test_hierarchy_prompt_without_examples() {
        let mut entry = style("trip hop");
        entry.example_tags.clear();
        let prompt = hierarchy_prompt(&entry);
        assert!(prompt.contains("(none)"));
        assert!(prompt.contains("\"is_subgenre\""));
    }

    #[test]
    fn test_subject_of_missing_marker() {
        assert_eq!(subject_of("no subject here"), None);
    }
}
