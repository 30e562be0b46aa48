// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Search (`spec.md` §4.7): a small query grammar over decrypted
//! projections — bare terms (AND), quoted phrases, `field:value`,
//! wildcards (`*`, `?`), and size predicates (`>1MB`, `<500KB`) — scored
//! against `name`, tags, and metadata text, and never against ciphertext.

use regex::Regex;
use std::collections::HashSet;

use vault_domain::error::VaultError;
use vault_domain::services::{SearchProjection, SearchQuery, SearchService};
use vault_domain::ImageRecord;

const STOPWORDS: &[&str] = &["a", "an", "the", "and", "or", "of", "in", "on", "at", "to", "is"];

#[derive(Debug, Clone, PartialEq)]
enum SizeOp {
    GreaterThan,
    LessThan,
}

#[derive(Debug, Default)]
struct ParsedQuery {
    terms: Vec<String>,
    phrases: Vec<String>,
    tag_filter: Option<String>,
    name_filter: Option<String>,
    type_filter: Option<String>,
    size_predicate: Option<(SizeOp, u64)>,
}

fn parse_size(raw: &str) -> Option<u64> {
    let raw = raw.trim().to_uppercase();
    let (digits, unit) = raw.split_at(raw.find(|c: char| c.is_alphabetic()).unwrap_or(raw.len()));
    let value: f64 = digits.parse().ok()?;
    let multiplier = match unit {
        "KB" => 1024.0,
        "MB" => 1024.0 * 1024.0,
        "GB" => 1024.0 * 1024.0 * 1024.0,
        "" | "B" => 1.0,
        _ => return None,
    };
    Some((value * multiplier) as u64)
}

fn parse_query(raw: &str) -> ParsedQuery {
    let mut parsed = ParsedQuery::default();
    let mut remainder = raw.to_string();

    // Pull out quoted phrases first so they aren't split on whitespace.
    let phrase_re = Regex::new(r#""([^"]*)""#).expect("valid phrase regex");
    for cap in phrase_re.captures_iter(raw) {
        parsed.phrases.push(cap[1].to_lowercase());
    }
    remainder = phrase_re.replace_all(&remainder, " ").to_string();

    for token in remainder.split_whitespace() {
        let lower = token.to_lowercase();
        if let Some(rest) = lower.strip_prefix('>') {
            if let Some(bytes) = parse_size(rest) {
                parsed.size_predicate = Some((SizeOp::GreaterThan, bytes));
                continue;
            }
        }
        if let Some(rest) = lower.strip_prefix('<') {
            if let Some(bytes) = parse_size(rest) {
                parsed.size_predicate = Some((SizeOp::LessThan, bytes));
                continue;
            }
        }
        if let Some((field, value)) = lower.split_once(':') {
            match field {
                "tag" => parsed.tag_filter = Some(value.to_string()),
                "name" | "filename" => parsed.name_filter = Some(value.to_string()),
                "type" | "format" => parsed.type_filter = Some(value.to_string()),
                _ => {}
            }
            continue;
        }
        if STOPWORDS.contains(&lower.as_str()) {
            continue;
        }
        parsed.terms.push(lower);
    }

    parsed
}

/// Compile a wildcard pattern (`*`, `?`) into a case-insensitive regex.
fn wildcard_regex(pattern: &str) -> Option<Regex> {
    if !pattern.contains('*') && !pattern.contains('?') {
        return None;
    }
    let mut escaped = String::from("(?i)^");
    for c in pattern.chars() {
        match c {
            '*' => escaped.push_str(".*"),
            '?' => escaped.push('.'),
            other => escaped.push_str(&regex::escape(&other.to_string())),
        }
    }
    escaped.push('$');
    Regex::new(&escaped).ok()
}

fn term_matches(term: &str, haystack: &str) -> bool {
    if let Some(re) = wildcard_regex(term) {
        re.is_match(haystack)
    } else {
        haystack.to_lowercase().contains(term)
    }
}

/// Scores and ranks already-decrypted projections against a parsed query.
pub struct RegexSearchEngine;

impl Default for RegexSearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RegexSearchEngine {
    pub fn new() -> Self {
        Self
    }

    fn score(parsed: &ParsedQuery, projection: &SearchProjection) -> Option<f64> {
        let name = projection.record.name.to_lowercase();
        let tags: Vec<String> = projection.tags.as_slice().iter().map(|t| t.to_lowercase()).collect();
        let metadata_text: String = projection
            .metadata
            .values()
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if let Some(filter) = &parsed.name_filter {
            if !term_matches(filter, &name) {
                return None;
            }
        }
        if let Some(filter) = &parsed.type_filter {
            if !projection.record.mime_type.as_str().to_lowercase().contains(filter) {
                return None;
            }
        }
        if let Some(filter) = &parsed.tag_filter {
            if !tags.iter().any(|t| t == filter) {
                return None;
            }
        }
        if let Some((op, bytes)) = &parsed.size_predicate {
            let matches = match op {
                SizeOp::GreaterThan => projection.record.original_size > *bytes,
                SizeOp::LessThan => projection.record.original_size < *bytes,
            };
            if !matches {
                return None;
            }
        }

        let mut score = 0.0;
        let mut matched_any_free_term = parsed.terms.is_empty() && parsed.phrases.is_empty();

        for term in parsed.terms.iter().chain(parsed.phrases.iter()) {
            let mut hit = false;
            if name.starts_with(term.as_str()) {
                score += 3.0;
                hit = true;
            } else if term_matches(term, &name) {
                score += 2.0;
                hit = true;
            }
            if tags.iter().any(|t| t == term) {
                score += 1.5;
                hit = true;
            } else if tags.iter().any(|t| term_matches(term, t)) {
                score += 1.0;
                hit = true;
            }
            if term_matches(term, &metadata_text) {
                score += 0.5;
                hit = true;
            }
            matched_any_free_term |= hit;
        }

        if !matched_any_free_term {
            return None;
        }
        Some(score)
    }
}

#[async_trait::async_trait]
impl SearchService for RegexSearchEngine {
    async fn search(
        &self,
        query: &SearchQuery,
        projections: &[SearchProjection],
    ) -> Result<Vec<ImageRecord>, VaultError> {
        let parsed = parse_query(&query.raw);

        let mut scored: Vec<(f64, &SearchProjection)> = projections
            .iter()
            .filter_map(|p| Self::score(&parsed, p).map(|score| (score, p)))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.record.date_added.cmp(&a.1.record.date_added))
        });

        Ok(scored.into_iter().map(|(_, p)| p.record.clone()).collect())
    }
}

#[allow(dead_code)]
fn seen_fields() -> HashSet<&'static str> {
    HashSet::from(["name", "tag", "type"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vault_domain::value_objects::{FileHash, MimeType, TagSet};

    fn projection(name: &str, tags: &[&str]) -> SearchProjection {
        let record = ImageRecord::new(
            name.to_string(),
            "data/x.bin".to_string(),
            100,
            128,
            MimeType::parse("image/jpeg").unwrap(),
            FileHash::of_bytes(name.as_bytes()),
            vec![],
            vec![],
            None,
        );
        SearchProjection {
            record,
            tags: TagSet::from_raw(tags.to_vec()),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn prefix_match_outranks_substring_match() {
        let engine = RegexSearchEngine::new();
        let projections = vec![projection("sunset-beach.jpg", &[]), projection("my-beach-trip.jpg", &[])];
        let results = engine
            .search(&SearchQuery::new("beach"), &projections)
            .await
            .unwrap();
        assert_eq!(results[0].name, "my-beach-trip.jpg");
    }

    #[tokio::test]
    async fn tag_filter_excludes_non_matching() {
        let engine = RegexSearchEngine::new();
        let projections = vec![projection("a.jpg", &["beach"]), projection("b.jpg", &["mountain"])];
        let results = engine
            .search(&SearchQuery::new("tag:beach"), &projections)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "a.jpg");
    }

    #[tokio::test]
    async fn wildcard_matches_name() {
        let engine = RegexSearchEngine::new();
        let projections = vec![projection("vacation_2024.jpg", &[])];
        let results = engine
            .search(&SearchQuery::new("vacation*"), &projections)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn size_predicate_filters_by_original_size() {
        let engine = RegexSearchEngine::new();
        let projections = vec![projection("a.jpg", &[])];
        let none = engine.search(&SearchQuery::new(">1MB"), &projections).await.unwrap();
        assert!(none.is_empty());
        let some = engine.search(&SearchQuery::new("<1MB"), &projections).await.unwrap();
        assert_eq!(some.len(), 1);
    }
}
