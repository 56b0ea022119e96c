//! Fuzzy player lookup by name or numeric id

use super::types::PlayerId;

const EXACT_SCORE: usize = 1000;
const SUBSTRING_BASE_SCORE: usize = 100;
const PREFIX_SCORE: usize = 80;

/// Score how well `name` matches `query`, case-insensitively
///
/// Exact beats substring, substring beats prefix. Longer substring queries
/// score higher. Zero means no match.
pub fn score_name(name: &str, query: &str) -> usize {
    let name = name.to_lowercase();
    let query = query.to_lowercase();

    if name == query {
        return EXACT_SCORE;
    }
    if name.contains(&query) {
        return SUBSTRING_BASE_SCORE + query.chars().count();
    }
    if name.starts_with(&query) {
        return PREFIX_SCORE;
    }
    0
}

/// Pick the live player best matching `query`
///
/// `candidates` is the live player list in enumeration order. A query that
/// parses as a number and names a live player wins outright. Otherwise the
/// best-scoring name wins and ties keep the earlier candidate.
pub fn resolve_by_name_or_id<'a, I>(query: &str, candidates: I) -> Option<PlayerId>
where
    I: IntoIterator<Item = (PlayerId, &'a str)>,
{
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    let candidates: Vec<(PlayerId, &str)> = candidates.into_iter().collect();

    if let Ok(raw) = query.parse::<u64>() {
        if let Some((id, _)) = candidates.iter().find(|(id, _)| id.as_u64() == raw) {
            return Some(*id);
        }
    }

    let mut best: Option<(PlayerId, usize)> = None;
    for (id, name) in candidates {
        let score = score_name(name, query);
        if score == 0 {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((id, score)),
        }
    }

    best.map(|(id, _)| id)
}
