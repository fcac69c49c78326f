// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Application and author lookup.
//!
//! Names typed on the command line are matched against stored names without
//! regard to case. Only an exact match is acted on. When nothing matches,
//! close candidates are offered as suggestions instead of being picked
//! silently.

use std::cmp::Ordering;

/// Minimum similarity for a candidate to be suggested.
pub const SUGGESTION_CUTOFF: f64 = 0.5;

/// Find the one candidate equal to query, ignoring case.
///
/// # Errors
///
/// - Return [`MatchError::Ambiguous`] if several candidates match.
/// - Return [`MatchError::NoMatch`] with suggestions if none match.
pub fn find_match<'a>(
    kind: &'static str,
    query: &str,
    candidates: &[&'a str],
) -> Result<&'a str> {
    let needle = query.to_lowercase();
    let matches = candidates
        .iter()
        .copied()
        .filter(|candidate| candidate.to_lowercase() == needle)
        .collect::<Vec<_>>();

    match matches.as_slice() {
        [found] => Ok(found),
        [] => Err(MatchError::NoMatch {
            kind,
            query: query.to_string(),
            suggestions: close_matches(query, candidates, SUGGESTION_CUTOFF)
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }),
        _ => Err(MatchError::Ambiguous {
            kind,
            query: query.to_string(),
            matches: matches.into_iter().map(str::to_owned).collect(),
        }),
    }
}

/// Candidates similar to query, best first.
///
/// Similarity is normalized Levenshtein distance between lowercased
/// strings. Candidates scoring below cutoff are dropped, ties are ordered by
/// name.
pub fn close_matches<'a>(query: &str, candidates: &[&'a str], cutoff: f64) -> Vec<&'a str> {
    let needle = query.to_lowercase();
    let mut scored = candidates
        .iter()
        .copied()
        .map(|candidate| {
            let score = strsim::normalized_levenshtein(&needle, &candidate.to_lowercase());
            (score, candidate)
        })
        .filter(|(score, _)| *score >= cutoff)
        .collect::<Vec<_>>();

    scored.sort_by(|(a_score, a_name), (b_score, b_name)| {
        b_score
            .partial_cmp(a_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a_name.cmp(b_name))
    });

    scored.into_iter().map(|(_, candidate)| candidate).collect()
}

fn suggestion_hint(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        return "no suggestions".into();
    }

    format!("did you mean one of: {}", suggestions.join(", "))
}

/// Lookup error types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    /// Query matches more than one candidate.
    #[error("{kind} {query:?} is ambiguous, it matches: {}", .matches.join(", "))]
    Ambiguous {
        kind: &'static str,
        query: String,
        matches: Vec<String>,
    },

    /// Query matches no candidate.
    #[error("no {kind} matches {query:?}, {}", suggestion_hint(.suggestions))]
    NoMatch {
        kind: &'static str,
        query: String,
        suggestions: Vec<String>,
    },
}

/// Friendly result alias :3
pub type Result<T, E = MatchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    const APPS: &[&str] = &["Sonarr", "Radarr", "Plex", "binhex-plex"];

    #[test_case("sonarr"; "lowercase")]
    #[test_case("SONARR"; "uppercase")]
    #[test_case("Sonarr"; "exact")]
    #[test]
    fn find_ignores_case(query: &str) {
        pretty_assertions::assert_eq!(find_match("app", query, APPS), Ok("Sonarr"));
    }

    #[test]
    fn find_reports_ambiguity() {
        let result = find_match("app", "plex", &["Plex", "PLEX", "Sonarr"]);
        assert_eq!(
            result,
            Err(MatchError::Ambiguous {
                kind: "app",
                query: "plex".into(),
                matches: vec!["Plex".into(), "PLEX".into()],
            })
        );
    }

    #[test]
    fn find_suggests_on_typo() {
        let result = find_match("app", "sonarx", APPS);
        assert_eq!(
            result,
            Err(MatchError::NoMatch {
                kind: "app",
                query: "sonarx".into(),
                suggestions: vec!["Sonarr".into()],
            })
        );
        assert_eq!(
            result.unwrap_err().to_string(),
            r#"no app matches "sonarx", did you mean one of: Sonarr"#
        );
    }

    #[test]
    fn find_reports_no_suggestions() {
        let result = find_match("author", "zzzzzz", APPS);
        assert_eq!(
            result.unwrap_err().to_string(),
            r#"no author matches "zzzzzz", no suggestions"#
        );
    }

    #[test]
    fn close_matches_best_first() {
        let result = close_matches("radar", &["Sonarr", "Radarr", "Radar"], SUGGESTION_CUTOFF);
        assert_eq!(result, vec!["Radar", "Radarr"]);
    }
}
