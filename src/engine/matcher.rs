use regex::RegexBuilder;
use serde::Serialize;
use strsim::osa_distance;
use tracing::debug;

/// Client tokens shorter than this must appear verbatim.
const MIN_FUZZY_TOKEN_LEN: usize = 4;
/// Client tokens at least this long tolerate two edits instead of one.
const LONG_TOKEN_LEN: usize = 8;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    Exact,
    Fuzzy,
    None,
}

impl MatchConfidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientMatchCandidate {
    pub filename: String,
    pub confidence: MatchConfidence,
}

pub fn tokenize(input: &str) -> Vec<String> {
    input
        .split(|character: char| !character.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
        .collect()
}

/// Select the filenames that identify `client_name`.
///
/// Exact matching runs first; fuzzy matching only runs when nothing matched
/// exactly. An empty result is not an error here, the caller decides.
pub fn match_client_files(client_name: &str, filenames: &[String]) -> Vec<ClientMatchCandidate> {
    let client_tokens = tokenize(client_name);
    if client_tokens.is_empty() {
        return Vec::new();
    }

    let exact = exact_matches(&client_tokens, filenames);
    if !exact.is_empty() {
        return exact;
    }

    debug!(client = %client_name, "no exact filename match, trying fuzzy tokens");
    filenames
        .iter()
        .filter(|filename| fuzzy_match(&client_tokens, &tokenize(filename)))
        .map(|filename| ClientMatchCandidate {
            filename: filename.clone(),
            confidence: MatchConfidence::Fuzzy,
        })
        .collect()
}

pub fn classify(client_name: &str, filename: &str) -> MatchConfidence {
    let client_tokens = tokenize(client_name);
    if client_tokens.is_empty() {
        return MatchConfidence::None;
    }

    let single = [filename.to_string()];
    if !exact_matches(&client_tokens, &single).is_empty() {
        MatchConfidence::Exact
    } else if fuzzy_match(&client_tokens, &tokenize(filename)) {
        MatchConfidence::Fuzzy
    } else {
        MatchConfidence::None
    }
}

fn exact_matches(client_tokens: &[String], filenames: &[String]) -> Vec<ClientMatchCandidate> {
    let pattern = client_tokens
        .iter()
        .map(|token| regex::escape(token))
        .collect::<Vec<String>>()
        .join(".*");
    let Ok(wildcard) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
        return Vec::new();
    };

    filenames
        .iter()
        .filter(|filename| wildcard.is_match(filename))
        .filter(|filename| {
            let tokens = tokenize(filename);
            client_tokens.iter().all(|token| tokens.contains(token))
        })
        .map(|filename| ClientMatchCandidate {
            filename: filename.clone(),
            confidence: MatchConfidence::Exact,
        })
        .collect()
}

fn fuzzy_match(client_tokens: &[String], file_tokens: &[String]) -> bool {
    client_tokens.iter().all(|client_token| {
        file_tokens
            .iter()
            .any(|file_token| tokens_close(client_token, file_token))
    })
}

fn tokens_close(client_token: &str, file_token: &str) -> bool {
    if client_token.len() < MIN_FUZZY_TOKEN_LEN {
        return client_token == file_token;
    }

    let bound = if client_token.len() < LONG_TOKEN_LEN {
        1
    } else {
        2
    };
    if client_token.len().abs_diff(file_token.len()) > bound {
        return false;
    }

    osa_distance(client_token, file_token) <= bound
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn exact_match_wins_and_skips_fuzzy_candidates() {
        let files = names(&["Acme_Corp_Report.pdf", "Acem_Corp_Report.pdf", "Other.pdf"]);
        let matches = match_client_files("Acme Corp", &files);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].filename, "Acme_Corp_Report.pdf");
        assert_eq!(matches[0].confidence, MatchConfidence::Exact);
    }

    #[test]
    fn typo_in_filename_matches_only_fuzzily() {
        let files = names(&["Acem_Corp_Report.pdf", "Globex_Report.pdf"]);
        let matches = match_client_files("Acme Corp", &files);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].confidence, MatchConfidence::Fuzzy);
        assert_eq!(classify("Acme Corp", "Acem_Corp_Report.pdf"), MatchConfidence::Fuzzy);
        assert_eq!(classify("Acme Corp", "Acme_Corp_Report.pdf"), MatchConfidence::Exact);
    }

    #[test]
    fn partial_token_is_not_an_exact_match() {
        let files = names(&["AcmeCorporation_prtg.pdf"]);
        assert!(match_client_files("Acme Corp", &files).is_empty());
    }

    #[test]
    fn short_tokens_require_verbatim_presence() {
        let files = names(&["ABD_Logistics.pdf"]);
        assert!(match_client_files("ABC Logistics", &files).is_empty());

        let files = names(&["ABC_Logistcs.pdf"]);
        let matches = match_client_files("ABC Logistics", &files);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].confidence, MatchConfidence::Fuzzy);
    }

    #[test]
    fn long_tokens_tolerate_two_edits() {
        assert!(tokens_close("kitisuru", "kitsuuru"));
        assert!(!tokens_close("gigiri", "gigirixx"));
        assert!(tokens_close("gigiri", "gigiri1"));
    }

    #[test]
    fn empty_client_name_matches_nothing() {
        let files = names(&["Acme_Corp_Report.pdf"]);
        assert!(match_client_files("  --  ", &files).is_empty());
        assert_eq!(classify("", "Acme.pdf"), MatchConfidence::None);
    }
}
