//! Mining switch candidates out of help text.

use super::whitelist::is_whitelisted;
use once_cell::sync::Lazy;
use regex::Regex;

static KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:silent(?:ly)?|quiet(?:ly)?|unattended|passive|suppress\w*|no[\s-]?ui|non[\s-]?interactive)\b",
    )
    .expect("keyword regex")
});

// A switch starts at line start or after whitespace/punctuation that
// commonly surrounds usage tokens.
static SWITCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|[\s\[\(\{,|"'=])((?:--?|/)[A-Za-z][A-Za-z0-9_-]*(?:[:=][A-Za-z0-9_-]+)?)"#)
        .expect("switch regex")
});

/// Switch tokens found near unattended-install keywords, in order of first
/// appearance, with their occurrence counts.
pub fn mine_switches(text: &str, keyword_window: usize) -> Vec<(String, usize)> {
    let keywords: Vec<(usize, usize)> = KEYWORD
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    if keywords.is_empty() {
        return Vec::new();
    }

    let near_keyword = |start: usize, end: usize| {
        keywords.iter().any(|&(ks, ke)| {
            let gap = if end <= ks {
                ks - end
            } else if ke <= start {
                start - ke
            } else {
                0
            };
            gap <= keyword_window
        })
    };

    let mut out: Vec<(String, usize)> = Vec::new();
    for caps in SWITCH.captures_iter(text) {
        let Some(m) = caps.get(1) else { continue };
        let token = m.as_str().trim_end_matches(['-', '_']);
        if token.len() < 2 || is_whitelisted(token) || !near_keyword(m.start(), m.end()) {
            continue;
        }
        match out.iter_mut().find(|(t, _)| t == token) {
            Some((_, n)) => *n += 1,
            None => out.push((token.to_string(), 1)),
        }
    }
    out
}

/// Running tally of candidates across probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub token: String,
    /// Distinct probes whose output contained the token
    pub probes: usize,
    pub occurrences: usize,
    pub first_seen: usize,
}

#[derive(Debug, Default)]
pub struct CandidateTally {
    candidates: Vec<Candidate>,
}

impl CandidateTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the mined tokens of one probe.
    pub fn record(&mut self, mined: Vec<(String, usize)>) {
        for (token, count) in mined {
            match self.candidates.iter_mut().find(|c| c.token == token) {
                Some(c) => {
                    c.probes += 1;
                    c.occurrences += count;
                }
                None => {
                    let first_seen = self.candidates.len();
                    self.candidates.push(Candidate {
                        token,
                        probes: 1,
                        occurrences: count,
                        first_seen,
                    });
                }
            }
        }
    }

    /// Candidates ordered by probe frequency, occurrences, then first seen.
    pub fn ranked(&self) -> Vec<Candidate> {
        let mut ranked = self.candidates.clone();
        ranked.sort_by(|a, b| {
            b.probes
                .cmp(&a.probes)
                .then(b.occurrences.cmp(&a.occurrences))
                .then(a.first_seen.cmp(&b.first_seen))
        });
        ranked
    }

    pub fn top(&self) -> Option<Candidate> {
        self.ranked().into_iter().next()
    }
}
