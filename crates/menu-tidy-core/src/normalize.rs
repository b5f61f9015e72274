use regex::Regex;
use std::collections::HashMap;

/// Parenthesized qualifiers that mark an architecture or release channel.
pub const QUALIFIERS: &[&str] = &[
    "64-bit", "32-bit", "64 bit", "32 bit", "x64", "x86", "arm64", "beta", "preview", "insiders",
    "insider", "nightly", "canary", "dev", "alpha", "rc", "portable",
];

/// Collapses version and architecture noise in display names into a
/// canonical matching key. Results are memoized per instance.
pub struct NameNormalizer {
    suffixes: Vec<String>,
    qualifier_re: Regex,
    version_re: Regex,
    setup_re: Regex,
    cache: HashMap<String, String>,
}

impl NameNormalizer {
    pub fn new(suffixes: &[String]) -> Self {
        let alternatives = QUALIFIERS
            .iter()
            .map(|q| regex::escape(q))
            .collect::<Vec<_>>()
            .join("|");
        Self {
            suffixes: suffixes.iter().map(|s| s.to_lowercase()).collect(),
            qualifier_re: Regex::new(&format!(r"(?i)\(\s*(?:{})\s*\)", alternatives))
                .expect("qualifier pattern is valid"),
            version_re: Regex::new(r"^[vV]?\d+(?:\.\d+)*$").expect("version pattern is valid"),
            setup_re: Regex::new(r"(?i)\s*-\s*setup\s*$").expect("setup pattern is valid"),
            cache: HashMap::new(),
        }
    }

    pub fn normalize(&mut self, name: &str) -> String {
        if let Some(hit) = self.cache.get(name) {
            return hit.clone();
        }
        let key = self.compute(name);
        self.cache.insert(name.to_string(), key.clone());
        key
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn compute(&self, name: &str) -> String {
        let (stem, suffix) = self.split_suffix(name);

        // Repeat until stable so that normalize(normalize(x)) == normalize(x).
        let mut current = stem.to_string();
        loop {
            let next = self.strip_once(&current);
            if next == current {
                break;
            }
            current = next;
        }

        // A name made only of noise keeps its original stem.
        if current.is_empty() {
            current = collapse_whitespace(stem);
        }

        match suffix {
            Some(suffix) if !current.to_lowercase().ends_with(&suffix.to_lowercase()) => {
                format!("{}{}", current, suffix)
            }
            _ => current,
        }
    }

    fn strip_once(&self, text: &str) -> String {
        let without_qualifiers = self.qualifier_re.replace_all(text, " ");
        let without_versions = without_qualifiers
            .split_whitespace()
            .filter(|token| !self.version_re.is_match(token))
            .collect::<Vec<_>>()
            .join(" ");
        let without_setup = self.setup_re.replace(&without_versions, "");
        collapse_whitespace(&without_setup)
    }

    fn split_suffix<'a>(&self, name: &'a str) -> (&'a str, Option<&'a str>) {
        let lower = name.to_lowercase();
        for suffix in &self.suffixes {
            if lower.ends_with(suffix.as_str()) && name.len() >= suffix.len() && name.is_char_boundary(name.len() - suffix.len()) {
                let at = name.len() - suffix.len();
                return (&name[..at], Some(&name[at..]));
            }
        }
        (name, None)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
