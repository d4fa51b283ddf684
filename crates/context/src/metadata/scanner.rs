use crate::definitions::Definition;

/// Produces newly discovered definitions for a base location pattern
///
/// The returned sequence is lazy, finite and consumed once.
pub trait CandidateScanner: Send + Sync {
    fn scan<'a>(&'a self, pattern: &str) -> Box<dyn Iterator<Item = Definition> + 'a>;
}

/// Scanner over a fixed set of candidate definitions, matched by type-name prefix
///
/// A pattern ending in `*` matches every type name starting with the part
/// before it; any other pattern must equal the type name.
#[derive(Debug, Default, Clone)]
pub struct PrefixScanner {
    candidates: Vec<Definition>,
}

impl PrefixScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidate(mut self, definition: Definition) -> Self {
        self.candidates.push(definition);
        self
    }

    fn matches(pattern: &str, type_name: &str) -> bool {
        match pattern.strip_suffix('*') {
            Some(prefix) => type_name.starts_with(prefix),
            None => type_name == pattern,
        }
    }
}

impl CandidateScanner for PrefixScanner {
    fn scan<'a>(&'a self, pattern: &str) -> Box<dyn Iterator<Item = Definition> + 'a> {
        let pattern = pattern.to_string();
        Box::new(
            self.candidates
                .iter()
                .filter(move |candidate| Self::matches(&pattern, &candidate.type_name))
                .cloned(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_patterns() {
        let scanner = PrefixScanner::new()
            .with_candidate(Definition::new("", "app::services::Mailer"))
            .with_candidate(Definition::new("", "app::services::Billing"))
            .with_candidate(Definition::new("", "app::web::Router"));

        assert_eq!(scanner.scan("app::services::*").count(), 2);
        assert_eq!(scanner.scan("app::web::Router").count(), 1);
        assert_eq!(scanner.scan("app::web").count(), 0);
    }
}
