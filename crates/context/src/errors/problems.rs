use std::fmt;

/// How serious a parse-time problem is
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    /// Aborts the bootstrap once the parse pass completes
    Fatal,
    /// Logged, never aborts
    Warning,
}

/// A structural problem found in a configuration source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub message: String,
    /// The source (type or definition name) the problem was found in
    pub location: String,
    pub severity: Severity,
}

impl Problem {
    pub fn fatal(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: location.into(),
            severity: Severity::Fatal,
        }
    }

    pub fn warning(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: location.into(),
            severity: Severity::Warning,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.location, self.message)
    }
}

/// Collects problems across a whole parse pass instead of failing on the first one
#[derive(Debug, Default)]
pub struct ProblemReporter {
    problems: Vec<Problem>,
}

impl ProblemReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, problem: Problem) {
        if !problem.is_fatal() {
            tracing::warn!("Configuration problem {}", problem);
        }
        self.problems.push(problem);
    }

    pub fn fatal(&mut self, message: impl Into<String>, location: impl Into<String>) {
        self.report(Problem::fatal(message, location));
    }

    pub fn warning(&mut self, message: impl Into<String>, location: impl Into<String>) {
        self.report(Problem::warning(message, location));
    }

    pub fn has_fatal(&self) -> bool {
        self.problems.iter().any(Problem::is_fatal)
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Drain every fatal problem, leaving warnings behind
    pub fn take_fatal(&mut self) -> Vec<Problem> {
        let (fatal, rest): (Vec<_>, Vec<_>) =
            self.problems.drain(..).partition(Problem::is_fatal);
        self.problems = rest;
        fatal
    }
}
