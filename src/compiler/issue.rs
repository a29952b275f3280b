use serde::{Deserialize, Serialize};

use crate::lang::node::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Hint,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Stable numeric identifier of an issue kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum IssueId {
    ParseFailure = 1,
    UnknownModule = 2,
    UnknownType = 3,
    DuplicateType = 4,
    CircularStruct = 5,
    GenericArity = 6,
    UnknownVariable = 7,
    DuplicateVariable = 8,
    UnknownField = 9,
    InvalidOperator = 10,
    ImplicitCastRequired = 11,
    InvalidCast = 12,
    TypeMismatch = 13,
    IntegerTooLarge = 14,
    InvalidLiteral = 15,
    ConditionNotBool = 16,
    NotAssignable = 17,
    DuplicateImport = 101,
    ShadowedVariable = 102,
    RedundantCast = 201,
}

impl IssueId {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn severity(self) -> Severity {
        match self.code() {
            0..=99 => Severity::Error,
            100..=199 => Severity::Warning,
            _ => Severity::Hint,
        }
    }
}

/// A problem found during compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub severity: Severity,
    pub message: String,
    pub position: Position,
}

impl Issue {
    pub fn new(id: IssueId, position: Position, message: impl Into<String>) -> Self {
        Self {
            id,
            severity: id.severity(),
            message: message.into(),
            position,
        }
    }

    pub fn unknown_type(name: &str, position: Position) -> Self {
        Self::new(IssueId::UnknownType, position, format!("unknown type '{}'", name))
    }

    pub fn unknown_variable(name: &str, position: Position) -> Self {
        Self::new(
            IssueId::UnknownVariable,
            position,
            format!("unknown variable '{}'", name),
        )
    }

    pub fn type_mismatch(expected: &str, found: &str, position: Position) -> Self {
        Self::new(
            IssueId::TypeMismatch,
            position,
            format!("expected '{}', found '{}'", expected, found),
        )
    }
}

impl std::fmt::Display for Issue {
    /// Formats as `line:col: severity[id]: message`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}[{:04}]: {}",
            self.position.line,
            self.position.col,
            self.severity,
            self.id.code(),
            self.message
        )
    }
}

/// Accumulates issues across both passes.
#[derive(Debug, Clone, Default)]
pub struct IssueCollector {
    issues: Vec<Issue>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn report(&mut self, id: IssueId, position: Position, message: impl Into<String>) {
        self.push(Issue::new(id, position, message));
    }

    /// Whether any issue is at or above `threshold`.
    pub fn has_at_least(&self, threshold: Severity) -> bool {
        self.issues.iter().any(|i| i.severity >= threshold)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn into_vec(self) -> Vec<Issue> {
        self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: usize, col: usize) -> Position {
        Position { line, col }
    }

    #[test]
    fn test_severity_from_id_range() {
        assert_eq!(IssueId::UnknownType.severity(), Severity::Error);
        assert_eq!(IssueId::ShadowedVariable.severity(), Severity::Warning);
        assert_eq!(IssueId::RedundantCast.severity(), Severity::Hint);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Hint < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_display() {
        let issue = Issue::unknown_type("vec3", at(4, 9));
        assert_eq!(issue.to_string(), "4:9: error[0003]: unknown type 'vec3'");
    }

    #[test]
    fn test_threshold() {
        let mut issues = IssueCollector::new();
        issues.report(IssueId::RedundantCast, at(1, 1), "cast is redundant");
        assert!(!issues.has_at_least(Severity::Warning));

        issues.report(IssueId::DuplicateImport, at(1, 1), "already imported");
        assert!(issues.has_at_least(Severity::Warning));
        assert!(!issues.has_at_least(Severity::Error));

        issues.push(Issue::unknown_variable("x", at(2, 3)));
        assert!(issues.has_at_least(Severity::Error));
        assert_eq!(issues.count(Severity::Error), 1);
    }
}
