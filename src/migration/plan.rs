//! Targets, directions and execution plans

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::script::MigrationScript;
use crate::error::MigrationError;

/// Which half of a script a plan step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Apply,
    Revert,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Apply => write!(f, "apply"),
            Direction::Revert => write!(f, "revert"),
        }
    }
}

/// Where a migration run should end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The latest revision in the graph
    Head,
    /// No migrations applied
    Base,
    /// A revision id or a unique prefix of one
    Revision(String),
    /// A number of steps relative to the current revision (`+2`, `-1`)
    Relative(i64),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Head => write!(f, "head"),
            Target::Base => write!(f, "base"),
            Target::Revision(rev) => write!(f, "{}", rev),
            Target::Relative(n) => write!(f, "{:+}", n),
        }
    }
}

impl FromStr for Target {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "" => Err(MigrationError::UnknownRevision(String::new())),
            "head" => Ok(Target::Head),
            "base" => Ok(Target::Base),
            _ => {
                if s.starts_with('+') || s.starts_with('-') {
                    match s.parse::<i64>() {
                        Ok(n) if n != 0 => Ok(Target::Relative(n)),
                        _ => Err(MigrationError::UnknownRevision(s.to_string())),
                    }
                } else {
                    Ok(Target::Revision(s.to_string()))
                }
            }
        }
    }
}

/// One step of an execution plan
#[derive(Clone, Copy)]
pub struct PlanStep<'r> {
    pub script: &'r dyn MigrationScript,
    pub direction: Direction,
}

impl<'r> PlanStep<'r> {
    pub fn revision(&self) -> &'r str {
        self.script.revision()
    }

    /// The revision the schema is at once this step has committed
    pub fn resulting_revision(&self) -> Option<&'r str> {
        match self.direction {
            Direction::Apply => Some(self.script.revision()),
            Direction::Revert => self.script.parent(),
        }
    }
}

impl fmt::Debug for PlanStep<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanStep")
            .field("revision", &self.revision())
            .field("direction", &self.direction)
            .finish()
    }
}

/// Serializable description of a plan step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct PlannedStep {
    pub revision: String,
    pub direction: Direction,
    pub description: String,
}

/// Ordered steps that move a schema from one revision to another
#[derive(Debug)]
pub struct ExecutionPlan<'r> {
    pub from: Option<String>,
    pub to: Option<String>,
    pub steps: Vec<PlanStep<'r>>,
}

impl<'r> ExecutionPlan<'r> {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Direction of the plan, `None` for an empty plan
    pub fn direction(&self) -> Option<Direction> {
        self.steps.first().map(|s| s.direction)
    }

    pub fn revisions(&self) -> Vec<&'r str> {
        self.steps.iter().map(|s| s.revision()).collect()
    }

    pub fn describe(&self) -> Vec<PlannedStep> {
        self.steps
            .iter()
            .map(|s| PlannedStep {
                revision: s.revision().to_string(),
                direction: s.direction,
                description: s.script.description().to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert_eq!("head".parse::<Target>().unwrap(), Target::Head);
        assert_eq!("HEAD".parse::<Target>().unwrap(), Target::Head);
        assert_eq!("base".parse::<Target>().unwrap(), Target::Base);
        assert_eq!("-1".parse::<Target>().unwrap(), Target::Relative(-1));
        assert_eq!("+2".parse::<Target>().unwrap(), Target::Relative(2));
        assert_eq!(
            "3f1c9a".parse::<Target>().unwrap(),
            Target::Revision("3f1c9a".to_string())
        );
        assert!("".parse::<Target>().is_err());
        assert!("+0".parse::<Target>().is_err());
        assert!("-x".parse::<Target>().is_err());
    }

    #[test]
    fn test_target_display() {
        assert_eq!(Target::Relative(-2).to_string(), "-2");
        assert_eq!(Target::Relative(1).to_string(), "+1");
        assert_eq!(Target::Base.to_string(), "base");
    }
}
