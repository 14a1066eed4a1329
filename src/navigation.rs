use crate::projection::ResultsPage;
use crate::store::Snapshot;
use serde::Serialize;
use std::fmt;

/// Prompt shown instead of results when no assessment has been completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallToAction {
    pub title: String,
    pub message: String,
    pub action_label: String,
    /// Assessment entry point.
    pub target: String,
}

impl fmt::Display for CallToAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", self.message)?;
        write!(f, "[{}] -> {}", self.action_label, self.target)
    }
}

/// Navigation action offered alongside results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationAction {
    pub label: String,
    pub target: String,
}

/// What the Results surface shows for a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ResultsView {
    NoResult {
        call_to_action: CallToAction,
    },
    Results {
        page: ResultsPage,
        restart: NavigationAction,
    },
}

/// Sends the user back to the assessment when there is nothing to show.
///
/// Only inspects the snapshot; never fetches or recomputes anything.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    entry_point: String,
}

impl NavigationGuard {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
        }
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn call_to_action(&self) -> CallToAction {
        CallToAction {
            title: "No assessment results found".to_string(),
            message: "Please complete the assessment first.".to_string(),
            action_label: "Start Assessment".to_string(),
            target: self.entry_point.clone(),
        }
    }

    /// Entering the Results surface.
    pub fn enter(&self, snapshot: &Snapshot) -> ResultsView {
        match &snapshot.results {
            Some(page) => ResultsView::Results {
                page: page.clone(),
                restart: NavigationAction {
                    label: "Chat with AyurSutra".to_string(),
                    target: self.entry_point.clone(),
                },
            },
            None => {
                tracing::debug!("No assessment result yet, redirecting to {}", self.entry_point);
                ResultsView::NoResult {
                    call_to_action: self.call_to_action(),
                }
            }
        }
    }
}

impl fmt::Display for ResultsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultsView::NoResult { call_to_action } => write!(f, "{}", call_to_action),
            ResultsView::Results { page, restart } => {
                write!(f, "{}", page)?;
                writeln!(f)?;
                write!(f, "[{}] -> {}", restart.label, restart.target)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AssessmentStore;

    #[test]
    fn test_empty_store_redirects() {
        let guard = NavigationGuard::new("/chat");
        let view = guard.enter(&AssessmentStore::new().read());
        match view {
            ResultsView::NoResult { call_to_action } => {
                assert_eq!(call_to_action.target, "/chat");
                assert_eq!(call_to_action.action_label, "Start Assessment");
            }
            other => panic!("expected call to action, got {:?}", other),
        }
    }

    #[test]
    fn test_no_result_view_serializes_tag() {
        let guard = NavigationGuard::new("/chat");
        let value = serde_json::to_value(guard.enter(&AssessmentStore::new().read())).unwrap();
        assert_eq!(value["view"], "no_result");
        assert_eq!(value["call_to_action"]["target"], "/chat");
    }
}
