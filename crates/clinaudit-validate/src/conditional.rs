//! Conditional-logic evaluation.
//!
//! Dependency edges between questions are resolved once, when a
//! questionnaire is published, into an explicit acyclic evaluation order
//! over question indices. Submission-time evaluation is then a single pass
//! in that order; cycles and dangling references can never appear here
//! because they were rejected at publish time.

use std::collections::{BTreeMap, BTreeSet};

use clinaudit_model::{DefinitionIssue, QuestionDefinition, RawResponses};
use serde_json::Value;

/// Resolved conditional-logic structure for one questionnaire version.
///
/// `order` lists question indices so that every question appears after the
/// question it depends on; `parent` holds the resolved dependency edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationPlan {
    order: Vec<usize>,
    parent: Vec<Option<usize>>,
}

impl EvaluationPlan {
    /// Resolve dependency edges and compute a dependency-ordered pass.
    ///
    /// Collects every unresolved, self, or cyclic reference instead of
    /// stopping at the first.
    pub fn resolve(questions: &[QuestionDefinition]) -> Result<Self, Vec<DefinitionIssue>> {
        let mut issues = Vec::new();
        let index_by_code: BTreeMap<&str, usize> = questions
            .iter()
            .enumerate()
            .map(|(idx, q)| (q.code.as_str(), idx))
            .collect();

        let mut parent: Vec<Option<usize>> = vec![None; questions.len()];
        for (idx, question) in questions.iter().enumerate() {
            let Some(condition) = &question.condition else {
                continue;
            };
            let depends_on = condition.depends_on();
            match index_by_code.get(depends_on) {
                Some(&dep_idx) if dep_idx == idx => {
                    issues.push(DefinitionIssue::SelfReference {
                        code: question.code.clone(),
                    });
                }
                Some(&dep_idx) => parent[idx] = Some(dep_idx),
                None => issues.push(DefinitionIssue::UnresolvedReference {
                    code: question.code.clone(),
                    depends_on: depends_on.to_string(),
                }),
            }
        }

        // Kahn's algorithm over the parent edges; anything left unplaced
        // sits on a cycle.
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); questions.len()];
        let mut indegree = vec![0usize; questions.len()];
        for (idx, dep) in parent.iter().enumerate() {
            if let Some(dep_idx) = *dep {
                children[dep_idx].push(idx);
                indegree[idx] += 1;
            }
        }

        let mut queue: Vec<usize> = (0..questions.len()).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(questions.len());
        while let Some(idx) = queue.pop() {
            order.push(idx);
            for &child in &children[idx] {
                indegree[child] -= 1;
                if indegree[child] == 0 {
                    queue.push(child);
                }
            }
        }

        if order.len() < questions.len() {
            for (idx, question) in questions.iter().enumerate() {
                if indegree[idx] > 0 {
                    issues.push(DefinitionIssue::CyclicReference {
                        code: question.code.clone(),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(Self { order, parent })
        } else {
            Err(issues)
        }
    }

    /// Compute the set of active question codes for a partial raw
    /// submission, in a single pass over the dependency order.
    ///
    /// A question with no condition is always active. A conditioned
    /// question is active only when its dependency is itself active and
    /// holds an answer satisfying the comparison; an unanswered dependency
    /// deactivates the question regardless of operator.
    pub fn active_questions(
        &self,
        questions: &[QuestionDefinition],
        raw: &RawResponses,
    ) -> BTreeSet<String> {
        let mut active = vec![false; questions.len()];
        for &idx in &self.order {
            let question = &questions[idx];
            active[idx] = match (&question.condition, self.parent[idx]) {
                (None, _) => true,
                (Some(condition), Some(dep_idx)) => {
                    active[dep_idx]
                        && raw
                            .get(&questions[dep_idx].code)
                            .and_then(raw_comparison_text)
                            .is_some_and(|answer| condition.matches(&answer))
                }
                // Unresolvable edges are rejected at publish time.
                (Some(_), None) => false,
            };
        }

        questions
            .iter()
            .enumerate()
            .filter(|(idx, _)| active[*idx])
            .map(|(_, q)| q.code.clone())
            .collect()
    }
}

/// Canonical string form of a raw JSON answer for condition comparisons.
///
/// Arrays and objects have no single comparison form and never match.
pub(crate) fn raw_comparison_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                n.as_f64().map(|f| f.to_string())
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
