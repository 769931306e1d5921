// Task module - what a segmentation model is asked to predict
//
// A task specification fixes the output dimension and the final activation
// of the model. Powerset specifications encode every subset of at most
// `powerset_max_classes` active classes as one mutually exclusive class.

use serde::{Deserialize, Serialize};

/// Type of classification problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Problem {
    BinaryClassification,
    MonoLabelClassification,
    MultiLabelClassification,
}

/// Specification of a single task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpecification {
    pub problem: Problem,
    pub classes: Vec<String>,
    /// Maximum number of simultaneously active classes when using powerset encoding
    #[serde(default)]
    pub powerset_max_classes: Option<usize>,
}

impl TaskSpecification {
    pub fn new(problem: Problem, classes: Vec<String>) -> Self {
        Self {
            problem,
            classes,
            powerset_max_classes: None,
        }
    }

    /// Multi-label task encoded as powerset of at most `max_classes` active classes
    pub fn powerset(classes: Vec<String>, max_classes: usize) -> Self {
        Self {
            problem: Problem::MonoLabelClassification,
            classes,
            powerset_max_classes: Some(max_classes),
        }
    }

    pub fn uses_powerset(&self) -> bool {
        self.powerset_max_classes.is_some()
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Number of powerset classes: sum of C(n, k) for k in 0..=max_classes
    ///
    /// Returns 0 when the task does not use powerset encoding.
    pub fn num_powerset_classes(&self) -> usize {
        let Some(max_classes) = self.powerset_max_classes else {
            return 0;
        };

        let n = self.num_classes();
        (0..=max_classes.min(n))
            .map(|k| binomial(n, k))
            .fold(0, usize::saturating_add)
    }
}

/// C(n, k) for k <= n, saturating at `usize::MAX`
fn binomial(n: usize, k: usize) -> usize {
    let k = k.min(n - k);
    (0..k)
        .try_fold(1u128, |acc, i| {
            acc.checked_mul((n - i) as u128)
                .map(|product| product / (i as u128 + 1))
        })
        .and_then(|value| usize::try_from(value).ok())
        .unwrap_or(usize::MAX)
}

/// Task specification(s) a model is built against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Specifications {
    Single(TaskSpecification),
    Multi(Vec<TaskSpecification>),
}

impl Specifications {
    pub fn is_multi_task(&self) -> bool {
        matches!(self, Specifications::Multi(_))
    }

    pub fn num_tasks(&self) -> usize {
        match self {
            Specifications::Single(_) => 1,
            Specifications::Multi(tasks) => tasks.len(),
        }
    }
}

impl From<TaskSpecification> for Specifications {
    fn from(task: TaskSpecification) -> Self {
        Specifications::Single(task)
    }
}
