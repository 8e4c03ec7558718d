//! Training context submitted with a generation request.

use serde::{Deserialize, Serialize};

use super::error::{PathwayError, Result};

/// Who the training is for and what it must achieve.
///
/// Immutable once handed to a generation request; the session keeps its own copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingContext {
    /// Target audience (e.g. "new warehouse staff")
    #[serde(alias = "target_audience")]
    pub audience: String,
    /// Primary training goals
    #[serde(alias = "primary_goals")]
    pub goals: String,
    /// Industry context
    pub industry: String,
    /// Delivery timeline (e.g. "2 weeks")
    pub timeline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_metrics: Option<String>,
}

impl TrainingContext {
    pub fn new(
        audience: impl Into<String>,
        goals: impl Into<String>,
        industry: impl Into<String>,
        timeline: impl Into<String>,
    ) -> Self {
        Self {
            audience: audience.into(),
            goals: goals.into(),
            industry: industry.into(),
            timeline: timeline.into(),
            training_type: None,
            success_metrics: None,
        }
    }

    pub fn with_training_type(mut self, training_type: impl Into<String>) -> Self {
        self.training_type = Some(training_type.into());
        self
    }

    pub fn with_success_metrics(mut self, metrics: impl Into<String>) -> Self {
        self.success_metrics = Some(metrics.into());
        self
    }

    /// Required fields, in prompt order
    pub fn required_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("audience", self.audience.as_str()),
            ("goals", self.goals.as_str()),
            ("industry", self.industry.as_str()),
            ("timeline", self.timeline.as_str()),
        ]
    }

    /// Fails with `InvalidContext` naming every blank required field.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = self
            .required_fields()
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PathwayError::InvalidContext(format!(
                "required field(s) empty: {}",
                missing.join(", ")
            )))
        }
    }
}
