use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

/// Structured summary of a web page produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub url: Url,
    pub summary: String,
    pub topics: Vec<String>,
    pub insights: Vec<String>,
    pub suggested_questions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Estimated effect of a change, each axis in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactAssessment {
    pub performance: f64,
    pub security: f64,
    pub user_experience: f64,
}

impl ImpactAssessment {
    /// Clamps every axis into `[-1.0, 1.0]`; NaN becomes 0.
    pub fn clamped(self) -> Self {
        fn clamp(value: f64) -> f64 {
            if value.is_nan() {
                0.0
            } else {
                value.clamp(-1.0, 1.0)
            }
        }
        Self {
            performance: clamp(self.performance),
            security: clamp(self.security),
            user_experience: clamp(self.user_experience),
        }
    }

    pub fn mean(&self) -> f64 {
        (self.performance + self.security + self.user_experience) / 3.0
    }
}

/// A model-suggested rewrite of a piece of code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeImprovement {
    pub original_code: String,
    pub improved_code: String,
    pub explanation: String,
    pub performance_impact: f64,
    pub security_impact: f64,
    pub user_experience_impact: f64,
    pub timestamp: DateTime<Utc>,
}

impl CodeImprovement {
    pub fn impact(&self) -> ImpactAssessment {
        ImpactAssessment {
            performance: self.performance_impact,
            security: self.security_impact,
            user_experience: self.user_experience_impact,
        }
    }

    pub fn overall_impact(&self) -> f64 {
        self.impact().mean()
    }
}
