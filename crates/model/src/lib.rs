//! Core domain model for mentor/mentee matching.
//!
//! This crate defines the value types shared by every stage of the engine:
//! - `RawProfile`: the loosely-typed profile as supplied by the caller
//! - `Person`: the canonical, normalized profile used for scoring
//! - `WeightVector` / `MatchConfig`: validated engine configuration
//! - `PairScore`: one scored mentor/mentee pair with its reasons
//! - `Assignment` / `AssignmentRecord`: selected pairs and their persisted form

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default per-mentor capacity (K) of the base recommendation.
pub const DEFAULT_CAPACITY: usize = 2;

/// Default length (L) of each mentor's display list.
pub const DEFAULT_LIST_SIZE: usize = 5;

/// Education score used when either side has no resolvable level.
pub const DEFAULT_MISSING_EDUCATION_SCORE: f64 = 0.6;

/// Configuration errors, raised before any scoring happens.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),
    #[error("Capacity must be at least 1")]
    InvalidCapacity,
    #[error("List size must be at least 1")]
    InvalidListSize,
    #[error("List size {list_size} is smaller than capacity {capacity}")]
    ListSizeBelowCapacity { list_size: usize, capacity: usize },
    #[error("Missing-education score must lie in [0, 1], got {0}")]
    InvalidMissingEducationScore(f64),
}

/// A profile exactly as the caller hands it over.
///
/// `attributes` stays untyped here; the normalizer validates its shape and
/// drops the profile if it does not conform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfile {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default)]
    pub attributes: serde_json::Value,
}

impl RawProfile {
    pub fn new(id: impl Into<String>, attributes: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            attributes,
        }
    }
}

/// Ordered education vocabulary, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    SecondarySchool,
    Ite,
    Polytechnic,
    JuniorCollege,
    Bachelors,
    Masters,
    Phd,
}

impl EducationLevel {
    /// Ordinal position, 0 for secondary school up to 6 for PhD.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Absolute rank difference between two levels.
    pub fn distance(self, other: Self) -> u8 {
        self.rank().abs_diff(other.rank())
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SecondarySchool => "Secondary school",
            Self::Ite => "ITE",
            Self::Polytechnic => "Polytechnic",
            Self::JuniorCollege => "Junior college",
            Self::Bachelors => "Bachelor's",
            Self::Masters => "Master's",
            Self::Phd => "PhD",
        }
    }
}

/// The highest-ranked education entry of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    pub level: EducationLevel,

    /// Field of study, trimmed and lowercased (may be empty)
    #[serde(default)]
    pub field: String,
}

/// Canonical profile consumed by the scorer.
///
/// Attribute sets are lowercase, trimmed, deduplicated and never contain
/// empty strings. `BTreeSet` keeps their iteration order deterministic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default)]
    pub skills: BTreeSet<String>,

    #[serde(default)]
    pub hobbies: BTreeSet<String>,

    #[serde(default)]
    pub industry_sectors: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<Education>,
}

impl Person {
    /// Create an empty person for testing.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn education_level(&self) -> Option<EducationLevel> {
        self.education.as_ref().map(|e| e.level)
    }

    /// Name to show in listings, falling back to the id.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Per-dimension weights for the overall score.
///
/// The vector need not sum to 1; the aggregate is divided by the sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightVector {
    pub skills: f64,
    pub industry: f64,
    pub education: f64,
    pub hobbies: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            skills: 0.40,
            industry: 0.35,
            education: 0.15,
            hobbies: 0.10,
        }
    }
}

impl WeightVector {
    pub fn sum(&self) -> f64 {
        self.skills + self.industry + self.education + self.hobbies
    }

    /// Reject negative or non-finite weights and an all-zero vector.
    pub fn validate(&self) -> Result<(), ModelError> {
        let named = [
            ("skills", self.skills),
            ("industry", self.industry),
            ("education", self.education),
            ("hobbies", self.hobbies),
        ];
        for (name, weight) in named {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ModelError::InvalidWeights(format!(
                    "{} weight must be a finite non-negative number, got {}",
                    name, weight
                )));
            }
        }
        if self.sum() <= 0.0 {
            return Err(ModelError::InvalidWeights(
                "at least one weight must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchConfig {
    pub weights: WeightVector,

    /// Maximum base picks per mentor (K)
    pub capacity: usize,

    /// Maximum display-list length per mentor (L)
    pub list_size: usize,

    /// Education score when either side lacks a resolvable level
    pub missing_education_score: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            weights: WeightVector::default(),
            capacity: DEFAULT_CAPACITY,
            list_size: DEFAULT_LIST_SIZE,
            missing_education_score: DEFAULT_MISSING_EDUCATION_SCORE,
        }
    }
}

impl MatchConfig {
    pub fn with_weights(mut self, weights: WeightVector) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_list_size(mut self, list_size: usize) -> Self {
        self.list_size = list_size;
        self
    }

    pub fn with_missing_education_score(mut self, score: f64) -> Self {
        self.missing_education_score = score;
        self
    }

    /// Reject unusable settings before any scoring.
    ///
    /// `list_size < capacity` is an error rather than a silent truncation of
    /// the base picks.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.weights.validate()?;
        if self.capacity == 0 {
            return Err(ModelError::InvalidCapacity);
        }
        if self.list_size == 0 {
            return Err(ModelError::InvalidListSize);
        }
        // Base picks always fit in the display list.
        if self.list_size < self.capacity {
            return Err(ModelError::ListSizeBelowCapacity {
                list_size: self.list_size,
                capacity: self.capacity,
            });
        }
        let missing = self.missing_education_score;
        if !missing.is_finite() || !(0.0..=1.0).contains(&missing) {
            return Err(ModelError::InvalidMissingEducationScore(missing));
        }
        Ok(())
    }
}

/// The four component scores of a pair, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentScores {
    pub skill: f64,
    pub industry: f64,
    pub education: f64,
    pub hobby: f64,
}

impl ComponentScores {
    pub fn any_nonzero(&self) -> bool {
        self.skill > 0.0 || self.industry > 0.0 || self.education > 0.0 || self.hobby > 0.0
    }
}

/// One evaluated mentor/mentee pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairScore {
    pub mentor_id: String,
    pub mentee_id: String,
    pub scores: ComponentScores,

    /// Weight-normalized combination of `scores`
    pub overall_score: f64,

    /// Explanations, in skills, industry, education, hobbies order
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl PairScore {
    pub fn key(&self) -> (&str, &str) {
        (&self.mentor_id, &self.mentee_id)
    }
}

/// Where an assignment is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    /// Picked by the engine's base recommendation
    Computed,
    /// Toggled on by a human
    Edited,
    /// Mentee is claimed by more than one selected mentor
    Conflicted,
    /// Handed to the persistence collaborator
    Saved,
}

/// A pair promoted into the recommended or human-selected set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub pair: PairScore,
    pub status: AssignmentStatus,
}

impl Assignment {
    pub fn new(pair: PairScore, status: AssignmentStatus) -> Self {
        Self { pair, status }
    }

    pub fn mentor_id(&self) -> &str {
        &self.pair.mentor_id
    }

    pub fn mentee_id(&self) -> &str {
        &self.pair.mentee_id
    }

    pub fn to_record(&self) -> AssignmentRecord {
        AssignmentRecord {
            mentor_id: self.pair.mentor_id.clone(),
            mentee_id: self.pair.mentee_id.clone(),
            score: self.pair.overall_score,
            approved: true,
        }
    }
}

/// Row shape written to and read from the assignment store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub mentor_id: String,
    pub mentee_id: String,

    #[serde(default)]
    pub score: f64,

    #[serde(default)]
    pub approved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = WeightVector::default();
        assert!((weights.sum() - 1.0).abs() < 1e-9);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_all_zero_weights_rejected() {
        let weights = WeightVector {
            skills: 0.0,
            industry: 0.0,
            education: 0.0,
            hobbies: 0.0,
        };
        assert!(matches!(weights.validate(), Err(ModelError::InvalidWeights(_))));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let weights = WeightVector {
            hobbies: -0.1,
            ..Default::default()
        };
        assert!(matches!(weights.validate(), Err(ModelError::InvalidWeights(_))));
    }

    #[test]
    fn test_unnormalized_weights_accepted() {
        let weights = WeightVector {
            skills: 4.0,
            industry: 3.5,
            education: 1.5,
            hobbies: 1.0,
        };
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(MatchConfig::default().validate().is_ok());
        assert_eq!(
            MatchConfig::default().with_capacity(0).validate(),
            Err(ModelError::InvalidCapacity)
        );
        assert_eq!(
            MatchConfig::default().with_list_size(0).validate(),
            Err(ModelError::InvalidListSize)
        );
        assert_eq!(
            MatchConfig::default().with_capacity(6).validate(),
            Err(ModelError::ListSizeBelowCapacity {
                list_size: 5,
                capacity: 6
            })
        );
        assert!(MatchConfig::default().with_capacity(5).validate().is_ok());
        assert!(matches!(
            MatchConfig::default()
                .with_missing_education_score(1.5)
                .validate(),
            Err(ModelError::InvalidMissingEducationScore(_))
        ));
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: MatchConfig =
            serde_json::from_str(r#"{"capacity": 3, "weights": {"skills": 1.0}}"#).unwrap();
        assert_eq!(config.capacity, 3);
        assert_eq!(config.list_size, DEFAULT_LIST_SIZE);
        assert_eq!(config.weights.skills, 1.0);
        assert_eq!(config.weights.industry, 0.35);
    }

    #[test]
    fn test_education_ordering() {
        assert!(EducationLevel::SecondarySchool < EducationLevel::Ite);
        assert!(EducationLevel::Bachelors < EducationLevel::Masters);
        assert_eq!(EducationLevel::Phd.rank(), 6);
        assert_eq!(EducationLevel::Polytechnic.distance(EducationLevel::Masters), 3);
        assert_eq!(EducationLevel::Masters.distance(EducationLevel::Polytechnic), 3);
    }

    #[test]
    fn test_pair_score_serializes_camel_case() {
        let pair = PairScore {
            mentor_id: "m1".into(),
            mentee_id: "t1".into(),
            scores: ComponentScores::default(),
            overall_score: 0.5,
            reasons: vec![],
        };
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["mentorId"], "m1");
        assert_eq!(json["overallScore"], 0.5);
        assert!(json["scores"].get("skill").is_some());
    }

    #[test]
    fn test_raw_profile_without_display_name() {
        let raw: RawProfile =
            serde_json::from_str(r#"{"id": "m1", "attributes": {"skills": ["Rust"]}}"#).unwrap();
        assert_eq!(raw.id, "m1");
        assert!(raw.display_name.is_none());
        assert!(raw.attributes.is_object());
    }
}
