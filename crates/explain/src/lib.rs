//! Explanation generation for mentor/mentee matches.
//!
//! Converts the overlaps behind each component score into human-readable
//! reasons, and builds a per-dimension breakdown for a single pair. Every
//! string is derived from the normalized profile data; nothing is invented.

use mentormatch_features::{overlaps, Overlaps};
use mentormatch_model::{ComponentScores, Education, PairScore, Person, WeightVector};
use serde::{Deserialize, Serialize};

const MAX_SHARED_SKILLS: usize = 3;
const MAX_SHOWCASE_SKILLS: usize = 2;
const MAX_SHARED_SECTORS: usize = 2;
const MAX_SHARED_HOBBIES: usize = 2;

/// Bucket a skill score into a strength label.
pub fn strength_label(score: f64) -> &'static str {
    if score >= 0.85 {
        "Strong"
    } else if score >= 0.60 {
        "Good"
    } else if score >= 0.35 {
        "Some"
    } else {
        "Low"
    }
}

/// Score as a whole percentage.
pub fn percent(score: f64) -> u32 {
    (score * 100.0).round() as u32
}

/// Join items as English prose: "a", "a and b", "a, b, and c".
pub fn list_to_text<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [one] => one.as_ref().to_string(),
        [a, b] => format!("{} and {}", a.as_ref(), b.as_ref()),
        [head @ .., last] => {
            let head: Vec<&str> = head.iter().map(AsRef::as_ref).collect();
            format!("{}, and {}", head.join(", "), last.as_ref())
        }
    }
}

fn first<S>(items: &[S], max: usize) -> &[S] {
    &items[..items.len().min(max)]
}

fn skills_reason(mentor: &Person, shared: &[String], skill_score: f64) -> Option<String> {
    if !shared.is_empty() {
        return Some(format!(
            "{} skill overlap ({}%): {}",
            strength_label(skill_score),
            percent(skill_score),
            list_to_text(first(shared, MAX_SHARED_SKILLS))
        ));
    }

    let showcase: Vec<&String> = mentor.skills.iter().take(MAX_SHOWCASE_SKILLS).collect();
    if showcase.is_empty() {
        None
    } else {
        Some(format!(
            "Complementary skills: mentor brings {}",
            list_to_text(&showcase)
        ))
    }
}

fn industry_reason(shared: &[String], industry_score: f64) -> String {
    if industry_score >= 1.0 && !shared.is_empty() {
        format!(
            "Industry aligned on {}",
            list_to_text(first(shared, MAX_SHARED_SECTORS))
        )
    } else {
        "Cross-industry match; transferable skills".to_string()
    }
}

fn education_reason(mentor: Option<&Education>, mentee: Option<&Education>) -> Option<String> {
    let (m, t) = match (mentor, mentee) {
        (None, None) => return None,
        (Some(m), Some(t)) => (m, t),
        _ => return Some("Education info partially provided".to_string()),
    };

    let ladder = if m.level == t.level {
        format!("Similar education ({})", t.level.label())
    } else if t.level < m.level {
        format!(
            "Step-up path: mentee {} → mentor {}",
            t.level.label(),
            m.level.label()
        )
    } else {
        format!(
            "Peer / cross-level: mentee {} vs mentor {}",
            t.level.label(),
            m.level.label()
        )
    };

    if !m.field.is_empty() && m.field == t.field {
        Some(format!("{} (both in {})", ladder, t.field))
    } else {
        Some(ladder)
    }
}

fn hobbies_reason(shared: &[String]) -> Option<String> {
    if shared.is_empty() {
        None
    } else {
        Some(format!(
            "Shared interests: {}",
            list_to_text(first(shared, MAX_SHARED_HOBBIES))
        ))
    }
}

/// Build the ordered reasons for a pair: skills, industry, education, hobbies.
pub fn build_reasons(mentor: &Person, mentee: &Person, scores: &ComponentScores) -> Vec<String> {
    let shared = overlaps(mentor, mentee);
    reasons_from(mentor, mentee, &shared, scores)
}

/// Same as [`build_reasons`] when the overlaps are already computed.
pub fn reasons_from(
    mentor: &Person,
    mentee: &Person,
    shared: &Overlaps,
    scores: &ComponentScores,
) -> Vec<String> {
    let mut reasons = Vec::with_capacity(4);

    if let Some(r) = skills_reason(mentor, &shared.skills, scores.skill) {
        reasons.push(r);
    }
    reasons.push(industry_reason(&shared.industry, scores.industry));
    if let Some(r) = education_reason(mentor.education.as_ref(), mentee.education.as_ref()) {
        reasons.push(r);
    }
    if let Some(r) = hobbies_reason(&shared.hobbies) {
        reasons.push(r);
    }

    reasons
}

/// One dimension of a pair's score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownPart {
    pub label: String,
    pub score: f64,
    pub weight: f64,

    /// Shared values, or the two education levels
    pub details: String,
}

/// Full shared attribute lists for a pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedAttributes {
    pub industry: Vec<String>,
    pub skills: Vec<String>,
    pub hobbies: Vec<String>,
}

impl From<Overlaps> for SharedAttributes {
    fn from(o: Overlaps) -> Self {
        Self {
            industry: o.industry,
            skills: o.skills,
            hobbies: o.hobbies,
        }
    }
}

/// Per-dimension explanation of one pair's overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchBreakdown {
    pub parts: Vec<BreakdownPart>,
    pub total_pct: u32,
    pub overlaps: SharedAttributes,
}

fn joined_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

/// Break a scored pair down into its weighted dimensions.
pub fn explain_pair(
    mentor: &Person,
    mentee: &Person,
    pair: &PairScore,
    weights: &WeightVector,
) -> MatchBreakdown {
    let shared = overlaps(mentor, mentee);
    let level = |p: &Person| {
        p.education_level()
            .map(|l| l.label().to_string())
            .unwrap_or_else(|| "?".to_string())
    };

    let parts = vec![
        BreakdownPart {
            label: "Industry".to_string(),
            score: pair.scores.industry,
            weight: weights.industry,
            details: joined_or_dash(&shared.industry),
        },
        BreakdownPart {
            label: "Skills".to_string(),
            score: pair.scores.skill,
            weight: weights.skills,
            details: joined_or_dash(&shared.skills),
        },
        BreakdownPart {
            label: "Education".to_string(),
            score: pair.scores.education,
            weight: weights.education,
            details: format!("{} <-> {}", level(mentor), level(mentee)),
        },
        BreakdownPart {
            label: "Hobbies".to_string(),
            score: pair.scores.hobby,
            weight: weights.hobbies,
            details: joined_or_dash(&shared.hobbies),
        },
    ];

    MatchBreakdown {
        parts,
        total_pct: percent(pair.overall_score),
        overlaps: shared.into(),
    }
}
