//! Profile normalization and pairwise similarity features.
//!
//! Provides pure functions for turning caller-supplied profiles into
//! canonical `Person` records and for computing the per-dimension scores:
//! - Attribute set normalization (trim, lowercase, dedupe)
//! - Education level parsing onto the ordinal vocabulary
//! - Jaccard similarity for skills and hobbies
//! - Binary industry alignment
//! - Ordinal distance decay for education

use std::collections::{BTreeSet, HashSet};

use mentormatch_model::{ComponentScores, Education, EducationLevel, Person, RawProfile};
use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons a raw profile is rejected by the normalizer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProfileError {
    #[error("Profile id is empty")]
    EmptyId,
    #[error("Attributes are not an object")]
    NotAnObject,
    #[error("Field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// Trim and lowercase a single attribute value; empty results are dropped.
pub fn normalize_term(text: &str) -> Option<String> {
    let term = text.trim().to_lowercase();
    if term.is_empty() {
        None
    } else {
        Some(term)
    }
}

/// Normalize a list of attribute values into a deduplicated set.
pub fn normalize_set<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .filter_map(|s| normalize_term(s.as_ref()))
        .collect()
}

/// Map a free-text education level onto the ordinal vocabulary.
///
/// Matching is by substring containment, checked from the highest level
/// down. `ite` and `poly` are matched as whole words only, since they
/// occur inside unrelated words.
pub fn parse_education_level(raw: &str) -> Option<EducationLevel> {
    let text = raw.to_lowercase().replace('.', "");
    let text = text.trim();
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if text.contains("phd") || text.contains("doctor") {
        Some(EducationLevel::Phd)
    } else if text.contains("master") {
        Some(EducationLevel::Masters)
    } else if text.contains("bachelor") || text.contains("university") {
        Some(EducationLevel::Bachelors)
    } else if text.contains("junior college") {
        Some(EducationLevel::JuniorCollege)
    } else if text.contains("polytechnic") || words.contains(&"poly") {
        Some(EducationLevel::Polytechnic)
    } else if words.contains(&"ite") {
        Some(EducationLevel::Ite)
    } else if text.contains("secondary") {
        Some(EducationLevel::SecondarySchool)
    } else {
        None
    }
}

/// Keep the highest-ranked entry among `(level, field)` pairs.
///
/// Entries whose level does not resolve are ignored; on equal rank the
/// earlier entry wins.
pub fn highest_education<S: AsRef<str>>(entries: &[(S, S)]) -> Option<Education> {
    let mut best: Option<Education> = None;
    for (level, field) in entries {
        let Some(level) = parse_education_level(level.as_ref()) else {
            continue;
        };
        if best.as_ref().map_or(true, |b| level > b.level) {
            best = Some(Education {
                level,
                field: field.as_ref().trim().to_lowercase(),
            });
        }
    }
    best
}

fn string_list<'a>(
    attrs: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Vec<&'a str>, ProfileError> {
    let wrong = ProfileError::WrongType {
        field,
        expected: "an array of strings",
    };
    match attrs.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().ok_or_else(|| wrong.clone()))
            .collect(),
        Some(_) => Err(wrong),
    }
}

fn education_list(attrs: &Map<String, Value>) -> Result<Vec<(&str, &str)>, ProfileError> {
    const FIELD: &str = "educationalBackground";
    let wrong = ProfileError::WrongType {
        field: FIELD,
        expected: "an array of [level, field] string pairs",
    };
    let items = match attrs.get(FIELD) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(wrong),
    };
    items
        .iter()
        .map(|entry| match entry.as_array().map(Vec::as_slice) {
            Some([Value::String(level), Value::String(field)]) => Ok((level.as_str(), field.as_str())),
            _ => Err(wrong.clone()),
        })
        .collect()
}

/// Validate a raw profile and convert it into a `Person`.
///
/// Absent or null attribute fields count as empty. A field that is present
/// with the wrong shape rejects the whole profile.
pub fn normalize_profile(raw: &RawProfile) -> Result<Person, ProfileError> {
    let id = raw.id.trim();
    if id.is_empty() {
        return Err(ProfileError::EmptyId);
    }
    let attrs = raw.attributes.as_object().ok_or(ProfileError::NotAnObject)?;

    // Stored rows use the singular key.
    let industry = if attrs.contains_key("industrySectors") {
        string_list(attrs, "industrySectors")?
    } else {
        string_list(attrs, "industrySector")?
    };

    Ok(Person {
        id: id.to_string(),
        display_name: raw.display_name.clone(),
        skills: normalize_set(string_list(attrs, "skills")?),
        hobbies: normalize_set(string_list(attrs, "hobbies")?),
        industry_sectors: normalize_set(industry),
        education: highest_education(&education_list(attrs)?),
    })
}

/// Normalize a whole pool, dropping malformed profiles and duplicate ids.
pub fn normalize_pool(raws: &[RawProfile]) -> Vec<Person> {
    let mut seen = HashSet::new();
    let mut pool = Vec::with_capacity(raws.len());

    for raw in raws {
        match normalize_profile(raw) {
            Ok(person) => {
                if seen.insert(person.id.clone()) {
                    pool.push(person);
                } else {
                    tracing::warn!(id = %person.id, "Dropping profile with duplicate id");
                }
            }
            Err(e) => {
                tracing::warn!(id = %raw.id, error = %e, "Dropping malformed profile");
            }
        }
    }

    pool
}

/// Jaccard similarity `|A ∩ B| / |A ∪ B|`; two empty sets score 0.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    inter as f64 / union as f64
}

/// Shared elements of two sets, in sorted order.
pub fn overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Vec<String> {
    a.intersection(b).cloned().collect()
}

/// 1 if the sector sets intersect, else 0.
pub fn industry_score(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.intersection(b).next().is_some() {
        1.0
    } else {
        0.0
    }
}

/// Score for a given rank distance between two education levels.
pub fn education_decay(distance: u8) -> f64 {
    match distance {
        0 => 1.0,
        1 => 0.85,
        2 => 0.6,
        _ => 0.3,
    }
}

/// Education similarity; `missing` is used when either level is absent.
pub fn education_score(
    a: Option<EducationLevel>,
    b: Option<EducationLevel>,
    missing: f64,
) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => education_decay(a.distance(b)),
        _ => missing,
    }
}

/// Overlap sets shared by a mentor and mentee.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlaps {
    pub skills: Vec<String>,
    pub industry: Vec<String>,
    pub hobbies: Vec<String>,
}

pub fn overlaps(mentor: &Person, mentee: &Person) -> Overlaps {
    Overlaps {
        skills: overlap(&mentor.skills, &mentee.skills),
        industry: overlap(&mentor.industry_sectors, &mentee.industry_sectors),
        hobbies: overlap(&mentor.hobbies, &mentee.hobbies),
    }
}

/// Compute all four component scores for a pair.
pub fn component_scores(mentor: &Person, mentee: &Person, missing_education: f64) -> ComponentScores {
    ComponentScores {
        skill: jaccard(&mentor.skills, &mentee.skills),
        industry: industry_score(&mentor.industry_sectors, &mentee.industry_sectors),
        education: education_score(
            mentor.education_level(),
            mentee.education_level(),
            missing_education,
        ),
        hobby: jaccard(&mentor.hobbies, &mentee.hobbies),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(items: &[&str]) -> BTreeSet<String> {
        normalize_set(items)
    }

    #[test]
    fn test_normalize_set_dedupes_case_insensitively() {
        let s = set(&["  Python", "python ", "SQL", "", "   "]);
        assert_eq!(s.into_iter().collect::<Vec<_>>(), vec!["python", "sql"]);
    }

    #[test]
    fn test_parse_education_level() {
        assert_eq!(parse_education_level("Bachelor's"), Some(EducationLevel::Bachelors));
        assert_eq!(parse_education_level("University degree"), Some(EducationLevel::Bachelors));
        assert_eq!(parse_education_level("Ph.D."), Some(EducationLevel::Phd));
        assert_eq!(parse_education_level("Masters"), Some(EducationLevel::Masters));
        assert_eq!(parse_education_level("Junior College"), Some(EducationLevel::JuniorCollege));
        assert_eq!(parse_education_level("Poly"), Some(EducationLevel::Polytechnic));
        assert_eq!(parse_education_level("ITE"), Some(EducationLevel::Ite));
        assert_eq!(parse_education_level("Secondary School"), Some(EducationLevel::SecondarySchool));
        assert_eq!(parse_education_level("Elite bootcamp"), None);
        assert_eq!(parse_education_level(""), None);
    }

    #[test]
    fn test_highest_education_wins() {
        let entries = [
            ("Bachelor's", "Computer Science"),
            ("Master's", " Data Science "),
            ("Polytechnic", "IT"),
        ];
        let edu = highest_education(&entries).unwrap();
        assert_eq!(edu.level, EducationLevel::Masters);
        assert_eq!(edu.field, "data science");
    }

    #[test]
    fn test_highest_education_unresolvable() {
        assert_eq!(highest_education(&[("Self-taught", "Art")]), None);
        assert_eq!(highest_education::<&str>(&[]), None);
    }

    #[test]
    fn test_normalize_profile() {
        let raw = RawProfile::new(
            "m1",
            json!({
                "skills": ["Python", "python", "SQL"],
                "industrySectors": ["Tech"],
                "hobbies": ["Chess"],
                "educationalBackground": [["Bachelor's", "CS"]]
            }),
        );
        let person = normalize_profile(&raw).unwrap();
        assert_eq!(person.skills.len(), 2);
        assert!(person.industry_sectors.contains("tech"));
        assert_eq!(person.education_level(), Some(EducationLevel::Bachelors));
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let person = normalize_profile(&RawProfile::new("t1", json!({}))).unwrap();
        assert!(person.skills.is_empty());
        assert!(person.education.is_none());
    }

    #[test]
    fn test_singular_industry_key_accepted() {
        let raw = RawProfile::new("t1", json!({"industrySector": ["Finance"]}));
        let person = normalize_profile(&raw).unwrap();
        assert!(person.industry_sectors.contains("finance"));
    }

    #[test]
    fn test_malformed_profiles_rejected() {
        assert_eq!(
            normalize_profile(&RawProfile::new("x", json!("nope"))),
            Err(ProfileError::NotAnObject)
        );
        assert!(matches!(
            normalize_profile(&RawProfile::new("x", json!({"skills": "Rust"}))),
            Err(ProfileError::WrongType { field: "skills", .. })
        ));
        assert!(matches!(
            normalize_profile(&RawProfile::new("x", json!({"hobbies": [1, 2]}))),
            Err(ProfileError::WrongType { field: "hobbies", .. })
        ));
        assert!(matches!(
            normalize_profile(&RawProfile::new("x", json!({"educationalBackground": [["PhD"]]}))),
            Err(ProfileError::WrongType { field: "educationalBackground", .. })
        ));
        assert_eq!(
            normalize_profile(&RawProfile::new(" ", json!({}))),
            Err(ProfileError::EmptyId)
        );
    }

    #[test]
    fn test_normalize_pool_drops_bad_and_duplicate() {
        let raws = vec![
            RawProfile::new("a", json!({"skills": ["Rust"]})),
            RawProfile::new("b", json!({"skills": 3})),
            RawProfile::new("a", json!({"skills": ["Go"]})),
            RawProfile::new("c", json!({})),
        ];
        let pool = normalize_pool(&raws);
        let ids: Vec<_> = pool.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(pool[0].skills.contains("rust"));
    }

    #[test]
    fn test_jaccard() {
        let a = set(&["python", "sql"]);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&a, &set(&["java"])), 0.0);
        assert_eq!(jaccard(&set(&[]), &set(&[])), 0.0);
        let b = set(&["python", "go", "rust"]);
        assert_eq!(jaccard(&a, &b), 0.25);
        assert_eq!(jaccard(&a, &b), jaccard(&b, &a));
    }

    #[test]
    fn test_industry_score_is_binary() {
        let tech = set(&["tech", "finance"]);
        assert_eq!(industry_score(&tech, &set(&["finance"])), 1.0);
        assert_eq!(industry_score(&tech, &set(&["health"])), 0.0);
        assert_eq!(industry_score(&tech, &set(&[])), 0.0);
    }

    #[test]
    fn test_education_decay_non_increasing() {
        let scores: Vec<f64> = (0..=6).map(education_decay).collect();
        assert_eq!(scores[..4], [1.0, 0.85, 0.6, 0.3]);
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_education_score_missing_uses_default() {
        let bach = Some(EducationLevel::Bachelors);
        assert_eq!(education_score(bach, None, 0.6), 0.6);
        assert_eq!(education_score(None, None, 0.0), 0.0);
        assert_eq!(
            education_score(bach, Some(EducationLevel::Phd), 0.6),
            education_score(Some(EducationLevel::Phd), bach, 0.6)
        );
    }

    #[test]
    fn test_component_scores_in_unit_range() {
        let mut mentor = Person::new("m");
        mentor.skills = set(&["python", "sql", "go"]);
        mentor.hobbies = set(&["chess"]);
        let mut mentee = Person::new("t");
        mentee.skills = set(&["python"]);
        let scores = component_scores(&mentor, &mentee, 0.6);
        for s in [scores.skill, scores.industry, scores.education, scores.hobby] {
            assert!((0.0..=1.0).contains(&s));
        }
        assert_eq!(overlaps(&mentor, &mentee).skills, vec!["python"]);
    }
}
