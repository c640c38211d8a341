//! Scoring, ranking and assignment selection for mentor/mentee pools.
//!
//! Takes two normalized pools, scores every pair, ranks candidates per
//! mentor and derives a greedy, capacity-limited recommendation in which
//! no mentee is claimed twice. The full ranked list stays visible for
//! manual override; conflicts in a human-edited selection are reported by
//! [`detect_conflicts`], never prevented.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use mentormatch_explain::reasons_from;
use mentormatch_features::{component_scores, normalize_pool, overlaps};
use mentormatch_model::{
    ComponentScores, MatchConfig, ModelError, PairScore, Person, RawProfile, WeightVector,
};
use serde::{Deserialize, Serialize};

mod selection;

pub use selection::Selection;

/// Weighted mean of the component scores, divided by the weight sum.
///
/// `weights` must have passed [`WeightVector::validate`].
pub fn overall_score(scores: &ComponentScores, weights: &WeightVector) -> f64 {
    let weighted = weights.skills * scores.skill
        + weights.industry * scores.industry
        + weights.education * scores.education
        + weights.hobbies * scores.hobby;
    (weighted / weights.sum()).clamp(0.0, 1.0)
}

/// Total order over pairs: scores descending, then ids ascending.
///
/// The trailing id comparisons make the order reproducible when every
/// score ties.
pub fn compare_pairs(a: &PairScore, b: &PairScore) -> Ordering {
    b.overall_score
        .total_cmp(&a.overall_score)
        .then_with(|| b.scores.skill.total_cmp(&a.scores.skill))
        .then_with(|| b.scores.industry.total_cmp(&a.scores.industry))
        .then_with(|| b.scores.education.total_cmp(&a.scores.education))
        .then_with(|| b.scores.hobby.total_cmp(&a.scores.hobby))
        .then_with(|| a.mentor_id.cmp(&b.mentor_id))
        .then_with(|| a.mentee_id.cmp(&b.mentee_id))
}

/// One entry of a mentor's display list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub pair: PairScore,

    /// Part of the unique base recommendation (false for backfill)
    pub recommended: bool,
}

/// A mentor's display list, base picks first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorMatches {
    pub mentor_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    pub candidates: Vec<RankedCandidate>,
}

impl MentorMatches {
    pub fn recommended(&self) -> impl Iterator<Item = &PairScore> {
        self.candidates
            .iter()
            .filter(|c| c.recommended)
            .map(|c| &c.pair)
    }
}

/// Result of [`Matcher::compute_matches`], ordered by mentor id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSet {
    pub mentors: Vec<MentorMatches>,
}

impl MatchSet {
    pub fn is_empty(&self) -> bool {
        self.mentors.is_empty()
    }

    pub fn for_mentor(&self, mentor_id: &str) -> Option<&MentorMatches> {
        self.mentors.iter().find(|m| m.mentor_id == mentor_id)
    }

    /// All base-recommendation pairs, grouped by mentor.
    pub fn base_recommendation(&self) -> impl Iterator<Item = &PairScore> {
        self.mentors.iter().flat_map(MentorMatches::recommended)
    }
}

/// The matching engine, bound to a validated configuration.
///
/// Holds no state besides its configuration, so one instance can be shared
/// freely across callers.
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    /// Validate `config` and build a matcher.
    pub fn new(config: MatchConfig) -> Result<Self, ModelError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Score a single pair, including its reasons.
    pub fn score_pair(&self, mentor: &Person, mentee: &Person) -> PairScore {
        let scores = component_scores(mentor, mentee, self.config.missing_education_score);
        let shared = overlaps(mentor, mentee);

        PairScore {
            mentor_id: mentor.id.clone(),
            mentee_id: mentee.id.clone(),
            overall_score: overall_score(&scores, &self.config.weights),
            reasons: reasons_from(mentor, mentee, &shared, &scores),
            scores,
        }
    }

    /// Normalize raw pools, then compute matches over the valid profiles.
    pub fn compute_from_raw(&self, mentors: &[RawProfile], mentees: &[RawProfile]) -> MatchSet {
        let mentors = normalize_pool(mentors);
        let mentees = normalize_pool(mentees);
        self.compute_matches(&mentors, &mentees)
    }

    /// Score every pair and build each mentor's display list.
    pub fn compute_matches(&self, mentors: &[Person], mentees: &[Person]) -> MatchSet {
        if mentors.is_empty() || mentees.is_empty() {
            return MatchSet::default();
        }

        let mut seen = HashSet::new();
        let mentees: Vec<&Person> = mentees.iter().filter(|t| seen.insert(t.id.clone())).collect();

        let mut by_mentor: BTreeMap<&str, Vec<PairScore>> = BTreeMap::new();
        let mut names: HashMap<&str, Option<String>> = HashMap::new();
        for mentor in mentors {
            if names.contains_key(mentor.id.as_str()) {
                continue;
            }
            names.insert(&mentor.id, mentor.display_name.clone());
            let ranked = by_mentor.entry(&mentor.id).or_default();
            ranked.extend(mentees.iter().map(|&mentee| self.score_pair(mentor, mentee)));
        }
        for ranked in by_mentor.values_mut() {
            ranked.sort_by(compare_pairs);
        }

        let base = self.select_base(&by_mentor);

        tracing::debug!(
            mentors = mentors.len(),
            mentees = mentees.len(),
            base_picks = base.len(),
            "Computed matches"
        );

        let list_size = self.config.list_size;
        let entries = by_mentor
            .into_iter()
            .map(|(mentor_id, ranked)| {
                let (picked, backfill): (Vec<_>, Vec<_>) = ranked
                    .into_iter()
                    .partition(|p| base.contains(&(p.mentor_id.clone(), p.mentee_id.clone())));

                let candidates = picked
                    .into_iter()
                    .map(|pair| RankedCandidate {
                        pair,
                        recommended: true,
                    })
                    .chain(backfill.into_iter().map(|pair| RankedCandidate {
                        pair,
                        recommended: false,
                    }))
                    .take(list_size)
                    .collect();

                MentorMatches {
                    mentor_id: mentor_id.to_string(),
                    display_name: names.get(mentor_id).cloned().flatten(),
                    candidates,
                }
            })
            .collect();

        MatchSet { mentors: entries }
    }

    /// Greedy single pass over all pairs in global order.
    ///
    /// A pair is taken iff its mentor has fewer than K picks and its mentee
    /// is unclaimed. No backtracking.
    fn select_base(&self, by_mentor: &BTreeMap<&str, Vec<PairScore>>) -> HashSet<(String, String)> {
        let mut global: Vec<&PairScore> = by_mentor.values().flatten().collect();
        global.sort_by(|a, b| compare_pairs(a, b));

        let mut used: HashMap<&str, usize> = HashMap::new();
        let mut claimed: HashSet<&str> = HashSet::new();
        let mut base = HashSet::new();

        for pair in global {
            let count = used.entry(pair.mentor_id.as_str()).or_insert(0);
            if *count >= self.config.capacity || claimed.contains(pair.mentee_id.as_str()) {
                continue;
            }
            *count += 1;
            claimed.insert(&pair.mentee_id);
            base.insert((pair.mentor_id.clone(), pair.mentee_id.clone()));
        }

        base
    }
}

/// Mentee id mapped to every mentor currently claiming it.
pub type ConflictMap = BTreeMap<String, Vec<String>>;

/// A selected `(mentor, mentee)` pair as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedPair {
    pub mentor_id: String,
    pub mentee_id: String,
}

/// Report mentees selected under more than one mentor.
///
/// Repeated identical pairs count once. Mentor lists are sorted.
pub fn detect_conflicts<'a, I>(selected: I) -> ConflictMap
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut claims: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (mentor_id, mentee_id) in selected {
        claims.entry(mentee_id).or_default().insert(mentor_id);
    }

    claims
        .into_iter()
        .filter(|(_, mentors)| mentors.len() > 1)
        .map(|(mentee, mentors)| {
            (
                mentee.to_string(),
                mentors.into_iter().map(str::to_string).collect(),
            )
        })
        .collect()
}

/// Mentors involved in at least one conflict.
pub fn mentors_with_conflicts(conflicts: &ConflictMap) -> BTreeSet<String> {
    conflicts.values().flatten().cloned().collect()
}
