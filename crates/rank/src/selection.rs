//! Human-editable selection of assignments.

use std::collections::BTreeMap;

use mentormatch_model::{Assignment, AssignmentRecord, AssignmentStatus, PairScore};

use crate::{detect_conflicts, ConflictMap, MatchSet};

type PairKey = (String, String);

fn key_of(pair: &PairScore) -> PairKey {
    (pair.mentor_id.clone(), pair.mentee_id.clone())
}

/// The set of pairs a human currently has selected.
///
/// Starts from the engine's base recommendation and may be edited freely;
/// conflicts are tracked through assignment status, never blocked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    entries: BTreeMap<PairKey, Assignment>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with every base-recommendation pair of `matches`.
    pub fn from_recommendation(matches: &MatchSet) -> Self {
        let entries = matches
            .base_recommendation()
            .map(|pair| {
                (
                    key_of(pair),
                    Assignment::new(pair.clone(), AssignmentStatus::Computed),
                )
            })
            .collect();
        Self { entries }
    }

    /// Add a pair. Returns false if it was already selected.
    pub fn select(&mut self, pair: &PairScore) -> bool {
        let key = key_of(pair);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries
            .insert(key, Assignment::new(pair.clone(), AssignmentStatus::Edited));
        true
    }

    pub fn deselect(&mut self, mentor_id: &str, mentee_id: &str) -> Option<Assignment> {
        self.entries
            .remove(&(mentor_id.to_string(), mentee_id.to_string()))
    }

    /// Flip a pair on or off. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, pair: &PairScore) -> bool {
        if self.deselect(&pair.mentor_id, &pair.mentee_id).is_some() {
            false
        } else {
            self.select(pair)
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, mentor_id: &str, mentee_id: &str) -> bool {
        self.entries
            .contains_key(&(mentor_id.to_string(), mentee_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selected assignments ordered by mentor id, then mentee id.
    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.entries.values()
    }

    /// Number of pairs selected for one mentor.
    pub fn selected_for(&self, mentor_id: &str) -> usize {
        self.entries
            .values()
            .filter(|a| a.mentor_id() == mentor_id)
            .count()
    }

    /// Whether a mentor already holds `capacity` selected pairs.
    pub fn is_at_capacity(&self, mentor_id: &str, capacity: usize) -> bool {
        self.selected_for(mentor_id) >= capacity
    }

    pub fn conflicts(&self) -> ConflictMap {
        detect_conflicts(
            self.entries
                .keys()
                .map(|(mentor, mentee)| (mentor.as_str(), mentee.as_str())),
        )
    }

    /// Re-derive `Conflicted` status from the current conflicts.
    ///
    /// Assignments that are no longer conflicted fall back to `Edited`.
    pub fn refresh_status(&mut self) -> ConflictMap {
        let conflicts = self.conflicts();
        for assignment in self.entries.values_mut() {
            if assignment.status == AssignmentStatus::Saved {
                continue;
            }
            if conflicts.contains_key(assignment.mentee_id()) {
                assignment.status = AssignmentStatus::Conflicted;
            } else if assignment.status == AssignmentStatus::Conflicted {
                assignment.status = AssignmentStatus::Edited;
            }
        }
        if !conflicts.is_empty() {
            tracing::debug!(conflicts = conflicts.len(), "Selection has conflicts");
        }
        conflicts
    }

    /// Upsert payload for the persistence collaborator.
    pub fn to_records(&self) -> Vec<AssignmentRecord> {
        self.entries.values().map(Assignment::to_record).collect()
    }

    /// Mark every selected assignment as handed off to the store.
    pub fn mark_saved(&mut self) {
        for assignment in self.entries.values_mut() {
            assignment.status = AssignmentStatus::Saved;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MentorMatches, RankedCandidate};
    use mentormatch_model::ComponentScores;

    fn pair(mentor: &str, mentee: &str, score: f64) -> PairScore {
        PairScore {
            mentor_id: mentor.into(),
            mentee_id: mentee.into(),
            scores: ComponentScores::default(),
            overall_score: score,
            reasons: vec![],
        }
    }

    fn status_of(selection: &Selection, mentor: &str, mentee: &str) -> Option<AssignmentStatus> {
        selection
            .assignments()
            .find(|a| a.mentor_id() == mentor && a.mentee_id() == mentee)
            .map(|a| a.status)
    }

    fn match_set() -> MatchSet {
        let entry = |mentor: &str, picks: &[(&str, bool)]| MentorMatches {
            mentor_id: mentor.into(),
            display_name: None,
            candidates: picks
                .iter()
                .map(|(mentee, recommended)| RankedCandidate {
                    pair: pair(mentor, mentee, 0.5),
                    recommended: *recommended,
                })
                .collect(),
        };
        MatchSet {
            mentors: vec![
                entry("m1", &[("t1", true), ("t2", true), ("t3", false)]),
                entry("m2", &[("t3", true), ("t1", false)]),
            ],
        }
    }

    #[test]
    fn test_from_recommendation_takes_base_only() {
        let selection = Selection::from_recommendation(&match_set());
        assert_eq!(selection.len(), 3);
        assert!(selection.contains("m1", "t1"));
        assert!(!selection.contains("m1", "t3"));
        assert!(selection
            .assignments()
            .all(|a| a.status == AssignmentStatus::Computed));
        assert!(selection.conflicts().is_empty());
    }

    #[test]
    fn test_toggle_creates_and_clears_conflict() {
        let mut selection = Selection::from_recommendation(&match_set());
        let extra = pair("m2", "t1", 0.4);

        assert!(selection.toggle(&extra));
        assert_eq!(status_of(&selection, "m2", "t1"), Some(AssignmentStatus::Edited));
        let conflicts = selection.refresh_status();
        assert_eq!(
            conflicts.get("t1"),
            Some(&vec!["m1".to_string(), "m2".to_string()])
        );
        let statuses: Vec<_> = selection
            .assignments()
            .filter(|a| a.mentee_id() == "t1")
            .map(|a| a.status)
            .collect();
        assert_eq!(statuses, vec![AssignmentStatus::Conflicted; 2]);

        assert!(!selection.toggle(&extra));
        assert_eq!(status_of(&selection, "m2", "t1"), None);
        assert!(selection.refresh_status().is_empty());
        assert_eq!(status_of(&selection, "m1", "t1"), Some(AssignmentStatus::Edited));
        assert_eq!(status_of(&selection, "m1", "t2"), Some(AssignmentStatus::Computed));
        assert_eq!(status_of(&selection, "m2", "t3"), Some(AssignmentStatus::Computed));
    }

    #[test]
    fn test_select_marks_edited() {
        let mut selection = Selection::from_recommendation(&match_set());
        assert!(selection.select(&pair("m2", "t2", 0.3)));
        assert_eq!(status_of(&selection, "m2", "t2"), Some(AssignmentStatus::Edited));
        assert_eq!(status_of(&selection, "m1", "t1"), Some(AssignmentStatus::Computed));

        // Re-selecting a computed pair leaves it untouched.
        assert!(!selection.select(&pair("m1", "t1", 0.5)));
        assert_eq!(status_of(&selection, "m1", "t1"), Some(AssignmentStatus::Computed));
    }

    #[test]
    fn test_capacity_tracking() {
        let mut selection = Selection::from_recommendation(&match_set());
        assert_eq!(selection.selected_for("m1"), 2);
        assert!(selection.is_at_capacity("m1", 2));
        assert!(!selection.is_at_capacity("m2", 2));
        assert!(!selection.select(&pair("m1", "t1", 0.5)));
        selection.deselect("m1", "t2");
        assert!(!selection.is_at_capacity("m1", 2));
    }

    #[test]
    fn test_records_and_saved() {
        let mut selection = Selection::new();
        selection.select(&pair("m1", "t1", 0.75));
        let records = selection.to_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].score, 0.75);
        assert!(records[0].approved);

        selection.mark_saved();
        selection.refresh_status();
        assert!(selection
            .assignments()
            .all(|a| a.status == AssignmentStatus::Saved));

        selection.clear();
        assert!(selection.is_empty());
    }
}
