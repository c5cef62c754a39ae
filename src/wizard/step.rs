//! Step registry — the ordered list of wizard steps.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WizardError;

/// Identifier of a wizard step.
///
/// The standard order is: Citizenship → Education → Goals → Language →
/// Tests → Priorities → Financial → Programs → Complete.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Citizenship,
    Education,
    Goals,
    Language,
    Tests,
    Priorities,
    Financial,
    Programs,
    Complete,
}

impl StepId {
    /// Every step, in standard order.
    pub const ALL: [StepId; 9] = [
        StepId::Citizenship,
        StepId::Education,
        StepId::Goals,
        StepId::Language,
        StepId::Tests,
        StepId::Priorities,
        StepId::Financial,
        StepId::Programs,
        StepId::Complete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Citizenship => "citizenship",
            Self::Education => "education",
            Self::Goals => "goals",
            Self::Language => "language",
            Self::Tests => "tests",
            Self::Priorities => "priorities",
            Self::Financial => "financial",
            Self::Programs => "programs",
            Self::Complete => "complete",
        }
    }

    /// Whether this step ends the wizard.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StepId {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| WizardError::UnknownStep(s.to_string()))
    }
}

/// A named stage of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Step {
    pub id: StepId,
    pub title: &'static str,
    /// Icon name understood by the dashboard front end.
    pub icon: &'static str,
}

impl Step {
    pub const fn new(id: StepId, title: &'static str, icon: &'static str) -> Self {
        Self { id, title, icon }
    }
}

const STANDARD_STEPS: [Step; 9] = [
    Step::new(StepId::Citizenship, "Citizenship", "globe"),
    Step::new(StepId::Education, "Education", "graduation-cap"),
    Step::new(StepId::Goals, "Study Goals", "target"),
    Step::new(StepId::Language, "Language", "languages"),
    Step::new(StepId::Tests, "Test Scores", "file-check"),
    Step::new(StepId::Priorities, "Priorities", "list-ordered"),
    Step::new(StepId::Financial, "Financial", "wallet"),
    Step::new(StepId::Programs, "Programs", "school"),
    Step::new(StepId::Complete, "Complete", "circle-check"),
];

/// Ordered, immutable list of steps.
///
/// Always ends with [`StepId::Complete`] and holds each step at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StepRegistry {
    steps: Vec<Step>,
}

impl StepRegistry {
    /// The nine-step profile wizard.
    pub fn standard() -> Self {
        Self {
            steps: STANDARD_STEPS.to_vec(),
        }
    }

    /// Build a custom registry.
    pub fn new(steps: Vec<Step>) -> Result<Self, WizardError> {
        if steps.len() < 2 {
            return Err(WizardError::InvalidRegistry(
                "at least one data step must precede complete".to_string(),
            ));
        }
        for (i, step) in steps.iter().enumerate() {
            if steps[..i].iter().any(|s| s.id == step.id) {
                return Err(WizardError::InvalidRegistry(format!(
                    "step {} appears more than once",
                    step.id
                )));
            }
        }
        if steps.last().map(|s| s.id) != Some(StepId::Complete) {
            return Err(WizardError::InvalidRegistry(
                "the last step must be complete".to_string(),
            ));
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn first(&self) -> StepId {
        self.steps[0].id
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Look up a step's metadata, failing loudly if it is not registered.
    pub fn step(&self, id: StepId) -> Result<&Step, WizardError> {
        self.steps
            .iter()
            .find(|s| s.id == id)
            .ok_or(WizardError::StepNotRegistered(id))
    }

    pub fn index_of(&self, id: StepId) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    pub fn contains(&self, id: StepId) -> bool {
        self.index_of(id).is_some()
    }

    /// The step after `id`, if any.
    pub fn next(&self, id: StepId) -> Option<StepId> {
        let index = self.index_of(id)?;
        self.steps.get(index + 1).map(|s| s.id)
    }

    /// The step before `id`, if any.
    pub fn previous(&self, id: StepId) -> Option<StepId> {
        let index = self.index_of(id)?;
        index.checked_sub(1).map(|i| self.steps[i].id)
    }

    /// Index of the entry just before the terminal step.
    pub fn second_to_last_index(&self) -> usize {
        self.steps.len() - 2
    }

    /// Completion percentage for the step at `index`, clamped to 0..=100.
    pub fn progress_at(&self, index: usize) -> u8 {
        let last = self.steps.len().saturating_sub(1);
        if last == 0 {
            return 100;
        }
        let pct = (index as f64 / last as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_order() {
        let registry = StepRegistry::standard();
        let ids: Vec<StepId> = registry.steps().iter().map(|s| s.id).collect();
        assert_eq!(ids, StepId::ALL.to_vec());
        assert_eq!(registry.first(), StepId::Citizenship);
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn next_walks_all_steps() {
        let registry = StepRegistry::standard();
        let mut current = registry.first();
        let mut visited = vec![current];
        while let Some(next) = registry.next(current) {
            visited.push(next);
            current = next;
        }
        assert_eq!(visited, StepId::ALL.to_vec());
        assert!(current.is_terminal());
    }

    #[test]
    fn previous_stops_at_first() {
        let registry = StepRegistry::standard();
        assert_eq!(registry.previous(StepId::Citizenship), None);
        assert_eq!(
            registry.previous(StepId::Education),
            Some(StepId::Citizenship)
        );
        assert_eq!(registry.previous(StepId::Complete), Some(StepId::Programs));
    }

    #[test]
    fn progress_bounds_and_monotonic() {
        let registry = StepRegistry::standard();
        assert_eq!(registry.progress_at(0), 0);
        assert_eq!(registry.progress_at(8), 100);
        assert_eq!(registry.progress_at(4), 50);
        assert_eq!(registry.progress_at(1), 13);
        assert_eq!(registry.progress_at(40), 100, "Out-of-range index clamps");

        let mut last = 0;
        for i in 0..registry.len() {
            let p = registry.progress_at(i);
            assert!(p >= last, "progress must not decrease at index {i}");
            last = p;
        }
    }

    #[test]
    fn second_to_last_is_programs() {
        let registry = StepRegistry::standard();
        let index = registry.second_to_last_index();
        assert_eq!(registry.get(index).map(|s| s.id), Some(StepId::Programs));
    }

    #[test]
    fn display_matches_serde() {
        for id in StepId::ALL {
            let display = format!("{id}");
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(format!("\"{display}\""), json, "mismatch for {id:?}");
        }
    }

    #[test]
    fn parse_known_and_unknown() {
        assert_eq!("tests".parse::<StepId>().unwrap(), StepId::Tests);
        assert_eq!(
            "funding".parse::<StepId>(),
            Err(WizardError::UnknownStep("funding".to_string()))
        );
        // Case matters: ids are wire identifiers, not titles.
        assert!("Citizenship".parse::<StepId>().is_err());
    }

    #[test]
    fn custom_registry_validation() {
        let ok = StepRegistry::new(vec![
            Step::new(StepId::Citizenship, "Citizenship", "globe"),
            Step::new(StepId::Programs, "Programs", "school"),
            Step::new(StepId::Complete, "Done", "circle-check"),
        ])
        .unwrap();
        assert_eq!(ok.next(StepId::Citizenship), Some(StepId::Programs));
        assert!(!ok.contains(StepId::Education));

        let no_terminal = StepRegistry::new(vec![
            Step::new(StepId::Citizenship, "Citizenship", "globe"),
            Step::new(StepId::Education, "Education", "graduation-cap"),
        ]);
        assert!(matches!(no_terminal, Err(WizardError::InvalidRegistry(_))));

        let duplicate = StepRegistry::new(vec![
            Step::new(StepId::Goals, "Goals", "target"),
            Step::new(StepId::Goals, "Goals again", "target"),
            Step::new(StepId::Complete, "Done", "circle-check"),
        ]);
        assert!(matches!(duplicate, Err(WizardError::InvalidRegistry(_))));

        let only_terminal =
            StepRegistry::new(vec![Step::new(StepId::Complete, "Done", "circle-check")]);
        assert!(only_terminal.is_err());
    }

    #[test]
    fn step_lookup_fails_loudly() {
        let registry = StepRegistry::new(vec![
            Step::new(StepId::Citizenship, "Citizenship", "globe"),
            Step::new(StepId::Complete, "Done", "circle-check"),
        ])
        .unwrap();
        assert_eq!(
            registry.step(StepId::Financial),
            Err(WizardError::StepNotRegistered(StepId::Financial))
        );
        assert_eq!(registry.step(StepId::Complete).unwrap().title, "Done");
    }
}
