//! Step payloads and the accumulated wizard record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::step::StepId;

/// Where the student holds citizenship and currently lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitizenshipInfo {
    pub country: String,
    pub residence: String,
}

/// Most recent completed degree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationInfo {
    pub degree: String,
    pub university: String,
    pub major: String,
    /// Kept as entered ("3.7", "3.7/4.0", "82%"); grading scales vary.
    pub gpa: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyGoals {
    pub target_degree: String,
    pub field_of_study: String,
    /// Intake term, e.g. "Fall 2026".
    pub intake: String,
    #[serde(default)]
    pub preferred_countries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    /// English proficiency test taken ("ielts", "toefl", ..., or "none").
    pub test: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestScores {
    /// Standardized admissions exam ("gre", "gmat", "sat", or "none").
    pub exam: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyPriorities {
    pub top_priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campus_setting: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialInfo {
    /// Annual budget as entered, currency included.
    pub budget: String,
    pub funding_source: String,
    pub scholarship_interest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSelection {
    pub program_count: u32,
}

/// Data produced by one step's form after successful validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepPayload {
    Citizenship(CitizenshipInfo),
    Education(EducationInfo),
    Goals(StudyGoals),
    Language(LanguageInfo),
    Tests(TestScores),
    Priorities(StudyPriorities),
    Financial(FinancialInfo),
    Programs(ProgramSelection),
}

impl StepPayload {
    /// The step this payload belongs to.
    pub fn step(&self) -> StepId {
        match self {
            Self::Citizenship(_) => StepId::Citizenship,
            Self::Education(_) => StepId::Education,
            Self::Goals(_) => StepId::Goals,
            Self::Language(_) => StepId::Language,
            Self::Tests(_) => StepId::Tests,
            Self::Priorities(_) => StepId::Priorities,
            Self::Financial(_) => StepId::Financial,
            Self::Programs(_) => StepId::Programs,
        }
    }
}

/// What a step hands to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepInput {
    /// Go to the previous step without committing anything.
    Back,
    /// Commit a validated payload for the current step and move on.
    Submit(StepPayload),
    /// The terminal step's continue action.
    Continue,
}

/// Cumulative mapping of step id to payload for one wizard session.
///
/// Grows as steps complete; only a full reset shrinks it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WizardRecord {
    entries: BTreeMap<StepId, StepPayload>,
}

impl<'de> Deserialize<'de> for WizardRecord {
    /// Each key must name the step its payload belongs to.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let entries = BTreeMap::<StepId, StepPayload>::deserialize(deserializer)?;
        if let Some((key, payload)) = entries.iter().find(|(k, p)| p.step() != **k) {
            return Err(serde::de::Error::custom(format!(
                "record entry {key} holds a {} payload",
                payload.step()
            )));
        }
        Ok(Self { entries })
    }
}

impl WizardRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, step: StepId) -> Option<&StepPayload> {
        self.entries.get(&step)
    }

    pub fn contains(&self, step: StepId) -> bool {
        self.entries.contains_key(&step)
    }

    /// Store a payload under its own step, replacing any earlier one.
    pub fn insert(&mut self, payload: StepPayload) -> Option<StepPayload> {
        self.entries.insert(payload.step(), payload)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Steps that have a committed payload, in registry order.
    pub fn steps(&self) -> impl Iterator<Item = StepId> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StepId, &StepPayload)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Number of programs the student chose to track, once that step is done.
    pub fn program_count(&self) -> Option<u32> {
        match self.get(StepId::Programs) {
            Some(StepPayload::Programs(p)) => Some(p.program_count),
            _ => None,
        }
    }
}
