//! Field descriptors and the shared required-fields validator.
//!
//! Every data step describes its form as a static list of
//! [`FieldDescriptor`]s. One validator walks that list, so the per-step forms
//! differ only in their descriptors and in how validated values become a
//! typed [`StepPayload`].

use std::collections::BTreeMap;
use std::num::IntErrorKind;

use serde::Serialize;

use super::model::{
    CitizenshipInfo, EducationInfo, FinancialInfo, LanguageInfo, ProgramSelection, StepPayload,
    StudyGoals, StudyPriorities, TestScores,
};
use super::step::StepId;

/// Raw field values as typed by the user, keyed by field name.
pub type FieldValues = BTreeMap<String, String>;

/// What kind of input a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "options", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    /// One of a fixed set of options (case-insensitive match).
    Choice(&'static [&'static str]),
    /// A non-negative whole number.
    Count,
}

/// Static description of one form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Shown under the field when a required value is missing.
    #[serde(skip)]
    pub missing_message: &'static str,
}

impl FieldDescriptor {
    pub const fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Text,
            required: false,
            missing_message: "",
        }
    }

    pub const fn choice(
        name: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self {
            kind: FieldKind::Choice(options),
            ..Self::text(name, label)
        }
    }

    pub const fn count(name: &'static str, label: &'static str) -> Self {
        Self {
            kind: FieldKind::Count,
            ..Self::text(name, label)
        }
    }

    /// Mark the field required, with the message shown when it is left empty.
    pub const fn required(self, missing_message: &'static str) -> Self {
        Self {
            required: true,
            missing_message,
            ..self
        }
    }

    /// Check one value against this descriptor.
    fn check(&self, raw: &str) -> Result<(), String> {
        let value = raw.trim();
        if value.is_empty() {
            return if self.required {
                Err(self.missing_message.to_string())
            } else {
                Ok(())
            };
        }
        match self.kind {
            FieldKind::Text => Ok(()),
            FieldKind::Choice(options) => {
                if options.iter().any(|o| o.eq_ignore_ascii_case(value)) {
                    Ok(())
                } else {
                    Err(format!("{} must be one of: {}", self.label, options.join(", ")))
                }
            }
            FieldKind::Count => value.parse::<u32>().map(|_| ()).map_err(|e| match e.kind() {
                IntErrorKind::PosOverflow => {
                    format!("{} must be at most {}", self.label, u32::MAX)
                }
                _ => format!("{} must be a whole number", self.label),
            }),
        }
    }
}

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Validate `values` against `fields`. An empty result means valid.
pub fn validate(fields: &[FieldDescriptor], values: &FieldValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for field in fields {
        let raw = values.get(field.name).map(String::as_str).unwrap_or("");
        if let Err(message) = field.check(raw) {
            errors.insert(field.name, message);
        }
    }
    errors
}

const DEGREES: &[&str] = &["high_school", "associate", "bachelor", "master", "doctorate"];
const LANGUAGE_TESTS: &[&str] = &["ielts", "toefl", "duolingo", "pte", "none"];
const EXAMS: &[&str] = &["gre", "gmat", "sat", "act", "none"];
const PRIORITIES: &[&str] = &["ranking", "cost", "location", "career_outcomes", "research"];
const CAMPUS_SETTINGS: &[&str] = &["urban", "suburban", "rural"];
const FUNDING_SOURCES: &[&str] = &["self", "family", "loan", "scholarship", "employer"];
const YES_NO: &[&str] = &["yes", "no"];

const CITIZENSHIP_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::text("country", "Country of citizenship")
        .required("Please select your country of citizenship"),
    FieldDescriptor::text("residence", "Country of residence")
        .required("Please select where you currently live"),
];

const EDUCATION_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::choice("degree", "Highest degree", DEGREES)
        .required("Please select your highest degree"),
    FieldDescriptor::text("university", "University").required("Please enter your university"),
    FieldDescriptor::text("major", "Major").required("Please enter your major"),
    FieldDescriptor::text("gpa", "GPA").required("Please enter your GPA"),
];

const GOALS_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::choice("target_degree", "Target degree", DEGREES)
        .required("Please select the degree you are applying for"),
    FieldDescriptor::text("field_of_study", "Field of study")
        .required("Please enter your intended field of study"),
    FieldDescriptor::text("intake", "Intake term").required("Please choose an intake term"),
    FieldDescriptor::text("preferred_countries", "Preferred countries"),
];

const LANGUAGE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::choice("test", "English test", LANGUAGE_TESTS)
        .required("Please select an English test, or none"),
    FieldDescriptor::text("score", "Overall score"),
    FieldDescriptor::text("native_language", "Native language"),
];

const TESTS_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::choice("exam", "Admissions exam", EXAMS)
        .required("Please select an exam, or none"),
    FieldDescriptor::text("score", "Score"),
    FieldDescriptor::text("test_date", "Test date"),
];

const PRIORITIES_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::choice("top_priority", "Top priority", PRIORITIES)
        .required("Please pick what matters most to you"),
    FieldDescriptor::text("preferred_location", "Preferred location"),
    FieldDescriptor::choice("campus_setting", "Campus setting", CAMPUS_SETTINGS),
];

const FINANCIAL_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::text("budget", "Annual budget").required("Please enter your budget"),
    FieldDescriptor::choice("funding_source", "Funding source", FUNDING_SOURCES)
        .required("Please select how you will fund your studies"),
    FieldDescriptor::choice("scholarship_interest", "Interested in scholarships", YES_NO)
        .required("Please tell us if you want scholarship matches"),
];

const PROGRAMS_FIELDS: &[FieldDescriptor] = &[FieldDescriptor::count(
    "program_count",
    "Number of programs",
)
.required("Please enter how many programs you plan to apply to")];

/// The field list for a step. The terminal step collects nothing.
pub fn descriptors(step: StepId) -> &'static [FieldDescriptor] {
    match step {
        StepId::Citizenship => CITIZENSHIP_FIELDS,
        StepId::Education => EDUCATION_FIELDS,
        StepId::Goals => GOALS_FIELDS,
        StepId::Language => LANGUAGE_FIELDS,
        StepId::Tests => TESTS_FIELDS,
        StepId::Priorities => PRIORITIES_FIELDS,
        StepId::Financial => FINANCIAL_FIELDS,
        StepId::Programs => PROGRAMS_FIELDS,
        StepId::Complete => &[],
    }
}

/// Build a typed payload from values that already passed [`validate`].
///
/// Returns `Ok(None)` for the terminal step, which has no payload.
pub fn build_payload(step: StepId, values: &FieldValues) -> Result<Option<StepPayload>, FieldErrors> {
    let text = |name: &str| {
        values
            .get(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };
    let optional = |name: &str| Some(text(name)).filter(|v| !v.is_empty());
    // Choice values are stored in their canonical lowercase form.
    let choice = |name: &str| text(name).to_ascii_lowercase();

    let payload = match step {
        StepId::Citizenship => StepPayload::Citizenship(CitizenshipInfo {
            country: text("country"),
            residence: text("residence"),
        }),
        StepId::Education => StepPayload::Education(EducationInfo {
            degree: choice("degree"),
            university: text("university"),
            major: text("major"),
            gpa: text("gpa"),
        }),
        StepId::Goals => StepPayload::Goals(StudyGoals {
            target_degree: choice("target_degree"),
            field_of_study: text("field_of_study"),
            intake: text("intake"),
            preferred_countries: text("preferred_countries")
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect(),
        }),
        StepId::Language => StepPayload::Language(LanguageInfo {
            test: choice("test"),
            score: optional("score"),
            native_language: optional("native_language"),
        }),
        StepId::Tests => StepPayload::Tests(TestScores {
            exam: choice("exam"),
            score: optional("score"),
            test_date: optional("test_date"),
        }),
        StepId::Priorities => StepPayload::Priorities(StudyPriorities {
            top_priority: choice("top_priority"),
            preferred_location: optional("preferred_location"),
            campus_setting: optional("campus_setting").map(|s| s.to_ascii_lowercase()),
        }),
        StepId::Financial => StepPayload::Financial(FinancialInfo {
            budget: text("budget"),
            funding_source: choice("funding_source"),
            scholarship_interest: choice("scholarship_interest") == "yes",
        }),
        StepId::Programs => {
            let program_count = text("program_count").parse::<u32>().map_err(|_| {
                let mut errors = FieldErrors::new();
                errors.insert("program_count", "Number of programs must be a whole number");
                errors
            })?;
            StepPayload::Programs(ProgramSelection { program_count })
        }
        StepId::Complete => return Ok(None),
    };
    Ok(Some(payload))
}

/// Flatten a committed payload back into form values, for revisiting a step.
pub fn payload_values(payload: &StepPayload) -> FieldValues {
    let mut values = FieldValues::new();
    let mut put = |name: &str, value: &str| {
        values.insert(name.to_string(), value.to_string());
    };
    match payload {
        StepPayload::Citizenship(p) => {
            put("country", &p.country);
            put("residence", &p.residence);
        }
        StepPayload::Education(p) => {
            put("degree", &p.degree);
            put("university", &p.university);
            put("major", &p.major);
            put("gpa", &p.gpa);
        }
        StepPayload::Goals(p) => {
            put("target_degree", &p.target_degree);
            put("field_of_study", &p.field_of_study);
            put("intake", &p.intake);
            put("preferred_countries", &p.preferred_countries.join(", "));
        }
        StepPayload::Language(p) => {
            put("test", &p.test);
            put("score", p.score.as_deref().unwrap_or_default());
            put("native_language", p.native_language.as_deref().unwrap_or_default());
        }
        StepPayload::Tests(p) => {
            put("exam", &p.exam);
            put("score", p.score.as_deref().unwrap_or_default());
            put("test_date", p.test_date.as_deref().unwrap_or_default());
        }
        StepPayload::Priorities(p) => {
            put("top_priority", &p.top_priority);
            put(
                "preferred_location",
                p.preferred_location.as_deref().unwrap_or_default(),
            );
            put("campus_setting", p.campus_setting.as_deref().unwrap_or_default());
        }
        StepPayload::Financial(p) => {
            put("budget", &p.budget);
            put("funding_source", &p.funding_source);
            put(
                "scholarship_interest",
                if p.scholarship_interest { "yes" } else { "no" },
            );
        }
        StepPayload::Programs(p) => {
            put("program_count", &p.program_count.to_string());
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn every_data_step_has_fields() {
        for step in StepId::ALL {
            let fields = descriptors(step);
            if step.is_terminal() {
                assert!(fields.is_empty());
            } else {
                assert!(!fields.is_empty(), "{step} has no fields");
                assert!(
                    fields.iter().any(|f| f.required),
                    "{step} should require at least one field"
                );
            }
        }
    }

    #[test]
    fn required_fields_report_custom_messages() {
        let errors = validate(
            descriptors(StepId::Education),
            &values(&[("degree", "bachelor"), ("university", "   "), ("major", "Physics")]),
        );
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("university"), Some("Please enter your university"));
        assert_eq!(errors.get("gpa"), Some("Please enter your GPA"));
        assert!(!errors.contains("degree"));
    }

    #[test]
    fn optional_fields_may_be_blank() {
        let errors = validate(
            descriptors(StepId::Language),
            &values(&[("test", "none")]),
        );
        assert!(errors.is_empty(), "unexpected errors: {errors}");
    }

    #[test]
    fn choice_is_case_insensitive_but_closed() {
        let fields = descriptors(StepId::Tests);
        assert!(validate(fields, &values(&[("exam", "GRE")])).is_empty());

        let errors = validate(fields, &values(&[("exam", "lsat")]));
        assert!(errors.get("exam").unwrap().contains("gre, gmat"));
    }

    #[test]
    fn count_must_be_whole_number() {
        let fields = descriptors(StepId::Programs);
        assert!(validate(fields, &values(&[("program_count", "5")])).is_empty());
        let errors = validate(fields, &values(&[("program_count", "five")]));
        assert_eq!(
            errors.get("program_count"),
            Some("Number of programs must be a whole number")
        );
        let errors = validate(fields, &values(&[("program_count", "-2")]));
        assert!(errors.contains("program_count"));
    }

    #[test]
    fn count_overflow_reports_range() {
        let errors = validate(
            descriptors(StepId::Programs),
            &values(&[("program_count", "99999999999")]),
        );
        assert_eq!(
            errors.get("program_count"),
            Some("Number of programs must be at most 4294967295")
        );
    }

    #[test]
    fn build_payload_normalizes_values() {
        let payload = build_payload(
            StepId::Goals,
            &values(&[
                ("target_degree", "Master"),
                ("field_of_study", " Data Science "),
                ("intake", "Fall 2026"),
                ("preferred_countries", "Canada, Germany,, Netherlands"),
            ]),
        )
        .unwrap()
        .unwrap();
        match payload {
            StepPayload::Goals(goals) => {
                assert_eq!(goals.target_degree, "master");
                assert_eq!(goals.field_of_study, "Data Science");
                assert_eq!(
                    goals.preferred_countries,
                    vec!["Canada", "Germany", "Netherlands"]
                );
            }
            other => panic!("expected goals payload, got {other:?}"),
        }
    }

    #[test]
    fn build_payload_terminal_is_none() {
        assert_eq!(build_payload(StepId::Complete, &FieldValues::new()), Ok(None));
    }

    #[test]
    fn payload_values_feed_back_into_same_payload() {
        let financial = build_payload(
            StepId::Financial,
            &values(&[
                ("budget", "25000 EUR"),
                ("funding_source", "loan"),
                ("scholarship_interest", "Yes"),
            ]),
        )
        .unwrap()
        .unwrap();
        let flattened = payload_values(&financial);
        assert_eq!(flattened["scholarship_interest"], "yes");
        assert!(validate(descriptors(StepId::Financial), &flattened).is_empty());
        assert_eq!(
            build_payload(StepId::Financial, &flattened).unwrap(),
            Some(financial)
        );
    }

    #[test]
    fn descriptor_serializes_for_front_end() {
        let json = serde_json::to_value(descriptors(StepId::Tests)[0]).unwrap();
        assert_eq!(json["name"], "exam");
        assert_eq!(json["kind"]["type"], "choice");
        assert_eq!(json["kind"]["options"][0], "gre");
        assert_eq!(json["required"], true);
        assert!(json.get("missing_message").is_none());
    }
}
