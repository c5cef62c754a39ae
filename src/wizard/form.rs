//! StepForm — local field state for one step, validated before commit.

use serde::Serialize;

use crate::error::WizardError;

use super::controller::{Transition, WizardController};
use super::fields::{self, FieldDescriptor, FieldErrors, FieldKind, FieldValues};
use super::model::{StepInput, WizardRecord};
use super::step::{Step, StepId};

/// The form behind one wizard step.
///
/// Holds the values the user has typed so far plus any per-field errors
/// from the last submit attempt. Nothing reaches the controller until the
/// values validate.
#[derive(Debug, Clone)]
pub struct StepForm {
    step: StepId,
    fields: &'static [FieldDescriptor],
    values: FieldValues,
    errors: FieldErrors,
}

impl StepForm {
    /// A blank form for `step`.
    pub fn new(step: StepId) -> Self {
        Self {
            step,
            fields: fields::descriptors(step),
            values: FieldValues::new(),
            errors: FieldErrors::new(),
        }
    }

    /// A form pre-filled from whatever `record` already holds for `step`.
    pub fn seeded(step: StepId, record: &WizardRecord) -> Self {
        let mut form = Self::new(step);
        if let Some(payload) = record.get(step) {
            form.values = fields::payload_values(payload);
        }
        form
    }

    pub fn step(&self) -> StepId {
        self.step
    }

    pub fn fields(&self) -> &'static [FieldDescriptor] {
        self.fields
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    /// Errors from the last failed submit.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Update one field. Editing a field clears its error.
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> Result<(), WizardError> {
        let descriptor = self
            .fields
            .iter()
            .find(|d| d.name == field)
            .ok_or_else(|| WizardError::UnknownField {
                step: self.step,
                field: field.to_string(),
            })?;
        self.values.insert(descriptor.name.to_string(), value.into());
        self.errors.remove(field);
        Ok(())
    }

    /// Apply several field updates, stopping at the first unknown field.
    pub fn apply<I, K, V>(&mut self, updates: I) -> Result<(), WizardError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (field, value) in updates {
            self.set(field.as_ref(), value)?;
        }
        Ok(())
    }

    /// Validate the current values without touching the form's error state.
    pub fn validate(&self) -> FieldErrors {
        fields::validate(self.fields, &self.values)
    }

    /// The input this form would hand to the controller, if valid.
    pub fn input(&self) -> Result<StepInput, FieldErrors> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(match fields::build_payload(self.step, &self.values)? {
            Some(payload) => StepInput::Submit(payload),
            None => StepInput::Continue,
        })
    }

    /// Validate and, on success, advance the controller.
    ///
    /// On failure the errors are kept on the form and the controller is not
    /// touched.
    pub fn submit(
        &mut self,
        controller: &mut WizardController,
    ) -> Result<Transition, FieldErrors> {
        match self.input() {
            Ok(input) => {
                self.errors = FieldErrors::new();
                Ok(controller.advance(input))
            }
            Err(errors) => {
                tracing::debug!(step = %self.step, errors = %errors, "Step form rejected");
                self.errors = errors.clone();
                Err(errors)
            }
        }
    }

    /// Go back without validating; nothing is committed.
    pub fn back(&self, controller: &mut WizardController) -> Transition {
        controller.advance(StepInput::Back)
    }

    /// Serializable view of this form for the dashboard.
    pub fn view(&self, step: &Step) -> FormView {
        FormView {
            step: step.id,
            title: step.title,
            icon: step.icon,
            fields: self
                .fields
                .iter()
                .map(|d| FieldView {
                    name: d.name,
                    label: d.label,
                    kind: d.kind,
                    required: d.required,
                    value: self.value(d.name).unwrap_or_default().to_string(),
                    error: self.errors.get(d.name).map(String::from),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub step: StepId,
    pub title: &'static str,
    pub icon: &'static str,
    pub fields: Vec<FieldView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
