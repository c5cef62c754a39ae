//! StepRenderer — maps a step to the view that collects it.

use serde::Serialize;

use crate::error::WizardError;

use super::form::{FieldView, FormView, StepForm};
use super::model::WizardRecord;
use super::step::{StepId, StepRegistry};

/// What to show for a step.
#[derive(Debug, Clone)]
pub enum StepView {
    /// A data step's form, seeded from the record.
    Form(StepForm),
    /// The terminal step's summary; its continue action finishes the wizard.
    Complete(CompletionSummary),
}

/// Shown on the terminal step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionSummary {
    pub completed_steps: Vec<StepId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_count: Option<u32>,
}

/// Serializable page for the dashboard: step metadata plus its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepPage {
    Form {
        progress: u8,
        step: StepId,
        title: &'static str,
        icon: &'static str,
        fields: Vec<FieldView>,
    },
    Complete {
        progress: u8,
        step: StepId,
        title: &'static str,
        icon: &'static str,
        summary: CompletionSummary,
    },
}

/// Stateless dispatch from step id to view.
///
/// Lookups outside the active registry fail with a [`WizardError`] rather
/// than falling back to another step.
pub struct StepRenderer<'a> {
    registry: &'a StepRegistry,
}

impl<'a> StepRenderer<'a> {
    pub fn new(registry: &'a StepRegistry) -> Self {
        Self { registry }
    }

    pub fn render(&self, step: StepId, record: &WizardRecord) -> Result<StepView, WizardError> {
        if !self.registry.contains(step) {
            return Err(WizardError::StepNotRegistered(step));
        }
        Ok(match step {
            StepId::Complete => StepView::Complete(CompletionSummary {
                completed_steps: self
                    .registry
                    .steps()
                    .iter()
                    .map(|s| s.id)
                    .filter(|id| record.contains(*id))
                    .collect(),
                program_count: record.program_count(),
            }),
            StepId::Citizenship
            | StepId::Education
            | StepId::Goals
            | StepId::Language
            | StepId::Tests
            | StepId::Priorities
            | StepId::Financial
            | StepId::Programs => StepView::Form(StepForm::seeded(step, record)),
        })
    }

    /// Render `step` as a serializable page.
    pub fn page(&self, step: StepId, record: &WizardRecord) -> Result<StepPage, WizardError> {
        let meta = self.registry.step(step)?;
        let progress = self
            .registry
            .index_of(step)
            .map(|i| self.registry.progress_at(i))
            .unwrap_or_default();
        Ok(match self.render(step, record)? {
            StepView::Form(form) => {
                let FormView {
                    step,
                    title,
                    icon,
                    fields,
                } = form.view(meta);
                StepPage::Form {
                    progress,
                    step,
                    title,
                    icon,
                    fields,
                }
            }
            StepView::Complete(summary) => StepPage::Complete {
                progress,
                step,
                title: meta.title,
                icon: meta.icon,
                summary,
            },
        })
    }

    /// Page for a step named by its wire id, e.g. from a URL path segment.
    pub fn page_named(&self, id: &str, record: &WizardRecord) -> Result<StepPage, WizardError> {
        self.page(id.parse()?, record)
    }
}
