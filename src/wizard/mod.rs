//! Profile wizard — multi-step profile completion for the dashboard.
//!
//! A fixed, ordered set of steps collects the student's citizenship,
//! education, goals, test scores, priorities and finances. The controller
//! owns the current step and the accumulated record; each step's form
//! validates its fields before anything is committed.

pub mod controller;
pub mod fields;
pub mod form;
pub mod manager;
pub mod model;
pub mod renderer;
pub mod routes;
pub mod step;

pub use controller::{Navigator, Notice, Notifier, Transition, WizardController, WizardSnapshot};
pub use fields::{FieldDescriptor, FieldErrors, FieldKind, FieldValues};
pub use form::StepForm;
pub use manager::{SubmitOutcome, WizardEvent, WizardManager, WizardStatus};
pub use model::{StepInput, StepPayload, WizardRecord};
pub use renderer::{StepPage, StepRenderer, StepView};
pub use routes::{WizardRouteState, wizard_routes};
pub use step::{Step, StepId, StepRegistry};
