//! WizardController — owns the current step and the accumulated record.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::WizardError;

use super::model::{StepInput, WizardRecord};
use super::step::{StepId, StepRegistry};

/// Where the wizard hands control when it exits.
pub trait Navigator: Send + Sync {
    /// The terminal step's continue action fired with the completed record.
    fn finish(&self, record: &WizardRecord);

    /// The user chose to skip the wizard entirely.
    fn skip(&self);
}

/// Receives progress updates from the controller.
///
/// A move is always reported before the notice it triggers.
pub trait Notifier: Send + Sync {
    /// The current step changed, in either direction.
    fn moved(&self, from: StepId, to: StepId, progress: u8);

    /// The one-off notice shown when the user reaches the last data step.
    fn notify(&self, notice: &Notice);
}

/// Transitional message emitted on reaching the second-to-last step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub step: StepId,
    pub message: String,
}

/// Outcome of one `advance` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved { from: StepId, to: StepId },
    /// Nothing changed (back at the first step, or input not for this step).
    Stayed { step: StepId },
    /// The terminal step's continue action fired; the wizard has exited.
    Finished,
    /// The wizard had already exited.
    Ignored,
}

/// Point-in-time copy of the controller's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardSnapshot {
    pub current: StepId,
    pub progress: u8,
    pub record: WizardRecord,
    pub exited: bool,
}

/// The wizard state machine.
///
/// States are the registry's steps; `Submit` moves forward, `Back` moves
/// backward unconditionally, and `Continue` on the terminal step exits.
/// No operation fails: validation happens in the forms before `advance` is
/// called.
pub struct WizardController {
    registry: StepRegistry,
    current: usize,
    record: WizardRecord,
    exited: bool,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
}

impl WizardController {
    pub fn new(
        registry: StepRegistry,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            current: 0,
            record: WizardRecord::new(),
            exited: false,
            navigator,
            notifier,
        }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn current(&self) -> StepId {
        self.registry.steps()[self.current].id
    }

    pub fn record(&self) -> &WizardRecord {
        &self.record
    }

    pub fn is_exited(&self) -> bool {
        self.exited
    }

    pub fn progress(&self) -> u8 {
        self.registry.progress_at(self.current)
    }

    pub fn state(&self) -> WizardSnapshot {
        WizardSnapshot {
            current: self.current(),
            progress: self.progress(),
            record: self.record.clone(),
            exited: self.exited,
        }
    }

    /// Apply one step input.
    pub fn advance(&mut self, input: StepInput) -> Transition {
        if self.exited {
            warn!("Wizard already exited, ignoring input");
            return Transition::Ignored;
        }

        let from = self.current();
        match input {
            StepInput::Back => {
                if self.current == 0 {
                    return Transition::Stayed { step: from };
                }
                self.current -= 1;
                let to = self.current();
                debug!(from = %from, to = %to, "Wizard stepped back");
                self.notifier.moved(from, to, self.progress());
                Transition::Moved { from, to }
            }
            _ if from.is_terminal() => {
                self.exited = true;
                info!(steps = self.record.len(), "Wizard finished");
                self.navigator.finish(&self.record);
                Transition::Finished
            }
            StepInput::Continue => {
                warn!(step = %from, "Continue is only valid on the terminal step");
                Transition::Stayed { step: from }
            }
            StepInput::Submit(payload) => {
                if payload.step() != from {
                    warn!(
                        step = %from,
                        payload = %payload.step(),
                        "Payload does not belong to the current step"
                    );
                    return Transition::Stayed { step: from };
                }
                self.record.insert(payload);
                self.current += 1;
                let to = self.current();
                info!(from = %from, to = %to, progress = self.progress(), "Wizard advanced");
                self.notifier.moved(from, to, self.progress());

                if self.current == self.registry.second_to_last_index() {
                    self.notifier.notify(&Notice {
                        step: to,
                        message: "Almost done! One more step to complete your profile."
                            .to_string(),
                    });
                }
                Transition::Moved { from, to }
            }
        }
    }

    pub fn retreat(&mut self) -> Transition {
        self.advance(StepInput::Back)
    }

    /// Hand control to the navigator without touching wizard state.
    pub fn skip(&self) {
        info!(step = %self.current(), "Wizard skipped");
        self.navigator.skip();
    }

    /// Discard the record and start over from the first step.
    pub fn reset(&mut self) {
        self.current = 0;
        self.record.clear();
        self.exited = false;
    }

    /// Resume a session at `current` with a previously accumulated record.
    pub fn resume(&mut self, current: StepId, record: WizardRecord) -> Result<(), WizardError> {
        let index = self
            .registry
            .index_of(current)
            .ok_or(WizardError::StepNotRegistered(current))?;
        if let Some(stray) = record.steps().find(|s| !self.registry.contains(*s)) {
            return Err(WizardError::StepNotRegistered(stray));
        }
        self.current = index;
        self.record = record;
        self.exited = false;
        Ok(())
    }

    /// Restore from a snapshot, including the exited flag.
    pub fn restore(&mut self, snapshot: WizardSnapshot) -> Result<(), WizardError> {
        self.resume(snapshot.current, snapshot.record)?;
        self.exited = snapshot.exited;
        Ok(())
    }
}
