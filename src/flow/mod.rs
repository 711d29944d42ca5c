//! Flow execution.
//!
//! A [`Flow`] is an ordered list of template names. Running a flow sends
//! each template in turn; values captured by one step are written into the
//! variable store before the next step resolves its variables, and cookies
//! set by one step are sent by the following ones.
//!
//! Every step is validated before anything is sent. Once sending starts, the
//! first failure aborts the flow; the effects of earlier steps are kept.

use crate::cookies::CookieJar;
use crate::environment::{StoreError, VariableStore};
use crate::executor::{send_template, ExecutionConfig, SendError};
use crate::history::HistoryError;
use crate::models::{Named, NamedSet, RequestTemplate, SendResult};
use crate::storage::StorageError;
use crate::variables::{canonical_name, VariableSet};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named sequence of template sends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    /// Template names, in execution order.
    #[serde(default)]
    pub steps: Vec<String>,
}

impl Flow {
    pub fn new(name: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }
}

impl Named for Flow {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Errors raised while running flows and template sends.
///
/// Step indexes are zero-based; messages show them one-based.
#[derive(Debug)]
pub enum FlowError {
    /// No flow with this name.
    UnknownFlow(String),

    /// No template with this name.
    UnknownTemplate(String),

    /// The template lacks a method or URL.
    TemplateNotSendable(String),

    /// A step failed validation; nothing was sent.
    InvalidFlowStep {
        index: usize,
        template: String,
        reason: String,
    },

    /// A step was sent and failed; later steps were not sent.
    StepFailed {
        index: usize,
        template: String,
        source: SendError,
    },

    /// A standalone template send failed.
    Send { template: String, source: SendError },

    /// Writing a captured value into the store failed.
    Store(StoreError),

    /// Flushing project or session state failed.
    Persist(StorageError),

    /// Recording history failed.
    History(HistoryError),
}

impl FlowError {
    /// The send error behind this failure, if a send was attempted.
    pub fn send_error(&self) -> Option<&SendError> {
        match self {
            FlowError::StepFailed { source, .. } | FlowError::Send { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::UnknownFlow(name) => write!(f, "Unknown flow: {}", name),
            FlowError::UnknownTemplate(name) => write!(f, "Unknown template: {}", name),
            FlowError::TemplateNotSendable(name) => {
                write!(f, "Template '{}' needs a method and a URL before it can be sent", name)
            }
            FlowError::InvalidFlowStep {
                index,
                template,
                reason,
            } => write!(f, "Step {} ({}) is invalid: {}", index + 1, template, reason),
            FlowError::StepFailed {
                index,
                template,
                source,
            } => write!(f, "Step {} ({}) failed: {}", index + 1, template, source),
            FlowError::Send { template, source } => write!(f, "{}: {}", template, source),
            FlowError::Store(err) => write!(f, "{}", err),
            FlowError::Persist(err) => write!(f, "{}", err),
            FlowError::History(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for FlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlowError::StepFailed { source, .. } | FlowError::Send { source, .. } => Some(source),
            FlowError::Store(err) => Some(err),
            FlowError::Persist(err) => Some(err),
            FlowError::History(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for FlowError {
    fn from(err: StoreError) -> Self {
        FlowError::Store(err)
    }
}

impl From<StorageError> for FlowError {
    fn from(err: StorageError) -> Self {
        FlowError::Persist(err)
    }
}

impl From<HistoryError> for FlowError {
    fn from(err: HistoryError) -> Self {
        FlowError::History(err)
    }
}

/// A send that completed, as reported to a [`StepObserver`].
///
/// `store` and `jar` already include this send's captures and cookies.
pub struct CompletedStep<'a> {
    /// Flow the send belongs to; `None` for a standalone template send.
    pub flow: Option<&'a str>,
    /// Position within the flow (zero for standalone sends).
    pub index: usize,
    pub template: &'a RequestTemplate,
    pub result: &'a SendResult,
    pub store: &'a VariableStore,
    pub jar: &'a CookieJar,
}

/// Receives each completed send so callers can print and persist per step.
pub trait StepObserver {
    fn step_completed(&mut self, step: &CompletedStep<'_>) -> Result<(), FlowError>;

    /// Called when a send fails. The default does nothing.
    fn step_failed(
        &mut self,
        _flow: Option<&str>,
        _template: &RequestTemplate,
        _error: &SendError,
    ) -> Result<(), FlowError> {
        Ok(())
    }
}

impl<F> StepObserver for F
where
    F: FnMut(&CompletedStep<'_>) -> Result<(), FlowError>,
{
    fn step_completed(&mut self, step: &CompletedStep<'_>) -> Result<(), FlowError> {
        self(step)
    }
}

/// Executes templates and flows against a variable store and cookie jar.
pub struct FlowRunner<'a> {
    store: &'a mut VariableStore,
    jar: &'a mut CookieJar,
    config: &'a ExecutionConfig,
    prefix: &'a str,
}

impl<'a> FlowRunner<'a> {
    pub fn new(
        store: &'a mut VariableStore,
        jar: &'a mut CookieJar,
        config: &'a ExecutionConfig,
        prefix: &'a str,
    ) -> Self {
        Self {
            store,
            jar,
            config,
            prefix,
        }
    }

    /// Runs every step of `flow` in order.
    ///
    /// # Arguments
    ///
    /// * `flow` - The flow to run
    /// * `templates` - Templates the steps refer to
    /// * `overrides` - Values that take precedence over the store. A value
    ///   captured by a step is removed from here so later steps see it.
    /// * `observer` - Notified after every step
    ///
    /// # Returns
    ///
    /// The result of every step, or the first error.
    pub fn execute_flow(
        &mut self,
        flow: &Flow,
        templates: &NamedSet<RequestTemplate>,
        overrides: &mut VariableSet,
        observer: &mut dyn StepObserver,
    ) -> Result<Vec<SendResult>, FlowError> {
        let steps = validate_steps(flow, templates)?;
        let mut results = Vec::with_capacity(steps.len());

        for (index, template) in steps.into_iter().enumerate() {
            info!(
                "Flow {}: step {}/{} {}",
                flow.name,
                index + 1,
                flow.steps.len(),
                template.name
            );
            match self.send_step(Some(&flow.name), index, template, overrides, observer) {
                Ok(result) => results.push(result),
                Err(FlowError::Send { template, source }) => {
                    return Err(FlowError::StepFailed {
                        index,
                        template,
                        source,
                    })
                }
                Err(err) => return Err(err),
            }
        }

        Ok(results)
    }

    /// Sends a single template by name.
    ///
    /// If the template names an auth flow, that flow runs first with the
    /// same overrides.
    pub fn send_template(
        &mut self,
        name: &str,
        templates: &NamedSet<RequestTemplate>,
        flows: &NamedSet<Flow>,
        overrides: &mut VariableSet,
        observer: &mut dyn StepObserver,
    ) -> Result<SendResult, FlowError> {
        let template = templates
            .get(name)
            .ok_or_else(|| FlowError::UnknownTemplate(name.to_string()))?;
        if !template.is_sendable() {
            return Err(FlowError::TemplateNotSendable(template.name.clone()));
        }

        if let Some(auth_flow) = &template.auth_flow {
            let flow = flows
                .get(auth_flow)
                .ok_or_else(|| FlowError::UnknownFlow(auth_flow.clone()))?;
            info!("Running auth flow {} for {}", flow.name, template.name);
            self.execute_flow(flow, templates, overrides, observer)?;
        }

        self.send_step(None, 0, template, overrides, observer)
    }

    fn send_step(
        &mut self,
        flow: Option<&str>,
        index: usize,
        template: &RequestTemplate,
        overrides: &mut VariableSet,
        observer: &mut dyn StepObserver,
    ) -> Result<SendResult, FlowError> {
        let variables = self.store.merged_set(overrides);
        let result = match send_template(template, variables, self.prefix, self.jar, self.config) {
            Ok(result) => result,
            Err(source) => {
                if let Err(err) = observer.step_failed(flow, template, &source) {
                    warn!("Could not record failed send of {}: {}", template.name, err);
                }
                return Err(FlowError::Send {
                    template: template.name.clone(),
                    source,
                });
            }
        };

        for (name, value) in &result.captured {
            overrides.retain(|key, _| canonical_name(key) != *name);
            self.store.set(name, value.clone())?;
        }

        observer.step_completed(&CompletedStep {
            flow,
            index,
            template,
            result: &result,
            store: &*self.store,
            jar: &*self.jar,
        })?;

        Ok(result)
    }
}

/// Names that `steps` reference but neither `available` nor the captures of
/// an earlier step will supply, in order of first use.
pub fn missing_variables<'t>(
    steps: impl IntoIterator<Item = &'t RequestTemplate>,
    available: &VariableSet,
    prefix: &str,
) -> Vec<String> {
    let mut captured: Vec<String> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    for template in steps {
        for name in template.referenced_variables(prefix) {
            if !available.contains_key(&name) && !captured.contains(&name) && !missing.contains(&name) {
                missing.push(name);
            }
        }
        captured.extend(template.captures.iter().map(|scraper| canonical_name(&scraper.var_name)));
    }
    missing
}

/// Checks every step before anything is sent.
fn validate_steps<'t>(
    flow: &Flow,
    templates: &'t NamedSet<RequestTemplate>,
) -> Result<Vec<&'t RequestTemplate>, FlowError> {
    flow.steps
        .iter()
        .enumerate()
        .map(|(index, name)| match templates.get(name) {
            Some(template) if template.is_sendable() => Ok(template),
            Some(_) => Err(FlowError::InvalidFlowStep {
                index,
                template: name.clone(),
                reason: "template needs a method and a URL".to_string(),
            }),
            None => Err(FlowError::InvalidFlowStep {
                index,
                template: name.clone(),
                reason: "no such template".to_string(),
            }),
        })
        .collect()
}
