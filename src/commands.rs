//! Command handlers for the REST client.
//!
//! A [`Workspace`] is an opened project together with its cookie session
//! and history log. The binary maps each subcommand onto one of its methods
//! and then saves. Sends made through a workspace persist per step: the
//! project file, the session and the history are flushed after every
//! completed send, so state written by earlier flow steps survives a later
//! failure.

use crate::config::{ClientConfig, ConfigOverrides};
use crate::cookies::{Cookie, CookieJar};
use crate::environment::{EnvSelector, StoreError};
use crate::executor::{send, ExecutionConfig, SendError, SendOptions};
use crate::flow::{missing_variables, CompletedStep, Flow, FlowError, FlowRunner, StepObserver};
use crate::history::{HistoryEntry, HistoryError, HistoryLog};
use crate::models::{NamedSet, RequestTemplate, SendResult};
use crate::project::{self, Project, ProjectView};
use crate::storage::StorageError;
use crate::variables::VariableSet;
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Error types for command execution.
#[derive(Debug)]
pub enum CommandError {
    /// `init` was asked to create a project that already exists.
    ProjectExists(PathBuf),

    /// Reading or writing the project or session failed.
    Storage(StorageError),

    /// A variable store operation failed.
    Store(StoreError),

    /// A template send or flow failed.
    Flow(FlowError),

    /// A oneoff send failed.
    Send(SendError),

    /// Reading or clearing history failed.
    History(HistoryError),

    /// No template with this name.
    UnknownTemplate(String),

    /// No flow with this name.
    UnknownFlow(String),

    /// A URL argument could not be parsed.
    InvalidUrl(String),
}

impl CommandError {
    /// The send error behind this failure, if a request was attempted.
    pub fn send_error(&self) -> Option<&SendError> {
        match self {
            CommandError::Send(err) => Some(err),
            CommandError::Flow(err) => err.send_error(),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::ProjectExists(path) => {
                write!(f, "Project already exists: {}", path.display())
            }
            CommandError::Storage(err) => write!(f, "{}", err),
            CommandError::Store(err) => write!(f, "{}", err),
            CommandError::Flow(err) => write!(f, "{}", err),
            CommandError::Send(err) => write!(f, "{}", err),
            CommandError::History(err) => write!(f, "{}", err),
            CommandError::UnknownTemplate(name) => write!(f, "Unknown template: {}", name),
            CommandError::UnknownFlow(name) => write!(f, "Unknown flow: {}", name),
            CommandError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Storage(err) => Some(err),
            CommandError::Store(err) => Some(err),
            CommandError::Flow(err) => Some(err),
            CommandError::Send(err) => Some(err),
            CommandError::History(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for CommandError {
    fn from(err: StorageError) -> Self {
        CommandError::Storage(err)
    }
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        CommandError::Store(err)
    }
}

impl From<FlowError> for CommandError {
    fn from(err: FlowError) -> Self {
        CommandError::Flow(err)
    }
}

impl From<SendError> for CommandError {
    fn from(err: SendError) -> Self {
        CommandError::Send(err)
    }
}

impl From<HistoryError> for CommandError {
    fn from(err: HistoryError) -> Self {
        CommandError::History(err)
    }
}

/// An opened project with its session and history.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    project: Project,
    jar: CookieJar,
    /// Project config with per-invocation overrides applied. Never saved.
    config: ClientConfig,
    history: HistoryLog,
}

impl Workspace {
    /// Creates a new, empty project file at `path`.
    pub fn init(path: impl Into<PathBuf>) -> Result<Self, CommandError> {
        let path = path.into();
        if path.exists() {
            return Err(CommandError::ProjectExists(path));
        }
        let project = Project::new();
        project.save(&path)?;
        debug!("Created project {}", path.display());
        Self::from_project(path, project, CookieJar::new(), &ConfigOverrides::default())
    }

    /// Opens the project at `path` and its cookie session.
    pub fn open(path: impl Into<PathBuf>, overrides: &ConfigOverrides) -> Result<Self, CommandError> {
        let path = path.into();
        let project = Project::load(&path)?;
        let jar = project::load_session(&project::session_path(&path))?;
        Self::from_project(path, project, jar, overrides)
    }

    fn from_project(
        path: PathBuf,
        project: Project,
        jar: CookieJar,
        overrides: &ConfigOverrides,
    ) -> Result<Self, CommandError> {
        let config = project.config.merge(overrides);
        config.validate().map_err(|message| StorageError::InvalidConfig {
            path: path.clone(),
            message,
        })?;
        let history = HistoryLog::from_config(project::history_path(&path), &config);
        Ok(Self {
            path,
            project,
            jar,
            config,
            history,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Mutable access for project-editing commands. Call [`Workspace::save`]
    /// afterwards.
    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    /// Effective configuration for this invocation.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Writes the project file. Per-invocation overrides are not saved.
    pub fn save(&self) -> Result<(), CommandError> {
        self.project.save(&self.path)?;
        Ok(())
    }

    pub fn save_session(&self) -> Result<(), CommandError> {
        project::save_session(&project::session_path(&self.path), &self.jar)?;
        Ok(())
    }

    /// Sends the template `name`, running its auth flow first if it has one.
    ///
    /// # Arguments
    ///
    /// * `name` - Template name (case-insensitive)
    /// * `overrides` - One-time variable values for this send
    /// * `on_step` - Called after every completed send, auth flow steps included
    pub fn send_template(
        &mut self,
        name: &str,
        mut overrides: VariableSet,
        on_step: &mut dyn FnMut(&CompletedStep<'_>),
    ) -> Result<SendResult, CommandError> {
        let exec_config = ExecutionConfig::from(&self.config);
        let Project {
            config: stored_config,
            templates,
            flows,
            variables,
        } = &mut self.project;

        let mut observer = PersistingObserver {
            project_path: &self.path,
            stored_config,
            templates,
            flows,
            history: &self.history,
            settings: &self.config,
            on_step,
        };
        let mut runner = FlowRunner::new(
            variables,
            &mut self.jar,
            &exec_config,
            &self.config.variable_prefix,
        );
        let result = runner.send_template(name, templates, flows, &mut overrides, &mut observer)?;
        Ok(result)
    }

    /// Runs the flow `name`.
    pub fn exec_flow(
        &mut self,
        name: &str,
        mut overrides: VariableSet,
        on_step: &mut dyn FnMut(&CompletedStep<'_>),
    ) -> Result<Vec<SendResult>, CommandError> {
        let exec_config = ExecutionConfig::from(&self.config);
        let Project {
            config: stored_config,
            templates,
            flows,
            variables,
        } = &mut self.project;

        let flow = flows
            .get(name)
            .ok_or_else(|| CommandError::UnknownFlow(name.to_string()))?;

        let mut observer = PersistingObserver {
            project_path: &self.path,
            stored_config,
            templates,
            flows,
            history: &self.history,
            settings: &self.config,
            on_step,
        };
        let mut runner = FlowRunner::new(
            variables,
            &mut self.jar,
            &exec_config,
            &self.config.variable_prefix,
        );
        let results = runner.execute_flow(flow, templates, &mut overrides, &mut observer)?;
        Ok(results)
    }

    /// Variables that sending template `name` would leave unresolved.
    ///
    /// Steps of the template's auth flow run first, so their captures
    /// count as defined.
    pub fn missing_for_template(&self, name: &str, overrides: &VariableSet) -> Result<Vec<String>, CommandError> {
        let templates = &self.project.templates;
        let template = templates
            .get(name)
            .ok_or_else(|| CommandError::UnknownTemplate(name.to_string()))?;

        let mut steps = Vec::new();
        if let Some(auth_flow) = &template.auth_flow {
            let flow = self
                .project
                .flows
                .get(auth_flow)
                .ok_or_else(|| CommandError::UnknownFlow(auth_flow.clone()))?;
            steps.extend(flow.steps.iter().filter_map(|step| templates.get(step)));
        }
        steps.push(template);

        Ok(missing_variables(
            steps,
            &self.project.variables.merged_set(overrides),
            &self.config.variable_prefix,
        ))
    }

    /// Variables that running flow `name` would leave unresolved.
    pub fn missing_for_flow(&self, name: &str, overrides: &VariableSet) -> Result<Vec<String>, CommandError> {
        let flow = self
            .project
            .flows
            .get(name)
            .ok_or_else(|| CommandError::UnknownFlow(name.to_string()))?;
        let templates = &self.project.templates;
        Ok(missing_variables(
            flow.steps.iter().filter_map(|step| templates.get(step)),
            &self.project.variables.merged_set(overrides),
            &self.config.variable_prefix,
        ))
    }

    /// Adds or replaces a template. Returns the replaced one.
    pub fn put_template(&mut self, template: RequestTemplate) -> Option<RequestTemplate> {
        self.project.templates.insert(template)
    }

    pub fn remove_template(&mut self, name: &str) -> Result<RequestTemplate, CommandError> {
        self.project
            .templates
            .remove(name)
            .ok_or_else(|| CommandError::UnknownTemplate(name.to_string()))
    }

    /// Drops the capture of `var_name` from a template. Returns `false` if
    /// the template had none.
    pub fn remove_capture(&mut self, name: &str, var_name: &str) -> Result<bool, CommandError> {
        let template = self
            .project
            .templates
            .get_mut(name)
            .ok_or_else(|| CommandError::UnknownTemplate(name.to_string()))?;
        Ok(template.remove_capture(var_name))
    }

    /// Adds or replaces a flow. Every step must name an existing template.
    pub fn put_flow(&mut self, flow: Flow) -> Result<Option<Flow>, CommandError> {
        if let Some(missing) = flow
            .steps
            .iter()
            .find(|step| !self.project.templates.contains(step))
        {
            return Err(CommandError::UnknownTemplate(missing.clone()));
        }
        Ok(self.project.flows.insert(flow))
    }

    pub fn remove_flow(&mut self, name: &str) -> Result<Flow, CommandError> {
        self.project
            .flows
            .remove(name)
            .ok_or_else(|| CommandError::UnknownFlow(name.to_string()))
    }

    pub fn set_var(&mut self, selector: &EnvSelector, name: &str, value: &str) -> Result<(), CommandError> {
        selector.set(&mut self.project.variables, name, value)?;
        Ok(())
    }

    /// Unsets `name` in the selected environment(s) and returns the
    /// environments it was removed from.
    pub fn unset_var(&mut self, selector: &EnvSelector, name: &str) -> Vec<String> {
        selector.unset(&mut self.project.variables, name)
    }

    pub fn use_env(&mut self, env: &str) -> Result<(), CommandError> {
        self.project.variables.set_current(env)?;
        Ok(())
    }

    pub fn rename_env(&mut self, from: &str, to: &str) -> Result<(), CommandError> {
        self.project.variables.rename_env(from, to)?;
        Ok(())
    }

    /// Deletes the selected environment(s) and returns what was deleted.
    pub fn delete_env(&mut self, selector: &EnvSelector) -> Result<Vec<String>, CommandError> {
        Ok(selector.delete(&mut self.project.variables)?)
    }

    /// Session cookies that would be sent to `url`.
    pub fn cookies_for(&self, url: &str) -> Result<Vec<&Cookie>, CommandError> {
        let url = Url::parse(url).map_err(|e| CommandError::InvalidUrl(e.to_string()))?;
        Ok(self.jar.cookies_for_url(&url))
    }

    /// Deletes every session cookie.
    pub fn clear_cookies(&mut self) -> Result<(), CommandError> {
        self.jar = CookieJar::new();
        self.save_session()
    }
}

/// Flushes project, session and history after every completed send.
struct PersistingObserver<'w> {
    project_path: &'w Path,
    stored_config: &'w ClientConfig,
    templates: &'w NamedSet<RequestTemplate>,
    flows: &'w NamedSet<Flow>,
    history: &'w HistoryLog,
    settings: &'w ClientConfig,
    on_step: &'w mut dyn FnMut(&CompletedStep<'_>),
}

impl PersistingObserver<'_> {
    fn record(
        &self,
        result: &SendResult,
        template: &RequestTemplate,
        flow: Option<&str>,
    ) -> Result<(), FlowError> {
        if self.settings.record_history {
            self.history
                .append(&HistoryEntry::from_result(result, Some(&template.name), flow))?;
        }
        Ok(())
    }
}

impl StepObserver for PersistingObserver<'_> {
    fn step_completed(&mut self, step: &CompletedStep<'_>) -> Result<(), FlowError> {
        (self.on_step)(step);
        self.record(step.result, step.template, step.flow)?;

        ProjectView {
            config: self.stored_config,
            templates: self.templates,
            flows: self.flows,
            variables: step.store,
        }
        .save(self.project_path)?;

        if self.settings.record_session {
            project::save_session(&project::session_path(self.project_path), step.jar)?;
        }
        Ok(())
    }

    fn step_failed(
        &mut self,
        flow: Option<&str>,
        template: &RequestTemplate,
        error: &SendError,
    ) -> Result<(), FlowError> {
        match error.response() {
            Some(result) => self.record(result, template, flow),
            None => Ok(()),
        }
    }
}

/// Sends a single request outside any project.
///
/// Cookies start empty unless `options.state_file` supplies some.
pub fn oneoff(
    method: &str,
    url: &str,
    options: &SendOptions,
    config: &ClientConfig,
) -> Result<SendResult, CommandError> {
    let mut jar = CookieJar::new();
    let result = send(
        method,
        url,
        &config.variable_prefix,
        options,
        &mut jar,
        &ExecutionConfig::from(config),
    )?;
    Ok(result)
}

/// Formats a duration like "85ms" or "1.250s".
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

/// Formats a byte count like "456 B" or "1.23 KB".
pub fn format_size(size: usize) -> String {
    if size < 1024 {
        format!("{} B", size)
    } else if size < 1024 * 1024 {
        format!("{:.2} KB", size as f64 / 1024.0)
    } else {
        format!("{:.2} MB", size as f64 / (1024.0 * 1024.0))
    }
}

/// Renders a send result for the terminal.
///
/// The request line and status line come first, then the response headers
/// when `verbose` is set, then the body and the captured values.
pub fn describe_result(result: &SendResult, verbose: bool) -> String {
    let response = &result.response;
    let mut out = format!(
        "{} {}\n{} ({}, {})\n",
        result.request.method,
        result.request.url,
        response.status_line(),
        format_duration(response.duration),
        format_size(response.body.len())
    );

    if verbose {
        for (name, value) in response.headers.iter() {
            out.push_str(&format!("{}: {}\n", name, value));
        }
    }

    if !response.body.is_empty() {
        out.push('\n');
        match response.body_as_text() {
            Some(text) => out.push_str(text),
            None => out.push_str(&format!("<{} of binary data>", format_size(response.body.len()))),
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    for (name, value) in &result.captured {
        out.push_str(&format!("{} = {}\n", name, value));
    }
    out
}
