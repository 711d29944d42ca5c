//! `restcli` binary entry point.
//!
//! Parses the command line, opens the project and maps every subcommand onto
//! [`restcli::commands::Workspace`]. Logging goes to stderr through
//! `env_logger`; `RUST_LOG` takes precedence over `-v`.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use restcli::commands::{describe_result, oneoff, Workspace};
use restcli::config::{ClientConfig, ConfigOverrides};
use restcli::environment::{display_env_name, EnvSelector, DEFAULT_ENV};
use restcli::executor::{SendError, SendOptions};
use restcli::flow::{CompletedStep, Flow};
use restcli::models::{Body, Headers, RequestTemplate};
use restcli::variables::{parse_assignment, parse_var_scraper, Scraper, VariableSet};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "restcli", version, about = "Scriptable REST client with templates, captures and flows")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// project file to operate on
    #[arg(short, long, global = true, default_value = "restcli.json")]
    project: PathBuf,

    /// skip TLS certificate verification
    #[arg(short = 'k', long, global = true)]
    insecure: bool,

    /// show response headers and debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// override the variable reference prefix
    #[arg(long, global = true, value_name = "PREFIX")]
    prefix: Option<String>,

    /// request timeout in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// create a new, empty project file
    Init,

    /// send a template
    Send {
        /// template name
        template: String,

        /// one-time variable value
        #[arg(short = 'o', long = "set", value_name = "VAR=VALUE", value_parser = parse_assignment)]
        overrides: Vec<(String, String)>,
    },

    /// run a flow
    Exec {
        /// flow name
        flow: String,

        /// one-time variable value, replaced once a step captures the same name
        #[arg(short = 'o', long = "set", value_name = "VAR=VALUE", value_parser = parse_assignment)]
        overrides: Vec<(String, String)>,
    },

    /// send a request without a project
    Oneoff {
        method: String,
        url: String,

        #[command(flatten)]
        request: RequestArgs,

        /// variable value used for resolution
        #[arg(short = 'o', long = "set", value_name = "VAR=VALUE", value_parser = parse_assignment)]
        overrides: Vec<(String, String)>,

        /// state file holding cookies and variables between invocations
        #[arg(long = "state", value_name = "FILE")]
        state_file: Option<PathBuf>,
    },

    /// manage request templates
    #[command(subcommand)]
    Template(TemplateCommand),

    /// manage flows
    #[command(subcommand)]
    Flow(FlowCommand),

    /// manage variables
    #[command(subcommand)]
    Var(VarCommand),

    /// manage environments
    #[command(subcommand)]
    Env(EnvCommand),

    /// show recent sends
    History {
        /// number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        count: usize,

        /// delete the history file
        #[arg(long)]
        clear: bool,
    },

    /// show the session cookies that apply to a URL
    Cookies {
        url: Option<String>,

        /// delete every session cookie
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Args)]
struct RequestArgs {
    /// request header, "Name: value"
    #[arg(short = 'H', long = "header", value_name = "HEADER", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// request body, or @FILE to read it from a file
    #[arg(short = 'd', long = "data", value_name = "BODY")]
    body: Option<String>,

    /// capture a response value, "VAR:path" or "VAR::START,END"
    #[arg(short = 'c', long = "capture", value_name = "VAR:SPEC", value_parser = parse_var_scraper)]
    captures: Vec<Scraper>,
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// add or replace a template
    Add {
        name: String,
        method: String,
        url: String,

        #[command(flatten)]
        request: RequestArgs,

        /// flow to run before sending this template on its own
        #[arg(long = "auth", value_name = "FLOW")]
        auth_flow: Option<String>,
    },

    /// print a template
    Show { name: String },

    /// list templates
    List,

    /// remove a template
    Remove { name: String },

    /// stop capturing variables from a template's responses
    Uncapture {
        name: String,

        /// captured variable names
        #[arg(required = true)]
        vars: Vec<String>,
    },
}

#[derive(Subcommand)]
enum FlowCommand {
    /// add or replace a flow
    Add {
        name: String,

        /// template names, in order
        #[arg(required = true)]
        steps: Vec<String>,
    },

    /// print a flow
    Show { name: String },

    /// list flows
    List,

    /// remove a flow
    Remove { name: String },
}

#[derive(Subcommand)]
enum VarCommand {
    /// set a variable
    Set {
        name: String,
        value: String,

        #[command(flatten)]
        env: EnvArgs,
    },

    /// print the value a variable resolves to
    Get {
        name: String,

        /// look only in this environment, without fallback
        #[arg(long, value_name = "ENV")]
        env: Option<String>,
    },

    /// remove a variable
    Unset {
        name: String,

        #[command(flatten)]
        env: EnvArgs,
    },

    /// list variables
    List {
        #[command(flatten)]
        env: EnvArgs,
    },
}

#[derive(Subcommand)]
enum EnvCommand {
    /// list environments, marking the current one
    List,

    /// switch the current environment; no name selects the default
    Use { env: Option<String> },

    /// delete environments
    Delete {
        #[command(flatten)]
        env: EnvArgs,
    },

    /// rename a non-default environment
    Rename { from: String, to: String },
}

/// Selects which environment(s) a command acts on. Defaults to the current one.
#[derive(Args)]
#[group(multiple = false)]
struct EnvArgs {
    /// the current environment
    #[arg(long)]
    current: bool,

    /// a named environment
    #[arg(long = "env", value_name = "ENV")]
    name: Option<String>,

    /// the default environment
    #[arg(long)]
    default: bool,

    /// every environment
    #[arg(long)]
    all: bool,
}

impl EnvArgs {
    fn selector(&self) -> EnvSelector {
        if self.current {
            EnvSelector::Current
        } else if let Some(name) = &self.name {
            EnvSelector::Named(name.clone())
        } else if self.default {
            EnvSelector::Default
        } else if self.all {
            EnvSelector::All
        } else {
            EnvSelector::Current
        }
    }
}

fn parse_header(arg: &str) -> Result<(String, String), String> {
    Headers::parse_header_line(arg).ok_or_else(|| format!("expected \"Name: value\", got {:?}", arg))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let overrides = ConfigOverrides {
        verify_tls: cli.insecure.then_some(false),
        variable_prefix: cli.prefix.clone(),
        timeout_ms: cli.timeout,
    };
    let verbose = cli.verbose;

    match cli.command {
        Command::Init => {
            Workspace::init(&cli.project)?;
            println!("Created {}", cli.project.display());
        }
        Command::Send {
            template,
            overrides: values,
        } => {
            let mut workspace = open(&cli.project, &overrides)?;
            let values: VariableSet = values.into_iter().collect();
            ensure_defined(workspace.missing_for_template(&template, &values)?)?;
            let mut on_step = |step: &CompletedStep<'_>| print_step(step, verbose);
            let outcome = workspace.send_template(&template, values, &mut on_step);
            if let Err(err) = &outcome {
                print_partial(err.send_error(), verbose);
            }
            outcome?;
        }
        Command::Exec {
            flow,
            overrides: values,
        } => {
            let mut workspace = open(&cli.project, &overrides)?;
            let values: VariableSet = values.into_iter().collect();
            ensure_defined(workspace.missing_for_flow(&flow, &values)?)?;
            let mut on_step = |step: &CompletedStep<'_>| print_step(step, verbose);
            let outcome = workspace.exec_flow(&flow, values, &mut on_step);
            if let Err(err) = &outcome {
                print_partial(err.send_error(), verbose);
            }
            let results = outcome?;
            println!("Flow {} completed: {} step(s)", flow, results.len());
        }
        Command::Oneoff {
            method,
            url,
            request,
            overrides: values,
            state_file,
        } => {
            let config = ClientConfig::default().merge(&overrides);
            if let Err(message) = config.validate() {
                bail!("Invalid configuration: {}", message);
            }
            let options = SendOptions {
                headers: request.headers.into_iter().collect(),
                body: read_body(request.body.as_deref())?,
                variables: values.into_iter().collect::<VariableSet>(),
                scrapers: request.captures,
                state_file,
            };
            let outcome = oneoff(&method, &url, &options, &config);
            if let Err(err) = &outcome {
                print_partial(err.send_error(), verbose);
            }
            print!("{}", describe_result(&outcome?, verbose));
        }
        Command::Template(command) => template_command(&cli.project, &overrides, command)?,
        Command::Flow(command) => flow_command(&cli.project, &overrides, command)?,
        Command::Var(command) => var_command(&cli.project, &overrides, command)?,
        Command::Env(command) => env_command(&cli.project, &overrides, command)?,
        Command::History { count, clear } => {
            let workspace = open(&cli.project, &overrides)?;
            if clear {
                workspace.history().clear()?;
                println!("History cleared");
            } else {
                for entry in workspace.history().recent(count)? {
                    println!("{}", entry.summary());
                }
            }
        }
        Command::Cookies { url, clear } => {
            let mut workspace = open(&cli.project, &overrides)?;
            if clear {
                workspace.clear_cookies()?;
                println!("Cookies cleared");
            } else if let Some(url) = url {
                for cookie in workspace.cookies_for(&url)? {
                    println!(
                        "{}\tdomain={} path={} expires={}{}",
                        cookie,
                        cookie.domain,
                        cookie.path,
                        cookie.expires.format("%Y-%m-%d %H:%M:%S"),
                        if cookie.secure { " secure" } else { "" }
                    );
                }
            } else {
                for entry in workspace.jar().entries() {
                    println!("{} ({} cookie(s))", entry.origin, entry.cookies.len());
                }
            }
        }
    }
    Ok(())
}

fn open(path: &Path, overrides: &ConfigOverrides) -> Result<Workspace> {
    Workspace::open(path, overrides).with_context(|| format!("Failed to open project {}", path.display()))
}

/// Fails with every unresolved name at once, before anything is sent.
fn ensure_defined(missing: Vec<String>) -> Result<()> {
    if !missing.is_empty() {
        bail!("Undefined variable(s): {}", missing.join(", "));
    }
    Ok(())
}

fn print_step(step: &CompletedStep<'_>, verbose: bool) {
    if let Some(flow) = step.flow {
        println!("--- {} step {}: {}", flow, step.index + 1, step.template.name);
    }
    print!("{}", describe_result(step.result, verbose));
}

/// Prints the response of a failed send, if one was received.
fn print_partial(err: Option<&SendError>, verbose: bool) {
    if let Some(result) = err.and_then(SendError::response) {
        print!("{}", describe_result(result, verbose));
    }
}

fn read_body(arg: Option<&str>) -> Result<Body> {
    match arg {
        None => Ok(Body::default()),
        Some(arg) => match arg.strip_prefix('@') {
            Some(path) => {
                let bytes = std::fs::read(path).with_context(|| format!("Failed to read body from {}", path))?;
                Ok(Body::new(bytes))
            }
            None => Ok(Body::from(arg)),
        },
    }
}

fn template_command(path: &Path, overrides: &ConfigOverrides, command: TemplateCommand) -> Result<()> {
    let mut workspace = open(path, overrides)?;
    match command {
        TemplateCommand::Add {
            name,
            method,
            url,
            request,
            auth_flow,
        } => {
            if let Some(flow) = &auth_flow {
                if !workspace.project().flows.contains(flow) {
                    bail!("Unknown flow: {}", flow);
                }
            }
            let mut template = RequestTemplate::new(name, method.to_uppercase(), url);
            for (header, value) in request.headers {
                template.add_header(header, value);
            }
            template.set_body(read_body(request.body.as_deref())?);
            for scraper in request.captures {
                template.set_capture(scraper);
            }
            template.auth_flow = auth_flow;

            let name = template.name.clone();
            let verb = if workspace.put_template(template).is_some() {
                "Updated"
            } else {
                "Added"
            };
            workspace.save()?;
            println!("{} template {}", verb, name);
        }
        TemplateCommand::Show { name } => {
            let template = workspace
                .project()
                .templates
                .get(&name)
                .with_context(|| format!("Unknown template: {}", name))?;
            println!("{}", serde_json::to_string_pretty(template)?);
        }
        TemplateCommand::List => {
            for template in workspace.project().templates.iter() {
                println!("{}\t{} {}", template.name, template.method, template.url);
            }
        }
        TemplateCommand::Remove { name } => {
            let removed = workspace.remove_template(&name)?;
            let referencing: Vec<&str> = workspace
                .project()
                .flows
                .iter()
                .filter(|flow| flow.steps.iter().any(|step| step.eq_ignore_ascii_case(&removed.name)))
                .map(|flow| flow.name.as_str())
                .collect();
            if !referencing.is_empty() {
                eprintln!("Warning: still referenced by flow(s): {}", referencing.join(", "));
            }
            workspace.save()?;
            println!("Removed template {}", removed.name);
        }
        TemplateCommand::Uncapture { name, vars } => {
            for var in &vars {
                if !workspace.remove_capture(&name, var)? {
                    eprintln!("Warning: {} does not capture {}", name, var.to_uppercase());
                }
            }
            workspace.save()?;
        }
    }
    Ok(())
}

fn flow_command(path: &Path, overrides: &ConfigOverrides, command: FlowCommand) -> Result<()> {
    let mut workspace = open(path, overrides)?;
    match command {
        FlowCommand::Add { name, steps } => {
            let verb = if workspace.put_flow(Flow::new(name.clone(), steps))?.is_some() {
                "Updated"
            } else {
                "Added"
            };
            workspace.save()?;
            println!("{} flow {}", verb, name);
        }
        FlowCommand::Show { name } => {
            let flow = workspace
                .project()
                .flows
                .get(&name)
                .with_context(|| format!("Unknown flow: {}", name))?;
            for (index, step) in flow.steps.iter().enumerate() {
                println!("{}. {}", index + 1, step);
            }
        }
        FlowCommand::List => {
            for flow in workspace.project().flows.iter() {
                println!("{}\t{}", flow.name, flow.steps.join(" -> "));
            }
        }
        FlowCommand::Remove { name } => {
            let removed = workspace.remove_flow(&name)?;
            workspace.save()?;
            println!("Removed flow {}", removed.name);
        }
    }
    Ok(())
}

fn var_command(path: &Path, overrides: &ConfigOverrides, command: VarCommand) -> Result<()> {
    let mut workspace = open(path, overrides)?;
    match command {
        VarCommand::Set { name, value, env } => {
            workspace.set_var(&env.selector(), &name, &value)?;
            workspace.save()?;
        }
        VarCommand::Get { name, env } => {
            let store = &workspace.project().variables;
            let value = match &env {
                Some(env) => store.get_from(&name, env),
                None => store.get(&name),
            };
            match value {
                Some(value) => println!("{}", value),
                None => bail!("Variable {} is not defined", name.to_uppercase()),
            }
        }
        VarCommand::Unset { name, env } => {
            let selector = env.selector();
            let removed = workspace.unset_var(&selector, &name);
            if removed.is_empty() {
                bail!("Variable {} is not defined in the {}", name.to_uppercase(), selector);
            }
            let shadowing = workspace.project().variables.non_default_envs_with(&name);
            if removed.iter().any(|env| env == DEFAULT_ENV) && !shadowing.is_empty() {
                eprintln!(
                    "Warning: {} is still defined in: {}",
                    name.to_uppercase(),
                    shadowing.join(", ")
                );
            }
            workspace.save()?;
        }
        VarCommand::List { env } => {
            let store = &workspace.project().variables;
            for target in env.selector().targets(store) {
                println!("[{}]", display_env_name(&target));
                for (name, value) in store.variables_in(&target) {
                    println!("{}={}", name, value);
                }
            }
        }
    }
    Ok(())
}

fn env_command(path: &Path, overrides: &ConfigOverrides, command: EnvCommand) -> Result<()> {
    let mut workspace = open(path, overrides)?;
    match command {
        EnvCommand::List => {
            let store = &workspace.project().variables;
            let marker = |env: &str| if store.current() == env { "* " } else { "  " };
            println!("{}{}", marker(DEFAULT_ENV), display_env_name(DEFAULT_ENV));
            for env in store.environment_names() {
                println!("{}{}", marker(&env), env);
            }
        }
        EnvCommand::Use { env } => {
            let env = env.unwrap_or_default();
            workspace.use_env(&env)?;
            workspace.save()?;
            println!("Using environment {}", display_env_name(&env));
        }
        EnvCommand::Delete { env } => {
            let deleted = workspace.delete_env(&env.selector())?;
            workspace.save()?;
            let names: Vec<&str> = deleted.iter().map(|env| display_env_name(env)).collect();
            println!("Deleted {}", names.join(", "));
        }
        EnvCommand::Rename { from, to } => {
            workspace.rename_env(&from, &to)?;
            workspace.save()?;
            println!("Renamed environment {} to {}", from, to);
        }
    }
    Ok(())
}
