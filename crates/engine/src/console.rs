//! Text console collaborator.
//!
//! [`ConsoleDispatcher`] routes one command line against a [`Session`] and
//! writes human-readable lines to a [`ConsoleOutput`]. Failures never escape
//! as errors; they become `error: ...` lines.
//!
//! Syncing is the one command that may block, so the dispatcher does not run
//! it itself: it returns [`DispatchOutcome::SyncRequested`] and leaves the
//! choice between [`Session::sync_selected`] and the background path to the
//! caller. [`ConsoleDispatcher::report_sync`] formats either result.
//! [`InteractiveConsole`] is the background path: it keeps the ticket of the
//! sync in flight so further commands run while the implementation is built.

use std::fmt::Display;

use automation_registry::OperationArguments;
use automation_types::CascadeLevel;
use automation_util::split_command_words;
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    canvas::Point,
    session::Session,
    sync::{Binding, SyncCompletion, SyncError, SyncTicket},
};

pub const WELCOME_LINES: [&str; 2] = ["Welcome to the Automation Engine Shell!", "Type a command and press Enter."];

const HELP_TEXT: &str = "Available commands: help, clear, echo <text>, apis, envs, tenants, \
select <api|env|tenant> [name], status [--json], settings, ops, sync, call <operation> [json], \
place <operation name> [x y], nodes [--json|clear], quit";

/// Sink for console lines.
pub trait ConsoleOutput {
    fn append_output(&mut self, line: &str);
    fn clear(&mut self);
}

/// Collects lines in memory.
#[derive(Debug, Default, Clone)]
pub struct BufferedOutput {
    pub lines: Vec<String>,
}

impl ConsoleOutput for BufferedOutput {
    fn append_output(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn clear(&mut self) {
        self.lines.clear();
    }
}

/// What the caller should do after a command was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Continue,
    /// The user asked to sync this API and syncing is currently allowed.
    SyncRequested(String),
    Exit,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleDispatcher;

impl ConsoleDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Echoes a submitted line as `> line` and dispatches it. Blank lines are ignored.
    pub fn submit(&self, input: &str, session: &mut Session, output: &mut dyn ConsoleOutput) -> DispatchOutcome {
        let command = input.trim();
        if command.is_empty() {
            return DispatchOutcome::Continue;
        }
        output.append_output(&format!("> {command}"));
        self.dispatch(command, session, output)
    }

    /// Runs one command.
    pub fn dispatch(&self, command: &str, session: &mut Session, output: &mut dyn ConsoleOutput) -> DispatchOutcome {
        let (keyword, rest) = match command.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (command, ""),
        };
        match keyword.to_ascii_lowercase().as_str() {
            "help" if rest.is_empty() => output.append_output(HELP_TEXT),
            "clear" if rest.is_empty() => output.clear(),
            "echo" => output.append_output(rest),
            "apis" => list_options(session, CascadeLevel::Api, output),
            "envs" => list_options(session, CascadeLevel::Environment, output),
            "tenants" => list_options(session, CascadeLevel::Tenant, output),
            "select" => select(session, rest, output),
            "status" => status(session, rest, output),
            "settings" if rest.is_empty() => settings(session, output),
            "ops" => operations(session, output),
            "sync" => return request_sync(session, output),
            "call" => call(session, rest, output),
            "place" => place(session, rest, output),
            "nodes" => nodes(session, rest, output),
            "quit" | "exit" => return DispatchOutcome::Exit,
            _ => output.append_output(&format!("Unknown command: {command}")),
        }
        DispatchOutcome::Continue
    }

    /// Submits a line and completes any sync request on the calling thread.
    pub fn submit_blocking(&self, input: &str, session: &mut Session, output: &mut dyn ConsoleOutput) -> DispatchOutcome {
        match self.submit(input, session, output) {
            DispatchOutcome::SyncRequested(_) => {
                let result = session.sync_selected();
                self.report_sync(result, output);
                DispatchOutcome::Continue
            }
            other => other,
        }
    }

    /// Writes the outcome of a sync.
    pub fn report_sync(&self, result: Result<&Binding, SyncError>, output: &mut dyn ConsoleOutput) {
        match result {
            Ok(binding) => output.append_output(&format!(
                "Synced '{}' ({} operations)",
                binding.api_name(),
                binding.instance().operations().len()
            )),
            Err(error) => report_error(&error, output),
        }
    }
}

fn report_error(error: &dyn Display, output: &mut dyn ConsoleOutput) {
    output.append_output(&format!("error: {error}"));
}

fn list_options(session: &Session, level: CascadeLevel, output: &mut dyn ConsoleOutput) {
    let options = session.options_for(level);
    if options.is_empty() {
        output.append_output("(none)");
        return;
    }
    let selected = session.selection().get(level);
    for option in options {
        let marker = if selected == Some(option.as_str()) { '*' } else { ' ' };
        output.append_output(&format!("{marker} {option}"));
    }
}

fn select(session: &mut Session, rest: &str, output: &mut dyn ConsoleOutput) {
    let words = split_command_words(rest);
    let Some(level) = words.first().and_then(|word| word.parse::<CascadeLevel>().ok()) else {
        output.append_output("usage: select <api|env|tenant> [name]");
        return;
    };
    let value = words.get(1).map(String::as_str).filter(|value| !value.is_empty());
    if let Err(error) = session.select(level, value) {
        report_error(&error, output);
    }
    status(session, "", output);
}

fn status(session: &Session, rest: &str, output: &mut dyn ConsoleOutput) {
    let selection = session.selection();
    match rest {
        "" => {}
        "--json" => {
            let document = json!({
                "selection": selection,
                "synced": session.binding().map(Binding::api_name),
                "can_sync": session.can_sync(),
            });
            output.append_output(&document.to_string());
            return;
        }
        _ => {
            output.append_output("usage: status [--json]");
            return;
        }
    }
    let show = |value: Option<&str>| value.unwrap_or("-").to_string();
    output.append_output(&format!(
        "api: {} | environment: {} | tenant: {} | synced: {} | sync {}",
        show(selection.api.as_deref()),
        show(selection.environment.as_deref()),
        show(selection.tenant.as_deref()),
        show(session.binding().map(Binding::api_name)),
        if session.can_sync() { "available" } else { "unavailable" },
    ));
}

fn settings(session: &Session, output: &mut dyn ConsoleOutput) {
    match session.tenant_settings() {
        Some(settings) => write_json(settings, output),
        None => output.append_output("(no tenant selected)"),
    }
}

fn write_json(value: &Value, output: &mut dyn ConsoleOutput) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    for line in rendered.lines() {
        output.append_output(line);
    }
}

fn operations(session: &Session, output: &mut dyn ConsoleOutput) {
    let descriptors = session.catalog_descriptors();
    if descriptors.is_empty() {
        output.append_output("(no operations)");
        return;
    }
    for descriptor in descriptors {
        match descriptor.summary {
            Some(summary) => output.append_output(&format!("{} [{}] - {}", descriptor.display_name, descriptor.id, summary)),
            None => output.append_output(&format!("{} [{}]", descriptor.display_name, descriptor.id)),
        }
    }
}

fn request_sync(session: &Session, output: &mut dyn ConsoleOutput) -> DispatchOutcome {
    match session.selection().api.as_deref() {
        None => report_error(&SyncError::NotSelected, output),
        Some(api) if !session.can_sync() => report_error(&SyncError::AlreadyBound { api: api.to_string() }, output),
        Some(api) => return DispatchOutcome::SyncRequested(api.to_string()),
    }
    DispatchOutcome::Continue
}

fn call(session: &Session, rest: &str, output: &mut dyn ConsoleOutput) {
    let (operation_id, raw_arguments) = match rest.split_once(char::is_whitespace) {
        Some((operation_id, raw)) => (operation_id, raw.trim()),
        None => (rest, ""),
    };
    if operation_id.is_empty() {
        output.append_output("usage: call <operation> [json object]");
        return;
    }
    let arguments = match parse_arguments(raw_arguments) {
        Ok(arguments) => arguments,
        Err(message) => {
            output.append_output(&format!("error: {message}"));
            return;
        }
    };
    match session.invoke(operation_id, &arguments) {
        Ok(value) => write_json(&value, output),
        Err(error) => report_error(&error, output),
    }
}

fn parse_arguments(raw: &str) -> Result<OperationArguments, String> {
    if raw.is_empty() {
        return Ok(OperationArguments::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(arguments)) => Ok(arguments),
        Ok(_) => Err("arguments must be a JSON object".to_string()),
        Err(error) => Err(format!("invalid JSON arguments: {error}")),
    }
}

fn place(session: &mut Session, rest: &str, output: &mut dyn ConsoleOutput) {
    let words = split_command_words(rest);
    if words.is_empty() {
        output.append_output("usage: place <operation name> [x y]");
        return;
    }
    // Trailing "x y" is a position when both parse; otherwise every word belongs to the name.
    let (name_words, at) = match words.len().checked_sub(2).filter(|&split| split > 0) {
        Some(split) => match (words[split].parse::<f64>(), words[split + 1].parse::<f64>()) {
            (Ok(x), Ok(y)) => (&words[..split], Point::new(x, y)),
            _ => (&words[..], Point::default()),
        },
        None => (&words[..], Point::default()),
    };
    match session.place_node(&name_words.join(" "), at) {
        Ok(node) => output.append_output(&format!("Node '{}' added at {}", node.name, node.position)),
        Err(error) => report_error(&error, output),
    }
}

fn nodes(session: &mut Session, rest: &str, output: &mut dyn ConsoleOutput) {
    match rest {
        "" => {}
        "clear" => {
            session.clear_nodes();
            output.append_output("Canvas cleared");
            return;
        }
        "--json" => {
            match serde_json::to_string(session.nodes()) {
                Ok(rendered) => output.append_output(&rendered),
                Err(error) => report_error(&error, output),
            }
            return;
        }
        _ => {
            output.append_output("usage: nodes [--json|clear]");
            return;
        }
    }
    if session.nodes().is_empty() {
        output.append_output("(no nodes)");
        return;
    }
    for node in session.nodes() {
        output.append_output(&format!("#{} {} at {}", node.id, node.name, node.position));
    }
}

/// Console front end that syncs in the background.
///
/// At most one sync is tracked; requesting another replaces the ticket, and
/// the replaced construction is later rejected by its generation stamp.
#[derive(Debug, Default)]
pub struct InteractiveConsole {
    dispatcher: ConsoleDispatcher,
    pending: Option<SyncTicket>,
}

impl InteractiveConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// API whose construction is still running, if any.
    pub fn syncing(&self) -> Option<&str> {
        self.pending.as_ref().map(SyncTicket::api_name)
    }

    /// Echoes and runs one line. See [`Self::dispatch`].
    pub fn submit(&mut self, input: &str, session: &mut Session, output: &mut dyn ConsoleOutput) -> DispatchOutcome {
        let outcome = self.dispatcher.submit(input, session, output);
        self.start_requested_sync(outcome, session, output)
    }

    /// Runs one command. A sync request starts construction on a blocking
    /// worker and returns at once, so this must run inside a Tokio runtime.
    /// Never returns [`DispatchOutcome::SyncRequested`].
    pub fn dispatch(&mut self, command: &str, session: &mut Session, output: &mut dyn ConsoleOutput) -> DispatchOutcome {
        let outcome = self.dispatcher.dispatch(command, session, output);
        self.start_requested_sync(outcome, session, output)
    }

    /// Resolves when the pending sync finishes; never resolves while none is pending.
    ///
    /// Cancel safe: dropping the future keeps the sync pending.
    pub async fn sync_finished(&mut self) -> SyncCompletion {
        match self.pending.as_mut() {
            Some(ticket) => {
                let completion = ticket.finished().await;
                self.pending = None;
                completion
            }
            None => std::future::pending().await,
        }
    }

    /// Applies a finished sync against the live selection and reports it.
    pub fn apply_sync(&self, completion: SyncCompletion, session: &mut Session, output: &mut dyn ConsoleOutput) {
        let result = session.finish_sync(completion);
        self.dispatcher.report_sync(result, output);
    }

    fn start_requested_sync(
        &mut self,
        outcome: DispatchOutcome,
        session: &mut Session,
        output: &mut dyn ConsoleOutput,
    ) -> DispatchOutcome {
        let DispatchOutcome::SyncRequested(api) = outcome else {
            return outcome;
        };
        match session.begin_sync_selected() {
            Ok(ticket) => {
                if let Some(replaced) = self.pending.replace(ticket) {
                    debug!(api = %replaced.api_name(), generation = replaced.generation(), "pending sync replaced");
                }
                output.append_output(&format!("Syncing '{api}'..."));
            }
            Err(error) => report_error(&error, output),
        }
        DispatchOutcome::Continue
    }
}
