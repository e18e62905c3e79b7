//! Central command router for Kibalone Studio
//!
//! Every controllable subsystem (camera rig, axis widget, viewport, scene
//! graph) registers itself here as a module exposing named commands. All
//! invocations, whether issued directly by the UI or resolved from chat
//! input, go through `CommandRouter::dispatch` so that logging, counters and
//! history behave identically regardless of entry point.

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

/// Bounded history capacity, oldest records evicted first.
pub const HISTORY_CAPACITY: usize = 100;

const DEFAULT_HISTORY_LIMIT: usize = 20;

// ============================================================================
// Events pushed to the webview
// ============================================================================

/// State-change notification for the frontend. Modules send these on a plain
/// channel; the Tauri shell forwards each one as an event on `channel`.
#[derive(Debug, Clone)]
pub struct StudioEvent {
    pub channel: &'static str,
    pub payload: Value,
}

pub type EventSink = mpsc::Sender<StudioEvent>;

/// Convenience for modules: serialize and send, ignoring a closed channel
/// (the shell may not be listening in tests).
pub fn emit<T: Serialize>(sink: &EventSink, channel: &'static str, payload: &T) {
    if let Ok(value) = serde_json::to_value(payload) {
        let _ = sink.send(StudioEvent { channel, payload: value });
    }
}

/// Deserializes command params into a module's typed param struct.
pub fn parse_params<T: serde::de::DeserializeOwned>(params: &Value) -> Result<T, String> {
    serde_json::from_value(params.clone()).map_err(|e| format!("invalid params: {}", e))
}

// ============================================================================
// Module interface
// ============================================================================

/// A named command exposed by a module.
#[derive(Debug, Clone, Serialize)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
}

impl CommandSpec {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }
}

/// A controllable subsystem. Implementations translate the command name and
/// JSON params into their own typed command internally; the router only
/// checks that the name exists in `commands()` before calling `execute`.
pub trait ScriptModule: Send {
    fn name(&self) -> &'static str;
    fn commands(&self) -> Vec<CommandSpec>;
    fn execute(&mut self, command: &str, params: &Value) -> Result<Value, String>;
}

// ============================================================================
// Errors and outcomes
// ============================================================================

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("module \"{module}\" not found. Registered modules: {}", .known.join(", "))]
    ModuleNotFound { module: String, known: Vec<String> },

    #[error("unknown command \"{command}\" for module \"{module}\"")]
    UnknownCommand { module: String, command: String },

    #[error("command \"{module}.{command}\" failed: {message}")]
    Execution {
        module: String,
        command: String,
        message: String,
    },
}

/// Uniform dispatch result. Failures are folded in here, never raised.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub success: bool,
    pub module: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub module: String,
    pub command: String,
    pub params: Value,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub name: String,
    pub command_count: u64,
    pub error_count: u64,
    pub registered_at: DateTime<Utc>,
    pub commands: Vec<CommandSpec>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterStats {
    pub modules_count: usize,
    pub total_commands: u64,
    pub total_errors: u64,
    pub success_rate: String,
    pub history_size: usize,
}

// ============================================================================
// Router
// ============================================================================

struct RegisteredModule {
    module: Box<dyn ScriptModule>,
    registered_at: DateTime<Utc>,
    command_count: u64,
    error_count: u64,
}

/// Owns the module registry and the bounded invocation history. Created once
/// at startup and injected wherever dispatch is needed; there is no global
/// state.
pub struct CommandRouter {
    modules: HashMap<String, RegisteredModule>,
    order: Vec<String>,
    history: VecDeque<HistoryRecord>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
            order: Vec::new(),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Registers a module under its own name, replacing any previous
    /// registration (counters restart from zero).
    pub fn register(&mut self, module: Box<dyn ScriptModule>) {
        let name = module.name().to_string();
        if self.modules.contains_key(&name) {
            warn!("module \"{}\" already registered, replacing", name);
        } else {
            self.order.push(name.clone());
        }
        self.modules.insert(
            name.clone(),
            RegisteredModule {
                module,
                registered_at: Utc::now(),
                command_count: 0,
                error_count: 0,
            },
        );
        info!("module \"{}\" registered", name);
    }

    /// Executes `command` on `module`, returning a uniform outcome. Counters
    /// and history are updated for every call, success or failure.
    pub fn dispatch(&mut self, module: &str, command: &str, params: &Value) -> DispatchOutcome {
        let timestamp = Utc::now();
        let run = self.run(module, command, params);

        if let Some(entry) = self.modules.get_mut(module) {
            entry.command_count += 1;
            if run.is_err() {
                entry.error_count += 1;
            }
        }

        let outcome = match run {
            Ok(result) => {
                info!("dispatch {}.{} ok", module, command);
                DispatchOutcome {
                    success: true,
                    module: module.to_string(),
                    command: command.to_string(),
                    result: Some(result),
                    error: None,
                }
            }
            Err(err) => {
                warn!("dispatch {}.{} failed: {}", module, command, err);
                DispatchOutcome {
                    success: false,
                    module: module.to_string(),
                    command: command.to_string(),
                    result: None,
                    error: Some(err.to_string()),
                }
            }
        };

        self.push_history(HistoryRecord {
            timestamp,
            module: module.to_string(),
            command: command.to_string(),
            params: params.clone(),
            success: outcome.success,
            result: outcome.result.clone(),
            error: outcome.error.clone(),
        });

        outcome
    }

    fn run(&mut self, module: &str, command: &str, params: &Value) -> Result<Value, RouterError> {
        let entry = match self.modules.get_mut(module) {
            Some(entry) => entry,
            None => {
                let mut known = self.order.clone();
                known.sort();
                return Err(RouterError::ModuleNotFound {
                    module: module.to_string(),
                    known,
                });
            }
        };
        let has_command = entry.module.commands().iter().any(|c| c.name == command);
        if !has_command {
            return Err(RouterError::UnknownCommand {
                module: module.to_string(),
                command: command.to_string(),
            });
        }
        entry
            .module
            .execute(command, params)
            .map_err(|message| RouterError::Execution {
                module: module.to_string(),
                command: command.to_string(),
                message,
            })
    }

    fn push_history(&mut self, record: HistoryRecord) {
        self.history.push_back(record);
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
    }

    pub fn list_modules(&self) -> Vec<ModuleInfo> {
        self.order
            .iter()
            .filter_map(|name| self.modules.get(name).map(|e| (name, e)))
            .map(|(name, entry)| ModuleInfo {
                name: name.clone(),
                command_count: entry.command_count,
                error_count: entry.error_count,
                registered_at: entry.registered_at,
                commands: entry.module.commands(),
            })
            .collect()
    }

    /// Commands of one module, or of every module keyed by name.
    pub fn list_commands(&self, module: Option<&str>) -> Result<Value, RouterError> {
        match module {
            Some(name) => {
                let entry =
                    self.modules
                        .get(name)
                        .ok_or_else(|| RouterError::ModuleNotFound {
                            module: name.to_string(),
                            known: self.order.clone(),
                        })?;
                Ok(json!({
                    "module": name,
                    "commands": entry.module.commands(),
                }))
            }
            None => {
                let mut all = serde_json::Map::new();
                for name in &self.order {
                    if let Some(entry) = self.modules.get(name) {
                        all.insert(
                            name.clone(),
                            serde_json::to_value(entry.module.commands())
                                .unwrap_or(Value::Null),
                        );
                    }
                }
                Ok(Value::Object(all))
            }
        }
    }

    /// Flat `(module, command)` catalog, used to whitelist generated commands.
    pub fn catalog(&self) -> HashMap<String, Vec<String>> {
        self.order
            .iter()
            .filter_map(|name| self.modules.get(name).map(|e| (name, e)))
            .map(|(name, entry)| {
                (
                    name.clone(),
                    entry
                        .module
                        .commands()
                        .iter()
                        .map(|c| c.name.to_string())
                        .collect(),
                )
            })
            .collect()
    }

    /// Most recent records, oldest first.
    pub fn get_history(&self, limit: Option<usize>) -> Vec<HistoryRecord> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        info!("command history cleared");
    }

    pub fn get_stats(&self) -> RouterStats {
        let total_commands: u64 = self.modules.values().map(|e| e.command_count).sum();
        let total_errors: u64 = self.modules.values().map(|e| e.error_count).sum();
        let success_rate = if total_commands > 0 {
            let rate = (total_commands - total_errors) as f64 / total_commands as f64 * 100.0;
            format!("{:.2}%", rate)
        } else {
            "N/A".to_string()
        };
        RouterStats {
            modules_count: self.modules.len(),
            total_commands,
            total_errors,
            success_rate,
            history_size: self.history.len(),
        }
    }
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoModule;

    impl ScriptModule for EchoModule {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn commands(&self) -> Vec<CommandSpec> {
            vec![
                CommandSpec::new("ping", "Returns the params unchanged"),
                CommandSpec::new("boom", "Always fails"),
                CommandSpec::new("getStatus", "Read-only status"),
            ]
        }

        fn execute(&mut self, command: &str, params: &Value) -> Result<Value, String> {
            match command {
                "ping" => Ok(params.clone()),
                "boom" => Err("exploded".to_string()),
                "getStatus" => Ok(json!({ "ok": true })),
                other => Err(format!("unknown command: {}", other)),
            }
        }
    }

    struct OtherModule;

    impl ScriptModule for OtherModule {
        fn name(&self) -> &'static str {
            "other"
        }

        fn commands(&self) -> Vec<CommandSpec> {
            vec![CommandSpec::new("noop", "Does nothing")]
        }

        fn execute(&mut self, _command: &str, _params: &Value) -> Result<Value, String> {
            Ok(Value::Null)
        }
    }

    fn router() -> CommandRouter {
        let mut r = CommandRouter::new();
        r.register(Box::new(EchoModule));
        r.register(Box::new(OtherModule));
        r
    }

    #[test]
    fn test_dispatch_success_increments_counter() {
        let mut r = router();
        let out = r.dispatch("echo", "ping", &json!({ "n": 1 }));
        assert!(out.success);
        assert_eq!(out.result, Some(json!({ "n": 1 })));
        let info = &r.list_modules()[0];
        assert_eq!(info.command_count, 1);
        assert_eq!(info.error_count, 0);
    }

    #[test]
    fn test_unknown_module_lists_registered_names() {
        let mut r = router();
        let out = r.dispatch("nonexistent", "x", &json!({}));
        assert!(!out.success);
        let err = out.error.unwrap();
        assert!(err.contains("echo"), "error was: {}", err);
        assert!(err.contains("other"), "error was: {}", err);
    }

    #[test]
    fn test_unknown_command_references_name() {
        let mut r = router();
        let out = r.dispatch("echo", "nonexistent", &json!({}));
        assert!(!out.success);
        let err = out.error.unwrap();
        assert!(err.contains("nonexistent"));
        assert!(err.contains("echo"));
        // the module was identified, so the call still counts
        assert_eq!(r.list_modules()[0].command_count, 1);
        assert_eq!(r.list_modules()[0].error_count, 1);
    }

    #[test]
    fn test_execution_error_is_surfaced() {
        let mut r = router();
        let out = r.dispatch("echo", "boom", &json!({}));
        assert!(!out.success);
        assert!(out.error.unwrap().contains("exploded"));
    }

    #[test]
    fn test_history_bounded_and_chronological() {
        let mut r = router();
        for i in 0..120 {
            r.dispatch("echo", "ping", &json!({ "i": i }));
        }
        let history = r.get_history(Some(1000));
        assert_eq!(history.len(), HISTORY_CAPACITY);
        // the oldest 20 were evicted
        assert_eq!(history[0].params, json!({ "i": 20 }));
        assert_eq!(history[99].params, json!({ "i": 119 }));
    }

    #[test]
    fn test_history_default_limit() {
        let mut r = router();
        for i in 0..30 {
            r.dispatch("echo", "ping", &json!({ "i": i }));
        }
        assert_eq!(r.get_history(None).len(), 20);
        r.clear_history();
        assert!(r.get_history(None).is_empty());
    }

    #[test]
    fn test_stats_success_rate() {
        let mut r = router();
        for _ in 0..7 {
            r.dispatch("echo", "ping", &json!({}));
        }
        for _ in 0..3 {
            r.dispatch("echo", "boom", &json!({}));
        }
        let stats = r.get_stats();
        assert_eq!(stats.total_commands, 10);
        assert_eq!(stats.total_errors, 3);
        assert_eq!(stats.success_rate, "70.00%");
        assert_eq!(stats.history_size, 10);
    }

    #[test]
    fn test_stats_without_commands() {
        let r = router();
        assert_eq!(r.get_stats().success_rate, "N/A");
        assert_eq!(r.get_stats().modules_count, 2);
    }

    #[test]
    fn test_read_only_commands_are_idempotent() {
        let mut r = router();
        r.dispatch("echo", "getStatus", &json!({}));
        r.dispatch("echo", "getStatus", &json!({}));
        let modules = r.list_modules();
        assert_eq!(modules[0].command_count, 2);
        assert_eq!(modules[0].error_count, 0);
        // the other module is untouched
        assert_eq!(modules[1].command_count, 0);
    }

    #[test]
    fn test_reregister_replaces_module() {
        let mut r = router();
        r.dispatch("echo", "ping", &json!({}));
        r.register(Box::new(EchoModule));
        // counters restart, dispatch still works
        assert_eq!(r.list_modules()[0].command_count, 0);
        assert!(r.dispatch("echo", "ping", &json!({})).success);
        assert_eq!(r.list_modules().len(), 2);
    }

    #[test]
    fn test_catalog_shape() {
        let r = router();
        let catalog = r.catalog();
        assert!(catalog["echo"].contains(&"ping".to_string()));
        assert_eq!(catalog["other"], vec!["noop".to_string()]);
    }
}
