//! Structured-command generation backend
//!
//! When the rule-based parser gives up on a chat message, the text can be
//! handed to a hosted model. The contract is strict: the model receives the
//! live command catalog and must answer with a single JSON object naming one
//! `(module, command)` pair from it. The reply is parsed and checked against
//! the catalog before it is allowed anywhere near the dispatcher; replies
//! that fail either step simply degrade to "not understood". Nothing the
//! backend returns is ever executed as code.

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::parser::ScriptCommand;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub struct GenerationClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GenerationClient {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    /// Asks the backend to map `text` onto a catalog command. `Ok(None)`
    /// means the model answered but not with a usable command.
    pub async fn propose_command(
        &self,
        text: &str,
        catalog: &HashMap<String, Vec<String>>,
    ) -> Result<Option<ScriptCommand>, String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(text, catalog) }] }]
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Generation request failed: {}", e))?;
        if !response.status().is_success() {
            return Err(format!("Generation API error: {}", response.status()));
        }
        let reply: Value = response
            .json()
            .await
            .map_err(|e| format!("Invalid generation response: {}", e))?;
        let answer = reply["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("");

        match parse_reply(answer) {
            Some(cmd) if is_known(catalog, &cmd) => {
                info!("generation resolved \"{}\" to {}.{}", text, cmd.module, cmd.command);
                Ok(Some(cmd))
            }
            Some(cmd) => {
                warn!(
                    "generation proposed unknown command {}.{}, dropping",
                    cmd.module, cmd.command
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

/// System prompt embedding the live catalog, JSON-only answer required.
pub fn build_prompt(text: &str, catalog: &HashMap<String, Vec<String>>) -> String {
    let mut modules: Vec<_> = catalog.iter().collect();
    modules.sort_by_key(|(name, _)| name.as_str());
    let mut listing = String::new();
    for (module, commands) in modules {
        listing.push_str(&format!("- {}: {}\n", module, commands.join(", ")));
    }
    format!(
        r#"You control a 3D scene editor through a fixed command set.

AVAILABLE COMMANDS (module: commands):
{listing}
USER REQUEST: {text}

Pick the single best matching command. Numeric parameters go in "params".

RESPOND WITH JSON ONLY:
{{"module": "...", "command": "...", "params": {{}}}}"#
    )
}

/// Extracts the JSON object from a model reply, tolerating code fences and
/// surrounding prose.
pub fn parse_reply(reply: &str) -> Option<ScriptCommand> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}

/// True when the proposed pair exists in the registry catalog.
pub fn is_known(catalog: &HashMap<String, Vec<String>>, cmd: &ScriptCommand) -> bool {
    catalog
        .get(&cmd.module)
        .map(|commands| commands.contains(&cmd.command))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> HashMap<String, Vec<String>> {
        let mut c = HashMap::new();
        c.insert(
            "camera".to_string(),
            vec!["moveTo".to_string(), "reset".to_string()],
        );
        c.insert("scene".to_string(), vec!["addObject".to_string()]);
        c
    }

    #[test]
    fn test_parse_plain_json() {
        let cmd = parse_reply(r#"{"module":"camera","command":"reset","params":{}}"#).unwrap();
        assert_eq!(cmd.module, "camera");
        assert_eq!(cmd.command, "reset");
    }

    #[test]
    fn test_parse_fenced_json_with_prose() {
        let reply = "Sure, here is the command:\n```json\n{\"module\": \"scene\", \"command\": \"addObject\", \"params\": {\"kind\": \"cube\"}}\n```\nDone.";
        let cmd = parse_reply(reply).unwrap();
        assert_eq!(cmd.module, "scene");
        assert_eq!(cmd.params["kind"], "cube");
    }

    #[test]
    fn test_parse_missing_params_defaults_to_empty() {
        let cmd = parse_reply(r#"{"module":"camera","command":"reset"}"#).unwrap();
        assert_eq!(cmd.params, serde_json::json!({}));
    }

    #[test]
    fn test_parse_garbage_returns_none() {
        assert!(parse_reply("I cannot help with that.").is_none());
        assert!(parse_reply("{not json}").is_none());
        assert!(parse_reply("").is_none());
    }

    #[test]
    fn test_whitelist_rejects_unknown_pairs() {
        let c = catalog();
        let known = ScriptCommand::new("camera", "moveTo", json!({}));
        let bad_command = ScriptCommand::new("camera", "selfDestruct", json!({}));
        let bad_module = ScriptCommand::new("shell", "exec", json!({}));
        assert!(is_known(&c, &known));
        assert!(!is_known(&c, &bad_command));
        assert!(!is_known(&c, &bad_module));
    }

    #[test]
    fn test_prompt_lists_catalog() {
        let prompt = build_prompt("ajoute un cube", &catalog());
        assert!(prompt.contains("camera: moveTo, reset"));
        assert!(prompt.contains("scene: addObject"));
        assert!(prompt.contains("ajoute un cube"));
        assert!(prompt.contains("JSON ONLY"));
    }
}
