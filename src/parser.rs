//! Natural-language command parsing
//!
//! Free chat text is mapped onto a structured `(module, command, params)`
//! triple in two stages: an ordered list of regex rules (first match wins,
//! declaration order is significant), then a keyword-scoring fallback that
//! picks a module and hands the text to that module's sub-parser. This is a
//! best-effort heuristic, not a grammar; input that matches nothing returns
//! `None` and the chat layer reports it as not understood.
//!
//! The command vocabulary is French, matching the studio's chat UI.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// A structured command, ready for the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptCommand {
    pub module: String,
    pub command: String,
    #[serde(default = "empty_params")]
    pub params: Value,
}

impl ScriptCommand {
    pub fn new(module: &str, command: &str, params: Value) -> Self {
        Self {
            module: module.to_string(),
            command: command.to_string(),
            params,
        }
    }
}

fn empty_params() -> Value {
    json!({})
}

// ============================================================================
// Rule table
// ============================================================================

enum ParamSpec {
    Static(Value),
    Build(fn(&Captures) -> Value),
}

struct ParseRule {
    regex: Regex,
    module: &'static str,
    command: &'static str,
    params: ParamSpec,
}

fn rx(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){}", pattern)).expect("hardcoded pattern")
}

fn fixed(pattern: &str, module: &'static str, command: &'static str, params: Value) -> ParseRule {
    ParseRule {
        regex: rx(pattern),
        module,
        command,
        params: ParamSpec::Static(params),
    }
}

fn built(
    pattern: &str,
    module: &'static str,
    command: &'static str,
    build: fn(&Captures) -> Value,
) -> ParseRule {
    ParseRule {
        regex: rx(pattern),
        module,
        command,
        params: ParamSpec::Build(build),
    }
}

fn cap_str<'a>(c: &'a Captures, i: usize) -> Option<&'a str> {
    c.get(i).map(|m| m.as_str())
}

fn cap_i64(c: &Captures, i: usize) -> Option<i64> {
    cap_str(c, i).and_then(|s| s.parse().ok())
}

fn cap_f64(c: &Captures, i: usize) -> Option<f64> {
    cap_str(c, i).and_then(|s| s.parse().ok())
}

/// The ordered rule table. Order is load-bearing: earlier rules shadow later
/// ones (`vue -z` must resolve before the generic camera rules, the widget
/// reset before the camera reset).
fn rule_table() -> Vec<ParseRule> {
    vec![
        // ---- axis widget ----
        fixed(
            r"cache (le widget|les axes|l'axe|axiswidget)",
            "axisWidget",
            "hide",
            json!({}),
        ),
        fixed(
            r"affiche (le widget|les axes|l'axe|axiswidget)",
            "axisWidget",
            "show",
            json!({}),
        ),
        fixed(r"masque (le widget|les axes)", "axisWidget", "hide", json!({})),
        fixed(r"montre (le widget|les axes)", "axisWidget", "show", json!({})),
        fixed(
            r"bascule (le widget|les axes|la visibilité)",
            "axisWidget",
            "toggle",
            json!({}),
        ),
        built(
            r"d[ée]place.*widget.*en (haut|bas)[\s-]*(gauche|droite)",
            "axisWidget",
            "setPosition",
            |c| {
                let vertical = if cap_str(c, 1) == Some("haut") { "top" } else { "bottom" };
                let horizontal = if cap_str(c, 2) == Some("gauche") { "left" } else { "right" };
                json!({ "corner": format!("{}-{}", vertical, horizontal) })
            },
        ),
        built(
            r"(?:redimensionne|agrandit|r[ée]duit).*widget.*?(\d+)",
            "axisWidget",
            "setSize",
            |c| json!({ "size": cap_i64(c, 1).unwrap_or(100) }),
        ),
        built(
            r"change.*couleur.*axe\s+(x|y|z).*(?:#([0-9a-f]{6})|(0x[0-9a-f]{6}))",
            "axisWidget",
            "setAxisColor",
            |c| {
                let color = cap_str(c, 2)
                    .and_then(|h| u32::from_str_radix(h, 16).ok())
                    .or_else(|| {
                        cap_str(c, 3)
                            .and_then(|h| u32::from_str_radix(h.trim_start_matches("0x"), 16).ok())
                    })
                    .unwrap_or(0xffffff);
                json!({ "axis": cap_str(c, 1).unwrap_or("x"), "color": color })
            },
        ),
        built(
            r"oriente.*cam[ée]ra.*vers.*axe\s+([-]?[xyz])",
            "axisWidget",
            "rotateCameraTo",
            |c| json!({ "axis": cap_str(c, 1).unwrap_or("z"), "duration": 1000 }),
        ),
        built(r"vue\s+([-]?[xyz])", "axisWidget", "rotateCameraTo", |c| {
            json!({ "axis": cap_str(c, 1).unwrap_or("z"), "duration": 800 })
        }),
        fixed(r"r[ée]initialise.*cam[ée]ra", "axisWidget", "resetCamera", json!({})),
        built(
            r"opacit[ée].*widget.*?(0?\.\d+|1\.?0?)",
            "axisWidget",
            "setOpacity",
            |c| json!({ "opacity": cap_f64(c, 1).unwrap_or(1.0) }),
        ),
        fixed(r"(?:status|[ée]tat).*widget", "axisWidget", "getStatus", json!({})),
        // ---- camera ----
        built(
            r"(?:fais\s+)?tourne(?:r)?.*cam[ée]ra.*360.*?(\d+)?\s*(?:seconde|sec|s)?",
            "camera",
            "rotate360",
            |c| {
                let seconds = cap_i64(c, 1).unwrap_or(5);
                json!({ "duration": seconds * 1000, "axis": "y" })
            },
        ),
        fixed(
            r"(?:fais\s+)?tourne(?:r)?.*cam[ée]ra",
            "camera",
            "rotate360",
            json!({ "duration": 5000, "axis": "y" }),
        ),
        built(
            r"orbite.*autour.*?(\d+)\s*(?:degr[ée]|°)?.*?(\d+)?\s*(?:seconde|sec|s)?",
            "camera",
            "orbitAround",
            |c| {
                let angle = cap_i64(c, 1).unwrap_or(360);
                let seconds = cap_i64(c, 2).unwrap_or(3);
                json!({
                    "target": { "x": 0, "y": 0, "z": 0 },
                    "angle": angle,
                    "duration": seconds * 1000,
                })
            },
        ),
        built(r"zoom.*?(avant|arri[èe]re|in|out)", "camera", "zoom", |c| {
            let direction = cap_str(c, 1).unwrap_or("avant");
            let factor = if direction == "avant" || direction == "in" { 0.7 } else { 1.3 };
            json!({ "factor": factor, "duration": 500 })
        }),
        built(r"zoom.*?(\d+\.?\d*)x?", "camera", "zoom", |c| {
            json!({ "factor": cap_f64(c, 1).unwrap_or(1.5), "duration": 500 })
        }),
        fixed(
            r"(?:effet\s+)?(?:tremble|shake)",
            "camera",
            "shake",
            json!({ "intensity": 0.5, "duration": 500 }),
        ),
        fixed(r"r[ée]initialise.*cam[ée]ra|reset.*cam", "camera", "reset", json!({})),
        fixed(
            r"arr[êe]te.*animation.*cam[ée]ra|stop.*cam",
            "camera",
            "stopAnimation",
            json!({}),
        ),
        fixed(
            r"position.*cam[ée]ra|o[ùu]\s+est.*cam[ée]ra",
            "camera",
            "getPosition",
            json!({}),
        ),
        built(r"(?:change|modifie).*fov.*?(\d+)", "camera", "setFOV", |c| {
            json!({ "fov": cap_i64(c, 1).unwrap_or(75), "duration": 500 })
        }),
        fixed(
            r"(?:effet\s+)?(?:vertigo|dolly|hitchcock)",
            "camera",
            "dollyZoom",
            json!({ "duration": 2000 }),
        ),
        built(
            r"d[ée]place.*cam[ée]ra.*?(-?\d+\.?\d*)[,\s]+(-?\d+\.?\d*)[,\s]+(-?\d+\.?\d*)",
            "camera",
            "moveTo",
            |c| {
                json!({
                    "x": cap_f64(c, 1).unwrap_or(0.0),
                    "y": cap_f64(c, 2).unwrap_or(0.0),
                    "z": cap_f64(c, 3).unwrap_or(0.0),
                    "duration": 1000,
                })
            },
        ),
        built(
            r"regarde.*?(-?\d+\.?\d*)[,\s]+(-?\d+\.?\d*)[,\s]+(-?\d+\.?\d*)",
            "camera",
            "lookAt",
            |c| {
                json!({
                    "x": cap_f64(c, 1).unwrap_or(0.0),
                    "y": cap_f64(c, 2).unwrap_or(0.0),
                    "z": cap_f64(c, 3).unwrap_or(0.0),
                })
            },
        ),
    ]
}

// ============================================================================
// Keyword fallback
// ============================================================================

const MODULE_KEYWORDS: &[(&str, &[&str])] = &[
    ("axisWidget", &["widget", "axes", "axe", "repère", "repere"]),
    (
        "camera",
        &[
            "caméra", "camera", "vue", "tourne", "rotation", "zoom", "orbite", "regard",
            "déplace", "deplace", "bouge", "anime",
        ],
    ),
    (
        "viewport",
        &["viewport", "fenêtre", "fenetre", "mini", "preview", "aperçu", "apercu"],
    ),
];

/// Patterns shared by the module sub-parsers, compiled once.
struct SubPatterns {
    hide_verbs: Regex,
    show_verbs: Regex,
    move_verbs: Regex,
    top_right: Regex,
    top_left: Regex,
    bottom_right: Regex,
    bottom_left: Regex,
    size_words: Regex,
    number: Regex,
    opacity_word: Regex,
    opacity_value: Regex,
    viewport_large: Regex,
    viewport_small: Regex,
    put_camera: Regex,
    coords: Regex,
    rotate_words: Regex,
    duration_secs: Regex,
    zoom_in: Regex,
    zoom_out: Regex,
    reset_words: Regex,
    shake_words: Regex,
    stop_words: Regex,
    position_words: Regex,
    vue_axis: Regex,
}

impl SubPatterns {
    fn new() -> Self {
        Self {
            hide_verbs: rx(r"cache|masque|invisible|disparait"),
            show_verbs: rx(r"affiche|montre|visible|apparait"),
            move_verbs: rx(r"d[ée]place|met|place|positionne"),
            top_right: rx(r"haut.*droite|droite.*haut"),
            top_left: rx(r"haut.*gauche|gauche.*haut"),
            bottom_right: rx(r"bas.*droite|droite.*bas"),
            bottom_left: rx(r"bas.*gauche|gauche.*bas"),
            size_words: rx(r"taille|grand|petit|dimension"),
            number: rx(r"(\d+)\s*(?:px|pixel)?"),
            opacity_word: rx(r"opacit[ée]"),
            opacity_value: rx(r"(0?\.\d+|1\.?0?)"),
            viewport_large: rx(r"grand|agrand|large"),
            viewport_small: rx(r"petit|r[ée]duit"),
            put_camera: rx(r"(?:met|mets|place|positionne).*(?:cam[ée]ra|vue)"),
            coords: rx(r"(-?\d+\.?\d*)[,\s]+(-?\d+\.?\d*)[,\s]+(-?\d+\.?\d*)"),
            rotate_words: rx(r"tourne|rotation|360|tour"),
            duration_secs: rx(r"(\d+)\s*(?:seconde|sec|s)"),
            zoom_in: rx(r"avant|in|plus"),
            zoom_out: rx(r"arri[eè]re|out|moins"),
            reset_words: rx(r"r[ée]initialise|reset|origine|initial"),
            shake_words: rx(r"tremble|shake|secoue"),
            stop_words: rx(r"arr[êe]te|arrete|stop"),
            position_words: rx(r"position|o[ùu]"),
            vue_axis: rx(r"vue\s+([-]?[xyz])"),
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

pub struct CommandParser {
    rules: Vec<ParseRule>,
    sub: SubPatterns,
}

impl CommandParser {
    pub fn new() -> Self {
        Self {
            rules: rule_table(),
            sub: SubPatterns::new(),
        }
    }

    /// Maps free text onto a structured command, or `None` when nothing in
    /// the vocabulary applies.
    pub fn parse(&self, text: &str) -> Option<ScriptCommand> {
        let text = text.to_lowercase();
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        for rule in &self.rules {
            if let Some(captures) = rule.regex.captures(text) {
                let params = match &rule.params {
                    ParamSpec::Static(value) => value.clone(),
                    ParamSpec::Build(build) => build(&captures),
                };
                debug!("rule match: {}.{}", rule.module, rule.command);
                return Some(ScriptCommand::new(rule.module, rule.command, params));
            }
        }

        let module = self.detect_module(text)?;
        debug!("keyword fallback picked module \"{}\"", module);
        match module {
            "axisWidget" => self.parse_axis_widget(text),
            "camera" => self.parse_camera(text),
            "viewport" => self.parse_viewport(text),
            _ => None,
        }
    }

    /// Strictly-highest keyword count wins; a tie or an all-zero score means
    /// no module is detected.
    fn detect_module(&self, text: &str) -> Option<&'static str> {
        let mut best: Option<&'static str> = None;
        let mut best_score = 0usize;
        let mut tied = false;

        for &(module, words) in MODULE_KEYWORDS {
            let score = words.iter().filter(|w| text.contains(**w)).count();
            if score > best_score {
                best_score = score;
                best = Some(module);
                tied = false;
            } else if score == best_score && score > 0 {
                tied = true;
            }
        }

        if tied || best_score == 0 {
            None
        } else {
            best
        }
    }

    fn corner(&self, text: &str) -> Option<&'static str> {
        if self.sub.top_right.is_match(text) {
            Some("top-right")
        } else if self.sub.top_left.is_match(text) {
            Some("top-left")
        } else if self.sub.bottom_right.is_match(text) {
            Some("bottom-right")
        } else if self.sub.bottom_left.is_match(text) {
            Some("bottom-left")
        } else {
            None
        }
    }

    fn parse_axis_widget(&self, text: &str) -> Option<ScriptCommand> {
        if self.sub.hide_verbs.is_match(text) {
            return Some(ScriptCommand::new("axisWidget", "hide", json!({})));
        }
        if self.sub.show_verbs.is_match(text) {
            return Some(ScriptCommand::new("axisWidget", "show", json!({})));
        }

        if self.sub.move_verbs.is_match(text) {
            let corner = self.corner(text).or_else(|| {
                // single-direction shorthand
                if text.contains("haut") {
                    Some("top-left")
                } else if text.contains("bas") {
                    Some("bottom-left")
                } else if text.contains("droite") {
                    Some("bottom-right")
                } else if text.contains("gauche") {
                    Some("bottom-left")
                } else {
                    None
                }
            });
            if let Some(corner) = corner {
                return Some(ScriptCommand::new(
                    "axisWidget",
                    "setPosition",
                    json!({ "corner": corner }),
                ));
            }
        }

        if self.sub.size_words.is_match(text) {
            if let Some(c) = self.sub.number.captures(text) {
                return Some(ScriptCommand::new(
                    "axisWidget",
                    "setSize",
                    json!({ "size": cap_i64(&c, 1).unwrap_or(100) }),
                ));
            }
        }

        if self.sub.opacity_word.is_match(text) {
            if let Some(c) = self.sub.opacity_value.captures(text) {
                return Some(ScriptCommand::new(
                    "axisWidget",
                    "setOpacity",
                    json!({ "opacity": cap_f64(&c, 1).unwrap_or(1.0) }),
                ));
            }
        }

        None
    }

    fn parse_viewport(&self, text: &str) -> Option<ScriptCommand> {
        if self.sub.hide_verbs.is_match(text) {
            return Some(ScriptCommand::new("viewport", "hide", json!({})));
        }
        if self.sub.show_verbs.is_match(text) {
            return Some(ScriptCommand::new("viewport", "show", json!({})));
        }

        if self.sub.move_verbs.is_match(text) {
            if let Some(position) = self.corner(text) {
                return Some(ScriptCommand::new(
                    "viewport",
                    "setPosition",
                    json!({ "position": position }),
                ));
            }
        }

        if self.sub.viewport_large.is_match(text) {
            return Some(ScriptCommand::new("viewport", "resize", json!({ "large": true })));
        }
        if self.sub.viewport_small.is_match(text) {
            return Some(ScriptCommand::new("viewport", "resize", json!({ "large": false })));
        }

        None
    }

    fn parse_camera(&self, text: &str) -> Option<ScriptCommand> {
        if self.sub.put_camera.is_match(text) {
            if let Some(c) = self.sub.coords.captures(text) {
                return Some(ScriptCommand::new(
                    "camera",
                    "moveTo",
                    json!({
                        "x": cap_f64(&c, 1).unwrap_or(0.0),
                        "y": cap_f64(&c, 2).unwrap_or(0.0),
                        "z": cap_f64(&c, 3).unwrap_or(0.0),
                        "duration": 1000,
                    }),
                ));
            }
            let distance = 50.0;
            let relative = if text.contains("gauche") {
                Some((-distance, 0.0, 0.0))
            } else if text.contains("droite") {
                Some((distance, 0.0, 0.0))
            } else if text.contains("haut") {
                Some((0.0, distance, 0.0))
            } else if text.contains("bas") {
                Some((0.0, -distance, 0.0))
            } else {
                None
            };
            if let Some((x, y, z)) = relative {
                return Some(ScriptCommand::new(
                    "camera",
                    "moveTo",
                    json!({ "x": x, "y": y, "z": z, "duration": 1000 }),
                ));
            }
        }

        if self.sub.rotate_words.is_match(text) {
            let duration = self
                .sub
                .duration_secs
                .captures(text)
                .and_then(|c| cap_i64(&c, 1))
                .map(|s| s * 1000)
                .unwrap_or(5000);
            return Some(ScriptCommand::new(
                "camera",
                "rotate360",
                json!({ "duration": duration, "axis": "y" }),
            ));
        }

        if text.contains("zoom") {
            let mut factor = 1.5;
            if self.sub.zoom_in.is_match(text) {
                factor = 0.7;
            }
            if self.sub.zoom_out.is_match(text) {
                factor = 1.3;
            }
            return Some(ScriptCommand::new(
                "camera",
                "zoom",
                json!({ "factor": factor, "duration": 500 }),
            ));
        }

        if self.sub.reset_words.is_match(text) {
            return Some(ScriptCommand::new("camera", "reset", json!({})));
        }

        if text.contains("orbit") {
            return Some(ScriptCommand::new(
                "camera",
                "orbitAround",
                json!({
                    "target": { "x": 0, "y": 0, "z": 0 },
                    "angle": 360,
                    "duration": 3000,
                }),
            ));
        }

        if self.sub.shake_words.is_match(text) {
            return Some(ScriptCommand::new(
                "camera",
                "shake",
                json!({ "intensity": 0.5, "duration": 500 }),
            ));
        }

        if self.sub.stop_words.is_match(text) {
            return Some(ScriptCommand::new("camera", "stopAnimation", json!({})));
        }

        if self.sub.position_words.is_match(text) {
            return Some(ScriptCommand::new("camera", "getPosition", json!({})));
        }

        if let Some(c) = self.sub.vue_axis.captures(text) {
            return Some(ScriptCommand::new(
                "axisWidget",
                "rotateCameraTo",
                json!({ "axis": cap_str(&c, 1).unwrap_or("z"), "duration": 800 }),
            ));
        }

        None
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<ScriptCommand> {
        CommandParser::new().parse(text)
    }

    #[test]
    fn test_hide_widget() {
        let cmd = parse("cache le widget").unwrap();
        assert_eq!(cmd.module, "axisWidget");
        assert_eq!(cmd.command, "hide");
        assert_eq!(cmd.params, json!({}));
    }

    #[test]
    fn test_resize_widget() {
        let cmd = parse("redimensionne le widget à 150").unwrap();
        assert_eq!(cmd.module, "axisWidget");
        assert_eq!(cmd.command, "setSize");
        assert_eq!(cmd.params, json!({ "size": 150 }));
    }

    #[test]
    fn test_view_axis_shorthand() {
        let cmd = parse("vue -z").unwrap();
        assert_eq!(cmd.module, "axisWidget");
        assert_eq!(cmd.command, "rotateCameraTo");
        assert_eq!(cmd.params, json!({ "axis": "-z", "duration": 800 }));
    }

    #[test]
    fn test_nonsense_returns_none() {
        assert!(parse("xyzzy plugh").is_none());
        assert!(parse("").is_none());
        assert!(parse("   ").is_none());
    }

    #[test]
    fn test_orient_camera_to_axis() {
        let cmd = parse("oriente la caméra vers l'axe z").unwrap();
        assert_eq!(cmd.module, "axisWidget");
        assert_eq!(cmd.command, "rotateCameraTo");
        assert_eq!(cmd.params, json!({ "axis": "z", "duration": 1000 }));
    }

    #[test]
    fn test_axis_color() {
        let cmd = parse("change la couleur de l'axe x en #ff0000").unwrap();
        assert_eq!(cmd.command, "setAxisColor");
        assert_eq!(cmd.params, json!({ "axis": "x", "color": 0xff0000 }));
    }

    #[test]
    fn test_widget_opacity() {
        let cmd = parse("opacité du widget 0.5").unwrap();
        assert_eq!(cmd.command, "setOpacity");
        assert_eq!(cmd.params, json!({ "opacity": 0.5 }));
    }

    #[test]
    fn test_reset_goes_to_widget_rule_first() {
        // both the widget and the camera expose a reset; declaration order
        // sends the generic phrasing to the widget rule
        let cmd = parse("réinitialise la caméra").unwrap();
        assert_eq!(cmd.module, "axisWidget");
        assert_eq!(cmd.command, "resetCamera");
    }

    #[test]
    fn test_rotate_camera_default_duration() {
        let cmd = parse("fais tourner la caméra").unwrap();
        assert_eq!(cmd.module, "camera");
        assert_eq!(cmd.command, "rotate360");
        assert_eq!(cmd.params, json!({ "duration": 5000, "axis": "y" }));
    }

    #[test]
    fn test_zoom_direction_and_factor() {
        let cmd = parse("zoom avant").unwrap();
        assert_eq!(cmd.params, json!({ "factor": 0.7, "duration": 500 }));

        let cmd = parse("zoom 2x").unwrap();
        assert_eq!(cmd.params, json!({ "factor": 2.0, "duration": 500 }));
    }

    #[test]
    fn test_camera_move_with_coordinates() {
        let cmd = parse("déplace la caméra 10, 20, 30").unwrap();
        assert_eq!(cmd.module, "camera");
        assert_eq!(cmd.command, "moveTo");
        assert_eq!(
            cmd.params,
            json!({ "x": 10.0, "y": 20.0, "z": 30.0, "duration": 1000 })
        );
    }

    #[test]
    fn test_look_at() {
        let cmd = parse("regarde 1 2 3").unwrap();
        assert_eq!(cmd.command, "lookAt");
        assert_eq!(cmd.params, json!({ "x": 1.0, "y": 2.0, "z": 3.0 }));
    }

    #[test]
    fn test_fov() {
        let cmd = parse("change le fov à 90").unwrap();
        assert_eq!(cmd.command, "setFOV");
        assert_eq!(cmd.params, json!({ "fov": 90, "duration": 500 }));
    }

    #[test]
    fn test_shake_effect() {
        let cmd = parse("effet tremble").unwrap();
        assert_eq!(cmd.command, "shake");
        assert_eq!(cmd.params, json!({ "intensity": 0.5, "duration": 500 }));
    }

    #[test]
    fn test_orbit_with_angle() {
        let cmd = parse("orbite autour de 90 degrés").unwrap();
        assert_eq!(cmd.command, "orbitAround");
        assert_eq!(cmd.params["angle"], json!(90));
        assert_eq!(cmd.params["duration"], json!(3000));
    }

    #[test]
    fn test_fallback_corner_with_filler_words() {
        // "en haut à droite" defeats the strict regex rule; the keyword
        // fallback and the widget sub-parser still resolve it
        let cmd = parse("mets le widget en haut à droite").unwrap();
        assert_eq!(cmd.module, "axisWidget");
        assert_eq!(cmd.command, "setPosition");
        assert_eq!(cmd.params, json!({ "corner": "top-right" }));
    }

    #[test]
    fn test_move_verb_tie_is_dropped() {
        // "déplace" scores for the camera, "widget" for the axis widget;
        // ambiguous input is dropped, not guessed
        assert!(parse("déplace le widget vers la zone").is_none());
    }

    #[test]
    fn test_fallback_visibility_synonym() {
        let cmd = parse("rends le widget invisible").unwrap();
        assert_eq!(cmd.module, "axisWidget");
        assert_eq!(cmd.command, "hide");
    }

    #[test]
    fn test_fallback_viewport() {
        let cmd = parse("cache la fenêtre mini").unwrap();
        assert_eq!(cmd.module, "viewport");
        assert_eq!(cmd.command, "hide");
    }

    #[test]
    fn test_keyword_tie_yields_none() {
        // one axisWidget keyword ("axe") against one camera keyword
        // ("bouge"): a tie is dropped rather than guessed
        assert!(parse("bouge l'axe").is_none());
    }

    #[test]
    fn test_detected_module_without_subcommand_returns_none() {
        // module is detected but no sub-rule applies
        assert!(parse("le widget est joli").is_none());
    }
}
