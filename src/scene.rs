//! Scene graph module
//!
//! The authoritative list of objects and lights in the viewport. Generated
//! or chat-driven scene edits arrive here as plain dispatched commands, the
//! same path as every other module; nothing coming back from a backend is
//! ever executed as code. Every mutation publishes a full snapshot for the
//! webview to re-render, and the whole graph serializes to `scene.yaml` in
//! the project directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::camera::Vec3;
use crate::router::{emit, parse_params, CommandSpec, EventSink, ScriptModule};

pub const SCENE_EVENT: &str = "scene-changed";
pub const SCENE_FILE: &str = "scene.yaml";

// ============================================================================
// Colors
// ============================================================================

/// 24-bit RGB color. Accepts `0xff0000`-style integers as well as
/// `"#ff0000"` / `"0xff0000"` strings, and serializes as `"#rrggbb"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u32);

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("#{:06x}", self.0))
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColorVisitor;

        impl<'de> Visitor<'de> for ColorVisitor {
            type Value = Color;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a color as an integer or a \"#rrggbb\" string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Color, E> {
                if v > 0xffffff {
                    return Err(E::custom("color out of 24-bit range"));
                }
                Ok(Color(v as u32))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Color, E> {
                if !(0..=0xffffff).contains(&v) {
                    return Err(E::custom("color out of 24-bit range"));
                }
                Ok(Color(v as u32))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Color, E> {
                let hex = s.trim_start_matches('#').trim_start_matches("0x");
                u32::from_str_radix(hex, 16)
                    .ok()
                    .filter(|v| *v <= 0xffffff)
                    .map(Color)
                    .ok_or_else(|| E::custom(format!("invalid color \"{}\"", s)))
            }
        }

        deserializer.deserialize_any(ColorVisitor)
    }
}

// ============================================================================
// Scene data
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Cube,
    Sphere,
    Cylinder,
    Cone,
    Torus,
    Plane,
}

impl ObjectKind {
    fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Cube => "cube",
            ObjectKind::Sphere => "sphere",
            ObjectKind::Cylinder => "cylinder",
            ObjectKind::Cone => "cone",
            ObjectKind::Torus => "torus",
            ObjectKind::Plane => "plane",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Ambient,
    Point,
    Directional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: String,
    pub name: String,
    pub kind: ObjectKind,
    pub color: Color,
    pub position: Vec3,
    pub scale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightSource {
    pub id: String,
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f64,
    pub position: Vec3,
}

/// Everything the viewport renders besides the camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    pub background: Color,
    pub objects: Vec<SceneObject>,
    pub lights: Vec<LightSource>,
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self {
            background: Color(0x1a1a2e),
            objects: Vec::new(),
            lights: Vec::new(),
        }
    }
}

pub fn save_to(doc: &SceneDocument, project_dir: &Path) -> Result<PathBuf, String> {
    fs::create_dir_all(project_dir).map_err(|e| e.to_string())?;
    let path = project_dir.join(SCENE_FILE);
    let yaml = serde_yaml::to_string(doc).map_err(|e| e.to_string())?;
    fs::write(&path, yaml).map_err(|e| format!("Failed to write scene: {}", e))?;
    Ok(path)
}

pub fn load_from(project_dir: &Path) -> Result<SceneDocument, String> {
    let path = project_dir.join(SCENE_FILE);
    let yaml = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_yaml::from_str(&yaml).map_err(|e| format!("Invalid scene file: {}", e))
}

// ============================================================================
// Command params
// ============================================================================

fn default_object_color() -> Color {
    Color(0x888888)
}
fn default_light_color() -> Color {
    Color(0xffffff)
}
fn default_scale() -> f64 {
    1.0
}
fn default_intensity() -> f64 {
    1.0
}
fn default_light_position() -> Vec3 {
    Vec3::new(0.0, 50.0, 0.0)
}

#[derive(Deserialize)]
struct AddObjectParams {
    kind: ObjectKind,
    #[serde(default = "default_object_color")]
    color: Color,
    #[serde(default)]
    position: Vec3,
    #[serde(default = "default_scale")]
    scale: f64,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct RemoveObjectParams {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct SetBackgroundParams {
    color: Color,
}

#[derive(Deserialize)]
struct AddLightParams {
    kind: LightKind,
    #[serde(default = "default_light_color")]
    color: Color,
    #[serde(default = "default_intensity")]
    intensity: f64,
    #[serde(default = "default_light_position")]
    position: Vec3,
}

// ============================================================================
// Module
// ============================================================================

pub struct SceneGraph {
    doc: Arc<Mutex<SceneDocument>>,
    created: u64,
    events: EventSink,
}

impl SceneGraph {
    pub fn new(events: EventSink) -> Self {
        Self {
            doc: Arc::new(Mutex::new(SceneDocument::default())),
            created: 0,
            events,
        }
    }

    /// Shared handle for scene persistence in the shell.
    pub fn document(&self) -> Arc<Mutex<SceneDocument>> {
        Arc::clone(&self.doc)
    }

    fn publish(&self) {
        let doc = self.doc.lock().unwrap().clone();
        emit(&self.events, SCENE_EVENT, &doc);
    }

    fn add_object(&mut self, p: AddObjectParams) -> Value {
        self.created += 1;
        let object = SceneObject {
            id: Uuid::new_v4().to_string(),
            name: p
                .name
                .unwrap_or_else(|| format!("{}-{}", p.kind.as_str(), self.created)),
            kind: p.kind,
            color: p.color,
            position: p.position,
            scale: p.scale,
        };
        let summary = json!({ "id": object.id, "name": object.name });
        self.doc.lock().unwrap().objects.push(object);
        self.publish();
        summary
    }

    fn remove_object(&mut self, p: RemoveObjectParams) -> Result<Value, String> {
        let mut doc = self.doc.lock().unwrap();
        let before = doc.objects.len();
        if let Some(id) = &p.id {
            doc.objects.retain(|o| &o.id != id);
        } else if let Some(name) = &p.name {
            doc.objects.retain(|o| &o.name != name);
        } else {
            return Err("removeObject needs an id or a name".to_string());
        }
        let removed = before - doc.objects.len();
        if removed == 0 {
            return Err(format!(
                "no object matching {}",
                p.id.or(p.name).unwrap_or_default()
            ));
        }
        drop(doc);
        self.publish();
        Ok(json!({ "removed": removed }))
    }

    fn clear(&mut self) -> Value {
        let (objects, lights) = {
            let mut doc = self.doc.lock().unwrap();
            let counts = (doc.objects.len(), doc.lights.len());
            doc.objects.clear();
            doc.lights.clear();
            counts
        };
        self.publish();
        json!({ "removedObjects": objects, "removedLights": lights })
    }

    fn set_background(&mut self, color: Color) -> Value {
        self.doc.lock().unwrap().background = color;
        self.publish();
        json!({ "background": color })
    }

    fn add_light(&mut self, p: AddLightParams) -> Value {
        let light = LightSource {
            id: Uuid::new_v4().to_string(),
            kind: p.kind,
            color: p.color,
            intensity: p.intensity,
            position: p.position,
        };
        let summary = json!({ "id": light.id });
        self.doc.lock().unwrap().lights.push(light);
        self.publish();
        summary
    }

    fn list_objects(&self) -> Value {
        serde_json::to_value(&self.doc.lock().unwrap().objects).unwrap_or(Value::Null)
    }

    fn status(&self) -> Value {
        let doc = self.doc.lock().unwrap();
        json!({
            "objects": doc.objects.len(),
            "lights": doc.lights.len(),
            "background": doc.background,
        })
    }
}

impl ScriptModule for SceneGraph {
    fn name(&self) -> &'static str {
        "scene"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new(
                "addObject",
                "Add a primitive (kind cube|sphere|cylinder|cone|torus|plane, color, position, scale, name)",
            ),
            CommandSpec::new("removeObject", "Remove an object (id or name)"),
            CommandSpec::new("clearScene", "Remove every object and light"),
            CommandSpec::new("setBackground", "Change the background color"),
            CommandSpec::new(
                "addLight",
                "Add a light (kind ambient|point|directional, color, intensity, position)",
            ),
            CommandSpec::new("listObjects", "All objects in the scene"),
            CommandSpec::new("getStatus", "Object and light counts"),
        ]
    }

    fn execute(&mut self, command: &str, params: &Value) -> Result<Value, String> {
        match command {
            "addObject" => Ok(self.add_object(parse_params(params)?)),
            "removeObject" => self.remove_object(parse_params(params)?),
            "clearScene" => Ok(self.clear()),
            "setBackground" => {
                let p: SetBackgroundParams = parse_params(params)?;
                Ok(self.set_background(p.color))
            }
            "addLight" => Ok(self.add_light(parse_params(params)?)),
            "listObjects" => Ok(self.list_objects()),
            "getStatus" => Ok(self.status()),
            other => Err(format!("unknown command: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn graph() -> SceneGraph {
        let (tx, _rx) = mpsc::channel();
        SceneGraph::new(tx)
    }

    #[test]
    fn test_add_object_defaults() {
        let mut g = graph();
        let out = g
            .execute("addObject", &json!({ "kind": "cube" }))
            .unwrap();
        assert_eq!(out["name"], "cube-1");
        let doc = g.document();
        let doc = doc.lock().unwrap();
        assert_eq!(doc.objects.len(), 1);
        assert_eq!(doc.objects[0].color, Color(0x888888));
        assert_eq!(doc.objects[0].scale, 1.0);
    }

    #[test]
    fn test_remove_by_name_and_missing() {
        let mut g = graph();
        g.execute("addObject", &json!({ "kind": "sphere", "name": "ball" }))
            .unwrap();
        let out = g.execute("removeObject", &json!({ "name": "ball" })).unwrap();
        assert_eq!(out["removed"], 1);

        let err = g
            .execute("removeObject", &json!({ "name": "ball" }))
            .unwrap_err();
        assert!(err.contains("ball"));

        let err = g.execute("removeObject", &json!({})).unwrap_err();
        assert!(err.contains("id or a name"));
    }

    #[test]
    fn test_clear_scene_counts() {
        let mut g = graph();
        g.execute("addObject", &json!({ "kind": "cube" })).unwrap();
        g.execute("addObject", &json!({ "kind": "torus" })).unwrap();
        g.execute("addLight", &json!({ "kind": "point" })).unwrap();
        let out = g.execute("clearScene", &json!({})).unwrap();
        assert_eq!(out["removedObjects"], 2);
        assert_eq!(out["removedLights"], 1);
        assert_eq!(g.execute("getStatus", &json!({})).unwrap()["objects"], 0);
    }

    #[test]
    fn test_color_accepts_int_and_strings() {
        let mut g = graph();
        g.execute("setBackground", &json!({ "color": 0xff0000 })).unwrap();
        assert_eq!(g.document().lock().unwrap().background, Color(0xff0000));

        g.execute("setBackground", &json!({ "color": "#00ff00" })).unwrap();
        assert_eq!(g.document().lock().unwrap().background, Color(0x00ff00));

        g.execute("setBackground", &json!({ "color": "0x0000ff" })).unwrap();
        assert_eq!(g.document().lock().unwrap().background, Color(0x0000ff));

        let err = g
            .execute("setBackground", &json!({ "color": "fuchsia" }))
            .unwrap_err();
        assert!(err.contains("invalid params"));
    }

    #[test]
    fn test_mutations_publish_snapshots() {
        let (tx, rx) = mpsc::channel();
        let mut g = SceneGraph::new(tx);
        g.execute("addObject", &json!({ "kind": "cone" })).unwrap();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channel, SCENE_EVENT);
        assert_eq!(events[0].payload["objects"][0]["kind"], "cone");
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = graph();
        g.execute(
            "addObject",
            &json!({ "kind": "sphere", "color": "#aa00aa", "position": { "x": 1.0, "y": 2.0, "z": 3.0 } }),
        )
        .unwrap();
        g.execute("addLight", &json!({ "kind": "ambient", "intensity": 0.3 }))
            .unwrap();

        let doc = g.document().lock().unwrap().clone();
        save_to(&doc, dir.path()).unwrap();
        let loaded = load_from(dir.path()).unwrap();
        assert_eq!(loaded.objects.len(), 1);
        assert_eq!(loaded.objects[0].color, Color(0xaa00aa));
        assert_eq!(loaded.objects[0].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(loaded.lights[0].intensity, 0.3);
        assert_eq!(loaded.background, doc.background);
    }

    #[test]
    fn test_load_missing_scene_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from(dir.path()).is_err());
    }
}
