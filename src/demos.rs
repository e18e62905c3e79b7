//! Built-in demo scene catalog
//!
//! Each demo is a list of plain scene commands, applied one by one through
//! the dispatcher so that demo loading is logged and counted like any other
//! scene edit.

use serde::Serialize;
use serde_json::json;

use crate::parser::ScriptCommand;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoScene {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub commands: Vec<ScriptCommand>,
}

fn scene(command: &str, params: serde_json::Value) -> ScriptCommand {
    ScriptCommand::new("scene", command, params)
}

pub fn demo_catalog() -> Vec<DemoScene> {
    vec![
        DemoScene {
            id: "primitives",
            name: "Primitive Playground",
            description: "One of each basic shape on a ground plane.",
            commands: vec![
                scene("clearScene", json!({})),
                scene("setBackground", json!({ "color": "#1a1a2e" })),
                scene("addLight", json!({ "kind": "ambient", "intensity": 0.4 })),
                scene(
                    "addLight",
                    json!({ "kind": "point", "intensity": 1.2, "position": { "x": 30.0, "y": 60.0, "z": 30.0 } }),
                ),
                scene(
                    "addObject",
                    json!({ "kind": "plane", "name": "ground", "color": "#2d2d44", "scale": 10.0 }),
                ),
                scene(
                    "addObject",
                    json!({ "kind": "cube", "color": "#e94560", "position": { "x": -15.0, "y": 5.0, "z": 0.0 } }),
                ),
                scene(
                    "addObject",
                    json!({ "kind": "sphere", "color": "#53d769", "position": { "x": 0.0, "y": 5.0, "z": 0.0 } }),
                ),
                scene(
                    "addObject",
                    json!({ "kind": "cylinder", "color": "#4d9de0", "position": { "x": 15.0, "y": 5.0, "z": 0.0 } }),
                ),
                scene(
                    "addObject",
                    json!({ "kind": "torus", "color": "#ffb400", "position": { "x": 0.0, "y": 5.0, "z": -15.0 } }),
                ),
            ],
        },
        DemoScene {
            id: "orbit",
            name: "Tiny Orbit",
            description: "A toy planetary system around a bright core.",
            commands: vec![
                scene("clearScene", json!({})),
                scene("setBackground", json!({ "color": "#000011" })),
                scene("addLight", json!({ "kind": "ambient", "intensity": 0.15 })),
                scene(
                    "addLight",
                    json!({ "kind": "point", "intensity": 2.0, "position": { "x": 0.0, "y": 0.0, "z": 0.0 } }),
                ),
                scene(
                    "addObject",
                    json!({ "kind": "sphere", "name": "core", "color": "#ffd166", "scale": 3.0 }),
                ),
                scene(
                    "addObject",
                    json!({ "kind": "sphere", "name": "inner", "color": "#4d9de0", "position": { "x": 20.0, "y": 0.0, "z": 0.0 } }),
                ),
                scene(
                    "addObject",
                    json!({ "kind": "sphere", "name": "outer", "color": "#e94560", "position": { "x": 38.0, "y": 0.0, "z": 0.0 }, "scale": 0.6 }),
                ),
                scene(
                    "addObject",
                    json!({ "kind": "torus", "name": "ring", "color": "#445577", "scale": 4.5 }),
                ),
            ],
        },
        DemoScene {
            id: "studio",
            name: "Studio Lighting",
            description: "Three-point lighting rig around a single subject.",
            commands: vec![
                scene("clearScene", json!({})),
                scene("setBackground", json!({ "color": "#202020" })),
                scene(
                    "addObject",
                    json!({ "kind": "plane", "name": "floor", "color": "#303030", "scale": 12.0 }),
                ),
                scene(
                    "addObject",
                    json!({ "kind": "cube", "name": "subject", "color": "#cccccc", "position": { "x": 0.0, "y": 6.0, "z": 0.0 }, "scale": 1.5 }),
                ),
                scene(
                    "addLight",
                    json!({ "kind": "directional", "intensity": 1.4, "position": { "x": 40.0, "y": 50.0, "z": 40.0 } }),
                ),
                scene(
                    "addLight",
                    json!({ "kind": "point", "intensity": 0.6, "position": { "x": -50.0, "y": 30.0, "z": 10.0 } }),
                ),
                scene(
                    "addLight",
                    json!({ "kind": "directional", "color": "#aaccff", "intensity": 0.8, "position": { "x": 0.0, "y": 40.0, "z": -60.0 } }),
                ),
            ],
        },
    ]
}

pub fn find_demo(id: &str) -> Option<DemoScene> {
    demo_catalog().into_iter().find(|d| d.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::ScriptModule;
    use crate::scene::SceneGraph;
    use std::sync::mpsc;

    #[test]
    fn test_catalog_ids_are_unique() {
        let catalog = demo_catalog();
        assert!(!catalog.is_empty());
        let mut ids: Vec<_> = catalog.iter().map(|d| d.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), catalog.len());
    }

    #[test]
    fn test_every_demo_starts_clean() {
        for demo in demo_catalog() {
            assert_eq!(demo.commands[0].command, "clearScene", "demo {}", demo.id);
            assert!(demo.commands.iter().all(|c| c.module == "scene"));
        }
    }

    #[test]
    fn test_demo_commands_apply_cleanly() {
        for demo in demo_catalog() {
            let (tx, _rx) = mpsc::channel();
            let mut graph = SceneGraph::new(tx);
            for cmd in &demo.commands {
                graph
                    .execute(&cmd.command, &cmd.params)
                    .unwrap_or_else(|e| panic!("demo {} failed on {}: {}", demo.id, cmd.command, e));
            }
            let doc = graph.document();
            assert!(!doc.lock().unwrap().objects.is_empty(), "demo {}", demo.id);
        }
    }

    #[test]
    fn test_find_demo() {
        assert!(find_demo("orbit").is_some());
        assert!(find_demo("missing").is_none());
    }
}
