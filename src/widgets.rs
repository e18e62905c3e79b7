//! Axis widget and camera viewport modules
//!
//! Two small overlay widgets of the viewport page. The Rust side owns their
//! state (visibility, placement, colors); the webview styles itself from the
//! snapshots published on every change. The axis widget additionally exposes
//! the view shortcuts (`vue -z`, camera reset) by delegating to the shared
//! camera rig.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::camera::{AxisDirection, CameraRig};
use crate::router::{emit, parse_params, CommandSpec, EventSink, ScriptModule};
use crate::scene::Color;

pub const WIDGET_EVENT: &str = "widget-changed";
pub const VIEWPORT_EVENT: &str = "viewport-changed";

const MIN_WIDGET_SIZE: u32 = 50;
const MAX_WIDGET_SIZE: u32 = 500;

/// Screen corner used to anchor overlay widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Corner {
    #[serde(rename = "top-left")]
    TopLeft,
    #[serde(rename = "top-right")]
    TopRight,
    #[serde(rename = "bottom-left")]
    BottomLeft,
    #[serde(rename = "bottom-right")]
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis3 {
    X,
    Y,
    Z,
}

// ============================================================================
// Axis widget
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisWidgetState {
    pub visible: bool,
    pub size: u32,
    pub corner: Corner,
    pub offset_x: u32,
    pub offset_y: u32,
    pub opacity: f64,
    pub x_color: Color,
    pub y_color: Color,
    pub z_color: Color,
}

impl Default for AxisWidgetState {
    fn default() -> Self {
        Self {
            visible: true,
            size: 100,
            corner: Corner::BottomLeft,
            offset_x: 15,
            offset_y: 15,
            opacity: 1.0,
            x_color: Color(0xff3333),
            y_color: Color(0x337733),
            z_color: Color(0x3333ff),
        }
    }
}

fn d15() -> u32 {
    15
}
fn d1000() -> u64 {
    1000
}

#[derive(Deserialize)]
struct SetPositionParams {
    corner: Corner,
    #[serde(default = "d15")]
    x: u32,
    #[serde(default = "d15")]
    y: u32,
}

#[derive(Deserialize)]
struct SetSizeParams {
    size: u32,
}

#[derive(Deserialize)]
struct SetAxisColorParams {
    axis: Axis3,
    color: Color,
}

#[derive(Deserialize)]
struct RotateCameraToParams {
    axis: AxisDirection,
    #[serde(default = "d1000")]
    duration: u64,
}

#[derive(Deserialize)]
struct SetOpacityParams {
    opacity: f64,
}

pub struct AxisWidget {
    state: AxisWidgetState,
    camera: CameraRig,
    events: EventSink,
}

impl AxisWidget {
    pub fn new(camera: CameraRig, events: EventSink) -> Self {
        Self {
            state: AxisWidgetState::default(),
            camera,
            events,
        }
    }

    fn publish(&self) {
        emit(&self.events, WIDGET_EVENT, &self.state);
    }

    fn set_visible(&mut self, visible: bool) -> Value {
        self.state.visible = visible;
        self.publish();
        json!({ "visible": visible })
    }

    fn status(&self) -> Value {
        json!({
            "widget": self.state,
            "camera": self.camera.snapshot(),
        })
    }
}

impl ScriptModule for AxisWidget {
    fn name(&self) -> &'static str {
        "axisWidget"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("hide", "Hide the axis widget"),
            CommandSpec::new("show", "Show the axis widget"),
            CommandSpec::new("toggle", "Toggle widget visibility"),
            CommandSpec::new("setPosition", "Anchor the widget to a corner (corner, x, y)"),
            CommandSpec::new("setSize", "Resize the widget (size 50-500 px)"),
            CommandSpec::new("setAxisColor", "Change an axis color (axis x|y|z, color)"),
            CommandSpec::new(
                "rotateCameraTo",
                "Aim the camera down an axis (axis x|-x|y|-y|z|-z, duration ms)",
            ),
            CommandSpec::new("setOpacity", "Widget opacity (0-1)"),
            CommandSpec::new("resetCamera", "Snap the camera back home"),
            CommandSpec::new("getStatus", "Widget state and camera position"),
        ]
    }

    fn execute(&mut self, command: &str, params: &Value) -> Result<Value, String> {
        match command {
            "hide" => Ok(self.set_visible(false)),
            "show" => Ok(self.set_visible(true)),
            "toggle" => {
                let next = !self.state.visible;
                Ok(self.set_visible(next))
            }
            "setPosition" => {
                let p: SetPositionParams = parse_params(params)?;
                self.state.corner = p.corner;
                self.state.offset_x = p.x;
                self.state.offset_y = p.y;
                self.publish();
                Ok(json!({ "corner": p.corner }))
            }
            "setSize" => {
                let p: SetSizeParams = parse_params(params)?;
                if !(MIN_WIDGET_SIZE..=MAX_WIDGET_SIZE).contains(&p.size) {
                    return Err(format!(
                        "size must be between {} and {} pixels",
                        MIN_WIDGET_SIZE, MAX_WIDGET_SIZE
                    ));
                }
                self.state.size = p.size;
                self.publish();
                Ok(json!({ "size": p.size }))
            }
            "setAxisColor" => {
                let p: SetAxisColorParams = parse_params(params)?;
                match p.axis {
                    Axis3::X => self.state.x_color = p.color,
                    Axis3::Y => self.state.y_color = p.color,
                    Axis3::Z => self.state.z_color = p.color,
                }
                self.publish();
                Ok(json!({ "axis": p.axis, "color": p.color }))
            }
            "rotateCameraTo" => {
                let p: RotateCameraToParams = parse_params(params)?;
                Ok(self.camera.rotate_to_axis(p.axis, p.duration))
            }
            "setOpacity" => {
                let p: SetOpacityParams = parse_params(params)?;
                if !(0.0..=1.0).contains(&p.opacity) {
                    return Err("opacity must be between 0 and 1".to_string());
                }
                self.state.opacity = p.opacity;
                self.publish();
                Ok(json!({ "opacity": p.opacity }))
            }
            "resetCamera" => Ok(self.camera.reset_instant()),
            "getStatus" => Ok(self.status()),
            other => Err(format!("unknown command: {}", other)),
        }
    }
}

// ============================================================================
// Camera viewport
// ============================================================================

const VIEWPORT_LARGE: (u32, u32) = (640, 360);
const VIEWPORT_SMALL: (u32, u32) = (320, 180);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportState {
    pub visible: bool,
    pub position: Corner,
    pub large: bool,
    pub width: u32,
    pub height: u32,
    pub border_color: Color,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            visible: true,
            position: Corner::BottomLeft,
            large: false,
            width: VIEWPORT_SMALL.0,
            height: VIEWPORT_SMALL.1,
            border_color: Color(0x00d4ff),
        }
    }
}

#[derive(Deserialize)]
struct ViewportPositionParams {
    position: Corner,
}

#[derive(Deserialize)]
struct ResizeParams {
    large: bool,
}

#[derive(Deserialize)]
struct BorderColorParams {
    color: Color,
}

pub struct CameraViewport {
    state: ViewportState,
    events: EventSink,
}

impl CameraViewport {
    pub fn new(events: EventSink) -> Self {
        Self {
            state: ViewportState::default(),
            events,
        }
    }

    fn publish(&self) {
        emit(&self.events, VIEWPORT_EVENT, &self.state);
    }

    fn set_visible(&mut self, visible: bool) -> Value {
        self.state.visible = visible;
        self.publish();
        json!({ "visible": visible })
    }
}

impl ScriptModule for CameraViewport {
    fn name(&self) -> &'static str {
        "viewport"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("hide", "Hide the camera viewport"),
            CommandSpec::new("show", "Show the camera viewport"),
            CommandSpec::new("toggle", "Toggle viewport visibility"),
            CommandSpec::new("setPosition", "Move the viewport to a corner (position)"),
            CommandSpec::new("resize", "Preset size (large true|false)"),
            CommandSpec::new("setBorderColor", "Change the border color"),
            CommandSpec::new("getStatus", "Viewport state"),
        ]
    }

    fn execute(&mut self, command: &str, params: &Value) -> Result<Value, String> {
        match command {
            "hide" => Ok(self.set_visible(false)),
            "show" => Ok(self.set_visible(true)),
            "toggle" => {
                let next = !self.state.visible;
                Ok(self.set_visible(next))
            }
            "setPosition" => {
                let p: ViewportPositionParams = parse_params(params)?;
                self.state.position = p.position;
                self.publish();
                Ok(json!({ "position": p.position }))
            }
            "resize" => {
                let p: ResizeParams = parse_params(params)?;
                let (w, h) = if p.large { VIEWPORT_LARGE } else { VIEWPORT_SMALL };
                self.state.large = p.large;
                self.state.width = w;
                self.state.height = h;
                self.publish();
                Ok(json!({ "size": { "w": w, "h": h } }))
            }
            "setBorderColor" => {
                let p: BorderColorParams = parse_params(params)?;
                self.state.border_color = p.color;
                self.publish();
                Ok(json!({ "color": p.color }))
            }
            "getStatus" => Ok(serde_json::to_value(&self.state).unwrap_or(Value::Null)),
            other => Err(format!("unknown command: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn widget() -> (AxisWidget, mpsc::Receiver<crate::router::StudioEvent>) {
        let (tx, rx) = mpsc::channel();
        let camera = CameraRig::new(tx.clone());
        (AxisWidget::new(camera, tx), rx)
    }

    #[test]
    fn test_visibility_cycle() {
        let (mut w, _rx) = widget();
        w.execute("hide", &json!({})).unwrap();
        assert!(!w.state.visible);
        w.execute("toggle", &json!({})).unwrap();
        assert!(w.state.visible);
        w.execute("toggle", &json!({})).unwrap();
        assert!(!w.state.visible);
        w.execute("show", &json!({})).unwrap();
        assert!(w.state.visible);
    }

    #[test]
    fn test_size_bounds() {
        let (mut w, _rx) = widget();
        w.execute("setSize", &json!({ "size": 150 })).unwrap();
        assert_eq!(w.state.size, 150);

        let err = w.execute("setSize", &json!({ "size": 10 })).unwrap_err();
        assert!(err.contains("50"));
        let err = w.execute("setSize", &json!({ "size": 900 })).unwrap_err();
        assert!(err.contains("500"));
        // state untouched after the failed calls
        assert_eq!(w.state.size, 150);
    }

    #[test]
    fn test_opacity_bounds() {
        let (mut w, _rx) = widget();
        w.execute("setOpacity", &json!({ "opacity": 0.5 })).unwrap();
        assert_eq!(w.state.opacity, 0.5);
        assert!(w.execute("setOpacity", &json!({ "opacity": 1.5 })).is_err());
    }

    #[test]
    fn test_axis_color() {
        let (mut w, _rx) = widget();
        w.execute("setAxisColor", &json!({ "axis": "y", "color": "#123456" }))
            .unwrap();
        assert_eq!(w.state.y_color, Color(0x123456));
        assert_eq!(w.state.x_color, Color(0xff3333));
    }

    #[test]
    fn test_set_position_defaults_offsets() {
        let (mut w, _rx) = widget();
        w.execute("setPosition", &json!({ "corner": "top-right" }))
            .unwrap();
        assert_eq!(w.state.corner, Corner::TopRight);
        assert_eq!(w.state.offset_x, 15);
    }

    #[test]
    fn test_rotate_camera_delegates_to_rig() {
        let (mut w, _rx) = widget();
        w.execute("rotateCameraTo", &json!({ "axis": "-z", "duration": 30 }))
            .unwrap();
        assert!(w.camera.is_animating());
    }

    #[test]
    fn test_status_includes_camera() {
        let (mut w, _rx) = widget();
        let status = w.execute("getStatus", &json!({})).unwrap();
        assert_eq!(status["widget"]["visible"], true);
        assert!(status["camera"]["position"]["x"].is_number());
    }

    #[test]
    fn test_viewport_resize_presets() {
        let (tx, _rx) = mpsc::channel();
        let mut v = CameraViewport::new(tx);
        let out = v.execute("resize", &json!({ "large": true })).unwrap();
        assert_eq!(out["size"]["w"], 640);
        assert_eq!(v.state.width, 640);
        v.execute("resize", &json!({ "large": false })).unwrap();
        assert_eq!((v.state.width, v.state.height), (320, 180));
    }

    #[test]
    fn test_viewport_events_published() {
        let (tx, rx) = mpsc::channel();
        let mut v = CameraViewport::new(tx);
        v.execute("setBorderColor", &json!({ "color": "#ff00ff" }))
            .unwrap();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channel, VIEWPORT_EVENT);
        assert_eq!(events[0].payload["borderColor"], "#ff00ff");
    }
}
