//! Camera rig and animation engine
//!
//! The rig owns the authoritative camera state; the webview only renders
//! what it is told. Animated commands start a worker thread that advances
//! the state every tick and publishes a frame event. A single animation slot
//! is enforced through a shared epoch counter: starting any animation bumps
//! the epoch, and every running worker exits at its next tick when it sees a
//! newer epoch. Commands return as soon as the worker is started.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::router::{emit, parse_params, CommandSpec, EventSink, ScriptModule};

const TICK: Duration = Duration::from_millis(16);
const MIN_FOV: f64 = 30.0;
const MAX_FOV: f64 = 120.0;

pub const CAMERA_EVENT: &str = "camera-changed";

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    fn lerp(&self, to: &Vec3, t: f64) -> Vec3 {
        Vec3::new(
            self.x + (to.x - self.x) * t,
            self.y + (to.y - self.y) * t,
            self.z + (to.z - self.z) * t,
        )
    }
}

/// Cubic in/out easing used for positional moves.
fn ease_cubic(p: f64) -> f64 {
    if p < 0.5 {
        4.0 * p * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(3) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub position: Vec3,
    pub target: Vec3,
    pub fov: f64,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vec3::new(50.0, 50.0, 50.0),
            target: Vec3::ZERO,
            fov: 75.0,
        }
    }
}

/// A signed principal axis, as written in view commands (`x`, `-z`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub enum AxisDirection {
    #[serde(rename = "x")]
    PosX,
    #[serde(rename = "-x")]
    NegX,
    #[serde(rename = "y")]
    PosY,
    #[serde(rename = "-y")]
    NegY,
    #[serde(rename = "z")]
    PosZ,
    #[serde(rename = "-z")]
    NegZ,
}

impl AxisDirection {
    fn at_distance(&self, distance: f64) -> Vec3 {
        match self {
            AxisDirection::PosX => Vec3::new(distance, 0.0, 0.0),
            AxisDirection::NegX => Vec3::new(-distance, 0.0, 0.0),
            AxisDirection::PosY => Vec3::new(0.0, distance, 0.0),
            AxisDirection::NegY => Vec3::new(0.0, -distance, 0.0),
            AxisDirection::PosZ => Vec3::new(0.0, 0.0, distance),
            AxisDirection::NegZ => Vec3::new(0.0, 0.0, -distance),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RotationAxis {
    X,
    Y,
    Z,
}

// ============================================================================
// Command params
// ============================================================================

fn d500() -> u64 {
    500
}
fn d1000() -> u64 {
    1000
}
fn d2000() -> u64 {
    2000
}
fn d3000() -> u64 {
    3000
}
fn d5000() -> u64 {
    5000
}
fn default_rotation_axis() -> RotationAxis {
    RotationAxis::Y
}
fn default_angle() -> f64 {
    360.0
}
fn default_factor() -> f64 {
    1.5
}
fn default_intensity() -> f64 {
    0.5
}
fn default_slot() -> String {
    "default".to_string()
}

#[derive(Deserialize)]
struct Rotate360Params {
    #[serde(default = "d5000")]
    duration: u64,
    #[serde(default = "default_rotation_axis")]
    axis: RotationAxis,
}

#[derive(Deserialize)]
struct OrbitParams {
    #[serde(default)]
    target: Vec3,
    #[serde(default = "default_angle")]
    angle: f64,
    #[serde(default = "d3000")]
    duration: u64,
}

#[derive(Deserialize)]
struct MoveToParams {
    x: f64,
    y: f64,
    z: f64,
    #[serde(default = "d1000")]
    duration: u64,
}

#[derive(Deserialize)]
struct LookAtParams {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Deserialize)]
struct ZoomParams {
    #[serde(default = "default_factor")]
    factor: f64,
    #[serde(default = "d500")]
    duration: u64,
}

#[derive(Deserialize)]
struct PanParams {
    x: f64,
    y: f64,
    #[serde(default = "d500")]
    duration: u64,
}

#[derive(Deserialize)]
struct ShakeParams {
    #[serde(default = "default_intensity")]
    intensity: f64,
    #[serde(default = "d500")]
    duration: u64,
}

#[derive(Deserialize)]
struct FlyToParams {
    target: Vec3,
    #[serde(default = "d1000")]
    duration: u64,
}

#[derive(Deserialize)]
struct SetFovParams {
    fov: f64,
    #[serde(default = "d500")]
    duration: u64,
}

#[derive(Deserialize)]
struct DollyZoomParams {
    #[serde(default = "d2000")]
    duration: u64,
}

#[derive(Deserialize)]
struct SlotParams {
    #[serde(default = "default_slot")]
    name: String,
}

// ============================================================================
// Rig
// ============================================================================

/// Shared camera controller. Cloning shares the underlying state, so the
/// rig can be registered as the `camera` module and also handed to the axis
/// widget for its view shortcuts.
#[derive(Clone)]
pub struct CameraRig {
    state: Arc<Mutex<CameraState>>,
    saved: Arc<Mutex<HashMap<String, CameraState>>>,
    home: Vec3,
    epoch: Arc<AtomicU64>,
    animating: Arc<AtomicBool>,
    events: EventSink,
}

impl CameraRig {
    pub fn new(events: EventSink) -> Self {
        let state = CameraState::default();
        Self {
            home: state.position,
            state: Arc::new(Mutex::new(state)),
            saved: Arc::new(Mutex::new(HashMap::new())),
            epoch: Arc::new(AtomicU64::new(0)),
            animating: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    pub fn snapshot(&self) -> CameraState {
        *self.state.lock().unwrap()
    }

    pub fn is_animating(&self) -> bool {
        self.animating.load(Ordering::SeqCst)
    }

    /// Claims the animation slot and runs `tick` on a worker thread until the
    /// duration elapses or a newer animation takes the slot over. `done` runs
    /// exactly once with `completed = false` when the worker was cancelled.
    fn begin<F, D>(&self, duration_ms: u64, mut tick: F, done: D)
    where
        F: FnMut(f64, &mut CameraState) + Send + 'static,
        D: FnOnce(&mut CameraState, bool) + Send + 'static,
    {
        let my_epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.animating.store(true, Ordering::SeqCst);

        let state = Arc::clone(&self.state);
        let epoch = Arc::clone(&self.epoch);
        let animating = Arc::clone(&self.animating);
        let events = self.events.clone();
        let duration = Duration::from_millis(duration_ms.max(1));
        let mut done = Some(done);

        thread::spawn(move || {
            let start = Instant::now();
            loop {
                if epoch.load(Ordering::SeqCst) != my_epoch {
                    let mut s = state.lock().unwrap();
                    if let Some(done) = done.take() {
                        done(&mut s, false);
                    }
                    emit(&events, CAMERA_EVENT, &*s);
                    debug!("camera animation cancelled");
                    return;
                }

                let progress = (start.elapsed().as_secs_f64() / duration.as_secs_f64()).min(1.0);
                {
                    let mut s = state.lock().unwrap();
                    tick(progress, &mut s);
                    if progress >= 1.0 {
                        if let Some(done) = done.take() {
                            done(&mut s, true);
                        }
                    }
                    emit(&events, CAMERA_EVENT, &*s);
                }

                if progress >= 1.0 {
                    if epoch.load(Ordering::SeqCst) == my_epoch {
                        animating.store(false, Ordering::SeqCst);
                    }
                    return;
                }
                thread::sleep(TICK);
            }
        });
    }

    fn rotate360(&self, duration: u64, axis: RotationAxis) -> Value {
        let s0 = self.snapshot();
        let radius = match axis {
            RotationAxis::Y => (s0.position.x.powi(2) + s0.position.z.powi(2)).sqrt(),
            RotationAxis::X => (s0.position.y.powi(2) + s0.position.z.powi(2)).sqrt(),
            RotationAxis::Z => (s0.position.x.powi(2) + s0.position.y.powi(2)).sqrt(),
        };
        self.begin(
            duration,
            move |p, s| {
                let angle = p * std::f64::consts::TAU;
                match axis {
                    RotationAxis::Y => {
                        s.position.x = angle.cos() * radius;
                        s.position.z = angle.sin() * radius;
                    }
                    RotationAxis::X => {
                        s.position.y = angle.cos() * radius;
                        s.position.z = angle.sin() * radius;
                    }
                    RotationAxis::Z => {
                        s.position.x = angle.cos() * radius;
                        s.position.y = angle.sin() * radius;
                    }
                }
            },
            |_, _| {},
        );
        json!({ "status": "rotation started", "duration": duration })
    }

    fn orbit_around(&self, target: Vec3, angle_deg: f64, duration: u64) -> Value {
        let s0 = self.snapshot();
        let start_angle = (s0.position.z - target.z).atan2(s0.position.x - target.x);
        let radius =
            ((s0.position.x - target.x).powi(2) + (s0.position.z - target.z).powi(2)).sqrt();
        self.begin(
            duration,
            move |p, s| {
                let current = start_angle + angle_deg.to_radians() * p;
                s.position.x = target.x + current.cos() * radius;
                s.position.z = target.z + current.sin() * radius;
                s.target = target;
            },
            |_, _| {},
        );
        json!({ "status": "orbit started", "angle": angle_deg, "duration": duration })
    }

    fn move_to(&self, to: Vec3, duration: u64) -> Value {
        let from = self.snapshot().position;
        self.begin(
            duration,
            move |p, s| {
                s.position = from.lerp(&to, ease_cubic(p));
            },
            |_, _| {},
        );
        json!({ "status": "move started", "target": to, "duration": duration })
    }

    fn look_at(&self, target: Vec3) -> Value {
        let mut s = self.state.lock().unwrap();
        s.target = target;
        emit(&self.events, CAMERA_EVENT, &*s);
        json!({ "target": target })
    }

    fn zoom(&self, factor: f64, duration: u64) -> Value {
        let s0 = self.snapshot();
        let to_target = Vec3::new(
            s0.target.x - s0.position.x,
            s0.target.y - s0.position.y,
            s0.target.z - s0.position.z,
        );
        let len = to_target.length();
        if len == 0.0 {
            return json!({ "status": "already at target" });
        }
        let distance = s0.position.length() * (1.0 - factor);
        let to = Vec3::new(
            s0.position.x + to_target.x / len * distance,
            s0.position.y + to_target.y / len * distance,
            s0.position.z + to_target.z / len * distance,
        );
        self.move_to(to, duration)
    }

    fn pan(&self, dx: f64, dy: f64, duration: u64) -> Value {
        let p = self.snapshot().position;
        self.move_to(Vec3::new(p.x + dx, p.y + dy, p.z), duration)
    }

    fn shake(&self, intensity: f64, duration: u64) -> Value {
        let origin = self.snapshot().position;
        self.begin(
            duration,
            move |p, s| {
                if p < 1.0 {
                    let amplitude = (1.0 - p) * intensity;
                    let mut rng = rand::thread_rng();
                    s.position.x = origin.x + rng.gen_range(-0.5..0.5) * amplitude;
                    s.position.y = origin.y + rng.gen_range(-0.5..0.5) * amplitude;
                    s.position.z = origin.z + rng.gen_range(-0.5..0.5) * amplitude;
                }
            },
            // the pre-shake position comes back whether the effect finished
            // or was cancelled mid-flight
            move |s, _| {
                s.position = origin;
            },
        );
        json!({ "status": "shake started", "intensity": intensity, "duration": duration })
    }

    fn fly_to(&self, target: Vec3, duration: u64) -> Value {
        let from = self.snapshot().position;
        self.begin(
            duration,
            move |p, s| {
                s.position = from.lerp(&target, ease_cubic(p));
                if p >= 0.5 {
                    s.target = Vec3::ZERO;
                }
            },
            |_, _| {},
        );
        json!({ "status": "flight started", "target": target, "duration": duration })
    }

    fn set_fov(&self, fov: f64, duration: u64) -> Value {
        let fov = fov.clamp(MIN_FOV, MAX_FOV);
        let start = self.snapshot().fov;
        self.begin(
            duration,
            move |p, s| {
                s.fov = start + (fov - start) * p;
            },
            |_, _| {},
        );
        json!({ "status": "fov change started", "fov": fov })
    }

    fn dolly_zoom(&self, duration: u64) -> Value {
        let start = self.snapshot().fov;
        let peak = (start * 1.5).clamp(MIN_FOV, MAX_FOV);
        self.begin(
            duration,
            move |p, s| {
                // widen for the first half, narrow back for the second
                s.fov = if p < 0.5 {
                    start + (peak - start) * (p * 2.0)
                } else {
                    peak + (start - peak) * ((p - 0.5) * 2.0)
                };
            },
            |_, _| {},
        );
        json!({ "status": "dolly zoom started", "duration": duration })
    }

    fn reset(&self) -> Value {
        self.stop_animation();
        self.move_to(self.home, 1000)
    }

    pub fn stop_animation(&self) -> Value {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.animating.store(false, Ordering::SeqCst);
        json!({ "status": "animation stopped" })
    }

    fn get_position(&self) -> Value {
        let s = self.snapshot();
        json!({ "position": s.position, "target": s.target, "fov": s.fov })
    }

    fn save_position(&self, name: &str) -> Value {
        self.saved.lock().unwrap().insert(name.to_string(), self.snapshot());
        json!({ "status": "position saved", "name": name })
    }

    fn load_position(&self, name: &str) -> Result<Value, String> {
        let saved = self
            .saved
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .ok_or_else(|| format!("position \"{}\" not found", name))?;
        Ok(self.move_to(saved.position, 1000))
    }

    /// View shortcut used by the axis widget: fly to the given principal
    /// axis, keeping the current distance to the origin.
    pub fn rotate_to_axis(&self, axis: AxisDirection, duration: u64) -> Value {
        let distance = self.snapshot().position.length();
        {
            let mut s = self.state.lock().unwrap();
            s.target = Vec3::ZERO;
        }
        self.move_to(axis.at_distance(distance), duration)
    }

    /// Instant reset used by the axis widget.
    pub fn reset_instant(&self) -> Value {
        self.stop_animation();
        let mut s = self.state.lock().unwrap();
        s.position = self.home;
        s.target = Vec3::ZERO;
        emit(&self.events, CAMERA_EVENT, &*s);
        json!({ "status": "camera reset", "position": s.position })
    }
}

// ============================================================================
// Module registration
// ============================================================================

impl ScriptModule for CameraRig {
    fn name(&self) -> &'static str {
        "camera"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("rotate360", "Full rotation around an axis (duration ms, axis x|y|z)"),
            CommandSpec::new("orbitAround", "Orbit around a point (target, angle deg, duration)"),
            CommandSpec::new("moveTo", "Move to a position (x, y, z, duration)"),
            CommandSpec::new("lookAt", "Aim at a point (x, y, z)"),
            CommandSpec::new("zoom", "Zoom in or out (factor 0.5-2.0, duration)"),
            CommandSpec::new("pan", "Lateral move (x, y, duration)"),
            CommandSpec::new("shake", "Shake effect (intensity 0-1, duration)"),
            CommandSpec::new("flyTo", "Cinematic flight to a target (target, duration)"),
            CommandSpec::new("reset", "Return to the home position"),
            CommandSpec::new("savePosition", "Save the current position (name)"),
            CommandSpec::new("loadPosition", "Restore a saved position (name)"),
            CommandSpec::new("stopAnimation", "Cancel the running animation"),
            CommandSpec::new("getPosition", "Current position, target and fov"),
            CommandSpec::new("setFOV", "Change the field of view (fov 30-120, duration)"),
            CommandSpec::new("dollyZoom", "Vertigo effect (duration)"),
        ]
    }

    fn execute(&mut self, command: &str, params: &Value) -> Result<Value, String> {
        match command {
            "rotate360" => {
                let p: Rotate360Params = parse_params(params)?;
                Ok(self.rotate360(p.duration, p.axis))
            }
            "orbitAround" => {
                let p: OrbitParams = parse_params(params)?;
                Ok(self.orbit_around(p.target, p.angle, p.duration))
            }
            "moveTo" => {
                let p: MoveToParams = parse_params(params)?;
                Ok(self.move_to(Vec3::new(p.x, p.y, p.z), p.duration))
            }
            "lookAt" => {
                let p: LookAtParams = parse_params(params)?;
                Ok(self.look_at(Vec3::new(p.x, p.y, p.z)))
            }
            "zoom" => {
                let p: ZoomParams = parse_params(params)?;
                Ok(self.zoom(p.factor, p.duration))
            }
            "pan" => {
                let p: PanParams = parse_params(params)?;
                Ok(self.pan(p.x, p.y, p.duration))
            }
            "shake" => {
                let p: ShakeParams = parse_params(params)?;
                Ok(self.shake(p.intensity, p.duration))
            }
            "flyTo" => {
                let p: FlyToParams = parse_params(params)?;
                Ok(self.fly_to(p.target, p.duration))
            }
            "reset" => Ok(self.reset()),
            "savePosition" => {
                let p: SlotParams = parse_params(params)?;
                Ok(self.save_position(&p.name))
            }
            "loadPosition" => {
                let p: SlotParams = parse_params(params)?;
                self.load_position(&p.name)
            }
            "stopAnimation" => Ok(self.stop_animation()),
            "getPosition" => Ok(self.get_position()),
            "setFOV" => {
                let p: SetFovParams = parse_params(params)?;
                Ok(self.set_fov(p.fov, p.duration))
            }
            "dollyZoom" => {
                let p: DollyZoomParams = parse_params(params)?;
                Ok(self.dolly_zoom(p.duration))
            }
            other => Err(format!("unknown command: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn rig() -> (CameraRig, mpsc::Receiver<crate::router::StudioEvent>) {
        let (tx, rx) = mpsc::channel();
        (CameraRig::new(tx), rx)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn settle(rig: &CameraRig) {
        for _ in 0..200 {
            if !rig.is_animating() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("animation did not settle");
    }

    #[test]
    fn test_move_to_reaches_target() {
        let (rig, _rx) = rig();
        rig.move_to(Vec3::new(10.0, 0.0, 0.0), 40);
        assert!(rig.is_animating());
        settle(&rig);
        let s = rig.snapshot();
        assert!(close(s.position.x, 10.0), "got {:?}", s.position);
        assert!(close(s.position.y, 0.0));
        assert!(close(s.position.z, 0.0));
    }

    #[test]
    fn test_new_animation_replaces_previous() {
        let (rig, _rx) = rig();
        rig.move_to(Vec3::new(100.0, 0.0, 0.0), 2000);
        thread::sleep(Duration::from_millis(40));
        rig.move_to(Vec3::new(0.0, 100.0, 0.0), 40);
        settle(&rig);
        let s = rig.snapshot();
        // first move was cancelled, second one finished
        assert!(close(s.position.y, 100.0), "got {:?}", s.position);
        assert!(s.position.x < 100.0);
    }

    #[test]
    fn test_shake_restores_position_when_stopped() {
        let (rig, _rx) = rig();
        let before = rig.snapshot().position;
        rig.shake(2.0, 2000);
        thread::sleep(Duration::from_millis(50));
        rig.stop_animation();
        thread::sleep(Duration::from_millis(80));
        let after = rig.snapshot().position;
        assert_eq!(before, after);
        assert!(!rig.is_animating());
    }

    #[test]
    fn test_fov_is_clamped() {
        let (rig, _rx) = rig();
        rig.set_fov(500.0, 30);
        settle(&rig);
        assert!(close(rig.snapshot().fov, MAX_FOV));
        rig.set_fov(1.0, 30);
        settle(&rig);
        assert!(close(rig.snapshot().fov, MIN_FOV));
    }

    #[test]
    fn test_save_and_load_position() {
        let (rig, _rx) = rig();
        rig.save_position("corner");
        rig.move_to(Vec3::new(5.0, 5.0, 5.0), 30);
        settle(&rig);
        rig.load_position("corner").unwrap();
        settle(&rig);
        let s = rig.snapshot();
        assert!(close(s.position.x, 50.0), "got {:?}", s.position);

        let err = rig.load_position("nope").unwrap_err();
        assert!(err.contains("nope"));
    }

    #[test]
    fn test_rotate_to_axis_keeps_distance() {
        let (rig, _rx) = rig();
        let distance = rig.snapshot().position.length();
        rig.rotate_to_axis(AxisDirection::NegZ, 40);
        settle(&rig);
        let s = rig.snapshot();
        assert!(close(s.position.x, 0.0));
        assert!(close(s.position.y, 0.0));
        assert!(close(s.position.z, -distance), "got {:?}", s.position);
        assert_eq!(s.target, Vec3::ZERO);
    }

    #[test]
    fn test_get_position_is_read_only() {
        let (rig, _rx) = rig();
        let before = rig.snapshot();
        let mut module: Box<dyn ScriptModule> = Box::new(rig.clone());
        module.execute("getPosition", &json!({})).unwrap();
        module.execute("getPosition", &json!({})).unwrap();
        assert_eq!(before, rig.snapshot());
    }

    #[test]
    fn test_animation_emits_frames() {
        let (rig, rx) = rig();
        rig.move_to(Vec3::new(1.0, 2.0, 3.0), 40);
        settle(&rig);
        let frames: Vec<_> = rx.try_iter().collect();
        assert!(!frames.is_empty());
        assert!(frames.iter().all(|e| e.channel == CAMERA_EVENT));
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let (rig, _rx) = rig();
        let mut module: Box<dyn ScriptModule> = Box::new(rig);
        let err = module.execute("moveTo", &json!({ "x": "left" })).unwrap_err();
        assert!(err.contains("invalid params"));
        let err = module
            .execute("rotate360", &json!({ "axis": "w" }))
            .unwrap_err();
        assert!(err.contains("invalid params"));
    }
}
