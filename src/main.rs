#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod camera;
mod demos;
mod generation;
mod parser;
mod router;
mod scene;
mod widgets;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use base64::Engine;
use futures_util::StreamExt;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tauri::{Emitter, Manager};
use tracing::{info, warn};

use camera::CameraRig;
use generation::GenerationClient;
use parser::CommandParser;
use router::{CommandRouter, DispatchOutcome, EventSink, HistoryRecord, ModuleInfo, RouterStats};
use scene::{SceneDocument, SceneGraph};
use widgets::{AxisWidget, CameraViewport};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StudioSettings {
    pub gemini_key: Option<String>,
    pub generation_model: Option<String>,
    pub project_path: Option<String>,
    pub auto_preview: Option<bool>,
}

pub struct AppState {
    settings: Mutex<StudioSettings>,
    router: Mutex<CommandRouter>,
    parser: CommandParser,
    scene_doc: Arc<Mutex<SceneDocument>>,
    events: Mutex<EventSink>,
}

/// Outcome of a chat message: either a dispatched command or a polite no.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<DispatchOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub source: &'static str,
}

fn not_understood() -> ChatReply {
    ChatReply {
        success: false,
        outcome: None,
        error: Some("Command not understood".to_string()),
        suggestion: Some("Use listCommands to see what is available".to_string()),
        source: "none",
    }
}

// ============================================================================
// Dispatch & Chat
// ============================================================================

#[tauri::command]
fn dispatch_command(
    module: String,
    command: String,
    params: Option<Value>,
    state: tauri::State<AppState>,
) -> DispatchOutcome {
    let params = params.unwrap_or_else(|| json!({}));
    state.router.lock().unwrap().dispatch(&module, &command, &params)
}

#[tauri::command]
async fn chat_command(
    text: String,
    state: tauri::State<'_, AppState>,
) -> Result<ChatReply, String> {
    info!("chat: \"{}\"", text);

    if let Some(cmd) = state.parser.parse(&text) {
        let outcome = state
            .router
            .lock()
            .unwrap()
            .dispatch(&cmd.module, &cmd.command, &cmd.params);
        return Ok(ChatReply {
            success: outcome.success,
            outcome: Some(outcome),
            error: None,
            suggestion: None,
            source: "rules",
        });
    }

    // rule parsing gave up; let the generation backend propose a catalog
    // command, which then goes through the exact same dispatch path
    let (key, model) = {
        let settings = state.settings.lock().unwrap();
        (settings.gemini_key.clone(), settings.generation_model.clone())
    };
    if let Some(key) = key.filter(|k| !k.is_empty()) {
        let catalog = state.router.lock().unwrap().catalog();
        let client = GenerationClient::new(key, model);
        match client.propose_command(&text, &catalog).await {
            Ok(Some(cmd)) => {
                let outcome = state
                    .router
                    .lock()
                    .unwrap()
                    .dispatch(&cmd.module, &cmd.command, &cmd.params);
                return Ok(ChatReply {
                    success: outcome.success,
                    outcome: Some(outcome),
                    error: None,
                    suggestion: None,
                    source: "generation",
                });
            }
            Ok(None) => {}
            Err(e) => warn!("generation fallback failed: {}", e),
        }
    }

    Ok(not_understood())
}

// ============================================================================
// Introspection
// ============================================================================

#[tauri::command]
fn list_modules(state: tauri::State<AppState>) -> Vec<ModuleInfo> {
    state.router.lock().unwrap().list_modules()
}

#[tauri::command]
fn list_commands(module: Option<String>, state: tauri::State<AppState>) -> Result<Value, String> {
    state
        .router
        .lock()
        .unwrap()
        .list_commands(module.as_deref())
        .map_err(|e| e.to_string())
}

#[tauri::command]
fn get_history(limit: Option<usize>, state: tauri::State<AppState>) -> Vec<HistoryRecord> {
    state.router.lock().unwrap().get_history(limit)
}

#[tauri::command]
fn clear_history(state: tauri::State<AppState>) {
    state.router.lock().unwrap().clear_history();
}

#[tauri::command]
fn get_stats(state: tauri::State<AppState>) -> RouterStats {
    state.router.lock().unwrap().get_stats()
}

// ============================================================================
// Scene persistence & demos
// ============================================================================

#[tauri::command]
fn save_scene(project_path: String, state: tauri::State<AppState>) -> Result<String, String> {
    let doc = state.scene_doc.lock().unwrap().clone();
    let path = scene::save_to(&doc, Path::new(&project_path))?;
    info!("scene saved to {}", path.display());
    Ok(path.display().to_string())
}

#[tauri::command]
fn load_scene(project_path: String, state: tauri::State<AppState>) -> Result<SceneDocument, String> {
    let doc = scene::load_from(Path::new(&project_path))?;
    *state.scene_doc.lock().unwrap() = doc.clone();
    let events = state.events.lock().unwrap().clone();
    router::emit(&events, scene::SCENE_EVENT, &doc);
    info!("scene loaded from {}", project_path);
    Ok(doc)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoReport {
    pub id: String,
    pub applied: usize,
    pub failed: usize,
}

#[tauri::command]
fn get_demo_scenes() -> Vec<demos::DemoScene> {
    demos::demo_catalog()
}

#[tauri::command]
fn load_demo_scene(id: String, state: tauri::State<AppState>) -> Result<DemoReport, String> {
    let demo = demos::find_demo(&id).ok_or_else(|| format!("Unknown demo \"{}\"", id))?;
    let mut router = state.router.lock().unwrap();
    let mut applied = 0;
    let mut failed = 0;
    for cmd in &demo.commands {
        let outcome = router.dispatch(&cmd.module, &cmd.command, &cmd.params);
        if outcome.success {
            applied += 1;
        } else {
            failed += 1;
        }
    }
    Ok(DemoReport { id, applied, failed })
}

// ============================================================================
// Render capture
// ============================================================================

#[tauri::command]
fn save_render(data_url: String, project_path: String) -> Result<String, String> {
    let b64 = data_url.rsplit(',').next().unwrap_or_default();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|e| format!("Invalid image data: {}", e))?;

    let renders_dir = Path::new(&project_path).join("renders");
    fs::create_dir_all(&renders_dir).map_err(|e| e.to_string())?;
    let filename = format!("render_{}.png", chrono::Utc::now().format("%Y%m%d_%H%M%S%3f"));
    let path = renders_dir.join(filename);
    fs::write(&path, bytes).map_err(|e| format!("Failed to save render: {}", e))?;
    info!("render saved to {}", path.display());
    Ok(path.display().to_string())
}

// ============================================================================
// Asset Downloads
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct DownloadProgress {
    url: String,
    downloaded: u64,
    total: u64,
}

fn cache_name(url: &str) -> String {
    let hash = Sha256::digest(url.as_bytes());
    hash.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}

#[tauri::command]
async fn download_asset(
    app: tauri::AppHandle,
    url: String,
    destination: String,
) -> Result<String, String> {
    info!("downloading asset: {}", url);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| format!("Download failed: {}", e))?;
    if !response.status().is_success() {
        return Err(format!("Download failed: HTTP {}", response.status()));
    }
    let total = response.content_length().unwrap_or(0);

    let dest = PathBuf::from(&destination);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let mut file = fs::File::create(&dest).map_err(|e| e.to_string())?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_percent = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| format!("Download error: {}", e))?;
        file.write_all(&chunk).map_err(|e| e.to_string())?;
        downloaded += chunk.len() as u64;
        if total > 0 {
            let percent = downloaded * 100 / total;
            if percent != last_percent {
                last_percent = percent;
                let _ = app.emit(
                    "download-progress",
                    DownloadProgress { url: url.clone(), downloaded, total },
                );
            }
        }
    }

    info!("download complete: {} ({} bytes)", destination, downloaded);
    Ok(destination)
}

#[tauri::command]
async fn import_asset_pack(url: String, project_path: String) -> Result<u32, String> {
    info!("importing asset pack: {}", url);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| format!("Download failed: {}", e))?;
    if !response.status().is_success() {
        return Err(format!("Download failed: HTTP {}", response.status()));
    }
    let bytes = response.bytes().await.map_err(|e| e.to_string())?;

    let temp_path = std::env::temp_dir().join(format!("kibalone_{}.zip", cache_name(&url)));
    fs::write(&temp_path, &bytes).map_err(|e| e.to_string())?;

    let assets_dir = Path::new(&project_path).join("assets");
    fs::create_dir_all(&assets_dir).map_err(|e| e.to_string())?;

    let file = fs::File::open(&temp_path).map_err(|e| e.to_string())?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| format!("Invalid zip: {}", e))?;

    let mut extracted = 0u32;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| e.to_string())?;
        let outpath = match entry.enclosed_name() {
            Some(name) => assets_dir.join(name),
            None => {
                warn!("skipping unsafe zip entry: {}", entry.name());
                continue;
            }
        };
        if entry.is_dir() {
            fs::create_dir_all(&outpath).map_err(|e| e.to_string())?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
            let mut out = fs::File::create(&outpath).map_err(|e| e.to_string())?;
            std::io::copy(&mut entry, &mut out).map_err(|e| e.to_string())?;
            extracted += 1;
        }
    }

    fs::remove_file(&temp_path).ok();
    info!("asset pack imported: {} files into {}", extracted, assets_dir.display());
    Ok(extracted)
}

// ============================================================================
// Preview server
// ============================================================================

#[tauri::command]
fn start_preview_server(export_path: String) -> Result<u16, String> {
    let export_dir = Path::new(&export_path);
    if !export_dir.exists() {
        return Err(format!("Export directory does not exist: {}", export_path));
    }
    if !export_dir.join("index.html").exists() {
        return Err(format!("index.html not found in: {}", export_path));
    }

    let port = (8080..9000)
        .find(|p| std::net::TcpListener::bind(("127.0.0.1", *p)).is_ok())
        .ok_or("No available port found")?;

    info!("preview server starting on port {} for {}", port, export_path);

    thread::spawn(move || {
        let server = match tiny_http::Server::http(format!("127.0.0.1:{}", port)) {
            Ok(s) => s,
            Err(e) => {
                warn!("preview server failed to start: {}", e);
                return;
            }
        };

        for request in server.incoming_requests() {
            let raw = request.url().trim_start_matches('/').to_string();
            let decoded = urlencoding::decode(&raw)
                .map(|c| c.into_owned())
                .unwrap_or(raw);

            if decoded.contains("..") {
                let _ = request.respond(
                    tiny_http::Response::from_string("Forbidden").with_status_code(403),
                );
                continue;
            }

            let file_path = if decoded.is_empty() {
                Path::new(&export_path).join("index.html")
            } else {
                Path::new(&export_path).join(&decoded)
            };

            let response = match fs::read(&file_path) {
                Ok(content) => {
                    let mime = match file_path.extension().and_then(|e| e.to_str()) {
                        Some("html") => "text/html; charset=utf-8",
                        Some("js") => "application/javascript",
                        Some("css") => "text/css",
                        Some("json") => "application/json",
                        Some("yaml") | Some("yml") => "application/yaml",
                        Some("png") => "image/png",
                        Some("jpg") | Some("jpeg") => "image/jpeg",
                        Some("glb") => "model/gltf-binary",
                        Some("gltf") => "model/gltf+json",
                        Some("hdr") => "image/vnd.radiance",
                        Some("wasm") => "application/wasm",
                        Some("ico") => "image/x-icon",
                        _ => "application/octet-stream",
                    };
                    tiny_http::Response::from_data(content).with_header(
                        tiny_http::Header::from_bytes(&b"Content-Type"[..], mime.as_bytes())
                            .unwrap(),
                    )
                }
                Err(_) => tiny_http::Response::from_string("Not found")
                    .with_status_code(404)
                    .with_header(
                        tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"text/plain"[..])
                            .unwrap(),
                    ),
            };
            let _ = request.respond(response);
        }
    });

    thread::sleep(Duration::from_millis(100));
    Ok(port)
}

// ============================================================================
// Project file watcher
// ============================================================================

static WATCHER_ACTIVE: AtomicBool = AtomicBool::new(false);

const WATCHED_EXTENSIONS: &[&str] = &[
    ".glb", ".gltf", ".png", ".jpg", ".hdr", ".ktx2", ".bin", ".yaml",
];

#[tauri::command]
fn start_file_watcher(app: tauri::AppHandle, project_path: String) -> Result<(), String> {
    if WATCHER_ACTIVE.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    thread::spawn(move || {
        let path = PathBuf::from(&project_path);
        let (tx, rx) = mpsc::channel();

        let mut debouncer = match new_debouncer(Duration::from_millis(500), tx) {
            Ok(d) => d,
            Err(e) => {
                warn!("failed to create file watcher: {}", e);
                WATCHER_ACTIVE.store(false, Ordering::SeqCst);
                return;
            }
        };

        if let Err(e) = debouncer.watcher().watch(&path, RecursiveMode::Recursive) {
            warn!("failed to watch {}: {}", path.display(), e);
            WATCHER_ACTIVE.store(false, Ordering::SeqCst);
            return;
        }

        info!("watching project: {}", path.display());

        while WATCHER_ACTIVE.load(Ordering::SeqCst) {
            match rx.recv_timeout(Duration::from_secs(1)) {
                Ok(Ok(events)) => {
                    let changed: Vec<String> = events
                        .iter()
                        .filter(|e| {
                            let p = e.path.to_string_lossy();
                            // ignore hidden files, only react to scene assets
                            !p.contains("/.")
                                && !p.contains("\\.")
                                && WATCHED_EXTENSIONS.iter().any(|ext| p.ends_with(ext))
                        })
                        .map(|e| e.path.to_string_lossy().to_string())
                        .collect();
                    if !changed.is_empty() {
                        info!("project assets changed: {:?}", changed);
                        let _ = app.emit("project-assets-changed", changed);
                    }
                }
                Ok(Err(e)) => warn!("watcher error: {:?}", e),
                Err(_) => {
                    // timeout, check the flag again
                }
            }
        }

        info!("file watcher stopped");
    });

    Ok(())
}

#[tauri::command]
fn stop_file_watcher() {
    WATCHER_ACTIVE.store(false, Ordering::SeqCst);
}

// ============================================================================
// Settings Management
// ============================================================================

fn get_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kibalone")
        .join("settings.json")
}

fn load_settings_from_disk() -> StudioSettings {
    let path = get_settings_path();
    fs::read_to_string(&path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

#[tauri::command]
fn get_settings(state: tauri::State<AppState>) -> StudioSettings {
    state.settings.lock().unwrap().clone()
}

#[tauri::command]
fn save_settings(settings: StudioSettings, state: tauri::State<AppState>) -> Result<(), String> {
    *state.settings.lock().unwrap() = settings.clone();

    let path = get_settings_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let json = serde_json::to_string_pretty(&settings).map_err(|e| e.to_string())?;
    fs::write(&path, json).map_err(|e| format!("Failed to save settings: {}", e))?;
    Ok(())
}

#[tauri::command]
fn open_url(url: String) -> Result<(), String> {
    open::that(&url).map_err(|e| e.to_string())
}

// ============================================================================
// Application Entry
// ============================================================================

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let initial_settings = load_settings_from_disk();
    let (event_tx, event_rx) = mpsc::channel::<router::StudioEvent>();

    let camera = CameraRig::new(event_tx.clone());
    let scene_graph = SceneGraph::new(event_tx.clone());
    let scene_doc = scene_graph.document();

    let mut command_router = CommandRouter::new();
    command_router.register(Box::new(AxisWidget::new(camera.clone(), event_tx.clone())));
    command_router.register(Box::new(camera));
    command_router.register(Box::new(CameraViewport::new(event_tx.clone())));
    command_router.register(Box::new(scene_graph));

    tauri::Builder::default()
        .manage(AppState {
            settings: Mutex::new(initial_settings),
            router: Mutex::new(command_router),
            parser: CommandParser::new(),
            scene_doc,
            events: Mutex::new(event_tx),
        })
        .plugin(tauri_plugin_fs::init())
        .plugin(tauri_plugin_shell::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(move |app| {
            // forward module state changes to the webview
            let handle = app.handle().clone();
            thread::spawn(move || {
                while let Ok(event) = event_rx.recv() {
                    let _ = handle.emit(event.channel, event.payload);
                }
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            dispatch_command,
            chat_command,
            list_modules,
            list_commands,
            get_history,
            clear_history,
            get_stats,
            save_scene,
            load_scene,
            get_demo_scenes,
            load_demo_scene,
            save_render,
            download_asset,
            import_asset_pack,
            start_preview_server,
            start_file_watcher,
            stop_file_watcher,
            get_settings,
            save_settings,
            open_url
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
