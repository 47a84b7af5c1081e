pub mod models;
pub mod services;

use services::{
    render_plain, AnalysisCompletion, ApiClient, AppConfig, AppController, ConfigStore,
    InputMode, PendingFile, UploadCompletion,
};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const USAGE: &str = "Usage:\n  aidetect [--text <text>] [--file <path.txt|pdf|docx|doc>] [--url <base_url>] [--mode standard|upload] [--save] [--copy]\n\nNotes:\n  - `--file` extracts the document's text first and analyzes that text.\n  - `--text` and `--file` together: the extracted text replaces the typed text.\n  - AIDETECT_BASE_URL overrides the configured server address; `--url` overrides both.\n  - `--save` stores `--url` / `--mode` in the config file.";

/// Initialize logging system with timestamped log files
fn init_logging() {
    let disable_file_log = matches!(
        std::env::var("AIDETECT_DISABLE_FILE_LOG").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    );

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if disable_file_log {
        init_console_only_logging(env_filter);
        info!("File logging disabled via AIDETECT_DISABLE_FILE_LOG");
        return;
    }

    let logs_dir = match std::env::var("AIDETECT_LOG_DIR") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => get_logs_dir(),
    };

    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("Failed to create logs directory: {}", e);
        init_console_only_logging(env_filter);
        info!("Falling back to console-only logging (log dir not writable)");
        return;
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("aidetect_{}.log", timestamp);

    // One file per session; writes stay off the caller's thread.
    let file_appender = rolling::never(&logs_dir, &log_filename);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(file_guard);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }

    info!("=== AIDetect Started ===");
    info!("Log file: {}/{}", logs_dir.display(), log_filename);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    std::thread::spawn(move || {
        cleanup_old_logs(&logs_dir, 30);
    });
}

fn get_logs_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("aidetect").join("logs");
    }
    PathBuf::from("logs")
}

fn cleanup_old_logs(logs_dir: &Path, keep: usize) {
    let mut entries: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return,
    };

    entries.retain(|e| {
        let name = e.file_name().to_string_lossy().to_string();
        name.starts_with("aidetect_") && name.ends_with(".log")
    });

    if entries.len() <= keep {
        return;
    }

    entries.sort_by_key(|e| {
        e.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });

    let remove_count = entries.len().saturating_sub(keep);
    for entry in entries.into_iter().take(remove_count) {
        let _ = fs::remove_file(entry.path());
    }
}

fn init_console_only_logging(env_filter: EnvFilter) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn load_config() -> AppConfig {
    let Some(config_dir) = ConfigStore::default_config_dir() else {
        return AppConfig::default();
    };
    let mut config = match ConfigStore::new(config_dir).load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "config.load_failed");
            AppConfig::default()
        }
    };
    config.apply_env_overrides();
    config
}

/// Command-line flags win over both the config file and the environment.
fn apply_cli_overrides(args: &[String], config: &mut AppConfig) -> anyhow::Result<()> {
    config.override_base_url(parse_arg_value(args, "--url").as_deref());
    if let Some(mode) = parse_arg_value(args, "--mode") {
        config.input_mode = InputMode::parse(&mode)
            .ok_or_else(|| anyhow::anyhow!("unknown mode: {}", mode))?;
    }
    Ok(())
}

/// Store `--url` / `--mode` in the config file. Environment overrides are not persisted.
fn save_cli_overrides(store: &ConfigStore, args: &[String]) -> Result<(), String> {
    if let Some(url) = parse_arg_value(args, "--url").filter(|u| !u.trim().is_empty()) {
        store.set_base_url(&url)?;
    }
    if let Some(mode) = parse_arg_value(args, "--mode").and_then(|m| InputMode::parse(&m)) {
        store.set_input_mode(mode)?;
    }
    Ok(())
}

/// One select-file / submit cycle against the configured server.
async fn run_session(args: Vec<String>, mut config: AppConfig) -> anyhow::Result<()> {
    apply_cli_overrides(&args, &mut config)?;
    if has_flag(&args, "--save") {
        match ConfigStore::default_config_dir() {
            Some(dir) => {
                save_cli_overrides(&ConfigStore::new(dir), &args).map_err(|e| anyhow::anyhow!(e))?;
                info!("config.saved");
            }
            None => warn!("config.save_skipped: no config directory"),
        }
    }

    let api = ApiClient::from_config(&config)?;
    info!(
        upload_url = api.upload_url(),
        predict_url = api.predict_url(),
        mode = ?config.input_mode,
        "session.configured"
    );
    let ctrl = AppController::from_config(api, &config);

    if let Some(text) = parse_arg_value(&args, "--text") {
        ctrl.set_text(text);
    }

    if let Some(path) = parse_arg_value(&args, "--file") {
        let file = PendingFile::from_path(Path::new(&path))?;
        match ctrl.select_file(file).await {
            Ok(UploadCompletion::Extracted { .. }) => {}
            Ok(_) | Err(_) => {
                println!("{}", render_plain(&ctrl.render(Instant::now())));
                return Ok(());
            }
        }
    }

    if ctrl.render(Instant::now()).submit_enabled {
        match ctrl.submit().await {
            Ok(AnalysisCompletion::Ready(result)) => {
                info!(prediction = result.prediction.label(), "session.analyzed");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "session.submit_refused"),
        }
    } else {
        println!("Nothing to analyze: provide --text or --file.");
    }

    let copied = has_flag(&args, "--copy").then(|| ctrl.copy_text());
    println!("{}", render_plain(&ctrl.render(Instant::now())));
    if let Some(text) = copied {
        println!("\n{}", text);
    }
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || has_flag(&args, "--help") {
        println!("{}", USAGE);
        return Ok(());
    }

    init_logging();
    let config = load_config();

    // Single-threaded event loop: user actions and I/O completions interleave cooperatively.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_session(args, config));

    info!("=== AIDetect Exited ===");
    result
}
