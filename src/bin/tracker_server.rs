//! Tracker server: receives per-frame pose landmarks over TCP, runs one
//! push-up rep counter per connection, and replies with tracker updates.
//!
//! Pose estimation runs client-side (or behind an external backend); this
//! server only consumes the landmark data contract.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use pushup_tracker::config::{Config, ServerConfig, TrackerConfig};
use pushup_tracker::counter::RepCounter;
use pushup_tracker::pose::LandmarkSet;
use pushup_tracker::protocol::{self, ClientMessage, ServerMessage};

const CONFIG_PATH: &str = "tracker.toml";

// ===========================================================================
// Logging
// ===========================================================================

type LogFile = Arc<Mutex<std::io::BufWriter<std::fs::File>>>;

fn open_log_file() -> Result<LogFile> {
    std::fs::create_dir_all("logs")?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("logs/tracker_{}.log", ts);
    let file = std::fs::File::create(&path)?;
    eprintln!("Log: {}", path);
    Ok(Arc::new(Mutex::new(std::io::BufWriter::new(file))))
}

macro_rules! log {
    ($logfile:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        eprintln!("{}", msg);
        if let Ok(mut f) = $logfile.lock() {
            let _ = writeln!(f, "{}", msg);
        }
    }};
}

// ===========================================================================
// Per-connection session
// ===========================================================================

/// Build the reply for one client message. Never touches the socket, so a
/// failure here can be reported without tearing the session down.
fn handle_message(
    counter: &mut RepCounter,
    msg: ClientMessage,
    now: Duration,
) -> ServerMessage {
    match msg {
        ClientMessage::Landmarks { points, .. } => {
            let set = LandmarkSet::from_pairs(&points);
            let detection = if set.is_empty() { None } else { Some(set) };
            ServerMessage::Update(counter.update(detection.as_ref(), now))
        }
        ClientMessage::NoDetection { .. } => {
            ServerMessage::Update(counter.update(None, now))
        }
        ClientMessage::Frame(_) => ServerMessage::Error {
            message: "no pose backend configured; send landmarks".to_string(),
        },
    }
}

async fn run_session(
    stream: tokio::net::TcpStream,
    addr: std::net::SocketAddr,
    server_config: ServerConfig,
    tracker_config: TrackerConfig,
    logfile: LogFile,
) -> Result<()> {
    let mut framed = protocol::message_stream(stream);

    // One fresh counter per session; the session epoch is its time origin.
    let session_epoch = Instant::now();
    let mut counter = RepCounter::new(&tracker_config, Duration::ZERO);
    let min_frame_interval = Duration::from_secs_f32(server_config.min_frame_interval_s);
    let mut last_processed: Option<Instant> = None;
    let mut dropped: u64 = 0;

    loop {
        let msg: ClientMessage = match protocol::recv_message(&mut framed).await {
            Ok(msg) => msg,
            Err(_) => {
                log!(logfile, "Client disconnected: {} (dropped {} frames)", addr, dropped);
                return Ok(());
            }
        };

        // Transport throttle: drop frames arriving faster than the minimum
        // interval. Correctness does not depend on this.
        if let Some(last) = last_processed {
            if last.elapsed() < min_frame_interval {
                dropped += 1;
                continue;
            }
        }
        last_processed = Some(Instant::now());

        let reply = handle_message(&mut counter, msg, session_epoch.elapsed());
        match &reply {
            ServerMessage::Update(update) => {
                if server_config.verbose {
                    if !update.feedback.is_empty() {
                        log!(logfile, "[{}] {} (count={}, set={})",
                            addr, update.feedback, update.pushup_count, update.set_count);
                    } else if update.landmarks.is_empty() && update.calibration_remaining == 0 {
                        // Required landmarks absent; counter state is preserved
                        log!(logfile, "[{}] missing pose landmarks, frame skipped", addr);
                    }
                }
            }
            ServerMessage::Error { message } => {
                log!(logfile, "[{}] processing error: {}", addr, message);
            }
        }
        protocol::send_message(&mut framed, &reply).await?;
    }
}

// ===========================================================================
// Main
// ===========================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);
    let logfile = open_log_file()?;

    log!(logfile, "Pushup Tracker Server ({})", env!("GIT_VERSION"));
    log!(logfile, "Listen: {}", config.server.listen_addr);
    log!(logfile, "Threshold angle: {} deg", config.tracker.threshold_angle);
    log!(logfile, "Rep debounce: {}s / set size: {} / calibration: {}s",
        config.tracker.min_rep_interval_s,
        config.tracker.set_size,
        config.tracker.calibration_window_s);
    if config.server.verbose {
        log!(logfile, "Verbose mode: ON");
    }

    let bind_addr: std::net::SocketAddr = config
        .server
        .listen_addr
        .parse()
        .context("invalid listen_addr")?;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    log!(logfile, "Listening on {}", bind_addr);
    log!(logfile, "");

    loop {
        let (tcp_stream, addr) = listener.accept().await?;
        tcp_stream.set_nodelay(true)?;
        log!(logfile, "Client connected: {}", addr);

        let server_config = config.server.clone();
        let tracker_config = config.tracker.clone();
        let task_logfile = Arc::clone(&logfile);
        tokio::spawn(async move {
            if let Err(e) =
                run_session(tcp_stream, addr, server_config, tracker_config, Arc::clone(&task_logfile)).await
            {
                log!(task_logfile, "Session error ({}): {}", addr, e);
            }
        });
    }
}
