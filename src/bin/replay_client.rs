//! Replay client: streams a recorded landmark session (JSON lines) to the
//! tracker server with the original pacing and prints each update.
//!
//! Record format, one frame per line:
//!   {"t_ms": 120, "points": [[x, y], ...]}
//!   {"t_ms": 240, "missing": true}

use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use futures::{SinkExt as _, StreamExt as _};
use serde::Deserialize;

use pushup_tracker::protocol::{self, ClientMessage, ServerMessage};

#[derive(Debug, Deserialize)]
struct RecordedFrame {
    t_ms: u64,
    #[serde(default)]
    points: Vec<[f32; 2]>,
    #[serde(default)]
    missing: bool,
}

fn load_recording(path: &str) -> Result<Vec<RecordedFrame>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path))?;
    let mut frames = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let frame: RecordedFrame = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: bad frame record", path, lineno + 1))?;
        frames.push(frame);
    }
    Ok(frames)
}

fn print_reply(reply: &ServerMessage) {
    match reply {
        ServerMessage::Update(update) => {
            println!(
                "count={}  set={}  calibration_remaining={}  {}",
                update.pushup_count,
                update.set_count,
                update.calibration_remaining,
                update.feedback
            );
        }
        ServerMessage::Error { message } => {
            eprintln!("server error: {}", message);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        bail!("usage: {} <recording.jsonl> [server_addr]", args[0]);
    }
    let recording_path = &args[1];
    let server_addr = args
        .get(2)
        .map(String::as_str)
        .unwrap_or("127.0.0.1:9000");

    let frames = load_recording(recording_path)?;
    if frames.is_empty() {
        bail!("empty recording: {}", recording_path);
    }
    eprintln!("{}: {} frames", recording_path, frames.len());

    let stream = tokio::net::TcpStream::connect(server_addr)
        .await
        .with_context(|| format!("failed to connect to {}", server_addr))?;
    stream.set_nodelay(true)?;
    let framed = protocol::message_stream(stream);
    let (mut sink, mut reader) = framed.split();
    eprintln!("Connected to {}", server_addr);

    // Throttled frames get no reply, so replies are read independently of
    // the send pacing.
    let reader_task = tokio::spawn(async move {
        while let Some(result) = reader.next().await {
            match result {
                Ok(bytes) => match bincode::deserialize::<ServerMessage>(&bytes) {
                    Ok(reply) => print_reply(&reply),
                    Err(e) => eprintln!("bad server message: {}", e),
                },
                Err(e) => {
                    eprintln!("read error: {}", e);
                    break;
                }
            }
        }
    });

    let mut prev_t_ms = frames[0].t_ms;
    for frame in &frames {
        // Recorded pacing
        if frame.t_ms > prev_t_ms {
            tokio::time::sleep(Duration::from_millis(frame.t_ms - prev_t_ms)).await;
        }
        prev_t_ms = frame.t_ms;

        let timestamp_us = frame.t_ms * 1000;
        let msg = if frame.missing {
            ClientMessage::NoDetection { timestamp_us }
        } else {
            ClientMessage::Landmarks {
                timestamp_us,
                points: frame.points.clone(),
            }
        };
        let data = bincode::serialize(&msg)?;
        sink.send(Bytes::from(data)).await?;
    }

    // Give in-flight replies a moment to arrive, then close.
    tokio::time::sleep(Duration::from_millis(200)).await;
    sink.close().await?;
    reader_task.abort();

    Ok(())
}
