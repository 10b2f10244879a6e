//! TCP protocol for client ↔ tracker-server communication.
//!
//! Self-contained: message types only depend on `counter::TrackerUpdate`.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::counter::TrackerUpdate;

// --- Message types ---

/// Client → server
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ClientMessage {
    /// Client-side detection result. Index = MediaPipe landmark id,
    /// a NaN coordinate pair marks an absent point.
    Landmarks {
        timestamp_us: u64,
        points: Vec<[f32; 2]>,
    },
    /// Detector ran but found no person in the frame.
    NoDetection { timestamp_us: u64 },
    /// Raw frame for a server-side pose backend, when one is configured.
    Frame(Frame),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Frame {
    pub timestamp_us: u64,
    pub width: u16,
    pub height: u16,
    pub jpeg_data: Vec<u8>,
}

/// Server → client
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ServerMessage {
    Update(TrackerUpdate),
    /// Generic processing failure. The session stays alive.
    Error { message: String },
}

// --- TCP codec helpers ---

pub type MessageStream = Framed<TcpStream, LengthDelimitedCodec>;

/// Create a framed message stream with length-delimited framing.
pub fn message_stream(stream: TcpStream) -> MessageStream {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(16 * 1024 * 1024) // 16MB
        .new_codec();
    Framed::new(stream, codec)
}

/// Send a serializable message (bincode + length prefix).
pub async fn send_message<T: Serialize>(
    stream: &mut MessageStream,
    msg: &T,
) -> anyhow::Result<()> {
    let data = bincode::serialize(msg)?;
    stream.send(Bytes::from(data)).await?;
    Ok(())
}

/// Receive and deserialize a message.
pub async fn recv_message<T: DeserializeOwned>(
    stream: &mut MessageStream,
) -> anyhow::Result<T> {
    match stream.next().await {
        Some(Ok(bytes)) => Ok(bincode::deserialize(&bytes)?),
        Some(Err(e)) => Err(e.into()),
        None => Err(anyhow::anyhow!("connection closed")),
    }
}
