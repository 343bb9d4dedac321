//! Mock realtime server for integration tests.
//!
//! Accepts WebSocket connections, records inbound text frames and lets the
//! test push frames, close sessions or stop answering.

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Debug, Clone)]
enum Command {
    Push(String),
    /// Send a Close frame, then hang up.
    Close,
    /// Hang up without a Close frame.
    Drop,
    /// Stop reading (and so stop answering pings).
    Stall,
}

pub struct MockWsServer {
    addr: SocketAddr,
    accept_task: Option<JoinHandle<()>>,
    commands: broadcast::Sender<Command>,
    messages: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicU32>,
}

impl MockWsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (commands, _) = broadcast::channel(64);
        let messages = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicU32::new(0));

        let commands_clone = commands.clone();
        let messages_clone = messages.clone();
        let connections_clone = connections.clone();
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                connections_clone.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(handle_connection(
                    stream,
                    commands_clone.subscribe(),
                    messages_clone.clone(),
                ));
            }
        });

        Self {
            addr,
            accept_task: Some(accept_task),
            commands,
            messages,
            connections,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn connection_count(&self) -> u32 {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn received_messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Send a text frame to every live session.
    pub fn push(&self, frame: serde_json::Value) {
        let _ = self.commands.send(Command::Push(frame.to_string()));
    }

    pub fn close_all(&self) {
        let _ = self.commands.send(Command::Close);
    }

    pub fn drop_all(&self) {
        let _ = self.commands.send(Command::Drop);
    }

    pub fn stall_all(&self) {
        let _ = self.commands.send(Command::Stall);
    }

    /// Stop listening; later connects are refused.
    pub async fn stop_accepting(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
        let _ = self.commands.send(Command::Drop);
    }
}

async fn handle_connection(
    stream: TcpStream,
    mut commands: broadcast::Receiver<Command>,
    messages: Arc<Mutex<Vec<String>>>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {e}");
            return;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => messages.lock().push(text),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            },
            command = commands.recv() => match command {
                Ok(Command::Push(text)) => {
                    if write.send(Message::Text(text)).await.is_err() {
                        return;
                    }
                }
                Ok(Command::Close) => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "server restart".into(),
                    };
                    let _ = write.send(Message::Close(Some(frame))).await;
                    return;
                }
                Ok(Command::Drop) | Err(_) => return,
                Ok(Command::Stall) => std::future::pending::<()>().await,
            },
        }
    }
}
