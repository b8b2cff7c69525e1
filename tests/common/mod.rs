//! Shared utilities for integration testing.
//!
//! `start_rpc_server` stands up a JSON-RPC 2.0 endpoint on an ephemeral port
//! and answers every request through a scripted handler.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What a handler answers: a result, or a JSON-RPC error `(code, message)`.
pub type RpcReply = Result<Value, (i64, String)>;

/// A running mock endpoint.
#[derive(Clone)]
pub struct MockRpc {
    pub url: String,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockRpc {
    /// Every `(method, params)` received so far, in arrival order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    /// Methods received so far, in arrival order.
    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(method, _)| method).collect()
    }

    /// Params of the first call to `method`.
    pub fn params_of(&self, method: &str) -> Option<Value> {
        self.calls()
            .into_iter()
            .find(|(m, _)| m == method)
            .map(|(_, params)| params)
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|(m, _)| m == method).count()
    }
}

/// Start a JSON-RPC server that answers through `handler`.
///
/// Absent `params` are passed to the handler as an empty array.
pub async fn start_rpc_server<F>(handler: F) -> MockRpc
where
    F: Fn(&str, &Value) -> RpcReply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);
    let calls = Arc::new(Mutex::new(Vec::new()));

    let mock = MockRpc {
        url: format!("http://{}", addr),
        calls: calls.clone(),
    };

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let handler = handler.clone();
                    let calls = calls.clone();
                    tokio::spawn(async move {
                        let _ = serve_connection(socket, handler, calls).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    mock
}

async fn serve_connection<F>(
    mut socket: TcpStream,
    handler: Arc<F>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
) -> std::io::Result<()>
where
    F: Fn(&str, &Value) -> RpcReply + Send + Sync + 'static,
{
    let body = read_request_body(&mut socket).await?;
    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let response = if let Value::Array(batch) = &request {
        Value::Array(
            batch
                .iter()
                .map(|req| answer(req, handler.as_ref(), &calls))
                .collect(),
        )
    } else {
        answer(&request, handler.as_ref(), &calls)
    };

    let payload = response.to_string();
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        payload.len()
    );
    socket.write_all(head.as_bytes()).await?;
    socket.write_all(payload.as_bytes()).await?;
    socket.shutdown().await
}

fn answer<F>(request: &Value, handler: &F, calls: &Mutex<Vec<(String, Value)>>) -> Value
where
    F: Fn(&str, &Value) -> RpcReply,
{
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let params = request.get("params").cloned().unwrap_or_else(|| json!([]));

    calls.lock().unwrap().push((method.clone(), params.clone()));

    match handler(&method, &params) {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        }),
    }
}

async fn read_request_body(socket: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(Vec::new());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let end = (body_start + content_length).min(buf.len());
    Ok(buf[body_start..end].to_vec())
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Left-pad `bytes` into one 32-byte ABI word, hex-encoded with `0x`.
pub fn abi_word(bytes: &[u8]) -> String {
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(bytes);
    format!("0x{}", hex_string(&word))
}

pub fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// First four bytes of an `eth_call` input, hex without `0x`.
///
/// Accepts both the `input` and legacy `data` field names.
pub fn call_selector(params: &Value) -> String {
    let tx = &params[0];
    let input = tx
        .get("input")
        .or_else(|| tx.get("data"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    input.trim_start_matches("0x").chars().take(8).collect()
}

/// Target address of an `eth_call`, lowercased.
pub fn call_target(params: &Value) -> String {
    params[0]
        .get("to")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_ascii_lowercase()
}
