//! # Line-delimited JSON session over TCP.
//!
//! Every primitive is one request line answered by one response line:
//!
//! ```text
//! → {"id":3,"op":"open_url","url":"https://example.test/"}
//! ← {"id":3,"ok":true,"tab":7}
//! → {"id":4,"op":"click","role":"button","name":"Go"}
//! ← {"id":4,"ok":false,"error":"node not found"}
//! ```
//!
//! The connection opens with a `hello` exchange; the backend may announce its
//! unlock window as `auth_timeout_ms`.
//!
//! Replies to abandoned calls (a caller dropped the future after the request
//! went out) are read and discarded by the next call: ids only grow, so any
//! reply older than the current request is stale.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::SessionError;
use crate::metrics::Histogram;
use crate::session::{DEFAULT_AUTH_TIMEOUT, NodeQuery, Session, TabId};

struct Conn {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    tab: Option<u64>,
    #[serde(default)]
    histograms: Option<Vec<Histogram>>,
    #[serde(default)]
    auth_timeout_ms: Option<u64>,
}

/// Session backed by a remote automation daemon.
pub struct RemoteSession {
    endpoint: String,
    auth_timeout: Duration,
    next_id: AtomicU64,
    conn: Mutex<Conn>,
}

impl RemoteSession {
    /// Connects to `addr` (`host:port`) and performs the `hello` exchange.
    pub async fn connect(endpoint: impl Into<String>, addr: &str) -> Result<Self, SessionError> {
        let endpoint = endpoint.into();
        let connect_err = |reason: String| SessionError::Connect {
            endpoint: endpoint.clone(),
            reason,
        };

        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| connect_err(e.to_string()))?;
        let (read, write) = stream.into_split();

        let mut session = Self {
            endpoint: endpoint.clone(),
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            next_id: AtomicU64::new(1),
            conn: Mutex::new(Conn {
                reader: BufReader::new(read),
                writer: write,
            }),
        };

        let hello = session
            .call("hello", json!({}))
            .await
            .map_err(|e| connect_err(e.to_string()))?;
        if let Some(ms) = hello.auth_timeout_ms {
            session.auth_timeout = Duration::from_millis(ms);
        }
        debug!(endpoint = %session.endpoint, auth_timeout = ?session.auth_timeout, "remote session ready");
        Ok(session)
    }

    async fn call(&self, op: &'static str, params: Value) -> Result<Response, SessionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut msg = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        msg.insert("id".into(), id.into());
        msg.insert("op".into(), op.into());

        let mut line = Value::Object(msg).to_string();
        line.push('\n');

        let mut conn = self.conn.lock().await;
        conn.writer.write_all(line.as_bytes()).await?;
        conn.writer.flush().await?;

        let resp = loop {
            let mut reply = String::new();
            if conn.reader.read_line(&mut reply).await? == 0 {
                return Err(SessionError::Protocol {
                    reason: format!("connection closed awaiting reply to {op}"),
                });
            }
            let resp: Response = serde_json::from_str(reply.trim_end()).map_err(|e| {
                SessionError::Protocol {
                    reason: format!("bad reply to {op}: {e}"),
                }
            })?;
            match resp.id.cmp(&id) {
                std::cmp::Ordering::Less => {
                    debug!(endpoint = %self.endpoint, stale = resp.id, request = id, "discarding stale reply");
                }
                std::cmp::Ordering::Equal => break resp,
                std::cmp::Ordering::Greater => {
                    return Err(SessionError::Protocol {
                        reason: format!("reply id {} is ahead of request {id}", resp.id),
                    });
                }
            }
        };
        drop(conn);

        if !resp.ok {
            return Err(SessionError::Rejected {
                op,
                reason: resp.error.unwrap_or_else(|| "unspecified".into()),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl Session for RemoteSession {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn open_url(&self, url: &str) -> Result<TabId, SessionError> {
        let resp = self.call("open_url", json!({ "url": url })).await?;
        resp.tab.map(TabId).ok_or_else(|| SessionError::Protocol {
            reason: "open_url reply has no tab".into(),
        })
    }

    async fn close_tab(&self, tab: TabId) -> Result<(), SessionError> {
        self.call("close_tab", json!({ "tab": tab })).await.map(drop)
    }

    async fn lock_screen(&self) -> Result<(), SessionError> {
        self.call("lock_screen", json!({})).await.map(drop)
    }

    async fn unlock_screen(&self, credential: &str) -> Result<(), SessionError> {
        self.call("unlock_screen", json!({ "credential": credential }))
            .await
            .map(drop)
    }

    async fn click(&self, query: &NodeQuery) -> Result<(), SessionError> {
        let params = serde_json::to_value(query).map_err(|e| SessionError::Protocol {
            reason: e.to_string(),
        })?;
        self.call("click", params).await.map(drop)
    }

    fn auth_timeout(&self) -> Duration {
        self.auth_timeout
    }

    async fn histograms(&self, names: &[String]) -> Result<Vec<Histogram>, SessionError> {
        let resp = self.call("histograms", json!({ "names": names })).await?;
        resp.histograms.ok_or_else(|| SessionError::Protocol {
            reason: "histograms reply has no histograms".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Serves one connection, answering each request with `answer(request)`.
    async fn serve<F>(answer: F) -> String
    where
        F: Fn(&Value) -> Value + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let req: Value = serde_json::from_str(&line).unwrap();
                let mut reply = answer(&req);
                if reply.get("id").is_none() {
                    reply["id"] = req["id"].clone();
                }
                let mut out = reply.to_string();
                out.push('\n');
                if write.write_all(out.as_bytes()).await.is_err() {
                    break;
                }
            }
        });
        addr
    }

    fn daemon(req: &Value) -> Value {
        match req["op"].as_str().unwrap_or("") {
            "hello" => json!({ "ok": true, "auth_timeout_ms": 1500 }),
            "open_url" => json!({ "ok": true, "tab": 7 }),
            "click" if req["name"] == "Missing" => json!({ "ok": false, "error": "node not found" }),
            "histograms" => json!({
                "ok": true,
                "histograms": [{ "name": "H", "sum": 4, "buckets": [{ "min": 1, "max": 3, "count": 2 }] }]
            }),
            _ => json!({ "ok": true }),
        }
    }

    #[tokio::test]
    async fn test_round_trips_primitives() {
        let addr = serve(daemon).await;
        let s = RemoteSession::connect(format!("tcp://{addr}"), &addr).await.unwrap();
        assert_eq!(s.auth_timeout(), Duration::from_millis(1500));

        let tab = s.open_url("https://example.test/").await.unwrap();
        assert_eq!(tab, TabId(7));
        s.close_tab(tab).await.unwrap();
        s.lock_screen().await.unwrap();

        let hist = s.histograms(&["H".to_string()]).await.unwrap();
        assert_eq!(hist[0].total_count(), 2);
    }

    #[tokio::test]
    async fn test_rejection_carries_backend_reason() {
        let addr = serve(daemon).await;
        let s = RemoteSession::connect("tcp://test", &addr).await.unwrap();
        let query = NodeQuery {
            name: Some("Missing".into()),
            ..Default::default()
        };
        match s.click(&query).await.unwrap_err() {
            SessionError::Rejected { op, reason } => {
                assert_eq!(op, "click");
                assert_eq!(reason, "node not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_reply_ahead_of_request_is_protocol_error() {
        let addr = serve(|req| {
            if req["op"] == "hello" {
                json!({ "ok": true })
            } else {
                json!({ "ok": true, "id": 99, "tab": 1 })
            }
        })
        .await;
        let s = RemoteSession::connect("tcp://test", &addr).await.unwrap();
        let err = s.open_url("x").await.unwrap_err();
        assert_eq!(err.as_label(), "session_protocol");
    }

    /// Like `serve(daemon)`, but holds every `click` reply back for 300ms.
    async fn serve_slow_click() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let req: Value = serde_json::from_str(&line).unwrap();
                if req["op"] == "click" {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                }
                let mut reply = daemon(&req);
                reply["id"] = req["id"].clone();
                let mut out = reply.to_string();
                out.push('\n');
                if write.write_all(out.as_bytes()).await.is_err() {
                    break;
                }
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_abandoned_call_does_not_desync_connection() {
        let addr = serve_slow_click().await;
        let s = RemoteSession::connect("tcp://slow", &addr).await.unwrap();
        let tab = s.open_url("https://example.test/").await.unwrap();
        let query = NodeQuery {
            role: Some("button".into()),
            ..Default::default()
        };
        let abandoned = tokio::time::timeout(Duration::from_millis(100), s.click(&query)).await;
        assert!(abandoned.is_err());

        s.close_tab(tab).await.unwrap();
        s.lock_screen().await.unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_after_cancelled_click_succeeds() {
        use std::sync::Arc;
        use tokio_util::sync::CancellationToken;

        use crate::session::SessionRef;
        use crate::{Journey, Registry, Runner};

        let addr = serve_slow_click().await;
        let session: SessionRef = Arc::new(RemoteSession::connect("tcp://slow", &addr).await.unwrap());
        let journey = Journey::from_json(
            r#"[{"action":"OpenUrl","args":{"url":"https://example.test/"},"start":"0s"},
                {"action":"ClickUI","args":{"role":"button"},"start":"+0s"}]"#,
        )
        .unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = Runner::new(Registry::with_builtins())
            .run(&journey, &token, &session)
            .await
            .unwrap_err();
        assert!(err.error.is_cancelled());
        assert_eq!(err.error.position().map(|p| p.index), Some(1));
        assert!(err.cleanup.is_empty(), "{err}");
    }

    #[tokio::test]
    async fn test_refused_connection_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        let err = RemoteSession::connect("tcp://gone", &addr).await.err().unwrap();
        assert_eq!(err.as_label(), "session_connect");
    }
}
