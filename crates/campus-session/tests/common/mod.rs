//! In-process mock of the Campus API server.

#![allow(dead_code, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Json, Path, State};
use axum::routing::post;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use url::Url;

use campus_crypto::kdf::hkdf_credential;
use campus_crypto::{SymmetricCredential, asymmetric, symmetric};
use campus_session::{HttpTransport, SessionContext, TransportSecurity};

pub const API_VERSION: &str = "1.2.0";

/// How the mock answers `/handshake`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeMode {
    Grant,
    Reject(&'static str),
    CorruptCiphertext,
    MissingApiVersion,
}

pub struct MockState {
    pub handshake: HandshakeMode,
    /// Key handed out in the session grant.
    pub session_key: String,
    /// Credential the server seals application payloads with.
    pub credential: SymmetricCredential,
    /// Whether application routes exchange ciphertext.
    pub encrypt: bool,
    handshakes: AtomicUsize,
    last_handshake: Mutex<Option<Value>>,
    last_call: Mutex<Option<Value>>,
}

impl MockState {
    /// Server issuing a directly usable 96-hex credential.
    pub fn direct(encrypt: bool) -> Self {
        let credential = SymmetricCredential::generate();
        Self::new(credential.to_hex(), credential, encrypt)
    }

    /// Server issuing an opaque key that both sides run through HKDF.
    pub fn hkdf(encrypt: bool) -> Self {
        let key = "opaque-server-session-key".to_string();
        let credential = hkdf_credential(key.as_bytes()).unwrap();
        Self::new(key, credential, encrypt)
    }

    pub fn new(session_key: String, credential: SymmetricCredential, encrypt: bool) -> Self {
        Self {
            handshake: HandshakeMode::Grant,
            session_key,
            credential,
            encrypt,
            handshakes: AtomicUsize::new(0),
            last_handshake: Mutex::new(None),
            last_call: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn with_handshake(mut self, mode: HandshakeMode) -> Self {
        self.handshake = mode;
        self
    }
}

pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockServer {
    pub async fn spawn(state: MockState) -> Self {
        let state = Arc::new(state);
        let app = Router::new()
            .route("/handshake", post(handshake))
            .route("/{*route}", post(call))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    pub fn transport(&self, security: TransportSecurity) -> Arc<HttpTransport> {
        Arc::new(HttpTransport::with_security(self.url(), security).unwrap())
    }

    pub fn handshake_count(&self) -> usize {
        self.state.handshakes.load(Ordering::SeqCst)
    }

    pub fn last_handshake_body(&self) -> Option<Value> {
        self.state.last_handshake.lock().unwrap().clone()
    }

    pub fn last_call_body(&self) -> Option<Value> {
        self.state.last_call.lock().unwrap().clone()
    }
}

pub fn new_context() -> Arc<SessionContext> {
    Arc::new(SessionContext::new())
}

async fn handshake(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Json<Value> {
    let n = state.handshakes.fetch_add(1, Ordering::SeqCst) + 1;
    *state.last_handshake.lock().unwrap() = Some(body.clone());

    let grant = json!({"id": format!("s-{n}"), "key": state.session_key});
    let data = match body.get("userPublicKey").and_then(Value::as_str) {
        None => grant,
        Some(encoded) => {
            let pem = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
            let mut ciphertext = asymmetric::encrypt(&grant.to_string(), &pem).unwrap();
            if state.handshake == HandshakeMode::CorruptCiphertext {
                let mut raw = STANDARD.decode(&ciphertext).unwrap();
                raw[10] ^= 0xff;
                ciphertext = STANDARD.encode(raw);
            }
            Value::String(ciphertext)
        }
    };

    Json(match state.handshake {
        HandshakeMode::Reject(msg) => json!({"success": false, "msg": msg}),
        HandshakeMode::MissingApiVersion => json!({"success": true, "data": data}),
        HandshakeMode::Grant | HandshakeMode::CorruptCiphertext => {
            json!({"success": true, "api_version": API_VERSION, "data": data})
        }
    })
}

async fn call(
    State(state): State<Arc<MockState>>,
    Path(route): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    *state.last_call.lock().unwrap() = Some(body.clone());

    let payload = match &body["data"] {
        Value::String(ciphertext) if state.encrypt => {
            let plaintext = symmetric::decrypt(ciphertext, &state.credential).unwrap();
            serde_json::from_slice(&plaintext).unwrap()
        }
        other => other.clone(),
    };

    let reply = match route.as_str() {
        "ping" => return Json(json!({"success": true, "data": {"pong": true}})),
        "not-found" => return Json(json!({"success": false, "msg": "not found"})),
        "nothing" => return Json(json!({"success": true})),
        "garbage" => return Json(json!({"success": true, "data": "AAAAAAAAAAAAAAAAAAAAAA=="})),
        "get-student-by-id" => json!({"id": payload["id"], "name": "Ada"}),
        "echo" => payload,
        "slow" => {
            tokio::time::sleep(Duration::from_millis(800)).await;
            payload
        }
        "sign-in" => {
            if payload["id"] == "u-42" && payload["password"] == "hunter2" {
                json!({"token": "tok-1"})
            } else {
                return Json(json!({"success": false, "msg": "bad credentials"}));
            }
        }
        "get-token-state" => json!({"valid": payload["tokenToCheck"] == "tok-1"}),
        _ => return Json(json!({"success": false, "msg": "unknown route"})),
    };

    let data = if state.encrypt {
        Value::String(symmetric::encrypt(reply.to_string().as_bytes(), &state.credential).unwrap())
    } else {
        reply
    };
    Json(json!({"success": true, "data": data}))
}
