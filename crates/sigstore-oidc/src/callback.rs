//! Loopback redirect server for the authorization code flow
//!
//! The server speaks just enough HTTP/1.1 for a browser:
//! - `/` redirects to the authorization URL, so the browser can be launched
//!   with a short local URL
//! - [`CALLBACK_PATH`] captures the provider's redirect parameters
//!
//! The first callback is handed to the driver through a one-shot channel.
//! Dropping the [`CallbackServer`] stops the server and every connection it
//! is still serving.

use crate::error::{Error, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

/// Path the provider redirects back to
pub const CALLBACK_PATH: &str = "/auth/callback";

const SUCCESS_HTML: &str = "<!DOCTYPE html><html><head><title>Sigstore</title></head>\
<body><h1>Authentication successful!</h1>\
<p>You may now close this page.</p></body></html>";

type ResponseSlot = Arc<Mutex<Option<oneshot::Sender<AuthorizationResponse>>>>;

/// Query parameters delivered to the redirect URI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationResponse {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl AuthorizationResponse {
    /// Collect the OAuth parameters from a redirect URL
    pub fn from_url(url: &Url) -> Self {
        let mut response = Self::default();
        for (key, value) in url.query_pairs() {
            let slot = match key.as_ref() {
                "code" => &mut response.code,
                "state" => &mut response.state,
                "error" => &mut response.error,
                "error_description" => &mut response.error_description,
                _ => continue,
            };
            // First occurrence wins
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        response
    }
}

/// A bound, not yet serving, loopback listener
///
/// Binding comes first because the redirect URI has to contain the port
/// before the authorization URL can be built.
pub struct CallbackListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl CallbackListener {
    /// Bind an ephemeral port on 127.0.0.1
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .map_err(|e| Error::io("starting the local callback server", e))?;
        let addr = listener
            .local_addr()
            .map_err(|e| Error::io("reading the callback server address", e))?;
        tracing::debug!("callback server bound to {}", addr);
        Ok(Self { listener, addr })
    }

    /// The local address
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The redirect URI to register with the provider
    pub fn redirect_uri(&self) -> String {
        format!("http://{}{}", self.addr, CALLBACK_PATH)
    }

    /// Start serving; `/` will redirect to `authorization_url`
    pub fn start(self, authorization_url: String) -> CallbackServer {
        let (tx, rx) = oneshot::channel();
        let slot: ResponseSlot = Arc::new(Mutex::new(Some(tx)));
        let task = tokio::spawn(serve(self.listener, authorization_url, slot));
        CallbackServer {
            addr: self.addr,
            task,
            response: Some(rx),
        }
    }
}

/// A running callback server
pub struct CallbackServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
    response: Option<oneshot::Receiver<AuthorizationResponse>>,
}

impl CallbackServer {
    /// URL to open in the browser; it redirects to the authorization URL
    pub fn base_uri(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// The redirect URI this server answers on
    pub fn redirect_uri(&self) -> String {
        format!("http://{}{}", self.addr, CALLBACK_PATH)
    }

    /// Wait for the provider's redirect
    ///
    /// There is no timeout; the caller decides when to give up.
    pub async fn wait_for_response(&mut self) -> Result<AuthorizationResponse> {
        let rx = self
            .response
            .take()
            .ok_or_else(|| Error::Authorization("callback response already consumed".into()))?;
        rx.await.map_err(|_| {
            Error::Authorization("callback server stopped before a response arrived".into())
        })
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!("callback server on {} shut down", self.addr);
    }
}

async fn serve(listener: TcpListener, authorization_url: String, slot: ResponseSlot) {
    let authorization_url: Arc<str> = authorization_url.into();
    // Connections live in the set so aborting this task aborts them too
    let mut connections = JoinSet::new();
    loop {
        while connections.try_join_next().is_some() {}

        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("callback server failed to accept connection: {}", e);
                continue;
            }
        };

        let authorization_url = authorization_url.clone();
        let slot = slot.clone();
        connections.spawn(async move {
            if let Err(e) = handle_connection(stream, &authorization_url, &slot).await {
                tracing::debug!("callback connection from {} failed: {}", peer, e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    authorization_url: &str,
    slot: &ResponseSlot,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    loop {
        let mut header = String::new();
        let n = reader.read_line(&mut header).await?;
        if n == 0 || header.trim_end().is_empty() {
            break;
        }
    }

    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
    let url = Url::parse(&format!("http://localhost{}", target)).ok();

    let mut captured = None;
    let response = match url {
        Some(url) if url.path() == "/" => redirect(authorization_url),
        Some(url) if url.path() == CALLBACK_PATH => {
            let auth = AuthorizationResponse::from_url(&url);
            let page = match &auth.error {
                Some(error) => {
                    let reason = auth.error_description.as_deref().unwrap_or(error);
                    html("400 Bad Request", &error_html(reason))
                }
                None => html("200 OK", SUCCESS_HTML),
            };
            captured = Some(auth);
            page
        }
        _ => html("404 Not Found", "<html><body>Not found</body></html>"),
    };

    let written: std::io::Result<()> = async {
        writer.write_all(response.as_bytes()).await?;
        writer.flush().await?;
        writer.shutdown().await
    }
    .await;

    // Hand off only after the browser has its page; the driver may tear the
    // server down as soon as it receives the response.
    if let Some(auth) = captured {
        let sender = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        match sender {
            Some(tx) => {
                let _ = tx.send(auth);
            }
            None => tracing::debug!("ignoring repeated OAuth callback"),
        }
    }

    written
}

fn redirect(location: &str) -> String {
    format!(
        "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        location
    )
}

fn html(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

fn error_html(reason: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Sigstore</title></head>\
         <body><h1>Authentication failed</h1><p>{}</p></body></html>",
        html_escape(reason)
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
