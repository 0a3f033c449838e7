//! Local HTTP server standing in for the token endpoint and the Gmail API.

use std::{
    io::Write,
    sync::{Arc, Mutex},
    thread::JoinHandle,
    time::Duration,
};

use serde_json::json;
use tiny_http::{Header, Response, Server};

use crate::{config::ClientConfig, oauth::AppClient};

#[derive(Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub body: String,
}

pub struct MockServer {
    pub base_url: String,
    handle: JoinHandle<Vec<RecordedRequest>>,
}

impl MockServer {
    /// Answers one request per scripted response, in order.
    pub fn start(responses: Vec<(u16, serde_json::Value)>) -> Self {
        Self::start_raw(
            responses
                .into_iter()
                .map(|(status, body)| (status, body.to_string()))
                .collect(),
        )
    }

    /// Like [`MockServer::start`], with the response bodies sent verbatim.
    pub fn start_raw(responses: Vec<(u16, String)>) -> Self {
        let server = Server::http("127.0.0.1:0").expect("mock server should bind");
        let base_url = format!("http://{}", server.server_addr());

        let handle = std::thread::spawn(move || {
            let mut requests = Vec::with_capacity(responses.len());
            for (status, body) in responses {
                let mut request = match server.recv_timeout(Duration::from_secs(5)) {
                    Ok(Some(request)) => request,
                    _ => break,
                };

                let mut request_body = String::new();
                request
                    .as_reader()
                    .read_to_string(&mut request_body)
                    .expect("request body should be UTF-8");
                requests.push(RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    authorization: request
                        .headers()
                        .iter()
                        .find(|header| header.field.equiv("Authorization"))
                        .map(|header| header.value.to_string()),
                    body: request_body,
                });

                let content_type =
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("header should be valid");
                let response = Response::from_data(body)
                    .with_header(content_type)
                    .with_status_code(status);
                request.respond(response).expect("response should be sent");
            }
            requests
        });

        Self { base_url, handle }
    }

    pub fn finish(self) -> Vec<RecordedRequest> {
        self.handle.join().expect("mock server thread panicked")
    }
}

/// An OAuth client whose token endpoint is `{base_url}/token`.
pub fn client_for(base_url: &str) -> AppClient {
    let config: ClientConfig = serde_json::from_value(json!({
        "client_id": "client-id",
        "client_secret": "client-secret",
        "auth_uri": format!("{base_url}/auth"),
        "token_uri": format!("{base_url}/token"),
        "redirect_uris": ["http://localhost"]
    }))
    .expect("client configuration should be valid");
    config.client()
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .expect("log buffer lock poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with every log line on the current thread written to the returned string.
pub fn capture_logs<F>(f: F) -> String
where
    F: FnOnce(),
{
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);

    let logs = buffer.0.lock().expect("log buffer lock poisoned").clone();
    String::from_utf8(logs).expect("logs should be UTF-8")
}
