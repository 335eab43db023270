use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CitasError, Result};

/// One request shape for ordinary messages, greetings and resets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotRequest {
    #[serde(rename = "mensaje")]
    pub message: String,
    #[serde(rename = "user_id")]
    pub visitor_id: String,
}

impl BotRequest {
    pub fn new(message: impl Into<String>, visitor_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            visitor_id: visitor_id.into(),
        }
    }
}

#[derive(Deserialize)]
struct BotResponse {
    respuesta: String,
}

#[derive(Clone)]
pub struct BotClient {
    client: Client,
    base_url: String,
}

impl BotClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Post a message and return the reply text, directives included.
    pub async fn send(&self, request: &BotRequest) -> Result<String> {
        let url = format!("{}/api/bot", self.base_url);
        debug!(visitor = %request.visitor_id, message = %request.message, "sending to bot");

        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "bot request failed");
            return Err(CitasError::Status(response.status().as_u16()));
        }

        let bot_response: BotResponse = response.json().await?;
        debug!(visitor = %request.visitor_id, chars = bot_response.respuesta.len(), "bot replied");
        Ok(bot_response.respuesta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP exchange and hand back the request body.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            let request_body = loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    let body_bytes = &raw[split + 4..];
                    if body_bytes.len() >= length {
                        break String::from_utf8_lossy(body_bytes).to_string();
                    }
                }
                if n == 0 {
                    break String::new();
                }
            };

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request_body
        });

        (url, handle)
    }

    #[test]
    fn test_request_wire_format() {
        let request = BotRequest::new("hola", "user_abc123def");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"mensaje": "hola", "user_id": "user_abc123def"}));
    }

    #[tokio::test]
    async fn test_send_returns_reply_text() {
        let (url, server) =
            serve_once("200 OK", r#"{"respuesta": "¿Qué tipo de reunión prefieres? [MENU:Presencial|Videoconferencia]"}"#).await;
        let client = BotClient::new(&format!("{}/", url));

        let reply = client
            .send(&BotRequest::new("Agendar una cita", "user_000000001"))
            .await
            .unwrap();
        assert!(reply.ends_with("[MENU:Presencial|Videoconferencia]"));

        let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(sent["mensaje"], "Agendar una cita");
        assert_eq!(sent["user_id"], "user_000000001");
    }

    #[tokio::test]
    async fn test_error_status_is_transport_failure() {
        let (url, _server) = serve_once("500 Internal Server Error", "{}").await;
        let err = BotClient::new(&url)
            .send(&BotRequest::new("hola", "user_x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CitasError::Status(500)));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_undecodable_body_is_transport_failure() {
        let (url, _server) = serve_once("200 OK", r#"{"otra": 1}"#).await;
        let err = BotClient::new(&url)
            .send(&BotRequest::new("hola", "user_x"))
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_unreachable_bot_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = BotClient::new(&url)
            .send(&BotRequest::new("hola", "user_x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CitasError::Transport(_)));
    }
}
