//! ComfyUI HTTP client
//!
//! Talks to a ComfyUI server's queue API: `POST /prompt`,
//! `GET /history/{id}` and `GET /view`. Each call is a single blocking
//! request; polling and timeouts are the pipeline's job.

use crate::config::MuseumConfig;
use crate::service::{AssetLocator, GenerationService, ServiceStatus};
use crate::workflow::GenerationRequest;
use museum_core::{Result, ServiceFailure};
use std::io::Read;
use std::time::Duration;
use ureq::http::Response;
use ureq::Body;

/// Longest error body kept in a `ServiceFailure::Status`
const MAX_ERROR_BODY: usize = 512;

/// Client for one ComfyUI server
pub struct ComfyUiService {
    base_url: String,
    client_id: String,
    agent: ureq::Agent,
}

impl ComfyUiService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client_id: uuid::Uuid::new_v4().to_string(),
            agent: build_agent(timeout),
        }
    }

    pub fn from_config(config: &MuseumConfig) -> Self {
        Self::new(
            config.service.url.clone(),
            Duration::from_secs(config.service.timeout_secs),
        )
    }

    /// Session id sent with every submission
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    // ComfyUI runs on the local network; environment proxies are not used
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .proxy(None)
        .build();
    config.into()
}

fn transport(e: ureq::Error) -> ServiceFailure {
    ServiceFailure::Transport(e.to_string())
}

/// Pass 2xx responses through; turn anything else into a status failure
fn check_status(
    mut response: Response<Body>,
) -> std::result::Result<Response<Body>, ServiceFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.body_mut().read_to_string().unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(ServiceFailure::Status {
        code: status.as_u16(),
        body,
    })
}

fn read_json(
    mut response: Response<Body>,
) -> std::result::Result<serde_json::Value, ServiceFailure> {
    response
        .body_mut()
        .read_json()
        .map_err(|e| ServiceFailure::Malformed(format!("invalid JSON body: {}", e)))
}

impl GenerationService for ComfyUiService {
    fn name(&self) -> &str {
        "comfyui"
    }

    fn health_check(&self) -> Result<ServiceStatus> {
        let status = match self.agent.get(&self.url("/system_stats")).call() {
            Ok(response) => match check_status(response) {
                Ok(_) => ServiceStatus::Available,
                Err(failure) => ServiceStatus::Unavailable(failure.to_string()),
            },
            Err(e) => ServiceStatus::Unavailable(e.to_string()),
        };
        Ok(status)
    }

    fn submit_prompt(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<serde_json::Value, ServiceFailure> {
        let payload = serde_json::json!({
            "prompt": request.to_prompt(),
            "client_id": self.client_id,
        });
        tracing::debug!(url = %self.url("/prompt"), stages = request.stages().len(), "posting workflow");

        let response = self
            .agent
            .post(&self.url("/prompt"))
            .send_json(&payload)
            .map_err(transport)?;
        read_json(check_status(response)?)
    }

    fn history(&self, prompt_id: &str) -> std::result::Result<serde_json::Value, ServiceFailure> {
        let response = self
            .agent
            .get(&self.url(&format!("/history/{}", prompt_id)))
            .call()
            .map_err(transport)?;
        read_json(check_status(response)?)
    }

    fn view(&self, locator: &AssetLocator) -> std::result::Result<Vec<u8>, ServiceFailure> {
        let response = self
            .agent
            .get(&self.url("/view"))
            .query_pairs(locator.query())
            .call()
            .map_err(transport)?;
        let response = check_status(response)?;

        let mut reader = response.into_body().into_reader();
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| ServiceFailure::Transport(format!("Failed to read image data: {}", e)))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::services::mock::solid_png;
    use crate::workflow::TextToImage;
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};
    use std::thread::JoinHandle;

    struct Canned {
        status: &'static str,
        content_type: &'static str,
        body: Vec<u8>,
    }

    fn json_reply(body: serde_json::Value) -> Canned {
        Canned {
            status: "200 OK",
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }

    /// Serve one canned reply per connection; yields "<request line>\n<body>" per request
    fn serve(replies: Vec<Canned>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for reply in replies {
                let (mut stream, _) = listener.accept().unwrap();
                seen.push(read_request(&mut stream));
                write!(
                    stream,
                    "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    reply.status,
                    reply.content_type,
                    reply.body.len()
                )
                .unwrap();
                stream.write_all(&reply.body).unwrap();
                stream.flush().unwrap();
            }
            seen
        });
        (base, handle)
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
            if n == 0 {
                break buf.len();
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok());
        let chunked = head.contains("transfer-encoding: chunked");

        loop {
            let body = &buf[header_end..];
            let complete = match content_length {
                Some(len) => body.len() >= len,
                None if chunked => find(body, b"0\r\n\r\n").is_some(),
                None => true,
            };
            if complete {
                break;
            }
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let request_line = String::from_utf8_lossy(&buf[..header_end])
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        format!("{}\n{}", request_line, String::from_utf8_lossy(&buf[header_end..]))
    }

    /// The JSON document inside a captured request, whatever its formatting
    fn json_body(captured: &str) -> serde_json::Value {
        let start = captured.find('{').unwrap();
        let end = captured.rfind('}').unwrap();
        serde_json::from_str(&captured[start..=end]).unwrap()
    }

    #[test]
    fn test_round_trip_against_loopback_server() {
        let png = solid_png(4, 4, [200, 100, 50]).unwrap();
        let (base, server) = serve(vec![
            json_reply(serde_json::json!({"prompt_id": "abc123", "number": 0, "node_errors": {}})),
            json_reply(serde_json::json!({"abc123": {"outputs": {"9": {"images": [
                {"filename": "out1.png", "subfolder": "", "type": "output"}
            ]}}}})),
            Canned {
                status: "200 OK",
                content_type: "image/png",
                body: png.clone(),
            },
        ]);

        let service = ComfyUiService::new(format!("{}/", base), Duration::from_secs(5));
        let request = TextToImage::new(&GenerationConfig::default(), "a gilded frame")
            .with_seed(5)
            .build()
            .unwrap();

        let submitted = service.submit_prompt(&request).unwrap();
        assert_eq!(submitted["prompt_id"], "abc123");

        let history = service.history("abc123").unwrap();
        assert_eq!(history["abc123"]["outputs"]["9"]["images"][0]["filename"], "out1.png");

        let locator = AssetLocator::from_parts(Some("out1.png"), Some(""), Some("output"));
        assert_eq!(service.view(&locator).unwrap(), png);

        let seen = server.join().unwrap();
        assert!(seen[0].starts_with("POST /prompt "));
        let posted = json_body(&seen[0]);
        assert_eq!(posted["client_id"], service.client_id());
        assert_eq!(posted["prompt"]["3"]["class_type"], "KSampler");
        assert_eq!(posted["prompt"]["3"]["inputs"]["seed"], 5);
        assert!(seen[1].starts_with("GET /history/abc123 "));
        assert!(seen[2].starts_with("GET /view?"));
        assert!(seen[2].contains("filename=out1.png"));
        assert!(seen[2].contains("type=output"));
    }

    #[test]
    fn test_error_status_is_reported_with_body() {
        let (base, server) = serve(vec![Canned {
            status: "500 Internal Server Error",
            content_type: "text/plain",
            body: b"out of memory".to_vec(),
        }]);
        let service = ComfyUiService::new(base, Duration::from_secs(5));

        let err = service.history("abc123").unwrap_err();
        assert_eq!(
            err,
            ServiceFailure::Status {
                code: 500,
                body: "out of memory".into()
            }
        );
        server.join().unwrap();
    }

    #[test]
    fn test_unreachable_server() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let service = ComfyUiService::new(format!("http://127.0.0.1:{}", port), Duration::from_secs(2));

        assert!(matches!(
            service.history("abc123"),
            Err(ServiceFailure::Transport(_))
        ));
        assert!(matches!(
            service.health_check().unwrap(),
            ServiceStatus::Unavailable(_)
        ));
    }
}
