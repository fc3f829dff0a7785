// Throwaway HTTP/1.1 server for probe tests
//
// Runs on its own thread with a current-thread runtime, so it serves both
// synchronous tests and #[tokio::test] tests. Every response closes the
// connection.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const MP4_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom";
pub const HTML_PAGE: &[u8] = b"<!DOCTYPE html><html><body>Link expired</body></html>";

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Status answered to HEAD instead of `status`
    pub head_status: Option<u16>,
    /// Answer `Range` requests with 206 and the first byte
    pub honor_range: bool,
    /// Answer the first N requests with 503
    pub fail_first: usize,
}

impl Route {
    pub fn file() -> Self {
        Self {
            status: 200,
            content_type: "video/mp4",
            body: MP4_BYTES.to_vec(),
            head_status: None,
            honor_range: false,
            fail_first: 0,
        }
    }

    pub fn html() -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: HTML_PAGE.to_vec(),
            ..Self::file()
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::html()
        }
    }

    pub fn no_head(mut self) -> Self {
        self.head_status = Some(405);
        self
    }

    pub fn ranged(mut self) -> Self {
        self.honor_range = true;
        self
    }

    pub fn flaky(mut self, failures: usize) -> Self {
        self.fail_first = failures;
        self
    }
}

pub struct TestServer {
    addr: SocketAddr,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl TestServer {
    pub fn start(routes: Vec<(&str, Route)>) -> Self {
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        );
        let hits = Arc::new(Mutex::new(HashMap::new()));

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let server_hits = Arc::clone(&hits);
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = TcpListener::from_std(listener).unwrap();
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        continue;
                    };
                    let routes = Arc::clone(&routes);
                    let hits = Arc::clone(&server_hits);
                    tokio::spawn(async move {
                        let _ = serve(stream, &routes, &hits).await;
                    });
                }
            });
        });

        Self { addr, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Requests received for a path, all methods included
    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: &HashMap<String, Route>,
    hits: &Mutex<HashMap<String, usize>>,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&request).to_string();
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let wants_range = head
        .lines()
        .any(|line| line.to_ascii_lowercase().starts_with("range:"));

    let previous = {
        let mut hits = hits.lock().unwrap();
        let count = hits.entry(path.clone()).or_insert(0);
        *count += 1;
        *count - 1
    };

    let route = routes
        .get(&path)
        .cloned()
        .unwrap_or_else(|| Route::status(404));

    let (status, body) = if previous < route.fail_first {
        (503, b"busy".to_vec())
    } else if method == "HEAD" {
        (route.head_status.unwrap_or(route.status), route.body.clone())
    } else if wants_range && route.honor_range && route.status == 200 {
        (206, route.body[..1].to_vec())
    } else {
        (route.status, route.body.clone())
    };

    let mut response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        reason(status),
        route.content_type,
        body.len()
    );
    if status == 206 {
        response.push_str(&format!("Content-Range: bytes 0-0/{}\r\n", route.body.len()));
    }
    response.push_str("\r\n");

    stream.write_all(response.as_bytes()).await?;
    if method != "HEAD" {
        stream.write_all(&body).await?;
    }
    stream.shutdown().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        206 => "Partial Content",
        404 => "Not Found",
        405 => "Method Not Allowed",
        503 => "Service Unavailable",
        _ => "Status",
    }
}
