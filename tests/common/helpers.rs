#![allow(dead_code)]

use bytes::Bytes;
use crxdl::downloader::DownloaderBuilder;
use crxdl::extension::{ExtensionId, PlatformDescriptor};
use crxdl::http::{FetchResponse, Fetcher};
use crxdl::job::Job;
use crxdl::TransportError;
use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Url;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// === Tracing ===

/// Route library logs to the test output; `RUST_LOG=crxdl=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// === Archive Fixtures ===

/// Build a ZIP archive from `(name, contents, deflate)` entries.
pub fn build_zip(entries: &[(&str, &[u8], bool)]) -> Vec<u8> {
    let mut zip = Vec::new();
    let mut central = Vec::new();

    for (name, contents, deflate) in entries {
        let mut crc = Crc::new();
        crc.update(contents);
        let (method, data) = if *deflate {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(contents).unwrap();
            (8u16, encoder.finish().unwrap())
        } else {
            (0u16, contents.to_vec())
        };
        let offset = zip.len() as u32;

        zip.extend_from_slice(b"PK\x03\x04");
        zip.extend_from_slice(&20u16.to_le_bytes()); // version needed
        zip.extend_from_slice(&0u16.to_le_bytes()); // flags
        zip.extend_from_slice(&method.to_le_bytes());
        zip.extend_from_slice(&[0; 4]); // time, date
        zip.extend_from_slice(&crc.sum().to_le_bytes());
        zip.extend_from_slice(&(data.len() as u32).to_le_bytes());
        zip.extend_from_slice(&(contents.len() as u32).to_le_bytes());
        zip.extend_from_slice(&(name.len() as u16).to_le_bytes());
        zip.extend_from_slice(&0u16.to_le_bytes()); // extra
        zip.extend_from_slice(name.as_bytes());
        zip.extend_from_slice(&data);

        central.extend_from_slice(b"PK\x01\x02");
        central.extend_from_slice(&20u16.to_le_bytes()); // version made by
        central.extend_from_slice(&20u16.to_le_bytes()); // version needed
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&method.to_le_bytes());
        central.extend_from_slice(&[0; 4]);
        central.extend_from_slice(&crc.sum().to_le_bytes());
        central.extend_from_slice(&(data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(contents.len() as u32).to_le_bytes());
        central.extend_from_slice(&(name.len() as u16).to_le_bytes());
        central.extend_from_slice(&[0; 12]); // extra, comment, disk, attributes
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name.as_bytes());
    }

    let cd_offset = zip.len() as u32;
    zip.extend_from_slice(&central);
    zip.extend_from_slice(b"PK\x05\x06");
    zip.extend_from_slice(&[0; 4]);
    zip.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    zip.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    zip.extend_from_slice(&(central.len() as u32).to_le_bytes());
    zip.extend_from_slice(&cd_offset.to_le_bytes());
    zip.extend_from_slice(&0u16.to_le_bytes());
    zip
}

/// A small extension-shaped archive.
pub fn sample_zip() -> Vec<u8> {
    build_zip(&[
        (
            "manifest.json",
            br#"{"manifest_version": 3, "name": "fixture", "version": "1.0"}"#,
            false,
        ),
        ("background.js", "console.log('hi');\n".repeat(50).as_bytes(), true),
        ("icons/icon16.png", &[0x89, b'P', b'N', b'G', 0, 1, 2, 3], false),
    ])
}

// === Container Fixtures ===

pub fn crx2(public_key: &[u8], signature: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut buf = b"Cr24".to_vec();
    buf.extend_from_slice(&2u32.to_le_bytes());
    buf.extend_from_slice(&(public_key.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(signature.len() as u32).to_le_bytes());
    buf.extend_from_slice(public_key);
    buf.extend_from_slice(signature);
    buf.extend_from_slice(payload);
    buf
}

pub fn crx3(header: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut buf = b"Cr24".to_vec();
    buf.extend_from_slice(&3u32.to_le_bytes());
    buf.extend_from_slice(&(header.len() as u32).to_le_bytes());
    buf.extend_from_slice(header);
    buf.extend_from_slice(payload);
    buf
}

// === Jobs ===

/// A valid identifier derived from `n`.
pub fn test_id(n: usize) -> ExtensionId {
    let mut id = String::with_capacity(32);
    let mut rest = n;
    for _ in 0..32 {
        id.push((b'a' + (rest % 16) as u8) as char);
        rest /= 16;
    }
    id.parse().expect("generated identifier is valid")
}

pub fn test_url(id: &ExtensionId) -> Url {
    Url::parse(&format!("https://store.example/crx/{}.crx", id)).unwrap()
}

pub fn test_job(n: usize) -> Job {
    let id = test_id(n);
    let url = test_url(&id);
    Job::new(id, PlatformDescriptor::default(), &url)
}

/// A builder with no rate limit and millisecond backoff.
pub fn test_builder(fetcher: Arc<MockFetcher>) -> DownloaderBuilder {
    DownloaderBuilder::new()
        .fetcher(fetcher)
        .rate_limit(None)
        .max_workers(3)
        .backoff(Duration::from_millis(1), 2.0, Duration::from_millis(5))
}

// === Mock Fetcher ===

/// What the mock answers to one call.
#[derive(Clone)]
pub enum Reply {
    /// A 200 response streamed in two chunks.
    Body(Vec<u8>),
    /// A 200 response without `Content-Length`.
    Unsized(Vec<u8>),
    /// A 200 response advertising `len` bytes.
    Advertised(u64, Vec<u8>),
    /// Part of the body, then a failure.
    BodyError(Vec<u8>, TransportError),
    /// The request itself fails.
    Fail(TransportError),
}

impl Reply {
    fn into_response(self) -> Result<FetchResponse, TransportError> {
        match self {
            Reply::Body(body) => {
                let mut first = Bytes::from(body);
                let second = first.split_off(first.len() / 2);
                Ok(FetchResponse::from_chunks(vec![Ok(first), Ok(second)]))
            }
            Reply::Unsized(body) => {
                let mut response = FetchResponse::from_chunks(vec![Ok(Bytes::from(body))]);
                response.content_length = None;
                Ok(response)
            }
            Reply::Advertised(len, body) => {
                let mut response = FetchResponse::from_chunks(vec![Ok(Bytes::from(body))]);
                response.content_length = Some(len);
                Ok(response)
            }
            Reply::BodyError(prefix, error) => Ok(FetchResponse::from_chunks(vec![
                Ok(Bytes::from(prefix)),
                Err(error),
            ])),
            Reply::Fail(error) => Err(error),
        }
    }
}

type Handler = dyn Fn(&Url, usize) -> Reply + Send + Sync;

/// Scripted [`Fetcher`] that counts calls and concurrent requests.
pub struct MockFetcher {
    handler: Box<Handler>,
    delay: Duration,
    per_url: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockFetcher {
    /// `handler` receives the URL and the 1-based call number for that URL.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Url, usize) -> Reply + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: Duration::from_millis(10),
            per_url: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Always answer with `reply`.
    pub fn always(reply: Reply) -> Self {
        Self::new(move |_, _| reply.clone())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl Fetcher for MockFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<FetchResponse, TransportError>> {
        async move {
            let call = {
                let mut per_url = self.per_url.lock().unwrap();
                let count = per_url.entry(url.to_string()).or_default();
                *count += 1;
                *count
            };
            self.calls.fetch_add(1, Ordering::SeqCst);
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;

            self.active.fetch_sub(1, Ordering::SeqCst);
            (self.handler)(url, call).into_response()
        }
        .boxed()
    }
}

// === Local HTTP Server ===

/// Build a raw HTTP/1.1 response.
pub fn http_response(status: &str, content_type: Option<&str>, body: &[u8]) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
    if let Some(content_type) = content_type {
        head.push_str(&format!("Content-Type: {}\r\n", content_type));
    }
    if !status.starts_with("204") {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("\r\n");
    let mut response = head.into_bytes();
    response.extend_from_slice(body);
    response
}

/// Serve `responses` to consecutive connections on a local port and return
/// the base URL.
pub async fn serve(responses: Vec<Vec<u8>>) -> Url {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for response in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        }
    });
    Url::parse(&format!("http://{}/", addr)).unwrap()
}

/// A reqwest fetcher that ignores proxy settings from the environment.
pub fn local_fetcher() -> crxdl::HttpFetcher {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    crxdl::HttpFetcher::new(reqwest_middleware::ClientBuilder::new(client).build())
}
