//! One-shot HTTP responders for exercising the directory, IAM token and storage clients.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Canned HTTP response
#[derive(Clone)]
pub struct Canned {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Canned {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn xml(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/xml",
            body: body.to_string(),
        }
    }
}

/// Raw requests received by a responder, in arrival order
pub type RequestLog = Arc<Mutex<Vec<String>>>;

/// Serve `responses` in order, one per connection. Returns the base URL and a hit counter.
pub async fn serve(responses: Vec<Canned>) -> (String, Arc<AtomicUsize>) {
    let (url, hits, _) = serve_recorded(responses).await;
    (url, hits)
}

/// Like [`serve`], also keeping the raw text of every request
pub async fn serve_recorded(responses: Vec<Canned>) -> (String, Arc<AtomicUsize>, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let requests: RequestLog = Arc::default();
    let log = requests.clone();

    tokio::spawn(async move {
        for canned in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let request = read_request(&mut stream).await;
            log.lock().unwrap().push(request);
            counter.fetch_add(1, Ordering::SeqCst);

            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                canned.status,
                reason(canned.status),
                canned.content_type,
                canned.body.len(),
                canned.body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (format!("http://{}", addr), hits, requests)
}

/// Accept connections and never answer them
pub async fn serve_silence() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    format!("http://{}", addr)
}

/// A URL nothing listens on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).into_owned(),
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return text.into_owned();
            }
        }
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

pub const DIRECTORY_JSON: &str = r#"{
    "service-endpoints": {
        "cross-region": {
            "eu": { "public": { "eu-geo": "s3.eu.cloud-object-storage.appdomain.cloud" } }
        },
        "regional": {
            "eu-de": { "public": { "eu-de": "s3.eu-de.cloud-object-storage.appdomain.cloud" } },
            "us-south": { "public": { "us-south": "s3.us-south.cloud-object-storage.appdomain.cloud" } }
        },
        "single-site": {
            "ams03": { "public": { "ams03": "s3.ams03.cloud-object-storage.appdomain.cloud" } }
        }
    }
}"#;

/// Extended bucket listing as returned for `?extended`
pub const EXTENDED_LISTING_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<ListAllMyBucketsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Owner><ID>R</ID><DisplayName>R</DisplayName></Owner>
  <IsTruncated>false</IsTruncated>
  <MaxKeys>1000</MaxKeys>
  <Prefix>b1</Prefix>
  <Buckets>
    <Bucket>
      <Name>b1</Name>
      <CreationDate>2023-05-01T12:00:00.000Z</CreationDate>
      <LocationConstraint>eu-de-standard</LocationConstraint>
    </Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#;
