#![allow(dead_code)]

use std::{
	collections::HashMap,
	net::SocketAddr,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use async_trait::async_trait;
use reqwest::Url;
use slammer::{SlamError, SlamErrorKind, Transport, TransportResponse, body};
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::TcpListener,
};

/// What a mock does for a given user agent.
#[derive(Clone)]
pub enum Reply {
	Ok {
		status: u16,
		headers: Vec<(String, String)>,
		text: String,
		delay: Duration,
	},
	Fail(String),
	Hang,
	Panic,
}

impl Reply {
	pub fn ok(text: &str) -> Self {
		Self::Ok {
			status: 200,
			headers: vec![("content-type".into(), "text/plain".into())],
			text: text.into(),
			delay: Duration::ZERO,
		}
	}

	pub fn ok_after(text: &str, delay: Duration) -> Self {
		match Self::ok(text) {
			Self::Ok {
				status,
				headers,
				text,
				..
			} => Self::Ok {
				status,
				headers,
				text,
				delay,
			},
			other => other,
		}
	}

	pub fn with_headers(status: u16, headers: &[(&str, &str)], text: &str) -> Self {
		Self::Ok {
			status,
			headers: headers
				.iter()
				.map(|(k, v)| (k.to_string(), v.to_string()))
				.collect(),
			text: text.into(),
			delay: Duration::ZERO,
		}
	}
}

/// Scripted transport that counts calls and tracks peak concurrency.
pub struct MockTransport {
	replies: HashMap<String, Reply>,
	fallback: Reply,
	pub calls: AtomicUsize,
	in_flight: AtomicUsize,
	pub peak_in_flight: AtomicUsize,
}

impl MockTransport {
	pub fn always(reply: Reply) -> Arc<Self> {
		Arc::new(Self::new(reply, []))
	}

	pub fn scripted<const N: usize>(fallback: Reply, replies: [(&str, Reply); N]) -> Arc<Self> {
		Arc::new(Self::new(fallback, replies))
	}

	fn new<const N: usize>(fallback: Reply, replies: [(&str, Reply); N]) -> Self {
		Self {
			replies: replies
				.into_iter()
				.map(|(agent, reply)| (agent.to_owned(), reply))
				.collect(),
			fallback,
			calls: AtomicUsize::new(0),
			in_flight: AtomicUsize::new(0),
			peak_in_flight: AtomicUsize::new(0),
		}
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn peak(&self) -> usize {
		self.peak_in_flight.load(Ordering::SeqCst)
	}
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.0.fetch_sub(1, Ordering::SeqCst);
	}
}

#[async_trait]
impl Transport for MockTransport {
	async fn get(&self, _url: &Url, user_agent: &str) -> Result<TransportResponse, SlamError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
		let _guard = InFlight(&self.in_flight);

		let reply = self
			.replies
			.get(user_agent)
			.unwrap_or(&self.fallback)
			.clone();
		match reply {
			Reply::Ok {
				status,
				headers,
				text,
				delay,
			} => {
				tokio::time::sleep(delay).await;
				Ok(TransportResponse::new(status, headers, body::once(text)))
			}
			Reply::Fail(message) => Err(SlamError::new(
				SlamErrorKind::TransportFailure,
				Some(message),
			)),
			Reply::Hang => std::future::pending().await,
			Reply::Panic => panic!("mock transport exploded"),
		}
	}
}

/// Minimal HTTP/1.1 server: answers every connection with a fixed status and
/// headers, and a body built from the request's User-Agent.
pub async fn serve(
	status_line: &'static str,
	headers: &'static [(&'static str, &'static str)],
	body: fn(&str) -> String,
) -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();

	tokio::spawn(async move {
		loop {
			let Ok((mut socket, _)) = listener.accept().await else {
				return;
			};
			tokio::spawn(async move {
				let mut request = Vec::new();
				let mut buf = [0_u8; 1024];
				while !request.windows(4).any(|w| w == b"\r\n\r\n") {
					match socket.read(&mut buf).await {
						Ok(0) | Err(_) => return,
						Ok(n) => request.extend_from_slice(&buf[..n]),
					}
				}

				let request = String::from_utf8_lossy(&request);
				let user_agent = request
					.lines()
					.find_map(|line| {
						let (name, value) = line.split_once(':')?;
						name.eq_ignore_ascii_case("user-agent")
							.then(|| value.trim().to_owned())
					})
					.unwrap_or_default();

				let text = body(&user_agent);
				let mut response = format!("HTTP/1.1 {status_line}\r\n");
				for (name, value) in headers {
					response.push_str(&format!("{name}: {value}\r\n"));
				}
				response.push_str(&format!(
					"content-length: {}\r\nconnection: close\r\n\r\n{text}",
					text.len()
				));
				let _ = socket.write_all(response.as_bytes()).await;
				let _ = socket.shutdown().await;
			});
		}
	});

	addr
}

/// An address with nothing listening on it.
pub fn dead_addr() -> SocketAddr {
	let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
	listener.local_addr().unwrap()
}
