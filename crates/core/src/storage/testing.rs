//! Loopback HTTP responder shared by the storage tests.

use std::sync::Arc;

use anyhow::Result;
use reqwest::Url;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

/// Answer every request on a loopback port with `handler(url, raw head)`
/// and return the base URL.
pub(crate) async fn serve<F>(handler: F) -> Result<String>
where
    F: Fn(&Url, &str) -> (u16, Vec<u8>) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let _ = respond(socket, |url, head| handler(url, head)).await;
            });
        }
    });

    Ok(format!("http://{addr}"))
}

async fn respond<F>(mut socket: TcpStream, handler: F) -> Result<()>
where
    F: Fn(&Url, &str) -> (u16, Vec<u8>),
{
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    let head_end = loop {
        let read = socket.read(&mut buf).await?;
        if read == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..read]);
        if let Some(pos) = request.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&request[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    // Drain the body so closing the socket does not reset the connection.
    let mut body_read = request.len() - head_end;
    while body_read < content_length {
        let read = socket.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        body_read += read;
    }

    let target = head.split_whitespace().nth(1).unwrap_or("/");
    let url = Url::parse(&format!("http://storage.test{target}"))?;
    let (status, body) = handler(&url, &head);
    let response = format!(
        "HTTP/1.1 {status} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    socket.write_all(response.as_bytes()).await?;
    socket.write_all(&body).await?;
    socket.shutdown().await?;
    Ok(())
}

/// Value of query parameter `key`, decoded.
pub(crate) fn query(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}
