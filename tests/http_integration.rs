//! Integration tests for the HTTP layer
//!
//! These tests run complete transfers against a local server that writes
//! the response in separate pieces, so the reader sees realistic read
//! boundaries.

mod common;

use common::serve;
use progressed_http::http::{
    self, Completion, Connector, Error, Failure, ReadOptions, ReadState, RequestOptions,
    ResponseReader, SessionOps,
};
use progressed_http::progress::{Progress, ProgressObserver};
use std::fs;

fn pieces(parts: &[&[u8]]) -> Vec<Vec<u8>> {
    parts.iter().map(|p| p.to_vec()).collect()
}

#[test]
fn test_get_content_length_in_pieces() {
    let (addr, handle) = serve(pieces(&[
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n",
        b"Content-Length: 11\r\n\r\nHello",
        b" World",
    ]));

    let reader = http::get(&format!("http://{}/hello", addr), RequestOptions::new().quiet()).unwrap();
    assert_eq!(reader.state(), &ReadState::Done(Completion::Complete));
    assert_eq!(reader.status().unwrap().code, 200);
    assert_eq!(reader.headers().get_str("content-type"), Some("text/plain"));
    assert_eq!(reader.body(), Some(&b"Hello World"[..]));
    assert_eq!(reader.bytes_delivered(), 11);
    reader.error_for_outcome().unwrap();

    let request = String::from_utf8(handle.join().unwrap()).unwrap();
    assert!(request.starts_with("GET /hello HTTP/1.1\r\n"));
    assert!(request.contains("Connection: close\r\n"));
}

#[test]
fn test_chunked_in_odd_pieces() {
    let (addr, handle) = serve(pieces(&[
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWi",
        b"ki\r",
        b"\n5\r\npedia\r\nE\r\n in\r\n\r\nchunks.\r",
        b"\n0\r\n",
        b"\r\n",
    ]));

    let reader = http::get(
        &format!("http://{}/", addr),
        RequestOptions::new().chunk_size(7).quiet(),
    )
    .unwrap();
    assert!(reader.is_chunked());
    assert_eq!(reader.state(), &ReadState::Done(Completion::Complete));
    assert_eq!(reader.body(), Some(&b"Wikipedia in\r\n\r\nchunks."[..]));
    handle.join().unwrap();
}

#[test]
fn test_get_query_encoding() {
    let (addr, handle) = serve(pieces(&[b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"]));

    http::get(
        &format!("http://{}/search?lang=en", addr),
        RequestOptions::new()
            .form([("q", "rust http"), ("tag", "a/b&c")])
            .quiet(),
    )
    .unwrap();

    let request = String::from_utf8(handle.join().unwrap()).unwrap();
    assert!(request.starts_with("GET /search?lang=en&q=rust%20http&tag=a/b%26c HTTP/1.1\r\n"));
}

#[test]
fn test_post_raw_entity() {
    let (addr, handle) = serve(pieces(&[b"HTTP/1.1 201 Created\r\nContent-Length: 2\r\n\r\nok"]));

    let reader = http::post(
        &format!("http://{}/items", addr),
        RequestOptions::new()
            .header("Content-Type", "application/json")
            .data(r#"{"name":"widget"}"#)
            .quiet(),
    )
    .unwrap();
    assert_eq!(reader.status().unwrap().code, 201);
    assert_eq!(reader.body(), Some(&b"ok"[..]));

    let request = handle.join().unwrap();
    assert!(request.ends_with(b"Content-Length: 17\r\n\r\n{\"name\":\"widget\"}"));
}

#[test]
fn test_download_numbering_and_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.txt");
    let response: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\ndata";

    let download = |overwrite: bool| {
        let (addr, handle) = serve(pieces(&[response]));
        let reader = http::get(
            &format!("http://{}/file.txt", addr),
            RequestOptions::new()
                .destination(&path)
                .overwrite(overwrite)
                .quiet(),
        )
        .unwrap();
        handle.join().unwrap();
        reader.error_for_outcome().unwrap();
        assert_eq!(reader.body(), None);
        reader.file_path().unwrap().to_path_buf()
    };

    assert_eq!(download(false), path);
    assert_eq!(download(false), dir.path().join("1_file.txt"));
    assert_eq!(download(false), dir.path().join("2_file.txt"));
    assert_eq!(download(true), path);

    assert_eq!(fs::read(&path).unwrap(), b"data");
    assert_eq!(fs::read(dir.path().join("2_file.txt")).unwrap(), b"data");
    assert!(!dir.path().join("3_file.txt").exists());
}

#[test]
fn test_not_found_download_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.html");
    let (addr, handle) = serve(pieces(&[
        b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\n\r\n",
        b"not found",
    ]));

    let reader = http::get(
        &format!("http://{}/missing.html", addr),
        RequestOptions::new().destination(&path).quiet(),
    )
    .unwrap();
    handle.join().unwrap();

    assert_eq!(reader.state(), &ReadState::Failed(Failure::NonOkStatus(404)));
    assert!(matches!(reader.error_for_outcome(), Err(Error::NonOkStatus(404))));
    assert!(!path.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_headers_only() {
    let (addr, handle) = serve(pieces(&[
        b"HTTP/1.1 200 OK\r\nContent-Length: 1048576\r\nServer: local\r\n\r\n",
        &[b'x'; 4096],
    ]));

    let reader = http::get(
        &format!("http://{}/big.bin", addr),
        RequestOptions::new().skip_body(true).quiet(),
    )
    .unwrap();
    assert_eq!(reader.state(), &ReadState::Done(Completion::HeadersOnly));
    assert_eq!(reader.headers().get_str("server"), Some("local"));
    assert_eq!(reader.bytes_delivered(), 0);
    handle.join().unwrap();
}

#[test]
fn test_truncated_response() {
    let (addr, handle) = serve(pieces(&[b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial"]));

    let reader = http::get(&format!("http://{}/", addr), RequestOptions::new().quiet()).unwrap();
    assert_eq!(reader.state(), &ReadState::Done(Completion::Truncated));
    assert_eq!(reader.body(), Some(&b"partial"[..]));
    assert!(matches!(reader.error_for_outcome(), Err(Error::TruncatedResponse(7))));
    handle.join().unwrap();
}

#[derive(Default)]
struct Recorder {
    delivered: Vec<u64>,
    finished: bool,
}

impl ProgressObserver for Recorder {
    fn update(&mut self, progress: &Progress<'_>) {
        assert!(progress.delivered <= progress.total);
        self.delivered.push(progress.delivered);
    }

    fn finish(&mut self, _progress: &Progress<'_>) {
        self.finished = true;
    }
}

#[test]
fn test_step_by_step_with_observer() {
    let body = vec![b'z'; 20_000];
    let mut response = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", body.len()).into_bytes();
    response.extend_from_slice(&body);
    let (addr, handle) = serve(vec![response]);

    let mut connector = Connector::new();
    connector
        .send(&format!("http://{}/blob", addr), "GET", None, None)
        .unwrap();

    let options = ReadOptions {
        chunk_size: 1000,
        ..ReadOptions::default()
    };
    let mut reader = ResponseReader::new(connector, options).unwrap();
    let mut recorder = Recorder::default();
    reader.run_with(&mut recorder);

    assert_eq!(reader.state(), &ReadState::Done(Completion::Complete));
    assert_eq!(reader.body().map(<[u8]>::len), Some(20_000));
    assert!(recorder.delivered.len() >= 20);
    assert!(recorder.delivered.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(recorder.delivered.last(), Some(&20_000));
    assert!(recorder.finished);
    assert!(!reader.get_ref().is_connected());

    handle.join().unwrap();
}

#[test]
fn test_reader_closes_connection_once() {
    let (addr, handle) = serve(pieces(&[b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nx"]));

    let mut connector = Connector::new();
    connector
        .send(&format!("http://{}/", addr), "GET", None, None)
        .unwrap();
    let mut reader = ResponseReader::new(connector, ReadOptions { progress: false, ..Default::default() }).unwrap();
    while !reader.is_finished() {
        reader.pump();
    }
    assert!(!reader.get_ref().is_connected());

    // Pumping a finished reader performs no I/O
    assert_eq!(reader.pump(), &ReadState::Done(Completion::Complete));
    assert_eq!(reader.last_read(), 0);
    drop(reader);

    handle.join().unwrap();
}

#[test]
fn test_connection_refused() {
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    let result = http::get(&format!("http://{}/", addr), RequestOptions::new().quiet());
    assert!(matches!(result, Err(Error::Connection(_))));
}

#[test]
fn test_session_ops_on_connector() {
    let (addr, handle) = serve(pieces(&[b"HTTP/1.1 200 OK\r\n\r\n0\r\n\r\n"]));

    let mut connector = Connector::new();
    connector
        .send(&format!("http://{}/", addr), "GET", None, None)
        .unwrap();
    let mut buf = [0u8; 64];
    let n = SessionOps::read(&mut connector, &mut buf).unwrap();
    assert!(buf[..n].starts_with(b"HTTP/1.1 200 OK"));
    SessionOps::close(&mut connector).unwrap();

    handle.join().unwrap();
}
