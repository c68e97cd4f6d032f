//! WHOIS over a loopback TCP server

#![allow(clippy::unwrap_used)]

use netdiag::whois::{TcpTransport, WhoisClient, WhoisError, WhoisTransport};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

/// Accept one connection, record the query line and reply in `chunks`
fn serve_once(chunks: Vec<&'static str>, close: bool) -> (u16, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();

        let mut stream = reader.into_inner();
        for chunk in chunks {
            stream.write_all(chunk.as_bytes()).unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_millis(20));
        }
        if !close {
            thread::sleep(Duration::from_millis(800));
        }
        line
    });
    (port, handle)
}

#[test]
fn test_reads_until_server_closes() {
    let (port, handle) = serve_once(
        vec!["Domain Name: EXAMPLE.TEST\r\n", "Registrar: Example\r\n", "\r\n"],
        true,
    );
    let transport = TcpTransport::new(port, Duration::from_secs(5));

    let bytes = transport.exchange("127.0.0.1", "example.test\r\n").unwrap();

    assert_eq!(handle.join().unwrap(), "example.test\r\n");
    assert_eq!(bytes, b"Domain Name: EXAMPLE.TEST\r\nRegistrar: Example\r\n\r\n");
}

#[test]
fn test_deadline_keeps_partial_response() {
    let (port, handle) = serve_once(vec!["partial: yes\r\n"], false);
    let transport = TcpTransport::new(port, Duration::from_millis(300));

    let started = Instant::now();
    let bytes = transport.exchange("127.0.0.1", "slow.test\r\n").unwrap();

    assert!(started.elapsed() < Duration::from_millis(750));
    assert_eq!(bytes, b"partial: yes\r\n");
    handle.join().unwrap();
}

#[test]
fn test_client_over_tcp() {
    let (port, handle) = serve_once(vec!["% no referral here\nstatus: active\n"], true);
    let client = WhoisClient::with_transport(TcpTransport::new(port, Duration::from_secs(5)));

    let response = client.query_server("127.0.0.1", "example.test").unwrap();

    handle.join().unwrap();
    assert_eq!(response.server, "127.0.0.1");
    assert_eq!(response.line_count, 2);
    assert_eq!(response.chain, vec!["127.0.0.1"]);
}

#[test]
fn test_connection_refused() {
    // Bind then drop to get a port with no listener
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let transport = TcpTransport::new(port, Duration::from_secs(1));

    let err = transport.exchange("127.0.0.1", "x\r\n").unwrap_err();
    assert!(matches!(err, WhoisError::Connect { .. }));
}
