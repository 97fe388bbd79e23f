// tests/channel_server.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use solwatch::channel::{ChannelServer, Recv};
use solwatch::config::ChannelSection;
use solwatch::errors::SolwatchError;
use solwatch::protocol::{Message, Request};
use solwatch::types::TestCase;

type TestResult = Result<(), Box<dyn Error>>;

fn ephemeral() -> ChannelSection {
    ChannelSection {
        base_port: 0,
        ..ChannelSection::default()
    }
}

const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn messages_arrive_in_order_and_requests_go_out() -> TestResult {
    init_tracing();
    let server = ChannelServer::start(&ephemeral()).await?;

    let mut client = TcpStream::connect(server.address()).await?;
    let mut conn = server.next_connection(WAIT).await.ok_or("no connection")?;

    client
        .write_all(
            b"{\"status\": \"warming up\"}\n{\"answer\": 4, \"duration\": 0.1}\n{\"answer\": 9}\n{\"done\": true}\n",
        )
        .await?;

    let mut seen = Vec::new();
    loop {
        match conn.recv_timeout(WAIT).await {
            Recv::Message(Message::Done) => break,
            Recv::Message(msg) => seen.push(msg),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert!(matches!(&seen[0], Message::Status { text } if text == "warming up"));
    assert!(matches!(&seen[1], Message::Result { answer, .. } if *answer == json!(4)));
    assert!(matches!(&seen[2], Message::Result { answer, .. } if *answer == json!(9)));

    let case = TestCase::main("1,2,3", vec![]);
    conn.send_request(Request::for_case(&case, None)).await?;
    conn.send_done().await?;

    let mut lines = BufReader::new(client).lines();
    let first: Value = serde_json::from_str(&with_timeout(lines.next_line()).await?.ok_or("eof")?)?;
    assert_eq!(first, json!({"args": {}, "input": "1,2,3", "part": null}));
    let second = with_timeout(lines.next_line()).await?.ok_or("eof")?;
    assert_eq!(second, r#"{"done":true}"#);

    server.shutdown();
    Ok(())
}

#[tokio::test]
async fn malformed_frame_closes_the_inbound_queue() -> TestResult {
    init_tracing();
    let server = ChannelServer::start(&ephemeral()).await?;
    let mut client = TcpStream::connect(server.address()).await?;
    let mut conn = server.next_connection(WAIT).await.ok_or("no connection")?;

    client
        .write_all(b"{\"status\": \"ok\"}\nthis is not json\n{\"status\": \"never seen\"}\n")
        .await?;

    assert!(matches!(
        conn.recv_timeout(WAIT).await,
        Recv::Message(Message::Status { .. })
    ));
    assert_eq!(conn.recv_timeout(WAIT).await, Recv::Closed);
    Ok(())
}

#[tokio::test]
async fn overlong_frame_is_a_disconnect() -> TestResult {
    init_tracing();
    let cfg = ChannelSection {
        max_frame_bytes: 64,
        ..ephemeral()
    };
    let server = ChannelServer::start(&cfg).await?;
    let mut client = TcpStream::connect(server.address()).await?;
    let mut conn = server.next_connection(WAIT).await.ok_or("no connection")?;

    let long = format!("{{\"status\": \"{}\"}}\n", "x".repeat(500));
    client.write_all(long.as_bytes()).await?;

    assert_eq!(conn.recv_timeout(WAIT).await, Recv::Closed);
    Ok(())
}

#[tokio::test]
async fn peer_hangup_reads_as_closed_not_a_hang() -> TestResult {
    init_tracing();
    let server = ChannelServer::start(&ephemeral()).await?;
    let client = TcpStream::connect(server.address()).await?;
    let mut conn = server.next_connection(WAIT).await.ok_or("no connection")?;

    drop(client);
    assert_eq!(conn.recv_timeout(WAIT).await, Recv::Closed);
    Ok(())
}

#[tokio::test]
async fn quiet_connection_times_out() -> TestResult {
    init_tracing();
    let server = ChannelServer::start(&ephemeral()).await?;
    let _client = TcpStream::connect(server.address()).await?;
    let mut conn = server.next_connection(WAIT).await.ok_or("no connection")?;

    assert_eq!(
        conn.recv_timeout(Duration::from_millis(50)).await,
        Recv::TimedOut
    );
    Ok(())
}

#[tokio::test]
async fn next_connection_is_bounded() -> TestResult {
    init_tracing();
    let server = ChannelServer::start(&ephemeral()).await?;
    let started = std::time::Instant::now();
    assert!(server.next_connection(Duration::from_millis(100)).await.is_none());
    assert!(started.elapsed() < Duration::from_secs(2));
    Ok(())
}

#[tokio::test]
async fn unclaimed_connections_are_discarded() -> TestResult {
    init_tracing();
    let server = ChannelServer::start(&ephemeral()).await?;
    let _a = TcpStream::connect(server.address()).await?;
    let _b = TcpStream::connect(server.address()).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(server.discard_stale().await, 2);
    assert!(server.next_connection(Duration::from_millis(50)).await.is_none());
    Ok(())
}

#[tokio::test]
async fn shutdown_with_a_full_queue_releases_the_address() -> TestResult {
    init_tracing();
    let server = ChannelServer::start(&ephemeral()).await?;
    let addr = server.address();

    let mut clients = Vec::new();
    for _ in 0..12 {
        clients.push(TcpStream::connect(addr).await?);
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    server.shutdown();
    with_timeout(async {
        while TcpStream::connect(addr).await.is_ok() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    assert_eq!(server.discard_stale().await, 8);
    Ok(())
}

#[tokio::test]
async fn taken_port_moves_to_the_next_candidate() -> TestResult {
    init_tracing();
    let blocker = TcpListener::bind("127.0.0.1:0").await?;
    let taken = blocker.local_addr()?.port();
    if taken > u16::MAX - 16 {
        return Ok(());
    }

    let cfg = ChannelSection {
        base_port: taken,
        port_attempts: 16,
        ..ChannelSection::default()
    };
    let server = ChannelServer::start(&cfg).await?;
    assert_ne!(server.address().port(), taken);
    assert!(server.address().port() > taken);
    Ok(())
}

#[tokio::test]
async fn no_free_candidate_is_a_startup_error() -> TestResult {
    init_tracing();
    let blocker = TcpListener::bind("127.0.0.1:0").await?;
    let taken = blocker.local_addr()?.port();

    let cfg = ChannelSection {
        base_port: taken,
        port_attempts: 1,
        ..ChannelSection::default()
    };
    match ChannelServer::start(&cfg).await {
        Err(SolwatchError::TransportStartup { base_port, attempts, .. }) => {
            assert_eq!(base_port, taken);
            assert_eq!(attempts, 1);
        }
        other => panic!("expected TransportStartup, got {other:?}"),
    }
    Ok(())
}
