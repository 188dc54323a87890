//! Listener cancellation and concurrent session behaviour

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use source_rcon::config::ServerConfig;
use source_rcon::core::packet::{Packet, SERVERDATA_EXECCOMMAND};
use source_rcon::protocol::executor::{Caller, CommandExecutor};
use source_rcon::service::session::SessionContext;
use source_rcon::transport::tcp::RconClient;
use source_rcon::utils::metrics::Metrics;
use source_rcon::{ProtocolError, RconListener, RconServer};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

const PASSWORD: &str = "s3cret";

struct SlowExecutor {
    finished: Arc<AtomicUsize>,
}

impl CommandExecutor for SlowExecutor {
    fn execute(&self, command: &str, _args: &[String], _caller: &Caller) -> String {
        std::thread::sleep(Duration::from_millis(300));
        self.finished.fetch_add(1, Ordering::SeqCst);
        format!("done {command}")
    }
}

fn config() -> ServerConfig {
    ServerConfig {
        ip: Some("127.0.0.1".parse().unwrap()),
        port: 0,
        password: PASSWORD.to_string(),
        ..ServerConfig::default()
    }
}

async fn bind_listener(finished: Arc<AtomicUsize>) -> Arc<RconListener> {
    let config = config();
    let ctx = Arc::new(SessionContext::new(
        &config,
        Arc::new(SlowExecutor { finished }),
        Arc::new(Metrics::new()),
    ));
    Arc::new(RconListener::bind(config.bind_addr(), ctx).await.unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn run_waits_for_in_flight_sessions() {
    let finished = Arc::new(AtomicUsize::new(0));
    let listener = bind_listener(Arc::clone(&finished)).await;
    let addr = listener.local_addr();
    let cancel = CancellationToken::new();

    let run = tokio::spawn({
        let listener = Arc::clone(&listener);
        let cancel = cancel.clone();
        async move { listener.run(cancel).await }
    });

    const SESSIONS: usize = 5;
    let mut clients = Vec::new();
    for i in 0..SESSIONS {
        let mut client = RconClient::connect(addr).await.unwrap();
        client.authenticate(PASSWORD).await.unwrap();
        client
            .send(Packet::new(i as i32 + 10, SERVERDATA_EXECCOMMAND, "slow"))
            .await
            .unwrap();
        clients.push(client);
    }

    // Let every command reach the executor before cancelling
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("listener should drain")
        .unwrap()
        .unwrap();
    assert_eq!(finished.load(Ordering::SeqCst), SESSIONS);
}

#[tokio::test]
async fn no_accepts_after_cancel() {
    let listener = bind_listener(Arc::new(AtomicUsize::new(0))).await;
    let addr = listener.local_addr();
    let cancel = CancellationToken::new();
    cancel.cancel();

    listener.run(cancel).await.unwrap();

    let refused = tokio::net::TcpStream::connect(addr).await;
    assert!(refused.is_err(), "socket should be closed after the loop exits");
}

#[tokio::test]
async fn run_after_stop_reports_closed() {
    let listener = bind_listener(Arc::new(AtomicUsize::new(0))).await;
    listener.stop().await;
    listener.stop().await;
    assert!(listener.is_stopped());

    let result = listener.run(CancellationToken::new()).await;
    assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
}

#[tokio::test]
async fn bind_conflict_is_reported() {
    let first = bind_listener(Arc::new(AtomicUsize::new(0))).await;
    let taken: SocketAddr = first.local_addr();

    let config = ServerConfig {
        port: taken.port(),
        ..config()
    };
    let mut server = RconServer::new(config, |_: &str, _: &[String], _: &Caller| String::new());
    let err = server.start().await.unwrap_err();
    assert!(matches!(err, ProtocolError::BindFailed { .. }));
    assert!(!server.is_running());
}

#[tokio::test]
async fn empty_password_refuses_to_start() {
    let config = ServerConfig {
        password: String::new(),
        ..config()
    };
    let mut server = RconServer::new(config, |_: &str, _: &[String], _: &Caller| String::new());
    assert!(matches!(
        server.start().await,
        Err(ProtocolError::ConfigError(_))
    ));
    assert!(server.local_addr().is_none());
}

#[tokio::test]
async fn dispose_is_idempotent() {
    let mut server = RconServer::new(config(), |_: &str, _: &[String], _: &Caller| String::new());
    let addr = server.start().await.unwrap();

    server.dispose();
    server.dispose();
    server.shutdown().await.unwrap();
    server.shutdown().await.unwrap();

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_clients_run_commands_concurrently() {
    let mut server = RconServer::new(config(), |cmd: &str, args: &[String], _: &Caller| {
        format!("{cmd}:{}", args.join(","))
    });
    let addr = server.start().await.unwrap();

    let mut tasks = JoinSet::new();
    for i in 0..16 {
        tasks.spawn(async move {
            let mut client = RconClient::connect(addr).await.unwrap();
            client.authenticate(PASSWORD).await.unwrap();
            let out = client.execute(&format!("echo {i}")).await.unwrap();
            assert_eq!(out, format!("echo:{i}"));
        });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    let metrics = server.metrics().snapshot();
    assert_eq!(metrics.auth_success, 16);
    assert_eq!(metrics.commands_executed, 16);
    server.shutdown().await.unwrap();
}
