//! Contract tests for correlation, timeouts and disconnect behaviour of the
//! remote script channel, driven over an in-memory duplex pipe.

use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};
use tokio::time::Instant;

use docfix_channel::{
    ChannelError, PreparedConnector, RemoteScriptChannel, RpcRequest, RpcResponse,
};

struct FakeHost {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    out: WriteHalf<DuplexStream>,
}

impl FakeHost {
    async fn next_request(&mut self) -> RpcRequest {
        let line = self
            .lines
            .next_line()
            .await
            .expect("read")
            .expect("request line");
        serde_json::from_str(&line).expect("request json")
    }

    async fn send_raw(&mut self, line: &str) {
        self.out.write_all(line.as_bytes()).await.expect("write");
        self.out.write_all(b"\n").await.expect("write");
        self.out.flush().await.expect("flush");
    }

    async fn respond(&mut self, response: RpcResponse) {
        let line = serde_json::to_string(&response).expect("response json");
        self.send_raw(&line).await;
    }
}

async fn setup() -> (RemoteScriptChannel, FakeHost) {
    let (client, server) = tokio::io::duplex(8192);
    let mut channel = RemoteScriptChannel::new(PreparedConnector::new(client));
    channel.connect().await.expect("connect");
    let (read_half, out) = tokio::io::split(server);
    let host = FakeHost {
        lines: BufReader::new(read_half).lines(),
        out,
    };
    (channel, host)
}

#[tokio::test(start_paused = true)]
async fn timeout_fires_at_configured_deadline_and_late_response_is_ignored() {
    let (channel, mut host) = setup().await;

    let started = Instant::now();
    let err = channel
        .call_with_timeout("slowOperation()", Duration::from_millis(500))
        .await
        .unwrap_err();
    assert_eq!(started.elapsed(), Duration::from_millis(500));
    match err {
        ChannelError::Timeout { id, timeout_ms } => {
            assert_eq!(id, 1);
            assert_eq!(timeout_ms, 500);
        }
        other => panic!("expected Timeout, got {:?}", other),
    }
    assert_eq!(channel.pending_count(), 0);

    // The host finally answers the abandoned call, then the next one.
    let abandoned = host.next_request().await;
    assert_eq!(abandoned.id, 1);
    host.respond(RpcResponse::success(1, json!({"late": true})))
        .await;

    let (second, ()) = tokio::join!(
        channel.call_with_timeout("fast()", Duration::from_secs(1)),
        async {
            let req = host.next_request().await;
            assert_eq!(req.id, 2);
            host.respond(RpcResponse::success(2, json!({"ok": true})))
                .await;
        }
    );

    assert_eq!(second.unwrap(), json!({"ok": true}));
    assert_eq!(channel.stats().unmatched_responses(), 1);
    assert_eq!(channel.stats().timeouts(), 1);
    assert!(channel.is_connected());
}

#[tokio::test]
async fn responses_may_arrive_out_of_order() {
    let (channel, mut host) = setup().await;

    let (a, b, ()) = tokio::join!(
        channel.call("first()"),
        channel.call("second()"),
        async {
            let r1 = host.next_request().await;
            let r2 = host.next_request().await;
            // Answer in reverse order.
            host.respond(RpcResponse::success(r2.id, json!(r2.params["script"])))
                .await;
            host.respond(RpcResponse::success(r1.id, json!(r1.params["script"])))
                .await;
        }
    );

    assert_eq!(a.unwrap(), json!("first()"));
    assert_eq!(b.unwrap(), json!("second()"));
    assert_eq!(channel.stats().responses_matched(), 2);
    assert_eq!(channel.pending_count(), 0);
}

#[tokio::test]
async fn remote_error_surfaces_as_remote_variant() {
    let (channel, mut host) = setup().await;

    let (result, ()) = tokio::join!(channel.call("app.quit()"), async {
        let req = host.next_request().await;
        host.respond(RpcResponse::failure(req.id, "scripting disabled"))
            .await;
    });

    match result {
        Err(ChannelError::Remote { message }) => assert_eq!(message, "scripting disabled"),
        other => panic!("expected Remote, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_frames_are_dropped_without_failing_the_call() {
    let (channel, mut host) = setup().await;

    let (result, ()) = tokio::join!(channel.call("ping()"), async {
        let req = host.next_request().await;
        host.send_raw("<<not json>>").await;
        host.send_raw(r#"{"id":"wrong-type"}"#).await;
        host.respond(RpcResponse::success(req.id, json!("pong")))
            .await;
    });

    assert_eq!(result.unwrap(), json!("pong"));
    assert_eq!(channel.stats().malformed_frames(), 2);
}

#[tokio::test(start_paused = true)]
async fn transport_loss_leaves_pending_calls_to_their_own_timers() {
    let (channel, host) = setup().await;
    let FakeHost { mut lines, out } = host;

    let started = Instant::now();
    let (result, ()) = tokio::join!(
        channel.call_with_timeout("longRunning()", Duration::from_secs(2)),
        async move {
            let _ = lines.next_line().await;
            drop(lines);
            drop(out);
        }
    );

    assert!(result.unwrap_err().is_timeout());
    assert_eq!(started.elapsed(), Duration::from_secs(2));
    assert!(!channel.is_connected());

    // New calls on a dead channel fail fast.
    let before = Instant::now();
    assert!(matches!(
        channel.call("again()").await,
        Err(ChannelError::NotConnected)
    ));
    assert_eq!(before.elapsed(), Duration::ZERO);
}
