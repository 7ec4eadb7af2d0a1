use std::future::Future;
use std::time::{Duration, Instant};

use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use hostbridge_core::{codec, BridgeError, CallOptions, CancelToken, Value};

use crate::session::Session;
use crate::transcript::{Outcome, Transcript};

const SHORT_TIMEOUT: Duration = Duration::from_millis(100);
const CANCEL_AFTER: Duration = Duration::from_millis(50);

type Tracked = LocalBoxFuture<'static, (String, Outcome, Duration)>;

fn track<F>(label: impl Into<String>, call: F) -> Tracked
where
    F: Future<Output = Result<String, BridgeError>> + 'static,
{
    let label = label.into();
    let started = Instant::now();
    async move {
        let outcome = match call.await {
            Ok(text) => Outcome::Ok(text),
            Err(e) => Outcome::failed(&e),
        };
        (label, outcome, started.elapsed())
    }
    .boxed_local()
}

fn encoded(result: Result<Value, BridgeError>) -> Result<String, BridgeError> {
    result.and_then(|value| codec::encode(&value))
}

fn operands(a: i32, b: i32) -> Value {
    Value::object([("a", Value::from(a)), ("b", Value::from(b))])
}

/// Issue every scripted call at once and collect the outcomes as they land.
pub async fn run(session: &Session) -> anyhow::Result<Transcript> {
    let bridge = &session.bridge;
    let cancel = CancelToken::new();

    let calls: FuturesUnordered<Tracked> = [
        track("add {a:1,b:2}", bridge.invoke("add", &operands(1, 2)).map(encoded)),
        track("sub {a:5,b:3}", bridge.invoke("sub", &operands(5, 3)).map(encoded)),
        track("greet \"World\"", bridge.invoke("greet", &Value::from("World")).map(encoded)),
        track("divide {a:1,b:0}", bridge.invoke("divide", &operands(1, 0)).map(encoded)),
        track(
            "fs.read \"config.json\"",
            bridge.invoke("fs.read", &Value::from("config.json")).map(encoded),
        ),
        track("text echo \"hello\"", bridge.invoke_text("echo", "hello")),
        track(
            "void log",
            bridge
                .invoke_void("log", &Value::object([("msg", Value::from("from demo"))]))
                .map(|r| r.map(|()| "(done)".to_owned())),
        ),
        track(
            format!("slow_operation (timeout {} ms)", SHORT_TIMEOUT.as_millis()),
            bridge
                .invoke_with("slow_operation", &Value::Null, &CallOptions::new().timeout(SHORT_TIMEOUT))
                .map(encoded),
        ),
        track(
            format!("slow_operation (cancelled after {} ms)", CANCEL_AFTER.as_millis()),
            bridge
                .invoke_with(
                    "slow_operation",
                    &Value::from("cancel me"),
                    &CallOptions::new().no_timeout().cancel_with(cancel.clone()),
                )
                .map(encoded),
        ),
    ]
    .into_iter()
    .collect();

    let canceller = async {
        tokio::time::sleep(CANCEL_AFTER).await;
        cancel.cancel();
    };
    let collect = calls.fold(Transcript::new(100), |mut transcript, (label, outcome, elapsed)| async move {
        transcript.push(label, outcome, elapsed);
        transcript
    });
    let ((), transcript) = futures::join!(canceller, collect);
    Ok(transcript)
}
