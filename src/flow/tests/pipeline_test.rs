use async_trait::async_trait;
use flow::processor::{
    emit, payload_channel, spawn_stage, IoReader, PayloadSender, Processor, ProcessorError,
    StageExit,
};
use flow::{AbortSignal, Json, JsonPayload, Payload};
use logger::Logger;
use serde::Deserialize;
use std::io::{self, Cursor};
use std::sync::Arc;
use tokio::time::{timeout, Duration};

#[derive(Debug, Deserialize, PartialEq)]
struct Reading {
    sensor: String,
    value: i64,
}

/// Parses each line as a JSON reading. Lines that do not parse are skipped.
struct ParseReadings {
    logger: Logger,
}

#[async_trait]
impl Processor for ParseReadings {
    fn id(&self) -> &str {
        "parse_readings"
    }

    async fn process_data(&self, payload: Payload, output: &PayloadSender, abort: &AbortSignal) {
        let mut target = Json::<serde_json::Value>::default();
        if payload.unmarshal_logged(&mut target, &self.logger).is_err() {
            return;
        }
        if let Some(value) = target.into_inner() {
            let _ = emit(output, abort, Payload::structured(JsonPayload::new(value))).await;
        }
    }

    async fn finish(&self, _output: &PayloadSender, _abort: &AbortSignal) {}
}

/// Fails the pipeline when it sees a negative value.
struct RejectNegative;

#[async_trait]
impl Processor for RejectNegative {
    fn id(&self) -> &str {
        "reject_negative"
    }

    async fn process_data(&self, payload: Payload, output: &PayloadSender, abort: &AbortSignal) {
        let reading = match payload.decode::<Reading>() {
            Ok(reading) => reading,
            Err(err) => {
                abort.abort(ProcessorError::ProcessingError(err.to_string()));
                return;
            }
        };
        if reading.value < 0 {
            abort.abort(ProcessorError::ProcessingError(format!(
                "negative reading from {}",
                reading.sensor
            )));
            return;
        }
        let _ = emit(output, abort, payload).await;
    }

    async fn finish(&self, output: &PayloadSender, abort: &AbortSignal) {
        let _ = emit(output, abort, Payload::text("done")).await;
    }
}

fn quiet() -> Logger {
    Logger::with_output(io::sink())
}

async fn run(input: &str) -> (Vec<Payload>, Vec<StageExit>, AbortSignal) {
    let abort = AbortSignal::new();
    let (read_tx, read_rx) = payload_channel(2);
    let (parse_tx, parse_rx) = payload_channel(2);
    let (out_tx, mut out_rx) = payload_channel(2);

    let reader = IoReader::builder(Cursor::new(input.as_bytes().to_vec()))
        .id("lines")
        .logger(quiet())
        .build()
        .expect("build");
    let handles = vec![
        spawn_stage(Arc::new(reader), None, read_tx, abort.clone(), quiet()),
        spawn_stage(
            Arc::new(ParseReadings { logger: quiet() }),
            Some(read_rx),
            parse_tx,
            abort.clone(),
            quiet(),
        ),
        spawn_stage(
            Arc::new(RejectNegative),
            Some(parse_rx),
            out_tx,
            abort.clone(),
            quiet(),
        ),
    ];

    let mut collected = Vec::new();
    while let Some(payload) = out_rx.recv().await {
        collected.push(payload);
    }
    let mut exits = Vec::new();
    for handle in handles {
        let exit = timeout(Duration::from_secs(5), handle)
            .await
            .expect("stage should finish")
            .expect("join");
        exits.push(exit);
    }
    (collected, exits, abort)
}

#[tokio::test]
async fn three_stage_pipeline_completes_in_order() {
    let input = "{\"sensor\":\"a\",\"value\":1}\nnot json\n{\"sensor\":\"b\",\"value\":2}\n";

    let (collected, exits, abort) = run(input).await;

    assert!(abort.outcome().is_ok());
    assert!(exits.iter().all(|exit| *exit == StageExit::Completed));
    assert_eq!(collected.len(), 3);
    let first: Reading = collected[0].decode().expect("first");
    let second: Reading = collected[1].decode().expect("second");
    assert_eq!(first.sensor, "a");
    assert_eq!(second.sensor, "b");
    assert_eq!(collected[2].as_text(), Some("done"));
}

#[tokio::test]
async fn failing_stage_aborts_every_stage() {
    let mut input = String::from("{\"sensor\":\"bad\",\"value\":-1}\n");
    for i in 0..1000 {
        input.push_str(&format!("{{\"sensor\":\"s{i}\",\"value\":{i}}}\n"));
    }

    let (collected, exits, abort) = run(&input).await;

    match abort.outcome() {
        Err(ProcessorError::ProcessingError(msg)) => assert!(msg.contains("bad")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(collected.is_empty());
    assert_eq!(exits[2], StageExit::Aborted);
    assert!(exits.iter().all(|exit| *exit == StageExit::Aborted));
}
