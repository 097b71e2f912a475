// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runtime environments driven against real queues and stub components.

use std::time::Duration;
use tempfile::TempDir;
use tokio::runtime::Handle;

use super::*;
use crate::components::stub::{
    CollectingEmitter, CountingAggregator, FailingSource, UppercaseOperator, VecSource, WindowRecorder,
};
use crate::config::StreamingMessageQueueConfiguration;
use crate::message::StreamingDataMessage;
use crate::queue::StreamingMessageQueue;
use crate::strategy::response::MessageCountResponseWaitStrategy;

struct Queues {
    _dir: TempDir,
    input: StreamingMessageQueue,
    output: StreamingMessageQueue,
    stats: StreamingMessageQueue,
}

fn queues() -> Queues {
    let dir = TempDir::new().unwrap();
    let open = |id: &str, strategy: &str| {
        StreamingMessageQueue::initialize(
            &StreamingMessageQueueConfiguration::new(id)
                .with_wait_strategy(strategy)
                .with_base_path(dir.path()),
        )
        .unwrap()
    };
    Queues {
        input: open("input", "blocking"),
        output: open("output", "blocking"),
        stats: open("stats", "directPass"),
        _dir: dir,
    }
}

fn builder(queues: &Queues, component_id: &str) -> RuntimeEnvironmentBuilder {
    RuntimeEnvironmentBuilder::new()
        .with_node_id("node-1")
        .with_pipeline_id("pipe")
        .with_component_id(component_id)
        .with_stats_producer(queues.stats.producer())
        .with_stats_interval(Duration::from_millis(20))
        .with_shutdown_timeout(Duration::from_secs(2))
}

fn drain(queue: &StreamingMessageQueue) -> Vec<String> {
    std::iter::from_fn(|| queue.next())
        .map(|m| String::from_utf8(m.into_body()).unwrap())
        .collect()
}

async fn collect_until(queue: &StreamingMessageQueue, expected: usize) -> Vec<String> {
    let mut collected = Vec::new();
    for _ in 0..300 {
        collected.extend(drain(queue));
        if collected.len() >= expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    collected
}

fn feed(queue: &StreamingMessageQueue, bodies: &[&str]) {
    let producer = queue.producer();
    for body in bodies {
        assert!(producer.insert(&StreamingDataMessage::now(*body)));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_source_runtime_forwards_in_order() {
    let queues = queues();
    let mut runtime = builder(&queues, "src")
        .with_component(Component::Source(Box::new(VecSource::new(["1", "2", "3"]))))
        .with_producer(queues.output.producer())
        .build()
        .unwrap();

    assert_eq!(runtime.state(), RuntimeState::Created);
    assert!(runtime.start(&Handle::current()));
    assert!(!runtime.start(&Handle::current()));
    assert_eq!(runtime.state(), RuntimeState::Running);

    assert_eq!(collect_until(&queues.output, 3).await, vec!["1", "2", "3"]);

    assert!(runtime.shutdown().await);
    assert!(!runtime.shutdown().await);
    assert_eq!(runtime.state(), RuntimeState::Stopped);

    let stats: Vec<ComponentStatistics> = std::iter::from_fn(|| queues.stats.next())
        .map(|m| ComponentStatistics::from_message(&m).unwrap())
        .collect();
    assert_eq!(stats.last().unwrap().total_messages, 3);
    assert_eq!(stats.last().unwrap().component_id, "src");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_direct_response_runtime_drops_failed_messages() {
    let queues = queues();
    let mut runtime = builder(&queues, "upper")
        .with_component(Component::DirectResponse(Box::new(UppercaseOperator)))
        .with_consumer(queues.input.consumer())
        .with_producer(queues.output.producer())
        .build()
        .unwrap();
    runtime.start(&Handle::current());

    feed(&queues.input, &["a", "fail", "b"]);
    assert_eq!(collect_until(&queues.output, 2).await, vec!["A", "B"]);

    feed(&queues.input, &["c"]);
    assert_eq!(collect_until(&queues.output, 1).await, vec!["C"]);

    assert!(runtime.shutdown().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_emitter_runtime_receives_and_shuts_down_component() {
    let queues = queues();
    let sink = CollectingEmitter::new();
    let mut runtime = builder(&queues, "sink")
        .with_component(Component::Emitter(Box::new(sink.clone())))
        .with_consumer(queues.input.consumer())
        .build()
        .unwrap();
    runtime.start(&Handle::current());

    feed(&queues.input, &["x", "y"]);
    for _ in 0..300 {
        if sink.bodies().len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sink.bodies(), vec!["x", "y"]);

    runtime.shutdown().await;
    assert!(sink.was_shut_down());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_count_trigger_flushes_exactly_once() {
    let queues = queues();
    let aggregator = CountingAggregator::new();
    let mut runtime = builder(&queues, "count")
        .with_component(Component::DelayedResponse(Box::new(aggregator.clone())))
        .with_consumer(queues.input.consumer())
        .with_producer(queues.output.producer())
        .with_response_wait_strategy(Box::new(MessageCountResponseWaitStrategy::with_max_messages(3)))
        .build()
        .unwrap();
    runtime.start(&Handle::current());

    feed(&queues.input, &["a", "b", "c"]);
    assert_eq!(collect_until(&queues.output, 1).await, vec!["3"]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(drain(&queues.output).is_empty());
    assert_eq!(aggregator.results_taken(), 1);

    runtime.shutdown().await;
    assert!(drain(&queues.output).is_empty());
    assert_eq!(aggregator.results_taken(), 1);
}

#[tokio::test]
async fn test_count_trigger_bounds_windows_over_a_backlog() {
    let queues = queues();
    let bodies: Vec<String> = (0..30).map(|i| i.to_string()).collect();
    let backlog: Vec<&str> = bodies.iter().map(String::as_str).collect();
    feed(&queues.input, &backlog);

    let mut runtime = builder(&queues, "count")
        .with_component(Component::DelayedResponse(Box::new(CountingAggregator::new())))
        .with_consumer(queues.input.consumer())
        .with_producer(queues.output.producer())
        .with_response_wait_strategy(Box::new(MessageCountResponseWaitStrategy::with_max_messages(3)))
        .with_flush_on_shutdown(false)
        .build()
        .unwrap();
    runtime.start(&Handle::current());

    let windows = collect_until(&queues.output, 10).await;
    assert_eq!(windows, vec!["3"; 10]);

    runtime.shutdown().await;
    assert!(drain(&queues.output).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_windows_keep_every_message_exactly_once_under_concurrent_inserts() {
    const TOTAL: usize = 120;
    let queues = queues();
    let recorder = WindowRecorder::new();
    let mut runtime = builder(&queues, "windows")
        .with_component(Component::DelayedResponse(Box::new(recorder.clone())))
        .with_consumer(queues.input.consumer())
        .with_producer(queues.output.producer())
        .with_response_wait_strategy(Box::new(MessageCountResponseWaitStrategy::with_max_messages(4)))
        .build()
        .unwrap();
    runtime.start(&Handle::current());

    let producer = queues.input.producer();
    let feeder = tokio::spawn(async move {
        for i in 0..TOTAL {
            assert!(producer.insert(&StreamingDataMessage::now(i.to_string())));
            if i % 7 == 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            } else {
                tokio::task::yield_now().await;
            }
        }
    });
    feeder.await.unwrap();

    for _ in 0..300 {
        if recorder.received() == TOTAL as u64 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(recorder.received(), TOTAL as u64);

    runtime.shutdown().await;
    let windows = drain(&queues.output);
    assert!(windows.len() > 1, "expected several windows, got {:?}", windows);
    assert!(windows.iter().all(|w| !w.is_empty()));

    let flushed: Vec<usize> = windows
        .iter()
        .flat_map(|w| w.split(','))
        .map(|body| body.parse().unwrap())
        .collect();
    assert_eq!(flushed, (0..TOTAL).collect::<Vec<usize>>());
}

#[tokio::test]
async fn test_failing_source_backs_off() {
    let queues = queues();
    let source = FailingSource::new();
    let mut runtime = builder(&queues, "broken")
        .with_component(Component::Source(Box::new(source.clone())))
        .with_producer(queues.output.producer())
        .build()
        .unwrap();
    runtime.start(&Handle::current());

    tokio::time::sleep(Duration::from_millis(200)).await;
    runtime.shutdown().await;

    let attempts = source.attempts();
    assert!(attempts > 0);
    assert!(attempts < 30, "source retried {} times in 200ms", attempts);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_partial_window_flushed_on_shutdown() {
    let queues = queues();
    let mut runtime = builder(&queues, "count")
        .with_component(Component::DelayedResponse(Box::new(CountingAggregator::new())))
        .with_consumer(queues.input.consumer())
        .with_producer(queues.output.producer())
        .with_response_wait_strategy(Box::new(MessageCountResponseWaitStrategy::with_max_messages(10)))
        .build()
        .unwrap();
    runtime.start(&Handle::current());

    feed(&queues.input, &["a", "b"]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(drain(&queues.output).is_empty());

    runtime.shutdown().await;
    assert_eq!(drain(&queues.output), vec!["2"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_partial_window_dropped_without_flush_on_shutdown() {
    let queues = queues();
    let mut runtime = builder(&queues, "count")
        .with_component(Component::DelayedResponse(Box::new(CountingAggregator::new())))
        .with_consumer(queues.input.consumer())
        .with_producer(queues.output.producer())
        .with_response_wait_strategy(Box::new(MessageCountResponseWaitStrategy::with_max_messages(10)))
        .with_flush_on_shutdown(false)
        .build()
        .unwrap();
    runtime.start(&Handle::current());

    feed(&queues.input, &["a", "b"]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    runtime.shutdown().await;
    assert!(drain(&queues.output).is_empty());
}

#[tokio::test]
async fn test_never_started_runtime_can_shut_down() {
    let queues = queues();
    let sink = CollectingEmitter::new();
    let mut runtime = builder(&queues, "sink")
        .with_component(Component::Emitter(Box::new(sink.clone())))
        .with_consumer(queues.input.consumer())
        .build()
        .unwrap();

    assert!(runtime.shutdown().await);
    assert_eq!(runtime.state(), RuntimeState::Stopped);
    assert!(sink.was_shut_down());
    assert!(!runtime.start(&Handle::current()));
    assert!(!runtime.shutdown().await);
}

#[tokio::test]
async fn test_builder_reports_missing_inputs() {
    let queues = queues();
    let missing = |result: Result<Box<dyn ComponentRuntime>, MissingInputError>| match result {
        Err(e) => e.missing,
        Ok(_) => "nothing",
    };

    assert_eq!(missing(builder(&queues, "x").build()), "component");
    assert_eq!(
        missing(
            RuntimeEnvironmentBuilder::new()
                .with_node_id("n")
                .with_pipeline_id("p")
                .with_component_id("x")
                .with_component(Component::Emitter(Box::new(CollectingEmitter::new())))
                .build()
        ),
        "statistics producer"
    );
    assert_eq!(
        missing(
            builder(&queues, "x")
                .with_component(Component::Source(Box::new(VecSource::new(["a"]))))
                .build()
        ),
        "producer"
    );
    assert_eq!(
        missing(
            builder(&queues, "x")
                .with_component(Component::Emitter(Box::new(CollectingEmitter::new())))
                .build()
        ),
        "consumer"
    );
    assert_eq!(
        missing(
            builder(&queues, "x")
                .with_component(Component::DelayedResponse(Box::new(CountingAggregator::new())))
                .with_consumer(queues.input.consumer())
                .with_producer(queues.output.producer())
                .build()
        ),
        "response wait strategy"
    );
    assert_eq!(
        missing(
            builder(&queues, " ")
                .with_component(Component::Emitter(Box::new(CollectingEmitter::new())))
                .build()
        ),
        "component id"
    );
}

#[test]
fn test_wiring_checked_without_component() {
    let queues = queues();
    let unwired = builder(&queues, "x");
    assert_eq!(
        unwired.missing_input_for(ComponentType::Emitter),
        Some(MissingInputError::new("consumer"))
    );

    let reading = unwired.with_consumer(queues.input.consumer());
    assert_eq!(reading.missing_input_for(ComponentType::Sink), None);
    assert_eq!(
        reading.missing_input_for(ComponentType::DirectResponseOperator),
        Some(MissingInputError::new("producer"))
    );

    let wired = reading.with_producer(queues.output.producer());
    assert_eq!(wired.missing_input_for(ComponentType::Source), None);
    assert_eq!(
        wired.missing_input_for(ComponentType::DelayedResponseOperator),
        Some(MissingInputError::new("response wait strategy"))
    );
}
