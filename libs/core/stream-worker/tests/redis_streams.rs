//! Publish/consume against a real Redis (Docker required).
//!
//! Run with `cargo test -p stream-worker -- --ignored`.

use redis::AsyncCommands;
use std::time::Duration;
use stream_worker::{
    EventPublisher, EventSubscriber, ProducerConfig, StreamConsumer, StreamProducer,
    WorkerConfig, dedup_key,
};
use test_utils::TestRedis;

const TOPIC: &str = "meeting-created";
const GROUP: &str = "utility-service-group";

fn consumer(redis: &TestRedis, name: &str) -> StreamConsumer {
    let config = WorkerConfig::new(TOPIC, GROUP)
        .with_consumer_name(name)
        .with_claim_idle_ms(50);
    StreamConsumer::new(redis.connection(), config)
}

#[tokio::test]
#[ignore]
async fn test_publish_with_same_key_appends_once() {
    let redis = TestRedis::new().await;
    let producer = StreamProducer::new(redis.connection(), ProducerConfig::default());

    let first = producer.publish(TOPIC, "key-1", r#"{"meetingId":1}"#).await.unwrap();
    let retry = producer.publish(TOPIC, "key-1", r#"{"meetingId":1}"#).await.unwrap();

    assert!(!first.deduplicated);
    assert!(retry.deduplicated);
    assert_eq!(first.message_id, retry.message_id);

    assert_eq!(redis.stream_len(TOPIC).await, 1);

    let mut conn = redis.connection();
    let ttl: i64 = conn.ttl(dedup_key(TOPIC, "key-1")).await.unwrap();
    assert!(ttl > 0);
}

#[tokio::test]
#[ignore]
async fn test_uncommitted_message_is_redelivered_and_committed_one_is_not() {
    let redis = TestRedis::new().await;
    let producer = StreamProducer::new(redis.connection(), ProducerConfig::default());
    let mut sub = consumer(&redis, "c1");
    sub.subscribe(TOPIC, GROUP).await.unwrap();

    producer.publish(TOPIC, "a", r#"{"n":1}"#).await.unwrap();
    producer.publish(TOPIC, "b", r#"{"n":2}"#).await.unwrap();

    let first = sub.poll(Duration::from_millis(200)).await.unwrap().unwrap();
    assert_eq!(first.key.as_deref(), Some("a"));
    assert!(!first.redelivered);

    // not committed: the same entry comes back before anything new
    let again = sub.poll(Duration::from_millis(200)).await.unwrap().unwrap();
    assert_eq!(again.id, first.id);
    assert!(again.redelivered);

    sub.commit(&again).await.unwrap();
    let second = sub.poll(Duration::from_millis(200)).await.unwrap().unwrap();
    assert_eq!(second.key.as_deref(), Some("b"));
    sub.commit(&second).await.unwrap();

    assert!(sub.poll(Duration::from_millis(100)).await.unwrap().is_none());
    assert_eq!(redis.pending(TOPIC, GROUP).await, 0);
    sub.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_abandoned_message_is_claimed_by_next_subscriber() {
    let redis = TestRedis::new().await;
    let producer = StreamProducer::new(redis.connection(), ProducerConfig::default());

    let mut crashed = consumer(&redis, "crashed");
    crashed.subscribe(TOPIC, GROUP).await.unwrap();
    producer.publish(TOPIC, "lost", r#"{"n":1}"#).await.unwrap();
    let delivered = crashed.poll(Duration::from_millis(200)).await.unwrap().unwrap();
    // simulate a crash: no commit, no close

    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut replacement = consumer(&redis, "replacement");
    replacement.subscribe(TOPIC, GROUP).await.unwrap();
    let recovered = replacement.poll(Duration::from_millis(200)).await.unwrap().unwrap();

    assert_eq!(recovered.id, delivered.id);
    assert!(recovered.redelivered);
}

#[tokio::test]
#[ignore]
async fn test_poll_times_out_with_none() {
    let redis = TestRedis::new().await;
    let mut sub = consumer(&redis, "idle");
    sub.subscribe(TOPIC, GROUP).await.unwrap();

    let started = std::time::Instant::now();
    assert!(sub.poll(Duration::from_millis(150)).await.unwrap().is_none());
    assert!(started.elapsed() >= Duration::from_millis(100));
}
