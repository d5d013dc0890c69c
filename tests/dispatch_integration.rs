//! Dispatch pipeline integration tests.
//!
//! Exercise the creation service and the dispatch engine against the
//! memory store with scripted channel adapters, without any server or
//! broker running.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use courier_notification_service::channels::{ChannelSender, TransportError};
use courier_notification_service::error::AppError;
use courier_notification_service::notification::{
    Channel, ChannelSet, CreateNotificationRequest, Dispatcher, NewNotification,
    NotificationService, OutboundMessage, Status,
};
use courier_notification_service::store::{MemoryNotificationStore, NotificationStore};

/// Scripted adapter: counts invocations, optionally fails or stalls.
struct ScriptedSender {
    channel: Channel,
    fail: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSender {
    fn ok(channel: Channel) -> (Arc<dyn ChannelSender>, Arc<AtomicUsize>) {
        Self::build(channel, false, None)
    }

    fn failing(channel: Channel) -> (Arc<dyn ChannelSender>, Arc<AtomicUsize>) {
        Self::build(channel, true, None)
    }

    fn stalling(channel: Channel, delay: Duration) -> (Arc<dyn ChannelSender>, Arc<AtomicUsize>) {
        Self::build(channel, false, Some(delay))
    }

    fn build(
        channel: Channel,
        fail: bool,
        delay: Option<Duration>,
    ) -> (Arc<dyn ChannelSender>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let sender: Arc<dyn ChannelSender> = Arc::new(ScriptedSender {
            channel,
            fail,
            delay,
            calls: calls.clone(),
        });
        (sender, calls)
    }
}

#[async_trait]
impl ChannelSender for ScriptedSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(
        &self,
        _recipient: &str,
        _message: &OutboundMessage,
    ) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            Err(TransportError::SendFailed {
                channel: self.channel,
                reason: "scripted failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

struct TestEnvironment {
    store: Arc<MemoryNotificationStore>,
    service: NotificationService,
    dispatcher: Arc<Dispatcher>,
    email_calls: Arc<AtomicUsize>,
    sms_calls: Arc<AtomicUsize>,
    whatsapp_calls: Arc<AtomicUsize>,
}

fn create_test_environment(
    senders_with_calls: Vec<(Arc<dyn ChannelSender>, Arc<AtomicUsize>)>,
) -> TestEnvironment {
    let store = Arc::new(MemoryNotificationStore::new());
    let dyn_store: Arc<dyn NotificationStore> = store.clone();

    let mut senders = Vec::new();
    let mut counters = Vec::new();
    for (sender, calls) in senders_with_calls {
        senders.push(sender);
        counters.push(calls);
    }

    let dispatcher = Arc::new(Dispatcher::new(
        dyn_store.clone(),
        senders,
        Duration::from_millis(200),
    ));

    let mut counters = counters.into_iter();
    TestEnvironment {
        store,
        service: NotificationService::new(dyn_store),
        dispatcher,
        email_calls: counters.next().unwrap(),
        sms_calls: counters.next().unwrap(),
        whatsapp_calls: counters.next().unwrap(),
    }
}

fn all_channels_ok() -> TestEnvironment {
    create_test_environment(vec![
        ScriptedSender::ok(Channel::Email),
        ScriptedSender::ok(Channel::Sms),
        ScriptedSender::ok(Channel::Whatsapp),
    ])
}

fn invoice_request() -> CreateNotificationRequest {
    CreateNotificationRequest {
        affair: "Invoice".to_string(),
        email: "a@b.com".to_string(),
        body: "Pay now".to_string(),
        number: "+10000000".to_string(),
    }
}

#[tokio::test]
async fn created_records_start_pending_without_send_time() {
    let env = all_channels_ok();

    let record = env.service.create(invoice_request()).await.unwrap();

    assert_eq!(record.status, Status::Pending);
    assert!(record.send_at.is_none());
    assert_eq!(record.channels, ChannelSet::all());

    // create never dispatches
    assert_eq!(env.email_calls.load(Ordering::SeqCst), 0);
    assert_eq!(env.sms_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_and_malformed_input_is_rejected() {
    let env = all_channels_ok();

    let mut request = invoice_request();
    request.affair = "   ".to_string();
    let err = env.service.create(request).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let mut request = invoice_request();
    request.email = "not-an-address".to_string();
    let err = env.service.create(request).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert!(env.store.is_empty());
}

#[tokio::test]
async fn dispatch_marks_sent_and_mentions_every_channel() {
    let env = all_channels_ok();

    let record = env.service.create(invoice_request()).await.unwrap();
    let summary = env.dispatcher.dispatch(record.id).await.unwrap();

    assert!(summary.sent);
    assert_eq!(summary.outcomes.len(), 3);
    assert!(summary.outcomes.iter().all(|o| o.success));

    let lines = summary.lines().join("\n");
    assert!(lines.contains("email"));
    assert!(lines.contains("SMS"));
    assert!(lines.contains("WhatsApp"));

    let stored = env.service.get(record.id).await.unwrap();
    assert_eq!(stored.status, Status::Sent);
    assert!(stored.send_at.is_some());
}

#[tokio::test]
async fn second_dispatch_fails_and_does_not_reinvoke_adapters() {
    let env = all_channels_ok();

    let record = env.service.create(invoice_request()).await.unwrap();
    env.dispatcher.dispatch(record.id).await.unwrap();

    let calls_after_first = env.email_calls.load(Ordering::SeqCst)
        + env.sms_calls.load(Ordering::SeqCst)
        + env.whatsapp_calls.load(Ordering::SeqCst);
    assert_eq!(calls_after_first, 3);

    let err = env.dispatcher.dispatch(record.id).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyProcessed(_)));

    let calls_after_second = env.email_calls.load(Ordering::SeqCst)
        + env.sms_calls.load(Ordering::SeqCst)
        + env.whatsapp_calls.load(Ordering::SeqCst);
    assert_eq!(calls_after_second, 3);

    let stored = env.service.get(record.id).await.unwrap();
    assert_eq!(stored.status, Status::Sent);
}

#[tokio::test]
async fn dispatch_unknown_id_is_not_found() {
    let env = all_channels_ok();

    let err = env.dispatcher.dispatch(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn empty_selector_never_changes_status() {
    let env = all_channels_ok();

    let mut new = NewNotification::pending(
        "Invoice".to_string(),
        "a@b.com".to_string(),
        "Pay now".to_string(),
        "+10000000".to_string(),
    );
    new.channels = ChannelSet::empty();
    let record = env.store.insert(new).await.unwrap();

    let err = env.dispatcher.dispatch(record.id).await.unwrap_err();
    assert!(matches!(err, AppError::ChannelNotSupported));
    assert_eq!(
        err.to_string(),
        "communication channel not supported"
    );

    let stored = env.service.get(record.id).await.unwrap();
    assert_eq!(stored.status, Status::Pending);
    assert!(stored.send_at.is_none());
    assert_eq!(env.email_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unrecognized_selector_parses_empty_and_is_rejected() {
    let env = all_channels_ok();

    let mut new = NewNotification::pending(
        "Invoice".to_string(),
        "a@b.com".to_string(),
        "Pay now".to_string(),
        "+10000000".to_string(),
    );
    new.channels = "CARRIER_PIGEON".parse().unwrap();
    let record = env.store.insert(new).await.unwrap();

    let err = env.dispatcher.dispatch(record.id).await.unwrap_err();
    assert!(matches!(err, AppError::ChannelNotSupported));
}

#[tokio::test]
async fn one_failing_channel_does_not_abort_siblings() {
    let env = create_test_environment(vec![
        ScriptedSender::failing(Channel::Email),
        ScriptedSender::ok(Channel::Sms),
        ScriptedSender::ok(Channel::Whatsapp),
    ]);

    let record = env.service.create(invoice_request()).await.unwrap();
    let summary = env.dispatcher.dispatch(record.id).await.unwrap();

    assert!(summary.sent);
    assert_eq!(env.sms_calls.load(Ordering::SeqCst), 1);
    assert_eq!(env.whatsapp_calls.load(Ordering::SeqCst), 1);

    let email_outcome = summary
        .outcomes
        .iter()
        .find(|o| o.channel == Channel::Email)
        .unwrap();
    assert!(!email_outcome.success);
    assert!(email_outcome.detail.as_deref().unwrap().contains("scripted failure"));

    let stored = env.service.get(record.id).await.unwrap();
    assert_eq!(stored.status, Status::Sent);
}

#[tokio::test]
async fn total_failure_leaves_record_pending() {
    let env = create_test_environment(vec![
        ScriptedSender::failing(Channel::Email),
        ScriptedSender::failing(Channel::Sms),
        ScriptedSender::failing(Channel::Whatsapp),
    ]);

    let record = env.service.create(invoice_request()).await.unwrap();
    let summary = env.dispatcher.dispatch(record.id).await.unwrap();

    assert!(!summary.sent);
    assert!(summary.outcomes.iter().all(|o| !o.success));

    let stored = env.service.get(record.id).await.unwrap();
    assert_eq!(stored.status, Status::Pending);
    assert!(stored.send_at.is_none());
}

#[tokio::test]
async fn stalling_channel_times_out_but_siblings_still_run() {
    let env = create_test_environment(vec![
        ScriptedSender::stalling(Channel::Email, Duration::from_secs(5)),
        ScriptedSender::ok(Channel::Sms),
        ScriptedSender::ok(Channel::Whatsapp),
    ]);

    let record = env.service.create(invoice_request()).await.unwrap();
    let summary = env.dispatcher.dispatch(record.id).await.unwrap();

    assert!(summary.sent);

    let email_outcome = summary
        .outcomes
        .iter()
        .find(|o| o.channel == Channel::Email)
        .unwrap();
    assert!(!email_outcome.success);
    assert!(email_outcome.detail.as_deref().unwrap().contains("timed out"));
    assert_eq!(env.sms_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_dispatches_produce_exactly_one_winner() {
    let env = all_channels_ok();

    let record = env.service.create(invoice_request()).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let dispatcher = env.dispatcher.clone();
        let id = record.id;
        handles.push(tokio::spawn(async move { dispatcher.dispatch(id).await }));
    }

    let mut successes = 0;
    let mut already_processed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(summary) => {
                assert!(summary.sent);
                successes += 1;
            }
            Err(AppError::AlreadyProcessed(_)) => already_processed += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(already_processed, 9);

    // No double-send: each adapter was invoked exactly once
    assert_eq!(env.email_calls.load(Ordering::SeqCst), 1);
    assert_eq!(env.sms_calls.load(Ordering::SeqCst), 1);
    assert_eq!(env.whatsapp_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn list_returns_newest_first_pages() {
    let env = all_channels_ok();

    for i in 0..12 {
        let mut request = invoice_request();
        request.affair = format!("Invoice {}", i);
        env.service.create(request).await.unwrap();
        // Memory store timestamps at creation; keep them distinct
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let page = env.service.list(0, 10).await.unwrap();
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.total, 12);
    assert_eq!(page.items[0].affair, "Invoice 11");

    let rest = env.service.list(1, 10).await.unwrap();
    assert_eq!(rest.items.len(), 2);
}
