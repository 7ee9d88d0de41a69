use freshkeeper::bridge::push::{DEFAULT_PUSH_BODY, DEFAULT_PUSH_TAG, DEFAULT_PUSH_TITLE};
use freshkeeper::bridge::RecordingWindows;
use freshkeeper::notification::{Branding, MemorySink, NotificationData, NotificationOptions};
use freshkeeper::{BackgroundChannelBridge, BridgeMessage, WorkerEvent, WorkerState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

struct Harness {
    bridge: BackgroundChannelBridge,
    sink: Arc<MemorySink>,
    windows: Arc<RecordingWindows>,
    messages: UnboundedReceiver<BridgeMessage>,
}

fn harness_with(sink: MemorySink, windows: RecordingWindows) -> Harness {
    let sink = Arc::new(sink);
    let windows = Arc::new(windows);
    let (tx, messages) = mpsc::unbounded_channel();
    let bridge = BackgroundChannelBridge::new(sink.clone(), windows.clone(), tx, Branding::default());
    Harness {
        bridge,
        sink,
        windows,
        messages,
    }
}

fn harness() -> Harness {
    harness_with(MemorySink::default(), RecordingWindows::new())
}

/// 注销并等待 worker 处理完已排队的事件
async fn flush(bridge: &BackgroundChannelBridge) {
    if let Some(worker) = bridge.unregister() {
        worker.await.unwrap();
    }
}

fn item_data(item_id: &str) -> NotificationData {
    NotificationData {
        item_id: Some(item_id.to_string()),
        url: Some("/".to_string()),
    }
}

#[tokio::test]
async fn test_double_register_shows_push_once() {
    let h = harness();
    assert!(h.bridge.register());
    assert!(!h.bridge.register());

    h.bridge
        .post(WorkerEvent::Push(r#"{"title":"Milk","body":"Expires tomorrow"}"#.to_string()))
        .unwrap();
    flush(&h.bridge).await;

    let shown = h.sink.history();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Milk");
    assert_eq!(shown[0].body, "Expires tomorrow");
}

#[tokio::test]
async fn test_push_defaults() {
    let h = harness();
    h.bridge.register();

    h.bridge.post(WorkerEvent::Push("{}".to_string())).unwrap();
    h.bridge.post(WorkerEvent::Push("not json".to_string())).unwrap();
    flush(&h.bridge).await;

    let shown = h.sink.history();
    assert_eq!(shown.len(), 2);
    for options in &shown {
        assert_eq!(options.title, DEFAULT_PUSH_TITLE);
        assert_eq!(options.body, DEFAULT_PUSH_BODY);
        assert_eq!(options.tag.as_deref(), Some(DEFAULT_PUSH_TAG));
        let actions: Vec<&str> = options.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["view", "close"]);
    }
    // 相同 tag 替换而不是堆叠
    assert_eq!(h.sink.open().len(), 1);
}

#[tokio::test]
async fn test_empty_push_is_ignored() {
    let h = harness();
    h.bridge.register();

    h.bridge.post(WorkerEvent::Push(String::new())).unwrap();
    h.bridge.post(WorkerEvent::Push("   ".to_string())).unwrap();
    flush(&h.bridge).await;

    assert_eq!(h.sink.show_count(), 0);
}

#[tokio::test]
async fn test_view_click_opens_app_and_reports() {
    let mut h = harness();
    h.bridge.register();

    h.bridge
        .post(WorkerEvent::NotificationClick {
            action: "view".to_string(),
            tag: Some("freshkeeper-7".to_string()),
            data: item_data("7"),
        })
        .unwrap();

    let message = h.messages.recv().await.unwrap();
    assert_eq!(
        message,
        BridgeMessage::ViewRequested {
            item_id: Some("7".to_string()),
            url: "/".to_string(),
        }
    );
    assert_eq!(h.windows.opened(), vec!["/"]);
    assert_eq!(h.windows.focus_count(), 0);
}

#[tokio::test]
async fn test_view_click_focuses_visible_window() {
    let mut h = harness_with(MemorySink::default(), RecordingWindows::new().with_visible_window());
    h.bridge.register();

    h.bridge
        .post(WorkerEvent::NotificationClick {
            action: "view".to_string(),
            tag: None,
            data: NotificationData::default(),
        })
        .unwrap();

    let message = h.messages.recv().await.unwrap();
    assert!(matches!(message, BridgeMessage::ViewRequested { item_id: None, .. }));
    assert_eq!(h.windows.focus_count(), 1);
    assert!(h.windows.opened().is_empty());
}

#[tokio::test]
async fn test_close_action_is_acknowledged() {
    let mut h = harness();
    h.bridge.register();

    h.bridge
        .post(WorkerEvent::NotificationClick {
            action: "close".to_string(),
            tag: Some("freshkeeper-7".to_string()),
            data: item_data("7"),
        })
        .unwrap();

    assert_eq!(
        h.messages.recv().await.unwrap(),
        BridgeMessage::CloseAcknowledged {
            tag: Some("freshkeeper-7".to_string())
        }
    );
    assert!(h.windows.opened().is_empty());
}

#[tokio::test]
async fn test_body_click_and_close_send_nothing() {
    let mut h = harness();
    h.bridge.register();

    h.bridge
        .post(WorkerEvent::NotificationClick {
            action: String::new(),
            tag: Some("freshkeeper-7".to_string()),
            data: item_data("7"),
        })
        .unwrap();
    h.bridge
        .post(WorkerEvent::NotificationClose {
            tag: Some("freshkeeper-7".to_string()),
        })
        .unwrap();
    flush(&h.bridge).await;

    assert!(h.messages.try_recv().is_err());
    assert!(h.windows.opened().is_empty());
}

#[tokio::test]
async fn test_clicked_notification_is_closed() {
    let mut h = harness_with(MemorySink::default().clickable(), RecordingWindows::new());
    h.bridge.register();
    h.bridge.ready(Duration::from_secs(1)).await.unwrap();

    let options = NotificationOptions::new("Milk", "Expires tomorrow")
        .with_tag("freshkeeper-1");
    let options = NotificationOptions {
        data: item_data("1"),
        ..options
    };
    let id = h.bridge.show_notification(options).await.unwrap();

    assert!(h.sink.click_action(id, "view"));
    let message = h.messages.recv().await.unwrap();
    assert!(matches!(
        message,
        BridgeMessage::ViewRequested { item_id: Some(ref item), .. } if item == "1"
    ));
    assert_eq!(h.sink.closed(), vec![id]);
    assert!(h.sink.open().is_empty());
}

#[tokio::test]
async fn test_unregister_resets_state() {
    let h = harness();
    h.bridge.register();
    h.bridge.ready(Duration::from_secs(1)).await.unwrap();
    assert_eq!(h.bridge.state(), WorkerState::Active);

    flush(&h.bridge).await;
    assert_eq!(h.bridge.state(), WorkerState::Unregistered);
    assert!(!h.bridge.is_registered());

    // 可以重新注册
    assert!(h.bridge.register());
    h.bridge.ready(Duration::from_secs(1)).await.unwrap();
}
