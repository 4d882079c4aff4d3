use serde_json::json;
use shared::domain::{ChannelOrder, TemperatureReading};
use tokio::{sync::broadcast::error::TryRecvError, time::Instant};

use super::*;
use crate::loader::SnapshotOrigin;

fn invoke(target: &str, payload: Value) -> HubInvocation {
    HubInvocation {
        target: target.into(),
        arguments: vec![payload],
    }
}

fn disco(message: &str) -> HubInvocation {
    invoke("startAnimate", json!({"sender": "ops", "message": message}))
}

async fn next_event(events: &mut broadcast::Receiver<DashboardEvent>) -> DashboardEvent {
    events.recv().await.expect("event stream open")
}

async fn next_expiry(events: &mut broadcast::Receiver<DashboardEvent>) -> BannerKind {
    loop {
        if let DashboardEvent::BannerExpired(kind) = next_event(events).await {
            return kind;
        }
    }
}

#[tokio::test]
async fn seeding_emits_event_and_installs_snapshot() {
    let reconciler = Reconciler::new(BannerTtls::default());
    let mut events = reconciler.subscribe();

    reconciler
        .seed(DashboardSnapshot {
            channels: Vec::new(),
            satellites: Vec::new(),
            temperature: Some(TemperatureReading::new("20")),
            origin: SnapshotOrigin::Fetched { attempts: 1 },
        })
        .await;

    assert_eq!(next_event(&mut events).await, DashboardEvent::Seeded);
    assert_eq!(
        reconciler.view().await.temperature,
        Some(TemperatureReading::new("20"))
    );
}

#[tokio::test]
async fn channel_update_replaces_and_empty_update_is_kept() {
    let reconciler = Reconciler::new(BannerTtls::default());
    let mut events = reconciler.subscribe();

    reconciler
        .apply(&invoke(
            "chanellInfoUpdate",
            json!([{"Order": 5, "ChanellName": "Kids", "Status": "ok"}]),
        ))
        .await;
    reconciler.apply(&invoke("chanellInfoUpdate", json!([]))).await;

    assert_eq!(
        next_event(&mut events).await,
        DashboardEvent::Updated {
            section: ViewSection::Channels,
            applied: Applied::Replaced,
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        DashboardEvent::Updated {
            section: ViewSection::Channels,
            applied: Applied::Kept,
        }
    );
    let channels = reconciler.read(|view| view.channels.clone()).await;
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].order, ChannelOrder(5));
}

#[tokio::test]
async fn target_names_match_case_insensitively() {
    let reconciler = Reconciler::new(BannerTtls::default());

    reconciler
        .apply(&invoke("TemperatureUpdate", json!({"Temperature": "27"})))
        .await;

    assert!(reconciler.read(|view| view.is_hot(24.0)).await);
}

#[tokio::test]
async fn unknown_target_is_ignored_silently() {
    let reconciler = Reconciler::new(BannerTtls::default());
    let mut events = reconciler.subscribe();

    reconciler.apply(&invoke("somethingNew", json!({"a": 1}))).await;

    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(reconciler.view().await, ViewState::default());
}

#[tokio::test]
async fn malformed_payload_is_rejected_without_touching_state() {
    let reconciler = Reconciler::new(BannerTtls::default());
    let mut events = reconciler.subscribe();

    reconciler
        .apply(&invoke("chanellInfoUpdate", json!([{"chanellName": "no order"}])))
        .await;
    reconciler
        .apply(&invoke("startAnimate", json!({"message": "Night"})))
        .await;

    for expected_target in ["chanellInfoUpdate", "startAnimate"] {
        match next_event(&mut events).await {
            DashboardEvent::PayloadRejected { target, .. } => assert_eq!(target, expected_target),
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(reconciler.view().await, ViewState::default());
    assert!(!reconciler.banner_timer_pending(BannerKind::Disco).await);
}

#[tokio::test]
async fn card_and_optic_updates_flow_through_apply() {
    let reconciler = Reconciler::new(BannerTtls::default());

    reconciler
        .apply(&invoke(
            "cardsWhichNeedToBeActivate",
            json!({"cardsInfoThathNeedToBeActivated": [
                {"card": 1, "port": 1, "emr": 2, "status": "pending"}
            ]}),
        ))
        .await;
    reconciler
        .apply(&invoke(
            "cardsWhichNeedToBeActivate",
            json!({"CardsInfoThathNeedToBeActivated": [
                {"card": 1, "port": 1, "emr": 2, "status": "active"}
            ]}),
        ))
        .await;
    reconciler
        .apply(&invoke(
            "opticChannelHealthUpdate",
            json!({"opticChanellsWhichHaveProblem": [{"channel": "B2"}]}),
        ))
        .await;

    let view = reconciler.view().await;
    assert_eq!(view.cards.len(), 1);
    assert_eq!(view.cards[0].get("status"), Some(&json!("active")));
    assert_eq!(view.optic_problems.len(), 1);

    reconciler
        .apply(&invoke("opticChannelHealthUpdate", json!({})))
        .await;
    assert!(reconciler.view().await.optic_problems.is_empty());
}

#[tokio::test(start_paused = true)]
async fn disco_banner_expires_after_ttl() {
    let reconciler = Reconciler::new(BannerTtls::default());
    let mut events = reconciler.subscribe();
    let started = Instant::now();

    reconciler.apply(&disco("Morning")).await;
    assert!(reconciler.banner_timer_pending(BannerKind::Disco).await);

    assert_eq!(next_expiry(&mut events).await, BannerKind::Disco);
    assert_eq!(started.elapsed(), Duration::from_secs(30));
    assert_eq!(reconciler.view().await.disco.current(), None);
}

#[tokio::test(start_paused = true)]
async fn repeated_disco_message_restarts_countdown() {
    let reconciler = Reconciler::new(BannerTtls::default());
    let mut events = reconciler.subscribe();
    let started = Instant::now();

    reconciler.apply(&disco("Morning")).await;
    tokio::time::sleep(Duration::from_secs(20)).await;
    reconciler.apply(&disco("Night")).await;
    tokio::time::sleep(Duration::from_secs(20)).await;

    let shown = reconciler
        .read(|view| view.disco.message().map(str::to_string))
        .await;
    assert_eq!(shown.as_deref(), Some("Night"));

    assert_eq!(next_expiry(&mut events).await, BannerKind::Disco);
    assert_eq!(started.elapsed(), Duration::from_secs(50));
    assert!(reconciler.view().await.disco_animation().is_none());
}

#[tokio::test(start_paused = true)]
async fn robot_speech_uses_its_own_ttl() {
    let reconciler = Reconciler::new(BannerTtls::default());
    let mut events = reconciler.subscribe();
    let started = Instant::now();

    reconciler.apply(&disco("Evening")).await;
    reconciler
        .apply(&invoke("robotSay", json!({"robotSay": "Signal restored"})))
        .await;
    assert_eq!(
        reconciler.view().await.robot_speech.message(),
        Some("Signal restored")
    );

    assert_eq!(next_expiry(&mut events).await, BannerKind::RobotSpeech);
    assert_eq!(started.elapsed(), Duration::from_secs(10));
    assert_eq!(
        reconciler.view().await.disco.message(),
        Some("Evening")
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_banner_timers() {
    let reconciler = Reconciler::new(BannerTtls::default());

    reconciler.apply(&disco("Night")).await;
    reconciler.shutdown().await;
    assert!(!reconciler.banner_timer_pending(BannerKind::Disco).await);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(reconciler.view().await.disco.message(), Some("Night"));
}

#[tokio::test]
async fn consumer_applies_invocations_until_channel_closes() {
    let reconciler = Reconciler::new(BannerTtls::default());
    let (tx, rx) = mpsc::channel(8);
    let consumer = reconciler.spawn_consumer(rx);

    tx.send(invoke("satelliteMonitoringUpdate", json!([{"degree": "4.8E", "details": []}])))
        .await
        .expect("send");
    tx.send(invoke(
        "regionBitrateUpdate",
        json!([{"regionName": "North", "relayInfos": [{"frequecyOrder": "1", "mer": "30"}]}]),
    ))
    .await
    .expect("send");
    tx.send(invoke("channelStatusUpdate", json!({"names": {"12": "ok", "3": "down"}})))
        .await
        .expect("send");
    drop(tx);
    consumer.await.expect("consumer task");

    let view = reconciler.view().await;
    assert_eq!(view.satellites[0].degree, "4.8E");
    assert_eq!(view.region_relays[0].relay_infos[0].mer, "30");
    let ids: Vec<i64> = view.channel_status.iter().map(|entry| entry.id.0).collect();
    assert_eq!(ids, vec![3, 12]);
}

#[tokio::test(start_paused = true)]
async fn invalid_disco_payload_keeps_current_banner() {
    let reconciler = Reconciler::new(BannerTtls::default());
    reconciler.apply(&disco("Afternoon")).await;
    let generation = reconciler.view().await.disco.generation();

    reconciler
        .apply(&invoke("StartAnimate", json!({"sender": "", "message": "Night"})))
        .await;

    let view = reconciler.view().await;
    assert_eq!(view.disco.message(), Some("Afternoon"));
    assert_eq!(view.disco.generation(), generation);
}
