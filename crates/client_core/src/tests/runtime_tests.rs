use super::*;

use std::{sync::Arc, time::Duration};

use futures::stream;
use shared::{
    domain::{ChatSender, FunnelStage, PatientId},
    protocol::{ClientCommand, MetricsSnapshot, PatientRecord},
};

use crate::{
    config::Timings,
    projector::Trigger,
    scheduler::SystemClock,
    transport::RecordingSink,
};

fn fast_timings() -> Timings {
    Timings {
        typing_delay: Duration::from_millis(10),
        highlight: Duration::from_millis(20),
        flash: Duration::from_millis(10),
        simulate_cooldown: Duration::from_millis(30),
    }
}

fn session(mode: UiMode, sink: RecordingSink) -> FunnelSession<RecordingSink> {
    FunnelSession::new(sink, Arc::new(SystemClock::new()), mode, fast_timings())
}

fn new_lead(id: &str) -> ServerEvent {
    ServerEvent::NewLead {
        patient: PatientRecord {
            id: PatientId::from(id),
            name: "Amanda J.".to_string(),
            stage: FunnelStage::Lead,
            phone: None,
        },
        metrics: MetricsSnapshot {
            total_leads: 1,
            ..MetricsSnapshot::default()
        },
    }
}

#[tokio::test]
async fn applies_events_in_order_until_stream_closes() {
    let mut session = session(UiMode::Assisted, RecordingSink::new());
    let (_actions_tx, actions_rx) = mpsc::channel(8);
    let inbound = stream::iter(vec![
        new_lead("p1"),
        ServerEvent::Message {
            patient_id: Some(PatientId::from("p1")),
            sender: ChatSender::Ai,
            text: "Hi! This is Dr. Martinez's clinic.".to_string(),
            timestamp: None,
        },
    ]);
    let mut surface: Vec<RenderInstruction> = Vec::new();

    let exit = run_session(&mut session, inbound, actions_rx, &mut surface).await;

    assert_eq!(exit, SessionExit::StreamClosed);
    assert_eq!(surface[0], RenderInstruction::ResetLog);
    let clear_idx = surface
        .iter()
        .position(|i| *i == RenderInstruction::ClearLog)
        .expect("clear log");
    let append_idx = surface
        .iter()
        .position(|i| matches!(i, RenderInstruction::AppendMessage { .. }))
        .expect("append");
    assert!(clear_idx < append_idx);
    assert_eq!(session.store().chat().entries().count(), 1);
}

#[tokio::test]
async fn user_actions_reach_the_channel_and_quit_ends_the_loop() {
    let sink = RecordingSink::new();
    let mut session = session(UiMode::Assisted, sink.clone());
    let (actions_tx, actions_rx) = mpsc::channel(8);
    for action in [
        UserAction::SetMode(UiMode::Legacy),
        UserAction::SimulateLead,
        UserAction::SimulateRetention,
        UserAction::Reset,
        UserAction::Quit,
    ] {
        actions_tx.send(action).await.expect("queue action");
    }
    let mut surface: Vec<RenderInstruction> = Vec::new();

    let exit = run_session(
        &mut session,
        Box::pin(stream::pending::<ServerEvent>()),
        actions_rx,
        &mut surface,
    )
    .await;

    assert_eq!(exit, SessionExit::Quit);
    assert_eq!(
        sink.sent(),
        vec![
            ClientCommand::SimulateLead {
                mode: UiMode::Legacy
            },
            ClientCommand::Reset,
        ]
    );
    assert!(surface.contains(&RenderInstruction::SetTrigger {
        trigger: Trigger::SimulateLead,
        enabled: false,
    }));
}

#[tokio::test]
async fn due_timers_fire_between_events() {
    let mut session = session(UiMode::Assisted, RecordingSink::new());
    let (actions_tx, actions_rx) = mpsc::channel(8);
    let inbound = Box::pin(
        stream::iter(vec![ServerEvent::Message {
            patient_id: None,
            sender: ChatSender::Patient,
            text: "Friday 10am please".to_string(),
            timestamp: None,
        }])
        .chain(stream::pending()),
    );
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let _ = actions_tx.send(UserAction::Quit).await;
    });
    let mut surface: Vec<RenderInstruction> = Vec::new();

    let exit = run_session(&mut session, inbound, actions_rx, &mut surface).await;

    assert_eq!(exit, SessionExit::Quit);
    assert_eq!(surface.last(), Some(&RenderInstruction::ShowTyping));
    assert!(session.store().chat().has_typing());
}
