use super::*;

use std::time::Duration;

use shared::domain::FunnelStage;
use tokio::time::timeout;

fn instant_state() -> Arc<AppState> {
    Arc::new(AppState::new(
        Pacing {
            millis_per_second: 0,
            ..Pacing::default()
        },
        64,
    ))
}

async fn next_event(rx: &mut broadcast::Receiver<ServerEvent>) -> ServerEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event in time")
        .expect("channel open")
}

#[tokio::test]
async fn simulate_lead_broadcasts_lead_then_full_conversation() {
    let state = instant_state();
    let mut rx = state.events.subscribe();

    state
        .handle_command(ClientCommand::SimulateLead {
            mode: UiMode::Assisted,
        })
        .await;

    let ServerEvent::NewLead { patient, metrics } = next_event(&mut rx).await else {
        panic!("expected new lead first");
    };
    assert_eq!(metrics.total_leads, 1);

    let mut messages = 0;
    loop {
        match next_event(&mut rx).await {
            ServerEvent::Message { patient_id, .. } => {
                assert_eq!(patient_id.as_ref(), Some(&patient.id));
                messages += 1;
            }
            ServerEvent::StageChange {
                patient_id,
                stage,
                metrics,
            } => {
                assert_eq!(patient_id, patient.id);
                assert_eq!(stage, FunnelStage::Booked);
                assert_eq!(metrics.revenue_captured, 2800.0);
                break;
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(messages, 7);
}

#[tokio::test]
async fn retention_for_unknown_patient_is_ignored() {
    let state = instant_state();
    let mut rx = state.events.subscribe();

    state
        .handle_command(ClientCommand::SimulateRetention {
            patient_id: PatientId::from("nobody"),
        })
        .await;
    state.handle_command(ClientCommand::Reset).await;

    assert_eq!(
        next_event(&mut rx).await,
        ServerEvent::Reset {
            metrics: Some(Default::default())
        }
    );
}

#[tokio::test]
async fn retention_streams_five_checkins_for_a_known_patient() {
    let state = instant_state();
    let patient = crate::simulation::generate_lead(&mut rand::thread_rng(), UiMode::Assisted, now());
    let patient_id = patient.id().clone();
    state.demo.lock().await.add_lead(patient);
    let mut rx = state.events.subscribe();

    state
        .handle_command(ClientCommand::SimulateRetention {
            patient_id: patient_id.clone(),
        })
        .await;

    let mut days = Vec::new();
    let mut stages = Vec::new();
    while days.len() < 5 {
        match next_event(&mut rx).await {
            ServerEvent::Checkin { data, .. } => {
                assert_eq!(data.patient_id, patient_id);
                days.push(data.day);
            }
            ServerEvent::StageChange { stage, .. } => stages.push(stage),
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(days, vec![7, 14, 21, 28, 35]);
    assert_eq!(stages, vec![FunnelStage::Retained, FunnelStage::Upsold]);
}
