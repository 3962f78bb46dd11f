use super::*;

use chrono::NaiveDate;
use shared::protocol::CheckinPayload;

fn metrics(revenue_captured: f64) -> MetricsSnapshot {
    MetricsSnapshot {
        total_leads: 2,
        booked: 1,
        revenue_captured,
        revenue_lost: 2800.0,
        ..MetricsSnapshot::default()
    }
}

fn counter_value(instructions: &[RenderInstruction], wanted: Counter) -> Option<&str> {
    instructions.iter().rev().find_map(|instruction| match instruction {
        RenderInstruction::SetCounter { counter, value } if *counter == wanted => {
            Some(value.as_str())
        }
        _ => None,
    })
}

#[test]
fn currency_uses_thousands_separators_and_trusts_sign() {
    assert_eq!(format_currency(0.0), "$0");
    assert_eq!(format_currency(500.0), "$500");
    assert_eq!(format_currency(2800.0), "$2,800");
    assert_eq!(format_currency(1_234_567.0), "$1,234,567");
    assert_eq!(format_currency(4300.5), "$4,300.5");
    assert_eq!(format_currency(19.99), "$19.99");
    assert_eq!(format_currency(-500.0), "$-500");
}

#[test]
fn response_time_strings_follow_mode() {
    assert_eq!(
        response_time_instruction(UiMode::Assisted),
        RenderInstruction::SetResponseTime {
            value: "4 sec",
            comparison: "vs 24-48 hours manual",
        }
    );
    assert_eq!(
        response_time_instruction(UiMode::Legacy),
        RenderInstruction::SetResponseTime {
            value: "24+ hrs",
            comparison: "voicemail delay",
        }
    );
}

#[test]
fn revenue_flashes_only_on_numeric_change() {
    let mut projector = Projector::new(Duration::from_secs(2));
    let mut store = FunnelStore::default();
    let effects = StoreEffects::default();

    store.replace_metrics(metrics(2800.0));
    let first = projector.project(&store, &ServerEvent::Metrics { metrics: metrics(2800.0) }, &effects);
    assert_eq!(counter_value(&first, Counter::RevenueCaptured), Some("$2,800"));
    assert!(first.contains(&RenderInstruction::Flash {
        counter: Counter::RevenueCaptured
    }));

    let second = projector.project(&store, &ServerEvent::Metrics { metrics: metrics(2800.0) }, &effects);
    assert_eq!(counter_value(&second, Counter::RevenueCaptured), None);
    assert!(!second
        .iter()
        .any(|i| matches!(i, RenderInstruction::Flash { .. })));
    assert_eq!(counter_value(&second, Counter::RevenueLost), Some("$2,800"));
    assert_eq!(projector.cache().revenue_captured(), 2800.0);
}

#[test]
fn metrics_projection_derives_patients_saved_from_snapshot() {
    let mut projector = Projector::new(Duration::from_secs(2));
    let mut store = FunnelStore::default();
    store.replace_metrics(MetricsSnapshot {
        booked: 1,
        lost: 4,
        ..MetricsSnapshot::default()
    });

    let out = projector.project(
        &store,
        &ServerEvent::Metrics {
            metrics: *store.metrics(),
        },
        &StoreEffects::default(),
    );
    assert_eq!(counter_value(&out, Counter::PatientsSaved), Some("0"));
    assert_eq!(counter_value(&out, Counter::Showed), Some("0"));
}

#[test]
fn reset_zeroes_every_counter_and_the_flash_cache() {
    let mut projector = Projector::new(Duration::from_secs(2));
    let mut store = FunnelStore::default();
    store.replace_metrics(metrics(500.0));
    projector.project(&store, &ServerEvent::Metrics { metrics: metrics(500.0) }, &StoreEffects::default());

    store.clear_all();
    let out = projector.project(&store, &ServerEvent::Reset { metrics: None }, &StoreEffects::default());

    assert_eq!(out[0], RenderInstruction::ResetLog);
    assert_eq!(out[1], RenderInstruction::ResetPatientList);
    for counter in Counter::ALL {
        let expected = match counter {
            Counter::RevenueCaptured | Counter::RevenueLost => "$0",
            _ => "0",
        };
        assert_eq!(counter_value(&out, counter), Some(expected), "{counter:?}");
    }
    assert_eq!(projector.cache().revenue_captured(), 0.0);
}

fn stage_change(stage: FunnelStage) -> ServerEvent {
    ServerEvent::StageChange {
        patient_id: PatientId::from("p1"),
        stage,
        metrics: metrics(2800.0),
    }
}

#[test]
fn new_highlight_clears_the_previous_stage_first() {
    let mut projector = Projector::new(Duration::from_secs(2));
    let store = FunnelStore::default();
    let effects = StoreEffects::default();

    let first = projector.project(&store, &stage_change(FunnelStage::Booked), &effects);
    assert!(!first
        .iter()
        .any(|i| matches!(i, RenderInstruction::ClearStageHighlight { .. })));

    let second = projector.project(&store, &stage_change(FunnelStage::Retained), &effects);
    let clear = second
        .iter()
        .position(|i| {
            *i == RenderInstruction::ClearStageHighlight {
                stage: FunnelStage::Booked,
            }
        })
        .expect("previous highlight cleared");
    let highlight = second
        .iter()
        .position(|i| matches!(i, RenderInstruction::HighlightStage { stage: FunnelStage::Retained, .. }))
        .expect("new highlight");
    assert!(clear < highlight);
    assert_eq!(projector.highlighted(), Some(&FunnelStage::Retained));

    let same = projector.project(&store, &stage_change(FunnelStage::Retained), &effects);
    assert!(!same
        .iter()
        .any(|i| matches!(i, RenderInstruction::ClearStageHighlight { .. })));

    assert_eq!(
        projector.clear_highlight(&FunnelStage::Retained),
        RenderInstruction::ClearStageHighlight {
            stage: FunnelStage::Retained
        }
    );
    assert_eq!(projector.highlighted(), None);
}

#[test]
fn checkin_entry_carries_day_heading_and_clock_label() {
    let mut projector = Projector::new(Duration::from_secs(2));
    let mut store = FunnelStore::default();
    store.chat_mut().append(ChatEntry {
        sender: ChatSender::Ai,
        text: "How are you feeling?".to_string(),
        timestamp: NaiveDate::from_ymd_opt(2024, 3, 1).and_then(|d| d.and_hms_opt(21, 5, 0)),
        checkin_day: Some(7),
    });
    let event = ServerEvent::Checkin {
        data: CheckinPayload {
            patient_id: PatientId::from("p1"),
            day: 7,
            text: "How are you feeling?".to_string(),
        },
        metrics: MetricsSnapshot::default(),
    };
    let effects = StoreEffects {
        entry_appended: true,
        ..StoreEffects::default()
    };

    let out = projector.project(&store, &event, &effects);
    assert_eq!(
        out[0],
        RenderInstruction::AppendMessage {
            sender: ChatSender::Ai,
            text: "How are you feeling?".to_string(),
            time_label: Some("21:05".to_string()),
            heading: Some("Day 7 Check-in".to_string()),
        }
    );
}

#[test]
fn system_messages_have_no_time_label() {
    let entry = ChatEntry {
        sender: ChatSender::System,
        text: "PATIENT BOOKED WITH COMPETITOR".to_string(),
        timestamp: NaiveDate::from_ymd_opt(2024, 3, 1).and_then(|d| d.and_hms_opt(9, 0, 0)),
        checkin_day: None,
    };
    let RenderInstruction::AppendMessage { time_label, .. } = message_instruction(&entry) else {
        panic!("expected append");
    };
    assert!(time_label.is_none());
}

#[test]
fn lost_patients_render_with_lost_status() {
    let patient = Patient {
        id: PatientId::from("p1"),
        name: "Jessica T.".to_string(),
        stage: FunnelStage::Lost,
    };
    assert_eq!(
        patient_instruction(&patient),
        RenderInstruction::UpsertPatient {
            id: PatientId::from("p1"),
            initials: "JT".to_string(),
            name: "Jessica T.".to_string(),
            stage: FunnelStage::Lost,
            status: PatientStatus::Lost,
        }
    );
}
