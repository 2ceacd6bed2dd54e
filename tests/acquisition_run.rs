use rshameg::{
    acquisition::{channel_mask, RunState},
    exchange::{Query, Response, ScriptedAdapter},
    run_acquisition, AcquisitionConfig, AcquisitionMessage, ChannelRef, Readiness, Session,
};
use tokio::sync::mpsc;

fn samples(values: &[f32]) -> Response {
    Response::Block(values.iter().flat_map(|v| v.to_le_bytes()).collect())
}

/// An RTB2004 with CH2, D1 and D9 enabled.
fn rtb() -> ScriptedAdapter {
    let mut adapter = ScriptedAdapter::new();
    for ch in 0..4 {
        adapter.reply_always(Query::AnalogChannelState(ch), Response::Int((ch == 1) as i64));
    }
    for d in 0..16 {
        adapter.reply_always(
            Query::DigitalChannelState(d),
            Response::Text((if d == 1 || d == 9 { "ON" } else { "OFF" }).into()),
        );
    }
    adapter
        .reply_always(Query::Timebase, Response::Text("5.000E-06".into()))
        .reply_always(Query::HorizontalDivisions, Response::Int(10))
        .reply_always(Query::RecordLength, Response::Int(5000))
        .reply_always(Query::AnalogData(1), samples(&[0.1, 0.2, 0.3]))
        .reply_always(Query::DigitalChannelData(1), Response::Block(vec![1, 0, 1]))
        .reply_always(Query::DigitalChannelData(9), Response::Block(vec![1, 1, 0]));
    adapter
}

async fn readiness(n: usize) -> mpsc::Receiver<Readiness> {
    let (tx, rx) = mpsc::channel(n.max(1));
    for _ in 0..n {
        tx.send(Readiness).await.unwrap();
    }
    rx
}

#[tokio::test(start_paused = true)]
async fn multi_frame_run_with_mixed_channels() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut session = Session::open("RTB2004", rtb()).unwrap();
    assert_eq!(session.state().sample_rate, Some(100_000_000));
    assert_eq!(
        session.acquisition().groups().by_name("POD2").unwrap().channels.len(),
        8
    );

    let config = AcquisitionConfig::from_json(r#"{ "frame_limit": 2 }"#).unwrap();
    let (message_tx, mut message_rx) = mpsc::channel(8);

    let summary = run_acquisition(&mut session, readiness(6).await, message_tx, &config, || {})
        .await
        .unwrap();

    assert_eq!(summary.state, RunState::Complete);
    assert_eq!(summary.frames, 2);
    // three CH2 values and three shared logic instants per frame
    assert_eq!(summary.samples, 12);
    assert_eq!(
        session.acquisition().sequence(),
        &[ChannelRef::Analog(1), ChannelRef::Digital(1), ChannelRef::Digital(9)]
    );

    let mut frames = Vec::new();
    while let Ok(message) = message_rx.try_recv() {
        match message {
            AcquisitionMessage::FrameComplete(frame) => frames.push(frame.data),
            AcquisitionMessage::Finished(finished) => assert_eq!(finished, summary),
        }
    }
    assert_eq!(frames.len(), 2);

    let last = &frames[1];
    assert_eq!(last.frame, 1);
    assert_eq!(last.analog, vec![(1, vec![0.1, 0.2, 0.3])]);
    assert_eq!(last.logic_unit_size, 2);
    let d1 = channel_mask(1);
    let d9 = channel_mask(9);
    assert_eq!(last.logic, vec![d1, d9, 0, d9, d1, 0]);

    // both frames are kept back to back
    assert_eq!(session.acquisition().logic().as_bytes().len(), 12);
    assert_eq!(session.acquisition().analog(1).unwrap().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn sample_limit_stops_inside_second_frame() {
    let mut session = Session::open("RTB2004", rtb()).unwrap();
    let config = AcquisitionConfig::from_json(r#"{ "samples_limit": 10 }"#).unwrap();
    let (message_tx, mut message_rx) = mpsc::channel(8);

    let summary = run_acquisition(&mut session, readiness(8).await, message_tx, &config, || {})
        .await
        .unwrap();

    assert_eq!(summary.state, RunState::LimitReached);
    assert_eq!(summary.samples, 10);
    // frame two: all of CH2 fits, then one logic instant which D9 fills in too
    assert_eq!(summary.frames, 2);
    assert_eq!(session.acquisition().analog(1).unwrap().len(), 6);
    let d1 = channel_mask(1);
    let d9 = channel_mask(9);
    assert_eq!(
        session.acquisition().logic().as_bytes(),
        &[d1, d9, 0, d9, d1, 0, d1, d9]
    );

    let mut finished = None;
    while let Ok(message) = message_rx.try_recv() {
        if let AcquisitionMessage::Finished(summary) = message {
            finished = Some(summary.state);
        }
    }
    assert_eq!(finished, Some(RunState::LimitReached));
}
