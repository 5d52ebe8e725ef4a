use std::sync::Arc;

use jamlink::broadcast::FlumeBroadcaster;
use jamlink::client::{ClientProjection, SessionPhase};
use jamlink::common::errors::CommandError;
use jamlink::config::Config;
use jamlink::playback::NoopPlayback;
use jamlink::protocol::commands::Command;
use jamlink::protocol::events::OutgoingMessage;
use jamlink::protocol::models::{Participant, SessionSnapshot, Track};
use jamlink::server::SessionManager;

fn manager() -> SessionManager {
    SessionManager::new(
        Config::default(),
        Arc::new(FlumeBroadcaster::new()),
        Arc::new(NoopPlayback),
    )
}

fn participant(id: &str) -> Participant {
    Participant::new(id.into(), id.to_uppercase(), None)
}

fn track(id: &str) -> Track {
    Track {
        id: id.into(),
        title: format!("Title {id}"),
        artist: "Artist".into(),
        artwork: None,
        duration: 240_000,
    }
}

fn drain_into(view: &mut ClientProjection, stream: &flume::Receiver<OutgoingMessage>) {
    while let Ok(event) = stream.try_recv() {
        view.apply(&event);
    }
}

fn session_of(view: &ClientProjection) -> SessionSnapshot {
    match view.phase() {
        SessionPhase::WaitingForGuest { session } | SessionPhase::Active { session, .. } => {
            session.clone()
        }
        other => panic!("no session in phase {other:?}"),
    }
}

#[tokio::test]
async fn full_session_lifecycle() {
    let mgr = manager();

    // Host creates: waiting for guest, host alone in the list.
    let code = mgr.create_session(participant("host"), track("current"));
    let host_sub = mgr.attach(&code, participant("host")).await.unwrap();
    let mut host_view = ClientProjection::creating("host".into());
    drain_into(&mut host_view, &host_sub.stream);
    assert!(matches!(
        host_view.phase(),
        SessionPhase::WaitingForGuest { .. }
    ));
    assert_eq!(host_view.participants().len(), 1);
    assert_eq!(host_view.participants()[0].id, "host");

    // Guest joins with the code: session activates for both sides.
    let guest_sub = mgr.attach(&code, participant("guest")).await.unwrap();
    let mut guest_view = ClientProjection::joining("guest".into());
    drain_into(&mut guest_view, &guest_sub.stream);
    drain_into(&mut host_view, &host_sub.stream);
    assert!(matches!(
        guest_view.phase(),
        SessionPhase::Active { is_host: false, .. }
    ));
    assert!(matches!(
        host_view.phase(),
        SessionPhase::Active { is_host: true, .. }
    ));
    assert_eq!(host_view.participants().len(), 2);

    // Guest queues a track with attribution.
    mgr.handle_command(&code, &"guest".to_string(), Command::AddToQueue { track: track("x") })
        .await
        .unwrap();
    drain_into(&mut host_view, &host_sub.stream);
    drain_into(&mut guest_view, &guest_sub.stream);
    assert_eq!(host_view.queue().len(), 2);
    assert_eq!(host_view.queue()[1].track_id, "x");
    assert_eq!(host_view.queue()[1].added_by_id, "guest");

    // Host skips: the queued track takes index 0 at progress zero.
    mgr.handle_command(&code, &"host".to_string(), Command::SkipNext)
        .await
        .unwrap();
    drain_into(&mut host_view, &host_sub.stream);
    drain_into(&mut guest_view, &guest_sub.stream);
    let session = session_of(&host_view);
    assert_eq!(session.queue.len(), 1);
    assert_eq!(session.queue[0].track_id, "x");
    assert_eq!(session.playback.current_track_id.as_deref(), Some("x"));
    assert_eq!(session.playback.progress_fraction, 0.0);

    // Guest tries to toggle playback: rejected, no delta for anyone.
    let err = mgr
        .handle_command(&code, &"guest".to_string(), Command::PlayPause)
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::NotAuthorized(_)));
    assert!(host_sub.stream.try_recv().is_err());
    assert!(guest_sub.stream.try_recv().is_err());
    let unchanged = session_of(&host_view);
    assert_eq!(unchanged.queue[0].track_id, "x");
}

#[tokio::test]
async fn projections_converge_from_the_same_stream_point() {
    let mgr = manager();
    let code = mgr.create_session(participant("host"), track("t0"));

    let host_sub = mgr.attach(&code, participant("host")).await.unwrap();
    let guest_sub = mgr.attach(&code, participant("guest")).await.unwrap();

    let mut host_view = ClientProjection::creating("host".into());
    let mut guest_view = ClientProjection::joining("guest".into());

    for cmd in [
        Command::AddToQueue { track: track("t1") },
        Command::AddToQueue { track: track("t2") },
        Command::Seek { fraction: 0.4 },
        Command::SkipNext,
        Command::PlayPause,
        Command::SendChat { text: "tune".into() },
        Command::SendReaction { emoji: "🔥".into() },
    ] {
        mgr.handle_command(&code, &"host".to_string(), cmd)
            .await
            .unwrap();
    }
    mgr.handle_command(
        &code,
        &"guest".to_string(),
        Command::AddToQueue { track: track("g1") },
    )
    .await
    .unwrap();

    drain_into(&mut host_view, &host_sub.stream);
    drain_into(&mut guest_view, &guest_sub.stream);

    // Authority differs per viewer, the shared state must not.
    assert_eq!(session_of(&host_view), session_of(&guest_view));
    assert!(host_view.is_host());
    assert!(!guest_view.is_host());
}

#[tokio::test]
async fn reconnect_converges_via_full_snapshot() {
    let mgr = manager();
    let code = mgr.create_session(participant("host"), track("t0"));
    let host_sub = mgr.attach(&code, participant("host")).await.unwrap();
    let guest_sub = mgr.attach(&code, participant("guest")).await.unwrap();
    let mut host_view = ClientProjection::creating("host".into());
    drain_into(&mut host_view, &host_sub.stream);

    // Guest drops; deltas keep flowing to the host only.
    let guest_connection = guest_sub.connection;
    drop(guest_sub);
    mgr.detach(&code, "guest", guest_connection).await;
    for cmd in [
        Command::AddToQueue { track: track("missed") },
        Command::SkipNext,
        Command::PlayPause,
    ] {
        mgr.handle_command(&code, &"host".to_string(), cmd)
            .await
            .unwrap();
    }
    drain_into(&mut host_view, &host_sub.stream);

    // Reconnect: a fresh snapshot brings the guest to the same state, no
    // matter how many deltas were missed.
    let guest_sub = mgr.attach(&code, participant("guest")).await.unwrap();
    let mut guest_view = ClientProjection::joining("guest".into());
    drain_into(&mut guest_view, &guest_sub.stream);
    drain_into(&mut host_view, &host_sub.stream);

    assert_eq!(session_of(&host_view), session_of(&guest_view));
    let session = session_of(&guest_view);
    assert_eq!(session.queue[0].track_id, "missed");
    let guest = session.participants.iter().find(|p| p.id == "guest").unwrap();
    assert!(guest.is_online);
}

#[tokio::test]
async fn host_departure_promotes_and_guests_keep_listening() {
    let mgr = manager();
    let code = mgr.create_session(participant("host"), track("t0"));
    let _host_sub = mgr.attach(&code, participant("host")).await.unwrap();
    let guest_sub = mgr.attach(&code, participant("guest")).await.unwrap();
    let mut guest_view = ClientProjection::joining("guest".into());
    drain_into(&mut guest_view, &guest_sub.stream);

    mgr.handle_command(&code, &"host".to_string(), Command::Leave)
        .await
        .unwrap();
    drain_into(&mut guest_view, &guest_sub.stream);

    // Default policy: the longest-joined online guest inherits control.
    assert!(guest_view.is_host());
    mgr.handle_command(&code, &"guest".to_string(), Command::PlayPause)
        .await
        .unwrap();
}
