use super::*;
use std::time::Duration;

fn units(access_unit_count: usize) -> ExtractedVideoUnits {
    ExtractedVideoUnits {
        sps: Bytes::from_static(b"sps"),
        pps: Bytes::from_static(b"pps"),
        access_units: (0..access_unit_count)
            .map(|i| Bytes::from(vec![i as u8]))
            .collect(),
    }
}

#[test]
fn video_worker_emits_one_ready_per_access_unit_in_order() {
    let mut worker = VideoWorker::new();
    let rx = worker.start_with(units(3), |_init, payloads, tx| {
        // payloads[0..2] are SPS/PPS, the rest are access units.
        for (idx, payload) in payloads[2..].iter().enumerate() {
            let _ = tx.send(FrameEvent::Ready {
                index: idx,
                payload: FramePayload::Rgba {
                    buf: payload.buf.clone(),
                    width: 4,
                    height: 4,
                },
            });
        }
    });

    let mut indices = Vec::new();
    for _ in 0..3 {
        match rx.recv_timeout(Duration::from_secs(1)).unwrap() {
            FrameEvent::Ready { index, .. } => indices.push(index),
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(indices, vec![0, 1, 2]);
    worker.terminate();
}

#[test]
fn video_worker_reports_single_error() {
    let mut worker = VideoWorker::new();
    let rx = worker.start_with(units(2), |_init, _payloads, tx| {
        let _ = tx.send(FrameEvent::Ready {
            index: 0,
            payload: FramePayload::Rgba {
                buf: Bytes::new(),
                width: 1,
                height: 1,
            },
        });
        let _ = tx.send(FrameEvent::Error {
            cause: "codec blew up".to_string(),
        });
    });

    assert!(matches!(
        rx.recv_timeout(Duration::from_secs(1)).unwrap(),
        FrameEvent::Ready { .. }
    ));
    match rx.recv_timeout(Duration::from_secs(1)).unwrap() {
        FrameEvent::Error { cause } => assert_eq!(cause, "codec blew up"),
        other => panic!("expected Error, got {other:?}"),
    }
    worker.terminate();
}

#[test]
fn archive_worker_is_reusable_across_sessions() {
    let mut worker = ArchiveWorker::new();
    let message = ArchiveMessage {
        block: Bytes::from_static(b"zip"),
        start: 0,
        end: 1,
        three_d: false,
    };
    let rx1 = worker.start_with(message.clone(), |_msg, tx| {
        let _ = tx.send(FrameEvent::Ready {
            index: 0,
            payload: FramePayload::Blob(Bytes::from_static(b"a")),
        });
    });
    assert!(rx1.recv_timeout(Duration::from_secs(1)).is_ok());

    // Same handle, second session.
    let rx2 = worker.start_with(message, |_msg, tx| {
        let _ = tx.send(FrameEvent::Ready {
            index: 0,
            payload: FramePayload::Blob(Bytes::from_static(b"b")),
        });
    });
    assert!(rx2.recv_timeout(Duration::from_secs(1)).is_ok());
    worker.terminate();
}

#[test]
fn video_init_message_defaults_match_protocol() {
    let init = VideoInitMessage::default();
    assert!(init.rgb);
    assert!(!init.reuse_memory);
}
