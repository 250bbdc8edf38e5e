use gmmk_rgb_core::{BoardError, Color, Frame, SessionState, TransportError, ValidationError};

use crate::consts::*;
use crate::mock::Recorder;
use crate::types::{InitOptions, PollingRate, Profile};
use crate::Gmmk;

const START: u8 = 0x01;
const END: u8 = 0x02;
const SUB: u8 = 0x06;
const KEYS: u8 = 0x11;

fn initialized() -> Gmmk<Recorder> {
    let mut kb = Gmmk::new(Recorder::default());
    kb.initialize(None).unwrap();
    kb.transport_mut().clear();
    kb
}

fn white() -> Frame {
    Frame::filled(Color::WHITE, MAX_KEYS)
}

/// (start offset in keys, key count) of every key color report
fn key_spans(rec: &Recorder) -> Vec<(usize, usize)> {
    rec.packets()
        .iter()
        .filter(|p| p[COMMAND_OFFSET] == KEYS)
        .map(|p| {
            let offset = u16::from_le_bytes([p[5], p[6]]) as usize;
            (offset / 3, p[4] as usize / 3)
        })
        .collect()
}

#[test]
fn every_report_is_stamped() {
    let mut kb = initialized();
    kb.write_full_frame(&Frame::filled(Color::new(0x12, 0x34, 0x56), MAX_KEYS))
        .unwrap();
    for (id, payload) in &kb.transport().reports {
        assert_eq!(*id, REPORT_ID);
        assert_eq!(payload.len(), PACKET_SIZE - 1);
    }
    for packet in kb.transport().packets() {
        let sum = packet[COMMAND_OFFSET..]
            .iter()
            .map(|b| *b as u32)
            .sum::<u32>()
            % 65536;
        assert_eq!(u16::from_le_bytes([packet[1], packet[2]]) as u32, sum);
    }
}

#[test]
fn initialize_runs_bring_up_sequence() {
    let mut kb = Gmmk::new(Recorder::default()).with_options(InitOptions {
        profile: Profile::Two,
        polling_rate: PollingRate::Hz500,
        delay: 4,
    });
    assert_eq!(kb.state(), SessionState::Opened);
    kb.initialize(None).unwrap();
    assert_eq!(kb.state(), SessionState::Initialized);

    let rec = kb.transport();
    let mut expected = vec![START, 0x04, END, START, SUB, END, START, SUB, END, START, SUB, END];
    expected.push(START);
    expected.extend([KEYS; 7]);
    expected.push(END);
    assert_eq!(rec.commands(), expected);

    let packets = rec.packets();
    assert_eq!(packets[1][PROFILE_INDEX_OFFSET], 1);
    // custom mode
    assert_eq!(packets[4][4..6], [0x01, 0x00]);
    assert_eq!(packets[4][8], CUSTOM_MODE);
    // polling rate
    assert_eq!(packets[7][4..6], [0x01, 0x0f]);
    assert_eq!(packets[7][8], 2);
    // delay
    assert_eq!(packets[10][4..6], [0x01, 0x02]);
    assert_eq!(packets[10][8], 4);

    assert_eq!(kb.shadow(), &white());
}

#[test]
fn initialize_pushes_supplied_frame() {
    let mut kb = Gmmk::new(Recorder::default());
    let frame = Frame::filled(Color::BLUE, MAX_KEYS);
    kb.initialize(Some(&frame)).unwrap();
    assert_eq!(kb.shadow(), &frame);
    // one full frame is enough to light the whole board
    assert_eq!(key_spans(kb.transport()).len(), 7);
    let last_keys = kb
        .transport()
        .packets()
        .into_iter()
        .rfind(|p| p[COMMAND_OFFSET] == KEYS)
        .unwrap();
    assert_eq!(last_keys[8..11], [0, 0, 0xff]);
}

#[test]
fn initialize_rejects_wrong_frame_before_io() {
    let mut kb = Gmmk::new(Recorder::default());
    let err = kb
        .initialize(Some(&Frame::filled(Color::RED, 10)))
        .unwrap_err();
    assert!(matches!(
        err,
        BoardError::Validation(ValidationError::FrameLength {
            expected: 126,
            actual: 10
        })
    ));
    assert!(kb.transport().reports.is_empty());
}

#[test]
fn updates_require_initialization() {
    let mut kb = Gmmk::new(Recorder::default());
    assert!(matches!(
        kb.write_frame(&white(), 1.0),
        Err(BoardError::NotInitialized(SessionState::Opened))
    ));
    assert!(matches!(
        kb.write_full_frame(&white()),
        Err(BoardError::NotInitialized(SessionState::Opened))
    ));
    assert!(kb.transport().reports.is_empty());
}

#[test]
fn failed_initialize_leaves_session_unusable() {
    // fail on the mode report
    let mut kb = Gmmk::new(Recorder::failing_at(4));
    assert!(matches!(
        kb.initialize(None),
        Err(BoardError::Transport(TransportError::Closed))
    ));
    assert_eq!(kb.state(), SessionState::Opened);
    // nothing after the failed step was attempted except closing its bracket
    assert_eq!(kb.transport().commands(), vec![START, 0x04, END, START, END]);

    let before = kb.transport().reports.len();
    assert!(matches!(
        kb.write_frame(&white(), 1.0),
        Err(BoardError::NotInitialized(_))
    ));
    assert_eq!(kb.transport().reports.len(), before);

    // a later initialize recovers the session
    kb.initialize(None).unwrap();
    assert_eq!(kb.state(), SessionState::Initialized);
}

#[test]
fn full_frame_chunks_with_wide_offsets() {
    let mut kb = initialized();
    kb.write_full_frame(&white()).unwrap();

    let rec = kb.transport();
    let commands = rec.commands();
    assert_eq!(commands.first(), Some(&START));
    assert_eq!(commands.last(), Some(&END));
    let spans = key_spans(rec);
    assert_eq!(spans.len(), 7);
    for (i, (offset, len)) in spans.iter().enumerate() {
        assert_eq!(*offset, i * 18);
        assert_eq!(*len, 18);
    }
    // key 108 starts at byte 324 = 0x0144
    let last = rec
        .packets()
        .into_iter()
        .rfind(|p| p[COMMAND_OFFSET] == KEYS)
        .unwrap();
    assert_eq!(last[5..7], [0x44, 0x01]);
}

#[test]
fn short_full_frame_touches_leading_keys() {
    let mut kb = initialized();
    let frame = Frame::filled(Color::RED, 20);
    kb.write_full_frame(&frame).unwrap();

    assert_eq!(key_spans(kb.transport()), vec![(0, 18), (18, 2)]);
    assert_eq!(kb.shadow().get(19), Some(Color::RED));
    assert_eq!(kb.shadow().get(20), Some(Color::WHITE));

    let oversized = Frame::filled(Color::RED, 127);
    assert!(matches!(
        kb.write_full_frame(&oversized),
        Err(BoardError::Validation(ValidationError::FrameLength { .. }))
    ));
}

#[test]
fn partial_update_scenario() {
    let mut kb = initialized();
    let mut target = white();
    for i in 0..5 {
        target.set(i, Color::RED).unwrap();
    }
    target.set(100, Color::BLUE).unwrap();

    kb.write_frame(&target, 1.0).unwrap();

    let rec = kb.transport();
    assert_eq!(rec.commands(), vec![START, KEYS, KEYS, END]);
    assert_eq!(key_spans(rec), vec![(0, 5), (100, 1)]);
    let packets = rec.packets();
    assert_eq!(packets[1][8..23], [0xffu8, 0, 0].repeat(5)[..]);
    assert_eq!(packets[2][8..11], [0, 0, 0xff]);
    // 300 = 0x012c
    assert_eq!(packets[2][5..7], [0x2c, 0x01]);
    assert_eq!(kb.shadow(), &target);
}

#[test]
fn repeated_frame_sends_nothing() {
    let mut kb = initialized();
    let mut target = white();
    target.set(42, Color::GREEN).unwrap();
    kb.write_frame(&target, 1.0).unwrap();
    kb.transport_mut().clear();

    kb.write_frame(&target, 1.0).unwrap();
    assert!(kb.transport().reports.is_empty());
}

#[test]
fn scattered_changes_fall_back_to_full_frame() {
    let mut kb = initialized();
    let mut target = white();
    // 19 apart so no two changes share a report
    for i in 0..7 {
        target.set(i * 19, Color::BLACK).unwrap();
    }
    kb.write_frame(&target, 1.0).unwrap();
    assert_eq!(key_spans(kb.transport()).len(), 7);
    assert_eq!(key_spans(kb.transport())[1], (18, 18));
    assert_eq!(kb.shadow(), &target);

    // six runs still go out as partial reports
    let mut kb = initialized();
    let mut target = white();
    for i in 0..6 {
        target.set(i * 19, Color::BLACK).unwrap();
    }
    kb.write_frame(&target, 1.0).unwrap();
    let spans = key_spans(kb.transport());
    assert_eq!(spans.len(), 6);
    assert!(spans.iter().all(|(_, len)| *len == 1));
}

#[test]
fn long_run_is_split_across_reports() {
    let mut kb = initialized();
    let mut target = white();
    for i in 10..50 {
        target.set(i, Color::BLACK).unwrap();
    }
    kb.write_frame(&target, 1.0).unwrap();
    assert_eq!(key_spans(kb.transport()), vec![(10, 18), (28, 18), (46, 4)]);
}

#[test]
fn accuracy_is_validated_and_applied() {
    let mut kb = initialized();
    let mut target = white();
    target.set(3, Color::new(250, 250, 250)).unwrap();

    assert!(matches!(
        kb.write_frame(&target, 1.5),
        Err(BoardError::Validation(ValidationError::InvalidAccuracy(_)))
    ));
    assert!(kb.write_frame(&target, f32::NAN).is_err());

    kb.write_frame(&target, 0.5).unwrap();
    assert!(kb.transport().reports.is_empty());
    assert_eq!(kb.shadow().get(3), Some(Color::WHITE));

    kb.write_frame(&target, 1.0).unwrap();
    assert_eq!(key_spans(kb.transport()), vec![(3, 1)]);
}

#[test]
fn failed_run_keeps_shadow_consistent() {
    let mut target = white();
    target.set(0, Color::RED).unwrap();
    target.set(60, Color::RED).unwrap();
    target.set(120, Color::RED).unwrap();

    // 21 reports for initialize, then start, first run, and the second run fails
    let mut kb = Gmmk::new(Recorder::failing_at(21 + 2));
    kb.initialize(None).unwrap();
    let before = kb.transport().reports.len();
    assert!(matches!(
        kb.write_frame(&target, 1.0),
        Err(BoardError::Transport(TransportError::Closed))
    ));
    let sent: Vec<u8> = kb.transport().commands()[before..].to_vec();
    // the bracket is still closed after the failed report
    assert_eq!(sent, vec![START, KEYS, END]);
    assert_eq!(kb.shadow().get(0), Some(Color::RED));
    assert_eq!(kb.shadow().get(60), Some(Color::WHITE));
    assert_eq!(kb.shadow().get(120), Some(Color::WHITE));

    // retrying resends only what is missing
    kb.transport_mut().clear();
    kb.write_frame(&target, 1.0).unwrap();
    assert_eq!(key_spans(kb.transport()), vec![(60, 1), (120, 1)]);
    assert_eq!(kb.shadow(), &target);
}

#[test]
fn failed_full_frame_resumes_from_shadow() {
    let red = Frame::filled(Color::RED, MAX_KEYS);
    // 21 reports for initialize, then start and three key reports before the failure
    let mut kb = Gmmk::new(Recorder::failing_at(21 + 4));
    kb.initialize(None).unwrap();
    let before = kb.transport().reports.len();
    assert!(matches!(
        kb.write_full_frame(&red),
        Err(BoardError::Transport(TransportError::Closed))
    ));
    let sent: Vec<u8> = kb.transport().commands()[before..].to_vec();
    assert_eq!(sent, vec![START, KEYS, KEYS, KEYS, END]);
    let updated = kb
        .shadow()
        .as_slice()
        .iter()
        .take_while(|c| **c == Color::RED)
        .count();
    assert_eq!(updated, 54);
    assert_eq!(kb.shadow().get(54), Some(Color::WHITE));
    assert_eq!(kb.state(), SessionState::Initialized);

    kb.transport_mut().clear();
    kb.write_frame(&red, 1.0).unwrap();
    assert_eq!(
        key_spans(kb.transport()),
        vec![(54, 18), (72, 18), (90, 18), (108, 18)]
    );
    assert_eq!(kb.shadow(), &red);
}

#[test]
fn failed_start_skips_end() {
    let mut kb = {
        let mut fresh = Gmmk::new(Recorder::failing_at(21));
        fresh.initialize(None).unwrap();
        fresh
    };
    let before = kb.transport().reports.len();
    let mut target = white();
    target.set(5, Color::GREEN).unwrap();
    assert!(kb.write_frame(&target, 1.0).is_err());
    assert_eq!(kb.transport().reports.len(), before);
    assert_eq!(kb.shadow().get(5), Some(Color::WHITE));
    // still initialized, the caller decides what to do next
    assert_eq!(kb.state(), SessionState::Initialized);
}

#[test]
fn settings_are_bracketed() {
    let mut kb = Gmmk::new(Recorder::default());
    kb.set_delay(9).unwrap();
    kb.set_profile(Profile::Three).unwrap();
    assert_eq!(kb.transport().commands(), vec![START, SUB, END, START, 0x04, END]);
    assert_eq!(kb.transport().packets()[4][PROFILE_INDEX_OFFSET], 2);
}
