use myrtio_light_sequencer::{
    Duration, Frame, FrameStore, SequencerConfig, StreamDevice, VirtualLineBank,
};
use proptest::prelude::*;

const LINES: u8 = 3;

fn frame_strategy() -> impl Strategy<Value = Frame> {
    (
        prop::collection::vec(any::<i8>(), usize::from(LINES)),
        1..=u32::MAX,
    )
        .prop_map(|(values, duration)| Frame::new(&values, duration).unwrap())
}

fn encode(frames: &[Frame]) -> Vec<u8> {
    frames
        .iter()
        .flat_map(|frame| frame.serialize().as_bytes().to_vec())
        .collect()
}

fn idle_device() -> StreamDevice<VirtualLineBank> {
    // Long time unit: the first frame is held for the whole test.
    let config = SequencerConfig::new()
        .with_line_count(LINES)
        .with_time_unit(Duration::from_secs(3600));
    let device = StreamDevice::new(VirtualLineBank::new(), &config).unwrap();
    for index in 0..usize::from(LINES) {
        device.set_line_id(index, Some(index as u16)).unwrap();
    }
    device
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn full_read_is_concatenation(frames in prop::collection::vec(frame_strategy(), 0..12)) {
        let store = FrameStore::new(LINES).unwrap();
        for frame in &frames {
            store.append(frame.clone()).unwrap();
        }
        let expected = encode(&frames);
        let mut buf = vec![0u8; expected.len() + 16];
        let window = store.read_window(0, &mut buf).unwrap();
        prop_assert_eq!(&buf[..window.copied], &expected[..]);
        prop_assert_eq!(window.next_offset, expected.len() as u64);
    }

    #[test]
    fn resumed_reads_match_continuous_read(
        frames in prop::collection::vec(frame_strategy(), 1..8),
        chunk in 1usize..40,
        start_fraction in 0.0f64..1.0,
    ) {
        let store = FrameStore::new(LINES).unwrap();
        for frame in &frames {
            store.append(frame.clone()).unwrap();
        }
        let expected = encode(&frames);
        let start = (expected.len() as f64 * start_fraction) as usize;

        let mut resumed = Vec::new();
        let mut buf = vec![0u8; chunk];
        let mut offset = start as u64;
        loop {
            let window = store.read_window(offset, &mut buf).unwrap();
            if window.copied == 0 {
                break;
            }
            resumed.extend_from_slice(&buf[..window.copied]);
            offset = window.next_offset;
        }
        prop_assert_eq!(&resumed[..], &expected[start..]);
    }

    #[test]
    fn written_frame_count_matches_valid_lines(
        frames in prop::collection::vec(frame_strategy(), 0..10),
        split in 0usize..400,
    ) {
        let device = idle_device();
        let text = encode(&frames);
        let split = split.min(text.len());

        let (head, tail) = text.split_at(split);
        prop_assert_eq!(device.write(head).unwrap(), head.len());
        prop_assert_eq!(device.write(tail).unwrap(), tail.len());

        prop_assert_eq!(device.frame_count().unwrap(), frames.len());
        prop_assert_eq!(device.frames().unwrap(), frames);
        prop_assert!(device.pending_bytes().unwrap().is_empty());
    }

    #[test]
    fn malformed_line_keeps_earlier_frames(
        frames in prop::collection::vec(frame_strategy(), 0..6),
    ) {
        let device = idle_device();
        let mut text = encode(&frames);
        text.extend_from_slice(b"1,2\n");

        prop_assert!(device.write(&text).is_err());
        prop_assert_eq!(device.frames().unwrap(), frames);
    }
}
