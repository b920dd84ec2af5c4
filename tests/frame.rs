mod tests {
    use myrtio_light_sequencer::{Duration, Error, Frame, MAX_LINE_LEN, MAX_LINES};

    fn serialized(frame: &Frame) -> String {
        frame.serialize().as_str().to_owned()
    }

    #[test]
    fn test_parse_two_lines() {
        let frame = Frame::parse(b"1,0,5", 2).unwrap();
        assert_eq!(frame.values(), &[1, 0]);
        assert_eq!(frame.duration(), 5);
        assert_eq!(frame.encoded_size(), 6);
        assert_eq!(serialized(&frame), "1,0,5\n");
    }

    #[test]
    fn test_parse_extremes() {
        let frame = Frame::parse(b"-128,127,4294967295", 2).unwrap();
        assert_eq!(frame.values(), &[-128, 127]);
        assert_eq!(frame.duration(), u32::MAX);
        assert_eq!(serialized(&frame), "-128,127,4294967295\n");
        assert_eq!(frame.encoded_size(), 20);
    }

    #[test]
    fn test_encoded_size_follows_canonical_form() {
        let frame = Frame::parse(b"+1,007,05", 2).unwrap();
        assert_eq!(serialized(&frame), "1,7,5\n");
        assert_eq!(frame.encoded_size(), 6);
    }

    #[test]
    fn test_parse_without_lines() {
        let frame = Frame::parse(b"7", 0).unwrap();
        assert!(frame.values().is_empty());
        assert_eq!(serialized(&frame), "7\n");
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        let cases: [&[u8]; 11] = [
            b"128,0,1",
            b"1,-129,1",
            b"1,0",
            b"1,0,0",
            b"1,0,-1",
            b"1,0,5,6",
            b"1,,5",
            b" 1,0,5",
            b"1,0,5\r",
            b"1,0,4294967296",
            b"a,b,c",
        ];
        for line in cases {
            let result = Frame::parse(line, 2);
            assert!(
                matches!(result, Err(Error::InvalidArgument(_))),
                "accepted {:?}",
                String::from_utf8_lossy(line)
            );
        }
    }

    #[test]
    fn test_parse_rejects_non_utf8() {
        assert!(matches!(
            Frame::parse(&[0xff, b',', b'1'], 1),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_new_rejects_zero_duration_and_too_many_values() {
        assert!(matches!(Frame::new(&[1], 0), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            Frame::new(&[0; MAX_LINES + 1], 1),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_widest_frame_fits_text_capacity() {
        let frame = Frame::new(&[-128; MAX_LINES], u32::MAX).unwrap();
        assert_eq!(frame.encoded_size(), MAX_LINE_LEN);
        assert!(serialized(&frame).ends_with(",4294967295\n"));
    }

    #[test]
    fn test_hold_scales_time_unit() {
        let frame = Frame::new(&[1, 0], 5).unwrap();
        assert_eq!(
            frame.hold(Duration::from_millis(10)),
            Duration::from_millis(50)
        );
        assert_eq!(frame.hold(Duration::from_secs(1)), Duration::from_secs(5));
    }
}
