mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration as StdDuration;

    use myrtio_light_sequencer::relay::{self, Session};
    use myrtio_light_sequencer::{Error, SequencerConfig, StreamDevice, VirtualLineBank};

    fn device() -> StreamDevice<VirtualLineBank> {
        let config = SequencerConfig::new().with_line_count(2);
        let device = StreamDevice::new(VirtualLineBank::new(), &config).unwrap();
        device.set_line_id(0, Some(1)).unwrap();
        device.set_line_id(1, Some(2)).unwrap();
        device
    }

    #[test]
    fn test_append_then_read_back() {
        let device = device();
        let mut session = Session::new(&device);
        let mut reply = Vec::new();
        session.feed(b">> 1,0,5\n>>0,1,3\n<\n", &mut reply).unwrap();
        assert_eq!(reply, b"1,0,5\n0,1,3\n".to_vec());
    }

    #[test]
    fn test_truncate_with_and_without_message() {
        let device = device();
        let mut session = Session::new(&device);
        let mut reply = Vec::new();
        session.feed(b">>1,0,5\n> \t0,1,3\n", &mut reply).unwrap();
        assert_eq!(device.frame_count().unwrap(), 1);
        session.feed(b"<\n", &mut reply).unwrap();
        assert_eq!(reply, b"0,1,3\n".to_vec());

        session.feed(b">\n", &mut reply).unwrap();
        assert_eq!(device.frame_count().unwrap(), 0);
    }

    #[test]
    fn test_command_split_across_receives() {
        let device = device();
        let mut session = Session::new(&device);
        let mut reply = Vec::new();
        session.feed(b">> 1,", &mut reply).unwrap();
        assert_eq!(device.frame_count().unwrap(), 0);
        session.feed(b"1,2\n<", &mut reply).unwrap();
        assert!(reply.is_empty());
        session.feed(b"\n", &mut reply).unwrap();
        assert_eq!(reply, b"1,1,2\n".to_vec());
    }

    #[test]
    fn test_unknown_command_ends_session() {
        let device = device();
        let mut session = Session::new(&device);
        let mut reply = Vec::new();
        let result = session.feed(b"?\n", &mut reply);
        assert!(matches!(result, Err(Error::UnknownCommand('?'))));
    }

    #[test]
    fn test_blank_command_is_unknown() {
        let device = device();
        let mut session = Session::new(&device);
        let mut reply = Vec::new();
        let result = session.feed(b"\n", &mut reply);
        assert!(matches!(result, Err(Error::UnknownCommand('\n'))));
    }

    #[test]
    fn test_device_error_ends_session() {
        let device = device();
        let mut session = Session::new(&device);
        let mut reply = Vec::new();
        assert!(matches!(
            session.feed(b">> nope\n", &mut reply),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_run_stops_at_end_of_stream() {
        struct Loopback {
            input: std::io::Cursor<Vec<u8>>,
            output: Vec<u8>,
        }
        impl Read for Loopback {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                self.input.read(buf)
            }
        }
        impl Write for Loopback {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.output.write(buf)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let device = device();
        let mut stream = Loopback {
            input: std::io::Cursor::new(b">>1,1,1\n<\n".to_vec()),
            output: Vec::new(),
        };
        Session::new(&device).run(&mut stream).unwrap();
        assert_eq!(stream.output, b"1,1,1\n".to_vec());
    }

    #[test]
    fn test_serve_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let device = Arc::new(device());
        thread::spawn({
            let device = Arc::clone(&device);
            move || relay::serve(&listener, &device)
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .set_read_timeout(Some(StdDuration::from_secs(2)))
            .unwrap();
        client.write_all(b">> 1,0,5\n<\n").unwrap();

        let expected = b"1,0,5\n";
        let mut received = vec![0u8; expected.len()];
        client.read_exact(&mut received).unwrap();
        assert_eq!(received, expected.to_vec());
        assert_eq!(device.frame_count().unwrap(), 1);
    }
}
