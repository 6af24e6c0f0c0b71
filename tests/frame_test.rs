#[cfg(test)]
mod tests {
    use linktest::crc::{crc32, Crc32Context};
    use linktest::frame;
    use linktest::{Config, LinkError, LoopbackPort, Port};

    #[test]
    fn crc32_check_value() {
        // Standard CRC-32 check value for "123456789".
        assert_eq!(0xcbf43926, crc32(b"123456789"));
        assert_eq!(0x3610a686, crc32(b"hello"));
    }

    #[test]
    fn crc32_streaming_matches_oneshot() {
        let mut ctx = Crc32Context::new();
        ctx.update(b"12345");
        ctx.update(b"6789");
        assert_eq!(crc32(b"123456789"), ctx.finalize());
    }

    #[test]
    fn encode_layout() {
        let frame = frame::encode(b"hello");
        let expected: [u8; 17] = [
            0x00, 0x10, 0x5a, 0x5e, // Sync magic (LE of 0x5E5A1000)
            0x05, 0x00, 0x00, 0x00, // Length
            0x68, 0x65, 0x6c, 0x6c, 0x6f, // "hello"
            0x86, 0xa6, 0x10, 0x36, // CRC-32 (LE of 0x3610a686)
        ];
        assert_eq!(&expected[..], &frame[..]);
    }

    #[test]
    fn roundtrip() {
        let config = Config::default();
        let mut port = LoopbackPort::new();
        let payload: Vec<u8> = (0u8..32).collect();

        port.write(&frame::encode(&payload)).unwrap();

        let (decoded, crc_ok) = frame::decode(&mut port, &config).unwrap();
        assert_eq!(payload, decoded);
        assert!(crc_ok);
    }

    #[test]
    fn roundtrip_empty_payload() {
        let config = Config::default();
        let mut port = LoopbackPort::new();

        port.write(&frame::encode(&[])).unwrap();

        let (decoded, crc_ok) = frame::decode(&mut port, &config).unwrap();
        assert!(decoded.is_empty());
        assert!(crc_ok);
    }

    #[test]
    fn resync_skips_leading_garbage() {
        let config = Config::default();
        let mut port = LoopbackPort::new();

        port.inject(&[0x00, 0x01, 0x02, 0x03, 0x04, 0x05]);
        port.inject(&frame::encode(b"hello"));

        let (decoded, crc_ok) = frame::decode(&mut port, &config).unwrap();
        assert_eq!(b"hello".to_vec(), decoded);
        assert!(crc_ok);
    }

    #[test]
    fn resync_recovers_near_the_scan_limit() {
        let config = Config::default();
        let mut port = LoopbackPort::new();

        // Garbage almost up to the resync cap, then a valid frame.
        port.inject(&vec![0xffu8; config.max_resync_bytes as usize - 16]);
        port.inject(&frame::encode(b"hello"));

        let (decoded, crc_ok) = frame::decode(&mut port, &config).unwrap();
        assert_eq!(b"hello".to_vec(), decoded);
        assert!(crc_ok);
    }

    #[test]
    fn resync_gives_up_past_the_scan_limit() {
        let config = Config::default();
        let mut port = LoopbackPort::new();

        port.inject(&vec![0x00u8; 9000]);

        let result = frame::decode(&mut port, &config);
        assert!(matches!(result, Err(LinkError::Transport(_))));
    }

    #[test]
    fn length_cap_fails_then_next_decode_recovers() {
        let config = Config::default();
        let mut port = LoopbackPort::new();

        port.inject(&frame::SYNC_MAGIC_BYTES);
        port.inject(&[0x01, 0x10, 0x00, 0x00]); // 4097, one past the cap
        port.inject(&frame::encode(b"hello"));

        let result = frame::decode(&mut port, &config);
        assert!(matches!(result, Err(LinkError::Transport(_))));

        let (decoded, crc_ok) = frame::decode(&mut port, &config).unwrap();
        assert_eq!(b"hello".to_vec(), decoded);
        assert!(crc_ok);
    }

    #[test]
    fn truncated_frame_fails_transport() {
        let config = Config::default();
        let mut port = LoopbackPort::new();

        port.inject(&frame::SYNC_MAGIC_BYTES);
        port.inject(&[0x05, 0x00, 0x00, 0x00]); // Length 5
        port.inject(&[0x68, 0x65, 0x6c]); // Only 3 payload bytes arrive

        let result = frame::decode(&mut port, &config);
        assert!(matches!(result, Err(LinkError::Transport(_))));
    }

    #[test]
    fn empty_stream_fails_transport() {
        let config = Config::default();
        let mut port = LoopbackPort::new();

        let result = frame::decode(&mut port, &config);
        assert!(matches!(result, Err(LinkError::Transport(_))));
    }

    #[test]
    fn crc_flip_surfaces_payload_with_crc_failed() {
        let config = Config::default();

        // Flipping any single CRC byte must fail the check but keep the
        // payload intact.
        for i in 0..4 {
            let mut encoded = frame::encode(b"payload under test");
            let crc_offset = encoded.len() - 4 + i;
            encoded[crc_offset] ^= 0xff;

            let mut port = LoopbackPort::new();
            port.inject(&encoded);

            let (decoded, crc_ok) = frame::decode(&mut port, &config).unwrap();
            assert_eq!(b"payload under test".to_vec(), decoded);
            assert!(!crc_ok);
        }
    }
}
