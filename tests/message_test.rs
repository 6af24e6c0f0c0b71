#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use linktest::frame;
    use linktest::message::{
        decode_message, decode_session_params, encode_ack_with_params, encode_control, encode_data,
        random_payload, MsgType,
    };
    use linktest::{Config, ConnId, Encoding, LinkError, LoopbackPort, Port, SessionParams};

    const CONN_ID: ConnId = ConnId([0xde, 0xad, 0xbe, 0xef]);

    #[test]
    fn control_frame_layout() {
        let encoded = encode_control(MsgType::Syn, CONN_ID);
        // [sync][len=5][type][conn_id][crc]
        assert_eq!(17, encoded.len());
        assert_eq!([0x05, 0x00, 0x00, 0x00], encoded[4..8]);
        assert_eq!(0x01, encoded[8]);
        assert_eq!([0xde, 0xad, 0xbe, 0xef], encoded[9..13]);
    }

    #[test]
    fn control_roundtrip_all_types() {
        let config = Config::default();
        for msg_type in [MsgType::Syn, MsgType::SynAck, MsgType::Fin, MsgType::FinAck] {
            let mut port = LoopbackPort::new();
            port.write(&encode_control(msg_type, CONN_ID)).unwrap();

            let (decoded_type, conn_id, tail, crc_ok) =
                decode_message(&mut port, &config).unwrap();
            assert_eq!(msg_type, decoded_type);
            assert_eq!(CONN_ID, conn_id);
            assert!(tail.is_empty());
            assert!(crc_ok);
        }
    }

    #[test]
    fn data_roundtrip() {
        let config = Config::default();
        let mut port = LoopbackPort::new();

        port.write(&encode_data(CONN_ID, b"request payload")).unwrap();

        let (msg_type, conn_id, tail, crc_ok) = decode_message(&mut port, &config).unwrap();
        assert_eq!(MsgType::Data, msg_type);
        assert_eq!(CONN_ID, conn_id);
        assert_eq!(b"request payload".to_vec(), tail);
        assert!(crc_ok);
    }

    #[test]
    fn ack_params_roundtrip() {
        let config = Config::default();
        let mut port = LoopbackPort::new();
        let params = SessionParams {
            msg_count: 0x01020304,
        };

        port.write(&encode_ack_with_params(CONN_ID, params)).unwrap();

        let (msg_type, conn_id, tail, crc_ok) = decode_message(&mut port, &config).unwrap();
        assert_eq!(MsgType::Ack, msg_type);
        assert_eq!(CONN_ID, conn_id);
        assert_eq!([0x04, 0x03, 0x02, 0x01], tail[..]); // msg_count, little-endian
        assert!(crc_ok);
        assert_eq!(Ok(params), decode_session_params(&tail));
    }

    #[test]
    fn ack_without_params_is_bad() {
        let config = Config::default();
        let mut port = LoopbackPort::new();

        // A bare control ACK carries no session params.
        port.write(&encode_control(MsgType::Ack, CONN_ID)).unwrap();

        let (msg_type, _, tail, _) = decode_message(&mut port, &config).unwrap();
        assert_eq!(MsgType::Ack, msg_type);
        assert_eq!(Err(Encoding::BadAck), decode_session_params(&tail));
    }

    #[test]
    fn unknown_type_rejected() {
        let config = Config::default();
        let mut port = LoopbackPort::new();

        port.write(&frame::encode(&[0x99, 0x01, 0x02, 0x03, 0x04]))
            .unwrap();

        let result = decode_message(&mut port, &config);
        assert!(matches!(
            result,
            Err(LinkError::Encoding(Encoding::InvalidType(0x99)))
        ));
    }

    #[test]
    fn short_payload_rejected() {
        let config = Config::default();
        let mut port = LoopbackPort::new();

        // Three bytes cannot hold [type][conn_id].
        port.write(&frame::encode(&[0x01, 0x02, 0x03])).unwrap();

        let result = decode_message(&mut port, &config);
        assert!(matches!(
            result,
            Err(LinkError::Encoding(Encoding::TooShort { len: 3 }))
        ));
    }

    #[test]
    fn msg_type_from_byte() {
        assert_eq!(Ok(MsgType::Syn), MsgType::from_byte(0x01));
        assert_eq!(Ok(MsgType::SynAck), MsgType::from_byte(0x02));
        assert_eq!(Ok(MsgType::Ack), MsgType::from_byte(0x03));
        assert_eq!(Ok(MsgType::Data), MsgType::from_byte(0x10));
        assert_eq!(Ok(MsgType::Fin), MsgType::from_byte(0x20));
        assert_eq!(Ok(MsgType::FinAck), MsgType::from_byte(0x21));
        assert_eq!(Err(Encoding::InvalidType(0x00)), MsgType::from_byte(0x00));
        assert_eq!(Err(Encoding::InvalidType(0x42)), MsgType::from_byte(0x42));
    }

    #[test]
    fn random_payload_stays_in_bounds() {
        let config = Config::default();
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let payload = random_payload(&mut rng, &config);
            assert!(payload.len() >= config.min_payload as usize);
            assert!(payload.len() <= config.max_payload as usize);
        }
    }

    #[test]
    fn conn_id_displays_as_hex() {
        assert_eq!("5e5a1000", ConnId([0x5e, 0x5a, 0x10, 0x00]).to_string());
        assert_eq!("deadbeef", CONN_ID.to_string());
    }

    #[test]
    fn conn_ids_differ_across_rng_states() {
        let mut rng = StdRng::seed_from_u64(3);
        let first = ConnId::random(&mut rng);
        let second = ConnId::random(&mut rng);
        assert_ne!(first, second);
    }
}
