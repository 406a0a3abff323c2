mod setup_tests {
    use libfloor::{FitParams, FloorError, FloorSetup};

    const MINIMAL: &str = r#"{
        "spec": {
            "partitions": [0],
            "classes": [{ "dim": 2, "sub_books": [null] }],
            "multiplier": 1,
            "range_bits": 4,
            "positions": [4, 12]
        },
        "books": []
    }"#;

    #[test]
    fn test_minimal_json() {
        let setup = FloorSetup::from_json(MINIMAL).unwrap();
        assert_eq!(setup.fit, FitParams::default());
        assert_eq!(setup.spec.classes[0].sub_bits, 0);
        assert_eq!(setup.spec.classes[0].book, None);

        let mode = setup.build().unwrap();
        assert_eq!(mode.lookup.posts(), 4);
        assert!(mode.books.is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let setup = FloorSetup::reference().with_fit(FitParams::default().with_max_err(300.0));
        let text = setup.to_json().unwrap();
        assert_eq!(FloorSetup::from_json(&text).unwrap(), setup);
    }

    #[test]
    fn test_msgpack_round_trip() {
        let setup = FloorSetup::reference();
        let bytes = setup.to_msgpack().unwrap();
        assert_eq!(FloorSetup::from_msgpack(&bytes).unwrap(), setup);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            FloorSetup::from_json("{ \"spec\": 3 }"),
            Err(FloorError::Setup(_))
        ));
        assert!(matches!(
            FloorSetup::from_msgpack(&[0xC1]),
            Err(FloorError::Setup(_))
        ));
    }

    #[test]
    fn test_build_rejects_bad_books() {
        let mut setup = FloorSetup::reference();
        setup.books[1].lengths = vec![1, 1, 1];
        assert!(matches!(
            setup.build(),
            Err(FloorError::InvalidCodebook(_))
        ));

        let mut setup = FloorSetup::reference();
        setup.books.pop();
        assert!(matches!(setup.build(), Err(FloorError::InvalidConfig(_))));
    }

    #[test]
    fn test_header_bytes() {
        let mode = FloorSetup::reference().build().unwrap();
        let (bytes, bits) = mode.header_bytes().unwrap();
        assert_eq!(bits, 140);
        assert_eq!(bytes.len(), 18);
    }
}

mod stream_tests {
    use libfloor::{EncodedBlock, FloorError, FloorSetup, FloorStream};
    use serde::Serialize;

    #[derive(Serialize)]
    struct ForeignStream {
        #[serde(with = "serde_bytes")]
        magic: Vec<u8>,
        version: u8,
        setup: FloorSetup,
        bins: u32,
        blocks: Vec<EncodedBlock>,
    }

    fn foreign(magic: &[u8], version: u8) -> Vec<u8> {
        let stream = ForeignStream {
            magic: magic.to_vec(),
            version,
            setup: FloorSetup::reference(),
            bins: 128,
            blocks: Vec::new(),
        };
        rmp_serde::to_vec_named(&stream).unwrap()
    }

    #[test]
    fn test_stream_round_trip() {
        let mut stream = FloorStream::new(FloorSetup::reference(), 128);
        stream.push(vec![0x00], 1);
        stream.push(vec![0x01, 0x02, 0x03, 0x04], 27);
        assert_eq!(stream.total_bits(), 28);

        let bytes = stream.to_bytes().unwrap();
        let back = FloorStream::from_bytes(&bytes).unwrap();
        assert_eq!(back, stream);
        assert!(!back.blocks[0].has_floor());
        assert!(back.blocks[1].has_floor());
    }

    #[test]
    fn test_foreign_stream_layout_is_accepted() {
        let stream = FloorStream::from_bytes(&foreign(b"FLR1", 1)).unwrap();
        assert_eq!(stream.bins, 128);
        assert!(stream.blocks.is_empty());
    }

    #[test]
    fn test_bad_magic_and_version() {
        assert!(matches!(
            FloorStream::from_bytes(&foreign(b"NOPE", 1)),
            Err(FloorError::Setup(_))
        ));
        assert!(matches!(
            FloorStream::from_bytes(&foreign(b"FLR1", 9)),
            Err(FloorError::Setup(_))
        ));
        assert!(FloorStream::from_bytes(b"not msgpack").is_err());
    }

    #[test]
    fn test_empty_packet_has_no_floor() {
        let block = EncodedBlock {
            bits: 0,
            data: Vec::new(),
        };
        assert!(!block.has_floor());
    }
}
