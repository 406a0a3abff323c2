mod lookup_tests {
    use libfloor::{ClassSpec, FloorError, FloorLookup, FloorSetup, FloorSpec};

    fn reference_lookup() -> FloorLookup {
        FloorLookup::new(FloorSetup::reference().spec, 2).unwrap()
    }

    #[test]
    fn test_post_order() {
        let lookup = reference_lookup();
        assert_eq!(lookup.posts(), 14);
        assert_eq!(lookup.n(), 128);
        assert_eq!(lookup.quant_q(), 128);
        assert_eq!(lookup.multiplier(), 2);
        assert_eq!(lookup.edge_bits(), 7);
        assert_eq!(
            lookup.post_list(),
            &[0, 128, 64, 32, 96, 16, 48, 80, 112, 8, 24, 40, 72, 104]
        );

        let sorted: Vec<u32> = (0..14).map(|s| lookup.sorted_x(s)).collect();
        assert_eq!(
            sorted,
            vec![0, 8, 16, 24, 32, 40, 48, 64, 72, 80, 96, 104, 112, 128]
        );
        assert_eq!(lookup.forward(0), 0);
        assert_eq!(lookup.forward(13), 1);
        assert_eq!(lookup.forward(7), 2);
    }

    #[test]
    fn test_forward_reverse_are_inverse() {
        let lookup = reference_lookup();
        for post in 0..lookup.posts() {
            assert_eq!(lookup.forward(lookup.reverse(post)), post);
            assert_eq!(lookup.sorted_x(lookup.reverse(post)), lookup.x(post));
        }
    }

    #[test]
    fn test_causal_neighbors() {
        let lookup = reference_lookup();
        let expected = [
            (2, 0, 1),
            (3, 0, 2),
            (4, 2, 1),
            (5, 0, 3),
            (6, 3, 2),
            (7, 2, 4),
            (8, 4, 1),
            (9, 0, 5),
            (10, 5, 3),
            (11, 3, 6),
            (12, 2, 7),
            (13, 4, 8),
        ];
        for (post, lo, hi) in expected {
            assert_eq!(lookup.lo_neighbor(post), lo, "lo of post {}", post);
            assert_eq!(lookup.hi_neighbor(post), hi, "hi of post {}", post);
        }
    }

    #[test]
    fn test_neighbors_bracket_and_precede() {
        let lookup = reference_lookup();
        for post in 2..lookup.posts() {
            let lo = lookup.lo_neighbor(post);
            let hi = lookup.hi_neighbor(post);
            assert!(lo < post && hi < post);
            assert!(lookup.x(lo) < lookup.x(post));
            assert!(lookup.x(hi) > lookup.x(post));
        }
    }

    #[test]
    fn test_unsorted_declaration() {
        let spec = FloorSpec {
            partitions: vec![0, 0],
            classes: vec![ClassSpec::single(2, None)],
            multiplier: 3,
            range_bits: 5,
            positions: vec![20, 10, 25, 5],
        };
        let lookup = FloorLookup::new(spec, 0).unwrap();
        assert_eq!(lookup.quant_q(), 86);
        assert_eq!(lookup.edge_bits(), 7);
        // post 3 (x=10) sits between the left edge and post 2 (x=20)
        assert_eq!((lookup.lo_neighbor(3), lookup.hi_neighbor(3)), (0, 2));
        // post 4 (x=25) sits between post 2 and the right edge
        assert_eq!((lookup.lo_neighbor(4), lookup.hi_neighbor(4)), (2, 1));
        // post 5 (x=5) sits between the left edge and post 3
        assert_eq!((lookup.lo_neighbor(5), lookup.hi_neighbor(5)), (0, 3));
    }

    #[test]
    fn test_invalid_spec_rejected() {
        let mut spec = FloorSetup::reference().spec;
        spec.multiplier = 7;
        assert!(matches!(
            FloorLookup::new(spec, 2),
            Err(FloorError::InvalidConfig(_))
        ));
    }
}
