mod render_tests {
    use libfloor::floor::{render_curve, render_line, render_quantized_curve};
    use libfloor::{
        render, render_point, ClassSpec, FloorError, FloorLookup, FloorSetup, FloorSpec, Post,
        FROM_DB,
    };

    fn two_post_lookup() -> FloorLookup {
        let spec = FloorSpec {
            partitions: vec![0],
            classes: vec![ClassSpec::single(2, None)],
            multiplier: 1,
            range_bits: 4,
            positions: vec![4, 12],
        };
        FloorLookup::new(spec, 0).unwrap()
    }

    fn flat_posts() -> Vec<Post> {
        vec![
            Post::Explicit(128),
            Post::Explicit(128),
            Post::Implicit(128),
            Post::Implicit(128),
        ]
    }

    #[test]
    fn test_render_point_edges() {
        assert_eq!(render_point(0, 16, 100, 200, 0), 100);
        assert_eq!(render_point(0, 16, 100, 200, 16), 200);
        assert_eq!(render_point(4, 12, 50, 10, 8), 30);
        assert_eq!(render_point(5, 5, 7, 9, 5), 7);
    }

    #[test]
    fn test_flat_floor_fills_block() {
        let lookup = two_post_lookup();
        let curve = render_curve(&lookup, Some(&flat_posts()), 16).unwrap();
        assert!(curve.iter().all(|&v| v == FROM_DB[128]));

        // past the floor range the last value holds
        let curve = render_curve(&lookup, Some(&flat_posts()), 40).unwrap();
        assert_eq!(curve.len(), 40);
        assert!(curve.iter().all(|&v| v == FROM_DB[128]));
    }

    #[test]
    fn test_render_multiplies_in_place() {
        let lookup = two_post_lookup();
        let mut spectrum = vec![2.0f32; 16];
        spectrum[3] = -1.0;
        render(&lookup, Some(&flat_posts()), &mut spectrum).unwrap();
        assert_eq!(spectrum[0], 2.0 * FROM_DB[128]);
        assert_eq!(spectrum[3], -FROM_DB[128]);
    }

    #[test]
    fn test_no_floor_zeroes_buffer() {
        let lookup = two_post_lookup();
        let mut spectrum = vec![0.7f32; 16];
        render(&lookup, None, &mut spectrum).unwrap();
        assert!(spectrum.iter().all(|&v| v == 0.0));
        assert_eq!(spectrum.len(), 16);

        let mut indices = vec![9i32; 16];
        render_quantized_curve(&lookup, None, &mut indices).unwrap();
        assert!(indices.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_short_buffer_is_clipped() {
        let lookup = two_post_lookup();
        let curve = render_curve(&lookup, Some(&flat_posts()), 5).unwrap();
        assert_eq!(curve, vec![FROM_DB[128]; 5]);
    }

    #[test]
    fn test_implicit_posts_are_skipped() {
        let lookup = FloorLookup::new(FloorSetup::reference().spec, 2).unwrap();
        let mut posts = vec![Post::Implicit(64); 14];
        posts[0] = Post::Explicit(64);
        posts[1] = Post::Explicit(64);
        posts[2] = Post::Explicit(64);
        posts[3] = Post::Explicit(80);
        // never drawn, its value is ignored
        posts[5] = Post::Implicit(10);

        let mut indices = vec![0i32; 128];
        render_quantized_curve(&lookup, Some(&posts), &mut indices).unwrap();
        assert_eq!(indices[0], 128);
        assert_eq!(indices[16], 144);
        assert_eq!(indices[32], 160);
        assert_eq!(indices[48], 144);
        assert_eq!(indices[64], 128);
        assert_eq!(indices[127], 128);
        assert!(indices[..32].windows(2).all(|w| w[0] <= w[1]));
        assert!(indices[32..64].windows(2).all(|w| w[0] >= w[1]));

        let curve = render_curve(&lookup, Some(&posts), 128).unwrap();
        for (x, &v) in curve.iter().enumerate() {
            assert_eq!(v, FROM_DB[indices[x] as usize], "bin {}", x);
        }
    }

    #[test]
    fn test_render_line_falling() {
        let mut d = vec![1.0f32; 8];
        render_line(0, 8, 200, 100, &mut d);
        assert_eq!(d[0], FROM_DB[200]);
        assert!(d.windows(2).all(|w| w[0] > w[1]));
        assert!(d[7] > FROM_DB[100]);
    }

    #[test]
    fn test_index_capped_at_table_end() {
        // multiplier 4 takes 63 to 252, a hand-built 70 would pass the table end
        let spec = FloorSpec {
            partitions: vec![0],
            classes: vec![ClassSpec::single(1, None)],
            multiplier: 4,
            range_bits: 3,
            positions: vec![4],
        };
        let lookup = FloorLookup::new(spec, 0).unwrap();
        let posts = [Post::Explicit(70), Post::Explicit(70), Post::Implicit(70)];
        let curve = render_curve(&lookup, Some(&posts), 8).unwrap();
        assert!(curve.iter().all(|&v| v == FROM_DB[255]));
    }

    #[test]
    fn test_wrong_post_count() {
        let lookup = two_post_lookup();
        let posts = [Post::Explicit(1), Post::Explicit(2)];
        let mut out = vec![1.0f32; 16];
        assert!(matches!(
            render(&lookup, Some(&posts), &mut out),
            Err(FloorError::InvalidInput(_))
        ));
    }
}
