//! Property-based tests for the core data model.

use proptest::prelude::*;
use sonomap_core::{AcousticConstants, ArrayGeometry, MultichannelTimeSeries, Point3, ScanGrid};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Every grid point maps back to its own index.
    #[test]
    fn grid_index_round_trip(
        half_x in 0.05f64..1.0,
        half_y in 0.05f64..1.0,
        z in -1.0f64..1.0,
        increment in 0.01f64..0.2,
        pick in 0usize..10_000,
    ) {
        let grid = ScanGrid::rect(-half_x, half_x, -half_y, half_y, z, increment).unwrap();
        let index = pick % grid.len();
        prop_assert_eq!(grid.index_of(&grid.point(index)), index);
        let (ix, iy, iz) = grid.cell(index);
        prop_assert_eq!(grid.flat_index(ix, iy, iz), index);
    }

    /// Points far from the grid clamp to its edge.
    #[test]
    fn nearest_index_clamps(x in -10.0f64..10.0, y in -10.0f64..10.0) {
        let grid = ScanGrid::rect(-0.2, 0.2, -0.2, 0.2, 0.3, 0.01).unwrap();
        let p = grid.point(grid.index_of(&Point3::new(x, y, 5.0)));
        prop_assert!(p.x.abs() <= 0.2 + 1e-12 && p.y.abs() <= 0.2 + 1e-12);
        prop_assert_eq!(p.z, 0.3);
    }

    /// Interleaving and de-interleaving are inverse operations.
    #[test]
    fn interleave_round_trip(
        channels in 1usize..6,
        frames in 1usize..50,
        seed in any::<u32>(),
    ) {
        let data: Vec<f32> = (0..channels * frames)
            .map(|i| (i as u32).wrapping_mul(seed | 1) as f32 / u32::MAX as f32)
            .collect();
        let ts = MultichannelTimeSeries::from_interleaved(&data, channels, 48000.0).unwrap();
        prop_assert_eq!(ts.num_channels(), channels);
        prop_assert_eq!(ts.num_samples(), frames);
        prop_assert_eq!(ts.to_interleaved(), data);
    }

    /// Level conversion inverts for powers above the floor.
    #[test]
    fn level_round_trip(db in -100.0f64..160.0) {
        let c = AcousticConstants::AIR;
        let back = c.level_db(c.power_from_level(db));
        prop_assert!((back - db).abs() < 1e-9);
    }

    /// Ring arrays have the requested radius and a centred centroid.
    #[test]
    fn ring_geometry(count in 2usize..32, radius in 0.01f64..2.0) {
        let ring = ArrayGeometry::ring(count, radius, 0.0).unwrap();
        prop_assert_eq!(ring.len(), count);
        for p in ring.positions() {
            prop_assert!((p.distance(&Point3::ORIGIN) - radius).abs() < 1e-12);
        }
        prop_assert!(ring.centroid().distance(&Point3::ORIGIN) < 1e-12);
    }
}
