use dsmprep::core::quality_mask::{fuse_quality_mask, inner_nodata_mask};
use dsmprep::types::quality;
use dsmprep::{
    build_border_nodata_mask, build_disturbance_mask, build_regular_mask, DisturbanceParams,
    RegularParams, TiledExecutor, NO_DATA_VALUE,
};
use ndarray::Array2;

const ND: f32 = NO_DATA_VALUE;

fn quality_mask_of(dsm: &Array2<f32>, params: &DisturbanceParams) -> Array2<u8> {
    let executor = TiledExecutor::new((4, 4), 1).unwrap();
    let border = build_border_nodata_mask(dsm.view(), ND, 1).unwrap();
    let inner = inner_nodata_mask(dsm.view(), ND, border.view()).unwrap();
    let disturbed = build_disturbance_mask(dsm.view(), ND, params, &executor).unwrap();
    fuse_quality_mask(border.view(), inner.view(), disturbed.view()).unwrap()
}

#[test]
fn test_scenario_nodata_border_column() {
    // 4x4 constant 10 with column 0 no-data: column 0 classified as border
    // no-data, everything else valid
    let mut dsm = Array2::from_elem((4, 4), 10.0f32);
    dsm.column_mut(0).fill(ND);

    let mask = quality_mask_of(&dsm, &DisturbanceParams::default());
    for ((_, j), &v) in mask.indexed_iter() {
        let expected = if j == 0 { quality::BORDER_NODATA } else { quality::VALID };
        assert_eq!(v, expected);
    }
}

#[test]
fn test_scenario_interior_hole() {
    let mut dsm = Array2::from_elem((4, 4), 10.0f32);
    dsm[[1, 1]] = ND;

    let mask = quality_mask_of(&dsm, &DisturbanceParams::default());
    for ((i, j), &v) in mask.indexed_iter() {
        let expected = if (i, j) == (1, 1) { quality::INNER_NODATA } else { quality::VALID };
        assert_eq!(v, expected, "Wrong class at ({}, {})", i, j);
    }
}

#[test]
fn test_scenario_disturbed_spike() {
    // A spike disturbs itself and each of its 4-connexity neighbors: the
    // delta is symmetric
    let mut dsm = Array2::from_elem((5, 5), 10.0f32);
    dsm[[2, 2]] = 50.0;

    let mask = quality_mask_of(&dsm, &DisturbanceParams::default());
    let disturbed_pixels = [(2, 2), (1, 2), (3, 2), (2, 1), (2, 3)];
    for ((i, j), &v) in mask.indexed_iter() {
        let expected = if disturbed_pixels.contains(&(i, j)) {
            quality::DISTURBED
        } else {
            quality::VALID
        };
        assert_eq!(v, expected, "Wrong class at ({}, {})", i, j);
    }
}

#[test]
fn test_all_nodata_row_is_border_in_that_direction() {
    let mut dsm = Array2::from_elem((4, 4), 10.0f32);
    dsm.row_mut(0).fill(ND);

    let border = build_border_nodata_mask(dsm.view(), ND, 1).unwrap();
    assert!(border.row(0).iter().all(|&v| v == 1));
    assert_eq!(border.sum(), 4);
}

#[test]
fn test_nodata_neighbor_never_triggers_disturbance() {
    // Large deltas only exist against the no-data sample itself
    let mut dsm = Array2::from_elem((5, 5), 10.0f32);
    dsm[[2, 2]] = ND;

    let executor = TiledExecutor::new((5, 5), 1).unwrap();
    let disturbed =
        build_disturbance_mask(dsm.view(), ND, &DisturbanceParams::default(), &executor).unwrap();
    assert_eq!(disturbed.sum(), 0);
}

#[test]
fn test_eight_connexity_reaches_diagonals() {
    let mut dsm = Array2::from_elem((5, 5), 10.0f32);
    dsm[[2, 2]] = 50.0;

    let executor = TiledExecutor::new((5, 5), 1).unwrap();
    let params = DisturbanceParams {
        is_four_connexity: false,
        ..DisturbanceParams::default()
    };
    let disturbed = build_disturbance_mask(dsm.view(), ND, &params, &executor).unwrap();

    // Spike plus all 8 neighbors
    assert_eq!(disturbed.sum() as usize, 9);
    assert_eq!(disturbed[[1, 1]], 1);
    assert_eq!(disturbed[[3, 3]], 1);
}

#[test]
fn test_disturbance_monotonic_in_threshold() {
    let dsm = Array2::from_shape_fn((30, 30), |(i, j)| ((i * 31 + j * 17) % 13) as f32);
    let executor = TiledExecutor::new((8, 8), 1).unwrap();

    let mut previous_count = usize::MAX;
    for threshold in [0.5, 2.0, 5.0, 20.0] {
        let params = DisturbanceParams {
            slope_threshold: threshold,
            is_four_connexity: true,
        };
        let mask = build_disturbance_mask(dsm.view(), ND, &params, &executor).unwrap();
        let count = mask.iter().filter(|&&v| v != 0).count();
        assert!(
            count <= previous_count,
            "Raising the threshold to {} increased the disturbed count",
            threshold
        );
        previous_count = count;
    }
}

#[test]
fn test_regular_mask_flags_flat_terrain() {
    // Flat left half, steep right half
    let dsm = Array2::from_shape_fn((6, 8), |(_, j)| if j < 4 { 10.0 } else { (j * j) as f32 });

    let executor = TiledExecutor::new((4, 4), 1).unwrap();
    let params = RegularParams {
        regular_slope: 1.0,
        is_four_connexity: true,
    };
    let regular = build_regular_mask(dsm.view(), ND, &params, &executor).unwrap();

    // Interior pixels of the flat half, away from the ramp, are regular
    assert_eq!(regular[[2, 1]], 1);
    assert_eq!(regular[[2, 2]], 1);
    // The ramp is not
    assert_eq!(regular[[2, 5]], 0);
    assert_eq!(regular[[2, 6]], 0);
    // No-data pixels are never regular
    let mut holed = dsm.clone();
    holed[[2, 2]] = ND;
    let regular = build_regular_mask(holed.view(), ND, &params, &executor).unwrap();
    assert_eq!(regular[[2, 2]], 0);
}

#[test]
fn test_invalid_threshold_rejected_before_tiles_run() {
    let dsm = Array2::from_elem((4, 4), 10.0f32);
    let executor = TiledExecutor::new((4, 4), 1).unwrap();
    let params = DisturbanceParams {
        slope_threshold: f32::NAN,
        is_four_connexity: true,
    };
    assert!(build_disturbance_mask(dsm.view(), ND, &params, &executor).is_err());
}
