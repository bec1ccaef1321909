//! Quality mask fusion
//!
//! Merges the border no-data, inner no-data and disturbance masks into one
//! byte quality raster and removes disturbed pixels from the DSM before it
//! is handed to terrain extraction.

use crate::types::{quality, DsmBuffer, DsmError, DsmResult, MaskBuffer};
use ndarray::{ArrayView2, Zip};

/// Derive the inner no-data mask: no-data samples not reachable from the
/// image border, i.e. interior holes.
pub fn inner_nodata_mask(
    dsm: ArrayView2<'_, f32>,
    nodata: f32,
    border_nodata: ArrayView2<'_, u8>,
) -> DsmResult<MaskBuffer> {
    if dsm.dim() != border_nodata.dim() {
        return Err(DsmError::Processing(format!(
            "Mask extent {:?} does not match DSM extent {:?}",
            border_nodata.dim(),
            dsm.dim()
        )));
    }

    let mut mask = MaskBuffer::zeros(dsm.dim());
    Zip::from(&mut mask)
        .and(&dsm)
        .and(&border_nodata)
        .for_each(|m, &v, &b| *m = u8::from(v == nodata && b == 0));
    Ok(mask)
}

/// Fuse the three detection masks into one prioritized quality raster.
///
/// Classes are written lowest priority first, each overwriting the previous
/// at shared pixels: disturbed (2), then inner no-data (1), then border
/// no-data (3). Net priority: border > inner no-data > disturbed > valid.
pub fn fuse_quality_mask(
    border_nodata: ArrayView2<'_, u8>,
    inner_nodata: ArrayView2<'_, u8>,
    disturbed: ArrayView2<'_, u8>,
) -> DsmResult<MaskBuffer> {
    if border_nodata.dim() != inner_nodata.dim() || border_nodata.dim() != disturbed.dim() {
        return Err(DsmError::Processing(format!(
            "Mask extents differ: border {:?}, inner {:?}, disturbed {:?}",
            border_nodata.dim(),
            inner_nodata.dim(),
            disturbed.dim()
        )));
    }

    let mut quality_mask = MaskBuffer::zeros(border_nodata.raw_dim());
    Zip::from(&mut quality_mask).and(&disturbed).for_each(|q, &d| {
        if d != 0 {
            *q = quality::DISTURBED;
        }
    });
    Zip::from(&mut quality_mask).and(&inner_nodata).for_each(|q, &i| {
        if i != 0 {
            *q = quality::INNER_NODATA;
        }
    });
    Zip::from(&mut quality_mask).and(&border_nodata).for_each(|q, &b| {
        if b != 0 {
            *q = quality::BORDER_NODATA;
        }
    });
    Ok(quality_mask)
}

/// Replace every disturbed pixel of the DSM with the no-data sentinel.
/// Border and inner no-data pixels already hold the sentinel in the source.
pub fn apply_disturbance(dsm: &mut DsmBuffer, disturbed: ArrayView2<'_, u8>, nodata: f32) {
    Zip::from(dsm).and(&disturbed).for_each(|v, &d| {
        if d != 0 {
            *v = nodata;
        }
    });
}
