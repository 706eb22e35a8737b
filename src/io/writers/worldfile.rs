use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::Result;

/// Geotransform of an image resampled from `src` to `dst` (cols, rows) pixels.
pub fn scale_geotransform(gt: [f64; 6], src: (usize, usize), dst: (usize, usize)) -> [f64; 6] {
    let mut out = gt;
    if dst.0 > 0 && dst.1 > 0 {
        let sx = src.0 as f64 / dst.0 as f64;
        let sy = src.1 as f64 / dst.1 as f64;
        out[1] *= sx;
        out[2] *= sy;
        out[4] *= sx;
        out[5] *= sy;
    }
    out
}

/// Write a world file next to a JPEG page. The world file stores the
/// transform in pixel-center convention.
pub fn write_world_file(output_image: &Path, geotransform: [f64; 6]) -> Result<()> {
    let world_path = output_image.with_extension("jgw");

    // A: pixel size in X, D: rotation about Y, B: rotation about X, E: pixel size Y
    // C, F: center of upper-left pixel
    let a = geotransform[1];
    let d = geotransform[4];
    let b = geotransform[2];
    let e = geotransform[5];
    let c = geotransform[0] + 0.5 * a + 0.5 * b;
    let f = geotransform[3] + 0.5 * d + 0.5 * e;

    let mut file = File::create(world_path)?;
    for v in [a, d, b, e, c, f] {
        writeln!(file, "{:.12}", v)?;
    }
    Ok(())
}

/// Write a .prj file with the provided projection (WKT)
pub fn write_prj_file(output_image: &Path, projection: &str) -> Result<()> {
    let prj_path = output_image.with_extension("prj");
    std::fs::write(prj_path, projection.as_bytes())?;
    Ok(())
}
