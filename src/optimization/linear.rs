use glam::Vec2;
use nalgebra as na;

/// Similarity moving the centroid to the origin with mean distance sqrt(2).
fn normalization_transform(points: &[Vec2]) -> Option<na::Matrix3<f64>> {
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    let (cx, cy) = (sx / n, sy / n);
    let mean_dist = points
        .iter()
        .map(|p| ((p.x as f64 - cx).powi(2) + (p.y as f64 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist < 1e-12 {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(na::Matrix3::new(
        s,
        0.0,
        -s * cx,
        0.0,
        s,
        -s * cy,
        0.0,
        0.0,
        1.0,
    ))
}

fn apply(t: &na::Matrix3<f64>, p: &Vec2) -> (f64, f64) {
    let x = p.x as f64;
    let y = p.y as f64;
    (
        t[(0, 0)] * x + t[(0, 2)],
        t[(1, 1)] * y + t[(1, 2)],
    )
}

/// Direct linear transform on Hartley-normalised points.
///
/// Works for the minimal 4-pair case and as a least-squares fit for more
/// pairs. The result is scaled so `h[(2, 2)] == 1` unless that entry
/// vanishes. Returns `None` for degenerate input.
pub fn homography_dlt(src: &[Vec2], dst: &[Vec2]) -> Option<na::Matrix3<f64>> {
    if src.len() < 4 || src.len() != dst.len() {
        return None;
    }
    let t_src = normalization_transform(src)?;
    let t_dst = normalization_transform(dst)?;

    let mut ata = na::SMatrix::<f64, 9, 9>::zeros();
    for (p, q) in src.iter().zip(dst) {
        let (x, y) = apply(&t_src, p);
        let (xp, yp) = apply(&t_dst, q);
        let r0 = na::SVector::<f64, 9>::from_column_slice(&[
            -x,
            -y,
            -1.0,
            0.0,
            0.0,
            0.0,
            x * xp,
            y * xp,
            xp,
        ]);
        let r1 = na::SVector::<f64, 9>::from_column_slice(&[
            0.0,
            0.0,
            0.0,
            -x,
            -y,
            -1.0,
            x * yp,
            y * yp,
            yp,
        ]);
        ata += r0 * r0.transpose() + r1 * r1.transpose();
    }

    let eigen = ata.symmetric_eigen();
    let (min_idx, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = eigen.eigenvectors.column(min_idx);
    let h_norm = na::Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let t_dst_inv = t_dst.try_inverse()?;
    let h_mat = normalize_scale(t_dst_inv * h_norm * t_src);
    if !h_mat.iter().all(|v| v.is_finite()) || h_mat.determinant().abs() < 1e-12 {
        return None;
    }
    Some(h_mat)
}

pub(crate) fn normalize_scale(h: na::Matrix3<f64>) -> na::Matrix3<f64> {
    let h22 = h[(2, 2)];
    if h22.abs() > f64::EPSILON {
        h / h22
    } else {
        h
    }
}

/// Signed double area of the triangle `abc`.
pub(crate) fn orientation(a: Vec2, b: Vec2, c: Vec2) -> f64 {
    let (ax, ay) = (a.x as f64, a.y as f64);
    (b.x as f64 - ax) * (c.y as f64 - ay) - (b.y as f64 - ay) * (c.x as f64 - ax)
}
