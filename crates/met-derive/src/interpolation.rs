//! Horizontal and vertical interpolation.

/// Bilinear interpolation at a fractional grid index.
///
/// Interpolates between the four nearest grid points. Returns NaN when the
/// index is off the grid, the data is shorter than `width * height`, or any
/// corner is NaN.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if width == 0 || height == 0 || data.len() < width * height || x < 0.0 || y < 0.0 {
        return f32::NAN;
    }

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;

    if x0 >= width || y0 >= height {
        return f32::NAN;
    }

    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = (x - x0 as f64) as f32;
    let yf = (y - y0 as f64) as f32;

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    // Handle NaN values - if any corner is NaN, return NaN
    if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
        return f32::NAN;
    }

    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    top * (1.0 - yf) + bottom * yf
}

/// Piecewise-linear interpolation of `(xs, ys)` at `x`.
///
/// `xs` need not be sorted. Points outside the sampled range take the
/// nearest end value. Returns `None` for empty or mismatched input.
pub fn linear_interpolate(xs: &[f64], ys: &[f64], x: f64) -> Option<f64> {
    if xs.is_empty() || xs.len() != ys.len() || x.is_nan() {
        return None;
    }

    let mut points: Vec<(f64, f64)> = xs
        .iter()
        .copied()
        .zip(ys.iter().copied())
        .filter(|(px, py)| !px.is_nan() && !py.is_nan())
        .collect();
    if points.is_empty() {
        return None;
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (first, last) = (points[0], points[points.len() - 1]);
    if x <= first.0 {
        return Some(first.1);
    }
    if x >= last.0 {
        return Some(last.1);
    }

    points.windows(2).find_map(|pair| {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        if x >= x0 && x <= x1 {
            if x1 == x0 {
                Some(y0)
            } else {
                Some(y0 + (y1 - y0) * (x - x0) / (x1 - x0))
            }
        } else {
            None
        }
    })
}
