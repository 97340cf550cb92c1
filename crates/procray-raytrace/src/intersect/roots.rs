//! Closed-form polynomial root finders used by the analytic kernels.
//!
//! All solvers return the real roots only, in a fixed-capacity list so the
//! per-ray path never allocates.

use arrayvec::ArrayVec;
use std::f64::consts::PI;

/// Real roots of a polynomial of degree at most four.
pub type Roots = ArrayVec<f64, 4>;

const LEADING_EPS: f64 = 1e-12;
const DELTA_EPS: f64 = 1e-12;

/// Solve `a*x^2 + b*x + c = 0`.
///
/// Uses the cancellation-free form `q = -(b + sign(b)·√disc) / 2`, roots
/// `q/a` and `c/q`. Falls back to the linear equation when `a` vanishes.
/// Roots are returned in ascending order.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Roots {
    let mut roots = Roots::new();
    if a.abs() < LEADING_EPS {
        if b.abs() > LEADING_EPS {
            roots.push(-c / b);
        }
        return roots;
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return roots;
    }

    let q = -0.5 * (b + b.signum() * disc.sqrt());
    let r0 = q / a;
    let r1 = if q != 0.0 { c / q } else { r0 };
    if r0 <= r1 {
        roots.push(r0);
        roots.push(r1);
    } else {
        roots.push(r1);
        roots.push(r0);
    }
    roots
}

/// Solve `a*x^3 + b*x^2 + c*x + d = 0`.
///
/// Uses Cardano's formula, or the trigonometric form when there are three
/// real roots.
pub fn solve_cubic(a: f64, b: f64, c: f64, d: f64) -> Roots {
    if a.abs() < LEADING_EPS {
        return solve_quadratic(b, c, d);
    }

    // Normalize: x^3 + px^2 + qx + r = 0
    let p = b / a;
    let q = c / a;
    let r = d / a;

    // Depressed cubic t^3 + aa*t + bb = 0 via x = t - p/3
    let p2 = p * p;
    let aa = q - p2 / 3.0;
    let bb = r - p * q / 3.0 + 2.0 * p2 * p / 27.0;

    let delta = bb * bb / 4.0 + aa * aa * aa / 27.0;
    let shift = p / 3.0;
    let mut roots = Roots::new();

    if delta > DELTA_EPS {
        let sqrt_delta = delta.sqrt();
        let u = (-bb / 2.0 + sqrt_delta).cbrt();
        let v = (-bb / 2.0 - sqrt_delta).cbrt();
        roots.push(u + v - shift);
    } else if delta.abs() <= DELTA_EPS {
        if aa.abs() < LEADING_EPS && bb.abs() < LEADING_EPS {
            roots.push(-shift);
        } else {
            let u = (-bb / 2.0).cbrt();
            roots.push(2.0 * u - shift);
            roots.push(-u - shift);
        }
    } else {
        // delta < 0 implies aa < 0
        let m = 2.0 * (-aa / 3.0).sqrt();
        let cos_arg = (3.0 * bb / (aa * m)).clamp(-1.0, 1.0);
        let theta = cos_arg.acos() / 3.0;
        roots.push(m * theta.cos() - shift);
        roots.push(m * (theta - 2.0 * PI / 3.0).cos() - shift);
        roots.push(m * (theta + 2.0 * PI / 3.0).cos() - shift);
    }
    roots
}

/// Solve `a*x^4 + b*x^3 + c*x^2 + d*x + e = 0` with Ferrari's method.
///
/// The depressed quartic `y^4 + a2*y^2 + a1*y + a0` is split with the
/// largest root `m` of its resolvent cubic into
/// `(y^2 + m + a2/2)^2 = 2m (y - a1/(4m))^2`, i.e. the quadratics
/// `y^2 ∓ √(2m)·y + (a2/2 + m ± a1/(2√(2m))) = 0`.
///
/// Roots are returned in ascending order, near-duplicates merged.
pub fn solve_quartic(a: f64, b: f64, c: f64, d: f64, e: f64) -> Roots {
    if a.abs() < LEADING_EPS {
        return solve_cubic(b, c, d, e);
    }

    let p = b / a;
    let q = c / a;
    let r = d / a;
    let s = e / a;

    let p2 = p * p;
    let a2 = q - 3.0 * p2 / 8.0;
    let a1 = r - p * q / 2.0 + p2 * p / 8.0;
    let a0 = s - p * r / 4.0 + p2 * q / 16.0 - 3.0 * p2 * p2 / 256.0;
    let shift = p / 4.0;

    let m = solve_cubic(8.0, 8.0 * a2, 2.0 * a2 * a2 - 8.0 * a0, -a1 * a1)
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max);

    let mut roots = Roots::new();
    if m > LEADING_EPS && a1.abs() > LEADING_EPS {
        let s2 = (2.0 * m).sqrt();
        let k = a1 / (2.0 * s2);
        for y in solve_quadratic(1.0, -s2, a2 / 2.0 + m + k) {
            roots.push(y - shift);
        }
        for y in solve_quadratic(1.0, s2, a2 / 2.0 + m - k) {
            roots.push(y - shift);
        }
    } else {
        // Biquadratic: y^4 + a2*y^2 + a0 = 0
        for y2 in solve_quadratic(1.0, a2, a0) {
            if y2 >= 0.0 {
                let y = y2.sqrt();
                roots.push(y - shift);
                roots.push(-y - shift);
            }
        }
    }

    roots.sort_unstable_by(f64::total_cmp);
    dedup_close(&mut roots);
    roots
}

fn dedup_close(roots: &mut Roots) {
    let mut i = 1;
    while i < roots.len() {
        if (roots[i] - roots[i - 1]).abs() < 1e-10 {
            roots.remove(i);
        } else {
            i += 1;
        }
    }
}

/// Evaluate a monic-or-not quartic and its derivative at `x`.
#[inline]
pub fn quartic_with_derivative(coeffs: &[f64; 5], x: f64) -> (f64, f64) {
    let [a, b, c, d, e] = *coeffs;
    let f = (((a * x + b) * x + c) * x + d) * x + e;
    let df = ((4.0 * a * x + 3.0 * b) * x + 2.0 * c) * x + d;
    (f, df)
}

/// Refine a quartic root with a few Newton steps.
pub fn polish_quartic_root(coeffs: &[f64; 5], mut x: f64, steps: usize) -> f64 {
    for _ in 0..steps {
        let (f, df) = quartic_with_derivative(coeffs, x);
        if df.abs() < f64::MIN_POSITIVE {
            break;
        }
        let next = x - f / df;
        if !next.is_finite() {
            break;
        }
        x = next;
    }
    x
}
