//! CPU renditions of the fragment kernels, line for line, for checking the
//! recurrences and palettes at known points.

const TWO_PI: f64 = 6.28318;
const PI: f64 = 3.14159;

const LYAPUNOV_RUN: usize = 6;
const LYAPUNOV_EPSILON: f64 = 0.0001;

fn length(z: [f64; 2]) -> f64 {
    (z[0] * z[0] + z[1] * z[1]).sqrt()
}

/// Steps survived before `|z| >= 2`, up to `max_iter`.
fn escape(mut z: [f64; 2], max_iter: u32, step: impl Fn([f64; 2]) -> [f64; 2]) -> u32 {
    let mut n = 0;
    for _ in 0..max_iter {
        z = step(z);
        if length(z) >= 2.0 {
            break;
        }
        n += 1;
    }
    n
}

pub fn julia_escape(z: [f64; 2], c: [f64; 2], max_iter: u32) -> u32 {
    escape(z, max_iter, |z| {
        [z[0] * z[0] - z[1] * z[1] + c[0], 2.0 * z[0] * z[1] + c[1]]
    })
}

pub fn burning_ship_step(z: [f64; 2], c: [f64; 2]) -> [f64; 2] {
    [
        z[0] * z[0] - z[1] * z[1] + c[0],
        2.0 * (z[0] * z[1]).abs() + c[1],
    ]
}

pub fn burning_ship_escape(z: [f64; 2], c: [f64; 2], max_iter: u32) -> u32 {
    escape(z, max_iter, |z| burning_ship_step(z, c))
}

pub fn julia_rainbow(t: f64) -> [f64; 3] {
    [0.0, 0.33, 0.67].map(|phase| 0.5 + 0.5 * (TWO_PI * (t + phase)).cos())
}

pub fn julia_grayscale(t: f64) -> [f64; 3] {
    [t; 3]
}

pub fn burning_ship_warm(t: f64) -> [f64; 3] {
    let color = [
        0.9 + 0.1 * (t * PI).cos(),
        0.5 * (t * PI * 2.0).sin(),
        0.1 * (t * PI).sin(),
    ];
    color.map(|channel| channel.clamp(0.0, 1.0))
}

/// Accumulated `log2|r (1 - 2x)|` with `r` alternating between the two
/// coordinates of `r` in runs of six.
pub fn lyapunov_exponent(r: [f64; 2], seed_x: f64, seed_h: f64, max_iter: u32) -> f64 {
    let mut x = seed_x;
    let mut h = seed_h;
    for _ in 0..max_iter {
        for rate in r {
            for _ in 0..LYAPUNOV_RUN {
                x = rate * x * (1.0 - x);
                h += ((rate * (1.0 - 2.0 * x)).abs() + LYAPUNOV_EPSILON).log2();
            }
        }
    }
    h
}

pub fn lyapunov_color(h: f64, max_iter: u32) -> [f64; 3] {
    let h = h / (f64::from(max_iter) * 12.0);
    let mut color = [0.0; 3];
    if h > 0.0 {
        let weight = h.powf(0.25);
        color = [0.0, 0.4, 0.7].map(|phase| (0.5 + 0.5 * (phase + 2.5 * h).sin()) * weight);
    }
    color.map(|channel| channel.clamp(0.0, 1.0))
}
