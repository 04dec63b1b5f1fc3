//! CIE L*a*b* conversion and the CIEDE2000 color-difference formula.

use serde::{Deserialize, Serialize};

/// A color sample in CIE L*a*b*. `l` in [0,100]; `a`,`b` roughly [-128,127].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabSample {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl LabSample {
    pub fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }

    /// Chroma, C = sqrt(a^2 + b^2).
    pub fn chroma(&self) -> f64 {
        (self.a * self.a + self.b * self.b).sqrt()
    }
}

/// Convert one sRGB pixel to CIE L*a*b* (D65 illuminant, 2° observer).
pub fn srgb_to_lab(r: u8, g: u8, b: u8) -> LabSample {
    let (x, y, z) = srgb_to_xyz(r, g, b);
    xyz_to_lab(x, y, z)
}

fn srgb_to_xyz(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let lin = |c: u8| -> f64 {
        let c = c as f64 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    let r = lin(r);
    let g = lin(g);
    let b = lin(b);

    // sRGB D65 linear -> XYZ
    let x = 0.4124564 * r + 0.3575761 * g + 0.1804375 * b;
    let y = 0.2126729 * r + 0.7151522 * g + 0.0721750 * b;
    let z = 0.0193339 * r + 0.1191920 * g + 0.9503041 * b;
    (x, y, z)
}

// D65 reference white.
const XN: f64 = 0.95047;
const YN: f64 = 1.00000;
const ZN: f64 = 1.08883;

fn xyz_to_lab(x: f64, y: f64, z: f64) -> LabSample {
    let f = |t: f64| -> f64 {
        const DELTA: f64 = 6.0 / 29.0;
        if t > DELTA.powi(3) {
            t.cbrt()
        } else {
            t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
        }
    };

    let fx = f(x / XN);
    let fy = f(y / YN);
    let fz = f(z / ZN);

    LabSample::new(
        116.0 * fy - 16.0,
        500.0 * (fx - fy),
        200.0 * (fy - fz),
    )
}

/// Inverse of [`srgb_to_lab`], used by tests/demos to paint known Lab
/// colors into synthetic sRGB test charts.
pub fn lab_to_srgb(sample: LabSample) -> (u8, u8, u8) {
    let fy = (sample.l + 16.0) / 116.0;
    let fx = fy + sample.a / 500.0;
    let fz = fy - sample.b / 200.0;

    const DELTA: f64 = 6.0 / 29.0;
    let finv = |f: f64| -> f64 {
        if f > DELTA {
            f.powi(3)
        } else {
            3.0 * DELTA * DELTA * (f - 4.0 / 29.0)
        }
    };

    let x = XN * finv(fx);
    let y = YN * finv(fy);
    let z = ZN * finv(fz);

    let r = 3.2404542 * x - 1.5371385 * y - 0.4985314 * z;
    let g = -0.9692660 * x + 1.8760108 * y + 0.0415560 * z;
    let b = 0.0556434 * x - 0.2040259 * y + 1.0572252 * z;

    let gamma = |c: f64| -> u8 {
        let c = c.clamp(0.0, 1.0);
        let enc = if c <= 0.0031308 {
            c * 12.92
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        };
        (enc.clamp(0.0, 1.0) * 255.0).round() as u8
    };

    (gamma(r), gamma(g), gamma(b))
}

/// Encode a floating-point Lab sample the way an 8-bit Lab image would
/// store it: L scaled to 0..255, a/b offset by +128 to fit an unsigned
/// byte. Used to emulate the precision the warped-canvas conversion goes
/// through before patches are averaged.
pub fn encode_lab_8bit(sample: LabSample) -> (u8, u8, u8) {
    let l8 = (sample.l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8;
    let a8 = (sample.a + 128.0).round().clamp(0.0, 255.0) as u8;
    let b8 = (sample.b + 128.0).round().clamp(0.0, 255.0) as u8;
    (l8, a8, b8)
}

/// Decode an averaged 8-bit-Lab triple (the average may be fractional —
/// it comes from averaging several 8-bit samples) back to floating Lab.
pub fn decode_lab_8bit(l8: f64, a8: f64, b8: f64) -> LabSample {
    LabSample::new(l8 * 100.0 / 255.0, a8 - 128.0, b8 - 128.0)
}

/// CIEDE2000 color difference between a measured and a reference sample.
/// Parametric weights k_L = k_C = k_H = 1.
pub fn ciede2000(measured: LabSample, reference: LabSample) -> f64 {
    let (l1, a1, b1) = (measured.l, measured.a, measured.b);
    let (l2, a2, b2) = (reference.l, reference.a, reference.b);

    let c1 = (a1 * a1 + b1 * b1).sqrt();
    let c2 = (a2 * a2 + b2 * b2).sqrt();
    let c_bar = (c1 + c2) / 2.0;

    let c_bar7 = c_bar.powi(7);
    let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + 25f64.powi(7))).sqrt());

    let a1p = (1.0 + g) * a1;
    let a2p = (1.0 + g) * a2;

    let c1p = (a1p * a1p + b1 * b1).sqrt();
    let c2p = (a2p * a2p + b2 * b2).sqrt();

    let h1p = norm_hue(b1.atan2(a1p));
    let h2p = norm_hue(b2.atan2(a2p));

    let delta_l = l2 - l1;
    let delta_c = c2p - c1p;

    let delta_h_raw = if c1p * c2p == 0.0 {
        0.0
    } else {
        let diff = h2p - h1p;
        if diff.abs() <= std::f64::consts::PI {
            diff
        } else if diff > std::f64::consts::PI {
            diff - 2.0 * std::f64::consts::PI
        } else {
            diff + 2.0 * std::f64::consts::PI
        }
    };
    let delta_h = 2.0 * (c1p * c2p).sqrt() * (delta_h_raw / 2.0).sin();

    let l_bar = (l1 + l2) / 2.0;
    let s_l = 1.0 + (0.015 * (l_bar - 50.0).powi(2)) / (20.0 + (l_bar - 50.0).powi(2)).sqrt();

    let c_bar_p = (c1p + c2p) / 2.0;
    let s_c = 1.0 + 0.045 * c_bar_p;

    let h_bar_p = if c1p * c2p == 0.0 {
        h1p + h2p
    } else if (h1p - h2p).abs() <= std::f64::consts::PI {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < 2.0 * std::f64::consts::PI {
        (h1p + h2p + 2.0 * std::f64::consts::PI) / 2.0
    } else {
        (h1p + h2p - 2.0 * std::f64::consts::PI) / 2.0
    };

    let deg = |r: f64| r.to_degrees();
    let rad = |d: f64| d.to_radians();

    let t = 1.0 - 0.17 * rad(deg(h_bar_p) - 30.0).cos()
        + 0.24 * (2.0 * h_bar_p).cos()
        + 0.32 * rad(deg(h_bar_p) * 3.0 + 6.0).cos()
        - 0.20 * rad(deg(h_bar_p) * 4.0 - 63.0).cos();

    let s_h = 1.0 + 0.015 * c_bar_p * t;

    let delta_theta = rad(30.0) * (-(((deg(h_bar_p) - 275.0) / 25.0).powi(2))).exp();
    let r_c = 2.0 * (c_bar_p.powi(7) / (c_bar_p.powi(7) + 25f64.powi(7))).sqrt();
    let r_t = -r_c * (2.0 * delta_theta).sin();

    let term_l = delta_l / s_l;
    let term_c = delta_c / s_c;
    let term_h = delta_h / s_h;

    (term_l * term_l + term_c * term_c + term_h * term_h + r_t * term_c * term_h).sqrt()
}

fn norm_hue(radians: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    let r = radians % two_pi;
    if r < 0.0 { r + two_pi } else { r }
}

/// The 24 standard ColorChecker reference patches, in the canonical
/// row-major sampling order (6 columns x 4 rows, dark-skin top-left to
/// darkest-neutral bottom-right).
pub static REFERENCE_TABLE: [LabSample; 24] = [
    LabSample { l: 37.986, a: 13.555, b: 14.059 },
    LabSample { l: 65.711, a: 18.130, b: 17.810 },
    LabSample { l: 49.927, a: -4.880, b: -21.925 },
    LabSample { l: 43.139, a: -13.095, b: 21.905 },
    LabSample { l: 55.112, a: 8.844, b: -25.399 },
    LabSample { l: 70.719, a: -33.395, b: -0.199 },
    LabSample { l: 62.661, a: 36.067, b: 57.096 },
    LabSample { l: 40.020, a: 10.410, b: -45.964 },
    LabSample { l: 51.124, a: 48.239, b: 16.248 },
    LabSample { l: 30.325, a: 22.976, b: -21.587 },
    LabSample { l: 72.532, a: -23.709, b: 57.255 },
    LabSample { l: 71.941, a: 19.363, b: 67.857 },
    LabSample { l: 28.778, a: 14.179, b: -50.297 },
    LabSample { l: 55.261, a: -38.342, b: 31.370 },
    LabSample { l: 42.101, a: 53.378, b: 28.190 },
    LabSample { l: 81.733, a: 4.039, b: 79.819 },
    LabSample { l: 51.935, a: 49.986, b: -14.574 },
    LabSample { l: 51.038, a: -28.631, b: -28.638 },
    LabSample { l: 96.539, a: -0.425, b: 1.186 },
    LabSample { l: 81.257, a: -0.638, b: -0.335 },
    LabSample { l: 66.766, a: -0.734, b: -0.504 },
    LabSample { l: 50.867, a: -0.153, b: -0.270 },
    LabSample { l: 35.656, a: -0.421, b: -1.231 },
    LabSample { l: 20.461, a: -0.079, b: -0.973 },
];
