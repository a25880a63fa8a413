//! Linear RGB <-> CIELAB, quantised to the 8-bit ranges used by the colour
//! denoiser: L in [0, 255] (L* scaled by 255/100), a and b offset by 128.

const XN: f32 = 0.950456;
const ZN: f32 = 1.088754;
const EPSILON: f32 = 0.008856;
const KAPPA: f32 = 903.3;

fn f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn f_inv(t: f32) -> f32 {
    let cube = t * t * t;
    if cube > EPSILON {
        cube
    } else {
        (t - 16.0 / 116.0) / 7.787
    }
}

fn quantise(v: f32) -> f32 {
    v.round().clamp(0.0, 255.0)
}

pub fn rgb_to_lab(rgb: [u8; 3]) -> [f32; 3] {
    let [r, g, b] = rgb.map(|c| c as f32 / 255.0);

    let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / XN;
    let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
    let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / ZN;

    let l = if y > EPSILON { 116.0 * y.cbrt() - 16.0 } else { KAPPA * y };
    let (fx, fy, fz) = (f(x), f(y), f(z));
    let a = 500.0 * (fx - fy);
    let b = 200.0 * (fy - fz);

    [quantise(l * 255.0 / 100.0), quantise(a + 128.0), quantise(b + 128.0)]
}

pub fn lab_to_rgb(lab: [f32; 3]) -> [u8; 3] {
    let l = lab[0] * 100.0 / 255.0;
    let a = lab[1] - 128.0;
    let b = lab[2] - 128.0;

    let (y, fy) = if l <= 8.0 {
        let y = l / KAPPA;
        (y, 7.787 * y + 16.0 / 116.0)
    } else {
        let fy = (l + 16.0) / 116.0;
        (fy * fy * fy, fy)
    };
    let x = f_inv(fy + a / 500.0) * XN;
    let z = f_inv(fy - b / 200.0) * ZN;

    let r = 3.240479 * x - 1.537150 * y - 0.498535 * z;
    let g = -0.969256 * x + 1.875991 * y + 0.041556 * z;
    let b = 0.055648 * x - 0.204043 * y + 1.057311 * z;

    [r, g, b].map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8)
}
