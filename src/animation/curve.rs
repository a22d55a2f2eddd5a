/// Keyframe easing curve: a cubic Bézier through `(0, 0)` and `(1, 1)` with
/// the free control points `(x1, y1)` and `(x2, y2)`.
///
/// `evaluate(x)` inverts `x(t)` with Newton-Raphson and returns `y(t)`.
/// Control points outside `[0, 1]` (non-monotonic `x(t)`) are not rejected;
/// the iteration may then settle on a local root.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterpolationCurve {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

const MAX_ITERATIONS: usize = 8;
const CONVERGENCE: f32 = 1e-5;

impl InterpolationCurve {
    /// `y = x`
    pub const LINEAR: Self = Self::new(0.0, 0.0, 1.0, 1.0);

    #[inline]
    #[must_use]
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Control points quantized to `0..=127`, as stored by keyframe files.
    #[must_use]
    pub fn from_bytes(x1: u8, y1: u8, x2: u8, y2: u8) -> Self {
        let n = |v: u8| f32::from(v) / 127.0;
        Self::new(n(x1), n(y1), n(x2), n(y2))
    }

    /// Both control points lie on the diagonal, so `y(t) == x(t)`.
    #[inline]
    pub fn is_linear(&self) -> bool {
        self.x1 == self.y1 && self.x2 == self.y2
    }

    #[must_use]
    pub fn evaluate(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        if self.is_linear() {
            return x;
        }

        let Self { x1, y1, x2, y2 } = *self;

        // x(t)/3 = s*t*(s*x1 + t*x2) + t^3/3, with s = 1 - t.
        // d/dt of that is a*t^2 + b*t + x1.
        let a = 3.0 * (x1 - x2) + 1.0;
        let b = 2.0 * x2 - 4.0 * x1;

        let mut t = x;
        for _ in 0..MAX_ITERATIONS {
            let s = 1.0 - t;
            let f = s * t * (s * x1 + t * x2) + (t * t * t - x) / 3.0;
            let df = a * t * t + b * t + x1;
            if df.abs() < f32::EPSILON {
                break;
            }
            let delta = f / df;
            t = (t - delta).clamp(0.0, 1.0);
            if delta.abs() < CONVERGENCE {
                break;
            }
        }

        let s = 1.0 - t;
        3.0 * s * t * (s * y1 + t * y2) + t * t * t
    }
}

impl Default for InterpolationCurve {
    fn default() -> Self {
        Self::LINEAR
    }
}
