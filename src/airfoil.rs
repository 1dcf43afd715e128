//! Airfoil lift and drag coefficients.
//!
//! The aerodynamic model queries the section coefficients through the
//! [`Airfoil`] trait. The trait is implemented for plain closures and for
//! [`AirfoilTable`], which interpolates tabulated [polars](Polar) extended to
//! the full circle of angles of attack by the Viterna–Corrigan method.
//!
//! # References
//!
//! \[1\] [Fixed Pitch Rotor Performance of Large Horizontal Axis Wind
//! Turbines](https://ntrs.nasa.gov/citations/19830010962)
//!
//! \[2\] [A New Method of Interpolation and Smooth Curve Fitting Based on
//! Local Procedures](https://dl.acm.org/doi/10.1145/321607.321609)

use std::f64::consts::{FRAC_PI_2, PI};

use log::debug;
use thiserror::Error;

/// Source of the lift and drag coefficients of a blade section.
pub trait Airfoil {
    /// Lift and drag coefficients at given angle of attack (rad), Reynolds
    /// number and Mach number.
    fn coefficients(&self, alpha: f64, reynolds: f64, mach: f64) -> (f64, f64);
}

impl<F> Airfoil for F
where
    F: Fn(f64, f64, f64) -> (f64, f64),
{
    fn coefficients(&self, alpha: f64, reynolds: f64, mach: f64) -> (f64, f64) {
        self(alpha, reynolds, mach)
    }
}

/// Error when constructing airfoil data.
#[derive(Debug, Error, PartialEq)]
pub enum AirfoilError {
    /// A line of a polar file could not be parsed.
    #[error("invalid polar data on line {line}: '{content}'")]
    Parse {
        /// Line number, starting from 1.
        line: usize,
        /// Content of the line.
        content: String,
    },
    /// Not enough points.
    #[error("at least {min} points are required, got {got}")]
    TooFewPoints {
        /// Number of given points.
        got: usize,
        /// Required number of points.
        min: usize,
    },
    /// Abscissas are not strictly increasing.
    #[error("angles of attack are not strictly increasing")]
    NotIncreasing,
    /// Columns have different lengths.
    #[error("columns have different lengths")]
    LengthMismatch,
    /// The polar cannot be extended.
    #[error("maximum lift must be at angle of attack in (0, pi/2), got {0} rad")]
    InvalidStall(f64),
    /// No polars in the table.
    #[error("airfoil table is empty")]
    EmptyTable,
}

/// Minimum number of points in a polar.
pub const POLAR_MIN_POINTS: usize = 5;

/// Lift and drag coefficients tabulated for one Reynolds number.
#[derive(Debug, Clone, PartialEq)]
pub struct Polar {
    reynolds: f64,
    alpha: Vec<f64>,
    cl: Vec<f64>,
    cd: Vec<f64>,
}

impl Polar {
    /// Creates a polar from the columns. Angles of attack are in radians.
    pub fn new(
        reynolds: f64,
        alpha: Vec<f64>,
        cl: Vec<f64>,
        cd: Vec<f64>,
    ) -> Result<Self, AirfoilError> {
        if alpha.len() != cl.len() || alpha.len() != cd.len() {
            return Err(AirfoilError::LengthMismatch);
        }

        if alpha.len() < POLAR_MIN_POINTS {
            return Err(AirfoilError::TooFewPoints {
                got: alpha.len(),
                min: POLAR_MIN_POINTS,
            });
        }

        if !is_strictly_increasing(&alpha) {
            return Err(AirfoilError::NotIncreasing);
        }

        Ok(Self {
            reynolds,
            alpha,
            cl,
            cd,
        })
    }

    /// Parses a polar from whitespace-separated `alpha_deg cl cd` lines.
    ///
    /// Blank lines and lines starting with `#` are skipped, additional
    /// columns are ignored.
    pub fn parse(reynolds: f64, text: &str) -> Result<Self, AirfoilError> {
        let mut alpha = Vec::new();
        let mut cl = Vec::new();
        let mut cd = Vec::new();

        for (i, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let values = trimmed
                .split_whitespace()
                .take(3)
                .map(str::parse::<f64>)
                .collect::<Result<Vec<_>, _>>();

            match values.as_deref() {
                Ok([a, l, d]) => {
                    alpha.push(a.to_radians());
                    cl.push(*l);
                    cd.push(*d);
                }
                _ => {
                    return Err(AirfoilError::Parse {
                        line: i + 1,
                        content: line.to_string(),
                    })
                }
            }
        }

        Self::new(reynolds, alpha, cl, cd)
    }

    /// Reference section with thin airfoil lift slope.
    ///
    /// The lift is linear with slope 2π up to 80 % of the maximum lift
    /// coefficient, then rounds off into a soft stall. The drag polar is
    /// parabolic with skin friction scaled by the Reynolds number. The table
    /// spans -10° to 20°.
    pub fn thin_airfoil(reynolds: f64) -> Self {
        let slope = 2.0 * PI;
        let alpha_zero_lift = (-2.5f64).to_radians();
        let cl_max = 1.25;
        let cl_design = 0.2;
        let cd0 = 0.009 * (5e5 / reynolds.max(1e4)).powf(0.2);
        let induced = 0.008;

        // End of the linear part, the top of the lift curve and the post-stall
        // slope.
        let cl_knee = 0.8 * cl_max;
        let alpha_knee = alpha_zero_lift + cl_knee / slope;
        let round_off = 2.0 * (cl_max - cl_knee) / slope;
        let alpha_stall = alpha_knee + round_off;
        let post_stall_slope = -1.5;

        let alpha = (-10..=20)
            .map(|deg| f64::from(deg).to_radians())
            .collect::<Vec<_>>();

        let cl = alpha
            .iter()
            .map(|&a| {
                if a <= alpha_knee {
                    slope * (a - alpha_zero_lift)
                } else if a <= alpha_stall {
                    let da = a - alpha_knee;
                    cl_knee + slope * da - slope / (2.0 * round_off) * da * da
                } else {
                    cl_max + post_stall_slope * (a - alpha_stall)
                }
            })
            .collect::<Vec<_>>();

        let cd = alpha
            .iter()
            .zip(cl.iter())
            .map(|(&a, &l)| {
                let separated = (a - alpha_stall).max(0.0);
                cd0 + induced * (l - cl_design).powi(2) + separated * separated
            })
            .collect::<Vec<_>>();

        Self {
            reynolds,
            alpha,
            cl,
            cd,
        }
    }

    /// Reynolds number of the polar.
    pub fn reynolds(&self) -> f64 {
        self.reynolds
    }

    /// Angles of attack (rad).
    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    /// Lift coefficients.
    pub fn cl(&self) -> &[f64] {
        &self.cl
    }

    /// Drag coefficients.
    pub fn cd(&self) -> &[f64] {
        &self.cd
    }

    /// Extends the polar to angles of attack in _[-π, π]_ with the
    /// Viterna–Corrigan method.
    ///
    /// The data after the maximum lift coefficient are replaced by the
    /// extrapolation, which is anchored at the stall point. The negative
    /// angles are obtained by reflecting the positive stall with reduced lift.
    pub fn extend_viterna(&self, cd_max: f64) -> Result<Self, AirfoilError> {
        const SEGMENT_POINTS: usize = 15;
        const CL_ADJ: f64 = 0.7;
        const CD_MIN: f64 = 0.001;

        let stall = self
            .cl
            .iter()
            .enumerate()
            .fold(0, |best, (i, cl)| if *cl > self.cl[best] { i } else { best });

        let alpha_high = self.alpha[stall];
        let cl_high = self.cl[stall];
        let cd_high = self.cd[stall];

        let alpha_low = self.alpha[0];
        let cl_low = self.cl[0];
        let cd_low = self.cd[0];

        if alpha_high <= 0.0 || alpha_high >= FRAC_PI_2 || alpha_low <= -FRAC_PI_2 {
            return Err(AirfoilError::InvalidStall(alpha_high));
        }

        let cd_max = self.cd.iter().copied().fold(cd_max, f64::max);

        let (sa, ca) = alpha_high.sin_cos();
        let a = (cl_high - cd_max * sa * ca) * sa / (ca * ca);
        let b = (cd_high - cd_max * sa * sa) / ca;

        let viterna = |alpha: f64, adj: f64| {
            let alpha = alpha.max(1e-4);
            let (s, c) = alpha.sin_cos();
            let cl = (cd_max / 2.0 * (2.0 * alpha).sin() + a * c * c / s) * adj;
            let cd = cd_max * s * s + b * c;
            (cl, cd)
        };

        let mut alpha = Vec::new();
        let mut cl = Vec::new();
        let mut cd = Vec::new();
        let mut push = |al: f64, (l, d): (f64, f64)| {
            alpha.push(al);
            cl.push(l);
            cd.push(d.max(CD_MIN));
        };

        // [-π, -π + alpha_high], lift varies linearly.
        for al in linspace(-PI, -PI + alpha_high, SEGMENT_POINTS) {
            let (_, d) = viterna(al + PI, 1.0);
            push(al, ((al + PI) / alpha_high * cl_high * CL_ADJ, d));
        }

        // (-π + alpha_high, -π/2]
        for al in linspace(-PI + alpha_high, -FRAC_PI_2, SEGMENT_POINTS).skip(1) {
            push(al, viterna(al + PI, CL_ADJ));
        }

        let neg_end = if alpha_low <= -alpha_high {
            alpha_low
        } else {
            -alpha_high
        };

        // (-π/2, neg_end)
        for al in linspace(-FRAC_PI_2, neg_end, SEGMENT_POINTS)
            .skip(1)
            .take(SEGMENT_POINTS - 2)
        {
            push(al, viterna(-al, -CL_ADJ));
        }

        // [-alpha_high, alpha_low), bridge to the tabulated data.
        if alpha_low > -alpha_high {
            for al in linspace(-alpha_high, alpha_low, SEGMENT_POINTS).take(SEGMENT_POINTS - 1) {
                let t = (al + alpha_high) / (alpha_low + alpha_high);
                let l = -cl_high * CL_ADJ + t * (cl_low + cl_high * CL_ADJ);
                let d = cd_low + (al - alpha_low) / (-alpha_high - alpha_low) * (cd_high - cd_low);
                push(al, (l, d));
            }
        }

        // Tabulated data up to the stall.
        for i in 0..=stall {
            push(self.alpha[i], (self.cl[i], self.cd[i]));
        }

        // (alpha_high, π/2]
        for al in linspace(alpha_high, FRAC_PI_2, SEGMENT_POINTS).skip(1) {
            push(al, viterna(al, 1.0));
        }

        // (π/2, π - alpha_high]
        for al in linspace(FRAC_PI_2, PI - alpha_high, SEGMENT_POINTS).skip(1) {
            push(al, viterna(PI - al, -CL_ADJ));
        }

        // (π - alpha_high, π], lift varies linearly.
        for al in linspace(PI - alpha_high, PI, SEGMENT_POINTS).skip(1) {
            let (_, d) = viterna(PI - al, 1.0);
            push(al, ((al - PI) / alpha_high * cl_high * CL_ADJ, d));
        }

        debug!(
            "polar at Re = {} extended from stall at {} rad to {} points",
            self.reynolds,
            alpha_high,
            alpha.len()
        );

        Self::new(self.reynolds, alpha, cl, cd)
    }
}

/// Maximum drag coefficient of a blade with given aspect ratio.
pub fn cd_max_from_aspect_ratio(aspect_ratio: f64) -> f64 {
    1.11 + 0.018 * aspect_ratio
}

fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(move |i| if i == n - 1 { end } else { start + step * i as f64 })
}

fn is_strictly_increasing(x: &[f64]) -> bool {
    x.windows(2).all(|w| w[0] < w[1])
}

/// One-dimensional Akima spline.
///
/// The spline passes through the knots, has continuous first derivative and
/// avoids the overshoots of natural cubic splines. Outside of the knot range,
/// the end values are returned.
#[derive(Debug, Clone)]
pub struct Akima {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl Akima {
    /// Builds the spline through given knots.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, AirfoilError> {
        if x.len() != y.len() {
            return Err(AirfoilError::LengthMismatch);
        }

        let n = x.len();
        if n < 2 {
            return Err(AirfoilError::TooFewPoints { got: n, min: 2 });
        }

        if !is_strictly_increasing(&x) {
            return Err(AirfoilError::NotIncreasing);
        }

        // Secant slopes padded with two extrapolated values on each side.
        let mut m = Vec::with_capacity(n + 3);
        let secants = x
            .windows(2)
            .zip(y.windows(2))
            .map(|(xs, ys)| (ys[1] - ys[0]) / (xs[1] - xs[0]))
            .collect::<Vec<_>>();

        let (first, second) = (secants[0], *secants.get(1).unwrap_or(&secants[0]));
        let last = secants[n - 2];
        let before_last = if n > 2 { secants[n - 3] } else { last };

        m.push(3.0 * first - 2.0 * second);
        m.push(2.0 * first - second);
        m.extend_from_slice(&secants);
        m.push(2.0 * last - before_last);
        m.push(3.0 * last - 2.0 * before_last);

        let slopes = (0..n)
            .map(|i| {
                // m[i + 2] is the secant slope of the interval starting at i.
                let w1 = (m[i + 3] - m[i + 2]).abs();
                let w2 = (m[i + 1] - m[i]).abs();

                if w1 + w2 == 0.0 {
                    (m[i + 1] + m[i + 2]) / 2.0
                } else {
                    (w1 * m[i + 1] + w2 * m[i + 2]) / (w1 + w2)
                }
            })
            .collect();

        Ok(Self { x, y, slopes })
    }

    /// Evaluates the spline. Outside of the knots, the end values are
    /// returned. NaN evaluates to NaN.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.x.len();

        if x.is_nan() {
            return f64::NAN;
        }

        if x <= self.x[0] {
            return self.y[0];
        }

        if x >= self.x[n - 1] {
            return self.y[n - 1];
        }

        // Index of the interval [x_i, x_i+1] containing x.
        let i = self.x.partition_point(|xi| *xi <= x) - 1;

        let h = self.x[i + 1] - self.x[i];
        let t = (x - self.x[i]) / h;
        let secant = (self.y[i + 1] - self.y[i]) / h;

        let t1 = self.slopes[i];
        let t2 = self.slopes[i + 1];

        let c = (3.0 * secant - 2.0 * t1 - t2) * h;
        let d = (t1 + t2 - 2.0 * secant) * h;

        self.y[i] + t * (t1 * h + t * (c + t * d))
    }
}

/// Airfoil given by one or more polars at different Reynolds numbers.
///
/// Coefficients are interpolated by Akima splines in the angle of attack and
/// linearly in the Reynolds number. Reynolds numbers outside of the table are
/// clamped to the nearest polar. The Mach number is not taken into account.
#[derive(Debug, Clone)]
pub struct AirfoilTable {
    reynolds: Vec<f64>,
    cl: Vec<Akima>,
    cd: Vec<Akima>,
}

impl AirfoilTable {
    /// Creates the table from polars that already cover the whole range of
    /// angles of attack of interest.
    pub fn new(mut polars: Vec<Polar>) -> Result<Self, AirfoilError> {
        if polars.is_empty() {
            return Err(AirfoilError::EmptyTable);
        }

        polars.sort_by(|a, b| a.reynolds.total_cmp(&b.reynolds));

        let mut reynolds = Vec::with_capacity(polars.len());
        let mut cl = Vec::with_capacity(polars.len());
        let mut cd = Vec::with_capacity(polars.len());

        for polar in polars {
            reynolds.push(polar.reynolds);
            cl.push(Akima::new(polar.alpha.clone(), polar.cl)?);
            cd.push(Akima::new(polar.alpha, polar.cd)?);
        }

        Ok(Self { reynolds, cl, cd })
    }

    /// Creates the table from polars extended by the Viterna–Corrigan method
    /// with given maximum drag coefficient.
    pub fn viterna(polars: Vec<Polar>, cd_max: f64) -> Result<Self, AirfoilError> {
        let extended = polars
            .iter()
            .map(|polar| polar.extend_viterna(cd_max))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(extended)
    }

    /// Reynolds numbers of the polars in ascending order.
    pub fn reynolds(&self) -> &[f64] {
        &self.reynolds
    }
}

impl Airfoil for AirfoilTable {
    fn coefficients(&self, alpha: f64, reynolds: f64, _mach: f64) -> (f64, f64) {
        // Wrap into [-π, π).
        let alpha = (alpha + PI).rem_euclid(2.0 * PI) - PI;
        let n = self.reynolds.len();

        let eval = |i: usize| (self.cl[i].eval(alpha), self.cd[i].eval(alpha));

        if n == 1 || reynolds.is_nan() || reynolds <= self.reynolds[0] {
            return eval(0);
        }

        if reynolds >= self.reynolds[n - 1] {
            return eval(n - 1);
        }

        let i = self.reynolds.partition_point(|re| *re <= reynolds) - 1;
        let t = (reynolds - self.reynolds[i]) / (self.reynolds[i + 1] - self.reynolds[i]);

        let (cl0, cd0) = eval(i);
        let (cl1, cd1) = eval(i + 1);

        (cl0 + t * (cl1 - cl0), cd0 + t * (cd1 - cd0))
    }
}
