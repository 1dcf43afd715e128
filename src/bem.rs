//! Blade element momentum analysis of a rotor.
//!
//! Each blade section is solved for the inflow angle _φ_ that balances the
//! blade element and momentum forces. The formulation follows CCBlade:
//! the residual is written in a single variable so that the solution can be
//! found robustly by bracketing, Prandtl tip and hub losses are applied to
//! the loads and the heavily loaded states use Buhl's empirical correction.
//!
//! The quantities follow the propeller convention, i.e., positive normal
//! load is thrust and positive tangential load requires torque. For wind
//! turbines (`turbine = true`), the airfoil is evaluated with flipped sign
//! and the loads are negated so that thrust and power are positive again.
//!
//! # References
//!
//! \[1\] [A simple solution method for the blade element momentum
//! equations with guaranteed convergence](https://doi.org/10.1002/we.1636)
//!
//! \[2\] [Using blade element momentum methods with gradient-based design
//! optimization](https://doi.org/10.1007/s00158-021-02883-6)

use std::f64::consts::{FRAC_PI_2, PI};

use getset::{CopyGetters, Setters};
use log::{debug, warn};
use nalgebra::{
    storage::{Storage, StorageMut},
    Dyn, IsContiguous, Vector,
};

use crate::{
    airfoil::Airfoil,
    algo::{first_bracket, steffensen::Steffensen, Brent},
    core::{Domain, Problem, System},
    driver::SolverDriver,
    geometry::Geometry,
    inflow::Inflow,
};

const ZERO_TOL: f64 = 1e-6;

/// Method for solving the inflow angle of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PhiSolve {
    /// Bracket search in the quadrants followed by Brent's method.
    Bracketing,
    /// Steffensen's method started from the geometric inflow angle, with
    /// bracketing as a fallback.
    Steffensen,
}

/// Options for the rotor analysis.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct BemOptions {
    /// Number of points sampled in a quadrant when searching for a bracket.
    /// Default: `20`.
    npts: usize,
    /// Method for the inflow angle. Default: [`PhiSolve::Bracketing`].
    phi_solve: PhiSolve,
    /// Maximum number of iterations of the root finder. Default: `100`.
    max_iters: usize,
    /// Residual tolerance of Steffensen's method. Default: `1e-10`.
    steffensen_tol: f64,
}

impl Default for BemOptions {
    fn default() -> Self {
        Self {
            npts: 20,
            phi_solve: PhiSolve::Bracketing,
            max_iters: 100,
            steffensen_tol: 1e-10,
        }
    }
}

/// Rotor-level parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotor {
    /// Hub radius (m).
    pub hub_radius: f64,
    /// Tip radius (m).
    pub tip_radius: f64,
    /// Number of blades.
    pub num_blades: usize,
    /// Precone angle (rad).
    pub precone: f64,
    /// Wind turbine instead of propeller.
    pub turbine: bool,
}

/// Blade section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    /// Radius (m).
    pub r: f64,
    /// Width of the blade element (m).
    pub dr: f64,
    /// Chord (m).
    pub chord: f64,
    /// Twist angle (rad).
    pub theta: f64,
}

impl Section {
    /// Sections of a discretized blade.
    pub fn from_geometry(geometry: &Geometry) -> Vec<Self> {
        geometry
            .radii
            .iter()
            .zip(geometry.dradii.iter())
            .zip(geometry.chord.iter().zip(geometry.theta.iter()))
            .map(|((&r, &dr), (&chord, &theta))| Section {
                r,
                dr,
                chord,
                theta,
            })
            .collect()
    }
}

/// Flow conditions at a section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPoint {
    /// Axial inflow velocity (m/s).
    pub vx: f64,
    /// Tangential inflow velocity (m/s).
    pub vy: f64,
    /// Air density (kg/m³).
    pub rho: f64,
    /// Dynamic viscosity (Pa·s).
    pub mu: f64,
    /// Speed of sound (m/s).
    pub asound: f64,
}

impl OperatingPoint {
    /// Operating points of all sections for given inflow.
    pub fn from_inflow(inflow: &Inflow, rho: f64, mu: f64, asound: f64) -> Vec<Self> {
        inflow
            .vx
            .iter()
            .zip(inflow.vy.iter())
            .map(|(&vx, &vy)| OperatingPoint {
                vx,
                vy,
                rho,
                mu,
                asound,
            })
            .collect()
    }
}

/// Solution of a blade section. All zeros for a section without loads.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SectionOutputs {
    /// Normal force per unit length (N/m).
    pub np: f64,
    /// Tangential force per unit length (N/m).
    pub tp: f64,
    /// Axial induction factor.
    pub a: f64,
    /// Tangential induction factor.
    pub ap: f64,
    /// Axial induced velocity (m/s).
    pub u: f64,
    /// Tangential induced velocity (m/s).
    pub v: f64,
    /// Inflow angle (rad).
    pub phi: f64,
    /// Angle of attack (rad).
    pub alpha: f64,
    /// Inflow speed (m/s).
    pub w: f64,
    /// Lift coefficient.
    pub cl: f64,
    /// Drag coefficient.
    pub cd: f64,
    /// Normal force coefficient.
    pub cn: f64,
    /// Tangential force coefficient.
    pub ct: f64,
    /// Hub and tip loss factor.
    pub f: f64,
    /// Effective loss factor applied to the induced velocities.
    pub g: f64,
}

/// Integrated rotor performance.
#[derive(Debug, Clone, PartialEq)]
pub struct Performance {
    /// Solutions of the sections.
    pub sections: Vec<SectionOutputs>,
    /// Thrust (N).
    pub thrust: f64,
    /// Torque (N·m).
    pub torque: f64,
    /// Power (W).
    pub power: f64,
    /// Propulsive efficiency, or power coefficient for turbines.
    pub efficiency: f64,
}

/// Rotor analysis with given airfoil.
pub struct Bem<'a, A> {
    rotor: Rotor,
    airfoil: &'a A,
    options: BemOptions,
}

impl<'a, A: Airfoil> Bem<'a, A> {
    /// Initializes the analysis with default options.
    pub fn new(rotor: Rotor, airfoil: &'a A) -> Self {
        Self::with_options(rotor, airfoil, BemOptions::default())
    }

    /// Initializes the analysis with given options.
    pub fn with_options(rotor: Rotor, airfoil: &'a A, options: BemOptions) -> Self {
        Self {
            rotor,
            airfoil,
            options,
        }
    }

    /// Rotor parameters.
    pub fn rotor(&self) -> &Rotor {
        &self.rotor
    }

    /// Residual of the section equilibrium at inflow angle `phi` together
    /// with the section quantities.
    pub fn residual(&self, phi: f64, section: &Section, op: &OperatingPoint) -> (f64, SectionOutputs) {
        let Rotor {
            hub_radius,
            tip_radius,
            num_blades,
            turbine,
            ..
        } = self.rotor;
        let Section { r, chord, theta, .. } = *section;
        let OperatingPoint { vx, vy, rho, mu, asound } = *op;

        let b = num_blades as f64;
        let sigma_p = b * chord / (2.0 * PI * r);
        let (sphi, cphi) = phi.sin_cos();

        let alpha = theta - phi;

        // Induction is neglected in Reynolds and Mach numbers.
        let w0 = vx.hypot(vy);
        let reynolds = rho * w0 * chord / mu;
        let mach = w0 / asound;

        let (cl, cd) = if turbine {
            let (cl, cd) = self.airfoil.coefficients(-alpha, reynolds, mach);
            (-cl, cd)
        } else {
            self.airfoil.coefficients(alpha, reynolds, mach)
        };

        let cn = cl * cphi - cd * sphi;
        let ct = cl * sphi + cd * cphi;

        let f_tip = prandtl(b / 2.0 * (tip_radius - r) / (r * sphi.abs()));
        let f_hub = prandtl(b / 2.0 * (r - hub_radius) / (hub_radius * sphi.abs()));
        let f = f_tip * f_hub;

        let mut k = cn * sigma_p / (4.0 * f * sphi * sphi);
        let mut kp = ct * sigma_p / (4.0 * f * sphi * cphi);

        let vx_is_zero = vx.abs() <= ZERO_TOL;
        let vy_is_zero = vy.abs() <= ZERO_TOL;

        let (res, a, ap, mut u, mut v) = if vx_is_zero {
            let u = sign(phi) * kp * cn / ct * vy;
            let res = sphi * sphi - sign(phi) * cn * sigma_p / (4.0 * f);
            (res, 0.0, 0.0, u, 0.0)
        } else if vy_is_zero {
            let v = k * ct / cn * vx.abs();
            let res = sign(vx) * 4.0 * f * sphi * cphi + ct * sigma_p;
            (res, 0.0, 0.0, 0.0, v)
        } else {
            if phi < 0.0 {
                k = -k;
            }

            // Corresponds to zero axial velocity, any nonzero residual.
            if (k - 1.0).abs() <= ZERO_TOL {
                return (1.0, SectionOutputs::default());
            }

            let a = if k >= -2.0 / 3.0 {
                k / (1.0 - k)
            } else {
                // Buhl's correction of the heavily loaded states.
                let g1 = f * (2.0 * k - 1.0) + 10.0 / 9.0;
                let g2 = f * (f - 2.0 * k - 4.0 / 3.0);
                let g3 = 2.0 * f * (1.0 - k) - 25.0 / 9.0;

                if g3.abs() <= ZERO_TOL {
                    1.0 / (2.0 * g2.sqrt()) - 1.0
                } else {
                    (g1 + g2.sqrt()) / g3
                }
            };

            if vx < 0.0 {
                kp = -kp;
            }

            // Corresponds to zero tangential velocity, any nonzero residual.
            if (kp + 1.0).abs() <= ZERO_TOL {
                return (1.0, SectionOutputs::default());
            }

            let ap = kp / (1.0 + kp);
            let res = sphi / (1.0 + a) - vx / vy * cphi / (1.0 - ap);
            (res, a, ap, a * vx, ap * vy)
        };

        let w = (vx + u).hypot(vy - v);
        let dynamic = 0.5 * rho * w * w * chord;
        let np = cn * dynamic;
        let tp = ct * dynamic;

        // Losses are applied to the loads, the effective factor G gives the
        // same loads when applied to the induced velocities.
        let g = if vx_is_zero {
            f.sqrt()
        } else if vy_is_zero || a.abs() < f64::EPSILON {
            f
        } else {
            (-1.0 + (1.0 + 4.0 * a * (1.0 + a) * f).sqrt()) / (2.0 * a)
        };
        u *= g;
        v *= g;

        let outputs = if turbine {
            SectionOutputs {
                np: -np,
                tp: -tp,
                a: -a,
                ap: -ap,
                u: -u,
                v: -v,
                phi,
                alpha: -alpha,
                w,
                cl,
                cd,
                cn,
                ct,
                f,
                g,
            }
        } else {
            SectionOutputs {
                np,
                tp,
                a,
                ap,
                u,
                v,
                phi,
                alpha,
                w,
                cl,
                cd,
                cn,
                ct,
                f,
                g,
            }
        };

        (res, outputs)
    }

    /// Solves the section, returning `None` if no solution was found.
    pub fn try_solve(&self, section: &Section, op: &OperatingPoint) -> Option<SectionOutputs> {
        let Rotor {
            hub_radius,
            tip_radius,
            ..
        } = self.rotor;

        // No loads exactly at the hub or tip.
        if (section.r - hub_radius).abs() <= ZERO_TOL || (section.r - tip_radius).abs() <= ZERO_TOL {
            return Some(SectionOutputs::default());
        }

        let OperatingPoint { vx, vy, .. } = *op;
        let theta = section.theta;

        let vx_is_zero = vx.abs() <= ZERO_TOL;
        let vy_is_zero = vy.abs() <= ZERO_TOL;

        const Q1: (f64, f64) = (ZERO_TOL, FRAC_PI_2);
        const Q2: (f64, f64) = (-FRAC_PI_2, -ZERO_TOL);
        const Q3: (f64, f64) = (FRAC_PI_2, PI - ZERO_TOL);
        const Q4: (f64, f64) = (-PI + ZERO_TOL, -FRAC_PI_2);

        let (order, start_from_90): (&[(f64, f64)], bool) = if vx_is_zero && vy_is_zero {
            return Some(SectionOutputs::default());
        } else if vx_is_zero {
            let order: &[_] = match (vy > 0.0, theta > 0.0) {
                (true, true) => &[Q1, Q2],
                (true, false) => &[Q2, Q1],
                (false, true) => &[Q3, Q4],
                (false, false) => &[Q4, Q3],
            };
            (order, false)
        } else if vy_is_zero {
            let order: &[_] = match (vx > 0.0, theta.abs() < FRAC_PI_2) {
                (true, true) => &[Q1, Q3],
                (false, true) => &[Q2, Q4],
                (true, false) => &[Q3, Q1],
                (false, false) => &[Q4, Q2],
            };
            (order, true)
        } else {
            let order: &[_] = match (vx > 0.0, vy > 0.0) {
                (true, true) => &[Q1, Q2, Q3, Q4],
                (false, true) => &[Q2, Q1, Q4, Q3],
                (true, false) => &[Q3, Q4, Q1, Q2],
                (false, false) => &[Q4, Q3, Q2, Q1],
            };
            (order, false)
        };

        if self.options.phi_solve == PhiSolve::Steffensen {
            if let Some(phi) = self.solve_steffensen(section, op, order[0]) {
                return Some(self.residual(phi, section, op).1);
            }
        }

        for &(phi_min, phi_max) in order {
            let backward = if start_from_90 {
                phi_max == FRAC_PI_2
            } else {
                phi_min == -FRAC_PI_2 || phi_max == -FRAC_PI_2
            };

            let bracket = first_bracket(
                |phi| self.residual(phi, section, op).0,
                phi_min,
                phi_max,
                self.options.npts,
                backward,
            );

            if let Some((lower, upper)) = bracket {
                if let Some(phi) = self.solve_brent(section, op, (lower, upper)) {
                    return Some(self.residual(phi, section, op).1);
                }
            }
        }

        None
    }

    /// Solves the section. A section without solution gets zero loads.
    pub fn solve(&self, section: &Section, op: &OperatingPoint) -> SectionOutputs {
        self.try_solve(section, op).unwrap_or_else(|| {
            warn!(
                "no solution for section at r = {} m, zero loads assumed",
                section.r
            );
            SectionOutputs::default()
        })
    }

    /// Solves all sections and integrates the loads over the blades.
    ///
    /// The freestream velocity `v` and rotation speed `omega` define the
    /// efficiency, `rho` is used for the turbine power coefficient.
    pub fn performance(
        &self,
        sections: &[Section],
        ops: &[OperatingPoint],
        v: f64,
        omega: f64,
        rho: f64,
    ) -> Performance {
        let outputs = sections
            .iter()
            .zip(ops.iter())
            .map(|(section, op)| self.solve(section, op))
            .collect::<Vec<_>>();

        let b = self.rotor.num_blades as f64;
        // Loads act normal to the coned blade.
        let cone = self.rotor.precone.cos();

        let thrust = b * cone * sections
            .iter()
            .zip(outputs.iter())
            .map(|(section, out)| out.np * section.dr)
            .sum::<f64>();

        let torque = b * cone * sections
            .iter()
            .zip(outputs.iter())
            .map(|(section, out)| out.tp * section.r * section.dr)
            .sum::<f64>();

        let power = torque * omega;

        let efficiency = if self.rotor.turbine {
            let area = PI * (self.rotor.tip_radius * cone).powi(2);
            power / (0.5 * rho * v.powi(3) * area)
        } else if power == 0.0 {
            0.0
        } else {
            thrust * v / power
        };

        debug!(
            "rotor performance: thrust = {} N, torque = {} N*m, efficiency = {}",
            thrust, torque, efficiency
        );

        Performance {
            sections: outputs,
            thrust,
            torque,
            power,
            efficiency,
        }
    }

    fn solve_brent(&self, section: &Section, op: &OperatingPoint, bracket: (f64, f64)) -> Option<f64> {
        let residual = PhiResidual {
            bem: self,
            section,
            op,
            bounds: bracket,
        };

        let max_iters = self.options.max_iters;
        let mut driver = SolverDriver::builder(&residual)
            .with_initial(vec![bracket.0])
            .build();

        let result = driver.find(|state| state.algo().is_converged() || state.iter() >= max_iters);
        match result {
            Ok((x, _)) => Some(x[0]),
            Err(error) => {
                debug!("Brent failed in {:?}: {}", bracket, error);
                None
            }
        }
    }

    fn solve_steffensen(
        &self,
        section: &Section,
        op: &OperatingPoint,
        quadrant: (f64, f64),
    ) -> Option<f64> {
        let residual = PhiResidual {
            bem: self,
            section,
            op,
            bounds: quadrant,
        };

        let phi0 = op.vx.atan2(op.vy).clamp(quadrant.0, quadrant.1);
        let max_iters = self.options.max_iters;
        let tol = self.options.steffensen_tol;

        let mut driver = SolverDriver::builder(&residual)
            .with_initial(vec![phi0])
            .with_algo(Steffensen::new)
            .build();

        let result = driver.find(|state| state.norm() <= tol || state.iter() >= max_iters);
        match result {
            Ok((x, norm)) if norm <= tol && x[0].is_finite() => Some(x[0]),
            Ok((x, norm)) => {
                debug!("Steffensen stopped at phi = {} with residual {}", x[0], norm);
                None
            }
            Err(error) => {
                debug!("Steffensen failed: {}", error);
                None
            }
        }
    }
}

// Residual in the inflow angle restricted to an interval.
struct PhiResidual<'a, A> {
    bem: &'a Bem<'a, A>,
    section: &'a Section,
    op: &'a OperatingPoint,
    bounds: (f64, f64),
}

impl<A: Airfoil> Problem for PhiResidual<'_, A> {
    type Field = f64;

    fn domain(&self) -> Domain<Self::Field> {
        Domain::rect(vec![self.bounds.0], vec![self.bounds.1])
    }
}

impl<A: Airfoil> System for PhiResidual<'_, A> {
    fn eval<Sx, Srx>(&self, x: &Vector<f64, Dyn, Sx>, rx: &mut Vector<f64, Dyn, Srx>)
    where
        Sx: Storage<f64, Dyn> + IsContiguous,
        Srx: StorageMut<f64, Dyn>,
    {
        rx[0] = self.bem.residual(x[0], self.section, self.op).0;
    }
}

fn prandtl(factor: f64) -> f64 {
    2.0 / PI * (-factor).exp().acos()
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::airfoil::{AirfoilTable, Polar};
    use crate::geometry::BladeGeometry;
    use crate::inflow::simple_inflow;

    use approx::assert_abs_diff_eq;

    fn thin_airfoil() -> AirfoilTable {
        AirfoilTable::viterna(vec![Polar::thin_airfoil(5e5)], 1.3).unwrap()
    }

    fn propeller_rotor() -> Rotor {
        Rotor {
            hub_radius: 0.15,
            tip_radius: 0.75,
            num_blades: 3,
            precone: 0.0,
            turbine: false,
        }
    }

    fn propeller_blade() -> (Vec<Section>, Vec<OperatingPoint>) {
        let theta_cp = (0..6)
            .map(|i| (65.0 - 8.0 * i as f64).to_radians())
            .collect::<Vec<_>>();
        let geometry = BladeGeometry::new(6, 15)
            .unwrap()
            .evaluate(0.3, 1.5, &[0.1; 6], &theta_cp, 0.0)
            .unwrap();
        let inflow = simple_inflow(77.2, 236.0, &geometry.radii, 0.0);

        (
            Section::from_geometry(&geometry),
            OperatingPoint::from_inflow(&inflow, 1.1, 1.8e-5, 347.0),
        )
    }

    #[test]
    fn section_residual_vanishes_at_solution() {
        let airfoil = thin_airfoil();
        let bem = Bem::new(propeller_rotor(), &airfoil);
        let (sections, ops) = propeller_blade();

        for (section, op) in sections.iter().zip(ops.iter()) {
            let out = bem.try_solve(section, op).unwrap();
            let (res, _) = bem.residual(out.phi, section, op);

            assert_abs_diff_eq!(res, 0.0, epsilon = 1e-8);
            assert!(out.phi > 0.0 && out.phi < FRAC_PI_2);
            assert_abs_diff_eq!(out.alpha, section.theta - out.phi, epsilon = 1e-15);
        }
    }

    #[test]
    fn propeller_performance() {
        let airfoil = thin_airfoil();
        let bem = Bem::new(propeller_rotor(), &airfoil);
        let (sections, ops) = propeller_blade();

        let perf = bem.performance(&sections, &ops, 77.2, 236.0, 1.1);

        assert!(perf.thrust > 0.0);
        assert!(perf.torque > 0.0);
        assert_abs_diff_eq!(perf.power, perf.torque * 236.0, epsilon = 1e-9);
        assert!(perf.efficiency > 0.5 && perf.efficiency < 1.0);
        assert_abs_diff_eq!(
            perf.efficiency,
            perf.thrust * 77.2 / perf.power,
            epsilon = 1e-12
        );
    }

    #[test]
    fn precone_projects_loads() {
        let airfoil = thin_airfoil();
        let (sections, ops) = propeller_blade();
        let straight = Bem::new(propeller_rotor(), &airfoil).performance(&sections, &ops, 77.2, 236.0, 1.1);

        let precone = 10f64.to_radians();
        let rotor = Rotor {
            precone,
            ..propeller_rotor()
        };
        let coned = Bem::new(rotor, &airfoil).performance(&sections, &ops, 77.2, 236.0, 1.1);

        assert_eq!(coned.sections, straight.sections);
        assert_abs_diff_eq!(coned.thrust, straight.thrust * precone.cos(), epsilon = 1e-9);
        assert_abs_diff_eq!(coned.torque, straight.torque * precone.cos(), epsilon = 1e-9);
        assert_abs_diff_eq!(coned.efficiency, straight.efficiency, epsilon = 1e-12);
    }

    #[test]
    fn steffensen_agrees_with_bracketing() {
        let airfoil = thin_airfoil();
        let (sections, ops) = propeller_blade();

        let bracketing = Bem::new(propeller_rotor(), &airfoil);
        let mut options = BemOptions::default();
        options.set_phi_solve(PhiSolve::Steffensen);
        let steffensen = Bem::with_options(propeller_rotor(), &airfoil, options);

        for (section, op) in sections.iter().zip(ops.iter()) {
            let expected = bracketing.solve(section, op);
            let actual = steffensen.solve(section, op);

            assert_abs_diff_eq!(actual.phi, expected.phi, epsilon = 1e-8);
            assert_abs_diff_eq!(actual.np, expected.np, epsilon = 1e-4);
        }
    }

    #[test]
    fn momentum_region_induction() {
        let airfoil = |alpha: f64, _re: f64, _mach: f64| (2.0 * PI * alpha, 0.0);
        let bem = Bem::new(propeller_rotor(), &airfoil);
        let (sections, ops) = propeller_blade();

        let out = bem.solve(&sections[7], &ops[7]);

        assert!(out.a > 0.0);
        assert!(out.ap > 0.0);
        assert!(out.f > 0.0 && out.f <= 1.0);
        // Without drag the tangential and normal force coefficients are
        // the lift rotated by phi.
        assert_abs_diff_eq!(out.cn, out.cl * out.phi.cos(), epsilon = 1e-12);
        assert_abs_diff_eq!(out.ct, out.cl * out.phi.sin(), epsilon = 1e-12);
    }

    #[test]
    fn still_air_gives_no_loads() {
        let airfoil = thin_airfoil();
        let bem = Bem::new(propeller_rotor(), &airfoil);
        let section = Section {
            r: 0.5,
            dr: 0.04,
            chord: 0.1,
            theta: 0.4,
        };
        let op = OperatingPoint {
            vx: 0.0,
            vy: 0.0,
            rho: 1.1,
            mu: 1.8e-5,
            asound: 347.0,
        };

        assert_eq!(bem.solve(&section, &op), SectionOutputs::default());
    }

    #[test]
    fn section_at_tip_has_no_loads() {
        let airfoil = thin_airfoil();
        let bem = Bem::new(propeller_rotor(), &airfoil);
        let section = Section {
            r: 0.75,
            dr: 0.04,
            chord: 0.1,
            theta: 0.4,
        };
        let op = OperatingPoint {
            vx: 10.0,
            vy: 100.0,
            rho: 1.1,
            mu: 1.8e-5,
            asound: 347.0,
        };

        assert_eq!(bem.solve(&section, &op), SectionOutputs::default());
    }

    #[test]
    fn invalid_airfoil_gives_zero_loads() {
        let airfoil = |_alpha: f64, _re: f64, _mach: f64| (f64::NAN, f64::NAN);
        let bem = Bem::new(propeller_rotor(), &airfoil);
        let (sections, ops) = propeller_blade();

        assert!(bem.try_solve(&sections[3], &ops[3]).is_none());

        let perf = bem.performance(&sections, &ops, 77.2, 236.0, 1.1);
        assert_eq!(perf.thrust, 0.0);
        assert_eq!(perf.torque, 0.0);
        assert_eq!(perf.efficiency, 0.0);
    }

    #[test]
    fn hover_without_axial_velocity() {
        let airfoil = thin_airfoil();
        let bem = Bem::new(propeller_rotor(), &airfoil);
        let section = Section {
            r: 0.5,
            dr: 0.04,
            chord: 0.1,
            theta: 10f64.to_radians(),
        };
        let op = OperatingPoint {
            vx: 0.0,
            vy: 118.0,
            rho: 1.1,
            mu: 1.8e-5,
            asound: 347.0,
        };

        let out = bem.try_solve(&section, &op).unwrap();
        let (res, _) = bem.residual(out.phi, &section, &op);

        assert_abs_diff_eq!(res, 0.0, epsilon = 1e-8);
        assert!(out.np > 0.0);
        assert!(out.u > 0.0);
    }

    #[test]
    fn turbine_power_coefficient() {
        let airfoil = |alpha: f64, _re: f64, _mach: f64| (2.0 * PI * alpha, 0.01);
        let rotor = Rotor {
            hub_radius: 0.1,
            tip_radius: 1.0,
            num_blades: 3,
            precone: 0.0,
            turbine: true,
        };
        let bem = Bem::new(rotor, &airfoil);

        let v = 10.0;
        let omega = 70.0;
        let cl_design = 2.0 * PI * 5f64.to_radians();
        let num_radial = 20;
        let dr = 0.9 / num_radial as f64;

        let sections = (0..num_radial)
            .map(|i| {
                let r = 0.1 + (i as f64 + 0.5) * dr;
                let phi = 2.0 / 3.0 * (v / (omega * r)).atan();
                Section {
                    r,
                    dr,
                    chord: 8.0 * PI * r * (1.0 - phi.cos()) / (3.0 * cl_design),
                    theta: phi - 5f64.to_radians(),
                }
            })
            .collect::<Vec<_>>();

        let inflow = simple_inflow(
            v,
            omega,
            &sections.iter().map(|s| s.r).collect::<Vec<_>>(),
            0.0,
        );
        let ops = OperatingPoint::from_inflow(&inflow, 1.225, 1.8e-5, 340.0);

        let perf = bem.performance(&sections, &ops, v, omega, 1.225);

        assert!(perf.thrust > 0.0);
        assert!(perf.power > 0.0);
        assert!(perf.efficiency > 0.2 && perf.efficiency < 16.0 / 27.0);
        assert!(perf.sections.iter().all(|s| s.a > 0.0 && s.a < 0.6));
        // Tip loss pushes the outermost cells above the ideal induction.
        assert!(perf
            .sections
            .iter()
            .zip(sections.iter())
            .filter(|(_, section)| section.r < 0.9)
            .all(|(s, _)| s.a < 0.5));
    }

    #[test]
    fn default_options() {
        let options = BemOptions::default();
        assert_eq!(options.npts(), 20);
        assert_eq!(options.phi_solve(), PhiSolve::Bracketing);
        assert_eq!(options.max_iters(), 100);
    }
}
