//! Inflow velocities seen by the blade sections.

/// Axial and tangential inflow velocities at the sections (m/s).
#[derive(Debug, Clone, PartialEq)]
pub struct Inflow {
    /// Axial velocity, positive towards the rotor plane from upstream.
    pub vx: Vec<f64>,
    /// Tangential velocity due to the rotation.
    pub vy: Vec<f64>,
}

/// Uniform freestream `v` (m/s) and rotation `omega` (rad/s) without
/// induction, with blades inclined by `precone` (rad).
pub fn simple_inflow(v: f64, omega: f64, radii: &[f64], precone: f64) -> Inflow {
    let cos_precone = precone.cos();

    Inflow {
        vx: vec![v * cos_precone; radii.len()],
        vy: radii.iter().map(|r| omega * r * cos_precone).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn without_precone() {
        let inflow = simple_inflow(77.2, 236.0, &[0.17, 0.73], 0.0);

        assert_eq!(inflow.vx, vec![77.2, 77.2]);
        assert_abs_diff_eq!(inflow.vy[0], 40.12, epsilon = 1e-12);
        assert_abs_diff_eq!(inflow.vy[1], 172.28, epsilon = 1e-12);
    }

    #[test]
    fn with_precone() {
        let precone = 10f64.to_radians();
        let inflow = simple_inflow(10.0, 100.0, &[0.5], precone);

        assert_abs_diff_eq!(inflow.vx[0], 10.0 * precone.cos(), epsilon = 1e-12);
        assert_abs_diff_eq!(inflow.vy[0], 50.0 * precone.cos(), epsilon = 1e-12);
    }
}
