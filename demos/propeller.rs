//! Maximizes the efficiency of a three-bladed propeller at a required
//! thrust by changing its chord and twist distributions.
//!
//! Usage: `propeller [POLAR_FILE [REYNOLDS]]`
//!
//! Without a polar file, a thin airfoil reference polar is used. The polar
//! file has columns of angle of attack (deg), lift and drag coefficients.

use std::{
    env, fs,
    time::{Duration, Instant},
};

use bemopt::{
    airfoil::{AirfoilTable, Polar},
    algo::AugmentedLagrangianOptions,
    design::{optimize, Constraint, Convergence, DesignResult, DesignVariable, Objective, PropellerDesign},
    model::{Input, ModelError, Output, PropellerInputs, PropellerModel, Solution},
};

const NUM_NODES: usize = 1;
const NUM_BLADES: usize = 3;
const NUM_RADIAL: usize = 15;
const NUM_CP: usize = 6;
const NUM_RUNS: usize = 20;
const CD_MAX: f64 = 1.3;

fn airfoil() -> Result<AirfoilTable, String> {
    let mut args = env::args().skip(1);

    let polar = match args.next() {
        Some(path) => {
            let reynolds = match args.next() {
                Some(re) => re.parse().map_err(|error| format!("invalid Reynolds number: {error}"))?,
                None => 5e5,
            };
            let text = fs::read_to_string(&path).map_err(|error| format!("{path}: {error}"))?;
            Polar::parse(reynolds, &text).map_err(|error| format!("{path}: {error}"))?
        }
        None => Polar::thin_airfoil(5e5),
    };

    AirfoilTable::viterna(vec![polar], CD_MAX).map_err(|error| format!("{error}"))
}

fn baseline() -> Result<PropellerInputs, ModelError> {
    let c0 = (1.4 * 287.058 * 300.0f64).sqrt();
    let rho0 = 1.4 * 98600.0 / (c0 * c0);

    let theta: Vec<f64> = (0..NUM_CP)
        .map(|i| 65.0 + (25.0 - 65.0) * i as f64 / (NUM_CP - 1) as f64)
        .collect();

    let mut inputs = PropellerInputs::new(NUM_NODES, NUM_CP, NUM_BLADES);
    inputs.fill(Input::Rho, rho0, "kg/m**3")?;
    inputs.fill(Input::Mu, 1.0, "N/m**2*s")?;
    inputs.fill(Input::Asound, c0, "m/s")?;
    inputs.fill(Input::V, 77.2, "m/s")?;
    inputs.fill(Input::Omega, 236.0, "rad/s")?;
    inputs.fill(Input::HubDiameter, 30.0, "cm")?;
    inputs.fill(Input::PropDiameter, 150.0, "cm")?;
    inputs.fill(Input::Pitch, 0.0, "rad")?;
    inputs.fill(Input::Precone, 0.0, "deg")?;
    inputs.fill(Input::ChordDv, 10.0, "cm")?;
    inputs.set(Input::ThetaDv, &theta, "deg")?;

    Ok(inputs)
}

fn run(model: PropellerModel<AirfoilTable>, baseline: PropellerInputs) -> Result<DesignResult, String> {
    let design = PropellerDesign::builder(model, baseline)
        .design_var(
            DesignVariable::new(Input::ChordDv)
                .unit("cm")
                .lower(1.0)
                .upper(20.0)
                .scaler(5e-2),
        )
        .design_var(
            DesignVariable::new(Input::ThetaDv)
                .unit("rad")
                .lower(20f64.to_radians())
                .upper(90f64.to_radians()),
        )
        .objective(Objective::new(Output::Efficiency).scaler(-1.0))
        .constraint(
            Constraint::new(Output::Thrust)
                .unit("N")
                .equals(700.0)
                .scaler(1e-3)
                .indices([0]),
        )
        .build()
        .map_err(|error| format!("{error}"))?;

    let convergence = Convergence::new(1e-6, 1e-8, 50);
    optimize(&design, AugmentedLagrangianOptions::default(), |state| {
        convergence.is_done(&state)
    })
    .map_err(|error| format!("{error}"))
}

fn print_loads(title: &str, solution: &Solution) -> Result<(), String> {
    let get = |output: Output, unit: &str| {
        solution
            .get_val(output, 0, unit)
            .map_err(|error| format!("{error}"))
    };

    let thrust = get(Output::Thrust, "N")?[0];
    let efficiency = get(Output::Efficiency, "")?[0];
    let chord = get(Output::Chord, "cm")?;
    let theta = get(Output::Theta, "deg")?;
    let loads = solution
        .load_distribution(0)
        .map_err(|error| format!("{error}"))?;

    println!("{title}: thrust = {thrust:.3} N, efficiency = {efficiency:.5}");
    println!("r (cm)\tchord (cm)\ttheta (deg)\tNp (N/m)\tTp (N/m)");

    for i in 0..loads.radii.len() {
        println!(
            "{:.2}\t{:.4}\t\t{:.3}\t\t{:.3}\t\t{:.3}",
            loads.radii[i] * 100.0,
            chord[i],
            theta[i],
            loads.normal[i],
            loads.circumferential[i]
        );
    }

    println!();
    Ok(())
}

fn main() -> Result<(), String> {
    let model = PropellerModel::new(airfoil()?, NUM_CP, NUM_RADIAL).map_err(|error| format!("{error}"))?;
    let baseline = baseline().map_err(|error| format!("{error}"))?;

    let initial = model.run(&baseline).map_err(|error| format!("{error}"))?;
    print_loads("initial", &initial)?;

    let result = run(model.clone(), baseline.clone())?;
    println!(
        "optimized in {} iterations, violation = {:e}",
        result.iterations, result.violation
    );
    print_loads("optimized", &result.solution)?;

    let mut times = Vec::with_capacity(NUM_RUNS);
    for _ in 0..NUM_RUNS {
        let start = Instant::now();
        run(model.clone(), baseline.clone())?;
        times.push(start.elapsed());
    }

    let secs: Vec<f64> = times.iter().map(Duration::as_secs_f64).collect();
    let mean = secs.iter().sum::<f64>() / secs.len() as f64;
    let var = secs.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / secs.len() as f64;

    println!(
        "{} runs: mean = {:.4} s, std = {:.4} s",
        NUM_RUNS,
        mean,
        var.sqrt()
    );

    Ok(())
}
