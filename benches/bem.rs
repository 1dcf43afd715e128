use criterion::{black_box, criterion_group, criterion_main, Criterion};
use bemopt::{
    airfoil::{AirfoilTable, Polar},
    bem::{Bem, BemOptions, OperatingPoint, PhiSolve, Rotor, Section},
    geometry::BladeGeometry,
    inflow::simple_inflow,
    model::{Input, PropellerInputs, PropellerModel},
};

fn airfoil() -> AirfoilTable {
    AirfoilTable::viterna(vec![Polar::thin_airfoil(5e5)], 1.3).unwrap()
}

fn inputs() -> PropellerInputs {
    let mut inputs = PropellerInputs::new(1, 6, 3);
    inputs.fill(Input::Rho, 1.1, "kg/m**3").unwrap();
    inputs.fill(Input::Mu, 1.8e-5, "N/m**2*s").unwrap();
    inputs.fill(Input::Asound, 347.0, "m/s").unwrap();
    inputs.fill(Input::V, 77.2, "m/s").unwrap();
    inputs.fill(Input::Omega, 236.0, "rad/s").unwrap();
    inputs.fill(Input::HubDiameter, 30.0, "cm").unwrap();
    inputs.fill(Input::PropDiameter, 150.0, "cm").unwrap();
    inputs.fill(Input::ChordDv, 10.0, "cm").unwrap();
    inputs
        .set(Input::ThetaDv, &[65.0, 57.0, 49.0, 41.0, 33.0, 25.0], "deg")
        .unwrap();
    inputs
}

fn model_run(c: &mut Criterion) {
    let model = PropellerModel::new(airfoil(), 6, 15).unwrap();
    let inputs = inputs();

    c.bench_function("propeller model 15 sections", |b| {
        b.iter(|| model.run(black_box(&inputs)).unwrap())
    });
}

fn phi_solve(c: &mut Criterion) {
    let airfoil = airfoil();
    let blade = BladeGeometry::new(6, 15).unwrap();
    let geometry = blade
        .evaluate(
            0.3,
            1.5,
            &[0.1; 6],
            &[65f64, 57.0, 49.0, 41.0, 33.0, 25.0].map(f64::to_radians),
            0.0,
        )
        .unwrap();
    let inflow = simple_inflow(77.2, 236.0, &geometry.radii, 0.0);
    let sections = Section::from_geometry(&geometry);
    let ops = OperatingPoint::from_inflow(&inflow, 1.1, 1.8e-5, 347.0);

    let rotor = Rotor {
        hub_radius: geometry.hub_radius,
        tip_radius: geometry.tip_radius,
        num_blades: 3,
        precone: 0.0,
        turbine: false,
    };

    for (name, method) in [
        ("bracketing", PhiSolve::Bracketing),
        ("steffensen", PhiSolve::Steffensen),
    ] {
        let mut options = BemOptions::default();
        options.set_phi_solve(method);
        let bem = Bem::with_options(rotor, &airfoil, options);

        c.bench_function(&format!("sections {name}"), |b| {
            b.iter(|| {
                for (section, op) in sections.iter().zip(ops.iter()) {
                    black_box(bem.solve(section, op));
                }
            })
        });
    }
}

criterion_group!(benches, model_run, phi_solve);
criterion_main!(benches);
