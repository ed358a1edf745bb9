//! A single cell at 4000 A/m² settles to 1e-6 within the iteration cap.

use sf_sim::{CaseStatus, Simulation, SimulationSettings};
use sf_stack::StackConfig;

#[test]
fn single_cell_converges_at_4000() {
    let mut stack = StackConfig::default();
    stack.stack.cell_count = 1;
    stack.stack.elements = 10;
    stack.stack.calc_flow_distribution = false;

    let settings = SimulationSettings {
        tolerance: 1e-6,
        min_iterations: 3,
        max_iterations: 100,
        target_current_densities_a_per_m2: vec![4000.0],
    };
    let report = Simulation::new(stack, settings).unwrap().run().unwrap();
    let case = &report.cases[0];
    assert_eq!(case.status, CaseStatus::Converged, "{case:?}");
    assert!(case.iterations <= 100);
    assert!(case.current_error < 1e-6);
    assert!(case.temperature_error < 1e-6);

    let cell = &case.cells[0];
    let total: f64 = cell.current_density.iter().sum();
    assert!((total - 10.0 * 4000.0).abs() < 1e-8 * 4.0e4);
    assert!(cell.average_voltage > 0.0 && cell.average_voltage < 0.95);
}
