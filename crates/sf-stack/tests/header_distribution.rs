//! Header flow distribution with arbitrary monotonic friction profiles.

use proptest::prelude::*;
use sf_fluids::{CrossSection, HeaderSegment};
use sf_stack::{
    FlowDistribution, FrictionModel, HeaderFluid, ManifoldInput, ManifoldKind, StackResult,
    distribute,
};

/// Fanning factor fixed per header section.
#[derive(Debug)]
struct Profile(Vec<f64>);

impl FrictionModel for Profile {
    fn fanning(&self, _re: f64, segment: usize) -> StackResult<f64> {
        Ok(self.0[segment.min(self.0.len() - 1)])
    }
}

fn header(diameter: f64) -> HeaderSegment {
    HeaderSegment {
        length: 5e-3,
        cross_section: CrossSection::Circular { diameter },
        loss_coefficient: 0.4,
    }
}

fn input(kind: ManifoldKind, cells: usize, cell_flow: f64) -> ManifoldInput {
    ManifoldInput {
        kind,
        inlet_segment: header(6e-3),
        outlet_segment: header(6e-3),
        outlet_pressure: 1.0e5,
        inlet_fluid: HeaderFluid {
            density: 0.8,
            viscosity: 2.5e-5,
        },
        outlet_fluid: HeaderFluid {
            density: 0.7,
            viscosity: 2.6e-5,
        },
        cell_flow: vec![cell_flow; cells],
        outlet_ratio: vec![0.9; cells],
        reference_pressure_drop: 400.0,
        reference_flow: cell_flow,
        total_flow: cell_flow * cells as f64,
    }
}

fn check(input: &ManifoldInput, d: &FlowDistribution) -> Result<(), TestCaseError> {
    let total: f64 = d.cell_flow.iter().sum();
    prop_assert!((total - input.total_flow).abs() <= 1e-10 * input.total_flow);
    prop_assert!(d.cell_flow.iter().all(|m| *m > 0.0));
    prop_assert_eq!(d.inlet_pressure.len(), input.cell_flow.len());
    Ok(())
}

proptest! {
    #[test]
    fn cell_flows_add_up_to_header_flow(
        cells in 2usize..9,
        z_type in any::<bool>(),
        cell_flow in 5e-6_f64..4e-5,
        mut profile in prop::collection::vec(0.0_f64..0.05, 8),
    ) {
        profile.sort_by(f64::total_cmp);
        let kind = if z_type { ManifoldKind::Z } else { ManifoldKind::U };
        let input = input(kind, cells, cell_flow);
        let d = distribute(&input, &Profile(profile), 1e-9, 50, "cathode").unwrap();
        check(&input, &d)?;
    }
}

#[test]
fn frictionless_header_still_conserves_flow() {
    let input = input(ManifoldKind::U, 5, 2e-5);
    let d = distribute(&input, &Profile(vec![0.0]), 1e-10, 50, "anode").unwrap();
    let total: f64 = d.cell_flow.iter().sum();
    assert!((total - input.total_flow).abs() < 1e-10 * input.total_flow);
    // Pressure recovery alone favours the far cells of a U header.
    assert!(d.cell_flow[4] > d.cell_flow[0]);
}
