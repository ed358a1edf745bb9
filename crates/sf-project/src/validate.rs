//! Project validation logic.

use crate::schema::Project;
use sf_sim::SimError;
use sf_stack::ConfigError;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Stack: {0}")]
    Stack(#[from] ConfigError),

    #[error("Simulation: {0}")]
    Simulation(#[from] SimError),
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }
    if project.name.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "name".to_string(),
            value: format!("{:?}", project.name),
            reason: "must not be empty".to_string(),
        });
    }

    project.simulation.validate()?;
    let targets = &project.simulation.target_current_densities_a_per_m2;
    if let Some(w) = targets.windows(2).find(|w| w[1] <= w[0]) {
        return Err(ValidationError::InvalidValue {
            field: "simulation.target_current_densities_a_per_m2".to_string(),
            value: format!("{} after {}", w[1], w[0]),
            reason: "must be strictly increasing".to_string(),
        });
    }

    project.stack.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_project_is_valid() {
        validate_project(&Project::new("reference")).unwrap();
    }

    #[test]
    fn future_version_is_rejected() {
        let mut p = Project::new("x");
        p.version = 99;
        assert!(matches!(
            validate_project(&p),
            Err(ValidationError::UnsupportedVersion { version: 99 })
        ));
    }

    #[test]
    fn unordered_sweep_is_rejected() {
        let mut p = Project::new("x");
        p.simulation.target_current_densities_a_per_m2 = vec![4000.0, 2000.0];
        assert!(matches!(
            validate_project(&p),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn stack_errors_surface() {
        let mut p = Project::new("x");
        p.stack.anode.flow_direction = 0;
        assert!(matches!(
            validate_project(&p),
            Err(ValidationError::Stack(ConfigError::FlowDirection { .. }))
        ));
    }
}
