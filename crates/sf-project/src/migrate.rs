//! Schema migration framework.

use crate::ProjectError;
use crate::schema::Project;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut project: Project) -> Result<Project, ProjectError> {
    while project.version < LATEST_VERSION {
        project = migrate_one_version(project)?;
    }
    Ok(project)
}

fn migrate_one_version(project: Project) -> Result<Project, ProjectError> {
    match project.version {
        0 => migrate_v0_to_v1(project),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 files listed operating points in any order; runs now stop at
/// the first collapse, so the sweep is sorted and deduplicated.
fn migrate_v0_to_v1(mut project: Project) -> Result<Project, ProjectError> {
    let targets = &mut project.simulation.target_current_densities_a_per_m2;
    if targets.iter().any(|t| t.is_nan()) {
        return Err(ProjectError::Migration {
            what: "target current density is NaN".to_string(),
        });
    }
    targets.sort_by(f64::total_cmp);
    targets.dedup();
    project.version = 1;
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v0_sweep_is_sorted() {
        let mut p = Project::new("old");
        p.version = 0;
        p.simulation.target_current_densities_a_per_m2 = vec![6000.0, 2000.0, 4000.0, 2000.0];
        let p = migrate_to_latest(p).unwrap();
        assert_eq!(p.version, LATEST_VERSION);
        assert_eq!(
            p.simulation.target_current_densities_a_per_m2,
            vec![2000.0, 4000.0, 6000.0]
        );
    }

    #[test]
    fn latest_is_untouched() {
        let p = Project::new("new");
        assert_eq!(migrate_to_latest(p.clone()).unwrap(), p);
    }
}
