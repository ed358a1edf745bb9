use sf_project::{
    Project, ProjectError, ProjectFormat, load, load_json, load_yaml, save, save_json, save_yaml,
};
use sf_stack::ManifoldKind;

#[test]
fn roundtrip_yaml_reference_project() {
    let project = Project::new("Reference");

    let path = std::env::temp_dir().join("sf_project_roundtrip_reference.yaml");
    save_yaml(&path, &project).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(project, loaded);
}

#[test]
fn roundtrip_json_modified_project() {
    let mut project = Project::new("Z headers");
    project.description = Some("five cells, cooled end plates".to_string());
    project.stack.stack.cell_count = 5;
    project.stack.coolant.end_plate_cooling = true;
    project.stack.cathode_manifold.kind = ManifoldKind::Z;
    project.simulation.target_current_densities_a_per_m2 = vec![1000.0, 3000.0];

    let path = std::env::temp_dir().join("sf_project_roundtrip_modified.json");
    save_json(&path, &project).unwrap();
    let loaded = load_json(&path).unwrap();

    assert_eq!(project, loaded);
    assert_eq!(load(&path).unwrap(), project);
}

#[test]
fn invalid_project_is_not_saved() {
    let mut project = Project::new("broken");
    project.stack.cathode.stoichiometry = 0.8;

    let path = std::env::temp_dir().join("sf_project_roundtrip_broken.yaml");
    let _ = std::fs::remove_file(&path);
    let err = save_yaml(&path, &project).unwrap_err();
    assert!(matches!(err, ProjectError::Validation(_)));
    assert!(!path.exists());
}

#[test]
fn unknown_extension_is_rejected() {
    let err = load(std::path::Path::new("stack.toml")).unwrap_err();
    assert!(matches!(err, ProjectError::UnknownFormat { .. }));
}

#[test]
fn missing_section_is_a_parse_error() {
    let path = std::env::temp_dir().join("sf_project_missing_stack.yaml");
    std::fs::write(
        &path,
        "version: 1\nname: no stack\nsimulation:\n  target_current_densities_a_per_m2: [4000.0]\n",
    )
    .unwrap();
    assert!(matches!(load_yaml(&path), Err(ProjectError::Yaml(_))));
}

#[test]
fn format_follows_extension_on_save() {
    let project = Project::new("by extension");
    let path = std::env::temp_dir().join("sf_project_by_extension.yml");
    save(&path, &project).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(ProjectFormat::Yaml.parse(&text).unwrap(), project);
    assert!(ProjectFormat::Json.parse(&text).is_err());
}
