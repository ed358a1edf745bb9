//! sf-project: project file format and validation.

pub mod migrate;
pub mod schema;
pub mod validate;

pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use validate::{ValidationError, validate_project};

use std::path::Path;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("Unknown project file extension: {path}")]
    UnknownFormat { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk encoding of a project file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectFormat {
    Yaml,
    Json,
}

impl ProjectFormat {
    /// `.yaml`/`.yml` or `.json`.
    pub fn from_path(path: &Path) -> ProjectResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(ProjectError::UnknownFormat {
                path: path.display().to_string(),
            }),
        }
    }

    /// Parse, bring to the latest version, then validate.
    pub fn parse(self, content: &str) -> ProjectResult<Project> {
        let project: Project = match self {
            Self::Yaml => serde_yaml::from_str(content)?,
            Self::Json => serde_json::from_str(content)?,
        };
        let project = migrate_to_latest(project)?;
        validate_project(&project)?;
        Ok(project)
    }

    /// Refuses to render an invalid project.
    pub fn render(self, project: &Project) -> ProjectResult<String> {
        validate_project(project)?;
        Ok(match self {
            Self::Yaml => serde_yaml::to_string(project)?,
            Self::Json => serde_json::to_string_pretty(project)?,
        })
    }

    fn read(self, path: &Path) -> ProjectResult<Project> {
        self.parse(&std::fs::read_to_string(path)?)
    }

    fn write(self, path: &Path, project: &Project) -> ProjectResult<()> {
        let content = self.render(project)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub fn load_yaml(path: &Path) -> ProjectResult<Project> {
    ProjectFormat::Yaml.read(path)
}

pub fn save_yaml(path: &Path, project: &Project) -> ProjectResult<()> {
    ProjectFormat::Yaml.write(path, project)
}

pub fn load_json(path: &Path) -> ProjectResult<Project> {
    ProjectFormat::Json.read(path)
}

pub fn save_json(path: &Path, project: &Project) -> ProjectResult<()> {
    ProjectFormat::Json.write(path, project)
}

/// Load with the format picked from the file extension.
pub fn load(path: &Path) -> ProjectResult<Project> {
    ProjectFormat::from_path(path)?.read(path)
}

/// Save with the format picked from the file extension.
pub fn save(path: &Path, project: &Project) -> ProjectResult<()> {
    ProjectFormat::from_path(path)?.write(path, project)
}
