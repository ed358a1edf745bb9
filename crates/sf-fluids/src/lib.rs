//! sf-fluids: gas and coolant property correlations for stackflow.
//!
//! Provides:
//! - Reactant/product species with polynomial fits for cp, viscosity and conductivity
//! - Water saturation pressure
//! - Gas-mixture rules (Wilke viscosity, Wassiljewa conductivity, ideal-gas density)
//! - Constant coolant properties
//! - Hydraulic helpers (Reynolds number, friction factors, header and channel pressure drop)
//!
//! Everything here is a pure function of its inputs; no state is kept between calls.
//!
//! # Example
//!
//! ```
//! use sf_fluids::{MixtureProperties, Species};
//!
//! let species = [Species::O2, Species::N2, Species::H2O];
//! let x = [0.21, 0.79, 0.0];
//! let props = MixtureProperties::evaluate(&species, &x, 433.15, 101_325.0).unwrap();
//! assert!(props.density > 0.0);
//! ```

pub mod coolant;
pub mod error;
pub mod hydraulics;
pub mod mixture;
pub mod species;
pub mod water;

pub use coolant::CoolantProperties;
pub use error::{FluidError, FluidResult};
pub use hydraulics::{
    CrossSection, HeaderSegment, channel_pressure_drop, fanning_friction_factor,
    header_pressure_drop, laminar_darcy_friction_factor, reynolds,
};
pub use mixture::{MixtureProperties, mass_fractions, mixture_conductivity, wilke_viscosity};
pub use species::Species;
pub use water::saturation_pressure;
