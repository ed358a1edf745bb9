//! sf-cell: channel, half-cell, membrane and cell models for stackflow.
//!
//! A [`Cell`] owns an anode and a cathode [`HalfCell`] around a [`Membrane`].
//! Each half-cell owns its [`Channel`] and evaluates the species balance,
//! channel hydraulics and electrode losses for a given current-density
//! profile. The cell combines them into a voltage profile and its
//! sensitivity to current, which the stack's electrical solver consumes.

pub mod cell;
pub mod channel;
pub mod common;
pub mod error;
pub mod half_cell;
pub mod losses;
pub mod membrane;

pub use cell::{Cell, CellParams, LAYERS, Layer, LayerConductances, LayerConductivity};
pub use channel::{Channel, ChannelGeometry};
pub use error::{CellError, CellResult};
pub use half_cell::{Electrode, HalfCell, HalfCellParams, ID_INERT, ID_REACTANT, ID_WATER};
pub use losses::{ElectrodeLosses, ElectrodeParams, LossFlags};
pub use membrane::{Membrane, MembraneParams};
