//! One-dimensional discretization of a rectangular flow channel.

use crate::common::check_positive;
use crate::error::{CellError, CellResult};
use sf_core::grid::linspace;
use sf_core::units::Length;

/// Geometry of a rectangular channel with distributed bend losses.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelGeometry {
    pub length: Length,
    pub width: Length,
    pub height: Length,
    /// Number of 180° bends along the channel
    pub bends: usize,
    /// Loss coefficient per bend
    pub bend_loss_coefficient: f64,
}

/// A channel split into `elements` equal elements along the flow axis.
#[derive(Clone, Debug)]
pub struct Channel {
    geometry: ChannelGeometry,
    x: Vec<f64>,
    dx: Vec<f64>,
}

impl Channel {
    pub fn new(geometry: ChannelGeometry, elements: usize) -> CellResult<Self> {
        if elements == 0 {
            return Err(CellError::InvalidArg {
                what: "channel needs at least one element",
            });
        }
        check_positive(geometry.length.value, "channel length")?;
        check_positive(geometry.width.value, "channel width")?;
        check_positive(geometry.height.value, "channel height")?;
        if !geometry.bend_loss_coefficient.is_finite() || geometry.bend_loss_coefficient < 0.0 {
            return Err(CellError::NonPhysical {
                what: "bend loss coefficient",
                value: geometry.bend_loss_coefficient,
            });
        }
        let x = linspace(0.0, geometry.length.value, elements + 1);
        let dx = x.windows(2).map(|w| w[1] - w[0]).collect();
        Ok(Self { geometry, x, dx })
    }

    pub fn geometry(&self) -> &ChannelGeometry {
        &self.geometry
    }

    pub fn elements(&self) -> usize {
        self.dx.len()
    }

    pub fn nodes(&self) -> usize {
        self.x.len()
    }

    /// Node coordinates along the flow axis (m).
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Element lengths (m).
    pub fn dx(&self) -> &[f64] {
        &self.dx
    }

    pub fn length(&self) -> f64 {
        self.geometry.length.value
    }

    pub fn width(&self) -> f64 {
        self.geometry.width.value
    }

    pub fn height(&self) -> f64 {
        self.geometry.height.value
    }

    pub fn cross_area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn perimeter(&self) -> f64 {
        2.0 * (self.width() + self.height())
    }

    pub fn hydraulic_diameter(&self) -> f64 {
        4.0 * self.cross_area() / self.perimeter()
    }

    /// Footprint of the open channel on the electrode (m²).
    pub fn base_area(&self) -> f64 {
        self.width() * self.length()
    }

    /// Bend losses spread evenly over the elements.
    pub fn bend_loss_per_element(&self) -> f64 {
        self.geometry.bend_loss_coefficient * self.geometry.bends as f64 / self.elements() as f64
    }
}
