//! Typed stack configuration.
//!
//! Sections mirror the physical domains of a stack. Field names carry their
//! SI unit as a suffix. [`StackConfig::default`] is a three-cell high
//! temperature PEM stack running on air and dry hydrogen.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use sf_cell::{
    CellParams, ChannelGeometry, Electrode, ElectrodeParams, HalfCellParams, LayerConductivity,
    LossFlags, MembraneParams,
};
use sf_core::PhysicalConstants;
use sf_core::units::m;
use sf_fluids::{CoolantProperties, CrossSection, HeaderSegment, saturation_pressure};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackConfig {
    pub stack: StackDef,
    pub cell: CellDef,
    pub membrane: MembraneDef,
    pub cathode: HalfCellDef,
    pub anode: HalfCellDef,
    pub coolant: CoolantDef,
    pub cathode_manifold: ManifoldDef,
    pub anode_manifold: ManifoldDef,
    pub coolant_manifold: ManifoldDef,
    pub temperature_system: TemperatureSystemDef,
    #[serde(default)]
    pub loss_model: LossModelDef,
    #[serde(default)]
    pub constants: PhysicalConstants,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackDef {
    pub cell_count: usize,
    /// Elements along the flow axis of every channel
    pub elements: usize,
    #[serde(default = "default_true")]
    pub calc_temperature: bool,
    #[serde(default = "default_true")]
    pub calc_current_density: bool,
    #[serde(default = "default_true")]
    pub calc_flow_distribution: bool,
    /// Relative flow change that ends the manifold iteration
    #[serde(default = "default_flow_tolerance")]
    pub flow_tolerance: f64,
    #[serde(default = "default_max_flow_passes")]
    pub max_flow_passes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConductivityDef {
    pub through_plane: f64,
    pub in_plane: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellDef {
    pub width_m: f64,
    pub length_m: f64,
    pub open_circuit_voltage_v: f64,
    pub plate_thickness_m: f64,
    pub plate_electrical_conductivity_s_per_m: f64,
    pub plate_conductivity_w_per_mk: ConductivityDef,
    pub gde_conductivity_w_per_mk: ConductivityDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembraneDef {
    pub thickness_m: f64,
    pub resistance_base_ohm_m2: f64,
    pub resistance_slope_ohm_m2_per_k: f64,
    pub thermal_conductivity_w_per_mk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDef {
    pub length_m: f64,
    pub width_m: f64,
    pub height_m: f64,
    #[serde(default)]
    pub bends: usize,
    #[serde(default)]
    pub bend_loss_coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectrodeDef {
    pub tafel_slope_v: f64,
    pub exchange_current_density_a_per_m3: f64,
    pub cl_proton_conductivity_s_per_m: f64,
    pub cl_diffusivity_m2_per_s: f64,
    pub gdl_diffusivity_m2_per_s: f64,
    pub cl_thickness_m: f64,
    pub gdl_thickness_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalfCellDef {
    pub channel: ChannelDef,
    pub channel_count: usize,
    pub flow_direction: i8,
    pub stoichiometry: f64,
    /// Inert-to-reactant mole ratio of the feed
    #[serde(default)]
    pub inert_ratio: f64,
    #[serde(default)]
    pub inlet_humidity: f64,
    pub inlet_temperature_k: f64,
    pub electrode: ElectrodeDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolantDef {
    #[serde(default)]
    pub properties: CoolantProperties,
    /// Mass flow through one coolant channel
    pub mass_flow_kg_per_s: f64,
    pub inlet_temperature_k: f64,
    pub flow_direction: i8,
    /// Parallel coolant channels in one plate
    pub channel_count: usize,
    pub channel_length_m: f64,
    pub channel_width_m: f64,
    pub channel_height_m: f64,
    #[serde(default)]
    pub bends: usize,
    #[serde(default)]
    pub bend_loss_coefficient: f64,
    pub heat_transfer_coefficient_w_per_m2k: f64,
    /// Coolant channels also run along both end plates
    #[serde(default = "default_true")]
    pub end_plate_cooling: bool,
}

impl CoolantDef {
    pub fn channel_section(&self) -> CrossSection {
        CrossSection::Rectangular {
            width: self.channel_width_m,
            height: self.channel_height_m,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManifoldKind {
    /// Outlet header leaves on the inlet side.
    U,
    /// Outlet header leaves on the far side.
    Z,
}

/// Cross-section of both headers of a manifold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderShape {
    /// Sized by `inlet_diameter_m` and `outlet_diameter_m`.
    #[default]
    Circular,
    /// Sized by the `*_width_m` and `*_height_m` fields.
    Rectangular,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifoldDef {
    pub kind: ManifoldKind,
    /// Solve the header distribution; otherwise the flow splits evenly
    #[serde(default = "default_true")]
    pub calc_distribution: bool,
    #[serde(default)]
    pub shape: HeaderShape,
    pub inlet_diameter_m: f64,
    pub outlet_diameter_m: f64,
    #[serde(default = "default_header_side")]
    pub inlet_width_m: f64,
    #[serde(default = "default_header_side")]
    pub inlet_height_m: f64,
    #[serde(default = "default_header_side")]
    pub outlet_width_m: f64,
    #[serde(default = "default_header_side")]
    pub outlet_height_m: f64,
    /// Header length between two neighbouring cells
    pub segment_length_m: f64,
    #[serde(default)]
    pub junction_loss_coefficient: f64,
    pub outlet_pressure_pa: f64,
}

impl ManifoldDef {
    fn section(&self, diameter: f64, width: f64, height: f64) -> CrossSection {
        match self.shape {
            HeaderShape::Circular => CrossSection::Circular { diameter },
            HeaderShape::Rectangular => CrossSection::Rectangular { width, height },
        }
    }

    fn segment(&self, cross_section: CrossSection) -> HeaderSegment {
        HeaderSegment {
            length: self.segment_length_m,
            cross_section,
            loss_coefficient: self.junction_loss_coefficient,
        }
    }

    /// One section of the header feeding the cells.
    pub fn inlet_header(&self) -> HeaderSegment {
        self.segment(self.section(self.inlet_diameter_m, self.inlet_width_m, self.inlet_height_m))
    }

    /// One section of the header collecting the cell outflow.
    pub fn outlet_header(&self) -> HeaderSegment {
        self.segment(self.section(
            self.outlet_diameter_m,
            self.outlet_width_m,
            self.outlet_height_m,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSystemDef {
    pub ambient_temperature_k: f64,
    pub ambient_heat_transfer_w_per_m2k: f64,
    /// Heat fed into each end plate
    #[serde(default)]
    pub end_plate_heat_w: f64,
    pub initial_temperature_k: f64,
}

/// Switches for the individual voltage-loss terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossModelDef {
    pub activation: bool,
    pub cl_diffusion: bool,
    pub gdl_diffusion: bool,
    pub membrane: bool,
}

fn default_true() -> bool {
    true
}

fn default_header_side() -> f64 {
    10.0e-3
}

fn default_flow_tolerance() -> f64 {
    1e-8
}

fn default_max_flow_passes() -> usize {
    20
}

impl Default for LossModelDef {
    fn default() -> Self {
        Self {
            activation: true,
            cl_diffusion: true,
            gdl_diffusion: true,
            membrane: true,
        }
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        let channel = ChannelDef {
            length_m: 0.24,
            width_m: 1.0e-3,
            height_m: 1.0e-3,
            bends: 48,
            bend_loss_coefficient: 0.1,
        };
        let electrode = |j0: f64| ElectrodeDef {
            tafel_slope_v: 0.03,
            exchange_current_density_a_per_m3: j0,
            cl_proton_conductivity_s_per_m: 3.5,
            cl_diffusivity_m2_per_s: 1.36e-8,
            gdl_diffusivity_m2_per_s: 2.59e-6,
            cl_thickness_m: 10.0e-6,
            gdl_thickness_m: 200.0e-6,
        };
        let manifold = |inlet_diameter_m: f64, outlet_diameter_m: f64| ManifoldDef {
            kind: ManifoldKind::U,
            calc_distribution: true,
            shape: HeaderShape::Circular,
            inlet_diameter_m,
            outlet_diameter_m,
            inlet_width_m: default_header_side(),
            inlet_height_m: default_header_side(),
            outlet_width_m: default_header_side(),
            outlet_height_m: default_header_side(),
            segment_length_m: 5.0e-3,
            junction_loss_coefficient: 0.16,
            outlet_pressure_pa: 1.0e5,
        };
        Self {
            stack: StackDef {
                cell_count: 3,
                elements: 20,
                calc_temperature: true,
                calc_current_density: true,
                calc_flow_distribution: true,
                flow_tolerance: default_flow_tolerance(),
                max_flow_passes: default_max_flow_passes(),
            },
            cell: CellDef {
                width_m: 0.067,
                length_m: 0.067,
                open_circuit_voltage_v: 0.95,
                plate_thickness_m: 2.0e-3,
                plate_electrical_conductivity_s_per_m: 6.0e4,
                plate_conductivity_w_per_mk: ConductivityDef {
                    through_plane: 50.0,
                    in_plane: 100.0,
                },
                gde_conductivity_w_per_mk: ConductivityDef {
                    through_plane: 1.0,
                    in_plane: 10.0,
                },
            },
            membrane: MembraneDef {
                thickness_m: 50.0e-6,
                resistance_base_ohm_m2: 4.3e-5,
                resistance_slope_ohm_m2_per_k: 7.0e-8,
                thermal_conductivity_w_per_mk: 0.26,
            },
            cathode: HalfCellDef {
                channel: channel.clone(),
                channel_count: 10,
                flow_direction: 1,
                stoichiometry: 2.5,
                inert_ratio: 0.79 / 0.21,
                inlet_humidity: 0.0,
                inlet_temperature_k: 433.15,
                electrode: electrode(817.0),
            },
            anode: HalfCellDef {
                channel,
                channel_count: 10,
                flow_direction: -1,
                stoichiometry: 2.0,
                inert_ratio: 0.0,
                inlet_humidity: 0.0,
                inlet_temperature_k: 433.15,
                electrode: electrode(8.17e8),
            },
            coolant: CoolantDef {
                properties: CoolantProperties::default(),
                mass_flow_kg_per_s: 1.0e-4,
                inlet_temperature_k: 433.15,
                flow_direction: 1,
                channel_count: 1,
                channel_length_m: 0.14,
                channel_width_m: 2.0e-3,
                channel_height_m: 1.0e-3,
                bends: 2,
                bend_loss_coefficient: 0.1,
                heat_transfer_coefficient_w_per_m2k: 1000.0,
                end_plate_cooling: true,
            },
            cathode_manifold: manifold(25.0e-3, 30.0e-3),
            anode_manifold: manifold(25.0e-3, 25.0e-3),
            coolant_manifold: manifold(25.0e-3, 25.0e-3),
            temperature_system: TemperatureSystemDef {
                ambient_temperature_k: 298.15,
                ambient_heat_transfer_w_per_m2k: 5.0,
                end_plate_heat_w: 0.0,
                initial_temperature_k: 433.15,
            },
            loss_model: LossModelDef::default(),
            constants: PhysicalConstants::default(),
        }
    }
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
            reason: "must be positive".to_string(),
        })
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
            reason: "must not be negative".to_string(),
        })
    }
}

fn at_least_one(field: &str, value: usize) -> Result<(), ConfigError> {
    if value >= 1 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value as f64,
            reason: "must be at least 1".to_string(),
        })
    }
}

fn direction(field: &str, value: i8) -> Result<(), ConfigError> {
    match value {
        1 | -1 => Ok(()),
        _ => Err(ConfigError::FlowDirection {
            field: field.to_string(),
            value,
        }),
    }
}

impl StackConfig {
    /// Check every parameter and the derived geometric constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.stack;
        at_least_one("stack.cell_count", s.cell_count)?;
        at_least_one("stack.elements", s.elements)?;
        at_least_one("stack.max_flow_passes", s.max_flow_passes)?;
        positive("stack.flow_tolerance", s.flow_tolerance)?;

        let c = &self.cell;
        positive("cell.width_m", c.width_m)?;
        positive("cell.length_m", c.length_m)?;
        positive("cell.open_circuit_voltage_v", c.open_circuit_voltage_v)?;
        positive("cell.plate_thickness_m", c.plate_thickness_m)?;
        positive(
            "cell.plate_electrical_conductivity_s_per_m",
            c.plate_electrical_conductivity_s_per_m,
        )?;
        for (field, k) in [
            ("cell.plate_conductivity_w_per_mk", c.plate_conductivity_w_per_mk),
            ("cell.gde_conductivity_w_per_mk", c.gde_conductivity_w_per_mk),
        ] {
            positive(&format!("{field}.through_plane"), k.through_plane)?;
            positive(&format!("{field}.in_plane"), k.in_plane)?;
        }

        let mem = &self.membrane;
        positive("membrane.thickness_m", mem.thickness_m)?;
        positive("membrane.resistance_base_ohm_m2", mem.resistance_base_ohm_m2)?;
        non_negative(
            "membrane.resistance_slope_ohm_m2_per_k",
            mem.resistance_slope_ohm_m2_per_k,
        )?;
        positive(
            "membrane.thermal_conductivity_w_per_mk",
            mem.thermal_conductivity_w_per_mk,
        )?;

        let t = &self.temperature_system;
        positive("temperature_system.ambient_temperature_k", t.ambient_temperature_k)?;
        positive("temperature_system.initial_temperature_k", t.initial_temperature_k)?;
        non_negative(
            "temperature_system.ambient_heat_transfer_w_per_m2k",
            t.ambient_heat_transfer_w_per_m2k,
        )?;
        non_negative("temperature_system.end_plate_heat_w", t.end_plate_heat_w)?;
        let omega = self.membrane_params().resistance(t.initial_temperature_k);
        if omega <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "membrane.resistance_slope_ohm_m2_per_k".to_string(),
                value: mem.resistance_slope_ohm_m2_per_k,
                reason: format!("resistance is {omega} Ω m² at the initial temperature"),
            });
        }

        self.validate_half_cell(Electrode::Cathode)?;
        self.validate_half_cell(Electrode::Anode)?;
        self.validate_manifold("cathode_manifold", &self.cathode_manifold)?;
        self.validate_manifold("anode_manifold", &self.anode_manifold)?;
        self.validate_manifold("coolant_manifold", &self.coolant_manifold)?;

        let cool = &self.coolant;
        cool.properties.validate().map_err(|e| ConfigError::InvalidValue {
            field: "coolant.properties".to_string(),
            value: f64::NAN,
            reason: e.to_string(),
        })?;
        non_negative("coolant.mass_flow_kg_per_s", cool.mass_flow_kg_per_s)?;
        positive("coolant.inlet_temperature_k", cool.inlet_temperature_k)?;
        direction("coolant.flow_direction", cool.flow_direction)?;
        positive("coolant.channel_length_m", cool.channel_length_m)?;
        positive("coolant.channel_width_m", cool.channel_width_m)?;
        positive("coolant.channel_height_m", cool.channel_height_m)?;
        non_negative("coolant.bend_loss_coefficient", cool.bend_loss_coefficient)?;
        non_negative(
            "coolant.heat_transfer_coefficient_w_per_m2k",
            cool.heat_transfer_coefficient_w_per_m2k,
        )?;

        let coolant_flows = cool.mass_flow_kg_per_s > 0.0
            && cool.heat_transfer_coefficient_w_per_m2k > 0.0
            && cool.channel_count > 0;
        // A single cell only has the end-plate channels.
        if coolant_flows && s.cell_count == 1 && !cool.end_plate_cooling {
            return Err(ConfigError::UncooledCoolant);
        }
        let coolant_present = coolant_flows && (cool.end_plate_cooling || s.cell_count > 1);
        if t.ambient_heat_transfer_w_per_m2k <= 0.0 && !coolant_present {
            return Err(ConfigError::Ungrounded);
        }
        Ok(())
    }

    fn half_cell_def(&self, electrode: Electrode) -> &HalfCellDef {
        match electrode {
            Electrode::Cathode => &self.cathode,
            Electrode::Anode => &self.anode,
        }
    }

    fn manifold_def(&self, electrode: Electrode) -> &ManifoldDef {
        match electrode {
            Electrode::Cathode => &self.cathode_manifold,
            Electrode::Anode => &self.anode_manifold,
        }
    }

    fn validate_half_cell(&self, electrode: Electrode) -> Result<(), ConfigError> {
        let name = electrode.name();
        let h = self.half_cell_def(electrode);
        let field = |f: &str| format!("{name}.{f}");

        positive(&field("channel.length_m"), h.channel.length_m)?;
        positive(&field("channel.width_m"), h.channel.width_m)?;
        positive(&field("channel.height_m"), h.channel.height_m)?;
        non_negative(
            &field("channel.bend_loss_coefficient"),
            h.channel.bend_loss_coefficient,
        )?;
        at_least_one(&field("channel_count"), h.channel_count)?;
        direction(&field("flow_direction"), h.flow_direction)?;
        if !(h.stoichiometry.is_finite() && h.stoichiometry > 1.0) {
            return Err(ConfigError::InvalidValue {
                field: field("stoichiometry"),
                value: h.stoichiometry,
                reason: "must exceed 1".to_string(),
            });
        }
        non_negative(&field("inert_ratio"), h.inert_ratio)?;
        positive(&field("inlet_temperature_k"), h.inlet_temperature_k)?;

        let e = &h.electrode;
        positive(&field("electrode.tafel_slope_v"), e.tafel_slope_v)?;
        positive(
            &field("electrode.exchange_current_density_a_per_m3"),
            e.exchange_current_density_a_per_m3,
        )?;
        positive(
            &field("electrode.cl_proton_conductivity_s_per_m"),
            e.cl_proton_conductivity_s_per_m,
        )?;
        positive(&field("electrode.cl_diffusivity_m2_per_s"), e.cl_diffusivity_m2_per_s)?;
        positive(&field("electrode.gdl_diffusivity_m2_per_s"), e.gdl_diffusivity_m2_per_s)?;
        positive(&field("electrode.cl_thickness_m"), e.cl_thickness_m)?;
        positive(&field("electrode.gdl_thickness_m"), e.gdl_thickness_m)?;

        let cell_area = self.cell.width_m * self.cell.length_m;
        let channel_area = h.channel.length_m * h.channel.width_m * h.channel_count as f64;
        if channel_area > cell_area {
            return Err(ConfigError::NegativeRibWidth {
                electrode: name.to_string(),
                channel_area,
                cell_area,
            });
        }

        if !(0.0..=1.0).contains(&h.inlet_humidity) {
            return Err(ConfigError::InvalidValue {
                field: field("inlet_humidity"),
                value: h.inlet_humidity,
                reason: "must lie in [0, 1]".to_string(),
            });
        }
        if h.inlet_humidity > 0.0 {
            let p_sat = saturation_pressure(h.inlet_temperature_k).map_err(|err| {
                ConfigError::InvalidValue {
                    field: field("inlet_temperature_k"),
                    value: h.inlet_temperature_k,
                    reason: err.to_string(),
                }
            })?;
            let vapour_pressure = h.inlet_humidity * p_sat;
            let inlet_pressure = self.manifold_def(electrode).outlet_pressure_pa;
            if vapour_pressure >= inlet_pressure {
                return Err(ConfigError::InletHumidity {
                    electrode: name.to_string(),
                    vapour_pressure,
                    inlet_pressure,
                });
            }
        }
        Ok(())
    }

    fn validate_manifold(&self, name: &str, m: &ManifoldDef) -> Result<(), ConfigError> {
        let sides: &[(&str, f64)] = match m.shape {
            HeaderShape::Circular => &[
                ("inlet_diameter_m", m.inlet_diameter_m),
                ("outlet_diameter_m", m.outlet_diameter_m),
            ],
            HeaderShape::Rectangular => &[
                ("inlet_width_m", m.inlet_width_m),
                ("inlet_height_m", m.inlet_height_m),
                ("outlet_width_m", m.outlet_width_m),
                ("outlet_height_m", m.outlet_height_m),
            ],
        };
        for (field, value) in sides {
            positive(&format!("{name}.{field}"), *value)?;
        }
        positive(&format!("{name}.segment_length_m"), m.segment_length_m)?;
        non_negative(
            &format!("{name}.junction_loss_coefficient"),
            m.junction_loss_coefficient,
        )?;
        positive(&format!("{name}.outlet_pressure_pa"), m.outlet_pressure_pa)
    }

    fn loss_flags(&self) -> LossFlags {
        LossFlags {
            activation: self.loss_model.activation,
            cl_diffusion: self.loss_model.cl_diffusion,
            gdl_diffusion: self.loss_model.gdl_diffusion,
        }
    }

    pub fn membrane_params(&self) -> MembraneParams {
        MembraneParams {
            thickness: self.membrane.thickness_m,
            resistance_base: self.membrane.resistance_base_ohm_m2,
            resistance_slope: self.membrane.resistance_slope_ohm_m2_per_k,
            thermal_conductivity: self.membrane.thermal_conductivity_w_per_mk,
            calc_loss: self.loss_model.membrane,
        }
    }

    pub fn half_cell_params(&self, electrode: Electrode) -> HalfCellParams {
        let h = self.half_cell_def(electrode);
        let e = &h.electrode;
        HalfCellParams {
            electrode,
            channel: ChannelGeometry {
                length: m(h.channel.length_m),
                width: m(h.channel.width_m),
                height: m(h.channel.height_m),
                bends: h.channel.bends,
                bend_loss_coefficient: h.channel.bend_loss_coefficient,
            },
            channel_count: h.channel_count,
            flow_direction: h.flow_direction,
            stoichiometry: h.stoichiometry,
            inert_ratio: h.inert_ratio,
            inlet_humidity: h.inlet_humidity,
            inlet_temperature: h.inlet_temperature_k,
            outlet_pressure: self.manifold_def(electrode).outlet_pressure_pa,
            electrode_params: ElectrodeParams {
                tafel_slope: e.tafel_slope_v,
                exchange_current_density: e.exchange_current_density_a_per_m3,
                cl_proton_conductivity: e.cl_proton_conductivity_s_per_m,
                cl_diffusivity: e.cl_diffusivity_m2_per_s,
                gdl_diffusivity: e.gdl_diffusivity_m2_per_s,
                cl_thickness: e.cl_thickness_m,
                gdl_thickness: e.gdl_thickness_m,
            },
            loss_flags: self.loss_flags(),
        }
    }

    pub fn cell_params(&self) -> CellParams {
        let c = &self.cell;
        let conductivity = |k: ConductivityDef| LayerConductivity {
            through_plane: k.through_plane,
            in_plane: k.in_plane,
        };
        CellParams {
            width: c.width_m,
            length: c.length_m,
            open_circuit_voltage: c.open_circuit_voltage_v,
            plate_thickness: c.plate_thickness_m,
            plate_electrical_conductivity: c.plate_electrical_conductivity_s_per_m,
            plate_conductivity: conductivity(c.plate_conductivity_w_per_mk),
            gde_conductivity: conductivity(c.gde_conductivity_w_per_mk),
            membrane: self.membrane_params(),
            anode: self.half_cell_params(Electrode::Anode),
            cathode: self.half_cell_params(Electrode::Cathode),
        }
    }

    pub fn manifold(&self, electrode: Electrode) -> &ManifoldDef {
        self.manifold_def(electrode)
    }

    /// Coolant channels in the stack: one per cell on its anode side, plus
    /// one past the last cathode plate with end-plate cooling.
    pub fn coolant_channel_count(&self) -> usize {
        if self.coolant.end_plate_cooling {
            self.stack.cell_count + 1
        } else {
            self.stack.cell_count
        }
    }
}
