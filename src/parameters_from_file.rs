//! Supports reading planner parameters and named configurations from YAML (optional)

use std::collections::HashMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_saphyr::Options;

use crate::kinematic_traits::Configuration;
use crate::parameter_error::ParameterError;
use crate::parameters::{CrrtPlannerParameters, TsrPlanningParameters};

const CRRT_SECTION: &str = "crrt_planner_parameters";
const TSR_SECTION: &str = "tsr_planning_parameters";

/// Both parameter sections may live in the same file, other top level keys are ignored.
#[derive(Deserialize)]
struct Root {
    #[serde(default)]
    crrt_planner_parameters: Option<CrrtPlannerParameters>,
    #[serde(default)]
    tsr_planning_parameters: Option<TsrPlanningParameters>,
}

impl CrrtPlannerParameters {
    /// Read the CRRT-Connect parameters from YAML file like this:
    /// ```yaml
    /// crrt_planner_parameters:
    ///   max_num_trials: 5
    ///   max_extension_distance: 0.5
    ///   max_distance_btw_projections: 0.1
    ///   min_step_size: 0.001
    ///   min_tree_connection_distance: 0.1
    ///   projection_tolerance: 0.0001
    ///   projection_max_iteration: 20
    ///   collision_resolution: 0.1
    ///   goal_bias: 0.05
    ///   goal_sample_interval: 20
    ///   max_iterations: 5000
    /// ```
    /// Fields that are not present keep their default values. `max_extension_distance`
    /// may be `.inf`.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let root: Root = parse(contents)?;
        let parameters = root
            .crrt_planner_parameters
            .ok_or_else(|| ParameterError::MissingField(CRRT_SECTION.to_string()))?;
        parameters.validate().map_err(|e| ParameterError::InvalidValue {
            field: CRRT_SECTION.to_string(),
            message: e.to_string(),
        })?;
        Ok(parameters)
    }
}

impl TsrPlanningParameters {
    /// Read the TSR planning parameters from YAML file (section `tsr_planning_parameters`,
    /// fields as in [`TsrPlanningParameters::to_yaml`]). Missing fields keep their defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let root: Root = parse(contents)?;
        let parameters = root
            .tsr_planning_parameters
            .ok_or_else(|| ParameterError::MissingField(TSR_SECTION.to_string()))?;
        parameters.validate().map_err(|e| ParameterError::InvalidValue {
            field: TSR_SECTION.to_string(),
            message: e.to_string(),
        })?;
        Ok(parameters)
    }
}

/// Parses a mapping of configuration names to joint values, like
/// ```yaml
/// home: [0.0, 0.0, 0.0]
/// ready: [deg(30), deg(-60), 0.5]
/// ```
/// Joint values are radians, or degrees if written as `deg(angle)` (serde_saphyr angle
/// conversions). All configurations must have the same number of joints.
pub fn named_configurations_from_yaml_str(contents: &str) -> Result<HashMap<String, Configuration>, ParameterError> {
    let named: HashMap<String, Vec<f64>> = parse(contents)?;
    let mut dof: Option<usize> = None;
    let mut configurations = HashMap::with_capacity(named.len());
    for (name, values) in named {
        match dof {
            Some(expected) if expected != values.len() => {
                return Err(ParameterError::InvalidLength { expected, found: values.len() });
            }
            _ => dof = Some(values.len()),
        }
        configurations.insert(name, Configuration::from_vec(values));
    }
    Ok(configurations)
}

pub fn named_configurations_from_yaml_file<P: AsRef<Path>>(
    path: P,
) -> Result<HashMap<String, Configuration>, ParameterError> {
    let contents = std::fs::read_to_string(path)?;
    named_configurations_from_yaml_str(&contents)
}

fn parse<T: DeserializeOwned>(contents: &str) -> Result<T, ParameterError> {
    serde_saphyr::from_str_with_options(
        contents,
        Options { angle_conversions: true, ..Default::default() },
    ).map_err(|e| ParameterError::ParseError(format!("{}", e)))
}
