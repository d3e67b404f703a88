//! Cartesian composition of discretized parameter axes.
//!
//! The grid is never persisted, only a cursor into it, so its order is part of
//! the contract: the first declared parameter is the slowest-varying axis and
//! the last one the fastest. Point `k` is the mixed-radix decomposition of `k`
//! with the per-parameter resolutions as radixes.

use std::collections::BTreeMap;
use std::ops::Range;

use gw_types::{
    config_error, GridPoint, GwError, GwResult, Parameter, ParameterConfig, ParameterDomain,
    ParameterType,
};
use serde::{Deserialize, Serialize};

use crate::discretize::{check_domain, sample};

/// Requested resolution for every parameter of a study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Resolution of parameters without an override. Always at least 1.
    pub default_resolution: usize,
    /// Per-parameter overrides, kept as persisted; validated on use.
    pub overrides: BTreeMap<String, i64>,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            default_resolution: 1,
            overrides: BTreeMap::new(),
        }
    }
}

impl GridSpec {
    pub fn new(default_resolution: usize) -> GwResult<Self> {
        if default_resolution == 0 {
            return Err(config_error!("default resolution must be at least 1"));
        }
        Ok(Self {
            default_resolution,
            overrides: BTreeMap::new(),
        })
    }

    pub fn with_override(mut self, name: impl Into<String>, resolution: i64) -> Self {
        self.overrides.insert(name.into(), resolution);
        self
    }

    /// Resolution for the parameter called `name`.
    pub fn resolution_for(&self, name: &str) -> GwResult<usize> {
        match self.overrides.get(name) {
            None => Ok(self.default_resolution),
            Some(&resolution) if resolution >= 1 => usize::try_from(resolution)
                .map_err(|_| config_error!("parameter {}: resolution {} is too large", name, resolution)),
            Some(&resolution) => Err(config_error!(
                "parameter {}: resolution must be at least 1, got {}",
                name,
                resolution
            )),
        }
    }

    /// Resolutions for `parameters`, in declaration order.
    pub fn resolutions(&self, parameters: &[ParameterConfig]) -> GwResult<Vec<usize>> {
        parameters
            .iter()
            .map(|pc| self.resolution_for(&pc.name))
            .collect()
    }
}

/// Upper bound on the number of points in one grid.
pub const MAX_GRID_POINTS: usize = 1 << 24;

/// One dimension of the grid: a parameter's domain sampled at a resolution.
///
/// Values are computed from their digit on demand, so a high resolution costs
/// nothing until points are read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    name: String,
    domain: ParameterDomain,
    resolution: usize,
}

impl Axis {
    pub fn new(name: impl Into<String>, domain: ParameterDomain, resolution: usize) -> GwResult<Self> {
        let name = name.into();
        check_domain(&domain, resolution).map_err(|e| match e {
            GwError::Config(msg) => config_error!("parameter {}: {}", name, msg),
            other => other,
        })?;
        Ok(Self {
            name,
            domain,
            resolution,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_type(&self) -> ParameterType {
        self.domain.parameter_type()
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Rendered value at `digit`, which must be below the resolution.
    pub fn value(&self, digit: usize) -> String {
        sample(&self.domain, self.resolution, digit)
    }

    fn parameter(&self, digit: usize) -> Parameter {
        Parameter {
            name: self.name.clone(),
            parameter_type: self.parameter_type(),
            value: self.value(digit),
        }
    }
}

/// The ordered cartesian product of a set of axes.
///
/// Only the axes are stored; points are derived on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    axes: Vec<Axis>,
    /// `strides[j]` is the product of the resolutions after axis `j`.
    strides: Vec<usize>,
    len: usize,
}

impl Grid {
    /// Compose `axes`, failing when the product of their resolutions
    /// overflows or exceeds [`MAX_GRID_POINTS`].
    pub fn new(axes: Vec<Axis>) -> GwResult<Self> {
        if axes.is_empty() {
            return Err(config_error!("grid needs at least one parameter"));
        }

        let mut strides = vec![0; axes.len()];
        let mut len: usize = 1;
        for (j, axis) in axes.iter().enumerate().rev() {
            strides[j] = len;
            len = len.checked_mul(axis.resolution).ok_or_else(|| {
                config_error!("grid size overflows at parameter {}", axis.name)
            })?;
        }
        if len > MAX_GRID_POINTS {
            return Err(config_error!(
                "grid of {} points exceeds the limit of {}",
                len,
                MAX_GRID_POINTS
            ));
        }

        Ok(Self { axes, strides, len })
    }

    /// Sample every parameter at its resolution and compose the grid.
    pub fn build(parameters: &[ParameterConfig], resolutions: &[usize]) -> GwResult<Self> {
        if parameters.len() != resolutions.len() {
            return Err(config_error!(
                "{} parameters but {} resolutions",
                parameters.len(),
                resolutions.len()
            ));
        }

        let axes = parameters
            .iter()
            .zip(resolutions)
            .map(|(pc, &resolution)| -> GwResult<Axis> {
                Axis::new(pc.name.clone(), pc.domain()?, resolution)
            })
            .collect::<GwResult<Vec<_>>>()?;

        Self::new(axes)
    }

    pub fn from_spec(parameters: &[ParameterConfig], spec: &GridSpec) -> GwResult<Self> {
        Self::build(parameters, &spec.resolutions(parameters)?)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn resolutions(&self) -> Vec<usize> {
        self.axes.iter().map(Axis::resolution).collect()
    }

    /// The point at flat position `index`, or `None` past the end.
    pub fn point(&self, index: usize) -> Option<GridPoint> {
        if index >= self.len {
            return None;
        }
        let parameters = self
            .axes
            .iter()
            .zip(&self.strides)
            .map(|(axis, stride)| axis.parameter((index / stride) % axis.resolution))
            .collect();
        Some(GridPoint { index, parameters })
    }

    /// Points in `range`, clamped to the grid.
    pub fn points(&self, range: Range<usize>) -> impl Iterator<Item = GridPoint> + '_ {
        let end = range.end.min(self.len);
        let start = range.start.min(end);
        (start..end).filter_map(move |index| self.point(index))
    }

    /// Build every point by recursive block partitioning.
    ///
    /// Each axis splits its block into `resolution` equal runs, assigns value
    /// `i` to run `i` and recurses into the run with the next axis. Produces
    /// the same sequence as [`Grid::point`]; allocates the whole grid.
    pub fn materialize(&self) -> Vec<GridPoint> {
        let mut rows: Vec<Vec<Parameter>> = (0..self.len)
            .map(|_| Vec::with_capacity(self.axes.len()))
            .collect();
        self.fill(0, &mut rows);
        rows.into_iter()
            .enumerate()
            .map(|(index, parameters)| GridPoint { index, parameters })
            .collect()
    }

    fn fill(&self, dim: usize, block: &mut [Vec<Parameter>]) {
        let axis = &self.axes[dim];
        let width = block.len() / axis.resolution;
        for (digit, run) in block.chunks_mut(width).enumerate() {
            let parameter = axis.parameter(digit);
            for row in run.iter_mut() {
                row.push(parameter.clone());
            }
            if dim + 1 < self.axes.len() {
                self.fill(dim + 1, run);
            }
        }
    }
}
