use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::geometry::TeapotOptions;

/// Subdivision levels offered by the control panel.
pub const TESSELLATION_LEVELS: [u32; 12] = [2, 3, 4, 5, 6, 8, 10, 15, 20, 30, 40, 50];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TessellationLevel(u32);

impl TessellationLevel {
    /// Panics if `level` is not one of [`TESSELLATION_LEVELS`].
    #[cfg(test)]
    pub fn new(level: u32) -> Self {
        assert!(
            TESSELLATION_LEVELS.contains(&level),
            "tessellation level {level} is not one of {TESSELLATION_LEVELS:?}"
        );
        Self(level)
    }

    pub fn try_new(level: u32) -> Result<Self> {
        if TESSELLATION_LEVELS.contains(&level) {
            Ok(Self(level))
        } else {
            Err(ViewerError::InvalidTessellation(level))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Self> {
        TESSELLATION_LEVELS.into_iter().map(Self)
    }
}

impl Default for TessellationLevel {
    fn default() -> Self {
        Self(15)
    }
}

impl fmt::Display for TessellationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadingMode {
    Wireframe,
    Flat,
    Smooth,
    #[default]
    Glossy,
    Textured,
    Reflective,
}

impl ShadingMode {
    pub const ALL: [ShadingMode; 6] = [
        ShadingMode::Wireframe,
        ShadingMode::Flat,
        ShadingMode::Smooth,
        ShadingMode::Glossy,
        ShadingMode::Textured,
        ShadingMode::Reflective,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShadingMode::Wireframe => "wireframe",
            ShadingMode::Flat => "flat",
            ShadingMode::Smooth => "smooth",
            ShadingMode::Glossy => "glossy",
            ShadingMode::Textured => "textured",
            ShadingMode::Reflective => "reflective",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ShadingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The user-adjustable state. Every field always holds a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterRecord {
    pub tessellation: TessellationLevel,
    pub bottom: bool,
    pub lid: bool,
    pub body: bool,
    pub fit_lid: bool,
    /// Newell's taller proportions rather than Blinn's.
    pub original_basis: bool,
    pub shading: ShadingMode,
}

impl Default for ParameterRecord {
    fn default() -> Self {
        Self {
            tessellation: TessellationLevel::default(),
            bottom: true,
            lid: true,
            body: true,
            fit_lid: false,
            original_basis: false,
            shading: ShadingMode::Glossy,
        }
    }
}

impl ParameterRecord {
    pub fn apply(&mut self, change: ParameterChanged) {
        match change {
            ParameterChanged::Tessellation(level) => self.tessellation = level,
            ParameterChanged::Bottom(on) => self.bottom = on,
            ParameterChanged::Lid(on) => self.lid = on,
            ParameterChanged::Body(on) => self.body = on,
            ParameterChanged::FitLid(on) => self.fit_lid = on,
            ParameterChanged::OriginalBasis(on) => self.original_basis = on,
            ParameterChanged::Shading(mode) => self.shading = mode,
        }
    }

    pub fn teapot_options(&self) -> TeapotOptions {
        TeapotOptions {
            segments: self.tessellation.get(),
            bottom: self.bottom,
            lid: self.lid,
            body: self.body,
            fit_lid: self.fit_lid,
            blinn: !self.original_basis,
        }
    }
}

/// One control-panel edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterChanged {
    Tessellation(TessellationLevel),
    Bottom(bool),
    Lid(bool),
    Body(bool),
    FitLid(bool),
    OriginalBasis(bool),
    Shading(ShadingMode),
}
