//! Colormaps for report pages and multi-stop interpolation.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Background used for no-data pixels.
    pub const NO_DATA: Self = Self::new(40, 40, 40);
}

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy)]
struct ColorStop {
    t: f64,
    color: Rgb,
}

impl ColorStop {
    const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

/// Colormaps selectable through the `colormap` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Viridis,
    Jet,
    Rainbow,
    Terrain,
    Blues,
    Gray,
}

impl Colormap {
    pub const ALL: &[Colormap] = &[
        Self::Viridis,
        Self::Jet,
        Self::Rainbow,
        Self::Terrain,
        Self::Blues,
        Self::Gray,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Viridis => "viridis",
            Self::Jet => "jet",
            Self::Rainbow => "rainbow",
            Self::Terrain => "terrain",
            Self::Blues => "blues",
            Self::Gray => "gray",
        }
    }

    fn stops(&self) -> &'static [ColorStop] {
        match self {
            Self::Viridis => VIRIDIS_STOPS,
            Self::Jet => JET_STOPS,
            Self::Rainbow => RAINBOW_STOPS,
            Self::Terrain => TERRAIN_STOPS,
            Self::Blues => BLUES_STOPS,
            Self::Gray => GRAY_STOPS,
        }
    }

    /// Color at normalized position `t` ∈ [0, 1]; values outside are clamped.
    pub fn evaluate(&self, t: f64) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t };
        multi_stop(self.stops(), t)
    }
}

impl FromStr for Colormap {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viridis" => Ok(Self::Viridis),
            "jet" => Ok(Self::Jet),
            "rainbow" => Ok(Self::Rainbow),
            "terrain" => Ok(Self::Terrain),
            "blues" => Ok(Self::Blues),
            "gray" | "grey" | "greys" => Ok(Self::Gray),
            _ => Err(Error::InvalidArgument {
                arg: "colormap",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Colormap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

const VIRIDIS_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 68, 1, 84),
    ColorStop::new(0.25, 59, 82, 139),
    ColorStop::new(0.50, 33, 145, 140),
    ColorStop::new(0.75, 94, 201, 98),
    ColorStop::new(1.00, 253, 231, 37),
];

const JET_STOPS: &[ColorStop] = &[
    ColorStop::new(0.000, 0, 0, 128),
    ColorStop::new(0.125, 0, 0, 255),
    ColorStop::new(0.375, 0, 255, 255),
    ColorStop::new(0.625, 255, 255, 0),
    ColorStop::new(0.875, 255, 0, 0),
    ColorStop::new(1.000, 128, 0, 0),
];

const RAINBOW_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 128, 0, 255),
    ColorStop::new(0.25, 0, 180, 235),
    ColorStop::new(0.50, 128, 255, 128),
    ColorStop::new(0.75, 255, 180, 0),
    ColorStop::new(1.00, 255, 0, 0),
];

const TERRAIN_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 51, 51, 153),
    ColorStop::new(0.15, 0, 153, 255),
    ColorStop::new(0.25, 0, 204, 102),
    ColorStop::new(0.50, 255, 255, 153),
    ColorStop::new(0.75, 128, 92, 84),
    ColorStop::new(1.00, 255, 255, 255),
];

const BLUES_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 247, 251, 255),
    ColorStop::new(0.25, 198, 219, 239),
    ColorStop::new(0.50, 107, 174, 214),
    ColorStop::new(0.75, 33, 113, 181),
    ColorStop::new(1.00, 8, 48, 107),
];

const GRAY_STOPS: &[ColorStop] = &[ColorStop::new(0.0, 0, 0, 0), ColorStop::new(1.0, 255, 255, 255)];

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_color(c1: Rgb, c2: Rgb, t: f64) -> Rgb {
    Rgb::new(
        lerp(c1.r as f64, c2.r as f64, t).round() as u8,
        lerp(c1.g as f64, c2.g as f64, t).round() as u8,
        lerp(c1.b as f64, c2.b as f64, t).round() as u8,
    )
}

fn multi_stop(stops: &[ColorStop], t: f64) -> Rgb {
    if t <= 0.0 {
        return stops[0].color;
    }
    if t >= 1.0 {
        return stops[stops.len() - 1].color;
    }
    for i in 1..stops.len() {
        if t <= stops[i].t {
            let ratio = (t - stops[i - 1].t) / (stops[i].t - stops[i - 1].t);
            return lerp_color(stops[i - 1].color, stops[i].color, ratio);
        }
    }
    stops[stops.len() - 1].color
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_match_first_and_last_stop() {
        for cmap in Colormap::ALL {
            let stops = cmap.stops();
            assert_eq!(cmap.evaluate(-1.0), stops[0].color);
            assert_eq!(cmap.evaluate(2.0), stops[stops.len() - 1].color);
        }
    }

    #[test]
    fn gray_is_linear() {
        assert_eq!(Colormap::Gray.evaluate(0.5), Rgb::new(128, 128, 128));
    }

    #[test]
    fn parses_matplotlib_style_names() {
        assert_eq!("Viridis".parse::<Colormap>().unwrap(), Colormap::Viridis);
        assert_eq!(" jet ".parse::<Colormap>().unwrap(), Colormap::Jet);
        assert_eq!("Greys".parse::<Colormap>().unwrap(), Colormap::Gray);
        assert!("magma".parse::<Colormap>().is_err());
    }
}
