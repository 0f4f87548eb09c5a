//! Attribute resolution for source lines.
//!
//! Pure functions mapping a line's tag map plus a classification-keyed
//! defaults table to the attribute set a derived link carries. Nothing in
//! here is fallible in the error sense: malformed tag values degrade to
//! "attribute absent" and fall through the resolution chain, and a line
//! whose attributes cannot all be resolved simply does not qualify.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::source::TagMap;

pub const TAG_ID: &str = "id";
pub const TAG_HIGHWAY: &str = "highway";
pub const TAG_RAILWAY: &str = "railway";
pub const TAG_ONEWAY: &str = "oneway";
pub const TAG_JUNCTION: &str = "junction";
pub const TAG_ACCESS: &str = "access";
pub const TAG_LANES: &str = "lanes";
pub const TAG_MAXSPEED: &str = "maxspeed";
pub const TAG_FREESPEED: &str = "freespeed";
pub const TAG_CAPACITY: &str = "capacity";
pub const TAG_PERMLANES: &str = "permlanes";
pub const TAG_MODES: &str = "modes";
pub const TAG_LENGTH: &str = "length";

/// Classification of a line by its type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Road(String),
    Rail(String),
}

impl LineClass {
    pub fn value(&self) -> &str {
        match self {
            LineClass::Road(v) | LineClass::Rail(v) => v,
        }
    }
}

/// Per-classification default attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassDefaults {
    pub hierarchy: i32,
    pub lanes_per_direction: f64,
    /// Meters per second.
    pub freespeed: f64,
    /// Vehicles per hour per lane.
    pub lane_capacity: f64,
    pub oneway: bool,
}

impl ClassDefaults {
    pub fn new(
        hierarchy: i32,
        lanes_per_direction: f64,
        freespeed_kmh: f64,
        lane_capacity: f64,
        oneway: bool,
    ) -> Self {
        ClassDefaults {
            hierarchy,
            lanes_per_direction,
            freespeed: freespeed_kmh / 3.6,
            lane_capacity,
            oneway,
        }
    }
}

/// Defaults table keyed by line classification value.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefaultsTable(pub BTreeMap<String, ClassDefaults>);

impl DefaultsTable {
    pub fn get(&self, class: &str) -> Option<&ClassDefaults> {
        self.0.get(class)
    }

    pub fn insert(&mut self, class: impl Into<String>, defaults: ClassDefaults) {
        self.0.insert(class.into(), defaults);
    }

    /// The standard road hierarchy plus the rail classes.
    pub fn builtin() -> Self {
        let mut table = DefaultsTable::default();
        for (class, defaults) in [
            ("motorway", ClassDefaults::new(1, 2.0, 120.0, 2000.0, true)),
            ("motorway_link", ClassDefaults::new(2, 1.0, 80.0, 1500.0, true)),
            ("trunk", ClassDefaults::new(2, 1.0, 80.0, 2000.0, false)),
            ("trunk_link", ClassDefaults::new(2, 1.0, 50.0, 1500.0, false)),
            ("primary", ClassDefaults::new(3, 1.0, 80.0, 1500.0, false)),
            ("primary_link", ClassDefaults::new(3, 1.0, 60.0, 1500.0, false)),
            ("secondary", ClassDefaults::new(4, 1.0, 60.0, 1000.0, false)),
            ("tertiary", ClassDefaults::new(5, 1.0, 45.0, 600.0, false)),
            ("minor", ClassDefaults::new(6, 1.0, 45.0, 600.0, false)),
            ("unclassified", ClassDefaults::new(6, 1.0, 45.0, 600.0, false)),
            ("residential", ClassDefaults::new(6, 1.0, 30.0, 600.0, false)),
            ("living_street", ClassDefaults::new(6, 1.0, 15.0, 300.0, false)),
            ("rail", ClassDefaults::new(2, 1.0, 160.0, 9999.0, false)),
            ("light_rail", ClassDefaults::new(3, 1.0, 80.0, 4000.0, false)),
            ("subway", ClassDefaults::new(3, 1.0, 80.0, 4000.0, false)),
            ("tram", ClassDefaults::new(5, 1.0, 50.0, 2000.0, false)),
        ] {
            table.insert(class, defaults);
        }
        table
    }
}

/// Fully resolved link attributes for one qualifying line.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSpec {
    pub hierarchy: i32,
    pub forward: bool,
    pub backward: bool,
    /// Meters per second.
    pub freespeed: f64,
    /// Vehicles per hour, already multiplied out per direction.
    pub capacity: f64,
    pub lanes_per_direction: f64,
    pub modes: BTreeSet<String>,
    /// Explicit length tag in meters, prorated over segments by the engine.
    pub length_override: Option<f64>,
}

impl LinkSpec {
    /// A spec whose direction flags are both false yields no links and does
    /// not anchor node relevance.
    pub fn is_open(&self) -> bool {
        self.forward || self.backward
    }
}

pub fn classify(tags: &TagMap) -> Option<LineClass> {
    if let Some(v) = tags.get(TAG_HIGHWAY) {
        return Some(LineClass::Road(v.to_string()));
    }
    tags.get(TAG_RAILWAY).map(|v| LineClass::Rail(v.to_string()))
}

fn inferred_modes(class: &LineClass) -> BTreeSet<String> {
    let mode = match class {
        LineClass::Road(_) => "car",
        LineClass::Rail(v) => match v.as_str() {
            "tram" => "tram",
            "subway" => "subway",
            _ => "train",
        },
    };
    BTreeSet::from([mode.to_string()])
}

/// Speed tag to meters per second. Plain numbers are km/h; an `mph` suffix
/// is honored. Anything unparsable answers `None`.
fn parse_maxspeed(value: &str) -> Option<f64> {
    let value = value.trim();
    if let Some(stripped) = value.strip_suffix("mph") {
        return stripped.trim().parse::<f64>().ok().map(|v| v * 0.44704);
    }
    let stripped = value.strip_suffix("km/h").unwrap_or(value);
    stripped.trim().parse::<f64>().ok().map(|v| v / 3.6)
}

fn parse_modes(value: &str) -> Option<BTreeSet<String>> {
    let modes: BTreeSet<String> = value
        .split(';')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    if modes.is_empty() {
        None
    } else {
        Some(modes)
    }
}

/// Resolve a line's tags into a [`LinkSpec`], or `None` when the line does
/// not qualify.
///
/// Qualification requires capacity, freespeed, lanes per direction and modes
/// to all be resolvable. With no defaults entry for the classification the
/// line only qualifies on a full explicit tag set, and its hierarchy counts
/// as 0 so the cutoff never excludes it.
pub fn resolve_line(tags: &TagMap, defaults: &DefaultsTable, cutoff: i32) -> Option<LinkSpec> {
    let class = classify(tags);
    let class_defaults = class.as_ref().and_then(|c| defaults.get(c.value()));
    let hierarchy = class_defaults.map(|d| d.hierarchy).unwrap_or(0);

    let mut forward = true;
    let mut backward = !class_defaults.map(|d| d.oneway).unwrap_or(false);
    if tags.is(TAG_JUNCTION, "roundabout") {
        backward = false;
    }
    match tags.get(TAG_ONEWAY) {
        Some("yes") | Some("true") | Some("1") => {
            forward = true;
            backward = false;
        }
        Some("-1") => {
            forward = false;
            backward = true;
        }
        Some("no") => {
            forward = true;
            backward = true;
        }
        _ => {}
    }
    if tags.is(TAG_ACCESS, "no") {
        forward = false;
        backward = false;
    }
    if hierarchy > cutoff {
        forward = false;
        backward = false;
    }

    let directions = 1.0_f64.max(forward as u8 as f64 + backward as u8 as f64);
    let lanes_per_direction = tags
        .get_f64(TAG_PERMLANES)
        .or_else(|| tags.get_f64(TAG_LANES).map(|lanes| lanes / directions))
        .or(class_defaults.map(|d| d.lanes_per_direction))?;

    let capacity = tags
        .get_f64(TAG_CAPACITY)
        .or(class_defaults.map(|d| lanes_per_direction * d.lane_capacity))?;

    let freespeed = tags
        .get_f64(TAG_FREESPEED)
        .or_else(|| tags.get(TAG_MAXSPEED).and_then(parse_maxspeed))
        .or(class_defaults.map(|d| d.freespeed))?;

    let modes = tags
        .get(TAG_MODES)
        .and_then(parse_modes)
        .or_else(|| class.as_ref().map(inferred_modes))?;

    let length_override = tags.get_f64(TAG_LENGTH).filter(|len| *len > 0.0);

    Some(LinkSpec {
        hierarchy,
        forward,
        backward,
        freespeed,
        capacity,
        lanes_per_direction,
        modes,
        length_override,
    })
}
