use serde::{Deserialize, Serialize};

pub type Vec3 = [f64; 3];

pub const DEFAULT_POSITION: Vec3 = [0.0, 0.0, 0.0];
pub const DEFAULT_ROTATION: Vec3 = [0.0, 0.0, 0.0];
pub const DEFAULT_COLOR: &str = "#ffffff";
pub const DEFAULT_OPACITY: f64 = 1.0;

/// Scale can be uniform or per-axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scale {
    Uniform(f64),
    Vector(Vec3),
}

impl Scale {
    pub fn as_vec3(&self) -> Vec3 {
        match *self {
            Scale::Uniform(s) => [s, s, s],
            Scale::Vector(v) => v,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Scale::Uniform(s) => s.is_finite(),
            Scale::Vector(v) => is_finite_vec3(v),
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Vector([1.0, 1.0, 1.0])
    }
}

impl From<f64> for Scale {
    fn from(value: f64) -> Self {
        Scale::Uniform(value)
    }
}

impl From<Vec3> for Scale {
    fn from(value: Vec3) -> Self {
        Scale::Vector(value)
    }
}

/// Glow applied on top of the base color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emissive {
    pub color: String,
    pub intensity: f64,
}

impl Emissive {
    pub fn new(color: impl Into<String>, intensity: f64) -> Self {
        Self {
            color: color.into(),
            intensity,
        }
    }
}

pub fn is_finite_vec3(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Resolved attributes of one emitted object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualProperties {
    pub position: Vec3,
    pub scale: Scale,
    pub rotation: Vec3,
    pub color: String,
    pub opacity: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub emissive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub emissive_intensity: Option<f64>,
}

impl Default for VisualProperties {
    fn default() -> Self {
        Self {
            position: DEFAULT_POSITION,
            scale: Scale::default(),
            rotation: DEFAULT_ROTATION,
            color: DEFAULT_COLOR.to_string(),
            opacity: DEFAULT_OPACITY,
            emissive: None,
            emissive_intensity: None,
        }
    }
}

/// One renderable instance produced for the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualObject {
    #[serde(rename = "type")]
    pub object_type: String,
    pub properties: VisualProperties,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_note_id: Option<String>,
}
