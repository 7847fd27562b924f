use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{Display, EnumIter};

pub use strum::IntoEnumIterator;

/// The fixed set of damage classes a severity mask can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DamageClassName {
    NoDamage,
    MinorDamage,
    MajorDamage,
    Destroyed,
}

/// Role name -> location pairs, kept in the order they appeared in the JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleMap(Vec<(String, String)>);

impl RoleMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, role: impl Into<String>, location: impl Into<String>) {
        let role = role.into();
        let location = location.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == role) {
            Some(entry) => entry.1 = location,
            None => self.0.push((role, location)),
        }
    }

    pub fn get(&self, role: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == role)
            .map(|(_, location)| location.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(r, l)| (r.as_str(), l.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<R: Into<String>, L: Into<String>> FromIterator<(R, L)> for RoleMap {
    fn from_iter<T: IntoIterator<Item = (R, L)>>(iter: T) -> Self {
        let mut map = RoleMap::new();
        for (role, location) in iter {
            map.insert(role, location);
        }
        map
    }
}

impl Serialize for RoleMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (role, location) in &self.0 {
            map.serialize_entry(role, location)?;
        }
        map.end()
    }
}

struct RoleMapVisitor;

impl<'de> Visitor<'de> for RoleMapVisitor {
    type Value = RoleMap;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object mapping image role names to image locations")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = RoleMap::new();
        while let Some((role, location)) = access.next_entry::<String, String>()? {
            map.insert(role, location);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for RoleMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RoleMapVisitor)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub images: Vec<RoleMap>,
}

/// One value per damage class, serialized in registry order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassBreakdown<T> {
    pub no_damage: T,
    pub minor_damage: T,
    pub major_damage: T,
    pub destroyed: T,
}

impl<T> ClassBreakdown<T> {
    pub fn get(&self, class: DamageClassName) -> &T {
        match class {
            DamageClassName::NoDamage => &self.no_damage,
            DamageClassName::MinorDamage => &self.minor_damage,
            DamageClassName::MajorDamage => &self.major_damage,
            DamageClassName::Destroyed => &self.destroyed,
        }
    }

    pub fn get_mut(&mut self, class: DamageClassName) -> &mut T {
        match class {
            DamageClassName::NoDamage => &mut self.no_damage,
            DamageClassName::MinorDamage => &mut self.minor_damage,
            DamageClassName::MajorDamage => &mut self.major_damage,
            DamageClassName::Destroyed => &mut self.destroyed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterArea {
    pub class: DamageClassName,
    pub cluster_id: u32,
    pub area_px: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageSeverity {
    pub num_no_damage: usize,
    pub num_minor_damage: usize,
    pub num_major_damage: usize,
    pub num_destroyed: usize,
    pub areas: Vec<ClusterArea>,
    pub area_breakdown: ClassBreakdown<u64>,
    pub cost_breakdown: ClassBreakdown<f64>,
    pub total_estimated_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureStage {
    Acquisition,
    Inference,
    Publish,
    Timeout,
    ContractViolation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleFailure {
    pub group: usize,
    pub role: String,
    pub stage: FailureStage,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictResponse {
    pub mask_image_urls: Vec<RoleMap>,
    pub damage_severities: Vec<DamageSeverity>,
    #[serde(default)]
    pub failures: Vec<RoleFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub role: String,
    pub backend: String,
    pub model: String,
    pub is_loaded: bool,
}
