use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use shared::{DamageClassName, IntoEnumIterator};

use super::mask::{BACKGROUND, Bgr};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("class {0} is listed more than once")]
    DuplicateClass(DamageClassName),
    #[error("class {0} is missing from the class table")]
    MissingClass(DamageClassName),
    #[error("classes {0} and {1} share the color {2:?}")]
    DuplicateColor(DamageClassName, DamageClassName, Bgr),
    #[error("class {0} uses the background color")]
    BackgroundColor(DamageClassName),
    #[error("class {0} has an invalid cost per pixel: {1}")]
    InvalidCost(DamageClassName, f64),
    #[error("failed to read class table: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse class table: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageClass {
    pub name: DamageClassName,
    pub color: Bgr,
    pub cost_per_pixel: f64,
}

#[derive(Debug, Deserialize)]
struct ClassTable {
    classes: Vec<DamageClass>,
}

/// Read-only table of damage classes, always iterated in [`DamageClassName`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRegistry {
    classes: Vec<DamageClass>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        let class = |name, color, cost_per_pixel| DamageClass {
            name,
            color,
            cost_per_pixel,
        };
        Self {
            classes: vec![
                class(DamageClassName::NoDamage, [0, 255, 0], 0.0),
                class(DamageClassName::MinorDamage, [0, 255, 255], 0.12),
                class(DamageClassName::MajorDamage, [0, 165, 255], 0.35),
                class(DamageClassName::Destroyed, [0, 0, 255], 0.75),
            ],
        }
    }
}

impl ClassRegistry {
    pub fn new(mut classes: Vec<DamageClass>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for class in &classes {
            if !seen.insert(class.name) {
                return Err(RegistryError::DuplicateClass(class.name));
            }
            if class.color == BACKGROUND {
                return Err(RegistryError::BackgroundColor(class.name));
            }
            if !class.cost_per_pixel.is_finite() || class.cost_per_pixel < 0.0 {
                return Err(RegistryError::InvalidCost(class.name, class.cost_per_pixel));
            }
        }
        if let Some(missing) = DamageClassName::iter().find(|name| !seen.contains(name)) {
            return Err(RegistryError::MissingClass(missing));
        }

        let order: Vec<DamageClassName> = DamageClassName::iter().collect();
        classes.sort_by_key(|c| order.iter().position(|name| *name == c.name));

        for (i, a) in classes.iter().enumerate() {
            if let Some(b) = classes[i + 1..].iter().find(|b| b.color == a.color) {
                return Err(RegistryError::DuplicateColor(a.name, b.name, a.color));
            }
        }

        Ok(Self { classes })
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, RegistryError> {
        let table: ClassTable = serde_yaml::from_str(source)?;
        Self::new(table.classes)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }

    pub fn classes(&self) -> &[DamageClass] {
        &self.classes
    }

    pub fn get(&self, name: DamageClassName) -> &DamageClass {
        // `new` guarantees every name is present
        &self.classes[DamageClassName::iter()
            .position(|n| n == name)
            .unwrap_or_default()]
    }

    pub fn class_of(&self, color: Bgr) -> Option<&DamageClass> {
        self.classes.iter().find(|c| c.color == color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_the_model_palette() {
        let registry = ClassRegistry::default();
        let names: Vec<_> = registry.classes().iter().map(|c| c.name).collect();
        assert_eq!(names, DamageClassName::iter().collect::<Vec<_>>());
        assert_eq!(registry.get(DamageClassName::MajorDamage).color, [0, 165, 255]);
        assert_eq!(registry.get(DamageClassName::Destroyed).cost_per_pixel, 0.75);
        // the default table must itself pass validation
        assert_eq!(ClassRegistry::new(registry.classes().to_vec()).unwrap(), registry);
    }

    #[test]
    fn yaml_table_is_reordered_into_registry_order() {
        let registry = ClassRegistry::from_yaml_str(
            r#"
classes:
  - { name: destroyed, color: [0, 0, 255], cost_per_pixel: 1.5 }
  - { name: no_damage, color: [0, 255, 0], cost_per_pixel: 0 }
  - { name: major_damage, color: [0, 165, 255], cost_per_pixel: 0.5 }
  - { name: minor_damage, color: [0, 255, 255], cost_per_pixel: 0.2 }
"#,
        )
        .unwrap();

        assert_eq!(registry.classes()[0].name, DamageClassName::NoDamage);
        assert_eq!(registry.classes()[3].cost_per_pixel, 1.5);
    }

    #[test]
    fn rejects_shared_colors() {
        let mut classes = ClassRegistry::default().classes().to_vec();
        classes[1].color = classes[2].color;
        assert!(matches!(
            ClassRegistry::new(classes),
            Err(RegistryError::DuplicateColor(
                DamageClassName::MinorDamage,
                DamageClassName::MajorDamage,
                _
            ))
        ));
    }

    #[test]
    fn rejects_black_negative_cost_and_missing_classes() {
        let mut classes = ClassRegistry::default().classes().to_vec();
        classes[0].color = BACKGROUND;
        assert!(matches!(
            ClassRegistry::new(classes),
            Err(RegistryError::BackgroundColor(DamageClassName::NoDamage))
        ));

        let mut classes = ClassRegistry::default().classes().to_vec();
        classes[2].cost_per_pixel = -0.1;
        assert!(matches!(
            ClassRegistry::new(classes),
            Err(RegistryError::InvalidCost(DamageClassName::MajorDamage, _))
        ));

        let mut classes = ClassRegistry::default().classes().to_vec();
        classes.pop();
        assert!(matches!(
            ClassRegistry::new(classes),
            Err(RegistryError::MissingClass(DamageClassName::Destroyed))
        ));
    }

    #[test]
    fn looks_up_classes_by_exact_color() {
        let registry = ClassRegistry::default();
        assert_eq!(
            registry.class_of([0, 255, 255]).map(|c| c.name),
            Some(DamageClassName::MinorDamage)
        );
        assert!(registry.class_of([1, 255, 255]).is_none());
    }
}
