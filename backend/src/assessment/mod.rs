//! Post-processing of segmentation masks: class isolation, morphological
//! cleanup, connected-component labelling and cost aggregation.

pub mod cost;
pub mod isolate;
pub mod labeling;
pub mod mask;
pub mod morphology;
pub mod registry;

use shared::ClassBreakdown;

use cost::DamageReport;
use labeling::LabelledRegion;
use mask::{BACKGROUND, SegmentationMask};
use registry::ClassRegistry;

#[derive(Debug, Clone)]
pub struct Assessment {
    pub report: DamageReport,
    /// Cleaned class layers painted back in their class colors.
    pub processed_mask: SegmentationMask,
}

/// Runs isolate -> clean -> label for every class and prices the result.
pub fn assess_severity(mask: &SegmentationMask, registry: &ClassRegistry) -> Assessment {
    let mut processed_mask = SegmentationMask::filled(mask.width(), mask.height(), BACKGROUND);
    let mut regions = ClassBreakdown::<Vec<LabelledRegion>>::default();

    for class in registry.classes() {
        let layer = morphology::clean(&isolate::isolate(mask, class));
        processed_mask.paint(&layer, class.color);
        *regions.get_mut(class.name) = labeling::label(&layer);
    }

    Assessment {
        report: cost::aggregate(&regions, registry),
        processed_mask,
    }
}

/// Localisation masks carry no classes: clean the whole foreground at once,
/// keeping each surviving pixel's original color.
pub fn clean_localisation(mask: &SegmentationMask) -> SegmentationMask {
    mask.retain(&morphology::clean(&isolate::foreground(mask)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::DamageClassName;

    const DESTROYED: [u8; 3] = [0, 0, 255];
    const MINOR: [u8; 3] = [0, 255, 255];

    #[test]
    fn all_background_mask_reports_nothing() {
        let mask = SegmentationMask::filled(32, 32, BACKGROUND);
        let assessment = assess_severity(&mask, &ClassRegistry::default());

        let report = &assessment.report;
        assert!(report.clusters.is_empty());
        assert_eq!(report.totals, ClassBreakdown::default());
        assert_eq!(report.total_estimated_cost, 0.0);
        assert_eq!(assessment.processed_mask, mask);
    }

    #[test]
    fn ten_destroyed_pixels_cost_seven_fifty() {
        let mask = SegmentationMask::filled(5, 2, DESTROYED);
        let report = assess_severity(&mask, &ClassRegistry::default()).report;

        assert_eq!(report.count(DamageClassName::Destroyed), 1);
        assert_eq!(report.count(DamageClassName::NoDamage), 0);
        assert_eq!(report.clusters.len(), 1);
        assert_eq!(report.clusters[0].area_px, 10);
        assert_eq!(report.clusters[0].cost, 7.5);
        assert_eq!(report.total_estimated_cost, 7.5);
    }

    #[test]
    fn cluster_area_never_exceeds_raw_class_pixels() {
        let registry = ClassRegistry::default();
        let pixels = (0..40u32 * 30)
            .map(|i| match (i % 40 / 6 + i / 40 / 5) % 3 {
                0 => DESTROYED,
                1 => MINOR,
                _ => BACKGROUND,
            })
            .collect();
        let mask = SegmentationMask::new(40, 30, pixels).unwrap();
        let report = assess_severity(&mask, &registry).report;

        for class in registry.classes() {
            let raw = isolate::isolate(&mask, class).count();
            assert!(report.totals.get(class.name).area_px <= raw);
        }
    }

    #[test]
    fn processed_mask_drops_specks_and_unknown_colors() {
        let mut pixels = vec![BACKGROUND; 20 * 20];
        for y in 2..12 {
            for x in 2..12 {
                pixels[y * 20 + x] = DESTROYED;
            }
        }
        pixels[17 * 20 + 17] = MINOR;
        pixels[18 * 20 + 2] = [9, 9, 9];
        let mask = SegmentationMask::new(20, 20, pixels).unwrap();

        let assessment = assess_severity(&mask, &ClassRegistry::default());
        let processed = &assessment.processed_mask;
        assert_eq!(processed.pixel(6, 6), DESTROYED);
        assert_eq!(processed.pixel(17, 17), BACKGROUND);
        assert_eq!(processed.pixel(2, 18), BACKGROUND);
        assert_eq!(assessment.report.count(DamageClassName::MinorDamage), 0);
        assert_eq!(assessment.report.count(DamageClassName::Destroyed), 1);
    }

    #[test]
    fn localisation_keeps_building_colors() {
        let white = [255, 255, 255];
        let mut pixels = vec![BACKGROUND; 16 * 16];
        for y in 3..13 {
            for x in 3..13 {
                pixels[y * 16 + x] = white;
            }
        }
        pixels[0] = white;
        let mask = SegmentationMask::new(16, 16, pixels).unwrap();

        let cleaned = clean_localisation(&mask);
        assert_eq!(cleaned.pixel(8, 8), white);
        assert_eq!(cleaned.pixel(0, 0), BACKGROUND);
    }
}
