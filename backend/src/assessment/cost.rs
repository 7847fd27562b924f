use serde::Serialize;
use shared::{ClassBreakdown, ClusterArea, DamageClassName, DamageSeverity};

use super::labeling::LabelledRegion;
use super::registry::ClassRegistry;

/// Rounds a monetary amount to whole cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub class: DamageClassName,
    /// Unique within its class only.
    pub id: u32,
    pub area_px: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClassTotals {
    pub count: usize,
    pub area_px: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageReport {
    pub clusters: Vec<Cluster>,
    pub totals: ClassBreakdown<ClassTotals>,
    pub total_estimated_cost: f64,
}

/// Prices every region and rolls the costs up per class and overall.
///
/// Rounding happens at every level: each cluster cost is rounded to cents,
/// class totals sum the rounded cluster costs and are rounded again, and the
/// grand total sums the rounded class totals. Areas are unsigned, so a
/// negative area cannot reach this point.
pub fn aggregate(
    regions: &ClassBreakdown<Vec<LabelledRegion>>,
    registry: &ClassRegistry,
) -> DamageReport {
    let mut clusters = Vec::new();
    let mut totals = ClassBreakdown::<ClassTotals>::default();

    for class in registry.classes() {
        let class_regions = regions.get(class.name);
        let mut class_cost = 0.0;
        let mut class_area = 0;

        for region in class_regions {
            let cost = round_cents(region.area_px as f64 * class.cost_per_pixel);
            class_cost += cost;
            class_area += region.area_px;
            clusters.push(Cluster {
                class: class.name,
                id: region.id,
                area_px: region.area_px,
                cost,
            });
        }

        *totals.get_mut(class.name) = ClassTotals {
            count: class_regions.len(),
            area_px: class_area,
            cost: round_cents(class_cost),
        };
    }

    let total_estimated_cost = round_cents(
        registry
            .classes()
            .iter()
            .map(|class| totals.get(class.name).cost)
            .sum(),
    );

    DamageReport {
        clusters,
        totals,
        total_estimated_cost,
    }
}

impl DamageReport {
    pub fn count(&self, class: DamageClassName) -> usize {
        self.totals.get(class).count
    }
}

impl From<&DamageReport> for DamageSeverity {
    fn from(report: &DamageReport) -> Self {
        let totals = &report.totals;

        DamageSeverity {
            num_no_damage: totals.no_damage.count,
            num_minor_damage: totals.minor_damage.count,
            num_major_damage: totals.major_damage.count,
            num_destroyed: totals.destroyed.count,
            areas: report
                .clusters
                .iter()
                .map(|c| ClusterArea {
                    class: c.class,
                    cluster_id: c.id,
                    area_px: c.area_px,
                    cost: c.cost,
                })
                .collect(),
            area_breakdown: ClassBreakdown {
                no_damage: totals.no_damage.area_px,
                minor_damage: totals.minor_damage.area_px,
                major_damage: totals.major_damage.area_px,
                destroyed: totals.destroyed.area_px,
            },
            cost_breakdown: ClassBreakdown {
                no_damage: totals.no_damage.cost,
                minor_damage: totals.minor_damage.cost,
                major_damage: totals.major_damage.cost,
                destroyed: totals.destroyed.cost,
            },
            total_estimated_cost: report.total_estimated_cost,
        }
    }
}
