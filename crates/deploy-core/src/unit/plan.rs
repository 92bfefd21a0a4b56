//! Plan de migración validado.
//!
//! Invariantes garantizadas al construir:
//! - al menos una unidad;
//! - `sequence` únicos;
//! - ninguna unidad vacía ni con nombres de artifact en blanco;
//! - unidades ordenadas ascendentemente por `sequence`.

use serde_json::json;

use super::MigrationUnit;
use crate::errors::DeployError;
use crate::hashing::hash_value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    units: Vec<MigrationUnit>,
    plan_hash: String,
}

impl MigrationPlan {
    pub fn new(mut units: Vec<MigrationUnit>) -> Result<Self, DeployError> {
        if units.is_empty() {
            return Err(DeployError::InvalidPlan("plan has no units".into()));
        }
        units.sort_by_key(|u| u.sequence);
        for pair in units.windows(2) {
            if pair[0].sequence == pair[1].sequence {
                return Err(DeployError::InvalidPlan(format!("duplicate unit sequence {}", pair[0].sequence)));
            }
        }
        for unit in &units {
            if unit.is_empty() {
                return Err(DeployError::InvalidPlan(format!("unit {} has no artifacts", unit.sequence)));
            }
            if unit.artifacts.iter().any(|a| a.trim().is_empty()) {
                return Err(DeployError::InvalidPlan(format!("unit {} has a blank artifact name", unit.sequence)));
            }
        }
        let plan_hash = compute_plan_hash(&units);
        Ok(Self { units, plan_hash })
    }

    pub fn units(&self) -> &[MigrationUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn plan_hash(&self) -> &str {
        &self.plan_hash
    }

    pub fn unit(&self, sequence: u32) -> Option<&MigrationUnit> {
        self.units.iter().find(|u| u.sequence == sequence)
    }

    pub fn position(&self, sequence: u32) -> Option<usize> {
        self.units.iter().position(|u| u.sequence == sequence)
    }

    /// Subplan con las unidades cuyo `sequence` cae en `[from, to]` (ambos opcionales).
    pub fn range(&self, from: Option<u32>, to: Option<u32>) -> Result<Self, DeployError> {
        let selected: Vec<MigrationUnit> = self.units
                                               .iter()
                                               .filter(|u| from.map_or(true, |f| u.sequence >= f))
                                               .filter(|u| to.map_or(true, |t| u.sequence <= t))
                                               .cloned()
                                               .collect();
        if selected.is_empty() {
            return Err(DeployError::InvalidPlan(format!("no units in range {from:?}..={to:?}")));
        }
        Self::new(selected)
    }

    /// Todos los nombres de artifact del plan, en orden de despliegue.
    pub fn artifact_names(&self) -> impl Iterator<Item = &str> {
        self.units.iter().flat_map(|u| u.artifacts.iter().map(String::as_str))
    }
}

fn compute_plan_hash(units: &[MigrationUnit]) -> String {
    let shape: Vec<serde_json::Value> = units.iter()
                                             .map(|u| json!({ "sequence": u.sequence, "artifacts": u.artifacts }))
                                             .collect();
    hash_value(&json!(shape))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(seq: u32, names: &[&str]) -> MigrationUnit {
        MigrationUnit::new(seq, format!("unit_{seq}"), names.iter().copied())
    }

    #[test]
    fn units_are_sorted_by_sequence() {
        let plan = MigrationPlan::new(vec![unit(3, &["C"]), unit(2, &["A", "B"])]).unwrap();
        let seqs: Vec<u32> = plan.units().iter().map(|u| u.sequence).collect();
        assert_eq!(seqs, vec![2, 3]);
        assert_eq!(plan.artifact_names().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    #[test]
    fn duplicate_and_empty_units_are_rejected() {
        assert!(matches!(MigrationPlan::new(vec![unit(2, &["A"]), unit(2, &["B"])]),
                         Err(DeployError::InvalidPlan(_))));
        assert!(matches!(MigrationPlan::new(vec![unit(2, &[])]), Err(DeployError::InvalidPlan(_))));
        assert!(matches!(MigrationPlan::new(vec![unit(2, &[" "])]), Err(DeployError::InvalidPlan(_))));
        assert!(matches!(MigrationPlan::new(vec![]), Err(DeployError::InvalidPlan(_))));
    }

    #[test]
    fn plan_hash_depends_on_order_not_labels() {
        let a = MigrationPlan::new(vec![unit(2, &["A", "B"])]).unwrap();
        let b = MigrationPlan::new(vec![MigrationUnit::new(2, "other", ["A", "B"])]).unwrap();
        let c = MigrationPlan::new(vec![unit(2, &["B", "A"])]).unwrap();
        assert_eq!(a.plan_hash(), b.plan_hash());
        assert_ne!(a.plan_hash(), c.plan_hash());
    }

    #[test]
    fn range_selects_inclusive_bounds() {
        let plan = MigrationPlan::new(vec![unit(2, &["A"]), unit(3, &["B"]), unit(4, &["C"])]).unwrap();
        let sub = plan.range(Some(3), None).unwrap();
        assert_eq!(sub.units().iter().map(|u| u.sequence).collect::<Vec<_>>(), vec![3, 4]);
        let sub = plan.range(None, Some(3)).unwrap();
        assert_eq!(sub.len(), 2);
        assert!(plan.range(Some(9), None).is_err());
    }
}
