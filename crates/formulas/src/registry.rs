use crate::catalog::{CATALOG, KpiDefinition};
use crate::declarations::{FormulaDecl, InputSource, declaration};
use crate::error::FormulaError;
use crate::evaluate::{CoordinateValues, Evaluation, evaluate};
use core_types::{Coordinate, KpiKey, KpiLevel};
use std::collections::{BTreeMap, BTreeSet};

/// A KPI together with its validated formula.
#[derive(Debug, Clone)]
pub struct RegisteredKpi {
    pub definition: KpiDefinition,
    pub formula: FormulaDecl,
}

/// The validated `{kpi_key -> {level, parent, formula}}` table.
///
/// Construction checks every declaration and the parent links between them, so
/// a registry that exists is internally consistent.
#[derive(Debug, Clone)]
pub struct FormulaRegistry {
    entries: BTreeMap<KpiKey, RegisteredKpi>,
}

impl FormulaRegistry {
    /// Every catalogued KPI with its standard formula.
    pub fn standard() -> Result<Self, FormulaError> {
        Self::build(CATALOG.iter().map(|d| (*d, declaration(d.key))))
    }

    /// Builds a registry from explicit parts, validating each one.
    pub fn build(
        parts: impl IntoIterator<Item = (KpiDefinition, FormulaDecl)>,
    ) -> Result<Self, FormulaError> {
        let mut entries = BTreeMap::new();
        for (definition, formula) in parts {
            validate_formula(&definition, &formula)?;
            let key = definition.key;
            if entries
                .insert(key, RegisteredKpi { definition, formula })
                .is_some()
            {
                return Err(malformed(key, "registered more than once"));
            }
        }

        let registry = Self { entries };
        registry.validate_hierarchy()?;
        tracing::debug!(kpis = registry.entries.len(), "Formula registry built.");
        Ok(registry)
    }

    fn validate_hierarchy(&self) -> Result<(), FormulaError> {
        for entry in self.entries.values() {
            let d = &entry.definition;
            match (d.level.parent_level(), d.parent) {
                (None, None) => {}
                (None, Some(_)) => return Err(malformed(d.key, "level-1 KPI declares a parent")),
                (Some(_), None) => {
                    return Err(malformed(d.key, "level-2/3 KPI has no parent"));
                }
                (Some(expected), Some(parent)) => {
                    let parent_entry = self.entries.get(&parent).ok_or_else(|| {
                        malformed(d.key, &format!("parent '{parent}' is not registered"))
                    })?;
                    if parent_entry.definition.level != expected {
                        return Err(malformed(
                            d.key,
                            &format!("parent '{parent}' is not one level up"),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Looks up a KPI. An unregistered key is a contract violation.
    pub fn get(&self, key: KpiKey) -> Result<&RegisteredKpi, FormulaError> {
        self.entries
            .get(&key)
            .ok_or(FormulaError::Unregistered(key))
    }

    /// Parses and looks up a KPI by its string key.
    pub fn get_by_name(&self, name: &str) -> Result<&RegisteredKpi, FormulaError> {
        let key: KpiKey = name.parse()?;
        self.get(key)
    }

    pub fn contains(&self, key: KpiKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredKpi> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = KpiKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Direct children of a KPI, in key order.
    pub fn children(&self, key: KpiKey) -> Vec<KpiKey> {
        self.entries
            .values()
            .filter(|e| e.definition.parent == Some(key))
            .map(|e| e.definition.key)
            .collect()
    }

    /// All KPIs down to `depth`, in display order: each parent directly
    /// followed by its children.
    pub fn tree_order(&self, depth: KpiLevel) -> Vec<KpiKey> {
        let mut ordered = Vec::new();
        let roots = self
            .entries
            .values()
            .filter(|e| e.definition.level == KpiLevel::One)
            .map(|e| e.definition.key);
        for root in roots {
            self.push_subtree(root, depth, &mut ordered);
        }
        ordered
    }

    fn push_subtree(&self, key: KpiKey, depth: KpiLevel, ordered: &mut Vec<KpiKey>) {
        let Some(entry) = self.entries.get(&key) else {
            return;
        };
        if entry.definition.level > depth {
            return;
        }
        ordered.push(key);
        for child in self.children(key) {
            self.push_subtree(child, depth, ordered);
        }
    }

    /// The de-duplicated set of coordinates needed to evaluate `keys`.
    pub fn required_coordinates(
        &self,
        keys: &[KpiKey],
    ) -> Result<BTreeSet<Coordinate>, FormulaError> {
        let mut coordinates = BTreeSet::new();
        for key in keys {
            coordinates.extend(self.get(*key)?.formula.coordinates().cloned());
        }
        Ok(coordinates)
    }

    /// Evaluates one KPI against already-fetched values.
    pub fn evaluate(
        &self,
        key: KpiKey,
        values: &CoordinateValues,
    ) -> Result<Evaluation, FormulaError> {
        Ok(evaluate(&self.get(key)?.formula, values))
    }
}

fn malformed(kpi: KpiKey, reason: &str) -> FormulaError {
    FormulaError::Malformed {
        kpi,
        reason: reason.to_string(),
    }
}

fn validate_formula(definition: &KpiDefinition, formula: &FormulaDecl) -> Result<(), FormulaError> {
    let key = definition.key;
    if formula.inputs.is_empty() {
        return Err(malformed(key, "declares no inputs"));
    }
    if formula.arity != formula.inputs.len() {
        return Err(malformed(
            key,
            &format!(
                "compute expects {} inputs but {} are declared",
                formula.arity,
                formula.inputs.len()
            ),
        ));
    }
    for input in &formula.inputs {
        if let InputSource::Sum(coordinates) = &input.source {
            if coordinates.is_empty() {
                return Err(malformed(key, &format!("sum '{}' has no lines", input.name)));
            }
        }
        if let Some(bad) = input.source.coordinates().iter().find(|c| !c.is_well_formed()) {
            return Err(malformed(key, &format!("coordinate '{bad}' is malformed")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::definition;
    use crate::declarations::Input;
    use core_types::CoreError;

    fn part(key: KpiKey) -> (KpiDefinition, FormulaDecl) {
        (*definition(key).unwrap(), declaration(key))
    }

    #[test]
    fn standard_registry_contains_every_kpi() {
        let registry = FormulaRegistry::standard().unwrap();
        assert_eq!(registry.len(), KpiKey::ALL.len());
        for key in KpiKey::ALL {
            assert!(registry.contains(key));
        }
    }

    #[test]
    fn every_level_one_kpi_has_a_precomputed_column() {
        let registry = FormulaRegistry::standard().unwrap();
        for entry in registry.iter().filter(|e| e.definition.level == KpiLevel::One) {
            assert!(
                !core_types::column_map::columns_for(entry.definition.key).is_empty(),
                "{}",
                entry.definition.key
            );
        }
    }

    #[test]
    fn unregistered_kpi_is_an_error() {
        let registry = FormulaRegistry::build([part(KpiKey::OperatingMargin)]).unwrap();
        assert_eq!(
            registry.get(KpiKey::TotalMargin).unwrap_err(),
            FormulaError::Unregistered(KpiKey::TotalMargin)
        );
        assert_eq!(
            registry.get_by_name("ebitda_margin").unwrap_err(),
            FormulaError::Core(CoreError::UnknownKpi("ebitda_margin".to_string()))
        );
    }

    #[test]
    fn child_without_registered_parent_is_malformed() {
        let err = FormulaRegistry::build([part(KpiKey::CostPerDischarge)]).unwrap_err();
        assert!(matches!(err, FormulaError::Malformed { kpi: KpiKey::CostPerDischarge, .. }));
    }

    #[test]
    fn level_one_with_parent_is_malformed() {
        let (mut d, f) = part(KpiKey::TotalMargin);
        d.parent = Some(KpiKey::OperatingMargin);
        let err = FormulaRegistry::build([part(KpiKey::OperatingMargin), (d, f)]).unwrap_err();
        assert!(matches!(err, FormulaError::Malformed { kpi: KpiKey::TotalMargin, .. }));
    }

    #[test]
    fn parent_two_levels_up_is_malformed() {
        let (mut d, f) = part(KpiKey::SalaryCostPerDischarge);
        d.parent = Some(KpiKey::OperatingMargin);
        let err = FormulaRegistry::build([part(KpiKey::OperatingMargin), (d, f)]).unwrap_err();
        assert!(matches!(
            err,
            FormulaError::Malformed { kpi: KpiKey::SalaryCostPerDischarge, .. }
        ));
    }

    #[test]
    fn malformed_declarations_are_rejected() {
        let (d, mut f) = part(KpiKey::OperatingMargin);
        f.inputs.clear();
        assert!(FormulaRegistry::build([(d, f)]).is_err());

        let (d, mut f) = part(KpiKey::OperatingMargin);
        f.arity = 3;
        assert!(FormulaRegistry::build([(d, f)]).is_err());

        let (d, mut f) = part(KpiKey::OperatingMargin);
        f.inputs[0] = Input {
            name: "broken",
            source: InputSource::Sum(vec![]),
        };
        assert!(FormulaRegistry::build([(d, f)]).is_err());

        let (d, mut f) = part(KpiKey::OperatingMargin);
        f.inputs[0] = Input {
            name: "broken",
            source: InputSource::Cell(Coordinate::new("G3", "3", "1")),
        };
        assert!(FormulaRegistry::build([(d, f)]).is_err());
    }

    #[test]
    fn duplicate_registration_is_malformed() {
        let err = FormulaRegistry::build([part(KpiKey::OperatingMargin), part(KpiKey::OperatingMargin)])
            .unwrap_err();
        assert!(matches!(err, FormulaError::Malformed { kpi: KpiKey::OperatingMargin, .. }));
    }

    #[test]
    fn tree_order_nests_children_under_parents() {
        let registry = FormulaRegistry::standard().unwrap();

        let level_one = registry.tree_order(KpiLevel::One);
        assert_eq!(
            level_one,
            vec![
                KpiKey::OperatingMargin,
                KpiKey::TotalMargin,
                KpiKey::DaysCashOnHand,
                KpiKey::CurrentRatio
            ]
        );

        let full = registry.tree_order(KpiLevel::Three);
        assert_eq!(full.len(), KpiKey::ALL.len());
        assert_eq!(
            &full[..6],
            &[
                KpiKey::OperatingMargin,
                KpiKey::RevenuePerDischarge,
                KpiKey::OutpatientRevenueShare,
                KpiKey::CostPerDischarge,
                KpiKey::SalaryCostPerDischarge,
                KpiKey::AverageLengthOfStay,
            ]
        );
    }

    #[test]
    fn shared_coordinates_are_requested_once() {
        let registry = FormulaRegistry::standard().unwrap();
        let coordinates = registry
            .required_coordinates(&[KpiKey::OperatingMargin, KpiKey::CostPerDischarge])
            .unwrap();
        // net revenue, operating expenses, discharges
        assert_eq!(coordinates.len(), 3);
    }
}
