use crate::declarations::{FormulaDecl, InputSource};
use core_types::{Coordinate, KpiStatus};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Values fetched for one provider and fiscal year. Absent cells are not in the map.
pub type CoordinateValues = HashMap<Coordinate, Decimal>;

/// The outcome of evaluating a single formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub value: Option<Decimal>,
    pub status: KpiStatus,
}

impl Evaluation {
    fn missing(coordinate: &Coordinate) -> Self {
        Self {
            value: None,
            status: KpiStatus::MissingInput {
                coordinate: coordinate.clone(),
            },
        }
    }
}

/// Resolves one input. `Err` carries the coordinate to report as missing.
fn resolve<'a>(
    source: &'a InputSource,
    values: &CoordinateValues,
) -> Result<Decimal, &'a Coordinate> {
    match source {
        InputSource::Cell(coordinate) => values.get(coordinate).copied().ok_or(coordinate),
        InputSource::Sum(coordinates) => {
            let present: Vec<Decimal> = coordinates
                .iter()
                .filter_map(|c| values.get(c).copied())
                .collect();
            match (present.is_empty(), coordinates.first()) {
                (false, _) => Ok(present.into_iter().sum()),
                (true, Some(first)) => Err(first),
                // Rejected by registry validation; nothing sensible to report.
                (true, None) => Ok(Decimal::ZERO),
            }
        }
    }
}

/// Evaluates a formula against the fetched values.
///
/// The first absent input makes the result null with a `MissingInput` status.
/// A formula that cannot produce a value from complete inputs (zero
/// denominator) is null with `UndefinedRatio`. Results are never clamped.
pub fn evaluate(formula: &FormulaDecl, values: &CoordinateValues) -> Evaluation {
    let mut scalars = Vec::with_capacity(formula.inputs.len());
    for input in &formula.inputs {
        match resolve(&input.source, values) {
            Ok(value) => scalars.push(value),
            Err(coordinate) => {
                tracing::debug!(input = input.name, %coordinate, "Formula input missing.");
                return Evaluation::missing(coordinate);
            }
        }
    }

    match (formula.compute)(&scalars) {
        Some(value) => Evaluation {
            value: Some(value),
            status: KpiStatus::Computed,
        },
        None => Evaluation {
            value: None,
            status: KpiStatus::UndefinedRatio,
        },
    }
}
