#![allow(dead_code)]

use configuration::Config;
use core_types::{Coordinate, ProviderId};
use database::MemoryStore;
use engine::KpiService;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub fn provider(raw: &str) -> ProviderId {
    ProviderId::normalize(raw).unwrap()
}

pub fn service(store: &Arc<MemoryStore>) -> KpiService {
    KpiService::new(store.clone(), store.clone(), &Config::default()).unwrap()
}

/// A complete, internally consistent set of worksheet cells.
pub struct Filing {
    pub net_patient_revenue: Decimal,
    pub operating_expenses: Decimal,
    pub discharges: Option<Decimal>,
}

impl Default for Filing {
    fn default() -> Self {
        Self {
            net_patient_revenue: dec!(1000),
            operating_expenses: dec!(950),
            discharges: Some(dec!(10)),
        }
    }
}

pub fn seed(store: &MemoryStore, provider_id: &ProviderId, fiscal_year: i32, filing: &Filing) {
    let mut cells = vec![
        (("G300000", "00100", "00100"), dec!(1500)),
        (("G300000", "00200", "00100"), dec!(500)),
        (("G300000", "00300", "00100"), filing.net_patient_revenue),
        (("G300000", "00400", "00100"), filing.operating_expenses),
        (("G300000", "02500", "00100"), dec!(100)),
        (("G300000", "02900", "00100"), dec!(110)),
        (("G000000", "00100", "00100"), dec!(200)),
        (("G000000", "01100", "00100"), dec!(400)),
        (("G000000", "04500", "00100"), dec!(200)),
        (("G000000", "05100", "00100"), dec!(800)),
        (("G200000", "02800", "00200"), dec!(600)),
        (("G200000", "02800", "00300"), dec!(1500)),
        (("A000000", "20000", "00100"), dec!(400)),
        (("A000000", "00100", "00700"), dec!(30)),
        (("A000000", "00200", "00700"), dec!(20)),
        (("S300001", "01400", "00800"), dec!(50)),
        (("S300001", "01400", "00300"), dec!(100)),
        (("S100000", "02300", "00300"), dec!(19)),
        (("S100000", "02900", "00100"), dec!(9.5)),
        (("S100000", "03100", "00100"), dec!(28.5)),
    ];
    if let Some(discharges) = filing.discharges {
        cells.push((("S300001", "01400", "01500"), discharges));
    }

    for ((worksheet, line, column), value) in cells {
        store.insert_worksheet_value(
            provider_id,
            fiscal_year,
            Coordinate::new(worksheet, line, column),
            value,
        );
    }
}
