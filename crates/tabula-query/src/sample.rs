//! Built-in demo dataset used when nothing has been uploaded.

use serde_json::{json, Value};
use tabula_core::types::{Dataset, Record};

const MONTHS: [&str; 6] = ["2024-01", "2024-02", "2024-03", "2024-04", "2024-05", "2024-06"];
const REGIONS: [(&str, f64); 2] = [("North", 1.0), ("South", 0.8)];
const PRODUCTS: [(&str, f64, u32); 2] = [("Laptop", 1200.0, 14), ("Monitor", 310.0, 35)];

/// Monthly sales per region and product.
pub fn sample_dataset() -> Dataset {
    let mut rows = Vec::new();
    for (m, month) in MONTHS.iter().enumerate() {
        for (region, factor) in REGIONS {
            for (product, price, base_units) in PRODUCTS {
                let units = ((base_units + m as u32 * 2) as f64 * factor).round() as u32;
                rows.push(row(json!({
                    "month": month,
                    "region": region,
                    "product": product,
                    "units": units,
                    "sales": (units as f64 * price).round(),
                })));
            }
        }
    }
    Dataset::from_rows(rows)
}

fn row(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}
