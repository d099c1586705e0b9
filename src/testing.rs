//! Deterministic synthetic property data for tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{PropertyRecord, Table};

pub const TYPES: [&str; 2] = ["casa", "departamento"];
pub const SECTORS: [&str; 4] = ["vitacura", "las condes", "providencia", "la reina"];

/// `n` records whose price depends on type, sector and area, plus noise.
pub fn synthetic_table(n: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let property_type = TYPES[i % TYPES.len()];
            let sector_idx = (i / TYPES.len()) % SECTORS.len();
            let area: f64 = rng.gen_range(40.0..250.0);
            let noise: f64 = rng.gen_range(-300.0..300.0);
            let base = if property_type == "casa" { 6_000.0 } else { 3_500.0 };
            let premium = [4_000.0, 3_000.0, 1_500.0, 800.0][sector_idx];
            PropertyRecord {
                property_type: property_type.to_string(),
                sector: SECTORS[sector_idx].to_string(),
                net_usable_area: area,
                net_area: area * 1.3,
                n_rooms: (area / 40.0).round(),
                n_bathroom: (area / 70.0).round().max(1.0),
                latitude: -33.40 - 0.01 * sector_idx as f64,
                longitude: -70.55 - 0.01 * sector_idx as f64,
                price: Some(base + premium + 20.0 * area + noise),
            }
        })
        .collect()
}

/// One unlabeled record with seen categories.
pub fn sample_record() -> PropertyRecord {
    PropertyRecord {
        property_type: "casa".to_string(),
        sector: "vitacura".to_string(),
        net_usable_area: 152.0,
        net_area: 257.0,
        n_rooms: 3.0,
        n_bathroom: 3.0,
        latitude: -33.3794,
        longitude: -70.5447,
        price: None,
    }
}
