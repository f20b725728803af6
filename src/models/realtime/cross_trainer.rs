//! Cross trainer data record (0x2ACE).

use crate::serializer::Field;

use super::{ENERGY_FIELDS, INCLINATION_FIELDS};

// Unlike the treadmill, elevation gain here has no 0.1 resolution.
const ELEVATION_GAIN_FIELDS: &[Field] = &[
    Field::num("elevation_gain_positive", "u2"),
    Field::num("elevation_gain_negative", "u2"),
];

const STEP_RATE_FIELDS: &[Field] = &[
    Field::num("step_rate_instant", "u2"),
    Field::num("step_rate_average", "u2"),
];

pub const CROSS_TRAINER_FIELDS: &[Field] = &[
    Field::num("speed_instant", "u2.01"),
    Field::num("speed_average", "u2.01").feature(0),
    Field::num("distance_total", "u3").feature(2),
    Field::group("step_rate", STEP_RATE_FIELDS).feature(6),
    Field::num("stride_count", "u2").feature(8),
    Field::group("elevation_gain", ELEVATION_GAIN_FIELDS).feature(4),
    Field::group("inclination", INCLINATION_FIELDS).feature(3),
    Field::num("resistance_level", "s2.1").feature(7),
    Field::num("power_instant", "s2").feature(14),
    Field::num("power_average", "s2").feature(14),
    Field::group("energy", ENERGY_FIELDS).feature(9),
    Field::num("heart_rate", "u1").feature(10),
    Field::num("metabolic_equivalent", "u1.1").feature(11),
    Field::num("time_elapsed", "u2").feature(12),
    Field::num("time_remaining", "u2").feature(13),
];
