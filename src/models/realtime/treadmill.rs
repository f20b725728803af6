//! Treadmill data record (0x2ACD).

use crate::serializer::Field;

use super::{ENERGY_FIELDS, INCLINATION_FIELDS};

const ELEVATION_GAIN_FIELDS: &[Field] = &[
    Field::num("elevation_gain_positive", "u2.1"),
    Field::num("elevation_gain_negative", "u2.1"),
];

const FORCE_ON_BELT_FIELDS: &[Field] = &[
    Field::num("force_on_belt", "s2"),
    Field::num("power_output", "s2"),
];

pub const TREADMILL_FIELDS: &[Field] = &[
    Field::num("speed_instant", "u2.01"),
    Field::num("speed_average", "u2.01").feature(0),
    Field::num("distance_total", "u3").feature(2),
    Field::group("inclination", INCLINATION_FIELDS).feature(3),
    Field::group("elevation_gain", ELEVATION_GAIN_FIELDS).feature(4),
    Field::num("pace_instant", "u1.1").feature(5),
    Field::num("pace_average", "u1.1").feature(5),
    Field::group("energy", ENERGY_FIELDS).feature(9),
    Field::num("heart_rate", "u1").feature(10),
    Field::num("metabolic_equivalent", "u1.1").feature(11),
    Field::num("time_elapsed", "u2").feature(12),
    Field::num("time_remaining", "u2").feature(13),
    Field::group("force_on_belt", FORCE_ON_BELT_FIELDS).feature(15),
    Field::num("step_count", "u3").feature(6),
];
