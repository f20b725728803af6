//! Rower data record (0x2AD1).

use crate::serializer::Field;

use super::ENERGY_FIELDS;

// The rower's default pair: stroke rate has a 0.5 resolution.
const STROKE_RATE_FIELDS: &[Field] = &[
    Field::num("stroke_rate_instant", "u1.5"),
    Field::num("stroke_count", "u2"),
];

pub const ROWER_FIELDS: &[Field] = &[
    Field::group("stroke_rate", STROKE_RATE_FIELDS),
    Field::num("stroke_rate_average", "u1.5").feature(1),
    Field::num("distance_total", "u3").feature(2),
    Field::num("split_time_instant", "u2").feature(5),
    Field::num("split_time_average", "u2").feature(5),
    Field::num("power_instant", "s2").feature(14),
    Field::num("power_average", "s2").feature(14),
    Field::num("resistance_level", "s2").feature(7),
    Field::group("energy", ENERGY_FIELDS).feature(9),
    Field::num("heart_rate", "u1").feature(10),
    Field::num("metabolic_equivalent", "u1.1").feature(11),
    Field::num("time_elapsed", "u2").feature(12),
    Field::num("time_remaining", "u2").feature(13),
];

#[cfg(test)]
mod tests {
    use super::super::decode;
    use crate::machine_type::MachineType;
    use crate::serializer::Value;

    #[test]
    fn default_record_is_the_stroke_rate_pair() {
        // 24.5 strokes/min (raw 49), 128 strokes total
        let record = decode(MachineType::Rower, &[0x00, 0x00, 0x31, 0x80, 0x00]).unwrap();

        assert_eq!(record.values.len(), 2);
        assert_eq!(record.values["stroke_rate_instant"], Value::Float(24.5));
        assert_eq!(record.values["stroke_count"], Value::UInt(128));
    }

    #[test]
    fn power_field_is_signed() {
        // Bit 5 selects instantaneous power, -10 W.
        let record = decode(MachineType::Rower, &[0x20, 0x00, 0x31, 0x80, 0x00, 0xF6, 0xFF])
            .unwrap();

        assert_eq!(record.values["power_instant"], Value::SInt(-10));
    }
}
