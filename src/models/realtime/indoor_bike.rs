//! Indoor bike data record (0x2AD2).

use crate::serializer::Field;

use super::ENERGY_FIELDS;

pub const INDOOR_BIKE_FIELDS: &[Field] = &[
    Field::num("speed_instant", "u2.01"),
    Field::num("speed_average", "u2.01").feature(0),
    Field::num("cadence_instant", "u2.5").feature(1),
    Field::num("cadence_average", "u2.5").feature(1),
    Field::num("distance_total", "u3").feature(2),
    Field::num("resistance_level", "s2").feature(7),
    Field::num("power_instant", "s2").feature(14),
    Field::num("power_average", "s2").feature(14),
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
    fn typical_trainer_frame() {
        // Speed, cadence, power and elapsed time: mask 0x0444.
        let data = [
            0x44, 0x04, // flags
            0xC4, 0x09, // 25.0 km/h
            0xAA, 0x00, // 85.0 rpm (raw 170, 0.5 resolution)
            0xC8, 0x00, // 200 W
            0x3C, 0x00, // 60 s
        ];

        let record = decode(MachineType::IndoorBike, &data).unwrap();

        assert!(!record.more_data);
        assert_eq!(record.values["speed_instant"], Value::Float(25.0));
        assert_eq!(record.values["cadence_instant"], Value::Float(85.0));
        assert_eq!(record.values["power_instant"], Value::SInt(200));
        assert_eq!(record.values["time_elapsed"], Value::UInt(60));
    }

    #[test]
    fn continuation_frame_skips_the_default_field() {
        // More Data plus total distance only.
        let record = decode(MachineType::IndoorBike, &[0x11, 0x00, 0x10, 0x27, 0x00]).unwrap();

        assert!(record.more_data);
        assert_eq!(record.values.len(), 1);
        assert_eq!(record.values["distance_total"], Value::UInt(10000));
    }
}
