//! Device Information Service reader.

use uuid::Uuid;

use crate::transport::GattIo;
use crate::uuids;

/// Static device identification strings. All best-effort: a missing or
/// unreadable characteristic simply leaves the field empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub sw_version: Option<String>,
    pub hw_version: Option<String>,
}

const STRING_CHARACTERISTICS: [Uuid; 5] = [
    uuids::MANUFACTURER_NAME,
    uuids::MODEL_NUMBER,
    uuids::SERIAL_NUMBER,
    uuids::SW_REVISION,
    uuids::HW_REVISION,
];

/// Reads the device information strings.
pub async fn read_device_info(io: &dyn GattIo) -> DeviceInfo {
    let mut result = DeviceInfo::default();

    let fields = [
        &mut result.manufacturer,
        &mut result.model,
        &mut result.serial_number,
        &mut result.sw_version,
        &mut result.hw_version,
    ];

    for (uuid, field) in STRING_CHARACTERISTICS.iter().zip(fields) {
        if !io.has_characteristic(*uuid) {
            continue;
        }

        if let Ok(data) = io.read(*uuid).await {
            *field = String::from_utf8(data).ok();
        }
    }

    debug!("Device info: {:?}", result);

    result
}
