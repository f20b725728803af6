//! Adapter-level discovery of fitness machines.

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};

use crate::client::FitnessMachine;
use crate::errors::{FtmsError, Result};
use crate::machine_type::{machine_type_from_advertisement, MachineType};
use crate::uuids;

/// A peripheral whose advertisement identified it as a fitness machine.
pub struct DiscoveredMachine {
    pub peripheral: Peripheral,
    pub machine_type: MachineType,
    pub local_name: Option<String>,
    pub rssi: Option<i16>,
}

impl DiscoveredMachine {
    pub fn address(&self) -> String {
        self.peripheral.address().to_string()
    }

    /// Builds a client session for the discovered machine.
    pub fn into_machine(self) -> Result<FitnessMachine> {
        FitnessMachine::new(self.peripheral, self.machine_type)
    }
}

pub struct FtmsScanner {
    adapter: Adapter,
}

impl FtmsScanner {
    /// Grabs the first Bluetooth adapter.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| FtmsError::Transport(btleplug::Error::NotSupported(
                "no Bluetooth adapter".into(),
            )))?;

        Ok(Self { adapter })
    }

    /// Scans for FTMS advertisements for the given duration and returns
    /// every peripheral with valid fitness machine service data.
    pub async fn discover(&self, wait: Duration) -> Result<Vec<DiscoveredMachine>> {
        let filter = ScanFilter {
            services: vec![uuids::FTMS_SERVICE],
        };

        self.adapter.start_scan(filter).await?;
        tokio::time::sleep(wait).await;
        self.adapter.stop_scan().await?;

        let mut found = Vec::new();

        for peripheral in self.adapter.peripherals().await? {
            let properties = match peripheral.properties().await? {
                Some(properties) => properties,
                None => continue,
            };

            match machine_type_from_advertisement(&properties.service_data) {
                Ok(machine_type) => {
                    debug!(
                        "Discovered {:?} at {}",
                        machine_type,
                        peripheral.address()
                    );

                    found.push(DiscoveredMachine {
                        peripheral,
                        machine_type,
                        local_name: properties.local_name,
                        rssi: properties.rssi,
                    });
                }
                Err(err) => {
                    trace!("Skipping {}: {}", peripheral.address(), err);
                }
            }
        }

        Ok(found)
    }

    /// Scans until the machine with the given address shows up.
    pub async fn find_by_address(
        &self,
        address: &str,
        wait: Duration,
    ) -> Result<DiscoveredMachine> {
        let machines = self.discover(wait).await?;

        machines
            .into_iter()
            .find(|m| m.address().eq_ignore_ascii_case(address))
            .ok_or(FtmsError::Transport(btleplug::Error::DeviceNotFound))
    }
}
