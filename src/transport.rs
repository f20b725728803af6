//! Transport seam over the GATT connection.
//!
//! The controller and updater only ever talk to [`GattIo`], so the whole
//! protocol layer runs against a scripted fake in tests. The production
//! implementation wraps a btleplug peripheral.

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use futures::stream::BoxStream;
use futures::StreamExt;
use uuid::Uuid;

use crate::errors::{FtmsError, Result};

/// One server-initiated push (notification or indication).
#[derive(Debug, Clone)]
pub struct GattNotification {
    pub uuid: Uuid,
    pub value: Vec<u8>,
}

/// The few GATT operations the client needs.
#[async_trait]
pub trait GattIo: Send + Sync {
    /// Establishes the connection and discovers services.
    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    /// Whether the characteristic was discovered on the peripheral.
    fn has_characteristic(&self, uuid: Uuid) -> bool;

    async fn read(&self, uuid: Uuid) -> Result<Vec<u8>>;

    async fn write_with_response(&self, uuid: Uuid, data: &[u8]) -> Result<()>;

    /// Enables notifications/indications for the characteristic.
    async fn subscribe(&self, uuid: Uuid) -> Result<()>;

    /// The merged stream of all server-initiated pushes.
    async fn notifications(&self) -> Result<BoxStream<'static, GattNotification>>;

    /// RSSI at attach time, when the transport knows it.
    async fn rssi(&self) -> Option<i16>;
}

/// btleplug-backed transport.
pub struct BtlePeripheralIo {
    peripheral: Peripheral,
}

impl BtlePeripheralIo {
    pub fn new(peripheral: Peripheral) -> Self {
        Self { peripheral }
    }

    /// Helper function to find a characteristic.
    fn characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(FtmsError::CharacteristicNotFound(uuid))
    }
}

#[async_trait]
impl GattIo for BtlePeripheralIo {
    async fn connect(&self) -> Result<()> {
        if !self.peripheral.is_connected().await? {
            self.peripheral.connect().await?;
        }

        self.peripheral.discover_services().await?;

        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.peripheral.disconnect().await?;

        Ok(())
    }

    fn has_characteristic(&self, uuid: Uuid) -> bool {
        self.peripheral
            .characteristics()
            .iter()
            .any(|c| c.uuid == uuid)
    }

    async fn read(&self, uuid: Uuid) -> Result<Vec<u8>> {
        let characteristic = self.characteristic(uuid)?;

        Ok(self.peripheral.read(&characteristic).await?)
    }

    async fn write_with_response(&self, uuid: Uuid, data: &[u8]) -> Result<()> {
        let characteristic = self.characteristic(uuid)?;

        self.peripheral
            .write(&characteristic, data, WriteType::WithResponse)
            .await?;

        Ok(())
    }

    async fn subscribe(&self, uuid: Uuid) -> Result<()> {
        let characteristic = self.characteristic(uuid)?;

        self.peripheral.subscribe(&characteristic).await?;

        Ok(())
    }

    async fn notifications(&self) -> Result<BoxStream<'static, GattNotification>> {
        let stream = self.peripheral.notifications().await?;

        Ok(stream
            .map(|n| GattNotification {
                uuid: n.uuid,
                value: n.value,
            })
            .boxed())
    }

    async fn rssi(&self) -> Option<i16> {
        self.peripheral
            .properties()
            .await
            .ok()
            .flatten()
            .and_then(|p| p.rssi)
    }
}
