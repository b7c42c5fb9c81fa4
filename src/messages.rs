use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata attached to every published reading
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Header {
    pub device_id: String,
    pub sensor_id: String,
    /// Monotonic per-sensor sequence number
    pub seq: u64,
    pub schema_v: u32,
    /// Wall-clock timestamp in nanoseconds since the Unix epoch
    pub t_utc_ns: u64,
}

impl Header {
    pub fn new(device_id: String, sensor_id: String, seq: u64) -> Self {
        let t_utc_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self {
            device_id,
            sensor_id,
            seq,
            schema_v: 1,
            t_utc_ns,
        }
    }
}

/// Air quality reading (SGP30-class devices)
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AirQualityMessage {
    pub h: Header,
    /// Equivalent CO2 in ppm
    pub eco2_ppm: u16,
    /// Total volatile organic compounds in ppb
    pub tvoc_ppb: u16,
}

/// Particulate matter reading (HM3301-class devices): concentrations in
/// µg/m³ for PM1.0 / PM2.5 / PM10, and particles per liter of air with
/// diameter above 0.3 / 0.5 / 1.0 / 2.5 / 5.0 / 10 µm
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ParticulateMessage {
    pub h: Header,
    pub standard: [u16; 3],
    pub atmospheric: [u16; 3],
    pub particle_counts: [u16; 6],
}

/// Raw analog sample from a board pin
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AnalogMessage {
    pub h: Header,
    pub pin: u8,
    pub value: u16,
}

/// Unified sensor message enum for different sensor types
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum SensorMessage {
    AirQuality(AirQualityMessage),
    Particulate(ParticulateMessage),
    Analog(AnalogMessage),
}

impl SensorMessage {
    /// Get the header from any sensor message
    pub fn header(&self) -> &Header {
        match self {
            SensorMessage::AirQuality(msg) => &msg.h,
            SensorMessage::Particulate(msg) => &msg.h,
            SensorMessage::Analog(msg) => &msg.h,
        }
    }

    /// Get the sensor ID from any sensor message
    pub fn sensor_id(&self) -> &str {
        &self.header().sensor_id
    }

    /// Serialize to JSON for debugging
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
