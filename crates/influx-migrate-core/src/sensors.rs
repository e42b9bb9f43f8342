//! Sensor roster and serial → numeric id lookup.

use crate::error::ConfigError;
use std::collections::HashMap;

/// A sensor as known to both stores: its serial code and its numeric id in the
/// destination id space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SensorIdentity {
    pub serial: String,
    pub numeric_id: i64,
}

/// Validated, read-only sensor roster.
///
/// Built once at startup. Every roster serial is guaranteed to have an id, so
/// lookups deeper in the pipeline only fail for serials outside the roster.
#[derive(Debug, Clone)]
pub struct SensorRegistry {
    sensors: Vec<SensorIdentity>,
    by_serial: HashMap<String, usize>,
}

impl SensorRegistry {
    /// Build the registry from the ordered roster and the id table.
    ///
    /// Fails if the roster is empty, contains a duplicate, or names a serial
    /// without an id. Ids for serials outside the roster are ignored.
    pub fn new<I, S>(roster: I, ids: &HashMap<String, i64>) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sensors = Vec::new();
        let mut by_serial = HashMap::new();

        for serial in roster {
            let serial = serial.as_ref();
            let numeric_id = *ids.get(serial).ok_or_else(|| ConfigError::MissingSensorId {
                serial: serial.to_string(),
            })?;
            if by_serial.insert(serial.to_string(), sensors.len()).is_some() {
                return Err(ConfigError::DuplicateSensor {
                    serial: serial.to_string(),
                });
            }
            sensors.push(SensorIdentity {
                serial: serial.to_string(),
                numeric_id,
            });
        }

        if sensors.is_empty() {
            return Err(ConfigError::EmptyRoster);
        }

        Ok(Self { sensors, by_serial })
    }

    pub fn get(&self, serial: &str) -> Option<&SensorIdentity> {
        self.by_serial.get(serial).map(|idx| &self.sensors[*idx])
    }

    /// Sensors in roster order.
    pub fn iter(&self) -> impl Iterator<Item = &SensorIdentity> {
        self.sensors.iter()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}
