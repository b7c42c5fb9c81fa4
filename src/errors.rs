use nix::errno::Errno;
use thiserror::Error;

/// Errors surfaced by the I2C transport core
#[derive(Error, Debug)]
pub enum I2cError {
    #[error("no I2C bus at '{path}': {source}")]
    NoSuchBus {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("device 0x{address:02x} did not respond (NACK): {source}")]
    RemoteIo {
        address: u8,
        #[source]
        source: Errno,
    },

    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    InvalidCrc { expected: u8, actual: u8 },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("bus I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl I2cError {
    /// True when the failure means "nothing answered at that address",
    /// the one condition callers may reasonably retry or skip.
    pub fn is_absent(&self) -> bool {
        matches!(self, I2cError::RemoteIo { .. })
    }

    pub(crate) fn from_errno(address: u8, errno: Errno) -> Self {
        match errno {
            Errno::EREMOTEIO | Errno::ENXIO | Errno::ENODEV => {
                I2cError::RemoteIo { address, source: errno }
            }
            _ => I2cError::Io(std::io::Error::from_raw_os_error(errno as i32)),
        }
    }

    pub(crate) fn from_io(address: u8, err: std::io::Error) -> Self {
        match err.raw_os_error() {
            Some(code)
                if code == libc::EREMOTEIO || code == libc::ENXIO || code == libc::ENODEV =>
            {
                I2cError::RemoteIo {
                    address,
                    source: Errno::from_raw(code),
                }
            }
            _ => I2cError::Io(err),
        }
    }
}

/// Errors produced by the sensor drivers layered on the transport
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("I2C transport failed: {0}")]
    Bus(#[from] I2cError),

    #[error("sensor '{sensor}' initialization failed: {reason}")]
    Init { sensor: String, reason: String },

    #[error("sensor '{sensor}' read failed: {reason}")]
    Read { sensor: String, reason: String },

    #[error("sensor '{sensor}' returned invalid data: {reason}")]
    Data { sensor: String, reason: String },

    #[error("invalid sensor configuration for '{sensor}': {reason}")]
    Config { sensor: String, reason: String },

    #[error("unsupported sensor driver: '{driver}'")]
    UnsupportedDriver { driver: String },

    #[error("bus '{bus}' not found or unavailable")]
    BusNotFound { bus: String },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration from '{path}': {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration format: {0}")]
    Format(#[from] toml::de::Error),

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Registry and initialization errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("sensor registration failed: {0}")]
    Registration(#[source] SensorError),

    #[error("bus initialization failed: {0}")]
    BusInit(#[from] ConfigError),

    #[error("failed to open bus '{bus}': {source}")]
    BusOpen {
        bus: String,
        #[source]
        source: I2cError,
    },

    #[error("failed to create sensor driver: {0}")]
    DriverCreation(#[source] SensorError),
}

/// Result type aliases for convenience
pub type I2cResult<T> = Result<T, I2cError>;
pub type SensorResult<T> = Result<T, SensorError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type RegistryResult<T> = Result<T, RegistryError>;
