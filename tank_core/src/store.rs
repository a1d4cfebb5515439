//! Versioned, checksummed settings image on a [`NonVolatile`] medium.
//!
//! Layout v1, little-endian, at the start of the medium:
//!
//! | offset | size | content                         |
//! |--------|------|---------------------------------|
//! | 0      | 1    | initialized marker `0x7B`       |
//! | 1      | 1    | layout version                  |
//! | 2      | 4    | tank height × 100               |
//! | 6      | 4    | tank diameter × 100             |
//! | 10     | 4    | tank volume × 10                |
//! | 14     | 4    | sensor offset × 100             |
//! | 18     | 4    | empty distance × 100            |
//! | 22     | 4    | full distance × 100             |
//! | 26     | 2    | measurement interval (s)        |
//! | 28     | 1    | smoothing window                |
//! | 29     | 1    | low threshold (%)               |
//! | 30     | 1    | high threshold (%)              |
//! | 31     | 1    | flags, bit 0 = alerts enabled   |
//! | 32     | 1    | XOR of bytes 1..=31             |
//!
//! Bytes up to [`REGION_LEN`] are reserved for this store. The network
//! subsystem owns the medium from [`NETWORK_REGION_START`] and is never
//! touched here.

use eyre::WrapErr;
use serde::Serialize;
use tank_traits::NonVolatile;
use tracing::{debug, info, warn};

use crate::error::{BuildError, Report, Result};
use crate::fixed_point::{DIMENSION_SCALE, VOLUME_SCALE, dequantize_u32, quantize_u32};
use crate::hw_error::map_storage_error;
use crate::settings::{Field, Settings};

pub const MARKER: u8 = 123;
pub const LAYOUT_VERSION: u8 = 1;
pub const IMAGE_LEN: usize = 33;
pub const REGION_LEN: usize = 64;
pub const NETWORK_REGION_START: usize = 100;

mod offset {
    pub const MARKER: usize = 0;
    pub const VERSION: usize = 1;
    pub const HEIGHT: usize = 2;
    pub const DIAMETER: usize = 6;
    pub const VOLUME: usize = 10;
    pub const SENSOR_OFFSET: usize = 14;
    pub const EMPTY: usize = 18;
    pub const FULL: usize = 22;
    pub const INTERVAL: usize = 26;
    pub const SMOOTHING: usize = 28;
    pub const LOW: usize = 29;
    pub const HIGH: usize = 30;
    pub const FLAGS: usize = 31;
    pub const CHECKSUM: usize = 32;
}

const FLAG_ALERTS_ENABLED: u8 = 0b0000_0001;

/// How the stored image looked when it was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LoadStatus {
    Valid,
    /// No marker: a fresh or erased medium.
    Uninitialized,
    /// Marker present, but written by a layout this build cannot read.
    UnsupportedLayout { version: u8 },
    /// Checksum mismatch. The stored values were still used.
    Corrupted { stored: u8, computed: u8 },
    /// The medium could not be read at all.
    Unreadable(String),
}

/// Result of [`decode`]: what the image says, after range repair.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub status: LoadStatus,
    pub settings: Settings,
    pub replaced: Vec<Field>,
}

/// What [`SettingsStore::load`] found and did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub status: LoadStatus,
    pub settings: Settings,
    /// Fields that were out of range and fell back to their defaults.
    pub replaced: Vec<Field>,
    /// The effective settings were written back during load.
    pub persisted: bool,
    pub persist_error: Option<String>,
}

/// XOR of every byte covered by the checksum.
pub fn checksum(image: &[u8]) -> u8 {
    image
        .get(offset::VERSION..offset::CHECKSUM)
        .unwrap_or_default()
        .iter()
        .fold(0, |acc, b| acc ^ b)
}

fn put_u32(buf: &mut [u8; IMAGE_LEN], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

fn get_u32(image: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&image[at..at + 4]);
    u32::from_le_bytes(b)
}

pub fn encode(s: &Settings) -> [u8; IMAGE_LEN] {
    let mut buf = [0u8; IMAGE_LEN];
    buf[offset::MARKER] = MARKER;
    buf[offset::VERSION] = LAYOUT_VERSION;
    put_u32(&mut buf, offset::HEIGHT, quantize_u32(s.geometry.height_cm, DIMENSION_SCALE));
    put_u32(&mut buf, offset::DIAMETER, quantize_u32(s.geometry.diameter_cm, DIMENSION_SCALE));
    put_u32(&mut buf, offset::VOLUME, quantize_u32(s.geometry.volume_l, VOLUME_SCALE));
    put_u32(
        &mut buf,
        offset::SENSOR_OFFSET,
        quantize_u32(s.geometry.sensor_offset_cm, DIMENSION_SCALE),
    );
    put_u32(
        &mut buf,
        offset::EMPTY,
        quantize_u32(s.calibration.empty_distance_cm, DIMENSION_SCALE),
    );
    put_u32(
        &mut buf,
        offset::FULL,
        quantize_u32(s.calibration.full_distance_cm, DIMENSION_SCALE),
    );
    buf[offset::INTERVAL..offset::INTERVAL + 2]
        .copy_from_slice(&s.filter.measurement_interval_s.to_le_bytes());
    buf[offset::SMOOTHING] = s.filter.smoothing_window;
    buf[offset::LOW] = s.alerts.low_percent;
    buf[offset::HIGH] = s.alerts.high_percent;
    if s.alerts.alerts_enabled {
        buf[offset::FLAGS] |= FLAG_ALERTS_ENABLED;
    }
    buf[offset::CHECKSUM] = checksum(&buf);
    buf
}

/// Interpret a raw image. Never fails: anything unusable yields defaults and
/// a status saying why.
pub fn decode(image: &[u8]) -> Decoded {
    if image.len() < IMAGE_LEN || image[offset::MARKER] != MARKER {
        return Decoded {
            status: LoadStatus::Uninitialized,
            settings: Settings::default(),
            replaced: Vec::new(),
        };
    }
    if image[offset::VERSION] != LAYOUT_VERSION {
        return Decoded {
            status: LoadStatus::UnsupportedLayout {
                version: image[offset::VERSION],
            },
            settings: Settings::default(),
            replaced: Vec::new(),
        };
    }

    let mut settings = Settings::default();
    settings.geometry.height_cm = dequantize_u32(get_u32(image, offset::HEIGHT), DIMENSION_SCALE);
    settings.geometry.diameter_cm =
        dequantize_u32(get_u32(image, offset::DIAMETER), DIMENSION_SCALE);
    settings.geometry.volume_l = dequantize_u32(get_u32(image, offset::VOLUME), VOLUME_SCALE);
    settings.geometry.sensor_offset_cm =
        dequantize_u32(get_u32(image, offset::SENSOR_OFFSET), DIMENSION_SCALE);
    settings.calibration.empty_distance_cm =
        dequantize_u32(get_u32(image, offset::EMPTY), DIMENSION_SCALE);
    settings.calibration.full_distance_cm =
        dequantize_u32(get_u32(image, offset::FULL), DIMENSION_SCALE);
    settings.filter.measurement_interval_s =
        u16::from_le_bytes([image[offset::INTERVAL], image[offset::INTERVAL + 1]]);
    settings.filter.smoothing_window = image[offset::SMOOTHING];
    settings.alerts.low_percent = image[offset::LOW];
    settings.alerts.high_percent = image[offset::HIGH];
    settings.alerts.alerts_enabled = image[offset::FLAGS] & FLAG_ALERTS_ENABLED != 0;

    let stored = image[offset::CHECKSUM];
    let computed = checksum(image);
    let status = if stored == computed {
        LoadStatus::Valid
    } else {
        LoadStatus::Corrupted { stored, computed }
    };

    let replaced = settings.sanitize();
    Decoded {
        status,
        settings,
        replaced,
    }
}

pub struct SettingsStore<N: NonVolatile> {
    medium: N,
}

impl<N: NonVolatile> SettingsStore<N> {
    pub fn new(medium: N) -> Result<Self> {
        if medium.capacity() < REGION_LEN {
            return Err(Report::new(BuildError::InvalidConfig(
                "storage smaller than the settings region",
            )));
        }
        Ok(Self { medium })
    }

    fn read_image(&self) -> Result<[u8; IMAGE_LEN]> {
        let mut image = [0u8; IMAGE_LEN];
        for (addr, slot) in image.iter_mut().enumerate() {
            *slot = self
                .medium
                .read_byte(addr)
                .map_err(|e| Report::new(map_storage_error(&*e)))
                .wrap_err_with(|| format!("reading settings byte {addr}"))?;
        }
        Ok(image)
    }

    /// Load the stored settings. Never fails; see [`LoadReport`] for what was
    /// found. Anything short of a clean image is written back immediately.
    pub fn load(&mut self) -> LoadReport {
        let decoded = match self.read_image() {
            Ok(image) => decode(&image),
            Err(e) => Decoded {
                status: LoadStatus::Unreadable(format!("{e:#}")),
                settings: Settings::default(),
                replaced: Vec::new(),
            },
        };

        match &decoded.status {
            LoadStatus::Valid => debug!("settings image valid"),
            LoadStatus::Uninitialized => info!("settings medium uninitialized, using defaults"),
            LoadStatus::UnsupportedLayout { version } => {
                warn!(version, "settings layout not supported, using defaults")
            }
            LoadStatus::Corrupted { stored, computed } => warn!(
                stored,
                computed, "settings checksum mismatch, keeping stored values"
            ),
            LoadStatus::Unreadable(error) => {
                warn!(%error, "settings medium unreadable, using defaults")
            }
        }
        for field in &decoded.replaced {
            warn!(field = %field, "stored setting out of range, default restored");
        }

        let mut report = LoadReport {
            status: decoded.status,
            settings: decoded.settings,
            replaced: decoded.replaced,
            persisted: false,
            persist_error: None,
        };
        if report.status != LoadStatus::Valid || !report.replaced.is_empty() {
            match self.save(&report.settings) {
                Ok(()) => report.persisted = true,
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "could not persist repaired settings");
                    report.persist_error = Some(format!("{e:#}"));
                }
            }
        }
        report
    }

    /// Write and commit the full image. Returns only once the medium has
    /// accepted the commit.
    pub fn save(&mut self, settings: &Settings) -> Result<()> {
        let image = encode(settings);
        for (addr, byte) in image.iter().enumerate() {
            self.medium
                .write_byte(addr, *byte)
                .map_err(|e| Report::new(map_storage_error(&*e)))
                .wrap_err_with(|| format!("writing settings byte {addr}"))?;
        }
        self.medium
            .commit()
            .map_err(|e| Report::new(map_storage_error(&*e)))
            .wrap_err("committing settings")?;
        info!(checksum = image[offset::CHECKSUM], "settings saved");
        Ok(())
    }
}
