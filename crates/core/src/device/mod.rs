//! Device binding.
//!
//! The display hardware is driven through an optional vendor driver that
//! is located and loaded at run time. Everything above this module talks
//! to a [`DmdDevice`] trait object; whether a real driver sits behind it,
//! or nothing at all, is decided once by a [`DeviceBinder`].

pub mod dll;

use crate::host::ErrorReporter;
use crate::logging::{log, LogCategory, LogLevel};
use crate::types::ColorSpace;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub use dll::{DllBinder, InstallRegistry, NoInstallRegistry};

/// Hardware generation tag passed with per-title settings. The display
/// pipeline always presents itself as a WPC-95 machine.
pub const GEN_WPC95: u64 = 0x80;

/// Title configured right after a session is opened, before any game.
pub const HOST_TITLE: &str = "dmdplay";

/// Per-title driver options, laid out exactly like the driver's C struct.
///
/// The base color and shade percentages only matter for monochrome
/// devices; the colorize triples only when `dmd_colorize` is set.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmOptions {
    pub dmd_red: i32,
    pub dmd_green: i32,
    pub dmd_blue: i32,
    pub dmd_perc66: i32,
    pub dmd_perc33: i32,
    pub dmd_perc0: i32,
    pub dmd_only: i32,
    pub dmd_compact: i32,
    pub dmd_antialias: i32,
    pub dmd_colorize: i32,
    pub dmd_red66: i32,
    pub dmd_green66: i32,
    pub dmd_blue66: i32,
    pub dmd_red33: i32,
    pub dmd_green33: i32,
    pub dmd_blue33: i32,
    pub dmd_red0: i32,
    pub dmd_green0: i32,
    pub dmd_blue0: i32,
}

impl Default for PmOptions {
    fn default() -> Self {
        Self {
            dmd_red: 255,
            dmd_green: 88,
            dmd_blue: 32,
            dmd_perc66: 67,
            dmd_perc33: 33,
            dmd_perc0: 20,
            dmd_only: 1,
            dmd_compact: 0,
            dmd_antialias: 50,
            dmd_colorize: 0,
            dmd_red66: 225,
            dmd_green66: 15,
            dmd_blue66: 193,
            dmd_red33: 6,
            dmd_green33: 0,
            dmd_blue33: 214,
            dmd_red0: 0,
            dmd_green0: 0,
            dmd_blue0: 0,
        }
    }
}

/// What the bound driver can display. Fixed at bind time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub supports_rgb: bool,
}

/// A bound display driver.
///
/// Only one thread ever calls into a device at a time: the caller that
/// opens the session, then the writer thread that takes ownership of it.
pub trait DmdDevice: Send {
    fn capability(&self) -> Capability;

    /// Start a display session. Returns false if the driver reports failure.
    fn open(&mut self) -> bool;

    fn close(&mut self);

    /// Push per-title options ahead of that title's first frame.
    fn configure(&mut self, title: &str, generation: u64, options: &PmOptions);

    fn render_mono4(&mut self, pixels: &[u8]);

    fn render_mono16(&mut self, pixels: &[u8]);

    /// Only called when `capability().supports_rgb` is set.
    fn render_rgb24(&mut self, pixels: &[u8]);

    /// Dispatch a frame to the render call matching its color space.
    /// Color frames are dropped on devices without color support.
    fn render(&mut self, color_space: ColorSpace, pixels: &[u8]) {
        match color_space {
            ColorSpace::Mono4 => self.render_mono4(pixels),
            ColorSpace::Mono16 => self.render_mono16(pixels),
            ColorSpace::Rgb24 => {
                if self.capability().supports_rgb {
                    self.render_rgb24(pixels);
                } else {
                    log(LogCategory::Device, LogLevel::Debug, || {
                        "dropping RGB frame: device has no color support".to_string()
                    });
                }
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum BindError {
    /// No driver file in any search location; the normal no-hardware case
    #[error("no display driver found")]
    NotFound,
    #[error("unable to load {}: {}", .path.display(), .detail)]
    Load { path: PathBuf, detail: String },
    #[error("unable to bind {} function {}()", .path.display(), .symbol)]
    MissingEntryPoint { path: PathBuf, symbol: &'static str },
}

impl BindError {
    /// True for the "no hardware attached" outcome, which is not reported
    /// to the user.
    pub fn is_absent(&self) -> bool {
        matches!(self, BindError::NotFound)
    }
}

/// Locates and loads a device driver.
pub trait DeviceBinder: Send + Sync {
    fn bind(&self) -> Result<Box<dyn DmdDevice>, BindError>;

    /// True when the driver that would be bound shows its own on-screen
    /// emulated display rather than driving hardware. Checked before
    /// binding, since loading such a driver already opens its window.
    fn virtual_display_active(&self) -> bool {
        false
    }
}

/// Binder for hosts with no display hardware at all.
pub struct NullBinder;

impl DeviceBinder for NullBinder {
    fn bind(&self) -> Result<Box<dyn DmdDevice>, BindError> {
        Err(BindError::NotFound)
    }
}

/// Outcome of a binding attempt.
pub enum DeviceBinding {
    /// No usable driver; output is discarded
    Absent,
    Bound(Box<dyn DmdDevice>),
}

impl DeviceBinding {
    /// Run `binder`, reporting link failures once and degrading every
    /// failure to [`DeviceBinding::Absent`].
    pub fn bind(binder: &dyn DeviceBinder, reporter: &dyn ErrorReporter) -> Self {
        match binder.bind() {
            Ok(device) => {
                let capability = device.capability();
                log(LogCategory::Device, LogLevel::Info, || {
                    format!("driver bound (color support: {})", capability.supports_rgb)
                });
                DeviceBinding::Bound(device)
            }
            Err(e) if e.is_absent() => {
                log(LogCategory::Device, LogLevel::Info, || {
                    "no display driver found; output disabled".to_string()
                });
                DeviceBinding::Absent
            }
            Err(e) => {
                log(LogCategory::Device, LogLevel::Error, || e.to_string());
                reporter.sys_error("The display driver could not be loaded", &e.to_string());
                DeviceBinding::Absent
            }
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            DeviceBinding::Absent => Capability::default(),
            DeviceBinding::Bound(device) => device.capability(),
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, DeviceBinding::Bound(_))
    }
}

impl std::fmt::Debug for DeviceBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceBinding::Absent => write!(f, "Absent"),
            DeviceBinding::Bound(device) => write!(f, "Bound({:?})", device.capability()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use crate::host::SilentErrorReporter;
    use std::sync::Mutex;

    #[test]
    fn test_pm_options_layout() {
        assert_eq!(std::mem::size_of::<PmOptions>(), 19 * 4);
        let opts = PmOptions::default();
        assert_eq!((opts.dmd_red, opts.dmd_green, opts.dmd_blue), (255, 88, 32));
        assert_eq!((opts.dmd_perc66, opts.dmd_perc33, opts.dmd_perc0), (67, 33, 20));
        assert_eq!(opts.dmd_only, 1);
        assert_eq!(opts.dmd_antialias, 50);
    }

    #[test]
    fn test_absent_binding_has_no_color() {
        let binding = DeviceBinding::bind(&NullBinder, &SilentErrorReporter);
        assert!(!binding.is_bound());
        assert!(!binding.capability().supports_rgb);
    }

    struct Recorder(Mutex<Vec<String>>);

    impl ErrorReporter for Recorder {
        fn error(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
        fn sys_error(&self, message: &str, detail: &str) {
            self.0.lock().unwrap().push(format!("{}: {}", message, detail));
        }
    }

    struct BrokenBinder;

    impl DeviceBinder for BrokenBinder {
        fn bind(&self) -> Result<Box<dyn DmdDevice>, BindError> {
            Err(BindError::MissingEntryPoint {
                path: PathBuf::from("DmdDevice.dll"),
                symbol: "Render_16_Shades",
            })
        }
    }

    #[test]
    fn test_not_found_is_silent_but_link_failure_is_reported() {
        let reporter = Recorder(Mutex::new(Vec::new()));
        DeviceBinding::bind(&NullBinder, &reporter);
        assert!(reporter.0.lock().unwrap().is_empty());

        let binding = DeviceBinding::bind(&BrokenBinder, &reporter);
        assert!(!binding.is_bound());
        let reports = reporter.0.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("Render_16_Shades"));
    }

    #[test]
    fn test_render_dispatch_by_color_space() {
        let mut mono = MockDevice::new(false);
        mono.render(ColorSpace::Mono16, &[1, 2]);
        mono.render(ColorSpace::Mono4, &[3]);
        mono.render(ColorSpace::Rgb24, &[4, 5, 6]);
        assert_eq!(
            mono.calls(),
            vec![
                Call::Render(ColorSpace::Mono16, vec![1, 2]),
                Call::Render(ColorSpace::Mono4, vec![3]),
            ]
        );

        let mut color = MockDevice::new(true);
        color.render(ColorSpace::Rgb24, &[4, 5, 6]);
        assert_eq!(color.calls(), vec![Call::Render(ColorSpace::Rgb24, vec![4, 5, 6])]);
    }

    #[test]
    fn test_bound_binding_reports_capability() {
        let binding = DeviceBinding::bind(
            &MockBinder(Some(MockDevice::new(true))),
            &SilentErrorReporter,
        );
        assert!(binding.is_bound());
        assert!(binding.capability().supports_rgb);
    }
}
