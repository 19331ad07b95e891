//! Vendor driver loaded as a shared library.
//!
//! The driver exports a small C API: `Open`, `Close`, `PM_GameSettings`,
//! `Render_4_Shades` and `Render_16_Shades` are required, `Render_RGB24`
//! is optional and its presence is what marks a color-capable device.
//!
//! The widely used dmd-extensions build of the driver can also run as a
//! "virtual" DMD, an on-screen window instead of hardware. It is recognized
//! by its `DmdDevice.ini`, found through `DMDDEVICE_CONFIG` or next to the
//! library; `[virtualdmd] enabled` defaults to true and only an explicit
//! `false` turns the window off.

use super::{BindError, Capability, DeviceBinder, DmdDevice, PmOptions};
use crate::logging::{log, LogCategory, LogLevel};
use crate::types::{DMD_HEIGHT, DMD_WIDTH};
use libloading::Library;
use std::ffi::{c_char, c_int, CString, OsString};
use std::fs;
use std::path::{Path, PathBuf};

/// Registration key of the peripheral-management COM server. Its value is
/// the full path of the server library; the driver sits next to it.
pub const VPINMAME_SERVER_KEY: &str =
    "CLSID\\{F389C8B7-144F-4C63-A2E3-246D168F9D39}\\InProcServer32";

/// Same registration as seen by 32-bit processes on 64-bit systems.
pub const VPINMAME_SERVER_KEY_WOW64: &str =
    "Wow6432Node\\CLSID\\{F389C8B7-144F-4C63-A2E3-246D168F9D39}\\InProcServer32";

/// Environment variable pointing at the dmd-extensions settings file.
pub const DMD_EXT_CONFIG_VAR: &str = "DMDDEVICE_CONFIG";

/// Settings file name of the dmd-extensions driver.
pub const DMD_EXT_INI: &str = "DmdDevice.ini";

/// Registry-style lookup of installed components.
pub trait InstallRegistry: Send + Sync {
    /// Path value stored under `key`, if registered.
    fn lookup_path(&self, key: &str) -> Option<PathBuf>;
}

/// Registry with nothing installed.
pub struct NoInstallRegistry;

impl InstallRegistry for NoInstallRegistry {
    fn lookup_path(&self, _key: &str) -> Option<PathBuf> {
        None
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
struct Rgb24 {
    red: u8,
    green: u8,
    blue: u8,
}

type OpenFn = unsafe extern "C" fn() -> c_int;
type CloseFn = unsafe extern "C" fn() -> bool;
type GameSettingsFn = unsafe extern "C" fn(*const c_char, u64, *const PmOptions);
type RenderFn = unsafe extern "C" fn(u16, u16, *mut u8);
type RenderRgbFn = unsafe extern "C" fn(u16, u16, *mut Rgb24);

/// Driver file names to try in each folder, most specific first.
pub fn driver_file_names() -> Vec<OsString> {
    let mut names = Vec::new();
    if cfg!(target_pointer_width = "64") {
        names.push(libloading::library_filename("DmdDevice64"));
    }
    names.push(libloading::library_filename("DmdDevice"));
    names
}

/// Settings file the dmd-extensions driver at `driver` reads.
pub fn dmd_ext_config_path(driver: &Path) -> Option<PathBuf> {
    match std::env::var_os(DMD_EXT_CONFIG_VAR) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => driver.parent().map(|dir| dir.join(DMD_EXT_INI)),
    }
}

/// Scan a dmd-extensions ini for `[virtualdmd] enabled`.
pub fn virtual_dmd_enabled(ini: &str) -> bool {
    let mut section = String::new();
    let mut enabled = true;
    for line in ini.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = name.trim().to_string();
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if section.eq_ignore_ascii_case("virtualdmd") && key.trim().eq_ignore_ascii_case("enabled") {
            enabled = !value.trim().eq_ignore_ascii_case("false");
        }
    }
    enabled
}

/// Finds and loads the driver library.
pub struct DllBinder {
    driver_path: Option<PathBuf>,
    app_dir: Option<PathBuf>,
    registry: Box<dyn InstallRegistry>,
}

impl DllBinder {
    /// Search the registered server folder, then the folder holding the
    /// running executable.
    pub fn new() -> Self {
        let app_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));
        Self {
            driver_path: None,
            app_dir,
            registry: Box::new(NoInstallRegistry),
        }
    }

    /// Use exactly this driver file and skip the search.
    pub fn with_driver_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.driver_path = Some(path.into());
        self
    }

    pub fn with_app_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.app_dir = Some(dir.into());
        self
    }

    pub fn with_registry(mut self, registry: Box<dyn InstallRegistry>) -> Self {
        self.registry = registry;
        self
    }

    fn try_folder(folder: &Path, description: &str) -> Option<PathBuf> {
        for name in driver_file_names() {
            let candidate = folder.join(&name);
            if candidate.is_file() {
                log(LogCategory::Device, LogLevel::Info, || {
                    format!(
                        "found {} in the {} folder: {}",
                        name.to_string_lossy(),
                        description,
                        candidate.display()
                    )
                });
                return Some(candidate);
            }
        }
        None
    }

    /// Resolve the driver file without loading it.
    pub fn locate(&self) -> Option<PathBuf> {
        if let Some(path) = &self.driver_path {
            return path.is_file().then(|| path.clone());
        }

        log(LogCategory::Device, LogLevel::Info, || {
            "searching for the display driver".to_string()
        });

        let server = self
            .registry
            .lookup_path(VPINMAME_SERVER_KEY)
            .or_else(|| self.registry.lookup_path(VPINMAME_SERVER_KEY_WOW64));
        match server {
            Some(server) => {
                log(LogCategory::Device, LogLevel::Info, || {
                    format!("server registration found at {}", server.display())
                });
                if let Some(found) = server
                    .parent()
                    .and_then(|dir| Self::try_folder(dir, "server"))
                {
                    return Some(found);
                }
            }
            None => log(LogCategory::Device, LogLevel::Info, || {
                "server registration not found".to_string()
            }),
        }

        self.app_dir
            .as_deref()
            .and_then(|dir| Self::try_folder(dir, "application"))
    }
}

impl Default for DllBinder {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBinder for DllBinder {
    fn bind(&self) -> Result<Box<dyn DmdDevice>, BindError> {
        let path = self.locate().ok_or(BindError::NotFound)?;
        let device = DllDevice::load(&path)?;
        log(LogCategory::Device, LogLevel::Info, || {
            format!("{} successfully loaded", path.display())
        });
        Ok(Box::new(device))
    }

    fn virtual_display_active(&self) -> bool {
        let Some(ini_path) = self.locate().as_deref().and_then(dmd_ext_config_path) else {
            return false;
        };
        match fs::read_to_string(&ini_path) {
            Ok(ini) => {
                let enabled = virtual_dmd_enabled(&ini);
                log(LogCategory::Device, LogLevel::Info, || {
                    format!(
                        "dmd-extensions settings at {}: virtual DMD {}",
                        ini_path.display(),
                        if enabled { "enabled" } else { "disabled" }
                    )
                });
                enabled
            }
            Err(_) => false,
        }
    }
}

/// Entry points resolved from a loaded driver.
///
/// The function pointers are only valid while `_library` is loaded, which
/// holds for as long as this struct exists.
struct DllDevice {
    open: OpenFn,
    close: CloseFn,
    game_settings: GameSettingsFn,
    render_4: RenderFn,
    render_16: RenderFn,
    render_rgb: Option<RenderRgbFn>,
    scratch: Vec<u8>,
    scratch_rgb: Vec<Rgb24>,
    _library: Library,
}

impl DllDevice {
    fn load(path: &Path) -> Result<Self, BindError> {
        // SAFETY: loading runs the driver's initializers; the driver is the
        // vendor library this module exists to host.
        let library = unsafe { Library::new(path) }.map_err(|e| BindError::Load {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

        fn required<T: Copy>(
            library: &Library,
            path: &Path,
            symbol: &'static str,
        ) -> Result<T, BindError> {
            let name = format!("{}\0", symbol);
            // SAFETY: the type aliases above match the driver's exported C
            // signatures.
            unsafe { library.get::<T>(name.as_bytes()) }
                .map(|s| *s)
                .map_err(|_| BindError::MissingEntryPoint {
                    path: path.to_path_buf(),
                    symbol,
                })
        }

        let open = required::<OpenFn>(&library, path, "Open")?;
        let close = required::<CloseFn>(&library, path, "Close")?;
        let game_settings = required::<GameSettingsFn>(&library, path, "PM_GameSettings")?;
        let render_4 = required::<RenderFn>(&library, path, "Render_4_Shades")?;
        let render_16 = required::<RenderFn>(&library, path, "Render_16_Shades")?;
        let render_rgb = required::<RenderRgbFn>(&library, path, "Render_RGB24").ok();

        Ok(Self {
            open,
            close,
            game_settings,
            render_4,
            render_16,
            render_rgb,
            scratch: vec![0; DMD_WIDTH * DMD_HEIGHT],
            scratch_rgb: vec![
                Rgb24 {
                    red: 0,
                    green: 0,
                    blue: 0
                };
                DMD_WIDTH * DMD_HEIGHT
            ],
            _library: library,
        })
    }

    fn render_gray(&mut self, render: RenderFn, pixels: &[u8]) {
        let n = pixels.len().min(self.scratch.len());
        self.scratch[..n].copy_from_slice(&pixels[..n]);
        // SAFETY: scratch holds a full 128x32 frame.
        unsafe { render(DMD_WIDTH as u16, DMD_HEIGHT as u16, self.scratch.as_mut_ptr()) };
    }
}

impl DmdDevice for DllDevice {
    fn capability(&self) -> Capability {
        Capability {
            supports_rgb: self.render_rgb.is_some(),
        }
    }

    fn open(&mut self) -> bool {
        // SAFETY: resolved from the loaded driver, takes no arguments.
        unsafe { (self.open)() != 0 }
    }

    fn close(&mut self) {
        // SAFETY: resolved from the loaded driver, takes no arguments.
        unsafe {
            (self.close)();
        }
    }

    fn configure(&mut self, title: &str, generation: u64, options: &PmOptions) {
        let title = CString::new(title.replace('\0', "")).unwrap_or_default();
        // SAFETY: both pointers outlive the call; PmOptions is repr(C).
        unsafe { (self.game_settings)(title.as_ptr(), generation, options) };
    }

    fn render_mono4(&mut self, pixels: &[u8]) {
        self.render_gray(self.render_4, pixels);
    }

    fn render_mono16(&mut self, pixels: &[u8]) {
        self.render_gray(self.render_16, pixels);
    }

    fn render_rgb24(&mut self, pixels: &[u8]) {
        let Some(render) = self.render_rgb else {
            return;
        };
        for (dst, src) in self.scratch_rgb.iter_mut().zip(pixels.chunks_exact(3)) {
            *dst = Rgb24 {
                red: src[0],
                green: src[1],
                blue: src[2],
            };
        }
        // SAFETY: scratch_rgb holds a full 128x32 frame of packed triples.
        unsafe { render(DMD_WIDTH as u16, DMD_HEIGHT as u16, self.scratch_rgb.as_mut_ptr()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dmd_core_dll_{}", name));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn plain_name() -> OsString {
        libloading::library_filename("DmdDevice")
    }

    struct FixedRegistry(PathBuf);

    impl InstallRegistry for FixedRegistry {
        fn lookup_path(&self, key: &str) -> Option<PathBuf> {
            (key == VPINMAME_SERVER_KEY).then(|| self.0.clone())
        }
    }

    #[test]
    fn test_file_names_end_with_plain_driver() {
        let names = driver_file_names();
        assert_eq!(names.last(), Some(&plain_name()));
        if cfg!(target_pointer_width = "64") {
            assert_eq!(names.len(), 2);
            assert!(names[0].to_string_lossy().contains("DmdDevice64"));
        }
    }

    #[test]
    fn test_locate_in_app_dir() {
        let dir = temp_dir("app");
        fs::write(dir.join(plain_name()), b"").unwrap();
        let binder = DllBinder::new().with_app_dir(&dir);
        assert_eq!(binder.locate(), Some(dir.join(plain_name())));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_registry_folder_is_searched_first() {
        let server_dir = temp_dir("server");
        let app_dir = temp_dir("server_app");
        fs::write(server_dir.join(plain_name()), b"").unwrap();
        fs::write(app_dir.join(plain_name()), b"").unwrap();

        let binder = DllBinder::new()
            .with_app_dir(&app_dir)
            .with_registry(Box::new(FixedRegistry(server_dir.join("VPinMAME.dll"))));
        assert_eq!(binder.locate(), Some(server_dir.join(plain_name())));

        fs::remove_dir_all(&server_dir).unwrap();
        fs::remove_dir_all(&app_dir).unwrap();
    }

    #[test]
    fn test_missing_driver_is_not_found() {
        let dir = temp_dir("empty");
        let binder = DllBinder::new().with_app_dir(&dir);
        assert!(binder.locate().is_none());
        assert!(matches!(binder.bind(), Err(BindError::NotFound)));

        let explicit = DllBinder::new().with_driver_path(dir.join("nope.dll"));
        assert!(matches!(explicit.bind(), Err(BindError::NotFound)));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_virtual_dmd_setting() {
        assert!(virtual_dmd_enabled(""));
        assert!(virtual_dmd_enabled("[virtualdmd]\nstayontop = true\n"));
        assert!(!virtual_dmd_enabled("[global]\n[VirtualDMD]\n  Enabled = FALSE\n"));
        // Anything but an explicit false leaves it on
        assert!(virtual_dmd_enabled("[virtualdmd]\nenabled = 0\n"));
        // Only the virtualdmd section counts
        assert!(virtual_dmd_enabled("[pindmd3]\nenabled = false\n"));
        assert!(virtual_dmd_enabled("[virtualdmd]\n; enabled = false\n"));
    }

    #[test]
    fn test_virtual_display_read_next_to_driver() {
        if std::env::var_os(DMD_EXT_CONFIG_VAR).is_some() {
            return;
        }
        let dir = temp_dir("dmd_ext");
        fs::write(dir.join(plain_name()), b"").unwrap();
        let binder = DllBinder::new().with_app_dir(&dir);
        // No settings file: not the dmd-extensions driver
        assert!(!binder.virtual_display_active());

        fs::write(dir.join(DMD_EXT_INI), "[virtualdmd]\nenabled = true\n").unwrap();
        assert!(binder.virtual_display_active());
        fs::write(dir.join(DMD_EXT_INI), "[virtualdmd]\nenabled = false\n").unwrap();
        assert!(!binder.virtual_display_active());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_garbage_file_fails_to_load() {
        let dir = temp_dir("garbage");
        let path = dir.join(plain_name());
        fs::write(&path, b"definitely not a shared library").unwrap();
        let result = DllBinder::new().with_driver_path(&path).bind();
        assert!(matches!(result, Err(BindError::Load { .. })));
        fs::remove_dir_all(&dir).unwrap();
    }
}
