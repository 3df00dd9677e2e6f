//! DeviceScanner: finds every input device with a scroll wheel.
//!
//! Every device node is opened and its relative-axis capabilities inspected.
//! A device qualifies when it advertises `REL_WHEEL` or `REL_HWHEEL`.
//! Devices that cannot be opened are skipped, never fatal: on a typical
//! desktop several nodes belong to hardware the process has no business
//! reading, and a device may vanish between listing and opening.

use std::path::PathBuf;

use super::platform::{DeviceEnumerator, DeviceError, InputSource};

/// Why a device node did not make it into the scan result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Opening the node was refused.
    PermissionDenied,
    /// Opening the node failed for another reason.
    OpenFailed(String),
    /// The device opened fine but has no wheel.
    NoScrollWheel,
}

/// A device node that was looked at and left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDevice {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Result of [`DeviceScanner::discover`].
pub struct ScanReport<S> {
    /// Opened devices that have a scroll wheel, in path order.
    pub sources: Vec<S>,
    /// Nodes that were left out, with the reason.
    pub skipped: Vec<SkippedDevice>,
    /// Set when the device directory itself could not be listed.
    pub enumeration_error: Option<String>,
}

impl<S> ScanReport<S> {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Enumerates devices through a [`DeviceEnumerator`] and keeps the ones with
/// a scroll wheel.
pub struct DeviceScanner<E> {
    enumerator: E,
}

impl<E: DeviceEnumerator> DeviceScanner<E> {
    pub fn new(enumerator: E) -> Self {
        Self { enumerator }
    }

    /// Opens every device node and returns those with a scroll wheel.
    ///
    /// Never fails: open errors are recorded in [`ScanReport::skipped`], and
    /// a listing error leaves the report empty with
    /// [`ScanReport::enumeration_error`] set.  Deciding that an empty result
    /// is fatal is up to the caller.
    pub fn discover(&self) -> ScanReport<E::Source> {
        let mut report = ScanReport {
            sources: Vec::new(),
            skipped: Vec::new(),
            enumeration_error: None,
        };

        let paths = match self.enumerator.device_paths() {
            Ok(paths) => paths,
            Err(e) => {
                report.enumeration_error = Some(e.to_string());
                return report;
            }
        };

        for path in paths {
            match self.enumerator.open(&path) {
                Ok(source) if source.capabilities().has_scroll_wheel() => {
                    report.sources.push(source);
                }
                Ok(_) => report.skipped.push(SkippedDevice {
                    path,
                    reason: SkipReason::NoScrollWheel,
                }),
                Err(DeviceError::PermissionDenied(_)) => report.skipped.push(SkippedDevice {
                    path,
                    reason: SkipReason::PermissionDenied,
                }),
                Err(e) => report.skipped.push(SkippedDevice {
                    path,
                    reason: SkipReason::OpenFailed(e.to_string()),
                }),
            }
        }

        report
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_devices::mock::{MockDeviceEnumerator, MockInputSource};
    use wheel_core::domain::scroll::{REL_HWHEEL, REL_WHEEL};
    use wheel_core::RelativeAxes;

    const REL_X: u16 = 0x00;
    const REL_Y: u16 = 0x01;

    fn axes(codes: &[u16]) -> RelativeAxes {
        codes.iter().copied().collect()
    }

    #[test]
    fn test_discover_keeps_devices_with_a_wheel() {
        // Arrange
        let enumerator = MockDeviceEnumerator::new()
            .with_device("/dev/input/event0", MockInputSource::new("mouse", axes(&[REL_X, REL_Y, REL_WHEEL])))
            .with_device("/dev/input/event1", MockInputSource::new("tilt", axes(&[REL_HWHEEL])));
        let scanner = DeviceScanner::new(enumerator);

        // Act
        let report = scanner.discover();

        // Assert
        let names: Vec<&str> = report.sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["mouse", "tilt"]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_discover_skips_devices_without_a_wheel() {
        // Arrange
        let enumerator = MockDeviceEnumerator::new()
            .with_device("/dev/input/event0", MockInputSource::new("touchpad", axes(&[REL_X, REL_Y])))
            .with_device("/dev/input/event1", MockInputSource::new("keyboard", RelativeAxes::new()));
        let scanner = DeviceScanner::new(enumerator);

        // Act
        let report = scanner.discover();

        // Assert
        assert!(report.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.iter().all(|s| s.reason == SkipReason::NoScrollWheel));
    }

    #[test]
    fn test_discover_skips_unopenable_devices_without_failing() {
        // Arrange
        let enumerator = MockDeviceEnumerator::new()
            .with_permission_denied("/dev/input/event0")
            .with_open_error("/dev/input/event1", std::io::ErrorKind::Other)
            .with_device("/dev/input/event2", MockInputSource::new("mouse", axes(&[REL_WHEEL])));
        let scanner = DeviceScanner::new(enumerator);

        // Act
        let report = scanner.discover();

        // Assert
        assert_eq!(report.sources.len(), 1);
        assert_eq!(report.skipped[0].path, PathBuf::from("/dev/input/event0"));
        assert_eq!(report.skipped[0].reason, SkipReason::PermissionDenied);
        assert!(matches!(report.skipped[1].reason, SkipReason::OpenFailed(_)));
    }

    #[test]
    fn test_discover_with_unlistable_directory_returns_empty_report() {
        let scanner = DeviceScanner::new(MockDeviceEnumerator::failing_listing());

        let report = scanner.discover();

        assert!(report.is_empty());
        assert!(report.enumeration_error.is_some());
    }

    #[test]
    fn test_discover_closes_rejected_devices() {
        // Arrange
        let touchpad = MockInputSource::new("touchpad", axes(&[REL_X, REL_Y]));
        let handle = touchpad.handle();
        let scanner = DeviceScanner::new(
            MockDeviceEnumerator::new().with_device("/dev/input/event0", touchpad),
        );

        // Act
        let report = scanner.discover();

        // Assert: the rejected device was dropped (closed) exactly once.
        assert!(report.is_empty());
        assert_eq!(handle.close_count(), 1);
    }
}
