use crate::model::ResponsivenessResult;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// A viewport size the sweep lays the page out at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Profiles evaluated by the responsiveness sweep, in order
pub const DEVICE_PROFILES: [DeviceProfile; 4] = [
    DeviceProfile {
        name: "Desktop Large",
        width: 1920,
        height: 1080,
    },
    DeviceProfile {
        name: "Desktop Standard",
        width: 1280,
        height: 800,
    },
    DeviceProfile {
        name: "Tablet",
        width: 768,
        height: 1024,
    },
    DeviceProfile {
        name: "Phone",
        width: 375,
        height: 667,
    },
];

/// Default wait between resizing and measuring
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// In-page script measuring overflow and oversized images
pub const LAYOUT_MEASURE_SCRIPT: &str = r#"(() => {
    const root = document.body || document.documentElement;
    const overflow = root.scrollWidth > window.innerWidth;
    const imagesOversize = Array.from(document.images)
        .some(img => img.naturalWidth > img.clientWidth);
    return { overflow, imagesOversize };
})()"#;

/// Raw measurement returned by [`LAYOUT_MEASURE_SCRIPT`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMeasurement {
    pub overflow: bool,
    pub images_oversize: bool,
}

/// Something that can resize a rendered page and measure its layout
#[async_trait]
pub trait LayoutTarget: Send + Sync {
    async fn resize(&self, profile: &DeviceProfile) -> Result<()>;

    async fn measure(&self) -> Result<LayoutMeasurement>;
}

/// Results of a sweep. `results` is always a prefix of the profile order.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub results: Vec<ResponsivenessResult>,
    pub interrupted: Option<Error>,
}

/// Resize through `profiles` one at a time, waiting `settle` before each
/// measurement. The first failure ends the sweep.
pub async fn sweep<P: LayoutTarget + ?Sized>(
    target: &P,
    profiles: &[DeviceProfile],
    settle: Duration,
) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();

    for profile in profiles {
        let measured = async {
            target.resize(profile).await?;
            tokio::time::sleep(settle).await;
            target.measure().await
        }
        .await;

        match measured {
            Ok(measurement) => {
                tracing::debug!(
                    "{} ({}x{}): overflow={}, images_oversize={}",
                    profile.name,
                    profile.width,
                    profile.height,
                    measurement.overflow,
                    measurement.images_oversize
                );
                outcome.results.push(ResponsivenessResult {
                    viewport_name: profile.name.to_string(),
                    has_horizontal_overflow: measurement.overflow,
                    images_oversize: measurement.images_oversize,
                });
            }
            Err(e) => {
                tracing::warn!("Responsiveness sweep stopped at {}: {}", profile.name, e);
                outcome.interrupted = Some(e);
                break;
            }
        }
    }

    outcome
}
