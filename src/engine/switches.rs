//! Framework to canonical silent switches.

use crate::core::{
    AnalysisWarning, Framework, InstallerImage, SignatureMatch, SwitchSet, SwitchSource,
    WarningKind,
};
use crate::engine::markers::{scan_markers, MarkerHit};
use tracing::{debug, warn};

/// Canonical (install, uninstall) templates per framework.
pub fn canonical_switches(framework: Framework) -> (&'static [&'static str], &'static [&'static str]) {
    match framework {
        Framework::Msi => (&["/qn", "/norestart"], &["/x", "{ProductCode}", "/qn", "/norestart"]),
        Framework::WixBurn => (&["/quiet", "/norestart"], &["/uninstall", "/quiet", "/norestart"]),
        Framework::InnoSetup => (
            &["/VERYSILENT", "/SUPPRESSMSGBOXES", "/NORESTART", "/SP-"],
            &["/VERYSILENT", "/SUPPRESSMSGBOXES", "/NORESTART"],
        ),
        Framework::Nsis => (&["/S"], &["/S"]),
        Framework::InstallShield => (&["/s", "/v\"/qn\""], &["/s", "/x", "/v\"/qn\""]),
        Framework::AdvancedInstaller => (&["/exenoui", "/qn", "/norestart"], &[]),
        Framework::Squirrel => (&["--silent"], &["--uninstall", "-s"]),
        Framework::SetupFactory => (&["/S"], &[]),
        Framework::Wise => (&["/s"], &[]),
        Framework::InstallAware => (&["/s"], &[]),
        Framework::SevenZipSfx => (&["/s"], &[]),
        Framework::IExpress => (&["/Q"], &[]),
        Framework::SfxCab => (&["/quiet"], &[]),
        Framework::DellUpdatePackage => (&["/s"], &[]),
        Framework::HpSoftPaq => (&["-s"], &[]),
        Framework::NvidiaPackage => (&["-s", "-noreboot"], &[]),
        Framework::IntelInstallFramework => (&["-s"], &[]),
    }
}

/// Switch resolution output, including the marker scan which is reported
/// even when no signature matched.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub switch_set: Option<SwitchSet>,
    pub marker: Option<MarkerHit>,
    pub warnings: Vec<AnalysisWarning>,
}

impl Resolution {
    /// Whether later fallbacks (probing, extraction) are still needed.
    pub fn is_usable(&self) -> bool {
        self.switch_set.as_ref().is_some_and(|s| s.is_usable())
    }
}

#[derive(Debug, Clone)]
pub struct SwitchResolver {
    min_string_length: usize,
    silent_disabled_ceiling: f32,
}

impl SwitchResolver {
    pub fn new(min_string_length: usize, silent_disabled_ceiling: f32) -> Self {
        Self {
            min_string_length,
            silent_disabled_ceiling,
        }
    }

    /// Look up the top match's switches and scan for disabled markers.
    pub fn resolve(&self, matches: &[SignatureMatch], image: &InstallerImage) -> Resolution {
        let mut warnings = Vec::new();
        let marker = scan_markers(&image.data, self.min_string_length);

        let mut switch_set = matches.first().map(|top| {
            let (install, uninstall) = canonical_switches(top.framework);
            SwitchSet::from_static(install, uninstall, SwitchSource::Signature, top.confidence)
        });

        if let Some(hit) = &marker {
            warn!(marker = hit.marker, offset = hit.offset, "silent mode disabled marker found");
            warnings.push(AnalysisWarning::new(
                WarningKind::SilentDisabled,
                format!(
                    "installer declares silent mode unavailable (\"{}\" at offset {:#x})",
                    hit.marker, hit.offset
                ),
            ));
            switch_set = switch_set.map(|s| {
                let capped = s.confidence.min(self.silent_disabled_ceiling);
                s.with_confidence(capped)
            });
        }

        debug!(
            phase = "switches",
            resolved = switch_set.is_some(),
            silent_disabled = marker.is_some(),
            "switch resolution complete"
        );
        Resolution {
            switch_set,
            marker,
            warnings,
        }
    }
}
