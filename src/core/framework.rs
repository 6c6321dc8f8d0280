//! Installer framework enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authoring toolchain that produced an installer.
///
/// Closed set: adding a framework means adding a variant here plus rows in
/// the signature rule table and the switch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Framework {
    Msi,
    Nsis,
    InnoSetup,
    InstallShield,
    WixBurn,
    AdvancedInstaller,
    Squirrel,
    SetupFactory,
    Wise,
    InstallAware,
    SevenZipSfx,
    IExpress,
    SfxCab,
    // Vendor overlays wrapped around one of the above
    DellUpdatePackage,
    HpSoftPaq,
    NvidiaPackage,
    IntelInstallFramework,
}

impl Framework {
    pub const ALL: [Framework; 17] = [
        Framework::Msi,
        Framework::Nsis,
        Framework::InnoSetup,
        Framework::InstallShield,
        Framework::WixBurn,
        Framework::AdvancedInstaller,
        Framework::Squirrel,
        Framework::SetupFactory,
        Framework::Wise,
        Framework::InstallAware,
        Framework::SevenZipSfx,
        Framework::IExpress,
        Framework::SfxCab,
        Framework::DellUpdatePackage,
        Framework::HpSoftPaq,
        Framework::NvidiaPackage,
        Framework::IntelInstallFramework,
    ];

    /// Name reported as `installer_type`.
    pub fn display_name(self) -> &'static str {
        match self {
            Framework::Msi => "MSI",
            Framework::Nsis => "NSIS",
            Framework::InnoSetup => "Inno Setup",
            Framework::InstallShield => "InstallShield",
            Framework::WixBurn => "WiX Burn",
            Framework::AdvancedInstaller => "Advanced Installer",
            Framework::Squirrel => "Squirrel",
            Framework::SetupFactory => "Setup Factory",
            Framework::Wise => "Wise",
            Framework::InstallAware => "InstallAware",
            Framework::SevenZipSfx => "7-Zip SFX",
            Framework::IExpress => "IExpress",
            Framework::SfxCab => "SFXCAB",
            Framework::DellUpdatePackage => "Dell Update Package",
            Framework::HpSoftPaq => "HP SoftPaq",
            Framework::NvidiaPackage => "NVIDIA Package",
            Framework::IntelInstallFramework => "Intel Installation Framework",
        }
    }

    /// Vendor-specific wrappers, which carry more precise switches than the
    /// framework they wrap.
    pub fn is_vendor_overlay(self) -> bool {
        matches!(
            self,
            Framework::DellUpdatePackage
                | Framework::HpSoftPaq
                | Framework::NvidiaPackage
                | Framework::IntelInstallFramework
        )
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
