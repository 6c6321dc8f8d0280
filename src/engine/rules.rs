//! Installer signature rule table.
//!
//! Order matters: when two rules of equal specificity fire, the one declared
//! first wins. Vendor overlay rules carry higher specificity than the
//! generic framework they wrap.

use crate::core::Framework;

/// What a rule looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Fixed bytes at a fixed file offset
    Magic {
        offset: usize,
        bytes: &'static [u8],
    },
    /// Text anywhere in the scan window or overlay head, ASCII or UTF-16LE
    Substring(&'static str),
    /// Compound document whose summary information marks an installer package
    CompoundInstaller,
    /// PE section with this exact name
    PeSection(&'static str),
    /// PE version resource value, compared case-insensitively
    VersionValue {
        key: &'static str,
        value: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureRule {
    pub name: &'static str,
    pub framework: Framework,
    pub kind: RuleKind,
    pub specificity: u8,
    pub confidence: f32,
}

const fn rule(
    name: &'static str,
    framework: Framework,
    kind: RuleKind,
    specificity: u8,
    confidence: f32,
) -> SignatureRule {
    SignatureRule {
        name,
        framework,
        kind,
        specificity,
        confidence,
    }
}

use Framework::*;
use RuleKind::*;

pub static RULES: &[SignatureRule] = &[
    // Vendor overlays
    rule("dell-update-package", DellUpdatePackage, Substring("Dell Update Package"), 90, 0.9),
    rule("nvidia-package-launcher", NvidiaPackage, Substring("NVIDIA Package Launcher"), 90, 0.9),
    rule("hp-softpaq", HpSoftPaq, Substring("SoftPaq"), 85, 0.85),
    rule(
        "intel-installation-framework",
        IntelInstallFramework,
        Substring("Intel(R) Installation Framework"),
        85,
        0.85,
    ),
    // Structured containers
    rule("wix-burn-section", WixBurn, PeSection(".wixburn"), 60, 0.95),
    rule("msi-compound-installer", Msi, CompoundInstaller, 50, 1.0),
    rule("inno-loader-header", InnoSetup, Magic { offset: 0x30, bytes: b"Inno" }, 55, 0.9),
    rule("inno-setup-data", InnoSetup, Substring("Inno Setup Setup Data"), 50, 0.95),
    rule("nsis-first-header", Nsis, Substring("NullsoftInst"), 50, 0.95),
    rule("installshield-stream", InstallShield, Substring("ISSetupStream"), 50, 0.9),
    // Version resource identities
    rule(
        "installshield-launcher",
        InstallShield,
        VersionValue { key: "InternalName", value: "setup launcher" },
        45,
        0.85,
    ),
    rule("7zip-sfx", SevenZipSfx, VersionValue { key: "InternalName", value: "7zs.sfx" }, 45, 0.85),
    rule("7zip-sfx-gui", SevenZipSfx, VersionValue { key: "InternalName", value: "7z.sfx" }, 45, 0.85),
    rule(
        "7zip-sfx-installer",
        SevenZipSfx,
        VersionValue { key: "InternalName", value: "7zsd.sfx" },
        45,
        0.85,
    ),
    rule("iexpress-wextract", IExpress, VersionValue { key: "InternalName", value: "wextract" }, 45, 0.85),
    rule("sfxcab", SfxCab, VersionValue { key: "InternalName", value: "sfxcab.exe" }, 45, 0.85),
    // Loose text markers
    rule("nsis-branding", Nsis, Substring("Nullsoft Install System"), 40, 0.85),
    rule("advanced-installer", AdvancedInstaller, Substring("Advanced Installer"), 40, 0.85),
    rule("squirrel-setup", Squirrel, Substring("SquirrelSetup"), 40, 0.8),
    rule("wise-main", Wise, Substring("WiseMain"), 40, 0.8),
    rule("setup-factory", SetupFactory, Substring("Setup Factory"), 35, 0.75),
    rule("installaware", InstallAware, Substring("InstallAware"), 35, 0.75),
    rule("installshield-branding", InstallShield, Substring("InstallShield"), 30, 0.7),
];
