//! Product metadata extraction, dispatched on container shape.

use crate::core::{
    AnalysisWarning, Architecture, ContainerShape, InstallerImage, Metadata, PackageIdentifiers,
    WarningKind,
};
use crate::formats::msi::MsiInfo;
use crate::error::UnattendError;
use crate::formats::pe::PeView;
use tracing::debug;

/// Metadata plus the warnings raised while reading it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataOutcome {
    pub metadata: Metadata,
    pub warnings: Vec<AnalysisWarning>,
}

impl MetadataOutcome {
    fn incomplete(metadata: Metadata, reason: impl Into<String>) -> Self {
        Self {
            metadata: Metadata {
                complete: false,
                ..metadata
            },
            warnings: vec![AnalysisWarning::new(WarningKind::MetadataIncomplete, reason)],
        }
    }
}

/// Read product metadata. Never fails: problems degrade to incomplete
/// metadata and a warning.
pub fn extract_metadata(image: &InstallerImage) -> MetadataOutcome {
    let outcome = match image.shape {
        ContainerShape::CompoundDocument => match &image.msi {
            Some(Ok(info)) => from_msi(info),
            Some(Err(e)) => MetadataOutcome::incomplete(
                Metadata::default(),
                format!("package could not be opened: {e}"),
            ),
            None => MetadataOutcome::incomplete(Metadata::default(), "package not parsed"),
        },
        ContainerShape::PortableExecutable => match &image.pe {
            Some(Ok(view)) => from_pe(view),
            Some(Err(e)) => MetadataOutcome::incomplete(
                Metadata::default(),
                format!("PE headers: {}", UnattendError::from(e.clone())),
            ),
            None => MetadataOutcome::incomplete(Metadata::default(), "PE not parsed"),
        },
        ContainerShape::Zip | ContainerShape::Unknown => MetadataOutcome::incomplete(
            Metadata::default(),
            "no metadata table in this container",
        ),
    };
    debug!(
        phase = "metadata",
        complete = outcome.metadata.complete,
        product = ?outcome.metadata.product_name,
        "metadata extraction complete"
    );
    outcome
}

fn from_msi(info: &MsiInfo) -> MetadataOutcome {
    let product_code = info.property("ProductCode").map(str::to_owned);
    let upgrade_code = info.property("UpgradeCode").map(str::to_owned);
    let ids = PackageIdentifiers {
        product_code,
        upgrade_code,
        package_code: info.package_code.clone(),
    };
    let metadata = Metadata {
        product_name: info
            .property("ProductName")
            .map(str::to_owned)
            .or_else(|| info.subject.clone()),
        product_version: info.property("ProductVersion").map(str::to_owned),
        manufacturer: info
            .property("Manufacturer")
            .map(str::to_owned)
            .or_else(|| info.author.clone()),
        architecture: info
            .arch
            .as_deref()
            .and_then(Architecture::from_msi_platform),
        package_identifiers: (!ids.is_empty()).then_some(ids),
        complete: true,
    };

    match &info.properties {
        Ok(_) => MetadataOutcome {
            metadata,
            warnings: Vec::new(),
        },
        Err(e) => MetadataOutcome::incomplete(metadata, format!("Property table: {e}")),
    }
}

fn from_pe(view: &PeView) -> MetadataOutcome {
    let mut metadata = Metadata {
        architecture: Architecture::from_pe_machine(view.machine),
        ..Metadata::default()
    };

    match &view.version_info {
        Some(Ok(version)) => {
            metadata.product_name = version.get("ProductName").map(str::to_owned);
            metadata.product_version = version
                .get("ProductVersion")
                .or_else(|| version.get("FileVersion"))
                .map(str::to_owned)
                .or_else(|| version.fixed.map(|f| f.product_version_string()));
            metadata.manufacturer = version.get("CompanyName").map(str::to_owned);
            metadata.complete = true;
            MetadataOutcome {
                metadata,
                warnings: Vec::new(),
            }
        }
        Some(Err(e)) => MetadataOutcome::incomplete(
            metadata,
            format!("version resource: {}", UnattendError::from(e.clone())),
        ),
        None => MetadataOutcome::incomplete(metadata, "no version resource"),
    }
}
