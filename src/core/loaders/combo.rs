// ─── Combo Install ───
// Installs an ordered plan of base loaders and addons into one composite
// version. A failing step aborts the rest; finished steps stay on disk.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use super::context::{AddonInstallContext, BaseInstallContext};
use super::installer::{LoaderRegistry, LoaderType, ModLoaderSelection};
use crate::core::error::{CoreError, CoreResult};
use crate::core::progress::ProgressReporter;

/// Share of the progress budget given to base loaders when addons exist.
const BASE_PROGRESS_SHARE: f64 = 80.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ComboOutcome {
    /// Version directory the combo ended up in.
    pub version_id: String,
    /// Loaders installed, in install order.
    pub installed: Vec<LoaderType>,
}

pub struct MultiLoaderInstallOrchestrator {
    registry: Arc<LoaderRegistry>,
}

impl MultiLoaderInstallOrchestrator {
    pub fn new(registry: Arc<LoaderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &LoaderRegistry {
        &self.registry
    }

    /// Deterministic id for an ordered plan, e.g.
    /// `forge-1.20.1-49.0.3-optifine-HD_U_I5`.
    pub fn composite_version_id(
        minecraft_version_id: &str,
        ordered: &[ModLoaderSelection],
        custom_version_name: Option<&str>,
    ) -> String {
        if let Some(name) = custom_version_name.filter(|n| !n.is_empty()) {
            return name.to_string();
        }

        ordered
            .iter()
            .enumerate()
            .map(|(i, selection)| {
                let version = selection.version.replace(':', "_");
                if i == 0 {
                    format!("{}-{}-{}", selection.loader_type, minecraft_version_id, version)
                } else {
                    format!("{}-{}", selection.loader_type, version)
                }
            })
            .collect::<Vec<_>>()
            .join("-")
    }

    pub async fn install_combo(
        &self,
        minecraft_version_id: &str,
        selections: &[ModLoaderSelection],
        local_dir: &Path,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
        custom_version_name: Option<&str>,
    ) -> CoreResult<ComboOutcome> {
        if selections.is_empty() {
            return Err(CoreError::NoSelections);
        }

        let mut ordered = selections.to_vec();
        ordered.sort_by_key(|s| s.install_order);
        self.registry.validate(&ordered)?;

        let version_id =
            Self::composite_version_id(minecraft_version_id, &ordered, custom_version_name);
        let span = info_span!("combo_install", session = %Uuid::new_v4(), version = %version_id);

        self.run_plan(minecraft_version_id, &ordered, &version_id, local_dir, progress, cancel)
            .instrument(span)
            .await
    }

    async fn run_plan(
        &self,
        minecraft_version_id: &str,
        ordered: &[ModLoaderSelection],
        version_id: &str,
        local_dir: &Path,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> CoreResult<ComboOutcome> {
        let slices = progress_slices(ordered);
        info!(
            "Installing {} loader(s) for Minecraft {}",
            ordered.len(),
            minecraft_version_id
        );

        // Only base loaders create or extend a version directory.
        let mut current_version: Option<String> = None;
        let mut installed = Vec::with_capacity(ordered.len());
        let mut completed = Vec::with_capacity(ordered.len());

        for (selection, (start, end)) in ordered.iter().zip(slices) {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }

            let step = format!("{}-{}", selection.loader_type, selection.version);
            let sub_progress = progress.scoped(start, end);
            info!("Combo step {}: {:.0}%..{:.0}%", step, start, end);

            let outcome = if selection.is_addon {
                let target = current_version
                    .clone()
                    .unwrap_or_else(|| minecraft_version_id.to_string());
                let installer = self.registry.addon(selection.loader_type)?;
                let result = installer
                    .install_addon(AddonInstallContext {
                        minecraft_version: minecraft_version_id,
                        addon_version: &selection.version,
                        game_dir: local_dir,
                        target_version: &target,
                        progress: &sub_progress,
                        cancel,
                    })
                    .await;
                result.map(|()| None)
            } else {
                let installer = self.registry.base(selection.loader_type)?;
                let (custom_version_name, existing_version) = match &current_version {
                    None => (Some(version_id), None),
                    Some(existing) => (None, Some(existing.as_str())),
                };
                let result = installer
                    .install(BaseInstallContext {
                        minecraft_version: minecraft_version_id,
                        loader_version: &selection.version,
                        game_dir: local_dir,
                        custom_version_name,
                        existing_version,
                        progress: &sub_progress,
                        cancel,
                    })
                    .await;
                result.map(Some)
            };

            match outcome {
                Ok(written) => {
                    if let Some(written) = written {
                        current_version = Some(written);
                    }
                    installed.push(selection.loader_type);
                    completed.push(step);
                    sub_progress.report(100.0);
                }
                Err(CoreError::Cancelled) => {
                    info!("Combo install cancelled during {}", step);
                    return Err(CoreError::Cancelled);
                }
                Err(e) => {
                    error!(
                        "Combo install aborted at {}: {}. Completed steps left on disk: {:?}",
                        step, e, completed
                    );
                    return Err(CoreError::ComboAborted {
                        loader: step,
                        completed,
                        source: Box::new(e),
                    });
                }
            }
        }

        progress.report(100.0);
        let version_id = current_version.unwrap_or_else(|| minecraft_version_id.to_string());
        info!("Combo install finished: {}", version_id);
        Ok(ComboOutcome {
            version_id,
            installed,
        })
    }
}

/// `[start, end)` slice of 0–100 for each selection, laid out back to back
/// in install order. Base loaders share 80% and addons 20%; a category with
/// no members yields its share to the other.
fn progress_slices(ordered: &[ModLoaderSelection]) -> Vec<(f64, f64)> {
    let base_count = ordered.iter().filter(|s| !s.is_addon).count();
    let addon_count = ordered.len() - base_count;

    let base_share = match (base_count, addon_count) {
        (_, 0) => 100.0,
        (0, _) => 0.0,
        _ => BASE_PROGRESS_SHARE,
    };
    let addon_share = 100.0 - base_share;

    let mut cursor = 0.0;
    ordered
        .iter()
        .map(|selection| {
            let width = if selection.is_addon {
                addon_share / addon_count as f64
            } else {
                base_share / base_count as f64
            };
            let slice = (cursor, cursor + width);
            cursor += width;
            slice
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_id_joins_steps_and_sanitises_colons() {
        let ordered = vec![
            ModLoaderSelection::base(LoaderType::Forge, "49.0.3", 0),
            ModLoaderSelection::addon(LoaderType::OptiFine, "HD_U:I5", 1),
        ];
        assert_eq!(
            MultiLoaderInstallOrchestrator::composite_version_id("1.20.1", &ordered, None),
            "forge-1.20.1-49.0.3-optifine-HD_U_I5"
        );
        assert_eq!(
            MultiLoaderInstallOrchestrator::composite_version_id("1.20.1", &ordered, Some("My Pack")),
            "My Pack"
        );
    }

    #[test]
    fn slices_split_eighty_twenty() {
        let ordered = vec![
            ModLoaderSelection::base(LoaderType::Forge, "49.0.3", 0),
            ModLoaderSelection::base(LoaderType::Fabric, "0.15.0", 1),
            ModLoaderSelection::addon(LoaderType::OptiFine, "HD_U:I5", 2),
        ];
        assert_eq!(
            progress_slices(&ordered),
            vec![(0.0, 40.0), (40.0, 80.0), (80.0, 100.0)]
        );
    }

    #[test]
    fn single_category_takes_full_budget() {
        let addons = vec![
            ModLoaderSelection::addon(LoaderType::OptiFine, "HD_U:I5", 0),
            ModLoaderSelection::addon(LoaderType::LiteLoader, "1.12.2", 1),
        ];
        assert_eq!(progress_slices(&addons), vec![(0.0, 50.0), (50.0, 100.0)]);

        let bases = vec![ModLoaderSelection::base(LoaderType::Fabric, "0.15.0", 0)];
        assert_eq!(progress_slices(&bases), vec![(0.0, 100.0)]);
    }

    #[test]
    fn slices_follow_install_order_when_addon_runs_first() {
        let ordered = vec![
            ModLoaderSelection::addon(LoaderType::OptiFine, "HD_U:I5", 0),
            ModLoaderSelection::base(LoaderType::Forge, "49.0.3", 1),
        ];
        assert_eq!(progress_slices(&ordered), vec![(0.0, 20.0), (20.0, 100.0)]);
    }

    #[tokio::test]
    async fn empty_plan_fails_before_any_work() {
        let orchestrator = MultiLoaderInstallOrchestrator::new(Arc::new(LoaderRegistry::new()));
        let err = orchestrator
            .install_combo(
                "1.20.1",
                &[],
                Path::new("/nonexistent"),
                &ProgressReporter::silent(),
                &CancellationToken::new(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NoSelections));
    }
}
