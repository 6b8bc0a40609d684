//! Two-stage point-cloud conversion: integrity repair, then viewer conversion.
//!
//! # Design
//! - Stages run strictly in order; a failed repair means convert never runs.
//! - No retries. Re-running a request redoes both stages and overwrites the target.
//! - The pipeline tracks a single degraded flag: set on any failure, cleared on
//!   the next success.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use dronevault_config::ViewerLayout;
use dronevault_core::{AssetId, ConversionOutcome, PipelineStage};
use dronevault_telemetry::{Metrics, current_request_id};
use tracing::{error, info, warn};

use crate::runner::{ToolInvocation, ToolRunner};

/// Health component name reported while conversions are failing.
pub const HEALTH_COMPONENT: &str = "conversion";

const SHARED_TARGET_NAME: &str = "temp";

/// Where a conversion writes its artifact and how the result is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerTarget {
    /// Directory handed to the converter's `-o` option.
    pub output_dir: PathBuf,
    /// Page name handed to `--generate-page`.
    pub page_name: String,
    /// URL of the generated page, returned on success.
    pub viewer_url: String,
}

impl ViewerTarget {
    /// Derive the target for `asset` under `viewer_root` according to `layout`.
    ///
    /// `url_prefix` is the public location of `viewer_root` (for example
    /// `/pointclouds`); the page lives at `<prefix>/<name>/<name>.html`.
    #[must_use]
    pub fn for_asset(
        layout: ViewerLayout,
        viewer_root: &Path,
        url_prefix: &str,
        asset: AssetId,
    ) -> Self {
        let name = match layout {
            ViewerLayout::PerAsset => format!("asset-{asset}"),
            ViewerLayout::Shared => SHARED_TARGET_NAME.to_string(),
        };
        Self {
            output_dir: viewer_root.join(&name),
            viewer_url: format!("{}/{name}/{name}.html", url_prefix.trim_end_matches('/')),
            page_name: name,
        }
    }
}

/// Input to one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    /// Asset being converted, for logs.
    pub asset: AssetId,
    /// Source path exactly as resolved from the catalog.
    pub source_path: PathBuf,
    /// Output location and public URL.
    pub target: ViewerTarget,
}

/// Programs invoked by the two stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPrograms {
    /// Integrity repair program (`lasinfo`).
    pub repair: String,
    /// Viewer converter program (`PotreeConverter`).
    pub convert: String,
}

impl ToolPrograms {
    /// `<repair> -i <source> -repair_bb`
    #[must_use]
    pub fn repair_invocation(&self, source: &Path) -> ToolInvocation {
        ToolInvocation::new(&self.repair)
            .arg("-i")
            .path_arg(source)
            .arg("-repair_bb")
    }

    /// `<convert> <source> -o <output_dir> --generate-page <page_name>`
    #[must_use]
    pub fn convert_invocation(&self, source: &Path, target: &ViewerTarget) -> ToolInvocation {
        ToolInvocation::new(&self.convert)
            .path_arg(source)
            .arg("-o")
            .path_arg(&target.output_dir)
            .arg("--generate-page")
            .arg(target.page_name.as_str())
    }
}

/// Sequential repair-then-convert pipeline.
#[derive(Clone)]
pub struct ConversionPipeline {
    runner: Arc<dyn ToolRunner>,
    programs: ToolPrograms,
    metrics: Metrics,
    degraded: Arc<Mutex<bool>>,
}

impl ConversionPipeline {
    /// Build a pipeline over `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn ToolRunner>, programs: ToolPrograms, metrics: Metrics) -> Self {
        Self {
            runner,
            programs,
            metrics,
            degraded: Arc::new(Mutex::new(false)),
        }
    }

    /// Run both stages for `request`.
    pub async fn convert(&self, request: &ConversionRequest) -> ConversionOutcome {
        info!(
            asset_id = %request.asset,
            output_dir = %request.target.output_dir.display(),
            "conversion started"
        );

        let repair = self.programs.repair_invocation(&request.source_path);
        if let Err(detail) = self.run_stage(PipelineStage::Repair, &repair).await {
            return self.fail(request, PipelineStage::Repair, detail);
        }

        let convert = self
            .programs
            .convert_invocation(&request.source_path, &request.target);
        if let Err(detail) = self.run_stage(PipelineStage::Convert, &convert).await {
            return self.fail(request, PipelineStage::Convert, detail);
        }

        self.mark_recovered();
        info!(
            asset_id = %request.asset,
            viewer_url = %request.target.viewer_url,
            "conversion completed"
        );
        ConversionOutcome::Success {
            viewer_url: request.target.viewer_url.clone(),
        }
    }

    /// `true` while the most recent conversion failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        *self.lock_degraded()
    }

    async fn run_stage(
        &self,
        stage: PipelineStage,
        invocation: &ToolInvocation,
    ) -> Result<(), String> {
        let result = match self.runner.run(invocation).await {
            Ok(output) if output.success => Ok(()),
            Ok(output) => Err(output.diagnostic()),
            Err(err) => Err(err.diagnostic()),
        };
        let status = if result.is_ok() { "completed" } else { "failed" };
        self.metrics.inc_conversion_stage(stage.as_str(), status);
        result
    }

    fn fail(
        &self,
        request: &ConversionRequest,
        stage: PipelineStage,
        detail: String,
    ) -> ConversionOutcome {
        error!(
            asset_id = %request.asset,
            request_id = current_request_id().as_deref().unwrap_or("-"),
            stage = stage.as_str(),
            detail = %detail,
            "conversion failed"
        );
        self.mark_degraded();
        ConversionOutcome::Failure { stage, detail }
    }

    fn mark_degraded(&self) {
        let mut guard = self.lock_degraded();
        if !*guard {
            *guard = true;
            drop(guard);
            warn!(component = HEALTH_COMPONENT, "conversion pipeline degraded");
        }
    }

    fn mark_recovered(&self) {
        let mut guard = self.lock_degraded();
        if std::mem::take(&mut *guard) {
            drop(guard);
            info!(component = HEALTH_COMPONENT, "conversion pipeline recovered");
        }
    }

    fn lock_degraded(&self) -> MutexGuard<'_, bool> {
        match self.degraded.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("conversion health mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::runner::ToolOutput;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;

    type Scripted = Result<ToolOutput, ToolError>;

    struct ScriptedRunner {
        calls: Mutex<Vec<Vec<String>>>,
        replies: Mutex<VecDeque<Scripted>>,
    }

    impl ScriptedRunner {
        fn new(replies: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(replies.into()),
            })
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl ToolRunner for ScriptedRunner {
        async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(invocation.argv());
            }
            self.replies
                .lock()
                .ok()
                .and_then(|mut replies| replies.pop_front())
                .unwrap_or_else(|| Ok(ToolOutput::ok("")))
        }
    }

    fn programs() -> ToolPrograms {
        ToolPrograms {
            repair: "lasinfo".to_string(),
            convert: "PotreeConverter".to_string(),
        }
    }

    fn request(layout: ViewerLayout) -> ConversionRequest {
        ConversionRequest {
            asset: AssetId(42),
            source_path: PathBuf::from("/data/site1/cloud.las"),
            target: ViewerTarget::for_asset(
                layout,
                Path::new("/srv/viewer/pointclouds"),
                "/pointclouds",
                AssetId(42),
            ),
        }
    }

    #[test]
    fn targets_follow_the_layout() {
        let shared = ViewerTarget::for_asset(
            ViewerLayout::Shared,
            Path::new("/srv/viewer"),
            "/pointclouds/",
            AssetId(1),
        );
        assert_eq!(shared.output_dir, PathBuf::from("/srv/viewer/temp"));
        assert_eq!(shared.page_name, "temp");
        assert_eq!(shared.viewer_url, "/pointclouds/temp/temp.html");

        let per_asset = ViewerTarget::for_asset(
            ViewerLayout::PerAsset,
            Path::new("/srv/viewer"),
            "https://viewer.local:3000/pointclouds",
            AssetId(7),
        );
        assert_eq!(per_asset.output_dir, PathBuf::from("/srv/viewer/asset-7"));
        assert_eq!(
            per_asset.viewer_url,
            "https://viewer.local:3000/pointclouds/asset-7/asset-7.html"
        );
    }

    #[tokio::test]
    async fn success_runs_repair_then_convert() -> anyhow::Result<()> {
        let runner = ScriptedRunner::new(Vec::new());
        let pipeline = ConversionPipeline::new(runner.clone(), programs(), Metrics::new()?);
        let outcome = pipeline.convert(&request(ViewerLayout::Shared)).await;

        assert_eq!(
            outcome,
            ConversionOutcome::Success {
                viewer_url: "/pointclouds/temp/temp.html".to_string()
            }
        );
        assert_eq!(
            runner.calls(),
            vec![
                vec!["lasinfo", "-i", "/data/site1/cloud.las", "-repair_bb"],
                vec![
                    "PotreeConverter",
                    "/data/site1/cloud.las",
                    "-o",
                    "/srv/viewer/pointclouds/temp",
                    "--generate-page",
                    "temp"
                ],
            ]
        );
        assert!(!pipeline.is_degraded());
        Ok(())
    }

    #[tokio::test]
    async fn repair_failure_halts_before_convert() -> anyhow::Result<()> {
        let runner = ScriptedRunner::new(vec![Ok(ToolOutput::failed(1, "ERROR: cannot open"))]);
        let pipeline = ConversionPipeline::new(runner.clone(), programs(), Metrics::new()?);
        let outcome = pipeline.convert(&request(ViewerLayout::PerAsset)).await;

        assert_eq!(
            outcome,
            ConversionOutcome::Failure {
                stage: PipelineStage::Repair,
                detail: "ERROR: cannot open".to_string()
            }
        );
        assert_eq!(runner.calls().len(), 1);
        assert!(pipeline.is_degraded());
        Ok(())
    }

    #[tokio::test]
    async fn convert_launch_failure_carries_spawn_text_and_recovers_later() -> anyhow::Result<()> {
        let runner = ScriptedRunner::new(vec![
            Ok(ToolOutput::ok("repaired")),
            Err(ToolError::Spawn {
                program: "PotreeConverter".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "not found"),
            }),
        ]);
        let metrics = Metrics::new()?;
        let pipeline = ConversionPipeline::new(runner.clone(), programs(), metrics.clone());

        let failed = pipeline.convert(&request(ViewerLayout::PerAsset)).await;
        assert!(matches!(
            failed,
            ConversionOutcome::Failure { stage: PipelineStage::Convert, ref detail }
                if detail.starts_with("failed to launch PotreeConverter")
        ));
        assert!(pipeline.is_degraded());

        let retried = pipeline.convert(&request(ViewerLayout::PerAsset)).await;
        assert!(retried.is_success());
        assert!(!pipeline.is_degraded());
        assert_eq!(runner.calls().len(), 4);

        let rendered = metrics.render()?;
        assert!(rendered.contains("conversion_stages_total{stage=\"convert\",status=\"failed\"} 1"));
        assert!(rendered.contains("conversion_stages_total{stage=\"repair\",status=\"completed\"} 2"));
        Ok(())
    }
}
