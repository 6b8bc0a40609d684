use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use dronevault_config::ViewerLayout;
use dronevault_core::{AssetId, ConversionOutcome, PipelineStage};
use dronevault_fsops::{
    ConversionPipeline, ConversionRequest, ConversionWorker, ToolPrograms, ViewerTarget,
};
use dronevault_telemetry::Metrics;
use dronevault_test_support::{RecordingToolRunner, ScriptedReply, SurveyTree};

fn programs() -> ToolPrograms {
    ToolPrograms {
        repair: "lasinfo".into(),
        convert: "PotreeConverter".into(),
    }
}

fn request(tree: &SurveyTree, layout: ViewerLayout, asset: i64) -> ConversionRequest {
    ConversionRequest {
        asset: AssetId(asset),
        source_path: tree.download_root().join(format!("site1/cloud-{asset}.las")),
        target: ViewerTarget::for_asset(layout, &tree.viewer_root(), "/pointclouds", AssetId(asset)),
    }
}

#[tokio::test]
async fn worker_runs_repair_then_convert_with_exact_arguments() -> Result<()> {
    let tree = SurveyTree::new()?;
    let runner = RecordingToolRunner::new();
    let metrics = Metrics::new()?;
    let pipeline = ConversionPipeline::new(Arc::new(runner.clone()), programs(), metrics.clone());
    let worker = ConversionWorker::new(pipeline, 2, metrics);

    let request = request(&tree, ViewerLayout::PerAsset, 42);
    let outcome = worker.submit(request.clone()).await?;
    assert_eq!(
        outcome,
        ConversionOutcome::Success {
            viewer_url: "/pointclouds/asset-42/asset-42.html".into()
        }
    );

    let source = request.source_path.display().to_string();
    let output = tree.viewer_root().join("asset-42").display().to_string();
    assert_eq!(
        runner.argv(),
        vec![
            vec!["lasinfo".to_string(), "-i".into(), source.clone(), "-repair_bb".into()],
            vec![
                "PotreeConverter".to_string(),
                source,
                "-o".into(),
                output,
                "--generate-page".into(),
                "asset-42".into(),
            ],
        ]
    );
    assert!(!worker.is_degraded());
    Ok(())
}

#[tokio::test]
async fn failed_repair_skips_conversion_and_degrades_until_next_success() -> Result<()> {
    let tree = SurveyTree::new()?;
    let runner = RecordingToolRunner::new().with_reply(
        "lasinfo",
        ScriptedReply::Fail {
            code: 1,
            stderr: "ERROR: corrupt LAS header".into(),
        },
    );
    let metrics = Metrics::new()?;
    let pipeline = ConversionPipeline::new(Arc::new(runner.clone()), programs(), metrics.clone());
    let worker = ConversionWorker::new(pipeline, 1, metrics);

    let failed = worker
        .submit(request(&tree, ViewerLayout::Shared, 1))
        .await?;
    assert_eq!(
        failed,
        ConversionOutcome::Failure {
            stage: PipelineStage::Repair,
            detail: "ERROR: corrupt LAS header".into(),
        }
    );
    assert_eq!(runner.programs(), vec!["lasinfo"]);
    assert!(worker.is_degraded());

    let recovered = worker
        .submit(request(&tree, ViewerLayout::Shared, 2))
        .await?;
    assert_eq!(
        recovered,
        ConversionOutcome::Success {
            viewer_url: "/pointclouds/temp/temp.html".into()
        }
    );
    assert!(!worker.is_degraded());
    Ok(())
}

#[tokio::test]
async fn missing_converter_is_reported_as_a_convert_failure() -> Result<()> {
    let tree = SurveyTree::new()?;
    let runner = RecordingToolRunner::new().with_reply("PotreeConverter", ScriptedReply::Missing);
    let metrics = Metrics::new()?;
    let pipeline = ConversionPipeline::new(Arc::new(runner), programs(), metrics);

    let outcome = pipeline
        .convert(&request(&tree, ViewerLayout::PerAsset, 3))
        .await;
    match outcome {
        ConversionOutcome::Failure { stage, detail } => {
            assert_eq!(stage, PipelineStage::Convert);
            assert!(detail.starts_with("failed to launch PotreeConverter"), "{detail}");
        }
        ConversionOutcome::Success { .. } => anyhow::bail!("conversion should fail"),
    }
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn process_runner_drives_real_scripts() -> Result<()> {
    use dronevault_fsops::ProcessToolRunner;
    use dronevault_test_support::fixtures::fake_tool;
    use std::time::Duration;

    let tree = SurveyTree::new()?;
    let source = tree.add_file("site1/cloud.las", b"LASF")?;
    let bin = tree.outside().join("bin");
    let repair = fake_tool(&bin, "lasinfo", r#"test -f "$2""#)?;
    // Mimic the converter: create the output directory and the named page.
    let convert = fake_tool(
        &bin,
        "PotreeConverter",
        r#"mkdir -p "$3" && touch "$3/$5.html""#,
    )?;

    let metrics = Metrics::new()?;
    let pipeline = ConversionPipeline::new(
        Arc::new(ProcessToolRunner::new(Duration::from_secs(10))),
        ToolPrograms {
            repair: repair.display().to_string(),
            convert: convert.display().to_string(),
        },
        metrics,
    );

    let target = ViewerTarget::for_asset(
        ViewerLayout::PerAsset,
        &tree.viewer_root(),
        "/pointclouds",
        AssetId(8),
    );
    let outcome = pipeline
        .convert(&ConversionRequest {
            asset: AssetId(8),
            source_path: source,
            target: target.clone(),
        })
        .await;
    assert!(outcome.is_success());
    assert!(Path::new(&target.output_dir).join("asset-8.html").is_file());
    Ok(())
}
