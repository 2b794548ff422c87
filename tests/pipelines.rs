use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use tempfile::{tempdir, TempDir};

use imputation_pipelines::config::defs::{Pipeline, PipelineError, RunConfig, MOLGENIS_COMPUTE_SH};
use imputation_pipelines::pipelines::run_action;
use imputation_pipelines::utils::reference::ReferenceRegistry;
use imputation_pipelines::{Arguments, Backend};

const RUN_ID: &str = "1234abcd";

fn touch(dir: &Path, names: &[&str]) -> Result<()> {
    fs::create_dir_all(dir)?;
    for name in names {
        fs::write(dir.join(name), "")?;
    }
    Ok(())
}

// Records its arguments in the working directory and leaves a submit.sh that
// touches `submitted` in the run directory.
const FAKE_GENERATOR: &str = r#"echo "$@" > generator_args.txt
while [ $# -gt 0 ]; do
  if [ "$1" = "--rundir" ]; then rundir="$2"; fi
  shift
done
echo 'touch submitted' > "$rundir/submit.sh"
"#;

fn install_fake_generator(root: &Path) -> Result<()> {
    let script = root.join(MOLGENIS_COMPUTE_SH);
    if let Some(dir) = script.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(script, FAKE_GENERATOR)?;
    Ok(())
}

fn run_config(root: &TempDir, args: Arguments) -> RunConfig {
    RunConfig {
        cwd: root.path().to_path_buf(),
        tools_dir: root.path().join("tools"),
        reference_dir: root.path().join("reference"),
        run_id: RUN_ID.to_string(),
        args: Arguments {
            study: Some("study".to_string()),
            output: Some("out".to_string()),
            no_submit: true,
            backend: Backend::Local,
            ..args
        },
    }
}

fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect())
}

#[tokio::test]
async fn test_liftover_generates_worksheets() -> Result<()> {
    let root = tempdir()?;
    touch(&root.path().join("study"), &["chr1.ped", "chr1.map", "chr22.ped", "chr22.map", "notes.txt"])?;
    install_fake_generator(root.path())?;
    let config = run_config(&root, Arguments::default());
    let mut registry = ReferenceRegistry::new(&config.reference_dir);

    let worksheet = run_action(&config, &mut registry, Pipeline::Liftover).await?;

    let generated = root.path().join("generated").join(format!("liftover_{}", RUN_ID));
    assert_eq!(worksheet, generated.join(format!("worksheet_{}.csv", RUN_ID)));
    assert!(root.path().join("out").is_dir());

    let rows = read_rows(&worksheet)?;
    assert_eq!(rows[0], vec!["study", "studyInputDir", "liftOverChainFile", "outputFolder", "chr"]);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1][0], RUN_ID);
    assert_eq!(rows[1][4], "1");
    assert_eq!(rows[2][4], "22");
    assert_eq!(rows[2][3], root.path().join("out").display().to_string());

    let root_csv = generated.join(format!("root_{}.csv", RUN_ID));
    let root_sheet = fs::read_to_string(&root_csv)?;
    assert_eq!(root_sheet, format!("root\n{}\n", root.path().display()));

    let recorded = fs::read_to_string(root.path().join("generator_args.txt"))?;
    let expected_tail = format!(
        "{} {} --rundir {} --backend local --database none",
        worksheet.display(),
        root_csv.display(),
        generated.display()
    );
    assert!(recorded.trim_end().ends_with(&expected_tail), "generator got: {}", recorded);
    assert!(recorded.contains("molgenis-pipelines-master/compute5/Liftover_genome_build_PEDMAP"));
    // --no-submit
    assert!(generated.join("submit.sh").is_file());
    assert!(!generated.join("submitted").exists());
    Ok(())
}

#[tokio::test]
async fn test_phase_submits_generated_scripts() -> Result<()> {
    let root = tempdir()?;
    touch(&root.path().join("study"), &["chr2.bed", "chr2.bim", "chr2.fam"])?;
    install_fake_generator(root.path())?;
    let mut config = run_config(&root, Arguments::default());
    config.args.no_submit = false;
    let mut registry = ReferenceRegistry::new(&config.reference_dir);

    run_action(&config, &mut registry, Pipeline::Phase).await?;

    let generated = root.path().join("generated").join(format!("phase_{}", RUN_ID));
    assert!(root.path().join("generator_args.txt").is_file());
    assert!(generated.join("submitted").is_file());
    Ok(())
}

#[tokio::test]
async fn test_phase_reports_missing_study() -> Result<()> {
    let root = tempdir()?;
    let config = run_config(&root, Arguments::default());
    let mut registry = ReferenceRegistry::new(&config.reference_dir);

    let err = run_action(&config, &mut registry, Pipeline::Phase).await.unwrap_err();
    assert!(matches!(err, PipelineError::FileNotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_impute_with_custom_panel() -> Result<()> {
    let root = tempdir()?;
    let study = root.path().join("study");
    fs::create_dir_all(&study)?;
    // three samples: 5 leading columns and 6 alleles
    fs::write(study.join("chr22.haps"), "22 rs1 16050075 A G 0 0 1 0 0 1\n")?;
    touch(
        &root.path().join("reference").join("hrc"),
        &["chr22.hrc.vcf.gz", "chr22.hrc.haps.gz", "chr22.hrc.legend.gz"],
    )?;
    install_fake_generator(root.path())?;

    let config = run_config(
        &root,
        Arguments {
            reference: Some("hrc".to_string()),
            sample_batch_size: 500,
            position_batch_size: 5_000_000,
            additional_impute2_parameters: " ".to_string(),
            ..Default::default()
        },
    );
    let mut registry = ReferenceRegistry::new(&config.reference_dir);
    assert_eq!(registry.add_custom_panels()?, vec!["hrc".to_string()]);

    let worksheet = run_action(&config, &mut registry, Pipeline::Impute).await?;
    let rows = read_rows(&worksheet)?;

    // chr22 is 51,304,566 bp long: 11 windows of 5 Mb, a single sample batch
    assert_eq!(rows.len(), 12);
    assert_eq!(rows[0][1], "knownHapsG");
    let first = &rows[1];
    assert_eq!(first[1], study.join("chr22.haps").display().to_string());
    assert_eq!(
        first[5],
        root.path().join("reference/hrc/chr22.hrc").display().to_string()
    );
    assert_eq!(first[9..], ["1", "5000000", "1", "3", "1"]);
    assert_eq!(rows[11][9], "50000001");
    assert_eq!(rows[11][10], "55000000");
    Ok(())
}

#[tokio::test]
async fn test_impute_requires_reference() -> Result<()> {
    let root = tempdir()?;
    touch(&root.path().join("study"), &["chr1.haps"])?;
    let config = run_config(&root, Arguments::default());
    let mut registry = ReferenceRegistry::new(&config.reference_dir);

    let err = run_action(&config, &mut registry, Pipeline::Impute).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfig(_)));

    let config = run_config(&root, Arguments { reference: Some("hapmap".to_string()), ..Default::default() });
    let err = run_action(&config, &mut registry, Pipeline::Impute).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnknownReferencePanel { .. }));
    Ok(())
}

#[test]
fn test_unknown_action() {
    assert_eq!(Pipeline::from_str("phase").ok(), Some(Pipeline::Phase));
    assert!(matches!(Pipeline::from_str("assemble"), Err(PipelineError::UnknownAction(_))));
}
