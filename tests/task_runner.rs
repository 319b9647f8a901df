#![cfg(unix)]

use std::path::Path;

use petbrainprep::adapters::{Invocation, StderrPolicy};
use petbrainprep::errors::FailureReason;
use petbrainprep::exec::execute_invocation;
use petbrainprep_test_utils::with_timeout;

fn sh(script: &str, dir: &Path) -> Invocation {
    let mut inv = Invocation::new("sh", dir);
    inv.arg("-c").arg(script);
    inv
}

#[tokio::test]
async fn success_returns_declared_outputs() {
    let tmp = tempfile::tempdir().unwrap();
    let node_dir = tmp.path().join("crop_image");
    let mut inv = sh("echo cropping; printf data > out.nii.gz", &node_dir);
    inv.output("out_file", node_dir.join("out.nii.gz"));

    let outputs = with_timeout(execute_invocation("crop_image", &inv)).await.unwrap();

    assert_eq!(outputs["out_file"], node_dir.join("out.nii.gz"));
    assert_eq!(std::fs::read_to_string(&outputs["out_file"]).unwrap(), "data");
}

#[tokio::test]
async fn non_zero_exit_carries_both_streams() {
    let tmp = tempfile::tempdir().unwrap();
    let inv = sh("echo loading; echo 'model not found' >&2; exit 3", tmp.path());

    let failure = with_timeout(execute_invocation("skull_strip", &inv)).await.unwrap_err();

    assert_eq!(failure.reason, FailureReason::NonZeroExit(3));
    assert_eq!(failure.stdout, "loading\n");
    assert_eq!(failure.stderr, "model not found\n");
    assert!(failure.command_line.starts_with("sh -c"));
}

#[tokio::test]
async fn missing_input_prevents_the_spawn() {
    let tmp = tempfile::tempdir().unwrap();
    let marker = tmp.path().join("spawned");
    let mut inv = sh(&format!("touch {}", marker.display()), tmp.path());
    let absent = tmp.path().join("absent.nii.gz");
    inv.input(&absent);

    let failure = with_timeout(execute_invocation("crop_image", &inv)).await.unwrap_err();

    assert_eq!(failure.reason, FailureReason::MissingInput(absent));
    assert!(!marker.exists());
}

#[tokio::test]
async fn clean_exit_without_output_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let mut inv = sh("true", tmp.path());
    let expected = tmp.path().join("warped.nii.gz");
    inv.output("warped_image", expected.clone());

    let failure = with_timeout(execute_invocation("coreg_first_pass", &inv)).await.unwrap_err();

    assert_eq!(
        failure.reason,
        FailureReason::MissingOutput {
            slot: "warped_image".into(),
            path: expected,
        }
    );
}

#[tokio::test]
async fn strict_stderr_policy_fails_on_any_stderr() {
    let tmp = tempfile::tempdir().unwrap();
    let script = "printf x > out.nii.gz; echo 'docker: image not found' >&2";

    let mut lenient = sh(script, tmp.path());
    lenient.output("out_file", tmp.path().join("out.nii.gz"));
    assert!(with_timeout(execute_invocation("skull_strip", &lenient)).await.is_ok());

    let mut strict = lenient.clone();
    strict.stderr_policy = StderrPolicy::Fail;
    let failure = with_timeout(execute_invocation("skull_strip", &strict)).await.unwrap_err();
    assert_eq!(failure.reason, FailureReason::StderrNotEmpty);
    assert!(failure.stderr.contains("image not found"));
}

#[tokio::test]
async fn environment_reaches_the_tool() {
    let tmp = tempfile::tempdir().unwrap();
    let mut inv = sh("printf \"$FSLOUTPUTTYPE\" > env.txt", tmp.path());
    inv.env("FSLOUTPUTTYPE", "NIFTI_GZ")
        .output("env", tmp.path().join("env.txt"));

    with_timeout(execute_invocation("fwhm_smoothing", &inv)).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("env.txt")).unwrap(),
        "NIFTI_GZ"
    );
}

#[tokio::test]
async fn unknown_program_is_a_spawn_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let inv = Invocation::new("petbrainprep-no-such-tool", tmp.path());

    let failure = with_timeout(execute_invocation("crop_image", &inv)).await.unwrap_err();
    assert!(matches!(failure.reason, FailureReason::Spawn(_)));
}

#[tokio::test]
async fn non_utf8_stderr_is_captured_and_fails_strict_tools() {
    let tmp = tempfile::tempdir().unwrap();
    let script = "printf x > out.nii.gz; printf '\\377 cannot read input\\nstill here\\n' >&2";
    let mut inv = sh(script, tmp.path());
    inv.output("out_file", tmp.path().join("out.nii.gz"));
    inv.stderr_policy = StderrPolicy::Fail;

    let failure = with_timeout(execute_invocation("skull_strip", &inv)).await.unwrap_err();

    assert_eq!(failure.reason, FailureReason::StderrNotEmpty);
    assert_eq!(failure.stderr, "\u{FFFD} cannot read input\nstill here\n");
}

#[tokio::test]
async fn whitespace_only_stderr_still_fails_strict_tools() {
    let tmp = tempfile::tempdir().unwrap();
    let mut inv = sh("printf x > out.nii.gz; echo >&2", tmp.path());
    inv.output("out_file", tmp.path().join("out.nii.gz"));
    inv.stderr_policy = StderrPolicy::Fail;

    let failure = with_timeout(execute_invocation("skull_strip", &inv)).await.unwrap_err();
    assert_eq!(failure.reason, FailureReason::StderrNotEmpty);
}
