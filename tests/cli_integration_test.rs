mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::{
    MALFORMED_XML, SAMPLE_WORKFLOW_XML, SCHEMA_VIOLATING_XML, SIMPLE_XSD, TestFixtures, temp_dir,
    write_file,
};

fn xml2yaml(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xml2yaml"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute xml2yaml")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_cli_help_lists_commands() {
    let dir = temp_dir();
    let output = xml2yaml(dir.path(), &["--help"]);

    assert!(output.status.success());
    let help = stdout(&output);
    for command in ["transform", "validate", "convert", "schema", "yaml"] {
        assert!(help.contains(command), "help is missing {command}:\n{help}");
    }
    assert!(help.contains("--verbose"));
    assert!(help.contains("--quiet"));
}

#[test]
fn test_cli_version_output() {
    let dir = temp_dir();
    let output = xml2yaml(dir.path(), &["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("xml2yaml "));
}

#[test]
fn test_cli_conflicting_options() {
    let dir = temp_dir();
    let output = xml2yaml(dir.path(), &["--verbose", "--quiet", "validate", "x.xml"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("cannot be used with"));
}

#[test]
fn test_convert_writes_workflow() {
    let fixtures = TestFixtures::new();
    let dir = temp_dir();
    let input = write_file(dir.path(), "workflow.xml", SAMPLE_WORKFLOW_XML);

    let output = xml2yaml(
        dir.path(),
        &[
            "convert",
            input.to_str().unwrap(),
            "ci.yml",
            "--xslt",
            fixtures.stylesheet().to_str().unwrap(),
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Conversion completed successfully"));
    let yaml = std::fs::read_to_string(dir.path().join("ci.yml")).unwrap();
    assert!(yaml.contains("jobs:"));
}

#[test]
fn test_transform_alias_with_failing_schema() {
    let fixtures = TestFixtures::new();
    let dir = temp_dir();
    let input = write_file(dir.path(), "bad.xml", SCHEMA_VIOLATING_XML);
    let schema = write_file(dir.path(), "simple.xsd", SIMPLE_XSD);

    let output = xml2yaml(
        dir.path(),
        &[
            "t",
            input.to_str().unwrap(),
            "out.yml",
            "--schema",
            schema.to_str().unwrap(),
            "--xslt",
            fixtures.stylesheet().to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("Conversion failed"));
    assert!(!dir.path().join("out.yml").exists());
}

#[test]
fn test_validate_xml_file() {
    let dir = temp_dir();
    let good = write_file(dir.path(), "good.xml", SAMPLE_WORKFLOW_XML);
    let bad = write_file(dir.path(), "bad.xml", MALFORMED_XML);

    let output = xml2yaml(dir.path(), &["validate", good.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("✓ Valid"));

    let output = xml2yaml(dir.path(), &["v", bad.to_str().unwrap(), "--detailed"]);
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.contains("✗ Invalid"));
    assert!(text.contains("Syntax (1):"));
}

#[test]
fn test_validate_unsupported_extension() {
    let dir = temp_dir();
    let file = write_file(dir.path(), "notes.txt", "hello");

    let output = xml2yaml(dir.path(), &["validate", file.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Unsupported file type: .txt"));
}

#[test]
fn test_schema_validate_command() {
    let dir = temp_dir();
    let xml = write_file(dir.path(), "bad.xml", SCHEMA_VIOLATING_XML);
    let schema = write_file(dir.path(), "simple.xsd", SIMPLE_XSD);

    let output = xml2yaml(
        dir.path(),
        &["schema", "validate", xml.to_str().unwrap(), schema.to_str().unwrap()],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("XSD (1):"));
}

#[test]
fn test_yaml_validate_exports_report() {
    let dir = temp_dir();
    let yaml = write_file(dir.path(), "ci.yml", "name: CI\non: push\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      - run: make\n");

    let output = xml2yaml(
        dir.path(),
        &["yaml", "validate", yaml.to_str().unwrap(), "--github-actions", "-e"],
    );
    assert!(output.status.success(), "stdout: {}", stdout(&output));

    let report = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_name().to_string_lossy().starts_with("validation-report-"))
        .expect("report file should be written");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report.path()).unwrap()).unwrap();
    assert_eq!(json["summary"]["isValid"], serde_json::Value::Bool(true));
}

#[test]
fn test_yaml_format_dry_run_and_write() {
    let dir = temp_dir();
    let yaml = write_file(dir.path(), "messy.yml", "a:    1\nb:\n      c: 2\n");

    let output = xml2yaml(dir.path(), &["yaml", "format", yaml.to_str().unwrap(), "--dry-run"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("File would be changed"));
    assert_eq!(std::fs::read_to_string(&yaml).unwrap(), "a:    1\nb:\n      c: 2\n");

    let output = xml2yaml(dir.path(), &["--quiet", "yaml", "format", yaml.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
    assert_eq!(std::fs::read_to_string(&yaml).unwrap(), "a: 1\nb:\n  c: 2\n");
}

#[test]
fn test_yaml_format_missing_file() {
    let dir = temp_dir();
    let output = xml2yaml(dir.path(), &["-q", "yaml", "format", "missing.yml"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("NOT FOUND: missing.yml"));
}

#[test]
fn test_config_file_supplies_defaults() {
    let fixtures = TestFixtures::new();
    let dir = temp_dir();
    let input = write_file(dir.path(), "workflow.xml", SAMPLE_WORKFLOW_XML);
    write_file(
        dir.path(),
        "xml2yaml.toml",
        &format!(
            "[conversion]\nxslt = {:?}\n\n[formatting]\nindent = 4\n",
            fixtures.stylesheet().to_str().unwrap()
        ),
    );

    let output = xml2yaml(dir.path(), &["convert", input.to_str().unwrap(), "out.yml"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(dir.path().join("out.yml").is_file());
}
