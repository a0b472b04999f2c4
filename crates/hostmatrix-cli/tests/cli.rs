use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const NIGHTLY: &str = r#"{"tests":[
    {"hostname":"web10","examples":[
        {"full_description":"nginx is running","file_path":"./spec/web/nginx_spec.rb","line_number":2,"status":"failed"},
        {"full_description":"ntp is synced","file_path":"./spec/all/ntp_spec.rb","line_number":1,"status":"passed"}
    ]},
    {"hostname":"web9","examples":[
        {"full_description":"nginx is running","file_path":"./spec/web/nginx_spec.rb","line_number":2,"status":"passed"},
        {"full_description":"ntp is synced","file_path":"./spec/all/ntp_spec.rb","line_number":1,"status":"passed"}
    ]}
],"sources":{"./spec/web/nginx_spec.rb":["describe service('nginx') do","  it { should be_running }","end"]}}"#;

fn hostmatrix(args: &[&str], reports: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hostmatrix"))
        .arg("--reports")
        .arg(reports)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("HOSTMATRIX_REPORTS_DIR")
        .output()
        .expect("run hostmatrix")
}

fn reports_dir() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("nightly.json"), NIGHTLY).expect("write report");
    temp
}

#[test]
fn help_exits_zero() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = hostmatrix(&["--help"], temp.path());
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("render-file <PATH>"));
}

#[test]
fn list_reports_as_json() {
    let temp = reports_dir();
    fs::write(temp.path().join("notes.txt"), "ignored").expect("write");
    let output = hostmatrix(&["list"], temp.path());
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json listing");
    let ids: Vec<&str> = listing
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|entry| entry["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["nightly.json"]);
}

#[test]
fn pivot_json_writes_cache() {
    let temp = reports_dir();
    let output = hostmatrix(&["pivot", "nightly.json"], temp.path());
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let pivots: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json pivots");
    let first = &pivots[0];
    assert_eq!(first["name"], "web, all");
    assert_eq!(first["percent"], 75);
    assert_eq!(first["results"][0]["name"], "web9");
    assert_eq!(first["results"][1]["name"], "web10");
    assert_eq!(first["specs"][0]["spec"], "nginx");
    assert_eq!(
        first["results"][1]["cells"][0]["source"]["start_line"],
        1
    );
    assert!(temp.path().join("nightly.parsed").is_file());
}

#[test]
fn pivot_no_cache_leaves_no_cache_file() {
    let temp = reports_dir();
    let output = hostmatrix(&["pivot", "nightly.json", "--no-cache"], temp.path());
    assert!(output.status.success());
    assert!(!temp.path().join("nightly.parsed").exists());
}

#[test]
fn pivot_markdown_to_output_file() {
    let temp = reports_dir();
    let out_path = temp.path().join("out.md");
    let out_arg = out_path.to_string_lossy().into_owned();
    let output = hostmatrix(
        &["pivot", "nightly.json", "--format", "markdown", "--output", &out_arg],
        temp.path(),
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.is_empty());

    let markdown = fs::read_to_string(&out_path).expect("read output");
    assert!(markdown.starts_with("# nightly.json\n"));
    assert!(markdown.contains("## web, all"));
    assert!(markdown.contains("| web10 | 1 | 1 |"));
    assert!(markdown.contains("### Failures"));
}

#[test]
fn missing_report_exits_one() {
    let temp = reports_dir();
    let output = hostmatrix(&["pivot", "absent.json"], temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("report not found"));
}

#[test]
fn malformed_report_exits_two() {
    let temp = reports_dir();
    fs::write(temp.path().join("broken.json"), "{\"tests\": [").expect("write");
    let output = hostmatrix(&["pivot", "broken.json"], temp.path());
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("malformed report payload"));
}

#[test]
fn usage_errors_exit_two() {
    let temp = reports_dir();
    for args in [
        &[][..],
        &["frobnicate"][..],
        &["pivot"][..],
        &["list", "--format", "yaml"][..],
        &["list", "--bogus"][..],
    ] {
        let output = hostmatrix(args, temp.path());
        assert_eq!(output.status.code(), Some(2), "args {args:?}");
    }
}

#[test]
fn render_file_reads_payload_outside_store() {
    let store = tempfile::tempdir().expect("tempdir");
    let elsewhere = tempfile::tempdir().expect("tempdir");
    let payload_path = elsewhere.path().join("adhoc.json");
    fs::write(&payload_path, NIGHTLY).expect("write");
    let payload_arg = payload_path.to_string_lossy().into_owned();

    let output = hostmatrix(
        &["render-file", &payload_arg, "--format", "markdown", "--no-snippets"],
        store.path(),
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let markdown = String::from_utf8_lossy(&output.stdout);
    assert!(markdown.starts_with("# adhoc.json\n"));
    assert!(!markdown.contains("```ruby"));
    assert!(!elsewhere.path().join("adhoc.parsed").exists());
}
