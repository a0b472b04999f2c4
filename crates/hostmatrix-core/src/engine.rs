//! Engine entry points: payload in, ordered pivot reports out.
//!
//! Every call derives all state from its arguments; nothing is cached between
//! calls, so concurrent invocations on independent payloads cannot interfere.

use hostmatrix_error::Result;

use crate::annotate::{PivotOptions, PivotReport, annotate};
use crate::classify::{ResolvedHost, classify_resolved};
use crate::model::ReportPayload;
use crate::pivot::build;
use crate::snippet::{PayloadSources, SourceLookup};

/// Pivot a payload, one report per role-set in classifier order.
pub fn pivot_report(
    payload: &ReportPayload,
    sources: &dyn SourceLookup,
    options: &PivotOptions,
) -> Result<Vec<PivotReport>> {
    payload.validate()?;

    let hosts: Vec<ResolvedHost<'_>> = payload.tests.iter().map(ResolvedHost::new).collect();
    let role_sets = classify_resolved(&hosts);
    let reports: Vec<PivotReport> = role_sets
        .iter()
        .map(|role_set| annotate(build(role_set, &hosts), sources, options))
        .collect();

    tracing::info!(
        hosts = hosts.len(),
        role_sets = reports.len(),
        "report pivoted"
    );
    Ok(reports)
}

/// Pivot a payload using its embedded `sources` and default options.
pub fn pivot_payload(payload: &ReportPayload) -> Result<Vec<PivotReport>> {
    pivot_report(
        payload,
        &PayloadSources(&payload.sources),
        &PivotOptions::default(),
    )
}

/// Parse a JSON payload and pivot it.
pub fn pivot_json(text: &str) -> Result<Vec<PivotReport>> {
    let payload = ReportPayload::from_json(text)?;
    pivot_payload(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExampleRecord, ExampleStatus, HostRun};
    use crate::snippet::NoSources;
    use hostmatrix_error::MatrixError;

    #[test]
    fn empty_payload_yields_no_reports() {
        let reports = pivot_payload(&ReportPayload::default()).expect("pivot");
        assert!(reports.is_empty());
    }

    #[test]
    fn blank_hostname_rejects_whole_payload() {
        let payload = ReportPayload {
            tests: vec![HostRun {
                hostname: String::new(),
                examples: vec![ExampleRecord {
                    description: String::new(),
                    full_description: "x".to_owned(),
                    file_path: "spec/web/x_spec.rb".to_owned(),
                    line_number: 1,
                    status: ExampleStatus::Passed,
                }],
            }],
            ..ReportPayload::default()
        };
        let err = pivot_report(&payload, &NoSources, &PivotOptions::default())
            .expect_err("blank hostname must be rejected");
        assert!(matches!(err, MatrixError::MalformedInput { .. }));
    }

    #[test]
    fn pivot_json_reports_parse_failures() {
        let err = pivot_json(r#"{"tests":[{"hostname":"a"}]}"#).expect_err("examples missing");
        assert!(matches!(err, MatrixError::MalformedInput { .. }));
    }

    #[test]
    fn snippets_can_be_disabled() {
        let payload = ReportPayload::from_json(
            r#"{"tests":[{"hostname":"a","examples":[
                {"full_description":"x","file_path":"spec/web/x_spec.rb","line_number":1,"status":"failed"}
            ]}],"sources":{"spec/web/x_spec.rb":["it { fails }"]}}"#,
        )
        .expect("payload");
        let options = PivotOptions {
            snippets: false,
            ..PivotOptions::default()
        };
        let reports =
            pivot_report(&payload, &PayloadSources(&payload.sources), &options).expect("pivot");
        assert!(reports[0].results[0].cells[0].source.is_none());

        let reports = pivot_payload(&payload).expect("pivot");
        assert_eq!(
            reports[0].results[0].cells[0]
                .source
                .as_ref()
                .map(|snippet| snippet.text.as_str()),
            Some("it { fails }")
        );
    }
}
