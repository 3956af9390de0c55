//! Referral forms driver
//!
//! Replays a JSON-lines script of editing steps against a referral form and
//! prints submitted drafts on stdout.

use anyhow::{Context, Result};
use referral_forms::form::FieldValue;
use referral_forms::referral::{JsonSink, ReferralForm, UrgencyLevel};
use referral_forms::FormConfig;
use serde::Deserialize;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One line of a driver script
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Step {
    Change {
        field: String,
        text: String,
    },
    Clean {
        field: String,
    },
    Urgency {
        #[serde(default)]
        id: u32,
        #[serde(default)]
        name: String,
        requires_justification: bool,
    },
    Submit,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = FormConfig::load()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut form = ReferralForm::new(config);
    let mut sink = JsonSink::new(tokio::io::stdout());

    match std::env::args().nth(1) {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("failed to open script {path}"))?;
            run_script(BufReader::new(file), &mut form, &mut sink).await?;
        }
        None => {
            run_script(BufReader::new(tokio::io::stdin()), &mut form, &mut sink).await?;
        }
    }

    Ok(())
}

async fn run_script<R, W>(
    reader: R,
    form: &mut ReferralForm,
    sink: &mut JsonSink<W>,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin + Send,
{
    let mut lines = reader.lines();
    let mut line_number = 0;
    let mut submitted = 0;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let step: Step = serde_json::from_str(&line)
            .with_context(|| format!("invalid step on line {line_number}"))?;
        if apply(step, form, sink).await? {
            submitted += 1;
        }
        info!(
            line = line_number,
            submittable = form.is_submittable(),
            blocking = ?form.blocking_fields(),
            "step applied"
        );
    }
    Ok(submitted)
}

/// Returns true when the step submitted a draft
async fn apply<W>(step: Step, form: &mut ReferralForm, sink: &mut JsonSink<W>) -> Result<bool>
where
    W: tokio::io::AsyncWrite + Unpin + Send,
{
    match step {
        Step::Change { field, text } => {
            form.change(&field, FieldValue::plain(text))?;
        }
        Step::Clean { field } => {
            form.clean(&field)?;
        }
        Step::Urgency {
            id,
            name,
            requires_justification,
        } => form.set_urgency(UrgencyLevel {
            id,
            name,
            is_default: false,
            requires_justification,
        }),
        Step::Submit => {
            if !form.is_submittable() {
                warn!(blocking = ?form.blocking_fields(), "submit skipped, form incomplete");
                return Ok(false);
            }
            form.submit(sink).await?;
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use referral_forms::referral::ReferralDraft;

    const FULL_SCRIPT: &str = r#"
{"action": "change", "field": "question", "text": "la question posée"}
{"action": "clean", "field": "question"}
{"action": "change", "field": "context", "text": "le contexte"}
{"action": "clean", "field": "context"}
{"action": "change", "field": "prior_work", "text": "le travail préalable"}
{"action": "clean", "field": "prior_work"}
{"action": "submit"}
"#;

    async fn run(script: &str) -> (Result<usize>, ReferralForm, String) {
        let mut form = ReferralForm::default();
        let mut sink = JsonSink::new(Vec::new());
        let result = run_script(script.as_bytes(), &mut form, &mut sink).await;
        let output = String::from_utf8(sink.into_inner()).unwrap();
        (result, form, output)
    }

    #[test]
    fn test_parse_steps() {
        let step: Step =
            serde_json::from_str(r#"{"action": "change", "field": "question", "text": "q"}"#)
                .unwrap();
        assert_eq!(
            step,
            Step::Change {
                field: "question".to_string(),
                text: "q".to_string(),
            }
        );
        let step: Step = serde_json::from_str(r#"{"action": "submit"}"#).unwrap();
        assert_eq!(step, Step::Submit);
        let step: Step =
            serde_json::from_str(r#"{"action": "urgency", "requires_justification": true}"#)
                .unwrap();
        assert_eq!(
            step,
            Step::Urgency {
                id: 0,
                name: String::new(),
                requires_justification: true,
            }
        );
    }

    #[test]
    fn test_parse_unknown_action_fails() {
        assert!(serde_json::from_str::<Step>(r#"{"action": "delete"}"#).is_err());
    }

    #[tokio::test]
    async fn test_full_script_submits_one_draft() {
        let (result, form, output) = run(FULL_SCRIPT).await;
        assert_eq!(result.unwrap(), 1);
        assert!(!form.is_submittable());

        let draft: ReferralDraft = serde_json::from_str(output.trim_end()).unwrap();
        assert_eq!(draft.fields.len(), 3);
        assert_eq!(
            draft.fields.get("context"),
            Some(&FieldValue::plain("le contexte").serialized())
        );
    }

    #[tokio::test]
    async fn test_incomplete_submit_is_skipped() {
        let script = r#"
{"action": "change", "field": "question", "text": "q"}
{"action": "submit"}
"#;
        let (result, _form, output) = run(script).await;
        assert_eq!(result.unwrap(), 0);
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_urgency_requires_explanation() {
        let script = FULL_SCRIPT.replace(
            r#"{"action": "submit"}"#,
            r#"{"action": "urgency", "id": 2, "name": "urgent", "requires_justification": true}
{"action": "submit"}
{"action": "change", "field": "urgency_explanation", "text": "deadline"}"#,
        );
        let (result, form, output) = run(&script).await;
        assert_eq!(result.unwrap(), 0);
        assert!(output.is_empty());
        assert_eq!(form.blocking_fields(), vec!["urgency_explanation"]);
    }

    #[tokio::test]
    async fn test_unknown_field_aborts() {
        let script = r#"{"action": "change", "field": "topic", "text": "x"}"#;
        let (result, _form, _output) = run(script).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_malformed_line_reports_line_number() {
        let script = "\n{not json}\n";
        let (result, _form, _output) = run(script).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
