use axum::{extract::State, http::StatusCode, Json};

use crate::error::{AppError, Result};
use crate::notification::ProcessSummary;
use crate::server::AppState;
use crate::submission::Submission;

/// Run the notification pipeline for a completed submission.
///
/// Responds `200` when every enabled rule sent, `502` with the same per-rule
/// report when any of them failed.
#[tracing::instrument(
    name = "http.process_submission",
    skip(state, submission),
    fields(form_id = submission.form_id, submission_id = submission.id)
)]
pub async fn process_submission(
    State(state): State<AppState>,
    Json(submission): Json<Submission>,
) -> Result<(StatusCode, Json<ProcessSummary>)> {
    validate(&submission)?;

    match state.notifications.process(&submission).await {
        Ok(report) => Ok((StatusCode::OK, Json(report.summary()))),
        Err(err) => {
            tracing::warn!(error = %err, "Submission notifications failed");
            Ok((StatusCode::BAD_GATEWAY, Json(err.report().summary())))
        }
    }
}

fn validate(submission: &Submission) -> Result<()> {
    if submission.form_id != submission.form.id {
        return Err(AppError::Validation(format!(
            "submission form_id {} does not match form id {}",
            submission.form_id, submission.form.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::Form;

    #[test]
    fn test_validate_form_mismatch() {
        let submission = Submission {
            id: 1,
            form_id: 2,
            fields: vec![],
            form: Form {
                id: 3,
                notifications: vec![],
            },
        };
        assert!(matches!(validate(&submission), Err(AppError::Validation(_))));
    }
}
