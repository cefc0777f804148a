//! Classify command implementation.

use outbox_engine::{classify, into_response, CallOutcome, RawResponse};
use outbox_protocol::Response;
use serde::Serialize;

/// Classification of a captured response.
#[derive(Debug, Serialize)]
pub struct ClassifyResult {
    /// HTTP status of the captured response.
    pub http_status: u16,
    /// Outcome class.
    pub outcome: String,
    /// The response handed to result handlers.
    pub response: Response,
}

/// Runs the classify command.
pub fn run(status: u16, body: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = evaluate(status, body);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("HTTP status: {}", result.http_status);
            println!("Outcome:     {}", result.outcome);
            println!("Response:    {}", serde_json::to_string(&result.response)?);
        }
    }

    Ok(())
}

/// Classifies a captured status and body.
pub fn evaluate(status: u16, body: &str) -> ClassifyResult {
    let classified = classify(RawResponse::new(status, body));
    let outcome = match CallOutcome::of(&classified) {
        CallOutcome::Success => "success",
        CallOutcome::ApiError => "api_error",
        CallOutcome::GenericFailure => "generic_failure",
    };
    ClassifyResult {
        http_status: status,
        outcome: outcome.to_string(),
        response: into_response(classified),
    }
}
