//! Inspect command implementation.

use crate::queue_file;
use outbox_protocol::Request;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Queue file inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Queue file path.
    pub path: String,
    /// Number of pending requests.
    pub pending: usize,
    /// Requests per kind.
    pub by_kind: BTreeMap<String, usize>,
    /// Requests per entity type.
    pub by_entity: BTreeMap<String, usize>,
    /// Creates whose body carries a client-assigned id.
    pub provisional_creates: usize,
    /// Reads that can only be answered locally.
    pub local_only_reads: usize,
    /// Requests without a result handler.
    pub without_handler: usize,
    /// One line per entry (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntrySummary>>,
}

/// Summary of one queue entry.
#[derive(Debug, Serialize)]
pub struct EntrySummary {
    /// Action name.
    pub action: String,
    /// HTTP method.
    pub method: String,
    /// Target url.
    pub url: String,
    /// Kind label.
    pub kind: String,
}

/// Runs the inspect command.
pub fn run(path: &Path, show_entries: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No queue file found at {:?}", path).into());
    }

    let requests = queue_file::load(path)?;
    let mut result = summarize(&requests, show_entries);
    result.path = path.display().to_string();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Builds the inspection summary for a list of requests.
pub fn summarize(requests: &[Request], show_entries: bool) -> InspectResult {
    let mut result = InspectResult {
        path: String::new(),
        pending: requests.len(),
        by_kind: BTreeMap::new(),
        by_entity: BTreeMap::new(),
        provisional_creates: 0,
        local_only_reads: 0,
        without_handler: 0,
        entries: None,
    };

    for request in requests {
        *result
            .by_kind
            .entry(request.kind.label().to_string())
            .or_default() += 1;
        *result
            .by_entity
            .entry(request.kind.entity().to_string())
            .or_default() += 1;

        if request.kind.is_create() && request.entity_id().is_some_and(|id| id.is_provisional()) {
            result.provisional_creates += 1;
        }
        if request.targets_provisional_entity() {
            result.local_only_reads += 1;
        }
        if request.handler().is_none() {
            result.without_handler += 1;
        }
    }

    if show_entries {
        result.entries = Some(
            requests
                .iter()
                .map(|request| EntrySummary {
                    action: request.action().to_string(),
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    kind: request.kind.label().to_string(),
                })
                .collect(),
        );
    }

    result
}

fn print_text_output(result: &InspectResult) {
    println!("Outbox Queue Inspection");
    println!("=======================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Pending requests: {}", result.pending);
    println!("  Provisional creates: {}", result.provisional_creates);
    println!("  Local-only reads:    {}", result.local_only_reads);
    println!("  Without handler:     {}", result.without_handler);

    if !result.by_kind.is_empty() {
        println!();
        println!("By kind:");
        for (kind, count) in &result.by_kind {
            println!("  {:<16} {}", kind, count);
        }
    }

    if !result.by_entity.is_empty() {
        println!();
        println!("By entity:");
        for (entity, count) in &result.by_entity {
            println!("  {:<16} {}", entity, count);
        }
    }

    if let Some(entries) = &result.entries {
        println!();
        println!("Entries:");
        for (index, entry) in entries.iter().enumerate() {
            println!(
                "  [{}] {} {} {} ({})",
                index, entry.method, entry.url, entry.action, entry.kind
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbox_protocol::Method;
    use serde_json::json;

    #[test]
    fn summary_counts() {
        let requests = vec![
            Request::from_action("GROUPS_SAVE", "/groups", Method::Post)
                .with_body(json!({"ID": "tmp-1"})),
            Request::from_action("GROUPS_SAVE", "/groups", Method::Post).with_body(json!({"ID": 4})),
            Request::from_action("GROUPS_GETBYID", "/groups/tmp-1", Method::Get),
            Request::from_action("", "/ping", Method::Get),
        ];

        let result = summarize(&requests, true);
        assert_eq!(result.pending, 4);
        assert_eq!(result.by_kind["create"], 2);
        assert_eq!(result.by_entity["groups"], 3);
        assert_eq!(result.provisional_creates, 1);
        assert_eq!(result.local_only_reads, 1);
        assert_eq!(result.without_handler, 1);
        assert_eq!(result.entries.unwrap()[2].kind, "read_by_id");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = run(Path::new("/nonexistent/queue.jsonl"), false, "text").unwrap_err();
        assert!(err.to_string().contains("No queue file"));
    }
}
