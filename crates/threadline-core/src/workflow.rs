// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workflow identifier rules.
//!
//! A workflow id is namespaced as `{tenant}:{workflowType}[:{suffix}]` and the
//! workflow type is `{agent}[:{flow}]`. Every id accepted from a caller must
//! live inside the caller's own tenant namespace.

use crate::error::ThreadlineError;

const SEPARATOR: char = ':';

/// Workflow identity resolved once at the request boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWorkflow {
    pub workflow_id: String,
    pub workflow_type: String,
    pub agent: String,
}

/// Rejects tenant ids that could not prefix a workflow id unambiguously.
pub fn validate_tenant(tenant_id: &str) -> Result<(), ThreadlineError> {
    if tenant_id.trim().is_empty() {
        return Err(ThreadlineError::validation("tenant_id", "must not be empty"));
    }
    if tenant_id.contains(SEPARATOR) {
        return Err(ThreadlineError::validation(
            "tenant_id",
            format!("`{tenant_id}` must not contain ':'"),
        ));
    }
    Ok(())
}

fn check_segments(field: &str, value: &str) -> Result<(), ThreadlineError> {
    if value.is_empty() {
        return Err(ThreadlineError::validation(field, "must not be empty"));
    }
    if value.starts_with(SEPARATOR) || value.ends_with(SEPARATOR) {
        return Err(ThreadlineError::validation(
            field,
            format!("`{value}` must not start or end with ':'"),
        ));
    }
    if value.split(SEPARATOR).any(|s| s.trim().is_empty()) {
        return Err(ThreadlineError::validation(
            field,
            format!("`{value}` contains an empty segment"),
        ));
    }
    Ok(())
}

/// Validates a workflow type such as `support-agent:triage`.
pub fn validate_workflow_type(workflow_type: &str) -> Result<(), ThreadlineError> {
    check_segments("workflow_type", workflow_type)
}

/// Validates that `workflow_id` is well formed and owned by `tenant_id`.
pub fn validate_workflow_id(workflow_id: &str, tenant_id: &str) -> Result<(), ThreadlineError> {
    check_segments("workflow_id", workflow_id)?;
    let prefix = format!("{tenant_id}{SEPARATOR}");
    if !workflow_id.starts_with(&prefix) {
        return Err(ThreadlineError::validation(
            "workflow_id",
            format!("`{workflow_id}` must start with `{prefix}`"),
        ));
    }
    Ok(())
}

/// Builds the id of the default process for a workflow type in a tenant.
pub fn namespaced_workflow_id(tenant_id: &str, workflow_type: &str) -> String {
    format!("{tenant_id}{SEPARATOR}{workflow_type}")
}

/// Extracts the workflow type from an already validated workflow id.
///
/// `acme:agent` gives `agent`; `acme:agent:flow[:suffix...]` gives `agent:flow`.
pub fn workflow_type_of(workflow_id: &str) -> Option<String> {
    let segments: Vec<&str> = workflow_id.split(SEPARATOR).collect();
    match segments.len() {
        0 | 1 => None,
        2 => Some(segments[1].to_string()),
        _ => Some(format!("{}{SEPARATOR}{}", segments[1], segments[2])),
    }
}

/// The agent name is the first segment of the workflow type.
pub fn agent_of(workflow_type: &str) -> &str {
    workflow_type
        .split(SEPARATOR)
        .next()
        .unwrap_or(workflow_type)
}

/// Resolves workflow identity from whichever of id or type the caller sent.
///
/// Order: an explicit workflow id wins (its type is derived unless given);
/// otherwise the id is built from the workflow type inside the tenant
/// namespace; with neither present the request is invalid.
pub fn resolve_workflow(
    tenant_id: &str,
    workflow_id: Option<&str>,
    workflow_type: Option<&str>,
) -> Result<ResolvedWorkflow, ThreadlineError> {
    validate_tenant(tenant_id)?;
    let workflow_id = workflow_id.filter(|s| !s.is_empty());
    let workflow_type = workflow_type.filter(|s| !s.is_empty());

    match (workflow_id, workflow_type) {
        (Some(id), explicit_type) => {
            validate_workflow_id(id, tenant_id)?;
            let workflow_type = match explicit_type {
                Some(t) => {
                    validate_workflow_type(t)?;
                    t.to_string()
                }
                None => workflow_type_of(id).ok_or_else(|| {
                    ThreadlineError::validation(
                        "workflow_id",
                        format!("cannot derive a workflow type from `{id}`"),
                    )
                })?,
            };
            Ok(ResolvedWorkflow {
                workflow_id: id.to_string(),
                agent: agent_of(&workflow_type).to_string(),
                workflow_type,
            })
        }
        (None, Some(t)) => {
            validate_workflow_type(t)?;
            Ok(ResolvedWorkflow {
                workflow_id: namespaced_workflow_id(tenant_id, t),
                workflow_type: t.to_string(),
                agent: agent_of(t).to_string(),
            })
        }
        (None, None) => Err(ThreadlineError::validation(
            "workflow_id",
            "either workflow_id or workflow_type is required",
        )),
    }
}
