//! Resource compliance checks for a single container.
//!
//! The evaluator compares declared limits against declared requests and
//! checks that the canonical resource types are declared at all. Live usage
//! is only echoed in the missing-resource warnings; it never takes part in a
//! comparison.

use crate::types::{format_usage, ContainerInfo, Message, CANONICAL_RESOURCES};

/// Runs the limits, requests and missing-resource passes, in that order.
pub fn evaluate(info: &ContainerInfo) -> Vec<Message> {
    let mut messages = Vec::new();
    check_resource_limits(info, &mut messages);
    check_resource_requests(info, &mut messages);
    check_missing_resources(info, &mut messages);
    messages
}

fn subject(info: &ContainerInfo) -> String {
    format!(
        "Container {} of pod {} in namespace {}",
        info.container, info.pod, info.namespace
    )
}

pub fn check_resource_limits(info: &ContainerInfo, out: &mut Vec<Message>) {
    let resources = &info.resources;
    for (name, limit) in &resources.limits {
        match resources.requests.get(name) {
            Some(request) => {
                if limit < request {
                    out.push(Message::alert(name, format!(
                        "{} has resource {} exceeding its request limit. Current usage: {}",
                        subject(info), name, limit
                    )));
                }
            }
            None => out.push(Message::warning(name, format!(
                "{} has resource {} limit set but no request defined. Current usage: {}",
                subject(info), name, limit
            ))),
        }
    }
}

pub fn check_resource_requests(info: &ContainerInfo, out: &mut Vec<Message>) {
    let resources = &info.resources;
    for (name, request) in &resources.requests {
        match resources.limits.get(name) {
            Some(limit) => {
                if request > limit {
                    out.push(Message::alert(name, format!(
                        "{} has resource {} exceeding its limit. Current usage: {}",
                        subject(info), name, request
                    )));
                }
            }
            None => out.push(Message::warning(name, format!(
                "{} has resource {} request set but no limit defined. Current usage: {}",
                subject(info), name, request
            ))),
        }
    }
}

pub fn check_missing_resources(info: &ContainerInfo, out: &mut Vec<Message>) {
    let resources = &info.resources;
    for name in CANONICAL_RESOURCES {
        if !resources.limits.contains_key(name) {
            out.push(Message::warning(name, format!(
                "{} has no {} limit set. Current state: {}",
                subject(info), name, format_usage(&info.usage)
            )));
        }
        if !resources.requests.contains_key(name) {
            out.push(Message::warning(name, format!(
                "{} has no {} request set. Current state: {}",
                subject(info), name, format_usage(&info.usage)
            )));
        }
    }
}
