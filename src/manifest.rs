//! Manifest resolution: substitution bindings, Job naming, namespace and
//! queue capture
//!
//! Turns a [`ParameterSet`] into a rendered, parsed Job manifest plus the
//! identity (name, namespace) it will be submitted under. Naming follows a
//! fixed rule: the first `WORK_ITEM` entry supplies the naming value, falling
//! back to the first entry of the set when none exists, and the name carries
//! a strictly monotonic microsecond suffix so rapid repeated submissions
//! never collide.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::params::ParameterSet;
use crate::template::JobTemplate;
use crate::{Error, Result};

/// Synthesized binding holding the derived Job name
pub const JOB_NAME_BINDING: &str = "JOB_NAME";

/// Derived name and target namespace for one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobIdentity {
    /// Lower-case Job name, unique within the process run
    pub name: String,
    /// Namespace the Job will be created in
    pub namespace: String,
}

/// A fully resolved submission, ready for annotation and dispatch
#[derive(Debug, Clone)]
pub struct ResolvedJob {
    /// Parsed manifest mapping
    pub manifest: Value,
    /// Derived name and namespace
    pub identity: JobIdentity,
    /// Kueue queue identifier captured from the parameters, if any
    pub queue: Option<String>,
}

/// Bindings and captured fields derived from one parameter set
struct ResolvedParams {
    bindings: HashMap<String, String>,
    identity: JobIdentity,
    queue: Option<String>,
}

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Microsecond wall-clock reading, forced strictly increasing within the
/// process so back-to-back submissions get distinct suffixes even when the
/// clock doesn't tick between them.
fn next_stamp_micros() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0);
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => last = observed,
        }
    }
}

/// Derive the Job name: prefix, naming value, time suffix, all lower-case.
fn derive_job_name(naming_value: &str) -> String {
    format!(
        "{}-{}-{}",
        crate::JOB_NAME_PREFIX,
        naming_value,
        next_stamp_micros()
    )
    .to_lowercase()
}

/// Flatten the parameter set into substitution bindings and capture the
/// naming value, namespace, and queue identifier.
///
/// Keys are upper-cased; duplicate keys resolve last-write-wins. The naming
/// value comes from the first matching entry, namespace and queue from the
/// last, consistent with the binding flattening.
fn resolve_params(params: &ParameterSet) -> Result<ResolvedParams> {
    let mut bindings: HashMap<String, String> = HashMap::with_capacity(params.len() + 1);
    let mut naming: Option<(String, String)> = None;
    let mut namespace: Option<String> = None;
    let mut queue: Option<String> = None;

    for (key, value) in params.iter() {
        bindings.insert(key.to_uppercase(), value.to_string());

        if naming.is_none() && key.eq_ignore_ascii_case(crate::NAMING_KEY) {
            naming = Some((key.to_string(), value.to_string()));
        }
        if key.eq_ignore_ascii_case(crate::NAMESPACE_KEY) {
            namespace = Some(value.to_string());
        }
        if key.eq_ignore_ascii_case(crate::QUEUE_KEY) {
            queue = Some(value.to_string());
        }
    }

    // Documented fallback: with no naming key present, the first entry of
    // the set names the job, whatever it is.
    let (source_key, naming_value) = match naming {
        Some(pair) => pair,
        None => params
            .iter()
            .next()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .ok_or_else(|| Error::config("cannot name a job from an empty parameter set"))?,
    };

    let name = derive_job_name(&naming_value);
    debug!(job = %name, source = %source_key, "naming job");
    bindings.insert(JOB_NAME_BINDING.to_string(), name.clone());

    Ok(ResolvedParams {
        bindings,
        identity: JobIdentity {
            name,
            namespace: namespace.unwrap_or_else(|| crate::DEFAULT_NAMESPACE.to_string()),
        },
        queue,
    })
}

/// Resolve a parameter set against a template into a submission-ready
/// manifest and identity.
///
/// # Errors
///
/// `Error::Template` if the template references an unbound variable,
/// `Error::Parse` if the substituted text is not a YAML mapping.
pub fn resolve(params: &ParameterSet, template: &JobTemplate) -> Result<ResolvedJob> {
    let resolved = resolve_params(params)?;

    let rendered = template.substitute(&resolved.bindings)?;
    let manifest: Value =
        serde_yaml::from_str(&rendered).map_err(|e| Error::parse(e.to_string()))?;
    if !manifest.is_object() {
        return Err(Error::parse("substituted template is not a YAML mapping"));
    }

    Ok(ResolvedJob {
        manifest,
        identity: resolved.identity,
        queue: resolved.queue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> ParameterSet {
        ParameterSet::builder()
            .field("WORK_ITEM", "batch42")
            .field("MODE_STR", "full")
            .field("JOB_NAMESPACE", "prod")
            .field("STORAGE_TYPE", "s3")
            .field("STORAGE_CONTAINER", "bucket1")
            .build()
    }

    #[test]
    fn bindings_are_uppercase_with_synthesized_name() {
        let params = ParameterSet::builder()
            .field("work_item", "batch42")
            .field("extra", "1")
            .build();
        let resolved = resolve_params(&params).expect("resolvable");

        assert_eq!(resolved.bindings.len(), 3); // two entries + JOB_NAME
        assert!(resolved.bindings.keys().all(|k| k == &k.to_uppercase()));
        assert!(resolved.bindings.contains_key("WORK_ITEM"));
        assert!(resolved.bindings.contains_key("EXTRA"));
        assert!(resolved.bindings.contains_key(JOB_NAME_BINDING));
    }

    #[test]
    fn job_name_has_prefix_and_is_lowercase() {
        let params = ParameterSet::builder().field("WORK_ITEM", "Batch42").build();
        let resolved = resolve_params(&params).expect("resolvable");

        assert!(resolved.identity.name.starts_with("job-cb-batch42-"));
        assert_eq!(resolved.identity.name, resolved.identity.name.to_lowercase());
        let suffix = resolved
            .identity
            .name
            .rsplit('-')
            .next()
            .expect("suffix present");
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn successive_resolutions_get_distinct_names() {
        let params = base_params();
        let a = resolve_params(&params).expect("resolvable");
        let b = resolve_params(&params).expect("resolvable");
        assert_ne!(a.identity.name, b.identity.name);
    }

    #[test]
    fn naming_uses_first_work_item_entry() {
        let params = ParameterSet::builder()
            .field("MODE_STR", "full")
            .field("WORK_ITEM", "first")
            .field("WORK_ITEM", "second")
            .build();
        let resolved = resolve_params(&params).expect("resolvable");
        assert!(resolved.identity.name.starts_with("job-cb-first-"));
    }

    #[test]
    fn naming_falls_back_to_first_entry() {
        let params = ParameterSet::builder()
            .field("MODE_STR", "Full")
            .field("STORAGE_TYPE", "s3")
            .build();
        let resolved = resolve_params(&params).expect("resolvable");
        assert!(resolved.identity.name.starts_with("job-cb-full-"));
    }

    #[test]
    fn empty_parameter_set_cannot_be_named() {
        let params = ParameterSet::builder().build();
        assert!(matches!(
            resolve_params(&params),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn namespace_defaults_when_absent() {
        let params = ParameterSet::builder().field("WORK_ITEM", "x").build();
        let resolved = resolve_params(&params).expect("resolvable");
        assert_eq!(resolved.identity.namespace, "default");
    }

    #[test]
    fn namespace_taken_from_parameters() {
        let resolved = resolve_params(&base_params()).expect("resolvable");
        assert_eq!(resolved.identity.namespace, "prod");
    }

    #[test]
    fn queue_captured_separately() {
        let params = ParameterSet::builder()
            .field("WORK_ITEM", "x")
            .queue(Some("team-a"))
            .build();
        let resolved = resolve_params(&params).expect("resolvable");
        assert_eq!(resolved.queue.as_deref(), Some("team-a"));
        assert_eq!(
            resolved.bindings.get("KUEUE_QUEUE").map(String::as_str),
            Some("team-a")
        );
    }

    #[test]
    fn duplicate_keys_flatten_last_write_wins() {
        let params = ParameterSet::builder()
            .field("WORK_ITEM", "x")
            .field("MODE_STR", "full")
            .field("mode_str", "dry")
            .build();
        let resolved = resolve_params(&params).expect("resolvable");
        assert_eq!(
            resolved.bindings.get("MODE_STR").map(String::as_str),
            Some("dry")
        );
    }

    #[test]
    fn resolve_substitutes_into_manifest() {
        let template = JobTemplate::new(
            "apiVersion: batch/v1\n\
             kind: Job\n\
             metadata:\n\
             \x20 name: ${JOB_NAME}\n\
             \x20 namespace: ${JOB_NAMESPACE}\n\
             spec:\n\
             \x20 workItem: ${WORK_ITEM}\n",
        );
        let resolved = resolve(&base_params(), &template).expect("resolvable");

        assert_eq!(resolved.manifest["kind"], "Job");
        assert_eq!(resolved.manifest["spec"]["workItem"], "batch42");
        assert_eq!(
            resolved.manifest["metadata"]["name"],
            resolved.identity.name.as_str()
        );
        assert_eq!(resolved.identity.namespace, "prod");
        assert!(resolved.queue.is_none());
    }

    #[test]
    fn resolve_fails_on_unbound_variable() {
        let template = JobTemplate::new("name: ${NOT_A_BINDING}");
        assert!(matches!(
            resolve(&base_params(), &template),
            Err(Error::Template(_))
        ));
    }

    #[test]
    fn resolve_fails_on_invalid_yaml_output() {
        let template = JobTemplate::new("{ not: valid: yaml: ${WORK_ITEM}");
        assert!(matches!(
            resolve(&base_params(), &template),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn resolve_rejects_non_mapping_documents() {
        let template = JobTemplate::new("- just\n- a\n- list\n");
        assert!(matches!(
            resolve(&base_params(), &template),
            Err(Error::Parse { .. })
        ));
    }
}
