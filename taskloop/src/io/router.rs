//! Audited domain routing on top of the pure classifier.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde_json::json;
use tracing::{debug, warn};

use crate::core::classifier::{Classification, classify};
use crate::core::types::Domain;
use crate::io::audit::AuditSink;
use crate::io::layout::{KEEP_FILE, VaultPaths};

const SERVER: &str = "domain_router";

#[derive(Debug, Clone)]
pub struct Router {
    audit: AuditSink,
    paths: VaultPaths,
}

impl Router {
    pub fn new(audit: AuditSink, paths: VaultPaths) -> Self {
        Self { audit, paths }
    }

    /// Classify content, writing exactly one audit entry.
    pub fn classify(&self, content: &str) -> Classification {
        let result = classify(content);
        let scores = result
            .scores
            .map(|s| json!({"business": s.business, "personal": s.personal}));
        self.audit.log(
            SERVER,
            "classify_task",
            json!({
                "method": result.method.as_str(),
                "domain": result.domain.as_str(),
                "scores": scores,
            }),
        );
        debug!(domain = %result.domain, method = result.method.as_str(), "classified task");
        result
    }

    /// Archive path for `name` in the domain folder. Creates the folder.
    pub fn route(&self, name: &str, domain: Domain) -> PathBuf {
        let dir = self.paths.domain_dir(domain);
        let created = fs::create_dir_all(dir);
        let target = dir.join(name);
        match created {
            Ok(()) => self.audit.log(
                SERVER,
                "route_task",
                json!({"file": name, "domain": domain.as_str(), "target": target.display().to_string()}),
            ),
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "create domain folder failed");
                self.audit.log_failure(
                    SERVER,
                    "route_task",
                    json!({"file": name, "domain": domain.as_str(), "error": err.to_string()}),
                )
            }
        };
        target
    }

    /// Archived task names per domain, sorted.
    pub fn domain_tasks(&self) -> BTreeMap<Domain, Vec<String>> {
        let mut all = BTreeMap::new();
        for domain in [Domain::Business, Domain::Personal] {
            let mut names: Vec<String> = fs::read_dir(self.paths.domain_dir(domain))
                .map(|entries| {
                    entries
                        .filter_map(|entry| entry.ok())
                        .filter(|entry| entry.file_type().is_ok_and(|ty| ty.is_file()))
                        .filter_map(|entry| entry.file_name().into_string().ok())
                        .filter(|name| name != KEEP_FILE)
                        .collect()
                })
                .unwrap_or_default();
            names.sort();
            all.insert(domain, names);
        }
        let counts: BTreeMap<&str, usize> = all
            .iter()
            .map(|(domain, names)| (domain.as_str(), names.len()))
            .collect();
        self.audit
            .log(SERVER, "get_all_domain_tasks", json!({"counts": counts}));
        all
    }
}
