use bench_summary_model::{
    LoadLevel, MetricKind, RangeFileName, RunDirName, RunIdentity,
};
use chrono::NaiveDateTime;
use std::path::Path;
use walkdir::WalkDir;

/// Filename of the load generator's event log.
const EVENT_LOG_NAME: &str = "simulation.log";

/// How deep below a run directory the event log may sit (the generator
/// nests it one simulation directory down).
const EVENT_LOG_MAX_DEPTH: usize = 3;

/// How a discovered artifact should be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArtifactKind {
    RangeSeries,
    Report,
    EventLog,
}

/// One artifact found under the results root, ready for dispatch to its
/// format adapter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DiscoveredArtifact {
    pub identity: RunIdentity,
    pub kind: ArtifactKind,
    /// The timestamp component of the owning run directory, when present.
    /// Used to resolve collisions between pre-aggregated reports.
    pub run_timestamp: Option<NaiveDateTime>,
}

/// Scan the results root for run artifacts.
///
/// Two layouts are recognized:
///   - run directories `<variant>-results-<load>-<timestamp>`, which may
///     contain range-series exports, a report document and event logs;
///   - loose range-series exports `<variant>-<load>_<cpu|mem>.json`
///     directly under the root.
/// Entries matching neither convention are skipped silently. A run
/// directory whose load level cannot be resolved is logged and skipped
/// entirely, since a summary keyed on a guessed load would be misleading.
pub(crate) fn discover_artifacts(root: &Path) -> std::io::Result<Vec<DiscoveredArtifact>> {
    let mut artifacts = Vec::new();

    for entry in std::fs::read_dir(root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Unreadable entry under {}: {e}", root.display());
                continue;
            }
        };
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
            continue;
        };

        if path.is_dir() {
            let Some(parsed) = RunDirName::parse(&name) else {
                log::debug!("Skipping non-run directory {name:?}");
                continue;
            };
            let Some(rps) = parsed.load else {
                log::warn!("Cannot resolve load level from run directory {name:?}, skipping");
                continue;
            };
            collect_run_dir_artifacts(&path, &parsed, rps, &mut artifacts);
        } else if let Some(parsed) = RangeFileName::parse(&name) {
            artifacts.push(DiscoveredArtifact {
                identity: RunIdentity {
                    variant: parsed.variant,
                    metric: parsed.metric,
                    load: parsed.load,
                    source: path,
                },
                kind: ArtifactKind::RangeSeries,
                run_timestamp: None,
            });
        } else {
            log::debug!("Skipping unrecognized file {name:?}");
        }
    }

    Ok(artifacts)
}

fn collect_run_dir_artifacts(
    dir: &Path,
    parsed: &RunDirName,
    rps: u32,
    artifacts: &mut Vec<DiscoveredArtifact>,
) {
    let load = LoadLevel::parsed(rps);

    // Range-series exports at the top of the run directory. The metric
    // kind comes from the file suffix; the load comes from the directory
    // name, not the file name.
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(metric) = MetricKind::from_file_name(name) {
                artifacts.push(DiscoveredArtifact {
                    identity: RunIdentity {
                        variant: parsed.variant,
                        metric,
                        load,
                        source: path,
                    },
                    kind: ArtifactKind::RangeSeries,
                    run_timestamp: parsed.timestamp,
                });
            }
        }
    }

    // The report document; the adapter runs its own nested search, so the
    // artifact points at the run directory itself.
    artifacts.push(DiscoveredArtifact {
        identity: RunIdentity {
            variant: parsed.variant,
            metric: MetricKind::ResponseTime,
            load,
            source: dir.to_path_buf(),
        },
        kind: ArtifactKind::Report,
        run_timestamp: parsed.timestamp,
    });

    // Event logs, nested at most one simulation directory down.
    for entry in WalkDir::new(dir)
        .max_depth(EVENT_LOG_MAX_DEPTH)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() && entry.file_name().to_str() == Some(EVENT_LOG_NAME) {
            artifacts.push(DiscoveredArtifact {
                identity: RunIdentity {
                    variant: parsed.variant,
                    metric: MetricKind::ResponseTime,
                    load,
                    source: entry.path().to_path_buf(),
                },
                kind: ArtifactKind::EventLog,
                run_timestamp: parsed.timestamp,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_summary_model::ServiceVariant;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn discovers_run_directory_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let run = root
            .path()
            .join("auth-service-common-results-200-20251113T045050");
        touch(&run.join("auth-service-common-200_cpu.json"));
        touch(&run.join("auth-service-common-200_mem.json"));
        touch(&run.join("authservicesimulation-20251113015059138").join(EVENT_LOG_NAME));

        let mut artifacts = discover_artifacts(root.path()).unwrap();
        artifacts.sort_by_key(|a| a.identity.source.clone());

        assert_eq!(artifacts.len(), 4);
        assert!(artifacts
            .iter()
            .all(|a| a.identity.variant == ServiceVariant::Common));
        assert!(artifacts.iter().all(|a| a.identity.load.rps == 200));
        assert!(artifacts.iter().all(|a| a.run_timestamp.is_some()));

        let kinds: Vec<_> = artifacts.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds
                .iter()
                .filter(|k| **k == ArtifactKind::RangeSeries)
                .count(),
            2
        );
        assert_eq!(kinds.iter().filter(|k| **k == ArtifactKind::Report).count(), 1);
        assert_eq!(
            kinds.iter().filter(|k| **k == ArtifactKind::EventLog).count(),
            1
        );
    }

    #[test]
    fn discovers_loose_range_series_files() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("gateway-service-400_cpu.json"));
        touch(&root.path().join("gateway-service_mem.json"));

        let artifacts = discover_artifacts(root.path()).unwrap();
        assert_eq!(artifacts.len(), 2);
        assert!(artifacts.iter().all(|a| a.kind == ArtifactKind::RangeSeries));

        let defaulted = artifacts
            .iter()
            .find(|a| a.identity.metric == MetricKind::Memory)
            .unwrap();
        assert!(defaulted.identity.load.is_defaulted());

        let parsed = artifacts
            .iter()
            .find(|a| a.identity.metric == MetricKind::Cpu)
            .unwrap();
        assert_eq!(parsed.identity.load, LoadLevel::parsed(400));
    }

    #[test]
    fn skips_non_matching_entries_silently() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("README.md"));
        touch(&root.path().join("analysis").join("notes.txt"));
        fs::create_dir_all(root.path().join("scratch")).unwrap();

        let artifacts = discover_artifacts(root.path()).unwrap();
        assert_eq!(artifacts, vec![]);
    }

    #[test]
    fn skips_run_directory_with_unresolvable_load() {
        let root = tempfile::tempdir().unwrap();
        let run = root.path().join("gateway-service-results-soak-20251112T190249");
        touch(&run.join("gateway-service_cpu.json"));

        let artifacts = discover_artifacts(root.path()).unwrap();
        assert_eq!(artifacts, vec![]);
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist");
        assert!(discover_artifacts(&missing).is_err());
    }
}
