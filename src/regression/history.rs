// Build chain between a reference build and the current build
//
// The chain holds the finished builds of the same pipeline that ran after the
// reference build and before the current build, oldest first. Providers report
// history newest first and may include the reference build, the current build,
// or builds newer than it; both ends are cut by build id so the result does not
// depend on provider order.

use crate::model::Build;
use crate::provider::{HistoryProvider, ProviderError};

/// Finished builds strictly between `reference` and `current`, oldest first
///
/// The chain is empty when the two builds are adjacent or when the provider
/// has no entries at or after the reference build.
pub fn builds_between(
    history: &dyn HistoryProvider,
    reference: &Build,
    current: &Build,
) -> Result<Vec<Build>, ProviderError> {
    let entries = history.entries_since(reference, &reference.pipeline)?;
    if entries.is_empty() {
        return Ok(entries);
    }

    let mut chain = Vec::new();
    for build in entries {
        if build.id <= reference.id
            || build.id >= current.id
            || build.pipeline != reference.pipeline
            || !build.status.is_finished()
        {
            continue;
        }
        chain.push(build);
    }

    chain.sort_by_key(|b| b.id);
    chain.dedup_by_key(|b| b.id);
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BuildStatus, PipelineId};
    use crate::provider::Result;

    struct FixedHistory(Vec<Build>);

    impl HistoryProvider for FixedHistory {
        fn entries_since(&self, _build: &Build, _pipeline: &PipelineId) -> Result<Vec<Build>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenHistory;

    impl HistoryProvider for BrokenHistory {
        fn entries_since(&self, _build: &Build, _pipeline: &PipelineId) -> Result<Vec<Build>> {
            Err(ProviderError::HistoryUnavailable("offline".to_string()))
        }
    }

    fn ok(id: u64) -> Build {
        Build::new(id, "p", BuildStatus::Success)
    }

    fn failed(id: u64) -> Build {
        Build::new(id, "p", BuildStatus::Failure)
    }

    fn ids(chain: &[Build]) -> Vec<u64> {
        chain.iter().map(|b| b.id.0).collect()
    }

    #[test]
    fn test_chain_is_oldest_first_and_excludes_ends() {
        // newest first, reference included
        let history = FixedHistory(vec![failed(14), failed(13), failed(12), ok(10)]);
        let chain = builds_between(&history, &ok(10), &Build::new(15, "p", BuildStatus::Running))
            .unwrap();
        assert_eq!(ids(&chain), vec![12, 13, 14]);
    }

    #[test]
    fn test_current_and_newer_builds_are_cut() {
        let history = FixedHistory(vec![failed(13), failed(12), failed(11), ok(10)]);
        let chain = builds_between(&history, &ok(10), &failed(12)).unwrap();
        assert_eq!(ids(&chain), vec![11]);
    }

    #[test]
    fn test_provider_order_does_not_matter() {
        let history = FixedHistory(vec![ok(10), failed(11), failed(13), failed(12)]);
        let chain = builds_between(&history, &ok(10), &failed(14)).unwrap();
        assert_eq!(ids(&chain), vec![11, 12, 13]);
    }

    #[test]
    fn test_oldest_first_order_with_current_listed() {
        let history = FixedHistory(vec![failed(12), failed(11), ok(10)]);
        let chain = builds_between(&history, &ok(10), &failed(13)).unwrap();
        assert_eq!(ids(&chain), vec![11, 12]);
    }

    #[test]
    fn test_adjacent_builds_give_empty_chain() {
        let history = FixedHistory(vec![ok(10)]);
        let chain = builds_between(&history, &ok(10), &failed(11)).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn test_empty_history() {
        let history = FixedHistory(vec![]);
        let chain = builds_between(&history, &ok(10), &failed(11)).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn test_other_pipelines_and_running_builds_are_skipped() {
        let history = FixedHistory(vec![
            Build::new(13, "other", BuildStatus::Success),
            Build::new(12, "p", BuildStatus::Running),
            failed(11),
            ok(10),
        ]);
        let chain = builds_between(&history, &ok(10), &failed(20)).unwrap();
        assert_eq!(ids(&chain), vec![11]);
    }

    #[test]
    fn test_provider_failure_propagates() {
        assert!(builds_between(&BrokenHistory, &ok(10), &failed(11)).is_err());
    }
}
