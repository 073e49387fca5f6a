//! In-memory repository list and its derived aggregate stats.

use xcodedash_client::types::{RepoHealth, RepositorySummary};

/// Aggregates derived from the current repository set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoStats {
    pub repos: usize,
    pub healthy: usize,
    pub total_files: u64,
    pub critical_files: u64,
}

/// Owned snapshot of the backend's repository list.
///
/// The set is replaced wholesale on every successful fetch; a failed fetch
/// leaves the previous set visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryStore {
    repositories: Vec<RepositorySummary>,
}

impl RepositoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored set entirely. No partial mutation path exists.
    pub fn replace(&mut self, repositories: Vec<RepositorySummary>) {
        self.repositories = repositories;
    }

    #[must_use]
    pub fn repositories(&self) -> &[RepositorySummary] {
        &self.repositories
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Derive aggregate stats from scratch; `None` for the empty set so the
    /// view shows its prompt state instead of zero counters.
    #[must_use]
    pub fn stats(&self) -> Option<RepoStats> {
        if self.repositories.is_empty() {
            return None;
        }
        let mut stats = RepoStats {
            repos: self.repositories.len(),
            healthy: 0,
            total_files: 0,
            critical_files: 0,
        };
        for repo in &self.repositories {
            if repo.status == RepoHealth::Healthy {
                stats.healthy += 1;
            }
            stats.total_files += repo.total_files;
            stats.critical_files += repo.critical_files;
        }
        Some(stats)
    }

    /// Render the repository panel as plain lines.
    #[must_use]
    pub fn panel_lines(&self) -> Vec<String> {
        let Some(stats) = self.stats() else {
            return vec![
                "No repositories configured.".to_owned(),
                "Add one with: xcodedash add --name <name> --url <url>".to_owned(),
            ];
        };
        let mut lines = Vec::with_capacity(self.repositories.len() + 2);
        lines.push(format!(
            "Repositories: {} ({} healthy) | files: {} | critical: {}",
            stats.repos, stats.healthy, stats.total_files, stats.critical_files
        ));
        for repo in &self.repositories {
            let branch = repo.branch.as_deref().unwrap_or("main");
            lines.push(format!(
                "  {:<24} {:<10} {:>6} files {:>5} critical [{branch}]",
                repo.name,
                repo.status.as_str(),
                repo.total_files,
                repo.critical_files
            ));
        }
        lines
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use xcodedash_client::mock::test_repository;
    use xcodedash_client::types::RepoHealth;

    use super::{RepoStats, RepositoryStore};

    #[test]
    fn empty_store_has_no_stats_and_renders_prompt_state() {
        let store = RepositoryStore::new();
        assert_eq!(store.stats(), None);
        let lines = store.panel_lines();
        assert!(lines[0].contains("No repositories configured"));
    }

    #[test]
    fn stats_sum_files_and_count_only_healthy_entries() {
        let mut store = RepositoryStore::new();
        store.replace(vec![
            test_repository("app", RepoHealth::Healthy, 10, 2),
            test_repository("kit", RepoHealth::Unhealthy, 5, 1),
        ]);
        assert_eq!(
            store.stats(),
            Some(RepoStats {
                repos: 2,
                healthy: 1,
                total_files: 15,
                critical_files: 3,
            })
        );
    }

    #[test]
    fn stats_recompute_after_wholesale_replace() {
        let mut store = RepositoryStore::new();
        store.replace(vec![test_repository("app", RepoHealth::Healthy, 10, 2)]);
        store.replace(vec![test_repository("kit", RepoHealth::Unknown, 3, 0)]);
        let stats = store.stats().unwrap();
        assert_eq!(stats.repos, 1);
        assert_eq!(stats.healthy, 0);
        assert_eq!(stats.total_files, 3);
    }

    #[test]
    fn panel_lists_each_repository_with_health() {
        let mut store = RepositoryStore::new();
        store.replace(vec![test_repository("app", RepoHealth::Healthy, 10, 2)]);
        let lines = store.panel_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Repositories: 1 (1 healthy)"));
        assert!(lines[1].contains("app"));
        assert!(lines[1].contains("healthy"));
    }
}
