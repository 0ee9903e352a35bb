use crate::{
    error::LogsError,
    provider::{LogDescriptor, LogProvider},
};

/// Lists the log files of one database instance.
pub struct LogEnumerator<P> {
    provider: P,
    instance: String,
}

impl<P: LogProvider> LogEnumerator<P> {
    pub fn new(provider: P, instance: impl Into<String>) -> Self {
        Self {
            provider,
            instance: instance.into(),
        }
    }

    /// Log files whose name contains `filter`, in provider order.
    pub async fn list(&self, filter: &str) -> Result<Vec<LogDescriptor>, LogsError> {
        let descriptors = self
            .provider
            .describe_log_files(&self.instance, filter)
            .await?;

        log::debug!(
            "{} log files on {} match '{}'",
            descriptors.len(),
            self.instance,
            filter
        );

        Ok(descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::fake::FakeProvider;

    fn names(descriptors: &[LogDescriptor]) -> Vec<&str> {
        descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_returns_provider_order() {
        let provider = FakeProvider::with_names(&["error/log1", "error/log2", "slowquery/log3"]);
        let enumerator = LogEnumerator::new(&provider, "mydb");

        let logs = enumerator.list("error").await.unwrap();

        assert_eq!(names(&logs), vec!["error/log1", "error/log2"]);
    }

    #[tokio::test]
    async fn test_list_only_contains_filter_matches() {
        let provider = FakeProvider::with_names(&[
            "error/mysql-error.log",
            "slowquery/mysql-slowquery.log",
            "general/mysql-general.log",
            "error/mysql-error-running.log",
        ]);
        let enumerator = LogEnumerator::new(&provider, "mydb");

        for filter in ["", "error", "slow", "running", "nothing-matches"] {
            let logs = enumerator.list(filter).await.unwrap();
            assert!(logs.iter().all(|d| d.name.contains(filter)), "filter {}", filter);
        }
        assert_eq!(enumerator.list("").await.unwrap().len(), 4);
        assert!(enumerator.list("nothing-matches").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_propagates_provider_error() {
        let provider = FakeProvider::with_names(&["error/log1"]);
        let enumerator = LogEnumerator::new(&provider, "missing-db");

        let err = enumerator.list("error").await.unwrap_err();

        assert!(matches!(err, LogsError::Provider(msg) if msg.contains("missing-db")));
    }
}
