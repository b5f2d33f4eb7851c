use crate::catalog::Partition;
use crate::catalog::partition::BootstrapRecord;
use crate::config::token_digest;
use crate::error::{MetaError, ResourceType};
use crate::kv::{Precondition, Txn};
use crate::store::Store;
use crate::store::codec::{decode, encode};
use crate::store::partition::partition_duplicate;
use tracing::{info, warn};

const BOOTSTRAP_ID: &str = "bootstrap";

impl Store {
    /// Creates the first partition. Succeeds at most once per root prefix:
    /// the partition and the consumed-marker are written in one transaction.
    pub async fn bootstrap(
        &self,
        token: &str,
        name: &str,
        uuid: Option<&str>,
    ) -> Result<Partition, MetaError> {
        if token.is_empty() {
            return Err(MetaError::InvalidInput("bootstrap token is required".into()));
        }
        if name.is_empty() {
            return Err(MetaError::InvalidInput(
                "bootstrap partition name is required".into(),
            ));
        }
        let digest = token_digest(token);
        if let Some(expected) = &self.config.bootstrap_token_sha256
            && !expected.eq_ignore_ascii_case(&digest)
        {
            warn!(partition = name, "bootstrap attempted with a rejected token");
            return Err(MetaError::PermissionDenied(
                "bootstrap token rejected".into(),
            ));
        }

        let partition = self.new_partition(name, uuid)?;
        let record = BootstrapRecord {
            partition_uuid: partition.uuid.clone(),
            token_sha256: digest,
        };
        let marker = self.keys.bootstrap_marker();
        let txn = Txn::new()
            .require(Precondition::absent(marker.clone()))
            .put(marker, encode(&record)?);
        let txn = self.partition_create_txn(txn, &partition)?;

        let outcome = self.kv_txn(txn).await?;
        if !outcome.succeeded {
            return Err(match outcome.failed_precondition {
                Some(0) => MetaError::duplicate(ResourceType::Bootstrap, BOOTSTRAP_ID),
                failed => partition_duplicate(&partition, failed, 1),
            });
        }
        info!(partition = %partition.uuid, name = %partition.name, "bootstrap complete");
        Ok(partition)
    }

    pub async fn bootstrap_record(&self) -> Result<Option<BootstrapRecord>, MetaError> {
        match self.kv_get(&self.keys.bootstrap_marker()).await? {
            Some(entry) => Ok(Some(decode(&entry)?)),
            None => Ok(None),
        }
    }
}
