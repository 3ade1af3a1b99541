//! DNS zones and record sets.

use serde::{Deserialize, Serialize};

use super::{ApiError, BuddyClient};

/// A DNS zone hosted by the Service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Domain {
    /// Service identifier.
    pub id: String,
    /// Domain name.
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct DomainList {
    #[serde(default)]
    domains: Vec<Domain>,
}

#[derive(Debug, Serialize)]
struct DomainCreate<'a> {
    name: &'a str,
}

/// A DNS record set keyed by (zone, name, type).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DomainRecord {
    /// Fully qualified record name.
    pub name: String,
    /// DNS record type.
    #[serde(rename = "type")]
    pub record_type: String,
    /// Time to live in seconds.
    pub ttl: i64,
    /// Record values.
    pub values: Vec<String>,
}

/// Upsert payload for a record set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DomainRecordUpsert {
    /// Time to live in seconds.
    pub ttl: i64,
    /// Record values.
    pub values: Vec<String>,
}

impl BuddyClient {
    /// Create a domain.
    pub async fn create_domain(&self, workspace: &str, name: &str) -> Result<Domain, ApiError> {
        self.post(
            &format!("/workspaces/{workspace}/domains"),
            &DomainCreate { name },
        )
        .await
    }

    /// Every domain registered in the workspace.
    pub async fn list_domains(&self, workspace: &str) -> Result<Vec<Domain>, ApiError> {
        let list: DomainList = self.get(&format!("/workspaces/{workspace}/domains")).await?;
        Ok(list.domains)
    }

    /// Delete a domain.
    pub async fn delete_domain(&self, workspace: &str, domain_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/workspaces/{workspace}/domains/{domain_id}"))
            .await
    }

    /// Create or replace the record set `record_type` of `fqdn`.
    pub async fn upsert_domain_record(
        &self,
        workspace: &str,
        fqdn: &str,
        record_type: &str,
        ops: &DomainRecordUpsert,
    ) -> Result<DomainRecord, ApiError> {
        self.patch(
            &format!("/workspaces/{workspace}/domains/{fqdn}/records/{record_type}"),
            ops,
        )
        .await
    }

    /// Fetch a domain record.
    pub async fn get_domain_record(
        &self,
        workspace: &str,
        fqdn: &str,
        record_type: &str,
    ) -> Result<DomainRecord, ApiError> {
        self.get(&format!(
            "/workspaces/{workspace}/domains/{fqdn}/records/{record_type}"
        ))
        .await
    }

    /// Delete a domain record.
    pub async fn delete_domain_record(
        &self,
        workspace: &str,
        fqdn: &str,
        record_type: &str,
    ) -> Result<(), ApiError> {
        self.delete(&format!(
            "/workspaces/{workspace}/domains/{fqdn}/records/{record_type}"
        ))
        .await
    }
}
