//! `buddy_workspace` data source.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::Workspace;
use crate::convert::{required, timestamp};
use crate::error::{ApiResultExt, ProviderError};
use crate::schema::{Attribute, Schema};
use crate::value::{BoolValue, Int64Value, StringValue, Value};

use super::{domain_argument, DataSource};
use crate::resources::Context;

/// Looks up a workspace by domain.
pub struct WorkspaceDataSource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceLookup {
    pub id: StringValue,
    pub domain: StringValue,
    pub name: StringValue,
    pub workspace_id: Int64Value,
    pub owner_id: Int64Value,
    pub frozen: BoolValue,
    pub create_date: StringValue,
    pub html_url: StringValue,
}

impl WorkspaceLookup {
    fn apply(&mut self, ws: &Workspace) {
        self.id = Value::Known(ws.domain.clone());
        self.name = Value::Known(ws.name.clone());
        self.workspace_id = Value::Known(ws.id);
        self.owner_id = Value::Known(ws.owner_id);
        self.frozen = Value::Known(ws.frozen);
        self.create_date = timestamp(&ws.create_date);
        self.html_url = Value::Known(ws.html_url.clone());
    }
}

#[async_trait]
impl DataSource for WorkspaceDataSource {
    type State = WorkspaceLookup;

    fn name(&self) -> &'static str {
        "buddy_workspace"
    }

    fn schema(&self) -> Schema {
        Schema::resource("Look up a workspace by domain")
            .with_attribute("domain", domain_argument())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("workspace_id", Attribute::computed_int64())
            .with_attribute("owner_id", Attribute::computed_int64())
            .with_attribute("frozen", Attribute::computed_bool())
            .with_attribute("create_date", Attribute::computed_string())
            .with_attribute("html_url", Attribute::computed_string())
    }

    async fn read(
        &self,
        ctx: &Context,
        config: WorkspaceLookup,
    ) -> Result<WorkspaceLookup, ProviderError> {
        let domain = required(&config.domain, "domain")?;
        let workspace = ctx
            .client
            .get_workspace(domain)
            .await
            .or_api_err("read workspace")?;
        let mut state = config;
        state.apply(&workspace);
        Ok(state)
    }
}
