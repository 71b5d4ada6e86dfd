use crate::shared::models::{
    Device, ForwardReceipt, Order, Panel, ProviderConfig, ProviderGroup,
};
use crate::shared::utils::DbPool;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

#[cfg(test)]
pub mod memory;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to acquire database connection: {0}")]
    Pool(String),
    #[error(transparent)]
    Query(#[from] diesel::result::Error),
    #[error("failed to serialize receipt: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persistence seam for the forwarding core. Reads routing configuration,
/// resolves devices, and records delivery receipts; injected into the
/// forwarding service at construction time.
#[async_trait]
pub trait RoutingStore: Send + Sync {
    async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn find_panel(&self, panel_id: Uuid) -> Result<Option<Panel>, StoreError>;

    /// Active routing rules for a panel, oldest first. Callers take the first
    /// match, so the created_at ordering is what makes resolution
    /// deterministic when several rules qualify.
    async fn active_groups_for_panel(
        &self,
        panel_id: Uuid,
    ) -> Result<Vec<ProviderGroup>, StoreError>;

    /// Active rules carrying a service-id override map, oldest first.
    async fn groups_with_service_rules(
        &self,
        panel_id: Uuid,
    ) -> Result<Vec<ProviderGroup>, StoreError>;

    /// First active provider config for the user whose provider name is one
    /// of `provider_names`, oldest first.
    async fn find_provider_config(
        &self,
        user_id: Uuid,
        provider_names: &[String],
    ) -> Result<Option<ProviderConfig>, StoreError>;

    async fn find_connected_device(&self, user_id: Uuid) -> Result<Option<Device>, StoreError>;

    /// Updates the existing command record matching (order_id, command,
    /// status) with the forwarding receipt. An update, never an insert: one
    /// audit row per command attempt. Returns the number of rows touched.
    async fn record_forwarded(
        &self,
        order_id: Uuid,
        command: &str,
        status: &str,
        forwarded_to: &str,
        receipt: &ForwardReceipt,
    ) -> Result<usize, StoreError>;
}

pub struct PgRoutingStore {
    conn: DbPool,
}

impl PgRoutingStore {
    pub fn new(conn: DbPool) -> Self {
        Self { conn }
    }

    fn get_conn(
        &self,
    ) -> Result<
        diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
        StoreError,
    > {
        self.conn.get().map_err(|e| StoreError::Pool(e.to_string()))
    }
}

#[async_trait]
impl RoutingStore for PgRoutingStore {
    async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        use crate::shared::schema::orders::dsl::*;
        let mut conn = self.get_conn()?;
        Ok(orders
            .filter(id.eq(order_id))
            .first::<Order>(&mut conn)
            .optional()?)
    }

    async fn find_panel(&self, panel_id: Uuid) -> Result<Option<Panel>, StoreError> {
        use crate::shared::schema::panels::dsl::*;
        let mut conn = self.get_conn()?;
        Ok(panels
            .filter(id.eq(panel_id))
            .first::<Panel>(&mut conn)
            .optional()?)
    }

    async fn active_groups_for_panel(
        &self,
        for_panel: Uuid,
    ) -> Result<Vec<ProviderGroup>, StoreError> {
        use crate::shared::schema::provider_groups::dsl::*;
        let mut conn = self.get_conn()?;
        Ok(provider_groups
            .filter(panel_id.eq(for_panel))
            .filter(is_active.eq(true))
            .order(created_at.asc())
            .load::<ProviderGroup>(&mut conn)?)
    }

    async fn groups_with_service_rules(
        &self,
        for_panel: Uuid,
    ) -> Result<Vec<ProviderGroup>, StoreError> {
        use crate::shared::schema::provider_groups::dsl::*;
        let mut conn = self.get_conn()?;
        Ok(provider_groups
            .filter(panel_id.eq(for_panel))
            .filter(is_active.eq(true))
            .filter(service_id_rules.is_not_null())
            .order(created_at.asc())
            .load::<ProviderGroup>(&mut conn)?)
    }

    async fn find_provider_config(
        &self,
        for_user: Uuid,
        provider_names: &[String],
    ) -> Result<Option<ProviderConfig>, StoreError> {
        use crate::shared::schema::provider_configs::dsl::*;
        let mut conn = self.get_conn()?;
        Ok(provider_configs
            .filter(user_id.eq(for_user))
            .filter(is_active.eq(true))
            .filter(provider_name.eq_any(provider_names))
            .order(created_at.asc())
            .first::<ProviderConfig>(&mut conn)
            .optional()?)
    }

    async fn find_connected_device(&self, for_user: Uuid) -> Result<Option<Device>, StoreError> {
        use crate::shared::schema::devices::dsl::*;
        let mut conn = self.get_conn()?;
        Ok(devices
            .filter(user_id.eq(for_user))
            .filter(connection_status.eq("connected"))
            .order(created_at.asc())
            .first::<Device>(&mut conn)
            .optional()?)
    }

    async fn record_forwarded(
        &self,
        for_order: Uuid,
        for_command: &str,
        for_status: &str,
        destination_name: &str,
        receipt: &ForwardReceipt,
    ) -> Result<usize, StoreError> {
        use crate::shared::schema::order_commands::dsl::*;
        let mut conn = self.get_conn()?;
        let receipt_json = serde_json::to_value(receipt)?;
        Ok(diesel::update(
            order_commands
                .filter(order_id.eq(for_order))
                .filter(command.eq(for_command))
                .filter(status.eq(for_status)),
        )
        .set((
            forwarded_to.eq(destination_name),
            response.eq(receipt_json),
            updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?)
    }
}
