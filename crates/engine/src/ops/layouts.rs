use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, LayoutConfiguration, ResultEngine,
    layouts::{self, encode_items},
};

use super::{Engine, with_tx};

impl Engine {
    /// Insert or replace the layout of `config.user_id`.
    ///
    /// The first save fixes `id` and `created_at`; later saves keep them and
    /// move `updated_at` strictly forward. Returns the stored layout.
    pub async fn save_layout(
        &self,
        config: LayoutConfiguration,
    ) -> ResultEngine<LayoutConfiguration> {
        if config.user_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("userId is required".to_string()));
        }
        if config.items.is_empty() {
            return Err(EngineError::InvalidInput(
                "layout must contain at least one item".to_string(),
            ));
        }
        let layout_data = encode_items(&config.items)?;
        let now = Utc::now().timestamp_millis();

        let stored = with_tx!(self, |db_tx| {
            let existing = layouts::Entity::find()
                .filter(layouts::Column::UserId.eq(config.user_id.clone()))
                .one(&db_tx)
                .await?;

            let model = match existing {
                Some(existing) => {
                    let updated_at = now.max(existing.updated_at + 1);
                    let mut model: layouts::ActiveModel = existing.into();
                    model.is_locked = ActiveValue::Set(config.is_locked);
                    model.layout_data = ActiveValue::Set(layout_data);
                    model.updated_at = ActiveValue::Set(updated_at);
                    model.update(&db_tx).await?
                }
                None => {
                    let mut id = config.id.clone();
                    if id.is_empty() || id == "default" {
                        id = Uuid::new_v4().to_string();
                    } else if layouts::Entity::find_by_id(id.clone())
                        .one(&db_tx)
                        .await?
                        .is_some()
                    {
                        // Id owned by another user's layout.
                        id = Uuid::new_v4().to_string();
                    }
                    let created_at = if config.created_at == 0 {
                        now
                    } else {
                        config.created_at
                    };
                    layouts::ActiveModel {
                        id: ActiveValue::Set(id),
                        user_id: ActiveValue::Set(config.user_id.clone()),
                        is_locked: ActiveValue::Set(config.is_locked),
                        layout_data: ActiveValue::Set(layout_data),
                        created_at: ActiveValue::Set(created_at),
                        updated_at: ActiveValue::Set(now.max(created_at)),
                    }
                    .insert(&db_tx)
                    .await?
                }
            };
            LayoutConfiguration::try_from(model)
        })?;

        tracing::info!(
            "layout {} saved for user {} ({} items)",
            stored.id,
            stored.user_id,
            stored.items.len()
        );
        Ok(stored)
    }

    pub async fn load_layout(&self, user_id: &str) -> ResultEngine<LayoutConfiguration> {
        if user_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("userId is required".to_string()));
        }
        let model = layouts::Entity::find()
            .filter(layouts::Column::UserId.eq(user_id.to_string()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("no layout found for user: {user_id}")))?;
        LayoutConfiguration::try_from(model)
    }

    /// The saved layout, or the default one stamped with `user_id`.
    pub async fn load_layout_or_default(&self, user_id: &str) -> ResultEngine<LayoutConfiguration> {
        match self.load_layout(user_id).await {
            Err(EngineError::KeyNotFound(_)) => {
                let mut layout = LayoutConfiguration::default_layout();
                layout.user_id = user_id.to_string();
                Ok(layout)
            }
            other => other,
        }
    }

    pub fn default_layout(&self) -> LayoutConfiguration {
        LayoutConfiguration::default_layout()
    }
}
