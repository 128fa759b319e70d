use sea_orm::{ActiveValue, DatabaseConnection, prelude::*, sea_query::OnConflict};
use serde_json::Value;

use crate::{
    Credits, EngineError, ResultEngine,
    settings::{self, DEFAULT_LANGUAGE_KEY, DEFAULT_SUPPORT_THRESHOLD, SUPPORT_THRESHOLD_KEY},
};

use super::{Engine, SettingsCache};

/// Validates a threshold sent by the admin UI.
///
/// Accepts a JSON integer or a string holding one; the value must be at
/// least 1. Floats (`3.14`, `"3.14"`), zero, negatives, other strings and
/// non-numeric JSON are rejected.
pub fn parse_threshold(value: &Value) -> ResultEngine<i64> {
    let parsed = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(threshold) if threshold >= 1 => Ok(threshold),
        _ => Err(EngineError::InvalidInput(format!(
            "threshold must be a positive integer, got {value}"
        ))),
    }
}

fn validate_language(tag: &str) -> ResultEngine<String> {
    let tag = tag.trim();
    let valid = !tag.is_empty()
        && tag.len() <= 35
        && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(EngineError::InvalidInput(format!("invalid language tag: {tag}")));
    }
    Ok(tag.to_string())
}

pub(super) async fn load_cache(db: &DatabaseConnection) -> ResultEngine<SettingsCache> {
    let mut cache = SettingsCache::default();
    for row in settings::Entity::find().all(db).await? {
        match row.key.as_str() {
            SUPPORT_THRESHOLD_KEY => match row.value.trim().parse::<i64>() {
                Ok(threshold) if threshold >= 1 => cache.support_threshold = threshold,
                _ => tracing::warn!(
                    "ignoring stored support threshold {:?}, using {DEFAULT_SUPPORT_THRESHOLD}",
                    row.value
                ),
            },
            DEFAULT_LANGUAGE_KEY if !row.value.trim().is_empty() => {
                cache.default_language = Some(row.value.trim().to_string());
            }
            _ => {}
        }
    }
    Ok(cache)
}

async fn upsert(db: &DatabaseConnection, key: &str, value: String) -> ResultEngine<()> {
    settings::Entity::insert(settings::ActiveModel {
        key: ActiveValue::Set(key.to_string()),
        value: ActiveValue::Set(value),
    })
    .on_conflict(
        OnConflict::column(settings::Column::Key)
            .update_column(settings::Column::Value)
            .to_owned(),
    )
    .exec(db)
    .await?;
    Ok(())
}

impl Engine {
    pub async fn support_threshold(&self) -> i64 {
        self.settings.lock().await.support_threshold
    }

    /// Persist a new threshold; the cache changes only once the write
    /// succeeded.
    pub async fn set_support_threshold(&self, threshold: i64) -> ResultEngine<i64> {
        if threshold < 1 {
            return Err(EngineError::InvalidInput(format!(
                "threshold must be a positive integer, got {threshold}"
            )));
        }
        let mut cache = self.settings.lock().await;
        upsert(&self.database, SUPPORT_THRESHOLD_KEY, threshold.to_string()).await?;
        cache.support_threshold = threshold;
        tracing::info!("support threshold set to {threshold}");
        Ok(threshold)
    }

    /// Parses and persists a threshold coming from a JSON payload.
    pub async fn set_support_threshold_value(&self, value: &Value) -> ResultEngine<i64> {
        let threshold = parse_threshold(value)?;
        self.set_support_threshold(threshold).await
    }

    /// `total_sales >= threshold` (the threshold is in whole credits).
    ///
    /// A threshold too large to express in cents is never reached.
    pub async fn is_eligible_for_support(&self, total_sales: Credits) -> bool {
        Credits::checked_whole(self.support_threshold().await)
            .is_some_and(|threshold| total_sales >= threshold)
    }

    pub async fn default_language(&self) -> Option<String> {
        self.settings.lock().await.default_language.clone()
    }

    pub async fn set_default_language(&self, tag: &str) -> ResultEngine<String> {
        let tag = validate_language(tag)?;
        let mut cache = self.settings.lock().await;
        upsert(&self.database, DEFAULT_LANGUAGE_KEY, tag.clone()).await?;
        cache.default_language = Some(tag.clone());
        tracing::info!("default language set to {tag}");
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_positive_integers() {
        assert_eq!(parse_threshold(&json!(7)).unwrap(), 7);
        assert_eq!(parse_threshold(&json!("7")).unwrap(), 7);
        assert_eq!(parse_threshold(&json!(" 10000 ")).unwrap(), 10000);
    }

    #[test]
    fn rejects_everything_else() {
        for value in [
            json!(0),
            json!(-3),
            json!("0"),
            json!("-1"),
            json!(2.5),
            json!("3.14"),
            json!("abc"),
            json!(""),
            json!(null),
            json!(true),
            json!([1]),
        ] {
            assert!(parse_threshold(&value).is_err(), "{value} accepted");
        }
    }

    #[test]
    fn language_tags() {
        assert_eq!(validate_language(" en-US ").unwrap(), "en-US");
        assert!(validate_language("").is_err());
        assert!(validate_language("en US").is_err());
    }
}
