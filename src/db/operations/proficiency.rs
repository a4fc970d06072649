use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::StoreError;
use crate::proficiency::types::ProficiencyState;

pub async fn get_proficiency_state(
    pool: &SqlitePool,
    learner_id: &str,
    skill_name: &str,
) -> Result<Option<ProficiencyState>, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT "theta", "sigma", "lastUpdated", "questionCount", "masteryAchieved", "masteryTimestamp"
        FROM "proficiency_states"
        WHERE "learnerId" = ? AND "skillName" = ?
        "#,
    )
    .bind(learner_id)
    .bind(skill_name)
    .fetch_optional(pool)
    .await?;

    row.map(|r| map_proficiency_state(&r)).transpose()
}

pub async fn upsert_proficiency_state(
    pool: &SqlitePool,
    learner_id: &str,
    skill_name: &str,
    state: &ProficiencyState,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO "proficiency_states" (
            "learnerId", "skillName", "theta", "sigma", "lastUpdated",
            "questionCount", "masteryAchieved", "masteryTimestamp"
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT ("learnerId", "skillName") DO UPDATE SET
            "theta" = EXCLUDED."theta",
            "sigma" = EXCLUDED."sigma",
            "lastUpdated" = EXCLUDED."lastUpdated",
            "questionCount" = EXCLUDED."questionCount",
            "masteryAchieved" = EXCLUDED."masteryAchieved",
            "masteryTimestamp" = EXCLUDED."masteryTimestamp"
        "#,
    )
    .bind(learner_id)
    .bind(skill_name)
    .bind(state.theta)
    .bind(state.sigma)
    .bind(state.last_updated.timestamp_millis())
    .bind(i64::from(state.question_count))
    .bind(state.mastery_achieved())
    .bind(state.mastery_timestamp().map(|ts| ts.timestamp_millis()))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_proficiency_states(
    pool: &SqlitePool,
    learner_id: &str,
) -> Result<Vec<(String, ProficiencyState)>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT "skillName", "theta", "sigma", "lastUpdated", "questionCount", "masteryAchieved", "masteryTimestamp"
        FROM "proficiency_states"
        WHERE "learnerId" = ?
        ORDER BY "skillName" ASC
        "#,
    )
    .bind(learner_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| -> Result<(String, ProficiencyState), StoreError> {
            let skill: String = r.try_get("skillName")?;
            Ok((skill, map_proficiency_state(r)?))
        })
        .collect()
}

fn map_proficiency_state(row: &SqliteRow) -> Result<ProficiencyState, StoreError> {
    let theta: f64 = row.try_get("theta")?;
    let sigma: f64 = row.try_get("sigma")?;
    let last_updated = millis_to_datetime(row.try_get("lastUpdated")?)?;
    let question_count: i64 = row.try_get("questionCount")?;
    let question_count = u32::try_from(question_count)
        .map_err(|_| StoreError::Corrupt(format!("questionCount out of range: {question_count}")))?;
    let mastery_achieved: bool = row.try_get("masteryAchieved")?;
    let mastery_ts: Option<i64> = row.try_get("masteryTimestamp")?;

    // A mastered row without a timestamp stays mastered.
    let mastery_timestamp = match (mastery_achieved, mastery_ts) {
        (true, Some(ms)) => Some(millis_to_datetime(ms)?),
        (true, None) => Some(last_updated),
        (false, _) => None,
    };

    Ok(ProficiencyState::restore(
        theta,
        sigma,
        last_updated,
        question_count,
        mastery_timestamp,
    ))
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {ms}")))
}
