//! PostgreSQL well source (feature `postgres`).
//!
//! Runs the longest-lateral well / flow-unit / basin / spacing join in one
//! round trip. The async driver runs on a private current-thread runtime so
//! callers stay synchronous.

use sqlx::Connection;
use std::time::Duration;

use super::{DataRetrievalError, WellDataSource, WellQuery};
use crate::types::{RawWellRow, PRODUCING_STATUS};

/// Numeric columns are cast to text so coercion stays in the pipeline.
const WELL_QUERY: &str = r#"
    SELECT
        one.api10::text                          AS "API10",
        one.api14::text                          AS "API14",
        one.tca_id::text                         AS "tcaID",
        one.well_status                          AS "wellStatus",
        one.operator_gold                        AS "OperatorGold",
        one.completion_year::text                AS "CompletionYear",
        one.lateral_length_ft::text              AS "LateralLength_FT",
        one.proppant_lbs_per_ft::text            AS "Proppant_LBSPerFT",
        one.fluid_bbl_per_ft::text               AS "Fluid_BBLPerFT",
        ws.spacing_hz_same_zone_at_drill::text   AS "SpacingHzAnyZoneAtDrill",
        ws.bounding_any_zone_at_drill            AS "BoundingAnyZoneAtDrill"
    FROM public.well_one_line one
    INNER JOIN public.flow_unit fu ON fu.fu_id = one.fu_id
    INNER JOIN public.basin b ON b.basin_id = fu.basin_id
    LEFT JOIN public.well_spacing ws ON one.well_id = ws.well_id
    LEFT JOIN public.well_spacing_scenario wss ON ws.wss_id = wss.wss_id AND fu.fu_id = wss.fu_id
    WHERE one.longest_lateral_flag = 'true'
      AND fu.fu_analog = $1
      AND b.basin_name = $2
      AND one.well_status = $3
      AND one.completion_year >= $4
"#;

type WellRowTuple = (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Connection settings for one pipeline run.
#[derive(Clone)]
pub struct DatabaseConfig {
    url: String,
    /// Wraps connect + query; `None` waits indefinitely
    pub query_timeout_secs: Option<u64>,
}

impl DatabaseConfig {
    /// Build from a connection string, dropping any `?...` parameter suffix.
    pub fn from_connection_string(connection_string: &str) -> Self {
        let url = connection_string
            .split('?')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        Self {
            url,
            query_timeout_secs: None,
        }
    }

    /// Read `DATABASE_URL`, loading a `.env` file first if one exists.
    pub fn from_env() -> Result<Self, DataRetrievalError> {
        dotenvy::dotenv().ok();
        std::env::var("DATABASE_URL")
            .map(|url| Self::from_connection_string(&url))
            .map_err(|_| DataRetrievalError::Database("DATABASE_URL is not set".to_string()))
    }

    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.query_timeout_secs = Some(secs);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credentials live in the URL
        let host = self.url.rsplit('@').next().unwrap_or("<redacted>");
        f.debug_struct("DatabaseConfig")
            .field("host", &host)
            .field("query_timeout_secs", &self.query_timeout_secs)
            .finish()
    }
}

/// Well rows fetched from the completions database.
#[derive(Debug)]
pub struct PostgresWellSource {
    config: DatabaseConfig,
}

impl PostgresWellSource {
    pub const fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    async fn query(&self, query: &WellQuery) -> Result<Vec<RawWellRow>, DataRetrievalError> {
        let mut conn = sqlx::postgres::PgConnection::connect(self.config.url())
            .await
            .map_err(|e| DataRetrievalError::Database(e.to_string()))?;

        let rows: Vec<WellRowTuple> = sqlx::query_as(WELL_QUERY)
            .bind(query.flow_unit.as_str())
            .bind(query.basin.as_str())
            .bind(PRODUCING_STATUS)
            .bind(query.min_completion_year)
            .fetch_all(&mut conn)
            .await
            .map_err(|e| DataRetrievalError::Database(e.to_string()))?;

        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "Failed to close database connection cleanly");
        }

        Ok(rows.into_iter().map(Self::row_from_tuple).collect())
    }

    fn row_from_tuple(t: WellRowTuple) -> RawWellRow {
        let (
            api10,
            api14,
            group_id,
            well_status,
            operator,
            year,
            lateral,
            proppant,
            fluid,
            spacing,
            boundary,
        ) = t;
        RawWellRow {
            api10,
            api14,
            group_id,
            well_status,
            operator,
            completion_year: year,
            lateral_length_ft: lateral,
            proppant_lbs_per_ft: proppant,
            fluid_bbl_per_ft: fluid,
            spacing_ft: spacing,
            boundary_category: boundary,
        }
    }
}

impl WellDataSource for PostgresWellSource {
    fn fetch(&self, query: &WellQuery) -> Result<Vec<RawWellRow>, DataRetrievalError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DataRetrievalError::Database(format!("failed to start runtime: {e}")))?;

        runtime.block_on(async {
            match self.config.query_timeout_secs {
                Some(secs) => tokio::time::timeout(Duration::from_secs(secs), self.query(query))
                    .await
                    .map_err(|_| DataRetrievalError::Timeout(secs))?,
                None => self.query(query).await,
            }
        })
    }

    fn source_name(&self) -> &str {
        "PostgreSQL"
    }
}
