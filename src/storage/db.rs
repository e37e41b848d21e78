use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr};

const MIGRATIONS: [(&str, &str); 3] = [
    (
        "001_create_recommendations",
        include_str!("../../migrations/001_create_recommendations.sql"),
    ),
    (
        "002_create_recommendation_logs",
        include_str!("../../migrations/002_create_recommendation_logs.sql"),
    ),
    (
        "003_create_feedback",
        include_str!("../../migrations/003_create_feedback.sql"),
    ),
];

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    tracing::info!("Connecting to database: {}", database_url);

    // Handle special SQLite URL formats
    let db = if database_url == "sqlite::memory:" {
        Database::connect(database_url)
            .await
            .map_err(|e| DbErr::Custom(format!("Connection failed: {}", e)))?
    } else if let Some(path_str) = database_url.strip_prefix("sqlite://") {
        let path_str = path_str.split('?').next().unwrap_or(path_str);
        let path = std::path::Path::new(path_str);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DbErr::Custom(format!("Failed to create DB directory: {}", e)))?;
                tracing::info!("Created database directory: {}", parent.display());
            }
        }

        if !path.exists() {
            std::fs::File::create(path)
                .map_err(|e| DbErr::Custom(format!("Failed to create DB file: {}", e)))?;
            tracing::info!("Created database file: {}", path.display());
        }

        Database::connect(database_url)
            .await
            .map_err(|e| DbErr::Custom(format!("Connection failed: {}", e)))?
    } else {
        return Err(DbErr::Custom("Invalid SQLite URL format".to_string()));
    };

    // Every migration is idempotent, so they are simply re-applied on startup
    for (name, sql) in MIGRATIONS {
        db.execute_unprepared(sql).await?;
        tracing::debug!("Applied migration {}", name);
    }
    tracing::info!("Database schema ready ({} migrations)", MIGRATIONS.len());

    Ok(db)
}
