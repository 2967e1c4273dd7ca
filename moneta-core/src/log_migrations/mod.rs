//! Migrations for the event log database (logs.duckdb)

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_logs.sql", include_str!("001_logs.sql")),
];
