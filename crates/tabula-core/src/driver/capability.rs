use super::Dialect;

#[derive(Debug)]
pub struct Capability {
    pub dialect: Dialect,

    /// When true, `ALTER TABLE ... ADD CONSTRAINT` is not available and
    /// primary, unique, foreign key and check constraints are declared inline
    /// in `CREATE TABLE`.
    pub inline_constraints: bool,

    /// When true, a trigger may fire on several events (`INSERT OR UPDATE`).
    pub multi_event_triggers: bool,

    /// When true, DDL statements take part in transactions.
    pub transactional_ddl: bool,

    /// Largest length accepted for a `VARCHAR` column. Longer strings are
    /// stored as text.
    pub max_varchar: u32,
}

impl Capability {
    /// SQLite capabilities.
    pub const SQLITE: Self = Self {
        dialect: Dialect::Sqlite,
        inline_constraints: true,
        multi_event_triggers: false,
        transactional_ddl: true,
        // SQLite ignores the declared length, so any limit works. Keep the
        // declared type readable.
        max_varchar: 1_000_000_000,
    };

    /// PostgreSQL capabilities
    pub const POSTGRESQL: Self = Self {
        dialect: Dialect::Postgresql,
        inline_constraints: false,
        multi_event_triggers: true,
        transactional_ddl: true,
        max_varchar: 10_485_760,
    };

    /// MySQL capabilities
    pub const MYSQL: Self = Self {
        dialect: Dialect::Mysql,
        inline_constraints: false,
        multi_event_triggers: false,
        transactional_ddl: false,
        max_varchar: 16_383,
    };

    /// Microsoft SQL Server capabilities
    pub const MSSQL: Self = Self {
        dialect: Dialect::Mssql,
        inline_constraints: false,
        multi_event_triggers: true,
        transactional_ddl: true,
        max_varchar: 4_000,
    };

    pub fn for_dialect(dialect: Dialect) -> &'static Capability {
        match dialect {
            Dialect::Postgresql => &Self::POSTGRESQL,
            Dialect::Mssql => &Self::MSSQL,
            Dialect::Mysql => &Self::MYSQL,
            Dialect::Sqlite => &Self::SQLITE,
        }
    }
}
