use super::Serializer;

use tabula_core::driver::Dialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flavor {
    Postgresql,
    Sqlite,
    Mysql,
    Mssql,
}

impl Flavor {
    pub(super) fn dialect(self) -> Dialect {
        match self {
            Flavor::Postgresql => Dialect::Postgresql,
            Flavor::Sqlite => Dialect::Sqlite,
            Flavor::Mysql => Dialect::Mysql,
            Flavor::Mssql => Dialect::Mssql,
        }
    }
}

impl Serializer {
    pub fn sqlite() -> Serializer {
        Serializer {
            flavor: Flavor::Sqlite,
        }
    }

    pub fn postgresql() -> Serializer {
        Serializer {
            flavor: Flavor::Postgresql,
        }
    }

    pub fn mysql() -> Serializer {
        Serializer {
            flavor: Flavor::Mysql,
        }
    }

    pub fn mssql() -> Serializer {
        Serializer {
            flavor: Flavor::Mssql,
        }
    }

    pub fn for_dialect(dialect: Dialect) -> Serializer {
        match dialect {
            Dialect::Postgresql => Serializer::postgresql(),
            Dialect::Sqlite => Serializer::sqlite(),
            Dialect::Mysql => Serializer::mysql(),
            Dialect::Mssql => Serializer::mssql(),
        }
    }

    pub(super) fn is_sqlite(&self) -> bool {
        self.flavor == Flavor::Sqlite
    }

    pub(super) fn is_mssql(&self) -> bool {
        self.flavor == Flavor::Mssql
    }
}
