//! Database vendor registry: per-vendor driver and validation-query defaults,
//! plus the JDBC protocol-to-vendor mapping.

use std::fmt;

/// A database vendor this library knows defaults for.
///
/// New vendors are supported by adding a variant here and extending the
/// tables below; calling code never needs to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DatabaseVendor {
    MySql,
    Mssql,
    Postgres,
}

impl DatabaseVendor {
    /// The JDBC driver class loaded by default for this vendor.
    pub fn default_driver(&self) -> &'static str {
        match self {
            DatabaseVendor::MySql => "com.mysql.jdbc.Driver",
            DatabaseVendor::Mssql => "net.sourceforge.jtds.jdbc.Driver",
            DatabaseVendor::Postgres => "org.postgresql.Driver",
        }
    }

    /// The SQL query issued by default when validating a connection.
    pub fn default_validation_query(&self) -> &'static str {
        match self {
            DatabaseVendor::MySql => "SELECT 1",
            DatabaseVendor::Mssql => "SELECT 1",
            DatabaseVendor::Postgres => "SELECT 1",
        }
    }

    /// Maps a JDBC protocol token (and optional sub-protocol token) to a
    /// vendor. Returns `None` for unmapped combinations.
    pub fn from_jdbc_protocol(protocol: &str, sub_protocol: &str) -> Option<Self> {
        match (protocol, sub_protocol) {
            ("mysql", _) => Some(DatabaseVendor::MySql),
            ("jtds", "sqlserver") => Some(DatabaseVendor::Mssql),
            ("postgresql", _) => Some(DatabaseVendor::Postgres),
            _ => None,
        }
    }
}

impl fmt::Display for DatabaseVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatabaseVendor::MySql => "MYSQL",
            DatabaseVendor::Mssql => "MSSQL",
            DatabaseVendor::Postgres => "POSTGRES",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_protocols() {
        assert_eq!(
            DatabaseVendor::from_jdbc_protocol("mysql", "//localhost"),
            Some(DatabaseVendor::MySql)
        );
        assert_eq!(
            DatabaseVendor::from_jdbc_protocol("jtds", "sqlserver"),
            Some(DatabaseVendor::Mssql)
        );
        assert_eq!(
            DatabaseVendor::from_jdbc_protocol("postgresql", ""),
            Some(DatabaseVendor::Postgres)
        );
    }

    #[test]
    fn rejects_unknown_protocols() {
        assert_eq!(DatabaseVendor::from_jdbc_protocol("oracle", "thin"), None);
        // jtds alone is not enough to pick a vendor
        assert_eq!(DatabaseVendor::from_jdbc_protocol("jtds", "sybase"), None);
        assert_eq!(DatabaseVendor::from_jdbc_protocol("", ""), None);
    }

    #[test]
    fn vendor_defaults_are_registered() {
        assert_eq!(
            DatabaseVendor::MySql.default_driver(),
            "com.mysql.jdbc.Driver"
        );
        assert_eq!(DatabaseVendor::MySql.default_validation_query(), "SELECT 1");
        assert_eq!(
            DatabaseVendor::Mssql.default_driver(),
            "net.sourceforge.jtds.jdbc.Driver"
        );
    }
}
