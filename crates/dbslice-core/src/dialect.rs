use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// SQL dialect of the source database.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    #[serde(alias = "postgresql")]
    Postgres,
    MySql,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
        }
    }

    /// Identifier quoting for this dialect, resolved once by query builders.
    pub fn quoting(self) -> Quoting {
        match self {
            Dialect::Postgres => Quoting {
                quote_char: '"',
                quote: quote_double,
            },
            Dialect::MySql => Quoting {
                quote_char: '`',
                quote: quote_backtick,
            },
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            other => Err(Error::Unsupported(format!("dialect '{other}'"))),
        }
    }
}

/// Identifier quoting functions for one dialect.
#[derive(Clone, Copy)]
pub struct Quoting {
    quote_char: char,
    quote: fn(&str) -> String,
}

impl Quoting {
    pub fn quote_char(&self) -> char {
        self.quote_char
    }

    /// Quote a single identifier, doubling embedded quote characters.
    pub fn ident(&self, ident: &str) -> String {
        (self.quote)(ident)
    }

    /// Quote a table reference; an empty schema yields just the table name.
    pub fn table(&self, schema: &str, name: &str) -> String {
        if schema.is_empty() {
            self.ident(name)
        } else {
            format!("{}.{}", self.ident(schema), self.ident(name))
        }
    }

    /// Qualify a column with an already-rendered table reference or alias.
    pub fn column(&self, qualifier: &str, column: &str) -> String {
        format!("{qualifier}.{}", self.ident(column))
    }
}

impl fmt::Debug for Quoting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Quoting")
            .field("quote_char", &self.quote_char)
            .finish()
    }
}

/// Quote identifier with double quotes (Postgres).
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks (MySQL).
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_tables_per_dialect() {
        assert_eq!(
            Dialect::Postgres.quoting().table("public", "orders"),
            "\"public\".\"orders\""
        );
        assert_eq!(
            Dialect::MySql.quoting().table("shop", "orders"),
            "`shop`.`orders`"
        );
        assert_eq!(Dialect::Postgres.quoting().table("", "orders"), "\"orders\"");
    }

    #[test]
    fn doubles_embedded_quotes() {
        assert_eq!(quote_double("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_backtick("we`ird"), "`we``ird`");
    }

    #[test]
    fn parses_dialect_names() {
        assert_eq!("PostgreSQL".parse::<Dialect>().ok(), Some(Dialect::Postgres));
        assert_eq!("mysql".parse::<Dialect>().ok(), Some(Dialect::MySql));
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Dialect::MySql).expect("serialize dialect");
        assert_eq!(json, "\"mysql\"");
        let parsed: Dialect = serde_json::from_str("\"postgresql\"").expect("parse alias");
        assert_eq!(parsed, Dialect::Postgres);
    }
}
