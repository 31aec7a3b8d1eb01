use thiserror::Error;

use crate::error::DbResult;
use crate::row::{Row, RowError};
use crate::table::Table;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PrepareError {
    #[error("Syntax error. Could not parse statement.")]
    Syntax,

    #[error("Unrecognized command: {0}")]
    Unrecognized(String),

    #[error(transparent)]
    Row(#[from] RowError),
}

// Non-SQL statements like .exit are called “meta-commands”.
#[derive(Debug, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    Unrecognized(String),
}

impl MetaCommand {
    pub fn parse(input: &str) -> Option<MetaCommand> {
        match input {
            ".exit" => Some(MetaCommand::Exit),
            _ if input.starts_with('.') => Some(MetaCommand::Unrecognized(input.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

impl Statement {
    pub fn prepare(input: &str) -> Result<Statement, PrepareError> {
        let mut words = input.split_whitespace();
        match words.next() {
            Some("insert") => {
                let (Some(id), Some(username), Some(email)) =
                    (words.next(), words.next(), words.next())
                else {
                    return Err(PrepareError::Syntax);
                };
                Ok(Statement::Insert(Row::parse(id, username, email)?))
            }
            Some("select") => Ok(Statement::Select),
            _ => Err(PrepareError::Unrecognized(input.to_string())),
        }
    }

    /// Runs the statement and returns the rows it produced; inserts produce
    /// none.
    pub fn execute(&self, table: &mut Table) -> DbResult<Vec<Row>> {
        match self {
            Statement::Insert(row) => {
                table.append_row(row)?;
                Ok(Vec::new())
            }
            Statement::Select => table.select_rows(),
        }
    }
}
